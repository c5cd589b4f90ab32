use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ModelControl;
use crate::bootstrap::ModelfileDocument;
use crate::error::ControlError;

const LIST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct CreateRequest<'a> {
    model: &'a str,
    from: &'a str,
    parameters: CreateParameters,
    stream: bool,
}

#[derive(Serialize)]
struct CreateParameters {
    temperature: f32,
    num_ctx: u32,
}

#[derive(Deserialize, Default)]
struct CreateResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Talks to the daemon over its REST API (`/api/tags`, `/api/create`).
#[derive(Debug, Clone)]
pub struct HttpControl {
    client: reqwest::Client,
    base_url: String,
}

impl HttpControl {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ModelControl for HttpControl {
    fn readiness_token(&self) -> &str {
        "\"models\""
    }

    async fn list_models(&self) -> Result<String, ControlError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(LIST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ControlError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(body)
    }

    async fn create_model(
        &self,
        name: &str,
        document: &ModelfileDocument,
        _path: &Path,
    ) -> Result<(), ControlError> {
        let params = document.parameters();
        let request_body = CreateRequest {
            model: name,
            from: &params.base_model,
            parameters: CreateParameters {
                temperature: params.temperature,
                num_ctx: params.context_size,
            },
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/create", self.base_url))
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: CreateResponse = serde_json::from_str(&body).unwrap_or_default();

        if !status.is_success() {
            return Err(ControlError::Rejected {
                status: status.as_u16(),
                message: parsed.error.unwrap_or(body),
            });
        }
        if let Some(error) = parsed.error {
            return Err(ControlError::Rejected {
                status: status.as_u16(),
                message: error,
            });
        }

        tracing::debug!(model = name, status = ?parsed.status, "Daemon create finished");
        Ok(())
    }
}
