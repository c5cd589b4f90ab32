use std::path::Path;

use crate::config::BootstrapParameters;
use crate::error::{BootstrapError, Result};

/// A rendered Modelfile plus the parameters it was rendered from.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelfileDocument {
    parameters: BootstrapParameters,
    text: String,
}

impl ModelfileDocument {
    /// Directive order is fixed: `FROM`, `temperature`, `num_ctx`.
    pub fn render(parameters: &BootstrapParameters) -> Self {
        let text = format!(
            "FROM {}\nPARAMETER temperature {}\nPARAMETER num_ctx {}\n",
            parameters.base_model, parameters.temperature, parameters.context_size
        );

        Self {
            parameters: parameters.clone(),
            text,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn parameters(&self) -> &BootstrapParameters {
        &self.parameters
    }

    /// Replace whatever is at `path` with this document.
    pub async fn write_to(&self, path: &Path) -> Result<()> {
        let to_config_error = |source| BootstrapError::ConfigWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(to_config_error)?;
        }
        tokio::fs::write(path, self.text.as_bytes())
            .await
            .map_err(to_config_error)?;

        tracing::debug!(path = %path.display(), bytes = self.text.len(), "Modelfile written");
        Ok(())
    }
}
