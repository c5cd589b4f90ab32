use std::ffi::OsStr;
use std::path::Path;
use std::process::{Output, Stdio};

use async_trait::async_trait;

use super::{DaemonCommand, ModelControl};
use crate::bootstrap::ModelfileDocument;
use crate::error::ControlError;

/// Header of the `list` table; printed only once the daemon answers.
const LISTING_HEADER: &str = "NAME";

/// Talks to the daemon through its own `list` and `create` subcommands.
#[derive(Debug, Clone)]
pub struct CliControl {
    daemon: DaemonCommand,
}

impl CliControl {
    pub fn new(daemon: DaemonCommand) -> Self {
        Self { daemon }
    }

    async fn run<I, S>(&self, args: I) -> Result<Output, ControlError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self
            .daemon
            .command()
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;

        if output.status.success() {
            return Ok(output);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ControlError::CommandFailed {
            status: output.status.to_string(),
            output: format!("{}{}", stderr, stdout).trim().to_string(),
        })
    }
}

#[async_trait]
impl ModelControl for CliControl {
    fn readiness_token(&self) -> &str {
        LISTING_HEADER
    }

    async fn list_models(&self) -> Result<String, ControlError> {
        let output = self.run(["list"]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn create_model(
        &self,
        name: &str,
        _document: &ModelfileDocument,
        path: &Path,
    ) -> Result<(), ControlError> {
        let output = self
            .run([OsStr::new("create"), OsStr::new(name), OsStr::new("-f"), path.as_os_str()])
            .await?;
        tracing::debug!(
            model = name,
            output = %String::from_utf8_lossy(&output.stdout).trim(),
            "Daemon create finished"
        );
        Ok(())
    }
}
