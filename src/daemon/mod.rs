pub mod cli;
pub mod http;
pub mod launcher;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::bootstrap::ModelfileDocument;
use crate::config::{BootstrapSettings, ControlTransport};
use crate::error::ControlError;

pub use cli::CliControl;
pub use http::HttpControl;
pub use launcher::{exit_code, launch, DaemonProcess};

/// The inference daemon executable. `serve`, `list` and `create` are its subcommands,
/// placed after any leading `args`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl DaemonCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub(crate) fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args).kill_on_drop(true);
        cmd
    }
}

/// Query and registration operations of a running daemon.
#[async_trait]
pub trait ModelControl: Send + Sync {
    /// Substring whose presence in [`ModelControl::list_models`] output means the
    /// daemon has finished initializing.
    fn readiness_token(&self) -> &str;

    async fn list_models(&self) -> Result<String, ControlError>;

    /// Create (or overwrite) `name` from the document already written at `path`.
    async fn create_model(
        &self,
        name: &str,
        document: &ModelfileDocument,
        path: &Path,
    ) -> Result<(), ControlError>;
}

/// The control transport selected by `settings.control`.
pub fn control_for(settings: &BootstrapSettings) -> Box<dyn ModelControl> {
    match settings.control {
        ControlTransport::Cli => Box::new(CliControl::new(settings.daemon.clone())),
        ControlTransport::Http => Box::new(HttpControl::new(settings.daemon_url.clone())),
    }
}
