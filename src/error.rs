use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures of the bootstrap sequence. Each one terminates the container.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("invalid value for {field}: {reason}")]
    InvalidParameters { field: &'static str, reason: String },

    #[error("inference daemon failed to launch: {0}")]
    DaemonLaunchFailed(String),

    #[error("inference daemon not ready after {timeout:?} ({attempts} attempts)")]
    DaemonNotReady { timeout: Duration, attempts: u32 },

    #[error("failed to write model configuration to {}: {source}", path.display())]
    ConfigWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to register model '{model}': {diagnostics}")]
    ModelRegistrationFailed { model: String, diagnostics: String },

    #[error("interrupted by {}", signal_name(*signal))]
    SupervisorInterrupted { signal: Option<i32> },

    #[error("failed to start health endpoint on {addr}: {source}")]
    HealthEndpoint {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

impl BootstrapError {
    /// Process exit code reported for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            BootstrapError::SupervisorInterrupted { signal: Some(signo) } => 128 + signo,
            _ => 1,
        }
    }
}

fn signal_name(signal: Option<i32>) -> String {
    match signal {
        Some(2) => "SIGINT".to_string(),
        Some(15) => "SIGTERM".to_string(),
        Some(other) => format!("signal {}", other),
        None => "cancellation".to_string(),
    }
}

/// Errors talking to the daemon over one of its control transports.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("failed to run daemon command: {0}")]
    Io(#[from] std::io::Error),

    #[error("daemon request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("daemon command exited with {status}: {output}")]
    CommandFailed { status: String, output: String },

    #[error("daemon rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
