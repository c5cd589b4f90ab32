//! Bootstrap configuration.
//!
//! Every setting comes from a CLI flag with an environment variable fallback, so the
//! compose service definition can drive the container purely through `environment:`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use crate::daemon::DaemonCommand;
use crate::error::{BootstrapError, Result};

pub const DEFAULT_MODEL_NAME: &str = "custom-model";
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// How `list` and `create` requests reach the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ControlTransport {
    /// Run the daemon binary's own `list` / `create` subcommands.
    Cli,
    /// Call the daemon's REST API.
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Starts the inference daemon, registers a custom model derived from a base model,
/// and stays alive for as long as the daemon runs.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Base model the custom model derives from, e.g. `llama3:8b`
    #[arg(long, env = "MODEL")]
    pub model: String,

    /// Context window applied as `num_ctx`
    #[arg(long, env = "CONTEXT_SIZE", default_value_t = 4096)]
    pub context_size: u32,

    /// Sampling temperature applied at inference time
    #[arg(long, env = "TEMPERATURE", default_value_t = 0.7)]
    pub temperature: f32,

    /// Name the derived model is registered under
    #[arg(long, env = "MODEL_NAME", default_value = DEFAULT_MODEL_NAME)]
    pub model_name: String,

    /// Where the Modelfile is written before registration
    #[arg(long = "modelfile", env = "MODELFILE_PATH", default_value = "/tmp/Modelfile")]
    pub modelfile_path: PathBuf,

    /// Inference daemon executable
    #[arg(long, env = "DAEMON_BIN", default_value = "ollama")]
    pub daemon_bin: PathBuf,

    /// Extra argument passed to the daemon before its subcommand (repeatable)
    #[arg(long = "daemon-arg", allow_hyphen_values = true)]
    pub daemon_args: Vec<String>,

    #[arg(long, env = "DAEMON_CONTROL", value_enum, default_value_t = ControlTransport::Cli)]
    pub control: ControlTransport,

    /// Daemon REST endpoint, used with `--control http`
    #[arg(long, env = "OLLAMA_URL", default_value = OLLAMA_DEFAULT_URL)]
    pub daemon_url: String,

    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Give up waiting for the daemon after this many seconds
    #[arg(long, env = "READY_TIMEOUT_SECS", default_value_t = 120)]
    pub ready_timeout_secs: u64,

    /// Time the daemon gets to exit after SIGTERM before it is killed
    #[arg(long, env = "SHUTDOWN_GRACE_SECS", default_value_t = 10)]
    pub shutdown_grace_secs: u64,

    /// Keep supervising the daemon when model registration fails
    #[arg(long, env = "KEEP_SERVING_ON_REGISTRATION_FAILURE")]
    pub keep_serving_on_registration_failure: bool,

    /// Serve `GET /health` on this address
    #[arg(long, env = "HEALTH_ADDR")]
    pub health_addr: Option<SocketAddr>,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// The three tunables the custom model is derived with. Immutable once validated.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapParameters {
    pub base_model: String,
    pub context_size: u32,
    pub temperature: f32,
}

impl BootstrapParameters {
    pub fn new(base_model: impl Into<String>, context_size: u32, temperature: f32) -> Result<Self> {
        let base_model = base_model.into();
        validate_identifier("MODEL", &base_model)?;

        if context_size == 0 {
            return Err(BootstrapError::InvalidParameters {
                field: "CONTEXT_SIZE",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(BootstrapError::InvalidParameters {
                field: "TEMPERATURE",
                reason: format!("{} is not a non-negative number", temperature),
            });
        }
        if temperature > 2.0 {
            tracing::warn!(temperature, "Temperature above the conventional 0.0-2.0 range");
        }

        Ok(Self {
            base_model,
            context_size,
            temperature,
        })
    }
}

/// Everything about how the bootstrap runs, as opposed to what it registers.
#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    pub model_name: String,
    pub modelfile_path: PathBuf,
    pub daemon: DaemonCommand,
    pub control: ControlTransport,
    pub daemon_url: String,
    pub poll_interval: Duration,
    pub ready_timeout: Duration,
    pub shutdown_grace: Duration,
    pub keep_serving_on_registration_failure: bool,
    pub health_addr: Option<SocketAddr>,
}

impl Args {
    pub fn parameters(&self) -> Result<BootstrapParameters> {
        BootstrapParameters::new(self.model.clone(), self.context_size, self.temperature)
    }

    pub fn settings(&self) -> Result<BootstrapSettings> {
        validate_identifier("MODEL_NAME", &self.model_name)?;
        if self.poll_interval_ms == 0 {
            return Err(BootstrapError::InvalidParameters {
                field: "POLL_INTERVAL_MS",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(BootstrapSettings {
            model_name: self.model_name.clone(),
            modelfile_path: self.modelfile_path.clone(),
            daemon: DaemonCommand::new(self.daemon_bin.clone()).with_args(self.daemon_args.iter()),
            control: self.control,
            daemon_url: self.daemon_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            ready_timeout: Duration::from_secs(self.ready_timeout_secs),
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
            keep_serving_on_registration_failure: self.keep_serving_on_registration_failure,
            health_addr: self.health_addr,
        })
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match self.log_format {
            LogFormat::Json => fmt().json().with_env_filter(filter).init(),
            LogFormat::Pretty => fmt().with_env_filter(filter).init(),
        }
    }
}

// Model references end up verbatim on a Modelfile line, so anything that could
// start a new directive is refused instead of escaped.
fn validate_identifier(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BootstrapError::InvalidParameters {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    if let Some(c) = value.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(BootstrapError::InvalidParameters {
            field,
            reason: format!("contains disallowed character {:?}", c),
        });
    }
    Ok(())
}
