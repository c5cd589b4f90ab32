//! Entrypoint logic for the model-serving container.
//!
//! Launches the inference daemon, waits until it answers, writes a Modelfile from
//! `MODEL` / `CONTEXT_SIZE` / `TEMPERATURE`, registers the derived model and then
//! supervises the daemon so the container lives exactly as long as it does.

pub mod bootstrap;
pub mod config;
pub mod daemon;
pub mod error;
pub mod health;
pub mod shutdown;

pub use bootstrap::{ModelfileDocument, Orchestrator, Phase, StatusBoard};
pub use config::{Args, BootstrapParameters, BootstrapSettings, ControlTransport};
pub use daemon::{CliControl, DaemonCommand, HttpControl, ModelControl};
pub use error::{BootstrapError, ControlError, Result};
pub use shutdown::Shutdown;
