pub mod modelfile;
pub mod orchestrator;
pub mod phase;
pub mod readiness;
pub mod registrar;
pub mod supervisor;

pub use modelfile::ModelfileDocument;
pub use orchestrator::Orchestrator;
pub use phase::{BootstrapStatus, IllegalTransition, Phase, StatusBoard};
pub use readiness::ReadinessPoller;
pub use registrar::register;
pub use supervisor::{stop, supervise, Supervised};
