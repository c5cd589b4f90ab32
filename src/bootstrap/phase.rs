use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

/// Where the orchestrator is in its one-way sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Launching,
    Polling,
    Ready,
    Configuring,
    Registering,
    Supervising,
    Terminated,
}

impl Phase {
    fn successor(self) -> Option<Phase> {
        match self {
            Phase::Launching => Some(Phase::Polling),
            Phase::Polling => Some(Phase::Ready),
            Phase::Ready => Some(Phase::Configuring),
            Phase::Configuring => Some(Phase::Registering),
            Phase::Registering => Some(Phase::Supervising),
            Phase::Supervising => Some(Phase::Terminated),
            Phase::Terminated => None,
        }
    }

    /// Only the next phase, or termination from anywhere but `Terminated`.
    pub fn can_advance_to(self, next: Phase) -> bool {
        match self {
            Phase::Terminated => false,
            _ => next == Phase::Terminated || self.successor() == Some(next),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Launching => "LAUNCHING",
            Phase::Polling => "POLLING",
            Phase::Ready => "READY",
            Phase::Configuring => "CONFIGURING",
            Phase::Registering => "REGISTERING",
            Phase::Supervising => "SUPERVISING",
            Phase::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BootstrapStatus {
    pub phase: Phase,
    pub phase_since: DateTime<Utc>,
    pub model_name: String,
    pub base_model: String,
    pub ready_attempts: u32,
    pub registered: bool,
    pub exit_code: Option<i32>,
}

#[derive(Debug, thiserror::Error)]
#[error("illegal phase transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: Phase,
    pub to: Phase,
}

/// Shared view of the bootstrap progress, read by the health endpoint.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    inner: Arc<Mutex<BootstrapStatus>>,
}

impl StatusBoard {
    pub fn new(model_name: impl Into<String>, base_model: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BootstrapStatus {
                phase: Phase::Launching,
                phase_since: Utc::now(),
                model_name: model_name.into(),
                base_model: base_model.into(),
                ready_attempts: 0,
                registered: false,
                exit_code: None,
            })),
        }
    }

    pub async fn advance(&self, next: Phase) -> Result<(), IllegalTransition> {
        let mut status = self.inner.lock().await;
        if !status.phase.can_advance_to(next) {
            return Err(IllegalTransition {
                from: status.phase,
                to: next,
            });
        }

        tracing::info!(from = %status.phase, to = %next, "Phase transition");
        status.phase = next;
        status.phase_since = Utc::now();
        Ok(())
    }

    pub async fn record_ready(&self, attempts: u32) {
        self.inner.lock().await.ready_attempts = attempts;
    }

    pub async fn record_registered(&self) {
        self.inner.lock().await.registered = true;
    }

    /// Move to `Terminated` with the code the process is about to exit with.
    pub async fn terminate(&self, exit_code: i32) {
        let mut status = self.inner.lock().await;
        if status.phase != Phase::Terminated {
            tracing::info!(from = %status.phase, exit_code, "Phase transition to TERMINATED");
            status.phase = Phase::Terminated;
            status.phase_since = Utc::now();
        }
        status.exit_code = Some(exit_code);
    }

    pub async fn snapshot(&self) -> BootstrapStatus {
        self.inner.lock().await.clone()
    }
}
