use std::future::Future;

use crate::bootstrap::{
    register, stop, supervise, ModelfileDocument, Phase, ReadinessPoller, StatusBoard, Supervised,
};
use crate::config::{BootstrapParameters, BootstrapSettings};
use crate::daemon::{control_for, exit_code, launch, DaemonProcess, ModelControl};
use crate::error::{BootstrapError, Result};
use crate::shutdown::Shutdown;

/// Runs `LAUNCHING → POLLING → READY → CONFIGURING → REGISTERING → SUPERVISING →
/// TERMINATED` once.
pub struct Orchestrator {
    parameters: BootstrapParameters,
    settings: BootstrapSettings,
    control: Box<dyn ModelControl>,
    board: StatusBoard,
    shutdown: Shutdown,
}

impl Orchestrator {
    pub fn new(parameters: BootstrapParameters, settings: BootstrapSettings, shutdown: Shutdown) -> Self {
        let control = control_for(&settings);
        Self::with_control(parameters, settings, control, shutdown)
    }

    pub fn with_control(
        parameters: BootstrapParameters,
        settings: BootstrapSettings,
        control: Box<dyn ModelControl>,
        shutdown: Shutdown,
    ) -> Self {
        let board = StatusBoard::new(settings.model_name.clone(), parameters.base_model.clone());
        Self {
            parameters,
            settings,
            control,
            board,
            shutdown,
        }
    }

    pub fn status_board(&self) -> StatusBoard {
        self.board.clone()
    }

    /// Returns the daemon's exit code once it stops on its own.
    pub async fn run(self) -> Result<i32> {
        let mut daemon = match launch(&self.settings.daemon) {
            Ok(daemon) => daemon,
            Err(err) => {
                tracing::error!(phase = %Phase::Launching, error = %err, "Bootstrap phase failed");
                self.board.terminate(err.exit_code()).await;
                return Err(err);
            }
        };

        if let Err(err) = self.bootstrap(&mut daemon).await {
            return Err(self.abort(&mut daemon, err).await);
        }

        self.enter(Phase::Supervising).await;
        let outcome = supervise(&mut daemon, self.shutdown.token(), self.settings.shutdown_grace).await;

        match outcome {
            Ok(Supervised::Exited(code)) => {
                self.board.terminate(code).await;
                Ok(code)
            }
            Ok(Supervised::Stopped(code)) => {
                tracing::info!(daemon_exit_code = code, "Daemon stopped on shutdown request");
                let err = BootstrapError::SupervisorInterrupted {
                    signal: self.shutdown.received(),
                };
                self.board.terminate(err.exit_code()).await;
                Err(err)
            }
            Err(err) => {
                self.board.terminate(err.exit_code()).await;
                Err(err)
            }
        }
    }

    // Everything between launch and supervision. The daemon is stopped by the caller
    // if any of this fails.
    async fn bootstrap(&self, daemon: &mut DaemonProcess) -> Result<()> {
        self.enter(Phase::Polling).await;
        let poller = ReadinessPoller::new(self.settings.poll_interval, self.settings.ready_timeout);

        let attempts = tokio::select! {
            ready = poller.wait_ready(&*self.control, self.shutdown.token()) => ready?,
            status = daemon.wait() => {
                let detail = match status {
                    Ok(status) => format!("daemon exited during startup with code {}", exit_code(&status)),
                    Err(err) => format!("lost track of daemon during startup: {}", err),
                };
                return Err(BootstrapError::DaemonLaunchFailed(detail));
            }
        };

        self.enter(Phase::Ready).await;
        self.board.record_ready(attempts).await;

        self.enter(Phase::Configuring).await;
        let document = ModelfileDocument::render(&self.parameters);
        self.interruptible(document.write_to(&self.settings.modelfile_path))
            .await??;

        self.enter(Phase::Registering).await;
        let registered = self
            .interruptible(register(
                &*self.control,
                &self.settings.model_name,
                &document,
                &self.settings.modelfile_path,
            ))
            .await?;

        match registered {
            Ok(()) => self.board.record_registered().await,
            Err(err) if self.settings.keep_serving_on_registration_failure => {
                tracing::error!(
                    error = %err,
                    model = %self.settings.model_name,
                    "ModelRegistrationFailed; daemon keeps serving without the custom model"
                );
            }
            Err(err) => return Err(err),
        }

        Ok(())
    }

    // Dropping `step` on shutdown kills any control subprocess it spawned.
    async fn interruptible<F: Future>(&self, step: F) -> Result<F::Output> {
        tokio::select! {
            output = step => Ok(output),
            _ = self.shutdown.token().cancelled() => {
                Err(BootstrapError::SupervisorInterrupted { signal: None })
            }
        }
    }

    async fn abort(&self, daemon: &mut DaemonProcess, err: BootstrapError) -> BootstrapError {
        let phase = self.board.snapshot().await.phase;
        let err = match err {
            BootstrapError::SupervisorInterrupted { .. } => BootstrapError::SupervisorInterrupted {
                signal: self.shutdown.received(),
            },
            other => other,
        };

        tracing::error!(%phase, error = %err, "Bootstrap phase failed, stopping daemon");
        stop(daemon, self.settings.shutdown_grace).await;
        self.board.terminate(err.exit_code()).await;
        err
    }

    async fn enter(&self, phase: Phase) {
        if let Err(err) = self.board.advance(phase).await {
            tracing::warn!(error = %err, "Ignoring out-of-order phase change");
        }
    }
}
