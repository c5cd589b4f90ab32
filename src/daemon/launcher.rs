use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;

use super::DaemonCommand;
use crate::error::{BootstrapError, Result};

/// The background `serve` process. Only the orchestrator holds it.
pub struct DaemonProcess {
    child: Child,
    pid: Option<u32>,
    log_tasks: Vec<JoinHandle<()>>,
}

/// Start `<program> serve` in the background and forward its output to the log.
pub fn launch(daemon: &DaemonCommand) -> Result<DaemonProcess> {
    let mut cmd = daemon.command();
    cmd.arg("serve")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    // Own process group: a terminal ^C reaches only us, and we forward it.
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            if err.kind() == io::ErrorKind::NotFound {
                tracing::error!(program = %daemon.program.display(), "Daemon binary not found in PATH");
            }
            return Err(BootstrapError::DaemonLaunchFailed(format!(
                "{}: {}",
                daemon.program.display(),
                err
            )));
        }
    };

    let pid = child.id();
    tracing::info!(pid, program = %daemon.program.display(), "Daemon started");

    let mut log_tasks = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        log_tasks.push(tokio::spawn(log_lines(stdout, "stdout")));
    }
    if let Some(stderr) = child.stderr.take() {
        log_tasks.push(tokio::spawn(log_lines(stderr, "stderr")));
    }

    Ok(DaemonProcess {
        child,
        pid,
        log_tasks,
    })
}

// Reads until EOF no matter what the daemon prints: dropping the pipe early would
// kill it with SIGPIPE on its next write.
async fn log_lines<R: AsyncRead + Unpin>(reader: R, stream: &'static str) {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                tracing::info!(target: "daemon", stream, "{}", text.trim_end_matches(['\r', '\n']));
            }
            Err(err) => {
                tracing::warn!(stream, error = %err, "Stopped forwarding daemon output");
                break;
            }
        }
    }
}

impl DaemonProcess {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Resolves when the daemon exits. Cancel safe.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait().await?;
        self.drain_logs().await;
        Ok(status)
    }

    /// SIGTERM the daemon, then SIGKILL it if it is still running after `grace`.
    pub async fn terminate(&mut self, grace: Duration) -> io::Result<ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(status);
        }

        tracing::info!(pid = self.pid, "Terminating daemon");
        self.send_sigterm();

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                tracing::info!(pid = self.pid, "Daemon terminated");
                self.drain_logs().await;
                Ok(status)
            }
            Err(_) => {
                tracing::warn!(pid = self.pid, ?grace, "Daemon ignored SIGTERM, killing");
                self.child.kill().await?;
                let status = self.child.wait().await?;
                tracing::info!(pid = self.pid, "Daemon killed");
                Ok(status)
            }
        }
    }

    #[cfg(unix)]
    fn send_sigterm(&mut self) {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        let Some(pid) = self.pid else { return };
        if let Err(err) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            tracing::warn!(pid, error = %err, "Failed to deliver SIGTERM to daemon");
        }
    }

    #[cfg(not(unix))]
    fn send_sigterm(&mut self) {
        if let Err(err) = self.child.start_kill() {
            tracing::warn!(pid = self.pid, error = %err, "Failed to stop daemon");
        }
    }

    // Give the forwarders a moment to flush the daemon's last lines.
    async fn drain_logs(&mut self) {
        for task in self.log_tasks.drain(..) {
            let _ = tokio::time::timeout(Duration::from_millis(500), task).await;
        }
    }
}

/// Exit code the container should report for a daemon exit status.
pub fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signo) = status.signal() {
            return 128 + signo;
        }
    }

    1
}
