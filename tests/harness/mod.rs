//! Shell-script stand-in for the inference daemon.
//!
//! The script answers `serve`, `list` and `create` the way the real daemon's CLI
//! does, and leaves marker files in its state directory so tests can see what it
//! was asked to do.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use model_bootstrap::{BootstrapParameters, BootstrapSettings, ControlTransport, DaemonCommand};
use tempfile::TempDir;

pub const HEADER: &str = "NAME                ID              SIZE      MODIFIED";

pub struct FakeDaemon {
    pub dir: TempDir,
    pub script: PathBuf,
}

/// How the fake daemon behaves for each subcommand. Bodies are `sh` snippets;
/// `$STATE` is the state directory.
pub struct Behavior {
    pub serve: String,
    pub list: String,
    pub create: String,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            // stay up until something got created, then exit like a crashed daemon
            serve: "while [ ! -f \"$STATE/created\" ]; do sleep 0.05; done\nexit 1".to_string(),
            list: format!("echo '{}'", HEADER),
            create: "cp \"$3\" \"$STATE/created-$1\"\ntouch \"$STATE/created\"".to_string(),
        }
    }
}

impl Behavior {
    /// `list` prints nothing for the first `n` calls.
    pub fn not_ready_for(mut self, n: u32) -> Self {
        self.list = format!(
            "n=$(cat \"$STATE/list-count\" 2>/dev/null || echo 0)\n\
             n=$((n + 1))\n\
             echo $n > \"$STATE/list-count\"\n\
             if [ $n -gt {} ]; then echo '{}'; fi",
            n, HEADER
        );
        self
    }
}

impl FakeDaemon {
    pub fn new(behavior: Behavior) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("fake-ollama.sh");
        let body = format!(
            "STATE='{state}'\n\
             cmd=$1\n\
             shift\n\
             case \"$cmd\" in\n\
             serve)\n{serve}\n;;\n\
             list)\n{list}\n;;\n\
             create)\n\
             echo \"$@\" >> \"$STATE/create-calls\"\n\
             {create}\n;;\n\
             *) echo \"unknown command $cmd\" >&2; exit 2;;\n\
             esac\n",
            state = dir.path().display(),
            serve = behavior.serve,
            list = behavior.list,
            create = behavior.create,
        );
        std::fs::write(&script, body).expect("write fake daemon");
        Self { dir, script }
    }

    pub fn command(&self) -> DaemonCommand {
        DaemonCommand::new("/bin/sh").with_args([self.script.clone()])
    }

    pub fn state(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.dir.path().join(name)).ok()
    }

    pub fn list_calls(&self) -> u32 {
        self.state("list-count")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn modelfile_path(&self) -> PathBuf {
        self.dir.path().join("out").join("Modelfile")
    }

    pub fn settings(&self) -> BootstrapSettings {
        BootstrapSettings {
            model_name: "custom-model".to_string(),
            modelfile_path: self.modelfile_path(),
            daemon: self.command(),
            control: ControlTransport::Cli,
            daemon_url: "http://127.0.0.1:11434".to_string(),
            poll_interval: Duration::from_millis(20),
            ready_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(2),
            keep_serving_on_registration_failure: false,
            health_addr: None,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

pub fn reference_parameters() -> BootstrapParameters {
    BootstrapParameters::new("llama3:8b", 4096, 0.3).expect("valid parameters")
}
