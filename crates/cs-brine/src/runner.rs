//! External equilibrium-solver invocation.
//!
//! Each run gets its own temporary directory holding the deck, the selected
//! output table and the solver transcript. The directory is removed when the run
//! ends, whatever the outcome, unless `keep_workdirs` is set.

use crate::cancel::CancelToken;
use crate::config::SolverConfig;
use crate::deck::{Deck, OUTPUT_FILE_NAME};
use crate::error::{BrineError, BrineResult};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, warn};

pub const INPUT_FILE_NAME: &str = "input.pqi";
pub const TRANSCRIPT_FILE_NAME: &str = "output.pqo";

/// Prefix of per-run working directories.
pub const WORKDIR_PREFIX: &str = "cs-run-";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs the equilibrium solver on rendered decks.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    executable: PathBuf,
    timeout: Duration,
    work_root: Option<PathBuf>,
    keep_workdirs: bool,
}

impl ProcessRunner {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            timeout: Duration::from_secs(120),
            work_root: None,
            keep_workdirs: false,
        }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            executable: config.phreeqc_executable.clone(),
            timeout: config.timeout(),
            work_root: config.work_root.clone(),
            keep_workdirs: config.keep_workdirs,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Run the solver on `deck` and return the selected-output table.
    pub fn run(&self, deck: &Deck, cancel: &CancelToken) -> BrineResult<String> {
        if cancel.is_cancelled() {
            return Err(BrineError::Cancelled);
        }

        let workdir = self.create_workdir()?;
        let dir = workdir.path();
        let input = dir.join(INPUT_FILE_NAME);
        std::fs::write(&input, &deck.script).map_err(|e| BrineError::io(&input, e))?;

        debug!(
            executable = %self.executable.display(),
            workdir = %dir.display(),
            kind = %deck.kind,
            "Starting solver"
        );

        let status = self.execute(dir, cancel)?;

        let output = dir.join(OUTPUT_FILE_NAME);
        if !output.is_file() {
            return Err(BackendFailure::NoOutput(status).into());
        }
        if !status.success() {
            warn!(%status, "Solver exited abnormally but wrote output; using it");
        }
        let table = std::fs::read_to_string(&output).map_err(|e| BrineError::io(&output, e))?;

        if self.keep_workdirs {
            debug!(workdir = %dir.display(), "Keeping solver working directory");
        }
        Ok(table)
    }

    fn create_workdir(&self) -> BrineResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKDIR_PREFIX).keep(self.keep_workdirs);
        let created = match &self.work_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        created.map_err(|e| {
            BrineError::io(
                self.work_root.clone().unwrap_or_else(std::env::temp_dir),
                e,
            )
        })
    }

    fn execute(&self, dir: &Path, cancel: &CancelToken) -> BrineResult<ExitStatus> {
        let mut child = Command::new(&self.executable)
            .arg(INPUT_FILE_NAME)
            .arg(TRANSCRIPT_FILE_NAME)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| BackendFailure::Spawn(self.executable.clone(), e))?;

        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(%status, elapsed_ms = started.elapsed().as_millis() as u64, "Solver finished");
                    return Ok(status);
                }
                Ok(None) => {}
                Err(e) => return Err(BackendFailure::Wait(e).into()),
            }

            let abort = if cancel.is_cancelled() {
                Some(BrineError::Cancelled)
            } else if started.elapsed() >= self.timeout {
                Some(BrineError::Timeout {
                    secs: self.timeout.as_secs(),
                })
            } else {
                None
            };

            if let Some(err) = abort {
                warn!(error = %err, "Killing solver process");
                // The child may already have exited between polls.
                let _ = child.kill();
                let _ = child.wait();
                return Err(err);
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Ways the solver can fail without producing a table.
enum BackendFailure {
    Spawn(PathBuf, std::io::Error),
    Wait(std::io::Error),
    NoOutput(ExitStatus),
}

impl From<BackendFailure> for BrineError {
    fn from(failure: BackendFailure) -> Self {
        let message = match failure {
            BackendFailure::Spawn(exe, e) => format!("failed to start {}: {}", exe.display(), e),
            BackendFailure::Wait(e) => format!("failed waiting for solver: {}", e),
            BackendFailure::NoOutput(status) => {
                format!("solver exited with {} and wrote no {}", status, OUTPUT_FILE_NAME)
            }
        };
        BrineError::BackendExecution { message }
    }
}
