// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The outcome of a finished compiler process.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ProcessReport {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

impl ProcessReport {
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a command line to completion.
///
/// The first argument is the executable. Implementations must return soon
/// after `cancel` becomes true.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessRunner: Send + Sync {
    fn run(&self, arguments: &[String], cancel: &AtomicBool) -> Result<ProcessReport, SuperviseError>;
}

/// [`ProcessRunner`] which starts a child process with inherited standard streams.
///
/// The runner never installs signal handlers. Callers which want to stop the
/// compiler on a termination signal register the handlers themselves and
/// hand over the flag they set with [`SystemProcessRunner::with_interrupt`].
#[derive(Debug, Default, Clone)]
pub struct SystemProcessRunner {
    interrupt: Arc<AtomicBool>,
}

impl SystemProcessRunner {
    /// Kills every running child once `interrupt` becomes true.
    pub fn with_interrupt(interrupt: Arc<AtomicBool>) -> Self {
        Self { interrupt }
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, arguments: &[String], cancel: &AtomicBool) -> Result<ProcessReport, SuperviseError> {
        let (program, arguments) = arguments.split_first().ok_or(SuperviseError::EmptyCommand)?;
        log::debug!("Running compiler: {program} {arguments:?}");

        let mut command = Command::new(program);
        command.args(arguments);
        supervise(&mut command, &[cancel, self.interrupt.as_ref()])
    }
}

/// Supervises the execution of a command.
///
/// Starts the command and waits for its completion. The child is killed
/// when any of the `stop` flags is set.
pub fn supervise(command: &mut Command, stop: &[&AtomicBool]) -> Result<ProcessReport, SuperviseError> {
    let executable = PathBuf::from(command.get_program());
    wait_for_child(command, &executable, stop)
}

fn wait_for_child(
    command: &mut Command,
    executable: &Path,
    stop: &[&AtomicBool],
) -> Result<ProcessReport, SuperviseError> {
    let started = Instant::now();
    let mut child = command
        .spawn()
        .map_err(|err| SuperviseError::ProcessSpawn { executable: executable.to_path_buf(), source: err })?;

    let mut killed = false;
    loop {
        if !killed && stop.iter().any(|flag| flag.load(Ordering::SeqCst)) {
            log::debug!("Terminating child process: {}", executable.display());
            child
                .kill()
                .map_err(|err| SuperviseError::ProcessKill { executable: executable.to_path_buf(), source: err })?;
            killed = true;
        }

        match child.try_wait() {
            Ok(Some(exit_status)) => {
                let report = ProcessReport { exit_code: exit_status.code(), elapsed: started.elapsed() };
                log::debug!("Child process exited: {exit_status:?} after {:?}", report.elapsed);
                return Ok(report);
            }
            Ok(None) => {
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                log::error!("Error waiting for child process: {err}");
                return Err(SuperviseError::ProcessWait { executable: executable.to_path_buf(), source: err });
            }
        }
    }
}

/// Errors that can occur during process supervision.
#[derive(Error, Debug)]
pub enum SuperviseError {
    #[error("Empty command line")]
    EmptyCommand,
    #[error("Failed to execute '{executable}': {source}", executable = executable.display())]
    ProcessSpawn {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to kill process '{executable}': {source}", executable = executable.display())]
    ProcessKill {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to wait for process '{executable}': {source}", executable = executable.display())]
    ProcessWait {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
