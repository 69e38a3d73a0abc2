// SPDX-License-Identifier: GPL-3.0-or-later

use super::supervise::{ProcessReport, ProcessRunner};
use super::{
    FileSystem, IdPaths, PathWatcher, PchError, PchManagerClient, PchTask, PrecompiledHeadersUpdatedMessage,
    ProgressMessage, ProjectPartPch,
};
use crate::command_line::CommandLineBuilder;
use crate::file_paths::{FilePathCaching, FilePathId};
use crossbeam_channel::{Receiver, TryRecvError, bounded};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// Where the creator puts its generated files.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PchEnvironment {
    pub pch_directory: PathBuf,
}

impl PchEnvironment {
    pub fn new(pch_directory: impl Into<PathBuf>) -> Self {
        Self { pch_directory: pch_directory.into() }
    }
}

impl Default for PchEnvironment {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("pchgen"))
    }
}

/// Lifecycle of the current task.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PchTaskState {
    Idle,
    UmbrellaGenerated,
    CompilerRunning,
    Succeeded,
    Failed,
    Cleared,
}

type JobOutcome = Result<ProcessReport, PchError>;

/// A compiler invocation running on a worker thread.
struct CompilerJob {
    project_part_id: String,
    pch_path: PathBuf,
    watched_paths: Vec<FilePathId>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    outcome: Receiver<JobOutcome>,
}

impl CompilerJob {
    fn start(runner: Arc<dyn ProcessRunner>, arguments: Vec<String>, task: &PchTask, pch_path: PathBuf) -> Self {
        let (sender, receiver) = bounded(1);
        let cancel = Arc::new(AtomicBool::new(false));
        let worker = {
            let cancel = Arc::clone(&cancel);
            thread::spawn(move || {
                let outcome = runner.run(&arguments, &cancel).map_err(PchError::from);
                // The receiver is gone when the job was discarded.
                let _ = sender.send(outcome);
            })
        };
        Self {
            project_part_id: task.project_part_id.clone(),
            pch_path,
            watched_paths: task.watched_paths.clone(),
            cancel,
            worker: Some(worker),
            outcome: receiver,
        }
    }

    /// A job which failed before the compiler could be started.
    fn failed(task: &PchTask, error: PchError) -> Self {
        let (sender, receiver) = bounded(1);
        let _ = sender.send(Err(error));
        Self {
            project_part_id: task.project_part_id.clone(),
            pch_path: PathBuf::new(),
            watched_paths: task.watched_paths.clone(),
            cancel: Arc::new(AtomicBool::new(false)),
            worker: None,
            outcome: receiver,
        }
    }

    fn wait(&mut self) -> JobOutcome {
        let outcome = self.outcome.recv().unwrap_or(Err(PchError::WorkerLost));
        self.join();
        outcome
    }

    fn try_wait(&mut self) -> Option<JobOutcome> {
        let outcome = match self.outcome.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(PchError::WorkerLost),
        };
        self.join();
        Some(outcome)
    }

    fn cancel(mut self) {
        log::debug!("Cancelling precompiled header task for '{}'", self.project_part_id);
        self.cancel.store(true, Ordering::SeqCst);
        self.join();
    }

    fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Compiler worker of '{}' panicked", self.project_part_id);
            }
        }
    }
}

/// Generates the precompiled header of one project part at a time.
///
/// [`generate_pch`](PchCreator::generate_pch) writes the umbrella header and
/// starts the compiler. The outcome is collected by
/// [`finish`](PchCreator::finish) or [`try_finish`](PchCreator::try_finish),
/// which notify the watcher first and the client second.
pub struct PchCreator {
    environment: PchEnvironment,
    file_path_cache: Arc<dyn FilePathCaching>,
    runner: Arc<dyn ProcessRunner>,
    file_system: Arc<dyn FileSystem>,
    client: Box<dyn PchManagerClient>,
    watcher: Box<dyn PathWatcher>,
    state: PchTaskState,
    project_part_pch: ProjectPartPch,
    job: Option<CompilerJob>,
}

impl PchCreator {
    pub fn new(
        environment: PchEnvironment,
        file_path_cache: Arc<dyn FilePathCaching>,
        runner: Arc<dyn ProcessRunner>,
        file_system: Arc<dyn FileSystem>,
        client: Box<dyn PchManagerClient>,
        watcher: Box<dyn PathWatcher>,
    ) -> Self {
        Self {
            environment,
            file_path_cache,
            runner,
            file_system,
            client,
            watcher,
            state: PchTaskState::Idle,
            project_part_pch: ProjectPartPch::default(),
            job: None,
        }
    }

    pub fn state(&self) -> PchTaskState {
        self.state
    }

    /// The outcome of the last finished task.
    ///
    /// While a task runs this is still the outcome of the one before it.
    pub fn project_part_pch(&self) -> &ProjectPartPch {
        &self.project_part_pch
    }

    /// True when no compiler invocation is pending.
    pub fn is_clean(&self) -> bool {
        self.job.is_none()
    }

    /// Content of the umbrella header: one quoted include line per header.
    pub fn generate_pch_include_file_content(&self, includes: &[FilePathId]) -> Result<String, PchError> {
        let mut content = String::with_capacity(includes.len() * 64);
        for id in includes {
            let path = self.file_path_cache.file_path(*id)?;
            content.push_str("#include \"");
            content.push_str(&path);
            content.push_str("\"\n");
        }
        Ok(content)
    }

    /// Path of the umbrella header of a project part.
    ///
    /// The name is stable for the same project part id, and differs for ids
    /// which only differ in characters not allowed in file names.
    pub fn generate_pch_header_file_path(&self, project_part_id: &str) -> PathBuf {
        self.environment.pch_directory.join(format!("{}.h", file_stem(project_part_id)))
    }

    pub fn generate_pch_file_path(&self, project_part_id: &str) -> PathBuf {
        self.generate_pch_header_file_path(project_part_id).with_extension("pch")
    }

    pub fn generate_clang_compiler_arguments(task: &PchTask, source: &Path, output: &Path) -> Vec<String> {
        let builder = CommandLineBuilder::new(&task.request, &task.toolchain_arguments)
            .source(source)
            .output(output);
        match &task.system_pch_path {
            Some(system_pch) => builder.include_pch(system_pch).build(),
            None => builder.build(),
        }
    }

    /// Starts generating the precompiled header of a task.
    ///
    /// A task still running is cancelled and discarded without notification.
    /// Returns an error only when the task refers to unknown file path ids.
    pub fn generate_pch(&mut self, task: PchTask) -> Result<(), PchError> {
        if let Some(job) = self.job.take() {
            job.cancel();
        }
        self.state = PchTaskState::Idle;

        let content = self.generate_pch_include_file_content(&task.includes)?;
        let header_path = self.generate_pch_header_file_path(&task.project_part_id);
        let pch_path = self.generate_pch_file_path(&task.project_part_id);

        self.client.progress(ProgressMessage::precompiled_header(0, 1));
        if let Err(error) = self.write_umbrella_header(&header_path, &content) {
            log::warn!("{error}");
            self.job = Some(CompilerJob::failed(&task, error));
            return Ok(());
        }
        self.state = PchTaskState::UmbrellaGenerated;

        let arguments = Self::generate_clang_compiler_arguments(&task, &header_path, &pch_path);
        log::info!("Generating precompiled header for '{}': {}", task.project_part_id, pch_path.display());
        self.job = Some(CompilerJob::start(Arc::clone(&self.runner), arguments, &task, pch_path));
        self.state = PchTaskState::CompilerRunning;
        Ok(())
    }

    /// Waits for the running task and reports its outcome.
    pub fn finish(&mut self) -> Result<&ProjectPartPch, PchError> {
        let mut job = self.job.take().ok_or(PchError::NoPendingTask)?;
        let outcome = job.wait();
        self.complete(job, outcome);
        Ok(&self.project_part_pch)
    }

    /// Reports the outcome of the running task if it has already ended.
    pub fn try_finish(&mut self) -> Result<Option<&ProjectPartPch>, PchError> {
        let job = self.job.as_mut().ok_or(PchError::NoPendingTask)?;
        match job.try_wait() {
            Some(outcome) => {
                if let Some(job) = self.job.take() {
                    self.complete(job, outcome);
                }
                Ok(Some(&self.project_part_pch))
            }
            None => Ok(None),
        }
    }

    /// Resets the outcome of the last task.
    pub fn clear(&mut self) -> Result<(), PchError> {
        if let Some(job) = &self.job {
            return Err(PchError::TaskRunning { project_part_id: job.project_part_id.clone() });
        }
        self.project_part_pch = ProjectPartPch::default();
        self.state = PchTaskState::Cleared;
        Ok(())
    }

    fn write_umbrella_header(&self, path: &Path, content: &str) -> Result<(), PchError> {
        let to_error = |source| PchError::UmbrellaFile { path: path.to_path_buf(), source };

        self.file_system.create_directory(&self.environment.pch_directory).map_err(to_error)?;
        self.file_system.write_file(path, content.as_bytes()).map_err(to_error)?;
        log::debug!("Umbrella header written: {}", path.display());
        Ok(())
    }

    fn complete(&mut self, job: CompilerJob, outcome: JobOutcome) {
        let last_modified = match outcome {
            Ok(report) if report.is_success() => match self.file_system.last_modified(&job.pch_path) {
                Ok(last_modified) => Some(last_modified),
                Err(error) => {
                    log::warn!("Precompiled header '{}' is not readable: {error}", job.pch_path.display());
                    None
                }
            },
            Ok(report) => {
                log::warn!(
                    "Compiler failed for '{}' with exit code {:?}",
                    job.project_part_id,
                    report.exit_code
                );
                None
            }
            Err(error) => {
                log::warn!("Compiler failed for '{}': {error}", job.project_part_id);
                None
            }
        };

        let (project_part_pch, watched) = match last_modified {
            Some(last_modified) => {
                self.state = PchTaskState::Succeeded;
                let pch = ProjectPartPch::succeeded(job.project_part_id.clone(), job.pch_path, last_modified);
                (pch, job.watched_paths)
            }
            None => {
                self.state = PchTaskState::Failed;
                (ProjectPartPch::failed(job.project_part_id.clone()), vec![])
            }
        };
        log::info!("Precompiled header task for '{}' ended: {:?}", job.project_part_id, self.state);

        self.project_part_pch = project_part_pch.clone();
        self.watcher.update_id_paths(vec![IdPaths { id: job.project_part_id, file_path_ids: watched }]);
        self.client.precompiled_headers_updated(PrecompiledHeadersUpdatedMessage {
            project_part_pchs: vec![project_part_pch],
        });
        self.client.progress(ProgressMessage::precompiled_header(1, 1));
    }
}

impl Drop for PchCreator {
    fn drop(&mut self) {
        if let Some(job) = self.job.take() {
            job.cancel();
        }
    }
}

/// File name of the generated files, without extension.
fn file_stem(project_part_id: &str) -> String {
    let sanitized: String = project_part_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    // Generated file names must not change between builds.
    let digest = Sha256::digest(project_part_id.as_bytes());
    let hash: String = digest.iter().take(8).map(|byte| format!("{byte:02x}")).collect();
    format!("{sanitized}-{hash}")
}
