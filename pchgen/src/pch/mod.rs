// SPDX-License-Identifier: GPL-3.0-or-later

//! Precompiled header generation for project parts.
//!
//! A [`PchTask`] lists the headers a project part wants precompiled. The
//! [`creator::PchCreator`] writes an umbrella header including all of them,
//! runs the compiler out of process and reports the outcome to two
//! collaborators:
//!
//! - [`PchManagerClient`]: receives the resulting [`ProjectPartPch`] and
//!   progress messages.
//! - [`PathWatcher`]: receives the set of files to watch for the project part.
//!   A failed task reports an empty set, so a broken configuration does not
//!   trigger rebuilds on every header change.

pub mod creator;
pub mod registry;
pub mod supervise;

use crate::file_paths::{FilePathCacheError, FilePathId};
use crate::model::CompilationRequest;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use thiserror::Error;

pub use creator::{PchCreator, PchEnvironment, PchTaskState};
pub use supervise::{ProcessReport, ProcessRunner, SuperviseError, SystemProcessRunner};

/// The headers of a project part to precompile, and how to compile them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PchTask {
    pub project_part_id: String,
    /// Headers to include in the umbrella header, in this order.
    pub includes: Vec<FilePathId>,
    /// Files to watch after a successful generation.
    pub watched_paths: Vec<FilePathId>,
    pub request: CompilationRequest,
    pub toolchain_arguments: Vec<String>,
    /// An existing precompiled header the new one builds on.
    pub system_pch_path: Option<PathBuf>,
}

impl PchTask {
    pub fn new(
        project_part_id: impl Into<String>,
        includes: Vec<FilePathId>,
        watched_paths: Vec<FilePathId>,
    ) -> Self {
        Self {
            project_part_id: project_part_id.into(),
            includes,
            watched_paths,
            ..Default::default()
        }
    }
}

/// The precompiled header of a project part.
///
/// A failed or cleared generation has an empty path and `-1` as modification
/// time; a successful one has both set.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProjectPartPch {
    pub project_part_id: String,
    pub pch_path: PathBuf,
    pub last_modified: i64,
}

impl ProjectPartPch {
    pub fn succeeded(project_part_id: impl Into<String>, pch_path: PathBuf, last_modified: i64) -> Self {
        Self { project_part_id: project_part_id.into(), pch_path, last_modified }
    }

    pub fn failed(project_part_id: impl Into<String>) -> Self {
        Self { project_part_id: project_part_id.into(), ..Default::default() }
    }

    pub fn is_valid(&self) -> bool {
        !self.pch_path.as_os_str().is_empty() && self.last_modified != -1
    }
}

impl Default for ProjectPartPch {
    fn default() -> Self {
        Self { project_part_id: String::new(), pch_path: PathBuf::new(), last_modified: -1 }
    }
}

/// The files watched for a project part.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct IdPaths {
    pub id: String,
    pub file_path_ids: Vec<FilePathId>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PrecompiledHeadersUpdatedMessage {
    pub project_part_pchs: Vec<ProjectPartPch>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ProgressType {
    PrecompiledHeader,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProgressMessage {
    pub kind: ProgressType,
    pub progress: usize,
    pub total: usize,
}

impl ProgressMessage {
    pub fn precompiled_header(progress: usize, total: usize) -> Self {
        Self { kind: ProgressType::PrecompiledHeader, progress, total }
    }
}

/// Receives the outcome of precompiled header tasks.
#[cfg_attr(test, mockall::automock)]
pub trait PchManagerClient: Send {
    fn precompiled_headers_updated(&mut self, message: PrecompiledHeadersUpdatedMessage);

    fn progress(&mut self, message: ProgressMessage);
}

/// Watches files on behalf of project parts.
#[cfg_attr(test, mockall::automock)]
pub trait PathWatcher: Send {
    /// Replaces the watched files of every listed project part.
    fn update_id_paths(&mut self, id_paths: Vec<IdPaths>);
}

/// The file system operations the creator needs.
#[cfg_attr(test, mockall::automock)]
pub trait FileSystem: Send + Sync {
    fn create_directory(&self, path: &Path) -> io::Result<()>;

    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()>;

    /// Modification time in seconds since the epoch.
    fn last_modified(&self, path: &Path) -> io::Result<i64>;
}

/// [`FileSystem`] backed by the local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn create_directory(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn last_modified(&self, path: &Path) -> io::Result<i64> {
        let modified = std::fs::metadata(path)?.modified()?;
        let since_epoch = modified.duration_since(UNIX_EPOCH).map_err(io::Error::other)?;
        Ok(since_epoch.as_secs() as i64)
    }
}

/// Errors of the precompiled header creator.
///
/// Most of them are contract violations of the caller. A compiler which
/// can't be started or fails is not an error: the task ends as failed.
#[derive(Debug, Error)]
pub enum PchError {
    #[error("No precompiled header task was started")]
    NoPendingTask,
    #[error("Precompiled header task for '{project_part_id}' is still running")]
    TaskRunning { project_part_id: String },
    #[error(transparent)]
    FilePath(#[from] FilePathCacheError),
    #[error("Failed to write umbrella header '{path}': {source}", path = path.display())]
    UmbrellaFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Process(#[from] SuperviseError),
    #[error("Compiler worker terminated without reporting")]
    WorkerLost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_part_pch_default_is_invalid() {
        let sut = ProjectPartPch::default();

        assert!(sut.project_part_id.is_empty());
        assert!(sut.pch_path.as_os_str().is_empty());
        assert_eq!(sut.last_modified, -1);
        assert!(!sut.is_valid());
    }

    #[test]
    fn test_project_part_pch_failed_keeps_id() {
        let sut = ProjectPartPch::failed("project1");

        assert_eq!(sut.project_part_id, "project1");
        assert!(!sut.is_valid());
    }

    #[test]
    fn test_project_part_pch_succeeded_is_valid() {
        let sut = ProjectPartPch::succeeded("project1", PathBuf::from("/tmp/project1.pch"), 1700000000);

        assert!(sut.is_valid());
    }

    #[test]
    fn test_local_file_system_round() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = temp_dir.path().join("nested/pch");
        let file = directory.join("umbrella.h");
        let sut = LocalFileSystem;

        sut.create_directory(&directory).unwrap();
        sut.write_file(&file, b"#include \"a.h\"\n").unwrap();

        assert_eq!(std::fs::read_to_string(&file).unwrap(), "#include \"a.h\"\n");
        assert!(sut.last_modified(&file).unwrap() > 0);
        assert!(sut.last_modified(&directory.join("missing.pch")).is_err());
    }
}
