// SPDX-License-Identifier: GPL-3.0-or-later

//! Interning of file paths into stable integer identifiers.
//!
//! Precompiled header tasks refer to the headers they include and watch by
//! identifier. The persistent path database of an IDE is not part of this
//! crate; the in-memory [`FilePathCache`] is enough for a single session.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Stable identifier of an interned file path.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilePathId(pub u32);

impl fmt::Display for FilePathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps file paths to identifiers and back.
#[cfg_attr(test, mockall::automock)]
pub trait FilePathCaching: Send + Sync {
    /// Returns the identifier of the path, interning it on first use.
    fn file_path_id(&self, path: &str) -> FilePathId;

    /// Returns the path of an identifier previously handed out.
    fn file_path(&self, id: FilePathId) -> Result<String, FilePathCacheError>;
}

#[derive(Debug, Error, PartialEq)]
pub enum FilePathCacheError {
    #[error("Unknown file path id: {0}")]
    UnknownId(FilePathId),
}

/// In-memory path interner.
#[derive(Debug, Default)]
pub struct FilePathCache {
    inner: Mutex<Interner>,
}

#[derive(Debug, Default)]
struct Interner {
    ids: HashMap<String, FilePathId>,
    paths: Vec<String>,
}

impl FilePathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns all paths, keeping their order.
    pub fn file_path_ids<S: AsRef<str>>(&self, paths: &[S]) -> Vec<FilePathId> {
        paths.iter().map(|path| self.file_path_id(path.as_ref())).collect()
    }
}

impl FilePathCaching for FilePathCache {
    fn file_path_id(&self, path: &str) -> FilePathId {
        let mut interner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = interner.ids.get(path) {
            return *id;
        }
        let id = FilePathId(interner.paths.len() as u32);
        interner.paths.push(path.to_string());
        interner.ids.insert(path.to_string(), id);
        id
    }

    fn file_path(&self, id: FilePathId) -> Result<String, FilePathCacheError> {
        let interner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        interner
            .paths
            .get(id.0 as usize)
            .cloned()
            .ok_or(FilePathCacheError::UnknownId(id))
    }
}
