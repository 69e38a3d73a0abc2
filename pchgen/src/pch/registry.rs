// SPDX-License-Identifier: GPL-3.0-or-later

//! In-memory receivers of precompiled header outcomes.
//!
//! The registries are cheap to clone: every clone shares the same state, so
//! one clone can be handed to the creator while another one is queried.

use super::{
    IdPaths, PathWatcher, PchManagerClient, PrecompiledHeadersUpdatedMessage, ProgressMessage,
    ProjectPartPch,
};
use crate::file_paths::FilePathId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Unknown project part: {0}")]
    UnknownProjectPart(String),
}

/// Keeps the latest precompiled header of every project part.
#[derive(Clone, Debug, Default)]
pub struct PchRegistry {
    inner: Arc<Mutex<PchRegistryState>>,
}

#[derive(Debug, Default)]
struct PchRegistryState {
    pchs: HashMap<String, ProjectPartPch>,
    last_progress: Option<ProgressMessage>,
}

impl PchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, project_part_id: &str) -> Result<ProjectPartPch, RegistryError> {
        self.lock()
            .pchs
            .get(project_part_id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownProjectPart(project_part_id.to_string()))
    }

    pub fn remove(&self, project_part_id: &str) -> Result<ProjectPartPch, RegistryError> {
        self.lock()
            .pchs
            .remove(project_part_id)
            .ok_or_else(|| RegistryError::UnknownProjectPart(project_part_id.to_string()))
    }

    /// The known project part ids, sorted.
    pub fn project_part_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().pchs.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn last_progress(&self) -> Option<ProgressMessage> {
        self.lock().last_progress
    }

    fn lock(&self) -> MutexGuard<'_, PchRegistryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PchManagerClient for PchRegistry {
    fn precompiled_headers_updated(&mut self, message: PrecompiledHeadersUpdatedMessage) {
        let mut state = self.lock();
        for pch in message.project_part_pchs {
            log::debug!("Precompiled header of '{}': {pch:?}", pch.project_part_id);
            state.pchs.insert(pch.project_part_id.clone(), pch);
        }
    }

    fn progress(&mut self, message: ProgressMessage) {
        log::trace!("Progress: {}/{}", message.progress, message.total);
        self.lock().last_progress = Some(message);
    }
}

/// Keeps the watched files of every project part.
#[derive(Clone, Debug, Default)]
pub struct WatchRegistry {
    inner: Arc<Mutex<HashMap<String, Vec<FilePathId>>>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watched(&self, project_part_id: &str) -> Result<Vec<FilePathId>, RegistryError> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(project_part_id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownProjectPart(project_part_id.to_string()))
    }
}

impl PathWatcher for WatchRegistry {
    fn update_id_paths(&mut self, id_paths: Vec<IdPaths>) {
        let mut watched = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for IdPaths { id, file_path_ids } in id_paths {
            log::debug!("Watching {} files for '{id}'", file_path_ids.len());
            watched.insert(id, file_path_ids);
        }
    }
}
