// SPDX-License-Identifier: GPL-3.0-or-later

//! Project part descriptions.
//!
//! A project part is the unit a precompiled header is generated for: a set
//! of headers compiled with the same settings. The description carries the
//! raw header paths as the build system reports them. They are run through
//! the [`HeaderPathFilter`] with the configured tool chain before they become
//! a [`CompilationRequest`].
//!
//! ```json
//! {
//!   "id": "project1",
//!   "language": "cxx",
//!   "language_version": "c++17",
//!   "language_extensions": { "gnu": false, "objective_c": false },
//!   "macros": [ { "key": "DEFINE", "value": "1", "index": 1 } ],
//!   "header_paths": [
//!     { "path": "/project/includes", "type": "user" },
//!     { "path": "/usr/include", "type": "builtin" }
//!   ],
//!   "includes": [ "/project/includes/header.h" ]
//! }
//! ```

use crate::config::Toolchain;
use crate::file_paths::FilePathCaching;
use crate::header_paths::{FilteredHeaderPaths, HeaderPathFilter};
use crate::model::{
    CompilationRequest, CompilerMacro, HeaderPath, IncludeSearchPath, Language, LanguageExtensions,
    LanguageVersion,
};
use crate::pch::PchTask;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The description of a project part.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectPart {
    pub id: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub language_version: LanguageVersion,
    #[serde(default)]
    pub language_extensions: LanguageExtensions,
    #[serde(default)]
    pub macros: Vec<CompilerMacro>,
    #[serde(default)]
    pub header_paths: Vec<HeaderPath>,
    /// Headers to precompile.
    #[serde(default)]
    pub includes: Vec<String>,
    /// Files to watch after the generation; the includes when missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_pch: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Failed to access project description '{path}': {source}", path = path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse project description '{path}': {source}", path = path.display())]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Project description '{path}' has no id", path = path.display())]
    MissingId { path: PathBuf },
}

impl ProjectPart {
    /// Reads a project part description from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        log::debug!("Loading project description: {}", path.display());

        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|source| ProjectError::FileAccess { path: path.to_path_buf(), source })?;
        let project_part: ProjectPart = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| ProjectError::ParseError { path: path.to_path_buf(), source })?;

        if project_part.id.is_empty() {
            return Err(ProjectError::MissingId { path: path.to_path_buf() });
        }
        Ok(project_part)
    }

    /// Runs the header path filter with the tool chain settings.
    pub fn filtered_header_paths(&self, toolchain: &Toolchain) -> FilteredHeaderPaths {
        HeaderPathFilter::new(
            &self.header_paths,
            &toolchain.target_triple,
            toolchain.use_tweaked_header_paths(),
        )
        .compiler_version(toolchain.compiler_version.as_deref())
        .resource_dir(toolchain.resource_dir.as_deref())
        .process()
    }

    /// The compilation request of the project part.
    ///
    /// Priority indices follow the filter output: user paths first, then the
    /// system paths, then the built-in paths.
    pub fn compilation_request(&self, toolchain: &Toolchain) -> CompilationRequest {
        let filtered = self.filtered_header_paths(toolchain);

        let project_include_search_paths = indexed(&filtered.user, 1);
        let first_system_index = project_include_search_paths.len() as i32 + 1;
        let system_include_search_paths =
            indexed(filtered.system.iter().chain(&filtered.built_in), first_system_index);

        CompilationRequest {
            language: self.language,
            language_version: self.language_version.clone(),
            language_extensions: self.language_extensions,
            compiler_macros: self.macros.clone(),
            project_include_search_paths,
            system_include_search_paths,
        }
    }

    /// The precompiled header task of the project part.
    pub fn pch_task(&self, toolchain: &Toolchain, file_path_cache: &dyn FilePathCaching) -> PchTask {
        let intern = |paths: &[String]| -> Vec<_> {
            paths.iter().map(|path| file_path_cache.file_path_id(path)).collect()
        };

        PchTask {
            project_part_id: self.id.clone(),
            includes: intern(self.includes.as_slice()),
            watched_paths: intern(self.watched.as_deref().unwrap_or(self.includes.as_slice())),
            request: self.compilation_request(toolchain),
            toolchain_arguments: toolchain.arguments.clone(),
            system_pch_path: self.system_pch.clone(),
        }
    }
}

fn indexed<'a>(paths: impl IntoIterator<Item = &'a HeaderPath>, first_index: i32) -> Vec<IncludeSearchPath> {
    paths
        .into_iter()
        .zip(first_index..)
        .map(|(header_path, index)| IncludeSearchPath::new(header_path.path.clone(), index, header_path.kind))
        .collect()
}
