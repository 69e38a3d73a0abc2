// SPDX-License-Identifier: GPL-3.0-or-later

//! This module defines the configuration of the application.
//!
//! The configuration describes the tool chain the project parts are compiled
//! with, and where the precompiled headers are written. It is either loaded
//! from a file or used with default values, which are defined in the code.
//!
//! The configuration file syntax is based on the YAML format.
//! The default configuration file name is `pchgen.yml`.
//!
//! The configuration file location is searched in the following order:
//! 1. The current working directory
//! 2. The local configuration directory of the user
//! 3. The configuration directory of the user
//! 4. The local configuration directory of the application
//! 5. The configuration directory of the application
//!
//! ```yaml
//! schema: "1.0"
//!
//! toolchain:
//!   target_triple: x86_64-linux-gnu
//!   compiler_version: "17"
//!   resource_dir: /usr/lib/clang/17/include
//!   arguments: ["--target=x86_64-linux-gnu"]
//!   tweak_header_paths: true
//!
//! pch:
//!   directory: /tmp/pchgen
//! ```

// Re-Export the types and the loader module content.
pub use loader::{ConfigError, Loader};
pub use types::*;
pub use validation::Validator;

mod types {
    use crate::header_paths::UseTweakedHeaderPaths;
    use serde::Deserialize;
    use std::fmt;
    use std::path::PathBuf;

    pub(super) const SUPPORTED_SCHEMA_VERSION: &str = "1.0";

    /// Represents the application configuration.
    #[derive(Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Main {
        #[serde(deserialize_with = "validate_schema_version")]
        pub schema: String,
        #[serde(default)]
        pub toolchain: Toolchain,
        #[serde(default)]
        pub pch: Pch,
    }

    impl Default for Main {
        fn default() -> Self {
            Self {
                schema: String::from(SUPPORTED_SCHEMA_VERSION),
                toolchain: Toolchain::default(),
                pch: Pch::default(),
            }
        }
    }

    impl fmt::Display for Main {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "Configuration:")?;
            let yaml_string = serde_yml::to_string(self).map_err(|_| fmt::Error)?;
            for line in yaml_string.lines() {
                writeln!(f, "{line}")?;
            }
            Ok(())
        }
    }

    /// The tool chain the project parts are compiled with.
    #[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Toolchain {
        #[serde(default = "default_target_triple")]
        pub target_triple: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub compiler_version: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub resource_dir: Option<String>,
        /// Passed to the compiler right after its name.
        #[serde(default)]
        pub arguments: Vec<String>,
        #[serde(default = "default_enabled")]
        pub tweak_header_paths: bool,
    }

    impl Toolchain {
        pub fn use_tweaked_header_paths(&self) -> UseTweakedHeaderPaths {
            UseTweakedHeaderPaths::from(self.tweak_header_paths)
        }
    }

    impl Default for Toolchain {
        fn default() -> Self {
            Self {
                target_triple: default_target_triple(),
                compiler_version: None,
                resource_dir: None,
                arguments: vec![],
                tweak_header_paths: default_enabled(),
            }
        }
    }

    /// Where the precompiled headers are written.
    #[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Pch {
        #[serde(default = "default_pch_directory")]
        pub directory: PathBuf,
    }

    impl Default for Pch {
        fn default() -> Self {
            Self { directory: default_pch_directory() }
        }
    }

    /// The host as a target triple, good enough to pick the tool chain family.
    fn default_target_triple() -> String {
        format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS)
    }

    fn default_pch_directory() -> PathBuf {
        std::env::temp_dir().join("pchgen")
    }

    fn default_enabled() -> bool {
        true
    }

    // Custom deserialization function to validate the schema version
    fn validate_schema_version<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let schema: String = Deserialize::deserialize(deserializer)?;
        if schema != SUPPORTED_SCHEMA_VERSION {
            use serde::de::Error;
            Err(Error::custom(format!(
                "Unsupported schema version: {schema}. Expected: {SUPPORTED_SCHEMA_VERSION}"
            )))
        } else {
            Ok(schema)
        }
    }
}

pub mod validation {

    use super::types::*;
    use thiserror::Error;

    /// Trait for validating configuration objects
    pub trait Validator<T> {
        type Error: std::error::Error;

        fn validate(config: &T) -> Result<(), Self::Error>;
    }

    /// Validation errors for configuration
    #[derive(Debug, Error)]
    pub enum ValidationError {
        #[error("Empty string value for field '{field}'")]
        EmptyString { field: String },
        #[error("Multiple validation errors: {errors:?}")]
        Multiple { errors: Vec<ValidationError> },
    }

    /// Combinator for collecting and handling validation errors
    #[derive(Default)]
    struct ValidationCollector {
        errors: Vec<ValidationError>,
    }

    impl ValidationCollector {
        fn new() -> Self {
            Self { errors: Vec::new() }
        }

        fn add(&mut self, error: ValidationError) {
            self.errors.push(error);
        }

        fn add_result(&mut self, result: Result<(), ValidationError>) {
            if let Err(error) = result {
                match error {
                    ValidationError::Multiple { errors } => {
                        self.errors.extend(errors);
                    }
                    single_error => self.errors.push(single_error),
                }
            }
        }

        fn finish(mut self) -> Result<(), ValidationError> {
            match self.errors.len() {
                0 => Ok(()),
                1 => Err(self.errors.remove(0)),
                _ => Err(ValidationError::Multiple { errors: self.errors }),
            }
        }
    }

    impl Validator<Main> for Main {
        type Error = ValidationError;

        fn validate(config: &Main) -> Result<(), Self::Error> {
            let mut collector = ValidationCollector::new();

            collector.add_result(Toolchain::validate(&config.toolchain));
            collector.add_result(Pch::validate(&config.pch));

            collector.finish()
        }
    }

    impl Validator<Toolchain> for Toolchain {
        type Error = ValidationError;

        fn validate(config: &Toolchain) -> Result<(), Self::Error> {
            let mut collector = ValidationCollector::new();

            for (idx, argument) in config.arguments.iter().enumerate() {
                if argument.is_empty() {
                    collector.add(ValidationError::EmptyString { field: format!("toolchain.arguments[{idx}]") });
                }
            }
            if config.resource_dir.as_deref().is_some_and(str::is_empty) {
                collector.add(ValidationError::EmptyString { field: "toolchain.resource_dir".to_string() });
            }

            collector.finish()
        }
    }

    impl Validator<Pch> for Pch {
        type Error = ValidationError;

        fn validate(config: &Pch) -> Result<(), Self::Error> {
            if config.directory.as_os_str().is_empty() {
                return Err(ValidationError::EmptyString { field: "pch.directory".to_string() });
            }
            Ok(())
        }
    }

}

pub mod loader {
    use super::{Main, Validator};
    use directories::{BaseDirs, ProjectDirs};
    use log::{debug, info};
    use std::fs::OpenOptions;
    use std::path::{Path, PathBuf};
    use thiserror::Error;

    const FILE_NAME: &str = "pchgen.yml";

    pub struct Loader {}

    impl Loader {
        /// Loads the configuration from the specified file or the default locations.
        ///
        /// If the configuration file is specified, it will be used. Otherwise, the default locations
        /// will be searched for the configuration file. If the configuration file is not found, the
        /// default configuration will be returned.
        pub fn load(current_directory: &Path, filename: Option<&Path>) -> Result<Main, ConfigError> {
            if let Some(path) = filename {
                return Self::from_file(path);
            }
            for location in Self::file_locations(current_directory) {
                debug!("Checking configuration file: {}", location.display());
                if location.exists() {
                    return Self::from_file(location.as_path());
                }
            }
            debug!("Configuration file not found. Using the default configuration.");
            Ok(Main::default())
        }

        /// The default locations where the configuration file can be found.
        fn file_locations(current_directory: &Path) -> Vec<PathBuf> {
            let mut locations = vec![current_directory.to_path_buf()];

            if let Some(base_dirs) = BaseDirs::new() {
                locations.push(base_dirs.config_local_dir().to_path_buf());
                locations.push(base_dirs.config_dir().to_path_buf());
            }
            if let Some(proj_dirs) = ProjectDirs::from("org", "pchgen", "pchgen") {
                locations.push(proj_dirs.config_local_dir().to_path_buf());
                locations.push(proj_dirs.config_dir().to_path_buf());
            }
            locations.dedup();
            locations.iter().map(|p| p.join(FILE_NAME)).collect()
        }

        /// Loads the configuration from the specified file.
        pub fn from_file(path: &Path) -> Result<Main, ConfigError> {
            info!("Loading configuration file: {}", path.display());

            let reader = OpenOptions::new()
                .read(true)
                .open(path)
                .map_err(|source| ConfigError::FileAccess { path: path.to_path_buf(), source })?;

            let content: Main = Self::from_reader(reader)
                .map_err(|source| ConfigError::ParseError { path: path.to_path_buf(), source })?;

            Main::validate(&content)
                .map_err(|source| ConfigError::ValidationError { path: path.to_path_buf(), source })?;

            Ok(content)
        }

        /// Define the deserialization format of the config file.
        fn from_reader<R, T>(rdr: R) -> serde_yml::Result<T>
        where
            R: std::io::Read,
            T: serde::de::DeserializeOwned,
        {
            serde_yml::from_reader(rdr)
        }
    }

    /// Represents all possible configuration-related errors.
    #[derive(Debug, Error)]
    pub enum ConfigError {
        #[error("Failed to access configuration file '{path}': {source}", path = path.display())]
        FileAccess {
            path: PathBuf,
            #[source]
            source: std::io::Error,
        },
        #[error("Failed to parse configuration from file '{path}': {source}", path = path.display())]
        ParseError {
            path: PathBuf,
            #[source]
            source: serde_yml::Error,
        },
        #[error("Configuration validation failed for '{path}': {source}", path = path.display())]
        ValidationError {
            path: PathBuf,
            #[source]
            source: crate::config::validation::ValidationError,
        },
    }

}
