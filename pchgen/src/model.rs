// SPDX-License-Identifier: GPL-3.0-or-later

//! Value types shared by the command line builder, the header path filter
//! and the precompiled header orchestrator.
//!
//! The types are plain data: they are constructed per request by the caller,
//! consumed once and dropped. All of them can be read from the project part
//! description files, hence the `serde` annotations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The language of a compilation unit.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    #[default]
    #[serde(alias = "c++", alias = "cpp")]
    Cxx,
}

/// Language extensions which modify the selected dialect.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct LanguageExtensions {
    #[serde(default)]
    pub gnu: bool,
    #[serde(default)]
    pub objective_c: bool,
}

impl LanguageExtensions {
    pub const NONE: Self = Self { gnu: false, objective_c: false };
    pub const GNU: Self = Self { gnu: true, objective_c: false };
    pub const OBJECTIVE_C: Self = Self { gnu: false, objective_c: true };
}

/// The language standard of a compilation unit.
///
/// Names which are not recognized are kept as `Unrecognized`, so a project
/// written for a newer standard can still be compiled with the newest
/// dialect we know about.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LanguageVersion {
    C89,
    C99,
    C11,
    C18,
    #[default]
    Cxx98,
    Cxx03,
    Cxx11,
    Cxx14,
    Cxx17,
    Cxx2a,
    Unrecognized(String),
}

impl LanguageVersion {
    /// The canonical name, as it is written in project descriptions.
    pub fn name(&self) -> &str {
        match self {
            LanguageVersion::C89 => "c89",
            LanguageVersion::C99 => "c99",
            LanguageVersion::C11 => "c11",
            LanguageVersion::C18 => "c18",
            LanguageVersion::Cxx98 => "c++98",
            LanguageVersion::Cxx03 => "c++03",
            LanguageVersion::Cxx11 => "c++11",
            LanguageVersion::Cxx14 => "c++14",
            LanguageVersion::Cxx17 => "c++17",
            LanguageVersion::Cxx2a => "c++2a",
            LanguageVersion::Unrecognized(name) => name,
        }
    }
}

impl From<&str> for LanguageVersion {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "c89" | "c90" => LanguageVersion::C89,
            "c99" => LanguageVersion::C99,
            "c11" => LanguageVersion::C11,
            "c17" | "c18" => LanguageVersion::C18,
            "c++98" | "cxx98" => LanguageVersion::Cxx98,
            "c++03" | "cxx03" => LanguageVersion::Cxx03,
            "c++11" | "cxx11" => LanguageVersion::Cxx11,
            "c++14" | "cxx14" => LanguageVersion::Cxx14,
            "c++17" | "cxx17" => LanguageVersion::Cxx17,
            "c++2a" | "cxx2a" | "c++20" | "cxx20" => LanguageVersion::Cxx2a,
            _ => LanguageVersion::Unrecognized(value.to_string()),
        }
    }
}

impl From<String> for LanguageVersion {
    fn from(value: String) -> Self {
        LanguageVersion::from(value.as_str())
    }
}

impl From<LanguageVersion> for String {
    fn from(value: LanguageVersion) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for LanguageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Classification of a header search directory by its provenance.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeSearchPathType {
    /// Declared by the project.
    User,
    /// Provided by the operating system or the toolchain.
    System,
    /// Bundled with the compiler.
    #[serde(alias = "built-in", alias = "built_in")]
    BuiltIn,
    /// macOS style framework bundle directory.
    Framework,
    Invalid,
}

/// A raw header search path, as the project model reports it.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct HeaderPath {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: IncludeSearchPathType,
}

impl HeaderPath {
    pub fn new(path: impl Into<String>, kind: IncludeSearchPathType) -> Self {
        Self { path: path.into(), kind }
    }
}

/// A header search path with its priority index.
///
/// Lower indices are searched first. Entries with equal indices keep
/// their relative order.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct IncludeSearchPath {
    pub path: String,
    pub index: i32,
    #[serde(rename = "type")]
    pub kind: IncludeSearchPathType,
}

impl IncludeSearchPath {
    pub fn new(path: impl Into<String>, index: i32, kind: IncludeSearchPathType) -> Self {
        Self { path: path.into(), index, kind }
    }
}

/// A preprocessor definition with its priority index.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct CompilerMacro {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub index: i32,
}

impl CompilerMacro {
    pub fn new(key: impl Into<String>, value: impl Into<String>, index: i32) -> Self {
        Self { key: key.into(), value: value.into(), index }
    }
}

/// Everything the command line builder needs to know about a compilation.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CompilationRequest {
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub language_version: LanguageVersion,
    #[serde(default)]
    pub language_extensions: LanguageExtensions,
    #[serde(default)]
    pub compiler_macros: Vec<CompilerMacro>,
    #[serde(default)]
    pub project_include_search_paths: Vec<IncludeSearchPath>,
    #[serde(default)]
    pub system_include_search_paths: Vec<IncludeSearchPath>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_version_from_known_names() {
        assert_eq!(LanguageVersion::from("c89"), LanguageVersion::C89);
        assert_eq!(LanguageVersion::from("C17"), LanguageVersion::C18);
        assert_eq!(LanguageVersion::from("c++03"), LanguageVersion::Cxx03);
        assert_eq!(LanguageVersion::from("cxx17"), LanguageVersion::Cxx17);
        assert_eq!(LanguageVersion::from("c++20"), LanguageVersion::Cxx2a);
    }

    #[test]
    fn test_language_version_keeps_unknown_names() {
        let version = LanguageVersion::from("c++26");

        assert_eq!(version, LanguageVersion::Unrecognized("c++26".to_string()));
        assert_eq!(version.to_string(), "c++26");
    }

    #[test]
    fn test_language_version_deserialize() {
        let result: LanguageVersion = serde_json::from_str("\"c++14\"").unwrap();
        assert_eq!(result, LanguageVersion::Cxx14);

        let result: LanguageVersion = serde_json::from_str("\"c++29\"").unwrap();
        assert_eq!(result, LanguageVersion::Unrecognized("c++29".to_string()));
    }

    #[test]
    fn test_include_search_path_type_deserialize() {
        fn assert_type_deserializes(json_str: &str, expected: IncludeSearchPathType) {
            let result = serde_json::from_str::<IncludeSearchPathType>(json_str).unwrap();
            assert_eq!(result, expected);
        }

        assert_type_deserializes("\"user\"", IncludeSearchPathType::User);
        assert_type_deserializes("\"system\"", IncludeSearchPathType::System);
        assert_type_deserializes("\"builtin\"", IncludeSearchPathType::BuiltIn);
        assert_type_deserializes("\"built-in\"", IncludeSearchPathType::BuiltIn);
        assert_type_deserializes("\"framework\"", IncludeSearchPathType::Framework);
        assert_type_deserializes("\"invalid\"", IncludeSearchPathType::Invalid);
    }

    #[test]
    fn test_compilation_request_defaults() {
        let request: CompilationRequest = serde_json::from_str("{}").unwrap();

        assert_eq!(request.language, Language::Cxx);
        assert_eq!(request.language_version, LanguageVersion::Cxx98);
        assert_eq!(request.language_extensions, LanguageExtensions::NONE);
        assert!(request.compiler_macros.is_empty());
    }
}
