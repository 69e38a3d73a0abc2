// SPDX-License-Identifier: GPL-3.0-or-later

//! Assembles the clang command line for a compilation request.
//!
//! The produced argument vector is a pure function of the inputs. The order
//! of the groups is fixed, and the flag spellings are what clang expects:
//!
//! 1. the compiler (`clang` or `clang++`),
//! 2. the tool chain arguments as they were given,
//! 3. the language (`-x c++-header`),
//! 4. the language standard (`-std=c++17` or `-std=gnu++17`),
//! 5. `-nostdinc -nostdlibinc`,
//! 6. the macros (`-DKEY=VALUE`),
//! 7. the project include paths (`-I path`),
//! 8. the system include paths (`-isystem path`, `-F path`), built-in ones last,
//! 9. the precompiled header to include (`-Xclang -include-pch -Xclang path`),
//! 10. the output (`-o path`),
//! 11. the source file.

use crate::model::{
    CompilationRequest, CompilerMacro, IncludeSearchPath, IncludeSearchPathType, Language,
    LanguageExtensions, LanguageVersion,
};
use std::path::Path;

/// Builds the compiler arguments for a compilation request.
///
/// Optional paths which are given, but empty, are treated as absent.
#[derive(Debug, Clone, Copy)]
pub struct CommandLineBuilder<'a> {
    request: &'a CompilationRequest,
    toolchain_arguments: &'a [String],
    source_path: Option<&'a Path>,
    output_path: Option<&'a Path>,
    include_pch_path: Option<&'a Path>,
}

impl<'a> CommandLineBuilder<'a> {
    pub fn new(request: &'a CompilationRequest, toolchain_arguments: &'a [String]) -> Self {
        Self {
            request,
            toolchain_arguments,
            source_path: None,
            output_path: None,
            include_pch_path: None,
        }
    }

    pub fn source(mut self, path: &'a Path) -> Self {
        self.source_path = Some(path);
        self
    }

    pub fn output(mut self, path: &'a Path) -> Self {
        self.output_path = Some(path);
        self
    }

    pub fn include_pch(mut self, path: &'a Path) -> Self {
        self.include_pch_path = Some(path);
        self
    }

    pub fn build(&self) -> Vec<String> {
        let mut command_line = CommandLine::with_capacity(128);

        command_line.add_compiler(self.request.language);
        command_line.add_toolchain_arguments(self.toolchain_arguments);
        command_line.add_language(self.request.language, self.request.language_extensions);
        command_line.add_language_version(
            &self.request.language_version,
            self.request.language_extensions,
        );
        command_line.add_no_std_inc_and_no_std_lib_inc();
        command_line.add_compiler_macros(&self.request.compiler_macros);
        command_line.add_project_include_search_paths(&sorted_include_search_paths(
            &self.request.project_include_search_paths,
        ));
        command_line.add_system_and_built_in_include_search_paths(&sorted_include_search_paths(
            &self.request.system_include_search_paths,
        ));
        command_line.add_include_pch_path(self.include_pch_path);
        command_line.add_output_path(self.output_path);
        command_line.add_source_path(self.source_path);

        command_line.arguments
    }
}

/// Convenience wrapper over [`CommandLineBuilder`].
pub fn build(
    request: &CompilationRequest,
    toolchain_arguments: &[String],
    source_path: Option<&Path>,
    output_path: Option<&Path>,
    include_pch_path: Option<&Path>,
) -> Vec<String> {
    CommandLineBuilder {
        request,
        toolchain_arguments,
        source_path,
        output_path,
        include_pch_path,
    }
    .build()
}

/// The `-x` argument value for the language and its extensions.
pub fn language_name(language: Language, extensions: LanguageExtensions) -> &'static str {
    match (language, extensions.objective_c) {
        (Language::C, false) => "c-header",
        (Language::C, true) => "objective-c-header",
        (Language::Cxx, false) => "c++-header",
        (Language::Cxx, true) => "objective-c++-header",
    }
}

/// The `-std=` flag for the strict dialect.
pub fn standard_language_version(version: &LanguageVersion) -> &'static str {
    match version {
        LanguageVersion::C89 => "-std=c89",
        LanguageVersion::C99 => "-std=c99",
        LanguageVersion::C11 => "-std=c11",
        LanguageVersion::C18 => "-std=c18",
        LanguageVersion::Cxx98 => "-std=c++98",
        LanguageVersion::Cxx03 => "-std=c++03",
        LanguageVersion::Cxx11 => "-std=c++11",
        LanguageVersion::Cxx14 => "-std=c++14",
        LanguageVersion::Cxx17 => "-std=c++17",
        LanguageVersion::Cxx2a => "-std=c++2a",
        LanguageVersion::Unrecognized(name) => {
            log::debug!("Unrecognized language version '{name}', using the newest dialect");
            "-std=c++2a"
        }
    }
}

/// The `-std=` flag for the GNU dialect.
pub fn gnu_language_version(version: &LanguageVersion) -> &'static str {
    match version {
        LanguageVersion::C89 => "-std=gnu89",
        LanguageVersion::C99 => "-std=gnu99",
        LanguageVersion::C11 => "-std=gnu11",
        LanguageVersion::C18 => "-std=gnu18",
        LanguageVersion::Cxx98 => "-std=gnu++98",
        LanguageVersion::Cxx03 => "-std=gnu++03",
        LanguageVersion::Cxx11 => "-std=gnu++11",
        LanguageVersion::Cxx14 => "-std=gnu++14",
        LanguageVersion::Cxx17 => "-std=gnu++17",
        LanguageVersion::Cxx2a => "-std=gnu++2a",
        LanguageVersion::Unrecognized(name) => {
            log::debug!("Unrecognized language version '{name}', using the newest GNU dialect");
            "-std=gnu++2a"
        }
    }
}

/// The flag which declares a system include path of the given type.
///
/// Invalid paths get an empty flag. The pair is still emitted, so the
/// mistake stays visible in the command line.
pub fn include_option(kind: IncludeSearchPathType) -> &'static str {
    match kind {
        IncludeSearchPathType::User
        | IncludeSearchPathType::System
        | IncludeSearchPathType::BuiltIn => "-isystem",
        IncludeSearchPathType::Framework => "-F",
        IncludeSearchPathType::Invalid => "",
    }
}

/// Stable sort by priority index; equal indices keep their input order.
pub fn sorted_include_search_paths(paths: &[IncludeSearchPath]) -> Vec<IncludeSearchPath> {
    let mut sorted = paths.to_vec();
    sorted.sort_by_key(|path| path.index);
    sorted
}

fn is_given(path: Option<&Path>) -> Option<&Path> {
    path.filter(|path| !path.as_os_str().is_empty())
}

struct CommandLine {
    arguments: Vec<String>,
}

impl CommandLine {
    fn with_capacity(capacity: usize) -> Self {
        Self { arguments: Vec::with_capacity(capacity) }
    }

    fn push(&mut self, argument: impl Into<String>) {
        self.arguments.push(argument.into());
    }

    fn add_compiler(&mut self, language: Language) {
        match language {
            Language::Cxx => self.push("clang++"),
            Language::C => self.push("clang"),
        }
    }

    fn add_toolchain_arguments(&mut self, arguments: &[String]) {
        self.arguments.extend(arguments.iter().cloned());
    }

    fn add_language(&mut self, language: Language, extensions: LanguageExtensions) {
        self.push("-x");
        self.push(language_name(language, extensions));
    }

    fn add_language_version(&mut self, version: &LanguageVersion, extensions: LanguageExtensions) {
        if extensions.gnu {
            self.push(gnu_language_version(version));
        } else {
            self.push(standard_language_version(version));
        }
    }

    fn add_no_std_inc_and_no_std_lib_inc(&mut self) {
        self.push("-nostdinc");
        self.push("-nostdlibinc");
    }

    fn add_compiler_macros(&mut self, macros: &[CompilerMacro]) {
        let mut sorted: Vec<&CompilerMacro> = macros.iter().collect();
        sorted.sort_by_key(|compiler_macro| compiler_macro.index);

        for compiler_macro in sorted {
            self.push(format!("-D{}={}", compiler_macro.key, compiler_macro.value));
        }
    }

    fn add_project_include_search_paths(&mut self, paths: &[IncludeSearchPath]) {
        for path in paths {
            self.push("-I");
            self.push(path.path.as_str());
        }
    }

    fn add_system_and_built_in_include_search_paths(&mut self, paths: &[IncludeSearchPath]) {
        let (built_in, system): (Vec<_>, Vec<_>) =
            paths.iter().partition(|path| path.kind == IncludeSearchPathType::BuiltIn);

        for path in system.into_iter().chain(built_in) {
            if path.kind == IncludeSearchPathType::Invalid {
                log::debug!("Invalid include search path passed with an empty flag: {}", path.path);
            }
            self.push(include_option(path.kind));
            self.push(path.path.as_str());
        }
    }

    fn add_include_pch_path(&mut self, path: Option<&Path>) {
        if let Some(path) = is_given(path) {
            self.push("-Xclang");
            self.push("-include-pch");
            self.push("-Xclang");
            self.push(path.to_string_lossy());
        }
    }

    fn add_output_path(&mut self, path: Option<&Path>) {
        if let Some(path) = is_given(path) {
            self.push("-o");
            self.push(path.to_string_lossy());
        }
    }

    fn add_source_path(&mut self, path: Option<&Path>) {
        if let Some(path) = is_given(path) {
            self.push(path.to_string_lossy());
        }
    }
}
