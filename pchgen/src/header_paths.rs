// SPDX-License-Identifier: GPL-3.0-or-later

//! Splits the raw header search paths of a project part into the built-in,
//! system and user buckets, in the order the compiler has to search them.
//!
//! The interesting part is the optional tweaking of the built-in paths. The
//! compiler's own resource directory (intrinsics, `stddef.h`, ...) has to be
//! searched after the C++ standard library headers, but before the C library
//! headers. Where exactly that is depends on the toolchain family:
//!
//! - Darwin: after the libc++ directories and `/usr/local/include`,
//!   before the SDK paths.
//! - Linux (and Android): after the libstdc++ or libc++ directories,
//!   before `/usr/local/include` and the C library directories.
//! - Windows (MinGW): after the `c++` subdirectories, before the MinGW
//!   include root.
//!
//! Resource directories of other clang installations are removed from the
//! built-in paths, because they would shadow the one inserted here.

use crate::model::{HeaderPath, IncludeSearchPathType};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Whether the built-in paths should be reordered for the toolchain.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UseTweakedHeaderPaths {
    Yes,
    No,
}

impl From<bool> for UseTweakedHeaderPaths {
    fn from(value: bool) -> Self {
        if value { UseTweakedHeaderPaths::Yes } else { UseTweakedHeaderPaths::No }
    }
}

/// The toolchain family, derived once from the target triple.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ToolchainFamily {
    Darwin,
    Linux,
    Windows,
    Other,
}

impl ToolchainFamily {
    pub fn from_triple(triple: &str) -> Self {
        let triple = triple.to_ascii_lowercase();
        if ["darwin", "apple", "macos"].iter().any(|key| triple.contains(key)) {
            ToolchainFamily::Darwin
        } else if ["windows", "mingw", "cygwin"].iter().any(|key| triple.contains(key)) {
            ToolchainFamily::Windows
        } else if ["linux", "android"].iter().any(|key| triple.contains(key)) {
            ToolchainFamily::Linux
        } else {
            ToolchainFamily::Other
        }
    }

    /// Paths which have to be searched before the compiler resource directory.
    fn is_anchor(&self, path: &str) -> bool {
        match self {
            ToolchainFamily::Darwin => CPP_INCLUDES.is_match(path) || LOCAL_INCLUDE.is_match(path),
            ToolchainFamily::Linux | ToolchainFamily::Windows | ToolchainFamily::Other => {
                CPP_INCLUDES.is_match(path)
            }
        }
    }
}

static CPP_INCLUDES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(.*[/\\]include[/\\].*(g\+\+|c\+\+).*|.*libc\+\+[/\\]include|.*libc\+\+abi[/\\]include)$",
    )
    .expect("C++ include pattern is valid")
});

static LOCAL_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/usr/local/include$").expect("local include pattern is valid")
});

static CLANG_RESOURCE_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*[/\\]lib\d*[/\\]clang[/\\]\d+\.\d+(\.\d+)?[/\\]include$")
        .expect("clang resource pattern is valid")
});

/// The result of the filter: three ordered, duplicate free path lists.
///
/// Framework paths are part of the system list.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct FilteredHeaderPaths {
    pub built_in: Vec<HeaderPath>,
    pub system: Vec<HeaderPath>,
    pub user: Vec<HeaderPath>,
}

/// Filters the raw header paths of a project part.
#[derive(Debug, Clone)]
pub struct HeaderPathFilter<'a> {
    header_paths: &'a [HeaderPath],
    family: ToolchainFamily,
    use_tweaked_header_paths: UseTweakedHeaderPaths,
    compiler_version: Option<&'a str>,
    resource_dir: Option<&'a str>,
}

impl<'a> HeaderPathFilter<'a> {
    pub fn new(
        header_paths: &'a [HeaderPath],
        toolchain_triple: &str,
        use_tweaked_header_paths: UseTweakedHeaderPaths,
    ) -> Self {
        Self {
            header_paths,
            family: ToolchainFamily::from_triple(toolchain_triple),
            use_tweaked_header_paths,
            compiler_version: None,
            resource_dir: None,
        }
    }

    pub fn compiler_version(mut self, version: Option<&'a str>) -> Self {
        self.compiler_version = version;
        self
    }

    pub fn resource_dir(mut self, directory: Option<&'a str>) -> Self {
        self.resource_dir = directory;
        self
    }

    pub fn process(&self) -> FilteredHeaderPaths {
        let mut result = FilteredHeaderPaths::default();

        for header_path in self.header_paths {
            if header_path.path.is_empty() {
                continue;
            }
            match header_path.kind {
                IncludeSearchPathType::BuiltIn => result.built_in.push(header_path.clone()),
                IncludeSearchPathType::System | IncludeSearchPathType::Framework => {
                    result.system.push(header_path.clone())
                }
                IncludeSearchPathType::User => result.user.push(header_path.clone()),
                IncludeSearchPathType::Invalid => {
                    log::debug!("Dropping invalid header path: {}", header_path.path);
                }
            }
        }

        if self.use_tweaked_header_paths == UseTweakedHeaderPaths::Yes {
            self.tweak_built_in_paths(&mut result.built_in);
        }

        remove_duplicates(&mut result.built_in);
        remove_duplicates(&mut result.system);
        remove_duplicates(&mut result.user);

        result
    }

    fn tweak_built_in_paths(&self, built_in: &mut Vec<HeaderPath>) {
        built_in.retain(|header_path| {
            let foreign = CLANG_RESOURCE_INCLUDE.is_match(&header_path.path);
            if foreign {
                log::debug!("Dropping foreign clang resource directory: {}", header_path.path);
            }
            !foreign
        });

        let (mut reordered, rest): (Vec<_>, Vec<_>) =
            built_in.drain(..).partition(|header_path| self.family.is_anchor(&header_path.path));

        if let Some(resource_dir) = self.resource_dir.filter(|directory| !directory.is_empty()) {
            log::debug!(
                "Inserting resource directory {resource_dir} at position {} (family: {:?}, version: {:?})",
                reordered.len(),
                self.family,
                self.compiler_version
            );
            reordered.push(HeaderPath::new(resource_dir, IncludeSearchPathType::BuiltIn));
        }

        reordered.extend(rest);
        *built_in = reordered;
    }
}

/// Convenience wrapper over [`HeaderPathFilter`].
pub fn process(
    header_paths: &[HeaderPath],
    toolchain_triple: &str,
    use_tweaked_header_paths: UseTweakedHeaderPaths,
    compiler_version: Option<&str>,
    resource_dir: Option<&str>,
) -> FilteredHeaderPaths {
    HeaderPathFilter::new(header_paths, toolchain_triple, use_tweaked_header_paths)
        .compiler_version(compiler_version)
        .resource_dir(resource_dir)
        .process()
}

/// Keeps the first occurrence of every path string.
fn remove_duplicates(header_paths: &mut Vec<HeaderPath>) {
    let mut seen = HashSet::new();
    header_paths.retain(|header_path| seen.insert(header_path.path.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IncludeSearchPathType::{BuiltIn, Framework, Invalid, System, User};

    const RESOURCE_DIR: &str = "/opt/clang/lib/clang/include";

    fn project_header_paths() -> Vec<HeaderPath> {
        vec![
            HeaderPath::new("", BuiltIn),
            HeaderPath::new("/builtin_path", BuiltIn),
            HeaderPath::new("/system_path", System),
            HeaderPath::new("/framework_path", Framework),
            HeaderPath::new("/user_path", User),
        ]
    }

    fn paths(header_paths: &[HeaderPath]) -> Vec<&str> {
        header_paths.iter().map(|header_path| header_path.path.as_str()).collect()
    }

    fn with_built_ins(built_ins: &[&str]) -> Vec<HeaderPath> {
        let mut result: Vec<HeaderPath> =
            built_ins.iter().map(|path| HeaderPath::new(*path, BuiltIn)).collect();
        result.extend(project_header_paths());
        result
    }

    #[test]
    fn test_untweaked_paths_are_bucketed() {
        let input = project_header_paths();

        let result = process(&input, "x86_64-linux-gnu", UseTweakedHeaderPaths::No, None, None);

        assert_eq!(
            result,
            FilteredHeaderPaths {
                built_in: vec![HeaderPath::new("/builtin_path", BuiltIn)],
                system: vec![
                    HeaderPath::new("/system_path", System),
                    HeaderPath::new("/framework_path", Framework),
                ],
                user: vec![HeaderPath::new("/user_path", User)],
            }
        );
    }

    #[test]
    fn test_invalid_paths_are_dropped() {
        let input = vec![
            HeaderPath::new("/invalid", Invalid),
            HeaderPath::new("/user_path", User),
        ];

        let result = process(&input, "", UseTweakedHeaderPaths::No, None, None);

        assert!(result.built_in.is_empty());
        assert!(result.system.is_empty());
        assert_eq!(paths(&result.user), vec!["/user_path"]);
    }

    #[test]
    fn test_duplicates_are_removed_keeping_first() {
        let input = vec![
            HeaderPath::new("/b", System),
            HeaderPath::new("/a", System),
            HeaderPath::new("/b", Framework),
            HeaderPath::new("/u", User),
            HeaderPath::new("/u", User),
        ];

        let result = process(&input, "", UseTweakedHeaderPaths::No, None, None);

        assert_eq!(
            result.system,
            vec![HeaderPath::new("/b", System), HeaderPath::new("/a", System)]
        );
        assert_eq!(paths(&result.user), vec!["/u"]);
    }

    #[test]
    fn test_resource_dir_inserted_first_without_anchors() {
        let input = project_header_paths();

        let result = process(
            &input,
            "x86_64-linux-gnu",
            UseTweakedHeaderPaths::Yes,
            Some("6.0"),
            Some(RESOURCE_DIR),
        );

        assert_eq!(paths(&result.built_in), vec![RESOURCE_DIR, "/builtin_path"]);
    }

    #[test]
    fn test_no_resource_dir_no_insertion() {
        let input = project_header_paths();

        let result = process(&input, "", UseTweakedHeaderPaths::Yes, None, None);

        assert_eq!(paths(&result.built_in), vec!["/builtin_path"]);
    }

    #[test]
    fn test_empty_resource_dir_is_ignored() {
        let input = project_header_paths();

        let result = process(&input, "", UseTweakedHeaderPaths::Yes, Some("6.0"), Some(""));

        assert_eq!(paths(&result.built_in), vec!["/builtin_path"]);
    }

    #[test]
    fn test_resource_dir_ignored_when_not_tweaked() {
        let input = project_header_paths();

        let result =
            process(&input, "", UseTweakedHeaderPaths::No, Some("6.0"), Some(RESOURCE_DIR));

        assert_eq!(paths(&result.built_in), vec!["/builtin_path"]);
    }

    #[test]
    fn test_order_macos() {
        let input = with_built_ins(&[
            "/usr/include/c++/4.2.1",
            "/usr/include/c++/4.2.1/backward",
            "/usr/local/include",
            concat!(
                "/Applications/Xcode.app/Contents/Developer/Toolchains/XcodeDefault.xctoolchain",
                "/usr/bin/../lib/clang/6.0/include"
            ),
            "/Applications/Xcode.app/Contents/Developer/Toolchains/XcodeDefault.xctoolchain/usr/include",
            "/usr/include",
        ]);

        let result = process(
            &input,
            "x86_64-apple-darwin10",
            UseTweakedHeaderPaths::Yes,
            Some("6.0"),
            Some(RESOURCE_DIR),
        );

        assert_eq!(
            paths(&result.built_in),
            vec![
                "/usr/include/c++/4.2.1",
                "/usr/include/c++/4.2.1/backward",
                "/usr/local/include",
                RESOURCE_DIR,
                "/Applications/Xcode.app/Contents/Developer/Toolchains/XcodeDefault.xctoolchain/usr/include",
                "/usr/include",
                "/builtin_path",
            ]
        );
    }

    #[test]
    fn test_order_linux() {
        let input = with_built_ins(&[
            "/usr/lib/gcc/x86_64-linux-gnu/4.8/../../../../include/c++/4.8",
            "/usr/lib/gcc/x86_64-linux-gnu/4.8/../../../../include/c++/4.8/backward",
            "/usr/lib/gcc/x86_64-linux-gnu/4.8/../../../../include/x86_64-linux-gnu/c++/4.8",
            "/usr/local/include",
            "/usr/lib/gcc/x86_64-linux-gnu/4.8/include",
            "/usr/include/x86_64-linux-gnu",
            "/usr/include",
        ]);

        let result = process(
            &input,
            "x86_64-linux-gnu",
            UseTweakedHeaderPaths::Yes,
            Some("6.0"),
            Some(RESOURCE_DIR),
        );

        assert_eq!(
            paths(&result.built_in),
            vec![
                "/usr/lib/gcc/x86_64-linux-gnu/4.8/../../../../include/c++/4.8",
                "/usr/lib/gcc/x86_64-linux-gnu/4.8/../../../../include/c++/4.8/backward",
                "/usr/lib/gcc/x86_64-linux-gnu/4.8/../../../../include/x86_64-linux-gnu/c++/4.8",
                RESOURCE_DIR,
                "/usr/local/include",
                "/usr/lib/gcc/x86_64-linux-gnu/4.8/include",
                "/usr/include/x86_64-linux-gnu",
                "/usr/include",
                "/builtin_path",
            ]
        );
    }

    #[test]
    fn test_order_mingw() {
        let input: Vec<HeaderPath> = [
            "C:/Qt/Tools/mingw530_32/i686-w64-mingw32/include",
            "C:/Qt/Tools/mingw530_32/i686-w64-mingw32/include/c++",
            "C:/Qt/Tools/mingw530_32/i686-w64-mingw32/include/c++/i686-w64-mingw32",
            "C:/Qt/Tools/mingw530_32/i686-w64-mingw32/include/c++/backward",
        ]
        .iter()
        .map(|path| HeaderPath::new(*path, BuiltIn))
        .collect();

        let result = process(
            &input,
            "x86_64-w64-windows-gnu",
            UseTweakedHeaderPaths::Yes,
            Some("6.0"),
            Some(RESOURCE_DIR),
        );

        assert_eq!(
            paths(&result.built_in),
            vec![
                "C:/Qt/Tools/mingw530_32/i686-w64-mingw32/include/c++",
                "C:/Qt/Tools/mingw530_32/i686-w64-mingw32/include/c++/i686-w64-mingw32",
                "C:/Qt/Tools/mingw530_32/i686-w64-mingw32/include/c++/backward",
                RESOURCE_DIR,
                "C:/Qt/Tools/mingw530_32/i686-w64-mingw32/include",
            ]
        );
    }

    #[test]
    fn test_order_android_clang() {
        let ndk = "C:/Users/test/AppData/Local/Android/sdk/ndk-bundle";
        let input: Vec<HeaderPath> = [
            "sysroot/usr/include/i686-linux-android",
            "sources/cxx-stl/llvm-libc++/include",
            "sources/android/support/include",
            "sources/cxx-stl/llvm-libc++abi/include",
            "sysroot/usr/include",
        ]
        .iter()
        .map(|path| HeaderPath::new(format!("{ndk}/{path}"), BuiltIn))
        .collect();

        let result = process(
            &input,
            "i686-linux-android",
            UseTweakedHeaderPaths::Yes,
            Some("6.0"),
            Some(RESOURCE_DIR),
        );

        let expected: Vec<String> = vec![
            format!("{ndk}/sources/cxx-stl/llvm-libc++/include"),
            format!("{ndk}/sources/cxx-stl/llvm-libc++abi/include"),
            RESOURCE_DIR.to_string(),
            format!("{ndk}/sysroot/usr/include/i686-linux-android"),
            format!("{ndk}/sources/android/support/include"),
            format!("{ndk}/sysroot/usr/include"),
        ];
        assert_eq!(paths(&result.built_in), expected);
    }

    #[test]
    fn test_local_include_is_not_an_anchor_on_linux() {
        assert!(!ToolchainFamily::Linux.is_anchor("/usr/local/include"));
        assert!(ToolchainFamily::Darwin.is_anchor("/usr/local/include"));
        assert!(ToolchainFamily::Windows.is_anchor(r"C:\mingw\include\c++\backward"));
    }

    #[test]
    fn test_toolchain_family_from_triple() {
        assert_eq!(ToolchainFamily::from_triple("x86_64-apple-darwin10"), ToolchainFamily::Darwin);
        assert_eq!(ToolchainFamily::from_triple("arm64-apple-macos14"), ToolchainFamily::Darwin);
        assert_eq!(ToolchainFamily::from_triple("x86_64-linux-gnu"), ToolchainFamily::Linux);
        assert_eq!(ToolchainFamily::from_triple("i686-linux-android"), ToolchainFamily::Linux);
        assert_eq!(ToolchainFamily::from_triple("x86_64-w64-windows-gnu"), ToolchainFamily::Windows);
        assert_eq!(ToolchainFamily::from_triple("i686-w64-mingw32"), ToolchainFamily::Windows);
        assert_eq!(ToolchainFamily::from_triple("wasm32-unknown-unknown"), ToolchainFamily::Other);
        assert_eq!(ToolchainFamily::from_triple(""), ToolchainFamily::Other);
    }

    #[test]
    fn test_process_is_idempotent() {
        let input = with_built_ins(&["/usr/include/c++/9", "/usr/include", "/usr/include/c++/9"]);
        let sut = HeaderPathFilter::new(&input, "x86_64-linux-gnu", UseTweakedHeaderPaths::Yes)
            .compiler_version(Some("9.0"))
            .resource_dir(Some(RESOURCE_DIR));

        assert_eq!(sut.process(), sut.process());
    }

    #[test]
    fn test_resource_dir_already_present_is_not_duplicated() {
        let input = with_built_ins(&["/usr/include/c++/9", RESOURCE_DIR, "/usr/include"]);

        let result = process(
            &input,
            "x86_64-linux-gnu",
            UseTweakedHeaderPaths::Yes,
            None,
            Some(RESOURCE_DIR),
        );

        assert_eq!(
            paths(&result.built_in),
            vec!["/usr/include/c++/9", RESOURCE_DIR, "/usr/include", "/builtin_path"]
        );
    }
}
