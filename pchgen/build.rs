// SPDX-License-Identifier: GPL-3.0-or-later

//! Detects the compilers the test suite can drive for real.
//!
//! Tests which precompile actual headers are compiled only when a `clang++`
//! executable is found, because the generated command lines are clang specific.

fn main() {
    println!("cargo:rerun-if-env-changed=PATH");

    check_executable_exists("clang_cxx", "clang++");
}

fn check_executable_exists(define: &str, executable: &str) {
    println!("cargo:rustc-check-cfg=cfg(has_executable_{})", define);
    match which::which(executable) {
        Ok(path) => {
            println!("cargo:rustc-cfg=has_executable_{}", define);
            println!("cargo:rustc-env={}_PATH={}", define.to_uppercase(), path.display());
        }
        Err(_) => {
            println!("cargo:warning=Checking for executable: {} ... missing", executable);
        }
    }
}
