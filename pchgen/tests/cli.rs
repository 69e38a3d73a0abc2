// SPDX-License-Identifier: GPL-3.0-or-later

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::error::Error;

const PCHGEN_BIN: &str = "pchgen";

/// Writes a configuration and a project part including the given header.
fn setup(temp: &TempDir, header_content: &str) -> Result<(), Box<dyn Error>> {
    temp.child("pchgen.yml").write_str(&format!(
        "schema: \"1.0\"\n\
         toolchain:\n\
         \x20 target_triple: x86_64-linux-gnu\n\
         \x20 resource_dir: /usr/lib/clang/17/include\n\
         pch:\n\
         \x20 directory: {}\n",
        temp.child("pch").path().display()
    ))?;

    let header = temp.child("include/header.h");
    header.write_str(header_content)?;
    temp.child("project.json").write_str(&format!(
        r#"{{
            "id": "project1",
            "language_version": "c++11",
            "macros": [ {{ "key": "DEFINE", "value": "1" }} ],
            "header_paths": [
                {{ "path": "{}", "type": "user" }},
                {{ "path": "/usr/include", "type": "builtin" }},
                {{ "path": "/usr/include/c++/8", "type": "builtin" }}
            ],
            "includes": [ "{}" ]
        }}"#,
        temp.child("include").path().display(),
        header.path().display()
    ))?;
    Ok(())
}

fn pchgen(temp: &TempDir) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin(PCHGEN_BIN)?;
    cmd.current_dir(temp.path());
    cmd.arg("-c").arg(temp.child("pchgen.yml").path());
    Ok(cmd)
}

#[test]
fn test_help() -> Result<(), Box<dyn Error>> {
    Command::cargo_bin(PCHGEN_BIN)?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: pchgen"));
    Ok(())
}

#[test]
fn test_empty_arguments() -> Result<(), Box<dyn Error>> {
    Command::cargo_bin(PCHGEN_BIN)?
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: pchgen"));
    Ok(())
}

#[test]
fn test_missing_project() -> Result<(), Box<dyn Error>> {
    let temp = TempDir::new()?;
    setup(&temp, "#pragma once\n")?;

    pchgen(&temp)?.args(["filter", "missing.json"]).assert().failure();
    Ok(())
}

#[test]
fn test_invalid_configuration() -> Result<(), Box<dyn Error>> {
    let temp = TempDir::new()?;
    setup(&temp, "#pragma once\n")?;
    temp.child("pchgen.yml").write_str("schema: \"1.0\"\npch:\n  directory: \"\"\n")?;

    pchgen(&temp)?
        .args(["filter", "project.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pch.directory"));
    Ok(())
}

#[test]
fn test_arguments() -> Result<(), Box<dyn Error>> {
    let temp = TempDir::new()?;
    setup(&temp, "#pragma once\n")?;

    pchgen(&temp)?
        .args(["arguments", "project.json", "--source", "umbrella.h", "-o", "umbrella.pch"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("clang++ -x c++-header"))
        .stdout(predicate::str::contains("-DDEFINE=1"))
        .stdout(predicate::str::contains("-o umbrella.pch umbrella.h"));
    Ok(())
}

#[test]
fn test_arguments_as_json() -> Result<(), Box<dyn Error>> {
    let temp = TempDir::new()?;
    setup(&temp, "#pragma once\n")?;

    let output = pchgen(&temp)?.args(["arguments", "project.json", "--json"]).output()?;
    assert!(output.status.success());

    let arguments: Vec<String> = serde_json::from_slice(&output.stdout)?;
    let system: Vec<&str> = arguments
        .iter()
        .skip_while(|argument| *argument != "-isystem")
        .map(String::as_str)
        .collect();
    assert_eq!(
        system,
        vec![
            "-isystem",
            "/usr/include/c++/8",
            "-isystem",
            "/usr/lib/clang/17/include",
            "-isystem",
            "/usr/include",
        ]
    );
    Ok(())
}

#[test]
fn test_filter() -> Result<(), Box<dyn Error>> {
    let temp = TempDir::new()?;
    setup(&temp, "#pragma once\n")?;

    pchgen(&temp)?
        .args(["filter", "project.json"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "built-in:\n  /usr/include/c++/8\n  /usr/lib/clang/17/include\n  /usr/include\nsystem:\nuser:\n",
        ));
    Ok(())
}

#[test]
fn test_generate_faulty_header() -> Result<(), Box<dyn Error>> {
    let temp = TempDir::new()?;
    setup(&temp, "#pragma once\n#error this header is broken\n")?;

    let output = pchgen(&temp)?.args(["generate", "project.json"]).output()?;

    assert!(!output.status.success());
    let pch: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(pch["project_part_id"], "project1");
    assert_eq!(pch["pch_path"], "");
    assert_eq!(pch["last_modified"], -1);
    Ok(())
}

#[test]
#[cfg(has_executable_clang_cxx)]
fn test_generate() -> Result<(), Box<dyn Error>> {
    let temp = TempDir::new()?;
    setup(&temp, "#pragma once\nint answer();\n")?;

    let output = pchgen(&temp)?.args(["generate", "project.json"]).output()?;

    assert!(output.status.success());
    let pch: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let pch_path = pch["pch_path"].as_str().unwrap_or_default();
    assert!(pch_path.ends_with(".pch"));
    assert!(std::path::Path::new(pch_path).exists());
    assert!(pch["last_modified"].as_i64().unwrap_or(-1) > 0);
    temp.child("pch").assert(predicate::path::is_dir());
    Ok(())
}
