//! Compilation pipeline end-to-end tests.
//!
//! Full runs of the `vegac` binary over fixture programs: agents and
//! tools, loops, modules, warnings, and the circular-import failure.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn vegac_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_vegac"))
}

fn compile_to(input: &std::path::Path, output: &std::path::Path) -> assert_cmd::assert::Assert {
    let mut cmd = Command::new(vegac_bin());
    cmd.arg(input).arg("-o").arg(output);
    cmd.assert()
}

#[test]
fn test_compile_agent_program() {
    let temp_dir = TempDir::new().expect("temp dir");
    let output = temp_dir.path().join("greeter.vgb");

    compile_to(&fixtures_dir().join("greeter.vega"), &output).success();
    assert!(output.exists());
}

#[test]
fn test_compile_loops_program() {
    let temp_dir = TempDir::new().expect("temp dir");
    let output = temp_dir.path().join("loops.vgb");

    compile_to(&fixtures_dir().join("loops.vega"), &output).success();
    assert!(output.exists());
}

#[test]
fn test_agent_disassembly_mentions_agent_opcodes() {
    let mut cmd = Command::new(vegac_bin());
    cmd.arg(fixtures_dir().join("greeter.vega")).arg("-S");

    cmd.assert().success().stdout(
        predicate::str::contains("SPAWN_AGENT")
            .and(predicate::str::contains("SEND_MSG"))
            .and(predicate::str::contains("; agent Greeter")),
    );
}

#[test]
fn test_missing_main_is_warning_not_failure() {
    let temp_dir = TempDir::new().expect("temp dir");
    let output = temp_dir.path().join("no_main.vgb");

    let mut cmd = Command::new(vegac_bin());
    cmd.arg(fixtures_dir().join("no_main.vega"))
        .arg("-o")
        .arg(&output);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("warning: no 'main' function defined"));
    assert!(output.exists());
}

#[test]
fn test_semantic_error_single_diagnostic() {
    let temp_dir = TempDir::new().expect("temp dir");
    let input = temp_dir.path().join("bad_sem.vega");
    fs::write(&input, "fn main() { let a = spawn Ghost; let b = spawn Ghoul; }").unwrap();

    let mut cmd = Command::new(vegac_bin());
    cmd.arg(&input);
    let assert = cmd.assert().failure().code(1);

    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    let error_lines: Vec<_> = stderr.lines().filter(|l| l.contains("error:")).collect();
    assert_eq!(error_lines.len(), 1, "stderr was: {}", stderr);
    assert!(error_lines[0].contains("Undefined agent 'Ghost'"));
}

#[test]
fn test_import_via_relative_path() {
    let temp_dir = TempDir::new().expect("temp dir");
    fs::write(
        temp_dir.path().join("helpers.vega"),
        "fn twice(n: int) -> int { return n + n; }",
    )
    .unwrap();
    let input = temp_dir.path().join("main.vega");
    fs::write(&input, "import \"./helpers\";\nfn main() { print(twice(2)); }").unwrap();
    let output = temp_dir.path().join("main.vgb");

    compile_to(&input, &output).success();

    // The module's function is part of the artifact.
    let mut cmd = Command::new(vegac_bin());
    cmd.arg(&input).arg("-S");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("; fn twice ").and(predicate::str::contains("; fn main ")));
}

#[test]
fn test_import_via_vega_path() {
    let lib_dir = TempDir::new().expect("temp dir");
    fs::write(
        lib_dir.path().join("util.vega"),
        "fn shout(s: str) -> str { return s + \"!\"; }",
    )
    .unwrap();

    let src_dir = TempDir::new().expect("temp dir");
    let input = src_dir.path().join("main.vega");
    fs::write(&input, "import \"util\";\nfn main() { print(shout(\"hey\")); }").unwrap();
    let output = src_dir.path().join("main.vgb");

    let mut cmd = Command::new(vegac_bin());
    cmd.arg(&input)
        .arg("-o")
        .arg(&output)
        .env("VEGA_PATH", lib_dir.path());
    cmd.assert().success();
    assert!(output.exists());
}

#[test]
fn test_circular_import_fails_with_one_diagnostic() {
    let temp_dir = TempDir::new().expect("temp dir");
    fs::write(temp_dir.path().join("A.vega"), "import \"./B\";\nfn a() { }").unwrap();
    fs::write(temp_dir.path().join("B.vega"), "import \"./A\";\nfn b() { }").unwrap();
    let input = temp_dir.path().join("main.vega");
    fs::write(&input, "import \"./A\";\nfn main() { }").unwrap();

    let mut cmd = Command::new(vegac_bin());
    cmd.arg(&input);
    let assert = cmd.assert().failure().code(1);

    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    let error_lines: Vec<_> = stderr.lines().filter(|l| l.contains("error:")).collect();
    assert_eq!(error_lines.len(), 1, "stderr was: {}", stderr);
    assert!(
        error_lines[0].contains("Circular import detected: ./"),
        "stderr was: {}",
        stderr
    );
}

#[test]
fn test_emitted_artifact_is_well_formed() {
    let temp_dir = TempDir::new().expect("temp dir");
    let output = temp_dir.path().join("greeter.vgb");
    compile_to(&fixtures_dir().join("greeter.vega"), &output).success();

    let bytes = fs::read(&output).unwrap();
    assert_eq!(&bytes[0..4], b"VEGA");
    assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 1);

    // Pool and code sizes from the header span the rest of the file.
    let pool_size = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
    let code_size = u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]) as usize;
    let func_count = u16::from_le_bytes([bytes[20], bytes[21]]) as usize;
    let agent_count = u16::from_le_bytes([bytes[22], bytes[23]]) as usize;
    let expected = 24 + func_count * 14 + agent_count * 10 + pool_size + code_size;
    assert_eq!(bytes.len(), expected);
    assert_eq!(agent_count, 1);
    assert_eq!(func_count, 2); // Greeter$hello + main
}
