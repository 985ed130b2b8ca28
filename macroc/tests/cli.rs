use assert_cmd::cargo;
use assert_cmd::prelude::*;
use ebmacro_test::shared_resource_path;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn indirect_args(cmd: &mut Command) -> &mut Command {
    cmd.arg("indirect")
        .arg("--tags")
        .arg(shared_resource_path("tags.csv"))
        .arg("--logical")
        .arg("tank_level")
        .arg("--buffer")
        .arg("level")
        .arg("--actual")
        .arg("tank_level_a")
        .arg("tank_level_b")
        .arg("tank_level_c")
}

#[test]
fn check_tags_when_not_a_file_then_err() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!());

    cmd.arg("check-tags").arg("test/file/doesnt/exist");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error"));

    Ok(())
}

#[test]
fn check_tags_when_valid_file_then_ok() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!());

    cmd.arg("check-tags").arg(shared_resource_path("tags.csv"));
    cmd.assert().success().stdout(predicate::str::diff("OK\n"));

    Ok(())
}

#[test]
fn check_tags_when_duplicates_then_reports_codes() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!());

    cmd.arg("check-tags")
        .arg(shared_resource_path("tags_duplicate.csv"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("E0020"))
        .stderr(predicate::str::contains("E0021"))
        .stderr(predicate::str::contains("Number of errors: 2"));

    Ok(())
}

#[test]
fn check_tags_when_same_tag_in_two_files_then_err() -> Result<(), Box<dyn std::error::Error>> {
    let mut other = NamedTempFile::new()?;
    writeln!(other, "pump_on,Local HMI,LB,6,Again,")?;

    let mut cmd = Command::new(cargo::cargo_bin!());
    cmd.arg("check-tags")
        .arg(shared_resource_path("tags.csv"))
        .arg(other.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("E0020"));

    Ok(())
}

#[test]
fn check_tags_when_trace_log_file_then_log_written() -> Result<(), Box<dyn std::error::Error>> {
    let log = NamedTempFile::new()?;

    let mut cmd = Command::new(cargo::cargo_bin!());
    cmd.arg("-vvvv")
        .arg("--log-file")
        .arg(log.path())
        .arg("check-tags")
        .arg(shared_resource_path("tags.csv"));
    cmd.assert().success();

    let contents = std::fs::read_to_string(log.path())?;
    assert!(contents.contains("Read 7 tags"));

    Ok(())
}

#[test]
fn indirect_when_tags_then_prints_macro() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!());

    indirect_args(&mut cmd).arg("--selector").arg("tank_selector");
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("// ---- tank_level_dispatch ----\n"))
        .stdout(predicate::str::contains("select case tank_level_selection"))
        .stdout(predicate::str::contains("end macro_command"));

    Ok(())
}

#[test]
fn indirect_when_json_then_prints_json() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!());

    indirect_args(&mut cmd)
        .arg("--direction")
        .arg("write")
        .arg("--name")
        .arg("store_level")
        .arg("--json");
    let output = cmd.assert().success().get_output().stdout.clone();

    let json: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(json["macros"][0]["name"], "store_level");
    assert!(json["macros"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .contains("SetData(level, \"Local HMI\", LW, 110, 1)"));

    Ok(())
}

#[test]
fn indirect_when_unknown_tag_then_err() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!());

    indirect_args(&mut cmd).arg("--selector").arg("no_such_tag");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("E0024"));

    Ok(())
}

#[test]
fn version_when_called_then_prints_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!());

    cmd.arg("version");
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("ebmacroc version"));

    Ok(())
}
