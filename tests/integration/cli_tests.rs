use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn dupsift(config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dupsift").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env_remove("RUST_LOG")
        .arg("--no-progress")
        .arg("--no-color");
    cmd
}

fn fixture() -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"XXXXXXXXXX").unwrap();
    fs::write(dir.path().join("b.txt"), b"XXXXXXXXXX").unwrap();
    fs::write(dir.path().join("c.txt"), b"YYYYYYYYYY").unwrap();
    dir
}

#[test]
fn test_text_report_lists_group() {
    let dir = fixture();
    let home = tempdir().unwrap();

    let output = dupsift(home.path())
        .arg(dir.path())
        .assert()
        .success()
        .get_output()
        .clone();

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Matching xxhash64 "));
    assert!(stdout.contains("a.txt"));
    assert!(stdout.contains("b.txt"));
    assert!(!stdout.contains("c.txt"));
}

#[test]
fn test_json_report() {
    let dir = fixture();
    let home = tempdir().unwrap();

    let output = dupsift(home.path())
        .arg(dir.path())
        .args(["--output", "json"])
        .assert()
        .success()
        .get_output()
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["hash_algorithm"], "xxhash64");
    assert_eq!(json["duplicates"].as_array().unwrap().len(), 1);
    assert_eq!(json["summary"]["files_observed"], 3);
    assert_eq!(json["summary"]["duplicate_files"], 1);
    assert_eq!(json["summary"]["exit_code"], 0);
}

#[test]
fn test_no_duplicates_still_succeeds() {
    let dir = tempdir().unwrap();
    let home = tempdir().unwrap();
    dupsift(home.path()).arg(dir.path()).assert().success();
}

#[test]
fn test_missing_root_exits_one() {
    let dir = tempdir().unwrap();
    let home = tempdir().unwrap();

    let output = dupsift(home.path())
        .arg(dir.path().join("nope"))
        .assert()
        .code(1)
        .get_output()
        .clone();
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("[DS001]"));
}

#[test]
fn test_verify_without_quickstat_exits_two() {
    let dir = fixture();
    let home = tempdir().unwrap();

    let output = dupsift(home.path())
        .arg(dir.path())
        .arg("--verify")
        .assert()
        .code(2)
        .get_output()
        .clone();
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("--verify requires --quickstat"));
}

#[test]
fn test_dump_tainted_without_verify_exits_two() {
    let dir = fixture();
    let home = tempdir().unwrap();
    dupsift(home.path())
        .arg(dir.path())
        .args(["--quickstat", "--dump-tainted"])
        .assert()
        .code(2);
}

#[test]
fn test_json_errors() {
    let dir = tempdir().unwrap();
    let home = tempdir().unwrap();

    let output = dupsift(home.path())
        .arg(dir.path().join("nope"))
        .arg("--json-errors")
        .assert()
        .code(1)
        .get_output()
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(json["code"], "DS001");
    assert_eq!(json["interrupted"], false);
}

#[test]
fn test_bad_config_file_exits_two() {
    let dir = fixture();
    let home = tempdir().unwrap();
    let config = home.path().join("bad.toml");
    fs::write(&config, "piece_size = 0").unwrap();

    dupsift(home.path())
        .arg(dir.path())
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2);
}

#[test]
fn test_quickstat_verify_text_sections() {
    let dir = tempdir().unwrap();
    let home = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, b"content-1").unwrap();
    fs::write(&b, b"content-2").unwrap();
    let mtime = filetime::FileTime::from_unix_time(1_600_000_000, 0);
    filetime::set_file_mtime(&a, mtime).unwrap();
    filetime::set_file_mtime(&b, mtime).unwrap();

    let output = dupsift(home.path())
        .arg(dir.path())
        .args(["--quickstat", "--verify", "--dump-tainted"])
        .assert()
        .success()
        .get_output()
        .clone();

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Matching qstats (unverified)"));
    assert!(stdout.contains("Verification"));
    assert!(stdout.contains("1 tainted"));
    assert!(stdout.contains("disagree"));
}
