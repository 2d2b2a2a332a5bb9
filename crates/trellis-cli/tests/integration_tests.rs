//! Integration tests for trellis-cli, run against the built binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SCHEMA: &str = r##"{
    "root": {
        "type": "folder", "name": "%PROJECT%",
        "children": [
            { "type": "file", "name": "README.md", "content": "# %PROJECT:upper%\n" },
            { "type": "folder", "name": "src", "children": [
                { "type": "file", "name": "main.rs", "content": "fn main() {}\n" }
            ]},
            { "type": "if", "condition_var": "DOCS", "children": [
                { "type": "folder", "name": "docs" }
            ]}
        ]
    }
}"##;

/// A command rooted in `dir`, isolated from the user's config and logging.
fn trellis(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("trellis").unwrap();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env("HOME", dir)
        .env_remove("RUST_LOG")
        .env_remove("NO_COLOR");
    cmd
}

fn workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("schema.json"), SCHEMA).unwrap();
    temp
}

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    trellis(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("undo"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_version_flag() {
    let temp = TempDir::new().unwrap();
    trellis(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_create_writes_structure() {
    let temp = workspace();
    trellis(temp.path())
        .args(["create", "schema.json", "-o", "out", "--var", "PROJECT=demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created folder"))
        .stdout(predicate::str::contains("Structure created"));

    let root = temp.path().join("out/demo");
    assert_eq!(
        fs::read_to_string(root.join("README.md")).unwrap(),
        "# DEMO\n"
    );
    assert!(root.join("src/main.rs").is_file());
    assert!(!root.join("docs").exists());
}

#[test]
fn test_create_reads_vars_file() {
    let temp = workspace();
    fs::write(
        temp.path().join("vars.toml"),
        "PROJECT = \"fromfile\"\nDOCS = \"yes\"\n",
    )
    .unwrap();

    trellis(temp.path())
        .args(["create", "schema.json", "-o", "out", "--vars", "vars.toml"])
        .assert()
        .success();

    assert!(temp.path().join("out/fromfile/docs").is_dir());
}

#[test]
fn test_dry_run_writes_nothing() {
    let temp = workspace();
    trellis(temp.path())
        .args([
            "create",
            "schema.json",
            "-o",
            "out",
            "--var",
            "PROJECT=demo",
            "--dry-run",
            "--record",
            "run.json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would create folder"))
        .stdout(predicate::str::contains("no record written"));

    assert!(!temp.path().join("out").exists());
    assert!(!temp.path().join("run.json").exists());
}

#[test]
fn test_record_then_undo() {
    let temp = workspace();
    fs::create_dir(temp.path().join("out")).unwrap();

    trellis(temp.path())
        .args([
            "create",
            "schema.json",
            "-o",
            "out",
            "--var",
            "PROJECT=demo",
            "--record",
            "run.json",
        ])
        .assert()
        .success();
    assert!(temp.path().join("run.json").is_file());
    assert!(temp.path().join("out/demo/src/main.rs").is_file());

    trellis(temp.path())
        .args(["undo", "run.json", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would delete file"));
    assert!(temp.path().join("out/demo/src/main.rs").is_file());

    trellis(temp.path())
        .args(["undo", "run.json", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Undo complete"));
    assert!(!temp.path().join("out/demo").exists());
    assert!(temp.path().join("out").is_dir());
}

#[test]
fn test_undo_keeps_user_files() {
    let temp = workspace();
    trellis(temp.path())
        .args([
            "create",
            "schema.json",
            "-o",
            "out",
            "--var",
            "PROJECT=demo",
            "--record",
            "run.json",
        ])
        .assert()
        .success();
    fs::write(temp.path().join("out/demo/src/notes.txt"), "mine").unwrap();

    trellis(temp.path())
        .args(["undo", "run.json", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Folder not empty, skipped"));

    assert!(temp.path().join("out/demo/src/notes.txt").is_file());
    assert!(!temp.path().join("out/demo/src/main.rs").exists());
}

#[test]
fn test_preview_json() {
    let temp = workspace();
    let assert = trellis(temp.path())
        .args([
            "--output-format",
            "json",
            "preview",
            "schema.json",
            "-o",
            "out",
            "--var",
            "PROJECT=demo",
        ])
        .assert()
        .success();

    let diff: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(diff["root"]["name"], "demo");
    assert_eq!(diff["root"]["action"], "create");
    assert_eq!(diff["summary"]["creates"], 4);
    assert!(!temp.path().join("out").exists());
}

#[test]
fn test_preview_shows_overwrite_hunks() {
    let temp = workspace();
    fs::create_dir_all(temp.path().join("out/demo")).unwrap();
    fs::write(temp.path().join("out/demo/README.md"), "old\n").unwrap();

    trellis(temp.path())
        .args([
            "preview",
            "schema.json",
            "-o",
            "out",
            "--var",
            "PROJECT=demo",
            "--overwrite",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("~ README.md"))
        .stdout(predicate::str::contains("-old"))
        .stdout(predicate::str::contains("+# DEMO"));

    assert_eq!(
        fs::read_to_string(temp.path().join("out/demo/README.md")).unwrap(),
        "old\n"
    );
}

#[test]
fn test_node_errors_only_fail_under_strict() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("bad.json"),
        r#"{ "root": { "type": "folder", "name": "demo", "children": [
            { "type": "file", "name": "%ESCAPE%" },
            { "type": "file", "name": "ok.txt" }
        ]}}"#,
    )
    .unwrap();

    trellis(temp.path())
        .args(["create", "bad.json", "-o", "out", "--var", "ESCAPE=../x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalid name"));
    assert!(temp.path().join("out/demo/ok.txt").is_file());
    assert!(!temp.path().join("out/x").exists());

    trellis(temp.path())
        .args([
            "create", "bad.json", "-o", "out2", "--var", "ESCAPE=../x", "--strict",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("node error"));
}

#[test]
fn test_validate() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("rules.json"),
        r#"{ "NAME": { "required": true, "minLength": 3 } }"#,
    )
    .unwrap();

    trellis(temp.path())
        .args(["validate", "--rules", "rules.json", "--var", "NAME=ab"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("NAME: NAME must be at least 3 characters"));

    trellis(temp.path())
        .args(["validate", "--rules", "rules.json", "--var", "NAME=abcd"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All 1 rule(s) passed"));
}

#[test]
fn test_check_warns_but_passes() {
    let temp = workspace();
    trellis(temp.path())
        .args(["check", "schema.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PROJECT"));
}

#[test]
fn test_check_fails_on_errors() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("dup.json"),
        r#"{ "root": { "type": "folder", "name": "demo", "children": [
            { "type": "file", "name": "a.txt" },
            { "type": "file", "name": "a.txt" }
        ]}}"#,
    )
    .unwrap();

    trellis(temp.path())
        .args(["check", "dup.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Schema has 1 error(s)"));
}

#[test]
fn test_config_get_and_env_override() {
    let temp = TempDir::new().unwrap();
    trellis(temp.path())
        .args(["config", "get", "engine.max_depth"])
        .assert()
        .success()
        .stdout(predicate::str::diff("64\n"));

    trellis(temp.path())
        .env("TRELLIS_ENGINE__MAX_DEPTH", "7")
        .args(["config", "get", "engine.max_depth"])
        .assert()
        .success()
        .stdout(predicate::str::diff("7\n"));
}

#[test]
fn test_config_file_flag() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("trellis.toml"),
        "[defaults]\nproject_name = \"configured\"\n",
    )
    .unwrap();

    trellis(temp.path())
        .args(["--config", "trellis.toml", "config", "get", "defaults.project_name"])
        .assert()
        .success()
        .stdout(predicate::str::diff("configured\n"));
}

#[test]
fn test_config_path() {
    let temp = TempDir::new().unwrap();
    trellis(temp.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_completions_bash() {
    let temp = TempDir::new().unwrap();
    trellis(temp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trellis"));
}
