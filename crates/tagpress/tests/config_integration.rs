//! Configuration integration tests.
//!
//! These tests verify config discovery, format parsing, and precedence
//! from an end-to-end perspective using the compiled binary. The `assets`
//! and `notes` commands make the effective configuration observable.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Returns a Command configured to run our binary.
#[allow(deprecated)]
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    for var in [
        "GITHUB_REF",
        "ALLOW_EMPTY_CHANGELOG",
        "INPUT_ALLOW_EMPTY_CHANGELOG",
        "CHANGELOG_FILE",
        "INPUT_CHANGELOG_FILE",
        "IGNORE_CHANGELOG",
        "INPUT_IGNORE_CHANGELOG",
        "ALLOW_TAG_PREFIX",
        "INPUT_ALLOW_TAG_PREFIX",
        "RUST_LOG",
        "TAGPRESS_LOG_PATH",
        "TAGPRESS_LOG_DIR",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn touch(dir: &Path, name: &str) {
    fs::write(dir.join(name), name).unwrap();
}

// =============================================================================
// Config File Discovery
// =============================================================================

#[test]
fn runs_without_config_file() {
    // The CLI should work even when no config file exists
    let tmp = TempDir::new().unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "assets"])
        .assert()
        .success();
}

#[test]
fn discovers_dotfile_config_in_current_dir() {
    let tmp = TempDir::new().unwrap();
    touch(tmp.path(), "from-dotfile.txt");
    fs::write(
        tmp.path().join(".tagpress.toml"),
        r#"assets = ["from-dotfile.txt"]"#,
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "assets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from-dotfile.txt"));
}

#[test]
fn discovers_regular_config_in_current_dir() {
    let tmp = TempDir::new().unwrap();
    touch(tmp.path(), "from-regular.txt");
    fs::write(
        tmp.path().join("tagpress.toml"),
        r#"assets = ["from-regular.txt"]"#,
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "assets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from-regular.txt"));
}

#[test]
fn discovers_config_in_parent_directory() {
    let tmp = TempDir::new().unwrap();
    let sub_dir = tmp.path().join("nested").join("deep");
    fs::create_dir_all(&sub_dir).unwrap();
    touch(&sub_dir, "nested.bin");

    // Config in root, run from nested/deep
    fs::write(tmp.path().join(".tagpress.toml"), r#"assets = ["*.bin"]"#).unwrap();

    cmd()
        .args(["-C", sub_dir.to_str().unwrap(), "assets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nested.bin"));
}

#[test]
fn dotfile_takes_precedence_over_regular_name() {
    let tmp = TempDir::new().unwrap();
    touch(tmp.path(), "dot.txt");
    touch(tmp.path(), "regular.txt");

    // Both configs exist
    fs::write(tmp.path().join(".tagpress.toml"), r#"assets = ["dot.txt"]"#).unwrap();
    fs::write(tmp.path().join("tagpress.toml"), r#"assets = ["regular.txt"]"#).unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "assets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dot.txt"))
        .stdout(predicate::str::contains("regular.txt").not());
}

// =============================================================================
// Config Format Parsing
// =============================================================================

#[test]
fn parses_yaml_config() {
    let tmp = TempDir::new().unwrap();
    touch(tmp.path(), "a.zip");
    touch(tmp.path(), "b.zip");
    fs::write(
        tmp.path().join(".tagpress.yaml"),
        "assets:\n  - a.zip\n  - b.zip\n",
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "assets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 assets"));
}

#[test]
fn parses_yml_extension() {
    let tmp = TempDir::new().unwrap();
    touch(tmp.path(), "a.zip");
    fs::write(tmp.path().join("tagpress.yml"), "assets: [a.zip]\n").unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "assets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.zip"));
}

#[test]
fn parses_json_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("HISTORY.md"), "## 2.0.0\n- json config\n").unwrap();
    fs::write(
        tmp.path().join(".tagpress.json"),
        r#"{"changelog_file": "HISTORY.md"}"#,
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "notes", "--version", "2.0.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- json config"));
}

#[test]
fn invalid_config_fails() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".tagpress.toml"), "assets = [[[ not toml").unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "assets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[test]
fn wrong_type_in_config_fails() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".tagpress.toml"), "draft_release = \"often\"").unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "assets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

// =============================================================================
// Explicit Config & Precedence
// =============================================================================

#[test]
fn explicit_config_overrides_discovered() {
    let tmp = TempDir::new().unwrap();
    touch(tmp.path(), "discovered.txt");
    touch(tmp.path(), "explicit.txt");
    fs::write(
        tmp.path().join(".tagpress.toml"),
        r#"assets = ["discovered.txt"]"#,
    )
    .unwrap();
    let explicit = tmp.path().join("release.toml");
    fs::write(&explicit, r#"assets = ["explicit.txt"]"#).unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap()])
        .args(["--config", explicit.to_str().unwrap(), "assets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("explicit.txt"))
        .stdout(predicate::str::contains("discovered.txt").not());
}

#[test]
fn missing_explicit_config_fails() {
    let tmp = TempDir::new().unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap()])
        .args(["--config", "/nonexistent/tagpress.toml", "assets"])
        .assert()
        .failure();
}

#[test]
fn command_line_patterns_follow_configured_ones() {
    let tmp = TempDir::new().unwrap();
    touch(tmp.path(), "configured.txt");
    touch(tmp.path(), "extra.txt");
    fs::write(
        tmp.path().join(".tagpress.toml"),
        r#"assets = ["configured.txt"]"#,
    )
    .unwrap();

    let output = cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "--json", "assets", "extra.txt"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json[0]["name"], "configured.txt");
    assert_eq!(json[1]["name"], "extra.txt");
}

#[test]
fn environment_overrides_config_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("CHANGELOG.md"), "## 1.0.0\n- one\n").unwrap();
    fs::write(
        tmp.path().join(".tagpress.toml"),
        "allow_empty_changelog = false\n",
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "notes", "--version", "9.9.9"])
        .assert()
        .failure();

    cmd()
        .env("INPUT_ALLOW_EMPTY_CHANGELOG", "true")
        .args(["-C", tmp.path().to_str().unwrap(), "notes", "--version", "9.9.9"])
        .assert()
        .success();
}

#[test]
fn disabled_changelog_skips_reading() {
    let tmp = TempDir::new().unwrap();

    // No changelog on disk; disabling it means nothing is read
    cmd()
        .env("CHANGELOG_FILE", "none")
        .env("ALLOW_EMPTY_CHANGELOG", "yes")
        .args(["-C", tmp.path().to_str().unwrap(), "notes", "--version", "1.0.0"])
        .assert()
        .success();
}

#[test]
fn malformed_environment_flag_fails() {
    let tmp = TempDir::new().unwrap();

    cmd()
        .env("ALLOW_TAG_PREFIX", "maybe")
        .args(["-C", tmp.path().to_str().unwrap(), "assets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ALLOW_TAG_PREFIX"));
}

#[test]
fn tag_prefix_setting_applies_to_notes() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("CHANGELOG.md"), "## 1.4.0\n- prefixed\n").unwrap();
    fs::write(tmp.path().join(".tagpress.toml"), "allow_tag_prefix = true\n").unwrap();

    cmd()
        .env("GITHUB_REF", "refs/tags/release-1.4.0")
        .args(["-C", tmp.path().to_str().unwrap(), "notes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- prefixed"));
}
