//! Integration tests for core CLI contract behavior.

use {predicates::prelude::*, std::fs, tempfile::tempdir};

fn cli_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flashcheck");
    cmd.env_remove("FLASHCHECK_TEST_DIR")
        .env_remove("FLASHCHECK_LANG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_exits_zero_and_writes_stdout_only() {
    let mut cmd = cli_cmd();
    cmd.args(["--lang", "en", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("flashcheck"))
        .stdout(predicate::str::contains("list-ports"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn localized_help_uses_traditional_chinese() {
    let mut cmd = cli_cmd();
    cmd.args(["--lang", "zh-TW", "-h"])
        .assert()
        .success()
        .stdout(predicate::str::contains("用法"));
}

#[test]
fn subcommand_help_exits_zero() {
    let mut cmd = cli_cmd();
    cmd.args(["test", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PORT"));
}

#[test]
fn version_exits_zero_and_writes_stdout_only() {
    let mut cmd = cli_cmd();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("flashcheck"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn list_ports_json_returns_valid_json() {
    let mut cmd = cli_cmd();
    let output = cmd
        .args(["list-ports", "--json"])
        .output()
        .expect("command should execute");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("stdout should be JSON");
    assert!(parsed.is_array(), "should be a JSON array");
}

#[test]
fn completions_bash_exits_zero() {
    let mut cmd = cli_cmd();
    cmd.args(["completions", "bash"])
        .assert()
        .success()
        .code(0)
        .stdout(predicate::str::contains("flashcheck"));
}

// ============================================================================
// Exit Code Tests
// ============================================================================

#[test]
fn exit_code_two_without_arguments() {
    let mut cmd = cli_cmd();
    cmd.assert().failure().code(2);
}

#[test]
fn exit_code_two_for_missing_port() {
    let mut cmd = cli_cmd();
    cmd.arg("firmware.bin")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("PORT"));
}

#[test]
fn exit_code_two_for_usage_error_invalid_flag() {
    let mut cmd = cli_cmd();
    cmd.arg("--invalid-flag-xyz").assert().failure().code(2);
}

#[test]
fn exit_code_two_for_test_without_port() {
    let mut cmd = cli_cmd();
    cmd.arg("test").assert().failure().code(2);
}

#[test]
fn invalid_config_warns_and_continues() {
    let dir = tempdir().expect("tempdir should be created");
    fs::write(dir.path().join("flashcheck.toml"), "invalid toml [[[")
        .expect("write invalid config");

    let output = cli_cmd()
        .current_dir(dir.path())
        .args(["list-ports", "--json"])
        .output()
        .expect("command should execute");

    assert!(
        output.status.success(),
        "command should succeed despite config warning"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("TOML"), "should warn about invalid TOML: {stderr}");
}

#[test]
fn missing_test_dir_is_a_vacuous_pass() {
    let dir = tempdir().expect("tempdir should be created");

    cli_cmd()
        .args(["--lang", "en", "--test-dir"])
        .arg(dir.path().join("nope"))
        .args(["test", "COM7"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Cannot read test directory"));
}

#[cfg(unix)]
mod scripted_runner {
    use super::*;

    /// Config that runs `sh <script> <port>` for each `test*.sh` file.
    fn write_sh_config(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("cfg.toml");
        fs::write(
            &path,
            r#"
[tests]
runner = "sh"
runner_args = ["{script}", "{port}"]
extension = "sh"
"#,
        )
        .expect("write config");
        path
    }

    #[test]
    fn passing_suite_exits_zero_and_echoes_output() {
        let dir = tempdir().expect("tempdir should be created");
        let config = write_sh_config(dir.path());
        let tests = dir.path().join("tests");
        fs::create_dir(&tests).expect("create tests dir");
        fs::write(tests.join("test_a.sh"), "echo \"port=$1\"\necho '**OK**'\n").unwrap();
        fs::write(tests.join("test_b.sh"), "echo '**OK**'\n").unwrap();

        cli_cmd()
            .arg("--config")
            .arg(&config)
            .arg("--test-dir")
            .arg(&tests)
            .args(["--lang", "en", "test", "COM7"])
            .assert()
            .success()
            .stdout(predicate::str::contains("port=COM7"))
            .stdout(predicate::str::contains("**OK**"));
    }

    #[test]
    fn failing_suite_exits_one() {
        let dir = tempdir().expect("tempdir should be created");
        let config = write_sh_config(dir.path());
        let tests = dir.path().join("tests");
        fs::create_dir(&tests).expect("create tests dir");
        fs::write(tests.join("test_a.sh"), "echo 'connecting...'\n").unwrap();
        fs::write(tests.join("test_b.sh"), "echo '**OK**'\n").unwrap();

        cli_cmd()
            .arg("--config")
            .arg(&config)
            .arg("--test-dir")
            .arg(&tests)
            .args(["--lang", "en", "test", "COM7"])
            .assert()
            .failure()
            .code(1)
            .stdout(predicate::str::contains("connecting..."))
            .stdout(predicate::str::contains("**OK**").not())
            .stderr(predicate::str::contains("test_a.sh"));
    }

    #[test]
    fn test_dir_from_environment() {
        let dir = tempdir().expect("tempdir should be created");
        let config = write_sh_config(dir.path());
        let tests = dir.path().join("tests");
        fs::create_dir(&tests).expect("create tests dir");
        fs::write(tests.join("test_env.sh"), "echo 'from-env **OK**'\n").unwrap();

        cli_cmd()
            .env("FLASHCHECK_TEST_DIR", &tests)
            .arg("--config")
            .arg(&config)
            .args(["test", "COM7"])
            .assert()
            .success()
            .stdout(predicate::str::contains("from-env"));
    }
}
