use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

const CONFIG: &str = r#"
[[simulator.devices]]
product = 1
serial_number = "A"
"#;

#[rstest]
#[case("get_settings", &["status"])]
#[case("set_settings", &["--yes", "apply"])]
#[case("set_target", &["target", "100"])]
fn device_timeout_bubbles_to_cli(#[case] fault: &str, #[case] args: &[&str]) {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("jrk.toml");
    fs::write(&cfg, CONFIG).unwrap();

    let mut cmd = Command::cargo_bin("jrk").unwrap();
    cmd.env("JRK_TEST_SIM_FAULT", fault);
    cmd.arg("--config").arg(&cfg).args(args);
    cmd.assert().code(4).stderr(predicate::str::contains(
        "What happened: The device did not answer in time.",
    ));
}

#[rstest]
fn open_failure_is_access_denied_in_json() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("jrk.toml");
    fs::write(&cfg, CONFIG).unwrap();

    let mut cmd = Command::cargo_bin("jrk").unwrap();
    cmd.env("JRK_TEST_SIM_FAULT", "open");
    cmd.arg("--json").arg("--config").arg(&cfg).arg("status");
    let out = cmd.assert().code(5).get_output().stdout.clone();
    let stdout = String::from_utf8_lossy(&out);
    let line = stdout.lines().find(|l| l.contains("\"reason\"")).unwrap_or("");
    let v: serde_json::Value = serde_json::from_str(line).expect("valid JSON");
    assert_eq!(v["reason"], "AccessDenied");
    assert_eq!(v["exit_code"], 5);
}
