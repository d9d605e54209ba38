use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

/// Writes a config with one simulated unit per `[[simulator.devices]]` body.
fn write_config(dir: &tempfile::TempDir, devices: &[&str]) -> PathBuf {
    let mut toml = String::from("[controller]\nupdate_interval_ms = 10\n\n[simulator]\ndevices = []\n");
    if !devices.is_empty() {
        toml = String::from("[controller]\nupdate_interval_ms = 10\n");
        for body in devices {
            toml.push_str("\n[[simulator.devices]]\n");
            toml.push_str(body);
            toml.push('\n');
        }
    }
    let path = dir.path().join("jrk.toml");
    fs::write(&path, toml).unwrap();
    path
}

const UNIT_A: &str = "product = 1\nserial_number = \"A\"";
const UNIT_B: &str = "product = 2\nserial_number = \"B\"";

fn jrk(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("jrk").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["status"], 0, "Firmware version:  1.00", "stdout")]
#[case(&["list"], 0, "sim-A", "stdout")]
#[case(&["pid", "encode", "0.3"], 0, "multiplier=307 exponent=10", "stdout")]
#[case(&["pid", "decode", "3", "1"], 0, "constant=1.5", "stdout")]
#[case(&["pid", "decode", "2000", "0"], 2, "2000", "stderr")]
#[case(&["target", "5000"], 2, "5000", "stderr")]
#[case(&["current-table"], 0, "31\t17106", "stdout")]
#[case(&["current-table", "--product", "2"], 0, "95\t64309", "stdout")]
#[case(&["current-table", "--product", "5"], 6, "no current limit table", "stderr")]
#[case(&["stop"], 0, "Motor stopped.", "stdout")]
#[case(&["target", "3000"], 0, "Target set to 3000.", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &[UNIT_A]);

    let assert = jrk(&cfg).args(args).assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn no_devices_is_a_distinct_failure() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &[]);
    jrk(&cfg)
        .arg("status")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No jrk was found."));
    jrk(&cfg)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No devices found."));
}

#[test]
fn two_devices_need_an_explicit_choice() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &[UNIT_A, UNIT_B]);
    jrk(&cfg)
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--device"));
    jrk(&cfg)
        .args(["--device", "sim-B", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Jrk G2 24v21 (sim-B)"));
    jrk(&cfg)
        .args(["--device", "sim-C", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no listed device"));
}

#[test]
fn settings_save_then_load_and_apply() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &[UNIT_A]);
    let file = dir.path().join("settings.toml");

    jrk(&cfg)
        .args(["settings", "save"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Settings saved"));
    let text = fs::read_to_string(&file).unwrap();
    assert!(text.contains("[pid.proportional]"), "{text}");

    jrk(&cfg)
        .args(["--yes", "settings", "load"])
        .arg(&file)
        .arg("--apply")
        .assert()
        .success()
        .stdout(predicate::str::contains("applied"));
}

#[test]
fn loading_a_broken_settings_file_fails_as_config_error() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &[UNIT_A]);
    let file = dir.path().join("broken.toml");
    fs::write(&file, "product = 1\n[input]\nmode = \"joystick\"\n").unwrap();

    jrk(&cfg)
        .args(["settings", "load"])
        .arg(&file)
        .assert()
        .code(6)
        .stderr(predicate::str::contains("invalid settings file"));
}

#[test]
fn declined_restore_is_cancelled() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &[UNIT_A]);
    jrk(&cfg)
        .arg("restore-defaults")
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled."))
        .stderr(predicate::str::contains("Are you sure you want to continue?"));
    jrk(&cfg)
        .args(["--yes", "restore-defaults"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reset to their default values"));
}

#[rstest]
#[case("", "The motor is NOT inverted.")]
#[case("wiring_inverted = true", "The motor is inverted.")]
fn detect_direction_reports_result(#[case] extra: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let unit = format!("{UNIT_A}\n{extra}");
    let cfg = write_config(&dir, &[&unit]);
    jrk(&cfg)
        .args(["--yes", "detect-direction", "--apply"])
        .assert()
        .success()
        .stdout(predicate::str::contains(needle))
        .stdout(predicate::str::contains("Applied motor_invert"));
}

#[test]
fn detect_direction_without_movement_fails() {
    let dir = tempdir().unwrap();
    let unit = format!("{UNIT_A}\nstiction = 5000");
    let cfg = write_config(&dir, &[&unit]);
    jrk(&cfg)
        .args(["--yes", "detect-direction"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "did not change the measured feedback",
        ));
}

#[test]
fn watch_records_csv() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &[UNIT_A]);
    let csv = dir.path().join("telemetry.csv");
    jrk(&cfg)
        .args(["watch", "--ticks", "3", "--csv"])
        .arg(&csv)
        .assert()
        .success();
    let text = fs::read_to_string(&csv).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4, "{text}");
    assert!(lines[0].starts_with("tick,up_time_ms,target"));
    assert!(lines[1].starts_with("1,"));
    assert!(lines[3].starts_with("3,"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[controller]\nupdate_interval_ms = 0\n").unwrap();
    jrk(&cfg)
        .arg("list")
        .assert()
        .code(6)
        .stderr(predicate::str::contains("update_interval_ms"));
}
