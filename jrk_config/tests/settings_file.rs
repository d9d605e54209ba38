use jrk_config::settings_file::{FeedbackModeToml, InputModeToml, SerialModeToml};
use jrk_config::{load_settings_toml, settings_to_toml};
use std::fs;
use tempfile::tempdir;

const SAMPLE: &str = r#"
product = 1
firmware_version = 256

[input]
mode = "analog"
analog_samples_exponent = 7
detect_disconnect = true
invert = false
absolute_minimum = 0
absolute_maximum = 4095
minimum = 100
maximum = 4000
neutral_minimum = 2000
neutral_maximum = 2100
output_minimum = 0
output_neutral = 2048
output_maximum = 4095
scaling_degree = 1

[serial]
mode = "uart"
baud_rate = 115200
enable_crc = true
device_number = 11
enable_14bit_device_number = false
timeout_ms = 0
disable_compact_protocol = false
never_sleep = false

[feedback]
mode = "analog"
invert = false
absolute_minimum = 0
absolute_maximum = 4095
minimum = 0
maximum = 4095
analog_samples_exponent = 7
detect_disconnect = false
dead_zone = 0

[pid]
period = 10
integral_limit = 1000
reset_integral = false

[pid.proportional]
multiplier = 5
exponent = 0

[pid.integral]
multiplier = 1
exponent = 4

[pid.derivative]
multiplier = 0
exponent = 0

[motor]
pwm_frequency = 0
invert = true
max_duty_cycle_while_feedback_out_of_range = 600
coast_when_off = false

[motor.forward]
max_duty_cycle = 600
max_acceleration = 600
max_deceleration = 600
brake_duration_ms = 0
max_current_code = 31
current_calibration = 0

[motor.reverse]
max_duty_cycle = 400
max_acceleration = 600
max_deceleration = 600
brake_duration_ms = 0
max_current_code = 31
current_calibration = 0
"#;

#[test]
fn parses_sample_and_defaults_calibration() {
    let file = load_settings_toml(SAMPLE).expect("parse settings");
    assert_eq!(file.input.mode, InputModeToml::Analog);
    assert_eq!(file.serial.mode, SerialModeToml::Uart);
    assert_eq!(file.feedback.mode, FeedbackModeToml::Analog);
    assert_eq!(file.pid.integral.exponent, 4);
    assert_eq!(file.motor.reverse.max_duty_cycle, 400);
    assert_eq!(file.calibration.current_offset, 0);
    assert!(file.motor.invert);
}

#[test]
fn serialized_text_reloads_identically() {
    let file = load_settings_toml(SAMPLE).expect("parse settings");
    let text = settings_to_toml(&file).expect("serialize");
    let dir = tempdir().unwrap();
    let path = dir.path().join("jrk.toml");
    fs::write(&path, &text).unwrap();
    let again = load_settings_toml(&fs::read_to_string(&path).unwrap()).expect("reparse");
    assert_eq!(file, again);
}

#[test]
fn rejects_unknown_mode_and_missing_product() {
    let bad_mode = SAMPLE.replace("mode = \"uart\"", "mode = \"bluetooth\"");
    let err = load_settings_toml(&bad_mode).expect_err("unknown serial mode");
    assert!(err.to_string().contains("invalid settings file"));

    let no_product = SAMPLE.replace("product = 1", "product = 0");
    let err = load_settings_toml(&no_product).expect_err("zero product");
    assert!(err.to_string().contains("product must be set"));
}
