use jrk_config::load_toml;
use rstest::rstest;

#[test]
fn empty_document_uses_defaults() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults are valid");
    assert_eq!(cfg.controller.update_interval_ms, 50);
    assert_eq!(cfg.controller.device_list_divider, 20);
    assert_eq!(cfg.simulator.devices.len(), 1);
    assert_eq!(cfg.simulator.devices[0].os_id(), "sim-00000001");
}

#[rstest]
#[case("[controller]\nupdate_interval_ms = 0", "update_interval_ms must be >= 1")]
#[case("[controller]\ndevice_list_divider = 0", "device_list_divider must be >= 1")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation")]
#[case(
    "[[simulator.devices]]\nproduct = 0\nserial_number = \"1\"",
    "product must be >= 1"
)]
#[case(
    "[[simulator.devices]]\nproduct = 1\nserial_number = \"1\"\nstart_feedback = 5000",
    "start_feedback must be <= 4095"
)]
#[case(
    "[[simulator.devices]]\nproduct = 1\nserial_number = \"1\"\n[[simulator.devices]]\nproduct = 2\nserial_number = \"1\"",
    "duplicates os_id"
)]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "unexpected message: {err}"
    );
}

#[test]
fn simulator_devices_parse_with_defaults() {
    let toml = r#"
[controller]
update_interval_ms = 20

[[simulator.devices]]
product = 2
serial_number = "12345678"
wiring_inverted = true
stiction = 30
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    let d = &cfg.simulator.devices[0];
    assert_eq!(d.product, 2);
    assert!(d.wiring_inverted);
    assert_eq!(d.stiction, 30);
    assert_eq!(d.start_feedback, 2048);
    assert_eq!(d.firmware_version, 0x0100);
}
