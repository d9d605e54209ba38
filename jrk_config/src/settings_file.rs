//! Textual settings format.
//!
//! Example:
//! ```toml
//! product = 1
//! firmware_version = 256
//!
//! [input]
//! mode = "analog"
//! ...
//! [pid.proportional]
//! multiplier = 5
//! exponent = 0
//! ```
//!
//! The parser only checks shape and types. Range checks belong to the
//! settings fixer so that a file with odd values still loads and the user
//! sees what gets corrected.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputModeToml {
    Serial,
    Analog,
    Rc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackModeToml {
    None,
    Analog,
    Frequency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerialModeToml {
    UsbDualPort,
    UsbChained,
    Uart,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSection {
    pub mode: InputModeToml,
    pub analog_samples_exponent: u8,
    pub detect_disconnect: bool,
    pub invert: bool,
    pub absolute_minimum: u16,
    pub absolute_maximum: u16,
    pub minimum: u16,
    pub maximum: u16,
    pub neutral_minimum: u16,
    pub neutral_maximum: u16,
    pub output_minimum: u16,
    pub output_neutral: u16,
    pub output_maximum: u16,
    pub scaling_degree: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialSection {
    pub mode: SerialModeToml,
    pub baud_rate: u32,
    pub enable_crc: bool,
    pub device_number: u16,
    pub enable_14bit_device_number: bool,
    pub timeout_ms: u32,
    pub disable_compact_protocol: bool,
    pub never_sleep: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSection {
    pub mode: FeedbackModeToml,
    pub invert: bool,
    pub absolute_minimum: u16,
    pub absolute_maximum: u16,
    pub minimum: u16,
    pub maximum: u16,
    pub analog_samples_exponent: u8,
    pub detect_disconnect: bool,
    pub dead_zone: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidTerm {
    pub multiplier: u16,
    pub exponent: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidSection {
    pub period: u16,
    pub integral_limit: u16,
    pub reset_integral: bool,
    pub proportional: PidTerm,
    pub integral: PidTerm,
    pub derivative: PidTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorDirection {
    pub max_duty_cycle: u16,
    pub max_acceleration: u16,
    pub max_deceleration: u16,
    pub brake_duration_ms: u32,
    pub max_current_code: u16,
    pub current_calibration: i16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorSection {
    pub pwm_frequency: u8,
    pub invert: bool,
    pub max_duty_cycle_while_feedback_out_of_range: u16,
    pub coast_when_off: bool,
    pub forward: MotorDirection,
    pub reverse: MotorDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CalibrationSection {
    pub current_offset: i16,
    pub current_scale: i16,
    pub vin: i16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsFile {
    pub product: u32,
    #[serde(default)]
    pub firmware_version: u16,
    pub input: InputSection,
    pub serial: SerialSection,
    pub feedback: FeedbackSection,
    pub pid: PidSection,
    pub motor: MotorSection,
    #[serde(default)]
    pub calibration: CalibrationSection,
}

pub fn load_settings_toml(s: &str) -> eyre::Result<SettingsFile> {
    let file: SettingsFile =
        toml::from_str(s).map_err(|e| eyre::eyre!("invalid settings file: {e}"))?;
    if file.product == 0 {
        eyre::bail!("invalid settings file: product must be set");
    }
    Ok(file)
}

pub fn settings_to_toml(file: &SettingsFile) -> eyre::Result<String> {
    toml::to_string_pretty(file).map_err(|e| eyre::eyre!("serialize settings: {e}"))
}
