#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for the jrk configuration tool.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `settings_file` holds the textual format used to save and load device
//!   settings outside the device.
use serde::Deserialize;

mod bridge;
pub mod settings_file;

pub use settings_file::{SettingsFile, load_settings_toml, settings_to_toml};

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControllerCfg {
    /// Period of the polling timer that drives `Controller::update`.
    pub update_interval_ms: u64,
    /// Refresh the device list once every this many ticks.
    pub device_list_divider: u32,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            update_interval_ms: 50,
            device_list_divider: 20,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// One simulated jrk on the virtual bus.
#[derive(Debug, Deserialize, Clone)]
pub struct SimDevice {
    pub product: u32,
    pub serial_number: String,
    /// Defaults to `sim-<serial_number>`.
    #[serde(default)]
    pub os_id: Option<String>,
    #[serde(default = "default_firmware_version")]
    pub firmware_version: u16,
    /// Motor leads swapped relative to the feedback potentiometer.
    #[serde(default)]
    pub wiring_inverted: bool,
    /// Feedback counts the plant refuses to move by (0 = ideal plant).
    #[serde(default)]
    pub stiction: u16,
    #[serde(default = "default_start_feedback")]
    pub start_feedback: u16,
}

fn default_firmware_version() -> u16 {
    0x0100
}

fn default_start_feedback() -> u16 {
    2048
}

impl SimDevice {
    pub fn os_id(&self) -> String {
        self.os_id
            .clone()
            .unwrap_or_else(|| format!("sim-{}", self.serial_number))
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulatorCfg {
    pub devices: Vec<SimDevice>,
}

impl Default for SimulatorCfg {
    fn default() -> Self {
        Self {
            devices: vec![SimDevice {
                product: 1,
                serial_number: "00000001".to_string(),
                os_id: None,
                firmware_version: default_firmware_version(),
                wiring_inverted: false,
                stiction: 0,
                start_feedback: default_start_feedback(),
            }],
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub controller: ControllerCfg,
    pub logging: Logging,
    pub simulator: SimulatorCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Controller
        if self.controller.update_interval_ms == 0 {
            eyre::bail!("controller.update_interval_ms must be >= 1");
        }
        if self.controller.update_interval_ms > 10_000 {
            eyre::bail!("controller.update_interval_ms is unreasonably large (>10s)");
        }
        if self.controller.device_list_divider == 0 {
            eyre::bail!("controller.device_list_divider must be >= 1");
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rotation:?}");
        }

        // Simulator
        let mut seen = std::collections::HashSet::new();
        for (i, d) in self.simulator.devices.iter().enumerate() {
            if d.product == 0 {
                eyre::bail!("simulator.devices[{i}].product must be >= 1");
            }
            if d.serial_number.is_empty() {
                eyre::bail!("simulator.devices[{i}].serial_number must not be empty");
            }
            if d.start_feedback > 4095 {
                eyre::bail!("simulator.devices[{i}].start_feedback must be <= 4095");
            }
            if !seen.insert(d.os_id()) {
                eyre::bail!("simulator.devices[{i}] duplicates os_id {:?}", d.os_id());
            }
        }

        Ok(())
    }
}
