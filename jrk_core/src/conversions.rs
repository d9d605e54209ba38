//! Bridges from `jrk_config` into core types and the textual settings format.

use jrk_config::SettingsFile;
use jrk_traits::Settings;

use crate::controller::ControllerConfig;

impl From<&jrk_config::ControllerCfg> for ControllerConfig {
    fn from(c: &jrk_config::ControllerCfg) -> Self {
        Self {
            update_interval_ms: c.update_interval_ms,
            device_list_divider: c.device_list_divider,
        }
    }
}

/// Parses the textual settings format into a snapshot.
pub fn settings_from_string(text: &str) -> eyre::Result<Settings> {
    let file = jrk_config::load_settings_toml(text)?;
    Ok(Settings::from(&file))
}

/// Serializes a snapshot into the textual settings format.
pub fn settings_to_string(settings: &Settings) -> eyre::Result<String> {
    jrk_config::settings_to_toml(&SettingsFile::from(settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jrk_traits::{InputMode, PidCoefficient, SerialMode};

    #[test]
    fn settings_survive_text_round_trip() {
        let mut s = Settings::defaults_for(2);
        s.input_mode = InputMode::Rc;
        s.serial_mode = SerialMode::Uart;
        s.pid[2] = PidCoefficient::new(3, 7);
        s.motor_reverse.max_duty_cycle = 321;
        s.vin_calibration = -12;
        let text = settings_to_string(&s).unwrap();
        assert_eq!(settings_from_string(&text).unwrap(), s);
    }

    #[test]
    fn controller_cfg_maps_fields() {
        let cfg = jrk_config::ControllerCfg {
            update_interval_ms: 25,
            device_list_divider: 4,
        };
        let c = ControllerConfig::from(&cfg);
        assert_eq!((c.update_interval_ms, c.device_list_divider), (25, 4));
    }
}
