//! What the controller pushes to the presentation layer.

use jrk_traits::{Device, Settings};

/// Presentation collaborator.
///
/// Only `confirm` feeds back into controller logic; everything else is a
/// one-way notification.
pub trait Presenter {
    fn confirm(&mut self, question: &str) -> bool;
    fn show_error_message(&mut self, message: &str);
    fn show_info_message(&mut self, message: &str);
    /// Receives the full current picture after every state change.
    fn render(&mut self, view: &ControllerView);
}

/// Telemetry in display units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariablesView {
    pub up_time_ms: u32,
    pub input: u16,
    pub target: u16,
    pub feedback: u16,
    pub scaled_feedback: u16,
    pub duty_cycle: i16,
    pub vin_voltage_mv: u16,
    pub measured_current_ma: u16,
    pub raw_current_mv64: u32,
    pub current_chopping_count: u8,
    pub error_flags_halting: u16,
    pub error_flags_occurred: u16,
    pub halting_errors: Vec<&'static str>,
    pub device_reset: &'static str,
    /// The last telemetry poll failed; the values above are stale.
    pub update_failed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsView {
    pub settings: Settings,
    pub modified: bool,
    pub motor_asymmetric: bool,
    /// Decoded gain per PID channel.
    pub pid_constants: [f64; 3],
    pub max_current_forward_ma: u16,
    pub max_current_reverse_ma: u16,
}

/// Which controls are usable in the current state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnableFlags {
    pub apply: bool,
    pub disconnect: bool,
    pub open_save_settings: bool,
    pub reload_settings: bool,
    pub restore_defaults: bool,
    pub stop_motor: bool,
    pub run_motor: bool,
    pub tab_pages: bool,
}

impl EnableFlags {
    pub fn for_state(connected: bool, modified: bool) -> Self {
        Self {
            apply: connected && modified,
            disconnect: connected,
            open_save_settings: connected,
            reload_settings: connected,
            restore_defaults: connected,
            stop_motor: connected,
            run_motor: connected,
            tab_pages: connected,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerView {
    pub device_list: Vec<Device>,
    pub device_list_changed: bool,
    /// OS id of the connected device, `None` shows as "Not connected".
    pub selected_os_id: Option<String>,
    pub connected: bool,
    pub product_name: &'static str,
    pub firmware_version: String,
    pub connection_error: Option<String>,
    pub variables: VariablesView,
    pub settings: SettingsView,
    pub enabled: EnableFlags,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_needs_connection_and_changes() {
        assert!(!EnableFlags::for_state(false, true).apply);
        assert!(!EnableFlags::for_state(true, false).apply);
        let on = EnableFlags::for_state(true, true);
        assert!(on.apply && on.disconnect && on.tab_pages);
        assert_eq!(EnableFlags::for_state(false, false), EnableFlags::default());
    }
}
