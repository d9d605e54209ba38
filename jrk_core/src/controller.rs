//! Connection lifecycle, dirty tracking and settings application.
//!
//! The controller owns the device handle, the settings being edited, the
//! last applied copy of those settings, and the latest telemetry. It is
//! driven by `update()` on a fixed cadence plus user actions, all on one
//! thread. After every state change it renders a full `ControllerView`.
//!
//! Connection state is the combination of three things:
//! - handle open or not
//! - `connection_error`: blocks auto-connect until the user picks a device
//! - `disconnected_by_user`: same, after an explicit disconnect

use std::path::Path;

use jrk_traits::device::{find_by_os_id, same_device_list};
use jrk_traits::protocol::{self, error_bit};
use jrk_traits::{
    BoxError, Device, DeviceBackend, DeviceHandle, FeedbackMode, InputMode, PidCoefficient,
    Settings, Variables,
};
use tracing::{debug, info, warn};

use crate::current;
use crate::direction::{DirectionDetector, DirectionOutcome, combine_invert};
use crate::edit::SettingEdit;
use crate::error::{JrkError, map_boxed};
use crate::settings::{self as derived, warnings_text};
use crate::util::write_atomic;
use crate::view::{ControllerView, EnableFlags, Presenter, SettingsView, VariablesView};

const DISCONNECT_QUESTION: &str = "The settings you changed have not been applied to the device.  \
If you disconnect from the device now, those changes will be lost.  \
Are you sure you want to disconnect?";

const EXIT_QUESTION: &str = "The settings you changed have not been applied to the device.  \
If you exit now, those changes will be lost.  \
Are you sure you want to exit?";

const RELOAD_QUESTION: &str =
    "Are you sure you want to reload settings from the device and discard your recent changes?";

const RESTORE_QUESTION: &str = "This will reset all of your device's settings back to their default values.  \
You will lose your custom settings.  \
Are you sure you want to continue?";

const BOOTLOADER_QUESTION: &str = "This action will restart the device in bootloader mode, which \
is used for firmware upgrades.  The device will disconnect and reappear to your system as a new \
device.\n\nAre you sure you want to proceed?";

pub const CONNECTION_LOST: &str = "The connection to the device was lost.";

/// Halting errors that do not prevent direction detection.
const DETECT_ALLOWED_HALTING: u16 =
    (1 << error_bit::AWAITING_COMMAND) | (1 << error_bit::INPUT_INVALID);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Period of the polling timer that drives `update()`.
    pub update_interval_ms: u64,
    /// Refresh the device list once every this many ticks.
    pub device_list_divider: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 50,
            device_list_divider: 20,
        }
    }
}

pub struct Controller<B: DeviceBackend, P: Presenter> {
    backend: B,
    presenter: P,
    cfg: ControllerConfig,

    handle: Option<B::Handle>,
    firmware_version: String,

    settings: Settings,
    cached_settings: Settings,
    settings_modified: bool,
    motor_asymmetric: bool,

    variables: Variables,
    variables_update_failed: bool,

    connection_error: bool,
    connection_error_message: String,
    disconnected_by_user: bool,

    device_list: Vec<Device>,
    device_list_changed: bool,
    update_device_list_counter: u32,
}

fn with_context(context: &str, err: &JrkError) -> String {
    if context.is_empty() {
        err.to_string()
    } else {
        format!("{context}  {err}")
    }
}

/// Device settings for the direction probe: serial input and a gentle
/// proportional-only PID loop.
fn probe_settings(base: &Settings, motor_invert: bool) -> Settings {
    let mut probe = base.clone();
    probe.input_mode = InputMode::Serial;
    probe.pid_period = 1;
    probe.pid[0] = PidCoefficient::new(8, 3);
    probe.pid[1].multiplier = 0;
    probe.pid[2].multiplier = 0;
    probe.motor_invert = motor_invert;
    probe
}

impl<B: DeviceBackend, P: Presenter> Controller<B, P> {
    pub fn new(backend: B, presenter: P, cfg: ControllerConfig) -> Self {
        Self {
            backend,
            presenter,
            cfg,
            handle: None,
            firmware_version: String::new(),
            settings: Settings::default(),
            cached_settings: Settings::default(),
            settings_modified: false,
            motor_asymmetric: false,
            variables: Variables::default(),
            variables_update_failed: false,
            connection_error: false,
            connection_error_message: String::new(),
            disconnected_by_user: false,
            device_list: Vec::new(),
            device_list_changed: false,
            update_device_list_counter: 1,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn config(&self) -> ControllerConfig {
        self.cfg
    }

    pub fn connected(&self) -> bool {
        self.handle.is_some()
    }

    pub fn connected_device(&self) -> Option<&Device> {
        self.handle.as_ref().map(|h| h.device())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Settings as last loaded from or applied to the device.
    pub fn cached_settings(&self) -> &Settings {
        &self.cached_settings
    }

    pub fn settings_modified(&self) -> bool {
        self.settings_modified
    }

    pub fn motor_asymmetric(&self) -> bool {
        self.motor_asymmetric
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn variables_update_failed(&self) -> bool {
        self.variables_update_failed
    }

    pub fn connection_error(&self) -> Option<&str> {
        self.connection_error
            .then_some(self.connection_error_message.as_str())
    }

    pub fn disconnected_by_user(&self) -> bool {
        self.disconnected_by_user
    }

    pub fn device_list(&self) -> &[Device] {
        &self.device_list
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    // ── View ─────────────────────────────────────────────────────────────────

    pub fn view(&self) -> ControllerView {
        let connected = self.connected();
        let device = self.connected_device();
        let vars = &self.variables;
        let s = &self.settings;
        ControllerView {
            device_list: self.device_list.clone(),
            device_list_changed: self.device_list_changed,
            selected_os_id: device.map(|d| d.os_id.clone()),
            connected,
            product_name: device.map_or("N/A", |d| protocol::product_name(d.product)),
            firmware_version: if connected {
                self.firmware_version.clone()
            } else {
                "N/A".to_string()
            },
            connection_error: self.connection_error().map(str::to_string),
            variables: VariablesView {
                up_time_ms: vars.up_time,
                input: vars.input,
                target: vars.target,
                feedback: vars.feedback,
                scaled_feedback: vars.scaled_feedback,
                duty_cycle: vars.duty_cycle,
                vin_voltage_mv: vars.vin_voltage,
                measured_current_ma: current::calculate_measured_current_ma(s, vars),
                raw_current_mv64: current::calculate_raw_current_mv64(s, vars),
                current_chopping_count: vars.current_chopping_occurrence_count,
                error_flags_halting: vars.error_flags_halting,
                error_flags_occurred: vars.error_flags_occurred,
                halting_errors: protocol::error_names(vars.error_flags_halting),
                device_reset: protocol::device_reset_name(vars.device_reset),
                update_failed: self.variables_update_failed,
            },
            settings: SettingsView {
                settings: s.clone(),
                modified: self.settings_modified,
                motor_asymmetric: self.motor_asymmetric,
                pid_constants: derived::pid_constants(s),
                max_current_forward_ma: current::code_to_ma(s, s.motor_forward.max_current),
                max_current_reverse_ma: current::code_to_ma(s, s.motor_reverse.max_current),
            },
            enabled: EnableFlags::for_state(connected, self.settings_modified),
        }
    }

    /// Pushes the whole current picture to the presenter. Safe to call any
    /// number of times.
    fn notify(&mut self) {
        let view = self.view();
        self.presenter.render(&view);
    }

    fn show_error(&mut self, context: &str, err: &JrkError) {
        warn!(context, error = %err, "operation failed");
        self.presenter
            .show_error_message(&with_context(context, err));
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    pub fn start(&mut self) {
        debug!(cfg = ?self.cfg, "controller start");
        self.notify();
    }

    /// One polling tick.
    pub fn update(&mut self) {
        let mut list_updated = false;
        self.update_device_list_counter = self.update_device_list_counter.saturating_sub(1);
        if self.update_device_list_counter == 0 {
            self.update_device_list_counter = self.cfg.device_list_divider.max(1);
            list_updated = self.update_device_list();
        }

        if let Some(os_id) = self.connected_device().map(|d| d.os_id.clone()) {
            if find_by_os_id(&self.device_list, &os_id).is_some() {
                if let Err(e) = self.reload_variables() {
                    debug!(error = %e, "telemetry poll failed");
                }
            } else {
                warn!(os_id, "device vanished");
                self.disconnect_device_by_error(CONNECTION_LOST);
            }
            self.notify();
        } else if !self.connection_error
            && !self.disconnected_by_user
            && list_updated
            && self.device_list.len() == 1
        {
            let device = self.device_list[0].clone();
            info!(os_id = %device.os_id, "auto-connecting");
            self.connect_device(&device);
        } else if list_updated && self.device_list_changed {
            self.notify();
        }
    }

    fn update_device_list(&mut self) -> bool {
        match self.backend.list_connected_devices() {
            Ok(list) => {
                self.device_list_changed = !same_device_list(&self.device_list, &list);
                if self.device_list_changed {
                    debug!(count = list.len(), "device list changed");
                }
                self.device_list = list;
                true
            }
            Err(e) => {
                let err = map_boxed(&e);
                self.set_connection_error("Failed to get the list of devices.");
                self.show_error("There was an error getting the list of devices.", &err);
                false
            }
        }
    }

    fn reload_variables(&mut self) -> Result<(), JrkError> {
        let Some(handle) = self.handle.as_mut() else {
            return Err(JrkError::State("not connected".into()));
        };
        match handle.get_variables(true) {
            Ok(vars) => {
                self.variables = vars;
                self.variables_update_failed = false;
                Ok(())
            }
            Err(e) => {
                self.variables_update_failed = true;
                Err(map_boxed(&e))
            }
        }
    }

    fn set_connection_error(&mut self, message: &str) {
        self.connection_error = true;
        self.connection_error_message = message.to_string();
    }

    fn close_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
    }

    fn really_disconnect(&mut self) {
        self.close_handle();
        self.settings_modified = false;
    }

    fn disconnect_device_by_error(&mut self, message: &str) {
        self.really_disconnect();
        self.disconnected_by_user = false;
        self.set_connection_error(message);
    }

    fn handle_settings_loaded(&mut self) {
        self.motor_asymmetric = derived::motor_asymmetric(&self.settings);
        self.cached_settings = self.settings.clone();
        self.settings_modified = false;
    }

    pub fn connect_device(&mut self, device: &Device) {
        self.close_handle();
        self.connection_error = false;
        self.disconnected_by_user = false;
        self.variables = Variables::default();
        self.variables_update_failed = false;

        let mut handle = match self.backend.open(device) {
            Ok(h) => h,
            Err(e) => {
                let err = map_boxed(&e);
                self.set_connection_error("Failed to connect to device.");
                self.show_error("There was an error connecting to the device.", &err);
                self.notify();
                return;
            }
        };
        self.firmware_version = handle.firmware_version_string().unwrap_or_else(|e| {
            warn!(error = %e, "firmware version unavailable");
            "?".to_string()
        });
        let loaded = handle.get_settings();
        self.handle = Some(handle);
        info!(os_id = %device.os_id, firmware = %self.firmware_version, "connected");

        match loaded {
            Ok(settings) => {
                self.settings = settings;
                self.handle_settings_loaded();
            }
            Err(e) => {
                let err = map_boxed(&e);
                self.show_error("There was an error loading settings from the device.", &err);
            }
        }
        if let Err(e) = self.reload_variables() {
            debug!(error = %e, "initial telemetry poll failed");
        }
        self.notify();
    }

    /// Disconnects, asking first if there are unapplied changes. Returns false
    /// if the user chose to stay connected.
    pub fn disconnect_device(&mut self) -> bool {
        if !self.connected() {
            return true;
        }
        if self.settings_modified && !self.presenter.confirm(DISCONNECT_QUESTION) {
            return false;
        }
        self.really_disconnect();
        self.disconnected_by_user = true;
        self.connection_error = false;
        info!("disconnected by user");
        self.notify();
        true
    }

    /// Switches to the listed device with `os_id`; an empty id only
    /// disconnects.
    pub fn connect_device_with_os_id(&mut self, os_id: &str) {
        if !self.disconnect_device() {
            // Reset the device selector.
            self.notify();
            return;
        }
        if os_id.is_empty() {
            return;
        }
        match find_by_os_id(&self.device_list, os_id).cloned() {
            Some(device) => self.connect_device(&device),
            None => {
                let err = JrkError::State(format!("no listed device has OS id {os_id:?}"));
                self.show_error("There was an error connecting to the device.", &err);
                self.notify();
            }
        }
    }

    /// Restarts the device into its bootloader for a firmware upgrade.
    pub fn disconnect_for_bootloader(&mut self) {
        if !self.connected() || !self.presenter.confirm(BOOTLOADER_QUESTION) {
            return;
        }
        self.really_disconnect();
        self.disconnected_by_user = true;
        self.connection_error = false;
        self.notify();
    }

    /// Allows auto-connect again after a firmware upload.
    pub fn handle_upload_complete(&mut self) {
        self.disconnected_by_user = false;
    }

    /// Returns true if it is fine to exit.
    pub fn exit(&mut self) -> bool {
        if self.connected() && self.settings_modified {
            return self.presenter.confirm(EXIT_QUESTION);
        }
        true
    }

    // ── Settings ─────────────────────────────────────────────────────────────

    pub fn reload_settings(&mut self, ask: bool) {
        if !self.connected() {
            return;
        }
        if ask && !self.presenter.confirm(RELOAD_QUESTION) {
            return;
        }
        let loaded = match self.handle.as_mut() {
            Some(h) => h.get_settings(),
            None => return,
        };
        match loaded {
            Ok(settings) => {
                self.settings = settings;
                self.handle_settings_loaded();
            }
            Err(e) => {
                self.settings_modified = true;
                let err = map_boxed(&e);
                self.show_error(
                    "There was an error loading the settings from the device.",
                    &err,
                );
            }
        }
        self.notify();
    }

    pub fn restore_default_settings(&mut self) {
        if !self.connected() || !self.presenter.confirm(RESTORE_QUESTION) {
            return;
        }
        let restored = match self.handle.as_mut() {
            Some(h) => h.restore_defaults(),
            None => return,
        };
        let ok = match restored {
            Ok(()) => true,
            Err(e) => {
                let err = map_boxed(&e);
                self.show_error("", &err);
                false
            }
        };
        self.reload_settings(false);
        if ok {
            info!("settings restored to defaults");
            self.presenter
                .show_info_message("Your device's settings have been reset to their default values.");
        }
    }

    pub fn apply_settings(&mut self) {
        if !self.connected() {
            return;
        }
        let (fixed, warnings) = derived::fix(&self.settings);
        if !warnings.is_empty() {
            let question = format!(
                "{}\nAccept these changes and apply settings?",
                warnings_text(&warnings)
            );
            if !self.presenter.confirm(&question) {
                self.notify();
                return;
            }
        }
        self.settings = fixed;
        self.motor_asymmetric = derived::motor_asymmetric(&self.settings);

        let written = match self.handle.as_mut() {
            Some(h) => h
                .set_settings(&self.settings)
                .and_then(|()| h.reinitialize()),
            None => return,
        };
        match written {
            Ok(()) => {
                self.cached_settings = self.settings.clone();
                // Only after the device holds these settings.
                self.settings_modified = false;
                info!("settings applied");
            }
            Err(e) => {
                // The fixed settings may differ from what the device holds.
                self.settings_modified = true;
                let err = map_boxed(&e);
                self.show_error("", &err);
            }
        }
        self.notify();
    }

    /// Applies one user edit to the settings being edited.
    pub fn edit(&mut self, edit: SettingEdit) {
        if !self.connected() {
            return;
        }
        edit.apply(&mut self.settings, self.motor_asymmetric);
        match edit {
            SettingEdit::MotorAsymmetric(on) => self.motor_asymmetric = on,
            e if e.touches_motor_limits() => {
                self.motor_asymmetric = derived::motor_asymmetric(&self.settings);
            }
            _ => {}
        }
        self.settings_modified = true;
        self.notify();
    }

    pub fn open_settings_from_file(&mut self, path: &Path) {
        if !self.connected() {
            return;
        }
        let loaded = std::fs::read_to_string(path)
            .map_err(|e| JrkError::Io(format!("{}: {e}", path.display())))
            .and_then(|text| {
                crate::conversions::settings_from_string(&text)
                    .map_err(|e| JrkError::Config(e.to_string()))
            });
        match loaded {
            Ok(settings) => {
                let (fixed, warnings) = derived::fix(&settings);
                let accepted = warnings.is_empty() || {
                    let question = format!(
                        "{}\nAccept these changes and load settings?",
                        warnings_text(&warnings)
                    );
                    self.presenter.confirm(&question)
                };
                if accepted {
                    self.settings = fixed;
                    self.motor_asymmetric = derived::motor_asymmetric(&self.settings);
                    self.settings_modified = true;
                    info!(path = %path.display(), "settings loaded from file");
                }
            }
            Err(err) => self.show_error("", &err),
        }
        self.notify();
    }

    pub fn save_settings_to_file(&mut self, path: &Path) {
        if !self.connected() {
            return;
        }
        let (fixed, warnings) = derived::fix(&self.settings);
        if !warnings.is_empty() {
            let question = format!(
                "{}\nAccept these changes and save settings?",
                warnings_text(&warnings)
            );
            if !self.presenter.confirm(&question) {
                return;
            }
            self.settings = fixed;
            self.motor_asymmetric = derived::motor_asymmetric(&self.settings);
            self.settings_modified = true;
        }
        let saved = crate::conversions::settings_to_string(&self.settings)
            .map_err(|e| JrkError::Config(e.to_string()))
            .and_then(|text| {
                write_atomic(path, text.as_bytes())
                    .map_err(|e| JrkError::Io(format!("{}: {e}", path.display())))
            });
        match saved {
            Ok(()) => info!(path = %path.display(), "settings saved to file"),
            Err(err) => self.show_error("", &err),
        }
        self.notify();
    }

    // ── Motor ────────────────────────────────────────────────────────────────

    fn with_handle(&mut self, op: impl FnOnce(&mut B::Handle) -> Result<(), BoxError>) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        if let Err(e) = op(handle) {
            let err = map_boxed(&e);
            self.show_error("", &err);
        }
    }

    pub fn stop_motor(&mut self) {
        self.with_handle(|h| h.stop_motor());
    }

    pub fn run_motor(&mut self) {
        self.with_handle(|h| h.run_motor());
    }

    pub fn set_target(&mut self, target: u16) {
        self.with_handle(|h| h.set_target(target));
    }

    /// Probes the motor to find out whether `motor_invert` should be set.
    ///
    /// The device runs the probe with temporary settings and gets its stored
    /// settings back afterwards whatever happens. On success only the
    /// in-memory invert flag changes; the user still has to apply it.
    pub fn detect_motor_direction(&mut self) -> Option<DirectionOutcome> {
        if !self.connected() {
            return None;
        }
        if self.variables.error_flags_halting & !DETECT_ALLOWED_HALTING != 0 {
            self.presenter.show_error_message(
                "An error is stopping the motor.  You must fix this before detecting the direction.",
            );
            return None;
        }
        if self.settings.feedback_mode != FeedbackMode::Analog {
            self.presenter
                .show_error_message("Feedback mode must be Analog to detect the motor direction.");
            return None;
        }

        let previous_invert = self.settings.motor_invert;
        let handle = self.handle.as_mut()?;
        let presenter = &mut self.presenter;

        let original = match handle.get_settings() {
            Ok(s) => s,
            Err(e) => {
                let err = map_boxed(&e);
                self.show_error("There was an error detecting the motor direction.", &err);
                return None;
            }
        };

        let probed = (|| -> Result<DirectionOutcome, JrkError> {
            handle.stop_motor().map_err(|e| map_boxed(&e))?;
            handle
                .set_settings(&probe_settings(&original, previous_invert))
                .map_err(|e| map_boxed(&e))?;
            handle.reinitialize().map_err(|e| map_boxed(&e))?;
            let mut confirm = |q: &str| presenter.confirm(q);
            DirectionDetector::new().run(handle, &mut confirm)
        })();

        let restored = handle
            .set_settings(&original)
            .and_then(|()| handle.reinitialize())
            .and_then(|()| handle.stop_motor())
            .map_err(|e| map_boxed(&e));

        let outcome = match probed {
            Ok(DirectionOutcome::Detected { inverted }) => {
                let invert = combine_invert(previous_invert, inverted);
                self.settings.motor_invert = invert;
                self.settings_modified = true;
                info!(previous_invert, inverted, invert, "motor direction result");
                self.presenter.show_info_message(if invert {
                    "The motor is inverted.  Please click the apply button to apply this setting to the jrk."
                } else {
                    "The motor is NOT inverted.  Please click the apply button to apply this setting to the jrk."
                });
                Some(DirectionOutcome::Detected { inverted })
            }
            Ok(DirectionOutcome::Inconclusive) => {
                self.presenter.show_error_message(
                    "Error detecting motor direction:  Driving the motor did not change the measured feedback.  \
                     Check your motor and feedback connections.",
                );
                Some(DirectionOutcome::Inconclusive)
            }
            Ok(DirectionOutcome::Cancelled) => {
                debug!("direction detection cancelled");
                Some(DirectionOutcome::Cancelled)
            }
            Err(err) => {
                self.show_error("There was an error detecting the motor direction.", &err);
                None
            }
        };
        if let Err(err) = restored {
            self.show_error(
                "There was an error restoring the device settings after detecting the motor direction.",
                &err,
            );
        }
        self.notify();
        outcome
    }
}

impl<B: DeviceBackend, P: Presenter> Drop for Controller<B, P> {
    fn drop(&mut self) {
        self.close_handle();
    }
}
