//! Device backends for the jrk tool.
//!
//! USB transport is not implemented here. The simulated backend models a bus
//! of jrk units with a crude motor/feedback plant, enough to exercise
//! connection handling, settings round trips and direction detection.
pub mod error;

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use jrk_traits::protocol::{FeedbackMode, InputMode, error_bit};
use jrk_traits::{BoxError, Device, DeviceBackend, DeviceHandle, Settings, Variables};
use tracing::{debug, trace};

use crate::error::HwError;

/// Operations that can be made to fail on a simulated unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOp {
    Open,
    GetSettings,
    SetSettings,
    GetVariables,
    SetTarget,
    StopMotor,
    Reinitialize,
    RestoreDefaults,
}

/// Static description of a simulated unit.
#[derive(Debug, Clone)]
pub struct SimSpec {
    pub device: Device,
    pub wiring_inverted: bool,
    /// Per-poll movement at or below this many counts is swallowed.
    pub stiction: u16,
    pub start_feedback: u16,
}

impl SimSpec {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            wiring_inverted: false,
            stiction: 0,
            start_feedback: 2048,
        }
    }
}

/// Feedback counts travelled per poll at 100% duty cycle.
const COUNTS_PER_POLL_AT_FULL_DUTY: i32 = 64;

#[derive(Debug)]
struct SimUnit {
    spec: SimSpec,
    settings: Settings,
    feedback: i32,
    target: u16,
    duty_cycle: i16,
    running: bool,
    up_time: u32,
    errors_occurred: u16,
    faults: HashSet<SimOp>,
    writes: u32,
}

impl SimUnit {
    fn new(spec: SimSpec) -> Self {
        let mut settings = Settings::defaults_for(spec.device.product);
        settings.firmware_version = spec.device.firmware_version;
        Self {
            feedback: i32::from(spec.start_feedback.min(4095)),
            spec,
            settings,
            target: 2048,
            duty_cycle: 0,
            running: false,
            up_time: 0,
            errors_occurred: 0,
            faults: HashSet::new(),
            writes: 0,
        }
    }

    fn halting_flags(&self) -> u16 {
        if self.running {
            0
        } else {
            1 << error_bit::AWAITING_COMMAND
        }
    }

    /// Advance the plant by one poll interval.
    fn step_plant(&mut self) {
        self.up_time = self.up_time.wrapping_add(50);
        let closed_loop = self.running
            && self.settings.input_mode == InputMode::Serial
            && self.settings.feedback_mode == FeedbackMode::Analog;
        if !closed_loop {
            self.duty_cycle = 0;
            return;
        }

        let p = self.settings.pid[0];
        let gain = f64::from(p.multiplier) / f64::from(1u32 << p.exponent.min(31));
        let error = i32::from(self.target) - self.feedback;
        let max_duty = i32::from(self.settings.motor_forward.max_duty_cycle.min(600));
        let duty = ((f64::from(error) * gain) as i32).clamp(-max_duty, max_duty);
        self.duty_cycle = duty as i16;

        let mut direction = 1;
        if self.settings.motor_invert {
            direction = -direction;
        }
        if self.spec.wiring_inverted {
            direction = -direction;
        }
        let travel = duty * COUNTS_PER_POLL_AT_FULL_DUTY / 600 * direction;
        if travel.unsigned_abs() > u32::from(self.spec.stiction) {
            self.feedback = (self.feedback + travel).clamp(0, 4095);
        }
        trace!(
            target = self.target,
            feedback = self.feedback,
            duty,
            "sim plant step"
        );
    }

    fn variables(&self) -> Variables {
        let raw = self.feedback.clamp(0, 4095) as u16;
        let scaled = if self.settings.feedback_invert {
            4095 - raw
        } else {
            raw
        };
        let abs_duty = self.duty_cycle.unsigned_abs();
        Variables {
            input: self.target,
            target: self.target,
            feedback: self.feedback as u16,
            scaled_feedback: scaled,
            duty_cycle_target: self.duty_cycle,
            duty_cycle: self.duty_cycle,
            last_duty_cycle: self.duty_cycle,
            error_flags_halting: self.halting_flags(),
            error_flags_occurred: self.errors_occurred,
            vin_voltage: 12_000,
            current: abs_duty.saturating_mul(5),
            raw_current: 800 + abs_duty.saturating_mul(4),
            current_limit_code: self.settings.motor_forward.max_current,
            device_reset: 0x04,
            up_time: self.up_time,
            ..Variables::default()
        }
    }
}

#[derive(Debug, Default)]
struct Bus {
    units: Vec<SimUnit>,
    list_fails: bool,
}

impl Bus {
    fn unit_mut(&mut self, os_id: &str) -> Result<&mut SimUnit, HwError> {
        self.units
            .iter_mut()
            .find(|u| u.spec.device.os_id == os_id)
            .ok_or(HwError::Disconnected)
    }
}

/// Shared handle to a virtual bus of jrk units.
///
/// Clones share the same bus, so a test can keep one clone to plug, unplug and
/// inspect units while the controller owns another.
#[derive(Debug, Clone, Default)]
pub struct SimBackend {
    bus: Rc<RefCell<Bus>>,
}

impl SimBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_units(specs: impl IntoIterator<Item = SimSpec>) -> Self {
        let sim = Self::new();
        for spec in specs {
            sim.plug(spec);
        }
        sim
    }

    pub fn plug(&self, spec: SimSpec) {
        debug!(os_id = %spec.device.os_id, "sim device plugged");
        self.bus.borrow_mut().units.push(SimUnit::new(spec));
    }

    pub fn unplug(&self, os_id: &str) {
        debug!(os_id, "sim device unplugged");
        self.bus
            .borrow_mut()
            .units
            .retain(|u| u.spec.device.os_id != os_id);
    }

    /// Make `op` fail on the unit until cleared.
    pub fn set_fault(&self, os_id: &str, op: SimOp, failing: bool) {
        if let Ok(unit) = self.bus.borrow_mut().unit_mut(os_id) {
            if failing {
                unit.faults.insert(op);
            } else {
                unit.faults.remove(&op);
            }
        }
    }

    pub fn set_list_fails(&self, failing: bool) {
        self.bus.borrow_mut().list_fails = failing;
    }

    /// Settings currently stored on the unit.
    pub fn stored_settings(&self, os_id: &str) -> Option<Settings> {
        self.bus
            .borrow_mut()
            .unit_mut(os_id)
            .ok()
            .map(|u| u.settings.clone())
    }

    /// Number of successful settings writes to the unit.
    pub fn settings_writes(&self, os_id: &str) -> u32 {
        self.bus
            .borrow_mut()
            .unit_mut(os_id)
            .map(|u| u.writes)
            .unwrap_or(0)
    }

    pub fn is_running(&self, os_id: &str) -> bool {
        self.bus
            .borrow_mut()
            .unit_mut(os_id)
            .map(|u| u.running)
            .unwrap_or(false)
    }

    pub fn set_feedback(&self, os_id: &str, feedback: u16) {
        if let Ok(unit) = self.bus.borrow_mut().unit_mut(os_id) {
            unit.feedback = i32::from(feedback.min(4095));
        }
    }
}

impl DeviceBackend for SimBackend {
    type Handle = SimHandle;

    fn list_connected_devices(&mut self) -> Result<Vec<Device>, BoxError> {
        let bus = self.bus.borrow();
        if bus.list_fails {
            return Err(Box::new(HwError::Usb("device enumeration failed".into())));
        }
        Ok(bus.units.iter().map(|u| u.spec.device.clone()).collect())
    }

    fn open(&mut self, device: &Device) -> Result<SimHandle, BoxError> {
        let mut bus = self.bus.borrow_mut();
        let unit = bus.unit_mut(&device.os_id)?;
        if unit.faults.contains(&SimOp::Open) {
            return Err(Box::new(HwError::AccessDenied));
        }
        debug!(os_id = %device.os_id, "sim handle opened");
        Ok(SimHandle {
            bus: Rc::clone(&self.bus),
            device: unit.spec.device.clone(),
            open: true,
        })
    }
}

/// Open connection to one simulated unit.
#[derive(Debug)]
pub struct SimHandle {
    bus: Rc<RefCell<Bus>>,
    device: Device,
    open: bool,
}

impl SimHandle {
    fn with_unit<T>(
        &mut self,
        op: Option<SimOp>,
        f: impl FnOnce(&mut SimUnit) -> T,
    ) -> Result<T, BoxError> {
        if !self.open {
            return Err(Box::new(HwError::Usb("handle is closed".into())));
        }
        let mut bus = self.bus.borrow_mut();
        let unit = bus.unit_mut(&self.device.os_id)?;
        if let Some(op) = op
            && unit.faults.contains(&op)
        {
            return Err(Box::new(HwError::Timeout));
        }
        Ok(f(unit))
    }
}

impl DeviceHandle for SimHandle {
    fn device(&self) -> &Device {
        &self.device
    }

    fn close(&mut self) {
        if self.open {
            debug!(os_id = %self.device.os_id, "sim handle closed");
        }
        self.open = false;
    }

    fn firmware_version_string(&mut self) -> Result<String, BoxError> {
        self.with_unit(None, |u| {
            let v = u.spec.device.firmware_version;
            format!("{}.{:02X}", v >> 8, v & 0xFF)
        })
    }

    fn get_settings(&mut self) -> Result<Settings, BoxError> {
        self.with_unit(Some(SimOp::GetSettings), |u| u.settings.clone())
    }

    fn set_settings(&mut self, settings: &Settings) -> Result<(), BoxError> {
        self.with_unit(Some(SimOp::SetSettings), |u| {
            u.settings = settings.clone();
            u.writes += 1;
        })
    }

    fn get_variables(&mut self, clear_errors_occurred: bool) -> Result<Variables, BoxError> {
        self.with_unit(Some(SimOp::GetVariables), |u| {
            u.step_plant();
            u.errors_occurred |= u.halting_flags();
            let vars = u.variables();
            if clear_errors_occurred {
                u.errors_occurred = 0;
            }
            vars
        })
    }

    fn set_target(&mut self, target: u16) -> Result<(), BoxError> {
        self.with_unit(Some(SimOp::SetTarget), |u| {
            u.target = target.min(4095);
            u.running = true;
        })
    }

    fn stop_motor(&mut self) -> Result<(), BoxError> {
        self.with_unit(Some(SimOp::StopMotor), |u| {
            u.running = false;
            u.duty_cycle = 0;
        })
    }

    fn run_motor(&mut self) -> Result<(), BoxError> {
        self.with_unit(None, |u| u.running = true)
    }

    fn reinitialize(&mut self) -> Result<(), BoxError> {
        self.with_unit(Some(SimOp::Reinitialize), |u| u.duty_cycle = 0)
    }

    fn restore_defaults(&mut self) -> Result<(), BoxError> {
        self.with_unit(Some(SimOp::RestoreDefaults), |u| {
            let mut defaults = Settings::defaults_for(u.spec.device.product);
            defaults.firmware_version = u.spec.device.firmware_version;
            u.settings = defaults;
            u.writes += 1;
        })
    }
}

impl Drop for SimHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(os_id: &str) -> SimSpec {
        SimSpec::new(Device::new(1, "00000001", os_id))
    }

    #[test]
    fn closed_handle_rejects_io_and_close_is_idempotent() {
        let mut sim = SimBackend::with_units([spec("a")]);
        let dev = sim.list_connected_devices().unwrap().remove(0);
        let mut h = sim.open(&dev).unwrap();
        assert!(h.get_settings().is_ok());
        h.close();
        h.close();
        assert!(h.get_settings().is_err());
    }

    #[test]
    fn unplugged_unit_reports_disconnected() {
        let mut sim = SimBackend::with_units([spec("a")]);
        let dev = sim.list_connected_devices().unwrap().remove(0);
        let mut h = sim.open(&dev).unwrap();
        sim.unplug("a");
        let err = h.get_variables(false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HwError>(),
            Some(HwError::Disconnected)
        ));
    }

    #[test]
    fn plant_follows_target_unless_wiring_inverted() {
        for (inverted, rises) in [(false, true), (true, false)] {
            let mut s = spec("a");
            s.wiring_inverted = inverted;
            let mut sim = SimBackend::with_units([s]);
            let dev = sim.list_connected_devices().unwrap().remove(0);
            let mut h = sim.open(&dev).unwrap();
            h.set_target(3000).unwrap();
            let mut last = 2048;
            for _ in 0..5 {
                last = h.get_variables(false).unwrap().scaled_feedback;
            }
            assert_eq!(last > 2048, rises, "inverted={inverted} feedback={last}");
        }
    }

    #[test]
    fn faults_fail_only_the_selected_operation() {
        let mut sim = SimBackend::with_units([spec("a")]);
        let dev = sim.list_connected_devices().unwrap().remove(0);
        let mut h = sim.open(&dev).unwrap();
        sim.set_fault("a", SimOp::SetSettings, true);
        assert!(h.set_settings(&Settings::default()).is_err());
        assert!(h.get_settings().is_ok());
        assert_eq!(sim.settings_writes("a"), 0);
        sim.set_fault("a", SimOp::SetSettings, false);
        h.set_settings(&Settings::default()).unwrap();
        assert_eq!(sim.settings_writes("a"), 1);
    }

    #[test]
    fn firmware_version_string_is_major_dot_minor() {
        let mut sim = SimBackend::with_units([spec("a")]);
        let dev = sim.list_connected_devices().unwrap().remove(0);
        let mut h = sim.open(&dev).unwrap();
        assert_eq!(h.firmware_version_string().unwrap(), "1.00");
    }
}
