//! Device configuration snapshot.
//!
//! Every field is plain data and independently readable and writable. Values
//! derived from several fields (motor asymmetry, decoded PID gains) are
//! computed by the controller, never stored here.

use crate::protocol::{FeedbackMode, InputMode, SerialMode};

/// PID channel selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PidChannel {
    Proportional,
    Integral,
    Derivative,
}

impl PidChannel {
    pub const ALL: [PidChannel; 3] = [
        PidChannel::Proportional,
        PidChannel::Integral,
        PidChannel::Derivative,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            PidChannel::Proportional => 0,
            PidChannel::Integral => 1,
            PidChannel::Derivative => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PidChannel::Proportional => "proportional",
            PidChannel::Integral => "integral",
            PidChannel::Derivative => "derivative",
        }
    }
}

/// Fixed-point PID gain as stored by the firmware: `multiplier / 2^exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PidCoefficient {
    pub multiplier: u16,
    pub exponent: u8,
}

impl PidCoefficient {
    pub const fn new(multiplier: u16, exponent: u8) -> Self {
        Self {
            multiplier,
            exponent,
        }
    }
}

/// Motor limits for one drive direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorLimits {
    /// Duty cycle limit, 600 = 100%.
    pub max_duty_cycle: u16,
    /// Max duty cycle increase per PID period.
    pub max_acceleration: u16,
    /// Max duty cycle decrease per PID period.
    pub max_deceleration: u16,
    /// Brake time in ms when changing direction.
    pub brake_duration: u32,
    /// Encoded hard current limit code.
    pub max_current: u16,
    pub current_calibration: i16,
}

impl Default for MotorLimits {
    fn default() -> Self {
        Self {
            max_duty_cycle: 600,
            max_acceleration: 600,
            max_deceleration: 600,
            brake_duration: 0,
            max_current: 0,
            current_calibration: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub product: u32,
    pub firmware_version: u16,

    // input
    pub input_mode: InputMode,
    pub input_analog_samples_exponent: u8,
    pub input_detect_disconnect: bool,
    pub input_invert: bool,
    pub input_absolute_minimum: u16,
    pub input_absolute_maximum: u16,
    pub input_minimum: u16,
    pub input_maximum: u16,
    pub input_neutral_minimum: u16,
    pub input_neutral_maximum: u16,
    pub output_minimum: u16,
    pub output_neutral: u16,
    pub output_maximum: u16,
    pub input_scaling_degree: u8,

    // serial
    pub serial_mode: SerialMode,
    pub serial_baud_rate: u32,
    pub serial_enable_crc: bool,
    pub serial_device_number: u16,
    pub serial_enable_14bit_device_number: bool,
    /// Serial command timeout in ms, 0 disables.
    pub serial_timeout: u32,
    pub serial_disable_compact_protocol: bool,
    pub never_sleep: bool,

    // feedback
    pub feedback_mode: FeedbackMode,
    pub feedback_invert: bool,
    pub feedback_absolute_minimum: u16,
    pub feedback_absolute_maximum: u16,
    pub feedback_minimum: u16,
    pub feedback_maximum: u16,
    pub feedback_analog_samples_exponent: u8,
    pub feedback_detect_disconnect: bool,
    pub feedback_dead_zone: u8,

    // pid
    pub pid_period: u16,
    pub pid_integral_limit: u16,
    pub pid_reset_integral: bool,
    /// Indexed by `PidChannel::index()`.
    pub pid: [PidCoefficient; 3],

    // motor
    pub motor_pwm_frequency: u8,
    pub motor_invert: bool,
    pub motor_max_duty_cycle_while_feedback_out_of_range: u16,
    pub motor_coast_when_off: bool,
    pub motor_forward: MotorLimits,
    pub motor_reverse: MotorLimits,

    // calibration
    pub current_offset_calibration: i16,
    pub current_scale_calibration: i16,
    pub vin_calibration: i16,
}

impl Settings {
    /// Factory defaults for `product`.
    pub fn defaults_for(product: u32) -> Self {
        Self {
            product,
            ..Self::default()
        }
    }

    #[inline]
    pub fn pid(&self, channel: PidChannel) -> PidCoefficient {
        self.pid[channel.index()]
    }

    #[inline]
    pub fn pid_mut(&mut self, channel: PidChannel) -> &mut PidCoefficient {
        &mut self.pid[channel.index()]
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            product: 0,
            firmware_version: 0,
            input_mode: InputMode::Serial,
            input_analog_samples_exponent: 7,
            input_detect_disconnect: false,
            input_invert: false,
            input_absolute_minimum: 0,
            input_absolute_maximum: 4095,
            input_minimum: 0,
            input_maximum: 4095,
            input_neutral_minimum: 2048,
            input_neutral_maximum: 2048,
            output_minimum: 0,
            output_neutral: 2048,
            output_maximum: 4095,
            input_scaling_degree: 0,
            serial_mode: SerialMode::UsbDualPort,
            serial_baud_rate: 9600,
            serial_enable_crc: false,
            serial_device_number: 11,
            serial_enable_14bit_device_number: false,
            serial_timeout: 0,
            serial_disable_compact_protocol: false,
            never_sleep: false,
            feedback_mode: FeedbackMode::Analog,
            feedback_invert: false,
            feedback_absolute_minimum: 0,
            feedback_absolute_maximum: 4095,
            feedback_minimum: 0,
            feedback_maximum: 4095,
            feedback_analog_samples_exponent: 7,
            feedback_detect_disconnect: false,
            feedback_dead_zone: 0,
            pid_period: 10,
            pid_integral_limit: 1000,
            pid_reset_integral: false,
            pid: [
                PidCoefficient::new(5, 0),
                PidCoefficient::new(0, 0),
                PidCoefficient::new(0, 0),
            ],
            motor_pwm_frequency: 0,
            motor_invert: false,
            motor_max_duty_cycle_while_feedback_out_of_range: 600,
            motor_coast_when_off: false,
            motor_forward: MotorLimits::default(),
            motor_reverse: MotorLimits::default(),
            current_offset_calibration: 0,
            current_scale_calibration: 0,
            vin_calibration: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_accessors_follow_channel_index() {
        let mut s = Settings::defaults_for(crate::protocol::PRODUCT_UMC04A_30V);
        s.pid_mut(PidChannel::Derivative).multiplier = 42;
        assert_eq!(s.pid[2].multiplier, 42);
        assert_eq!(s.pid(PidChannel::Derivative), PidCoefficient::new(42, 0));
        assert_eq!(s.pid(PidChannel::Proportional), PidCoefficient::new(5, 0));
    }
}
