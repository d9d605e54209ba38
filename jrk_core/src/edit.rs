//! Field edits the user can make to a settings snapshot.

use jrk_traits::{FeedbackMode, InputMode, MotorLimits, PidChannel, SerialMode, Settings};

use crate::pid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorDirection {
    Forward,
    Reverse,
}

/// One user edit. Applying it changes exactly the named field, except that a
/// forward motor limit is mirrored to reverse while the motor is symmetric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingEdit {
    InputMode(InputMode),
    InputAnalogSamplesExponent(u8),
    InputDetectDisconnect(bool),
    InputInvert(bool),
    InputAbsoluteMinimum(u16),
    InputAbsoluteMaximum(u16),
    InputMinimum(u16),
    InputMaximum(u16),
    InputNeutralMinimum(u16),
    InputNeutralMaximum(u16),
    OutputMinimum(u16),
    OutputNeutral(u16),
    OutputMaximum(u16),
    InputScalingDegree(u8),

    SerialMode(SerialMode),
    SerialBaudRate(u32),
    SerialEnableCrc(bool),
    SerialDeviceNumber(u16),
    SerialEnable14BitDeviceNumber(bool),
    SerialTimeout(u32),
    SerialDisableCompactProtocol(bool),
    NeverSleep(bool),

    FeedbackMode(FeedbackMode),
    FeedbackInvert(bool),
    FeedbackAbsoluteMinimum(u16),
    FeedbackAbsoluteMaximum(u16),
    FeedbackMinimum(u16),
    FeedbackMaximum(u16),
    FeedbackAnalogSamplesExponent(u8),
    FeedbackDetectDisconnect(bool),
    FeedbackDeadZone(u8),

    PidPeriod(u16),
    PidIntegralLimit(u16),
    PidResetIntegral(bool),
    PidMultiplier(PidChannel, u16),
    PidExponent(PidChannel, u8),
    /// Gain to encode as multiplier/exponent.
    PidConstant(PidChannel, f64),

    MotorPwmFrequency(u8),
    MotorInvert(bool),
    MotorMaxDutyCycleWhileFeedbackOutOfRange(u16),
    MotorCoastWhenOff(bool),
    MotorAsymmetric(bool),
    MotorMaxDutyCycle(MotorDirection, u16),
    MotorMaxAcceleration(MotorDirection, u16),
    MotorMaxDeceleration(MotorDirection, u16),
    MotorBrakeDuration(MotorDirection, u32),
    MotorMaxCurrent(MotorDirection, u16),
    MotorCurrentCalibration(MotorDirection, i16),

    VinCalibration(i16),
    CurrentOffsetCalibration(i16),
    CurrentScaleCalibration(i16),
}

fn set_limit(
    settings: &mut Settings,
    direction: MotorDirection,
    asymmetric: bool,
    set: impl Fn(&mut MotorLimits),
) {
    match direction {
        MotorDirection::Forward => {
            set(&mut settings.motor_forward);
            if !asymmetric {
                set(&mut settings.motor_reverse);
            }
        }
        MotorDirection::Reverse => set(&mut settings.motor_reverse),
    }
}

impl SettingEdit {
    /// True for edits to one of the forward/reverse motor limit pairs.
    pub fn touches_motor_limits(&self) -> bool {
        matches!(
            self,
            Self::MotorMaxDutyCycle(..)
                | Self::MotorMaxAcceleration(..)
                | Self::MotorMaxDeceleration(..)
                | Self::MotorBrakeDuration(..)
                | Self::MotorMaxCurrent(..)
                | Self::MotorCurrentCalibration(..)
        )
    }

    /// Writes the edit into `settings`.
    ///
    /// `MotorAsymmetric` is controller state, not a settings field; applying
    /// it with `false` copies the forward limits into reverse.
    pub fn apply(self, settings: &mut Settings, asymmetric: bool) {
        let s = settings;
        match self {
            Self::InputMode(v) => s.input_mode = v,
            Self::InputAnalogSamplesExponent(v) => s.input_analog_samples_exponent = v,
            Self::InputDetectDisconnect(v) => s.input_detect_disconnect = v,
            Self::InputInvert(v) => s.input_invert = v,
            Self::InputAbsoluteMinimum(v) => s.input_absolute_minimum = v,
            Self::InputAbsoluteMaximum(v) => s.input_absolute_maximum = v,
            Self::InputMinimum(v) => s.input_minimum = v,
            Self::InputMaximum(v) => s.input_maximum = v,
            Self::InputNeutralMinimum(v) => s.input_neutral_minimum = v,
            Self::InputNeutralMaximum(v) => s.input_neutral_maximum = v,
            Self::OutputMinimum(v) => s.output_minimum = v,
            Self::OutputNeutral(v) => s.output_neutral = v,
            Self::OutputMaximum(v) => s.output_maximum = v,
            Self::InputScalingDegree(v) => s.input_scaling_degree = v,

            Self::SerialMode(v) => s.serial_mode = v,
            Self::SerialBaudRate(v) => s.serial_baud_rate = v,
            Self::SerialEnableCrc(v) => s.serial_enable_crc = v,
            Self::SerialDeviceNumber(v) => s.serial_device_number = v,
            Self::SerialEnable14BitDeviceNumber(v) => s.serial_enable_14bit_device_number = v,
            Self::SerialTimeout(v) => s.serial_timeout = v,
            Self::SerialDisableCompactProtocol(v) => s.serial_disable_compact_protocol = v,
            Self::NeverSleep(v) => s.never_sleep = v,

            Self::FeedbackMode(v) => s.feedback_mode = v,
            Self::FeedbackInvert(v) => s.feedback_invert = v,
            Self::FeedbackAbsoluteMinimum(v) => s.feedback_absolute_minimum = v,
            Self::FeedbackAbsoluteMaximum(v) => s.feedback_absolute_maximum = v,
            Self::FeedbackMinimum(v) => s.feedback_minimum = v,
            Self::FeedbackMaximum(v) => s.feedback_maximum = v,
            Self::FeedbackAnalogSamplesExponent(v) => s.feedback_analog_samples_exponent = v,
            Self::FeedbackDetectDisconnect(v) => s.feedback_detect_disconnect = v,
            Self::FeedbackDeadZone(v) => s.feedback_dead_zone = v,

            Self::PidPeriod(v) => s.pid_period = v,
            Self::PidIntegralLimit(v) => s.pid_integral_limit = v,
            Self::PidResetIntegral(v) => s.pid_reset_integral = v,
            Self::PidMultiplier(ch, v) => s.pid_mut(ch).multiplier = v,
            Self::PidExponent(ch, v) => s.pid_mut(ch).exponent = v,
            Self::PidConstant(ch, gain) => *s.pid_mut(ch) = pid::encode(gain),

            Self::MotorPwmFrequency(v) => s.motor_pwm_frequency = v,
            Self::MotorInvert(v) => s.motor_invert = v,
            Self::MotorMaxDutyCycleWhileFeedbackOutOfRange(v) => {
                s.motor_max_duty_cycle_while_feedback_out_of_range = v;
            }
            Self::MotorCoastWhenOff(v) => s.motor_coast_when_off = v,
            Self::MotorAsymmetric(on) => {
                if !on {
                    s.motor_reverse = s.motor_forward;
                }
            }
            Self::MotorMaxDutyCycle(d, v) => set_limit(s, d, asymmetric, |l| l.max_duty_cycle = v),
            Self::MotorMaxAcceleration(d, v) => {
                set_limit(s, d, asymmetric, |l| l.max_acceleration = v);
            }
            Self::MotorMaxDeceleration(d, v) => {
                set_limit(s, d, asymmetric, |l| l.max_deceleration = v);
            }
            Self::MotorBrakeDuration(d, v) => set_limit(s, d, asymmetric, |l| l.brake_duration = v),
            Self::MotorMaxCurrent(d, v) => set_limit(s, d, asymmetric, |l| l.max_current = v),
            Self::MotorCurrentCalibration(d, v) => {
                set_limit(s, d, asymmetric, |l| l.current_calibration = v);
            }

            Self::VinCalibration(v) => s.vin_calibration = v,
            Self::CurrentOffsetCalibration(v) => s.current_offset_calibration = v,
            Self::CurrentScaleCalibration(v) => s.current_scale_calibration = v,
        }
    }
}
