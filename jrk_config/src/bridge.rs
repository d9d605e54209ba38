//! Conversions between the on-disk settings schema and the device model in
//! `jrk_traits`.

use jrk_traits::{FeedbackMode, InputMode, MotorLimits, PidCoefficient, SerialMode, Settings};

use crate::settings_file::{
    CalibrationSection, FeedbackModeToml, FeedbackSection, InputModeToml, InputSection,
    MotorDirection, MotorSection, PidSection, PidTerm, SerialModeToml, SerialSection,
    SettingsFile,
};

// ── Mode enums ───────────────────────────────────────────────────────────────

impl From<InputModeToml> for InputMode {
    fn from(m: InputModeToml) -> Self {
        match m {
            InputModeToml::Serial => Self::Serial,
            InputModeToml::Analog => Self::Analog,
            InputModeToml::Rc => Self::Rc,
        }
    }
}

impl From<InputMode> for InputModeToml {
    fn from(m: InputMode) -> Self {
        match m {
            InputMode::Serial => Self::Serial,
            InputMode::Analog => Self::Analog,
            InputMode::Rc => Self::Rc,
        }
    }
}

impl From<FeedbackModeToml> for FeedbackMode {
    fn from(m: FeedbackModeToml) -> Self {
        match m {
            FeedbackModeToml::None => Self::None,
            FeedbackModeToml::Analog => Self::Analog,
            FeedbackModeToml::Frequency => Self::Frequency,
        }
    }
}

impl From<FeedbackMode> for FeedbackModeToml {
    fn from(m: FeedbackMode) -> Self {
        match m {
            FeedbackMode::None => Self::None,
            FeedbackMode::Analog => Self::Analog,
            FeedbackMode::Frequency => Self::Frequency,
        }
    }
}

impl From<SerialModeToml> for SerialMode {
    fn from(m: SerialModeToml) -> Self {
        match m {
            SerialModeToml::UsbDualPort => Self::UsbDualPort,
            SerialModeToml::UsbChained => Self::UsbChained,
            SerialModeToml::Uart => Self::Uart,
        }
    }
}

impl From<SerialMode> for SerialModeToml {
    fn from(m: SerialMode) -> Self {
        match m {
            SerialMode::UsbDualPort => Self::UsbDualPort,
            SerialMode::UsbChained => Self::UsbChained,
            SerialMode::Uart => Self::Uart,
        }
    }
}

// ── Motor / PID pieces ───────────────────────────────────────────────────────

impl From<&MotorDirection> for MotorLimits {
    fn from(d: &MotorDirection) -> Self {
        Self {
            max_duty_cycle: d.max_duty_cycle,
            max_acceleration: d.max_acceleration,
            max_deceleration: d.max_deceleration,
            brake_duration: d.brake_duration_ms,
            max_current: d.max_current_code,
            current_calibration: d.current_calibration,
        }
    }
}

impl From<&MotorLimits> for MotorDirection {
    fn from(l: &MotorLimits) -> Self {
        Self {
            max_duty_cycle: l.max_duty_cycle,
            max_acceleration: l.max_acceleration,
            max_deceleration: l.max_deceleration,
            brake_duration_ms: l.brake_duration,
            max_current_code: l.max_current,
            current_calibration: l.current_calibration,
        }
    }
}

impl From<PidTerm> for PidCoefficient {
    fn from(t: PidTerm) -> Self {
        Self::new(t.multiplier, t.exponent)
    }
}

impl From<PidCoefficient> for PidTerm {
    fn from(c: PidCoefficient) -> Self {
        Self {
            multiplier: c.multiplier,
            exponent: c.exponent,
        }
    }
}

// ── Settings ─────────────────────────────────────────────────────────────────

impl From<&SettingsFile> for Settings {
    fn from(f: &SettingsFile) -> Self {
        let (input, serial, feedback, pid, motor, cal) = (
            &f.input,
            &f.serial,
            &f.feedback,
            &f.pid,
            &f.motor,
            &f.calibration,
        );
        Self {
            product: f.product,
            firmware_version: f.firmware_version,
            input_mode: input.mode.into(),
            input_analog_samples_exponent: input.analog_samples_exponent,
            input_detect_disconnect: input.detect_disconnect,
            input_invert: input.invert,
            input_absolute_minimum: input.absolute_minimum,
            input_absolute_maximum: input.absolute_maximum,
            input_minimum: input.minimum,
            input_maximum: input.maximum,
            input_neutral_minimum: input.neutral_minimum,
            input_neutral_maximum: input.neutral_maximum,
            output_minimum: input.output_minimum,
            output_neutral: input.output_neutral,
            output_maximum: input.output_maximum,
            input_scaling_degree: input.scaling_degree,
            serial_mode: serial.mode.into(),
            serial_baud_rate: serial.baud_rate,
            serial_enable_crc: serial.enable_crc,
            serial_device_number: serial.device_number,
            serial_enable_14bit_device_number: serial.enable_14bit_device_number,
            serial_timeout: serial.timeout_ms,
            serial_disable_compact_protocol: serial.disable_compact_protocol,
            never_sleep: serial.never_sleep,
            feedback_mode: feedback.mode.into(),
            feedback_invert: feedback.invert,
            feedback_absolute_minimum: feedback.absolute_minimum,
            feedback_absolute_maximum: feedback.absolute_maximum,
            feedback_minimum: feedback.minimum,
            feedback_maximum: feedback.maximum,
            feedback_analog_samples_exponent: feedback.analog_samples_exponent,
            feedback_detect_disconnect: feedback.detect_disconnect,
            feedback_dead_zone: feedback.dead_zone,
            pid_period: pid.period,
            pid_integral_limit: pid.integral_limit,
            pid_reset_integral: pid.reset_integral,
            pid: [
                pid.proportional.into(),
                pid.integral.into(),
                pid.derivative.into(),
            ],
            motor_pwm_frequency: motor.pwm_frequency,
            motor_invert: motor.invert,
            motor_max_duty_cycle_while_feedback_out_of_range: motor
                .max_duty_cycle_while_feedback_out_of_range,
            motor_coast_when_off: motor.coast_when_off,
            motor_forward: (&motor.forward).into(),
            motor_reverse: (&motor.reverse).into(),
            current_offset_calibration: cal.current_offset,
            current_scale_calibration: cal.current_scale,
            vin_calibration: cal.vin,
        }
    }
}

impl From<&Settings> for SettingsFile {
    fn from(s: &Settings) -> Self {
        Self {
            product: s.product,
            firmware_version: s.firmware_version,
            input: InputSection {
                mode: s.input_mode.into(),
                analog_samples_exponent: s.input_analog_samples_exponent,
                detect_disconnect: s.input_detect_disconnect,
                invert: s.input_invert,
                absolute_minimum: s.input_absolute_minimum,
                absolute_maximum: s.input_absolute_maximum,
                minimum: s.input_minimum,
                maximum: s.input_maximum,
                neutral_minimum: s.input_neutral_minimum,
                neutral_maximum: s.input_neutral_maximum,
                output_minimum: s.output_minimum,
                output_neutral: s.output_neutral,
                output_maximum: s.output_maximum,
                scaling_degree: s.input_scaling_degree,
            },
            serial: SerialSection {
                mode: s.serial_mode.into(),
                baud_rate: s.serial_baud_rate,
                enable_crc: s.serial_enable_crc,
                device_number: s.serial_device_number,
                enable_14bit_device_number: s.serial_enable_14bit_device_number,
                timeout_ms: s.serial_timeout,
                disable_compact_protocol: s.serial_disable_compact_protocol,
                never_sleep: s.never_sleep,
            },
            feedback: FeedbackSection {
                mode: s.feedback_mode.into(),
                invert: s.feedback_invert,
                absolute_minimum: s.feedback_absolute_minimum,
                absolute_maximum: s.feedback_absolute_maximum,
                minimum: s.feedback_minimum,
                maximum: s.feedback_maximum,
                analog_samples_exponent: s.feedback_analog_samples_exponent,
                detect_disconnect: s.feedback_detect_disconnect,
                dead_zone: s.feedback_dead_zone,
            },
            pid: PidSection {
                period: s.pid_period,
                integral_limit: s.pid_integral_limit,
                reset_integral: s.pid_reset_integral,
                proportional: s.pid[0].into(),
                integral: s.pid[1].into(),
                derivative: s.pid[2].into(),
            },
            motor: MotorSection {
                pwm_frequency: s.motor_pwm_frequency,
                invert: s.motor_invert,
                max_duty_cycle_while_feedback_out_of_range: s
                    .motor_max_duty_cycle_while_feedback_out_of_range,
                coast_when_off: s.motor_coast_when_off,
                forward: (&s.motor_forward).into(),
                reverse: (&s.motor_reverse).into(),
            },
            calibration: CalibrationSection {
                current_offset: s.current_offset_calibration,
                current_scale: s.current_scale_calibration,
                vin: s.vin_calibration,
            },
        }
    }
}
