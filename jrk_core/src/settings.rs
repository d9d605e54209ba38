//! Values derived from a settings snapshot, and the settings fixer.

use std::fmt::Display;

use jrk_traits::{MotorLimits, PidChannel, Settings};

use crate::current;
use crate::pid::{self, MAX_EXPONENT, MAX_MULTIPLIER};

/// True when any forward motor limit differs from its reverse counterpart.
pub fn motor_asymmetric(settings: &Settings) -> bool {
    settings.motor_forward != settings.motor_reverse
}

/// Decoded gain of each PID channel, indexed by `PidChannel::index()`.
pub fn pid_constants(settings: &Settings) -> [f64; 3] {
    PidChannel::ALL.map(|channel| pid::decode(settings.pid(channel)))
}

/// Joins fixer warnings into a prompt body, one line each.
pub fn warnings_text(warnings: &[String]) -> String {
    warnings.iter().fold(String::new(), |mut out, w| {
        out.push_str(w);
        out.push('\n');
        out
    })
}

const MAX_12BIT: u16 = 4095;
const MAX_ANALOG_SAMPLES_EXPONENT: u8 = 10;
const MIN_BAUD_RATE: u32 = 300;
const MAX_BAUD_RATE: u32 = 115_200;
const MAX_DEVICE_NUMBER: u16 = 127;
const MAX_DEVICE_NUMBER_14BIT: u16 = 16_383;
const MAX_SERIAL_TIMEOUT_MS: u32 = 655_350;
const MAX_SCALING_DEGREE: u8 = 4;
const MAX_PID_PERIOD: u16 = 8191;
const MAX_INTEGRAL_LIMIT: u16 = 32_767;
const MAX_PWM_FREQUENCY: u8 = 1;
const MAX_DUTY_CYCLE: u16 = 600;
const MAX_BRAKE_DURATION_MS: u32 = 1275;
const BRAKE_DURATION_UNITS_MS: u32 = 5;
const MAX_OFFSET_CALIBRATION: i16 = 800;
const MAX_SCALE_CALIBRATION: i16 = 1875;

struct Fixer {
    warnings: Vec<String>,
}

impl Fixer {
    fn warn(&mut self, msg: String) {
        tracing::debug!(warning = %msg, "settings fixed");
        self.warnings.push(format!("Warning: {msg}"));
    }

    fn at_most<T: PartialOrd + Copy + Display>(&mut self, value: &mut T, max: T, what: &str) {
        if *value > max {
            self.warn(format!(
                "The {what} was too high so it will be changed to {max}."
            ));
            *value = max;
        }
    }

    fn at_least<T: PartialOrd + Copy + Display>(&mut self, value: &mut T, min: T, what: &str) {
        if *value < min {
            self.warn(format!(
                "The {what} was too low so it will be changed to {min}."
            ));
            *value = min;
        }
    }

    fn within<T: PartialOrd + Copy + Display>(&mut self, value: &mut T, min: T, max: T, what: &str) {
        self.at_least(value, min, what);
        self.at_most(value, max, what);
    }

    fn motor_limits(&mut self, settings: &Settings, limits: &mut MotorLimits, direction: &str) {
        self.at_most(
            &mut limits.max_duty_cycle,
            MAX_DUTY_CYCLE,
            &format!("maximum duty cycle {direction}"),
        );
        self.within(
            &mut limits.max_acceleration,
            1,
            MAX_DUTY_CYCLE,
            &format!("maximum acceleration {direction}"),
        );
        self.within(
            &mut limits.max_deceleration,
            1,
            MAX_DUTY_CYCLE,
            &format!("maximum deceleration {direction}"),
        );

        let brake = limits.brake_duration;
        let rounded = brake.div_ceil(BRAKE_DURATION_UNITS_MS) * BRAKE_DURATION_UNITS_MS;
        if rounded != brake && rounded <= MAX_BRAKE_DURATION_MS {
            self.warn(format!(
                "The brake duration {direction} will be rounded up from {brake} ms to {rounded} ms."
            ));
            limits.brake_duration = rounded;
        }
        self.at_most(
            &mut limits.brake_duration,
            MAX_BRAKE_DURATION_MS,
            &format!("brake duration {direction}"),
        );

        let code = limits.max_current;
        let normalized = current::normalize_code(settings, code);
        if normalized != code {
            self.warn(format!(
                "The hard current limit {direction} will be changed from code {code} to {normalized} ({} mA).",
                current::code_to_ma(settings, normalized)
            ));
            limits.max_current = normalized;
        }
    }
}

/// Checks every field against the device's accepted ranges.
///
/// Returns the corrected settings and one warning per correction. Settings
/// that are already valid come back unchanged with no warnings.
pub fn fix(settings: &Settings) -> (Settings, Vec<String>) {
    let mut s = settings.clone();
    let mut f = Fixer {
        warnings: Vec::new(),
    };
    let defaults = Settings::defaults_for(s.product);

    // Input
    f.at_most(
        &mut s.input_analog_samples_exponent,
        MAX_ANALOG_SAMPLES_EXPONENT,
        "input analog samples exponent",
    );
    for (value, what) in [
        (&mut s.input_absolute_minimum, "input absolute minimum"),
        (&mut s.input_absolute_maximum, "input absolute maximum"),
        (&mut s.input_minimum, "input minimum"),
        (&mut s.input_maximum, "input maximum"),
        (&mut s.input_neutral_minimum, "input neutral minimum"),
        (&mut s.input_neutral_maximum, "input neutral maximum"),
        (&mut s.output_minimum, "output minimum"),
        (&mut s.output_neutral, "output neutral"),
        (&mut s.output_maximum, "output maximum"),
    ] {
        f.at_most(value, MAX_12BIT, what);
    }
    if !(s.input_minimum <= s.input_neutral_minimum
        && s.input_neutral_minimum <= s.input_neutral_maximum
        && s.input_neutral_maximum <= s.input_maximum)
    {
        f.warn(
            "The input minimum, neutral minimum, neutral maximum, and maximum are out of order so they will be reset to their default values."
                .to_string(),
        );
        s.input_minimum = defaults.input_minimum;
        s.input_neutral_minimum = defaults.input_neutral_minimum;
        s.input_neutral_maximum = defaults.input_neutral_maximum;
        s.input_maximum = defaults.input_maximum;
    }
    if s.input_absolute_minimum > s.input_absolute_maximum {
        f.warn(
            "The input absolute minimum is higher than the absolute maximum so they will be reset to their default values."
                .to_string(),
        );
        s.input_absolute_minimum = defaults.input_absolute_minimum;
        s.input_absolute_maximum = defaults.input_absolute_maximum;
    }
    if !(s.output_minimum <= s.output_neutral && s.output_neutral <= s.output_maximum) {
        f.warn(
            "The output minimum, neutral, and maximum are out of order so they will be reset to their default values."
                .to_string(),
        );
        s.output_minimum = defaults.output_minimum;
        s.output_neutral = defaults.output_neutral;
        s.output_maximum = defaults.output_maximum;
    }
    f.at_most(
        &mut s.input_scaling_degree,
        MAX_SCALING_DEGREE,
        "input scaling degree",
    );

    // Serial
    f.within(
        &mut s.serial_baud_rate,
        MIN_BAUD_RATE,
        MAX_BAUD_RATE,
        "serial baud rate",
    );
    let max_device_number = if s.serial_enable_14bit_device_number {
        MAX_DEVICE_NUMBER_14BIT
    } else {
        MAX_DEVICE_NUMBER
    };
    f.at_most(
        &mut s.serial_device_number,
        max_device_number,
        "serial device number",
    );
    f.at_most(
        &mut s.serial_timeout,
        MAX_SERIAL_TIMEOUT_MS,
        "serial timeout",
    );
    let timeout = s.serial_timeout;
    let rounded = timeout.div_ceil(10) * 10;
    if rounded != timeout {
        f.warn(format!(
            "The serial timeout will be rounded up from {timeout} ms to {rounded} ms."
        ));
        s.serial_timeout = rounded;
    }

    // Feedback
    f.at_most(
        &mut s.feedback_analog_samples_exponent,
        MAX_ANALOG_SAMPLES_EXPONENT,
        "feedback analog samples exponent",
    );
    for (value, what) in [
        (&mut s.feedback_absolute_minimum, "feedback absolute minimum"),
        (&mut s.feedback_absolute_maximum, "feedback absolute maximum"),
        (&mut s.feedback_minimum, "feedback minimum"),
        (&mut s.feedback_maximum, "feedback maximum"),
    ] {
        f.at_most(value, MAX_12BIT, what);
    }
    if s.feedback_minimum > s.feedback_maximum {
        f.warn(
            "The feedback minimum is higher than the feedback maximum so they will be reset to their default values."
                .to_string(),
        );
        s.feedback_minimum = defaults.feedback_minimum;
        s.feedback_maximum = defaults.feedback_maximum;
    }
    if s.feedback_absolute_minimum > s.feedback_absolute_maximum {
        f.warn(
            "The feedback absolute minimum is higher than the absolute maximum so they will be reset to their default values."
                .to_string(),
        );
        s.feedback_absolute_minimum = defaults.feedback_absolute_minimum;
        s.feedback_absolute_maximum = defaults.feedback_absolute_maximum;
    }

    // PID
    for channel in PidChannel::ALL {
        let name = channel.name();
        let coefficient = s.pid_mut(channel);
        f.at_most(
            &mut coefficient.multiplier,
            MAX_MULTIPLIER,
            &format!("{name} multiplier"),
        );
        f.at_most(
            &mut coefficient.exponent,
            MAX_EXPONENT,
            &format!("{name} exponent"),
        );
    }
    f.within(&mut s.pid_period, 1, MAX_PID_PERIOD, "PID period");
    f.at_most(
        &mut s.pid_integral_limit,
        MAX_INTEGRAL_LIMIT,
        "PID integral limit",
    );

    // Motor
    f.at_most(
        &mut s.motor_pwm_frequency,
        MAX_PWM_FREQUENCY,
        "PWM frequency",
    );
    f.at_most(
        &mut s.motor_max_duty_cycle_while_feedback_out_of_range,
        MAX_DUTY_CYCLE,
        "maximum duty cycle while feedback is out of range",
    );
    let mut forward = s.motor_forward;
    let mut reverse = s.motor_reverse;
    f.motor_limits(&s, &mut forward, "forward");
    f.motor_limits(&s, &mut reverse, "reverse");
    s.motor_forward = forward;
    s.motor_reverse = reverse;

    // Calibration
    f.within(
        &mut s.current_offset_calibration,
        -MAX_OFFSET_CALIBRATION,
        MAX_OFFSET_CALIBRATION,
        "current offset calibration",
    );
    f.within(
        &mut s.current_scale_calibration,
        -MAX_SCALE_CALIBRATION,
        MAX_SCALE_CALIBRATION,
        "current scale calibration",
    );

    (s, f.warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jrk_traits::PidCoefficient;

    #[test]
    fn defaults_need_no_fixing() {
        for product in 1..=5 {
            let s = Settings::defaults_for(product);
            let (fixed, warnings) = fix(&s);
            assert!(warnings.is_empty(), "product {product}: {warnings:?}");
            assert_eq!(fixed, s);
        }
    }

    #[test]
    fn each_correction_adds_one_warning() {
        let mut s = Settings::defaults_for(1);
        s.serial_baud_rate = 10;
        s.pid_period = 0;
        s.pid[1] = PidCoefficient::new(2000, 20);
        let (fixed, warnings) = fix(&s);
        assert_eq!(fixed.serial_baud_rate, 300);
        assert_eq!(fixed.pid_period, 1);
        assert_eq!(fixed.pid[1], PidCoefficient::new(1023, 17));
        assert_eq!(warnings.len(), 4, "{warnings:?}");
        assert!(warnings.iter().all(|w| w.starts_with("Warning: ")));
    }

    #[test]
    fn serial_timeout_rounds_up_to_10ms() {
        let mut s = Settings::defaults_for(1);
        s.serial_timeout = 1001;
        let (fixed, warnings) = fix(&s);
        assert_eq!(fixed.serial_timeout, 1010);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn device_number_limit_depends_on_14bit_mode() {
        let mut s = Settings::defaults_for(1);
        s.serial_device_number = 500;
        assert_eq!(fix(&s).0.serial_device_number, 127);
        s.serial_enable_14bit_device_number = true;
        assert_eq!(fix(&s).0.serial_device_number, 500);
    }

    #[test]
    fn out_of_order_input_range_resets_group() {
        let mut s = Settings::defaults_for(1);
        s.input_minimum = 3000;
        s.input_maximum = 1000;
        let (fixed, warnings) = fix(&s);
        assert_eq!(fixed.input_minimum, 0);
        assert_eq!(fixed.input_maximum, 4095);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn brake_duration_rounds_to_5ms_and_caps() {
        let mut s = Settings::defaults_for(1);
        s.motor_forward.brake_duration = 12;
        s.motor_reverse.brake_duration = 5000;
        let (fixed, _) = fix(&s);
        assert_eq!(fixed.motor_forward.brake_duration, 15);
        assert_eq!(fixed.motor_reverse.brake_duration, 1275);
    }

    #[test]
    fn non_recommended_current_code_is_normalized() {
        let mut s = Settings::defaults_for(1);
        s.motor_forward.max_current = 86;
        let (fixed, warnings) = fix(&s);
        assert_eq!(fixed.motor_forward.max_current, 63);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("forward"));
    }

    #[test]
    fn current_codes_survive_on_products_without_a_table() {
        let mut s = Settings::defaults_for(3);
        s.motor_forward.max_current = 20;
        s.motor_reverse.max_current = 20;
        let (fixed, warnings) = fix(&s);
        assert_eq!(fixed.motor_forward.max_current, 20);
        assert_eq!(fixed.motor_reverse.max_current, 20);
        assert!(!warnings.iter().any(|w| w.contains("hard current limit")));
    }

    #[test]
    fn fixing_is_idempotent() {
        let mut s = Settings::defaults_for(2);
        s.motor_forward.max_acceleration = 0;
        s.current_scale_calibration = -3000;
        s.feedback_analog_samples_exponent = 15;
        let (once, _) = fix(&s);
        let (twice, warnings) = fix(&once);
        assert_eq!(once, twice);
        assert!(warnings.is_empty());
    }

    #[test]
    fn asymmetry_tracks_every_limit_pair() {
        let base = Settings::defaults_for(1);
        assert!(!motor_asymmetric(&base));
        let edits: [fn(&mut MotorLimits); 6] = [
            |l| l.max_duty_cycle = 100,
            |l| l.max_acceleration = 100,
            |l| l.max_deceleration = 100,
            |l| l.brake_duration = 100,
            |l| l.max_current = 31,
            |l| l.current_calibration = 7,
        ];
        for edit in edits {
            let mut s = base.clone();
            edit(&mut s.motor_reverse);
            assert!(motor_asymmetric(&s));
            edit(&mut s.motor_forward);
            assert!(!motor_asymmetric(&s));
        }
    }

    #[test]
    fn pid_constants_decode_each_channel() {
        let mut s = Settings::defaults_for(1);
        s.pid = [
            PidCoefficient::new(8, 3),
            PidCoefficient::new(3, 1),
            PidCoefficient::new(0, 0),
        ];
        assert_eq!(pid_constants(&s), [1.0, 1.5, 0.0]);
    }

    #[test]
    fn warnings_text_puts_each_warning_on_its_own_line() {
        let text = warnings_text(&["Warning: a".into(), "Warning: b".into()]);
        assert_eq!(text, "Warning: a\nWarning: b\n");
    }
}
