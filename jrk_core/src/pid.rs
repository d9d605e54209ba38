//! PID coefficient codec.
//!
//! The firmware stores each gain as `multiplier / 2^exponent` with a 10-bit
//! multiplier and an exponent of at most 17.

use jrk_traits::PidCoefficient;

pub const MAX_MULTIPLIER: u16 = 1023;
pub const MAX_EXPONENT: u8 = 17;

/// Gain represented by a multiplier/exponent pair.
pub fn multiplier_exponent_to_constant(multiplier: u16, exponent: u8) -> f64 {
    let mut constant = f64::from(multiplier);
    for _ in 0..exponent {
        constant /= 2.0;
    }
    constant
}

/// Encode `constant` as the multiplier/exponent pair with the most precision
/// that fits, normalized to the smallest exponent for that value.
///
/// Non-finite and non-positive gains encode as `(0, 0)`. Gains above 1023
/// saturate at `(1023, 0)`.
pub fn constant_to_multiplier_exponent(constant: f64) -> (u16, u8) {
    if !constant.is_finite() || constant <= 0.0 {
        return (0, 0);
    }
    let max = f64::from(MAX_MULTIPLIER);
    if constant > max {
        return (MAX_MULTIPLIER, 0);
    }

    let mut divisor: u32 = 1;
    let mut exponent: u8 = 0;
    while exponent < MAX_EXPONENT && f64::from(divisor * 2) * constant <= max {
        divisor *= 2;
        exponent += 1;
    }

    // Truncation is what the firmware tooling does.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut multiplier = (f64::from(divisor) * constant) as u16;

    while multiplier % 2 == 0 && exponent > 0 {
        multiplier /= 2;
        exponent -= 1;
    }
    (multiplier, exponent)
}

pub fn decode(coefficient: PidCoefficient) -> f64 {
    multiplier_exponent_to_constant(coefficient.multiplier, coefficient.exponent)
}

pub fn encode(constant: f64) -> PidCoefficient {
    let (multiplier, exponent) = constant_to_multiplier_exponent(constant);
    PidCoefficient::new(multiplier, exponent)
}
