//! Current limit calibration.
//!
//! Translates between hard current limit codes and milliamps using the same
//! fixed-point arithmetic the firmware runs, so numbers shown on the host
//! match what the device enforces.
//!
//! A current limit code packs two fields:
//! - bits 0..=4: DAC level, an index into the product's VILIM table
//! - bits 5..=6: DAC reference, which selects the sense amplifier gain
//!
//! Codes above 95 are treated as 0 by the hardware.

use jrk_traits::protocol::{PRODUCT_UMC04A_30V, PRODUCT_UMC04A_40V};
use jrk_traits::{Settings, Variables};

/// Duty cycle used when converting a code to a current limit (100%).
const FULL_DUTY_CYCLE: i16 = 600;

const MAX_CODE: u16 = 95;

/// VILIM for each DAC level, in units of 1/65536 of the DAC reference.
const UMC04A_30V_VILIM: [u16; 32] = [
    0, 809, 1528, 2178, 2776, 3335, 3865, 4374, 4868, 5352, 5833, 6314, 6799, 7292, 7797, 8319,
    8861, 9428, 10025, 10658, 11331, 12054, 12833, 13679, 14604, 15623, 16752, 18014, 19437,
    21058, 22923, 25097,
];

const UMC04A_40V_VILIM: [u16; 32] = [
    0, 1353, 2592, 3742, 4821, 5845, 6826, 7776, 8703, 9615, 10519, 11423, 12333, 13254, 14192,
    15154, 16146, 17175, 18247, 19371, 20555, 21809, 23143, 24572, 26109, 27772, 29583, 31566,
    33752, 36179, 38894, 41958,
];

/// Codes offered to the user, highest current first, terminated by 0.
const UMC04A_30V_RECOMMENDED_CODES: [u8; 46] = [
    95, 94, 93, 92, 91, 90, 89, 88, 87, 63, 62, 61, 60, 59, 58, 57, 56, 55, 31, 30, 29, 28, 27, 26,
    25, 24, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 0,
];

const UMC04A_40V_RECOMMENDED_CODES: [u8; 51] = [
    95, 94, 93, 92, 91, 90, 89, 88, 87, 86, 85, 63, 62, 61, 60, 59, 58, 57, 56, 55, 54, 31, 30, 29,
    28, 27, 26, 25, 24, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3,
    0,
];

#[inline]
fn is_umc04a(product: u32) -> bool {
    product == PRODUCT_UMC04A_30V || product == PRODUCT_UMC04A_40V
}

#[inline]
fn rsense_mohm(product: u32) -> u8 {
    if product == PRODUCT_UMC04A_40V { 2 } else { 1 }
}

fn vilim_table(product: u32) -> &'static [u16; 32] {
    if product == PRODUCT_UMC04A_40V {
        &UMC04A_40V_VILIM
    } else {
        &UMC04A_30V_VILIM
    }
}

/// Recommended current limit codes for `product`, highest current first,
/// including the trailing 0. Empty for products without current sensing.
pub fn recommended_codes(product: u32) -> &'static [u8] {
    match product {
        PRODUCT_UMC04A_30V => &UMC04A_30V_RECOMMENDED_CODES,
        PRODUCT_UMC04A_40V => &UMC04A_40V_RECOMMENDED_CODES,
        _ => &[],
    }
}

/// Measured current in mA from a raw sense reading, as computed on UMC04A
/// firmware.
///
/// All arithmetic is unsigned 32-bit with wrapping, matching the firmware.
pub fn measured_current_ma_umc04a(
    raw_current: u16,
    current_limit_code: u16,
    duty_cycle: i16,
    rsense_mohm: u8,
    offset_calibration: i16,
    scale_calibration: i16,
) -> u16 {
    if duty_cycle == 0 {
        return 0;
    }

    let offset = 800u16.wrapping_add_signed(offset_calibration);
    let scale = 1875u16.wrapping_add_signed(scale_calibration);

    let dac_ref = ((current_limit_code >> 5) & 3) as u8;
    let mut current = raw_current >> (2u8.wrapping_sub(dac_ref) & 3);
    current = current.saturating_sub(offset);

    let duty = u32::from(duty_cycle.unsigned_abs());
    let numerator = u32::from(current).wrapping_mul(u32::from(scale));
    let denominator = duty * u32::from(rsense_mohm);
    if denominator == 0 {
        return 0;
    }
    let ma = numerator / denominator;
    u16::try_from(ma).unwrap_or(u16::MAX)
}

/// Current limit in mA that `code` configures on the device.
///
/// Returns 0 for products without current sensing.
pub fn code_to_ma(settings: &Settings, code: u16) -> u16 {
    let product = settings.product;
    if !is_umc04a(product) {
        return 0;
    }

    let mut code = code & 0xFF;
    if code > MAX_CODE {
        code = 0;
    }
    let vilim = vilim_table(product)[usize::from(code & 31)];

    measured_current_ma_umc04a(
        vilim,
        code,
        FULL_DUTY_CYCLE,
        rsense_mohm(product),
        settings.current_offset_calibration,
        settings.current_scale_calibration,
    )
}

/// Highest recommended code whose current limit does not exceed `ma`.
///
/// Returns 0 when no recommended code fits or the product is unknown.
pub fn ma_to_code(settings: &Settings, ma: u16) -> u16 {
    recommended_codes(settings.product)
        .iter()
        .take_while(|&&code| code != 0)
        .map(|&code| u16::from(code))
        .find(|&code| code_to_ma(settings, code) <= ma)
        .unwrap_or(0)
}

/// Software recomputation of the measured current from raw telemetry.
pub fn software_measured_current_ma(settings: &Settings, vars: &Variables) -> u16 {
    let product = settings.product;
    if !is_umc04a(product) {
        return 0;
    }
    measured_current_ma_umc04a(
        vars.raw_current,
        vars.current_limit_code,
        vars.last_duty_cycle,
        rsense_mohm(product),
        settings.current_offset_calibration,
        settings.current_scale_calibration,
    )
}

/// Measured motor current in mA.
///
/// The firmware already reports this value; it is passed through for
/// supported products.
pub fn calculate_measured_current_ma(settings: &Settings, vars: &Variables) -> u16 {
    if !is_umc04a(settings.product) {
        return 0;
    }
    let current = vars.current;

    #[cfg(feature = "verify-current")]
    {
        let recomputed = software_measured_current_ma(settings, vars);
        if recomputed != current {
            tracing::warn!(
                device = current,
                software = recomputed,
                raw = vars.raw_current,
                code = vars.current_limit_code,
                duty = vars.last_duty_cycle,
                "measured current mismatch"
            );
        }
    }

    current
}

/// Raw current sense reading scaled to mV*64, for diagnostics.
pub fn calculate_raw_current_mv64(settings: &Settings, vars: &Variables) -> u32 {
    if !is_umc04a(settings.product) {
        return 0;
    }
    let dac_ref = (vars.current_limit_code >> 5) & 3;
    u32::from(vars.raw_current) << dac_ref
}

/// Nearest recommended code at or below `code`'s current, or 0.
pub(crate) fn normalize_code(settings: &Settings, code: u16) -> u16 {
    let recommended = recommended_codes(settings.product);
    if recommended.is_empty() || recommended.iter().any(|&c| u16::from(c) == code) {
        return code;
    }
    ma_to_code(settings, code_to_ma(settings, code))
}
