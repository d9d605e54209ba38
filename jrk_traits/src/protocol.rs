//! Product identifiers, mode selectors and error bits shared by the host and
//! the device firmware.

pub const PRODUCT_UMC04A_30V: u32 = 1;
pub const PRODUCT_UMC04A_40V: u32 = 2;
pub const PRODUCT_UMC05A_30V: u32 = 3;
pub const PRODUCT_UMC05A_40V: u32 = 4;
pub const PRODUCT_UMC06A: u32 = 5;

/// Human-readable product name, or "Unknown product".
pub fn product_name(product: u32) -> &'static str {
    match product {
        PRODUCT_UMC04A_30V => "Jrk G2 18v27",
        PRODUCT_UMC04A_40V => "Jrk G2 24v21",
        PRODUCT_UMC05A_30V => "Jrk G2 18v19",
        PRODUCT_UMC05A_40V => "Jrk G2 24v13",
        PRODUCT_UMC06A => "Jrk G2 21v3",
        _ => "Unknown product",
    }
}

/// Where the device gets its target from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Serial,
    Analog,
    Rc,
}

/// Feedback source for the PID loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedbackMode {
    None,
    #[default]
    Analog,
    Frequency,
}

/// Serial interface routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerialMode {
    #[default]
    UsbDualPort,
    UsbChained,
    Uart,
}

/// Bit positions of the error flag registers.
pub mod error_bit {
    pub const AWAITING_COMMAND: u16 = 0;
    pub const NO_POWER: u16 = 1;
    pub const MOTOR_DRIVER: u16 = 2;
    pub const INPUT_INVALID: u16 = 3;
    pub const INPUT_DISCONNECT: u16 = 4;
    pub const FEEDBACK_DISCONNECT: u16 = 5;
    pub const SOFT_OVERCURRENT: u16 = 6;
    pub const SERIAL_SIGNAL: u16 = 7;
    pub const SERIAL_OVERRUN: u16 = 8;
    pub const SERIAL_BUFFER_FULL: u16 = 9;
    pub const SERIAL_CRC: u16 = 10;
    pub const SERIAL_PROTOCOL: u16 = 11;
    pub const SERIAL_TIMEOUT: u16 = 12;
    pub const HARD_OVERCURRENT: u16 = 13;
}

/// Names for each set bit of an error flag register, lowest bit first.
pub fn error_names(flags: u16) -> Vec<&'static str> {
    const NAMES: [&str; 14] = [
        "Awaiting command",
        "No power",
        "Motor driver error",
        "Input invalid",
        "Input disconnect",
        "Feedback disconnect",
        "Soft overcurrent",
        "Serial signal error",
        "Serial overrun",
        "Serial RX buffer full",
        "Serial CRC error",
        "Serial protocol error",
        "Serial timeout error",
        "Hard overcurrent",
    ];
    NAMES
        .iter()
        .enumerate()
        .filter(|(bit, _)| flags & (1 << bit) != 0)
        .map(|(_, name)| *name)
        .collect()
}

/// Name of the cause of the device's last reset.
pub fn device_reset_name(code: u8) -> &'static str {
    match code {
        0x04 => "Power-on reset",
        0x08 => "Brown-out reset",
        0x0C => "Reset pin driven low",
        0x14 => "Watchdog reset",
        0x24 => "Software reset (bootloader)",
        0x44 => "Stack underflow",
        0x84 => "Stack overflow",
        _ => "(Unknown)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_names_lists_set_bits_in_order() {
        let flags = (1 << error_bit::AWAITING_COMMAND) | (1 << error_bit::HARD_OVERCURRENT);
        assert_eq!(error_names(flags), vec!["Awaiting command", "Hard overcurrent"]);
        assert!(error_names(0).is_empty());
    }
}
