/// Live telemetry read from the device.
///
/// Replaced wholesale on every poll; nothing mutates it field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    pub input: u16,
    pub target: u16,
    pub feedback: u16,
    /// Feedback normalized to 0..=4095.
    pub scaled_feedback: u16,
    pub integral: i16,
    pub duty_cycle_target: i16,
    pub duty_cycle: i16,
    /// Duty cycle used for the last current measurement.
    pub last_duty_cycle: i16,
    pub pid_period_exceeded: bool,
    pub error_flags_halting: u16,
    pub error_flags_occurred: u16,
    /// Input voltage in mV.
    pub vin_voltage: u16,
    /// Firmware-computed current in mA.
    pub current: u16,
    /// Raw current sense reading.
    pub raw_current: u16,
    /// Encoded hard current limit in effect.
    pub current_limit_code: u16,
    pub current_chopping_consecutive_count: u8,
    pub current_chopping_occurrence_count: u8,
    pub device_reset: u8,
    /// Milliseconds since the device powered up.
    pub up_time: u32,
}
