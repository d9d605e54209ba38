pub mod clock;
pub mod device;
pub mod protocol;
pub mod settings;
pub mod variables;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use device::Device;
pub use protocol::{FeedbackMode, InputMode, SerialMode};
pub use settings::{MotorLimits, PidChannel, PidCoefficient, Settings};
pub use variables::Variables;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An open, exclusively owned connection to one device.
///
/// `close()` must be idempotent: calling it on an already closed handle is a
/// no-op. Every other call on a closed handle should fail.
pub trait DeviceHandle {
    fn device(&self) -> &Device;
    fn close(&mut self);

    fn firmware_version_string(&mut self) -> Result<String, BoxError>;
    fn get_settings(&mut self) -> Result<Settings, BoxError>;
    fn set_settings(&mut self, settings: &Settings) -> Result<(), BoxError>;
    /// Reads telemetry; `clear_errors_occurred` resets the latched error bits.
    fn get_variables(&mut self, clear_errors_occurred: bool) -> Result<Variables, BoxError>;
    fn set_target(&mut self, target: u16) -> Result<(), BoxError>;
    fn stop_motor(&mut self) -> Result<(), BoxError>;
    fn run_motor(&mut self) -> Result<(), BoxError>;
    /// Makes the device re-read its stored settings.
    fn reinitialize(&mut self) -> Result<(), BoxError>;
    fn restore_defaults(&mut self) -> Result<(), BoxError>;
}

/// Device enumeration plus the ability to open a handle.
pub trait DeviceBackend {
    type Handle: DeviceHandle;

    fn list_connected_devices(&mut self) -> Result<Vec<Device>, BoxError>;
    fn open(&mut self, device: &Device) -> Result<Self::Handle, BoxError>;
}
