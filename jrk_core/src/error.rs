use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JrkError {
    #[error("device disconnected")]
    Disconnected,
    #[error("timeout talking to device")]
    Timeout,
    #[error("access denied")]
    AccessDenied,
    #[error("device error: {0}")]
    Device(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

/// Map a trait-boundary error to a typed `JrkError`.
///
/// Downcasts `jrk_hardware::HwError` when the `hardware-errors` feature is on,
/// otherwise falls back to matching on the message.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> JrkError {
    #[cfg(feature = "hardware-errors")]
    {
        use jrk_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => JrkError::Timeout,
                HwError::Disconnected => JrkError::Disconnected,
                HwError::AccessDenied => JrkError::AccessDenied,
                HwError::Io(io) => JrkError::Io(io.to_string()),
                HwError::Usb(msg) => JrkError::Device(msg.clone()),
            };
        }
    }
    if let Some(core) = e.downcast_ref::<JrkError>() {
        return core.clone();
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        JrkError::Timeout
    } else if lower.contains("disconnected") || lower.contains("no such device") {
        JrkError::Disconnected
    } else if lower.contains("access denied") || lower.contains("permission") {
        JrkError::AccessDenied
    } else {
        JrkError::Device(s)
    }
}

/// Shorthand for mapping a boxed collaborator error.
pub(crate) fn map_boxed(e: &jrk_traits::BoxError) -> JrkError {
    map_hw_error(&**e)
}
