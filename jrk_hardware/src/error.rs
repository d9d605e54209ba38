use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("usb error: {0}")]
    Usb(String),
    #[error("device timeout")]
    Timeout,
    #[error("device disconnected")]
    Disconnected,
    #[error("access denied")]
    AccessDenied,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
