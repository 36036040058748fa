use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("spi error: {0}")]
    Spi(String),
    #[error("serial error: {0}")]
    Serial(String),
    #[error("adc timeout")]
    Timeout,
    #[error("invalid clock divider {0} (expected a power of two in 2..=128)")]
    InvalidDivider(u8),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
