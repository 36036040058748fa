use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum TracerError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for adc")]
    Timeout,
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("curve buffer: {0}")]
    Curve(#[from] CurveError),
    #[error("link error: {0}")]
    Link(#[from] LinkError),
    #[error("cancelled")]
    Cancelled,
}

/// Rejections of a `Config <NAME> <VALUE>` message or a programmatic update.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("not a config message")]
    NotConfig,
    #[error("too many fields in config message")]
    TooManyFields,
    #[error("unrecognized config parameter '{0}'")]
    UnknownParam(String),
    #[error("invalid value '{value}' for {param}")]
    BadValue { param: &'static str, value: String },
    #[error("{param} = {value} out of range (expected {expected})")]
    OutOfRange {
        param: &'static str,
        value: u32,
        expected: &'static str,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CurveError {
    #[error("buffer full ({capacity} points)")]
    Full { capacity: usize },
    #[error("last point is not awaiting revision")]
    NotRevisable,
    #[error("requested capacity {requested} exceeds {max}")]
    CapacityTooLarge { requested: usize, max: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("message too long (max {max} bytes)")]
    TooLong { max: usize },
    #[error("link port: {0}")]
    Port(String),
    #[error("link disconnected")]
    Disconnected,
    #[error("timed out waiting for link")]
    Timeout,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid link timing: {0}")]
    InvalidLinkTiming(&'static str),
    #[error("hardware init: {0}")]
    Hardware(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
