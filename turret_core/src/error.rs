use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TurretError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("camera error: {0}")]
    Camera(String),
    #[error("timeout waiting for camera frame")]
    FrameTimeout,
    #[error("capture write failed: {0}")]
    Capture(String),
    #[error("alert dispatch failed: {0}")]
    Dispatch(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing camera")]
    MissingCamera,
    #[error("missing servo bank")]
    MissingServos,
    #[error("missing sensor inputs")]
    MissingInputs,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
