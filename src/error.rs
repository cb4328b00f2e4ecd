use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlexError {
    #[error("Serial port error: {0}")]
    SerialPort(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Notification payload too short: need 2 bytes, have {len}")]
    ShortNotification { len: usize },

    #[error("No sensor reading available yet")]
    NoReading,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FlexError>;
