use thiserror::Error;

/// A failed transducer exchange. Never propagated past sensor acquisition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    #[error("transducer returned not-a-number")]
    NotANumber,
    #[error("transducer did not answer in time")]
    Timeout,
    #[error("transducer bus error: {0}")]
    Bus(String),
}

/// Why an inbound line was dropped. Nothing is sent back on the wire.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("empty line")]
    Empty,
    #[error("missing ':' separator")]
    MissingSeparator,
    #[error("unknown key `{0}`")]
    UnknownKey(String),
    #[error("invalid value `{value}` for `{key}`")]
    InvalidValue { key: &'static str, value: String },
    #[error("invalid json record: {0}")]
    InvalidJson(String),
    #[error("unknown mode `{0}`")]
    UnknownMode(String),
    #[error("unknown manual source `{0}`")]
    UnknownSource(String),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
