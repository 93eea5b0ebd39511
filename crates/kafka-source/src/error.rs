use kafka_types::WireFormatError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Wire format error: {0}")]
    Wire(#[from] WireFormatError),

    #[error("Avro decode error: {0}")]
    AvroDecode(String),

    #[error("Textual encode error: {0}")]
    TextualEncode(String),

    #[error("Schema registry error: {0}")]
    Registry(String),

    #[error("Schema {0} not found in registry")]
    SchemaNotFound(u32),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Consumer error: {0}")]
    Consumer(String),
}

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport or registry unreachable at construction
    Connection,
    /// A single record could not be decoded
    Decode,
    /// Reported asynchronously by the transport
    Transport,
    /// The registry could not supply a decoder
    Resolution,
    /// Lifecycle misuse, e.g. consuming twice
    Consumer,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection(_) | Error::InvalidConfig(_) => ErrorKind::Connection,
            Error::Wire(_) | Error::AvroDecode(_) | Error::TextualEncode(_) => ErrorKind::Decode,
            Error::Kafka(_) | Error::Transport(_) => ErrorKind::Transport,
            Error::Registry(_) | Error::SchemaNotFound(_) | Error::InvalidSchema(_) => {
                ErrorKind::Resolution
            }
            Error::Consumer(_) => ErrorKind::Consumer,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
