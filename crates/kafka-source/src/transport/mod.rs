//! Log transports.
//!
//! A transport owns the connection to the log and hands the consumer three
//! streams: records (bounded), transport errors and group notifications
//! (both unbounded and optional). The consumer acknowledges every record it
//! processed and closes the transport when it is done.

pub mod kafka;
pub mod memory;

pub use kafka::KafkaTransport;
pub use memory::InMemoryTransport;

use crate::error::{Error, Result};
use kafka_types::{Notification, RawRecord};
use tokio::sync::mpsc;

/// Receiving ends of a transport's streams.
///
/// `errors` and `notifications` are `None` when the transport does not
/// produce that stream.
#[derive(Debug)]
pub struct TransportChannels {
    pub records: mpsc::Receiver<RawRecord>,
    pub errors: Option<mpsc::UnboundedReceiver<Error>>,
    pub notifications: Option<mpsc::UnboundedReceiver<Notification>>,
}

/// Control surface of a transport.
///
/// Closing must end all three streams so that whoever drains them can stop.
pub trait Transport: Send + Sync {
    /// Mark a record as processed. Called exactly once per delivered record,
    /// in delivery order.
    fn acknowledge(&self, record: &RawRecord) -> Result<()>;

    /// Release the connection. Calling it more than once is a no-op.
    ///
    /// May block while pending acknowledgments are flushed.
    fn close(&self) -> Result<()>;

    /// Whether [`Transport::close`] has been called. Records still buffered
    /// after that point are not processed.
    fn is_closed(&self) -> bool;
}
