//! Sample sources.
//!
//! Every transport reduces to a [`SampleSource`] that hands out batches of
//! raw integer samples. Text transports go through [`LineDecoder`]; binary
//! notification transports through [`decode_notification`].

pub mod line;
pub mod notification;
pub mod reader;
pub mod serial;

pub use line::{LineDecoder, parse_sample};
pub use notification::{NotificationSource, decode_notification};
pub use reader::ReaderSource;
pub use serial::{SerialSource, list_ports};

use crate::RawSample;

pub trait SampleSource: Send {
    /// Next batch of raw samples
    ///
    /// `Ok(None)` is the end of the stream. An empty batch means nothing
    /// arrived before the transport's read timeout; callers use it to check
    /// for cancellation.
    fn next_samples(&mut self) -> anyhow::Result<Option<Vec<RawSample>>>;

    /// Human readable name of the underlying transport
    fn name(&self) -> String;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn next_samples(&mut self) -> anyhow::Result<Option<Vec<RawSample>>> {
        (**self).next_samples()
    }

    fn name(&self) -> String {
        (**self).name()
    }
}
