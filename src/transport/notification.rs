use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use super::SampleSource;
use crate::RawSample;
use crate::error::{FlexError, Result};

/// Decode a Bluetooth notification payload
///
/// The sensor characteristic carries the reading as an unsigned 16-bit
/// big-endian integer in the first two bytes. Trailing bytes are ignored.
pub fn decode_notification(payload: &[u8]) -> Result<RawSample> {
    match payload {
        [high, low, ..] => Ok(RawSample::from(u16::from_be_bytes([*high, *low]))),
        _ => Err(FlexError::ShortNotification { len: payload.len() }),
    }
}

/// Sample source fed with raw notification payloads
///
/// The host's BLE stack subscribes to the sensor characteristic and pushes
/// every notification value into the channel. Dropping the sender ends the
/// stream.
pub struct NotificationSource {
    rx: Receiver<Vec<u8>>,
    poll_timeout: Duration,
    name: String,
}

impl NotificationSource {
    pub fn new(rx: Receiver<Vec<u8>>, poll_timeout: Duration) -> Self {
        Self {
            rx,
            poll_timeout,
            name: "ble-notifications".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn decode_into(payload: &[u8], samples: &mut Vec<RawSample>) {
        match decode_notification(payload) {
            Ok(sample) => samples.push(sample),
            Err(e) => log::warn!("Skipping notification: {}", e),
        }
    }
}

impl SampleSource for NotificationSource {
    fn next_samples(&mut self) -> anyhow::Result<Option<Vec<RawSample>>> {
        let first = match self.rx.recv_timeout(self.poll_timeout) {
            Ok(payload) => payload,
            Err(RecvTimeoutError::Timeout) => return Ok(Some(Vec::new())),
            Err(RecvTimeoutError::Disconnected) => return Ok(None),
        };

        let mut samples = Vec::new();
        Self::decode_into(&first, &mut samples);
        for payload in self.rx.try_iter() {
            Self::decode_into(&payload, &mut samples);
        }
        Ok(Some(samples))
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_big_endian() {
        assert_eq!(decode_notification(&[0x01, 0xf4]).unwrap(), 500);
        assert_eq!(decode_notification(&[0x00, 0x00]).unwrap(), 0);
        assert_eq!(decode_notification(&[0xff, 0xff]).unwrap(), 65535);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        assert_eq!(decode_notification(&[0x02, 0x00, 0xaa, 0xbb]).unwrap(), 512);
    }

    #[test]
    fn test_decode_short_payload() {
        assert!(matches!(
            decode_notification(&[0x01]),
            Err(FlexError::ShortNotification { len: 1 })
        ));
        assert!(matches!(
            decode_notification(&[]),
            Err(FlexError::ShortNotification { len: 0 })
        ));
    }

    #[test]
    fn test_source_batches_and_skips_short_payloads() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut source = NotificationSource::new(rx, Duration::from_millis(10));

        tx.send(vec![0x00, 0x64]).unwrap();
        tx.send(vec![0x07]).unwrap();
        tx.send(vec![0x01, 0x90]).unwrap();

        assert_eq!(source.next_samples().unwrap(), Some(vec![100, 400]));
        assert_eq!(source.next_samples().unwrap(), Some(vec![]));

        drop(tx);
        assert_eq!(source.next_samples().unwrap(), None);
    }
}
