use nom::{
    IResult,
    character::complete::{digit1, one_of},
    combinator::{opt, recognize},
    sequence::pair,
};

use crate::RawSample;
use crate::constants::{LINE_DELIMITER, MAX_LINE_LENGTH};

/// Splits a serial byte stream into `\r\n` terminated lines and parses each
/// line as a sample
///
/// Chunks may end anywhere, including inside a number or between `\r` and
/// `\n`; the unterminated tail is kept until the next chunk completes it.
/// A tail longer than [`MAX_LINE_LENGTH`] is discarded along with the rest
/// of its line.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
    /// Bytes of `pending` already searched for a delimiter
    scanned: usize,
    /// Inside an overlong line, skip up to the next delimiter
    discarding: bool,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return the samples of every completed line
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<RawSample> {
        self.pending.extend_from_slice(chunk);

        let mut samples = Vec::new();
        let mut start = 0;
        let mut search = self.scanned;
        while let Some(pos) = find_delimiter(&self.pending[search..]) {
            let end = search + pos;
            if self.discarding {
                self.discarding = false;
            } else if let Some(sample) = decode_line(&self.pending[start..end]) {
                samples.push(sample);
            }
            start = end + LINE_DELIMITER.len();
            search = start;
        }
        self.pending.drain(..start);

        if self.pending.len() > MAX_LINE_LENGTH {
            if !self.discarding {
                log::warn!(
                    "Discarding line longer than {} bytes without a delimiter",
                    MAX_LINE_LENGTH
                );
                self.discarding = true;
            }
            // A trailing '\r' may still pair with the next chunk.
            let keep = usize::from(self.pending.last() == Some(&LINE_DELIMITER[0]));
            self.pending.drain(..self.pending.len() - keep);
        }
        // The last byte could be the start of a split delimiter.
        self.scanned = self.pending.len().saturating_sub(LINE_DELIMITER.len() - 1);

        samples
    }

    /// Parse whatever is left at the end of the stream
    pub fn finish(&mut self) -> Option<RawSample> {
        let rest = std::mem::take(&mut self.pending);
        self.scanned = 0;
        if std::mem::take(&mut self.discarding) || rest.is_empty() {
            None
        } else {
            decode_line(&rest)
        }
    }

    /// Bytes of the current unterminated line
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

fn find_delimiter(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(LINE_DELIMITER.len())
        .position(|w| w == LINE_DELIMITER)
}

fn decode_line(line: &[u8]) -> Option<RawSample> {
    match std::str::from_utf8(line) {
        Ok(text) => {
            let sample = parse_sample(text);
            if sample.is_none() {
                log::debug!("Dropping non-numeric line {:?}", text);
            }
            sample
        }
        // Usually garbage left in the device buffer at connect time
        Err(e) => {
            log::warn!("Failed to decode utf-8: {:?}", e);
            None
        }
    }
}

fn leading_integer(s: &str) -> IResult<&str, &str> {
    recognize(pair(opt(one_of("+-")), digit1))(s)
}

/// Parse the leading decimal integer of a line
///
/// Surrounding whitespace is ignored and so is anything after the digits
/// (`"12abc"` reads as 12). Returns `None` when the line does not start with
/// an integer or the value does not fit a sample.
pub fn parse_sample(line: &str) -> Option<RawSample> {
    let (_rest, digits) = leading_integer(line.trim()).ok()?;
    digits.parse().ok()
}
