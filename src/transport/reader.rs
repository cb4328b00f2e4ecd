use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use super::{LineDecoder, SampleSource};
use crate::RawSample;

const CHUNK_SIZE: usize = 256;

/// Sample source over any byte reader carrying the serial text format
///
/// Used to replay captured serial logs and to feed pipes. At end of input
/// the unterminated last line is parsed too.
pub struct ReaderSource<R> {
    reader: R,
    decoder: LineDecoder,
    buffer: [u8; CHUNK_SIZE],
    finished: bool,
    name: String,
}

impl<R: Read + Send> ReaderSource<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            decoder: LineDecoder::new(),
            buffer: [0; CHUNK_SIZE],
            finished: false,
            name: name.into(),
        }
    }
}

impl ReaderSource<BufReader<File>> {
    /// Replay a recorded serial log
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), path.display().to_string()))
    }
}

impl<R: Read + Send> SampleSource for ReaderSource<R> {
    fn next_samples(&mut self) -> anyhow::Result<Option<Vec<RawSample>>> {
        if self.finished {
            return Ok(None);
        }

        match self.reader.read(&mut self.buffer) {
            Ok(0) => {
                self.finished = true;
                Ok(Some(self.decoder.finish().into_iter().collect()))
            }
            Ok(n) => Ok(Some(self.decoder.feed(&self.buffer[..n]))),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(Some(Vec::new())),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn drain<S: SampleSource>(source: &mut S) -> Vec<RawSample> {
        let mut all = Vec::new();
        while let Some(batch) = source.next_samples().unwrap() {
            all.extend(batch);
        }
        all
    }

    #[test]
    fn test_reads_all_lines() {
        let mut source = ReaderSource::new(Cursor::new("10\r\n20\r\noops\r\n30"), "cursor");
        assert_eq!(drain(&mut source), vec![10, 20, 30]);
        assert_eq!(source.next_samples().unwrap(), None);
    }

    #[test]
    fn test_long_input_spans_chunks() {
        let text: String = (0..200).map(|i| format!("{}\r\n", i * 11)).collect();
        assert!(text.len() > CHUNK_SIZE);
        let mut source = ReaderSource::new(Cursor::new(text), "cursor");
        let expected: Vec<RawSample> = (0..200).map(|i| i * 11).collect();
        assert_eq!(drain(&mut source), expected);
    }
}
