//! Helpers for feeding recorded and synthetic sensor streams into the pipeline.

use std::io::{Cursor, Read};

use flexgauge::FlexConfig;
use flexgauge::RawSample;
use flexgauge::transport::ReaderSource;

/// Render readings the way the firmware prints them
pub fn serial_text(values: &[RawSample]) -> String {
    values.iter().map(|v| format!("{}\r\n", v)).collect()
}

/// Replay serial text as a sample source
pub fn replay(text: &str) -> ReaderSource<Cursor<Vec<u8>>> {
    ReaderSource::new(Cursor::new(text.as_bytes().to_vec()), "replay")
}

/// Replay serial text delivered in fixed-size chunks
pub fn replay_chunked(text: &str, chunk_size: usize) -> ReaderSource<ChunkedReader> {
    ReaderSource::new(ChunkedReader::new(text.as_bytes(), chunk_size), "chunked")
}

/// Config with a fast render loop so session tests finish quickly
pub fn fast_config() -> FlexConfig {
    let mut config = FlexConfig::default();
    config.animation.frame_rate_hz = 1000.0;
    config.animation.coast_frames = 1000;
    config.output.output_rate_hz = 1000.0;
    config
}

/// Reader that never returns more than `chunk_size` bytes per read
pub struct ChunkedReader {
    data: Vec<u8>,
    pos: usize,
    chunk_size: usize,
}

impl ChunkedReader {
    pub fn new(data: &[u8], chunk_size: usize) -> Self {
        Self {
            data: data.to_vec(),
            pos: 0,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = self.data.len() - self.pos;
        let n = remaining.min(self.chunk_size).min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
