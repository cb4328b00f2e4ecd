use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use serial2::SerialPort;

use super::{LineDecoder, SampleSource};
use crate::RawSample;
use crate::config::SerialConfig;
use crate::error::{FlexError, Result};

/// List serial ports that look like they could carry the sensor
pub fn list_ports() -> Result<Vec<PathBuf>> {
    SerialPort::available_ports().map_err(|e| FlexError::SerialPort(e.to_string()))
}

/// Flex sensor on a serial port
///
/// The port is closed when the source is dropped. When the device goes
/// away the unterminated last line is parsed too.
pub struct SerialSource {
    port: SerialPort,
    path: PathBuf,
    decoder: LineDecoder,
    buffer: [u8; 256],
    finished: bool,
}

impl SerialSource {
    pub fn open<P: AsRef<Path>>(path: P, config: &SerialConfig) -> Result<Self> {
        let path = path.as_ref();
        let mut port = SerialPort::open(path, config.baud_rate)
            .map_err(|e| FlexError::SerialPort(format!("{}: {}", path.display(), e)))?;
        port.set_read_timeout(config.read_timeout())
            .map_err(|e| FlexError::SerialPort(format!("{}: {}", path.display(), e)))?;

        log::info!("Opened {} at {} baud", path.display(), config.baud_rate);

        Ok(Self {
            port,
            path: path.to_path_buf(),
            decoder: LineDecoder::new(),
            buffer: [0; 256],
            finished: false,
        })
    }
}

impl SampleSource for SerialSource {
    fn next_samples(&mut self) -> anyhow::Result<Option<Vec<RawSample>>> {
        if self.finished {
            return Ok(None);
        }
        let read = self.port.read(&mut self.buffer).map(|n| &self.buffer[..n]);
        decode_read(&mut self.decoder, &mut self.finished, &self.path, read)
    }

    fn name(&self) -> String {
        self.path.display().to_string()
    }
}

/// Turn the outcome of one port read into a batch
///
/// A zero-length read means the port closed: the partial line is flushed and
/// `finished` is set.
fn decode_read(
    decoder: &mut LineDecoder,
    finished: &mut bool,
    path: &Path,
    read: io::Result<&[u8]>,
) -> anyhow::Result<Option<Vec<RawSample>>> {
    match read {
        Ok([]) => {
            log::info!("{} closed", path.display());
            *finished = true;
            Ok(Some(decoder.finish().into_iter().collect()))
        }
        Ok(bytes) => Ok(Some(decoder.feed(bytes))),
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
            ) =>
        {
            Ok(Some(Vec::new()))
        }
        Err(e) => Err(FlexError::Transport(format!("{}: {}", path.display(), e)).into()),
    }
}

impl Drop for SerialSource {
    fn drop(&mut self) {
        log::debug!("Releasing {}", self.path.display());
    }
}
