mod csv;
mod json;
mod text;

use std::io::Write;

use chrono::Utc;
use serde::Serialize;

use crate::RawSample;
use crate::processing::Reading;
use crate::session::ConnectionStatus;
use crate::signal_processing::Tier;

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// Everything a presenter shows for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GaugeOutput {
    /// Smoothed sensor reading
    pub raw: RawSample,
    pub offset: RawSample,
    /// Calibrated angle in degrees
    pub angle: f64,
    /// Animated angle the gauge is currently drawn at
    pub displayed_angle: f64,
    /// Tier of the displayed angle
    pub tier: Tier,
}

impl GaugeOutput {
    pub fn new(reading: &Reading, displayed_angle: f64, tier: Tier) -> Self {
        Self {
            raw: reading.smoothed,
            offset: reading.offset,
            angle: reading.angle,
            displayed_angle,
            tier,
        }
    }
}

pub trait Formatter: Send {
    fn format(&self, output: &GaugeOutput) -> String;

    fn header(&self) -> Option<&'static str> {
        None
    }
}

pub fn create_formatter(format: OutputFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

/// Consumer of gauge frames and connection status changes
pub trait Presenter {
    fn present(&mut self, output: &GaugeOutput) -> anyhow::Result<()>;

    fn status(&mut self, _status: &ConnectionStatus) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Writes formatted frames as lines, status changes go to stderr
pub struct WriterPresenter<W: Write> {
    writer: W,
    formatter: Box<dyn Formatter>,
    header_written: bool,
}

impl<W: Write> WriterPresenter<W> {
    pub fn new(writer: W, formatter: Box<dyn Formatter>) -> Self {
        Self {
            writer,
            formatter,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Presenter for WriterPresenter<W> {
    fn present(&mut self, output: &GaugeOutput) -> anyhow::Result<()> {
        if !self.header_written {
            if let Some(header) = self.formatter.header() {
                writeln!(self.writer, "{}", header)?;
            }
            self.header_written = true;
        }
        writeln!(self.writer, "{}", self.formatter.format(output))?;
        self.writer.flush()?;
        Ok(())
    }

    fn status(&mut self, status: &ConnectionStatus) -> anyhow::Result<()> {
        eprintln!("[{}]", status);
        Ok(())
    }
}

/// Keeps every frame and status in memory
#[derive(Debug, Default)]
pub struct CollectingPresenter {
    pub outputs: Vec<GaugeOutput>,
    pub statuses: Vec<ConnectionStatus>,
}

impl Presenter for CollectingPresenter {
    fn present(&mut self, output: &GaugeOutput) -> anyhow::Result<()> {
        self.outputs.push(*output);
        Ok(())
    }

    fn status(&mut self, status: &ConnectionStatus) -> anyhow::Result<()> {
        self.statuses.push(status.clone());
        Ok(())
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(super) fn sample_output() -> GaugeOutput {
        GaugeOutput {
            raw: 412,
            offset: 100,
            angle: 93.6,
            displayed_angle: 80.24,
            tier: Tier::Warning,
        }
    }

    #[test]
    fn test_writer_presenter_writes_header_once() {
        let mut presenter = WriterPresenter::new(Vec::new(), Box::new(CsvFormatter));
        presenter.present(&sample_output()).unwrap();
        presenter.present(&sample_output()).unwrap();
        let text = String::from_utf8(presenter.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ts,"));
    }

    #[test]
    fn test_collecting_presenter() {
        let mut presenter = CollectingPresenter::default();
        presenter.status(&ConnectionStatus::Connected).unwrap();
        presenter.present(&sample_output()).unwrap();
        assert_eq!(presenter.outputs.len(), 1);
        assert_eq!(presenter.statuses, vec![ConnectionStatus::Connected]);
    }
}
