//! Sensor session: reader thread, render tick, commands and cleanup.
//!
//! The reader thread owns the transport and only forwards decoded samples.
//! Everything else (pipeline state, animation, presenter) lives on the
//! thread that calls [`run_session`], so each piece of state has a single
//! writer.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, bounded, never, select, tick};
use serde::Serialize;

use crate::RawSample;
use crate::config::FlexConfig;
use crate::error::Result;
use crate::output::{GaugeOutput, Presenter};
use crate::processing::FlexProcessor;
use crate::signal_processing::AnimationSmoother;
use crate::transport::{SampleSource, SerialSource};

const SOURCE_CHANNEL_CAPACITY: usize = 64;

/// User visible connection state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Requesting,
    Opening,
    Connected,
    Unsupported,
    Failed(String),
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Requesting => write!(f, "Requesting Serial Port..."),
            ConnectionStatus::Opening => write!(f, "Opening Port..."),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Unsupported => {
                write!(f, "Serial ports not supported on this platform")
            }
            ConnectionStatus::Failed(msg) => write!(f, "Connection Failed: {}", msg),
        }
    }
}

/// Discrete user actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Calibrate,
    Disconnect,
}

/// Messages from the reader thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Samples(Vec<RawSample>),
    Error(String),
    Closed,
}

/// Whether the session keeps running after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Reader thread handle
///
/// The handle owns the receiving end of the event channel. Stopping or
/// dropping the handle closes that end before joining, so a reader blocked
/// on a full channel wakes up, drops (and so releases) the transport and
/// exits.
pub struct ReaderHandle {
    stop: Arc<AtomicBool>,
    events: Receiver<SourceEvent>,
    handle: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    pub fn spawn<S: SampleSource + 'static>(source: S) -> Self {
        let (tx, events) = bounded(SOURCE_CHANNEL_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || read_loop(source, tx, thread_stop));
        Self {
            stop,
            events,
            handle: Some(handle),
        }
    }

    /// Events from the reader; never ready once the reader is stopped
    pub fn events(&self) -> &Receiver<SourceEvent> {
        &self.events
    }

    /// Request stop and wait for the reader to release the transport
    ///
    /// Events still queued are discarded.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.events = never();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::error!("Reader thread panicked");
        }
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_loop<S: SampleSource>(mut source: S, tx: Sender<SourceEvent>, stop: Arc<AtomicBool>) {
    let name = source.name();
    while !stop.load(Ordering::Relaxed) {
        match source.next_samples() {
            Ok(Some(batch)) => {
                if batch.is_empty() {
                    continue;
                }
                if tx.send(SourceEvent::Samples(batch)).is_err() {
                    break;
                }
            }
            Ok(None) => {
                log::info!("{}: end of stream", name);
                break;
            }
            Err(e) => {
                log::error!("Error reading from {}: {:#}", name, e);
                let _ = tx.send(SourceEvent::Error(format!("{:#}", e)));
                break;
            }
        }
    }
    drop(source);
    log::debug!("{}: released", name);
    let _ = tx.send(SourceEvent::Closed);
}

/// Open a serial sensor, reporting progress through the presenter
///
/// A failed open is reported as [`ConnectionStatus::Failed`] and returns
/// `Ok(None)`; the caller may retry.
pub fn open_serial<P: Presenter + ?Sized>(
    path: &Path,
    config: &FlexConfig,
    presenter: &mut P,
) -> anyhow::Result<Option<SerialSource>> {
    presenter.status(&ConnectionStatus::Requesting)?;
    presenter.status(&ConnectionStatus::Opening)?;
    match SerialSource::open(path, &config.serial) {
        Ok(source) => Ok(Some(source)),
        Err(e) => {
            log::error!("Connection failed: {}", e);
            presenter.status(&ConnectionStatus::Failed(e.to_string()))?;
            Ok(None)
        }
    }
}

/// What happened during a session
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSummary {
    pub source: String,
    pub samples: usize,
    pub readings: usize,
    pub calibrations: usize,
    pub final_offset: RawSample,
    pub final_raw: Option<RawSample>,
    pub final_angle: Option<f64>,
    pub displayed_angle: f64,
    pub frames: u64,
    pub status: String,
    pub error: Option<String>,
}

/// Pipeline, animation and presenter for one connection
pub struct Session<'a, P: Presenter + ?Sized> {
    config: FlexConfig,
    processor: FlexProcessor,
    smoother: AnimationSmoother,
    presenter: &'a mut P,
    status: ConnectionStatus,
    last_output: Option<Instant>,
    summary: SessionSummary,
}

impl<'a, P: Presenter + ?Sized> Session<'a, P> {
    pub fn new(config: &FlexConfig, presenter: &'a mut P) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            processor: FlexProcessor::new(config)?,
            smoother: AnimationSmoother::new(config.animation.alpha),
            presenter,
            status: ConnectionStatus::Disconnected,
            last_output: None,
            summary: SessionSummary::default(),
        })
    }

    pub fn processor(&self) -> &FlexProcessor {
        &self.processor
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn displayed_angle(&self) -> f64 {
        self.smoother.displayed()
    }

    pub fn set_status(&mut self, status: ConnectionStatus) -> anyhow::Result<()> {
        if status != self.status {
            self.presenter.status(&status)?;
            self.status = status;
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: SourceEvent) -> Flow {
        match event {
            SourceEvent::Samples(batch) => {
                self.summary.samples += batch.len();
                self.summary.readings += self.processor.process_samples(&batch).len();
                Flow::Continue
            }
            SourceEvent::Error(msg) => {
                self.summary.error = Some(msg);
                Flow::Stop
            }
            SourceEvent::Closed => Flow::Stop,
        }
    }

    pub fn handle_command(&mut self, command: Command) -> Flow {
        match command {
            Command::Calibrate => {
                match self.processor.calibrate() {
                    Ok(_) => self.summary.calibrations += 1,
                    Err(e) => log::warn!("Calibration ignored: {}", e),
                }
                Flow::Continue
            }
            Command::Disconnect => Flow::Stop,
        }
    }

    /// Advance the animation one frame and present it if due
    pub fn render_frame(&mut self, force: bool) -> anyhow::Result<()> {
        let displayed = self.smoother.tick(self.processor.target_angle());
        self.summary.frames += 1;

        let Some(reading) = self.processor.latest().copied() else {
            return Ok(());
        };

        let due = force
            || self
                .last_output
                .is_none_or(|t| t.elapsed() >= self.config.output.output_interval());
        if due {
            let tier = self.processor.classifier().classify(displayed);
            self.presenter
                .present(&GaugeOutput::new(&reading, displayed, tier))?;
            self.last_output = Some(Instant::now());
        }
        Ok(())
    }

    fn is_settled(&self) -> bool {
        self.smoother.is_settled(
            self.processor.target_angle(),
            self.config.animation.settle_epsilon,
        )
    }

    fn into_summary(mut self) -> SessionSummary {
        let latest = self.processor.latest().copied();
        self.summary.final_offset = self.processor.offset();
        self.summary.final_raw = latest.map(|r| r.smoothed);
        self.summary.final_angle = latest.map(|r| r.angle);
        self.summary.displayed_angle = self.smoother.displayed();
        self.summary.status = self.status.to_string();
        self.summary
    }
}

/// Run a sensor session until the source ends or a disconnect is requested
///
/// Samples are processed as they arrive, the displayed angle is animated at
/// the configured frame rate, and calibrate commands take effect between
/// samples. When the session ends the transport is released first, then the
/// gauge coasts to its final angle (bounded by `animation.coast_frames`).
pub fn run_session<S, P>(
    source: S,
    config: &FlexConfig,
    commands: Receiver<Command>,
    presenter: &mut P,
) -> anyhow::Result<SessionSummary>
where
    S: SampleSource + 'static,
    P: Presenter + ?Sized,
{
    let mut session = Session::new(config, presenter)?;
    session.summary.source = source.name();

    // Any early return drops `reader`, which closes the event channel and
    // joins the reader thread.
    let mut reader = ReaderHandle::spawn(source);
    let events = reader.events();
    session.set_status(ConnectionStatus::Connected)?;
    log::info!("Reading from {}", session.summary.source);

    let ticker = tick(config.animation.frame_interval());
    let no_commands = never();
    let mut commands_open = true;

    loop {
        let command_rx = if commands_open {
            &commands
        } else {
            &no_commands
        };
        let flow = select! {
            recv(events) -> event => match event {
                Ok(event) => session.handle_event(event),
                Err(_) => Flow::Stop,
            },
            recv(command_rx) -> command => match command {
                Ok(command) => session.handle_command(command),
                Err(_) => {
                    // Nobody can send commands any more; keep reading.
                    commands_open = false;
                    Flow::Continue
                }
            },
            recv(ticker) -> _ => {
                session.render_frame(false)?;
                Flow::Continue
            },
        };
        if flow == Flow::Stop {
            break;
        }
    }

    // Samples already queued behind a disconnect are discarded.
    reader.stop();
    session.set_status(ConnectionStatus::Disconnected)?;

    for _ in 0..config.animation.coast_frames {
        if session.is_settled() {
            break;
        }
        let _ = ticker.recv();
        session.render_frame(false)?;
    }
    session.render_frame(true)?;

    let summary = session.into_summary();
    log::info!(
        "Session ended: {} samples, {} calibrations, offset {}",
        summary.samples,
        summary.calibrations,
        summary.final_offset
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::CollectingPresenter;
    use crate::signal_processing::Tier;
    use approx::assert_relative_eq;

    #[test]
    fn test_status_strings() {
        assert_eq!(ConnectionStatus::Connected.to_string(), "Connected");
        assert_eq!(
            ConnectionStatus::Requesting.to_string(),
            "Requesting Serial Port..."
        );
        assert_eq!(
            ConnectionStatus::Failed("permission denied".into()).to_string(),
            "Connection Failed: permission denied"
        );
        assert!(!ConnectionStatus::Disconnected.is_connected());
    }

    #[test]
    fn test_calibrate_command_between_batches() {
        let config = FlexConfig::default();
        let mut presenter = CollectingPresenter::default();
        let mut session = Session::new(&config, &mut presenter).unwrap();

        assert_eq!(session.handle_command(Command::Calibrate), Flow::Continue);
        assert_eq!(session.processor().offset(), 0);

        session.handle_event(SourceEvent::Samples(vec![100; 5]));
        session.handle_command(Command::Calibrate);
        session.handle_event(SourceEvent::Samples(vec![400; 5]));

        let latest = *session.processor().latest().unwrap();
        assert_eq!(latest.offset, 100);
        assert_relative_eq!(latest.angle, 90.0, epsilon = 1e-9);
        assert_eq!(latest.tier, Tier::Danger);

        let summary = session.into_summary();
        assert_eq!(summary.samples, 10);
        assert_eq!(summary.readings, 10);
        assert_eq!(summary.status, "Disconnected");
        assert_eq!(summary.calibrations, 1);
        assert_eq!(summary.final_offset, 100);
    }

    #[test]
    fn test_stop_conditions() {
        let config = FlexConfig::default();
        let mut presenter = CollectingPresenter::default();
        let mut session = Session::new(&config, &mut presenter).unwrap();
        assert_eq!(session.handle_command(Command::Disconnect), Flow::Stop);
        assert_eq!(session.handle_event(SourceEvent::Closed), Flow::Stop);
        assert_eq!(
            session.handle_event(SourceEvent::Error("unplugged".into())),
            Flow::Stop
        );
        assert_eq!(session.into_summary().error.as_deref(), Some("unplugged"));
    }

    #[test]
    fn test_render_waits_for_first_reading() {
        let config = FlexConfig::default();
        let mut presenter = CollectingPresenter::default();
        {
            let mut session = Session::new(&config, &mut presenter).unwrap();
            session.render_frame(true).unwrap();
            session.handle_event(SourceEvent::Samples(vec![300]));
            session.render_frame(true).unwrap();
            assert_relative_eq!(session.displayed_angle(), 9.0, epsilon = 1e-9);
        }
        assert_eq!(presenter.outputs.len(), 1);
        let output = presenter.outputs[0];
        assert_eq!(output.raw, 300);
        assert_relative_eq!(output.angle, 90.0, epsilon = 1e-9);
        assert_eq!(output.tier, Tier::Safe);
    }

    #[test]
    fn test_render_is_throttled() {
        let config = FlexConfig::default();
        let mut presenter = CollectingPresenter::default();
        {
            let mut session = Session::new(&config, &mut presenter).unwrap();
            session.handle_event(SourceEvent::Samples(vec![10]));
            for _ in 0..5 {
                session.render_frame(false).unwrap();
            }
        }
        assert_eq!(presenter.outputs.len(), 1);
    }

    #[test]
    fn test_status_changes_reported_once() {
        let config = FlexConfig::default();
        let mut presenter = CollectingPresenter::default();
        {
            let mut session = Session::new(&config, &mut presenter).unwrap();
            session.set_status(ConnectionStatus::Connected).unwrap();
            session.set_status(ConnectionStatus::Connected).unwrap();
            session.set_status(ConnectionStatus::Disconnected).unwrap();
        }
        assert_eq!(
            presenter.statuses,
            vec![ConnectionStatus::Connected, ConnectionStatus::Disconnected]
        );
    }
}
