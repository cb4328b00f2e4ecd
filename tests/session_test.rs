mod test_streams;

use std::thread;
use std::time::Duration;

use approx::assert_abs_diff_eq;
use crossbeam_channel::unbounded;

use flexgauge::RawSample;
use flexgauge::output::{
    CollectingPresenter, CsvFormatter, GaugeOutput, Presenter, WriterPresenter,
};
use flexgauge::session::{Command, ConnectionStatus, ReaderHandle, run_session};
use flexgauge::signal_processing::Tier;
use flexgauge::transport::{NotificationSource, SampleSource};

#[test]
fn test_replay_runs_to_completion() {
    let config = test_streams::fast_config();
    let mut values = vec![100; 5];
    values.extend([400; 5]);
    let source = test_streams::replay(&test_streams::serial_text(&values));

    let (_cmd_tx, cmd_rx) = unbounded();
    let mut presenter = CollectingPresenter::default();
    let summary = run_session(source, &config, cmd_rx, &mut presenter).unwrap();

    assert_eq!(summary.source, "replay");
    assert_eq!(summary.samples, 10);
    assert_eq!(summary.readings, 10);
    assert_eq!(summary.calibrations, 0);
    assert_eq!(summary.final_raw, Some(400));
    assert_abs_diff_eq!(summary.final_angle.unwrap(), 120.0, epsilon = 1e-9);
    assert!(summary.error.is_none());
    assert_eq!(summary.status, "Disconnected");

    // The gauge coasts to the final angle after the replay ends.
    assert_abs_diff_eq!(summary.displayed_angle, 120.0, epsilon = 0.05);
    let last = presenter.outputs.last().unwrap();
    assert_eq!(last.raw, 400);
    assert_eq!(last.tier, Tier::Danger);
    assert_abs_diff_eq!(last.displayed_angle, 120.0, epsilon = 0.05);

    assert_eq!(
        presenter.statuses,
        vec![ConnectionStatus::Connected, ConnectionStatus::Disconnected]
    );
}

#[test]
fn test_closed_command_channel_keeps_reading() {
    let config = test_streams::fast_config();
    let source = test_streams::replay(&test_streams::serial_text(&[200; 20]));

    let (cmd_tx, cmd_rx) = unbounded::<Command>();
    drop(cmd_tx);
    let mut presenter = CollectingPresenter::default();
    let summary = run_session(source, &config, cmd_rx, &mut presenter).unwrap();
    assert_eq!(summary.samples, 20);
}

#[test]
fn test_disconnect_releases_transport() {
    let config = test_streams::fast_config();
    let (payload_tx, payload_rx) = unbounded::<Vec<u8>>();
    let source = NotificationSource::new(payload_rx, Duration::from_millis(5));

    let (cmd_tx, cmd_rx) = unbounded();
    cmd_tx.send(Command::Disconnect).unwrap();
    let mut presenter = CollectingPresenter::default();
    let summary = run_session(source, &config, cmd_rx, &mut presenter).unwrap();

    assert!(summary.error.is_none());
    assert_eq!(
        presenter.statuses.last(),
        Some(&ConnectionStatus::Disconnected)
    );
    // The source, and with it the receiving end, is gone.
    assert!(payload_tx.send(vec![0x01, 0x00]).is_err());
}

#[test]
fn test_notifications_through_session() {
    let config = test_streams::fast_config();
    let (payload_tx, payload_rx) = unbounded::<Vec<u8>>();
    payload_tx.send(vec![0x01, 0x90]).unwrap();
    payload_tx.send(vec![0x05]).unwrap();
    payload_tx.send(vec![0x01, 0xF4, 0xFF]).unwrap();
    drop(payload_tx);
    let source = NotificationSource::new(payload_rx, Duration::from_millis(5)).with_name("ble");

    let (_cmd_tx, cmd_rx) = unbounded();
    let mut presenter = CollectingPresenter::default();
    let summary = run_session(source, &config, cmd_rx, &mut presenter).unwrap();

    assert_eq!(summary.source, "ble");
    assert_eq!(summary.samples, 2);
    assert_eq!(summary.final_raw, Some(450));
}

struct UnpluggedSource {
    batches: Vec<Vec<RawSample>>,
}

impl SampleSource for UnpluggedSource {
    fn next_samples(&mut self) -> anyhow::Result<Option<Vec<RawSample>>> {
        match self.batches.pop() {
            Some(batch) => Ok(Some(batch)),
            None => Err(anyhow::anyhow!("device unplugged")),
        }
    }

    fn name(&self) -> String {
        "unplugged".to_string()
    }
}

#[test]
fn test_transport_error_ends_session() {
    let config = test_streams::fast_config();
    let source = UnpluggedSource {
        batches: vec![vec![300, 300], vec![300]],
    };

    let (_cmd_tx, cmd_rx) = unbounded();
    let mut presenter = CollectingPresenter::default();
    let summary = run_session(source, &config, cmd_rx, &mut presenter).unwrap();

    assert_eq!(summary.samples, 3);
    assert!(summary.error.unwrap().contains("device unplugged"));
    assert_eq!(
        presenter.statuses.last(),
        Some(&ConnectionStatus::Disconnected)
    );
}

#[test]
fn test_calibrate_before_data_is_ignored() {
    let config = test_streams::fast_config();
    let (payload_tx, payload_rx) = unbounded::<Vec<u8>>();
    let source = NotificationSource::new(payload_rx, Duration::from_millis(5));

    let (cmd_tx, cmd_rx) = unbounded();
    cmd_tx.send(Command::Calibrate).unwrap();
    cmd_tx.send(Command::Disconnect).unwrap();
    let mut presenter = CollectingPresenter::default();
    let summary = run_session(source, &config, cmd_rx, &mut presenter).unwrap();

    assert_eq!(summary.calibrations, 0);
    assert_eq!(summary.final_offset, 0);
    assert!(presenter.outputs.is_empty());
    drop(payload_tx);
}

#[test]
fn test_csv_session_output() {
    let config = test_streams::fast_config();
    let source = test_streams::replay(&test_streams::serial_text(&[300; 5]));

    let (_cmd_tx, cmd_rx) = unbounded();
    let mut presenter = WriterPresenter::new(Vec::new(), Box::new(CsvFormatter));
    run_session(source, &config, cmd_rx, &mut presenter).unwrap();

    let text = String::from_utf8(presenter.into_inner()).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("ts,raw,offset,angle,displayed_angle,tier"));
    let last = text.lines().last().unwrap();
    assert!(last.contains(",300,0,90.0,"), "{}", last);
}

/// Never runs dry, so the event channel fills up unless someone reads it
struct EndlessSource;

impl SampleSource for EndlessSource {
    fn next_samples(&mut self) -> anyhow::Result<Option<Vec<RawSample>>> {
        Ok(Some(vec![300]))
    }

    fn name(&self) -> String {
        "endless".to_string()
    }
}

/// Stdout closed under us, as with `flexgauge --input big.log | head`
struct BrokenPipePresenter;

impl Presenter for BrokenPipePresenter {
    fn present(&mut self, _output: &GaugeOutput) -> anyhow::Result<()> {
        thread::sleep(Duration::from_millis(100));
        Err(anyhow::anyhow!("broken pipe"))
    }
}

#[test]
fn test_presenter_error_ends_session() {
    let (done_tx, done_rx) = unbounded();
    let (cmd_tx, cmd_rx) = unbounded::<Command>();
    thread::spawn(move || {
        let config = test_streams::fast_config();
        let mut presenter = BrokenPipePresenter;
        let result = run_session(EndlessSource, &config, cmd_rx, &mut presenter);
        let _ = done_tx.send(result.map(|_| ()).map_err(|e| e.to_string()));
    });

    let result = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("session did not return after the presenter failed");
    assert!(result.unwrap_err().contains("broken pipe"));
    drop(cmd_tx);
}

#[test]
fn test_dropping_reader_with_full_channel() {
    let reader = ReaderHandle::spawn(EndlessSource);
    // Let the reader fill the channel and block on it.
    thread::sleep(Duration::from_millis(50));
    assert!(reader.events().is_full());

    let (done_tx, done_rx) = unbounded();
    thread::spawn(move || {
        drop(reader);
        let _ = done_tx.send(());
    });
    assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
}
