use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::{Receiver, unbounded};

use flexgauge::FlexConfig;
use flexgauge::output::{OutputFormat, Presenter, WriterPresenter, create_formatter};
use flexgauge::session::{Command, ConnectionStatus, SessionSummary, open_serial, run_session};
use flexgauge::transport::{ReaderSource, list_ports};

#[derive(Parser, Debug)]
#[command(name = "flexgauge")]
#[command(about = "Read a flex sensor and show the joint angle", long_about = None)]
struct Args {
    /// Serial port the sensor is attached to (default: first port found)
    #[arg(short = 'p', long)]
    port: Option<PathBuf>,

    /// Baud rate of the serial link
    #[arg(short = 'b', long)]
    baud: Option<u32>,

    /// Replay a recorded serial log instead of reading a port
    #[arg(short = 'i', long, conflicts_with = "port")]
    input: Option<PathBuf>,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Output format: text, json, csv
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Rolling average window size in samples
    #[arg(long)]
    window: Option<usize>,

    /// Degrees per unit of deviation
    #[arg(long)]
    sensitivity: Option<f64>,

    /// Maximum reported angle in degrees
    #[arg(long)]
    max_angle: Option<f64>,

    /// Animation damping factor in (0, 1]
    #[arg(long)]
    alpha: Option<f64>,

    /// Use a simulated sensor (requires the simulation feature)
    #[arg(long, conflicts_with_all = ["port", "input"])]
    simulate: bool,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if args.list_ports {
        for port in list_ports()? {
            println!("{}", port.display());
        }
        return Ok(());
    }

    let config = build_config(&args)?;

    eprintln!("=== Flex Gauge ===");
    eprintln!(
        "Window: {} samples, sensitivity: {} deg/unit, max angle: {}°",
        config.filter.window_size, config.angle.sensitivity, config.angle.max_angle_degrees
    );
    eprintln!("Type 'c' + Enter to calibrate, 'q' + Enter to quit");
    eprintln!();

    let formatter = create_formatter(args.format, args.verbose > 0);
    let mut presenter = WriterPresenter::new(io::stdout(), formatter);
    let commands = spawn_command_reader();

    let summary = if let Some(path) = &args.input {
        let source = ReaderSource::open(path)
            .with_context(|| format!("Failed to open log {}", path.display()))?;
        run_session(source, &config, commands, &mut presenter)?
    } else if args.simulate {
        run_simulated(&config, commands, &mut presenter)?
    } else {
        let port = match &args.port {
            Some(port) => port.clone(),
            None => first_port(&mut presenter)?,
        };
        let Some(source) = open_serial(&port, &config, &mut presenter)? else {
            anyhow::bail!("Could not open {}", port.display());
        };
        run_session(source, &config, commands, &mut presenter)?
    };

    log::info!(
        "{}: {} samples, {} calibrations, final offset {}",
        summary.source,
        summary.samples,
        summary.calibrations,
        summary.final_offset
    );

    if let Some(err) = summary.error {
        anyhow::bail!("Sensor stream failed: {}", err);
    }
    Ok(())
}

fn build_config(args: &Args) -> anyhow::Result<FlexConfig> {
    let mut config = match &args.config {
        Some(path) => FlexConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => FlexConfig::default(),
    };

    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(window) = args.window {
        config.filter.window_size = window;
    }
    if let Some(sensitivity) = args.sensitivity {
        config.angle.sensitivity = sensitivity;
    }
    if let Some(max_angle) = args.max_angle {
        config.angle.max_angle_degrees = max_angle;
    }
    if let Some(alpha) = args.alpha {
        config.animation.alpha = alpha;
    }

    config.validate()?;
    Ok(config)
}

fn first_port<P: Presenter>(presenter: &mut P) -> anyhow::Result<PathBuf> {
    let ports = match list_ports() {
        Ok(ports) => ports,
        Err(e) => {
            presenter.status(&ConnectionStatus::Unsupported)?;
            return Err(e.into());
        }
    };
    ports
        .into_iter()
        .next()
        .context("No serial ports found; pass --port or --input")
}

/// Forward stdin lines as session commands
///
/// The thread is not joined: it stays blocked on stdin until the process
/// exits.
fn spawn_command_reader() -> Receiver<Command> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let command = match line.trim() {
                "c" | "C" => Command::Calibrate,
                "q" | "Q" => Command::Disconnect,
                "" => continue,
                other => {
                    log::warn!("Unknown command '{}'", other);
                    continue;
                }
            };
            if tx.send(command).is_err() {
                break;
            }
        }
    });
    rx
}

#[cfg(feature = "simulation")]
fn run_simulated<P: Presenter>(
    config: &FlexConfig,
    commands: Receiver<Command>,
    presenter: &mut P,
) -> anyhow::Result<SessionSummary> {
    use flexgauge::simulation::{BendProfile, NoiseConfig, SimulatedSource};

    let source = SimulatedSource::new(BendProfile::default(), &NoiseConfig::default(), 50.0)?;
    run_session(source, config, commands, presenter)
}

#[cfg(not(feature = "simulation"))]
fn run_simulated<P: Presenter>(
    _config: &FlexConfig,
    _commands: Receiver<Command>,
    _presenter: &mut P,
) -> anyhow::Result<SessionSummary> {
    anyhow::bail!("Built without the simulation feature")
}
