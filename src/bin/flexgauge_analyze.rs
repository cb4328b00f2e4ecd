use clap::Parser;
use rolling_stats::Stats;
use serde::Serialize;
use std::path::{Path, PathBuf};

use flexgauge::FlexConfig;
use flexgauge::processing::FlexProcessor;
use flexgauge::signal_processing::Tier;
use flexgauge::transport::{ReaderSource, SampleSource};

#[derive(Parser, Debug)]
#[command(name = "flexgauge_analyze")]
#[command(about = "Analyze recorded flex sensor logs", long_about = None)]
struct Args {
    /// Serial log files to analyze
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output format: text, csv, json
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Calibrate after this many samples (the arm is straight at the start)
    #[arg(long)]
    calibrate_after: Option<usize>,

    /// Rolling average window size in samples
    #[arg(long)]
    window: Option<usize>,

    /// Degrees per unit of deviation
    #[arg(long)]
    sensitivity: Option<f64>,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Csv,
    Json,
}

#[derive(Debug, Clone, Serialize)]
struct StatsSummary {
    count: usize,
    mean: f64,
    std_dev: f64,
    min: f64,
    max: f64,
}

impl StatsSummary {
    fn from_stats(stats: &Stats<f64>) -> Option<Self> {
        if stats.count == 0 {
            return None;
        }
        Some(Self {
            count: stats.count,
            mean: stats.mean,
            std_dev: stats.std_dev,
            min: stats.min,
            max: stats.max,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
struct TierDwell {
    safe: usize,
    warning: usize,
    danger: usize,
}

impl TierDwell {
    fn record(&mut self, tier: Tier) {
        match tier {
            Tier::Safe => self.safe += 1,
            Tier::Warning => self.warning += 1,
            Tier::Danger => self.danger += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct FileAnalysis {
    filename: String,
    sample_count: usize,
    offset: i64,
    smoothed: Option<StatsSummary>,
    angle: Option<StatsSummary>,
    tiers: TierDwell,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
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

    let mut config = match &args.config {
        Some(path) => FlexConfig::load(path)?,
        None => FlexConfig::default(),
    };
    if let Some(window) = args.window {
        config.filter.window_size = window;
    }
    if let Some(sensitivity) = args.sensitivity {
        config.angle.sensitivity = sensitivity;
    }
    config.validate()?;

    let results: Vec<FileAnalysis> = args
        .files
        .iter()
        .map(|path| analyze_file(path, &config, args.calibrate_after))
        .collect();

    match args.format {
        OutputFormat::Text => print_text(&results, &config),
        OutputFormat::Csv => print_csv(&results),
        OutputFormat::Json => print_json(&results)?,
    }

    Ok(())
}

fn analyze_file(path: &Path, config: &FlexConfig, calibrate_after: Option<usize>) -> FileAnalysis {
    let filename = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    match analyze_file_impl(path, config, calibrate_after) {
        Ok(mut analysis) => {
            analysis.filename = filename;
            analysis
        }
        Err(e) => FileAnalysis {
            filename,
            sample_count: 0,
            offset: 0,
            smoothed: None,
            angle: None,
            tiers: TierDwell::default(),
            error: Some(format!("{:#}", e)),
        },
    }
}

fn analyze_file_impl(
    path: &Path,
    config: &FlexConfig,
    calibrate_after: Option<usize>,
) -> anyhow::Result<FileAnalysis> {
    let mut source = ReaderSource::open(path)?;
    let mut processor = FlexProcessor::new(config)?;

    let mut smoothed_stats: Stats<f64> = Stats::new();
    let mut angle_stats: Stats<f64> = Stats::new();
    let mut tiers = TierDwell::default();
    let mut sample_count = 0;

    while let Some(batch) = source.next_samples()? {
        for raw in batch {
            let reading = processor.process_sample(raw);
            sample_count += 1;

            if calibrate_after == Some(sample_count) {
                let offset = processor.calibrate()?;
                log::info!(
                    "{}: calibrated at sample {}, offset {}",
                    path.display(),
                    sample_count,
                    offset
                );
                // Statistics describe the calibrated part of the log only.
                smoothed_stats = Stats::new();
                angle_stats = Stats::new();
                tiers = TierDwell::default();
                continue;
            }

            smoothed_stats.update(reading.smoothed as f64);
            angle_stats.update(reading.angle);
            tiers.record(reading.tier);
        }
    }

    if let Some(n) = calibrate_after
        && sample_count < n
    {
        log::warn!(
            "{}: only {} samples, never reached calibration point {}",
            path.display(),
            sample_count,
            n
        );
    }

    Ok(FileAnalysis {
        filename: String::new(),
        sample_count,
        offset: processor.offset(),
        smoothed: StatsSummary::from_stats(&smoothed_stats),
        angle: StatsSummary::from_stats(&angle_stats),
        tiers,
        error: None,
    })
}

fn print_text(results: &[FileAnalysis], config: &FlexConfig) {
    eprintln!(
        "Window: {} samples, sensitivity: {} deg/unit, tiers: {}°/{}°",
        config.filter.window_size,
        config.angle.sensitivity,
        config.tiers.warning_degrees,
        config.tiers.danger_degrees
    );
    eprintln!();

    println!(
        "{:<40} {:>8} {:>8} {:>10} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "File", "Samples", "Offset", "MeanRaw", "MeanAng", "MaxAng", "Safe", "Warn", "Danger"
    );
    println!("{}", "-".repeat(114));

    for result in results {
        if let Some(ref err) = result.error {
            println!("{:<40} ERROR: {}", result.filename, err);
            continue;
        }

        let mean_raw = result
            .smoothed
            .as_ref()
            .map(|s| format!("{:.1}", s.mean))
            .unwrap_or_else(|| "-".to_string());
        let mean_angle = result
            .angle
            .as_ref()
            .map(|s| format!("{:.1}", s.mean))
            .unwrap_or_else(|| "-".to_string());
        let max_angle = result
            .angle
            .as_ref()
            .map(|s| format!("{:.1}", s.max))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<40} {:>8} {:>8} {:>10} {:>8} {:>8} {:>8} {:>8} {:>8}",
            result.filename,
            result.sample_count,
            result.offset,
            mean_raw,
            mean_angle,
            max_angle,
            result.tiers.safe,
            result.tiers.warning,
            result.tiers.danger
        );
    }

    for result in results {
        if let Some(ref angle) = result.angle {
            eprintln!();
            eprintln!("Angle statistics for {}:", result.filename);
            eprintln!("  Mean: {:.1}°", angle.mean);
            eprintln!("  Std dev: {:.1}°", angle.std_dev);
            eprintln!("  Min: {:.1}°", angle.min);
            eprintln!("  Max: {:.1}°", angle.max);
        }
    }
}

fn print_csv(results: &[FileAnalysis]) {
    println!(
        "filename,sample_count,offset,smoothed_mean,smoothed_std,angle_mean,angle_std,angle_max,safe,warning,danger,error"
    );
    for result in results {
        let field = |s: Option<&StatsSummary>, f: fn(&StatsSummary) -> f64| {
            s.map(|s| format!("{:.2}", f(s))).unwrap_or_default()
        };
        let error = result.error.as_deref().unwrap_or("");

        println!(
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            result.filename,
            result.sample_count,
            result.offset,
            field(result.smoothed.as_ref(), |s| s.mean),
            field(result.smoothed.as_ref(), |s| s.std_dev),
            field(result.angle.as_ref(), |s| s.mean),
            field(result.angle.as_ref(), |s| s.std_dev),
            field(result.angle.as_ref(), |s| s.max),
            result.tiers.safe,
            result.tiers.warning,
            result.tiers.danger,
            error
        );
    }
}

fn print_json(results: &[FileAnalysis]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    println!("{}", json);
    Ok(())
}
