use anyhow::{Context, Result};
use clap::Parser;
use flexgauge::simulation::{BendProfile, NoiseConfig, SensorNoise, generate_bend, to_serial_text};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "generate_log")]
#[command(about = "Generate synthetic flex sensor serial logs")]
struct Args {
    /// TOML simulation configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "data/synthetic")]
    output_dir: PathBuf,

    /// Number of logs to generate
    #[arg(short, long, default_value_t = 1)]
    trials: u32,

    /// Base seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Log duration in seconds
    #[arg(short, long, default_value_t = 10.0)]
    duration: f64,

    /// Sensor sample rate in Hz
    #[arg(long, default_value_t = 50.0)]
    sample_rate: f64,

    /// Output filename prefix
    #[arg(long, default_value = "flex")]
    prefix: String,

    /// Gaussian noise standard deviation in raw units (CLI override)
    #[arg(long)]
    std_dev: Option<f64>,

    /// Probability of a garbage line (CLI override)
    #[arg(long)]
    glitch: Option<f64>,

    /// Generate manifest.json
    #[arg(long)]
    manifest: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TomlConfig {
    profile: BendProfile,
    noise: NoiseConfig,
}

#[derive(Debug, serde::Serialize)]
struct ManifestEntry {
    file: String,
    trial: u32,
    seed: u64,
    samples: usize,
}

#[derive(Debug, serde::Serialize)]
struct Manifest {
    sample_rate: f64,
    duration: f64,
    baseline: f64,
    amplitude: f64,
    period_secs: f64,
    files: Vec<ManifestEntry>,
}

fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content).context("Failed to parse TOML config")
}

fn build_noise_config(toml: &TomlConfig, args: &Args, seed: u64) -> NoiseConfig {
    let mut config = toml.noise.clone().with_seed(seed);
    if let Some(std_dev) = args.std_dev {
        config = config.with_std_dev(std_dev);
    }
    if let Some(glitch) = args.glitch {
        config = config.with_glitches(glitch);
    }
    config
}

fn main() -> Result<()> {
    let args = Args::parse();

    fs::create_dir_all(&args.output_dir).context("Failed to create output directory")?;

    let toml_config = if let Some(ref config_path) = args.config {
        load_toml_config(config_path)?
    } else {
        TomlConfig::default()
    };

    let base_seed = args.seed.unwrap_or(0);
    let clean = generate_bend(&toml_config.profile, args.duration, args.sample_rate);

    let mut manifest_entries = Vec::new();

    for trial in 0..args.trials {
        let seed = base_seed + trial as u64;
        let mut noise = SensorNoise::new(&build_noise_config(&toml_config, &args, seed))?;
        let text = to_serial_text(&clean, &mut noise);

        let filename = format!("{}_t{:02}.log", args.prefix, trial);
        let filepath = args.output_dir.join(&filename);
        fs::write(&filepath, text)
            .with_context(|| format!("Failed to write {}", filepath.display()))?;

        manifest_entries.push(ManifestEntry {
            file: filename,
            trial,
            seed,
            samples: clean.len(),
        });

        eprint!("\rGenerating: {}/{}", trial + 1, args.trials);
    }
    eprintln!();

    if args.manifest {
        let manifest = Manifest {
            sample_rate: args.sample_rate,
            duration: args.duration,
            baseline: toml_config.profile.baseline,
            amplitude: toml_config.profile.amplitude,
            period_secs: toml_config.profile.period_secs,
            files: manifest_entries,
        };
        let manifest_path = args.output_dir.join("manifest.json");
        let manifest_json =
            serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
        fs::write(&manifest_path, manifest_json).context("Failed to write manifest")?;
        eprintln!("Manifest written to: {}", manifest_path.display());
    }

    eprintln!(
        "Generated {} logs in {}",
        args.trials,
        args.output_dir.display()
    );
    Ok(())
}
