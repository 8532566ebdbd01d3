use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flashpoint_core::ensemble::{run_ensemble, summarize};
use flashpoint_core::{RunSummary, SimConfig, World};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "flashpoint")]
#[command(about = "Spatial shock-propagation simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation and emit the mean-intensity series
    Run {
        /// Path to config file (JSON); defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for series.csv and summary.json (stdout CSV if omitted)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Override the number of steps from the config
        #[arg(long)]
        steps: Option<usize>,

        /// Override the seed from the config
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run the same configuration over consecutive seeds in parallel
    Ensemble {
        /// Path to config file (JSON); defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of seeds to run
        #[arg(long, default_value_t = 16)]
        runs: u64,

        /// First seed; members use base_seed, base_seed + 1, ...
        #[arg(long, default_value_t = 0)]
        base_seed: u64,

        /// Output directory for envelope.csv and members.json (stdout CSV if omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let file =
        File::open(path).with_context(|| format!("Failed to open config {}", path.display()))?;
    let config: SimConfig = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    Ok(config)
}

fn write_run_outputs(summary: &RunSummary, out: &Path) -> Result<()> {
    fs::create_dir_all(out)
        .with_context(|| format!("Failed to create output directory {}", out.display()))?;

    let csv_path = out.join("series.csv");
    let csv = File::create(&csv_path)
        .with_context(|| format!("Failed to create {}", csv_path.display()))?;
    summary
        .write_series_csv(BufWriter::new(csv))
        .context("Failed to write series CSV")?;

    let json_path = out.join("summary.json");
    let json = File::create(&json_path)
        .with_context(|| format!("Failed to create {}", json_path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(json), summary)
        .context("Failed to write summary JSON")?;

    info!(dir = %out.display(), "wrote series.csv and summary.json");
    Ok(())
}

fn run(
    config_path: Option<PathBuf>,
    out: Option<PathBuf>,
    steps: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let mut config = load_config(config_path.as_deref())?;
    if let Some(steps) = steps {
        config.n_steps = steps;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }

    let mut world = World::try_new(config).context("Failed to initialize world")?;
    let summary = world.run();
    info!(
        steps = summary.steps,
        initial_mean = summary.initial_mean_intensity,
        final_mean = summary.final_mean_intensity().unwrap_or(summary.initial_mean_intensity),
        "run complete"
    );

    match out {
        Some(dir) => write_run_outputs(&summary, &dir),
        None => summary
            .write_series_csv(io::stdout().lock())
            .context("Failed to write series CSV"),
    }
}

fn ensemble(
    config_path: Option<PathBuf>,
    runs: u64,
    base_seed: u64,
    out: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let seeds: Vec<u64> = (0..runs).map(|i| base_seed.wrapping_add(i)).collect();
    let members = run_ensemble(&config, &seeds).context("Failed to run ensemble")?;
    let envelope = summarize(&members);
    info!(members = members.len(), steps = envelope.len(), "ensemble complete");

    let write_envelope = |w: &mut dyn Write| -> io::Result<()> {
        writeln!(w, "step,mean,min,max")?;
        for s in &envelope {
            writeln!(w, "{},{},{},{}", s.step, s.mean, s.min, s.max)?;
        }
        w.flush()
    };

    match out {
        Some(dir) => {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
            let csv_path = dir.join("envelope.csv");
            let mut csv = BufWriter::new(
                File::create(&csv_path)
                    .with_context(|| format!("Failed to create {}", csv_path.display()))?,
            );
            write_envelope(&mut csv).context("Failed to write envelope CSV")?;

            let json_path = dir.join("members.json");
            let json = File::create(&json_path)
                .with_context(|| format!("Failed to create {}", json_path.display()))?;
            serde_json::to_writer_pretty(BufWriter::new(json), &members)
                .context("Failed to write members JSON")?;
            Ok(())
        }
        None => write_envelope(&mut io::stdout().lock()).context("Failed to write envelope CSV"),
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            out,
            steps,
            seed,
        } => run(config, out, steps, seed),
        Commands::Ensemble {
            config,
            runs,
            base_seed,
            out,
        } => ensemble(config, runs, base_seed, out),
        Commands::DumpDefaultConfig => {
            let json = serde_json::to_string_pretty(&SimConfig::default())?;
            println!("{json}");
            Ok(())
        }
    }
}
