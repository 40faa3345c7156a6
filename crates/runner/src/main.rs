//! BECCS RDM - robust decision-making analysis of a BECCS investment
//!
//! Samples states of the world, evaluates the investment model in each and
//! writes the robustness, scenario and sensitivity results to the output
//! directory.

use anyhow::Context;
use beccs_runner::{Analysis, AnalysisConfig, Overrides, PriceTrend, summary, write_outputs};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// BECCS RDM - robust decision-making analysis of a BECCS investment
#[derive(Parser, Debug, PartialEq)]
#[command(name = "beccs-rdm")]
#[command(version)]
#[command(after_help = "ENVIRONMENT VARIABLES:\n    RUST_LOG    Log level filter (default: beccs=info)")]
struct Cli {
    /// Load configuration from JSON file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of states of the world (default: 10000)
    #[arg(long, value_name = "N")]
    samples: Option<usize>,

    /// Random seed (default: 7)
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Energy price trend: rising, falling, rising_electricity (default), rising_heat
    #[arg(long, value_name = "NAME", value_parser = parse_trend)]
    trend: Option<PriceTrend>,

    /// Output directory (default: .)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Sobol base samples (default: 1000)
    #[arg(long, value_name = "N")]
    sobol_samples: Option<usize>,

    /// Skip the sensitivity analysis
    #[arg(long)]
    no_sobol: bool,

    /// Skip scenario discovery
    #[arg(long)]
    no_cart: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            sample_size: self.samples,
            seed: self.seed,
            price_trend: self.trend,
            output_dir: self.output.clone(),
            sobol_samples: self.sobol_samples,
            no_sobol: self.no_sobol,
            no_cart: self.no_cart,
        }
    }
}

fn parse_trend(name: &str) -> Result<PriceTrend, String> {
    PriceTrend::from_name(name).ok_or_else(|| format!("unknown price trend: {name}"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beccs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            AnalysisConfig::from_file(path)?
        }
        None => AnalysisConfig::default(),
    };
    config.apply(&cli.overrides());

    let analysis = Analysis::new(config).context("invalid analysis configuration")?;
    let results = analysis.run()?;

    let output_dir = analysis.config().output_dir.clone();
    write_outputs(&results, &output_dir)
        .with_context(|| format!("writing results to {}", output_dir.display()))?;

    println!("{}", summary(&results));
    Ok(())
}
