//! numerblox CLI binary.
//!
//! Runs the neutralization and penalization pipeline on seeded synthetic
//! panels and reports per-era feature exposure.

mod integration;

use clap::{Parser, Subcommand, ValueEnum};
use integration::simulation::{SimulationOptions, run_simulation};
use numerblox::SyntheticPanel;
use numerblox_processors::{ProcessorCategory, count_by_category, processors_by_category};
use serde_json::json;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "numerblox")]
#[command(about = "numerblox: era-wise feature neutralization and exposure penalization", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args, Debug)]
struct PanelArgs {
    /// Number of eras
    #[arg(long, default_value_t = 3)]
    eras: usize,

    /// Rows per era
    #[arg(long, default_value_t = 100)]
    rows: usize,

    /// Number of feature columns
    #[arg(long, default_value_t = 10)]
    features: usize,

    /// Features the prediction is built from
    #[arg(long, default_value_t = 3)]
    signal: usize,

    /// Half-width of the uniform prediction noise
    #[arg(long, default_value_t = 0.5)]
    noise: f64,

    /// RNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

impl PanelArgs {
    const fn panel(&self) -> SyntheticPanel {
        SyntheticPanel {
            eras: self.eras,
            rows_per_era: self.rows,
            features: self.features,
            signal_features: self.signal,
            noise: self.noise,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Neutralize and penalize a synthetic panel and compare exposures
    Simulate {
        #[command(flatten)]
        panel: PanelArgs,

        /// Proportion of exposure removed by the neutralizer
        #[arg(long, default_value_t = 0.5)]
        proportion: f64,

        /// Exposure cap for the penalizer
        #[arg(long)]
        max_exposure: Option<f64>,

        /// Optimizer iteration budget per era
        #[arg(long)]
        budget: Option<usize>,

        /// Wall-clock limit per era, in milliseconds
        #[arg(long)]
        deadline_ms: Option<u64>,

        /// Model id for the penalized column (repeatable)
        #[arg(long = "model-id", default_value = "model")]
        model_ids: Vec<String>,

        /// JSON file with penalty settings; flags override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Worker threads for per-era tasks (default: all cores)
        #[arg(long)]
        workers: Option<usize>,

        /// Stop the rank transform at uniform ranks
        #[arg(long)]
        no_gaussianize: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the column taxonomy of a synthetic panel
    Taxonomy {
        #[command(flatten)]
        panel: PanelArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List available processors
    Processors,
}

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            panel,
            proportion,
            max_exposure,
            budget,
            deadline_ms,
            model_ids,
            config,
            workers,
            no_gaussianize,
            format,
        } => {
            let options = SimulationOptions {
                panel: panel.panel(),
                proportion,
                max_exposure,
                budget,
                deadline_ms,
                model_ids,
                config,
                workers,
                gaussianize: !no_gaussianize,
            };
            let outcome = run_simulation(&options)?;
            match format {
                OutputFormat::Text => print!("{outcome}"),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
            }
        }
        Commands::Taxonomy { panel, format } => {
            let dataset = panel.panel().build()?;
            let taxonomy = dataset.taxonomy();
            match format {
                OutputFormat::Text => {
                    println!("Era column: {}", dataset.era_col()?);
                    println!("Features ({}): {}", taxonomy.feature_cols.len(), taxonomy.feature_cols.join(", "));
                    println!("Targets ({}): {}", taxonomy.target_cols.len(), taxonomy.target_cols.join(", "));
                    println!(
                        "Predictions ({}): {}",
                        taxonomy.prediction_cols.len(),
                        taxonomy.prediction_cols.join(", ")
                    );
                    println!("Aux ({}): {}", taxonomy.aux_cols.len(), taxonomy.aux_cols.join(", "));
                }
                OutputFormat::Json => {
                    let out = json!({
                        "shape": dataset.shape(),
                        "taxonomy": taxonomy,
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
            }
        }
        Commands::Processors => list_processors(),
    }

    Ok(())
}

fn list_processors() {
    let counts = count_by_category();
    println!("Available processors:");
    for category in [
        ProcessorCategory::Selection,
        ProcessorCategory::Ensemble,
        ProcessorCategory::Exposure,
        ProcessorCategory::Memory,
    ] {
        let count = counts.get(&category).copied().unwrap_or(0);
        println!("\n{category:?} ({count}):");
        for info in processors_by_category(category) {
            match info.output_column {
                Some(column) => println!("  {:<28} {} -> {}", info.name, info.description, column),
                None => println!("  {:<28} {}", info.name, info.description),
            }
        }
    }
}
