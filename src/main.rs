use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use climacast::config::PipelineConfig;
use climacast::consistency::{consistency_check, consistency_check_by_group};
use climacast::data::{create_cds_time_series_datasets_with, Datasets, TimeSeriesDataSet};
use climacast::frame::{read_csv, save_to_csv};
use climacast::pipeline::preprocess_with;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    /// Pipeline configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the CDS preprocessing recipe over a raw CSV table
    Preprocess {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Check that a time index column has no gaps
    Check {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "time_idx")]
        column: String,
        /// Check every latitude/longitude group separately
        #[arg(long)]
        by_group: bool,
    },
    /// Build windowed datasets from a preprocessed table and save their parameters
    Windows {
        #[arg(long)]
        input: PathBuf,
        /// Either "train" or "eval"
        #[arg(long, default_value = "train")]
        mode: String,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Preprocess { input, output } => {
            let df = read_csv(&input).with_context(|| format!("reading {}", input.display()))?;
            let mut df = preprocess_with(df, &config.preprocess)?;
            save_to_csv(&mut df, &output)?;
        }
        Commands::Check {
            input,
            column,
            by_group,
        } => {
            let df = read_csv(&input).with_context(|| format!("reading {}", input.display()))?;
            if by_group {
                consistency_check_by_group(&df, &column, &config.schema.group_ids)?;
            } else {
                consistency_check(&df, &column)?;
            }
            info!("No missing values in '{column}'.");
        }
        Commands::Windows { input, mode, out } => {
            let df = read_csv(&input).with_context(|| format!("reading {}", input.display()))?;
            let datasets = create_cds_time_series_datasets_with(
                &df,
                config.window_spec(),
                &config.targets,
                &mode,
                config.schema(),
            )?;

            match datasets {
                Datasets::Train {
                    training,
                    validation,
                } => {
                    report("training", &training);
                    report("validation", &validation);
                    training.save(out.join("training.json"))?;
                    validation.save(out.join("validation.json"))?;
                }
                Datasets::Eval(dataset) => {
                    report("eval", &dataset);
                    dataset.save(out.join("eval.json"))?;
                }
            }
        }
    }

    Ok(())
}

fn report(name: &str, dataset: &TimeSeriesDataSet) {
    info!(
        "{name}: {} windows over {} groups; known reals {:?}, unknown reals {:?}",
        dataset.len(),
        dataset.num_groups(),
        dataset.known_real_names(),
        dataset.unknown_real_names()
    );
}
