/// CLI пайплайна: очистка, обучение, проверка и предсказание

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use medrisk_ml::diagnostics::inspect_text_columns;
use medrisk_ml::io::read_csv;
use medrisk_ml::{load_model, normalize_all, train_all, PipelineConfig, TrainingReport};

#[derive(Parser)]
#[command(name = "medrisk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Clean medical datasets and train soft-voting ensembles", long_about = None)]
struct Cli {
    /// JSON file overriding the built-in pipeline configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean raw CSVs into data/cleaned
    Normalize {
        /// Only this dataset
        #[arg(short, long)]
        dataset: Option<String>,
    },

    /// Train and persist ensembles from cleaned CSVs
    Train {
        #[arg(short, long)]
        dataset: Option<String>,
    },

    /// List columns of a cleaned CSV that are still not numeric
    Inspect {
        #[arg(short, long)]
        dataset: String,

        /// Distinct values to show per column
        #[arg(short, long, default_value = "5")]
        sample: usize,
    },

    /// Predict classes for a cleaned CSV with saved artifacts
    Predict {
        #[arg(short, long)]
        dataset: String,

        #[arg(short, long)]
        input: PathBuf,
    },

    /// Normalize, then train (default)
    Run,
}

fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medrisk_ml=info,medrisk=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Normalize { dataset } => {
            normalize_all(&config, dataset.as_deref())?;
        }
        Commands::Train { dataset } => {
            let reports = train_all(&config, dataset.as_deref())?;
            print_reports(&reports);
        }
        Commands::Inspect { dataset, sample } => {
            let spec = config.dataset(&dataset)?;
            let path = config.clean_path(spec);
            let clean = read_csv(&path).with_context(|| format!("failed to read {}", path.display()))?;

            let summary = inspect_text_columns(&clean, sample)?;
            if summary.is_empty() {
                println!("{}: all {} columns are numeric", dataset, clean.width());
            }
            for column in summary {
                println!("{} ({} distinct): {:?}", column.column, column.distinct, column.sample);
            }
        }
        Commands::Predict { dataset, input } => {
            let model = load_model(&config.models_dir, &dataset)?;
            let frame = read_csv(&input).with_context(|| format!("failed to read {}", input.display()))?;
            for prediction in model.predict(&frame)? {
                println!("{}", prediction);
            }
        }
        Commands::Run => {
            normalize_all(&config, None)?;
            let reports = train_all(&config, None)?;
            print_reports(&reports);
        }
    }

    Ok(())
}

fn print_reports(reports: &[TrainingReport]) {
    for report in reports {
        println!("=== {} ===", report.dataset);
        println!("Accuracy: {:.4}", report.accuracy());
        println!("{}", report.evaluation);
    }
}
