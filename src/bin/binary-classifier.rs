//! Binary classifier CLI - runs the module outside of a host application.
//!
//! Usage:
//!   binary-classifier 1 /data/trace1.npy /out
//!   binary-classifier 1 /data/trace1.npy /out --modules-root /opt/emvidence/modules
//!   binary-classifier 1 /data/trace1.npy /out --per-window

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use em_binary_classifier::features::load_predicting_data;
use em_binary_classifier::io::{time_duration, TraceFormat};
use em_binary_classifier::ml::prediction::predict_windows;
use em_binary_classifier::{get_results, initialize, ExtractionConfig, ModelArtifact};

#[derive(Parser)]
#[command(name = "binary-classifier")]
#[command(about = "Classify a captured EM trace with a pre-trained binary classifier")]
struct Cli {
    /// Integer module identifier (names the results subdirectory)
    module_id: String,

    /// EM trace in NPY format
    trace: PathBuf,

    /// Base directory for results
    results_root: PathBuf,

    /// Directory holding installed modules
    #[arg(long, default_value = em_binary_classifier::config::DEFAULT_MODULES_ROOT)]
    modules_root: PathBuf,

    /// Also print the label predicted for every window
    #[arg(long)]
    per_window: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = initialize(&cli.module_id, &cli.trace, &cli.results_root)
        .context("failed to initialize module")?
        .with_modules_root(&cli.modules_root);

    let summary = get_results(&config).context("failed to generate results")?;
    println!("{}", summary);

    if cli.per_window {
        let model = ModelArtifact::load(config.model_path())?;
        let extraction = ExtractionConfig::default();
        let duration =
            time_duration(config.trace_path(), extraction.sample_rate, TraceFormat::Npy)?;
        let features = load_predicting_data(
            config.trace_path(),
            extraction.sample_rate,
            extraction.feature_vector_size,
            extraction.sliding_window,
            duration,
        )?;
        println!("Per window: {}", predict_windows(&model, &features)?);
    }

    Ok(())
}
