use std::path::PathBuf;
use std::time::Instant;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use wtp_predictor::{
    ArtifactStore, Assessment, FormInput, InputRecord, Pipeline, PipelineConfig, Recommendations,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Artifact bundle to load (defaults to $WTP_ARTIFACTS, then ./artifacts_rf.json)
    #[arg(short, long, global = true)]
    artifacts: Option<PathBuf>,

    /// Refuse the bundle unless its SHA-256 digest matches
    #[arg(long, global = true)]
    sha256: Option<String>,

    /// JSON file with pipeline configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Predict the opinion for one set of indicator values
    Predict {
        /// Indicator value as NAME=VALUE, written in the configured number format; may be repeated
        #[arg(short = 'v', long = "value", value_parser = parse_key_value)]
        values: Vec<(String, String)>,

        /// JSON object mapping indicator names to values (null = missing)
        #[arg(long)]
        input_json: Option<PathBuf>,

        /// Print the full assessment as JSON
        #[arg(long)]
        json: bool,
    },
    /// Score a labeled table and report accuracy
    Evaluate {
        /// Delimited table with every indicator column plus the label column
        #[arg(short, long)]
        table: PathBuf,

        #[arg(long)]
        delimiter: Option<char>,

        #[arg(long)]
        decimal: Option<char>,

        /// Name of the ground-truth label column
        #[arg(long)]
        target: Option<String>,

        /// Worker threads (0 = all cores)
        #[arg(long)]
        workers: Option<usize>,

        /// Write the augmented table here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show what the artifact bundle contains
    Info,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw.split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    let store = match &args.artifacts {
        Some(path) => ArtifactStore::new(path),
        None => ArtifactStore::new_default(),
    };

    match args.command {
        Command::Predict { values, input_json, json } => {
            let pipeline = load_pipeline(&store, args.sha256.as_deref(), config).await?;
            let record = build_record(&pipeline, values, input_json).await?;
            let assessment = pipeline.assess(&record)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&assessment)?);
            } else {
                print_assessment(&assessment);
            }
        }
        Command::Evaluate { table, delimiter, decimal, target, workers, output } => {
            let mut config = config;
            if let Some(delimiter) = delimiter {
                config.table.delimiter = delimiter;
            }
            if let Some(decimal) = decimal {
                config.table.decimal_separator = decimal;
            }
            if let Some(target) = target {
                config.table.target_column = target;
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            let pipeline = load_pipeline(&store, args.sha256.as_deref(), config).await?;

            let raw = tokio::fs::read_to_string(&table).await
                .with_context(|| format!("failed to read table {:?}", table))?;
            let start = Instant::now();
            let report = pipeline.evaluate_text(&raw)?;
            info!("Evaluation took {:.2?}", start.elapsed());

            println!("\nResults:");
            println!("  Rows evaluated: {}", report.total());
            println!("  Correct predictions: {}", report.correct);
            println!("  Accuracy: {:.2}%", report.accuracy * 100.0);

            if let Some(output) = output {
                tokio::fs::write(&output, report.to_delimited(&pipeline.config().table)).await
                    .with_context(|| format!("failed to write {:?}", output))?;
                println!("  Augmented table written to {:?}", output);
            }
        }
        Command::Info => {
            let pipeline = load_pipeline(&store, args.sha256.as_deref(), config).await?;
            let info = pipeline.info();
            println!("Artifact bundle: {:?}", store.path());
            println!("  SHA-256: {}", store.digest()?);
            println!("  Trees: {}", info.n_trees);
            match info.decision_threshold {
                Some(t) => println!("  Decision threshold: {:.4}", t),
                None => println!("  Decision threshold: native (argmax)"),
            }
            println!("  Direction (linear model): {}", if info.has_direction { "yes" } else { "no" });
            println!("  Benchmark: {}", if info.has_benchmark { "yes" } else { "no" });
            println!("  Features ({}):", info.features.len());
            for feature in &info.features {
                println!("    - {}", feature);
            }
        }
    }

    Ok(())
}

async fn load_pipeline(store: &ArtifactStore, sha256: Option<&str>, config: PipelineConfig) -> Result<Pipeline> {
    if !store.exists() {
        bail!(
            "Artifact bundle {:?} not found. Export the trained artifacts to JSON and pass --artifacts or set WTP_ARTIFACTS.",
            store.path()
        );
    }
    let start = Instant::now();
    let bundle = store.load_bundle_async(sha256).await
        .with_context(|| format!("failed to load artifact bundle {:?}", store.path()))?;
    let pipeline = Pipeline::builder()
        .with_config(config)
        .with_bundle(bundle)?
        .build()?;
    info!("Pipeline built in {:.2?}", start.elapsed());
    Ok(pipeline)
}

/// Starts every indicator at 0.0, like an untouched form, then applies the
/// JSON file and finally the command-line values.
async fn build_record(pipeline: &Pipeline, values: Vec<(String, String)>, input_json: Option<PathBuf>) -> Result<InputRecord> {
    let mut form = FormInput::new(pipeline.bundle().features(), &pipeline.config().table);
    if let Some(path) = input_json {
        let raw = tokio::fs::read_to_string(&path).await
            .with_context(|| format!("failed to read {:?}", path))?;
        form.apply_json(&raw).with_context(|| format!("invalid input file {:?}", path))?;
    }
    for (name, value) in &values {
        form.apply_value(name, value)?;
    }
    Ok(form.into_record())
}

fn print_assessment(assessment: &Assessment) {
    let prediction = &assessment.prediction;

    println!("\nIndicator values:");
    for (name, value) in assessment.input.iter() {
        println!("  {}: {:.4}", name, value);
    }

    println!("\nPrediction:");
    if prediction.is_wtp() {
        println!("  Predicted to RECEIVE a WTP opinion (Wajar Tanpa Pengecualian)");
    } else {
        println!("  Predicted NOT to receive a WTP opinion");
    }
    println!("  Confidence scores:");
    println!("    Tidak WTP (0): {:.2}%", prediction.probability_negative * 100.0);
    println!("    WTP (1): {:.2}%", prediction.probability_positive * 100.0);

    println!("\nKey drivers:");
    for (rank, driver) in assessment.drivers.iter().enumerate() {
        let direction = driver.influence.map(|i| i.as_str()).unwrap_or("-");
        match (driver.input, driver.benchmark) {
            (Some(input), Some(benchmark)) => println!(
                "  {}. {} (importance {:.4}, {}) input {:.4} vs benchmark {:.4}",
                rank + 1, driver.feature, driver.importance, direction, input, benchmark
            ),
            _ => println!(
                "  {}. {} (importance {:.4}, {})",
                rank + 1, driver.feature, driver.importance, direction
            ),
        }
    }

    if let Some(comparison) = &assessment.benchmark {
        println!("\nBenchmark comparison:");
        for row in comparison {
            println!(
                "  {}: input {:.4}, benchmark {:.4}, difference {:+.4}",
                row.feature, row.input, row.benchmark, row.difference
            );
        }
    }

    println!("\nRecommendations:");
    match &assessment.recommendations {
        Recommendations::Unavailable => println!("  (driver directions unavailable for this bundle)"),
        Recommendations::Advisories(items) if items.is_empty() => {
            println!("  (no advisory for the negative drivers found)")
        }
        recommendations => {
            for message in recommendations.messages() {
                println!("  - {}", message);
            }
        }
    }
}
