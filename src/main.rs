//! Embedding Evaluation CLI
//!
//! A benchmark harness for text embedding models: loads a task dataset,
//! serves embeddings from a precomputed store, runs the matching evaluator,
//! and writes a JSON report.
//!
//! ## Quick Start
//!
//! ```bash
//! # Evaluate a clustering dataset
//! ./embedding-eval run \
//!     --data ./datasets/newsgroups.json \
//!     --embeddings ./vectors/bge-small.json \
//!     --output results/newsgroups.json
//!
//! # Check a dataset file without running anything
//! ./embedding-eval validate-data --data ./datasets/newsgroups.json
//!
//! # Show the task families and their main scores
//! ./embedding-eval list-tasks
//! ```
//!
//! Tunables (bootstrap trials, sample sizes, kNN settings) come from
//! `eval.toml`; see `config` for the schema.

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

use embedding_eval::config::EvalConfig;
use embedding_eval::data::Dataset;
use embedding_eval::embedders::{EmbedderBackend, PrecomputedBackend};
use embedding_eval::runner::{run_task, EvalReport};
use embedding_eval::tasks::TaskFamily;

#[derive(Parser)]
#[command(name = "embedding-eval")]
#[command(about = "Benchmark harness for text embedding models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a dataset against a precomputed embedding store
    Run {
        /// Path to the dataset JSON file
        #[arg(short, long)]
        data: PathBuf,

        /// Path to the precomputed embeddings JSON file
        #[arg(short, long)]
        embeddings: PathBuf,

        /// Output file for the report (JSON)
        #[arg(short, long, default_value = "results/eval_report.json")]
        output: PathBuf,

        /// Path to the tunables config (TOML)
        #[arg(short, long, default_value = "eval.toml")]
        config: PathBuf,

        /// RNG seed; overrides the config value
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Validate a dataset file
    ValidateData {
        /// Path to the dataset JSON file
        #[arg(short, long)]
        data: PathBuf,
    },

    /// List supported task families
    ListTasks,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data,
            embeddings,
            output,
            config,
            seed,
        } => {
            run_evaluation(&data, &embeddings, &output, &config, seed).await?;
        }

        Commands::ValidateData { data } => {
            validate_data(&data)?;
        }

        Commands::ListTasks => {
            list_tasks();
        }
    }

    Ok(())
}

async fn run_evaluation(
    data_path: &PathBuf,
    embeddings_path: &PathBuf,
    output: &PathBuf,
    config_path: &PathBuf,
    seed_override: Option<u64>,
) -> Result<()> {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               EMBEDDING EVALUATION                           ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let config = if config_path.exists() {
        println!("Loading config from {:?}...", config_path);
        EvalConfig::load(config_path)?
    } else {
        println!("Using default config...");
        EvalConfig::default()
    };
    let seed = seed_override.unwrap_or(config.seed);

    println!("\nLoading dataset from {:?}...", data_path);
    let dataset = Dataset::load(data_path)?;
    println!(
        "  '{}' ({}, {} records)",
        dataset.metadata().name,
        dataset.task().name(),
        dataset.len()
    );

    // Progress goes to stderr (line-buffered even when piped).
    eprintln!("\nLoading embeddings from {:?}...", embeddings_path);
    let backend = PrecomputedBackend::load(embeddings_path)?;
    eprintln!(
        "  Model: {} ({} dims, {} vectors)",
        backend.name(),
        backend.dimensions(),
        backend.len()
    );

    eprintln!("\n▶ Evaluating with seed {}...", seed);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let scores = run_task(&dataset, &backend, &config, &mut rng).await?;

    println!("\n┌─ RESULTS ────────────────────────────────────────────────────┐");
    println!(
        "  {:24} {}",
        format!("{}:", dataset.task().name()),
        scores.format_summary()
    );
    println!(
        "  main score ({}): {:.4}",
        dataset.task().main_score(),
        scores.main_score()
    );

    let report = EvalReport::new(&dataset, backend.name(), seed, &config, scores);
    report.save(output)?;
    println!("\nReport saved to {:?}", output);

    Ok(())
}

fn validate_data(path: &PathBuf) -> Result<()> {
    println!("Validating {:?}...", path);

    let dataset = Dataset::load(path)?;

    println!("✓ Valid dataset file");
    println!("  Name: {}", dataset.metadata().name);
    println!("  Task: {}", dataset.task().name());
    if !dataset.metadata().description.is_empty() {
        println!("  Description: {}", dataset.metadata().description);
    }
    println!("  Records: {}", dataset.len());

    match &dataset {
        Dataset::Clustering(d) => {
            let max_depth = d.labels.iter().map(|l| l.levels().len()).max().unwrap_or(0);
            println!("  Label hierarchy depth: {}", max_depth);
        }
        Dataset::Retrieval(d) => {
            println!("  Corpus size: {}", d.corpus.len());
            let judged: usize = d.qrels.values().map(|j| j.len()).sum();
            println!("  Relevance judgments: {}", judged);
        }
        Dataset::Classification(d) => {
            println!("  Train/test split: {}/{}", d.train.len(), d.test.len());
        }
        Dataset::DialogStateTracking(d) => {
            println!("  Slots: {}", d.slots.join(", "));
            println!("  Train/test split: {}/{}", d.train.len(), d.test.len());
        }
        _ => {}
    }

    Ok(())
}

fn list_tasks() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               SUPPORTED TASK FAMILIES                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    for family in TaskFamily::all() {
        println!(
            "  {:24} {:22} {}",
            family.name(),
            format!("[{}]", family.main_score()),
            family.description()
        );
    }

    println!("\nDatasets declare their family in the metadata header:");
    println!();
    println!("  {{ \"metadata\": {{ \"name\": \"my-dataset\", \"task\": \"clustering\" }}, ... }}");
}
