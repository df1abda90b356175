//! svtool - Speaker-verification driver over `.lvf` feature corpora.

mod corpus;
mod eval;

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use voxid_features::load_feature_file;
use voxid_gmm::{
    AdaptorOptions, BwStats, BwStatsAccumulator, MapAdaptor, TrainerOptions, UbmTrainer,
    load_model_file, save_model_file,
};

/// Speaker-verification driver: UBM training, enrollment, evaluation.
#[derive(Parser, Debug)]
#[command(name = "svtool")]
#[command(about = "Speaker-verification driver: UBM training, enrollment, evaluation")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a universal background model from pooled feature files
    TrainUbm {
        /// Directory of background .lvf files (searched recursively)
        #[arg(long)]
        features: PathBuf,

        /// Output model path
        #[arg(short, long)]
        out: PathBuf,

        /// Number of mixture components
        #[arg(long, default_value_t = 64)]
        components: usize,

        /// Maximum EM iterations
        #[arg(long, default_value_t = 10)]
        iterations: usize,

        /// PRNG seed for initialization
        #[arg(long, default_value_t = 777)]
        seed: u64,
    },

    /// Enroll a speaker: MAP-adapt the UBM to one speaker's features
    Enroll {
        /// Trained UBM model path
        #[arg(long)]
        ubm: PathBuf,

        /// Directory of the speaker's .lvf files (searched recursively)
        #[arg(long)]
        features: PathBuf,

        /// Output speaker model path
        #[arg(short, long)]
        out: PathBuf,

        /// MAP relevance factor
        #[arg(long, default_value_t = 16.0)]
        relevance: f64,
    },

    /// Run genuine/impostor trials over a per-speaker directory tree
    Eval {
        /// Trained UBM model path
        #[arg(long)]
        ubm: PathBuf,

        /// Root of per-speaker .lvf directories
        #[arg(long)]
        features: PathBuf,

        /// Number of speakers to evaluate
        #[arg(long, default_value_t = 30)]
        speakers: usize,

        /// Enrollment utterances per speaker
        #[arg(long, default_value_t = 5)]
        enroll: usize,

        /// Test utterances per speaker
        #[arg(long, default_value_t = 2)]
        test: usize,

        /// Impostor trials per speaker
        #[arg(long, default_value_t = 5)]
        impostors: usize,

        /// MAP relevance factor for enrollment
        #[arg(long, default_value_t = 16.0)]
        relevance: f64,

        /// Seed for speaker sampling
        #[arg(long, default_value_t = 777)]
        seed: u64,

        /// Write the report as JSON to this path
        #[arg(short = 'o', long)]
        report: Option<PathBuf>,

        /// Print every trial as it is scored
        #[arg(short = 'v', long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match Args::parse().command {
        Command::TrainUbm {
            features,
            out,
            components,
            iterations,
            seed,
        } => train_ubm(features, out, components, iterations, seed),
        Command::Enroll {
            ubm,
            features,
            out,
            relevance,
        } => enroll(ubm, features, out, relevance),
        Command::Eval {
            ubm,
            features,
            speakers,
            enroll,
            test,
            impostors,
            relevance,
            seed,
            report,
            verbose,
        } => evaluate(
            ubm, features, speakers, enroll, test, impostors, relevance, seed, report, verbose,
        ),
    }
}

fn train_ubm(
    features: PathBuf,
    out: PathBuf,
    components: usize,
    iterations: usize,
    seed: u64,
) -> Result<()> {
    let files = corpus::collect_lvf_files(&features)?;
    if files.is_empty() {
        bail!("no .lvf files under {}", features.display());
    }
    println!("training UBM: {} files, K={components}", files.len());

    let mut trainer = UbmTrainer::new(TrainerOptions {
        num_components: components,
        max_iterations: iterations,
        seed,
        ..TrainerOptions::default()
    });
    let ubm = trainer
        .train_from_files(&files)
        .context("UBM training failed")?;

    save_model_file(&out, &ubm).with_context(|| format!("save model {}", out.display()))?;
    println!("saved UBM to {}", out.display());
    Ok(())
}

fn enroll(ubm_path: PathBuf, features: PathBuf, out: PathBuf, relevance: f64) -> Result<()> {
    let ubm = load_model_file(&ubm_path)
        .with_context(|| format!("load UBM {}", ubm_path.display()))?;

    let files = corpus::collect_lvf_files(&features)?;
    if files.is_empty() {
        bail!("no .lvf files under {}", features.display());
    }

    let acc = BwStatsAccumulator::default();
    let mut stats = BwStats::new(ubm.num_components, ubm.dim);
    for path in &files {
        let feat = load_feature_file(path)
            .with_context(|| format!("load feature {}", path.display()))?;
        acc.accumulate(&mut stats, &ubm, &feat.matrix)
            .with_context(|| format!("accumulate {}", path.display()))?;
    }

    let adaptor = MapAdaptor::new(AdaptorOptions {
        relevance_factor: relevance,
        ..AdaptorOptions::default()
    });
    let speaker = adaptor.adapt_means_only(&ubm, &stats)?;

    save_model_file(&out, &speaker).with_context(|| format!("save model {}", out.display()))?;
    println!(
        "enrolled {} files ({} frames) -> {}",
        files.len(),
        stats.total_frames,
        out.display()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn evaluate(
    ubm_path: PathBuf,
    features: PathBuf,
    speakers: usize,
    enroll: usize,
    test: usize,
    impostors: usize,
    relevance: f64,
    seed: u64,
    report_path: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let ubm = load_model_file(&ubm_path)
        .with_context(|| format!("load UBM {}", ubm_path.display()))?;
    let all_speakers = corpus::collect_speakers(&features)?;

    let cfg = eval::EvalConfig {
        target_speakers: speakers,
        enroll_n: enroll,
        test_m: test,
        impostors_per_speaker: impostors,
        relevance_factor: relevance,
        seed,
        verbose,
    };
    let report = eval::run(&ubm, all_speakers, &cfg)?;

    eval::print_summary(&report);

    if let Some(path) = report_path {
        let file =
            File::create(&path).with_context(|| format!("create report {}", path.display()))?;
        serde_json::to_writer_pretty(file, &report)?;
        println!("wrote report to {}", path.display());
    }
    Ok(())
}
