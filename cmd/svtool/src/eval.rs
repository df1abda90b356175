//! Speaker-verification evaluation: genuine and impostor trials over a
//! corpus of per-speaker feature directories, with FRR/FAR at a
//! midpoint-of-medians threshold.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use voxid_features::load_feature_file;
use voxid_gmm::{
    AdaptorOptions, BwStats, BwStatsAccumulator, GmmModel, LlrScorer, MapAdaptor, Xoshiro256ss,
};

use crate::corpus::SpeakerData;

#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Number of speakers to evaluate (fewer are used when the corpus is
    /// smaller).
    pub target_speakers: usize,
    /// Utterances per speaker used for enrollment.
    pub enroll_n: usize,
    /// Utterances per speaker held out for testing.
    pub test_m: usize,
    /// Impostor trials per speaker.
    pub impostors_per_speaker: usize,
    /// MAP relevance factor for enrollment.
    pub relevance_factor: f64,
    /// Seed for speaker sampling and impostor selection.
    pub seed: u64,
    /// Print each trial as it is scored.
    pub verbose: bool,
}

/// Summary statistics for one score population.
#[derive(Debug, Serialize)]
pub struct ScoreSummary {
    pub n: usize,
    pub mean: f64,
    pub median: f64,
}

/// Full evaluation output, serializable as a JSON report.
#[derive(Debug, Serialize)]
pub struct Report {
    pub speakers: usize,
    pub enroll_n: usize,
    pub test_m: usize,
    pub impostors_per_speaker: usize,
    pub genuine: ScoreSummary,
    pub impostor: ScoreSummary,
    pub threshold: f64,
    pub false_reject_rate: f64,
    pub false_accept_rate: f64,
    pub ubm_vs_ubm: f64,
}

fn mean(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / v.len() as f64
}

fn median(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let mut sorted = v.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

fn summarize(scores: &[f64]) -> ScoreSummary {
    ScoreSummary {
        n: scores.len(),
        mean: mean(scores),
        median: median(scores),
    }
}

fn shuffle<T>(v: &mut [T], rng: &mut Xoshiro256ss) {
    for i in (1..v.len()).rev() {
        let j = rng.uniform_below(i + 1);
        v.swap(i, j);
    }
}

fn enroll_speaker(
    ubm: &GmmModel,
    files: &[std::path::PathBuf],
    relevance_factor: f64,
) -> Result<GmmModel> {
    let acc = BwStatsAccumulator::default();
    let adaptor = MapAdaptor::new(AdaptorOptions {
        relevance_factor,
        ..AdaptorOptions::default()
    });

    let mut stats = BwStats::new(ubm.num_components, ubm.dim);
    for path in files {
        let feat = load_feature_file(path)
            .with_context(|| format!("load feature {}", path.display()))?;
        acc.accumulate(&mut stats, ubm, &feat.matrix)
            .with_context(|| format!("accumulate {}", path.display()))?;
    }
    Ok(adaptor.adapt_means_only(ubm, &stats)?)
}

/// Runs the full evaluation protocol against a trained UBM.
///
/// Speakers with fewer than `enroll_n + test_m` utterances are dropped;
/// the remainder are shuffled deterministically, truncated to
/// `target_speakers`, and split into enrollment and test utterances. Every
/// speaker model scores its own held-out files (genuine) and randomly
/// chosen other speakers' files (impostor).
pub fn run(ubm: &GmmModel, mut speakers: Vec<SpeakerData>, cfg: &EvalConfig) -> Result<Report> {
    if cfg.enroll_n == 0 || cfg.test_m == 0 {
        bail!("enroll and test counts must be positive");
    }
    let needed = cfg.enroll_n + cfg.test_m;
    speakers.retain(|s| s.files.len() >= needed);
    if speakers.len() < 2 {
        bail!("need at least 2 speakers with {needed} utterances each, got {}", speakers.len());
    }

    let mut rng = Xoshiro256ss::new(cfg.seed);
    shuffle(&mut speakers, &mut rng);
    speakers.truncate(cfg.target_speakers);
    // Impostor trials draw from the other speakers, so one survivor
    // would leave nothing to draw from.
    if speakers.len() < 2 {
        bail!("need at least 2 speakers after sampling, got {}", speakers.len());
    }

    // First N utterances enroll, last M test.
    for s in &mut speakers {
        s.enroll = s.files[..cfg.enroll_n].to_vec();
        s.test = s.files[s.files.len() - cfg.test_m..].to_vec();
    }

    let scorer = LlrScorer::default();

    let mut models = Vec::with_capacity(speakers.len());
    for s in &speakers {
        let model = enroll_speaker(ubm, &s.enroll, cfg.relevance_factor)
            .with_context(|| format!("enroll speaker {}", s.id))?;
        models.push(model);
    }

    let mut genuine_scores = Vec::new();
    for (s, model) in speakers.iter().zip(&models) {
        for path in &s.test {
            let feat = load_feature_file(path)?;
            let score = scorer.score(model, ubm, &feat.matrix)?;
            if cfg.verbose {
                println!("genuine  {} vs {} ({}): {score:.4}", s.id, s.id, display_name(path));
            }
            genuine_scores.push(score);
        }
    }

    let mut impostor_scores = Vec::new();
    for (s, model) in speakers.iter().zip(&models) {
        let mut added = 0;
        while added < cfg.impostors_per_speaker {
            let j = rng.uniform_below(speakers.len());
            if speakers[j].id == s.id {
                continue;
            }
            let other = &speakers[j];
            let path = &other.test[rng.uniform_below(other.test.len())];

            let feat = load_feature_file(path)?;
            let score = scorer.score(model, ubm, &feat.matrix)?;
            if cfg.verbose {
                println!("impostor {} vs {} ({}): {score:.4}", s.id, other.id, display_name(path));
            }
            impostor_scores.push(score);
            added += 1;
        }
    }

    let genuine = summarize(&genuine_scores);
    let impostor = summarize(&impostor_scores);
    let threshold = 0.5 * (genuine.median + impostor.median);

    let false_rejects = genuine_scores.iter().filter(|&&s| s < threshold).count();
    let false_accepts = impostor_scores.iter().filter(|&&s| s >= threshold).count();

    // Sanity: the UBM against itself must be exactly neutral.
    let sanity_feat = load_feature_file(&speakers[0].test[0])?;
    let ubm_vs_ubm = scorer.score(ubm, ubm, &sanity_feat.matrix)?;

    Ok(Report {
        speakers: speakers.len(),
        enroll_n: cfg.enroll_n,
        test_m: cfg.test_m,
        impostors_per_speaker: cfg.impostors_per_speaker,
        threshold,
        false_reject_rate: false_rejects as f64 / genuine.n.max(1) as f64,
        false_accept_rate: false_accepts as f64 / impostor.n.max(1) as f64,
        genuine,
        impostor,
        ubm_vs_ubm,
    })
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn print_summary(report: &Report) {
    println!("\n=== Summary ===");
    println!(
        "speakers={} enroll_n={} test_m={} impostors_per_speaker={}",
        report.speakers, report.enroll_n, report.test_m, report.impostors_per_speaker
    );
    println!(
        "genuine:  n={} mean={:.4} median={:.4}",
        report.genuine.n, report.genuine.mean, report.genuine.median
    );
    println!(
        "impostor: n={} mean={:.4} median={:.4}",
        report.impostor.n, report.impostor.mean, report.impostor.median
    );
    println!("threshold (midpoint of medians) = {:.4}", report.threshold);
    println!("FRR (genuine rejected)  = {:.4}", report.false_reject_rate);
    println!("FAR (impostor accepted) = {:.4}", report.false_accept_rate);
    println!("UBM vs UBM (sanity)     = {:.4}", report.ubm_vs_ubm);
}
