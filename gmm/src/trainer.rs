use std::path::PathBuf;

use tracing::debug;
use voxid_features::{FeatureMatrix, load_feature_file};

use crate::accumulate::{AccumulatorOptions, BwStatsAccumulator};
use crate::error::GmmError;
use crate::model::GmmModel;
use crate::rng::Xoshiro256ss;
use crate::stats::BwStats;

/// Configures UBM training.
#[derive(Debug, Clone)]
pub struct TrainerOptions {
    /// Number of mixture components K (default: 64).
    pub num_components: usize,
    /// Maximum EM iterations (default: 10).
    pub max_iterations: usize,
    /// Variance floor as a fraction of the global per-dimension variance
    /// (default: 1e-2).
    pub variance_floor: f64,
    /// Occupancy below which a component is reinitialized instead of
    /// re-estimated (default: 10.0).
    pub min_component_occupancy: f64,
    /// Weight floor applied in the M-step and E-step (default: 1e-8).
    pub min_weight: f64,
    /// PRNG seed; same seed reproduces the same initial model
    /// (default: 777).
    pub seed: u64,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            num_components: 64,
            max_iterations: 10,
            variance_floor: 1e-2,
            min_component_occupancy: 10.0,
            min_weight: 1e-8,
            seed: 777,
        }
    }
}

/// Per-dimension global mean and population variance of the training
/// corpus. Drives initialization and the variance floor.
struct GlobalStats {
    dim: usize,
    mean: Vec<f64>,
    var: Vec<f64>,
}

/// A training corpus the EM loop can sweep multiple times.
///
/// The two shapes are a set of in-memory matrices and a set of `.lvf`
/// files reloaded each pass, so the corpus never has to fit in memory.
trait Corpus {
    fn for_each_matrix(
        &self,
        visit: &mut dyn FnMut(&FeatureMatrix) -> Result<(), GmmError>,
    ) -> Result<(), GmmError>;
}

impl Corpus for [FeatureMatrix] {
    fn for_each_matrix(
        &self,
        visit: &mut dyn FnMut(&FeatureMatrix) -> Result<(), GmmError>,
    ) -> Result<(), GmmError> {
        for m in self {
            visit(m)?;
        }
        Ok(())
    }
}

impl Corpus for [PathBuf] {
    fn for_each_matrix(
        &self,
        visit: &mut dyn FnMut(&FeatureMatrix) -> Result<(), GmmError>,
    ) -> Result<(), GmmError> {
        for p in self {
            let feat = load_feature_file(p)?;
            visit(&feat.matrix)?;
        }
        Ok(())
    }
}

/// Fits a universal background model by expectation-maximization.
///
/// The trainer owns its PRNG (seeded from [`TrainerOptions::seed`]) and a
/// statistics buffer reused across iterations. Training is a batch loop:
/// it runs to convergence or `max_iterations` and returns the final model;
/// no intermediate model is observable.
pub struct UbmTrainer {
    opt: TrainerOptions,
    accumulator: BwStatsAccumulator,
    rng: Xoshiro256ss,
}

impl UbmTrainer {
    pub fn new(opt: TrainerOptions) -> Self {
        let accumulator = BwStatsAccumulator::new(AccumulatorOptions {
            min_weight: opt.min_weight,
        });
        let rng = Xoshiro256ss::new(opt.seed);
        Self {
            opt,
            accumulator,
            rng,
        }
    }

    /// Trains a UBM over an in-memory corpus of feature matrices.
    ///
    /// Fails with [`GmmError::InsufficientData`] when the corpus holds no
    /// frames. When it holds fewer frames than components, every component
    /// is seeded from the same global mean with a small random
    /// perturbation, which can leave near-duplicate components; callers
    /// wanting distinct components must supply at least K frames.
    pub fn train(&mut self, corpus: &[FeatureMatrix]) -> Result<GmmModel, GmmError> {
        self.train_corpus(corpus)
    }

    /// Trains a UBM by streaming `.lvf` feature files from disk, reloading
    /// each file every pass. Same algorithm and result as [`UbmTrainer::train`]
    /// on the loaded matrices.
    pub fn train_from_files(&mut self, paths: &[PathBuf]) -> Result<GmmModel, GmmError> {
        self.train_corpus(paths)
    }

    fn train_corpus<C: Corpus + ?Sized>(&mut self, corpus: &C) -> Result<GmmModel, GmmError> {
        let gs = compute_global_stats(corpus)?;

        let mut model = self.init_model(&gs, corpus)?;
        let mut stats = BwStats::new(model.num_components, model.dim);

        let mut prev_avg_ll = f64::NEG_INFINITY;

        for iteration in 0..self.opt.max_iterations {
            stats.clear();

            corpus.for_each_matrix(&mut |m| self.accumulator.accumulate(&mut stats, &model, m))?;

            let avg_ll = stats.total_log_likelihood / stats.total_frames.max(1) as f64;

            debug!(
                iteration,
                frames = stats.total_frames,
                avg_log_likelihood = avg_ll,
                "ubm training iteration"
            );

            self.maximize(&mut model, &stats, &gs)?;

            if iteration > 0 && (avg_ll - prev_avg_ll).abs() < 1e-4 {
                debug!(iteration, "ubm training converged");
                break;
            }
            prev_avg_ll = avg_ll;
        }

        Ok(model)
    }

    /// Uniform weights, global variance, reservoir-sampled means.
    fn init_model<C: Corpus + ?Sized>(
        &mut self,
        gs: &GlobalStats,
        corpus: &C,
    ) -> Result<GmmModel, GmmError> {
        let k_len = self.opt.num_components;
        let d_len = gs.dim;

        let mut model = GmmModel {
            num_components: k_len,
            dim: d_len,
            weights: vec![1.0 / k_len as f64; k_len],
            means: vec![vec![0.0; d_len]; k_len],
            vars: vec![vec![0.0; d_len]; k_len],
        };

        for k in 0..k_len {
            for d in 0..d_len {
                model.vars[k][d] = gs.var[d].max(1e-12);
            }
        }

        // Classic reservoir sample of K frames drawn uniformly without
        // replacement from the full frame stream.
        let mut picked: Vec<Vec<f64>> = Vec::with_capacity(k_len);
        let mut seen = 0usize;
        corpus.for_each_matrix(&mut |m| {
            for x in m {
                seen += 1;
                if picked.len() < k_len {
                    picked.push(x.iter().map(|&v| f64::from(v)).collect());
                } else {
                    let j = self.rng.uniform_below(seen);
                    if j < k_len {
                        picked[j] = x.iter().map(|&v| f64::from(v)).collect();
                    }
                }
            }
            Ok(())
        })?;

        if picked.len() < k_len {
            // Degenerate corpus: fewer frames than components. All
            // components fall back to perturbed global statistics.
            for k in 0..k_len {
                self.reinit_component(&mut model, k, gs);
            }
            return Ok(model);
        }

        for k in 0..k_len {
            model.means[k].clone_from(&picked[k]);
        }

        Ok(model)
    }

    /// M-step: re-estimate weights, means, and variances from accumulated
    /// statistics, reinitializing components that lost their data.
    ///
    /// Reinitialization overwrites a starved component's weight with `1/K`
    /// after the renormalization above it, so on iterations where a
    /// component restarts the weight vector can sum to slightly more than
    /// one. The next E-step absorbs the excess through the shared
    /// denominator; a model whose final iteration reinitialized carries it.
    fn maximize(
        &mut self,
        model: &mut GmmModel,
        stats: &BwStats,
        gs: &GlobalStats,
    ) -> Result<(), GmmError> {
        let k_len = model.num_components;
        let d_len = model.dim;

        let total = stats.total_frames as f64;
        if total <= 0.0 {
            return Err(GmmError::InsufficientData("no frames accumulated"));
        }

        for k in 0..k_len {
            model.weights[k] = (stats.occupancy[k] / total).max(self.opt.min_weight);
        }
        let wsum: f64 = model.weights.iter().sum();
        for w in &mut model.weights {
            *w /= wsum;
        }

        for k in 0..k_len {
            let nk = stats.occupancy[k];

            if nk < self.opt.min_component_occupancy {
                // The component got essentially no data this iteration;
                // its statistics are unreliable, so restart it near the
                // global distribution rather than updating from them.
                self.reinit_component(model, k, gs);
                continue;
            }

            for d in 0..d_len {
                let mean = stats.weighted_sum[k][d] / nk;
                let ex2 = stats.weighted_sum_sq[k][d] / nk;
                let mut var = ex2 - mean * mean;

                let floor = self.opt.variance_floor * gs.var[d].max(1e-12);
                if var < floor {
                    var = floor;
                }

                model.means[k][d] = mean;
                model.vars[k][d] = var;
            }
        }

        Ok(())
    }

    fn reinit_component(&mut self, model: &mut GmmModel, k: usize, gs: &GlobalStats) {
        model.weights[k] = 1.0 / model.num_components as f64;

        for d in 0..model.dim {
            let sigma = gs.var[d].max(1e-12).sqrt();
            model.means[k][d] = gs.mean[d] + 0.1 * sigma * self.rng.norm_float64();
            model.vars[k][d] = gs.var[d].max(1e-12);
        }
    }
}

/// One pass for the per-dimension mean, one for the population variance.
fn compute_global_stats<C: Corpus + ?Sized>(corpus: &C) -> Result<GlobalStats, GmmError> {
    let mut dim = 0usize;
    corpus.for_each_matrix(&mut |m| {
        if dim == 0 {
            if let Some(first) = m.first() {
                dim = first.len();
            }
        }
        Ok(())
    })?;
    if dim == 0 {
        return Err(GmmError::InsufficientData("corpus has no frames"));
    }

    let mut mean = vec![0.0f64; dim];
    let mut frames = 0usize;
    corpus.for_each_matrix(&mut |m| {
        for x in m {
            if x.len() != dim {
                return Err(GmmError::ShapeMismatch {
                    context: "frame dimension",
                    got: x.len(),
                    want: dim,
                });
            }
            frames += 1;
            for d in 0..dim {
                mean[d] += f64::from(x[d]);
            }
        }
        Ok(())
    })?;
    if frames == 0 {
        return Err(GmmError::InsufficientData("corpus has no frames"));
    }
    for v in &mut mean {
        *v /= frames as f64;
    }

    let mut var = vec![0.0f64; dim];
    corpus.for_each_matrix(&mut |m| {
        for x in m {
            for d in 0..dim {
                let diff = f64::from(x[d]) - mean[d];
                var[d] += diff * diff;
            }
        }
        Ok(())
    })?;
    for v in &mut var {
        *v /= frames as f64;
    }

    Ok(GlobalStats { dim, mean, var })
}
