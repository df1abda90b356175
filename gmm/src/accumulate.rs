use voxid_features::FeatureMatrix;

use crate::error::GmmError;
use crate::math::{log_gaussian_diag, log_sum_exp};
use crate::model::GmmModel;
use crate::stats::BwStats;

/// Configures the E-step accumulator.
#[derive(Debug, Clone)]
pub struct AccumulatorOptions {
    /// Floor applied to component weights before taking their log,
    /// preventing -inf for starved components (default: 1e-12).
    pub min_weight: f64,
}

impl Default for AccumulatorOptions {
    fn default() -> Self {
        Self { min_weight: 1e-12 }
    }
}

/// Accumulates Baum-Welch sufficient statistics: the E-step of EM.
///
/// For each frame, computes per-component posterior responsibilities under
/// the mixture and adds the zeroth/first/second-order contributions into a
/// [`BwStats`]. The trainer and enrollment both drive this same routine,
/// so E-step semantics cannot drift between them.
#[derive(Debug, Default)]
pub struct BwStatsAccumulator {
    opt: AccumulatorOptions,
}

impl BwStatsAccumulator {
    pub fn new(opt: AccumulatorOptions) -> Self {
        Self { opt }
    }

    /// Accumulates statistics for `frames` under `model` into `stats`.
    ///
    /// Mutates `stats` only; `model` is read-only. A stats instance whose
    /// shape disagrees with the model is reshaped (and zeroed) first.
    /// Empty input is a no-op. A frame whose length differs from the model
    /// dimension fails with [`GmmError::ShapeMismatch`].
    pub fn accumulate(
        &self,
        stats: &mut BwStats,
        model: &GmmModel,
        frames: &FeatureMatrix,
    ) -> Result<(), GmmError> {
        let k_len = model.num_components;
        let d_len = model.dim;

        if !stats.matches(k_len, d_len) {
            stats.reset(k_len, d_len);
        }

        let mut logp = vec![0.0f64; k_len];

        for x in frames {
            if x.len() != d_len {
                return Err(GmmError::ShapeMismatch {
                    context: "frame dimension",
                    got: x.len(),
                    want: d_len,
                });
            }

            for k in 0..k_len {
                let w = model.weights[k].max(self.opt.min_weight);
                logp[k] = w.ln() + log_gaussian_diag(x, &model.means[k], &model.vars[k]);
            }

            let log_den = log_sum_exp(&logp);
            stats.total_log_likelihood += log_den;
            stats.total_frames += 1;

            for k in 0..k_len {
                let gamma = (logp[k] - log_den).exp();
                stats.occupancy[k] += gamma;

                let wk = &mut stats.weighted_sum[k];
                let sk = &mut stats.weighted_sum_sq[k];
                for d in 0..d_len {
                    let xd = f64::from(x[d]);
                    wk[d] += gamma * xd;
                    sk[d] += gamma * xd * xd;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_component_model() -> GmmModel {
        GmmModel {
            num_components: 2,
            dim: 1,
            weights: vec![0.5, 0.5],
            means: vec![vec![-5.0], vec![5.0]],
            vars: vec![vec![1.0], vec![1.0]],
        }
    }

    #[test]
    fn empty_frames_is_noop() {
        let model = two_component_model();
        let mut stats = BwStats::new(2, 1);
        let acc = BwStatsAccumulator::default();

        acc.accumulate(&mut stats, &model, &vec![]).unwrap();

        assert_eq!(stats.occupancy, vec![0.0, 0.0]);
        assert_eq!(stats.total_frames, 0);
        assert_eq!(stats.total_log_likelihood, 0.0);
    }

    #[test]
    fn occupancy_sums_to_frame_count() {
        let model = two_component_model();
        let mut stats = BwStats::new(2, 1);
        let acc = BwStatsAccumulator::default();

        let frames = vec![vec![-5.0f32], vec![5.0], vec![0.0], vec![2.5]];
        acc.accumulate(&mut stats, &model, &frames).unwrap();

        let total: f64 = stats.occupancy.iter().sum();
        assert!((total - frames.len() as f64).abs() < 1e-9, "got {total}");
        assert_eq!(stats.total_frames, frames.len());
    }

    #[test]
    fn responsibilities_follow_proximity() {
        let model = two_component_model();
        let mut stats = BwStats::new(2, 1);
        let acc = BwStatsAccumulator::default();

        // Frames near +5 should load almost entirely onto component 1.
        let frames = vec![vec![5.0f32], vec![4.8], vec![5.2]];
        acc.accumulate(&mut stats, &model, &frames).unwrap();

        assert!(stats.occupancy[1] > 2.99, "got {}", stats.occupancy[1]);
        assert!(stats.occupancy[0] < 0.01, "got {}", stats.occupancy[0]);
    }

    #[test]
    fn first_and_second_order_track_data() {
        let model = GmmModel {
            num_components: 1,
            dim: 2,
            weights: vec![1.0],
            means: vec![vec![0.0, 0.0]],
            vars: vec![vec![1.0, 1.0]],
        };
        let mut stats = BwStats::new(1, 2);
        let acc = BwStatsAccumulator::default();

        // With one component gamma is exactly 1 for every frame, so the
        // accumulators are plain sums.
        let frames = vec![vec![1.0f32, 2.0], vec![3.0, -1.0]];
        acc.accumulate(&mut stats, &model, &frames).unwrap();

        assert!((stats.occupancy[0] - 2.0).abs() < 1e-12);
        assert!((stats.weighted_sum[0][0] - 4.0).abs() < 1e-9);
        assert!((stats.weighted_sum[0][1] - 1.0).abs() < 1e-9);
        assert!((stats.weighted_sum_sq[0][0] - 10.0).abs() < 1e-9);
        assert!((stats.weighted_sum_sq[0][1] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn dim_mismatch_fails() {
        let model = two_component_model();
        let mut stats = BwStats::new(2, 1);
        let acc = BwStatsAccumulator::default();

        let frames = vec![vec![1.0f32, 2.0]];
        assert!(matches!(
            acc.accumulate(&mut stats, &model, &frames),
            Err(GmmError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn mismatched_stats_reshaped() {
        let model = two_component_model();
        let mut stats = BwStats::new(5, 9);
        let acc = BwStatsAccumulator::default();

        acc.accumulate(&mut stats, &model, &vec![vec![0.0f32]]).unwrap();
        assert!(stats.matches(2, 1));
        assert_eq!(stats.total_frames, 1);
    }

    #[test]
    fn zero_weight_component_survives() {
        // The weight floor keeps log(weight) finite.
        let model = GmmModel {
            num_components: 2,
            dim: 1,
            weights: vec![1.0, 0.0],
            means: vec![vec![0.0], vec![100.0]],
            vars: vec![vec![1.0], vec![1.0]],
        };
        let mut stats = BwStats::new(2, 1);
        let acc = BwStatsAccumulator::default();

        acc.accumulate(&mut stats, &model, &vec![vec![0.0f32]]).unwrap();
        assert!(stats.total_log_likelihood.is_finite());
        assert!(stats.occupancy[0] > 0.99);
    }
}
