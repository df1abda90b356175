use crate::error::GmmError;
use crate::model::GmmModel;
use crate::stats::BwStats;

/// Configures MAP adaptation.
#[derive(Debug, Clone)]
pub struct AdaptorOptions {
    /// Relevance factor r in alpha = N / (N + r); controls how much
    /// enrollment data is needed before the speaker's own statistics
    /// outweigh the UBM prior (default: 16.0).
    pub relevance_factor: f64,
    /// Occupancy at or below which a component keeps the UBM mean
    /// unchanged (default: 1e-3).
    pub min_occupancy: f64,
}

impl Default for AdaptorOptions {
    fn default() -> Self {
        Self {
            relevance_factor: 16.0,
            min_occupancy: 1e-3,
        }
    }
}

/// Derives a speaker model from the UBM by MAP adaptation of the means.
///
/// Weights and variances are copied from the UBM unchanged: means-only
/// adaptation keeps the speaker model aligned with the UBM component by
/// component and avoids overfitting variances to sparse enrollment data.
#[derive(Debug, Default)]
pub struct MapAdaptor {
    opt: AdaptorOptions,
}

impl MapAdaptor {
    pub fn new(opt: AdaptorOptions) -> Self {
        Self { opt }
    }

    /// Blends each UBM mean with the speaker's maximum-likelihood mean,
    /// weighted by `alpha = N_k / (N_k + r)`. Components the speaker
    /// barely touched keep the UBM mean.
    ///
    /// `stats` must have been accumulated against `ubm` (same K and D);
    /// fails with [`GmmError::ShapeMismatch`] otherwise, or
    /// [`GmmError::EmptyModel`] for an empty UBM.
    pub fn adapt_means_only(&self, ubm: &GmmModel, stats: &BwStats) -> Result<GmmModel, GmmError> {
        if ubm.is_empty() {
            return Err(GmmError::EmptyModel);
        }
        if stats.num_components != ubm.num_components {
            return Err(GmmError::ShapeMismatch {
                context: "stats components",
                got: stats.num_components,
                want: ubm.num_components,
            });
        }
        if stats.dim != ubm.dim {
            return Err(GmmError::ShapeMismatch {
                context: "stats dimension",
                got: stats.dim,
                want: ubm.dim,
            });
        }

        let mut out = ubm.clone();
        let r = self.opt.relevance_factor;

        for k in 0..ubm.num_components {
            let nk = stats.occupancy[k];
            if nk <= self.opt.min_occupancy {
                continue;
            }

            let alpha = nk / (nk + r);
            for d in 0..ubm.dim {
                let ml_mean = stats.weighted_sum[k][d] / nk;
                out.means[k][d] = alpha * ml_mean + (1.0 - alpha) * ubm.means[k][d];
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ubm_2x1() -> GmmModel {
        GmmModel {
            num_components: 2,
            dim: 1,
            weights: vec![0.4, 0.6],
            means: vec![vec![-5.0], vec![5.0]],
            vars: vec![vec![1.0], vec![2.0]],
        }
    }

    /// Stats as if `n` frames with sample mean `m` landed on component `k`.
    fn stats_for(ubm: &GmmModel, k: usize, n: f64, m: f64) -> BwStats {
        let mut s = BwStats::new(ubm.num_components, ubm.dim);
        s.occupancy[k] = n;
        s.weighted_sum[k][0] = n * m;
        s.weighted_sum_sq[k][0] = n * m * m;
        s.total_frames = n as usize;
        s
    }

    #[test]
    fn zero_occupancy_keeps_ubm_means() {
        let ubm = ubm_2x1();
        let stats = BwStats::new(2, 1);
        let adaptor = MapAdaptor::default();

        let out = adaptor.adapt_means_only(&ubm, &stats).unwrap();
        assert_eq!(out.means, ubm.means);
        assert_eq!(out.weights, ubm.weights);
        assert_eq!(out.vars, ubm.vars);
    }

    #[test]
    fn blend_fraction_is_exact() {
        // 8 frames at +7 on component 1, r = 16:
        // alpha = 8/24, adapted = ubm + alpha * (7 - 5).
        let ubm = ubm_2x1();
        let stats = stats_for(&ubm, 1, 8.0, 7.0);
        let adaptor = MapAdaptor::default();

        let out = adaptor.adapt_means_only(&ubm, &stats).unwrap();

        let alpha = 8.0 / (8.0 + 16.0);
        let want = alpha * 7.0 + (1.0 - alpha) * 5.0;
        assert!((out.means[1][0] - want).abs() < 1e-12);
        // The untouched component is unchanged.
        assert_eq!(out.means[0][0], -5.0);
    }

    #[test]
    fn weights_and_vars_copied() {
        let ubm = ubm_2x1();
        let stats = stats_for(&ubm, 0, 100.0, 0.0);
        let adaptor = MapAdaptor::default();

        let out = adaptor.adapt_means_only(&ubm, &stats).unwrap();
        assert_eq!(out.weights, ubm.weights);
        assert_eq!(out.vars, ubm.vars);
        let sum: f64 = out.weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn relevance_factor_limits() {
        let ubm = ubm_2x1();
        let stats = stats_for(&ubm, 1, 50.0, 7.0);

        // r -> 0: adapted mean approaches the ML (speaker-only) mean.
        let near_ml = MapAdaptor::new(AdaptorOptions {
            relevance_factor: 1e-9,
            ..AdaptorOptions::default()
        });
        let out = near_ml.adapt_means_only(&ubm, &stats).unwrap();
        assert!((out.means[1][0] - 7.0).abs() < 1e-6, "got {}", out.means[1][0]);

        // r -> inf: adapted mean stays at the UBM mean.
        let near_prior = MapAdaptor::new(AdaptorOptions {
            relevance_factor: 1e12,
            ..AdaptorOptions::default()
        });
        let out = near_prior.adapt_means_only(&ubm, &stats).unwrap();
        assert!((out.means[1][0] - 5.0).abs() < 1e-6, "got {}", out.means[1][0]);
    }

    #[test]
    fn more_data_pulls_harder() {
        let ubm = ubm_2x1();
        let adaptor = MapAdaptor::default();

        let little = adaptor
            .adapt_means_only(&ubm, &stats_for(&ubm, 1, 2.0, 7.0))
            .unwrap();
        let lots = adaptor
            .adapt_means_only(&ubm, &stats_for(&ubm, 1, 200.0, 7.0))
            .unwrap();

        let d_little = (little.means[1][0] - 5.0).abs();
        let d_lots = (lots.means[1][0] - 5.0).abs();
        assert!(d_lots > d_little);
        assert!(lots.means[1][0] < 7.0);
    }

    #[test]
    fn empty_ubm_fails() {
        let adaptor = MapAdaptor::default();
        let stats = BwStats::new(0, 0);
        assert!(matches!(
            adaptor.adapt_means_only(&GmmModel::default(), &stats),
            Err(GmmError::EmptyModel)
        ));
    }

    #[test]
    fn shape_mismatch_fails() {
        let ubm = ubm_2x1();
        let adaptor = MapAdaptor::default();

        let stats = BwStats::new(3, 1);
        assert!(matches!(
            adaptor.adapt_means_only(&ubm, &stats),
            Err(GmmError::ShapeMismatch { .. })
        ));

        let stats = BwStats::new(2, 4);
        assert!(matches!(
            adaptor.adapt_means_only(&ubm, &stats),
            Err(GmmError::ShapeMismatch { .. })
        ));
    }
}
