/// Baum-Welch sufficient statistics for one accumulation pass.
///
/// Shape-bound to a specific (K, D); the accumulator keeps it paired with
/// the mixture it is accumulated against. Allocate once per training run
/// and [`BwStats::clear`] between EM iterations to avoid reallocation.
/// Not a thread-safe accumulation target: concurrent passes must use one
/// instance per worker and merge afterwards.
#[derive(Debug, Clone, Default)]
pub struct BwStats {
    /// Number of components (K).
    pub num_components: usize,
    /// Feature dimension (D).
    pub dim: usize,

    /// Zeroth order: summed responsibilities per component, K entries.
    pub occupancy: Vec<f64>,
    /// First order: responsibility-weighted frame sums, K x D.
    pub weighted_sum: Vec<Vec<f64>>,
    /// Second order: responsibility-weighted squared-frame sums, K x D.
    pub weighted_sum_sq: Vec<Vec<f64>>,

    /// Sum of per-frame log-likelihoods under the mixture.
    pub total_log_likelihood: f64,
    /// Number of frames accumulated.
    pub total_frames: usize,
}

impl BwStats {
    /// Allocates zeroed statistics for a (K, D) mixture.
    pub fn new(num_components: usize, dim: usize) -> Self {
        let mut s = Self::default();
        s.reset(num_components, dim);
        s
    }

    /// Reshapes to (K, D) and zeroes everything.
    pub fn reset(&mut self, num_components: usize, dim: usize) {
        self.num_components = num_components;
        self.dim = dim;
        self.occupancy = vec![0.0; num_components];
        self.weighted_sum = vec![vec![0.0; dim]; num_components];
        self.weighted_sum_sq = vec![vec![0.0; dim]; num_components];
        self.total_log_likelihood = 0.0;
        self.total_frames = 0;
    }

    /// Zeroes all accumulators in place, keeping the allocation.
    pub fn clear(&mut self) {
        self.occupancy.fill(0.0);
        for row in &mut self.weighted_sum {
            row.fill(0.0);
        }
        for row in &mut self.weighted_sum_sq {
            row.fill(0.0);
        }
        self.total_log_likelihood = 0.0;
        self.total_frames = 0;
    }

    /// True when the stats shape matches (K, D).
    pub fn matches(&self, num_components: usize, dim: usize) -> bool {
        self.num_components == num_components && self.dim == dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_zeroed() {
        let s = BwStats::new(3, 2);
        assert_eq!(s.occupancy, vec![0.0; 3]);
        assert_eq!(s.weighted_sum.len(), 3);
        assert_eq!(s.weighted_sum[0].len(), 2);
        assert_eq!(s.total_frames, 0);
        assert_eq!(s.total_log_likelihood, 0.0);
    }

    #[test]
    fn clear_keeps_shape() {
        let mut s = BwStats::new(2, 2);
        s.occupancy[0] = 5.0;
        s.weighted_sum[1][0] = 1.0;
        s.weighted_sum_sq[0][1] = 2.0;
        s.total_log_likelihood = -10.0;
        s.total_frames = 7;

        s.clear();

        assert!(s.matches(2, 2));
        assert_eq!(s.occupancy, vec![0.0, 0.0]);
        assert_eq!(s.weighted_sum[1][0], 0.0);
        assert_eq!(s.weighted_sum_sq[0][1], 0.0);
        assert_eq!(s.total_log_likelihood, 0.0);
        assert_eq!(s.total_frames, 0);
    }

    #[test]
    fn reset_reshapes() {
        let mut s = BwStats::new(2, 2);
        s.reset(4, 3);
        assert!(s.matches(4, 3));
        assert_eq!(s.weighted_sum[3].len(), 3);
    }
}
