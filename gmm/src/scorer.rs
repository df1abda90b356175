use voxid_features::FeatureMatrix;

use crate::error::GmmError;
use crate::math::{log_gaussian_diag, log_sum_exp};
use crate::model::GmmModel;

/// Configures LLR scoring.
#[derive(Debug, Clone)]
pub struct ScorerOptions {
    /// Floor applied to component weights before taking their log
    /// (default: 1e-12).
    pub min_weight: f64,
    /// Divide the log-likelihood ratio by the frame count so scores are
    /// comparable across utterances of different length (default: true).
    pub normalize_by_frames: bool,
}

impl Default for ScorerOptions {
    fn default() -> Self {
        Self {
            min_weight: 1e-12,
            normalize_by_frames: true,
        }
    }
}

/// Scores a test utterance as a speaker-vs-UBM log-likelihood ratio.
#[derive(Debug, Default)]
pub struct LlrScorer {
    opt: ScorerOptions,
}

impl LlrScorer {
    pub fn new(opt: ScorerOptions) -> Self {
        Self { opt }
    }

    /// Sum over frames of the per-frame log-likelihood under `model`,
    /// using the same per-frame density math as the E-step.
    ///
    /// Fails with [`GmmError::EmptyModel`] for a zero-shape model and
    /// [`GmmError::ShapeMismatch`] when any frame length differs from the
    /// model dimension.
    pub fn sum_log_likelihood(
        &self,
        model: &GmmModel,
        frames: &FeatureMatrix,
    ) -> Result<f64, GmmError> {
        if model.is_empty() {
            return Err(GmmError::EmptyModel);
        }
        let k_len = model.num_components;
        let d_len = model.dim;

        let mut logp = vec![0.0f64; k_len];
        let mut sum = 0.0;

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
            sum += log_sum_exp(&logp);
        }

        Ok(sum)
    }

    /// Per-frame average log-likelihood; 0.0 for an empty utterance.
    /// Diagnostic companion to [`LlrScorer::score`].
    pub fn avg_log_likelihood(
        &self,
        model: &GmmModel,
        frames: &FeatureMatrix,
    ) -> Result<f64, GmmError> {
        if frames.is_empty() {
            return Ok(0.0);
        }
        let ll = self.sum_log_likelihood(model, frames)?;
        Ok(ll / frames.len() as f64)
    }

    /// The GMM-UBM verification score: log-likelihood of the utterance
    /// under the speaker model minus its log-likelihood under the UBM,
    /// frame-normalized when configured. An empty utterance scores 0.0 by
    /// definition, not as an error.
    pub fn score(
        &self,
        speaker: &GmmModel,
        ubm: &GmmModel,
        frames: &FeatureMatrix,
    ) -> Result<f64, GmmError> {
        if frames.is_empty() {
            return Ok(0.0);
        }

        let ll_speaker = self.sum_log_likelihood(speaker, frames)?;
        let ll_ubm = self.sum_log_likelihood(ubm, frames)?;

        if self.opt.normalize_by_frames {
            Ok((ll_speaker - ll_ubm) / frames.len() as f64)
        } else {
            Ok(ll_speaker - ll_ubm)
        }
    }
}
