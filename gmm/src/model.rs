use crate::error::GmmError;

/// A diagonal-covariance Gaussian mixture model.
///
/// `weights`, `means`, and `vars` are indexed by component; each mean and
/// variance row has length [`GmmModel::dim`]. Once trained (or adapted) a
/// model is read-only, so concurrent scoring against a shared model needs
/// no locking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GmmModel {
    /// Number of mixture components (K).
    pub num_components: usize,
    /// Feature dimension (D).
    pub dim: usize,

    /// Component priors, K entries summing to 1.
    pub weights: Vec<f64>,
    /// Component means, K x D.
    pub means: Vec<Vec<f64>>,
    /// Diagonal variances, K x D, every entry strictly positive.
    pub vars: Vec<Vec<f64>>,
}

impl GmmModel {
    /// True when the model has no components or no dimensions.
    pub fn is_empty(&self) -> bool {
        self.num_components == 0 || self.dim == 0
    }

    /// Checks that every declared array length matches `num_components`
    /// and `dim`. Run before serialization and after deserialization.
    pub fn validate(&self) -> Result<(), GmmError> {
        if self.is_empty() {
            return Err(GmmError::EmptyModel);
        }
        if self.weights.len() != self.num_components {
            return Err(GmmError::ShapeMismatch {
                context: "weights length",
                got: self.weights.len(),
                want: self.num_components,
            });
        }
        if self.means.len() != self.num_components {
            return Err(GmmError::ShapeMismatch {
                context: "means length",
                got: self.means.len(),
                want: self.num_components,
            });
        }
        if self.vars.len() != self.num_components {
            return Err(GmmError::ShapeMismatch {
                context: "vars length",
                got: self.vars.len(),
                want: self.num_components,
            });
        }
        for k in 0..self.num_components {
            if self.means[k].len() != self.dim {
                return Err(GmmError::ShapeMismatch {
                    context: "mean row length",
                    got: self.means[k].len(),
                    want: self.dim,
                });
            }
            if self.vars[k].len() != self.dim {
                return Err(GmmError::ShapeMismatch {
                    context: "var row length",
                    got: self.vars[k].len(),
                    want: self.dim,
                });
            }
        }
        Ok(())
    }
}
