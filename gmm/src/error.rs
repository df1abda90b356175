use thiserror::Error;

/// Errors returned by the statistical core and model persistence.
#[derive(Debug, Error)]
pub enum GmmError {
    #[error("gmm: shape mismatch: {context}: got {got}, want {want}")]
    ShapeMismatch {
        context: &'static str,
        got: usize,
        want: usize,
    },

    #[error("gmm: model has zero components or dimension")]
    EmptyModel,

    #[error("gmm: no usable frames: {0}")]
    InsufficientData(&'static str),

    #[error("gmm: {0}")]
    Io(String),

    #[error("gmm: corrupt model file: {0}")]
    CorruptFile(String),

    #[error("gmm: unsupported model version {got} (want {want})")]
    UnsupportedVersion { got: u32, want: u32 },

    #[error(transparent)]
    Feature(#[from] voxid_features::FeatureError),
}
