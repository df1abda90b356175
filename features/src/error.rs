use thiserror::Error;

/// Errors returned by feature persistence.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("feat: {0}")]
    Io(String),

    #[error("feat: corrupt file: {0}")]
    CorruptFile(String),

    #[error("feat: unsupported version {got} (want {want})")]
    UnsupportedVersion { got: u32, want: u32 },

    #[error("feat: non-rectangular feature matrix")]
    NonRectangular,
}
