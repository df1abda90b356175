use std::fmt;

use crate::error::FeatureError;

/// A sequence of feature frames, one row per frame.
/// Every row must have the same length (the feature dimension).
pub type FeatureMatrix = Vec<Vec<f32>>;

/// Kind of cepstral coefficients stored in a [`Feature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CepstralType {
    Mfcc = 0,
    Lpcc = 1,
    Plp = 2,
}

impl CepstralType {
    pub(crate) fn from_u32(v: u32) -> Result<Self, FeatureError> {
        match v {
            0 => Ok(Self::Mfcc),
            1 => Ok(Self::Lpcc),
            2 => Ok(Self::Plp),
            _ => Err(FeatureError::CorruptFile(format!(
                "unknown cepstral type {v}"
            ))),
        }
    }
}

impl fmt::Display for CepstralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mfcc => write!(f, "mfcc"),
            Self::Lpcc => write!(f, "lpcc"),
            Self::Plp => write!(f, "plp"),
        }
    }
}

/// Per-frame voice-activity-detection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadState {
    Silence = 0,
    Speech = 1,
}

impl VadState {
    pub(crate) fn from_u8(v: u8) -> Result<Self, FeatureError> {
        match v {
            0 => Ok(Self::Silence),
            1 => Ok(Self::Speech),
            _ => Err(FeatureError::CorruptFile(format!("unknown VAD state {v}"))),
        }
    }
}

/// Settings the upstream extractor used to produce a feature matrix.
///
/// Carried verbatim through the `.lvf` format so a cached file can be
/// matched against an extraction configuration. The `filterbank`,
/// `mel_scale`, and `compression` fields are raw enum codes from the
/// extractor and are not interpreted here.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureOptions {
    /// Input sample rate in Hz.
    pub sample_rate: i32,
    /// Number of filterbank channels.
    pub num_filters: i32,
    /// Number of cepstral coefficients per frame.
    pub num_coeffs: i32,
    /// Low cutoff frequency in Hz.
    pub min_freq: f64,
    /// High cutoff frequency in Hz.
    pub max_freq: f64,
    /// Whether frame energy is appended as an extra coefficient.
    pub include_energy: bool,
    /// Filterbank type code (opaque).
    pub filterbank: u32,
    /// Mel scale code (opaque).
    pub mel_scale: u32,
    /// Compression type code (opaque).
    pub compression: u32,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            num_filters: 26,
            num_coeffs: 13,
            min_freq: 0.0,
            max_freq: 8000.0,
            include_energy: true,
            filterbank: 0,
            mel_scale: 0,
            compression: 0,
        }
    }
}

/// An extracted utterance: the computed matrix plus everything needed to
/// identify how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Kind of coefficients in `matrix`.
    pub cepstral_type: CepstralType,
    /// Extraction settings used upstream.
    pub options: FeatureOptions,
    /// Frames x coefficients.
    pub matrix: FeatureMatrix,
    /// Per-frame VAD flags. May be empty; when present, one per frame.
    pub vad: Vec<VadState>,
}

impl Feature {
    /// Number of frames in the matrix.
    pub fn num_frames(&self) -> usize {
        self.matrix.len()
    }

    /// Feature dimension, or 0 for an empty matrix.
    pub fn dim(&self) -> usize {
        self.matrix.first().map_or(0, Vec::len)
    }
}

impl Default for Feature {
    fn default() -> Self {
        Self {
            cepstral_type: CepstralType::Mfcc,
            options: FeatureOptions::default(),
            matrix: Vec::new(),
            vad: Vec::new(),
        }
    }
}

/// Returns true when every row of the matrix has the same length.
/// An empty matrix is rectangular.
pub fn is_rectangular(m: &FeatureMatrix) -> bool {
    match m.first() {
        None => true,
        Some(first) => {
            let cols = first.len();
            m.iter().all(|row| row.len() == cols)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cepstral_type_codes() {
        assert_eq!(CepstralType::from_u32(0).unwrap(), CepstralType::Mfcc);
        assert_eq!(CepstralType::from_u32(2).unwrap(), CepstralType::Plp);
        assert!(CepstralType::from_u32(7).is_err());
    }

    #[test]
    fn vad_state_codes() {
        assert_eq!(VadState::from_u8(0).unwrap(), VadState::Silence);
        assert_eq!(VadState::from_u8(1).unwrap(), VadState::Speech);
        assert!(VadState::from_u8(9).is_err());
    }

    #[test]
    fn rectangularity() {
        assert!(is_rectangular(&vec![]));
        assert!(is_rectangular(&vec![vec![1.0, 2.0], vec![3.0, 4.0]]));
        assert!(!is_rectangular(&vec![vec![1.0, 2.0], vec![3.0]]));
    }

    #[test]
    fn feature_shape() {
        let f = Feature {
            matrix: vec![vec![0.0; 13]; 4],
            ..Feature::default()
        };
        assert_eq!(f.num_frames(), 4);
        assert_eq!(f.dim(), 13);

        let empty = Feature::default();
        assert_eq!(empty.num_frames(), 0);
        assert_eq!(empty.dim(), 0);
    }
}
