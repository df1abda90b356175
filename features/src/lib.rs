//! Cepstral feature matrices and the `.lvf` binary feature format.
//!
//! Feature extraction itself (MFCC computation, voice-activity detection)
//! happens upstream; this crate owns the data model the verification engine
//! consumes and the on-disk format used to cache extracted features:
//!
//! 1. [`FeatureMatrix`]: frames x coefficients, one `f32` row per frame
//! 2. [`Feature`]: a matrix plus its extraction settings and VAD flags
//! 3. [`save_feature`] / [`load_feature`]: the `.lvf` wire format
//!
//! The extraction options block is opaque pass-through: it is preserved
//! bit-exactly through save/load but never interpreted here.

mod error;
mod feature;
mod serdes;

pub use error::FeatureError;
pub use feature::{CepstralType, Feature, FeatureMatrix, FeatureOptions, VadState, is_rectangular};
pub use serdes::{load_feature, load_feature_file, save_feature, save_feature_file};
