//! GMM-UBM statistical core for text-independent speaker verification.
//!
//! # Architecture
//!
//! Verification is a likelihood-ratio test against a universal background
//! model (UBM), a diagonal-covariance Gaussian mixture fitted to pooled,
//! speaker-independent speech:
//!
//! 1. [`UbmTrainer::train`]: pooled feature matrices -> UBM (offline, once)
//! 2. [`BwStatsAccumulator::accumulate`]: enrollment frames + UBM -> [`BwStats`]
//! 3. [`MapAdaptor::adapt_means_only`]: UBM + speaker stats -> speaker model
//! 4. [`LlrScorer::score`]: test frames vs (speaker model, UBM) -> score
//!
//! The accumulator is the single E-step implementation: training and
//! enrollment drive the identical routine, and the scorer evaluates
//! per-frame densities with the same [`math`] functions.
//!
//! All arithmetic is log-domain `f64` over `f32` feature frames. Training
//! is single-threaded and batch: each M-step needs the complete E-step
//! pass, so iterations are inherently sequential. Finished models are
//! read-only and safe to score against concurrently.
//!
//! # Persistence
//!
//! [`model_io`] defines the versioned little-endian model format; feature
//! matrices arrive through the `voxid-features` crate.

mod accumulate;
mod adaptor;
mod error;
pub mod math;
mod model;
pub mod model_io;
pub mod rng;
mod scorer;
mod stats;
mod trainer;

pub use accumulate::{AccumulatorOptions, BwStatsAccumulator};
pub use adaptor::{AdaptorOptions, MapAdaptor};
pub use error::GmmError;
pub use model::GmmModel;
pub use model_io::{load_model, load_model_file, save_model, save_model_file};
pub use rng::Xoshiro256ss;
pub use scorer::{LlrScorer, ScorerOptions};
pub use stats::BwStats;
pub use trainer::{TrainerOptions, UbmTrainer};
