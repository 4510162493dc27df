//! Prediction and inference
//!
//! Load trained models and generate predictions.

pub mod bundle;
pub mod grading;
pub mod inference;
pub mod pipeline;
pub mod scaler;

pub use bundle::{InferenceBackend, ModelBundle};
pub use grading::classify;
pub use inference::{EnsembleOutput, ModelPredictions, ScorePredictor, FALLBACK_MODEL_SCORE};
pub use pipeline::{format_prediction, FeatureAnalysis, PerformancePredictor, PredictionResult};
pub use scaler::StandardScaler;
