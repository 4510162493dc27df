//! Feature extraction and encoding
//!
//! Converts raw student attributes into model-ready features.

pub mod encoding;
pub mod input;
pub mod student;

pub use encoding::{LabelEncoder, LabelEncoders, UNKNOWN_CATEGORY_CODE};
pub use input::RawInput;
pub use student::{compute_features, FeatureVector, StudentFeatures, FEATURE_NAMES};
