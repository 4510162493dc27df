//! Student performance prediction
//!
//! Derives a fixed feature vector from a student's academic, application and
//! demographic attributes, scores it with an ensemble of tree models and a
//! neural network, and turns the score into a grade, a risk tier and a short
//! list of interventions.

pub mod data;
pub mod features;
pub mod interventions;
pub mod model;
pub mod predict;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ModelKind;

/// Letter grade derived from the final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "A" => Some(Grade::A),
            "B" => Some(Grade::B),
            "C" => Some(Grade::C),
            "D" => Some(Grade::D),
            "F" => Some(Grade::F),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk tier driving intervention urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            "critical" => Some(RiskLevel::Critical),
            _ => None,
        }
    }

    /// High and Critical students count as at-risk on the dashboard
    pub fn is_at_risk(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Failed to load model artifact {path}: {message}")]
    Artifact { path: String, message: String },

    #[error("Model {model} failed: {source}")]
    Model {
        model: ModelKind,
        #[source]
        source: model::ModelError,
    },

    #[error("No trained models found in {0} - run the offline training job first")]
    NoModel(String),

    #[error("Intervention not found with ID: {0}")]
    InterventionNotFound(i64),

    #[error("Student not found with ID: {0}")]
    StudentNotFound(i64),

    #[error("Unknown intervention status: {0}")]
    InvalidStatus(String),
}

pub type Result<T> = std::result::Result<T, PredictorError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    #[serde(default)]
    pub ensemble: EnsembleWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub model_dir: String,
}

/// Per-model weights of the final score; the combiner model is never weighted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleWeights {
    pub random_forest: f64,
    pub xgboost: f64,
    pub lightgbm: f64,
    pub neural_network: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        EnsembleWeights {
            random_forest: 0.25,
            xgboost: 0.25,
            lightgbm: 0.25,
            neural_network: 0.25,
        }
    }
}

impl EnsembleWeights {
    /// Weight applied to a model's prediction, None if it does not contribute
    pub fn weight_for(&self, kind: ModelKind) -> Option<f64> {
        match kind {
            ModelKind::RandomForest => Some(self.random_forest),
            ModelKind::XGBoost => Some(self.xgboost),
            ModelKind::LightGbm => Some(self.lightgbm),
            ModelKind::NeuralNetwork => Some(self.neural_network),
            ModelKind::Ensemble => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                database_path: "database/student_performance.db".to_string(),
                model_dir: "model".to_string(),
            },
            ensemble: EnsembleWeights::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PredictorError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| PredictorError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PredictorError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
