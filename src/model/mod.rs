//! Regression models behind the ensemble
//!
//! Every model exposes the same single capability, [`Regressor::predict`]:
//! - Random forest: mean of bagged regression trees
//! - Boosted trees: XGBoost and LightGBM style additive tree ensembles
//! - MLP: feed-forward network on the scaled features
//! - Ensemble: equal-weight combination of the four base models

pub mod boosted;
pub mod ensemble;
pub mod forest;
pub mod mlp;
pub mod tree;

pub use boosted::GradientBoostedTrees;
pub use ensemble::EqualWeightEnsemble;
pub use forest::RandomForest;
pub use mlp::{MLPConfig, MLPModel, NeuralRegressor};
pub use tree::{RegressionTree, SplitRule, TreeNode};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier of a model in the prediction set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "random_forest")]
    RandomForest,
    #[serde(rename = "xgboost")]
    XGBoost,
    #[serde(rename = "lightgbm")]
    LightGbm,
    #[serde(rename = "neural_network")]
    NeuralNetwork,
    #[serde(rename = "ensemble")]
    Ensemble,
}

impl ModelKind {
    /// The four independently trained models, in reporting order
    pub const BASE: [ModelKind; 4] = [
        ModelKind::RandomForest,
        ModelKind::XGBoost,
        ModelKind::LightGbm,
        ModelKind::NeuralNetwork,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::XGBoost => "xgboost",
            ModelKind::LightGbm => "lightgbm",
            ModelKind::NeuralNetwork => "neural_network",
            ModelKind::Ensemble => "ensemble",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Inference failures local to a single model
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("expected {expected} input features, got {got}")]
    InputDimension { expected: usize, got: usize },

    #[error("tree references feature {feature} but input has {len} features")]
    FeatureOutOfRange { feature: usize, len: usize },

    #[error("invalid tree: {0}")]
    InvalidTree(String),

    #[error("model has no members to evaluate")]
    Empty,

    #[error("model produced a non-finite output")]
    NonFinite,

    #[error("backend error: {0}")]
    Backend(String),
}

/// A trained model mapping a scaled feature row to a score
pub trait Regressor: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError>;
}
