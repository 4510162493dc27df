//! Random forest regressor (bagged trees)

use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, SplitRule};
use super::{ModelError, Regressor};

/// Averages the outputs of independently grown trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn new(trees: Vec<RegressionTree>) -> Self {
        RandomForest { trees }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForest {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Empty);
        }
        let mut total = 0.0;
        for tree in &self.trees {
            // scikit-learn trees send equal values left
            total += tree.evaluate(features, SplitRule::LessOrEqual)?;
        }
        Ok(total / self.trees.len() as f64)
    }
}
