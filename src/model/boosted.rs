//! Gradient-boosted tree regressors
//!
//! Both boosted variants sum leaf values on top of a base score. They differ
//! in how a value equal to a split threshold is routed.

use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, SplitRule};
use super::{ModelError, Regressor};

/// Additive tree ensemble; leaf values already include the learning rate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    pub base_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    split_rule: Option<SplitRule>,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedTrees {
    pub fn new(base_score: f64, split_rule: SplitRule, trees: Vec<RegressionTree>) -> Self {
        GradientBoostedTrees {
            base_score,
            split_rule: Some(split_rule),
            trees,
        }
    }

    /// XGBoost convention: `x < threshold` goes left
    pub fn xgboost(base_score: f64, trees: Vec<RegressionTree>) -> Self {
        Self::new(base_score, SplitRule::LessThan, trees)
    }

    /// LightGBM convention: `x <= threshold` goes left
    pub fn lightgbm(base_score: f64, trees: Vec<RegressionTree>) -> Self {
        Self::new(base_score, SplitRule::LessOrEqual, trees)
    }

    /// Fill in the split rule when the artifact didn't state one
    pub fn or_split_rule(mut self, rule: SplitRule) -> Self {
        self.split_rule.get_or_insert(rule);
        self
    }

    pub fn split_rule(&self) -> SplitRule {
        self.split_rule.unwrap_or_default()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for GradientBoostedTrees {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        let rule = self.split_rule();
        let mut score = self.base_score;
        for tree in &self.trees {
            score += tree.evaluate(features, rule)?;
        }
        if score.is_finite() {
            Ok(score)
        } else {
            Err(ModelError::NonFinite)
        }
    }
}
