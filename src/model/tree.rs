//! Binary regression trees shared by the forest and boosted models

use serde::{Deserialize, Serialize};

use super::ModelError;

/// Which side a value equal to the threshold goes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitRule {
    /// `x < threshold` goes left (XGBoost)
    #[default]
    LessThan,
    /// `x <= threshold` goes left (scikit-learn, LightGBM)
    LessOrEqual,
}

impl SplitRule {
    fn goes_left(&self, value: f64, threshold: f64) -> bool {
        match self {
            SplitRule::LessThan => value < threshold,
            SplitRule::LessOrEqual => value <= threshold,
        }
    }
}

/// A node in the flat node array; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TreeRecord {
    nodes: Vec<TreeNode>,
}

/// A validated regression tree
///
/// Children always sit at a higher index than their parent, so every walk
/// from the root terminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreeRecord", into = "TreeRecord")]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl TryFrom<TreeRecord> for RegressionTree {
    type Error = ModelError;

    fn try_from(record: TreeRecord) -> Result<Self, Self::Error> {
        RegressionTree::new(record.nodes)
    }
}

impl From<RegressionTree> for TreeRecord {
    fn from(tree: RegressionTree) -> Self {
        TreeRecord { nodes: tree.nodes }
    }
}

impl RegressionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Result<Self, ModelError> {
        if nodes.is_empty() {
            return Err(ModelError::InvalidTree("tree has no nodes".to_string()));
        }

        for (idx, node) in nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    for &child in [left, right] {
                        if child <= idx || child >= nodes.len() {
                            return Err(ModelError::InvalidTree(format!(
                                "node {} has invalid child {}",
                                idx, child
                            )));
                        }
                    }
                    if threshold.is_nan() {
                        return Err(ModelError::InvalidTree(format!(
                            "node {} has a NaN threshold",
                            idx
                        )));
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(ModelError::InvalidTree(format!(
                            "leaf {} has a non-finite value",
                            idx
                        )));
                    }
                }
            }
        }

        Ok(RegressionTree { nodes })
    }

    /// Single-leaf tree
    pub fn constant(value: f64) -> Self {
        RegressionTree {
            nodes: vec![TreeNode::Leaf { value }],
        }
    }

    /// Walk from the root to a leaf
    pub fn evaluate(&self, features: &[f64], rule: SplitRule) -> Result<f64, ModelError> {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return Ok(*value),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value =
                        features
                            .get(*feature)
                            .copied()
                            .ok_or(ModelError::FeatureOutOfRange {
                                feature: *feature,
                                len: features.len(),
                            })?;
                    idx = if rule.goes_left(value, *threshold) {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, low: f64, high: f64) -> RegressionTree {
        RegressionTree::new(vec![
            TreeNode::Split {
                feature,
                threshold,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { value: low },
            TreeNode::Leaf { value: high },
        ])
        .unwrap()
    }

    #[test]
    fn test_split_rules_differ_at_threshold() {
        let tree = stump(0, 0.5, 10.0, 20.0);
        assert_eq!(tree.evaluate(&[0.5], SplitRule::LessThan).unwrap(), 20.0);
        assert_eq!(tree.evaluate(&[0.5], SplitRule::LessOrEqual).unwrap(), 10.0);
        assert_eq!(tree.evaluate(&[0.1], SplitRule::LessThan).unwrap(), 10.0);
    }

    #[test]
    fn test_missing_feature_is_an_error() {
        let tree = stump(3, 0.5, 10.0, 20.0);
        let err = tree.evaluate(&[1.0], SplitRule::LessThan).unwrap_err();
        assert_eq!(err, ModelError::FeatureOutOfRange { feature: 3, len: 1 });
    }

    #[test]
    fn test_backward_and_self_references_rejected() {
        let result = RegressionTree::new(vec![
            TreeNode::Split {
                feature: 0,
                threshold: 0.0,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { value: 1.0 },
            TreeNode::Split {
                feature: 0,
                threshold: 0.0,
                left: 0,
                right: 1,
            },
        ]);
        assert!(matches!(result, Err(ModelError::InvalidTree(_))));

        let result = RegressionTree::new(vec![TreeNode::Split {
            feature: 0,
            threshold: 0.0,
            left: 0,
            right: 0,
        }]);
        assert!(matches!(result, Err(ModelError::InvalidTree(_))));
        assert!(RegressionTree::new(vec![]).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"{"nodes": [
            {"feature": 1, "threshold": 2.0, "left": 1, "right": 2},
            {"value": -1.5},
            {"value": 4.0}
        ]}"#;
        let tree: RegressionTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.evaluate(&[0.0, 3.0], SplitRule::LessThan).unwrap(), 4.0);

        let bad = r#"{"nodes": [{"feature": 0, "threshold": 1.0, "left": 5, "right": 6}]}"#;
        assert!(serde_json::from_str::<RegressionTree>(bad).is_err());
    }
}
