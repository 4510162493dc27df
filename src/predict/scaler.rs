//! Z-score scaling of projected feature rows

use serde::{Deserialize, Serialize};

/// Per-feature standardisation parameters fitted offline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Scaler that leaves `dim` features unchanged
    pub fn identity(dim: usize) -> Self {
        StandardScaler {
            mean: vec![0.0; dim],
            scale: vec![1.0; dim],
        }
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Check the parameters are usable for a schema of `dim` features
    pub fn validate(&self, dim: usize) -> Result<(), String> {
        if self.mean.len() != self.scale.len() {
            return Err(format!(
                "scaler has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if self.mean.len() != dim {
            return Err(format!(
                "scaler covers {} features but schema has {}",
                self.mean.len(),
                dim
            ));
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err("scaler contains non-finite parameters".to_string());
        }
        Ok(())
    }

    /// Apply `(x - mean) / scale` to each position
    ///
    /// A zero scale counts as 1. Positions without parameters pass through.
    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .map(|(i, &x)| match (self.mean.get(i), self.scale.get(i)) {
                (Some(&mean), Some(&scale)) => {
                    let scale = if scale == 0.0 { 1.0 } else { scale };
                    (x - mean) / scale
                }
                _ => x,
            })
            .collect()
    }
}
