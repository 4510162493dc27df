//! Equal-weight combination of the base models

use std::sync::Arc;

use super::{ModelError, Regressor};

/// Combines member predictions with equal weights
///
/// Any member failure fails the whole combination; the caller decides how to
/// substitute for it.
pub struct EqualWeightEnsemble {
    members: Vec<Arc<dyn Regressor>>,
}

impl EqualWeightEnsemble {
    pub fn new(members: Vec<Arc<dyn Regressor>>) -> Self {
        EqualWeightEnsemble { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Regressor for EqualWeightEnsemble {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        if self.members.is_empty() {
            return Err(ModelError::Empty);
        }
        let weight = 1.0 / self.members.len() as f64;
        let mut score = 0.0;
        for member in &self.members {
            score += member.predict(features)? * weight;
        }
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::{ConstantRegressor, FailingRegressor};

    #[test]
    fn test_equal_weights() {
        let members: Vec<Arc<dyn Regressor>> = vec![
            Arc::new(ConstantRegressor(60.0)),
            Arc::new(ConstantRegressor(70.0)),
            Arc::new(ConstantRegressor(80.0)),
            Arc::new(ConstantRegressor(90.0)),
        ];
        let ensemble = EqualWeightEnsemble::new(members);
        assert_eq!(ensemble.len(), 4);
        assert_eq!(ensemble.predict(&[]).unwrap(), 75.0);
    }

    #[test]
    fn test_member_failure_propagates() {
        let members: Vec<Arc<dyn Regressor>> =
            vec![Arc::new(ConstantRegressor(60.0)), Arc::new(FailingRegressor)];
        let ensemble = EqualWeightEnsemble::new(members);
        assert!(ensemble.predict(&[]).is_err());
        assert_eq!(
            EqualWeightEnsemble::new(vec![]).predict(&[]),
            Err(ModelError::Empty)
        );
    }
}
