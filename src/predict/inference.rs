//! Model inference for predictions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::bundle::ModelBundle;
use crate::features::FeatureVector;
use crate::model::{ModelError, ModelKind};
use crate::{EnsembleWeights, PredictorError, Result};

/// Substituted for a model that fails or returns a non-finite score
pub const FALLBACK_MODEL_SCORE: f64 = 70.0;

pub const MIN_CONFIDENCE: f64 = 30.0;
pub const MAX_CONFIDENCE: f64 = 100.0;

/// Confidence lost per point of inter-model standard deviation
const DISAGREEMENT_PENALTY: f64 = 10.0;

/// Raw score reported by each model for one request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelPredictions(BTreeMap<ModelKind, f64>);

impl ModelPredictions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ModelKind, score: f64) {
        self.0.insert(kind, score);
    }

    pub fn get(&self, kind: ModelKind) -> Option<f64> {
        self.0.get(&kind).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelKind, f64)> + '_ {
        self.0.iter().map(|(kind, score)| (*kind, *score))
    }

    pub fn values(&self) -> Vec<f64> {
        self.0.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(ModelKind, f64)> for ModelPredictions {
    fn from_iter<I: IntoIterator<Item = (ModelKind, f64)>>(iter: I) -> Self {
        ModelPredictions(iter.into_iter().collect())
    }
}

/// Combined output of every model for one feature vector
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleOutput {
    pub predictions: ModelPredictions,
    /// Weighted score clamped to [0, 100]
    pub final_score: f64,
    pub confidence: f64,
    /// Models whose score was replaced by [`FALLBACK_MODEL_SCORE`]
    pub failed_models: Vec<ModelKind>,
}

/// Scores feature vectors with every model in a bundle
pub struct ScorePredictor {
    bundle: ModelBundle,
    weights: EnsembleWeights,
}

impl ScorePredictor {
    pub fn new(bundle: ModelBundle, weights: EnsembleWeights) -> Result<Self> {
        if bundle.model_count() == 0 {
            return Err(PredictorError::NoModel("the model bundle".to_string()));
        }
        Ok(ScorePredictor { bundle, weights })
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    pub fn weights(&self) -> &EnsembleWeights {
        &self.weights
    }

    /// Run every model; a failing model is substituted, never fatal
    pub fn predict(&self, features: &FeatureVector) -> EnsembleOutput {
        let row = features.project(self.bundle.feature_columns());
        let scaled = self.bundle.scaler().transform(&row);

        let mut predictions = ModelPredictions::new();
        let mut failed_models = Vec::new();

        for (kind, model) in self.bundle.models() {
            let score = match model.predict(&scaled) {
                Ok(score) if score.is_finite() => score,
                Ok(_) => {
                    log::warn!("Error predicting with {}: {}", kind, ModelError::NonFinite);
                    failed_models.push(kind);
                    FALLBACK_MODEL_SCORE
                }
                Err(e) => {
                    log::warn!("Error predicting with {}: {}", kind, e);
                    failed_models.push(kind);
                    FALLBACK_MODEL_SCORE
                }
            };
            predictions.insert(kind, score);
        }

        let final_score = weighted_score(&predictions, &self.weights);
        let confidence = confidence(&predictions.values());
        log::debug!(
            "Final score {:.2} with confidence {:.1} from {} models",
            final_score,
            confidence,
            predictions.len()
        );

        EnsembleOutput {
            predictions,
            final_score,
            confidence,
            failed_models,
        }
    }
}

/// Weighted sum of the weighted models' scores, clamped to [0, 100]
pub fn weighted_score(predictions: &ModelPredictions, weights: &EnsembleWeights) -> f64 {
    let total: f64 = predictions
        .iter()
        .filter_map(|(kind, score)| weights.weight_for(kind).map(|w| w * score))
        .sum();
    total.clamp(0.0, 100.0)
}

/// Heuristic inverse of model disagreement, within [30, 100]
pub fn confidence(scores: &[f64]) -> f64 {
    let spread = population_std(scores);
    (MAX_CONFIDENCE - DISAGREEMENT_PENALTY * spread).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{compute_features, LabelEncoders, RawInput, FEATURE_NAMES};
    use crate::model::testing::{ColumnRegressor, ConstantRegressor, FailingRegressor};
    use crate::model::Regressor;
    use crate::predict::scaler::StandardScaler;
    use std::sync::Arc;

    fn shared<R: Regressor + 'static>(model: R) -> Arc<dyn Regressor> {
        Arc::new(model)
    }

    fn bundle_with(models: Vec<(ModelKind, Arc<dyn Regressor>)>) -> ModelBundle {
        let columns = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        let mut bundle = ModelBundle::new(
            columns,
            StandardScaler::identity(FEATURE_NAMES.len()),
            LabelEncoders::default(),
        )
        .unwrap();
        for (kind, model) in models {
            bundle = bundle.with_model(kind, model);
        }
        bundle
    }

    fn constant_bundle(scores: [f64; 4]) -> ModelBundle {
        let models = ModelKind::BASE
            .iter()
            .zip(scores)
            .map(|(&kind, score)| (kind, shared(ConstantRegressor(score))))
            .collect();
        bundle_with(models).with_ensemble()
    }

    fn default_features() -> FeatureVector {
        compute_features(&RawInput::default(), &LabelEncoders::default())
    }

    #[test]
    fn test_weighted_final_score_excludes_ensemble() {
        let predictor =
            ScorePredictor::new(constant_bundle([60.0, 70.0, 80.0, 90.0]), EnsembleWeights::default())
                .unwrap();
        let output = predictor.predict(&default_features());

        assert_eq!(output.predictions.len(), 5);
        assert_eq!(output.predictions.get(ModelKind::Ensemble), Some(75.0));
        assert!((output.final_score - 75.0).abs() < 1e-9);
        assert!(output.failed_models.is_empty());
    }

    #[test]
    fn test_custom_weights() {
        let weights = EnsembleWeights {
            random_forest: 1.0,
            xgboost: 0.0,
            lightgbm: 0.0,
            neural_network: 0.0,
        };
        let predictor =
            ScorePredictor::new(constant_bundle([64.0, 10.0, 10.0, 10.0]), weights).unwrap();
        assert_eq!(predictor.predict(&default_features()).final_score, 64.0);
    }

    #[test]
    fn test_final_score_is_clamped() {
        let low = ScorePredictor::new(constant_bundle([-50.0; 4]), EnsembleWeights::default())
            .unwrap()
            .predict(&default_features());
        assert_eq!(low.final_score, 0.0);

        let high = ScorePredictor::new(constant_bundle([500.0; 4]), EnsembleWeights::default())
            .unwrap()
            .predict(&default_features());
        assert_eq!(high.final_score, 100.0);
        // Identical predictions mean full agreement
        assert_eq!(high.confidence, MAX_CONFIDENCE);
    }

    #[test]
    fn test_failing_model_uses_fallback_score() {
        let bundle = bundle_with(vec![
            (ModelKind::RandomForest, shared(ConstantRegressor(80.0))),
            (ModelKind::XGBoost, shared(FailingRegressor)),
            (ModelKind::LightGbm, shared(ConstantRegressor(80.0))),
            (ModelKind::NeuralNetwork, shared(ConstantRegressor(f64::NAN))),
        ])
        .with_ensemble();
        let output = ScorePredictor::new(bundle, EnsembleWeights::default())
            .unwrap()
            .predict(&default_features());

        assert_eq!(output.predictions.get(ModelKind::XGBoost), Some(FALLBACK_MODEL_SCORE));
        assert_eq!(
            output.predictions.get(ModelKind::NeuralNetwork),
            Some(FALLBACK_MODEL_SCORE)
        );
        // The combiner fails with its member and is substituted too
        assert_eq!(output.predictions.get(ModelKind::Ensemble), Some(FALLBACK_MODEL_SCORE));
        assert_eq!(
            output.failed_models,
            vec![ModelKind::XGBoost, ModelKind::NeuralNetwork, ModelKind::Ensemble]
        );
        assert!((output.final_score - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_models_see_projected_scaled_row() {
        // Schema lists overall_grade first and an unknown name second
        let bundle = ModelBundle::new(
            vec!["overall_grade".to_string(), "not_a_feature".to_string()],
            StandardScaler {
                mean: vec![1.0, 0.0],
                scale: vec![2.0, 1.0],
            },
            LabelEncoders::default(),
        )
        .unwrap()
        .with_model(ModelKind::RandomForest, Arc::new(ColumnRegressor(0)))
        .with_model(ModelKind::XGBoost, Arc::new(ColumnRegressor(1)));

        let output = ScorePredictor::new(bundle, EnsembleWeights::default())
            .unwrap()
            .predict(&default_features());
        assert_eq!(output.predictions.get(ModelKind::RandomForest), Some(1.0));
        assert_eq!(output.predictions.get(ModelKind::XGBoost), Some(0.0));
    }

    #[test]
    fn test_confidence_bounds_and_monotonic() {
        assert_eq!(confidence(&[]), MAX_CONFIDENCE);
        assert_eq!(confidence(&[0.0, 100.0]), MIN_CONFIDENCE);
        assert!((confidence(&[70.0, 72.0]) - 90.0).abs() < 1e-9);

        let mut previous = MAX_CONFIDENCE;
        for spread in 0..40 {
            let half = spread as f64 / 2.0;
            let c = confidence(&[75.0 - half, 75.0 + half]);
            assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&c));
            assert!(c <= previous);
            previous = c;
        }
    }

    #[test]
    fn test_empty_bundle_rejected() {
        assert!(ScorePredictor::new(bundle_with(vec![]), EnsembleWeights::default()).is_err());
    }

    #[test]
    fn test_predictions_serialize_by_model_id() {
        let predictions: ModelPredictions =
            [(ModelKind::LightGbm, 81.5), (ModelKind::Ensemble, 80.0)]
                .into_iter()
                .collect();
        let json = serde_json::to_value(&predictions).unwrap();
        assert_eq!(json["lightgbm"], 81.5);
        assert_eq!(json["ensemble"], 80.0);
    }
}
