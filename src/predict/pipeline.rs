//! End-to-end prediction from raw student attributes
//!
//! raw input → features → model scores → grade, risk and recommendations.
//! Prediction never fails: without usable models a flagged fallback result is
//! returned instead.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::bundle::ModelBundle;
use super::grading::classify;
use super::inference::{ModelPredictions, ScorePredictor};
use crate::features::{RawInput, StudentFeatures};
use crate::interventions::{self, Recommendation};
use crate::{Config, EnsembleWeights, Grade, Result, RiskLevel};

pub const FALLBACK_SCORE: f64 = 78.5;
pub const FALLBACK_GRADE: Grade = Grade::C;
pub const FALLBACK_RISK: RiskLevel = RiskLevel::Medium;
pub const FALLBACK_CONFIDENCE: f64 = 85.0;

/// Headline features shown next to a prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureAnalysis {
    /// Mean subject grade
    pub academic_strength: f64,
    pub application_strength: f64,
    pub extracurricular_score: f64,
    pub attendance_rate: f64,
}

impl From<&StudentFeatures> for FeatureAnalysis {
    fn from(features: &StudentFeatures) -> Self {
        FeatureAnalysis {
            academic_strength: features.overall_grade,
            application_strength: features.application_strength,
            extracurricular_score: features.extracurricular_score,
            attendance_rate: features.attendance_rate,
        }
    }
}

/// Outcome of one prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub score: f64,
    pub grade: Grade,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub recommendations: Vec<Recommendation>,
    pub model_predictions: ModelPredictions,
    pub feature_analysis: Option<FeatureAnalysis>,
    /// Why the fixed fallback was returned, None for a real prediction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl PredictionResult {
    pub fn fallback(reason: impl Into<String>) -> Self {
        PredictionResult {
            score: FALLBACK_SCORE,
            grade: FALLBACK_GRADE,
            risk_level: FALLBACK_RISK,
            confidence: FALLBACK_CONFIDENCE,
            recommendations: Vec::new(),
            model_predictions: ModelPredictions::new(),
            feature_analysis: None,
            fallback: Some(reason.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

enum PredictorState {
    Ready(ScorePredictor),
    Unavailable(String),
}

/// Predicts student performance from raw attributes
pub struct PerformancePredictor {
    state: PredictorState,
}

impl PerformancePredictor {
    /// Load the bundle from the configured model directory
    ///
    /// A load failure is logged and leaves the predictor in fallback mode.
    pub fn from_model_dir(config: &Config) -> Self {
        match Self::try_from_model_dir(config) {
            Ok(predictor) => predictor,
            Err(e) => {
                log::error!("Error loading models: {}", e);
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn try_from_model_dir(config: &Config) -> Result<Self> {
        let bundle = ModelBundle::load(Path::new(&config.data.model_dir))?;
        Self::from_bundle(bundle, config.ensemble)
    }

    pub fn from_bundle(bundle: ModelBundle, weights: EnsembleWeights) -> Result<Self> {
        Ok(PerformancePredictor {
            state: PredictorState::Ready(ScorePredictor::new(bundle, weights)?),
        })
    }

    /// Predictor that always returns the fallback result
    pub fn unavailable(reason: impl Into<String>) -> Self {
        PerformancePredictor {
            state: PredictorState::Unavailable(reason.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, PredictorState::Ready(_))
    }

    pub fn bundle(&self) -> Option<&ModelBundle> {
        match &self.state {
            PredictorState::Ready(predictor) => Some(predictor.bundle()),
            PredictorState::Unavailable(_) => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            PredictorState::Ready(_) => None,
            PredictorState::Unavailable(reason) => Some(reason),
        }
    }

    pub fn predict(&self, raw: &RawInput) -> PredictionResult {
        let predictor = match &self.state {
            PredictorState::Ready(predictor) => predictor,
            PredictorState::Unavailable(reason) => {
                log::warn!("Models unavailable, returning fallback prediction: {}", reason);
                return PredictionResult::fallback(reason.clone());
            }
        };

        let features = StudentFeatures::from_input(raw, predictor.bundle().encoders());
        let output = predictor.predict(&features.to_feature_vector());

        let score = output.final_score;
        let (grade, risk_level) = classify(score);
        let recommendations = interventions::generate(score, &features);

        PredictionResult {
            score,
            grade,
            risk_level,
            confidence: output.confidence,
            recommendations,
            model_predictions: output.predictions,
            feature_analysis: Some(FeatureAnalysis::from(&features)),
            fallback: None,
        }
    }
}

/// Format a prediction for display
pub fn format_prediction(result: &PredictionResult, student_name: &str) -> String {
    let mut out = format!(
        r#"
┌─────────────────────────────────────────────────┐
│  {}
├─────────────────────────────────────────────────┤
│  Predicted score:  {:.1}
│  Grade:            {}
│  Risk level:       {}
│  Confidence:       {:.1}%
"#,
        student_name, result.score, result.grade, result.risk_level, result.confidence
    );

    if let Some(reason) = &result.fallback {
        out.push_str(&format!("│  Fallback:         {}\n", reason));
    }

    if !result.model_predictions.is_empty() {
        out.push_str("├─────────────────────────────────────────────────┤\n");
        for (kind, score) in result.model_predictions.iter() {
            out.push_str(&format!("│  {:<16}  {:.2}\n", kind.id(), score));
        }
    }

    if let Some(analysis) = &result.feature_analysis {
        out.push_str("├─────────────────────────────────────────────────┤\n");
        out.push_str(&format!(
            "│  Academic {:.2}  Application {:.2}\n│  Extracurricular {:.2}  Attendance {:.0}%\n",
            analysis.academic_strength,
            analysis.application_strength,
            analysis.extracurricular_score,
            analysis.attendance_rate * 100.0
        ));
    }

    if !result.recommendations.is_empty() {
        out.push_str("├─────────────────────────────────────────────────┤\n");
        for rec in &result.recommendations {
            out.push_str(&format!(
                "│  [P{}] {} ({})\n",
                rec.priority, rec.title, rec.duration
            ));
        }
    }

    out.push_str("└─────────────────────────────────────────────────┘\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{LabelEncoders, FEATURE_NAMES};
    use crate::model::testing::{ConstantRegressor, FailingRegressor};
    use crate::model::{ModelKind, Regressor};
    use crate::predict::bundle::tests::write_model_dir;
    use crate::predict::inference::FALLBACK_MODEL_SCORE;
    use crate::predict::scaler::StandardScaler;
    use std::sync::Arc;

    fn shared<R: Regressor + 'static>(model: R) -> Arc<dyn Regressor> {
        Arc::new(model)
    }

    fn predictor_with(models: [Arc<dyn Regressor>; 4]) -> PerformancePredictor {
        let columns = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        let mut bundle = ModelBundle::new(
            columns,
            StandardScaler::identity(FEATURE_NAMES.len()),
            LabelEncoders::default(),
        )
        .unwrap();
        for (kind, model) in ModelKind::BASE.into_iter().zip(models) {
            bundle = bundle.with_model(kind, model);
        }
        PerformancePredictor::from_bundle(bundle.with_ensemble(), EnsembleWeights::default())
            .unwrap()
    }

    fn constant_predictor(score: f64) -> PerformancePredictor {
        predictor_with([
            shared(ConstantRegressor(score)),
            shared(ConstantRegressor(score)),
            shared(ConstantRegressor(score)),
            shared(ConstantRegressor(score)),
        ])
    }

    fn at_risk_input() -> RawInput {
        RawInput {
            english_grade: Some(2.0),
            math_grade: Some(2.5),
            sciences_grade: Some(2.0),
            language_grade: Some(3.0),
            attendance_rate: Some(0.7),
            ..RawInput::default()
        }
    }

    #[test]
    fn test_unavailable_returns_flagged_fallback() {
        let predictor = PerformancePredictor::unavailable("no models");
        let result = predictor.predict(&RawInput::default());

        assert!(result.is_fallback());
        assert_eq!(result.score, FALLBACK_SCORE);
        assert_eq!(result.grade, Grade::C);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
        assert!(result.recommendations.is_empty());
        assert!(result.model_predictions.is_empty());
        assert_eq!(predictor.unavailable_reason(), Some("no models"));
    }

    #[test]
    fn test_missing_model_dir_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data.model_dir = dir.path().join("missing").to_string_lossy().into_owned();

        let predictor = PerformancePredictor::from_model_dir(&config);
        assert!(!predictor.is_available());
        assert!(predictor.predict(&RawInput::default()).is_fallback());
    }

    #[test]
    fn test_full_prediction() {
        let result = constant_predictor(55.0).predict(&at_risk_input());

        assert!(!result.is_fallback());
        assert_eq!(result.score, 55.0);
        assert_eq!(result.grade, Grade::F);
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert_eq!(result.confidence, 100.0);
        assert_eq!(result.model_predictions.len(), 5);
        assert!(!result.recommendations.is_empty());
        assert!(result.recommendations.len() <= interventions::MAX_RECOMMENDATIONS);
        assert!(result
            .recommendations
            .windows(2)
            .all(|pair| pair[0].priority <= pair[1].priority));

        let analysis = result.feature_analysis.unwrap();
        assert!((analysis.academic_strength - 2.375).abs() < 1e-9);
        assert_eq!(analysis.attendance_rate, 0.7);
    }

    #[test]
    fn test_identical_input_identical_result() {
        let predictor = constant_predictor(83.0);
        let raw = at_risk_input();
        assert_eq!(predictor.predict(&raw), predictor.predict(&raw));
    }

    #[test]
    fn test_single_failing_model_still_completes() {
        let predictor = predictor_with([
            shared(ConstantRegressor(90.0)),
            shared(FailingRegressor),
            shared(ConstantRegressor(90.0)),
            shared(ConstantRegressor(90.0)),
        ]);
        let result = predictor.predict(&RawInput::default());

        assert!(!result.is_fallback());
        assert_eq!(
            result.model_predictions.get(ModelKind::XGBoost),
            Some(FALLBACK_MODEL_SCORE)
        );
        assert!((result.score - 85.0).abs() < 1e-9);
        assert_eq!(result.grade, Grade::B);
        assert!((30.0..=100.0).contains(&result.confidence));
    }

    #[test]
    fn test_score_within_bounds_for_extreme_models() {
        for score in [-50.0, 500.0] {
            let result = constant_predictor(score).predict(&RawInput::default());
            assert!((0.0..=100.0).contains(&result.score));
        }
    }

    #[test]
    fn test_prediction_from_model_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_model_dir(dir.path());
        let mut config = Config::default();
        config.data.model_dir = dir.path().to_string_lossy().into_owned();

        let predictor = PerformancePredictor::try_from_model_dir(&config).unwrap();
        let result = predictor.predict(&RawInput {
            english_grade: Some(4.0),
            math_grade: Some(4.0),
            sciences_grade: Some(4.0),
            language_grade: Some(4.0),
            ..RawInput::default()
        });

        assert!(!result.is_fallback());
        // overall_grade 4.0 takes the right branch of the test trees
        assert_eq!(result.model_predictions.get(ModelKind::RandomForest), Some(80.0));
        assert_eq!(result.model_predictions.get(ModelKind::XGBoost), Some(70.0));
        assert_eq!(result.model_predictions.get(ModelKind::LightGbm), Some(85.0));
        assert!(result.model_predictions.get(ModelKind::NeuralNetwork).is_some());
        assert!((0.0..=100.0).contains(&result.score));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_predictor_shared_across_threads() {
        assert_send_sync::<PerformancePredictor>();

        let dir = tempfile::tempdir().unwrap();
        write_model_dir(dir.path());
        let mut config = Config::default();
        config.data.model_dir = dir.path().to_string_lossy().into_owned();
        let predictor = PerformancePredictor::try_from_model_dir(&config).unwrap();
        let expected = predictor.predict(&at_risk_input());

        let scores: Vec<f64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| predictor.predict(&at_risk_input()).score))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(!expected.is_fallback());
        assert!(scores.iter().all(|s| s.to_bits() == expected.score.to_bits()));
    }

    #[test]
    fn test_format_prediction() {
        let result = constant_predictor(91.0).predict(&RawInput::default());
        let text = format_prediction(&result, "Maria Garcia");
        assert!(text.contains("Maria Garcia"));
        assert!(text.contains("Grade:            A"));
        assert!(text.contains("random_forest"));

        let fallback = format_prediction(&PredictionResult::fallback("no models"), "Unknown");
        assert!(fallback.contains("Fallback:         no models"));
    }
}
