//! Trained model artifacts loaded once at start-up

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use burn::backend::NdArray;
use serde::de::DeserializeOwned;

use super::scaler::StandardScaler;
use crate::features::LabelEncoders;
use crate::model::{
    EqualWeightEnsemble, GradientBoostedTrees, MLPConfig, MLPModel, ModelKind, NeuralRegressor,
    RandomForest, Regressor, SplitRule,
};
use crate::{PredictorError, Result};

/// Backend used to run the network at inference time
pub type InferenceBackend = NdArray<f32>;

pub const FEATURE_COLUMNS_FILE: &str = "feature_columns.txt";
pub const SCALER_FILE: &str = "scaler.json";
pub const LABEL_ENCODERS_FILE: &str = "label_encoders.json";
pub const RANDOM_FOREST_FILE: &str = "random_forest.json";
pub const XGBOOST_FILE: &str = "xgboost.json";
pub const LIGHTGBM_FILE: &str = "lightgbm.json";
pub const NEURAL_NETWORK_CONFIG_FILE: &str = "neural_network.json";
/// Record path without extension; the recorder appends `.mpk`
pub const NEURAL_NETWORK_RECORD: &str = "neural_network";

/// Feature schema, scaler, encoders and models; read-only after construction
pub struct ModelBundle {
    feature_columns: Vec<String>,
    scaler: StandardScaler,
    encoders: LabelEncoders,
    models: BTreeMap<ModelKind, Arc<dyn Regressor>>,
}

impl ModelBundle {
    /// Create a bundle without models
    pub fn new(
        feature_columns: Vec<String>,
        scaler: StandardScaler,
        encoders: LabelEncoders,
    ) -> Result<Self> {
        scaler
            .validate(feature_columns.len())
            .map_err(|message| PredictorError::Artifact {
                path: SCALER_FILE.to_string(),
                message,
            })?;

        Ok(ModelBundle {
            feature_columns,
            scaler,
            encoders,
            models: BTreeMap::new(),
        })
    }

    /// Add or replace the model reported under `kind`
    pub fn with_model(mut self, kind: ModelKind, model: Arc<dyn Regressor>) -> Self {
        self.models.insert(kind, model);
        self
    }

    /// Add the equal-weight combiner over the base models present
    pub fn with_ensemble(self) -> Self {
        let members: Vec<Arc<dyn Regressor>> = ModelKind::BASE
            .iter()
            .filter_map(|kind| self.models.get(kind).cloned())
            .collect();
        if members.is_empty() {
            return self;
        }
        self.with_model(ModelKind::Ensemble, Arc::new(EqualWeightEnsemble::new(members)))
    }

    /// Load every artifact from a model directory
    pub fn load(dir: &Path) -> Result<Self> {
        let columns_path = dir.join(FEATURE_COLUMNS_FILE);
        if !columns_path.is_file() {
            return Err(PredictorError::NoModel(dir.display().to_string()));
        }

        let feature_columns = read_feature_columns(&columns_path)?;
        let scaler: StandardScaler = read_json(dir, SCALER_FILE)?;
        let encoders: LabelEncoders = read_json(dir, LABEL_ENCODERS_FILE)?;

        let forest: RandomForest = read_json(dir, RANDOM_FOREST_FILE)?;
        let xgboost = read_json::<GradientBoostedTrees>(dir, XGBOOST_FILE)?
            .or_split_rule(SplitRule::LessThan);
        let lightgbm = read_json::<GradientBoostedTrees>(dir, LIGHTGBM_FILE)?
            .or_split_rule(SplitRule::LessOrEqual);
        let network = load_network(dir, feature_columns.len())?;

        let bundle = ModelBundle::new(feature_columns, scaler, encoders)?
            .with_model(ModelKind::RandomForest, Arc::new(forest))
            .with_model(ModelKind::XGBoost, Arc::new(xgboost))
            .with_model(ModelKind::LightGbm, Arc::new(lightgbm))
            .with_model(ModelKind::NeuralNetwork, Arc::new(network))
            .with_ensemble();

        log::info!(
            "Loaded {} models with {} features from {}",
            bundle.models.len(),
            bundle.feature_columns.len(),
            dir.display()
        );
        Ok(bundle)
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn encoders(&self) -> &LabelEncoders {
        &self.encoders
    }

    /// Models in reporting order
    pub fn models(&self) -> impl Iterator<Item = (ModelKind, &dyn Regressor)> + '_ {
        self.models.iter().map(|(kind, model)| (*kind, model.as_ref()))
    }

    pub fn model_kinds(&self) -> Vec<ModelKind> {
        self.models.keys().copied().collect()
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }
}

fn read_feature_columns(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| artifact_error(path, e))?;
    let columns: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();
    if columns.is_empty() {
        return Err(artifact_error(path, "no feature names"));
    }
    Ok(columns)
}

fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let path = dir.join(file);
    let content = fs::read_to_string(&path).map_err(|e| artifact_error(&path, e))?;
    serde_json::from_str(&content).map_err(|e| artifact_error(&path, e))
}

fn load_network(dir: &Path, n_features: usize) -> Result<NeuralRegressor<InferenceBackend>> {
    let config: MLPConfig = read_json(dir, NEURAL_NETWORK_CONFIG_FILE)?;
    if config.input_dim != n_features {
        return Err(artifact_error(
            &dir.join(NEURAL_NETWORK_CONFIG_FILE),
            format!(
                "network expects {} inputs but schema has {} features",
                config.input_dim, n_features
            ),
        ));
    }

    let device = Default::default();
    let record_path = dir.join(NEURAL_NETWORK_RECORD);
    let model =
        MLPModel::<InferenceBackend>::load(&device, &record_path.to_string_lossy(), &config)?;
    Ok(NeuralRegressor::new(model, &config, device))
}

fn artifact_error(path: &Path, message: impl ToString) -> PredictorError {
    PredictorError::Artifact {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}
