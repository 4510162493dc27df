//! Feed-forward regression network
//!
//! Architecture: Input(n) → Hidden(128) → ReLU → Dropout
//!                        → Hidden(64)  → ReLU → Dropout
//!                        → Hidden(32)  → ReLU → Dropout
//!                        → Hidden(16)  → ReLU
//!                        → score_head(1)

use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::record::{FullPrecisionSettings, Recorder};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use super::{ModelError, Regressor};
use crate::features::StudentFeatures;
use crate::PredictorError;

/// Configuration for the MLP model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MLPConfig {
    /// Input dimension (scaled student features)
    pub input_dim: usize,
    /// Hidden layer dimensions, one block per entry
    pub hidden_dims: Vec<usize>,
    /// Dropout rate (only active while training)
    #[serde(default = "default_dropout")]
    pub dropout: f64,
}

fn default_dropout() -> f64 {
    0.2
}

impl Default for MLPConfig {
    fn default() -> Self {
        MLPConfig {
            input_dim: StudentFeatures::DIM,
            hidden_dims: vec![128, 64, 32, 16],
            dropout: default_dropout(),
        }
    }
}

/// A single hidden layer block: Linear → ReLU → Dropout
#[derive(Module, Debug)]
pub struct HiddenBlock<B: Backend> {
    linear: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> HiddenBlock<B> {
    pub fn new(device: &B::Device, in_dim: usize, out_dim: usize, dropout: f64) -> Self {
        HiddenBlock {
            linear: LinearConfig::new(in_dim, out_dim).init(device),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.linear.forward(x);
        let x = relu(x);
        self.dropout.forward(x)
    }
}

/// Multi-layer perceptron producing one unbounded score per row
#[derive(Module, Debug)]
pub struct MLPModel<B: Backend> {
    hidden: Vec<HiddenBlock<B>>,
    score_head: Linear<B>,
}

impl<B: Backend> MLPModel<B> {
    /// Create a new MLP model
    pub fn new(device: &B::Device, config: &MLPConfig) -> Self {
        let mut hidden = Vec::with_capacity(config.hidden_dims.len());
        let mut in_dim = config.input_dim;
        for &out_dim in &config.hidden_dims {
            hidden.push(HiddenBlock::new(device, in_dim, out_dim, config.dropout));
            in_dim = out_dim;
        }

        MLPModel {
            hidden,
            score_head: LinearConfig::new(in_dim, 1).init(device),
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `features` - Scaled features [batch, input_dim]
    ///
    /// # Returns
    /// Scores [batch, 1]
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self
            .hidden
            .iter()
            .fold(features, |x, block| block.forward(x));
        self.score_head.forward(x)
    }

    /// Save model to file
    pub fn save(&self, path: &str) -> crate::Result<()>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(self.clone().into_record(), path.into())
            .map_err(|e| PredictorError::Artifact {
                path: path.to_string(),
                message: e.to_string(),
            })
    }

    /// Load model from file
    pub fn load(device: &B::Device, path: &str, config: &MLPConfig) -> crate::Result<Self>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(path.into(), device)
            .map_err(|e| PredictorError::Artifact {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let model = Self::new(device, config);
        Ok(model.load_record(record))
    }
}

/// Runs single rows through an [`MLPModel`]
#[derive(Debug)]
pub struct NeuralRegressor<B: Backend> {
    // Burn modules are Send but not Sync
    model: Mutex<MLPModel<B>>,
    input_dim: usize,
    device: B::Device,
}

impl<B: Backend> NeuralRegressor<B> {
    pub fn new(model: MLPModel<B>, config: &MLPConfig, device: B::Device) -> Self {
        NeuralRegressor {
            model: Mutex::new(model),
            input_dim: config.input_dim,
            device,
        }
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }
}

impl<B: Backend> Regressor for NeuralRegressor<B> {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.input_dim {
            return Err(ModelError::InputDimension {
                expected: self.input_dim,
                got: features.len(),
            });
        }

        let row: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let input = Tensor::<B, 1>::from_floats(row.as_slice(), &self.device)
            .reshape([1, self.input_dim]);

        let model = self
            .model
            .lock()
            .map_err(|_| ModelError::Backend("network lock poisoned".to_string()))?;
        let output = model
            .forward(input)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| ModelError::Backend(format!("{:?}", e)))?;

        match output.first() {
            Some(v) if v.is_finite() => Ok(*v as f64),
            Some(_) => Err(ModelError::NonFinite),
            None => Err(ModelError::Backend("network returned no output".to_string())),
        }
    }
}
