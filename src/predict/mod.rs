pub mod features;
pub mod predictor;

pub use features::FeatureVector;
pub use predictor::{ForestParams, Label, OutcomePredictor, TrainedForest};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictError {
    #[error("model not initialized: train() must complete before predict()")]
    NotTrained,

    #[error("shape mismatch: expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("training set has {rows} rows but {labels} labels")]
    LabelCountMismatch { rows: usize, labels: usize },

    #[error("label {0} is not 0 or 1")]
    InvalidLabel(u8),

    #[error("training labels must contain both classes")]
    SingleClass,

    #[error("classifier error: {0}")]
    Model(String),

    #[error("training task failed: {0}")]
    Training(String),
}
