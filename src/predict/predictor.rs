//! Match-outcome classifier.
//!
//! The forest is fitted on uniformly random rows with uniformly random
//! labels, so its output carries no information about the inputs. It stands
//! in for a real model with the same input and output shape.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::info;

use super::features::{FeatureVector, N_FEATURES};
use super::PredictError;

type Forest = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_trees: u16,
    /// Synthetic rows drawn per `train()` call
    pub training_rows: usize,
    pub max_depth: Option<u16>,
    pub min_samples_split: usize,
    /// Fixed RNG seed; `None` seeds from OS entropy
    pub seed: Option<u64>,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_trees: 100,
            training_rows: 500,
            max_depth: None,
            min_samples_split: 2,
            seed: None,
        }
    }
}

/// Predicted class. `Team1` is label 0, `Team2` is label 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Label {
    Team1,
    Team2,
}

impl Label {
    pub fn index(self) -> usize {
        match self {
            Label::Team1 => 0,
            Label::Team2 => 1,
        }
    }

    pub fn as_u8(self) -> u8 {
        self.index() as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub label: Label,
    /// `[p(label 0), p(label 1)]`
    pub probabilities: [f64; 2],
}

impl Prediction {
    /// Probability of the predicted label.
    pub fn confidence(&self) -> f64 {
        self.probabilities[self.label.index()]
    }
}

fn model_error(context: &str, e: impl std::fmt::Display) -> PredictError {
    PredictError::Model(format!("{}: {}", context, e))
}

/// A fitted forest not yet installed in an `OutcomePredictor`.
///
/// Fitting needs no access to the predictor, so callers can fit off the
/// request path and swap the result in afterwards.
pub struct TrainedForest {
    forest: Forest,
    rows: usize,
    elapsed: Duration,
}

impl TrainedForest {
    /// Fit on `params.training_rows` uniformly random rows and labels.
    pub fn synthetic(params: &ForestParams, seed: u64) -> Result<Self, PredictError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let rows = params.training_rows;
        let x: Vec<Vec<f64>> = (0..rows)
            .map(|_| (0..N_FEATURES).map(|_| rng.gen::<f64>()).collect())
            .collect();
        let mut y: Vec<u8> = (0..rows).map(|_| rng.gen_range(0..2u8)).collect();
        // Both classes must be present for a two-column probability output.
        if y.len() > 1 && y.iter().all(|&l| l == y[0]) {
            y[0] = 1 - y[0];
        }
        Self::fit(params, &x, &y, rng.gen())
    }

    /// Fit on caller-supplied rows. Every row must have `N_FEATURES` columns
    /// and the labels must contain both 0 and 1.
    pub fn fit(
        params: &ForestParams,
        x: &[Vec<f64>],
        y: &[u8],
        seed: u64,
    ) -> Result<Self, PredictError> {
        if x.is_empty() {
            return Err(PredictError::EmptyTrainingSet);
        }
        if let Some(row) = x.iter().find(|r| r.len() != N_FEATURES) {
            return Err(PredictError::ShapeMismatch {
                expected: N_FEATURES,
                actual: row.len(),
            });
        }
        if x.len() != y.len() {
            return Err(PredictError::LabelCountMismatch {
                rows: x.len(),
                labels: y.len(),
            });
        }
        if let Some(&label) = y.iter().find(|&&l| l > 1) {
            return Err(PredictError::InvalidLabel(label));
        }
        if !(y.contains(&0) && y.contains(&1)) {
            return Err(PredictError::SingleClass);
        }

        let started = Instant::now();
        let x_m = DenseMatrix::from_2d_vec(&x.to_vec())
            .map_err(|e| model_error("matrix creation failed", e))?;
        let labels: Vec<u32> = y.iter().map(|&l| u32::from(l)).collect();

        let mut forest_params = RandomForestClassifierParameters::default()
            .with_n_trees(params.n_trees.into())
            .with_min_samples_split(params.min_samples_split)
            .with_seed(seed);
        if let Some(depth) = params.max_depth {
            forest_params = forest_params.with_max_depth(depth.into());
        }

        let forest = RandomForestClassifier::fit(&x_m, &labels, forest_params)
            .map_err(|e| model_error("training failed", e))?;
        Ok(TrainedForest {
            forest,
            rows: x.len(),
            elapsed: started.elapsed(),
        })
    }
}

/// Owns the classifier for the life of the process.
///
/// Starts untrained; `predict` fails with `PredictError::NotTrained` until
/// the first `train` completes. There is no way back to the untrained state.
pub struct OutcomePredictor {
    params: ForestParams,
    rng: Mutex<StdRng>,
    forest: Option<Forest>,
    generation: u64,
    trained_at: Option<DateTime<Utc>>,
}

impl OutcomePredictor {
    pub fn new(params: ForestParams) -> Self {
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        OutcomePredictor {
            params,
            rng: Mutex::new(rng),
            forest: None,
            generation: 0,
            trained_at: None,
        }
    }

    /// Seed for the next fit. Successive calls yield different seeds, so
    /// every training run samples new data even with a fixed `params.seed`.
    pub fn next_seed(&self) -> u64 {
        self.rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .gen()
    }

    /// Fit a new forest on freshly sampled random data.
    pub fn train(&mut self) -> Result<(), PredictError> {
        let model = TrainedForest::synthetic(&self.params, self.next_seed())?;
        self.install(model);
        Ok(())
    }

    /// Fit on caller-supplied rows and install the result.
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<(), PredictError> {
        let model = TrainedForest::fit(&self.params, x, y, self.next_seed())?;
        self.install(model);
        Ok(())
    }

    /// Replace the served forest with `model`.
    pub fn install(&mut self, model: TrainedForest) {
        self.generation += 1;
        self.trained_at = Some(Utc::now());
        info!(
            "Classifier trained: generation={} trees={} features={} rows={} in {:?}",
            self.generation, self.params.n_trees, N_FEATURES, model.rows, model.elapsed
        );
        self.forest = Some(model.forest);
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction, PredictError> {
        let forest = self.forest.as_ref().ok_or(PredictError::NotTrained)?;
        let x = DenseMatrix::from_2d_vec(&vec![features.as_array().to_vec()])
            .map_err(|e| model_error("matrix creation failed", e))?;
        let proba = forest
            .predict_proba(&x)
            .map_err(|e| model_error("prediction failed", e))?;
        let (rows, cols) = proba.shape();
        if rows != 1 || cols != 2 {
            return Err(model_error(
                "unexpected probability shape",
                format!("{}x{}", rows, cols),
            ));
        }

        // Columns follow the sorted class labels: 0 then 1.
        let p1 = (*proba.get((0, 1))).clamp(0.0, 1.0);
        let probabilities = [1.0 - p1, p1];
        // Ties go to label 0.
        let label = if probabilities[1] > probabilities[0] {
            Label::Team2
        } else {
            Label::Team1
        };
        Ok(Prediction {
            label,
            probabilities,
        })
    }

    pub fn is_trained(&self) -> bool {
        self.forest.is_some()
    }

    /// Number of completed trainings.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn trained_at(&self) -> Option<DateTime<Utc>> {
        self.trained_at
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TeamStats;
    use approx::assert_abs_diff_eq;

    fn seeded(seed: u64) -> OutcomePredictor {
        OutcomePredictor::new(ForestParams {
            seed: Some(seed),
            ..ForestParams::default()
        })
    }

    fn fallback_vector() -> FeatureVector {
        FeatureVector::from_matchup(true, &TeamStats::FALLBACK, &TeamStats::FALLBACK)
    }

    /// Every column moves with the toss flag, so any sampled feature splits.
    fn toss_row(toss: f64) -> Vec<f64> {
        vec![
            toss,
            30.0 + 10.0 * toss,
            25.0 - 5.0 * toss,
            0.4 + 0.2 * toss,
            30.0 - 4.0 * toss,
            25.0 + 3.0 * toss,
            0.6 - 0.3 * toss,
        ]
    }

    #[test]
    fn test_predict_before_train_fails() {
        let predictor = seeded(1);
        assert!(!predictor.is_trained());
        assert_eq!(predictor.generation(), 0);
        assert!(predictor.trained_at().is_none());
        assert_eq!(
            predictor.predict(&fallback_vector()).unwrap_err(),
            PredictError::NotTrained
        );
    }

    #[test]
    fn test_trained_prediction_shape() {
        let mut predictor = seeded(42);
        predictor.train().unwrap();
        assert!(predictor.is_trained());

        let inputs = [
            fallback_vector(),
            FeatureVector::try_from(&[0.0, 0.1, 0.9, 0.3, 0.7, 0.2, 0.8][..]).unwrap(),
            FeatureVector::try_from(&[1.0, 55.0, 18.0, 1.0, 22.0, 40.0, 0.0][..]).unwrap(),
        ];
        for fv in &inputs {
            let p = predictor.predict(fv).unwrap();
            assert!(matches!(p.label, Label::Team1 | Label::Team2));
            assert!(p.probabilities.iter().all(|v| (0.0..=1.0).contains(v)));
            assert_abs_diff_eq!(p.probabilities[0] + p.probabilities[1], 1.0, epsilon = 1e-6);
            assert!(p.confidence() >= 0.5);
        }
    }

    #[test]
    fn test_retrain_bumps_generation() {
        let mut predictor = seeded(3);
        predictor.train().unwrap();
        let first = predictor.trained_at();
        predictor.train().unwrap();
        assert_eq!(predictor.generation(), 2);
        assert!(predictor.trained_at() >= first);
        // Labels may differ between generations; only the shape is stable.
        let p = predictor.predict(&fallback_vector()).unwrap();
        assert_abs_diff_eq!(p.probabilities.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_same_seed_same_first_model() {
        let mut a = seeded(11);
        let mut b = seeded(11);
        a.train().unwrap();
        b.train().unwrap();
        let fv = fallback_vector();
        assert_eq!(a.predict(&fv).unwrap(), b.predict(&fv).unwrap());
    }

    #[test]
    fn test_successive_seeds_differ() {
        let predictor = seeded(11);
        assert_ne!(predictor.next_seed(), predictor.next_seed());
    }

    #[test]
    fn test_fit_rejects_wrong_width() {
        let mut predictor = seeded(0);
        let err = predictor.fit(&[vec![0.0; 6]], &[1]).unwrap_err();
        assert_eq!(
            err,
            PredictError::ShapeMismatch {
                expected: 7,
                actual: 6
            }
        );
        assert!(!predictor.is_trained());
    }

    #[test]
    fn test_fit_rejects_bad_labels() {
        let params = ForestParams::default();
        let x = vec![toss_row(0.0), toss_row(1.0)];
        assert_eq!(
            TrainedForest::fit(&params, &x, &[0], 1).err(),
            Some(PredictError::LabelCountMismatch { rows: 2, labels: 1 })
        );
        assert_eq!(
            TrainedForest::fit(&params, &x, &[0, 2], 1).err(),
            Some(PredictError::InvalidLabel(2))
        );
        assert_eq!(
            TrainedForest::fit(&params, &x, &[1, 1], 1).err(),
            Some(PredictError::SingleClass)
        );
        assert_eq!(
            TrainedForest::fit(&params, &[], &[], 1).err(),
            Some(PredictError::EmptyTrainingSet)
        );
    }

    #[test]
    fn test_synthetic_fit_with_two_rows() {
        let params = ForestParams {
            n_trees: 5,
            training_rows: 2,
            ..ForestParams::default()
        };
        for seed in 0..20 {
            assert!(TrainedForest::synthetic(&params, seed).is_ok());
        }
    }

    #[test]
    fn test_fit_uses_supplied_rows() {
        let mut predictor = OutcomePredictor::new(ForestParams {
            n_trees: 15,
            max_depth: Some(4),
            seed: Some(5),
            ..ForestParams::default()
        });
        let x: Vec<Vec<f64>> = (0..200).map(|i| toss_row((i % 2) as f64)).collect();
        let y: Vec<u8> = (0..200).map(|i| (i % 2) as u8).collect();
        predictor.fit(&x, &y).unwrap();

        let team2 = predictor
            .predict(&FeatureVector::try_from(&toss_row(1.0)[..]).unwrap())
            .unwrap();
        let team1 = predictor
            .predict(&FeatureVector::try_from(&toss_row(0.0)[..]).unwrap())
            .unwrap();
        assert_eq!(team2.label, Label::Team2);
        assert_eq!(team1.label, Label::Team1);
        assert_abs_diff_eq!(team1.probabilities.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
        assert!(team1.confidence() > 0.9);
    }

    #[test]
    fn test_installed_forest_replaces_previous() {
        let mut predictor = seeded(8);
        let model = TrainedForest::synthetic(predictor.params(), predictor.next_seed()).unwrap();
        assert!(!predictor.is_trained());
        predictor.install(model);
        assert!(predictor.is_trained());
        assert_eq!(predictor.generation(), 1);
        assert!(predictor.predict(&fallback_vector()).is_ok());
    }

    #[test]
    fn test_label_indices() {
        assert_eq!(Label::Team1.as_u8(), 0);
        assert_eq!(Label::Team2.as_u8(), 1);
    }
}
