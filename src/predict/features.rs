use serde::Serialize;

use super::PredictError;
use crate::models::TeamStats;

/// Width of every row the classifier is trained on and asked about.
pub const N_FEATURES: usize = 7;

/// Classifier input in fixed column order:
/// `[toss_is_team1, t1.batting, t1.bowling, t1.form, t2.batting, t2.bowling, t2.form]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; N_FEATURES]);

impl FeatureVector {
    pub fn from_matchup(toss_is_team1: bool, team1: &TeamStats, team2: &TeamStats) -> Self {
        FeatureVector([
            if toss_is_team1 { 1.0 } else { 0.0 },
            team1.batting_avg,
            team1.bowling_avg,
            team1.recent_form,
            team2.batting_avg,
            team2.bowling_avg,
            team2.recent_form,
        ])
    }

    pub fn as_array(&self) -> &[f64; N_FEATURES] {
        &self.0
    }
}

impl TryFrom<&[f64]> for FeatureVector {
    type Error = PredictError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        let row: [f64; N_FEATURES] = values
            .try_into()
            .map_err(|_| PredictError::ShapeMismatch {
                expected: N_FEATURES,
                actual: values.len(),
            })?;
        Ok(FeatureVector(row))
    }
}
