use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::models::{MatchReport, Matchup, ResolvedStats, TEAMS};
use crate::predict::{FeatureVector, Label, OutcomePredictor, PredictError, TrainedForest};
use crate::stats::StatsProvider;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchupError {
    #[error("team names must not be empty")]
    EmptyTeam,

    #[error("unknown team '{0}'")]
    UnknownTeam(String),

    #[error("toss winner '{toss_winner}' is neither '{team1}' nor '{team2}'")]
    InvalidTossWinner {
        toss_winner: String,
        team1: String,
        team2: String,
    },
}

impl Matchup {
    pub fn validate(&self) -> Result<(), MatchupError> {
        if self.team1.trim().is_empty() || self.team2.trim().is_empty() {
            return Err(MatchupError::EmptyTeam);
        }
        validate_team(&self.team1)?;
        validate_team(&self.team2)?;
        if self.toss_winner != self.team1 && self.toss_winner != self.team2 {
            return Err(MatchupError::InvalidTossWinner {
                toss_winner: self.toss_winner.clone(),
                team1: self.team1.clone(),
                team2: self.team2.clone(),
            });
        }
        Ok(())
    }

    pub fn toss_is_team1(&self) -> bool {
        self.toss_winner == self.team1
    }

    /// Team selected by a predicted label: 0 is team1, 1 is team2.
    pub fn team_for(&self, label: Label) -> &str {
        match label {
            Label::Team1 => &self.team1,
            Label::Team2 => &self.team2,
        }
    }
}

/// Only the catalogued short codes are accepted; matching is exact.
pub fn validate_team(team: &str) -> Result<(), MatchupError> {
    if TEAMS.contains(&team) {
        Ok(())
    } else {
        Err(MatchupError::UnknownTeam(team.to_string()))
    }
}

/// Snapshot of the classifier for the status endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelStatus {
    pub trained: bool,
    pub generation: u64,
    pub trained_at: Option<chrono::DateTime<Utc>>,
    pub n_trees: u16,
    pub training_rows: usize,
    pub cached_teams: usize,
}

/// Runs one prediction: stats for both teams, feature vector, classifier.
#[derive(Clone)]
pub struct MatchEngine {
    stats: StatsProvider,
    predictor: Arc<RwLock<OutcomePredictor>>,
}

impl MatchEngine {
    pub fn new(stats: StatsProvider, predictor: OutcomePredictor) -> Self {
        MatchEngine {
            stats,
            predictor: Arc::new(RwLock::new(predictor)),
        }
    }

    pub async fn team_stats(&self, team: &str) -> Result<ResolvedStats, MatchupError> {
        validate_team(team)?;
        Ok(self.stats.get_team_stats(team).await)
    }

    pub async fn predict_match(&self, matchup: &Matchup) -> Result<MatchReport> {
        matchup.validate()?;

        // The two lookups are independent.
        let (team1_stats, team2_stats) = futures_util::future::join(
            self.stats.get_team_stats(&matchup.team1),
            self.stats.get_team_stats(&matchup.team2),
        )
        .await;

        let features = FeatureVector::from_matchup(
            matchup.toss_is_team1(),
            &team1_stats.stats,
            &team2_stats.stats,
        );
        let prediction = self.predictor.read().await.predict(&features)?;

        let winner = matchup.team_for(prediction.label).to_string();
        let confidence_pct = prediction.confidence() * 100.0;
        info!(
            "Prediction {} vs {} (toss: {}): winner={} confidence={:.2}%{}",
            matchup.team1,
            matchup.team2,
            matchup.toss_winner,
            winner,
            confidence_pct,
            if team1_stats.is_fallback() || team2_stats.is_fallback() {
                " [fallback stats]"
            } else {
                ""
            }
        );

        Ok(MatchReport {
            matchup: matchup.clone(),
            winner,
            label: prediction.label.as_u8(),
            probabilities: prediction.probabilities,
            confidence_pct,
            features: *features.as_array(),
            team1_stats,
            team2_stats,
            predicted_at: Utc::now(),
        })
    }

    /// Refit the classifier. Only ever triggered explicitly.
    ///
    /// The current forest keeps serving while the replacement is fitted; the
    /// write lock is held only for the swap.
    pub async fn retrain(&self) -> Result<ModelStatus, PredictError> {
        let model = self.fit_replacement().await?;
        self.predictor.write().await.install(model);
        Ok(self.status().await)
    }

    async fn fit_replacement(&self) -> Result<TrainedForest, PredictError> {
        let (params, seed) = {
            let predictor = self.predictor.read().await;
            (*predictor.params(), predictor.next_seed())
        };
        tokio::task::spawn_blocking(move || TrainedForest::synthetic(&params, seed))
            .await
            .map_err(|e| PredictError::Training(e.to_string()))?
    }

    pub async fn status(&self) -> ModelStatus {
        let cached_teams = self.stats.cached_teams().await;
        let predictor = self.predictor.read().await;
        ModelStatus {
            trained: predictor.is_trained(),
            generation: predictor.generation(),
            trained_at: predictor.trained_at(),
            n_trees: predictor.params().n_trees,
            training_rows: predictor.params().training_rows,
            cached_teams,
        }
    }
}
