pub mod cache;
pub mod gemini;
pub mod parse;
pub mod provider;

pub use cache::StatsCache;
pub use gemini::GeminiClient;
pub use provider::TextGenerator;

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{ResolvedStats, StatsSource, TeamStats};
use parse::{build_stats_prompt, parse_team_stats};

/// Resolves team stats from a text generator, absorbing every failure into
/// the fallback record.
#[derive(Clone)]
pub struct StatsProvider {
    generator: Arc<dyn TextGenerator>,
    cache: StatsCache,
}

impl StatsProvider {
    pub fn new(generator: Arc<dyn TextGenerator>, cache: StatsCache) -> Self {
        StatsProvider { generator, cache }
    }

    /// Stats for `team`. Never fails: on any error the result carries
    /// `TeamStats::FALLBACK` and a `StatsSource::Fallback` with the reason.
    pub async fn get_team_stats(&self, team: &str) -> ResolvedStats {
        if let Some(stats) = self.cache.get(team).await {
            return ResolvedStats {
                team: team.to_string(),
                stats,
                source: StatsSource::Cached,
            };
        }

        match self.fetch(team).await {
            Ok(stats) => {
                info!(
                    "{} stats for {}: batting={:.2} bowling={:.2} form={:.2}",
                    self.generator.name(),
                    team,
                    stats.batting_avg,
                    stats.bowling_avg,
                    stats.recent_form
                );
                self.cache.insert(team, stats).await;
                ResolvedStats {
                    team: team.to_string(),
                    stats,
                    source: StatsSource::Generated,
                }
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!("Using fallback stats for {}: {}", team, reason);
                ResolvedStats {
                    team: team.to_string(),
                    stats: TeamStats::FALLBACK,
                    source: StatsSource::Fallback { reason },
                }
            }
        }
    }

    /// Number of teams currently held in the cache.
    pub async fn cached_teams(&self) -> usize {
        self.cache.len().await
    }

    async fn fetch(&self, team: &str) -> Result<TeamStats> {
        let prompt = build_stats_prompt(team);
        let text = self.generator.generate(&prompt).await?;
        parse_team_stats(&text)
    }
}
