use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::predict::ForestParams;

/// IPL match winner predictor
#[derive(Parser, Debug, Clone)]
#[command(name = "ipl-predictor", version, about)]
pub struct Config {
    /// Dashboard listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// Gemini API key (stats fall back to defaults when absent)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini REST base URL
    #[arg(
        long,
        env = "GEMINI_API_URL",
        default_value = "https://generativelanguage.googleapis.com/v1beta"
    )]
    pub gemini_api_url: String,

    /// Gemini model used for team stats
    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-1.5-flash")]
    pub gemini_model: String,

    /// Timeout for one stats request in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// How long generated team stats are reused, in seconds (0 disables)
    #[arg(long, env = "STATS_CACHE_TTL_SECS", default_value = "3600")]
    pub stats_cache_ttl_secs: u64,

    /// Trees in the classifier ensemble
    #[arg(long, env = "N_TREES", default_value = "100")]
    pub n_trees: u16,

    /// Synthetic training rows per training run
    #[arg(long, env = "TRAINING_ROWS", default_value = "500")]
    pub training_rows: usize,

    /// Seed for the classifier RNG
    #[arg(long, env = "MODEL_SEED", default_value = "42")]
    pub seed: u64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.n_trees == 0 {
            anyhow::bail!("n_trees must be at least 1");
        }
        if self.training_rows < 2 {
            anyhow::bail!("training_rows must be at least 2");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be positive");
        }
        url::Url::parse(&self.gemini_api_url)
            .map_err(|e| anyhow::anyhow!("invalid GEMINI_API_URL '{}': {}", self.gemini_api_url, e))?;
        self.dashboard_addr
            .parse::<SocketAddr>()
            .map_err(|e| anyhow::anyhow!("invalid DASHBOARD_ADDR '{}': {}", self.dashboard_addr, e))?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stats_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.stats_cache_ttl_secs)
    }

    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_trees: self.n_trees,
            training_rows: self.training_rows,
            seed: Some(self.seed),
            ..ForestParams::default()
        }
    }
}
