//! Prompt construction and cleanup of free-text stats responses.
//!
//! The service is asked for a bare JSON object but frequently wraps it in a
//! markdown code fence, so every delimiter is stripped before parsing.

use anyhow::{bail, Context, Result};
use regex::Regex;
use std::sync::LazyLock;

use crate::models::TeamStats;

static CODE_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)```(?:json)?").ok());

/// Build the request sent to the text service for one team.
pub fn build_stats_prompt(team: &str) -> String {
    format!(
        r#"You are a cricket data analyst.

Give recent IPL performance stats for {team}.
Return ONLY valid JSON in this exact format:

{{
  "batting_avg": 38.5,
  "bowling_avg": 26.4,
  "recent_form": 0.72
}}
"#
    )
}

/// Remove every triple-backtick delimiter (with an optional `json` tag) and
/// trim the surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    match CODE_FENCE.as_ref() {
        Some(re) => re.replace_all(raw.trim(), "").trim().to_string(),
        None => raw.replace("```json", "").replace("```", "").trim().to_string(),
    }
}

/// Parse a cleaned response into a `TeamStats`.
///
/// The object must carry exactly `batting_avg`, `bowling_avg` and
/// `recent_form`, all finite numbers.
pub fn parse_team_stats(raw: &str) -> Result<TeamStats> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        bail!("empty stats response");
    }
    let stats: TeamStats =
        serde_json::from_str(&cleaned).context("stats response is not the expected JSON object")?;
    if !stats.is_finite() {
        bail!("stats response contains non-finite values");
    }
    Ok(stats)
}
