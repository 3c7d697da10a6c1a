use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// IPL franchises offered by the form.
pub const TEAMS: &[&str] = &["CSK", "MI", "RCB", "KKR", "DC", "PBKS", "RR", "SRH", "GT", "LSG"];

pub const VENUES: &[&str] = &[
    "M Chinnaswamy Stadium, Bengaluru",
    "Wankhede Stadium, Mumbai",
    "MA Chidambaram Stadium, Chennai",
    "Arun Jaitley Stadium, Delhi",
    "Eden Gardens, Kolkata",
    "Narendra Modi Stadium, Ahmedabad",
    "Rajiv Gandhi International Stadium, Hyderabad",
    "Sawai Mansingh Stadium, Jaipur",
    "Punjab Cricket Association IS Bindra Stadium, Mohali",
    "Bharat Ratna Shri Atal Bihari Vajpayee Ekana Stadium, Lucknow",
    "DY Patil Stadium, Navi Mumbai",
    "Brabourne Stadium, Mumbai",
    "Dr YS Rajasekhara Reddy ACA-VDCA Stadium, Visakhapatnam",
    "Barsapara Cricket Stadium, Guwahati",
    "Holkar Cricket Stadium, Indore",
    "Greenfield International Stadium, Thiruvananthapuram",
];

pub const WEATHER: &[&str] = &["Clear", "Cloudy", "Hot", "Humid"];

/// Recent-performance numbers for one team.
///
/// Field names double as the JSON keys the text service is asked to emit.
/// Ranges are not checked: a `recent_form` of 1.7 is accepted as is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamStats {
    pub batting_avg: f64,
    pub bowling_avg: f64,
    /// Intended to be in [0, 1]
    pub recent_form: f64,
}

impl TeamStats {
    /// Record used whenever the stats service cannot be used.
    pub const FALLBACK: TeamStats = TeamStats {
        batting_avg: 35.0,
        bowling_avg: 28.0,
        recent_form: 0.5,
    };

    pub fn is_finite(&self) -> bool {
        self.batting_avg.is_finite() && self.bowling_avg.is_finite() && self.recent_form.is_finite()
    }
}

/// How a `TeamStats` record was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatsSource {
    /// Fresh response from the text service
    Generated,
    /// Served from the per-team cache
    Cached,
    /// Service unusable; `TeamStats::FALLBACK` was substituted
    Fallback { reason: String },
}

/// Stats for one team together with their provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStats {
    pub team: String,
    pub stats: TeamStats,
    pub source: StatsSource,
}

impl ResolvedStats {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, StatsSource::Fallback { .. })
    }
}

/// User selection submitted by the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    pub team1: String,
    pub team2: String,
    /// Must name `team1` or `team2`
    pub toss_winner: String,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub weather: Option<String>,
}

/// Full answer for one prediction request.
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub matchup: Matchup,
    pub winner: String,
    /// 0 selects team1, 1 selects team2
    pub label: u8,
    /// Probability of label 0 and label 1
    pub probabilities: [f64; 2],
    /// Probability of the predicted label, as a percentage
    pub confidence_pct: f64,
    pub features: [f64; 7],
    pub team1_stats: ResolvedStats,
    pub team2_stats: ResolvedStats,
    pub predicted_at: DateTime<Utc>,
}
