use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::engine::{MatchEngine, MatchupError};
use crate::models::{Matchup, TEAMS, VENUES, WEATHER};

#[derive(Clone)]
pub struct AppState {
    pub engine: MatchEngine,
}

#[derive(Serialize)]
struct Options {
    teams: &'static [&'static str],
    venues: &'static [&'static str],
    weather: &'static [&'static str],
}

/// Build the Axum router for the prediction form and its JSON API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/options", get(options_handler))
        .route("/api/predict", post(predict_handler))
        .route("/api/teams/:team/stats", get(team_stats_handler))
        .route("/api/model", get(model_handler))
        .route("/api/model/retrain", post(retrain_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

async fn index_handler() -> impl IntoResponse {
    Html(FORM_HTML)
}

/// GET /api/options
async fn options_handler() -> impl IntoResponse {
    Json(Options {
        teams: TEAMS,
        venues: VENUES,
        weather: WEATHER,
    })
}

/// POST /api/predict
async fn predict_handler(
    State(state): State<Arc<AppState>>,
    Json(matchup): Json<Matchup>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.engine.predict_match(&matchup).await {
        Ok(report) => Ok(Json(report)),
        Err(e) if e.downcast_ref::<MatchupError>().is_some() => {
            Err((StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e) => {
            error!("Prediction failed: {:#}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// GET /api/teams/:team/stats
async fn team_stats_handler(
    State(state): State<Arc<AppState>>,
    Path(team): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .engine
        .team_stats(&team)
        .await
        .map(Json)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

/// GET /api/model
async fn model_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.status().await)
}

/// POST /api/model/retrain
async fn retrain_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .engine
        .retrain()
        .await
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Embedded single-file form (HTML + CSS + JS)
const FORM_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>IPL Match Predictor</title>
<style>
  :root {
    --bg: #0f1117;
    --card: #1a1d27;
    --border: #2a2d3a;
    --accent: #6c63ff;
    --green: #00c896;
    --orange: #ff9800;
    --text: #e0e0e0;
    --muted: #8888aa;
  }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: var(--bg); color: var(--text); font-family: 'Segoe UI', system-ui, sans-serif; }
  header { padding: 1rem 2rem; border-bottom: 1px solid var(--border); }
  header h1 { font-size: 1.4rem; font-weight: 700; }
  main { max-width: 640px; margin: 0 auto; padding: 1.5rem 1rem; display: grid; gap: 1.5rem; }
  .panel { background: var(--card); border: 1px solid var(--border); border-radius: 10px; padding: 1.2rem; }
  label { display: block; color: var(--muted); font-size: .8rem; text-transform: uppercase; letter-spacing: .06em; margin: .8rem 0 .3rem; }
  select { width: 100%; padding: .5rem; background: var(--bg); color: var(--text); border: 1px solid var(--border); border-radius: 6px; }
  button { margin-top: 1.2rem; width: 100%; padding: .7rem; background: var(--accent); color: #fff; border: none; border-radius: 6px; font-weight: 700; cursor: pointer; }
  button:disabled { opacity: .5; cursor: wait; }
  .winner { font-size: 1.3rem; font-weight: 700; color: var(--green); }
  .prob { margin-top: .4rem; color: var(--muted); }
  .warn { margin-top: .6rem; color: var(--orange); font-size: .85rem; }
  table { width: 100%; border-collapse: collapse; margin-top: 1rem; }
  th, td { padding: .6rem; border-bottom: 1px solid var(--border); font-size: .9rem; }
  th { text-align: left; color: var(--muted); font-size: .75rem; text-transform: uppercase; }
  td.num { text-align: center; }
  .hidden { display: none; }
</style>
</head>
<body>
<header><h1>🏏 IPL Match Win Predictor</h1></header>
<main>
  <div class="panel">
    <label for="team1">Team 1</label><select id="team1"></select>
    <label for="team2">Team 2</label><select id="team2"></select>
    <label for="toss">Toss Winner</label><select id="toss"></select>
    <label for="venue">Venue</label><select id="venue"></select>
    <label for="weather">Weather</label><select id="weather"></select>
    <button id="predict" onclick="predict()">Predict Winner</button>
  </div>

  <div class="panel hidden" id="result">
    <div class="winner" id="r-winner"></div>
    <div class="prob" id="r-prob"></div>
    <div class="warn hidden" id="r-warn"></div>
    <table>
      <thead><tr><th>Metric</th><th id="h-team1"></th><th id="h-team2"></th></tr></thead>
      <tbody id="r-stats"></tbody>
    </table>
  </div>
</main>
<script>
const $ = id => document.getElementById(id);

function fill(sel, values) {
  sel.innerHTML = values.map(v => `<option>${v}</option>`).join('');
}

function syncToss() {
  const prev = $('toss').value;
  const opts = [$('team1').value, $('team2').value];
  fill($('toss'), opts);
  if (opts.includes(prev)) $('toss').value = prev;
}

async function loadOptions() {
  const r = await fetch('/api/options');
  const o = await r.json();
  fill($('team1'), o.teams);
  fill($('team2'), o.teams);
  if (o.teams.length > 1) $('team2').value = o.teams[1];
  fill($('venue'), o.venues);
  fill($('weather'), o.weather);
  syncToss();
  $('team1').onchange = syncToss;
  $('team2').onchange = syncToss;
}

async function predict() {
  const btn = $('predict');
  btn.disabled = true;
  btn.textContent = 'Fetching team stats…';
  try {
    const body = {
      team1: $('team1').value,
      team2: $('team2').value,
      toss_winner: $('toss').value,
      venue: $('venue').value,
      weather: $('weather').value,
    };
    const r = await fetch('/api/predict', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify(body),
    });
    if (!r.ok) { alert(await r.text()); return; }
    render(await r.json());
  } finally {
    btn.disabled = false;
    btn.textContent = 'Predict Winner';
  }
}

function render(rep) {
  $('result').classList.remove('hidden');
  $('r-winner').textContent = `🏆 Predicted Winner: ${rep.winner}`;
  $('r-prob').textContent = `📊 Winning Probability: ${rep.confidence_pct.toFixed(2)}%`;
  const degraded = [rep.team1_stats, rep.team2_stats].filter(s => s.source.kind === 'fallback');
  const warn = $('r-warn');
  if (degraded.length) {
    warn.textContent = `Default stats used for ${degraded.map(s => s.team).join(', ')}`;
    warn.classList.remove('hidden');
  } else {
    warn.classList.add('hidden');
  }
  $('h-team1').textContent = rep.matchup.team1;
  $('h-team2').textContent = rep.matchup.team2;
  const a = rep.team1_stats.stats, b = rep.team2_stats.stats;
  $('r-stats').innerHTML = [
    ['Batting Average', a.batting_avg, b.batting_avg],
    ['Bowling Average', a.bowling_avg, b.bowling_avg],
    ['Recent Form', a.recent_form, b.recent_form],
  ].map(([m, x, y]) => `<tr><td>${m}</td><td class="num">${x}</td><td class="num">${y}</td></tr>`).join('');
}

loadOptions();
</script>
</body>
</html>
"#;
