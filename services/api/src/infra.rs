use chrono::NaiveDate;
use hireflow::config::{AppConfig, BackendConfig};
use hireflow::error::AppError;
use hireflow::pipeline::{
    GatewayError, HttpScoringGateway, LoadOutcome, RecruitingSession, ScoreFilter,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::cli::BackendArgs;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type LiveSession = RecruitingSession<HttpScoringGateway>;

/// Fold command-line backend overrides into the loaded configuration.
pub(crate) fn apply_backend_overrides(
    config: &mut AppConfig,
    overrides: &BackendArgs,
) -> Result<(), AppError> {
    if let Some(url) = overrides.backend_url.as_deref() {
        config.backend.base_url = BackendConfig::normalize_url(url)?;
    }
    if let Some(token) = overrides.token.as_deref() {
        let token = token.trim();
        config.backend.api_token = (!token.is_empty()).then(|| token.to_string());
    }
    Ok(())
}

pub(crate) fn build_session(config: &AppConfig) -> Result<Arc<LiveSession>, AppError> {
    let gateway = HttpScoringGateway::new(
        config.backend.base_url.clone(),
        config.backend.api_token.clone(),
    )?;
    Ok(Arc::new(RecruitingSession::new(
        Arc::new(gateway),
        config.pipeline.delete_consistency,
    )))
}

/// Treat anything but a committed load as a command failure.
pub(crate) fn require_loaded(outcome: LoadOutcome) -> Result<usize, AppError> {
    match outcome {
        LoadOutcome::Loaded { candidates, .. } => Ok(candidates),
        LoadOutcome::Unauthorized => Err(GatewayError::Unauthorized.into()),
        LoadOutcome::Failed { reason } => Err(GatewayError::Transport(reason).into()),
        LoadOutcome::Skipped | LoadOutcome::Superseded => Err(GatewayError::Transport(
            "screening results load did not complete".to_string(),
        )
        .into()),
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_score_filter(raw: &str) -> Result<ScoreFilter, String> {
    ScoreFilter::parse(raw)
        .ok_or_else(|| format!("unknown score filter '{raw}' (all, excellent, good, fair, low)"))
}
