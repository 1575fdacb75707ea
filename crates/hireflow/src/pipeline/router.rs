use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{Candidate, CandidateId, JobId, PipelineStatus, TagId};
use super::filter::{FilterCriteria, ScoreFilter};
use super::gateway::ScoringGateway;
use super::loader::LoadOutcome;
use super::session::RecruitingSession;
use crate::error::AppError;

pub const DEFAULT_ACTIVITY_LIMIT: usize = 50;

/// Router exposing the recruiting session over HTTP.
pub fn pipeline_router<G>(session: Arc<RecruitingSession<G>>) -> Router
where
    G: ScoringGateway + 'static,
{
    Router::new()
        .route("/api/v1/session/refresh", post(refresh_handler::<G>))
        .route("/api/v1/candidates", get(list_handler::<G>))
        .route("/api/v1/candidates/summary", get(summary_handler::<G>))
        .route(
            "/api/v1/candidates/bulk/delete",
            post(bulk_delete_handler::<G>),
        )
        .route(
            "/api/v1/candidates/bulk/export",
            post(bulk_export_handler::<G>),
        )
        .route(
            "/api/v1/candidates/bulk/compare",
            post(compare_handler::<G>),
        )
        .route(
            "/api/v1/candidates/:id/jobs/:job_id/status",
            put(status_handler::<G>),
        )
        .route("/api/v1/candidates/:id/notes", post(note_handler::<G>))
        .route(
            "/api/v1/candidates/:id/tags/:tag_id",
            put(add_tag_handler::<G>).delete(remove_tag_handler::<G>),
        )
        .route(
            "/api/v1/candidates/:id/shortlist",
            post(shortlist_handler::<G>),
        )
        .route("/api/v1/jobs/:job_id/board", get(board_handler::<G>))
        .route(
            "/api/v1/jobs/:job_id/questions",
            get(questions_handler::<G>),
        )
        .route("/api/v1/activity", get(activity_handler::<G>))
        .with_state(session)
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<u64>,
}

/// Query-string form of [`FilterCriteria`].
#[derive(Debug, Default, Deserialize)]
pub struct CandidateQuery {
    pub job_id: Option<String>,
    pub shortlisted: Option<bool>,
    pub q: Option<String>,
    pub score: Option<ScoreFilter>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
}

impl CandidateQuery {
    pub fn criteria(self) -> FilterCriteria {
        let defaults = FilterCriteria::default();
        FilterCriteria {
            job_id: self
                .job_id
                .filter(|job_id| !job_id.trim().is_empty())
                .map(JobId),
            shortlisted_only: self.shortlisted.unwrap_or(false),
            search: self.q.unwrap_or_default(),
            score_filter: self.score.unwrap_or_default(),
            min_score: self.min_score.unwrap_or(defaults.min_score),
            max_score: self.max_score.unwrap_or(defaults.max_score),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CandidateView {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub match_level: &'static str,
    pub shortlisted: bool,
    pub tags: Vec<TagId>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: PipelineStatus,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct IdsRequest {
    pub ids: Vec<CandidateId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExportRequest {
    pub criteria: FilterCriteria,
    pub ids: Vec<CandidateId>,
    pub job_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn unknown_candidate(id: &CandidateId) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("unknown candidate '{id}'"))
}

fn unknown_job(id: &JobId) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("unknown job '{id}'"))
}

pub(crate) async fn refresh_handler<G>(
    State(session): State<Arc<RecruitingSession<G>>>,
    request: Option<Json<RefreshRequest>>,
) -> Response
where
    G: ScoringGateway + 'static,
{
    let refresh_token = request.and_then(|Json(request)| request.refresh_token);
    let outcome = session.refresh(refresh_token).await;
    let status = match outcome {
        LoadOutcome::Unauthorized => StatusCode::UNAUTHORIZED,
        LoadOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
        LoadOutcome::Loaded { .. } | LoadOutcome::Skipped | LoadOutcome::Superseded => {
            StatusCode::OK
        }
    };
    (status, Json(outcome)).into_response()
}

pub(crate) async fn list_handler<G>(
    State(session): State<Arc<RecruitingSession<G>>>,
    Query(query): Query<CandidateQuery>,
) -> Response
where
    G: ScoringGateway + 'static,
{
    let criteria = query.criteria();
    let views: Vec<CandidateView> = session.store().read(|store| {
        criteria
            .apply(store)
            .into_iter()
            .map(|candidate| CandidateView {
                match_level: candidate.match_level().label(),
                shortlisted: store.is_shortlisted(&candidate.id),
                tags: store
                    .candidate_tags(&candidate.id)
                    .map(|tags| tags.iter().cloned().collect())
                    .unwrap_or_default(),
                candidate,
            })
            .collect()
    });
    (StatusCode::OK, Json(views)).into_response()
}

pub(crate) async fn summary_handler<G>(
    State(session): State<Arc<RecruitingSession<G>>>,
    Query(query): Query<CandidateQuery>,
) -> Response
where
    G: ScoringGateway + 'static,
{
    let summary = session.summary(&query.criteria());
    (StatusCode::OK, Json(summary)).into_response()
}

pub(crate) async fn status_handler<G>(
    State(session): State<Arc<RecruitingSession<G>>>,
    Path((candidate_id, job_id)): Path<(String, String)>,
    Json(request): Json<StatusRequest>,
) -> Response
where
    G: ScoringGateway + 'static,
{
    let candidate_id = CandidateId(candidate_id);
    if !session.contains(&candidate_id) {
        return unknown_candidate(&candidate_id);
    }

    let assignment = session
        .pipeline()
        .set_status(&candidate_id, &JobId(job_id), request.status);
    (StatusCode::OK, Json(assignment)).into_response()
}

pub(crate) async fn note_handler<G>(
    State(session): State<Arc<RecruitingSession<G>>>,
    Path(candidate_id): Path<String>,
    Json(request): Json<NoteRequest>,
) -> Response
where
    G: ScoringGateway + 'static,
{
    let candidate_id = CandidateId(candidate_id);
    if !session.contains(&candidate_id) {
        return unknown_candidate(&candidate_id);
    }

    let content = request.content.trim();
    if content.is_empty() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "note content must not be blank",
        );
    }

    let note = session.annotations().add_note(&candidate_id, content);
    (StatusCode::CREATED, Json(note)).into_response()
}

async fn tag_membership<G>(
    session: Arc<RecruitingSession<G>>,
    candidate_id: String,
    tag_id: String,
    attach: bool,
) -> Response
where
    G: ScoringGateway + 'static,
{
    let candidate_id = CandidateId(candidate_id);
    let tag_id = TagId(tag_id);
    if !session.contains(&candidate_id) {
        return unknown_candidate(&candidate_id);
    }
    if session.tag(&tag_id).is_none() {
        return error_response(StatusCode::NOT_FOUND, format!("unknown tag '{}'", tag_id.0));
    }

    let annotations = session.annotations();
    let changed = if attach {
        annotations.add_tag(&candidate_id, &tag_id)
    } else {
        annotations.remove_tag(&candidate_id, &tag_id)
    };
    let payload = json!({
        "candidate_id": candidate_id,
        "changed": changed,
        "tags": annotations.tags_for(&candidate_id),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn add_tag_handler<G>(
    State(session): State<Arc<RecruitingSession<G>>>,
    Path((candidate_id, tag_id)): Path<(String, String)>,
) -> Response
where
    G: ScoringGateway + 'static,
{
    tag_membership(session, candidate_id, tag_id, true).await
}

pub(crate) async fn remove_tag_handler<G>(
    State(session): State<Arc<RecruitingSession<G>>>,
    Path((candidate_id, tag_id)): Path<(String, String)>,
) -> Response
where
    G: ScoringGateway + 'static,
{
    tag_membership(session, candidate_id, tag_id, false).await
}

pub(crate) async fn shortlist_handler<G>(
    State(session): State<Arc<RecruitingSession<G>>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    G: ScoringGateway + 'static,
{
    let candidate_id = CandidateId(candidate_id);
    if !session.contains(&candidate_id) {
        return unknown_candidate(&candidate_id);
    }

    let shortlisted = session.annotations().toggle_shortlist(&candidate_id);
    let payload = json!({
        "candidate_id": candidate_id,
        "shortlisted": shortlisted,
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn bulk_delete_handler<G>(
    State(session): State<Arc<RecruitingSession<G>>>,
    Json(request): Json<IdsRequest>,
) -> Response
where
    G: ScoringGateway + 'static,
{
    let report = session.delete_candidates(&request.ids).await;
    let status = if report.requires_login {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::OK
    };
    let payload = json!({
        "succeeded": report.succeeded,
        "failed": report.failed,
        "removed": report.removed_locally,
        "requires_login": report.requires_login,
        "message": report.message(),
    });
    (status, Json(payload)).into_response()
}

pub(crate) async fn bulk_export_handler<G>(
    State(session): State<Arc<RecruitingSession<G>>>,
    Json(request): Json<ExportRequest>,
) -> Response
where
    G: ScoringGateway + 'static,
{
    let ids: BTreeSet<CandidateId> = request.ids.into_iter().collect();
    let today = Utc::now().date_naive();
    match session.export(&request.criteria, &ids, request.job_title.as_deref(), today) {
        Ok(export) => {
            let disposition = format!("attachment; filename=\"{}\"", export.filename);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                export.content,
            )
                .into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn compare_handler<G>(
    State(session): State<Arc<RecruitingSession<G>>>,
    Json(request): Json<IdsRequest>,
) -> Response
where
    G: ScoringGateway + 'static,
{
    match session.compare(&request.ids) {
        Ok(comparison) => (StatusCode::OK, Json(comparison)).into_response(),
        Err(err) => error_response(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
    }
}

pub(crate) async fn board_handler<G>(
    State(session): State<Arc<RecruitingSession<G>>>,
    Path(job_id): Path<String>,
) -> Response
where
    G: ScoringGateway + 'static,
{
    let job_id = JobId(job_id);
    if session.job(&job_id).is_none() {
        return unknown_job(&job_id);
    }
    (StatusCode::OK, Json(session.pipeline().board(&job_id))).into_response()
}

pub(crate) async fn questions_handler<G>(
    State(session): State<Arc<RecruitingSession<G>>>,
    Path(job_id): Path<String>,
) -> Response
where
    G: ScoringGateway + 'static,
{
    let job_id = JobId(job_id);
    match session.questions(&job_id) {
        Some(categories) => (StatusCode::OK, Json(categories)).into_response(),
        None => unknown_job(&job_id),
    }
}

pub(crate) async fn activity_handler<G>(
    State(session): State<Arc<RecruitingSession<G>>>,
    Query(query): Query<ActivityQuery>,
) -> Response
where
    G: ScoringGateway + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    (StatusCode::OK, Json(session.activity(limit))).into_response()
}
