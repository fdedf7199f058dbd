use axum::{
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header::ALLOW},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use skillscore_core::dispatch_batch;

use crate::{
    AppState,
    infra::errors::{AppError, AppResult},
};

#[derive(Debug, Deserialize)]
pub struct SkillScoreQuery {
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
    pub skill: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IngestSkillsRequest {
    pub id: String,
    /// Absent and `null` both mean "no skills".
    #[serde(default)]
    pub skills: Option<Vec<String>>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Read one score.
///
/// # Response
///
/// - `200 OK` with `{"skillName", "score", "lastScored"}` when a score exists
/// - `404 Not Found` with an empty body when it does not (yet)
/// - `400 Bad Request` when `userID` or `skill` is missing or empty, or the
///   query string does not parse; the store is not consulted
pub async fn get_skill_score_handler(
    State(state): State<AppState>,
    query: Result<Query<SkillScoreQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query.map_err(|rejection| {
        AppError::bad_request(format!("invalid query string: {}", rejection.body_text()))
    })?;

    let (Some(user_id), Some(skill)) =
        (non_blank(query.user_id), non_blank(query.skill))
    else {
        return Err(AppError::bad_request(
            "query parameters `userID` and `skill` are required",
        ));
    };

    match state.store.read(&user_id, &skill) {
        Some(score) => Ok(Json(score).into_response()),
        None => {
            debug!(user_id = %user_id, skill = %skill, "no score recorded");
            Ok(StatusCode::NOT_FOUND.into_response())
        }
    }
}

/// HEAD is not served on the skills path.
pub async fn skills_head_handler() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, [(ALLOW, "GET,POST")])
}

/// Queue every submitted skill for scoring.
///
/// # Request
///
/// ```json
/// { "id": "user1", "skills": ["Rust", "Kafka"] }
/// ```
///
/// The body is parsed as JSON whatever the `Content-Type`. Returns `200 OK`
/// with an empty body once every skill has been handed to the dispatcher;
/// scores appear in the store later. A body that does not parse, a blank
/// `id` or a blank skill name is rejected with `400` before anything is
/// dispatched. Under the all-or-nothing batch policy a dispatch failure
/// answers `503`.
pub async fn ingest_skills_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<StatusCode> {
    let request: IngestSkillsRequest = serde_json::from_slice(&body)
        .map_err(|err| {
            AppError::bad_request(format!("malformed request body: {err}"))
        })?;

    if request.id.trim().is_empty() {
        return Err(AppError::bad_request("`id` must not be empty"));
    }

    let skills = request.skills.unwrap_or_default();
    if skills.iter().any(|skill| skill.trim().is_empty()) {
        return Err(AppError::bad_request("skill names must not be empty"));
    }

    let report = dispatch_batch(
        state.dispatcher.as_ref(),
        &request.id,
        &skills,
        state.batch_policy,
    )
    .await?;

    if report.is_complete() {
        info!(user_id = %request.id, queued = report.queued, "skills queued for scoring");
    } else {
        warn!(
            user_id = %request.id,
            queued = report.queued,
            dropped = report.failures.len(),
            "skills partially queued for scoring"
        );
    }

    Ok(StatusCode::OK)
}
