//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{State, Query}, http::StatusCode, Json, response::{IntoResponse, Response}};
use tracing::{info, instrument};

use crate::protocol::*;
use crate::state::AppState;
use crate::logic::{self, LogicError};

impl IntoResponse for LogicError {
  fn into_response(self) -> Response {
    let status = match self {
      LogicError::UnknownChallenge(_) => StatusCode::NOT_FOUND,
      LogicError::Busy => StatusCode::CONFLICT,
      LogicError::EmptyCurriculum => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(ErrorOut { message: self.to_string() })).into_response()
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, ai_enabled: state.openai.is_some() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_curriculum(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::get_curriculum(&state).await)
}

#[instrument(level = "info", skip(state), fields(id = ?q.id))]
pub async fn http_get_challenge(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ChallengeQuery>,
) -> Result<Json<ChallengeOut>, LogicError> {
  let ch = logic::select_challenge(&state, &state.http_session, q.id.as_deref()).await?;
  info!(target: "challenge", id = %ch.id, "HTTP challenge served");
  Ok(Json(ch))
}

#[instrument(level = "info", skip(state, body), fields(%body.challenge_id, answer_len = body.answer.len()))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<AnswerOut>, LogicError> {
  // HTTP clients poll /challenge after `advance_in_ms`; the session already points at the next one.
  let out = logic::submit_answer(&state, &state.http_session, &body.challenge_id, &body.answer, |_| {}).await?;
  info!(target: "challenge", id = %body.challenge_id, status = ?out.feedback.status, awarded = out.awarded, "HTTP submit_answer evaluated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(%body.challenge_id, code_len = body.code.len()))]
pub async fn http_post_hint(
  State(state): State<Arc<AppState>>,
  Json(body): Json<HintIn>,
) -> Result<Json<HintOut>, LogicError> {
  let text = logic::get_hint_text(&state, &body.challenge_id, &body.code).await?;
  info!(target: "challenge", id = %body.challenge_id, "HTTP hint served");
  Ok(Json(HintOut { text }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::get_progress(&state).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_reset(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::reset_progress(&state).await)
}

#[instrument(level = "info", skip(state, body), fields(path = ?body.path))]
pub async fn http_post_path(
  State(state): State<Arc<AppState>>,
  Json(body): Json<PathIn>,
) -> impl IntoResponse {
  Json(logic::set_path(&state, body.path).await)
}
