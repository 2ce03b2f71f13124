//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Selecting the current challenge (cancels any pending auto-advance)
//!   - Judging a submission (local validator or remote gateway)
//!   - Feeding correct verdicts into the learner record and scheduling advancement
//!   - Hints, progress views, path choice and reset

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::domain::{Challenge, Feedback, FeedbackContract, Specialization};
use crate::openai::FALLBACK_HINT;
use crate::progress::{apply_verdict, choose_path, next_challenge, touch_streak, LearnerProgress};
use crate::protocol::{curriculum_out, progress_out, to_out, AnswerOut, ChallengeOut, CurriculumOut, ProgressOut};
use crate::session::{Advance, Session};
use crate::state::AppState;
use crate::validator::validate;

#[derive(Debug, Error)]
pub enum LogicError {
  #[error("Unknown challengeId: {0}")]
  UnknownChallenge(String),
  #[error("A submission is already being checked")]
  Busy,
  #[error("Curriculum is empty")]
  EmptyCurriculum,
}

fn today() -> u64 {
  SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() / 86_400
}

pub fn lookup<'a>(state: &'a AppState, challenge_id: &str) -> Result<&'a Challenge, LogicError> {
  state.get_challenge(challenge_id).ok_or_else(|| LogicError::UnknownChallenge(challenge_id.to_string()))
}

/// Make a challenge current. Without an id, re-serve the session's current
/// challenge (or the first one).
#[instrument(level = "info", skip(state, session), fields(sid = %session.id))]
pub async fn select_challenge(state: &AppState, session: &Session, challenge_id: Option<&str>) -> Result<ChallengeOut, LogicError> {
  let ch = match challenge_id {
    Some(id) => lookup(state, id)?,
    None => match session.current_id().and_then(|id| state.get_challenge(&id)) {
      Some(c) => c,
      None => state.first_challenge().ok_or(LogicError::EmptyCurriculum)?,
    },
  };
  session.select(&ch.id);
  let progress = state.progress().await;
  Ok(to_out(ch, &state.curriculum, &progress))
}

/// Produce a verdict for `code`. Remote challenges go to the gateway when it is
/// configured; otherwise they are judged locally.
#[instrument(level = "info", skip(state, challenge, code), fields(id = %challenge.id, code_len = code.len()))]
pub async fn judge(state: &AppState, challenge: &Challenge, code: &str) -> Feedback {
  match (&challenge.feedback, &state.openai) {
    (FeedbackContract::Remote, Some(oa)) => {
      oa.fetch_verdict(&state.prompts, &challenge.title, &challenge.description, code, &challenge.solution).await
    }
    (FeedbackContract::Remote, None) => {
      warn!(target: "challenge", id = %challenge.id, "Remote challenge without OPENAI_API_KEY; judging locally");
      validate(code, challenge)
    }
    (FeedbackContract::Local(_), _) => validate(code, challenge),
  }
}

/// Feed a verdict into the learner record. Returns the record and whether XP was awarded.
pub async fn record_verdict(state: &AppState, challenge: &Challenge, verdict: &Feedback) -> (LearnerProgress, bool) {
  let mut awarded = false;
  let after = state
    .update_progress(|p| {
      let next = apply_verdict(p, challenge, verdict, &state.progression);
      awarded = next.completed_ids.len() > p.completed_ids.len();
      if awarded { touch_streak(&next, today()) } else { next }
    })
    .await;
  if awarded {
    info!(target: "progress", id = %challenge.id, points = challenge.points, xp = after.xp, level = after.level, "Challenge completed");
  } else if verdict.is_correct() {
    debug!(target: "progress", id = %challenge.id, "Already completed; no XP awarded");
  }
  (after, awarded)
}

/// Full submit flow: reentrancy guard, judge, progress update, and on a correct
/// verdict schedule the auto-advance whose outcome is handed to `on_advance`.
#[instrument(level = "info", skip(state, session, answer, on_advance), fields(sid = %session.id, answer_len = answer.len()))]
pub async fn submit_answer<F>(
  state: &AppState,
  session: &std::sync::Arc<Session>,
  challenge_id: &str,
  answer: &str,
  on_advance: F,
) -> Result<AnswerOut, LogicError>
where
  F: FnOnce(Advance) + Send + 'static,
{
  let challenge = lookup(state, challenge_id)?;
  let _guard = session.try_begin().ok_or(LogicError::Busy)?;

  if session.current_id().as_deref() != Some(challenge_id) {
    session.select(challenge_id);
  }

  let feedback = judge(state, challenge, answer).await;
  info!(target: "challenge", id = %challenge_id, status = ?feedback.status, "Submission judged");

  let (progress, awarded) = record_verdict(state, challenge, &feedback).await;

  let (next_challenge_id, advance_in_ms) = if feedback.is_correct() {
    let delay = state.progression.advance_delay_ms;
    session.schedule_advance(state.curriculum.clone(), challenge_id, Duration::from_millis(delay), on_advance);
    (next_challenge(&state.curriculum, challenge_id).map(|c| c.id.clone()), Some(delay))
  } else {
    (None, None)
  };

  Ok(AnswerOut {
    feedback,
    progress: view_progress(state, &progress),
    awarded,
    next_challenge_id,
    advance_in_ms,
  })
}

#[instrument(level = "info", skip(state, code), fields(%challenge_id, code_len = code.len()))]
pub async fn get_hint_text(state: &AppState, challenge_id: &str, code: &str) -> Result<String, LogicError> {
  let ch = lookup(state, challenge_id)?;
  let text = match (&ch.feedback, &state.openai) {
    (FeedbackContract::Local(local), _) if !local.hint.is_empty() => local.hint.clone(),
    (_, Some(oa)) => oa.fetch_hint(&state.prompts, &ch.description, code).await,
    _ => FALLBACK_HINT.into(),
  };
  Ok(text)
}

pub fn view_progress(state: &AppState, p: &LearnerProgress) -> ProgressOut {
  progress_out(p, &state.progression.ranks, state.progression.xp_per_level)
}

pub async fn get_progress(state: &AppState) -> ProgressOut {
  view_progress(state, &state.progress().await)
}

pub async fn get_curriculum(state: &AppState) -> CurriculumOut {
  curriculum_out(&state.curriculum, &state.progress().await)
}

#[instrument(level = "info", skip(state))]
pub async fn reset_progress(state: &AppState) -> ProgressOut {
  let p = state.update_progress(|_| LearnerProgress::default()).await;
  info!(target: "progress", "Learner progress reset");
  view_progress(state, &p)
}

#[instrument(level = "info", skip(state))]
pub async fn set_path(state: &AppState, path: Specialization) -> ProgressOut {
  let p = state.update_progress(|p| choose_path(p, path)).await;
  view_progress(state, &p)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{compile_challenge, AgentConfig};
  use crate::domain::FeedbackStatus;
  use crate::openai::{fallback_verdict, OpenAI};
  use crate::seeds::seed_challenge_cfgs;
  use crate::state::tests::test_state;
  use crate::store::ProgressStore;
  use std::sync::Arc;
  use tokio::sync::mpsc;

  #[tokio::test]
  async fn missing_quotes_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let s = Session::new(None);
    let out = submit_answer(&state, &s, "b1", "print(Hello World)", |_| {}).await.unwrap();
    assert_eq!(out.feedback.status, FeedbackStatus::Incorrect);
    assert_eq!(out.feedback.message, "You're missing quotes!");
    assert!(!out.awarded);
    assert_eq!(out.advance_in_ms, None);
    assert_eq!(out.progress.xp, 0);
  }

  #[tokio::test(start_paused = true)]
  async fn correct_answer_awards_once_and_advances() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let s = Session::new(Some("b1".into()));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let out = submit_answer(&state, &s, "b1", "print(\"Hello World\")", move |a| {
      let _ = tx.send(a);
    })
    .await
    .unwrap();
    assert_eq!(out.feedback.status, FeedbackStatus::Correct);
    assert!(out.awarded);
    assert_eq!(out.progress.xp, 50);
    assert_eq!(out.next_challenge_id.as_deref(), Some("b2"));
    assert_eq!(out.advance_in_ms, Some(3000));

    match rx.recv().await.unwrap() {
      Advance::Next(c) => assert_eq!(c.id, "b2"),
      other => panic!("unexpected {other:?}"),
    }

    let again = submit_answer(&state, &s, "b1", "print(\"Hello World\")", |_| {}).await.unwrap();
    assert!(again.feedback.is_correct());
    assert!(!again.awarded);
    assert_eq!(again.progress.xp, 50);
    assert_eq!(again.progress.skills.syntax, 1.5);

    let saved = ProgressStore::new(dir.path().join("progress.json")).load(&state.progression);
    assert_eq!(saved.xp, 50);
    assert_eq!(saved.streak, 1);
  }

  #[tokio::test(start_paused = true)]
  async fn polling_current_challenge_does_not_cancel_advance() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let s = state.http_session.clone();

    let out = submit_answer(&state, &s, "b1", "print(\"Hello World\")", |_| {}).await.unwrap();
    assert_eq!(out.next_challenge_id.as_deref(), Some("b2"));

    tokio::time::sleep(Duration::from_secs(1)).await;
    let during = select_challenge(&state, &s, None).await.unwrap();
    assert_eq!(during.id, "b1");

    tokio::time::sleep(Duration::from_secs(5)).await;
    let after = select_challenge(&state, &s, None).await.unwrap();
    assert_eq!(after.id, "b2");
  }

  #[tokio::test(start_paused = true)]
  async fn reselecting_by_id_keeps_countdown() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let s = state.http_session.clone();

    submit_answer(&state, &s, "b1", "print(\"Hello World\")", |_| {}).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    select_challenge(&state, &s, Some("b1")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(s.current_id().as_deref(), Some("b2"));
  }

  #[tokio::test]
  async fn busy_session_rejects_second_submission() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let s = Session::new(None);
    let _held = s.try_begin().unwrap();
    let err = submit_answer(&state, &s, "b1", "x", |_| {}).await.unwrap_err();
    assert!(matches!(err, LogicError::Busy));
  }

  #[tokio::test]
  async fn unknown_challenge_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let s = Session::new(None);
    assert!(matches!(submit_answer(&state, &s, "zz", "x", |_| {}).await, Err(LogicError::UnknownChallenge(_))));
    assert!(matches!(get_hint_text(&state, "zz", "").await, Err(LogicError::UnknownChallenge(_))));
    assert!(matches!(select_challenge(&state, &s, Some("zz")).await, Err(LogicError::UnknownChallenge(_))));
  }

  #[tokio::test]
  async fn select_defaults_to_session_then_first() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let s = Session::new(None);
    assert_eq!(select_challenge(&state, &s, None).await.unwrap().id, "b1");
    let out = select_challenge(&state, &s, Some("i2")).await.unwrap();
    assert_eq!((out.position, out.total), (5, 8));
    assert_eq!(select_challenge(&state, &s, None).await.unwrap().id, "i2");
  }

  #[tokio::test]
  async fn local_hint_is_served_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    assert_eq!(get_hint_text(&state, "b2", "").await.unwrap(), "name = \"Python\"");
  }

  fn remote_state(dir: &tempfile::TempDir, openai: Option<OpenAI>) -> AppState {
    let mut cfg = seed_challenge_cfgs().remove(0);
    cfg.feedback = crate::config::ContractKind::Remote;
    assert!(compile_challenge(cfg.clone()).is_ok());
    let agent = AgentConfig { challenges: vec![cfg], ..Default::default() };
    AppState::from_parts(agent, openai, ProgressStore::new(dir.path().join("progress.json")))
  }

  #[tokio::test]
  async fn remote_gateway_failure_yields_fallback_and_no_xp() {
    let dir = tempfile::tempdir().unwrap();
    let oa = OpenAI::new("k".into(), "http://127.0.0.1:9/v1".into(), "f".into(), "s".into());
    let state = remote_state(&dir, oa);
    let s = Session::new(None);
    let out = submit_answer(&state, &s, "b1", "print(\"Hello World\")", |_| {}).await.unwrap();
    assert_eq!(out.feedback, fallback_verdict());
    assert_eq!(out.progress.xp, 0);
    assert_eq!(get_hint_text(&state, "b1", "").await.unwrap(), FALLBACK_HINT);
  }

  #[tokio::test]
  async fn remote_without_gateway_is_judged_locally() {
    let dir = tempfile::tempdir().unwrap();
    let state = remote_state(&dir, None);
    let ch = lookup(&state, "b1").unwrap();
    assert!(judge(&state, ch, "print(\"Hello World\")").await.is_correct());
    assert!(!judge(&state, ch, "print(Hello World)").await.is_correct());
    assert_eq!(get_hint_text(&state, "b1", "").await.unwrap(), FALLBACK_HINT);
  }

  #[tokio::test]
  async fn reset_and_path_are_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let s: Arc<Session> = Session::new(None);
    submit_answer(&state, &s, "b2", "name = \"Python\"", |_| {}).await.unwrap();
    s.cancel_advance();

    let p = set_path(&state, Specialization::DataWizard).await;
    assert_eq!(p.chosen_path, Specialization::DataWizard);
    assert_eq!(p.xp, 50);

    let p = reset_progress(&state).await;
    assert_eq!(p.xp, 0);
    assert!(p.completed_ids.is_empty());
    let saved = ProgressStore::new(dir.path().join("progress.json")).load(&state.progression);
    assert_eq!(saved, LearnerProgress::default());
  }
}
