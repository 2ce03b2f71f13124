//! Per-session interaction state: current challenge, in-flight submission
//! guard and the cancellable auto-advance timer.
//!
//! Every change of the current challenge invalidates the pending advance token
//! before anything new is scheduled, so a stale timer can never move the
//! learner to the wrong challenge.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::Challenge;
use crate::progress::next_challenge;

/// What a fired advance timer resolved to.
#[derive(Clone, Debug)]
pub enum Advance {
  Next(Challenge),
  CurriculumComplete,
}

pub struct Session {
  pub id: String,
  current: Mutex<Option<String>>,
  in_flight: AtomicBool,
  advance_token: AtomicU64,
  pending: Mutex<Option<JoinHandle<()>>>,
}

/// Released when dropped, including on early return or panic.
pub struct InFlightGuard<'a> {
  flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
  fn drop(&mut self) {
    self.flag.store(false, Ordering::Release);
  }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
  m.lock().unwrap_or_else(|e| e.into_inner())
}

impl Session {
  pub fn new(initial: Option<String>) -> Arc<Self> {
    Arc::new(Self {
      id: Uuid::new_v4().to_string(),
      current: Mutex::new(initial),
      in_flight: AtomicBool::new(false),
      advance_token: AtomicU64::new(0),
      pending: Mutex::new(None),
    })
  }

  pub fn current_id(&self) -> Option<String> {
    lock(&self.current).clone()
  }

  /// Make `id` current, cancelling any pending advance first. Re-selecting
  /// the current challenge is a no-op and keeps the countdown running.
  pub fn select(&self, id: &str) {
    let mut current = lock(&self.current);
    if current.as_deref() == Some(id) {
      return;
    }
    self.invalidate_pending();
    *current = Some(id.to_string());
    debug!(target: "challenge", session = %self.id, %id, "Challenge selected");
  }

  /// At most one submission in flight per session; `None` means busy.
  pub fn try_begin(&self) -> Option<InFlightGuard<'_>> {
    self
      .in_flight
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| InFlightGuard { flag: &self.in_flight })
  }

  pub fn cancel_advance(&self) {
    let _current = lock(&self.current);
    self.invalidate_pending();
  }

  // Caller holds the `current` lock.
  fn invalidate_pending(&self) {
    self.advance_token.fetch_add(1, Ordering::AcqRel);
    if let Some(handle) = lock(&self.pending).take() {
      handle.abort();
    }
  }

  /// After `delay`, move from `from_id` to the next challenge in `curriculum`
  /// and hand the outcome to `on_fire`. Replaces any earlier pending advance.
  pub fn schedule_advance<F>(self: &Arc<Self>, curriculum: Arc<Vec<Challenge>>, from_id: &str, delay: Duration, on_fire: F)
  where
    F: FnOnce(Advance) + Send + 'static,
  {
    let token = {
      let _current = lock(&self.current);
      self.invalidate_pending();
      self.advance_token.load(Ordering::Acquire)
    };

    let session = Arc::clone(self);
    let from_id = from_id.to_string();
    let handle = tokio::spawn(async move {
      tokio::time::sleep(delay).await;

      let outcome = {
        let mut current = lock(&session.current);
        if session.advance_token.load(Ordering::Acquire) != token {
          debug!(target: "challenge", session = %session.id, "Stale advance timer ignored");
          return;
        }
        match next_challenge(&curriculum, &from_id) {
          Some(next) => {
            *current = Some(next.id.clone());
            Advance::Next(next.clone())
          }
          None => Advance::CurriculumComplete,
        }
      };

      match &outcome {
        Advance::Next(next) => info!(target: "challenge", session = %session.id, from = %from_id, to = %next.id, "Auto-advanced"),
        Advance::CurriculumComplete => info!(target: "challenge", session = %session.id, from = %from_id, "Curriculum complete"),
      }
      on_fire(outcome);
    });

    *lock(&self.pending) = Some(handle);
  }
}
