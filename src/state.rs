//! Application state: curriculum, progression tuning, prompts, gateway client,
//! the learner record and its store.
//!
//! The curriculum is immutable after startup and shared behind an `Arc`.
//! `LearnerProgress` has exactly one writer: `AppState::update_progress`,
//! which persists the full snapshot after every change.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, instrument};

use crate::config::{compile_bank, load_agent_config_from_env, progress_path_from_env, AgentConfig, ProgressionConfig, Prompts};
use crate::domain::{Challenge, Tier};
use crate::openai::OpenAI;
use crate::progress::LearnerProgress;
use crate::seeds::seed_curriculum;
use crate::session::Session;
use crate::store::ProgressStore;

pub struct AppState {
    pub curriculum: Arc<Vec<Challenge>>,
    pub progression: ProgressionConfig,
    pub prompts: Prompts,
    pub openai: Option<OpenAI>,
    pub store: ProgressStore,
    progress: Mutex<LearnerProgress>,
    /// Session used by the stateless HTTP API. Each WebSocket gets its own.
    pub http_session: Arc<Session>,
}

impl AppState {
    /// Build state from env: load config, curriculum, saved progress, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_agent_config_from_env().unwrap_or_default();

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "pyquest_backend", base_url = %oa.base_url, fast_model = %oa.fast_model, strong_model = %oa.strong_model, "OpenAI enabled.");
        } else {
            info!(target: "pyquest_backend", "OpenAI disabled (no OPENAI_API_KEY). Remote challenges are judged locally.");
        }

        Self::from_parts(cfg, openai, ProgressStore::new(progress_path_from_env()))
    }

    pub fn from_parts(cfg: AgentConfig, openai: Option<OpenAI>, store: ProgressStore) -> Self {
        // A configured bank replaces the built-in seeds; if nothing in it compiles we keep the seeds.
        let mut curriculum = compile_bank(cfg.challenges);
        if curriculum.is_empty() {
            curriculum = seed_curriculum();
        }

        for tier in Tier::ALL {
            let count = curriculum.iter().filter(|c| c.tier == tier).count();
            info!(target: "challenge", ?tier, count, "Startup curriculum inventory");
        }
        if curriculum.is_empty() {
            error!(target: "challenge", "Curriculum is empty");
        }

        let progress = store.load(&cfg.progression);
        let first = curriculum.first().map(|c| c.id.clone());

        Self {
            curriculum: Arc::new(curriculum),
            progression: cfg.progression,
            prompts: cfg.prompts,
            openai,
            store,
            progress: Mutex::new(progress),
            http_session: Session::new(first),
        }
    }

    /// Read-only access to a challenge by id.
    pub fn get_challenge(&self, id: &str) -> Option<&Challenge> {
        self.curriculum.iter().find(|c| c.id == id)
    }

    pub fn first_challenge(&self) -> Option<&Challenge> {
        self.curriculum.first()
    }

    pub async fn progress(&self) -> LearnerProgress {
        self.progress.lock().await.clone()
    }

    /// Apply `f` to the learner record and persist the result when it changed.
    /// Save failures are logged; the in-memory record still advances.
    ///
    /// The snapshot write runs on the blocking pool while the lock is held, so
    /// writes land in the same order as updates.
    pub async fn update_progress<F>(&self, f: F) -> LearnerProgress
    where
        F: FnOnce(&LearnerProgress) -> LearnerProgress,
    {
        let mut guard = self.progress.lock().await;
        let next = f(&guard);
        if next != *guard {
            let store = self.store.clone();
            let snapshot = next.clone();
            match tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(target: "progress", error = %e, "Failed to persist progress"),
                Err(e) => error!(target: "progress", error = %e, "Progress save task failed"),
            }
            *guard = next;
        }
        guard.clone()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_state(dir: &tempfile::TempDir) -> AppState {
        AppState::from_parts(AgentConfig::default(), None, ProgressStore::new(dir.path().join("progress.json")))
    }

    #[tokio::test]
    async fn defaults_to_seed_curriculum() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        assert_eq!(state.curriculum.len(), 8);
        assert_eq!(state.first_challenge().map(|c| c.id.as_str()), Some("b1"));
        assert_eq!(state.http_session.current_id().as_deref(), Some("b1"));
        assert!(state.get_challenge("i1").is_some());
    }

    #[tokio::test]
    async fn update_persists_only_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let path = dir.path().join("progress.json");

        state.update_progress(|p| p.clone()).await;
        assert!(!path.exists());

        let p = state.update_progress(|p| LearnerProgress { xp: p.xp + 50, ..p.clone() }).await;
        assert_eq!(p.xp, 50);
        assert!(path.exists());

        let reloaded = test_state(&dir);
        assert_eq!(reloaded.progress().await.xp, 50);
    }

    #[tokio::test]
    async fn save_failure_keeps_in_memory_update() {
        let dir = tempfile::tempdir().unwrap();
        // Parent of the snapshot path is a regular file, so the write fails.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let state = AppState::from_parts(AgentConfig::default(), None, ProgressStore::new(blocker.join("progress.json")));

        let p = state.update_progress(|p| LearnerProgress { xp: p.xp + 10, ..p.clone() }).await;
        assert_eq!(p.xp, 10);
        assert_eq!(state.progress().await.xp, 10);
        assert!(!blocker.join("progress.json").exists());
    }
}
