//! JSON snapshot persistence for the learner record.
//!
//! One file, fully overwritten on every save. Loading never fails: a missing,
//! unreadable, malformed or unknown-version snapshot yields the default record.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ProgressionConfig;
use crate::progress::LearnerProgress;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("progress store I/O error at {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error("progress store serialization error: {0}")]
  Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
  version: u32,
  progress: LearnerProgress,
}

#[derive(Clone, Debug)]
pub struct ProgressStore {
  path: PathBuf,
}

impl ProgressStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn load(&self, cfg: &ProgressionConfig) -> LearnerProgress {
    let path = self.path.display().to_string();
    let data = match fs::read_to_string(&self.path) {
      Ok(d) => d,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        info!(target: "progress", %path, "No saved progress; starting fresh");
        return LearnerProgress::default();
      }
      Err(e) => {
        warn!(target: "progress", %path, error = %e, "Failed to read progress; using defaults");
        return LearnerProgress::default();
      }
    };

    match serde_json::from_str::<Snapshot>(&data) {
      Ok(snap) if snap.version == SCHEMA_VERSION => {
        let p = snap.progress.reconcile(cfg);
        info!(target: "progress", %path, xp = p.xp, completed = p.completed_ids.len(), "Loaded saved progress");
        p
      }
      Ok(snap) => {
        warn!(target: "progress", %path, version = snap.version, expected = SCHEMA_VERSION, "Unknown progress schema; using defaults");
        LearnerProgress::default()
      }
      Err(e) => {
        warn!(target: "progress", %path, error = %e, "Malformed progress snapshot; using defaults");
        LearnerProgress::default()
      }
    }
  }

  pub fn save(&self, progress: &LearnerProgress) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io { path: self.path.display().to_string(), source };
    if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
      fs::create_dir_all(dir).map_err(io_err)?;
    }
    let data = serde_json::to_string_pretty(&Snapshot { version: SCHEMA_VERSION, progress: progress.clone() })?;
    fs::write(&self.path, data).map_err(io_err)?;
    debug!(target: "progress", path = %self.path.display(), xp = progress.xp, "Progress saved");
    Ok(())
  }
}
