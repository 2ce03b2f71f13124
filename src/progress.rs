//! Learner progression: XP, level, rank, skills and curriculum advancement.
//!
//! Every operation here is a pure function over an explicitly passed record.
//! `apply_verdict` returns a new `LearnerProgress`; callers persist it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::ProgressionConfig;
use crate::domain::{Challenge, Feedback, SkillKind, Specialization};

pub const MAX_SKILL: f32 = 5.0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankThreshold {
  pub rank: String,
  pub min_xp: u64,
}

/// Six skill levels, each within `[0, MAX_SKILL]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Skills {
  pub syntax: f32,
  pub logic: f32,
  pub oop: f32,
  #[serde(rename = "async")]
  pub async_: f32,
  pub architecture: f32,
  pub data: f32,
}

impl Default for Skills {
  fn default() -> Self {
    Self { syntax: 1.0, logic: 1.0, oop: 0.0, async_: 0.0, architecture: 0.0, data: 0.0 }
  }
}

impl Skills {
  fn slot(&mut self, kind: SkillKind) -> &mut f32 {
    match kind {
      SkillKind::Syntax => &mut self.syntax,
      SkillKind::Logic => &mut self.logic,
      SkillKind::Oop => &mut self.oop,
      SkillKind::Async => &mut self.async_,
      SkillKind::Architecture => &mut self.architecture,
      SkillKind::Data => &mut self.data,
    }
  }

  /// Raise a skill by `by`, never past `MAX_SKILL` and never downward.
  pub fn bump(&mut self, kind: SkillKind, by: f32) {
    let slot = self.slot(kind);
    *slot = (*slot + by.max(0.0)).min(MAX_SKILL);
  }

  fn clamp_all(&mut self) {
    for v in [
      &mut self.syntax,
      &mut self.logic,
      &mut self.oop,
      &mut self.async_,
      &mut self.architecture,
      &mut self.data,
    ] {
      *v = if v.is_finite() { v.clamp(0.0, MAX_SKILL) } else { 0.0 };
    }
  }
}

/// The persisted learner record. `level` is a cache of `level_for_xp(xp)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearnerProgress {
  pub xp: u64,
  pub level: u64,
  pub streak: u32,
  /// Days since the Unix epoch of the last first-time completion.
  #[serde(default)]
  pub last_active_day: Option<u64>,
  pub completed_ids: BTreeSet<String>,
  pub chosen_path: Specialization,
  pub skills: Skills,
}

impl Default for LearnerProgress {
  fn default() -> Self {
    Self {
      xp: 0,
      level: 1,
      streak: 1,
      last_active_day: None,
      completed_ids: BTreeSet::new(),
      chosen_path: Specialization::None,
      skills: Skills::default(),
    }
  }
}

impl LearnerProgress {
  pub fn is_completed(&self, id: &str) -> bool {
    self.completed_ids.contains(id)
  }

  /// Re-derive cached fields and clamp anything a hand-edited snapshot may have broken.
  pub fn reconcile(mut self, cfg: &ProgressionConfig) -> Self {
    self.level = level_for_xp(self.xp, cfg.xp_per_level);
    self.skills.clamp_all();
    self
  }
}

pub fn level_for_xp(xp: u64, xp_per_level: u64) -> u64 {
  xp / xp_per_level.max(1) + 1
}

/// Award XP and skill for a first-time correct verdict. Anything else returns
/// the record unchanged, so resubmitting a completed challenge never double-awards.
pub fn apply_verdict(
  progress: &LearnerProgress,
  challenge: &Challenge,
  verdict: &Feedback,
  cfg: &ProgressionConfig,
) -> LearnerProgress {
  if !verdict.is_correct() || progress.is_completed(&challenge.id) {
    return progress.clone();
  }

  let mut next = progress.clone();
  next.xp = progress.xp.saturating_add(u64::from(challenge.points));
  next.level = level_for_xp(next.xp, cfg.xp_per_level);
  next.completed_ids.insert(challenge.id.clone());
  next.skills.bump(cfg.skill_for_tier(challenge.tier), cfg.skill_increment);
  next
}

/// Same day: unchanged. Next day: +1. Gap or first completion: 1.
pub fn touch_streak(progress: &LearnerProgress, today: u64) -> LearnerProgress {
  let mut next = progress.clone();
  next.streak = match progress.last_active_day {
    Some(last) if last == today => progress.streak,
    Some(last) if last.saturating_add(1) == today => progress.streak.saturating_add(1),
    Some(last) if last > today => progress.streak,
    _ => 1,
  };
  next.last_active_day = Some(progress.last_active_day.map_or(today, |last| last.max(today)));
  next
}

pub fn choose_path(progress: &LearnerProgress, path: Specialization) -> LearnerProgress {
  LearnerProgress { chosen_path: path, ..progress.clone() }
}

/// Highest threshold with `min_xp <= xp`. `ranks` must be ascending.
/// Returns `None` only for an empty table.
pub fn rank_for_xp(xp: u64, ranks: &[RankThreshold]) -> Option<&RankThreshold> {
  ranks.iter().take_while(|r| r.min_xp <= xp).last().or_else(|| ranks.first())
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankProgress {
  pub rank: String,
  pub next_rank: Option<String>,
  pub next_rank_xp: Option<u64>,
  pub percent: f32,
}

/// Stats-bar view: current rank plus progress toward the next one.
/// At the top of the table `next_rank` is `None` and `percent` is 100.
pub fn rank_progress(xp: u64, ranks: &[RankThreshold]) -> RankProgress {
  let current = rank_for_xp(xp, ranks);
  let floor = current.map_or(0, |r| r.min_xp);
  let next = ranks.iter().find(|r| r.min_xp > xp);
  let percent = match next {
    Some(n) => {
      let span = (n.min_xp - floor) as f32;
      ((xp.saturating_sub(floor)) as f32 / span * 100.0).min(100.0)
    }
    None => 100.0,
  };
  RankProgress {
    rank: current.map(|r| r.rank.clone()).unwrap_or_default(),
    next_rank: next.map(|n| n.rank.clone()),
    next_rank_xp: next.map(|n| n.min_xp),
    percent,
  }
}

/// Entry right after `current_id` in declared order; `None` at the end of the
/// curriculum or for an unknown id.
pub fn next_challenge<'a>(curriculum: &'a [Challenge], current_id: &str) -> Option<&'a Challenge> {
  let idx = curriculum.iter().position(|c| c.id == current_id)?;
  curriculum.get(idx + 1)
}
