//! Loading agent configuration (prompts, progression tuning, optional curriculum bank) from TOML.
//!
//! See `AgentConfig`, `Prompts` and `ProgressionConfig` for the expected schema.
//! Every section is optional; missing values fall back to the built-in defaults.

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::domain::{
  Challenge, FeedbackContract, LocalFeedback, Pitfall, PitfallPattern, SkillKind, Specialization, SuccessNote, Tier,
};
use crate::progress::RankThreshold;
use crate::seeds::default_ranks;

pub const DEFAULT_PROGRESS_PATH: &str = "./data/progress.json";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("challenge '{id}': pitfall #{index} must set exactly one of `literal` or `regex`")]
  AmbiguousPattern { id: String, index: usize },
  #[error("challenge '{id}': invalid pitfall regex '{pattern}': {source}")]
  InvalidRegex {
    id: String,
    pattern: String,
    #[source]
    source: regex::Error,
  },
  #[error("challenge '{id}': points must be positive")]
  ZeroPoints { id: String },
  #[error("challenge '{id}': local feedback needs a success_message")]
  MissingSuccess { id: String },
  #[error("failed to parse TOML config: {0}")]
  Toml(#[from] toml::de::Error),
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub progression: ProgressionConfig,
  #[serde(default)]
  pub challenges: Vec<ChallengeCfg>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
  #[default]
  Local,
  Remote,
}

/// Challenge entry accepted in TOML configuration.
/// Local-contract fields are ignored for `feedback = "remote"`.
#[derive(Clone, Debug, Deserialize)]
pub struct ChallengeCfg {
  pub id: String,
  pub tier: Tier,
  #[serde(default)] pub path: Specialization,
  pub title: String,
  pub description: String,
  pub points: u32,
  #[serde(default)] pub initial_code: String,
  pub solution: String,
  #[serde(default)] pub concepts: Vec<String>,
  #[serde(default)] pub feedback: ContractKind,
  // local contract
  #[serde(default)] pub success_message: Option<String>,
  #[serde(default)] pub success_explanation: Option<String>,
  #[serde(default)] pub hint: Option<String>,
  #[serde(default)] pub pitfalls: Vec<PitfallCfg>,
}

/// One ordered pitfall rule. Exactly one of `literal` / `regex` is set.
#[derive(Clone, Debug, Deserialize)]
pub struct PitfallCfg {
  #[serde(default)] pub literal: Option<String>,
  #[serde(default)] pub regex: Option<String>,
  pub guidance: String,
  pub action: String,
}

impl PitfallCfg {
  pub fn literal(pattern: &str, guidance: &str, action: &str) -> Self {
    Self { literal: Some(pattern.into()), regex: None, guidance: guidance.into(), action: action.into() }
  }

  pub fn regex(pattern: &str, guidance: &str, action: &str) -> Self {
    Self { literal: None, regex: Some(pattern.into()), guidance: guidance.into(), action: action.into() }
  }
}

/// Turn a config entry into an immutable `Challenge`, compiling pitfall regexes.
/// Pitfall order is preserved exactly as declared.
pub fn compile_challenge(cfg: ChallengeCfg) -> Result<Challenge, ConfigError> {
  if cfg.points == 0 {
    return Err(ConfigError::ZeroPoints { id: cfg.id });
  }

  let feedback = match cfg.feedback {
    ContractKind::Remote => FeedbackContract::Remote,
    ContractKind::Local => {
      let message = cfg
        .success_message
        .clone()
        .ok_or_else(|| ConfigError::MissingSuccess { id: cfg.id.clone() })?;
      let mut pitfalls = Vec::with_capacity(cfg.pitfalls.len());
      for (index, p) in cfg.pitfalls.iter().enumerate() {
        let pattern = match (&p.literal, &p.regex) {
          (Some(lit), None) => PitfallPattern::Literal(lit.clone()),
          (None, Some(re)) => PitfallPattern::Regex(Regex::new(re).map_err(|source| ConfigError::InvalidRegex {
            id: cfg.id.clone(),
            pattern: re.clone(),
            source,
          })?),
          _ => return Err(ConfigError::AmbiguousPattern { id: cfg.id.clone(), index }),
        };
        pitfalls.push(Pitfall { pattern, guidance: p.guidance.clone(), action: p.action.clone() });
      }
      FeedbackContract::Local(LocalFeedback {
        success: SuccessNote { message, explanation: cfg.success_explanation.clone().unwrap_or_default() },
        hint: cfg.hint.clone().unwrap_or_default(),
        pitfalls,
      })
    }
  };

  Ok(Challenge {
    id: cfg.id,
    tier: cfg.tier,
    path: cfg.path,
    title: cfg.title,
    description: cfg.description,
    points: cfg.points,
    initial_code: cfg.initial_code,
    solution: cfg.solution,
    concepts: cfg.concepts,
    feedback,
  })
}

/// Compile a whole bank, logging and skipping entries that fail.
pub fn compile_bank(cfgs: Vec<ChallengeCfg>) -> Vec<Challenge> {
  let mut out = Vec::with_capacity(cfgs.len());
  for cfg in cfgs {
    if out.iter().any(|c: &Challenge| c.id == cfg.id) {
      error!(target: "challenge", id = %cfg.id, "Skipping bank item: duplicate id.");
      continue;
    }
    match compile_challenge(cfg) {
      Ok(ch) => out.push(ch),
      Err(e) => error!(target: "challenge", error = %e, "Skipping bank item."),
    }
  }
  out
}

/// XP/skill/rank tuning.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
  pub xp_per_level: u64,
  pub skill_increment: f32,
  /// Skill bumped by Advanced-tier completions.
  pub advanced_skill: SkillKind,
  pub advance_delay_ms: u64,
  pub ranks: Vec<RankThreshold>,
}

impl Default for ProgressionConfig {
  fn default() -> Self {
    Self {
      xp_per_level: 500,
      skill_increment: 0.5,
      advanced_skill: SkillKind::Oop,
      advance_delay_ms: 3000,
      ranks: default_ranks(),
    }
  }
}

impl ProgressionConfig {
  pub fn skill_for_tier(&self, tier: Tier) -> SkillKind {
    match tier {
      Tier::Beginner => SkillKind::Syntax,
      Tier::Intermediate => SkillKind::Logic,
      Tier::Advanced => self.advanced_skill,
    }
  }

  /// Ranks sorted ascending by threshold; guarantees a zero-XP entry exists.
  fn sanitize(mut self) -> Self {
    if self.xp_per_level == 0 {
      self.xp_per_level = 500;
    }
    if !self.skill_increment.is_finite() || self.skill_increment < 0.0 {
      self.skill_increment = 0.5;
    }
    self.ranks.sort_by_key(|r| r.min_xp);
    if self.ranks.first().map(|r| r.min_xp) != Some(0) {
      self.ranks = default_ranks();
    }
    self
  }
}

/// Prompts used by the OpenAI-compatible gateway. Override in TOML to tune tone.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub feedback_system: String,
  pub feedback_user_template: String,
  pub hint_system: String,
  pub hint_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      feedback_system: "You are a patient and friendly Python teacher for absolute beginners. Check for correctness, but focus on explaining the 'why'. If there is an error, explain it using simple analogies. Keep feedback encouraging and avoid overly complex technical jargon. Ensure the code follows Python 3.12+ standards like f-strings. Respond ONLY with a JSON object with fields: status (\"correct\", \"incorrect\", \"syntax-error\" or \"warning\"), message (a warm, encouraging summary), aiExplanation (a simple explanation of the logic), and optionally suggestion and actionableStep.".into(),
      feedback_user_template: "Analyze this Python code for a student learning the basics.\nMission: {title}\nGoal: {description}\nReference Solution: {reference}\nStudent's Attempt:\n```python\n{code}\n```".into(),
      hint_system: "You are a helpful Python tutor. Your goal is to guide the student to find the answer themselves. Keep hints very short (under 20 words).".into(),
      hint_user_template: "The student is stuck on: \"{description}\".\nTheir code: ```python\n{code}\n```\nGive a gentle, helpful hint. Do not give the answer. Use a supportive tone.".into(),
    }
  }
}

pub fn parse_agent_config(s: &str) -> Result<AgentConfig, ConfigError> {
  let mut cfg = toml::from_str::<AgentConfig>(s)?;
  cfg.progression = cfg.progression.sanitize();
  Ok(cfg)
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "pyquest_backend", %path, bank = cfg.challenges.len(), "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "pyquest_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "pyquest_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn progress_path_from_env() -> String {
  std::env::var("PROGRESS_PATH").unwrap_or_else(|_| DEFAULT_PROGRESS_PATH.into())
}
