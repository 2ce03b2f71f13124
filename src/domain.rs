//! Domain models: tiers, challenges, feedback contracts and verdicts.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Difficulty bucket. Each tier feeds one skill when completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
  Beginner,
  Intermediate,
  Advanced,
}

impl Tier {
  pub const ALL: [Tier; 3] = [Tier::Beginner, Tier::Intermediate, Tier::Advanced];
}

/// Learner specialization track; challenges are tagged with one too.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Specialization {
  #[default]
  None,
  #[serde(rename = "Data Wizard")]
  DataWizard,
  #[serde(rename = "Web Architect")]
  WebArchitect,
}

/// The six tracked skill categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
  Syntax,
  Logic,
  Oop,
  Async,
  Architecture,
  Data,
}

/// How a pitfall recognizes a wrong answer.
#[derive(Clone, Debug)]
pub enum PitfallPattern {
  Literal(String),
  Regex(Regex),
}

impl PitfallPattern {
  /// Tested against the raw submission, never the normalized one.
  pub fn matches(&self, submitted: &str) -> bool {
    match self {
      PitfallPattern::Literal(s) => submitted.contains(s.as_str()),
      PitfallPattern::Regex(re) => re.is_match(submitted),
    }
  }
}

#[derive(Clone, Debug)]
pub struct Pitfall {
  pub pattern: PitfallPattern,
  pub guidance: String,
  pub action: String,
}

#[derive(Clone, Debug)]
pub struct SuccessNote {
  pub message: String,
  pub explanation: String,
}

/// Locally judged challenge: success copy, a static hint and ordered pitfalls.
#[derive(Clone, Debug)]
pub struct LocalFeedback {
  pub success: SuccessNote,
  pub hint: String,
  pub pitfalls: Vec<Pitfall>,
}

#[derive(Clone, Debug)]
pub enum FeedbackContract {
  /// Always delegated to the remote gateway.
  Remote,
  Local(LocalFeedback),
}

/// Immutable curriculum entry.
#[derive(Clone, Debug)]
pub struct Challenge {
  pub id: String,
  pub tier: Tier,
  pub path: Specialization,
  pub title: String,
  pub description: String,
  pub points: u32,
  pub initial_code: String,
  pub solution: String,
  pub concepts: Vec<String>,
  pub feedback: FeedbackContract,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackStatus {
  Correct,
  Incorrect,
  SyntaxError,
  Warning,
}

/// Verdict for one submission. Local validator and remote gateway both
/// produce this exact shape; the remote JSON contract deserializes into it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
  pub status: FeedbackStatus,
  pub message: String,
  #[serde(rename = "aiExplanation")]
  pub explanation: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub suggestion: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub actionable_step: Option<String>,
}

impl Feedback {
  pub fn is_correct(&self) -> bool {
    self.status == FeedbackStatus::Correct
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn literal_pattern_is_substring_match() {
    let p = PitfallPattern::Literal("\"Hello World\"".into());
    assert!(p.matches("echo(\"Hello World\")"));
    assert!(!p.matches("print(Hello World)"));
  }

  #[test]
  fn regex_pattern_respects_inline_flags() {
    let p = PitfallPattern::Regex(Regex::new(r"(?i)print\(Hello World\)").unwrap());
    assert!(p.matches("PRINT(hello world)"));
    assert!(!p.matches("print(\"Hello World\")"));
  }

  #[test]
  fn feedback_uses_remote_field_names() {
    let fb: Feedback = serde_json::from_str(
      r#"{"status":"syntax-error","message":"m","aiExplanation":"e","actionableStep":"a"}"#,
    )
    .unwrap();
    assert_eq!(fb.status, FeedbackStatus::SyntaxError);
    assert_eq!(fb.explanation, "e");
    assert_eq!(fb.actionable_step.as_deref(), Some("a"));
    assert_eq!(fb.suggestion, None);

    let out = serde_json::to_value(&fb).unwrap();
    assert_eq!(out["aiExplanation"], "e");
    assert!(out.get("suggestion").is_none());
  }

  #[test]
  fn unknown_status_is_rejected() {
    let r = serde_json::from_str::<Feedback>(r#"{"status":"great","message":"m","aiExplanation":"e"}"#);
    assert!(r.is_err());
  }

  #[test]
  fn specialization_names_match_display_labels() {
    assert_eq!(serde_json::to_string(&Specialization::DataWizard).unwrap(), "\"Data Wizard\"");
    assert_eq!(serde_json::from_str::<Specialization>("\"None\"").unwrap(), Specialization::None);
  }
}
