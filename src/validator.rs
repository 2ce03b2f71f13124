//! Local answer validation.
//!
//! Normalized equality against the reference answer, then the challenge's
//! pitfalls in declared order (first match wins), then generic feedback.
//! Pure: no I/O, no shared state.

use crate::domain::{Challenge, Feedback, FeedbackContract, FeedbackStatus};
use crate::util::normalize_code;

pub const LOGIC_ALERT: &str = "Logic Alert";
pub const GENERIC_MESSAGE: &str = "Not quite right yet.";
pub const GENERIC_EXPLANATION: &str =
  "Python is very sensitive to exact spelling, spacing and symbols. Compare your code with the mission carefully.";
pub const GENERIC_SUGGESTION: &str = "Check your quotes, parentheses and colons.";
pub const REMOTE_SUCCESS_MESSAGE: &str = "Correct!";

pub fn validate(submitted: &str, challenge: &Challenge) -> Feedback {
  if normalize_code(submitted) == normalize_code(&challenge.solution) {
    return match &challenge.feedback {
      FeedbackContract::Local(local) => Feedback {
        status: FeedbackStatus::Correct,
        message: local.success.message.clone(),
        explanation: local.success.explanation.clone(),
        suggestion: None,
        actionable_step: None,
      },
      // Remote challenges only reach here when no gateway is configured.
      FeedbackContract::Remote => Feedback {
        status: FeedbackStatus::Correct,
        message: REMOTE_SUCCESS_MESSAGE.into(),
        explanation: String::new(),
        suggestion: None,
        actionable_step: None,
      },
    };
  }

  if let FeedbackContract::Local(local) = &challenge.feedback {
    if let Some(p) = local.pitfalls.iter().find(|p| p.pattern.matches(submitted)) {
      return Feedback {
        status: FeedbackStatus::Incorrect,
        message: p.guidance.clone(),
        explanation: LOGIC_ALERT.into(),
        suggestion: None,
        actionable_step: Some(p.action.clone()),
      };
    }
  }

  Feedback {
    status: FeedbackStatus::Incorrect,
    message: GENERIC_MESSAGE.into(),
    explanation: GENERIC_EXPLANATION.into(),
    suggestion: Some(GENERIC_SUGGESTION.into()),
    actionable_step: None,
  }
}
