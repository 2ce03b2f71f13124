//! Minimal OpenAI-compatible client acting as the remote feedback gateway.
//!
//! We only call chat.completions and request either plain text (hints) or a
//! strict JSON object (verdicts). Calls are instrumented and log model names,
//! latencies and response sizes, never code contents or the API key.
//!
//! `fetch_verdict` / `fetch_hint` never fail: any transport, status or parse
//! problem is logged and replaced with a fixed fallback. One attempt, no retry.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::domain::{Feedback, FeedbackStatus};
use crate::util::{fill_template, trunc_for_log};

pub const FALLBACK_MESSAGE: &str = "The AI Mentor is taking a quick break!";
pub const FALLBACK_EXPLANATION: &str = "Don't worry, even developers run into connection issues. Try checking your logic one more time or click the Hint button!";
pub const FALLBACK_HINT: &str = "Re-read the mission and compare your code with it one line at a time.";

#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("HTTP {status}: {message}")]
  Status { status: reqwest::StatusCode, message: String },
  #[error("JSON parse error: {0}")]
  Parse(#[from] serde_json::Error),
  #[error("empty model response")]
  Empty,
}

/// The verdict returned whenever the remote judge cannot be used.
pub fn fallback_verdict() -> Feedback {
  Feedback {
    status: FeedbackStatus::Incorrect,
    message: FALLBACK_MESSAGE.into(),
    explanation: FALLBACK_EXPLANATION.into(),
    suggestion: None,
    actionable_step: None,
  }
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let fast_model = std::env::var("OPENAI_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let strong_model = std::env::var("OPENAI_STRONG_MODEL").unwrap_or_else(|_| "gpt-4o".into());
    Self::new(api_key, base_url, fast_model, strong_model)
  }

  pub fn new(api_key: String, base_url: String, fast_model: String, strong_model: String) -> Option<Self> {
    let client = reqwest::Client::builder().timeout(Duration::from_secs(20)).build().ok()?;
    Some(Self { client, api_key, base_url, fast_model, strong_model })
  }

  async fn chat(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
    json: bool,
  ) -> Result<String, GatewayError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: json.then(|| ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "pyquest-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req)
      .send()
      .await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(GatewayError::Status { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(target: "pyquest_backend", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .unwrap_or_default()
      .trim()
      .to_string();
    if text.is_empty() {
      return Err(GatewayError::Empty);
    }
    Ok(text)
  }

  /// Ask the model to judge a submission. Fallible; see `fetch_verdict`.
  #[instrument(level = "info", skip_all, fields(model = %self.strong_model, code_len = code.len()))]
  pub async fn code_feedback(
    &self,
    prompts: &Prompts,
    title: &str,
    description: &str,
    code: &str,
    reference: &str,
  ) -> Result<Feedback, GatewayError> {
    let user = fill_template(
      &prompts.feedback_user_template,
      &[("title", title), ("description", description), ("reference", reference), ("code", code)],
    );
    let text = self.chat(&self.strong_model, &prompts.feedback_system, &user, 0.2, true).await?;
    Ok(serde_json::from_str::<Feedback>(&text)?)
  }

  #[instrument(level = "info", skip_all, fields(model = %self.fast_model, code_len = code.len()))]
  pub async fn hint(&self, prompts: &Prompts, description: &str, code: &str) -> Result<String, GatewayError> {
    let user = fill_template(&prompts.hint_user_template, &[("description", description), ("code", code)]);
    self.chat(&self.fast_model, &prompts.hint_system, &user, 0.2, false).await
  }

  pub async fn fetch_verdict(
    &self,
    prompts: &Prompts,
    title: &str,
    description: &str,
    code: &str,
    reference: &str,
  ) -> Feedback {
    let start = Instant::now();
    match self.code_feedback(prompts, title, description, code, reference).await {
      Ok(fb) => {
        info!(target: "pyquest_backend", elapsed = ?start.elapsed(), status = ?fb.status, "Remote verdict received");
        fb
      }
      Err(e) => {
        error!(target: "pyquest_backend", elapsed = ?start.elapsed(), error = %e, "Remote verdict failed; using fallback");
        fallback_verdict()
      }
    }
  }

  pub async fn fetch_hint(&self, prompts: &Prompts, description: &str, code: &str) -> String {
    match self.hint(prompts, description, code).await {
      Ok(t) => t,
      Err(e) => {
        error!(target: "pyquest_backend", error = %e, "Remote hint failed; using fallback");
        FALLBACK_HINT.into()
      }
    }
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
