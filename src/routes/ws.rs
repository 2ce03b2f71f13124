//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic; we reply with a single JSON message per request.
//! Each connection owns its own `Session`, and auto-advance results are pushed
//! back through a channel drained by the same loop.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::mpsc;
use tracing::{info, error, instrument, debug};

use crate::protocol::{to_out, ClientWsMessage, ServerWsMessage};
use crate::logic;
use crate::session::{Advance, Session};
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "pyquest_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

fn encode(msg: &ServerWsMessage) -> String {
  serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  })
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let session = Session::new(state.first_challenge().map(|c| c.id.clone()));
  let (push_tx, mut push_rx) = mpsc::unbounded_channel::<Advance>();
  info!(target: "pyquest_backend", session = %session.id, "WebSocket connected");

  loop {
    let reply = tokio::select! {
      incoming = socket.recv() => match incoming {
        Some(Ok(Message::Text(txt))) => match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(msg) => {
            debug!(target: "pyquest_backend", session = %session.id, "WS received: {:?}", &msg);
            handle_client_ws(msg, &state, &session, &push_tx).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        },
        Some(Ok(Message::Ping(payload))) => {
          let _ = socket.send(Message::Pong(payload)).await;
          continue;
        }
        Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
        Some(Ok(_)) => continue,
      },
      Some(advance) = push_rx.recv() => match advance {
        Advance::Next(ch) => {
          let progress = state.progress().await;
          ServerWsMessage::Challenge { challenge: to_out(&ch, &state.curriculum, &progress) }
        }
        Advance::CurriculumComplete => ServerWsMessage::CurriculumComplete,
      },
    };

    if let Err(e) = socket.send(Message::Text(encode(&reply))).await {
      error!(target: "pyquest_backend", session = %session.id, error = %e, "WS send error");
      break;
    }
  }

  session.cancel_advance();
  info!(target: "pyquest_backend", session = %session.id, "WebSocket disconnected");
}

async fn handle_client_ws(
  msg: ClientWsMessage,
  state: &AppState,
  session: &Arc<Session>,
  push_tx: &mpsc::UnboundedSender<Advance>,
) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::SelectChallenge { challenge_id } => {
      match logic::select_challenge(state, session, challenge_id.as_deref()).await {
        Ok(challenge) => {
          info!(target: "challenge", session = %session.id, id = %challenge.id, "WS challenge served");
          ServerWsMessage::Challenge { challenge }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::SubmitAnswer { challenge_id, answer } => {
      let tx = push_tx.clone();
      match logic::submit_answer(state, session, &challenge_id, &answer, move |a| { let _ = tx.send(a); }).await {
        Ok(out) => {
          info!(target: "challenge", session = %session.id, id = %challenge_id, status = ?out.feedback.status, awarded = out.awarded, "WS submit_answer evaluated");
          ServerWsMessage::AnswerResult(out)
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::Hint { challenge_id, code } => match logic::get_hint_text(state, &challenge_id, &code).await {
      Ok(text) => ServerWsMessage::Hint { text },
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::GetCurriculum => ServerWsMessage::Curriculum(logic::get_curriculum(state).await),

    ClientWsMessage::GetProgress => ServerWsMessage::Progress(logic::get_progress(state).await),

    ClientWsMessage::ResetProgress => ServerWsMessage::Progress(logic::reset_progress(state).await),

    ClientWsMessage::ChoosePath { path } => ServerWsMessage::Progress(logic::set_path(state, path).await),
  }
}
