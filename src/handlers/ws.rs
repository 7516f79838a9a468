//! Full-duplex transport adapter: one long-lived WebSocket connection,
//! multiple turns, per-connection transcript in the session registry.
//!
//! Turns are strictly sequential: the handler awaits a whole turn before
//! reading the next frame, so messages sent while a reply is streaming sit
//! in the socket buffer and are never interleaved with the in-flight turn.
//! Closing the connection drops the handler future, which aborts any
//! in-flight upstream request.

use async_trait::async_trait;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::StreamExt;
use uuid::Uuid;

use super::AppState;
use crate::error::{RelayError, Result};
use crate::models::{AssistantEvent, ChatMessage, Inbound};
use crate::prompt;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let id = Uuid::new_v4();
    state.sessions.create(id, prompt::SYSTEM_PROMPT);
    tracing::info!(connection = %id, "websocket connected");

    while let Some(frame) = socket.next().await {
        let raw = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Ok(Message::Close(_)) => break,
            // Ping/pong are answered by axum itself.
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(connection = %id, error = %e, "websocket read failed");
                break;
            }
        };

        let mut sink = SocketSink {
            socket: &mut socket,
        };
        if let Err(e) = handle_turn(&state, id, &raw, &mut sink).await {
            tracing::warn!(connection = %id, error = %e, "turn failed, closing connection");
            break;
        }
    }

    state.sessions.destroy(id);
    tracing::info!(connection = %id, "websocket disconnected");
}

/// Where a turn's outbound events go. Seam between the turn logic and the
/// actual socket so the turn can be exercised without a network.
#[async_trait]
pub trait EventSink: Send {
    async fn emit(&mut self, event: AssistantEvent) -> Result<()>;
}

struct SocketSink<'a> {
    socket: &'a mut WebSocket,
}

#[async_trait]
impl EventSink for SocketSink<'_> {
    async fn emit(&mut self, event: AssistantEvent) -> Result<()> {
        let payload = serde_json::to_string(&event)?;
        self.socket.send(Message::Text(payload)).await?;
        Ok(())
    }
}

/// Run one conversational turn against the session transcript.
///
/// Error policy per the taxonomy: a missing credential becomes a synthetic
/// assistant reply recorded in the transcript; any other upstream failure
/// is surfaced as the turn's final event without recording an assistant
/// message, and the connection stays up.
async fn handle_turn<S: EventSink>(
    state: &AppState,
    id: Uuid,
    raw: &str,
    sink: &mut S,
) -> Result<()> {
    let inbound = Inbound::parse(raw);
    let intent = state
        .sessions
        .with(id, |t| prompt::push_user_turn(t, &inbound.text))?;
    let messages = state.sessions.snapshot(id)?;
    tracing::info!(connection = %id, ?intent, "handling turn");

    sink.emit(AssistantEvent::status(prompt::THINKING_STATUS))
        .await?;

    let mut stream = match state
        .backend
        .stream_chat(&messages, inbound.key.as_deref())
        .await
    {
        Ok(stream) => stream,
        Err(RelayError::MissingApiKey) => {
            return finish_turn(state, id, prompt::MISSING_KEY_REPLY.to_string(), sink).await;
        }
        Err(e) => {
            tracing::warn!(connection = %id, error = %e, "upstream request failed");
            return sink.emit(AssistantEvent::final_reply(e.to_string())).await;
        }
    };

    let mut full = String::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(delta) => {
                full.push_str(&delta);
                sink.emit(AssistantEvent::delta(delta)).await?;
            }
            Err(e) => {
                tracing::warn!(connection = %id, error = %e, "upstream stream failed mid-turn");
                return sink.emit(AssistantEvent::final_reply(e.to_string())).await;
            }
        }
    }

    finish_turn(state, id, full.trim().to_string(), sink).await
}

/// Record the assistant reply, cut the context window, and emit the final
/// event carrying the full reply.
async fn finish_turn<S: EventSink>(
    state: &AppState,
    id: Uuid,
    reply: String,
    sink: &mut S,
) -> Result<()> {
    state.sessions.append(id, ChatMessage::assistant(reply.clone()))?;
    state.sessions.truncate(id)?;
    sink.emit(AssistantEvent::final_reply(reply)).await
}
