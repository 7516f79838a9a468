//! One-shot transport adapter: a single POST, a fresh transcript, one
//! streamed exchange, no retained state.
//!
//! Wire format per delta is `data: <fragment>`, terminated by either the
//! `data: [FINAL]` sentinel or a single `data: {"error": ...}` frame.

use std::convert::Infallible;
use std::pin::Pin;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures::stream::{self, Stream, StreamExt};
use serde_json::json;

use super::AppState;
use crate::completion::DeltaStream;
use crate::error::RelayError;
use crate::models::{Inbound, Transcript};
use crate::prompt;

/// One frame of the outbound SSE state machine:
/// `Delta* → Final` on success, `Delta* → Error` on failure.
#[derive(Debug, PartialEq)]
pub(crate) enum SseFrame {
    Delta(String),
    Final,
    Error(String),
}

impl SseFrame {
    fn into_event(self) -> Event {
        match self {
            SseFrame::Delta(fragment) => Event::default().data(fragment),
            SseFrame::Final => Event::default().data("[FINAL]"),
            SseFrame::Error(message) => {
                Event::default().data(json!({ "error": message }).to_string())
            }
        }
    }
}

/// `POST /api/chat-stream`. The body is parsed leniently like a WebSocket
/// frame: a non-JSON body is treated as the message text itself.
pub async fn chat_stream(
    State(state): State<AppState>,
    body: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let frames = frames_for(&state, &Inbound::parse(&body)).await;
    Sse::new(frames.map(|frame| Ok(frame.into_event())))
}

/// Build the outbound frame sequence for one exchange: fresh transcript,
/// same classification/augmentation path as the full-duplex adapter, then
/// one streamed completion.
async fn frames_for(
    state: &AppState,
    inbound: &Inbound,
) -> Pin<Box<dyn Stream<Item = SseFrame> + Send>> {
    let mut transcript = Transcript::seeded(prompt::SYSTEM_PROMPT);
    let intent = prompt::push_user_turn(&mut transcript, &inbound.text);
    tracing::info!(?intent, "one-shot chat stream");

    match state
        .backend
        .stream_chat(transcript.messages(), inbound.key.as_deref())
        .await
    {
        Ok(deltas) => Box::pin(frame_stream(deltas)),
        // Misconfiguration is fatal to the whole exchange here: one error
        // frame, zero deltas, stream ends.
        Err(RelayError::MissingApiKey) => Box::pin(stream::once(async {
            SseFrame::Error(prompt::MISSING_KEY_ERROR.to_string())
        })),
        Err(e) => {
            tracing::warn!(error = %e, "upstream request failed");
            Box::pin(stream::once(async move { SseFrame::Error(e.to_string()) }))
        }
    }
}

/// Pure frame machine over an upstream delta sequence: forward each
/// fragment, then the sentinel on exhaustion; an upstream error yields one
/// error frame and ends the stream without the sentinel.
pub(crate) fn frame_stream(deltas: DeltaStream) -> impl Stream<Item = SseFrame> + Send {
    enum FrameState {
        Streaming(DeltaStream),
        Done,
    }

    stream::unfold(FrameState::Streaming(deltas), |state| async move {
        match state {
            FrameState::Streaming(mut deltas) => match deltas.next().await {
                Some(Ok(fragment)) => {
                    Some((SseFrame::Delta(fragment), FrameState::Streaming(deltas)))
                }
                Some(Err(e)) => Some((SseFrame::Error(e.to_string()), FrameState::Done)),
                None => Some((SseFrame::Final, FrameState::Done)),
            },
            FrameState::Done => None,
        }
    })
}
