//! WebSocket handler for voice calls
//!
//! The client streams captured microphone audio up as base64 PCM16 chunks
//! and receives call events (turns, status, duration ticks) down. Closing
//! the socket hangs up the call.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;

use bima_agent::{CallEvent, CallSession, CallStatus};
use bima_core::{AudioFrame, Channels, SampleRate};

use crate::session::SessionEntry;
use crate::state::AppState;

/// WebSocket message types (both directions)
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    // Client -> server
    /// Base64-encoded PCM16 mono audio chunk
    Audio { data: String },
    /// Start (or restart) the call
    Start,
    /// Hang up
    End,
    /// Mute or unmute the microphone
    Mute { muted: bool },
    Ping,

    // Server -> client
    SessionInfo {
        session_id: String,
    },
    Status {
        status: CallStatus,
        muted: bool,
        speaking: bool,
        listening: bool,
    },
    Turn {
        id: u64,
        speaker: String,
        text: String,
    },
    Listening {
        active: bool,
    },
    Speaking {
        active: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Duration {
        seconds: u64,
        formatted: String,
    },
    Error {
        message: String,
    },
    Pong,
}

type SharedSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Handle WebSocket upgrade for a call session
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, StatusCode> {
    let entry = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, entry)))
}

async fn handle_socket(socket: WebSocket, entry: Arc<SessionEntry>) {
    let session = entry.session.clone();
    let (sender, mut receiver) = socket.split();
    let sender: SharedSink = Arc::new(Mutex::new(sender));

    // Session info and current status up front
    let hello = WsMessage::SessionInfo {
        session_id: session.id().to_string(),
    };
    if send_json(&sender, &hello).await.is_err() {
        return;
    }
    let _ = send_json(&sender, &status_message(&session)).await;

    // Forward call events to the client
    let mut events = session.subscribe();
    let event_session = session.clone();
    let event_sender = Arc::clone(&sender);
    let event_task = tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "websocket event subscriber lagged");
                    continue;
                },
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            };

            let message = match event {
                CallEvent::StatusChanged { .. } => status_message(&event_session),
                CallEvent::TurnAdded(turn) => WsMessage::Turn {
                    id: turn.id,
                    speaker: turn.speaker.to_string(),
                    text: turn.text,
                },
                CallEvent::ListeningStarted => WsMessage::Listening { active: true },
                CallEvent::ListeningStopped => WsMessage::Listening { active: false },
                CallEvent::SpeakingStarted { text } => WsMessage::Speaking {
                    active: true,
                    text: Some(text),
                },
                CallEvent::SpeakingEnded => WsMessage::Speaking {
                    active: false,
                    text: None,
                },
                CallEvent::DurationTick { seconds } => WsMessage::Duration {
                    seconds,
                    formatted: format!("{:02}:{:02}", seconds / 60, seconds % 60),
                },
                CallEvent::Error { message } => WsMessage::Error { message },
            };

            if send_json(&event_sender, &message).await.is_err() {
                break;
            }
        }
    });

    // Drive the session from incoming messages
    let mut sequence: u64 = 0;
    while let Some(message) = receiver.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(session = %session.id(), error = %e, "websocket receive error");
                break;
            },
        };

        match message {
            Message::Text(text) => match serde_json::from_str::<WsMessage>(&text) {
                Ok(WsMessage::Audio { data }) => {
                    sequence += 1;
                    feed_audio(&entry, &data, sequence);
                },
                Ok(WsMessage::Start) => session.start_call(),
                Ok(WsMessage::End) => session.end_call(),
                Ok(WsMessage::Mute { muted }) => session.toggle_mute(muted),
                Ok(WsMessage::Ping) => {
                    let _ = send_json(&sender, &WsMessage::Pong).await;
                },
                Ok(_) => {},
                Err(e) => {
                    tracing::debug!(session = %session.id(), error = %e, "bad websocket message");
                },
            },
            Message::Binary(bytes) => {
                // Raw PCM16 frames are accepted without the JSON envelope
                sequence += 1;
                let frame =
                    AudioFrame::from_pcm16(&bytes, SampleRate::Hz16000, Channels::Mono, sequence);
                entry.device.feed(frame);
            },
            Message::Close(_) => break,
            _ => {},
        }
    }

    // Client is gone: hang up and stop forwarding
    session.end_call();
    event_task.abort();
    tracing::debug!(session = %session.id(), "websocket closed");
}

fn status_message(session: &CallSession) -> WsMessage {
    let snapshot = session.snapshot();
    WsMessage::Status {
        status: snapshot.status,
        muted: snapshot.muted,
        speaking: snapshot.speaking,
        listening: snapshot.listening,
    }
}

fn feed_audio(entry: &SessionEntry, data: &str, sequence: u64) {
    match BASE64.decode(data) {
        Ok(bytes) => {
            let frame =
                AudioFrame::from_pcm16(&bytes, SampleRate::Hz16000, Channels::Mono, sequence);
            entry.device.feed(frame);
        },
        Err(e) => {
            tracing::debug!(error = %e, "undecodable audio chunk dropped");
        },
    }
}

async fn send_json(sender: &SharedSink, message: &WsMessage) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).unwrap_or_default();
    sender.lock().await.send(Message::Text(text)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_message_round_trip() {
        let json = r#"{"type":"audio","data":"AAAA"}"#;
        let parsed: WsMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(parsed, WsMessage::Audio { .. }));

        let json = r#"{"type":"mute","muted":true}"#;
        let parsed: WsMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(parsed, WsMessage::Mute { muted: true }));

        let out = WsMessage::Duration {
            seconds: 65,
            formatted: "01:05".to_string(),
        };
        let text = serde_json::to_string(&out).unwrap();
        assert!(text.contains("\"type\":\"duration\""));
        assert!(text.contains("01:05"));
    }

    #[test]
    fn test_speaking_text_omitted_when_none() {
        let out = WsMessage::Speaking {
            active: false,
            text: None,
        };
        let text = serde_json::to_string(&out).unwrap();
        assert!(!text.contains("text"));
    }
}
