//! Insurance voice-agent server
//!
//! REST + WebSocket surface over the call-session controller: sessions are
//! created over HTTP, driven over `/ws/call/:id` (audio in, events out),
//! with a text-chat endpoint and the document classifier alongside.

pub mod http;
pub mod metrics;
pub mod session;
pub mod state;
pub mod websocket;

pub use http::create_router;
pub use metrics::{init_metrics, record_request, record_round_trip};
pub use session::{SessionEntry, SessionRegistry};
pub use state::AppState;
pub use websocket::WsMessage;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session capacity reached ({0})")]
    Capacity(usize),

    #[error("Session error: {0}")]
    Session(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
