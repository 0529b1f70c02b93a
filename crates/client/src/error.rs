// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors surfaced by the session client.
///
/// The HTTP-handshake variants (`Auth`, `Launch`) and `Protocol` are fatal
/// to a connection attempt; retry policy belongs to the caller. `Decode`
/// covers frames the codec cannot parse — the io loop logs and drops those
/// without touching session state.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("wallet rejected the ticket request: {status}")]
    Auth { status: reqwest::StatusCode },
    #[error("launch failed: {0}")]
    Launch(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("invalid frame: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("server error {code} during {stage}")]
    Protocol { stage: &'static str, code: i64 },
    #[error("not connected")]
    NotConnected,
    #[error("no room joined yet (phase: {phase})")]
    NotInRoom { phase: &'static str },
    #[error("a bet is already in flight")]
    BetInFlight,
    #[error("connection closed")]
    ConnectionClosed,
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
