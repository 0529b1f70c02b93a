// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test support: an in-process mock game server and assertion helpers.
//!
//! The mock implements the wallet, launch, and game-socket endpoints with
//! canned payloads, records every frame the client sends, and lets tests
//! push arbitrary frames or close the socket mid-session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{any, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::config::Config;

/// Convert any displayable error into `anyhow::Error`.
pub trait AnyhowExt<T> {
    fn anyhow(self) -> anyhow::Result<T>;
}

impl<T, E: std::fmt::Display> AnyhowExt<T> for Result<T, E> {
    fn anyhow(self) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("{e}"))
    }
}

/// Fixed credentials the mock accepts (mirrored by [`Config::test`]).
const WALLET_SECRET: &str = "test-secret";
const API_SECRET: &str = "test-api-secret";
const LAUNCH_TOKEN: &str = "tok-abc";

#[derive(Debug, Clone)]
enum PushFrame {
    Text(String),
    Close,
}

struct ServerState {
    push_tx: broadcast::Sender<PushFrame>,
    received: Mutex<Vec<Value>>,
    bet_result: Mutex<Value>,
    fail_login: AtomicBool,
    duplicate_join: AtomicBool,
    swallow_bets: AtomicBool,
    hold_joins: AtomicBool,
}

impl ServerState {
    fn new() -> Self {
        let (push_tx, _) = broadcast::channel(16);
        Self {
            push_tx,
            received: Mutex::new(Vec::new()),
            bet_result: Mutex::new(default_bet_result()),
            fail_login: AtomicBool::new(false),
            duplicate_join: AtomicBool::new(false),
            swallow_bets: AtomicBool::new(false),
            hold_joins: AtomicBool::new(false),
        }
    }
}

/// In-process wallet + launch + game-socket server for tests.
pub struct MockGameServer {
    base_url: String,
    ws_url: String,
    state: Arc<ServerState>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockGameServer {
    /// Bind to an ephemeral port and start serving.
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(ServerState::new());
        let router = Router::new()
            .route("/api/wallet/sid", post(wallet_sid))
            .route("/api/launch", post(launch))
            .route("/game", any(game_ws))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router.into_make_service()).await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            ws_url: format!("ws://{addr}/game"),
            state,
            handle,
        })
    }

    /// A client config pointed at this server.
    pub fn config(&self) -> Config {
        Config::test(
            &format!("{}/api/wallet/sid", self.base_url),
            &format!("{}/api/launch", self.base_url),
            &self.ws_url,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every frame received on the game socket, in arrival order.
    pub fn received(&self) -> Vec<Value> {
        self.state.received.lock().clone()
    }

    /// Count received frames with the given top-level `type`.
    pub fn count_type(&self, kind: &str) -> usize {
        self.received()
            .iter()
            .filter(|frame| frame.get("type").and_then(Value::as_str) == Some(kind))
            .count()
    }

    /// Count received game-op frames with the given opCode.
    pub fn count_op(&self, op: &str) -> usize {
        self.received()
            .iter()
            .filter(|frame| {
                frame
                    .pointer("/data/0/subData/0/opCode")
                    .and_then(Value::as_str)
                    == Some(op)
            })
            .count()
    }

    /// Push a raw frame to every connected socket.
    pub fn push_frame(&self, frame: Value) {
        let _ = self.state.push_tx.send(PushFrame::Text(frame.to_string()));
    }

    /// Push raw text (not necessarily JSON) to every connected socket.
    pub fn push_text(&self, text: &str) {
        let _ = self.state.push_tx.send(PushFrame::Text(text.to_owned()));
    }

    /// Close every connected socket.
    pub fn close_sockets(&self) {
        let _ = self.state.push_tx.send(PushFrame::Close);
    }

    /// Replace the canned SetBet settlement payload.
    pub fn set_bet_result(&self, payload: Value) {
        *self.state.bet_result.lock() = payload;
    }

    /// Make the next login ack carry a non-zero nested errCode.
    pub fn fail_login(&self) {
        self.state.fail_login.store(true, Ordering::Relaxed);
    }

    /// Answer each join request with two join acks.
    pub fn duplicate_join(&self) {
        self.state.duplicate_join.store(true, Ordering::Relaxed);
    }

    /// Stop answering SetBet requests, leaving the bet in flight until the
    /// test pushes a settlement itself.
    pub fn swallow_bets(&self) {
        self.state.swallow_bets.store(true, Ordering::Relaxed);
    }

    /// Stop answering join requests, freezing the handshake before the
    /// room phase.
    pub fn hold_joins(&self) {
        self.state.hold_joins.store(true, Ordering::Relaxed);
    }

    /// A settlement frame a test can push after `swallow_bets`.
    pub fn settlement_frame(&self) -> Value {
        game_op_ack(self.state.bet_result.lock().clone())
    }
}

impl Drop for MockGameServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// HTTP handlers
// ---------------------------------------------------------------------------

async fn wallet_sid(
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    if params.get("authToken").map(String::as_str) != Some(WALLET_SECRET) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if body.get("userId").and_then(Value::as_str).unwrap_or_default().is_empty() {
        return StatusCode::BAD_REQUEST.into_response();
    }
    Json(json!({ "sid": "sid-123" })).into_response()
}

async fn launch(Json(body): Json<Value>) -> Response {
    if body.get("apiSecret").and_then(Value::as_str) != Some(API_SECRET) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let redirect = format!("https://play.invalid/launch?token={LAUNCH_TOKEN}&lang=en");
    Json(json!({ "vals": { "data": { "redirectUrl": redirect } } })).into_response()
}

async fn game_ws(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    if params.get("token").map(String::as_str) != Some(LAUNCH_TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(state, socket)).into_response()
}

async fn handle_socket(state: Arc<ServerState>, mut socket: WebSocket) {
    let mut push_rx = state.push_tx.subscribe();
    loop {
        tokio::select! {
            push = push_rx.recv() => {
                match push {
                    Ok(PushFrame::Text(text)) => {
                        if socket.send(WsMessage::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Ok(PushFrame::Close) => {
                        let _ = socket.send(WsMessage::Close(None)).await;
                        break;
                    }
                    Err(_) => continue,
                }
            }
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let WsMessage::Text(text) = msg else { continue };
                let Ok(request) = serde_json::from_str::<Value>(&text) else { continue };
                state.received.lock().push(request.clone());
                for reply in replies(&state, &request) {
                    if socket.send(WsMessage::Text(reply.to_string().into())).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Canned protocol replies
// ---------------------------------------------------------------------------

fn replies(state: &ServerState, request: &Value) -> Vec<Value> {
    let kind = request.get("type").and_then(Value::as_str).unwrap_or_default();
    match kind {
        "0" => {
            let err_code = if state.fail_login.load(Ordering::Relaxed) { 100 } else { 0 };
            vec![login_ack(err_code)]
        }
        "2" => vec![lobby_ack()],
        "200017" => vec![json!({ "errCode": 0, "vals": { "type": 200017, "data": {} } })],
        "100000" => game_replies(state, request),
        _ => Vec::new(),
    }
}

fn game_replies(state: &ServerState, request: &Value) -> Vec<Value> {
    match request.pointer("/data/0/subType").and_then(Value::as_i64) {
        Some(100004) => {
            if state.hold_joins.load(Ordering::Relaxed) {
                Vec::new()
            } else if state.duplicate_join.load(Ordering::Relaxed) {
                vec![join_ack(), join_ack()]
            } else {
                vec![join_ack()]
            }
        }
        Some(100070) => {
            match request.pointer("/data/0/subData/0/opCode").and_then(Value::as_str) {
                Some("GetRecords") => vec![game_op_ack(json!({
                    "opCode": "GetRecords",
                    "records": [{ "round": 1, "bet": 10.0, "win": 0.0 }],
                }))],
                Some("SyncRoomInfo") => vec![game_op_ack(json!({
                    "opCode": "SyncRoomInfo",
                    "winningPatterns": { "1": [1,1,1,1,1], "2": [0,0,0,0,0], "3": [2,2,2,2,2] },
                    "multipliers": [
                        [40, 50, 100, 150, 200, 500],
                        [10, 15, 25, 40, 60, 150],
                        [2, 4, 8, 10, 15, 40],
                    ],
                }))],
                Some("SetBet") => {
                    if state.swallow_bets.load(Ordering::Relaxed) {
                        Vec::new()
                    } else {
                        vec![game_op_ack(state.bet_result.lock().clone())]
                    }
                }
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

fn login_ack(err_code: i64) -> Value {
    json!({
        "errCode": 0,
        "vals": { "type": 1, "data": {
            "errCode": err_code,
            "sessionId": "sess-1",
            "playerId": "player-9",
            "lobbyServerIp": "10.0.0.5",
            "lobbyServerPort": 7401,
        }},
    })
}

fn lobby_ack() -> Value {
    json!({
        "errCode": 0,
        "vals": { "type": 3, "data": {
            "errCode": 0,
            "gameId": "buffalo-classic",
            "balance": 5000.0,
            "serverTime": 1_754_500_000_000_i64,
            "currency": "USD",
            "walletType": "seamless",
        }},
    })
}

fn join_ack() -> Value {
    json!({
        "errCode": 0,
        "vals": { "type": 100000, "data": { "subType": 100005, "subData": [{
            "gameType": 9,
            "roomId": 3101,
            "balance": 5000.0,
            "betInfo": [{
                "gameName": "buffalo-classic",
                "minBet": 1.0,
                "maxBet": 100.0,
                "defaultBet": 10.0,
                "decimalCount": 2,
            }],
            "currencyInfo": [{ "currencyId": 1, "currency": "$" }],
        }]}},
    })
}

fn game_op_ack(payload: Value) -> Value {
    json!({
        "errCode": 0,
        "vals": { "type": 100000, "data": { "subType": 100071, "subData": [payload] } },
    })
}

/// Settlement for a 10-unit bet: line 1 matches five of symbol 2 at 100x.
fn default_bet_result() -> Value {
    json!({
        "opCode": "SetBet",
        "balance": 4990.0,
        "finalBalance": 5990.0,
        "winAmount": 1000.0,
        "finalSymbols": [[1,3,4,2,5], [2,2,2,2,2], [0,1,0,1,0]],
        "matchDetails": [{
            "line": 1,
            "pattern": [1,1,1,1,1],
            "symbol": 2,
            "count": 5,
            "multiplier": 100,
        }],
    })
}
