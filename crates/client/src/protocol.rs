// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire codec for the game-server protocol.
//!
//! Outbound commands are `{"type": "...", "data": [{"subType": N, ...}]}`
//! envelopes; inbound frames are `{"errCode": N, "vals": {"type": N,
//! "data": {...}}}`. The numeric type/subType/opCode routing tuple is
//! resolved here into closed enums so the dispatcher matches on variants
//! instead of magic numbers, and unknown traffic stays representable.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::session::{BetLimits, BetResult, Paytable};

// ---------------------------------------------------------------------------
// Routing codes
// ---------------------------------------------------------------------------

/// Inbound top-level message types.
const MSG_LOGIN: i64 = 1;
const MSG_LOBBY: i64 = 3;
const MSG_GAME: i64 = 100_000;
const MSG_ROOM_STATUS: i64 = 200_018;

/// Sub-types within the generic game message family.
const SUB_JOIN_ROOM: i64 = 100_004;
const SUB_ROOM_JOINED: i64 = 100_005;
const SUB_GAME_OP: i64 = 100_070;
const SUB_GAME_OP_ACK: i64 = 100_071;

/// Operation codes within sub-type 100070/100071.
const OP_GET_RECORDS: &str = "GetRecords";
const OP_SYNC_ROOM_INFO: &str = "SyncRoomInfo";
const OP_SET_BET: &str = "SetBet";

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// One outbound command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login,
    Lobby,
    JoinRoom,
    Transfer,
    GetRecords,
    SyncRoomInfo,
    SetBet { bet: f64, line: u32 },
}

/// Outbound envelope. The upstream server keys the top-level `type` as a
/// string and the nested `subType` as an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Vec<RequestPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPart {
    pub sub_type: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_data: Option<Vec<SubOp>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubOp {
    pub op_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
}

impl Command {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Lobby => "lobby",
            Self::JoinRoom => "join_room",
            Self::Transfer => "transfer",
            Self::GetRecords => "get_records",
            Self::SyncRoomInfo => "sync_room_info",
            Self::SetBet { .. } => "set_bet",
        }
    }

    /// Build the wire envelope for this command.
    pub fn request(&self) -> Request {
        match self {
            Self::Login => Request::plain("0", 0),
            Self::Lobby => Request::plain("2", 0),
            Self::JoinRoom => Request::plain("100000", SUB_JOIN_ROOM),
            Self::Transfer => Request::plain("200017", 200_017),
            Self::GetRecords => Request::game_op(OP_GET_RECORDS, None),
            Self::SyncRoomInfo => Request::game_op(OP_SYNC_ROOM_INFO, None),
            Self::SetBet { bet, line } => Request::game_op(
                OP_SET_BET,
                Some(serde_json::json!({ "bet": bet, "line": line })),
            ),
        }
    }

    /// Serialize this command to a wire string. Total: every command kind
    /// has a fixed, serializable shape.
    pub fn encode(&self) -> String {
        serde_json::to_string(&self.request()).unwrap_or_default()
    }
}

impl Request {
    fn plain(kind: &str, sub_type: i64) -> Self {
        Self {
            kind: kind.to_owned(),
            data: vec![RequestPart { sub_type, sub_data: None }],
        }
    }

    fn game_op(op_code: &str, message: Option<Value>) -> Self {
        Self {
            kind: "100000".to_owned(),
            data: vec![RequestPart {
                sub_type: SUB_GAME_OP,
                sub_data: Some(vec![SubOp { op_code: op_code.to_owned(), message }]),
            }],
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    LoginAck(LoginAck),
    LobbyAck(LobbyAck),
    RoomJoined(RoomJoined),
    Records(RecordsPage),
    RoomSync(Paytable),
    BetSettled(BetResult),
    RoomStatus(RoomStatus),
    /// Top-level `errCode != 0`: the request failed server-side.
    ServerError { code: i64 },
    /// Well-formed envelope with an unrecognised routing tuple.
    Unknown {
        kind: i64,
        sub_type: Option<i64>,
        op_code: Option<String>,
    },
}

/// Login ack payload (inbound type 1).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginAck {
    #[serde(default)]
    pub err_code: i64,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub player_id: String,
    #[serde(default)]
    pub lobby_server_ip: String,
    #[serde(default)]
    pub lobby_server_port: u16,
}

/// Lobby ack payload (inbound type 3).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyAck {
    #[serde(default)]
    pub err_code: i64,
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub server_time: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub wallet_type: String,
}

/// Room join result (sub-type 100005).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoined {
    #[serde(default)]
    pub game_type: i64,
    #[serde(default)]
    pub room_id: i64,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub bet_info: Vec<BetInfoEntry>,
    #[serde(default)]
    pub currency_info: Vec<CurrencyEntry>,
}

/// One game's bet configuration within a room.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetInfoEntry {
    #[serde(default)]
    pub game_name: String,
    #[serde(flatten)]
    pub limits: BetLimits,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyEntry {
    #[serde(default)]
    pub currency_id: i64,
    #[serde(default)]
    pub currency: String,
}

/// Bet-history page (opCode `GetRecords`). The record list is passed
/// through opaquely; nothing in the session consumes it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordsPage {
    #[serde(default)]
    pub records: Value,
}

/// Room occupancy/reservation notice (inbound type 200018).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStatus {
    #[serde(default)]
    pub game_type: i64,
    #[serde(default)]
    pub room_index: i64,
    #[serde(default)]
    pub is_occupied: bool,
    /// Reservation expiry as 100 ns ticks since year 1 (see `ticks.rs`).
    #[serde(default)]
    pub reserve_expired_time: i64,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "errCode")]
    err_code: i64,
    #[serde(default)]
    vals: Value,
}

#[derive(Debug, Deserialize)]
struct Vals {
    #[serde(rename = "type")]
    kind: i64,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameData {
    sub_type: i64,
    #[serde(default)]
    sub_data: Vec<Value>,
}

fn missing(field: &str) -> serde_json::Error {
    <serde_json::Error as serde::de::Error>::custom(format!("missing {field}"))
}

/// Decode one inbound wire frame.
///
/// Fails only on malformed JSON or a malformed payload for a *recognised*
/// code; unknown codes decode to [`Inbound::Unknown`] so the dispatcher can
/// log and drop them without treating them as errors.
pub fn decode(text: &str) -> Result<Inbound> {
    let envelope: RawEnvelope = serde_json::from_str(text)?;
    if envelope.err_code != 0 {
        return Ok(Inbound::ServerError { code: envelope.err_code });
    }

    let vals: Vals = serde_json::from_value(envelope.vals)?;
    match vals.kind {
        MSG_LOGIN => Ok(Inbound::LoginAck(serde_json::from_value(vals.data)?)),
        MSG_LOBBY => Ok(Inbound::LobbyAck(serde_json::from_value(vals.data)?)),
        MSG_GAME => decode_game(vals.data),
        MSG_ROOM_STATUS => Ok(Inbound::RoomStatus(serde_json::from_value(vals.data)?)),
        kind => Ok(Inbound::Unknown { kind, sub_type: None, op_code: None }),
    }
}

fn decode_game(data: Value) -> Result<Inbound> {
    let game: GameData = serde_json::from_value(data)?;
    match game.sub_type {
        SUB_ROOM_JOINED => {
            let payload = game.sub_data.into_iter().next().ok_or_else(|| missing("subData"))?;
            Ok(Inbound::RoomJoined(serde_json::from_value(payload)?))
        }
        SUB_GAME_OP_ACK => {
            let payload = game.sub_data.into_iter().next().ok_or_else(|| missing("subData"))?;
            decode_game_op(payload)
        }
        sub_type => Ok(Inbound::Unknown {
            kind: MSG_GAME,
            sub_type: Some(sub_type),
            op_code: first_op_code(&game.sub_data),
        }),
    }
}

fn decode_game_op(payload: Value) -> Result<Inbound> {
    let op_code = payload
        .get("opCode")
        .and_then(Value::as_str)
        .ok_or_else(|| missing("opCode"))?
        .to_owned();
    match op_code.as_str() {
        OP_GET_RECORDS => Ok(Inbound::Records(serde_json::from_value(payload)?)),
        OP_SYNC_ROOM_INFO => Ok(Inbound::RoomSync(serde_json::from_value(payload)?)),
        OP_SET_BET => Ok(Inbound::BetSettled(serde_json::from_value(payload)?)),
        _ => Ok(Inbound::Unknown {
            kind: MSG_GAME,
            sub_type: Some(SUB_GAME_OP_ACK),
            op_code: Some(op_code),
        }),
    }
}

/// Best-effort opCode extraction for unknown sub-types, so the routing
/// tuple stays observable in logs.
fn first_op_code(sub_data: &[Value]) -> Option<String> {
    sub_data
        .first()?
        .get("opCode")
        .and_then(Value::as_str)
        .map(str::to_owned)
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
