// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session state accumulated across the handshake, and the phase machine
//! that gates what the client may send at any moment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Where the session is in its lifecycle.
///
/// Driven exclusively by inbound acks (see `dispatch.rs`), except for the
/// `InRoom → BetInFlight` edge, which the command issuer takes when a bet
/// is enqueued. There is exactly one outstanding bet at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Disconnected,
    AwaitingLogin,
    AwaitingLobby,
    AwaitingRoom,
    InRoom,
    BetInFlight,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::AwaitingLogin => "awaiting_login",
            Self::AwaitingLobby => "awaiting_lobby",
            Self::AwaitingRoom => "awaiting_room",
            Self::InRoom => "in_room",
            Self::BetInFlight => "bet_in_flight",
        }
    }

    /// True once the room is joined, whether or not a bet is outstanding.
    pub fn in_room(&self) -> bool {
        matches!(self, Self::InRoom | Self::BetInFlight)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-game bet bounds, fixed at room join.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetLimits {
    pub min_bet: f64,
    pub max_bet: f64,
    pub default_bet: f64,
    #[serde(default)]
    pub decimal_count: u8,
}

/// Payline patterns and payout multipliers, supplied by the server at room
/// sync and refreshed by the keepalive.
///
/// `patterns` maps a line number to one row index per reel column — the
/// grid cells that participate in that payline. `multipliers` holds three
/// rows (5-, 4-, 3-of-a-kind) indexed by symbol id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paytable {
    #[serde(default, rename = "winningPatterns")]
    pub patterns: BTreeMap<u8, Vec<u8>>,
    #[serde(default)]
    pub multipliers: Vec<Vec<u32>>,
}

impl Paytable {
    /// Multiplier for `count` matched symbols of `symbol`, when known.
    pub fn multiplier(&self, symbol: u8, count: u8) -> Option<u32> {
        let row = match count {
            5 => 0,
            4 => 1,
            3 => 2,
            _ => return None,
        };
        self.multipliers.get(row)?.get(symbol as usize).copied()
    }
}

/// One winning payline from a settled bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetail {
    pub line: u8,
    /// Row index per reel column identifying the matched cells.
    pub pattern: Vec<u8>,
    pub symbol: u8,
    pub count: u8,
    pub multiplier: u32,
}

/// Settled outcome of a single bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetResult {
    /// Balance before settlement.
    pub balance: f64,
    /// Balance after settlement; the session adopts this value verbatim.
    pub final_balance: f64,
    pub win_amount: f64,
    /// Settled board: rows × reels of symbol ids.
    pub final_symbols: Vec<Vec<u8>>,
    #[serde(default)]
    pub match_details: Vec<MatchDetail>,
}

/// Identity and room artifacts accumulated across the handshake.
///
/// Created empty, populated incrementally by acks, discarded when the
/// socket closes. A reconnect re-runs the whole handshake.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub session_id: String,
    pub player_id: String,
    pub game_id: String,
    pub room_id: i64,
    pub balance: f64,
    pub currency: String,
    pub wallet_type: String,
    pub bet_limits: Option<BetLimits>,
    pub paytable: Paytable,
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
