// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol dispatcher: the session state machine.
//!
//! The io loop is a thin wire adapter — decode a frame, hand the variant to
//! [`Dispatcher::handle`], then deliver the resulting event and send the
//! resulting followup commands. All transition logic lives here, in
//! synchronous code, so the machine is testable without any I/O.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::protocol::{Command, Inbound};
use crate::session::{BetLimits, BetResult, Paytable, Phase, SessionState};
use crate::ticks::ticks_to_datetime;

/// Typed notification delivered to the collaborator (presentation layer,
/// CLI, test). One variant per event kind, each with its own payload shape.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Login {
        session_id: String,
        player_id: String,
    },
    Lobby {
        game_id: String,
        balance: f64,
        currency: String,
    },
    RoomJoined {
        room_id: i64,
        balance: f64,
        limits: BetLimits,
        currency: String,
    },
    RoomSync {
        paytable: Paytable,
    },
    Records {
        records: Value,
    },
    BetSettled {
        result: BetResult,
    },
    RoomStatus {
        game_type: i64,
        room_index: i64,
        occupied: bool,
        reserve_expires_at: Option<DateTime<Utc>>,
    },
    /// Upstream reported a non-zero error code.
    ServerError {
        code: i64,
    },
    /// The socket closed; the session is over.
    Closed {
        reason: String,
    },
}

/// What one inbound frame produced: at most one event for the collaborator,
/// zero or more followup commands to send, and — for a failed login/lobby —
/// the error that ends the connection attempt.
#[derive(Debug, Default)]
pub struct Outcome {
    pub event: Option<GameEvent>,
    pub send: Vec<Command>,
    pub fatal: Option<ClientError>,
}

impl Outcome {
    fn none() -> Self {
        Self::default()
    }

    fn event(event: GameEvent) -> Self {
        Self { event: Some(event), ..Self::default() }
    }

    fn with_send(mut self, send: Vec<Command>) -> Self {
        self.send = send;
        self
    }
}

/// The session state machine. One per connection; discarded on close.
#[derive(Debug, Default)]
pub struct Dispatcher {
    session: SessionState,
    phase: Phase,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The socket is open and `login` has been sent.
    pub fn mark_connected(&mut self) {
        self.phase = Phase::AwaitingLogin;
    }

    /// The socket is gone; nothing may be sent any more.
    pub fn mark_closed(&mut self) {
        self.phase = Phase::Disconnected;
    }

    /// Issuer-side gate for `SetBet`: valid only while idle in a room.
    /// Flips the phase to `BetInFlight` so a second bet fails fast until
    /// the settlement arrives.
    pub fn begin_bet(&mut self) -> Result<(), ClientError> {
        match self.phase {
            Phase::Disconnected => Err(ClientError::NotConnected),
            Phase::BetInFlight => Err(ClientError::BetInFlight),
            Phase::InRoom => {
                self.phase = Phase::BetInFlight;
                Ok(())
            }
            phase => Err(ClientError::NotInRoom { phase: phase.as_str() }),
        }
    }

    /// Undo `begin_bet` when the command could not be enqueued.
    pub fn abort_bet(&mut self) {
        if self.phase == Phase::BetInFlight {
            self.phase = Phase::InRoom;
        }
    }

    /// Apply one decoded inbound frame.
    ///
    /// Unknown codes and out-of-phase traffic are logged and dropped; the
    /// state never changes for them, nor for a top-level server error.
    pub fn handle(&mut self, inbound: Inbound) -> Outcome {
        match inbound {
            Inbound::ServerError { code } => {
                warn!(code, phase = %self.phase, "server reported an error");
                Outcome::event(GameEvent::ServerError { code })
            }
            Inbound::LoginAck(ack) => self.on_login(ack),
            Inbound::LobbyAck(ack) => self.on_lobby(ack),
            Inbound::RoomJoined(room) => self.on_room_joined(room),
            Inbound::Records(page) => {
                // Read-only: no session state is touched.
                Outcome::event(GameEvent::Records { records: page.records })
            }
            Inbound::RoomSync(paytable) => {
                self.session.paytable = paytable.clone();
                Outcome::event(GameEvent::RoomSync { paytable })
            }
            Inbound::BetSettled(result) => self.on_bet_settled(result),
            Inbound::RoomStatus(status) => Outcome::event(GameEvent::RoomStatus {
                game_type: status.game_type,
                room_index: status.room_index,
                occupied: status.is_occupied,
                reserve_expires_at: ticks_to_datetime(status.reserve_expired_time),
            }),
            Inbound::Unknown { kind, sub_type, op_code } => {
                debug!(kind, ?sub_type, ?op_code, "ignoring unknown message");
                Outcome::none()
            }
        }
    }

    fn on_login(&mut self, ack: crate::protocol::LoginAck) -> Outcome {
        if ack.err_code != 0 {
            warn!(code = ack.err_code, "login rejected");
            return Outcome {
                event: Some(GameEvent::ServerError { code: ack.err_code }),
                send: Vec::new(),
                fatal: Some(ClientError::Protocol { stage: "login", code: ack.err_code }),
            };
        }
        if self.phase != Phase::AwaitingLogin {
            warn!(phase = %self.phase, "ignoring login ack out of phase");
            return Outcome::none();
        }
        debug!(
            lobby_ip = %ack.lobby_server_ip,
            lobby_port = ack.lobby_server_port,
            "login acknowledged"
        );
        self.session.session_id = ack.session_id.clone();
        self.session.player_id = ack.player_id.clone();
        self.phase = Phase::AwaitingLobby;
        Outcome::event(GameEvent::Login {
            session_id: ack.session_id,
            player_id: ack.player_id,
        })
        .with_send(vec![Command::Lobby])
    }

    fn on_lobby(&mut self, ack: crate::protocol::LobbyAck) -> Outcome {
        if ack.err_code != 0 {
            warn!(code = ack.err_code, "lobby rejected");
            return Outcome {
                event: Some(GameEvent::ServerError { code: ack.err_code }),
                send: Vec::new(),
                fatal: Some(ClientError::Protocol { stage: "lobby", code: ack.err_code }),
            };
        }
        if self.phase != Phase::AwaitingLobby {
            warn!(phase = %self.phase, "ignoring lobby ack out of phase");
            return Outcome::none();
        }
        self.session.game_id = ack.game_id.clone();
        self.session.balance = ack.balance;
        self.session.currency = ack.currency.clone();
        self.session.wallet_type = ack.wallet_type;
        self.phase = Phase::AwaitingRoom;
        Outcome::event(GameEvent::Lobby {
            game_id: ack.game_id,
            balance: ack.balance,
            currency: ack.currency,
        })
        .with_send(vec![Command::JoinRoom])
    }

    fn on_room_joined(&mut self, room: crate::protocol::RoomJoined) -> Outcome {
        // A repeated join ack (room refresh) is applied in place; anything
        // else out of phase is dropped.
        if !matches!(self.phase, Phase::AwaitingRoom | Phase::InRoom) {
            warn!(phase = %self.phase, "ignoring room join out of phase");
            return Outcome::none();
        }
        let limits = room.bet_info.first().map(|entry| entry.limits.clone()).unwrap_or_default();
        let currency = room
            .currency_info
            .first()
            .map(|entry| entry.currency.clone())
            .unwrap_or_else(|| self.session.currency.clone());

        self.session.room_id = room.room_id;
        self.session.balance = room.balance;
        self.session.bet_limits = Some(limits.clone());
        self.session.currency = currency.clone();
        self.phase = Phase::InRoom;

        Outcome::event(GameEvent::RoomJoined {
            room_id: room.room_id,
            balance: room.balance,
            limits,
            currency,
        })
        .with_send(vec![Command::Transfer, Command::GetRecords, Command::SyncRoomInfo])
    }

    fn on_bet_settled(&mut self, result: BetResult) -> Outcome {
        if self.phase != Phase::BetInFlight {
            warn!(phase = %self.phase, "ignoring bet result with no bet in flight");
            return Outcome::none();
        }
        self.session.balance = result.final_balance;
        self.phase = Phase::InRoom;
        Outcome::event(GameEvent::BetSettled { result })
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
