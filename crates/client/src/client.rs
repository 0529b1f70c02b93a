// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session client: owns the socket and the session lifecycle.
//!
//! `connect()` performs the two HTTP handshake calls, opens the socket,
//! sends `login`, and spawns a single io task. The task multiplexes
//! inbound frames, queued outbound commands, the keepalive interval, and
//! shutdown in one `tokio::select!` loop, so frames are processed strictly
//! in arrival order and session state is never mutated concurrently.
//!
//! There is no automatic reconnect: when the socket closes the session
//! emits `Closed`, the keepalive dies with the task, and every subsequent
//! send fails with `NotConnected`. A retry is a fresh `connect()`.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dispatch::{Dispatcher, GameEvent, Outcome};
use crate::error::{ClientError, Result};
use crate::launch;
use crate::protocol::Command;
use crate::session::{Phase, SessionState};

/// Capacity of the outbound command queue.
const COMMAND_QUEUE: usize = 32;

/// Capacity of the event channel to the collaborator.
const EVENT_QUEUE: usize = 64;

/// Handle to a live game session.
///
/// Cloning is intentionally not provided: one collaborator drives one
/// session. Dropping the handle closes the outbound queue, which ends the
/// io task.
pub struct SessionClient {
    dispatcher: Arc<Mutex<Dispatcher>>,
    commands: mpsc::Sender<Command>,
    shutdown: CancellationToken,
}

impl SessionClient {
    /// Run the HTTP handshake, open the socket, send `login`, and spawn
    /// the io task. Returns the handle plus the event stream.
    ///
    /// Handshake progress past this point (login, lobby, room join)
    /// arrives as events; a rejected login/lobby ends the session with a
    /// `ServerError` event followed by `Closed`.
    pub async fn connect(config: Config) -> Result<(Self, mpsc::Receiver<GameEvent>)> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .unwrap_or_default();

        let device_uuid = config.device_uuid();
        let sid = launch::acquire_ticket(&http, &config, &device_uuid).await?;
        let session = launch::exchange_launch_token(&http, &config, &sid).await?;
        let socket_url = launch::build_socket_url(&config.ws_url, &session)?;

        let (stream, _response) = tokio_tungstenite::connect_async(socket_url.as_str()).await?;
        info!(lang = %session.lang, "socket connected");

        let dispatcher = Arc::new(Mutex::new(Dispatcher::new()));
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
        let shutdown = CancellationToken::new();

        let task = IoTask {
            dispatcher: Arc::clone(&dispatcher),
            command_rx,
            event_tx,
            shutdown: shutdown.clone(),
            sync_interval: config.sync_interval(),
        };
        tokio::spawn(task.run(stream));

        Ok((Self { dispatcher, commands: command_tx, shutdown }, event_rx))
    }

    /// Place a bet on `line` paylines.
    ///
    /// Valid only while idle in a room; a second call before the previous
    /// bet settles fails with `BetInFlight` rather than queueing.
    pub fn place_bet(&self, bet: f64, line: u32) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(ClientError::NotConnected);
        }
        self.dispatcher.lock().begin_bet()?;
        if let Err(e) = self.enqueue(Command::SetBet { bet, line }) {
            self.dispatcher.lock().abort_bet();
            return Err(e);
        }
        Ok(())
    }

    /// Request an immediate room-info sync (paytable refresh).
    pub fn sync_room_info(&self) -> Result<()> {
        self.enqueue(Command::SyncRoomInfo)
    }

    /// Request the bet-history records page.
    pub fn get_records(&self) -> Result<()> {
        self.enqueue(Command::GetRecords)
    }

    /// Request a wallet transfer refresh.
    pub fn transfer(&self) -> Result<()> {
        self.enqueue(Command::Transfer)
    }

    pub fn is_connected(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    /// Current phase of the session state machine.
    pub fn phase(&self) -> Phase {
        self.dispatcher.lock().phase()
    }

    /// Derived capability for the presentation layer: may a bet be placed
    /// right now? The machine, not the UI, owns this answer.
    pub fn can_bet(&self) -> bool {
        self.is_connected() && self.phase() == Phase::InRoom
    }

    /// Snapshot of the accumulated session state.
    pub fn session(&self) -> SessionState {
        self.dispatcher.lock().session().clone()
    }

    /// End the session. Idempotent.
    pub fn disconnect(&self) {
        self.shutdown.cancel();
    }

    fn enqueue(&self, command: Command) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(ClientError::NotConnected);
        }
        // A closed queue means the io task is already gone.
        self.commands.try_send(command).map_err(|_| ClientError::ConnectionClosed)
    }
}

/// The per-connection io task.
struct IoTask {
    dispatcher: Arc<Mutex<Dispatcher>>,
    command_rx: mpsc::Receiver<Command>,
    event_tx: mpsc::Sender<GameEvent>,
    shutdown: CancellationToken,
    sync_interval: Duration,
}

impl IoTask {
    async fn run<S>(self, stream: tokio_tungstenite::WebSocketStream<S>)
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        let IoTask { dispatcher, mut command_rx, event_tx, shutdown, sync_interval } = self;
        let (mut ws_tx, mut ws_rx) = stream.split();

        dispatcher.lock().mark_connected();

        // The server expects `login` as the first frame after the socket
        // opens; the rest of the handshake is driven by dispatcher
        // followups.
        if send_command(&mut ws_tx, &Command::Login).await.is_err() {
            finish(&dispatcher, &shutdown, &event_tx, "login send failed").await;
            return;
        }

        // Armed once the room is joined. Re-arming replaces the previous
        // interval, so a repeated join ack never doubles the timer.
        let mut keepalive: Option<tokio::time::Interval> = None;

        let reason = loop {
            tokio::select! {
                _ = shutdown.cancelled() => break "disconnect requested".to_owned(),

                command = command_rx.recv() => {
                    let Some(command) = command else {
                        break "handle dropped".to_owned();
                    };
                    if let Err(e) = send_command(&mut ws_tx, &command).await {
                        break e;
                    }
                }

                _ = async {
                    match keepalive.as_mut() {
                        Some(interval) => {
                            interval.tick().await;
                        }
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    if let Err(e) = send_command(&mut ws_tx, &Command::SyncRoomInfo).await {
                        break e;
                    }
                }

                frame = ws_rx.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            let inbound = match crate::protocol::decode(&text) {
                                Ok(inbound) => inbound,
                                Err(e) => {
                                    // Malformed traffic is non-fatal; state
                                    // is untouched.
                                    warn!(err = %e, "dropping undecodable frame");
                                    continue;
                                }
                            };
                            let outcome = dispatcher.lock().handle(inbound);
                            if let Err(e) = apply_outcome(
                                outcome,
                                &mut ws_tx,
                                &event_tx,
                                &mut keepalive,
                                sync_interval,
                            )
                            .await
                            {
                                break e;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            break "connection closed".to_owned();
                        }
                        Some(Ok(_)) => {} // Ignore binary, ping, pong.
                        Some(Err(e)) => break format!("socket error: {e}"),
                    }
                }
            }
        };

        // Best-effort close frame.
        let _ = ws_tx.send(Message::Close(None)).await;
        finish(&dispatcher, &shutdown, &event_tx, &reason).await;
    }
}

/// Deliver the event, send the followups, and surface a fatal handshake
/// failure as the loop's exit reason.
async fn apply_outcome<S>(
    outcome: Outcome,
    ws_tx: &mut S,
    event_tx: &mpsc::Sender<GameEvent>,
    keepalive: &mut Option<tokio::time::Interval>,
    sync_interval: Duration,
) -> std::result::Result<(), String>
where
    S: SinkExt<Message> + Unpin,
{
    if matches!(outcome.event, Some(GameEvent::RoomJoined { .. })) {
        let mut interval = tokio::time::interval(sync_interval);
        interval.tick().await; // Consume the immediate first tick.
        *keepalive = Some(interval);
    }

    if let Some(event) = outcome.event {
        if event_tx.send(event).await.is_err() {
            return Err("event receiver dropped".to_owned());
        }
    }
    for command in outcome.send {
        send_command(ws_tx, &command).await?;
    }
    if let Some(fatal) = outcome.fatal {
        return Err(format!("handshake failed: {fatal}"));
    }
    Ok(())
}

/// Serialize and send one command as a text frame.
async fn send_command<S>(ws_tx: &mut S, command: &Command) -> std::result::Result<(), String>
where
    S: SinkExt<Message> + Unpin,
{
    debug!(command = command.kind(), "sending");
    ws_tx
        .send(Message::Text(command.encode().into()))
        .await
        .map_err(|_| format!("send failed: {}", command.kind()))
}

/// Teardown common to every exit path: the phase goes to `Disconnected`,
/// the token is cancelled (which makes the keepalive and all sends inert),
/// and the collaborator hears `Closed` last.
async fn finish(
    dispatcher: &Arc<Mutex<Dispatcher>>,
    shutdown: &CancellationToken,
    event_tx: &mpsc::Sender<GameEvent>,
    reason: &str,
) {
    dispatcher.lock().mark_closed();
    shutdown.cancel();
    let _ = event_tx.send(GameEvent::Closed { reason: reason.to_owned() }).await;
    info!(reason, "session ended");
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
