// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end session smoke tests.
//!
//! Runs the real client against the in-process mock game server and
//! provides event-stream helpers the individual specs share.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use spinlink::client::SessionClient;
use spinlink::config::Config;
use spinlink::dispatch::GameEvent;
use spinlink::test_support::MockGameServer;

/// How long any single expected event may take to arrive.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A mock server plus a connected client session.
pub struct SessionFixture {
    pub server: MockGameServer,
    pub client: SessionClient,
    pub events: mpsc::Receiver<GameEvent>,
}

impl SessionFixture {
    /// Start a mock server and connect with the default test config.
    pub async fn connect() -> anyhow::Result<Self> {
        let server = MockGameServer::start().await?;
        let config = server.config();
        Self::connect_with(server, config).await
    }

    /// Start a mock server and connect with a fast keepalive, for specs
    /// that count sync frames.
    pub async fn connect_fast_keepalive(server: MockGameServer) -> anyhow::Result<Self> {
        let mut config = server.config();
        config.sync_interval_ms = Some(100);
        Self::connect_with(server, config).await
    }

    async fn connect_with(server: MockGameServer, config: Config) -> anyhow::Result<Self> {
        let (client, events) = SessionClient::connect(config).await?;
        Ok(Self { server, client, events })
    }

    /// Receive the next event or fail after [`EVENT_TIMEOUT`].
    pub async fn next_event(&mut self) -> anyhow::Result<GameEvent> {
        next_event(&mut self.events).await
    }

    /// Skip events until one matches the predicate.
    pub async fn wait_for(
        &mut self,
        what: &str,
        matches: impl Fn(&GameEvent) -> bool,
    ) -> anyhow::Result<GameEvent> {
        loop {
            let event = self.next_event().await?;
            if matches(&event) {
                return Ok(event);
            }
            if matches!(event, GameEvent::Closed { .. }) {
                anyhow::bail!("session closed while waiting for {what}");
            }
        }
    }

    /// Wait until the room is joined.
    pub async fn wait_for_room(&mut self) -> anyhow::Result<()> {
        self.wait_for("room join", |e| matches!(e, GameEvent::RoomJoined { .. })).await?;
        Ok(())
    }

    /// Wait for the session to end.
    pub async fn wait_for_close(&mut self) -> anyhow::Result<String> {
        loop {
            if let GameEvent::Closed { reason } = self.next_event().await? {
                return Ok(reason);
            }
        }
    }
}

/// Receive the next event from a raw receiver or fail after the timeout.
pub async fn next_event(events: &mut mpsc::Receiver<GameEvent>) -> anyhow::Result<GameEvent> {
    match timeout(EVENT_TIMEOUT, events.recv()).await {
        Ok(Some(event)) => Ok(event),
        Ok(None) => anyhow::bail!("event channel closed"),
        Err(_) => anyhow::bail!("timed out waiting for an event"),
    }
}
