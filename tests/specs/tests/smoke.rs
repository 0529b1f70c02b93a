// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests: the real client against the in-process mock
//! game server, covering the full handshake, bet settlement, and the
//! keepalive lifecycle.

use std::time::Duration;

use spinlink::dispatch::GameEvent;
use spinlink::session::Phase;
use spinlink::test_support::MockGameServer;
use spinlink_specs::SessionFixture;

// -- Handshake ---------------------------------------------------------------

#[tokio::test]
async fn full_handshake_reaches_the_room() -> anyhow::Result<()> {
    let mut fx = SessionFixture::connect().await?;

    fx.wait_for("login", |e| matches!(e, GameEvent::Login { .. })).await?;
    fx.wait_for("lobby", |e| matches!(e, GameEvent::Lobby { .. })).await?;
    fx.wait_for_room().await?;
    fx.wait_for("paytable sync", |e| matches!(e, GameEvent::RoomSync { .. })).await?;

    let session = fx.client.session();
    assert_eq!(session.session_id, "sess-1");
    assert_eq!(session.player_id, "player-9");
    assert_eq!(session.game_id, "buffalo-classic");
    assert_eq!(session.room_id, 3101);
    assert_eq!(session.currency, "$");
    assert_eq!(session.wallet_type, "seamless");

    let limits = session.bet_limits.ok_or_else(|| anyhow::anyhow!("no bet limits"))?;
    assert!(limits.min_bet <= limits.default_bet);
    assert!(limits.default_bet <= limits.max_bet);

    assert!(!session.paytable.patterns.is_empty());
    assert_eq!(session.paytable.multipliers.len(), 3);

    // The join burst reached the server: transfer, records, and sync.
    assert_eq!(fx.server.count_type("200017"), 1);
    assert!(fx.server.count_op("GetRecords") >= 1);
    assert!(fx.server.count_op("SyncRoomInfo") >= 1);
    Ok(())
}

#[tokio::test]
async fn records_arrive_read_only() -> anyhow::Result<()> {
    let mut fx = SessionFixture::connect().await?;
    fx.wait_for_room().await?;
    let before = fx.client.session();

    let event = fx.wait_for("records", |e| matches!(e, GameEvent::Records { .. })).await?;
    match event {
        GameEvent::Records { records } => assert!(records.is_array()),
        other => anyhow::bail!("expected Records, got {other:?}"),
    }
    // Records never mutate the session.
    assert_eq!(fx.client.session().session_id, before.session_id);
    assert_eq!(fx.client.session().balance, before.balance);
    Ok(())
}

// -- Betting -----------------------------------------------------------------

#[tokio::test]
async fn bet_round_trip_settles_exactly() -> anyhow::Result<()> {
    let mut fx = SessionFixture::connect().await?;
    fx.wait_for_room().await?;

    fx.client.place_bet(10.0, 20)?;
    let event = fx.wait_for("settlement", |e| matches!(e, GameEvent::BetSettled { .. })).await?;

    match event {
        GameEvent::BetSettled { result } => {
            // Line 1 matched five of symbol 2 at 100x for a 10-unit bet.
            assert_eq!(result.win_amount, 1000.0);
            assert_eq!(result.final_balance, 5990.0);
            let detail = result.match_details.first().ok_or_else(|| anyhow::anyhow!("no match"))?;
            assert_eq!(detail.pattern, vec![1, 1, 1, 1, 1]);
            assert_eq!(detail.symbol, 2);
            assert_eq!(detail.count, 5);
            assert_eq!(detail.multiplier, 100);
            // Every matched cell holds the matched symbol.
            for (col, &row) in detail.pattern.iter().enumerate() {
                assert_eq!(result.final_symbols[row as usize][col], detail.symbol);
            }
        }
        other => anyhow::bail!("expected BetSettled, got {other:?}"),
    }

    // The session balance is the settled balance, decimal-exact.
    assert_eq!(fx.client.session().balance, 5990.0);
    assert_eq!(fx.client.phase(), Phase::InRoom);
    Ok(())
}

#[tokio::test]
async fn losing_spin_settles_with_no_matches() -> anyhow::Result<()> {
    let server = MockGameServer::start().await?;
    server.set_bet_result(serde_json::json!({
        "opCode": "SetBet",
        "balance": 4990.0,
        "finalBalance": 4990.0,
        "winAmount": 0.0,
        "finalSymbols": [[0,1,2,3,4], [1,2,3,4,5], [2,3,4,5,0]],
    }));
    let mut fx = SessionFixture::connect_fast_keepalive(server).await?;
    fx.wait_for_room().await?;

    fx.client.place_bet(10.0, 20)?;
    let event = fx.wait_for("settlement", |e| matches!(e, GameEvent::BetSettled { .. })).await?;
    match event {
        GameEvent::BetSettled { result } => {
            assert_eq!(result.win_amount, 0.0);
            assert!(result.match_details.is_empty());
        }
        other => anyhow::bail!("expected BetSettled, got {other:?}"),
    }
    assert_eq!(fx.client.session().balance, 4990.0);
    Ok(())
}

#[tokio::test]
async fn one_bet_outstanding_at_a_time() -> anyhow::Result<()> {
    let server = MockGameServer::start().await?;
    server.swallow_bets();
    let mut fx = SessionFixture::connect_fast_keepalive(server).await?;
    fx.wait_for_room().await?;

    fx.client.place_bet(10.0, 20)?;
    assert!(fx.client.place_bet(10.0, 20).is_err(), "second bet must fail fast");

    fx.server.push_frame(fx.server.settlement_frame());
    fx.wait_for("settlement", |e| matches!(e, GameEvent::BetSettled { .. })).await?;
    fx.client.place_bet(10.0, 20)?;
    Ok(())
}

// -- Keepalive ---------------------------------------------------------------

#[tokio::test]
async fn keepalive_syncs_while_in_room() -> anyhow::Result<()> {
    let server = MockGameServer::start().await?;
    let mut fx = SessionFixture::connect_fast_keepalive(server).await?;
    fx.wait_for_room().await?;

    let baseline = fx.server.count_op("SyncRoomInfo");
    tokio::time::sleep(Duration::from_millis(450)).await;
    let after = fx.server.count_op("SyncRoomInfo");
    assert!(
        after >= baseline + 2,
        "keepalive should have fired at 100ms cadence: {baseline} -> {after}"
    );
    Ok(())
}

#[tokio::test]
async fn duplicate_room_join_arms_one_timer() -> anyhow::Result<()> {
    let server = MockGameServer::start().await?;
    server.duplicate_join();
    let mut fx = SessionFixture::connect_fast_keepalive(server).await?;

    // Both join acks arrive and re-arm the keepalive.
    fx.wait_for_room().await?;
    fx.wait_for_room().await?;

    // Let the post-join bursts drain, then measure a window.
    tokio::time::sleep(Duration::from_millis(250)).await;
    let baseline = fx.server.count_op("SyncRoomInfo");
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    let delta = fx.server.count_op("SyncRoomInfo") - baseline;

    // One timer at 100ms produces ~10 syncs in the window; a doubled
    // timer would produce ~20.
    assert!((5..=15).contains(&delta), "expected a single keepalive timer, saw {delta} syncs");
    Ok(())
}

#[tokio::test]
async fn close_stops_keepalive_until_reconnect() -> anyhow::Result<()> {
    let server = MockGameServer::start().await?;
    let mut fx = SessionFixture::connect_fast_keepalive(server).await?;
    fx.wait_for_room().await?;

    fx.server.close_sockets();
    fx.wait_for_close().await?;
    assert!(!fx.client.is_connected());

    // The keepalive is inert after close: no new syncs arrive.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let baseline = fx.server.count_op("SyncRoomInfo");
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(fx.server.count_op("SyncRoomInfo"), baseline, "keepalive kept firing after close");

    // A fresh connect() runs the whole handshake again and resumes syncing.
    let mut fx2 = SessionFixture::connect_fast_keepalive(fx.server).await?;
    fx2.wait_for_room().await?;
    let baseline = fx2.server.count_op("SyncRoomInfo");
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert!(fx2.server.count_op("SyncRoomInfo") > baseline);
    Ok(())
}

// -- Failure paths -----------------------------------------------------------

#[tokio::test]
async fn rejected_login_ends_the_session() -> anyhow::Result<()> {
    let server = MockGameServer::start().await?;
    server.fail_login();
    let mut fx = SessionFixture::connect_fast_keepalive(server).await?;

    let event = fx.next_event().await?;
    assert!(
        matches!(event, GameEvent::ServerError { code: 100 }),
        "expected ServerError(100), got {event:?}"
    );
    let reason = fx.wait_for_close().await?;
    assert!(reason.contains("handshake failed"), "reason: {reason}");
    assert!(!fx.client.is_connected());
    Ok(())
}

#[tokio::test]
async fn server_push_room_status() -> anyhow::Result<()> {
    let mut fx = SessionFixture::connect().await?;
    fx.wait_for_room().await?;

    fx.server.push_frame(serde_json::json!({
        "errCode": 0,
        "vals": { "type": 200018, "data": {
            "gameType": 9,
            "roomIndex": 1,
            "isOccupied": true,
            "reserveExpiredTime": 638_712_864_000_000_000_i64,
        }},
    }));

    let event = fx.wait_for("room status", |e| matches!(e, GameEvent::RoomStatus { .. })).await?;
    match event {
        GameEvent::RoomStatus { occupied, reserve_expires_at, .. } => {
            assert!(occupied);
            let at = reserve_expires_at.ok_or_else(|| anyhow::anyhow!("no expiry"))?;
            // 638712864000000000 ticks = 2025-01-01T00:00:00Z.
            assert_eq!(at.timestamp(), 1_735_689_600);
        }
        other => anyhow::bail!("expected RoomStatus, got {other:?}"),
    }
    Ok(())
}
