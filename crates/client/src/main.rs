// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use spinlink::client::SessionClient;
use spinlink::config::Config;
use spinlink::dispatch::GameEvent;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);

    match run(config).await {
        Ok(()) => {}
        Err(e) => {
            error!("fatal: {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).init();
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let bet = config.bet;
    let lines = config.lines;
    let (client, mut events) = SessionClient::connect(config).await?;

    // Blocking stdin reader thread; the io loop must never block on stdin.
    let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(16);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if stdin_tx.blocking_send(line.trim().to_owned()).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    info!("commands: b=bet r=records s=sync t=transfer q=quit");

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let closed = matches!(event, GameEvent::Closed { .. });
                print_event(&event);
                if closed {
                    break;
                }
            }
            line = stdin_rx.recv() => {
                let Some(line) = line else { break };
                match line.as_str() {
                    "b" => {
                        if let Err(e) = client.place_bet(bet, lines) {
                            warn!("bet rejected: {e}");
                        }
                    }
                    "r" => {
                        if let Err(e) = client.get_records() {
                            warn!("records request rejected: {e}");
                        }
                    }
                    "s" => {
                        if let Err(e) = client.sync_room_info() {
                            warn!("sync request rejected: {e}");
                        }
                    }
                    "t" => {
                        if let Err(e) = client.transfer() {
                            warn!("transfer request rejected: {e}");
                        }
                    }
                    "q" => client.disconnect(),
                    "" => {}
                    other => info!("unknown command: {other} (b=bet r=records s=sync t=transfer q=quit)"),
                }
            }
        }
    }

    Ok(())
}

fn print_event(event: &GameEvent) {
    match event {
        GameEvent::Login { session_id, player_id } => {
            info!(%session_id, %player_id, "logged in");
        }
        GameEvent::Lobby { game_id, balance, currency } => {
            info!(%game_id, balance, %currency, "entered lobby");
        }
        GameEvent::RoomJoined { room_id, balance, limits, currency } => {
            info!(
                room_id,
                balance,
                min_bet = limits.min_bet,
                max_bet = limits.max_bet,
                default_bet = limits.default_bet,
                %currency,
                "joined room"
            );
        }
        GameEvent::RoomSync { paytable } => {
            info!(paylines = paytable.patterns.len(), "paytable refreshed");
        }
        GameEvent::Records { records } => {
            info!(%records, "bet records");
        }
        GameEvent::BetSettled { result } => {
            info!(
                win = result.win_amount,
                balance = result.final_balance,
                matched_lines = result.match_details.len(),
                "bet settled"
            );
        }
        GameEvent::RoomStatus { room_index, occupied, reserve_expires_at, .. } => {
            match reserve_expires_at {
                Some(at) => info!(room_index, occupied, expires = %at, "room status"),
                None => info!(room_index, occupied, "room status"),
            }
        }
        GameEvent::ServerError { code } => {
            warn!(code, "server error");
        }
        GameEvent::Closed { reason } => {
            info!(%reason, "session closed");
        }
    }
}
