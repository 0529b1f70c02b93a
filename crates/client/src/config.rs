// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

/// Session client for the slot-game server.
#[derive(Debug, Clone, Parser)]
#[command(name = "spinlink", version, about)]
pub struct Config {
    /// Wallet endpoint that issues the short-lived sid ticket.
    #[arg(long, env = "SPINLINK_WALLET_URL")]
    pub wallet_url: String,

    /// Launch endpoint that exchanges a sid for a connection token.
    #[arg(long, env = "SPINLINK_LAUNCH_URL")]
    pub launch_url: String,

    /// WebSocket base URL of the game server.
    #[arg(long, env = "SPINLINK_WS_URL")]
    pub ws_url: String,

    /// Shared secret sent as the wallet authToken query parameter.
    #[arg(long, env = "SPINLINK_AUTH_TOKEN")]
    pub auth_token: String,

    /// Operator API secret sent in the launch request body.
    #[arg(long, env = "SPINLINK_API_SECRET")]
    pub api_secret: String,

    /// Operator identifier.
    #[arg(long, env = "SPINLINK_OPERATOR_ID", default_value = "op001")]
    pub operator_id: String,

    /// Game type identifier.
    #[arg(long, env = "SPINLINK_GAME_TYPE", default_value = "slot")]
    pub game_type_id: String,

    /// Player user id.
    #[arg(long, env = "SPINLINK_USER_ID")]
    pub user_id: String,

    /// Device uuid sent to the wallet (generated when omitted).
    #[arg(long, env = "SPINLINK_UUID")]
    pub uuid: Option<String>,

    /// Player currency code.
    #[arg(long, env = "SPINLINK_CURRENCY", default_value = "USD")]
    pub currency: String,

    /// Player language.
    #[arg(long, env = "SPINLINK_LANGUAGE", default_value = "en")]
    pub language: String,

    /// Player display name.
    #[arg(long, env = "SPINLINK_PLAYER_NAME", default_value = "player")]
    pub player_name: String,

    /// Bet amount used by the interactive `b` command.
    #[arg(long, env = "SPINLINK_BET", default_value = "10")]
    pub bet: f64,

    /// Payline count used by the interactive `b` command.
    #[arg(long, env = "SPINLINK_LINES", default_value = "20")]
    pub lines: u32,

    /// Log format (json or text).
    #[arg(long, env = "SPINLINK_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "SPINLINK_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    // -- Duration overrides (skip from CLI; set in Config::test()) --------
    #[clap(skip)]
    pub sync_interval_ms: Option<u64>,
    #[clap(skip)]
    pub http_timeout_ms: Option<u64>,
}

fn env_duration_ms(var: &str, default: u64) -> Duration {
    let ms = std::env::var(var).ok().and_then(|v| v.parse().ok()).unwrap_or(default);
    Duration::from_millis(ms)
}

macro_rules! duration_field {
    ($method:ident, $field:ident, $env:literal, $default:expr) => {
        pub fn $method(&self) -> Duration {
            match self.$field {
                Some(ms) => Duration::from_millis(ms),
                None => env_duration_ms($env, $default),
            }
        }
    };
}

impl Config {
    // Keepalive cadence for syncRoomInfo once a room is joined, and the
    // timeout for the wallet/launch HTTP calls.
    duration_field!(sync_interval, sync_interval_ms, "SPINLINK_SYNC_INTERVAL_MS", 20_000);
    duration_field!(http_timeout, http_timeout_ms, "SPINLINK_HTTP_TIMEOUT_MS", 10_000);

    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [("--wallet-url", &self.wallet_url), ("--launch-url", &self.launch_url)]
        {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                anyhow::bail!("{name} must be an http(s) URL: {value}");
            }
        }
        if !self.ws_url.starts_with("ws://") && !self.ws_url.starts_with("wss://") {
            anyhow::bail!("--ws-url must be a ws(s) URL: {}", self.ws_url);
        }
        if self.user_id.is_empty() {
            anyhow::bail!("--user-id must not be empty");
        }
        if self.bet <= 0.0 {
            anyhow::bail!("--bet must be positive");
        }
        if self.lines == 0 || self.lines > 20 {
            anyhow::bail!("--lines must be between 1 and 20");
        }
        Ok(())
    }

    /// The device uuid for this run, generating one when not configured.
    pub fn device_uuid(&self) -> String {
        self.uuid.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    /// Construct a config for tests, pointed at the given endpoints.
    pub fn test(wallet_url: &str, launch_url: &str, ws_url: &str) -> Self {
        Self {
            wallet_url: wallet_url.to_owned(),
            launch_url: launch_url.to_owned(),
            ws_url: ws_url.to_owned(),
            auth_token: "test-secret".to_owned(),
            api_secret: "test-api-secret".to_owned(),
            operator_id: "op001".to_owned(),
            game_type_id: "slot".to_owned(),
            user_id: "demo_has_balance".to_owned(),
            uuid: Some("test_uuid".to_owned()),
            currency: "USD".to_owned(),
            language: "en".to_owned(),
            player_name: "testUser".to_owned(),
            bet: 10.0,
            lines: 20,
            log_format: "text".to_owned(),
            log_level: "info".to_owned(),
            sync_interval_ms: None,
            http_timeout_ms: None,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
