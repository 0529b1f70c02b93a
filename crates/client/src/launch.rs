// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pre-connection HTTP handshake.
//!
//! Two sequential calls gate the socket: the wallet issues a short-lived
//! `sid` ticket, and the launch endpoint exchanges it for the connection
//! token embedded in a redirect URL. The socket URL carries the extracted
//! `token`/`lang` query parameters.

use serde::Deserialize;
use url::Url;

use crate::config::Config;
use crate::error::{ClientError, Result};

/// Credentials extracted from the launch redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSession {
    pub token: String,
    pub lang: String,
}

#[derive(Debug, Deserialize)]
struct SidResponse {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct LaunchResponse {
    vals: LaunchVals,
}

#[derive(Debug, Deserialize)]
struct LaunchVals {
    data: LaunchData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LaunchData {
    redirect_url: String,
}

/// POST the wallet endpoint for a `sid` ticket.
///
/// The shared secret rides in the `authToken` query parameter; the body
/// identifies the device and player.
pub async fn acquire_ticket(
    http: &reqwest::Client,
    config: &Config,
    device_uuid: &str,
) -> Result<String> {
    let url = format!("{}?authToken={}", config.wallet_url, config.auth_token);
    let body = serde_json::json!({ "uuid": device_uuid, "userId": config.user_id });
    let resp = http.post(&url).json(&body).send().await?;
    if !resp.status().is_success() {
        return Err(ClientError::Auth { status: resp.status() });
    }
    let parsed: SidResponse = resp.json().await?;
    Ok(parsed.sid)
}

/// POST the launch endpoint, exchanging the `sid` for a connection token.
///
/// The response buries a redirect URL under `vals.data`; its `token` and
/// `lang` query parameters are the actual credentials.
pub async fn exchange_launch_token(
    http: &reqwest::Client,
    config: &Config,
    sid: &str,
) -> Result<LaunchSession> {
    let body = serde_json::json!({
        "operatorId": config.operator_id,
        "gameTypeId": config.game_type_id,
        "player": {
            "userId": config.user_id,
            "currency": config.currency,
            "language": config.language,
            "sid": sid,
            "name": config.player_name,
        },
        "apiSecret": config.api_secret,
    });
    let resp = http.post(&config.launch_url).json(&body).send().await?;
    if !resp.status().is_success() {
        return Err(ClientError::Launch(format!(
            "launch endpoint returned {}",
            resp.status()
        )));
    }
    let parsed: LaunchResponse = resp
        .json::<LaunchResponse>()
        .await
        .map_err(|e| ClientError::Launch(format!("malformed launch response: {e}")))?;

    parse_redirect(&parsed.vals.data.redirect_url)
}

/// Extract `token` and `lang` from the redirect URL's query string.
fn parse_redirect(redirect_url: &str) -> Result<LaunchSession> {
    let redirect = Url::parse(redirect_url)
        .map_err(|e| ClientError::Launch(format!("bad redirect URL {redirect_url}: {e}")))?;

    let mut token = None;
    let mut lang = None;
    for (key, value) in redirect.query_pairs() {
        match key.as_ref() {
            "token" => token = Some(value.into_owned()),
            "lang" => lang = Some(value.into_owned()),
            _ => {}
        }
    }

    match (token, lang) {
        (Some(token), Some(lang)) => Ok(LaunchSession { token, lang }),
        _ => Err(ClientError::Launch(format!(
            "redirect URL missing token/lang: {redirect_url}"
        ))),
    }
}

/// Build the socket URL: `{wsBase}?token=...&lang=...`.
pub fn build_socket_url(ws_url: &str, session: &LaunchSession) -> Result<String> {
    let mut url = Url::parse(ws_url)?;
    url.query_pairs_mut()
        .append_pair("token", &session.token)
        .append_pair("lang", &session.lang);
    Ok(url.to_string())
}

#[cfg(test)]
#[path = "launch_tests.rs"]
mod tests;
