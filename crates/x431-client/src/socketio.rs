//! Wire details of the vendor's socket.io (engine.io v3) session negotiation
//!
//! The vendor runs a non-standard reconnect handshake on top of engine.io:
//! fetch a sid over long-polling, post an `imReconnect` event on that sid,
//! then upgrade the same sid to a websocket.

use serde::Deserialize;
use url::Url;

use crate::error::{Result, X431Error};

/// Long-polling negotiation path, relative to the API base
pub const POLLING_PATH: &str = "socket.io/?EIO=3&transport=polling&t=ABC";
/// Websocket upgrade path, relative to the socket base
pub const WEBSOCKET_PATH: &str = "socket.io/?EIO=3&transport=websocket&sid=";
/// Body the vendor answers an accepted reconnect notice with
pub const NOTICE_OK: &str = "ok";

#[derive(Debug, Deserialize)]
struct Handshake {
    sid: Option<String>,
}

/// URL of the sid negotiation request
pub fn polling_url(api_base: &Url) -> Result<Url> {
    Ok(api_base.join(POLLING_PATH)?)
}

/// URL the reconnect notice is posted to
pub fn notice_url(api_base: &Url, sid: &str) -> Result<Url> {
    Ok(api_base.join(&format!("{}&sid={}", POLLING_PATH, sid))?)
}

/// URL of the websocket upgrade for `sid`
pub fn websocket_url(socket_base: &Url, sid: &str) -> Result<Url> {
    Ok(socket_base.join(&format!("{}{}", WEBSOCKET_PATH, sid))?)
}

/// Extract the sid from a polling handshake body
///
/// The body is an engine.io payload such as `96:0{"sid":"...",...}2:40`, so
/// decoding starts at the first `{` and stops after one JSON value.
pub fn parse_sid(body: &str) -> Result<String> {
    let start = body
        .find('{')
        .ok_or_else(|| X431Error::NoSid("response carries no JSON payload".to_string()))?;

    let handshake = serde_json::Deserializer::from_str(&body[start..])
        .into_iter::<Handshake>()
        .next()
        .ok_or_else(|| X431Error::NoSid("empty handshake payload".to_string()))?
        .map_err(|e| X431Error::NoSid(format!("malformed handshake payload: {}", e)))?;

    match handshake.sid {
        Some(sid) if !sid.is_empty() => Ok(sid),
        _ => Err(X431Error::NoSid("handshake payload has no sid".to_string())),
    }
}

/// Build the length-prefixed `imReconnect` frame
///
/// The vendor parses single-quoted pseudo-JSON, so the frame is assembled
/// literally and must not go through a JSON encoder.
pub fn reconnect_notice(user_id: &str, token: &str) -> String {
    let packet = format!(
        "42['imReconnect',{{'user_id':'{}','token':'{}'}}]",
        user_id, token
    );
    format!("{}:{}", packet.len(), packet)
}
