//! Client<->server JSON envelope.
//!
//! Every message is a JSON object with a `type` discriminant. Client-origin
//! messages are `CONNECTION` and `CAST`; the server answers with
//! `CONNECTION_RESPONSE` / `CAST_RESPONSE` and pushes one `ACTION` per
//! broadcast entry.

use serde::{Deserialize, Serialize};

use crate::wire::WireAction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "CONNECTION")]
    Connection {
        client_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        desired_name: Option<String>,
    },
    #[serde(rename = "CAST")]
    Cast {
        caster_type: String,
        client_id: String,
        caster_id: String,
        ability_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        using: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        granted_by: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<serde_json::Value>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "CONNECTION_RESPONSE")]
    ConnectionResponse {
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Empty `error` means the cast was accepted.
    #[serde(rename = "CAST_RESPONSE")]
    CastResponse { error: String },
    #[serde(rename = "ACTION")]
    Action { action: WireAction },
}

impl ClientMsg {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        serde_json::from_str(s).map_err(|e| anyhow::anyhow!("decode client message: {e}"))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("client message serializes")
    }
}

impl ServerMsg {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        serde_json::from_str(s).map_err(|e| anyhow::anyhow!("decode server message: {e}"))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("server message serializes")
    }
}
