//! Serialized action schema.
//!
//! `tags`, `breadcrumbs`, `permitted`, and `action_type` are required on the
//! wire: a payload missing any of them fails to deserialize, which aborts
//! the enclosing message. Variant-specific fields travel in `data` and are
//! interpreted by the engine when it resolves references.

use serde::{Deserialize, Serialize};

/// A permission vote as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePermission {
    pub permitted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireAction {
    pub action_type: String,
    pub tags: Vec<String>,
    pub breadcrumbs: Vec<String>,
    pub permitted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,
    #[serde(default)]
    pub applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deciding_permission: Option<WirePermission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Variant-specific payload (positions, property names, amounts, ...).
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl WireAction {
    /// Minimal record for a synthetic or test action.
    #[must_use]
    pub fn bare(action_type: &str) -> Self {
        Self {
            action_type: action_type.to_string(),
            tags: Vec::new(),
            breadcrumbs: Vec::new(),
            permitted: true,
            caster: None,
            target: None,
            using: None,
            applied: false,
            deciding_permission: None,
            message: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        serde_json::from_str(s).map_err(|e| anyhow::anyhow!("decode action: {e}"))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("wire action serializes")
    }
}
