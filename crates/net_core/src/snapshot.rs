//! Scope-filtered snapshot schema for client bootstrap.
//!
//! The engine builds these per viewer: only worlds the viewer has a scope
//! on, only entities it senses or owns, and only components flagged for
//! broadcast. Field set here defines the round-trip law for client-side
//! reconstruction.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySnapshot {
    pub name: String,
    pub current: f64,
    pub min: f64,
    pub max: f64,
    /// Value after the modification chain.
    pub effective: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub published: bool,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world: Option<String>,
    pub position: [i32; 2],
    pub properties: Vec<PropertySnapshot>,
    /// Broadcast-flagged components only.
    pub components: Vec<ComponentSnapshot>,
    pub slots: Vec<(String, Option<String>)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: String,
    pub name: String,
    pub entities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSnapshot {
    pub id: String,
    pub name: String,
    pub players: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: String,
    pub players: Vec<PlayerSnapshot>,
    pub teams: Vec<TeamSnapshot>,
    pub worlds: Vec<WorldSnapshot>,
    pub entities: Vec<EntitySnapshot>,
}

impl GameSnapshot {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        serde_json::from_str(s).map_err(|e| anyhow::anyhow!("decode snapshot: {e}"))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("snapshot serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_roundtrip_is_structural_identity() {
        let snap = GameSnapshot {
            id: "g".into(),
            players: vec![PlayerSnapshot {
                id: "p".into(),
                name: "ash".into(),
                entities: vec!["e".into()],
                team: None,
            }],
            teams: vec![],
            worlds: vec![WorldSnapshot {
                id: "w".into(),
                name: "overworld".into(),
            }],
            entities: vec![EntitySnapshot {
                id: "e".into(),
                name: "paladin".into(),
                tags: vec!["humanoid".into()],
                published: true,
                active: true,
                world: Some("w".into()),
                position: [3, -2],
                properties: vec![PropertySnapshot {
                    name: "HP".into(),
                    current: 10.0,
                    min: 0.0,
                    max: 20.0,
                    effective: 10.0,
                }],
                components: vec![],
                slots: vec![("R. Hand".into(), None)],
            }],
        };
        let back = GameSnapshot::from_json(&snap.to_json()).expect("decode");
        assert_eq!(snap, back);
    }
}
