//! Engine configuration loaded from data/config/engine.toml with env overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Which container tier drives perception rollups and broadcast fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerceptionGrouping {
    Player,
    Team,
}

/// Resolved engine configuration. All distances are Chebyshev.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineCfg {
    /// View radius in chunks for active entities.
    pub view_distance: i32,
    /// View radius in chunks for inactive entities.
    pub inactive_view_distance: i32,
    /// Listener-collection radius in tiles around caster/target.
    pub listen_distance: i32,
    pub perception_grouping: PerceptionGrouping,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            view_distance: 6,
            inactive_view_distance: 1,
            listen_distance: 25,
            perception_grouping: PerceptionGrouping::Player,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawEngineCfg {
    view_distance: Option<i32>,
    inactive_view_distance: Option<i32>,
    listen_distance: Option<i32>,
    perception_grouping: Option<PerceptionGrouping>,
}

fn data_root() -> PathBuf {
    let here = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let ws = here.join("../../data");
    if ws.is_dir() { ws } else { here.join("data") }
}

fn apply(raw: RawEngineCfg) -> EngineCfg {
    let d = EngineCfg::default();
    EngineCfg {
        view_distance: raw.view_distance.unwrap_or(d.view_distance).max(0),
        inactive_view_distance: raw
            .inactive_view_distance
            .unwrap_or(d.inactive_view_distance)
            .max(0),
        listen_distance: raw.listen_distance.unwrap_or(d.listen_distance).max(0),
        perception_grouping: raw.perception_grouping.unwrap_or(d.perception_grouping),
    }
}

/// Load `data/config/engine.toml` if present, then apply env overrides
/// (`GRIDSPIRE_VIEW_DISTANCE`, `GRIDSPIRE_INACTIVE_VIEW_DISTANCE`,
/// `GRIDSPIRE_LISTEN_DISTANCE`, `GRIDSPIRE_PERCEPTION_GROUPING`).
pub fn load_default() -> Result<EngineCfg> {
    let path = data_root().join("config/engine.toml");
    let mut raw = if path.is_file() {
        let txt = std::fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))?;
        toml::from_str::<RawEngineCfg>(&txt).context("parse engine TOML")?
    } else {
        RawEngineCfg::default()
    };
    if let Some(v) = std::env::var("GRIDSPIRE_VIEW_DISTANCE")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        raw.view_distance = Some(v);
    }
    if let Some(v) = std::env::var("GRIDSPIRE_INACTIVE_VIEW_DISTANCE")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        raw.inactive_view_distance = Some(v);
    }
    if let Some(v) = std::env::var("GRIDSPIRE_LISTEN_DISTANCE")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        raw.listen_distance = Some(v);
    }
    if let Ok(g) = std::env::var("GRIDSPIRE_PERCEPTION_GROUPING") {
        raw.perception_grouping = match g.to_ascii_lowercase().as_str() {
            "team" => Some(PerceptionGrouping::Team),
            "player" => Some(PerceptionGrouping::Player),
            _ => raw.perception_grouping,
        };
    }
    Ok(apply(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_contract() {
        let cfg = EngineCfg::default();
        assert_eq!(cfg.view_distance, 6);
        assert_eq!(cfg.inactive_view_distance, 1);
        assert_eq!(cfg.listen_distance, 25);
        assert_eq!(cfg.perception_grouping, PerceptionGrouping::Player);
    }

    #[test]
    fn raw_toml_overrides_defaults() {
        let raw: RawEngineCfg =
            toml::from_str("view_distance = 2\nperception_grouping = \"team\"").expect("parse");
        let cfg = apply(raw);
        assert_eq!(cfg.view_distance, 2);
        assert_eq!(cfg.inactive_view_distance, 1);
        assert_eq!(cfg.perception_grouping, PerceptionGrouping::Team);
    }

    #[test]
    fn negative_distances_clamp_to_zero() {
        let raw: RawEngineCfg = toml::from_str("listen_distance = -4").expect("parse");
        assert_eq!(apply(raw).listen_distance, 0);
    }
}
