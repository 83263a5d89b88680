//! Ability spec registry: canonical facade for castable content.
//!
//! Provides an in-memory index keyed by ability name so callers don't embed
//! file-name heuristics. Ships a small built-in set; `data/abilities.toml`
//! entries extend or replace it.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// One state change an ability produces when cast.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectSpec {
    /// Adjust a named property's current value on the resolved target.
    AdjustProperty { property: String, amount: f64 },
    /// Opaque content hook; the engine emits a custom action with this name.
    Custom { name: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AbilitySpec {
    pub name: String,
    /// Tags stamped onto every action the cast produces.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Effects resolve against the cast target, or the caster when absent.
    #[serde(default = "default_self_target")]
    pub self_target: bool,
    pub effects: Vec<EffectSpec>,
}

fn default_self_target() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct AbilityFile {
    #[serde(default)]
    ability: Vec<AbilitySpec>,
}

/// Built-in content the engine and its tests rely on.
#[must_use]
pub fn builtin() -> Vec<AbilitySpec> {
    vec![AbilitySpec {
        name: "Heal".into(),
        tags: vec!["heal".into()],
        self_target: true,
        effects: vec![EffectSpec::AdjustProperty {
            property: "HP".into(),
            amount: 5.0,
        }],
    }]
}

fn data_root() -> PathBuf {
    let here = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let ws = here.join("../../data");
    if ws.is_dir() { ws } else { here.join("data") }
}

/// Built-ins plus `data/abilities.toml` when present; a file entry with a
/// built-in's name replaces it.
pub fn load_default() -> Result<Vec<AbilitySpec>> {
    let mut specs = builtin();
    let path = data_root().join("abilities.toml");
    if path.is_file() {
        let txt = std::fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))?;
        let file: AbilityFile = toml::from_str(&txt).context("parse abilities TOML")?;
        for spec in file.ability {
            if let Some(slot) = specs.iter_mut().find(|s| s.name == spec.name) {
                *slot = spec;
            } else {
                specs.push(spec);
            }
        }
    }
    Ok(specs)
}
