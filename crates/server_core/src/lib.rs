//! `server_core`: the authoritative simulation core.
//!
//! Owns the canonical game state and mediates every mutation through a
//! uniform action pipeline (sense -> modify -> permit -> apply -> react) so
//! composable behaviors can observe, veto, or react to every state change.
//! Single-threaded cooperative: one tick drains the action queue to fixed
//! point, then broadcasts.

pub mod ability;
pub mod actions;
pub mod catalog;
pub mod component;
pub mod entity;
pub mod game;
pub mod nested;
pub mod player;
pub mod property;
pub mod queue;
pub mod scope;
pub mod visibility;
pub mod world;

pub use actions::{Action, ActionKind, BroadcastType, Permission};
pub use game::Game;

use thiserror::Error;

/// New process-unique identifier (UUID v4 as text).
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Container tier a component may live on or subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Entity,
    World,
    Player,
    Team,
    Game,
}

/// Listener roles a component can take in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sensor,
    Modifier,
    Reacter,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Sensor, Role::Modifier, Role::Reacter];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Role::Sensor => 0,
            Role::Modifier => 1,
            Role::Reacter => 2,
        }
    }
}

/// Address of a component container in the game registries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerId {
    pub kind: ScopeKind,
    pub id: String,
}

impl ContainerId {
    #[must_use]
    pub fn entity(id: &str) -> Self {
        Self { kind: ScopeKind::Entity, id: id.to_string() }
    }
    #[must_use]
    pub fn world(id: &str) -> Self {
        Self { kind: ScopeKind::World, id: id.to_string() }
    }
    #[must_use]
    pub fn player(id: &str) -> Self {
        Self { kind: ScopeKind::Player, id: id.to_string() }
    }
    #[must_use]
    pub fn team(id: &str) -> Self {
        Self { kind: ScopeKind::Team, id: id.to_string() }
    }
    #[must_use]
    pub fn game(id: &str) -> Self {
        Self { kind: ScopeKind::Game, id: id.to_string() }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    #[error("unknown world: {0}")]
    UnknownWorld(String),
    #[error("unknown player: {0}")]
    UnknownPlayer(String),
    #[error("unknown team: {0}")]
    UnknownTeam(String),
    #[error("unknown container: {0}")]
    UnknownContainer(String),
    #[error("unknown component: {0}")]
    UnknownComponent(String),
    #[error("duplicate component: {0}")]
    DuplicateComponent(String),
    #[error("rollup cycle involving node {0}")]
    RollupCycle(String),
    #[error(transparent)]
    Grid(#[from] grid_core::GridError),
}
