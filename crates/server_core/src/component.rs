//! Pluggable behaviors attached to containers.
//!
//! A component is one value: identity + per-role target scopes + an enum
//! behavior. Capability flags fall out of the behavior variant, so a
//! component is a sensor/modifier/reacter exactly when its behavior handles
//! that phase.

use crate::{ContainerId, Role, ScopeKind};

/// Declared listening scope per role. `None` means the component does not
/// take that role at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeSpec {
    pub sensor: Option<ScopeKind>,
    pub modifier: Option<ScopeKind>,
    pub reacter: Option<ScopeKind>,
}

impl ScopeSpec {
    #[must_use]
    pub fn role_scope(&self, role: Role) -> Option<ScopeKind> {
        match role {
            Role::Sensor => self.sensor,
            Role::Modifier => self.modifier,
            Role::Reacter => self.reacter,
        }
    }
}

/// Built-in behaviors. Content beyond the visibility/test set plugs in as
/// `Script` payloads interpreted by the embedding application.
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    /// Sensor + reacter: perceives entities within view range and emits
    /// sense/lose follow-ups when movement changes what it can see.
    Sight,
    /// Modifier: denies actions carrying `against` that target the parent
    /// entity, at `priority`, with a human-readable reason.
    ProtectiveAura {
        priority: i32,
        message: String,
        against: String,
    },
    /// Reacter: counters a matching custom action aimed at the parent with
    /// the same custom action aimed back at the caster.
    Retort { tag: String },
    /// Inert data marker (tags, flavor); takes no pipeline role.
    Marker,
}

impl Behavior {
    #[must_use]
    pub fn is_sensor(&self) -> bool {
        matches!(self, Behavior::Sight)
    }

    #[must_use]
    pub fn is_modifier(&self) -> bool {
        matches!(self, Behavior::ProtectiveAura { .. })
    }

    #[must_use]
    pub fn is_reacter(&self) -> bool {
        matches!(self, Behavior::Sight | Behavior::Retort { .. })
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        match role {
            Role::Sensor => self.is_sensor(),
            Role::Modifier => self.is_modifier(),
            Role::Reacter => self.is_reacter(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub id: String,
    pub name: String,
    /// Owning container; set when the catalog takes the component.
    pub parent: ContainerId,
    pub scopes: ScopeSpec,
    /// Include in client-facing entity snapshots.
    pub broadcast: bool,
    pub behavior: Behavior,
}

impl Component {
    #[must_use]
    pub fn new(name: &str, behavior: Behavior, scopes: ScopeSpec) -> Self {
        Self {
            id: crate::new_id(),
            name: name.to_string(),
            parent: ContainerId::game(""),
            scopes,
            broadcast: false,
            behavior,
        }
    }

    #[must_use]
    pub fn broadcast(mut self) -> Self {
        self.broadcast = true;
        self
    }
}
