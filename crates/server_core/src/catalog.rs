//! Per-container component storage and the subscription graph.
//!
//! `all` owns this container's components. `subscribers` holds, per role,
//! the external components listening here; `subscriptions` are our
//! components listening elsewhere, stored as id keys and resolved against
//! the game registry at dispatch time. For every subscription on catalog A
//! pointing at container B there is a matching subscriber entry on B; the
//! two sides are updated together or not at all.

use crate::component::Component;
use crate::{ContainerId, Role, ScopeKind};

/// Back-reference for one of our components listening on a remote container.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub component: String,
    pub to: ContainerId,
    pub role: Role,
    pub scope: ScopeKind,
}

#[derive(Debug)]
pub struct ComponentCatalog {
    pub parent: ContainerId,
    pub all: Vec<Component>,
    /// Per role: (component id, component's home container).
    subscribers: [Vec<(String, ContainerId)>; 3],
    pub subscriptions: Vec<Subscription>,
}

/// Target scopes a parent may subscribe out to (outward only).
#[must_use]
pub fn valid_targets(parent: ScopeKind) -> &'static [ScopeKind] {
    match parent {
        ScopeKind::Entity => &[
            ScopeKind::World,
            ScopeKind::Player,
            ScopeKind::Team,
            ScopeKind::Game,
        ],
        ScopeKind::World => &[ScopeKind::Game],
        ScopeKind::Player => &[ScopeKind::Team, ScopeKind::Game],
        ScopeKind::Team => &[ScopeKind::Game],
        ScopeKind::Game => &[],
    }
}

impl ComponentCatalog {
    #[must_use]
    pub fn new(parent: ContainerId) -> Self {
        Self {
            parent,
            all: Vec::new(),
            subscribers: [Vec::new(), Vec::new(), Vec::new()],
            subscriptions: Vec::new(),
        }
    }

    #[must_use]
    pub fn parent_scope(&self) -> ScopeKind {
        self.parent.kind
    }

    #[must_use]
    pub fn component(&self, id: &str) -> Option<&Component> {
        self.all.iter().find(|c| c.id == id)
    }

    pub fn component_mut(&mut self, id: &str) -> Option<&mut Component> {
        self.all.iter_mut().find(|c| c.id == id)
    }

    #[must_use]
    pub fn subscribers(&self, role: Role) -> &[(String, ContainerId)] {
        &self.subscribers[role.index()]
    }

    /// Register an external component as a listener here. Idempotent.
    pub fn add_subscriber(&mut self, component: &str, home: ContainerId, role: Role) {
        let slot = &mut self.subscribers[role.index()];
        if !slot.iter().any(|(c, _)| c == component) {
            slot.push((component.to_string(), home));
        }
    }

    pub fn remove_subscriber(&mut self, component: &str, role: Role) {
        self.subscribers[role.index()].retain(|(c, _)| c != component);
    }

    pub fn subscriptions_at(&self, scope: ScopeKind) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.iter().filter(move |s| s.scope == scope)
    }

    #[must_use]
    pub fn subscription(&self, component: &str, role: Role) -> Option<&Subscription> {
        self.subscriptions
            .iter()
            .find(|s| s.component == component && s.role == role)
    }
}
