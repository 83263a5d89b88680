//! Players and teams: the viewer containers broadcasts fan out to.

use net_core::wire::WireAction;

use crate::catalog::ComponentCatalog;
use crate::scope::Scope;
use crate::ContainerId;

pub struct Player {
    pub id: String,
    pub name: String,
    /// Transport identity, set once the client connects.
    pub client_id: Option<String>,
    pub entities: Vec<String>,
    /// One visibility scope per world the player has entities in.
    pub scopes: Vec<Scope>,
    pub team: Option<String>,
    pub catalog: ComponentCatalog,
    /// Broadcast entries pending flush to the transport.
    pub outgoing: Vec<WireAction>,
    pub tx: Option<net_core::channel::Tx>,
}

impl Player {
    #[must_use]
    pub fn new(name: &str) -> Self {
        let id = crate::new_id();
        Self {
            catalog: ComponentCatalog::new(ContainerId::player(&id)),
            id,
            name: name.to_string(),
            client_id: None,
            entities: Vec::new(),
            scopes: Vec::new(),
            team: None,
            outgoing: Vec::new(),
            tx: None,
        }
    }

    #[must_use]
    pub fn scope(&self, world: &str) -> Option<&Scope> {
        self.scopes.iter().find(|s| s.world == world)
    }

    pub fn scope_mut(&mut self, world: &str) -> &mut Scope {
        if self.scope(world).is_none() {
            self.scopes.push(Scope::new(world));
        }
        self.scopes
            .iter_mut()
            .find(|s| s.world == world)
            .expect("just ensured")
    }

    #[must_use]
    pub fn owns(&self, entity: &str) -> bool {
        self.entities.iter().any(|e| e == entity)
    }
}

#[derive(Debug)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub players: Vec<String>,
    pub catalog: ComponentCatalog,
}

impl Team {
    #[must_use]
    pub fn new(name: &str) -> Self {
        let id = crate::new_id();
        Self {
            catalog: ComponentCatalog::new(ContainerId::team(&id)),
            id,
            name: name.to_string(),
            players: Vec::new(),
        }
    }
}
