//! The game root: registries for worlds/entities/players/teams, the action
//! queue and tick loop, subscription wiring, and broadcast fan-out.
//!
//! There is no process-wide instance; the game is threaded explicitly
//! through action execution.

use glam::IVec2;
use grid_core::{ChunkExt, key_of_chunk};
use net_core::message::ServerMsg;
use net_core::snapshot::{
    ComponentSnapshot, EntitySnapshot, GameSnapshot, PlayerSnapshot, PropertySnapshot,
    TeamSnapshot, WorldSnapshot,
};
use net_core::wire::{WireAction, WirePermission};

use data_runtime::abilities::AbilitySpec;
use data_runtime::configs::engine::{EngineCfg, PerceptionGrouping};

use crate::ability::{self, CastArgs};
use crate::actions::{Action, ActionKind, BroadcastType, VisibilityChanges, VisibilityKind};
use crate::catalog::{ComponentCatalog, Subscription, valid_targets};
use crate::component::Component;
use crate::entity::Entity;
use crate::nested::NestedForest;
use crate::player::{Player, Team};
use crate::queue::ActionQueue;
use crate::world::World;
use crate::{ContainerId, EngineError, Role, ScopeKind};

/// Safety cap on actions drained per tick; a queue that keeps refilling
/// itself past this is a content bug, not a reason to hang the server.
const MAX_ACTIONS_PER_TICK: usize = 10_000;

pub struct Game {
    pub id: String,
    pub cfg: EngineCfg,
    pub worlds: Vec<World>,
    pub entities: Vec<Entity>,
    pub players: Vec<Player>,
    pub teams: Vec<Team>,
    pub catalog: ComponentCatalog,
    /// Sensed-entity rollup: sensor -> entity -> player -> team.
    pub senses: NestedForest,
    /// Team-membership rollup: player nodes feed owning-entity nodes.
    pub memberships: NestedForest,
    pub abilities: Vec<AbilitySpec>,
    pub queue: ActionQueue,
    pub tick: u64,
}

impl Game {
    #[must_use]
    pub fn new(cfg: EngineCfg) -> Self {
        let id = crate::new_id();
        log::info!("game {id} created");
        Self {
            catalog: ComponentCatalog::new(ContainerId::game(&id)),
            id,
            cfg,
            worlds: Vec::new(),
            entities: Vec::new(),
            players: Vec::new(),
            teams: Vec::new(),
            senses: NestedForest::default(),
            memberships: NestedForest::default(),
            abilities: data_runtime::abilities::builtin(),
            queue: ActionQueue::default(),
            tick: 0,
        }
    }

    // ---- registries -----------------------------------------------------

    #[must_use]
    pub fn world(&self, id: &str) -> Option<&World> {
        self.worlds.iter().find(|w| w.id == id)
    }

    pub fn world_mut(&mut self, id: &str) -> Option<&mut World> {
        self.worlds.iter_mut().find(|w| w.id == id)
    }

    #[must_use]
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn entity_mut(&mut self, id: &str) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    #[must_use]
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    #[must_use]
    pub fn player_by_client(&self, client_id: &str) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.client_id.as_deref() == Some(client_id))
    }

    #[must_use]
    pub fn team(&self, id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    pub fn team_mut(&mut self, id: &str) -> Option<&mut Team> {
        self.teams.iter_mut().find(|t| t.id == id)
    }

    pub fn create_world(&mut self, name: &str) -> String {
        let w = World::new(name);
        let id = w.id.clone();
        self.worlds.push(w);
        id
    }

    pub fn spawn_entity(&mut self, name: &str) -> String {
        let e = Entity::new(name);
        let id = e.id.clone();
        self.entities.push(e);
        self.senses.ensure_node(&id, ScopeKind::Entity);
        self.memberships.ensure_node(&id, ScopeKind::Entity);
        id
    }

    pub fn create_player(&mut self, name: &str) -> String {
        let p = Player::new(name);
        let id = p.id.clone();
        self.players.push(p);
        self.senses.ensure_node(&id, ScopeKind::Player);
        self.memberships.ensure_node(&id, ScopeKind::Player);
        id
    }

    pub fn create_team(&mut self, name: &str) -> String {
        let t = Team::new(name);
        let id = t.id.clone();
        self.teams.push(t);
        self.senses.ensure_node(&id, ScopeKind::Team);
        id
    }

    // ---- containers & catalogs ------------------------------------------

    #[must_use]
    pub fn catalog(&self, c: &ContainerId) -> Option<&ComponentCatalog> {
        match c.kind {
            ScopeKind::Game => (c.id == self.id).then_some(&self.catalog),
            ScopeKind::Entity => self.entity(&c.id).map(|e| &e.catalog),
            ScopeKind::World => self.world(&c.id).map(|w| &w.catalog),
            ScopeKind::Player => self.player(&c.id).map(|p| &p.catalog),
            ScopeKind::Team => self.team(&c.id).map(|t| &t.catalog),
        }
    }

    pub fn catalog_mut(&mut self, c: &ContainerId) -> Option<&mut ComponentCatalog> {
        match c.kind {
            ScopeKind::Game => (c.id == self.id).then_some(&mut self.catalog),
            ScopeKind::Entity => self.entity_mut(&c.id).map(|e| &mut e.catalog),
            ScopeKind::World => self.world_mut(&c.id).map(|w| &mut w.catalog),
            ScopeKind::Player => self.player_mut(&c.id).map(|p| &mut p.catalog),
            ScopeKind::Team => self.team_mut(&c.id).map(|t| &mut t.catalog),
        }
    }

    /// Worlds, players, teams, and the game are published by nature; only
    /// entities toggle.
    #[must_use]
    pub fn container_published(&self, c: &ContainerId) -> bool {
        match c.kind {
            ScopeKind::Entity => self.entity(&c.id).is_some_and(|e| e.published),
            _ => self.catalog(c).is_some(),
        }
    }

    /// The container one tier out from `from`, per the outward rule.
    #[must_use]
    pub fn container_by_scope(&self, from: &ContainerId, scope: ScopeKind) -> Option<ContainerId> {
        match scope {
            ScopeKind::Game => Some(ContainerId::game(&self.id)),
            ScopeKind::World => match from.kind {
                ScopeKind::Entity => self
                    .entity(&from.id)
                    .and_then(|e| e.world.as_ref())
                    .map(|w| ContainerId::world(w)),
                _ => None,
            },
            ScopeKind::Player => match from.kind {
                ScopeKind::Entity => self
                    .entity(&from.id)
                    .and_then(|e| e.owners.first())
                    .map(|p| ContainerId::player(p)),
                _ => None,
            },
            ScopeKind::Team => match from.kind {
                ScopeKind::Entity => self
                    .entity(&from.id)
                    .and_then(|e| e.owners.first())
                    .and_then(|o| self.player(o))
                    .and_then(|p| p.team.as_ref())
                    .map(|t| ContainerId::team(t)),
                ScopeKind::Player => self
                    .player(&from.id)
                    .and_then(|p| p.team.as_ref())
                    .map(|t| ContainerId::team(t)),
                _ => None,
            },
            ScopeKind::Entity => None,
        }
    }

    #[must_use]
    pub fn find_component(&self, id: &str) -> Option<(&Component, ContainerId)> {
        if let Some(c) = self.catalog.component(id) {
            return Some((c, self.catalog.parent.clone()));
        }
        for w in &self.worlds {
            if let Some(c) = w.catalog.component(id) {
                return Some((c, w.catalog.parent.clone()));
            }
        }
        for e in &self.entities {
            if let Some(c) = e.catalog.component(id) {
                return Some((c, e.catalog.parent.clone()));
            }
        }
        for p in &self.players {
            if let Some(c) = p.catalog.component(id) {
                return Some((c, p.catalog.parent.clone()));
            }
        }
        for t in &self.teams {
            if let Some(c) = t.catalog.component(id) {
                return Some((c, t.catalog.parent.clone()));
            }
        }
        None
    }

    /// Take ownership of a component and wire its subscriptions. Sensors on
    /// entities additionally hook their rollup node under the entity's.
    pub fn add_component(&mut self, parent: ContainerId, mut c: Component) -> Result<(), EngineError> {
        let Some(cat) = self.catalog(&parent) else {
            return Err(EngineError::UnknownContainer(parent.id));
        };
        if cat.component(&c.id).is_some() {
            return Err(EngineError::DuplicateComponent(c.id));
        }
        c.parent = parent.clone();
        let id = c.id.clone();
        let is_sensor = c.behavior.is_sensor();
        self.catalog_mut(&parent)
            .expect("checked above")
            .all
            .push(c);
        if is_sensor && parent.kind == ScopeKind::Entity {
            self.senses.ensure_node(&id, ScopeKind::Entity);
            self.senses.add_parent(&id, &parent.id)?;
        }
        self.wire_component_subscriptions(&parent, &id);
        Ok(())
    }

    /// Detach a component: subscriptions in both directions, the rollup
    /// node, then the component itself.
    pub fn remove_component(&mut self, parent: &ContainerId, comp: &str) -> Result<(), EngineError> {
        let Some(cat) = self.catalog(parent) else {
            return Err(EngineError::UnknownContainer(parent.id.clone()));
        };
        if cat.component(comp).is_none() {
            return Err(EngineError::UnknownComponent(comp.to_string()));
        }
        let outgoing: Vec<Subscription> = cat
            .subscriptions
            .iter()
            .filter(|s| s.component == comp)
            .cloned()
            .collect();
        for s in outgoing {
            if let Some(remote) = self.catalog_mut(&s.to) {
                remote.remove_subscriber(&s.component, s.role);
            }
        }
        let changes = self.senses.drop_node(comp);
        self.deliver_visibility(&VisibilityChanges {
            kind: VisibilityKind::Remove,
            changes,
        });
        let cat = self.catalog_mut(parent).expect("checked above");
        cat.subscriptions.retain(|s| s.component != comp);
        for role in Role::ALL {
            cat.remove_subscriber(comp, role);
        }
        cat.all.retain(|c| c.id != comp);
        Ok(())
    }

    /// Symmetric teardown of a whole catalog (game-root unload/detach).
    pub fn clear_catalog(&mut self, container: &ContainerId) -> Result<(), EngineError> {
        let ids: Vec<String> = self
            .catalog(container)
            .map(|c| c.all.iter().map(|c| c.id.clone()).collect())
            .ok_or_else(|| EngineError::UnknownContainer(container.id.clone()))?;
        for id in ids {
            self.remove_component(container, &id)?;
        }
        Ok(())
    }

    fn wire_component_subscriptions(&mut self, parent: &ContainerId, comp: &str) {
        let Some((c, _)) = self.find_component(comp) else {
            return;
        };
        let scopes = c.scopes;
        let behavior = c.behavior.clone();
        let published = self.container_published(parent);
        for role in Role::ALL {
            if !behavior.has_role(role) {
                continue;
            }
            let remote = scopes
                .role_scope(role)
                .filter(|t| valid_targets(parent.kind).contains(t))
                .filter(|_| published)
                .and_then(|t| self.container_by_scope(parent, t).map(|rc| (t, rc)))
                .filter(|(_, rc)| self.catalog(rc).is_some());
            match remote {
                Some((scope, rc)) => {
                    self.catalog_mut(&rc)
                        .expect("filtered above")
                        .add_subscriber(comp, parent.clone(), role);
                    self.catalog_mut(parent)
                        .expect("parent exists")
                        .subscriptions
                        .push(Subscription {
                            component: comp.to_string(),
                            to: rc,
                            role,
                            scope,
                        });
                }
                // Invalid target scope or unpublished parent: local fallback
                // so local-only listeners still fire.
                None => {
                    if let Some(cat) = self.catalog_mut(parent) {
                        cat.add_subscriber(comp, parent.clone(), role);
                    }
                }
            }
        }
    }

    /// Tear down and rewire every outgoing subscription of a container;
    /// used when its published state flips.
    pub fn rebuild_subscriptions(&mut self, container: &ContainerId) {
        let Some(cat) = self.catalog(container) else {
            return;
        };
        let outgoing = cat.subscriptions.clone();
        let own: Vec<String> = cat.all.iter().map(|c| c.id.clone()).collect();
        for s in outgoing {
            if let Some(remote) = self.catalog_mut(&s.to) {
                remote.remove_subscriber(&s.component, s.role);
            }
        }
        if let Some(cat) = self.catalog_mut(container) {
            cat.subscriptions.clear();
            for id in &own {
                for role in Role::ALL {
                    cat.remove_subscriber(id, role);
                }
            }
        }
        for id in own {
            self.wire_component_subscriptions(container, &id);
        }
    }

    // ---- spatial queries ------------------------------------------------

    #[must_use]
    pub fn view_radius_for(&self, entity: &str) -> i32 {
        if self.entity(entity).is_some_and(|e| e.active) {
            self.cfg.view_distance
        } else {
            self.cfg.inactive_view_distance
        }
    }

    /// Published entities within a Chebyshev tile radius, in chunk
    /// row-major then index order.
    #[must_use]
    pub fn entities_within(&self, world: &str, center: IVec2, radius: i32) -> Vec<String> {
        let Some(w) = self.world(world) else {
            return Vec::new();
        };
        let lo = (center - IVec2::splat(radius)).to_chunk_space();
        let hi = (center + IVec2::splat(radius)).to_chunk_space();
        let mut out = Vec::new();
        for cy in lo.y..=hi.y {
            for cx in lo.x..=hi.x {
                let key = key_of_chunk(IVec2::new(cx, cy));
                for id in w.entities_in_chunk(&key) {
                    if out.iter().any(|o| o == id) {
                        continue;
                    }
                    if self
                        .entity(id)
                        .is_some_and(|e| e.position.chebyshev(center) <= radius)
                    {
                        out.push(id.clone());
                    }
                }
            }
        }
        out
    }

    #[must_use]
    pub fn published_entities_in(&self, world: &str) -> Vec<(String, IVec2)> {
        self.entities
            .iter()
            .filter(|e| e.published && e.world.as_deref() == Some(world))
            .map(|e| (e.id.clone(), e.position))
            .collect()
    }

    // ---- entity lifecycle -----------------------------------------------

    pub fn publish_entity(
        &mut self,
        id: &str,
        world: &str,
        position: IVec2,
    ) -> Result<bool, EngineError> {
        let Some(e) = self.entity(id) else {
            return Err(EngineError::UnknownEntity(id.to_string()));
        };
        if e.published {
            return Ok(false);
        }
        if self.world(world).is_none() {
            return Err(EngineError::UnknownWorld(world.to_string()));
        }
        let radius = self.view_radius_for(id);
        let owners = e.owners.clone();
        {
            let e = self.entity_mut(id).expect("checked above");
            e.world = Some(world.to_string());
            e.position = position;
            e.published = true;
        }
        let bounds;
        {
            let w = self.world_mut(world).expect("checked above");
            w.publish(id, position);
            bounds = w.bounds();
        }
        for o in owners {
            if let Some(p) = self.player_mut(&o) {
                p.scope_mut(world)
                    .add_viewer(id, position.to_chunk_space(), None, radius, bounds);
            }
        }
        self.rebuild_subscriptions(&ContainerId::entity(id));
        Ok(true)
    }

    pub fn unpublish_entity(&mut self, id: &str) -> Result<bool, EngineError> {
        let Some(e) = self.entity(id) else {
            return Err(EngineError::UnknownEntity(id.to_string()));
        };
        if !e.published {
            return Ok(false);
        }
        let world = e.world.clone().unwrap_or_default();
        let position = e.position;
        let owners = e.owners.clone();
        let radius = self.view_radius_for(id);
        let chunk = position.to_chunk_space();
        let bounds = self.world(&world).and_then(World::bounds);
        if let Some(w) = self.world_mut(&world) {
            w.unpublish(id, position);
            w.remove_view(id, chunk, None, radius);
        }
        for o in owners {
            if let Some(p) = self.player_mut(&o) {
                p.scope_mut(&world)
                    .remove_viewer(id, chunk, None, radius, bounds);
            }
        }
        // A hidden watcher senses nothing: empty this entity's sensor maps
        // so the rollups (and the per-player visibility that hangs off
        // them) drop everything it had perceived.
        let sensors: Vec<String> = self
            .catalog(&ContainerId::entity(id))
            .map(|cat| {
                cat.all
                    .iter()
                    .filter(|c| c.behavior.is_sensor())
                    .map(|c| c.id.clone())
                    .collect()
            })
            .unwrap_or_default();
        let mut lost = crate::nested::NestedChanges::default();
        for comp in sensors {
            for sensed in self.senses.ids_at(&comp) {
                lost.merge(self.senses.remove(&comp, &sensed));
            }
        }
        if !lost.is_empty() {
            self.deliver_visibility(&VisibilityChanges {
                kind: VisibilityKind::Remove,
                changes: lost,
            });
        }
        {
            let e = self.entity_mut(id).expect("checked above");
            e.published = false;
            e.world = None;
        }
        self.rebuild_subscriptions(&ContainerId::entity(id));
        Ok(true)
    }

    pub fn change_world(
        &mut self,
        id: &str,
        world: &str,
        position: IVec2,
    ) -> Result<bool, EngineError> {
        let Some(e) = self.entity(id) else {
            return Err(EngineError::UnknownEntity(id.to_string()));
        };
        if !e.published {
            return Ok(false);
        }
        if self.world(world).is_none() {
            return Err(EngineError::UnknownWorld(world.to_string()));
        }
        let old_world = e.world.clone().unwrap_or_default();
        if old_world == world {
            return self.move_entity(id, position);
        }
        let old_pos = e.position;
        let owners = e.owners.clone();
        let radius = self.view_radius_for(id);
        let old_chunk = old_pos.to_chunk_space();
        let new_chunk = position.to_chunk_space();
        let old_bounds = self.world(&old_world).and_then(World::bounds);
        if let Some(w) = self.world_mut(&old_world) {
            w.unpublish(id, old_pos);
            w.remove_view(id, old_chunk, None, radius);
        }
        let new_bounds;
        {
            let w = self.world_mut(world).expect("checked above");
            w.publish(id, position);
            w.add_view(id, new_chunk, None, radius);
            new_bounds = w.bounds();
        }
        {
            let e = self.entity_mut(id).expect("checked above");
            e.world = Some(world.to_string());
            e.position = position;
        }
        for o in owners {
            if let Some(p) = self.player_mut(&o) {
                p.scope_mut(&old_world)
                    .remove_viewer(id, old_chunk, None, radius, old_bounds);
                p.scope_mut(world)
                    .add_viewer(id, new_chunk, None, radius, new_bounds);
            }
        }
        self.rebuild_subscriptions(&ContainerId::entity(id));
        Ok(true)
    }

    pub fn move_entity(&mut self, id: &str, to: IVec2) -> Result<bool, EngineError> {
        let Some(e) = self.entity(id) else {
            return Err(EngineError::UnknownEntity(id.to_string()));
        };
        let from = e.position;
        if from == to {
            return Ok(false);
        }
        let world = e.world.clone();
        let owners = e.owners.clone();
        let radius = self.view_radius_for(id);
        self.entity_mut(id).expect("checked above").position = to;
        let Some(world) = world else {
            return Ok(true);
        };
        if from.different_chunk(to) {
            let fc = from.to_chunk_space();
            let tc = to.to_chunk_space();
            let bounds;
            {
                let w = self.world_mut(&world).expect("entity world exists");
                w.reindex(id, from, to);
                w.add_view(id, tc, Some(fc), radius);
                bounds = w.bounds();
            }
            for o in owners {
                if let Some(p) = self.player_mut(&o) {
                    p.scope_mut(&world)
                        .add_viewer(id, tc, Some(fc), radius, bounds);
                }
            }
        }
        Ok(true)
    }

    /// Give `player` ownership of `entity`; the entity's sense rollup node
    /// becomes a child of the player's, and the returned changes carry any
    /// ids that became newly visible at player/team level.
    pub fn own_entity(
        &mut self,
        player: &str,
        entity: &str,
    ) -> Result<(bool, crate::nested::NestedChanges), EngineError> {
        if self.entity(entity).is_none() {
            return Err(EngineError::UnknownEntity(entity.to_string()));
        }
        let Some(p) = self.player(player) else {
            return Err(EngineError::UnknownPlayer(player.to_string()));
        };
        if p.owns(entity) {
            return Ok((false, crate::nested::NestedChanges::default()));
        }
        self.player_mut(player)
            .expect("checked above")
            .entities
            .push(entity.to_string());
        self.entity_mut(entity)
            .expect("checked above")
            .owners
            .push(player.to_string());
        let changes = self.senses.add_parent(entity, player)?;
        self.memberships.add_parent(player, entity)?;
        // A published entity immediately grants its new owner a view.
        let e = self.entity(entity).expect("checked above");
        if e.published
            && let Some(world) = e.world.clone()
        {
            let chunk = e.position.to_chunk_space();
            let radius = self.view_radius_for(entity);
            let bounds = self.world(&world).and_then(World::bounds);
            if let Some(p) = self.player_mut(player) {
                p.scope_mut(&world)
                    .add_viewer(entity, chunk, None, radius, bounds);
            }
        }
        Ok((true, changes))
    }

    pub fn join_team(
        &mut self,
        player: &str,
        team: &str,
    ) -> Result<crate::nested::NestedChanges, EngineError> {
        if self.team(team).is_none() {
            return Err(EngineError::UnknownTeam(team.to_string()));
        }
        let Some(p) = self.player(player) else {
            return Err(EngineError::UnknownPlayer(player.to_string()));
        };
        if p.team.as_deref() == Some(team) {
            return Ok(crate::nested::NestedChanges::default());
        }
        if let Some(old) = p.team.clone() {
            self.senses.remove_parent(player, &old);
            self.memberships.remove(player, &old);
            if let Some(t) = self.team_mut(&old) {
                t.players.retain(|m| m != player);
            }
        }
        self.player_mut(player).expect("checked above").team = Some(team.to_string());
        self.team_mut(team)
            .expect("checked above")
            .players
            .push(player.to_string());
        let changes = self.senses.add_parent(player, team)?;
        self.memberships.add(player, team);
        Ok(changes)
    }

    /// Full teardown: unpublish, drop subscriptions both ways, remove from
    /// every rollup, release ownership, forget the entity.
    pub fn destroy_entity(&mut self, id: &str) -> Result<(), EngineError> {
        if self.entity(id).is_none() {
            return Err(EngineError::UnknownEntity(id.to_string()));
        }
        self.unpublish_entity(id)?;
        let container = ContainerId::entity(id);
        // Foreign components listening here lose their back-references.
        let incoming: Vec<(String, ContainerId, Role)> = {
            let cat = self.catalog(&container).expect("entity exists");
            Role::ALL
                .iter()
                .flat_map(|r| {
                    cat.subscribers(*r)
                        .iter()
                        .filter(|(_, home)| *home != container)
                        .map(|(c, home)| (c.clone(), home.clone(), *r))
                        .collect::<Vec<_>>()
                })
                .collect()
        };
        for (comp, home, role) in incoming {
            if let Some(cat) = self.catalog_mut(&home) {
                cat.subscriptions
                    .retain(|s| !(s.component == comp && s.to == container && s.role == role));
            }
        }
        self.clear_catalog(&container)?;
        let changes = self.senses.remove_id_everywhere(id);
        self.deliver_visibility(&VisibilityChanges {
            kind: VisibilityKind::Remove,
            changes,
        });
        self.senses.drop_node(id);
        self.memberships.drop_node(id);
        for p in &mut self.players {
            p.entities.retain(|e| e != id);
        }
        self.entities.retain(|e| e.id != id);
        Ok(())
    }

    // ---- casting & tick loop --------------------------------------------

    pub fn enqueue(&mut self, action: Action) {
        self.queue.push(action);
    }

    /// Expand an ability into queued actions. Errors are human-readable
    /// strings bound for the client.
    pub fn cast(&mut self, caster: &str, ability: &str, args: CastArgs) -> Result<String, String> {
        let Some(e) = self.entity(caster) else {
            return Err(format!("unknown entity: {caster}"));
        };
        if !e.knows_ability(ability) {
            return Err(format!("{} does not know {ability}", e.name));
        }
        let Some(spec) = self.abilities.iter().find(|s| s.name == ability).cloned() else {
            return Err(format!("unknown ability: {ability}"));
        };
        if let Some(t) = &args.target
            && self.entity(t).is_none()
        {
            return Err(format!("unknown target: {t}"));
        }
        let event = ability::expand(&spec, caster, &args);
        let id = event.id.clone();
        for a in event.actions {
            self.queue.push(a);
        }
        Ok(id)
    }

    /// One tick: drain the queue FIFO to fixed point (capped), broadcast.
    pub fn run_tick(&mut self) {
        let mut budget = MAX_ACTIONS_PER_TICK;
        while budget > 0 {
            let Some(mut action) = self.queue.pop() else {
                break;
            };
            action.execute(self, false);
            budget -= 1;
        }
        if budget == 0 {
            log::warn!(
                "tick {} action budget exhausted, {} still queued",
                self.tick,
                self.queue.len()
            );
        }
        self.broadcast_all();
        self.tick += 1;
    }

    // ---- broadcast ------------------------------------------------------

    fn deliver_visibility(&mut self, vis: &VisibilityChanges) {
        let grouping = self.cfg.perception_grouping;
        let scope = match grouping {
            PerceptionGrouping::Player => ScopeKind::Player,
            PerceptionGrouping::Team => ScopeKind::Team,
        };
        let mut deliveries: Vec<(String, String)> = Vec::new();
        for (node, ids) in vis.changes.at_scope(scope) {
            let players: Vec<String> = match grouping {
                PerceptionGrouping::Player => vec![node.to_string()],
                PerceptionGrouping::Team => self
                    .team(node)
                    .map(|t| t.players.clone())
                    .unwrap_or_default(),
            };
            for p in &players {
                for id in ids {
                    deliveries.push((p.clone(), id.clone()));
                }
            }
        }
        for (pid, eid) in deliveries {
            let wire = match vis.kind {
                VisibilityKind::Add => self.published_in_place_wire(&eid),
                VisibilityKind::Remove => Some(self.unpublish_wire(&eid)),
            };
            if let Some(w) = wire
                && let Some(p) = self.player_mut(&pid)
            {
                p.outgoing.push(w);
            }
        }
    }

    /// Hand an executed action to the broadcast layer: visibility deltas
    /// become per-player publish/unpublish entries, then the action fans
    /// out per its broadcast type.
    pub fn queue_for_broadcast(&mut self, action: &Action) {
        if let Some(vis) = &action.visibility_changes {
            self.deliver_visibility(vis);
        }
        let fan_out = if action.public {
            BroadcastType::Full
        } else {
            action.broadcast
        };
        match fan_out {
            BroadcastType::None | BroadcastType::Direct => {}
            BroadcastType::Full => {
                let wire = self.wire_action(action);
                for p in &mut self.players {
                    p.outgoing.push(wire.clone());
                }
            }
            BroadcastType::HasSenseOfEntity => {
                let subjects: Vec<String> = action
                    .caster
                    .iter()
                    .chain(action.target.iter())
                    .cloned()
                    .collect();
                if subjects.is_empty() {
                    return;
                }
                let team_grouping = self.cfg.perception_grouping == PerceptionGrouping::Team;
                let recipients: Vec<String> = self
                    .players
                    .iter()
                    .filter(|p| {
                        subjects.iter().any(|s| {
                            p.owns(s)
                                || self.senses.contains(&p.id, s)
                                || (team_grouping
                                    && p.team
                                        .as_ref()
                                        .is_some_and(|t| self.senses.contains(t, s)))
                        })
                    })
                    .map(|p| p.id.clone())
                    .collect();
                let wire = self.wire_action(action);
                for r in recipients {
                    if let Some(p) = self.player_mut(&r) {
                        p.outgoing.push(wire.clone());
                    }
                }
            }
        }
    }

    /// Flush every player's pending entries into its transport, if any.
    pub fn broadcast_all(&mut self) {
        for p in &mut self.players {
            if p.tx.is_none() || p.outgoing.is_empty() {
                continue;
            }
            let pending: Vec<WireAction> = p.outgoing.drain(..).collect();
            let tx = p.tx.as_ref().expect("checked above");
            let mut alive = true;
            for w in pending {
                if !tx.send_msg(&ServerMsg::Action { action: w }) {
                    alive = false;
                    break;
                }
            }
            if !alive {
                log::warn!("player {} transport closed, dropping channel", p.id);
                p.tx = None;
            }
        }
    }

    // ---- wire boundary --------------------------------------------------

    #[must_use]
    pub fn wire_action(&self, action: &Action) -> WireAction {
        WireAction {
            action_type: action.kind.action_type().to_string(),
            tags: action.tags.clone(),
            breadcrumbs: action.breadcrumbs.clone(),
            permitted: action.permitted,
            caster: action.caster.clone(),
            target: action.target.clone(),
            using: action.using.clone(),
            applied: action.applied,
            deciding_permission: action.deciding_permission.as_ref().map(|p| WirePermission {
                permitted: p.permitted,
                by: p.by.as_ref().map(|c| c.id.clone()),
                using: p.using.clone(),
                message: p.message.clone(),
            }),
            message: (!action.message.is_empty()).then(|| action.message.clone()),
            data: action.kind.data_payload(),
        }
    }

    fn published_in_place_wire(&self, entity: &str) -> Option<WireAction> {
        let e = self.entity(entity)?;
        if !e.published {
            return None;
        }
        let world = e.world.clone()?;
        let mut w = WireAction::bare("publish_entity");
        w.target = Some(entity.to_string());
        w.applied = true;
        w.breadcrumbs.push("visibility".into());
        w.data = serde_json::json!({
            "world": world,
            "position": [e.position.x, e.position.y],
        });
        Some(w)
    }

    fn unpublish_wire(&self, entity: &str) -> WireAction {
        let mut w = WireAction::bare("unpublish_entity");
        w.target = Some(entity.to_string());
        w.applied = true;
        w.breadcrumbs.push("visibility".into());
        w
    }

    /// Rebuild a typed action from the wire, resolving every reference
    /// against the registries. Unknown references abort the message.
    pub fn resolve_action(&self, wire: &WireAction) -> anyhow::Result<Action> {
        use anyhow::bail;
        let kind = ActionKind::from_wire(&wire.action_type, &wire.data)?;
        if let Some(c) = &wire.caster
            && self.entity(c).is_none()
        {
            bail!("unknown caster: {c}");
        }
        if let Some(t) = &wire.target
            && self.entity(t).is_none()
        {
            bail!("unknown target: {t}");
        }
        if let Some(u) = &wire.using
            && self.entity(u).is_none()
            && self.find_component(u).is_none()
        {
            bail!("unknown using reference: {u}");
        }
        let mut action = Action::new(kind);
        action.caster = wire.caster.clone();
        action.target = wire.target.clone();
        action.using = wire.using.clone();
        action.tags = wire.tags.clone();
        action.breadcrumbs = wire.breadcrumbs.clone();
        action.permitted = wire.permitted;
        Ok(action)
    }

    /// Snapshot filtered to one viewer: worlds it has scopes on, entities
    /// it owns or senses, broadcast-flagged components only.
    pub fn serialize_for_scope(&self, viewer: &str) -> Result<GameSnapshot, EngineError> {
        let Some(p) = self.player(viewer) else {
            return Err(EngineError::UnknownPlayer(viewer.to_string()));
        };
        let world_ids: Vec<String> = p.scopes.iter().map(|s| s.world.clone()).collect();
        let mut entity_ids: Vec<String> = p.entities.clone();
        for id in self.senses.ids_at(&p.id) {
            if !entity_ids.iter().any(|e| *e == id) {
                entity_ids.push(id);
            }
        }
        let mut roster = vec![p.id.clone()];
        let mut teams = Vec::new();
        if let Some(tid) = &p.team
            && let Some(t) = self.team(tid)
        {
            for m in &t.players {
                if !roster.iter().any(|r| r == m) {
                    roster.push(m.clone());
                }
            }
            teams.push(TeamSnapshot {
                id: t.id.clone(),
                name: t.name.clone(),
                players: t.players.clone(),
            });
        }
        Ok(GameSnapshot {
            id: self.id.clone(),
            players: roster
                .iter()
                .filter_map(|id| self.player(id))
                .map(|p| PlayerSnapshot {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    entities: p.entities.clone(),
                    team: p.team.clone(),
                })
                .collect(),
            teams,
            worlds: self
                .worlds
                .iter()
                .filter(|w| world_ids.iter().any(|id| *id == w.id))
                .map(|w| WorldSnapshot {
                    id: w.id.clone(),
                    name: w.name.clone(),
                })
                .collect(),
            entities: entity_ids
                .iter()
                .filter_map(|id| self.entity(id))
                .map(|e| self.entity_snapshot(e))
                .collect(),
        })
    }

    fn entity_snapshot(&self, e: &Entity) -> EntitySnapshot {
        EntitySnapshot {
            id: e.id.clone(),
            name: e.name.clone(),
            tags: e.tags.clone(),
            published: e.published,
            active: e.active,
            world: e.world.clone(),
            position: [e.position.x, e.position.y],
            properties: e
                .properties
                .iter()
                .map(|p| PropertySnapshot {
                    name: p.name.clone(),
                    current: p.current,
                    min: p.min,
                    max: p.max,
                    effective: p.effective(),
                })
                .collect(),
            components: e
                .catalog
                .all
                .iter()
                .filter(|c| c.broadcast)
                .map(|c| ComponentSnapshot {
                    id: c.id.clone(),
                    name: c.name.clone(),
                })
                .collect(),
            slots: e.slots.clone(),
        }
    }
}
