//! The action pipeline: every state mutation flows through one uniform
//! sequence so components can observe, modify, veto, or react to it.
//!
//! `execute` order: initialize -> (unpublished fast path) -> collect
//! listeners -> sense -> modify -> permission decision -> apply ->
//! message -> broadcast queue -> teardown -> react. Reactions and counters
//! recurse eagerly with a depth cap; followups go to the back of the game
//! queue as fresh chains.

pub mod dispatch;
pub mod kinds;

pub use kinds::ActionKind;

use std::collections::{BTreeMap, HashSet};

use glam::IVec2;

use crate::game::Game;
use crate::nested::NestedChanges;
use crate::ContainerId;

/// Reaction chains beyond this depth are dropped silently.
pub const MAX_NESTED: u32 = 10;

/// A vote on whether an action should apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Permission {
    pub permitted: bool,
    pub by: Option<ContainerId>,
    pub using: Option<String>,
    pub message: Option<String>,
}

impl Permission {
    #[must_use]
    pub fn allow() -> Self {
        Self {
            permitted: true,
            by: None,
            using: None,
            message: None,
        }
    }

    #[must_use]
    pub fn denial(by: ContainerId, using: Option<String>, message: &str) -> Self {
        Self {
            permitted: false,
            by: Some(by),
            using,
            message: Some(message.to_string()),
        }
    }
}

/// Fan-out strategy once an action reaches the broadcast queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastType {
    None,
    /// Already delivered to a specific player; no further fan-out.
    Direct,
    Full,
    HasSenseOfEntity,
}

/// What a container perceived of an action during the sense phase.
#[derive(Debug, Clone, PartialEq)]
pub enum SenseResult {
    Seen(bool),
    Info(SensoryInformation),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensoryInformation {
    pub source: String,
    pub detail: String,
}

/// Publish/unpublish side effects carried by sense rollup changes.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityChanges {
    pub kind: VisibilityKind,
    pub changes: NestedChanges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityKind {
    Add,
    Remove,
}

pub type Feasibility = fn(&Game, &Action) -> bool;

#[derive(Debug)]
pub struct Action {
    pub kind: ActionKind,
    pub caster: Option<String>,
    pub target: Option<String>,
    /// Entity or component lending itself to the action.
    pub using: Option<String>,
    pub tags: Vec<String>,
    pub breadcrumbs: Vec<String>,
    pub public: bool,
    pub absolute: bool,
    pub permissions: BTreeMap<i32, Permission>,
    pub permitted: bool,
    pub deciding_permission: Option<Permission>,
    pub nested: u32,
    pub movement_action: bool,
    pub anticipators: Vec<String>,
    /// Per-listener sense results, caster last.
    pub sensors: Vec<(String, SenseResult)>,
    pub visibility_changes: Option<VisibilityChanges>,
    pub listeners: Vec<ContainerId>,
    pub listener_ids: HashSet<String>,
    pub additional_listen_points: Vec<(String, IVec2)>,
    pub additional_listeners: Vec<ContainerId>,
    pub feasibility: Option<Feasibility>,
    pub broadcast: BroadcastType,
    pub applied: bool,
    pub message: String,
}

impl Action {
    #[must_use]
    pub fn new(kind: ActionKind) -> Self {
        let movement_action = kind.is_movement();
        let mut permissions = BTreeMap::new();
        permissions.insert(0, Permission::allow());
        Self {
            kind,
            caster: None,
            target: None,
            using: None,
            tags: Vec::new(),
            breadcrumbs: Vec::new(),
            public: false,
            absolute: false,
            permissions,
            permitted: true,
            deciding_permission: None,
            nested: 0,
            movement_action,
            anticipators: Vec::new(),
            sensors: Vec::new(),
            visibility_changes: None,
            listeners: Vec::new(),
            listener_ids: HashSet::new(),
            additional_listen_points: Vec::new(),
            additional_listeners: Vec::new(),
            feasibility: None,
            broadcast: BroadcastType::HasSenseOfEntity,
            applied: false,
            message: String::new(),
        }
    }

    /// Record an allow vote. At equal priority an earlier denial sticks.
    pub fn permit(&mut self, priority: i32, permission: Permission) {
        debug_assert!(permission.permitted);
        match self.permissions.get(&priority) {
            Some(existing) if !existing.permitted => {}
            _ => {
                self.permissions.insert(priority, permission);
            }
        }
    }

    /// Record a denial. At equal priority a denial replaces an allow.
    pub fn deny(&mut self, priority: i32, permission: Permission) {
        debug_assert!(!permission.permitted);
        self.permissions.insert(priority, permission);
    }

    /// The highest-priority vote wins.
    pub fn decide_permission(&mut self) {
        if let Some((_, p)) = self.permissions.iter().next_back() {
            self.permitted = p.permitted;
            self.deciding_permission = Some(p.clone());
        }
    }

    fn push_listener(&mut self, c: ContainerId) {
        if self.listener_ids.insert(c.id.clone()) {
            self.listeners.push(c);
        }
    }

    /// Deterministic listener order: caster side, game, target side,
    /// additional listen points, additional listeners; deduplicated by id.
    pub fn collect_listeners(&mut self, game: &Game) {
        let listen = game.cfg.listen_distance;
        let exclude = |id: &String, this: &Action| {
            this.caster.as_ref() == Some(id) || this.target.as_ref() == Some(id)
        };
        if let Some(cid) = self.caster.clone() {
            self.push_listener(ContainerId::entity(&cid));
            if let Some(e) = game.entity(&cid)
                && let Some(wid) = e.world.clone()
            {
                let nearby = game.entities_within(&wid, e.position, listen);
                for n in nearby {
                    if !exclude(&n, self) {
                        self.push_listener(ContainerId::entity(&n));
                    }
                }
                self.push_listener(ContainerId::world(&wid));
            }
        }
        self.push_listener(ContainerId::game(&game.id));
        if let Some(tid) = self.target.clone()
            && self.target != self.caster
        {
            if let Some(e) = game.entity(&tid)
                && let Some(wid) = e.world.clone()
            {
                self.push_listener(ContainerId::world(&wid));
                let nearby = game.entities_within(&wid, e.position, listen);
                for n in nearby {
                    if !exclude(&n, self) {
                        self.push_listener(ContainerId::entity(&n));
                    }
                }
            }
            self.push_listener(ContainerId::entity(&tid));
        }
        for (wid, point) in self.additional_listen_points.clone() {
            self.push_listener(ContainerId::world(&wid));
            let nearby = game.entities_within(&wid, point, listen);
            for n in nearby {
                if !exclude(&n, self) {
                    self.push_listener(ContainerId::entity(&n));
                }
            }
        }
        for extra in self.additional_listeners.clone() {
            self.push_listener(extra);
        }
    }

    /// Run the full pipeline. Returns whether `apply` changed state.
    pub fn execute(&mut self, game: &mut Game, force: bool) -> bool {
        // Absolute actions apply regardless of the permission outcome.
        let force = force || self.absolute;
        kinds::initialize(self, game);

        // Unpublished targets get a private pipeline: their components must
        // be able to refuse before the entity is visible to anyone else.
        if let Some(target) = self.target.clone()
            && !matches!(self.kind, ActionKind::PublishEntity { .. })
            && game.entity(&target).is_some_and(|e| !e.published)
        {
            let tc = ContainerId::entity(&target);
            dispatch::modify_container(game, &tc, self);
            self.decide_permission();
            if self.permitted || force {
                self.applied = self.run_apply(game);
            }
            kinds::generate_message(self, game);
            dispatch::react_container(game, &tc, self);
            return self.applied;
        }

        self.collect_listeners(game);

        let listeners = self.listeners.clone();
        for l in &listeners {
            let result = dispatch::sense_container(game, l, self);
            self.sensors.push((l.id.clone(), result));
        }
        if let Some(cid) = self.caster.clone() {
            self.sensors.retain(|(id, _)| *id != cid);
            self.sensors.push((cid, SenseResult::Seen(true)));
        }

        for l in &listeners {
            dispatch::modify_container(game, l, self);
        }
        self.decide_permission();

        let feasible = self.feasibility.is_none_or(|f| f(game, self));
        if (self.permitted && feasible) || force {
            self.applied = self.run_apply(game);
        }

        kinds::generate_message(self, game);
        game.queue_for_broadcast(self);
        kinds::teardown(self, game);

        for l in &listeners {
            dispatch::react_container(game, l, self);
        }
        self.applied
    }

    fn run_apply(&mut self, game: &mut Game) -> bool {
        match kinds::apply(self, game) {
            Ok(changed) => changed,
            Err(e) => {
                log::warn!("action {} apply failed: {e}", self.kind.action_type());
                false
            }
        }
    }

    /// Execute a reaction one level deeper; dropped past the depth cap.
    pub fn spawn_reaction(&self, game: &mut Game, mut follow: Action) -> bool {
        follow.nested = self.nested + 1;
        if follow.nested >= MAX_NESTED {
            return false;
        }
        follow
            .breadcrumbs
            .splice(0..0, self.breadcrumbs.iter().cloned());
        follow.execute(game, false);
        true
    }

    /// Counter another action: same recursion rules, marked in breadcrumbs.
    pub fn counter(&self, game: &mut Game, mut follow: Action) -> bool {
        follow
            .breadcrumbs
            .push(format!("counter:{}", self.kind.action_type()));
        self.spawn_reaction(game, follow)
    }

    /// Enqueue a followup as a fresh chain at the back of the game queue.
    pub fn followup(&self, game: &mut Game, mut follow: Action) {
        follow
            .breadcrumbs
            .splice(0..0, self.breadcrumbs.iter().cloned());
        game.enqueue(follow);
    }

    /// True when the container heard this action during the sense phase.
    #[must_use]
    pub fn sensed_by(&self, container_id: &str) -> bool {
        self.sensors.iter().any(|(id, r)| {
            id == container_id
                && match r {
                    SenseResult::Seen(b) => *b,
                    SenseResult::Info(_) => true,
                }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_priority_denial_sticks() {
        let mut a = Action::new(ActionKind::Custom {
            name: "t".into(),
            payload: serde_json::Value::Null,
        });
        a.permit(3, Permission::allow());
        a.deny(3, Permission::denial(ContainerId::game("g"), None, "no"));
        a.permit(3, Permission::allow());
        a.decide_permission();
        assert!(!a.permitted);
        assert_eq!(
            a.deciding_permission.as_ref().and_then(|p| p.message.as_deref()),
            Some("no")
        );
    }

    #[test]
    fn higher_priority_wins_either_way() {
        let mut a = Action::new(ActionKind::Custom {
            name: "t".into(),
            payload: serde_json::Value::Null,
        });
        a.deny(2, Permission::denial(ContainerId::game("g"), None, "lower"));
        a.permit(3, Permission::allow());
        a.decide_permission();
        assert!(a.permitted, "priority 3 allow beats priority 2 deny");

        let mut b = Action::new(ActionKind::Custom {
            name: "t".into(),
            payload: serde_json::Value::Null,
        });
        b.permit(2, Permission::allow());
        b.deny(3, Permission::denial(ContainerId::game("g"), None, "higher"));
        b.decide_permission();
        assert!(!b.permitted);
    }

    #[test]
    fn default_permission_is_allow_at_zero() {
        let mut a = Action::new(ActionKind::Custom {
            name: "t".into(),
            payload: serde_json::Value::Null,
        });
        a.decide_permission();
        assert!(a.permitted);
    }
}
