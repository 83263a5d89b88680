//! Rollup DAG for overlapping id sets (sensed entities, team membership).
//!
//! Each node carries a local set plus a support count per id: 1 when the id
//! is local, plus 1 per direct child in which the id is present. Presence is
//! therefore incremental: an id is present at a node iff its support is
//! nonzero, and a change only propagates upward across nodes whose presence
//! actually flipped. `NestedChanges` reports exactly those flips.

use crate::{EngineError, ScopeKind};

#[derive(Debug)]
pub struct NestedNode {
    pub owner: String,
    pub scope: ScopeKind,
    local: Vec<String>,
    present: Vec<(String, usize)>,
    pub parents: Vec<String>,
    pub children: Vec<String>,
}

/// Which nodes gained (or lost) an id, grouped as (scope, node, ids).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestedChanges {
    entries: Vec<(ScopeKind, String, Vec<String>)>,
}

impl NestedChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn record(&mut self, scope: ScopeKind, node: &str, id: &str) {
        match self
            .entries
            .iter_mut()
            .find(|(s, n, _)| *s == scope && n == node)
        {
            Some((_, _, ids)) => {
                if !ids.iter().any(|i| i == id) {
                    ids.push(id.to_string());
                }
            }
            None => self
                .entries
                .push((scope, node.to_string(), vec![id.to_string()])),
        }
    }

    /// Nodes at `scope` that flipped, with the ids involved.
    pub fn at_scope(&self, scope: ScopeKind) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .filter(move |(s, _, _)| *s == scope)
            .map(|(_, n, ids)| (n.as_str(), ids.as_slice()))
    }

    #[must_use]
    pub fn contains(&self, scope: ScopeKind, node: &str, id: &str) -> bool {
        self.entries
            .iter()
            .any(|(s, n, ids)| *s == scope && n == node && ids.iter().any(|i| i == id))
    }

    pub fn merge(&mut self, other: NestedChanges) {
        for (scope, node, ids) in other.entries {
            for id in ids {
                self.record(scope, &node, &id);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct NestedForest {
    nodes: Vec<NestedNode>,
}

impl NestedForest {
    pub fn ensure_node(&mut self, owner: &str, scope: ScopeKind) {
        if self.node(owner).is_none() {
            self.nodes.push(NestedNode {
                owner: owner.to_string(),
                scope,
                local: Vec::new(),
                present: Vec::new(),
                parents: Vec::new(),
                children: Vec::new(),
            });
        }
    }

    #[must_use]
    pub fn node(&self, owner: &str) -> Option<&NestedNode> {
        self.nodes.iter().find(|n| n.owner == owner)
    }

    fn node_mut(&mut self, owner: &str) -> Option<&mut NestedNode> {
        self.nodes.iter_mut().find(|n| n.owner == owner)
    }

    /// Id is present at the node (locally or through any descendant).
    #[must_use]
    pub fn contains(&self, owner: &str, id: &str) -> bool {
        self.node(owner)
            .is_some_and(|n| n.present.iter().any(|(i, _)| i == id))
    }

    /// All ids present at the node, in first-seen order.
    #[must_use]
    pub fn ids_at(&self, owner: &str) -> Vec<String> {
        self.node(owner)
            .map(|n| n.present.iter().map(|(i, _)| i.clone()).collect())
            .unwrap_or_default()
    }

    fn is_ancestor(&self, candidate: &str, of: &str) -> bool {
        let mut work = vec![of.to_string()];
        let mut seen = Vec::new();
        while let Some(cur) = work.pop() {
            if cur == candidate {
                return true;
            }
            if seen.iter().any(|s| *s == cur) {
                continue;
            }
            seen.push(cur.clone());
            if let Some(n) = self.node(&cur) {
                work.extend(n.parents.iter().cloned());
            }
        }
        false
    }

    fn bump(&mut self, start: &str, id: &str, changes: &mut NestedChanges) {
        let mut work = vec![start.to_string()];
        while let Some(cur) = work.pop() {
            let Some(n) = self.node_mut(&cur) else { continue };
            if let Some(e) = n.present.iter_mut().find(|(i, _)| i == id) {
                e.1 += 1;
            } else {
                n.present.push((id.to_string(), 1));
                changes.record(n.scope, &n.owner, id);
                work.extend(n.parents.iter().cloned());
            }
        }
    }

    fn unbump(&mut self, start: &str, id: &str, changes: &mut NestedChanges) {
        let mut work = vec![start.to_string()];
        while let Some(cur) = work.pop() {
            let Some(n) = self.node_mut(&cur) else { continue };
            let Some(pos) = n.present.iter().position(|(i, _)| i == id) else {
                continue;
            };
            n.present[pos].1 -= 1;
            if n.present[pos].1 == 0 {
                n.present.remove(pos);
                changes.record(n.scope, &n.owner, id);
                work.extend(n.parents.iter().cloned());
            }
        }
    }

    /// Insert `id` into the node's local set; reports every node where `id`
    /// became newly present.
    pub fn add(&mut self, owner: &str, id: &str) -> NestedChanges {
        let mut changes = NestedChanges::default();
        let Some(n) = self.node_mut(owner) else {
            return changes;
        };
        if n.local.iter().any(|i| i == id) {
            return changes;
        }
        n.local.push(id.to_string());
        self.bump(owner, id, &mut changes);
        changes
    }

    /// Remove `id` from the node's local set; reports the nodes from which
    /// it actually vanished (no child still contains it).
    pub fn remove(&mut self, owner: &str, id: &str) -> NestedChanges {
        let mut changes = NestedChanges::default();
        let Some(n) = self.node_mut(owner) else {
            return changes;
        };
        let Some(pos) = n.local.iter().position(|i| i == id) else {
            return changes;
        };
        n.local.remove(pos);
        self.unbump(owner, id, &mut changes);
        changes
    }

    /// Wire `child` under `parent`, rolling the child's present ids upward.
    /// Rejects edges that would close a cycle.
    pub fn add_parent(&mut self, child: &str, parent: &str) -> Result<NestedChanges, EngineError> {
        let mut changes = NestedChanges::default();
        if child == parent || self.is_ancestor(child, parent) {
            return Err(EngineError::RollupCycle(child.to_string()));
        }
        if self.node(child).is_none() || self.node(parent).is_none() {
            return Err(EngineError::UnknownContainer(parent.to_string()));
        }
        if self
            .node(child)
            .is_some_and(|n| n.parents.iter().any(|p| p == parent))
        {
            return Ok(changes);
        }
        let rolled: Vec<String> = self
            .node(child)
            .map(|n| n.present.iter().map(|(i, _)| i.clone()).collect())
            .unwrap_or_default();
        if let Some(c) = self.node_mut(child) {
            c.parents.push(parent.to_string());
        }
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child.to_string());
        }
        for id in rolled {
            self.bump(parent, &id, &mut changes);
        }
        Ok(changes)
    }

    /// Unwire `child` from `parent`, reporting ids that vanished upward.
    pub fn remove_parent(&mut self, child: &str, parent: &str) -> NestedChanges {
        let mut changes = NestedChanges::default();
        let has_edge = self
            .node(child)
            .is_some_and(|n| n.parents.iter().any(|p| p == parent));
        if !has_edge {
            return changes;
        }
        let rolled: Vec<String> = self
            .node(child)
            .map(|n| n.present.iter().map(|(i, _)| i.clone()).collect())
            .unwrap_or_default();
        if let Some(c) = self.node_mut(child) {
            c.parents.retain(|p| p != parent);
        }
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| c != child);
        }
        for id in rolled {
            self.unbump(parent, &id, &mut changes);
        }
        changes
    }

    /// Remove a node entirely: detach from parents and children, rolling its
    /// contribution out of every ancestor.
    pub fn drop_node(&mut self, owner: &str) -> NestedChanges {
        let mut changes = NestedChanges::default();
        let Some(n) = self.node(owner) else {
            return changes;
        };
        let parents = n.parents.clone();
        let children = n.children.clone();
        for p in parents {
            changes.merge(self.remove_parent(owner, &p));
        }
        for c in children {
            self.remove_parent(&c, owner);
        }
        self.nodes.retain(|n| n.owner != owner);
        changes
    }

    /// Remove `id` from every local set it appears in (entity teardown).
    pub fn remove_id_everywhere(&mut self, id: &str) -> NestedChanges {
        let owners: Vec<String> = self
            .nodes
            .iter()
            .filter(|n| n.local.iter().any(|i| i == id))
            .map(|n| n.owner.clone())
            .collect();
        let mut changes = NestedChanges::default();
        for o in owners {
            changes.merge(self.remove(&o, id));
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> NestedForest {
        // sensor -> entity -> player -> team
        let mut f = NestedForest::default();
        f.ensure_node("sensor", ScopeKind::Entity);
        f.ensure_node("entity", ScopeKind::Entity);
        f.ensure_node("player", ScopeKind::Player);
        f.ensure_node("team", ScopeKind::Team);
        f.add_parent("sensor", "entity").expect("edge");
        f.add_parent("entity", "player").expect("edge");
        f.add_parent("player", "team").expect("edge");
        f
    }

    #[test]
    fn add_reports_every_newly_present_node() {
        let mut f = chain();
        let ch = f.add("sensor", "zombie");
        for node in ["sensor", "entity", "player", "team"] {
            assert!(f.contains(node, "zombie"), "{node} should contain");
        }
        assert!(ch.contains(ScopeKind::Player, "player", "zombie"));
        assert!(ch.contains(ScopeKind::Team, "team", "zombie"));
        // Second add through a sibling set must not re-report ancestors.
        f.ensure_node("sensor2", ScopeKind::Entity);
        f.add_parent("sensor2", "entity").expect("edge");
        let ch2 = f.add("sensor2", "zombie");
        assert!(ch2.contains(ScopeKind::Entity, "sensor2", "zombie"));
        assert!(!ch2.contains(ScopeKind::Player, "player", "zombie"));
    }

    #[test]
    fn remove_only_vanishes_when_no_child_still_contains() {
        let mut f = chain();
        f.ensure_node("sensor2", ScopeKind::Entity);
        f.add_parent("sensor2", "entity").expect("edge");
        f.add("sensor", "zombie");
        f.add("sensor2", "zombie");
        let ch = f.remove("sensor", "zombie");
        assert!(ch.contains(ScopeKind::Entity, "sensor", "zombie"));
        assert!(!ch.contains(ScopeKind::Player, "player", "zombie"));
        assert!(f.contains("player", "zombie"));
        let ch2 = f.remove("sensor2", "zombie");
        assert!(ch2.contains(ScopeKind::Player, "player", "zombie"));
        assert!(!f.contains("player", "zombie"));
    }

    #[test]
    fn rollup_invariant_holds_under_reparenting() {
        let mut f = chain();
        f.add("sensor", "a");
        let ch = f.remove_parent("sensor", "entity");
        assert!(ch.contains(ScopeKind::Team, "team", "a"));
        assert!(!f.contains("entity", "a"));
        assert!(f.contains("sensor", "a"));
        let ch = f.add_parent("sensor", "entity").expect("edge");
        assert!(ch.contains(ScopeKind::Entity, "entity", "a"));
        assert!(f.contains("team", "a"));
    }

    #[test]
    fn diamond_counts_each_path_once() {
        // child under two parents, both under one grandparent
        let mut f = NestedForest::default();
        for n in ["child", "left", "right", "top"] {
            f.ensure_node(n, ScopeKind::Player);
        }
        f.add_parent("child", "left").expect("edge");
        f.add_parent("child", "right").expect("edge");
        f.add_parent("left", "top").expect("edge");
        f.add_parent("right", "top").expect("edge");
        let ch = f.add("child", "x");
        assert!(ch.contains(ScopeKind::Player, "top", "x"));
        // Dropping one path keeps presence through the other.
        f.remove_parent("child", "left");
        assert!(f.contains("top", "x"));
        f.remove_parent("child", "right");
        assert!(!f.contains("top", "x"));
    }

    #[test]
    fn add_parent_rejects_cycles() {
        let mut f = chain();
        assert!(f.add_parent("team", "sensor").is_err());
        assert!(f.add_parent("entity", "entity").is_err());
    }

    #[test]
    fn drop_node_rolls_out_of_ancestors() {
        let mut f = chain();
        f.add("sensor", "z");
        let ch = f.drop_node("sensor");
        assert!(ch.contains(ScopeKind::Team, "team", "z"));
        assert!(!f.contains("entity", "z"));
    }
}
