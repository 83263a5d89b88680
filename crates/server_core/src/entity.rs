//! Entities: the mobile, ownable containers of the simulation.

use glam::IVec2;

use crate::catalog::ComponentCatalog;
use crate::property::Property;
use crate::ContainerId;

/// How an entity came to have an ability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub ability: String,
    pub granted_by: Option<String>,
    pub using: Option<String>,
}

#[derive(Debug)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub published: bool,
    pub active: bool,
    /// Omnipotent entities bypass ability-grant checks (game-master tools).
    pub omnipotent: bool,
    pub properties: Vec<Property>,
    pub catalog: ComponentCatalog,
    /// Ability name -> grants recording who/what gave it.
    pub abilities: Vec<(String, Vec<Grant>)>,
    pub owners: Vec<String>,
    /// Slot name -> equipped entity id, if any.
    pub slots: Vec<(String, Option<String>)>,
    pub world: Option<String>,
    pub position: IVec2,
}

impl Entity {
    #[must_use]
    pub fn new(name: &str) -> Self {
        let id = crate::new_id();
        Self {
            catalog: ComponentCatalog::new(ContainerId::entity(&id)),
            id,
            name: name.to_string(),
            tags: Vec::new(),
            published: false,
            active: true,
            omnipotent: false,
            properties: Vec::new(),
            abilities: Vec::new(),
            owners: Vec::new(),
            slots: Vec::new(),
            world: None,
            position: IVec2::ZERO,
        }
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.name == name)
    }

    #[must_use]
    pub fn knows_ability(&self, name: &str) -> bool {
        self.omnipotent || self.abilities.iter().any(|(n, g)| n == name && !g.is_empty())
    }

    /// Record a grant; duplicates of the same (granted_by, using) pair for
    /// an ability are refused.
    pub fn learn(&mut self, grant: Grant) -> bool {
        let slot = match self.abilities.iter_mut().find(|(n, _)| *n == grant.ability) {
            Some((_, grants)) => grants,
            None => {
                self.abilities.push((grant.ability.clone(), Vec::new()));
                &mut self.abilities.last_mut().expect("just pushed").1
            }
        };
        if slot
            .iter()
            .any(|g| g.granted_by == grant.granted_by && g.using == grant.using)
        {
            return false;
        }
        slot.push(grant);
        true
    }

    /// Drop the grant keyed by (granted_by, using); the ability disappears
    /// with its last grant.
    pub fn forget(
        &mut self,
        ability: &str,
        granted_by: Option<&str>,
        using: Option<&str>,
    ) -> bool {
        let Some(pos) = self.abilities.iter().position(|(n, _)| n == ability) else {
            return false;
        };
        let grants = &mut self.abilities[pos].1;
        let Some(gpos) = grants
            .iter()
            .position(|g| g.granted_by.as_deref() == granted_by && g.using.as_deref() == using)
        else {
            return false;
        };
        grants.remove(gpos);
        if grants.is_empty() {
            self.abilities.remove(pos);
        }
        true
    }

    #[must_use]
    pub fn slot(&self, name: &str) -> Option<&Option<String>> {
        self.slots.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn slot_mut(&mut self, name: &str) -> Option<&mut Option<String>> {
        self.slots
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learn_and_forget_are_keyed_by_grant_pair() {
        let mut e = Entity::new("paladin");
        assert!(e.learn(Grant {
            ability: "Heal".into(),
            granted_by: None,
            using: None
        }));
        assert!(e.learn(Grant {
            ability: "Heal".into(),
            granted_by: Some("trainer".into()),
            using: None
        }));
        // Same pair again is refused.
        assert!(!e.learn(Grant {
            ability: "Heal".into(),
            granted_by: None,
            using: None
        }));
        assert!(e.knows_ability("Heal"));
        assert!(e.forget("Heal", None, None));
        assert!(e.knows_ability("Heal"), "second grant remains");
        assert!(e.forget("Heal", Some("trainer"), None));
        assert!(!e.knows_ability("Heal"));
        assert!(!e.forget("Heal", None, None));
    }

    #[test]
    fn omnipotent_knows_everything() {
        let mut e = Entity::new("gm");
        e.omnipotent = true;
        assert!(e.knows_ability("anything"));
    }
}
