//! Action variants: per-kind initialize/apply/teardown and wire mapping.
//!
//! `apply` returns `Ok(true)` only when state changed; refusals that are
//! part of normal play (occupied slot, duplicate property) are `Ok(false)`,
//! never errors.

use glam::IVec2;
use grid_core::ChunkExt;

use crate::actions::{Action, VisibilityChanges, VisibilityKind};
use crate::component::Component;
use crate::entity::Grant;
use crate::game::Game;
use crate::property::{Modification, Property};
use crate::{ContainerId, EngineError};

#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    /// Payload is consumed by apply.
    AttachComponent { component: Option<Component> },
    PublishEntity { world: String, position: IVec2 },
    UnpublishEntity,
    ChangeWorld { world: String, position: IVec2 },
    Move { to: IVec2 },
    RelativeMove { delta: IVec2 },
    OwnEntity { player: String },
    EquipItem { item: String, slot: String },
    AddSlot { slot: String },
    RemoveSlot { slot: String },
    AddProperty { property: String, current: f64, min: f64, max: f64 },
    RemoveProperty { property: String },
    LearnAbility { ability: String, granted_by: Option<String>, using: Option<String> },
    ForgetAbility { ability: String, granted_by: Option<String>, using: Option<String> },
    ModifyProperty { property: String, modification: Modification },
    PropertyAdjustment { property: String, amount: f64 },
    SenseEntity { entity: String },
    LoseEntity { entity: String },
    Custom { name: String, payload: serde_json::Value },
}

impl ActionKind {
    #[must_use]
    pub fn is_movement(&self) -> bool {
        matches!(
            self,
            ActionKind::PublishEntity { .. }
                | ActionKind::ChangeWorld { .. }
                | ActionKind::Move { .. }
                | ActionKind::RelativeMove { .. }
        )
    }

    #[must_use]
    pub fn action_type(&self) -> &'static str {
        match self {
            ActionKind::AttachComponent { .. } => "attach_component",
            ActionKind::PublishEntity { .. } => "publish_entity",
            ActionKind::UnpublishEntity => "unpublish_entity",
            ActionKind::ChangeWorld { .. } => "change_world",
            ActionKind::Move { .. } => "move",
            ActionKind::RelativeMove { .. } => "relative_move",
            ActionKind::OwnEntity { .. } => "own_entity",
            ActionKind::EquipItem { .. } => "equip_item",
            ActionKind::AddSlot { .. } => "add_slot",
            ActionKind::RemoveSlot { .. } => "remove_slot",
            ActionKind::AddProperty { .. } => "add_property",
            ActionKind::RemoveProperty { .. } => "remove_property",
            ActionKind::LearnAbility { .. } => "learn_ability",
            ActionKind::ForgetAbility { .. } => "forget_ability",
            ActionKind::ModifyProperty { .. } => "modify_property",
            ActionKind::PropertyAdjustment { .. } => "property_adjustment",
            ActionKind::SenseEntity { .. } => "sense_entity",
            ActionKind::LoseEntity { .. } => "lose_entity",
            ActionKind::Custom { .. } => "custom",
        }
    }

    /// Variant fields as a wire payload.
    #[must_use]
    pub fn data_payload(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            ActionKind::AttachComponent { component } => json!({
                "component": component.as_ref().map(|c| c.name.clone()),
            }),
            ActionKind::PublishEntity { world, position }
            | ActionKind::ChangeWorld { world, position } => json!({
                "world": world,
                "position": [position.x, position.y],
            }),
            ActionKind::UnpublishEntity => serde_json::Value::Null,
            ActionKind::Move { to } => json!({ "to": [to.x, to.y] }),
            ActionKind::RelativeMove { delta } => json!({ "delta": [delta.x, delta.y] }),
            ActionKind::OwnEntity { player } => json!({ "player": player }),
            ActionKind::EquipItem { item, slot } => json!({ "item": item, "slot": slot }),
            ActionKind::AddSlot { slot } | ActionKind::RemoveSlot { slot } => {
                json!({ "slot": slot })
            }
            ActionKind::AddProperty { property, current, min, max } => json!({
                "property": property, "current": current, "min": min, "max": max,
            }),
            ActionKind::RemoveProperty { property } => json!({ "property": property }),
            ActionKind::LearnAbility { ability, granted_by, using }
            | ActionKind::ForgetAbility { ability, granted_by, using } => json!({
                "ability": ability, "granted_by": granted_by, "using": using,
            }),
            ActionKind::ModifyProperty { property, modification } => {
                let (kind, value) = match modification {
                    Modification::Adjustment(v) => ("adjustment", *v),
                    Modification::Multiplier(v) => ("multiplier", *v),
                    Modification::Absolute(v) => ("absolute", *v),
                };
                json!({ "property": property, "modification": { "kind": kind, "value": value } })
            }
            ActionKind::PropertyAdjustment { property, amount } => json!({
                "property": property, "amount": amount,
            }),
            ActionKind::SenseEntity { entity } | ActionKind::LoseEntity { entity } => {
                json!({ "entity": entity })
            }
            ActionKind::Custom { name, payload } => json!({
                "name": name, "payload": payload,
            }),
        }
    }

    /// Rebuild a kind from wire fields. Attachments do not travel.
    pub fn from_wire(action_type: &str, data: &serde_json::Value) -> anyhow::Result<Self> {
        use anyhow::{Context, bail};
        let str_field = |key: &str| -> anyhow::Result<String> {
            data.get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .with_context(|| format!("missing field `{key}`"))
        };
        let opt_str = |key: &str| data.get(key).and_then(|v| v.as_str()).map(str::to_string);
        let f64_field = |key: &str| -> anyhow::Result<f64> {
            data.get(key)
                .and_then(serde_json::Value::as_f64)
                .with_context(|| format!("missing field `{key}`"))
        };
        let vec_field = |key: &str| -> anyhow::Result<IVec2> {
            let arr = data
                .get(key)
                .and_then(|v| v.as_array())
                .with_context(|| format!("missing field `{key}`"))?;
            if arr.len() != 2 {
                bail!("field `{key}` must be [x, y]");
            }
            let x = arr[0].as_i64().context("x not an integer")?;
            let y = arr[1].as_i64().context("y not an integer")?;
            Ok(IVec2::new(
                i32::try_from(x).context("x out of range")?,
                i32::try_from(y).context("y out of range")?,
            ))
        };
        Ok(match action_type {
            "publish_entity" => ActionKind::PublishEntity {
                world: str_field("world")?,
                position: vec_field("position")?,
            },
            "unpublish_entity" => ActionKind::UnpublishEntity,
            "change_world" => ActionKind::ChangeWorld {
                world: str_field("world")?,
                position: vec_field("position")?,
            },
            "move" => ActionKind::Move { to: vec_field("to")? },
            "relative_move" => ActionKind::RelativeMove { delta: vec_field("delta")? },
            "own_entity" => ActionKind::OwnEntity { player: str_field("player")? },
            "equip_item" => ActionKind::EquipItem {
                item: str_field("item")?,
                slot: str_field("slot")?,
            },
            "add_slot" => ActionKind::AddSlot { slot: str_field("slot")? },
            "remove_slot" => ActionKind::RemoveSlot { slot: str_field("slot")? },
            "add_property" => ActionKind::AddProperty {
                property: str_field("property")?,
                current: f64_field("current")?,
                min: f64_field("min")?,
                max: f64_field("max")?,
            },
            "remove_property" => ActionKind::RemoveProperty { property: str_field("property")? },
            "learn_ability" => ActionKind::LearnAbility {
                ability: str_field("ability")?,
                granted_by: opt_str("granted_by"),
                using: opt_str("using"),
            },
            "forget_ability" => ActionKind::ForgetAbility {
                ability: str_field("ability")?,
                granted_by: opt_str("granted_by"),
                using: opt_str("using"),
            },
            "modify_property" => {
                let m = data.get("modification").context("missing field `modification`")?;
                let value = m
                    .get("value")
                    .and_then(serde_json::Value::as_f64)
                    .context("missing modification value")?;
                let modification = match m.get("kind").and_then(|v| v.as_str()) {
                    Some("adjustment") => Modification::Adjustment(value),
                    Some("multiplier") => Modification::Multiplier(value),
                    Some("absolute") => Modification::Absolute(value),
                    other => bail!("unknown modification kind: {other:?}"),
                };
                ActionKind::ModifyProperty {
                    property: str_field("property")?,
                    modification,
                }
            }
            "property_adjustment" => ActionKind::PropertyAdjustment {
                property: str_field("property")?,
                amount: f64_field("amount")?,
            },
            "sense_entity" => ActionKind::SenseEntity { entity: str_field("entity")? },
            "lose_entity" => ActionKind::LoseEntity { entity: str_field("entity")? },
            "custom" => ActionKind::Custom {
                name: str_field("name")?,
                payload: data.get("payload").cloned().unwrap_or(serde_json::Value::Null),
            },
            other => bail!("unknown action type: {other}"),
        })
    }
}

fn require_target(action: &Action) -> Result<String, EngineError> {
    action
        .target
        .clone()
        .ok_or_else(|| EngineError::UnknownEntity("(no target)".into()))
}

/// Variant hook run before anything else in the pipeline.
pub(crate) fn initialize(action: &mut Action, game: &mut Game) {
    if let ActionKind::PublishEntity { world, position } = &action.kind {
        let world = world.clone();
        let position = *position;
        // Preload view chunks so listeners are in place before the entity
        // becomes visible.
        if !action
            .additional_listen_points
            .iter()
            .any(|(w, p)| *w == world && *p == position)
        {
            action.additional_listen_points.push((world.clone(), position));
        }
        if let Some(target) = action.target.clone() {
            let radius = game.view_radius_for(&target);
            if let Some(w) = game.world_mut(&world) {
                w.add_view(&target, position.to_chunk_space(), None, radius);
            }
        }
    }
}

/// Variant hook run after the broadcast queue hand-off.
pub(crate) fn teardown(action: &mut Action, game: &mut Game) {
    if let ActionKind::PublishEntity { world, position } = &action.kind {
        let world = world.clone();
        let position = *position;
        if let Some(target) = action.target.clone() {
            let keep = game
                .entity(&target)
                .is_some_and(|e| e.active && e.published);
            if !keep {
                let radius = game.view_radius_for(&target);
                if let Some(w) = game.world_mut(&world) {
                    w.remove_view(&target, position.to_chunk_space(), None, radius);
                }
            }
        }
    }
}

pub(crate) fn apply(action: &mut Action, game: &mut Game) -> Result<bool, EngineError> {
    // Attachment consumes its payload; every other arm reads a clone.
    if let ActionKind::AttachComponent { component } = &mut action.kind {
        let Some(c) = component.take() else {
            return Ok(false);
        };
        let target = require_target(action)?;
        game.add_component(ContainerId::entity(&target), c)?;
        return Ok(true);
    }
    let kind = action.kind.clone();
    match kind {
        ActionKind::AttachComponent { .. } => unreachable!("handled above"),
        ActionKind::PublishEntity { world, position } => {
            game.publish_entity(&require_target(action)?, &world, position)
        }
        ActionKind::UnpublishEntity => game.unpublish_entity(&require_target(action)?),
        ActionKind::ChangeWorld { world, position } => {
            game.change_world(&require_target(action)?, &world, position)
        }
        ActionKind::Move { to } => game.move_entity(&require_target(action)?, to),
        ActionKind::RelativeMove { delta } => {
            let target = require_target(action)?;
            let pos = game
                .entity(&target)
                .ok_or_else(|| EngineError::UnknownEntity(target.clone()))?
                .position;
            game.move_entity(&target, pos + delta)
        }
        ActionKind::OwnEntity { player } => {
            let target = require_target(action)?;
            let (owned, changes) = game.own_entity(&player, &target)?;
            if owned && !changes.is_empty() {
                action.visibility_changes = Some(VisibilityChanges {
                    kind: VisibilityKind::Add,
                    changes,
                });
            }
            Ok(owned)
        }
        ActionKind::EquipItem { item, slot } => {
            let target = require_target(action)?;
            if game.entity(&item).is_none() {
                return Err(EngineError::UnknownEntity(item));
            }
            let entity = game
                .entity_mut(&target)
                .ok_or(EngineError::UnknownEntity(target))?;
            match entity.slot_mut(&slot) {
                Some(held) if held.is_none() => {
                    *held = Some(item);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
        ActionKind::AddSlot { slot } => {
            let target = require_target(action)?;
            let entity = game
                .entity_mut(&target)
                .ok_or(EngineError::UnknownEntity(target))?;
            if entity.slot(&slot).is_some() {
                return Ok(false);
            }
            entity.slots.push((slot, None));
            Ok(true)
        }
        ActionKind::RemoveSlot { slot } => {
            let target = require_target(action)?;
            let entity = game
                .entity_mut(&target)
                .ok_or(EngineError::UnknownEntity(target))?;
            let before = entity.slots.len();
            entity.slots.retain(|(n, _)| *n != slot);
            Ok(entity.slots.len() != before)
        }
        ActionKind::AddProperty { property, current, min, max } => {
            let target = require_target(action)?;
            let entity = game
                .entity_mut(&target)
                .ok_or(EngineError::UnknownEntity(target))?;
            if entity.property(&property).is_some() {
                return Ok(false);
            }
            let owner = entity.id.clone();
            entity.properties.push(Property::new(&owner, &property, current, min, max));
            Ok(true)
        }
        ActionKind::RemoveProperty { property } => {
            let target = require_target(action)?;
            let entity = game
                .entity_mut(&target)
                .ok_or(EngineError::UnknownEntity(target))?;
            let before = entity.properties.len();
            entity.properties.retain(|p| p.name != property);
            Ok(entity.properties.len() != before)
        }
        ActionKind::LearnAbility { ability, granted_by, using } => {
            let target = require_target(action)?;
            let entity = game
                .entity_mut(&target)
                .ok_or(EngineError::UnknownEntity(target))?;
            Ok(entity.learn(Grant { ability, granted_by, using }))
        }
        ActionKind::ForgetAbility { ability, granted_by, using } => {
            let target = require_target(action)?;
            let entity = game
                .entity_mut(&target)
                .ok_or(EngineError::UnknownEntity(target))?;
            Ok(entity.forget(&ability, granted_by.as_deref(), using.as_deref()))
        }
        ActionKind::ModifyProperty { property, modification } => {
            let target = require_target(action)?;
            let entity = game
                .entity_mut(&target)
                .ok_or(EngineError::UnknownEntity(target))?;
            match entity.property_mut(&property) {
                Some(p) => {
                    p.modifications.push(modification);
                    Ok(true)
                }
                None => Ok(false),
            }
        }
        ActionKind::PropertyAdjustment { property, amount } => {
            let target = require_target(action)?;
            let entity = game
                .entity_mut(&target)
                .ok_or(EngineError::UnknownEntity(target))?;
            match entity.property_mut(&property) {
                Some(p) => Ok(p.adjust(amount) != 0.0),
                None => Ok(false),
            }
        }
        ActionKind::SenseEntity { entity } => {
            let Some(using) = action.using.clone() else {
                return Ok(false);
            };
            if game.entity(&entity).is_none() {
                return Err(EngineError::UnknownEntity(entity));
            }
            let changes = game.senses.add(&using, &entity);
            if changes.is_empty() {
                return Ok(false);
            }
            action.visibility_changes = Some(VisibilityChanges {
                kind: VisibilityKind::Add,
                changes,
            });
            Ok(true)
        }
        ActionKind::LoseEntity { entity } => {
            let Some(using) = action.using.clone() else {
                return Ok(false);
            };
            let changes = game.senses.remove(&using, &entity);
            if changes.is_empty() {
                return Ok(false);
            }
            action.visibility_changes = Some(VisibilityChanges {
                kind: VisibilityKind::Remove,
                changes,
            });
            Ok(true)
        }
        ActionKind::Custom { .. } => Ok(true),
    }
}

pub(crate) fn generate_message(action: &mut Action, game: &Game) {
    let name_of = |id: &Option<String>| -> String {
        id.as_ref()
            .and_then(|i| game.entity(i).map(|e| e.name.clone()))
            .unwrap_or_else(|| "something".into())
    };
    let subject = name_of(&action.target);
    action.message = match &action.kind {
        ActionKind::AttachComponent { .. } => format!("{subject} gained a component"),
        ActionKind::PublishEntity { position, .. } => {
            format!("{subject} appeared at ({},{})", position.x, position.y)
        }
        ActionKind::UnpublishEntity => format!("{subject} vanished"),
        ActionKind::ChangeWorld { world, .. } => format!("{subject} crossed into {world}"),
        ActionKind::Move { to } => format!("{subject} moved to ({},{})", to.x, to.y),
        ActionKind::RelativeMove { delta } => {
            format!("{subject} shifted by ({},{})", delta.x, delta.y)
        }
        ActionKind::OwnEntity { .. } => format!("{subject} changed hands"),
        ActionKind::EquipItem { slot, .. } => format!("{subject} equipped {slot}"),
        ActionKind::AddSlot { slot } => format!("{subject} gained slot {slot}"),
        ActionKind::RemoveSlot { slot } => format!("{subject} lost slot {slot}"),
        ActionKind::AddProperty { property, .. } => format!("{subject} gained {property}"),
        ActionKind::RemoveProperty { property } => format!("{subject} lost {property}"),
        ActionKind::LearnAbility { ability, .. } => format!("{subject} learned {ability}"),
        ActionKind::ForgetAbility { ability, .. } => format!("{subject} forgot {ability}"),
        ActionKind::ModifyProperty { property, .. } => {
            format!("{subject}'s {property} was modified")
        }
        ActionKind::PropertyAdjustment { property, amount } => {
            format!("{subject}'s {property} changed by {amount}")
        }
        ActionKind::SenseEntity { entity } => {
            format!("{} noticed {}", name_of(&action.caster), name_of(&Some(entity.clone())))
        }
        ActionKind::LoseEntity { entity } => {
            format!("{} lost sight of {}", name_of(&action.caster), name_of(&Some(entity.clone())))
        }
        ActionKind::Custom { name, .. } => format!("{subject}: {name}"),
    };
}
