//! Listener fan-out and built-in component behaviors.
//!
//! A container visited by the pipeline delegates to its catalog, which fans
//! out to the subscribed components for the phase's role. A failing
//! component is logged and skipped; one rogue behavior may not sink the
//! tick.

use glam::IVec2;
use grid_core::ChunkExt;

use crate::actions::{Action, ActionKind, Permission, SenseResult, SensoryInformation};
use crate::component::Behavior;
use crate::game::Game;
use crate::{ContainerId, EngineError, Role, ScopeKind};

fn subscribers_of(game: &Game, container: &ContainerId, role: Role) -> Vec<String> {
    game.catalog(container)
        .map(|c| c.subscribers(role).iter().map(|(id, _)| id.clone()).collect())
        .unwrap_or_default()
}

/// Sense phase for one container: any subscribed sensor that perceives the
/// action marks the container as having sensed it.
pub fn sense_container(game: &mut Game, container: &ContainerId, action: &mut Action) -> SenseResult {
    let mut result = SenseResult::Seen(false);
    for comp in subscribers_of(game, container, Role::Sensor) {
        match run_sense(game, &comp, action) {
            Ok(Some(r)) => {
                let positive = match &r {
                    SenseResult::Seen(b) => *b,
                    SenseResult::Info(_) => true,
                };
                if positive {
                    result = r;
                }
            }
            Ok(None) => {}
            Err(e) => log::warn!("sensor {comp} failed: {e}"),
        }
    }
    result
}

/// Modify phase for one container.
pub fn modify_container(game: &mut Game, container: &ContainerId, action: &mut Action) {
    for comp in subscribers_of(game, container, Role::Modifier) {
        if let Err(e) = run_modify(game, &comp, action) {
            log::warn!("modifier {comp} failed: {e}");
        }
    }
}

/// React phase for one container.
pub fn react_container(game: &mut Game, container: &ContainerId, action: &mut Action) {
    for comp in subscribers_of(game, container, Role::Reacter) {
        if let Err(e) = run_react(game, &comp, action) {
            log::warn!("reacter {comp} failed: {e}");
        }
    }
}

fn component_home(game: &Game, comp: &str) -> Result<(Behavior, String, ContainerId), EngineError> {
    let (c, home) = game
        .find_component(comp)
        .ok_or_else(|| EngineError::UnknownComponent(comp.to_string()))?;
    Ok((c.behavior.clone(), c.name.clone(), home))
}

fn chunk_distance(a: IVec2, b: IVec2) -> i32 {
    a.to_chunk_space().chebyshev(b.to_chunk_space())
}

fn run_sense(game: &mut Game, comp: &str, action: &Action) -> Result<Option<SenseResult>, EngineError> {
    let (behavior, name, home) = component_home(game, comp)?;
    match behavior {
        Behavior::Sight => {
            if home.kind != ScopeKind::Entity {
                return Ok(None);
            }
            let Some(parent) = game.entity(&home.id) else {
                return Ok(None);
            };
            let subject = action.caster.as_ref().or(action.target.as_ref());
            let Some(subject) = subject else {
                return Ok(Some(SenseResult::Seen(false)));
            };
            if subject == &home.id {
                return Ok(Some(SenseResult::Seen(true)));
            }
            let visible = game.entity(subject).is_some_and(|s| {
                s.published
                    && s.world == parent.world
                    && parent.world.is_some()
                    && chunk_distance(s.position, parent.position) <= game.cfg.view_distance
            });
            if visible {
                Ok(Some(SenseResult::Info(SensoryInformation {
                    source: name,
                    detail: format!("sees {subject}"),
                })))
            } else {
                Ok(Some(SenseResult::Seen(false)))
            }
        }
        _ => Ok(None),
    }
}

fn run_modify(game: &mut Game, comp: &str, action: &mut Action) -> Result<(), EngineError> {
    let (behavior, _, home) = component_home(game, comp)?;
    if let Behavior::ProtectiveAura { priority, message, against } = behavior
        && home.kind == ScopeKind::Entity
        && action.tags.iter().any(|t| *t == against)
        && action.target.as_deref() == Some(home.id.as_str())
        && action.caster.as_deref() != Some(home.id.as_str())
    {
        action.deny(
            priority,
            Permission::denial(home.clone(), Some(comp.to_string()), &message),
        );
    }
    Ok(())
}

fn run_react(game: &mut Game, comp: &str, action: &mut Action) -> Result<(), EngineError> {
    let (behavior, _, home) = component_home(game, comp)?;
    match behavior {
        Behavior::Sight => react_sight(game, comp, &home, action),
        Behavior::Retort { tag } => {
            if let ActionKind::Custom { name, .. } = &action.kind
                && *name == tag
                && action.target.as_deref() == Some(home.id.as_str())
                && action.caster.as_deref() != Some(home.id.as_str())
            {
                let mut back = Action::new(ActionKind::Custom {
                    name: tag.clone(),
                    payload: serde_json::Value::Null,
                });
                back.caster = Some(home.id.clone());
                back.target = action.caster.clone();
                back.tags = action.tags.clone();
                action.counter(game, back);
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Sight reacts to applied movement (and unpublish): it re-evaluates what
/// its parent can see and emits sense/lose follow-ups for the differences.
fn react_sight(
    game: &mut Game,
    comp: &str,
    home: &ContainerId,
    action: &mut Action,
) -> Result<(), EngineError> {
    let relevant =
        action.applied && (action.movement_action || matches!(action.kind, ActionKind::UnpublishEntity));
    if !relevant || home.kind != ScopeKind::Entity {
        return Ok(());
    }
    let Some(mover) = action.target.clone() else {
        return Ok(());
    };
    let Some(parent) = game.entity(&home.id) else {
        return Ok(());
    };
    let (parent_id, parent_pos, parent_world) =
        (parent.id.clone(), parent.position, parent.world.clone());
    let Some(parent_world) = parent_world else {
        return Ok(());
    };
    let view = game.cfg.view_distance;
    let sensed = game.senses.ids_at(comp);

    let mut gained: Vec<String> = Vec::new();
    let mut lost: Vec<String> = Vec::new();
    if mover == parent_id {
        // The watcher itself moved: rescan the whole world.
        for (id, pos) in game.published_entities_in(&parent_world) {
            if id == parent_id {
                continue;
            }
            let in_range = chunk_distance(pos, parent_pos) <= view;
            let was = sensed.iter().any(|s| *s == id);
            if in_range && !was {
                gained.push(id);
            } else if !in_range && was {
                lost.push(id);
            }
        }
        for s in &sensed {
            let still_there = game
                .entity(s)
                .is_some_and(|e| e.published && e.world.as_deref() == Some(parent_world.as_str()));
            if !still_there && !lost.iter().any(|l| l == s) {
                lost.push(s.clone());
            }
        }
    } else {
        // Someone else moved: evaluate just them.
        let was = sensed.iter().any(|s| *s == mover);
        let in_range = game.entity(&mover).is_some_and(|e| {
            e.published
                && e.world.as_deref() == Some(parent_world.as_str())
                && chunk_distance(e.position, parent_pos) <= view
        });
        if in_range && !was {
            gained.push(mover);
        } else if !in_range && was {
            lost.push(mover);
        }
    }

    for id in gained {
        let mut sense = Action::new(ActionKind::SenseEntity { entity: id.clone() });
        sense.caster = Some(parent_id.clone());
        sense.target = Some(id);
        sense.using = Some(comp.to_string());
        action.spawn_reaction(game, sense);
    }
    for id in lost {
        let mut lose = Action::new(ActionKind::LoseEntity { entity: id.clone() });
        lose.caster = Some(parent_id.clone());
        lose.target = Some(id);
        lose.using = Some(comp.to_string());
        action.spawn_reaction(game, lose);
    }
    Ok(())
}
