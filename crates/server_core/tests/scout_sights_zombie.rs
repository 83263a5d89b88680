use data_runtime::configs::engine::EngineCfg;
use glam::IVec2;
use server_core::Game;
use server_core::actions::{Action, ActionKind};
use server_core::component::{Behavior, Component, ScopeSpec};
use server_core::{ContainerId, ScopeKind};

fn move_to(game: &mut Game, entity: &str, to: IVec2) {
    let mut a = Action::new(ActionKind::Move { to });
    a.caster = Some(entity.to_string());
    a.target = Some(entity.to_string());
    game.enqueue(a);
    game.run_tick();
}

/// Sight gain end to end: an eyes sensor on an owned scout reacts to its
/// own movement, senses a distant zombie once it comes into view range, and
/// the rollup turns into exactly one synthetic publish for the owner.
#[test]
fn moving_into_range_publishes_the_zombie_once() {
    let mut game = Game::new(EngineCfg::default());
    let world = game.create_world("steppe");
    let player = game.create_player("ash");
    let scout = game.spawn_entity("scout");
    let zombie = game.spawn_entity("zombie");

    game.publish_entity(&scout, &world, IVec2::ZERO).expect("publish scout");
    game.own_entity(&player, &scout).expect("own");
    let eyes = Component::new(
        "Eyes",
        Behavior::Sight,
        ScopeSpec {
            reacter: Some(ScopeKind::World),
            ..ScopeSpec::default()
        },
    );
    let eyes_id = eyes.id.clone();
    game.add_component(ContainerId::entity(&scout), eyes).expect("attach");

    // Zombie appears ten chunks out: beyond the six-chunk view radius.
    game.publish_entity(&zombie, &world, IVec2::new(160, 160)).expect("publish zombie");
    assert!(!game.senses.contains(&eyes_id, &zombie));

    // Wandering within the origin chunk changes nothing.
    move_to(&mut game, &scout, IVec2::new(4, 4));
    assert!(!game.senses.contains(&player, &zombie));
    move_to(&mut game, &scout, IVec2::new(6, 6));
    assert!(!game.senses.contains(&player, &zombie));

    game.player_mut(&player).expect("player").outgoing.clear();
    // Chunk (4,4) is exactly six chunks from the zombie's (10,10).
    move_to(&mut game, &scout, IVec2::new(70, 70));

    assert!(game.senses.contains(&eyes_id, &zombie), "sensor map");
    assert!(game.senses.contains(&scout, &zombie), "entity rollup");
    assert!(game.senses.contains(&player, &zombie), "player rollup");

    let publishes: Vec<_> = game
        .player(&player)
        .expect("player")
        .outgoing
        .iter()
        .filter(|w| w.action_type == "publish_entity" && w.target.as_deref() == Some(zombie.as_str()))
        .collect();
    assert_eq!(publishes.len(), 1, "synthetic publish exactly once");

    // Stepping back out of range loses the zombie and unpublishes it for
    // the owner, again exactly once.
    game.player_mut(&player).expect("player").outgoing.clear();
    move_to(&mut game, &scout, IVec2::ZERO);
    assert!(!game.senses.contains(&player, &zombie));
    let unpublishes: Vec<_> = game
        .player(&player)
        .expect("player")
        .outgoing
        .iter()
        .filter(|w| {
            w.action_type == "unpublish_entity" && w.target.as_deref() == Some(zombie.as_str())
        })
        .collect();
    assert_eq!(unpublishes.len(), 1);
}

/// Unpublishing the watcher itself empties its sensor maps: the owner
/// stops sensing everything the eyes held, hears about the loss once, and
/// later actions about those entities no longer reach it.
#[test]
fn unpublishing_the_watcher_clears_its_rollups() {
    let mut game = Game::new(EngineCfg::default());
    let world = game.create_world("steppe");
    let player = game.create_player("ash");
    let scout = game.spawn_entity("scout");
    let zombie = game.spawn_entity("zombie");
    game.publish_entity(&scout, &world, IVec2::ZERO).expect("publish scout");
    game.own_entity(&player, &scout).expect("own");
    let eyes = Component::new(
        "Eyes",
        Behavior::Sight,
        ScopeSpec {
            reacter: Some(ScopeKind::World),
            ..ScopeSpec::default()
        },
    );
    let eyes_id = eyes.id.clone();
    game.add_component(ContainerId::entity(&scout), eyes).expect("attach");
    game.publish_entity(&zombie, &world, IVec2::new(160, 160)).expect("publish zombie");
    move_to(&mut game, &scout, IVec2::new(70, 70));
    assert!(game.senses.contains(&player, &zombie), "sighted first");

    game.player_mut(&player).expect("player").outgoing.clear();
    game.unpublish_entity(&scout).expect("unpublish");

    assert!(!game.senses.contains(&eyes_id, &zombie), "sensor map emptied");
    assert!(!game.senses.contains(&scout, &zombie), "entity rollup emptied");
    assert!(!game.senses.contains(&player, &zombie), "player rollup emptied");
    let unpublishes = game
        .player(&player)
        .expect("player")
        .outgoing
        .iter()
        .filter(|w| {
            w.action_type == "unpublish_entity" && w.target.as_deref() == Some(zombie.as_str())
        })
        .count();
    assert_eq!(unpublishes, 1, "loss reported exactly once");
    let snap = game.serialize_for_scope(&player).expect("snapshot");
    assert!(!snap.entities.iter().any(|e| e.id == zombie));

    // The zombie is out of the player's perception now: actions about it
    // stop fanning out there.
    game.player_mut(&player).expect("player").outgoing.clear();
    let mut step = Action::new(ActionKind::Move { to: IVec2::new(161, 160) });
    step.caster = Some(zombie.clone());
    step.target = Some(zombie.clone());
    game.enqueue(step);
    game.run_tick();
    assert!(
        game.player(&player)
            .expect("player")
            .outgoing
            .iter()
            .all(|w| w.action_type != "move")
    );
}

/// The watcher standing still also notices entities that move into range.
#[test]
fn zombie_walking_into_view_is_sensed() {
    let mut game = Game::new(EngineCfg::default());
    let world = game.create_world("steppe");
    let player = game.create_player("ash");
    let scout = game.spawn_entity("scout");
    let zombie = game.spawn_entity("zombie");
    game.publish_entity(&scout, &world, IVec2::ZERO).expect("publish scout");
    game.own_entity(&player, &scout).expect("own");
    let eyes = Component::new(
        "Eyes",
        Behavior::Sight,
        ScopeSpec {
            reacter: Some(ScopeKind::World),
            ..ScopeSpec::default()
        },
    );
    game.add_component(ContainerId::entity(&scout), eyes).expect("attach");
    game.publish_entity(&zombie, &world, IVec2::new(200, 0)).expect("publish zombie");
    assert!(!game.senses.contains(&player, &zombie));

    move_to(&mut game, &zombie, IVec2::new(90, 0));
    assert!(game.senses.contains(&player, &zombie));

    // An unpublish drops it from every rollup.
    let mut vanish = Action::new(ActionKind::UnpublishEntity);
    vanish.target = Some(zombie.clone());
    game.enqueue(vanish);
    game.run_tick();
    assert!(!game.senses.contains(&player, &zombie));
}
