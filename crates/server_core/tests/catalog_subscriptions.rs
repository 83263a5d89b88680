use data_runtime::configs::engine::EngineCfg;
use glam::IVec2;
use server_core::component::{Behavior, Component, ScopeSpec};
use server_core::{ContainerId, Game, Role, ScopeKind};

fn aura() -> Component {
    Component::new(
        "AuraOfProtection",
        Behavior::ProtectiveAura {
            priority: 5,
            message: "protected".into(),
            against: "attack".into(),
        },
        ScopeSpec {
            modifier: Some(ScopeKind::World),
            ..ScopeSpec::default()
        },
    )
}

/// For every subscription on catalog A pointing at container B there is a
/// matching subscriber entry on B.
fn assert_symmetric(game: &Game, home: &ContainerId) {
    let cat = game.catalog(home).expect("home catalog");
    for sub in &cat.subscriptions {
        let remote = game.catalog(&sub.to).expect("remote catalog");
        assert!(
            remote
                .subscribers(sub.role)
                .iter()
                .any(|(c, h)| *c == sub.component && h == home),
            "dangling subscription {sub:?}"
        );
    }
}

#[test]
fn published_entity_wires_outward_and_unpublish_restores() {
    let mut game = Game::new(EngineCfg::default());
    let world = game.create_world("crypt");
    let paladin = game.spawn_entity("paladin");
    game.publish_entity(&paladin, &world, IVec2::ZERO).expect("publish");
    let c = aura();
    let cid = c.id.clone();
    let home = ContainerId::entity(&paladin);
    game.add_component(home.clone(), c).expect("attach");

    let wc = game.catalog(&ContainerId::world(&world)).expect("world");
    assert!(wc.subscribers(Role::Modifier).iter().any(|(c, _)| *c == cid));
    assert_symmetric(&game, &home);

    // Unpublish: remote entries vanish, the component falls back to its own
    // catalog so local-only listeners still fire.
    game.unpublish_entity(&paladin).expect("unpublish");
    let wc = game.catalog(&ContainerId::world(&world)).expect("world");
    assert!(wc.subscribers(Role::Modifier).is_empty());
    let home_cat = game.catalog(&home).expect("home");
    assert!(home_cat.subscriptions.is_empty());
    assert!(
        home_cat
            .subscribers(Role::Modifier)
            .iter()
            .any(|(c, _)| *c == cid)
    );

    // Republish restores the outward wiring.
    game.publish_entity(&paladin, &world, IVec2::ZERO).expect("republish");
    let wc = game.catalog(&ContainerId::world(&world)).expect("world");
    assert!(wc.subscribers(Role::Modifier).iter().any(|(c, _)| *c == cid));
    assert_symmetric(&game, &home);
}

#[test]
fn unpublished_parent_falls_back_to_local() {
    let mut game = Game::new(EngineCfg::default());
    let paladin = game.spawn_entity("paladin");
    let home = ContainerId::entity(&paladin);
    let c = aura();
    let cid = c.id.clone();
    game.add_component(home.clone(), c).expect("attach");
    let cat = game.catalog(&home).expect("home");
    assert!(cat.subscriptions.is_empty());
    assert!(cat.subscribers(Role::Modifier).iter().any(|(c, _)| *c == cid));
}

#[test]
fn duplicate_component_id_is_rejected() {
    let mut game = Game::new(EngineCfg::default());
    let paladin = game.spawn_entity("paladin");
    let home = ContainerId::entity(&paladin);
    let c = aura();
    let dup = c.clone();
    game.add_component(home.clone(), c).expect("first attach");
    assert!(game.add_component(home, dup).is_err());
}

#[test]
fn remove_component_clears_both_directions() {
    let mut game = Game::new(EngineCfg::default());
    let world = game.create_world("crypt");
    let paladin = game.spawn_entity("paladin");
    game.publish_entity(&paladin, &world, IVec2::ZERO).expect("publish");
    let home = ContainerId::entity(&paladin);
    let c = aura();
    let cid = c.id.clone();
    game.add_component(home.clone(), c).expect("attach");
    game.remove_component(&home, &cid).expect("detach");
    let wc = game.catalog(&ContainerId::world(&world)).expect("world");
    assert!(wc.subscribers(Role::Modifier).is_empty());
    let cat = game.catalog(&home).expect("home");
    assert!(cat.all.is_empty());
    assert!(cat.subscriptions.is_empty());
}

#[test]
fn clear_catalog_is_symmetric_teardown() {
    let mut game = Game::new(EngineCfg::default());
    let world = game.create_world("crypt");
    let paladin = game.spawn_entity("paladin");
    game.publish_entity(&paladin, &world, IVec2::ZERO).expect("publish");
    let home = ContainerId::entity(&paladin);
    game.add_component(home.clone(), aura()).expect("attach one");
    let eyes = Component::new(
        "Eyes",
        Behavior::Sight,
        ScopeSpec {
            reacter: Some(ScopeKind::World),
            ..ScopeSpec::default()
        },
    );
    game.add_component(home.clone(), eyes).expect("attach two");
    game.clear_catalog(&home).expect("clear");
    let cat = game.catalog(&home).expect("home");
    assert!(cat.all.is_empty());
    assert!(cat.subscriptions.is_empty());
    let wc = game.catalog(&ContainerId::world(&world)).expect("world");
    for role in Role::ALL {
        assert!(wc.subscribers(role).is_empty());
    }
}

#[test]
fn destroyed_entity_leaves_no_references() {
    let mut game = Game::new(EngineCfg::default());
    let world = game.create_world("crypt");
    let player = game.create_player("ash");
    let scout = game.spawn_entity("scout");
    let zombie = game.spawn_entity("zombie");
    game.publish_entity(&scout, &world, IVec2::ZERO).expect("publish");
    game.publish_entity(&zombie, &world, IVec2::new(1, 0)).expect("publish");
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
    game.senses.add(&eyes_id, &zombie);
    assert!(game.senses.contains(&player, &zombie));

    game.destroy_entity(&zombie).expect("destroy");
    assert!(game.entity(&zombie).is_none());
    assert!(!game.senses.contains(&player, &zombie));
    assert!(
        game.world(&world)
            .expect("world")
            .chunks_indexing(&zombie)
            .is_empty()
    );

    // Destroying the sensor's entity also unhooks the world subscription.
    game.destroy_entity(&scout).expect("destroy scout");
    let wc = game.catalog(&ContainerId::world(&world)).expect("world");
    for role in Role::ALL {
        assert!(wc.subscribers(role).is_empty());
    }
    assert!(game.player(&player).expect("player").entities.is_empty());
}
