use data_runtime::configs::engine::EngineCfg;
use glam::IVec2;
use server_core::Game;
use server_core::actions::{Action, ActionKind};
use server_core::component::{Behavior, Component, ScopeSpec};
use server_core::{ContainerId, ScopeKind};

fn setup() -> (Game, String, String, String) {
    let mut game = Game::new(EngineCfg::default());
    let world = game.create_world("crypt");
    let paladin = game.spawn_entity("paladin");
    let zombie = game.spawn_entity("zombie");
    game.publish_entity(&paladin, &world, IVec2::ZERO).expect("publish");
    game.publish_entity(&zombie, &world, IVec2::new(2, 0)).expect("publish");
    let mut add_hp = Action::new(ActionKind::AddProperty {
        property: "HP".into(),
        current: 10.0,
        min: 0.0,
        max: 20.0,
    });
    add_hp.target = Some(paladin.clone());
    add_hp.execute(&mut game, false);
    (game, world, paladin, zombie)
}

/// A world-scope modifier on the target denies a hostile action; state is
/// untouched but observers still hear about the attempt.
#[test]
fn world_scope_aura_denies_attack() {
    let (mut game, world, paladin, zombie) = setup();
    let aura = Component::new(
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
    );
    let aura_id = aura.id.clone();
    game.add_component(ContainerId::entity(&paladin), aura).expect("attach");
    // Modifier is wired on the world container, back-referenced at home.
    let wc = game.catalog(&ContainerId::world(&world)).expect("world catalog");
    assert!(
        wc.subscribers(server_core::Role::Modifier)
            .iter()
            .any(|(c, _)| *c == aura_id)
    );

    let p1 = game.create_player("ash");
    let p2 = game.create_player("morgan");
    game.own_entity(&p1, &paladin).expect("own");
    game.own_entity(&p2, &zombie).expect("own");
    game.player_mut(&p1).expect("p1").outgoing.clear();
    game.player_mut(&p2).expect("p2").outgoing.clear();

    let mut attack = Action::new(ActionKind::PropertyAdjustment {
        property: "HP".into(),
        amount: -5.0,
    });
    attack.caster = Some(zombie.clone());
    attack.target = Some(paladin.clone());
    attack.tags.push("attack".into());
    game.enqueue(attack);
    game.run_tick();

    let hp = game
        .entity(&paladin)
        .and_then(|e| e.property("HP"))
        .expect("HP");
    assert_eq!(hp.current, 10.0, "denied attack must not change state");

    for pid in [&p1, &p2] {
        let outgoing = &game.player(pid).expect("player").outgoing;
        assert_eq!(outgoing.len(), 1, "both sides hear the attempt");
        let wire = &outgoing[0];
        assert!(!wire.permitted);
        assert!(!wire.applied);
        assert_eq!(
            wire.deciding_permission
                .as_ref()
                .and_then(|p| p.message.as_deref()),
            Some("protected")
        );
    }
}

/// The aura only guards its own entity: attacks on others pass.
#[test]
fn aura_does_not_guard_bystanders() {
    let (mut game, _, paladin, zombie) = setup();
    let aura = Component::new(
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
    );
    game.add_component(ContainerId::entity(&paladin), aura).expect("attach");
    let mut add_hp = Action::new(ActionKind::AddProperty {
        property: "HP".into(),
        current: 10.0,
        min: 0.0,
        max: 20.0,
    });
    add_hp.target = Some(zombie.clone());
    add_hp.execute(&mut game, false);

    let mut attack = Action::new(ActionKind::PropertyAdjustment {
        property: "HP".into(),
        amount: -5.0,
    });
    attack.caster = Some(paladin.clone());
    attack.target = Some(zombie.clone());
    attack.tags.push("attack".into());
    attack.execute(&mut game, false);
    assert!(attack.permitted);
    let hp = game
        .entity(&zombie)
        .and_then(|e| e.property("HP"))
        .expect("HP");
    assert_eq!(hp.current, 5.0);
}
