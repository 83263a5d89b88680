use data_runtime::configs::engine::EngineCfg;
use glam::IVec2;
use gridspire::server::Session;
use net_core::message::ServerMsg;
use server_core::Game;
use server_core::actions::{Action, ActionKind};
use server_core::entity::Grant;

/// End-to-end loopback:
/// - Connect a client, bind it to a fresh player
/// - Publish an owned healer, cast through the envelope
/// - Drain the tick and assert the ACTION frame reaches the client channel
#[test]
fn e2e_connect_cast_and_receive_broadcast() {
    let mut session = Session::new(Game::new(EngineCfg::default()));
    let world = session.game.create_world("overworld");
    let paladin = session.game.spawn_entity("paladin");
    let mut add_hp = Action::new(ActionKind::AddProperty {
        property: "HP".into(),
        current: 10.0,
        min: 0.0,
        max: 20.0,
    });
    add_hp.target = Some(paladin.clone());
    session.game.enqueue(add_hp);
    let mut publish = Action::new(ActionKind::PublishEntity {
        world,
        position: IVec2::ZERO,
    });
    publish.target = Some(paladin.clone());
    session.game.enqueue(publish);
    session.game.run_tick();
    session.game.entity_mut(&paladin).expect("entity").learn(Grant {
        ability: "Heal".into(),
        granted_by: None,
        using: None,
    });

    let response = session
        .handle_message(r#"{"type":"CONNECTION","client_id":"c1","desired_name":"ash"}"#)
        .expect("connect");
    let ServerMsg::ConnectionResponse { ok: true, player_id: Some(pid), .. } = response else {
        panic!("connection refused: {response:?}");
    };
    let rx = session.attach_channel("c1").expect("channel");
    session.game.own_entity(&pid, &paladin).expect("own");
    // Flush ownership-era entries so the cast is the only traffic.
    session.game.broadcast_all();
    let _ = rx.drain_msgs().expect("drain setup");

    let cast = format!(
        r#"{{"type":"CAST","caster_type":"entity","client_id":"c1","caster_id":"{paladin}","ability_name":"Heal"}}"#
    );
    let ServerMsg::CastResponse { error } = session.handle_message(&cast).expect("cast") else {
        panic!("wrong response type");
    };
    assert!(error.is_empty(), "cast rejected: {error}");
    session.game.run_tick();

    let frames = rx.drain_msgs().expect("drain");
    assert_eq!(frames.len(), 1);
    let ServerMsg::Action { action } = &frames[0] else {
        panic!("expected ACTION frame");
    };
    assert_eq!(action.action_type, "property_adjustment");
    assert!(action.applied);
    assert_eq!(
        session
            .game
            .entity(&paladin)
            .and_then(|e| e.property("HP"))
            .map(|p| p.current),
        Some(15.0)
    );
}
