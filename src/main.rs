use data_runtime::configs::engine;
use glam::IVec2;
use gridspire::server::Session;
use server_core::Game;
use server_core::actions::{Action, ActionKind};
use server_core::entity::Grant;

fn main() -> anyhow::Result<()> {
    // Developer-friendly default logging (info+) unless RUST_LOG overrides
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .try_init();

    let cfg = engine::load_default()?;
    let mut session = Session::new(Game::new(cfg));
    session.game.abilities = data_runtime::abilities::load_default()?;

    // Minimal local loop: one client, one world, one healer.
    let world = session.game.create_world("overworld");
    let paladin = session.game.spawn_entity("paladin");
    session
        .game
        .entity_mut(&paladin)
        .expect("just spawned")
        .learn(Grant {
            ability: "Heal".into(),
            granted_by: None,
            using: None,
        });
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

    let response =
        session.handle_message(r#"{"type":"CONNECTION","client_id":"local","desired_name":"ash"}"#)?;
    log::info!("connected: {}", response.to_json());
    let rx = session.attach_channel("local").expect("client registered");
    let player = session
        .game
        .player_by_client("local")
        .expect("just connected")
        .id
        .clone();
    session.game.own_entity(&player, &paladin)?;

    let cast = format!(
        r#"{{"type":"CAST","caster_type":"entity","client_id":"local","caster_id":"{paladin}","ability_name":"Heal"}}"#
    );
    let response = session.handle_message(&cast)?;
    log::info!("cast: {}", response.to_json());
    session.game.run_tick();

    for msg in rx.drain_msgs()? {
        log::info!("client <- {}", msg.to_json());
    }
    let hp = session
        .game
        .entity(&paladin)
        .and_then(|e| e.property("HP"))
        .map(|p| p.current);
    log::info!("paladin HP after heal: {hp:?}");
    Ok(())
}
