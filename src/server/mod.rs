//! Session layer: client registry and envelope message handling.
//!
//! Validation failures become human-readable error strings in the response;
//! malformed payloads abort the message with an error. Neither touches game
//! state.

use net_core::channel::{self, Rx};
use net_core::message::{ClientMsg, ServerMsg};
use server_core::Game;
use server_core::ability::CastArgs;

pub struct Session {
    pub game: Game,
}

impl Session {
    #[must_use]
    pub fn new(game: Game) -> Self {
        Self { game }
    }

    /// Handle one envelope message; deserialization failure aborts it.
    pub fn handle_message(&mut self, json: &str) -> anyhow::Result<ServerMsg> {
        let msg = ClientMsg::from_json(json)?;
        Ok(match msg {
            ClientMsg::Connection {
                client_id,
                desired_name,
            } => self.handle_connection(&client_id, desired_name.as_deref()),
            ClientMsg::Cast {
                caster_type,
                client_id,
                caster_id,
                ability_name,
                using,
                granted_by,
                target,
                params,
            } => ServerMsg::CastResponse {
                error: self.handle_cast(
                    &caster_type,
                    &client_id,
                    &caster_id,
                    &ability_name,
                    CastArgs {
                        using,
                        granted_by,
                        target,
                        params,
                    },
                ),
            },
        })
    }

    fn handle_connection(&mut self, client_id: &str, desired_name: Option<&str>) -> ServerMsg {
        if let Some(p) = self.game.player_by_client(client_id) {
            return ServerMsg::ConnectionResponse {
                ok: true,
                player_id: Some(p.id.clone()),
                error: None,
            };
        }
        let name = desired_name.unwrap_or(client_id);
        let pid = self.game.create_player(name);
        self.game
            .player_mut(&pid)
            .expect("just created")
            .client_id = Some(client_id.to_string());
        log::info!("client {client_id} connected as player {pid}");
        ServerMsg::ConnectionResponse {
            ok: true,
            player_id: Some(pid),
            error: None,
        }
    }

    /// Empty return means the cast was accepted and queued.
    fn handle_cast(
        &mut self,
        caster_type: &str,
        client_id: &str,
        caster_id: &str,
        ability_name: &str,
        args: CastArgs,
    ) -> String {
        if caster_type != "entity" {
            return format!("unsupported caster type: {caster_type}");
        }
        let Some(player_id) = self.game.player_by_client(client_id).map(|p| p.id.clone()) else {
            return format!("unknown client: {client_id}");
        };
        if self.game.entity(caster_id).is_none() {
            return format!("unknown entity: {caster_id}");
        }
        let owns = self
            .game
            .player(&player_id)
            .is_some_and(|p| p.owns(caster_id));
        if !owns {
            return format!("player does not own entity {caster_id}");
        }
        match self.game.cast(caster_id, ability_name, args) {
            Ok(_) => String::new(),
            Err(e) => e,
        }
    }

    /// Wire a player's broadcast queue to an in-proc channel; the returned
    /// receiver is the client half.
    pub fn attach_channel(&mut self, client_id: &str) -> Option<Rx> {
        let pid = self.game.player_by_client(client_id)?.id.clone();
        let (tx, rx) = channel::channel();
        self.game.player_mut(&pid)?.tx = Some(tx);
        Some(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_runtime::configs::engine::EngineCfg;

    fn session() -> Session {
        Session::new(Game::new(EngineCfg::default()))
    }

    #[test]
    fn connection_creates_player_once() {
        let mut s = session();
        let r1 = s
            .handle_message(r#"{"type":"CONNECTION","client_id":"c1","desired_name":"ash"}"#)
            .expect("handle");
        let ServerMsg::ConnectionResponse { ok, player_id, .. } = r1 else {
            panic!("wrong response");
        };
        assert!(ok);
        let pid = player_id.expect("player id");
        // Reconnecting yields the same player.
        let r2 = s
            .handle_message(r#"{"type":"CONNECTION","client_id":"c1"}"#)
            .expect("handle");
        let ServerMsg::ConnectionResponse { player_id, .. } = r2 else {
            panic!("wrong response");
        };
        assert_eq!(player_id.as_deref(), Some(pid.as_str()));
        assert_eq!(s.game.players.len(), 1);
        assert_eq!(s.game.player(&pid).map(|p| p.name.as_str()), Some("ash"));
    }

    #[test]
    fn cast_is_validated_against_ownership() {
        let mut s = session();
        s.handle_message(r#"{"type":"CONNECTION","client_id":"c1"}"#)
            .expect("connect");
        let eid = s.game.spawn_entity("paladin");
        let msg = format!(
            r#"{{"type":"CAST","caster_type":"entity","client_id":"c1","caster_id":"{eid}","ability_name":"Heal"}}"#
        );
        let ServerMsg::CastResponse { error } = s.handle_message(&msg).expect("handle") else {
            panic!("wrong response");
        };
        assert!(error.contains("does not own"), "got: {error}");
        // Unknown client and unknown entity give distinct reasons.
        let msg = format!(
            r#"{{"type":"CAST","caster_type":"entity","client_id":"ghost","caster_id":"{eid}","ability_name":"Heal"}}"#
        );
        let ServerMsg::CastResponse { error } = s.handle_message(&msg).expect("handle") else {
            panic!("wrong response");
        };
        assert!(error.contains("unknown client"));
        let msg = r#"{"type":"CAST","caster_type":"entity","client_id":"c1","caster_id":"nope","ability_name":"Heal"}"#;
        let ServerMsg::CastResponse { error } = s.handle_message(msg).expect("handle") else {
            panic!("wrong response");
        };
        assert!(error.contains("unknown entity"));
    }

    #[test]
    fn malformed_payload_aborts_the_message() {
        let mut s = session();
        assert!(s.handle_message("{not json").is_err());
        assert!(s.handle_message(r#"{"type":"CAST"}"#).is_err());
    }
}
