use net_core::channel;
use net_core::message::{ClientMsg, ServerMsg};
use net_core::wire::WireAction;

#[test]
fn cast_envelope_roundtrip() {
    let msg = ClientMsg::Cast {
        caster_type: "entity".into(),
        client_id: "c1".into(),
        caster_id: "e1".into(),
        ability_name: "Heal".into(),
        using: None,
        granted_by: Some("trainer".into()),
        target: Some("e2".into()),
        params: Some(serde_json::json!({"power": 2})),
    };
    let back = ClientMsg::from_json(&msg.to_json()).expect("decode");
    assert_eq!(msg, back);
}

#[test]
fn action_frames_survive_the_channel() {
    let (tx, rx) = channel::channel();
    let mut w = WireAction::bare("move");
    w.caster = Some("e1".into());
    w.tags = vec!["movement".into()];
    w.data = serde_json::json!({"to": [4, 4]});
    assert!(tx.send_msg(&ServerMsg::Action { action: w.clone() }));
    let frames = rx.drain_msgs().expect("drain");
    assert_eq!(frames, vec![ServerMsg::Action { action: w }]);
}

#[test]
fn action_missing_required_fields_aborts() {
    // `permitted` is required on the wire.
    let raw = r#"{"type":"ACTION","action":{"action_type":"move","tags":[],"breadcrumbs":[]}}"#;
    assert!(ServerMsg::from_json(raw).is_err());
}
