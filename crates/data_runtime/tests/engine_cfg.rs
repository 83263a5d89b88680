use data_runtime::configs::engine;

#[test]
fn shipped_engine_config_matches_defaults() {
    let cfg = engine::load_default().expect("load");
    assert_eq!(cfg.view_distance, 6);
    assert_eq!(cfg.inactive_view_distance, 1);
    assert_eq!(cfg.listen_distance, 25);
}

#[test]
fn abilities_load_includes_builtins_and_file_entries() {
    let specs = data_runtime::abilities::load_default().expect("load");
    assert!(specs.iter().any(|s| s.name == "Heal"));
    assert!(specs.iter().any(|s| s.name == "Smite"));
}
