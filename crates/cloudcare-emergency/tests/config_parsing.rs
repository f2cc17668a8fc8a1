use std::{env, fs};

use cloudcare_core::events::DeliveryMode;
use cloudcare_emergency::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    // Create a temporary TOML configuration file
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("cloudcare.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8014
body_limit_bytes = 4096

[logging]
level = "debug"

[cors]
allowed_origins = ["http://localhost:3000", "https://dashboard.cloudcare.test"]

[emergency]
keepalive_secs = 15
delivery = "shared"

[[bootstrap.patients]]
patient_id = "P-1001"
name = "Jane Doe"

[[bootstrap.hospitals]]
hospital_id = "H-1"
name = "City General"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8014);
    assert_eq!(cfg.logging.level.to_ascii_lowercase(), "debug");
    assert_eq!(cfg.cors.allowed_origins.len(), 2);
    assert_eq!(cfg.emergency.keepalive_secs, 15);
    assert_eq!(cfg.emergency.delivery, DeliveryMode::Shared);
    assert_eq!(cfg.bootstrap.patients[0].patient_id, "P-1001");
    assert!(!cfg.bootstrap.patients[0].emergency_flag);
    assert_eq!(cfg.bootstrap.hospitals[0].name, "City General");

    // 2) Env override should win over file
    unsafe {
        env::set_var("CLOUDCARE__EMERGENCY__KEEPALIVE_SECS", "7");
        env::set_var("CLOUDCARE__EMERGENCY__DELIVERY", "fanout");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.emergency.keepalive_secs, 7);
    assert_eq!(cfg_env.emergency.delivery, DeliveryMode::Fanout);
    // cleanup env vars
    unsafe {
        env::remove_var("CLOUDCARE__EMERGENCY__KEEPALIVE_SECS");
        env::remove_var("CLOUDCARE__EMERGENCY__DELIVERY");
    }

    // 3) Invalid config fails validation
    let bad = toml_content.replace("keepalive_secs = 15", "keepalive_secs = 0");
    fs::write(&path, bad).expect("write toml");
    let err = load_config(path.to_str()).expect_err("zero keepalive must be rejected");
    assert!(err.contains("keepalive_secs"));

    // 4) Missing file falls back to defaults
    let missing = dir.path().join("missing.toml");
    let cfg_default = load_config(missing.to_str()).expect("defaults");
    assert_eq!(cfg_default.server.port, 8004);
    assert_eq!(cfg_default.emergency.keepalive_secs, 30);
}

#[test]
fn default_config_serializes_to_loadable_toml() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("cloudcare.toml");

    let rendered = toml::to_string(&cloudcare_emergency::AppConfig::default()).expect("toml");
    fs::write(&path, rendered).expect("write toml");

    let cfg = load_config(path.to_str()).expect("round-trip config");
    assert_eq!(cfg.server.port, 8004);
    assert_eq!(cfg.cors.allowed_origins, vec!["http://localhost:3000"]);
}
