use sshfolio::config::ConfigError;
use sshfolio::content::placeholder;
use sshfolio::security::Admission;
use sshfolio::ssh::{LifecycleError, SessionState, event_channel};
use sshfolio::tui::{Command, Key, Model, Msg};
use sshfolio::{AuthGate, ConnectionGate, LimiterRegistry, PeerAddr, ServerConfig, load_tabs};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// Content loading tolerates a partially populated directory
#[test]
fn test_content_with_one_missing_file() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("welcome.md"), "# Hi\n\nWelcome **aboard**.").unwrap();
    std::fs::write(dir.path().join("about.md"), "About me").unwrap();
    std::fs::write(dir.path().join("future.md"), "- plans\n- more plans").unwrap();

    let tabs = load_tabs(dir.path());
    let names: Vec<_> = tabs.iter().map(|t| t.name.as_str()).collect();

    assert_eq!(names, ["Welcome", "About", "Projects", "Future"]);
    assert!(tabs[0].content.contains("aboard"));
    assert!(!tabs[0].content.contains("**"));
    assert_eq!(tabs[2].content, placeholder("Projects", "projects.md"));
    assert!(tabs[3].content.contains("plans"));
}

#[test]
fn test_config_from_variables() {
    let vars: HashMap<&str, &str> = [
        ("BIND_ADDR", "127.0.0.1"),
        ("PORT", "2022"),
        ("SSH_PASSWORD", "hunter2"),
        ("RATE_LIMIT", "5"),
        ("CONTENT_DIR", "/srv/portfolio"),
        ("HOST_KEY_PATH", ""),
    ]
    .into_iter()
    .collect();

    let config = ServerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
    assert_eq!(config.bind_addr().to_string(), "127.0.0.1:2022");
    assert_eq!(config.password, "hunter2");
    assert_eq!(config.max_per_minute.get(), 5);
    assert_eq!(config.content_dir.to_str(), Some("/srv/portfolio"));
    assert_eq!(config.host_key_path, ServerConfig::default().host_key_path);
    assert!(!config.uses_default_password());
}

#[test]
fn test_config_rejects_bad_values() {
    let zero = ServerConfig::from_lookup(|k| (k == "RATE_LIMIT").then(|| "0".to_string()));
    assert!(matches!(zero, Err(ConfigError::ZeroRateLimit)));

    let port = ServerConfig::from_lookup(|k| (k == "PORT").then(|| "ssh".to_string()));
    assert!(matches!(port, Err(ConfigError::Invalid { .. })));
}

/// Admission is decided per host, before any protocol bytes
#[tokio::test]
async fn test_gate_quota_per_host() {
    let registry = Arc::new(LimiterRegistry::new(NonZeroU32::new(2).unwrap()));
    let gate = ConnectionGate::new(registry.clone(), Duration::from_millis(5));

    let a: PeerAddr = "10.0.0.1:1".into();
    let b: PeerAddr = "10.0.0.2:1".into();

    assert!(gate.check(&a).is_allowed());
    assert!(gate.check(&a).is_allowed());
    assert!(matches!(gate.check(&a), Admission::Denied(_)));
    assert!(gate.check(&b).is_allowed());
    assert_eq!(registry.len(), 2);

    let (_client, server) = tokio::io::duplex(16);
    assert!(gate.screen(server, &a).await.is_none());

    registry.sweep();
    assert!(gate.check(&a).is_allowed());
}

#[test]
fn test_auth_accepts_any_user_with_secret() {
    let auth = AuthGate::new("s3cret");
    assert!(auth.check_credential("alice", "s3cret"));
    assert!(auth.check_credential("bob", "s3cret"));
    assert!(!auth.check_credential("alice", "s3cre"));
    assert!(!auth.check_credential("alice", ""));
    assert!(!format!("{auth:?}").contains("s3cret"));
}

#[test]
fn test_lifecycle_rejects_out_of_order_requests() {
    let mut state = SessionState::default();

    let (early, _rx) = event_channel();
    assert!(matches!(
        state.activate(early),
        Err(LifecycleError::InvalidTransition { .. })
    ));
    state.authenticate("alice").unwrap();
    let (tx, _rx) = event_channel();
    assert_eq!(state.activate(tx), Err(LifecycleError::PtyRequired));
    assert_eq!(state.to_string(), "closed");
}

/// Walks the viewer through a typical visit
#[test]
fn test_viewer_navigation_flow() {
    let dir = tempdir().unwrap();
    let long: String = (1..=120).map(|i| format!("line {i}\n\n")).collect();
    std::fs::write(dir.path().join("welcome.md"), long).unwrap();

    let mut model = Model::new(load_tabs(dir.path()), "alice-1");
    model.set_size(80, 24);
    assert!(model.view().contains("Press any key"));

    assert_eq!(model.update(Msg::Key(Key::Enter)), Command::None);
    assert!(model.view().contains("line 1"));

    model.update(Msg::Key(Key::Char('G')));
    assert!(model.view().contains("line 120"));
    assert!(model.view().contains("100%"));

    model.update(Msg::Key(Key::Tab));
    assert_eq!(model.active_tab(), 1);
    assert!(model.view().contains("coming soon"));

    model.update(Msg::Resize { width: 60, height: 20 });
    assert_eq!(model.view().lines().count(), 20);
    assert_eq!(model.update(Msg::Key(Key::Char('q'))), Command::Quit);
}
