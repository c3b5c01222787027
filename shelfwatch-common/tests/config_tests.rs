//! Integration tests for configuration file discovery and layering
//!
//! Tests that manipulate XDG_CONFIG_HOME / HOME are marked #[serial] so they
//! run sequentially, not in parallel.

use serial_test::serial;
use shelfwatch_common::config::{
    load_toml_config, locate_config_file, DashboardConfig, OverlapPolicy, Overrides, TomlConfig,
};
use shelfwatch_common::Error;
use std::env;
use std::fs;
use std::io;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

const SAMPLE_TOML: &str = r#"
api_base_url = "https://inventory.example.com/PRD"
port = 6001
poll_interval_ms = 2500
request_timeout_ms = 5000
overlap_policy = "skip"
sse_capacity = 32

[logging]
level = "debug"
"#;

#[test]
fn test_load_full_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, SAMPLE_TOML).unwrap();

    let toml = load_toml_config(&path).unwrap();
    assert_eq!(toml.api_base_url.as_deref(), Some("https://inventory.example.com/PRD"));
    assert_eq!(toml.port, Some(6001));
    assert_eq!(toml.overlap_policy, Some(OverlapPolicy::Skip));
    assert_eq!(toml.sse_capacity, Some(32));
    assert_eq!(toml.logging.level, "debug");
}

#[test]
fn test_load_partial_toml_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "api_base_url = \"http://localhost:8080\"\n").unwrap();

    let toml = load_toml_config(&path).unwrap();
    assert!(toml.port.is_none());
    assert_eq!(toml.logging.level, "info");
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "port = \"not a number\"\n").unwrap();

    assert!(matches!(load_toml_config(&path), Err(Error::ConfigParse(_))));
}

#[test]
fn test_resolve_with_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dash.toml");
    fs::write(&path, SAMPLE_TOML).unwrap();

    let config = DashboardConfig::resolve(Overrides {
        config_path: Some(path.clone()),
        poll_interval_ms: Some(750),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.source.as_deref(), Some(path.as_path()));
    assert_eq!(config.api_base_url, "https://inventory.example.com/PRD");
    assert_eq!(config.port, 6001);
    assert_eq!(config.poll_interval_ms, 750);
    assert_eq!(config.request_timeout_ms, 5000);
    assert_eq!(config.overlap_policy, OverlapPolicy::Skip);
}

#[test]
fn test_explicit_missing_path_is_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    assert!(matches!(locate_config_file(Some(missing.as_path())), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_user_config_dir_is_discovered() {
    let dir = TempDir::new().unwrap();
    let app_dir = dir.path().join("shelfwatch");
    fs::create_dir_all(&app_dir).unwrap();
    fs::write(app_dir.join("config.toml"), SAMPLE_TOML).unwrap();

    let previous = env::var_os("XDG_CONFIG_HOME");
    env::set_var("XDG_CONFIG_HOME", dir.path());

    let found = locate_config_file(None);

    match previous {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }

    #[cfg(target_os = "linux")]
    assert_eq!(found.unwrap(), Some(app_dir.join("config.toml")));
    #[cfg(not(target_os = "linux"))]
    assert!(found.is_ok());
}

#[test]
#[serial]
fn test_resolve_without_any_file_uses_overrides() {
    let dir = TempDir::new().unwrap();
    let previous = env::var_os("XDG_CONFIG_HOME");
    env::set_var("XDG_CONFIG_HOME", dir.path());

    let result = DashboardConfig::resolve(Overrides {
        api_base_url: Some("http://127.0.0.1:9999".to_string()),
        ..Default::default()
    });

    match previous {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }

    // /etc/shelfwatch/config.toml may exist on a developer machine; only
    // assert on the override, which always wins.
    let config = result.unwrap();
    assert_eq!(config.api_base_url, "http://127.0.0.1:9999");
}

// =============================================================================
// Discovery logging
// =============================================================================

/// Log sink shared between the test and a scoped subscriber
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl<'a> MakeWriter<'a> for SharedBuffer {
    type Writer = BufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BufferWriter(Arc::clone(&self.0))
    }
}

impl io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` under a subscriber and return everything it logged
fn capture_logs<F: FnOnce()>(f: F) -> String {
    let sink = SharedBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(sink.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = sink.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

#[test]
fn test_resolve_defers_discovery_logging() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dash.toml");
    fs::write(&path, SAMPLE_TOML).unwrap();

    let mut resolved = None;
    let during_resolve = capture_logs(|| {
        resolved = Some(
            DashboardConfig::resolve(Overrides {
                config_path: Some(path.clone()),
                ..Default::default()
            })
            .unwrap(),
        );
    });
    assert!(during_resolve.is_empty(), "got {}", during_resolve);

    let config = resolved.unwrap();
    let reported = capture_logs(|| config.log_source());
    assert!(reported.contains("INFO"), "got {}", reported);
    assert!(reported.contains("Loaded configuration from"), "got {}", reported);
    assert!(reported.contains(&path.display().to_string()), "got {}", reported);
}

#[test]
fn test_missing_config_file_is_reported_as_warning() {
    let config = DashboardConfig::from_parts(
        TomlConfig::default(),
        Overrides {
            api_base_url: Some("http://127.0.0.1:9999".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert!(config.source.is_none());

    let reported = capture_logs(|| config.log_source());
    assert!(reported.contains("WARN"), "got {}", reported);
    assert!(reported.contains("No config file found"), "got {}", reported);
}
