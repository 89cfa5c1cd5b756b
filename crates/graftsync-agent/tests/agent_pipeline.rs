mod common;

use std::sync::Arc;

use common::{agent, json_path, RecordingRoute, Workspace};
use graftsync_agent::{Agent, AgentError};
use graftsync_hier::LocalFileSystemApi;
use graftsync_route::{ContentHash, SystemClock};

fn config_json(workspace: &Workspace, watch: bool) -> String {
    format!(
        r#"{{
            "storage": [{{
                "name": "data",
                "path": {},
                "filters": [{{ "rule": "exclude", "extension": "bin" }}]
            }}],
            "routing": {{ "log_route": false }},
            "watcher": {{ "enabled": {} }}
        }}"#,
        json_path(&workspace.data()),
        watch
    )
}

#[tokio::test]
async fn test_pool_paths_are_routed_with_snapshots() {
    let ws = Workspace::new();
    let config = ws.config("agent.json", &config_json(&ws, false));
    let route = Arc::new(RecordingRoute::default());
    let agent = agent(&config, route.clone());
    let running = agent.start().unwrap();

    let bin = ws.write("skip.bin", b"ignored");
    let txt = ws.write("notes/a.txt", b"hello");
    agent.pool().add_all([bin, txt]);

    assert!(route.wait_for("<data>:notes/a.txt").await, "{:?}", route.paths());
    running.stop().await;

    let handled = route.handled.lock();
    assert_eq!(handled.len(), 1);
    assert_eq!(handled[0].1, Some(ContentHash::of(b"hello")));
}

#[tokio::test]
async fn test_reserved_directory_is_never_routed() {
    let ws = Workspace::new();
    let config = ws.config("agent.json", &config_json(&ws, false));
    let route = Arc::new(RecordingRoute::default());
    let agent = agent(&config, route.clone());
    let running = agent.start().unwrap();

    let reserved = ws.write(".graftsync/state", b"private");
    let visible = ws.write("b.txt", b"visible");
    agent.pool().add(reserved);
    agent.pool().add(visible);

    assert!(route.wait_for("<data>:b.txt").await);
    running.stop().await;
    assert_eq!(route.paths(), vec!["<data>:b.txt".to_string()]);
}

#[tokio::test]
async fn test_missing_file_is_routed_without_snapshot() {
    let ws = Workspace::new();
    let config = ws.config("agent.json", &config_json(&ws, false));
    let route = Arc::new(RecordingRoute::default());
    let agent = agent(&config, route.clone());
    let running = agent.start().unwrap();

    let gone = ws.data().join("gone.txt");
    agent.pool().add(gone.to_str().unwrap());

    assert!(route.wait_for("<data>:gone.txt").await);
    running.stop().await;
    assert_eq!(route.handled.lock()[0].1, None);
}

#[tokio::test]
async fn test_watcher_feeds_pipeline() {
    let ws = Workspace::new();
    let config = ws.config("agent.json", &config_json(&ws, true));
    let route = Arc::new(RecordingRoute::default());
    let agent = agent(&config, route.clone());
    let running = agent.start().unwrap();
    assert_eq!(running.watched_roots(), 1);

    ws.write("watched.txt", b"from the watcher");

    assert!(route.wait_for("<data>:watched.txt").await, "{:?}", route.paths());
    running.stop().await;
}

#[test]
fn test_invalid_configuration_is_reported_whole() {
    let ws = Workspace::new();
    let config = ws.config(
        "agent.toml",
        r#"
[[storage]]
name = "data"
path = "relative/data"

[[storage.filters]]
glob = "test[!]"

[[storage.locations]]
path = "/abs"
graft = "/graftsync-test/other"
"#,
    );
    let result = Agent::new(
        &config,
        Arc::new(LocalFileSystemApi::new()),
        Vec::new(),
        Arc::new(SystemClock),
    );
    match result {
        Err(AgentError::InvalidConfiguration(messages)) => {
            assert_eq!(messages.len(), 3, "{messages:?}");
            assert!(messages[0].contains("absolute path required"));
            assert!(messages[1].contains("invalid glob 'test[!]' at position 4"));
            assert!(messages[2].contains("relative path required"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("configuration should be rejected"),
    }
}
