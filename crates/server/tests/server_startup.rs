//! Boots the real binary and exercises the HTTP surface end to end.

use std::io::Write;
use std::net::TcpListener;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::{NamedTempFile, TempDir};
use tokio::time::sleep;

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn config_with_db(port: u16, db_path: &str) -> String {
    format!(
        r#"
[processor]
base_url = "http://127.0.0.1:1"

[server]
host = "127.0.0.1"
port = {}

[database]
path = "{}"
"#,
        port, db_path
    )
}

async fn spawn_server(config_path: &std::path::Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_bindery"))
        .env("BINDERY_CONFIG", config_path)
        .env("RUST_LOG", "error")
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

async fn start_test_server() -> (u16, tokio::process::Child, TempDir, NamedTempFile) {
    let port = get_available_port();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let config_content = config_with_db(port, db_path.to_str().unwrap());

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let server = spawn_server(temp_file.path()).await;

    assert!(
        wait_for_server(port, 100).await,
        "Server did not start in time"
    );

    (port, server, temp_dir, temp_file)
}

#[tokio::test]
async fn test_server_boots_and_serves_health() {
    let (port, _server, _dir, _config) = start_test_server().await;

    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/api/health", port))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_config_endpoint_does_not_echo_processor_url() {
    let (port, _server, _dir, _config) = start_test_server().await;

    let client = Client::new();
    let body: Value = client
        .get(format!("http://127.0.0.1:{}/api/config", port))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["processor"]["configured"], true);
    assert!(body["processor"]["base_url"].is_null());
}

#[tokio::test]
async fn test_project_and_task_round_trip() {
    let (port, _server, _dir, _config) = start_test_server().await;
    let base = format!("http://127.0.0.1:{}/api", port);
    let client = Client::new();

    // Create a project
    let project: Value = client
        .post(format!("{}/projects", base))
        .json(&json!({ "name": "Field Notes" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let project_id = project["id"].as_str().unwrap();
    assert_eq!(project["current_stage"], "upload");

    // Queue a parse task. The project has no documents, so it completes
    // without touching the (unreachable) processing service.
    let task: Value = client
        .post(format!("{}/tasks", base))
        .json(&json!({ "project_id": project_id, "stage": "parse" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let task_id = task["id"].as_str().unwrap();

    let mut completed = false;
    for _ in 0..100 {
        let task: Value = client
            .get(format!("{}/tasks/{}", base, task_id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if task["status"] == "completed" {
            completed = true;
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert!(completed, "parse task never completed");

    // The empty parse still advances the project out of upload
    let project: Value = client
        .get(format!("{}/projects/{}", base, project_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(project["current_stage"], "clean");
}

#[tokio::test]
async fn test_unknown_task_is_404() {
    let (port, _server, _dir, _config) = start_test_server().await;

    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/api/tasks/nope", port))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}
