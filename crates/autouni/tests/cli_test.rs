//! Integration tests for the `autouni` CLI binary.
//!
//! Argument parsing, help output, completions, and config handling run
//! without a backend. The session flow runs against a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `autouni` binary with env isolation.
///
/// Clears all `AUTOUNI_*` env vars and points config/data directories at
/// `home` so tests never touch the user's real configuration.
fn autouni_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("autouni");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("AUTOUNI_PROFILE")
        .env_remove("AUTOUNI_API_URL")
        .env_remove("AUTOUNI_WS_URL")
        .env_remove("AUTOUNI_OUTPUT")
        .env_remove("AUTOUNI_INSECURE")
        .env_remove("AUTOUNI_TIMEOUT")
        .env_remove("AUTOUNI_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn user() -> serde_json::Value {
    json!({ "id": "u1", "email": "ana@campus.edu", "name": "Ana", "role": "TECHNICIAN" })
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = autouni_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    autouni_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("devices")
            .and(predicate::str::contains("buildings"))
            .and(predicate::str::contains("energy"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("login")),
    );
}

#[test]
fn version_flag() {
    let home = tempfile::tempdir().unwrap();
    autouni_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("autouni"));
}

#[test]
fn devices_subcommands_exist() {
    let home = tempfile::tempdir().unwrap();
    autouni_cmd(home.path())
        .args(["devices", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("list")
                .and(predicate::str::contains("get"))
                .and(predicate::str::contains("stats"))
                .and(predicate::str::contains("control"))
                .and(predicate::str::contains("bulk")),
        );
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    autouni_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn completions_bash() {
    let home = tempfile::tempdir().unwrap();
    autouni_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn invalid_output_format() {
    let home = tempfile::tempdir().unwrap();
    let output = autouni_cmd(home.path())
        .args(["--output", "xml", "devices", "list"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("invalid") || text.contains("possible values"));
}

#[test]
fn devices_list_without_config_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    autouni_cmd(home.path())
        .args(["devices", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("config init"));
}

#[test]
fn unknown_profile_is_reported() {
    let home = tempfile::tempdir().unwrap();
    autouni_cmd(home.path())
        .args(["--profile", "nowhere", "whoami"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn whoami_without_session_is_auth_error() {
    let home = tempfile::tempdir().unwrap();
    autouni_cmd(home.path())
        .args(["--api-url", "http://127.0.0.1:9", "whoami"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("autouni login"));
}

#[test]
fn energy_level_without_id_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    autouni_cmd(home.path())
        .args(["--api-url", "http://127.0.0.1:9", "energy", "stats", "--level", "room"])
        .assert()
        .failure();
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn config_show_without_file_succeeds() {
    let home = tempfile::tempdir().unwrap();
    autouni_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success();
}

#[test]
fn config_init_then_show() {
    let home = tempfile::tempdir().unwrap();
    autouni_cmd(home.path())
        .args([
            "config",
            "init",
            "--name",
            "lab",
            "--api-url",
            "http://lab.campus.edu:3000",
            "--email",
            "ana@campus.edu",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("Created profile 'lab'"));

    autouni_cmd(home.path())
        .args(["-o", "json", "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("http://lab.campus.edu:3000")
                .and(predicate::str::contains("ana@campus.edu")),
        );
}

#[test]
fn config_path_points_into_config_home() {
    let home = tempfile::tempdir().unwrap();
    autouni_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ── Session flow against a mock backend ─────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn login_then_list_devices_as_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "email": "ana@campus.edu", "password": "s3cret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": user(),
            "accessToken": "acc-1",
            "refreshToken": "ref-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(header("authorization", "Bearer acc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "d2", "roomId": "r1", "name": "Projector", "type": "PROJECTOR", "status": "STANDBY" },
            { "id": "d1", "roomId": "r1", "name": "Ceiling light", "type": "LIGHT", "status": "ON" }
        ])))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let home_path = home.path().to_path_buf();
    let uri = server.uri();

    let output = tokio::task::spawn_blocking(move || {
        autouni_cmd(&home_path)
            .env("AUTOUNI_PASSWORD", "s3cret")
            .args(["--api-url", &uri, "-o", "json", "login", "--email", "ana@campus.edu"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ana@campus.edu"));

        autouni_cmd(&home_path)
            .args(["--api-url", &uri, "-o", "json", "devices", "list"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    // sorted by room, then name
    assert_eq!(listed[0]["name"], "Ceiling light");
    assert_eq!(listed[1]["status"], "STANDBY");
    // never seen, so not online
    assert_eq!(listed[0]["online"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn bulk_partial_failure_exits_nonzero() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": user(),
            "accessToken": "acc-1",
            "refreshToken": "ref-1"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "a", "name": "A", "type": "LIGHT", "status": "ON" },
            { "id": "b", "name": "B", "type": "LIGHT", "status": "ON" }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/devices/bulk-control"))
        .and(body_json(json!({ "deviceIds": ["a", "b"], "command": "off" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "affectedDevices": 1,
            "failedDevices": ["b"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let home_path = home.path().to_path_buf();
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        autouni_cmd(&home_path)
            .env("AUTOUNI_PASSWORD", "pw")
            .args(["--api-url", &uri, "-q", "login", "--email", "ana@campus.edu"])
            .assert()
            .success();

        autouni_cmd(&home_path)
            .args(["--api-url", &uri, "devices", "bulk", "off", "a", "b"])
            .assert()
            .code(6)
            .stdout(predicate::str::contains("1 of 2 succeeded"))
            .stderr(predicate::str::contains("b"));
    })
    .await
    .unwrap();
}
