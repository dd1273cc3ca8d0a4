//! `playground plugin` end to end against a mock API server.
//!
//! ## Exit Codes
//! - 0: Success
//! - 1: Runtime failure (configuration, cluster access, remote errors)
//! - 2: Usage error

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::{Value as JsonValue, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const OBJECT_PATH: &str = "/api/v1/namespaces/kube-system/configmaps/playground-plugin-installer-tracker";
const COLLECTION_PATH: &str = "/api/v1/namespaces/kube-system/configmaps";

/// Create a playground command with an isolated PLAYGROUND_HOME.
fn playground_command(home: &Path) -> Result<assert_cmd::Command> {
    let mut cmd = assert_cmd::Command::cargo_bin("playground")?;
    cmd.env("PLAYGROUND_HOME", home)
        .env_remove("KUBECONFIG")
        .env_remove("LOG_LEVEL")
        .env_remove("RUST_LOG")
        .arg("--no-color");
    Ok(cmd)
}

fn write_kubeconfig(dir: &Path, server: &str) -> std::io::Result<PathBuf> {
    let path = dir.join("kubeconfig");
    fs::write(
        &path,
        format!(
            r#"apiVersion: v1
kind: Config
current-context: test
clusters:
  - name: test
    cluster:
      server: {server}
contexts:
  - name: test
    context:
      cluster: test
      user: tester
users:
  - name: tester
    user:
      token: test-token
"#
        ),
    )?;
    Ok(path)
}

fn configmap(version: &str, data: JsonValue) -> JsonValue {
    json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": "playground-plugin-installer-tracker",
            "namespace": "kube-system",
            "resourceVersion": version,
        },
        "data": data,
    })
}

fn echo_with_version(version: &'static str) -> impl Fn(&Request) -> ResponseTemplate {
    move |req: &Request| {
        let mut body: JsonValue = serde_json::from_slice(&req.body).unwrap_or_default();
        body["metadata"]["resourceVersion"] = json!(version);
        ResponseTemplate::new(200).set_body_json(body)
    }
}

#[test]
fn help_lists_plugin_commands() -> Result<()> {
    let home = TempDir::new()?;
    playground_command(home.path())?
        .args(["plugin", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("record"))
        .stdout(predicate::str::contains("tracked"))
        .stdout(predicate::str::contains("forget"));
    Ok(())
}

#[test]
fn unknown_installer_is_a_usage_error() -> Result<()> {
    let home = TempDir::new()?;
    playground_command(home.path())?
        .args(["plugin", "record", "cert-manager", "--installer", "kustomize"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown installer type 'kustomize'"));
    Ok(())
}

#[test]
fn missing_kubeconfig_fails_before_any_request() -> Result<()> {
    let home = TempDir::new()?;
    let missing = home.path().join("nope");
    playground_command(home.path())?
        .arg("--kubeconfig")
        .arg(&missing)
        .args(["plugin", "installer", "cert-manager"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("could not connect to the cluster"));
    Ok(())
}

#[test]
fn invalid_config_file_is_reported() -> Result<()> {
    let home = TempDir::new()?;
    fs::write(
        home.path().join("config.toml"),
        "[tracker]\nmutate_timeout_secs = 0\n",
    )?;
    playground_command(home.path())?
        .args(["plugin", "tracked"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "tracker.mutate_timeout_secs must be greater than zero",
        ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn record_creates_tracker_and_writes_entry() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "kind": "Status",
            "reason": "NotFound",
            "message": "configmaps \"playground-plugin-installer-tracker\" not found",
            "code": 404,
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(COLLECTION_PATH))
        .respond_with(echo_with_version("1"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(OBJECT_PATH))
        .respond_with(echo_with_version("2"))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new()?;
    let kubeconfig = write_kubeconfig(home.path(), &server.uri())?;
    playground_command(home.path())?
        .arg("--kubeconfig")
        .arg(&kubeconfig)
        .args(["plugin", "record", "cert-manager", "--installer", "helm"])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "Recorded cert-manager as installed by helm",
        ));

    let requests = server.received_requests().await.unwrap_or_default();
    let put = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT")
        .map(|r| serde_json::from_slice::<JsonValue>(&r.body))
        .transpose()?;
    assert_eq!(
        put.map(|body| body["data"].clone()),
        Some(json!({ "cert-manager": "helm" }))
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn installer_json_reads_recorded_value() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(configmap(
            "7",
            json!({ "cert-manager": "helm", "ingress": "argocd" }),
        )))
        .mount(&server)
        .await;

    let home = TempDir::new()?;
    let kubeconfig = write_kubeconfig(home.path(), &server.uri())?;
    let output = playground_command(home.path())?
        .arg("--kubeconfig")
        .arg(&kubeconfig)
        .args(["plugin", "installer", "ingress", "--json"])
        .output()?;

    assert!(output.status.success());
    let value: JsonValue = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value, json!({ "plugin": "ingress", "installer": "argocd" }));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn forbidden_read_exits_with_server_message() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "kind": "Status",
            "reason": "Forbidden",
            "message": "configmaps is forbidden",
            "code": 403,
        })))
        .mount(&server)
        .await;

    let home = TempDir::new()?;
    let kubeconfig = write_kubeconfig(home.path(), &server.uri())?;
    playground_command(home.path())?
        .arg("--kubeconfig")
        .arg(&kubeconfig)
        .args(["plugin", "list", "--installer", "helm"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Forbidden: configmaps is forbidden"));
    Ok(())
}
