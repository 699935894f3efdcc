#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

mod common;

use common::trustadm_cmd;
use predicates::prelude::*;
use tempfile::tempdir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn removes_each_volume_and_reports_failures() -> anyhow::Result<()> {
    let home = tempdir()?;
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/volumes/hello"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/volumes/world"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/volumes/ghost"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({"message": "get ghost: no such volume"})),
        )
        .mount(&server)
        .await;

    trustadm_cmd(home.path())
        .env("TRUSTADM_ENGINE_HOST", server.uri())
        .args(["volume", "rm", "hello", "ghost", "world"])
        .assert()
        .code(3)
        .stdout("hello\nworld\n")
        .stderr(predicate::str::contains("get ghost: no such volume"));
    Ok(())
}

#[tokio::test]
async fn force_flag_and_remove_alias() -> anyhow::Result<()> {
    let home = tempdir()?;
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/volumes/data"))
        .and(query_param("force", "true"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    trustadm_cmd(home.path())
        .env("TRUSTADM_ENGINE_HOST", server.uri())
        .args(["volume", "remove", "-f", "data"])
        .assert()
        .success()
        .stdout("data\n");
    Ok(())
}

#[tokio::test]
async fn engine_host_from_config_context() -> anyhow::Result<()> {
    let home = tempdir()?;
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/volumes/data"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    std::fs::write(
        home.path().join("config.toml"),
        format!(
            "current_context = \"local\"\n\n[engine]\nhost = \"http://127.0.0.1:9\"\n\n[contexts.local]\nhost = \"{}\"\n",
            server.uri()
        ),
    )?;

    trustadm_cmd(home.path())
        .args(["volume", "rm", "data"])
        .assert()
        .success()
        .stdout("data\n");
    Ok(())
}

#[test]
fn invalid_config_is_a_usage_error() -> anyhow::Result<()> {
    let home = tempdir()?;
    std::fs::write(
        home.path().join("config.toml"),
        "[contexts.\"../escape\"]\nhost = \"http://x\"\n",
    )?;

    trustadm_cmd(home.path())
        .args(["volume", "rm", "data"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("is invalid"));
    Ok(())
}

#[test]
fn requires_a_volume() -> anyhow::Result<()> {
    let home = tempdir()?;
    trustadm_cmd(home.path())
        .args(["volume", "rm"])
        .assert()
        .code(2);
    Ok(())
}
