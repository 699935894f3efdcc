#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

/// Create a `trustadm` command isolated from the user's config and environment.
///
/// `home` holds a (possibly absent) `config.toml` and the trust store under `trust/`.
#[allow(dead_code)]
pub fn trustadm_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("trustadm"));
    cmd.timeout(CMD_TIMEOUT);
    cmd.env("TRUSTADM_CONFIG", home.join("config.toml"));
    cmd.env("TRUSTADM_TRUST_DIR", trust_dir(home));
    cmd.env_remove("TRUSTADM_CONTEXT");
    cmd.env_remove("TRUSTADM_ENGINE_HOST");
    cmd.env("NO_COLOR", "1");
    cmd
}

#[allow(dead_code)]
pub fn trust_dir(home: &Path) -> PathBuf {
    home.join("trust")
}

/// Path of a repository's document in the file trust store.
#[allow(dead_code)]
pub fn repository_file(home: &Path, repository: &str) -> PathBuf {
    let mut path = trust_dir(home);
    let mut segments = repository.split('/').peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_some() {
            path.push(segment.replace(':', "_"));
        } else {
            path.push(format!("{}.json", segment.replace(':', "_")));
        }
    }
    path
}

/// Write a repository whose releases role (threshold 1) is signed by `alice`,
/// with `alice` (key `a1`) and `bob` (key `b1`) as delegated signers.
#[allow(dead_code)]
pub fn write_signed_repository(home: &Path, repository: &str) {
    write_repository(
        home,
        repository,
        &json!({
            "roles": [
                {
                    "name": "targets/releases",
                    "keyIds": ["a1", "b1"],
                    "threshold": 1,
                    "signatures": [{ "keyId": "a1", "method": "ecdsa" }]
                },
                { "name": "targets/alice", "keyIds": ["a1"], "threshold": 1 },
                { "name": "targets/bob", "keyIds": ["b1"], "threshold": 1 }
            ]
        }),
    );
}

#[allow(dead_code)]
pub fn write_repository(home: &Path, repository: &str, document: &Value) {
    let path = repository_file(home, repository);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_vec_pretty(document).unwrap()).unwrap();
}

#[allow(dead_code)]
pub fn read_repository(home: &Path, repository: &str) -> Value {
    let body = fs::read(repository_file(home, repository)).unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Names of the roles currently stored for `repository`.
#[allow(dead_code)]
pub fn role_names(home: &Path, repository: &str) -> Vec<String> {
    read_repository(home, repository)["roles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect()
}
