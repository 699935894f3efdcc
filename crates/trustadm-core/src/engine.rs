//! Container engine API client and volume removal.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::{Error, Result};

/// Operations against the container engine.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Remove a named volume. `force` removes it even if the engine would refuse.
    async fn volume_remove(&self, name: &str, force: bool) -> Result<()>;
}

/// Engine client speaking the HTTP API.
#[derive(Debug, Clone)]
pub struct HttpEngineClient {
    client: Client,
    base: Url,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpEngineClient {
    /// Create a client for the engine at `host` (for example `http://localhost:2375`).
    pub fn new(host: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(host)
            .map_err(|e| Error::Config(format!("invalid engine host {host:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!("invalid engine host {host:?}")));
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("trustadm/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client, base })
    }

    /// URL of a volume resource.
    fn volume_url(&self, name: &str, force: bool) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config(format!("invalid engine host {}", self.base)))?
            .pop_if_empty()
            .push("volumes")
            .push(name);
        url.query_pairs_mut()
            .append_pair("force", if force { "true" } else { "false" });
        Ok(url)
    }
}

#[async_trait]
impl EngineClient for HttpEngineClient {
    async fn volume_remove(&self, name: &str, force: bool) -> Result<()> {
        let url = self.volume_url(name, force)?;
        debug!(%url, "removing volume");
        let response = self.client.delete(url).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body).map_or_else(
            |_| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                } else {
                    trimmed.to_string()
                }
            },
            |parsed| parsed.message,
        );
        Err(Error::Engine {
            status: status.as_u16(),
            message,
        })
    }
}

/// Remove each volume in turn, printing the names that were removed.
///
/// Every name is attempted. Failures are collected and returned together as
/// [`Error::VolumeRemovalFailed`], one message per line.
pub async fn remove_volumes<C, W>(
    client: &C,
    names: &[String],
    force: bool,
    out: &mut W,
) -> Result<()>
where
    C: EngineClient + ?Sized,
    W: Write + ?Sized,
{
    let mut errors = Vec::new();
    for name in names {
        match client.volume_remove(name, force).await {
            Ok(()) => writeln!(out, "{name}")?,
            Err(e) => {
                debug!(volume = %name, error = %e, "volume removal failed");
                errors.push(e.to_string());
            },
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::VolumeRemovalFailed(errors))
    }
}
