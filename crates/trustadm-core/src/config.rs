//! Configuration for trustadm.
//!
//! Configuration is a single TOML file. Without `--config` it is read from the
//! platform config directory:
//!
//! - Linux: `~/.config/trustadm/config.toml`
//! - macOS: `~/Library/Application Support/io.trustadm.trustadm/config.toml`
//! - Windows: `%APPDATA%\trustadm\trustadm\config\config.toml`
//!
//! A missing file is not an error; defaults are used instead.
//!
//! ```toml
//! current_context = "staging"
//!
//! [engine]
//! host = "http://localhost:2375"
//! timeout_secs = 30
//!
//! [trust]
//! store_dir = "/var/lib/trustadm/trust"
//!
//! [contexts.staging]
//! description = "staging cluster"
//! host = "https://staging.example.com:2376"
//! tls_files = ["tls/docker/ca.pem"]
//! ```
//!
//! Values resolve in this order, later winning: built-in defaults, the file,
//! the selected context, then `TRUSTADM_ENGINE_HOST` and `TRUSTADM_TRUST_DIR`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

/// Environment variable overriding the engine host.
pub const ENGINE_HOST_ENV: &str = "TRUSTADM_ENGINE_HOST";
/// Environment variable overriding the trust store directory.
pub const TRUST_DIR_ENV: &str = "TRUSTADM_TRUST_DIR";

/// Name of the implicit context built from the `[engine]` and `[trust]` sections.
pub const DEFAULT_CONTEXT: &str = "default";

const CONTEXT_NAME_PATTERN: &str = "^[a-zA-Z0-9][a-zA-Z0-9_.+-]+$";

#[allow(clippy::expect_used)]
static CONTEXT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CONTEXT_NAME_PATTERN).expect("context name regex is valid"));

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Context to use when none is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_context: Option<String>,
    /// Container engine connection.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Trust metadata storage.
    #[serde(default)]
    pub trust: TrustConfig,
    /// Named endpoints, selectable with `current_context`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contexts: BTreeMap<String, ContextConfig>,
}

/// Container engine connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the engine API.
    pub host: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:2375".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Trust metadata storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Directory holding one JSON document per repository.
    pub store_dir: PathBuf,
}

impl Default for TrustConfig {
    fn default() -> Self {
        let store_dir = project_dirs().map_or_else(
            || {
                directories::BaseDirs::new().map_or_else(
                    || PathBuf::from(".trustadm/trust"),
                    |base| base.home_dir().join(".trustadm").join("trust"),
                )
            },
            |dirs| dirs.data_dir().join("trust"),
        );
        Self { store_dir }
    }
}

/// A named endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Engine API base URL for this context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Trust store directory for this context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_dir: Option<PathBuf>,
    /// TLS material, relative to the context's own directory.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tls_files: Vec<String>,
}

/// Effective settings after context selection and overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Context the settings came from.
    pub context: String,
    /// Engine API base URL.
    pub engine_host: String,
    /// Engine request timeout.
    pub timeout: Duration,
    /// Trust store directory.
    pub trust_dir: PathBuf,
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if it names invalid contexts or TLS paths.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        Self::load_from(&path)
    }

    /// Load from an explicit file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        debug!(path = %path.display(), contexts = config.contexts.len(), "loaded config");
        Ok(config)
    }

    /// Write the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {e}")))?;
        info!(path = %path.display(), "saved config");
        Ok(())
    }

    /// Platform-specific location of `config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        project_dirs()
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or_else(|| Error::Config("Failed to determine project directories".into()))
    }

    /// Check context names, the selected context, and TLS file paths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        for (name, context) in &self.contexts {
            validate_context_name(name)?;
            for file in &context.tls_files {
                check_file_path(file)
                    .map_err(|e| Error::Config(format!("context {name:?}: {e}")))?;
            }
        }
        if let Some(current) = &self.current_context {
            if current != DEFAULT_CONTEXT && !self.contexts.contains_key(current) {
                return Err(Error::Config(format!(
                    "current context {current:?} is not defined"
                )));
            }
        }
        Ok(())
    }

    /// Resolve the effective endpoint from the process environment.
    ///
    /// # Errors
    ///
    /// See [`Config::resolve_with`].
    pub fn resolve(&self, context: Option<&str>) -> Result<Endpoint> {
        self.resolve_with(context, |key| std::env::var(key).ok())
    }

    /// Resolve the effective endpoint, reading overrides through `lookup`.
    ///
    /// `context` takes precedence over `current_context`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the requested context does not exist.
    pub fn resolve_with(
        &self,
        context: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Endpoint> {
        let name = context
            .or(self.current_context.as_deref())
            .unwrap_or(DEFAULT_CONTEXT);

        let mut endpoint = Endpoint {
            context: name.to_string(),
            engine_host: self.engine.host.clone(),
            timeout: Duration::from_secs(self.engine.timeout_secs),
            trust_dir: self.trust.store_dir.clone(),
        };

        if name != DEFAULT_CONTEXT {
            let selected = self
                .contexts
                .get(name)
                .ok_or_else(|| Error::Config(format!("context {name:?} does not exist")))?;
            if let Some(host) = &selected.host {
                endpoint.engine_host.clone_from(host);
            }
            if let Some(dir) = &selected.trust_dir {
                endpoint.trust_dir.clone_from(dir);
            }
        }

        if let Some(host) = lookup(ENGINE_HOST_ENV).filter(|v| !v.is_empty()) {
            endpoint.engine_host = host;
        }
        if let Some(dir) = lookup(TRUST_DIR_ENV).filter(|v| !v.is_empty()) {
            endpoint.trust_dir = PathBuf::from(dir);
        }

        debug!(context = %endpoint.context, host = %endpoint.engine_host, "resolved endpoint");
        Ok(endpoint)
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("io", "trustadm", "trustadm")
}

/// Check that `name` can be used as a context name.
///
/// Names become directory names, so anything that could escape or be read as
/// a path is refused.
///
/// # Errors
///
/// Returns [`Error::Config`] for empty, reserved, or malformed names.
pub fn validate_context_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Config("context name cannot be empty".into()));
    }
    if name == DEFAULT_CONTEXT {
        return Err(Error::Config(format!("{name:?} is a reserved name")));
    }
    if !CONTEXT_NAME_RE.is_match(name) {
        return Err(Error::Config(format!(
            "context name {name:?} is invalid, names are validated against regexp {CONTEXT_NAME_PATTERN:?}"
        )));
    }
    Ok(())
}

/// Check that `path` names a file inside a context's `tls/` directory.
///
/// The path must be relative in both Unix and Windows terms and must still
/// be under `tls/` after `.` and `..` components are resolved.
///
/// # Errors
///
/// Returns [`Error::Config`] describing why the path was refused.
pub fn validate_file_path(path: &str) -> Result<()> {
    check_file_path(path).map_err(Error::Config)
}

fn check_file_path(path: &str) -> std::result::Result<(), String> {
    if path.starts_with('/') || path.starts_with('\\') || has_drive_prefix(path) {
        return Err(format!("unexpected absolute path {path:?}"));
    }
    let unified = path.replace('\\', "/");
    let mut normalized: Vec<&str> = Vec::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => match part.to_str() {
                Some(part) => normalized.push(part),
                None => return Err(format!("invalid path {path:?}")),
            },
            Component::CurDir => {},
            Component::ParentDir => {
                if normalized.pop().is_none() {
                    return Err(format!("path {path:?} escapes the context"));
                }
            },
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("unexpected absolute path {path:?}"));
            },
        }
    }
    match normalized.as_slice() {
        ["tls", _, ..] => Ok(()),
        _ => Err(format!("unexpected context file {path:?}, must be under tls/")),
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_names() {
        let cases = [
            ("../../invalid/escape", false),
            ("/invalid/absolute", false),
            (r"\invalid\windows", false),
            ("", false),
            ("default", false),
            ("-leading-dash", false),
            ("validname", true),
            ("prod.eu-west_1+blue", true),
        ];
        for (name, valid) in cases {
            assert_eq!(
                validate_context_name(name).is_ok(),
                valid,
                "{name:?} should report valid as {valid}"
            );
        }
    }

    #[test]
    fn test_file_paths() {
        let cases = [
            ("tls/_/../../something", false),
            ("tls/../../something", false),
            ("../../something", false),
            ("/tls/absolute/unix/path", false),
            (r"C:\tls\absolute\windows\path", false),
            ("C:/tls/absolute/windows/path", false),
            (r"\\server\share\tls\ca.pem", false),
            ("tls", false),
            ("meta.json", false),
            ("tls/docker/ca.pem", true),
            ("tls/./docker/../docker/key.pem", true),
            (r"tls\docker\cert.pem", true),
        ];
        for (path, valid) in cases {
            assert_eq!(
                validate_file_path(path).is_ok(),
                valid,
                "{path:?} should report valid as {valid}"
            );
        }
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.engine.timeout_secs, 30);
    }

    #[test]
    fn test_save_and_load_roundtrip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.engine.host = "http://engine:2375".into();
        config.contexts.insert(
            "staging".into(),
            ContextConfig {
                host: Some("https://staging:2376".into()),
                tls_files: vec!["tls/docker/ca.pem".into()],
                ..ContextConfig::default()
            },
        );
        config.current_context = Some("staging".into());

        config.save_to(&path)?;
        assert_eq!(Config::load_from(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "[engine]\nhost = \"http://other:2375\"\n")?;
        let config = Config::load_from(&path)?;
        assert_eq!(config.engine.host, "http://other:2375");
        assert_eq!(config.engine.timeout_secs, 30);
        assert_eq!(config.trust, TrustConfig::default());
        Ok(())
    }

    #[test]
    fn test_invalid_files_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "[engine\nhost = 1").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));

        fs::write(&path, "[contexts.\"../escape\"]\nhost = \"http://x\"\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("is invalid"));

        fs::write(&path, "[contexts.prod]\ntls_files = [\"../../etc/passwd\"]\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("context \"prod\""));

        fs::write(&path, "current_context = \"ghost\"\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("not defined"));
    }

    fn staged_config() -> Config {
        let mut config = Config::default();
        config.trust.store_dir = PathBuf::from("/base/trust");
        config.contexts.insert(
            "staging".into(),
            ContextConfig {
                host: Some("https://staging:2376".into()),
                trust_dir: Some(PathBuf::from("/staging/trust")),
                ..ContextConfig::default()
            },
        );
        config
    }

    #[test]
    fn test_resolve_precedence() {
        let config = staged_config();
        let none = |_: &str| None;

        let base = config.resolve_with(None, none).unwrap();
        assert_eq!(base.context, DEFAULT_CONTEXT);
        assert_eq!(base.engine_host, "http://localhost:2375");
        assert_eq!(base.trust_dir, PathBuf::from("/base/trust"));
        assert_eq!(base.timeout, Duration::from_secs(30));

        let staging = config.resolve_with(Some("staging"), none).unwrap();
        assert_eq!(staging.engine_host, "https://staging:2376");
        assert_eq!(staging.trust_dir, PathBuf::from("/staging/trust"));

        let env = |key: &str| match key {
            ENGINE_HOST_ENV => Some("http://from-env:2375".to_string()),
            TRUST_DIR_ENV => Some(String::new()),
            _ => None,
        };
        let overridden = config.resolve_with(Some("staging"), env).unwrap();
        assert_eq!(overridden.engine_host, "http://from-env:2375");
        assert_eq!(overridden.trust_dir, PathBuf::from("/staging/trust"));
    }

    #[test]
    fn test_resolve_uses_current_context() {
        let mut config = staged_config();
        config.current_context = Some("staging".into());
        let endpoint = config.resolve_with(None, |_| None).unwrap();
        assert_eq!(endpoint.context, "staging");

        let explicit = config.resolve_with(Some(DEFAULT_CONTEXT), |_| None).unwrap();
        assert_eq!(explicit.engine_host, "http://localhost:2375");
    }

    #[test]
    fn test_resolve_unknown_context() {
        let err = Config::default()
            .resolve_with(Some("missing"), |_| None)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: context \"missing\" does not exist"
        );
    }
}
