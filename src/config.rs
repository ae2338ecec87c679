//! Application-level configuration loading from `config/app.json` and the environment.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MATCH_SYNC_CONFIG_PATH";
const JWT_SECRET_ENVS: [&str; 2] = ["MATCH_SYNC_JWT_SECRET", "JWT_SECRET"];
const INGRESS_TOKEN_ENV: &str = "MATCH_SYNC_INGRESS_TOKEN";

const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CHAT_MAX_LENGTH: usize = 2_000;
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    storage_timeout: Duration,
    chat_max_length: usize,
    seed_path: Option<PathBuf>,
    jwt_secret: Option<String>,
    ingress_token: Option<String>,
    mongo_uri: Option<String>,
    mongo_db: Option<String>,
    port: u16,
}

impl AppConfig {
    /// Load the configuration file, falling back to defaults, then apply environment settings.
    pub fn load() -> Self {
        let path = resolve_config_path();
        Self::load_file(&path).with_env()
    }

    /// Read and parse the JSON file at `path`; missing or invalid files yield defaults.
    pub fn load_file(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        storage_timeout_ms = config.storage_timeout.as_millis() as u64,
                        chat_max_length = config.chat_max_length,
                        "loaded configuration file"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse the JSON representation of the configuration file.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    fn with_env(mut self) -> Self {
        self.jwt_secret = JWT_SECRET_ENVS.iter().find_map(|name| non_empty_env(name));
        self.ingress_token = non_empty_env(INGRESS_TOKEN_ENV);
        self.mongo_uri = non_empty_env("MONGO_URI");
        self.mongo_db = non_empty_env("MONGO_DB");
        self.port = non_empty_env("PORT")
            .or_else(|| non_empty_env("SERVER_PORT"))
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        self
    }

    /// Override the HS256 secret used to verify bearer credentials.
    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    /// Override the token required by the ingress routes.
    pub fn with_ingress_token(mut self, token: impl Into<String>) -> Self {
        self.ingress_token = Some(token.into());
        self
    }

    /// Override the per-call collaborator timeout.
    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    /// Upper bound applied to every store and identity call made for a request.
    pub fn storage_timeout(&self) -> Duration {
        self.storage_timeout
    }

    /// Maximum chat message length in characters.
    pub fn chat_max_length(&self) -> usize {
        self.chat_max_length
    }

    /// Fixture used to seed the in-memory store.
    pub fn seed_path(&self) -> Option<&Path> {
        self.seed_path.as_deref()
    }

    /// Secret for bearer credential verification.
    pub fn jwt_secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref()
    }

    /// Token the ingress routes require; ingress is refused when unset.
    pub fn ingress_token(&self) -> Option<&str> {
        self.ingress_token.as_deref()
    }

    /// MongoDB connection string, when configured.
    pub fn mongo_uri(&self) -> Option<&str> {
        self.mongo_uri.as_deref()
    }

    /// MongoDB database name override.
    pub fn mongo_db(&self) -> Option<&str> {
        self.mongo_db.as_deref()
    }

    /// Port the HTTP server listens on.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    storage_timeout_ms: u64,
    chat_max_length: usize,
    seed_path: Option<PathBuf>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            storage_timeout_ms: DEFAULT_STORAGE_TIMEOUT_MS,
            chat_max_length: DEFAULT_CHAT_MAX_LENGTH,
            seed_path: None,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            storage_timeout: Duration::from_millis(value.storage_timeout_ms.max(1)),
            chat_max_length: value.chat_max_length.max(1),
            seed_path: value.seed_path,
            jwt_secret: None,
            ingress_token: None,
            mongo_uri: None,
            mongo_db: None,
            port: DEFAULT_PORT,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
