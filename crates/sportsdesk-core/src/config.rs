use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config as cfg;
use secrecy::SecretString;
use serde::Deserialize;

/// Environment variables honoured for compatibility with existing deployments,
/// applied after every other source.
const DEPLOYMENT_OVERRIDES: [(&str, &str); 4] = [
    ("DB_URL", "database.url"),
    ("SECRET_KEY", "secrets.session_key"),
    ("PORT", "server.port"),
    ("FIREBASE_CREDENTIALS", "firebase.credentials_path"),
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on accepted request bodies, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            max_body_bytes: 16_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseBackend {
    #[default]
    Firebase,
    Fixture,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    /// Realtime Database URL, e.g. `https://<project>-default-rtdb.firebaseio.com`
    pub url: Option<String>,
    /// JSON export used by the fixture backend
    pub fixture_path: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::default(),
            url: None,
            fixture_path: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentityBackend {
    #[default]
    Firebase,
    Static,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaticToken {
    pub token: SecretString,
    pub uid: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct IdentityConfig {
    pub backend: IdentityBackend,
    pub static_tokens: Vec<StaticToken>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    /// Service-account key file
    pub credentials_path: PathBuf,
    /// Overrides the project id found in the service-account key.
    pub project_id: Option<String>,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("/etc/secrets/firebase.json"),
            project_id: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecretsConfig {
    #[serde(default)]
    pub session_key: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "Settings::default_env")]
    pub env: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub firebase: FirebaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    /// Directory the config files were read from.
    #[serde(skip)]
    pub config_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Self::default_env(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            identity: IdentityConfig::default(),
            firebase: FirebaseConfig::default(),
            logging: LoggingConfig::default(),
            secrets: SecretsConfig::default(),
            config_dir: None,
        }
    }
}

impl Settings {
    fn default_env() -> String {
        env::var("APP_ENV")
            .ok()
            .or_else(|| env::var("RUST_ENV").ok())
            .unwrap_or_else(|| "development".to_string())
    }

    /// Load settings from the default config directory, the environment and
    /// the deployment variables, then validate them.
    pub fn load(env_override: Option<String>) -> Result<Self> {
        let env_name = env_override.unwrap_or_else(Self::default_env);
        let config_dir = Self::default_config_dir();
        let settings = Self::load_from_sources(&config_dir, &env_name)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.server.host.trim().is_empty(),
            "server.host cannot be empty"
        );
        anyhow::ensure!(self.server.port > 0, "server.port must be > 0");
        anyhow::ensure!(
            self.server.max_body_bytes > 0,
            "server.max_body_bytes must be > 0"
        );
        anyhow::ensure!(
            self.database.timeout_secs > 0,
            "database.timeout_secs must be > 0"
        );

        Ok(())
    }

    /// `EnvFilter` directive used when `RUST_LOG` is absent.
    pub fn log_filter(&self) -> String {
        let level = &self.logging.level;
        format!("sportsdesk_api={level},sportsdesk_core={level},tower_http={level}")
    }

    /// Priority order:
    /// 1. ~/.sportsdesk/
    /// 2. ./config/
    /// 3. Current directory
    pub fn default_config_dir() -> PathBuf {
        if let Some(home_dir) = dirs::home_dir() {
            let user_dir = home_dir.join(".sportsdesk");
            if user_dir.exists() {
                return user_dir;
            }
        }

        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let project_config = cwd.join("config");
        if project_config.exists() {
            return project_config;
        }

        cwd
    }

    fn file_sources(
        config_dir: &Path,
        env_name: &str,
    ) -> cfg::ConfigBuilder<cfg::builder::DefaultState> {
        let mut builder = cfg::Config::builder();
        for stem in ["default", env_name] {
            for ext in ["toml", "yaml", "yml", "json"] {
                builder = builder.add_source(
                    cfg::File::from(config_dir.join(format!("{stem}.{ext}"))).required(false),
                );
            }
        }
        builder.add_source(cfg::File::from(config_dir.join("local.toml")).required(false))
    }

    /// Settings from config files only, ignoring the process environment.
    pub fn load_from_files(config_dir: &Path, env_name: &str) -> Result<Self> {
        let mut settings: Settings = Self::file_sources(config_dir, env_name)
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")?;
        settings.env = env_name.to_string();
        settings.config_dir = Some(config_dir.to_path_buf());
        Ok(settings)
    }

    pub fn load_from_sources(config_dir: &Path, env_name: &str) -> Result<Self> {
        let mut builder = Self::file_sources(config_dir, env_name)
            .add_source(cfg::Environment::with_prefix("SPORTSDESK").separator("__"));

        for (var, key) in DEPLOYMENT_OVERRIDES {
            builder = builder
                .set_override_option(key, env::var(var).ok())
                .with_context(|| format!("applying {var}"))?;
        }

        let mut settings: Settings = builder
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")?;
        settings.env = env_name.to_string();
        settings.config_dir = Some(config_dir.to_path_buf());
        Ok(settings)
    }
}
