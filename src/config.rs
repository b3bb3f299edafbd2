use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub plans: PlansConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// The host platform signs user tokens with this secret (HS256).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub secret: String,
    #[serde(default = "default_identity_header")]
    pub header: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub secret: String,
    #[serde(default = "default_tolerance_secs")]
    pub tolerance_secs: i64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// Plan or product ids of the host platform that unlock a paid tier.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlansConfig {
    #[serde(default)]
    pub pro_plan_id: Option<String>,
    #[serde(default)]
    pub business_plan_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub expire_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            expire_interval_secs: 60,
        }
    }
}

fn default_identity_header() -> String {
    "x-user-token".to_string()
}

fn default_tolerance_secs() -> i64 {
    300
}

fn default_queue_capacity() -> usize {
    1024
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("Failed to parse {config_path}: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Self::from_env()?,
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Build the whole configuration from environment variables and defaults.
    fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let database_url = get_env("DATABASE_URL")
            .ok_or("DATABASE_URL is not set and no config.toml was found")?;

        Ok(Config {
            server: ServerConfig {
                host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: get_env_parse("SERVER_PORT", 8080u16),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
            },
            identity: IdentityConfig {
                secret: get_env("IDENTITY_SECRET").unwrap_or_default(),
                header: get_env("IDENTITY_HEADER").unwrap_or_else(default_identity_header),
            },
            webhook: WebhookConfig {
                secret: get_env("WEBHOOK_SECRET").unwrap_or_default(),
                tolerance_secs: get_env_parse("WEBHOOK_TOLERANCE_SECS", default_tolerance_secs()),
                queue_capacity: get_env_parse("WEBHOOK_QUEUE_CAPACITY", default_queue_capacity()),
            },
            plans: PlansConfig {
                pro_plan_id: get_env("PRO_PLAN_ID"),
                business_plan_id: get_env("BUSINESS_PLAN_ID"),
            },
            scheduler: SchedulerConfig {
                expire_interval_secs: get_env_parse("EXPIRE_INTERVAL_SECS", 60u64),
            },
        })
    }

    /// Environment variables win over file values.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get_env("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Some(v) = get_env("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = get_env("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Some(v) = get_env("IDENTITY_SECRET") {
            self.identity.secret = v;
        }
        if let Some(v) = get_env("IDENTITY_HEADER") {
            self.identity.header = v;
        }
        if let Some(v) = get_env("WEBHOOK_SECRET") {
            self.webhook.secret = v;
        }
        if let Some(v) = get_env("WEBHOOK_TOLERANCE_SECS")
            && let Ok(n) = v.parse()
        {
            self.webhook.tolerance_secs = n;
        }
        if let Some(v) = get_env("WEBHOOK_QUEUE_CAPACITY")
            && let Ok(n) = v.parse()
        {
            self.webhook.queue_capacity = n;
        }
        if let Some(v) = get_env("PRO_PLAN_ID") {
            self.plans.pro_plan_id = Some(v);
        }
        if let Some(v) = get_env("BUSINESS_PLAN_ID") {
            self.plans.business_plan_id = Some(v);
        }
        if let Some(v) = get_env("EXPIRE_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            self.scheduler.expire_interval_secs = n;
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.identity.secret.is_empty() {
            return Err("IDENTITY_SECRET must be configured".to_string());
        }
        if self.webhook.secret.is_empty() {
            return Err("WEBHOOK_SECRET must be configured".to_string());
        }
        if self.webhook.queue_capacity == 0 {
            return Err("webhook.queue_capacity must be positive".to_string());
        }
        Ok(())
    }
}
