use anyhow::{anyhow, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

pub const CONFIG_FILE: &str = "crmserver.toml";
pub const ENV_PREFIX: &str = "CRM_";
const MIN_SECRET_LEN: usize = 32;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthSettings,
    pub bootstrap_owner: Option<BootstrapOwner>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Absent means development mode on the in-memory store.
    pub url: Option<String>,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: 10,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_token_minutes: i64,
    pub leeway_seconds: u64,
    pub min_password_length: usize,
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
    pub hash_parallelism: u32,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: "crmserver".to_string(),
            audience: "crmserver-api".to_string(),
            access_token_minutes: 60,
            leeway_seconds: 30,
            min_password_length: 8,
            hash_memory_kib: 19 * 1024,
            hash_iterations: 2,
            hash_parallelism: 1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BootstrapOwner {
    pub email: String,
    pub password: String,
}

impl AppConfig {
    /// Defaults, then `crmserver.toml`, then `CRM_*` variables (`__` nests),
    /// then a bare `DATABASE_URL`.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(
                Env::raw()
                    .only(&["DATABASE_URL"])
                    .map(|_| "database.url".into()),
            )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let mut config: AppConfig = figment
            .extract()
            .map_err(|e| anyhow!("Invalid configuration: {e}"))?;

        if config.auth.jwt_secret.is_empty() {
            warn!("No auth.jwt_secret configured, using a random secret; tokens will not survive a restart");
            config.auth.jwt_secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_figment(Self::figment())
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(anyhow!(
                "auth.jwt_secret must be at least {MIN_SECRET_LEN} bytes"
            ));
        }
        if self.auth.access_token_minutes <= 0 {
            return Err(anyhow!("auth.access_token_minutes must be positive"));
        }
        if self.database.pool_size == 0 {
            return Err(anyhow!("database.pool_size must be positive"));
        }
        if let Some(owner) = &self.bootstrap_owner {
            if owner.password.len() < self.auth.min_password_length {
                return Err(anyhow!(
                    "bootstrap_owner.password is shorter than auth.min_password_length"
                ));
            }
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Result<AppConfig> {
        AppConfig::from_figment(
            Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string(toml)),
        )
    }

    #[test]
    fn test_defaults_run_in_memory_with_generated_secret() {
        let config = from_toml("").unwrap();
        assert!(config.database.url.is_none());
        assert!(config.auth.jwt_secret.len() >= MIN_SECRET_LEN);
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_toml_overrides_nested_keys() {
        let config = from_toml(
            r#"
            [server]
            port = 9090

            [database]
            url = "postgres://crm@localhost/crm"

            [auth]
            jwt_secret = "0123456789abcdef0123456789abcdef"

            [bootstrap_owner]
            email = "owner@example.com"
            password = "correct horse"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(
            config.database.url.as_deref(),
            Some("postgres://crm@localhost/crm")
        );
        assert_eq!(
            config.bootstrap_owner.map(|o| o.email).as_deref(),
            Some("owner@example.com")
        );
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let err = from_toml("[auth]\njwt_secret = \"too-short\"").unwrap_err();
        assert!(err.to_string().contains("jwt_secret"));
    }
}
