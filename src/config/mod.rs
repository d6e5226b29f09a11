use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Upper bound for `STORAGE_MAX_RETRIES`.
pub const MAX_STORAGE_RETRIES: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

/// Object storage (Appwrite) settings. Every asset URL handed out by the
/// service is derived from `api_url`, `bucket_id` and `project_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub api_url: String,
    pub project_id: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub bucket_id: String,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    /// `None` issues tokens without an `exp` claim.
    pub jwt_expiry_hours: Option<u64>,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Profile defaults
    /// are chosen by `APP_ENV`, then individual variables override them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let api_url = required("APPWRITE_API_URL")?;
        url::Url::parse(&api_url).map_err(|e| ConfigError::Invalid {
            name: "APPWRITE_API_URL",
            reason: e.to_string(),
        })?;

        // The legacy deployment spelled this JWT_SECRET_KET; accept both.
        let jwt_secret = required("JWT_SECRET_KEY").or_else(|_| required("JWT_SECRET_KET"))?;

        let mut config = Self::profile(environment);
        config.database.url = required("DATABASE_URL")?;
        config.storage.api_url = api_url.trim_end_matches('/').to_string();
        config.storage.project_id = required("APPWRITE_PROJECT_ID")?;
        config.storage.api_key = required("APPWRITE_API_KEY")?;
        config.storage.bucket_id = required("APPWRITE_BUCKET_ID")?;
        config.security.jwt_secret = jwt_secret;

        config.with_overrides(&lookup)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PORT") {
            self.server.port = parse("PORT", &v)?;
        }

        // Database overrides
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse("DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = parse("DATABASE_CONNECTION_TIMEOUT", &v)?;
        }

        // Storage overrides
        if let Some(v) = lookup("STORAGE_MAX_RETRIES") {
            let retries: u32 = parse("STORAGE_MAX_RETRIES", &v)?;
            if retries > MAX_STORAGE_RETRIES {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_MAX_RETRIES",
                    reason: format!("at most {} retries are allowed", MAX_STORAGE_RETRIES),
                });
            }
            self.storage.max_retries = retries;
        }
        if let Some(v) = lookup("STORAGE_RETRY_BASE_DELAY_MS") {
            self.storage.retry_base_delay_ms = parse("STORAGE_RETRY_BASE_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("STORAGE_REQUEST_TIMEOUT_SECS") {
            self.storage.request_timeout_secs = parse("STORAGE_REQUEST_TIMEOUT_SECS", &v)?;
        }

        // API overrides
        if let Some(v) = lookup("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = parse("API_ENABLE_REQUEST_LOGGING", &v)?;
        }
        if let Some(v) = lookup("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = parse("API_MAX_REQUEST_SIZE_BYTES", &v)?;
        }

        // Security overrides
        if let Some(v) = lookup("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = Some(parse("SECURITY_JWT_EXPIRY_HOURS", &v)?);
        }
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(self)
    }

    fn profile(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 10,
                connection_timeout: 30,
            },
            storage: StorageConfig::unset(2, 200),
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 25 * 1024 * 1024, // 25MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: None,
                cors_origins: vec!["*".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 20,
                connection_timeout: 10,
            },
            storage: StorageConfig::unset(3, 250),
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 25 * 1024 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: None,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 50,
                connection_timeout: 5,
            },
            storage: StorageConfig::unset(4, 500),
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: None,
                cors_origins: vec!["https://admin.example.com".to_string()],
            },
        }
    }
}

impl StorageConfig {
    fn unset(max_retries: u32, retry_base_delay_ms: u64) -> Self {
        Self {
            api_url: String::new(),
            project_id: String::new(),
            api_key: String::new(),
            bucket_id: String::new(),
            max_retries,
            retry_base_delay_ms,
            request_timeout_secs: 30,
        }
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DATABASE_URL", "postgres://localhost/storefront"),
            ("APPWRITE_API_URL", "https://cloud.appwrite.io/v1/"),
            ("APPWRITE_PROJECT_ID", "proj"),
            ("APPWRITE_API_KEY", "key"),
            ("APPWRITE_BUCKET_ID", "bucket"),
            ("JWT_SECRET_KEY", "secret"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn test_default_development_config() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.api_url, "https://cloud.appwrite.io/v1");
        assert_eq!(config.security.jwt_expiry_hours, None);
    }

    #[test]
    fn test_production_profile_and_overrides() {
        let mut env = base_env();
        env.insert("APP_ENV", "production");
        env.insert("PORT", "8080");
        env.insert("SECURITY_JWT_EXPIRY_HOURS", "12");
        env.insert("SECURITY_CORS_ORIGINS", "https://a.example, https://b.example");

        let config = load(&env).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.max_connections, 50);
        assert_eq!(config.security.jwt_expiry_hours, Some(12));
        assert_eq!(config.security.cors_origins.len(), 2);
    }

    #[test]
    fn test_legacy_secret_name_accepted() {
        let mut env = base_env();
        env.remove("JWT_SECRET_KEY");
        env.insert("JWT_SECRET_KET", "legacy");
        assert_eq!(load(&env).unwrap().security.jwt_secret, "legacy");
    }

    #[test]
    fn test_missing_bucket_is_reported() {
        let mut env = base_env();
        env.remove("APPWRITE_BUCKET_ID");
        assert!(matches!(load(&env), Err(ConfigError::Missing("APPWRITE_BUCKET_ID"))));
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let mut env = base_env();
        env.insert("PORT", "eighty");
        assert!(matches!(load(&env), Err(ConfigError::Invalid { name: "PORT", .. })));
    }

    #[test]
    fn test_storage_retries_are_bounded() {
        let mut env = base_env();
        env.insert("STORAGE_MAX_RETRIES", "10");
        assert_eq!(load(&env).unwrap().storage.max_retries, 10);

        env.insert("STORAGE_MAX_RETRIES", "40");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid { name: "STORAGE_MAX_RETRIES", .. })
        ));
    }
}
