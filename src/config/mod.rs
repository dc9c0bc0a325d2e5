use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub identity: IdentityConfig,
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub audit: AuditConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub base_url: String,
    pub tenant_id: String,
    pub service_username: String,
    pub service_password: String,
    /// Upper bound for a single identity-provider or view-query call.
    /// `None` leaves the transport default in place.
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub default_page_size: u32,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub identity_capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSinkKind {
    File,
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub enabled: bool,
    pub sink: AuditSinkKind,
    pub log_path: String,
    pub buffer_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Identity provider overrides
        if let Ok(v) = env::var("TAPIS_BASE_URL") {
            self.identity.base_url = v;
        }
        if let Ok(v) = env::var("TAPIS_TENANT_ID") {
            self.identity.tenant_id = v;
        }
        if let Ok(v) = env::var("TAPIS_SERVICE_UNAME") {
            self.identity.service_username = v;
        }
        if let Ok(v) = env::var("TAPIS_SERVICE_PASS") {
            self.identity.service_password = v;
        }
        if let Ok(v) = env::var("TAPIS_REQUEST_TIMEOUT_SECS") {
            self.identity.request_timeout_secs = timeout_override(self.identity.request_timeout_secs, &v);
        }

        // API overrides
        if let Some(v) = env::var("VBR_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("APP_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Cache overrides
        if let Ok(v) = env::var("VBR_IDENTITY_CACHE_CAPACITY") {
            self.cache.identity_capacity = v.parse().unwrap_or(self.cache.identity_capacity);
        }

        // Audit overrides
        if let Ok(v) = env::var("AUDIT_ENABLED") {
            self.audit.enabled = v.parse().unwrap_or(self.audit.enabled);
        }
        match env::var("AUDIT_SINK").as_deref() {
            Ok("file") => self.audit.sink = AuditSinkKind::File,
            Ok("log") => self.audit.sink = AuditSinkKind::Log,
            _ => {}
        }
        if let Ok(v) = env::var("APP_LOG_PATH") {
            self.audit.log_path = v;
        }
        if let Ok(v) = env::var("AUDIT_BUFFER_CAPACITY") {
            self.audit.buffer_capacity = v.parse().unwrap_or(self.audit.buffer_capacity);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            identity: IdentityConfig {
                base_url: "https://tacc.tapis.io".to_string(),
                tenant_id: "tacc".to_string(),
                service_username: "username".to_string(),
                service_password: String::new(),
                request_timeout_secs: None,
            },
            api: ApiConfig {
                port: 3000,
                default_page_size: 50,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            cache: CacheConfig {
                identity_capacity: 32,
            },
            audit: AuditConfig {
                enabled: true,
                sink: AuditSinkKind::Log,
                log_path: ".".to_string(),
                buffer_capacity: 1024,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            identity: IdentityConfig {
                base_url: "https://a2cpsdev.tapis.io".to_string(),
                tenant_id: "a2cpsdev".to_string(),
                service_username: "username".to_string(),
                service_password: String::new(),
                request_timeout_secs: None,
            },
            api: ApiConfig {
                port: 3000,
                default_page_size: 50,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            cache: CacheConfig {
                identity_capacity: 64,
            },
            audit: AuditConfig {
                enabled: true,
                sink: AuditSinkKind::File,
                log_path: ".".to_string(),
                buffer_capacity: 4096,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            identity: IdentityConfig {
                base_url: "https://a2cps.tapis.io".to_string(),
                tenant_id: "a2cps".to_string(),
                service_username: "username".to_string(),
                service_password: String::new(),
                request_timeout_secs: None,
            },
            api: ApiConfig {
                port: 3000,
                default_page_size: 50,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            cache: CacheConfig {
                identity_capacity: 256,
            },
            audit: AuditConfig {
                enabled: true,
                sink: AuditSinkKind::File,
                log_path: "/var/log/vbr".to_string(),
                buffer_capacity: 8192,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Unparseable values keep the current setting, like the other overrides.
fn timeout_override(current: Option<u64>, raw: &str) -> Option<u64> {
    match raw.trim() {
        "" => None,
        v => v.parse().ok().or(current),
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl AppConfig {
    /// Reject settings the service cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.identity.base_url).map_err(|e| invalid("TAPIS_BASE_URL", e.to_string()))?;
        if self.identity.tenant_id.is_empty() {
            return Err(invalid("TAPIS_TENANT_ID", "must not be empty"));
        }
        if matches!(self.environment, Environment::Production) && self.identity.service_password.is_empty() {
            return Err(invalid("TAPIS_SERVICE_PASS", "required in production"));
        }
        if self.api.default_page_size == 0 {
            return Err(invalid("APP_DEFAULT_PAGE_SIZE", "must be at least 1"));
        }
        if self.identity.request_timeout_secs == Some(0) {
            return Err(invalid("TAPIS_REQUEST_TIMEOUT_SECS", "must be at least 1 when set"));
        }
        if self.audit.enabled && self.audit.buffer_capacity == 0 {
            return Err(invalid("AUDIT_BUFFER_CAPACITY", "must be at least 1"));
        }
        Ok(())
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.api.default_page_size, 50);
        assert_eq!(config.cache.identity_capacity, 32);
        assert_eq!(config.audit.sink, AuditSinkKind::Log);
        assert!(config.identity.request_timeout_secs.is_none());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.audit.sink, AuditSinkKind::File);
        assert!(config.cache.identity_capacity > AppConfig::development().cache.identity_capacity);
    }

    #[test]
    fn timeout_override_keeps_current_value_on_garbage() {
        assert_eq!(timeout_override(Some(30), "abc"), Some(30));
        assert_eq!(timeout_override(None, "abc"), None);
        assert_eq!(timeout_override(Some(30), "5"), Some(5));
        assert_eq!(timeout_override(Some(30), ""), None);
    }

    #[test]
    fn development_config_is_valid() {
        assert!(AppConfig::development().validate().is_ok());
    }

    #[test]
    fn production_requires_service_password() {
        let mut config = AppConfig::production();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "TAPIS_SERVICE_PASS", .. })
        ));
        config.identity.service_password = "secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_base_url_and_zero_sizes() {
        let mut config = AppConfig::development();
        config.identity.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::development();
        config.api.default_page_size = 0;
        assert!(config.validate().is_err());
    }
}
