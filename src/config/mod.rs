use axum_extra::extract::cookie::SameSite;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Origins allowed to call the API with credentials.
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub cookie_secure: bool,
    /// "strict", "lax" or "none"
    pub cookie_same_site: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.server.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        if let Ok(v) = env::var("STORE_MAX_CONNECTIONS") {
            self.store.max_connections = v.parse().unwrap_or(self.store.max_connections);
        }
        if let Ok(v) = env::var("STORE_ACQUIRE_TIMEOUT_SECS") {
            self.store.acquire_timeout_secs = v.parse().unwrap_or(self.store.acquire_timeout_secs);
        }

        if let Ok(v) = env::var("SECRET_KEY") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("TOKEN_TTL_DAYS") {
            self.security.token_ttl_days = v.parse().unwrap_or(self.security.token_ttl_days);
        }
        if let Ok(v) = env::var("COOKIE_SECURE") {
            self.security.cookie_secure = v.parse().unwrap_or(self.security.cookie_secure);
        }
        if let Ok(v) = env::var("COOKIE_SAME_SITE") {
            self.security.cookie_same_site = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 5000,
                cors_origins: vec!["http://localhost:5173".to_string()],
            },
            store: StoreConfig {
                max_connections: 10,
                acquire_timeout_secs: 30,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                token_ttl_days: 365,
                cookie_secure: false,
                cookie_same_site: "strict".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 5000,
                cors_origins: vec![],
            },
            store: StoreConfig {
                max_connections: 50,
                acquire_timeout_secs: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                token_ttl_days: 365,
                cookie_secure: true,
                // cross-site frontends need the cookie on fetches with credentials
                cookie_same_site: "none".to_string(),
            },
        }
    }
}

/// Attributes for the session cookie, resolved once at startup and handed
/// to the handlers that set or clear it.
#[derive(Debug, Clone, Copy)]
pub struct CookieConfig {
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookieConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        let same_site = match config.security.cookie_same_site.to_ascii_lowercase().as_str() {
            "none" => SameSite::None,
            "lax" => SameSite::Lax,
            _ => SameSite::Strict,
        };
        Self {
            secure: config.security.cookie_secure,
            same_site,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.server.port, 5000);
        assert!(!config.security.cookie_secure);
        assert_eq!(config.security.cookie_same_site, "strict");
        assert_eq!(config.security.token_ttl_days, 365);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.security.cookie_secure);
        assert_eq!(config.security.cookie_same_site, "none");
    }

    #[test]
    fn cookie_config_maps_same_site_values() {
        let mut config = AppConfig::development();
        assert_eq!(CookieConfig::from_config(&config).same_site, SameSite::Strict);

        config.security.cookie_same_site = "none".to_string();
        assert_eq!(CookieConfig::from_config(&config).same_site, SameSite::None);

        config.security.cookie_same_site = "LAX".to_string();
        assert_eq!(CookieConfig::from_config(&config).same_site, SameSite::Lax);
    }
}
