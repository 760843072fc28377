/**
 * Application configuration
 * All runtime settings resolved once at startup from the environment.
 */
use std::sync::OnceLock;

use crate::db::DbConfig;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind address, HOST / PORT env vars.
    pub host: String,
    pub port: u16,
    /// "development" or "production", drives log formatting.
    pub environment: String,
    pub db: DbConfig,
    /// Comma-separated ALLOWED_ORIGINS, or FRONTEND_ORIGIN as a single value.
    pub allowed_origins: Vec<String>,
    /// Directory uploaded lesson assets and images are served from.
    pub media_root: String,
    /// Public URL prefix under which media_root is mounted.
    pub media_url: String,
    pub jwt_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .or_else(|| std::env::var("FRONTEND_ORIGIN").ok().map(|o| vec![o]))
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3001),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            db: DbConfig::default(),
            allowed_origins,
            media_root: std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()),
            media_url: std::env::var("MEDIA_URL").unwrap_or_else(|_| "/media".to_string()),
            jwt_secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "default-jwt-secret-change-in-production".to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Store the configuration for the lifetime of the process. Later calls are
/// ignored, so tests can not clobber the running server's settings.
pub fn init(config: AppConfig) {
    let _ = CONFIG.set(config);
}

/// The process-wide configuration. Falls back to environment defaults when
/// `init` was never called (unit tests).
pub fn get() -> &'static AppConfig {
    CONFIG.get_or_init(AppConfig::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let config = AppConfig::from_env();
        assert!(!config.host.is_empty());
        assert!(config.port > 0);
        assert!(!config.allowed_origins.is_empty());
        assert_eq!(config.media_url, "/media");
        assert!(!config.media_root.is_empty());
    }

    #[test]
    fn test_development_is_not_production() {
        let config = AppConfig::from_env();
        if config.environment == "development" {
            assert!(!config.is_production());
        }
    }
}
