use crate::error::{AppError, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub features: FeatureConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct FeatureConfig {
    /// Serve in-memory sample data instead of PostgreSQL.
    pub demo_mode: bool,
    /// Minimum confidence for automatic category assignment.
    pub auto_classify_threshold: f64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let demo_mode = parse_bool(&env::var("DEMO_MODE").unwrap_or_else(|_| "false".to_string()))?;

        // Demo mode never touches the database, so the URL may be absent.
        let database_url = match env::var("DB_URL") {
            Ok(url) => url,
            Err(_) if demo_mode => String::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .map_err(|_| AppError::ConfigError("Invalid PORT value".to_string()))?,
                max_body_size: env::var("MAX_BODY_SIZE")
                    .unwrap_or_else(|_| "10485760".to_string())
                    .parse()
                    .map_err(|_| AppError::ConfigError("Invalid MAX_BODY_SIZE value".to_string()))?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .map_err(|_| {
                        AppError::ConfigError("Invalid DB_MAX_CONNECTIONS value".to_string())
                    })?,
            },
            cors: CorsConfig {
                allowed_origins: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:5173".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            auth: AuthConfig {
                jwt_secret: match env::var("JWT_SECRET") {
                    Ok(secret) => secret,
                    Err(_) if demo_mode => "demo-secret".to_string(),
                    Err(_) => {
                        return Err(AppError::ConfigError("JWT_SECRET not set".to_string()));
                    }
                },
                token_ttl_hours: env::var("JWT_EXPIRATION_HOURS")
                    .unwrap_or_else(|_| "12".to_string())
                    .parse()
                    .map_err(|_| {
                        AppError::ConfigError("Invalid JWT_EXPIRATION_HOURS value".to_string())
                    })?,
            },
            features: FeatureConfig {
                demo_mode,
                auto_classify_threshold: env::var("AUTO_CLASSIFY_THRESHOLD")
                    .unwrap_or_else(|_| "40".to_string())
                    .parse()
                    .map_err(|_| {
                        AppError::ConfigError("Invalid AUTO_CLASSIFY_THRESHOLD value".to_string())
                    })?,
            },
        })
    }

    /// Configuration used by demo mode and the router tests.
    pub fn demo() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                max_body_size: 10 * 1024 * 1024,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 1,
            },
            cors: CorsConfig {
                allowed_origins: vec!["http://localhost:5173".to_string()],
            },
            auth: AuthConfig {
                jwt_secret: "demo-secret".to_string(),
                token_ttl_hours: 12,
            },
            features: FeatureConfig {
                demo_mode: true,
                auto_classify_threshold: 40.0,
            },
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::ConfigError(format!(
            "Invalid boolean value: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("true", true)]
    #[case("1", true)]
    #[case("ON", true)]
    #[case("false", false)]
    #[case("", false)]
    fn parses_boolean_flags(#[case] raw: &str, #[case] expected: bool) {
        assert_eq!(parse_bool(raw).unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_boolean() {
        assert!(matches!(parse_bool("maybe"), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn demo_config_enables_demo_mode() {
        let config = AppConfig::demo();
        assert!(config.features.demo_mode);
        assert_eq!(config.server_address(), "127.0.0.1:3000");
    }
}
