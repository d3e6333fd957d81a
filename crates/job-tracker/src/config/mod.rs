use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::workflows::followup::{DispatchSettings, EvaluationConfig, DEFAULT_WAIT_DAYS};

/// Distinguishes runtime behavior for different stages of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the tracker.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub followup: FollowUpConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let database_path = env::var("APP_DATABASE_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "job_search.db".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            database: DatabaseConfig {
                path: PathBuf::from(database_path),
            },
            followup: FollowUpConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the SQLite tracker database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// Follow-up timing and outbound safety switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUpConfig {
    pub default_wait_days: u32,
    pub max_per_run: usize,
    pub live_send_mode: bool,
    pub recipient: Option<String>,
    pub sender_name: String,
}

impl FollowUpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let default_wait_days = match non_empty_var("FOLLOWUP_DEFAULT_DAYS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|days| *days > 0)
                .ok_or(ConfigError::InvalidWaitDays { value: raw })?,
            None => DEFAULT_WAIT_DAYS,
        };

        let max_per_run = match non_empty_var("FOLLOWUP_MAX_PER_RUN") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or(ConfigError::InvalidMaxPerRun { value: raw })?,
            None => 10,
        };

        let live_send_mode = match non_empty_var("LIVE_SEND_MODE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidBool {
                var: "LIVE_SEND_MODE",
                value: raw,
            })?,
            None => false,
        };

        let recipient = non_empty_var("FOLLOWUP_RECIPIENT");
        if live_send_mode && recipient.is_none() {
            return Err(ConfigError::MissingRecipient);
        }

        let sender_name =
            non_empty_var("FOLLOWUP_SENDER_NAME").unwrap_or_else(|| "Job Seeker".to_string());

        Ok(Self {
            default_wait_days,
            max_per_run,
            live_send_mode,
            recipient,
            sender_name,
        })
    }

    pub fn evaluation_config(&self) -> EvaluationConfig {
        EvaluationConfig {
            default_wait_days: self.default_wait_days,
        }
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            live_send_mode: self.live_send_mode,
            recipient: self.recipient.clone(),
            sender_name: self.sender_name.clone(),
            max_per_run: self.max_per_run,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidWaitDays { value: String },
    InvalidMaxPerRun { value: String },
    InvalidBool { var: &'static str, value: String },
    MissingRecipient,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidWaitDays { value } => {
                write!(f, "FOLLOWUP_DEFAULT_DAYS must be a positive integer, got '{value}'")
            }
            ConfigError::InvalidMaxPerRun { value } => {
                write!(f, "FOLLOWUP_MAX_PER_RUN must be a positive integer, got '{value}'")
            }
            ConfigError::InvalidBool { var, value } => {
                write!(f, "{var} must be true or false, got '{value}'")
            }
            ConfigError::MissingRecipient => {
                write!(f, "FOLLOWUP_RECIPIENT is required when LIVE_SEND_MODE is enabled")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidWaitDays { .. }
            | ConfigError::InvalidMaxPerRun { .. }
            | ConfigError::InvalidBool { .. }
            | ConfigError::MissingRecipient => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for var in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_DATABASE_PATH",
            "FOLLOWUP_DEFAULT_DAYS",
            "FOLLOWUP_MAX_PER_RUN",
            "LIVE_SEND_MODE",
            "FOLLOWUP_RECIPIENT",
            "FOLLOWUP_SENDER_NAME",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.database.path, PathBuf::from("job_search.db"));
        assert_eq!(config.followup.default_wait_days, 7);
        assert_eq!(config.followup.max_per_run, 10);
        assert!(!config.followup.live_send_mode);
        assert_eq!(config.followup.sender_name, "Job Seeker");
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn rejects_non_positive_wait_days() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("FOLLOWUP_DEFAULT_DAYS", "0");
        let err = AppConfig::load().expect_err("zero days rejected");
        assert!(matches!(err, ConfigError::InvalidWaitDays { .. }));
        reset_env();
    }

    #[test]
    fn live_mode_requires_recipient() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LIVE_SEND_MODE", "true");
        let err = AppConfig::load().expect_err("recipient required");
        assert!(matches!(err, ConfigError::MissingRecipient));

        env::set_var("FOLLOWUP_RECIPIENT", "me@example.com");
        let config = AppConfig::load().expect("config loads");
        let settings = config.followup.dispatch_settings();
        assert!(settings.live_send_mode);
        assert_eq!(settings.recipient.as_deref(), Some("me@example.com"));
        reset_env();
    }

    #[test]
    fn follow_up_settings_flow_into_evaluation_config() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("FOLLOWUP_DEFAULT_DAYS", "5");
        env::set_var("FOLLOWUP_MAX_PER_RUN", "3");
        env::set_var("LIVE_SEND_MODE", "off");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.followup.evaluation_config().default_wait_days, 5);
        assert_eq!(config.followup.dispatch_settings().max_per_run, 3);
        assert!(!config.followup.live_send_mode);
        reset_env();
    }

    #[test]
    fn rejects_unrecognized_booleans() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LIVE_SEND_MODE", "maybe");
        let err = AppConfig::load().expect_err("bool rejected");
        assert!(err.to_string().contains("LIVE_SEND_MODE"));
        reset_env();
    }
}
