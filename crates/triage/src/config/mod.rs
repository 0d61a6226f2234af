use secrecy::SecretString;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SESSION_IDLE_SECS: u64 = 1800;

/// Distinguishes runtime behavior for different stages of the service.
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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub survey: SurveyConfig,
    pub access: AccessConfig,
    pub storage: StorageConfig,
    pub relay: Option<RelayConfig>,
    pub sessions: SessionConfig,
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

        let definition_path = env::var("TRIAGE_SURVEY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("survey.json"));

        let access_code = env::var("TRIAGE_ACCESS_CODE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingAccessCode)?;

        let database_path = match env::var("TRIAGE_DATABASE_PATH") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(PathBuf::from(value)),
            Err(_) => Some(PathBuf::from("responses.sqlite3")),
        };

        let relay = match env::var("TRIAGE_RELAY_URL") {
            Ok(url) if !url.trim().is_empty() => {
                let timeout_secs = env::var("TRIAGE_RELAY_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidRelayTimeout)?;
                let token = env::var("TRIAGE_RELAY_TOKEN")
                    .ok()
                    .filter(|value| !value.trim().is_empty())
                    .map(SecretString::new);

                Some(RelayConfig {
                    url: url.trim().to_string(),
                    timeout: Duration::from_secs(timeout_secs),
                    token,
                })
            }
            _ => None,
        };

        let idle_secs = env::var("TRIAGE_SESSION_IDLE_SECS")
            .unwrap_or_else(|_| DEFAULT_SESSION_IDLE_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidSessionIdle)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            survey: SurveyConfig { definition_path },
            access: AccessConfig {
                code: SecretString::new(access_code),
            },
            storage: StorageConfig { database_path },
            relay,
            sessions: SessionConfig {
                idle_timeout: Duration::from_secs(idle_secs),
            },
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the questionnaire definition lives.
#[derive(Debug, Clone)]
pub struct SurveyConfig {
    pub definition_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AccessConfig {
    pub code: SecretString,
}

/// Local response store; `None` disables it.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
}

/// Optional outbound relay of response records.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub url: String,
    pub timeout: Duration,
    pub token: Option<SecretString>,
}

/// Lifetime of abandoned interactive sessions.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub idle_timeout: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingAccessCode,
    InvalidRelayTimeout,
    InvalidSessionIdle,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingAccessCode => {
                write!(f, "TRIAGE_ACCESS_CODE must be set to a non-empty value")
            }
            ConfigError::InvalidRelayTimeout => {
                write!(f, "TRIAGE_RELAY_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::InvalidSessionIdle => {
                write!(f, "TRIAGE_SESSION_IDLE_SECS must be a whole number of seconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
