// Server configuration from the environment

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use cirrus_aws::s3::{
    DEFAULT_LIST_DEADLINE, DEFAULT_MAX_CONCURRENCY, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE,
    ListerConfig, ResolutionPolicy,
};
use cirrus_core::CorsConfig;
use cirrus_core::logging::{LogConfig, LogFormat, LogLevel};
use cirrus_core::resilience::{BackoffStrategy, RetryConfig};
use thiserror::Error;

/// Prefix shared by every server variable.
pub const ENV_PREFIX: &str = "CIRRUS";

/// Largest accepted `CIRRUS_LIST_DEADLINE_SECS` (one day).
pub const MAX_LIST_DEADLINE_SECS: u64 = 86_400;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },

    #[error("Failed to load configuration: {0}")]
    Load(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Everything the server reads at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Allowed CORS origins; `*` accepts any origin.
    pub cors_origins: Vec<String>,
    pub list_deadline: Duration,
    pub max_concurrency: usize,
    pub region_policy: ResolutionPolicy,
    pub retry_attempts: u32,
    /// First retry wait; later waits grow linearly by the same amount.
    pub retry_base: Duration,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            list_deadline: DEFAULT_LIST_DEADLINE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            region_policy: ResolutionPolicy::default(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base: DEFAULT_RETRY_BASE,
            log_level: LogLevel::Info,
            log_format: LogFormat::Json,
        }
    }
}

impl ServerConfig {
    /// Read `.env` when present, then the process environment.
    pub fn from_env() -> Result<Self> {
        Self::load_dotenv(None)?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load a dotenv file into the process environment.
    ///
    /// A missing default `.env` is ignored; a missing explicit path is an error.
    pub fn load_dotenv(path: Option<&str>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::Load(e.to_string()))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        Ok(())
    }

    /// Build from any variable lookup; unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };
        let defaults = Self::default();

        Ok(Self {
            host: vars.parsed("HOST")?.unwrap_or(defaults.host),
            port: vars.parsed("PORT")?.unwrap_or(defaults.port),
            cors_origins: vars
                .get("CORS_ORIGINS")
                .map(|(_, raw)| split_list(&raw))
                .filter(|origins| !origins.is_empty())
                .unwrap_or(defaults.cors_origins),
            list_deadline: vars
                .parsed_with("LIST_DEADLINE_SECS", |s| {
                    s.parse::<u64>().ok().filter(|n| *n <= MAX_LIST_DEADLINE_SECS)
                })?
                .map(Duration::from_secs)
                .unwrap_or(defaults.list_deadline),
            max_concurrency: vars
                .parsed_with("MAX_CONCURRENCY", |s| s.parse::<usize>().ok().filter(|n| *n > 0))?
                .unwrap_or(defaults.max_concurrency),
            region_policy: vars
                .parsed_with("REGION_POLICY", ResolutionPolicy::parse)?
                .unwrap_or(defaults.region_policy),
            retry_attempts: vars
                .parsed_with("RETRY_ATTEMPTS", |s| s.parse::<u32>().ok().filter(|n| *n > 0))?
                .unwrap_or(defaults.retry_attempts),
            retry_base: vars
                .parsed::<u64>("RETRY_BASE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base),
            log_level: vars
                .parsed_with("LOG_LEVEL", LogLevel::parse)?
                .unwrap_or(defaults.log_level),
            log_format: vars
                .parsed_with("LOG_FORMAT", LogFormat::parse)?
                .unwrap_or(defaults.log_format),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn lister_config(&self) -> ListerConfig {
        ListerConfig::new()
            .deadline(self.list_deadline)
            .max_concurrency(self.max_concurrency)
            .policy(self.region_policy)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.retry_attempts)
            .backoff(BackoffStrategy::linear(self.retry_base, self.retry_base))
    }

    /// CORS for the dashboard frontend, with credentials allowed.
    pub fn cors(&self) -> CorsConfig {
        CorsConfig::from_origins(self.cors_origins.iter().cloned()).allow_credentials(true)
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig::new().level(self.log_level).format(self.log_format)
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Full key and trimmed value; blank values count as unset.
    fn get(&self, name: &str) -> Option<(String, String)> {
        let key = format!("{ENV_PREFIX}_{name}");
        let value = (self.lookup)(&key)?;
        let value = value.trim();
        (!value.is_empty()).then(|| (key, value.to_string()))
    }

    fn parsed<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.parsed_with(name, |s| s.parse().ok())
    }

    fn parsed_with<T>(&self, name: &str, parse: impl Fn(&str) -> Option<T>) -> Result<Option<T>> {
        match self.get(name) {
            None => Ok(None),
            Some((key, value)) => match parse(&value) {
                Some(parsed) => Ok(Some(parsed)),
                None => Err(ConfigError::Invalid { key, value }),
            },
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
