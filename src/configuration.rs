use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub log: LogSettings,
}

/// Deployment environment; drives cookie security and log format
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub environment: Environment,
    /// How often expired refresh-token records are purged, e.g. "1h"
    #[serde(
        default = "default_sweep_interval",
        deserialize_with = "deserialize_nonzero_duration"
    )]
    pub sweep_interval: Duration,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!("{}/{}", self.connection_string_without_db(), self.database_name)
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct LogSettings {
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// JWT signing settings. Access and refresh tokens use independent secrets.
#[derive(Deserialize, Clone, Debug)]
pub struct JwtSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    #[serde(deserialize_with = "deserialize_nonzero_duration")]
    pub access_token_expiry: Duration,
    #[serde(deserialize_with = "deserialize_nonzero_duration")]
    pub refresh_token_expiry: Duration,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

/// Token lifetimes and the sweep period must be strictly positive.
fn deserialize_nonzero_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let duration = parse_duration(&raw).map_err(serde::de::Error::custom)?;
    if duration.is_zero() {
        return Err(serde::de::Error::custom(format!(
            "duration '{}' must be greater than zero",
            raw
        )));
    }
    Ok(duration)
}

/// Parse a human-readable duration such as `"15m"`, `"7d"` or `"30s"`.
///
/// Supported units: `ms`, `s`, `m`, `h`, `d`, `w`. A bare number is seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim().to_lowercase();
    if s.is_empty() {
        return Err("duration is empty".to_string());
    }

    let split_at = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split_at);

    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{}'", input))?;

    let millis_per_unit: u64 = match unit.trim() {
        "ms" => 1,
        "" | "s" => 1_000,
        "m" => 60 * 1_000,
        "h" => 60 * 60 * 1_000,
        "d" => 24 * 60 * 60 * 1_000,
        "w" => 7 * 24 * 60 * 60 * 1_000,
        other => return Err(format!("unknown duration unit '{}' in '{}'", other, input)),
    };

    value
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration '{}' overflows", input))
}

/// Load settings from `configuration.yaml` (optional) overlaid with
/// `APP_`-prefixed environment variables, e.g. `APP_JWT__ACCESS_SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
