//! Environment-driven application configuration.

use anyhow::Context;
use figment::value::UncasedStr;
use figment::{Figment, providers::Env};
use fundu::DurationParser;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Railway sets this during deploy draining; treat it as our shutdown budget.
const RAILWAY_DRAINING: &str = "RAILWAY_DEPLOYMENT_DRAINING_SECONDS";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(
        default = "default_db_acquire_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub db_acquire_timeout: Duration,
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_db_max_connections() -> u32 {
    4
}

fn default_db_acquire_timeout() -> Duration {
    Duration::from_secs(4)
}

impl Config {
    /// Build the figment used for extraction. Split out so tests can extract
    /// from a jailed environment.
    ///
    /// An explicit `SHUTDOWN_TIMEOUT` takes precedence over Railway's draining value.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Env::raw().only(&[RAILWAY_DRAINING]).map(|k| {
                if k == UncasedStr::new(RAILWAY_DRAINING) {
                    "SHUTDOWN_TIMEOUT".into()
                } else {
                    k.into()
                }
            }))
            .merge(Env::raw().ignore(&[RAILWAY_DRAINING]))
    }

    /// Load configuration from the process environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::figment()
            .extract()
            .context("Failed to load config")
    }
}

/// Parse a human duration (`8s`, `500ms`, `2m`). Bare numbers are seconds.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let parsed = DurationParser::with_all_time_units()
        .parse(value.trim())
        .map_err(|e| format!("invalid duration '{value}': {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration '{value}': {e}"))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    // Env values that look numeric arrive as numbers, everything else as strings.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        FractionalSeconds(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::FractionalSeconds(secs) => Duration::try_from_secs_f64(secs)
            .map_err(|e| serde::de::Error::custom(format!("invalid duration '{secs}': {e}"))),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("DATABASE_URL", "postgres://localhost/bootcheck");
            let config: Config = Config::figment().extract()?;
            assert_eq!(config.database_url, "postgres://localhost/bootcheck");
            assert_eq!(config.port, 8080);
            assert_eq!(config.log_level, "info");
            assert_eq!(config.shutdown_timeout, Duration::from_secs(8));
            assert_eq!(config.db_max_connections, 4);
            assert_eq!(config.db_acquire_timeout, Duration::from_secs(4));
            Ok(())
        });
    }

    #[test]
    fn missing_database_url_is_an_error() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            assert!(Config::figment().extract::<Config>().is_err());
            Ok(())
        });
    }

    #[test]
    fn railway_draining_seconds_maps_to_shutdown_timeout() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("DATABASE_URL", "postgres://localhost/bootcheck");
            jail.set_env(RAILWAY_DRAINING, "30");
            let config: Config = Config::figment().extract()?;
            assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
            Ok(())
        });
    }

    #[test]
    fn explicit_shutdown_timeout_beats_railway_draining() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("DATABASE_URL", "postgres://localhost/bootcheck");
            jail.set_env(RAILWAY_DRAINING, "30");
            jail.set_env("SHUTDOWN_TIMEOUT", "5s");
            let config: Config = Config::figment().extract()?;
            assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
            Ok(())
        });
    }

    #[test]
    fn fractional_seconds_are_accepted() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("DATABASE_URL", "postgres://localhost/bootcheck");
            jail.set_env("SHUTDOWN_TIMEOUT", "1.5");
            let config: Config = Config::figment().extract()?;
            assert_eq!(config.shutdown_timeout, Duration::from_millis(1500));
            Ok(())
        });
    }

    #[test]
    fn negative_seconds_are_rejected() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("DATABASE_URL", "postgres://localhost/bootcheck");
            jail.set_env("SHUTDOWN_TIMEOUT", "-2.5");
            assert!(Config::figment().extract::<Config>().is_err());
            Ok(())
        });
    }

    #[test]
    fn durations_accept_units() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("DATABASE_URL", "postgres://localhost/bootcheck");
            jail.set_env("SHUTDOWN_TIMEOUT", "1500ms");
            jail.set_env("DB_ACQUIRE_TIMEOUT", "2m");
            let config: Config = Config::figment().extract()?;
            assert_eq!(config.shutdown_timeout, Duration::from_millis(1500));
            assert_eq!(config.db_acquire_timeout, Duration::from_secs(120));
            Ok(())
        });
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("soon").is_err());
        assert_eq!(parse_duration(" 3 ").unwrap(), Duration::from_secs(3));
    }
}
