//! Server configuration read from the environment.

use std::time::Duration;

use crate::error::AppError;

const DEFAULT_STORE_URL: &str = "sqlite://hushcalc.db?mode=rwc";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TICK_MS: u64 = 50;
const DEFAULT_TYPING_MS_PER_CHAR: u64 = 45;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `SQLite` URL of the progress store.
    pub store_url: String,
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Interval between session ticks.
    pub tick: Duration,
    /// Typing animation speed.
    pub typing_ms_per_char: u64,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl AppConfig {
    /// Reads `STORE_URL`, `HOST`, `PORT`, `TICK_MS`, `TYPING_MS_PER_CHAR`
    /// and `RNG_SEED`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, with variables resolved by `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let store_url = lookup("STORE_URL").unwrap_or_else(|| DEFAULT_STORE_URL.to_string());
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse(&lookup, "PORT")?.unwrap_or(DEFAULT_PORT);
        let tick_ms = parse(&lookup, "TICK_MS")?.unwrap_or(DEFAULT_TICK_MS);
        if tick_ms == 0 {
            return Err(AppError::Config("TICK_MS must be greater than zero".into()));
        }
        let typing_ms_per_char =
            parse(&lookup, "TYPING_MS_PER_CHAR")?.unwrap_or(DEFAULT_TYPING_MS_PER_CHAR);
        let rng_seed = parse(&lookup, "RNG_SEED")?;

        Ok(Self {
            store_url,
            host,
            port,
            tick: Duration::from_millis(tick_ms),
            typing_ms_per_char,
            rng_seed,
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| AppError::Config(format!("{name} is invalid: {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.store_url, DEFAULT_STORE_URL);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.tick, Duration::from_millis(50));
        assert_eq!(config.typing_ms_per_char, 45);
        assert_eq!(config.rng_seed, None);
    }

    #[test]
    fn test_values_are_read_from_the_environment() {
        let config = config_from(&[
            ("STORE_URL", "sqlite::memory:"),
            ("PORT", "8080"),
            ("TICK_MS", "20"),
            ("RNG_SEED", "7"),
        ])
        .unwrap();

        assert_eq!(config.store_url, "sqlite::memory:");
        assert_eq!(config.port, 8080);
        assert_eq!(config.tick, Duration::from_millis(20));
        assert_eq!(config.rng_seed, Some(7));
    }

    #[test]
    fn test_invalid_port_is_a_config_error() {
        let result = config_from(&[("PORT", "eighty")]);

        assert!(matches!(result, Err(AppError::Config(msg)) if msg.starts_with("PORT")));
    }

    #[test]
    fn test_zero_tick_is_rejected() {
        let result = config_from(&[("TICK_MS", "0")]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
