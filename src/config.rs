use crate::error::{Result, RotaError};
use crate::models::LatencyConfig;
use crate::proxy::{PoolConfig, PoolMode};
use crate::services::PoolRefreshConfig;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Registry storage configuration
    pub registry: RegistryConfig,
    /// Selection engine configuration
    pub pool: PoolSettings,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Directory holding store.json; `None` keeps the registry in memory
    pub data_dir: Option<PathBuf>,
    /// Latency tier thresholds, `None` when neither threshold is set
    pub latency: Option<LatencyConfig>,
}

#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Selection strategy (sequential, random, latency_first, weighted)
    pub mode: PoolMode,
    /// Relax latency filters when nothing matches
    pub fallback_enabled: bool,
    /// API key required for selection, `None` = open
    pub access_key: Option<String>,
    /// Seconds between scheduled pool refreshes
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let data_dir = get_env_or("ROTA_DATA_DIR", "data");
        let access_key = get_env_or("POOL_API_KEY", "");

        Ok(Config {
            registry: RegistryConfig {
                data_dir: (!data_dir.trim().is_empty()).then(|| PathBuf::from(data_dir.trim())),
                latency: parse_latency_config()?,
            },
            pool: PoolSettings {
                mode: PoolMode::from_str(&get_env_or("POOL_MODE", "sequential")),
                fallback_enabled: get_env_or("POOL_FALLBACK", "true")
                    .trim()
                    .parse()
                    .map_err(|_| {
                        RotaError::InvalidConfig("POOL_FALLBACK must be true or false".into())
                    })?,
                access_key: (!access_key.is_empty()).then_some(access_key),
                refresh_interval_secs: get_env_or("POOL_REFRESH_INTERVAL", "60")
                    .parse::<u64>()
                    .map_err(|_| {
                        RotaError::InvalidConfig(
                            "POOL_REFRESH_INTERVAL must be a number of seconds".into(),
                        )
                    })?
                    .max(1),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "json"),
            },
        })
    }

    /// Settings for the selection engine
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            mode: self.pool.mode,
            fallback_enabled: self.pool.fallback_enabled,
            access_key: self.pool.access_key.clone(),
        }
    }

    /// Settings for the background refresh task
    pub fn refresh_config(&self) -> PoolRefreshConfig {
        PoolRefreshConfig {
            interval: Duration::from_secs(self.pool.refresh_interval_secs),
        }
    }
}

fn parse_latency_config() -> Result<Option<LatencyConfig>> {
    let low = parse_threshold("LATENCY_LOW_THRESHOLD")?.filter(|v| *v > 0);
    let medium = parse_threshold("LATENCY_MEDIUM_THRESHOLD")?.filter(|v| *v > 0);

    // Without an explicit threshold the registry keeps whatever it loaded
    if low.is_none() && medium.is_none() {
        return Ok(None);
    }

    let defaults = LatencyConfig::default();
    let cfg = LatencyConfig {
        low_threshold: low.unwrap_or(defaults.low_threshold),
        medium_threshold: medium.unwrap_or(defaults.medium_threshold),
    };

    if !cfg.is_monotonic() {
        warn!(
            low = cfg.low_threshold,
            medium = cfg.medium_threshold,
            "LATENCY_LOW_THRESHOLD is above LATENCY_MEDIUM_THRESHOLD; medium tier will be empty"
        );
    }

    Ok(Some(cfg))
}

fn parse_threshold(key: &str) -> Result<Option<i64>> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| RotaError::InvalidConfig(format!("{} must be a number of milliseconds", key))),
        _ => Ok(None),
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const CONFIG_ENV_KEYS: &[&str] = &[
        "ROTA_DATA_DIR",
        "POOL_MODE",
        "POOL_FALLBACK",
        "POOL_API_KEY",
        "POOL_REFRESH_INTERVAL",
        "LATENCY_LOW_THRESHOLD",
        "LATENCY_MEDIUM_THRESHOLD",
        "LOG_LEVEL",
        "LOG_FORMAT",
    ];

    struct EnvGuard {
        saved: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(keys: &[&str]) -> Self {
            let saved = keys
                .iter()
                .map(|&key| {
                    let old = env::var(key).ok();
                    env::remove_var(key);
                    (key.to_string(), old)
                })
                .collect();

            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn test_config_from_env_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        let config = Config::from_env().unwrap();

        assert_eq!(config.registry.data_dir, Some(PathBuf::from("data")));
        assert!(config.registry.latency.is_none());
        assert_eq!(config.pool.mode, PoolMode::Sequential);
        assert!(config.pool.fallback_enabled);
        assert!(config.pool.access_key.is_none());
        assert_eq!(config.pool.refresh_interval_secs, 60);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_config_from_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("ROTA_DATA_DIR", "/var/lib/rota");
        env::set_var("POOL_MODE", "weighted");
        env::set_var("POOL_FALLBACK", "false");
        env::set_var("POOL_API_KEY", "secret");
        env::set_var("POOL_REFRESH_INTERVAL", "0");
        env::set_var("LATENCY_LOW_THRESHOLD", "80");
        env::set_var("LATENCY_MEDIUM_THRESHOLD", "250");

        let config = Config::from_env().unwrap();

        assert_eq!(
            config.registry.data_dir,
            Some(PathBuf::from("/var/lib/rota"))
        );
        assert_eq!(
            config.registry.latency,
            Some(LatencyConfig {
                low_threshold: 80,
                medium_threshold: 250,
            })
        );
        assert_eq!(config.pool.mode, PoolMode::Weighted);
        assert!(!config.pool.fallback_enabled);
        assert_eq!(config.pool.access_key.as_deref(), Some("secret"));
        assert_eq!(config.pool.refresh_interval_secs, 1);

        let pool = config.pool_config();
        assert_eq!(pool.mode, PoolMode::Weighted);
        assert_eq!(pool.access_key.as_deref(), Some("secret"));
        assert_eq!(config.refresh_config().interval, Duration::from_secs(1));
    }

    #[test]
    fn test_config_empty_data_dir_is_in_memory() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("ROTA_DATA_DIR", "");
        let config = Config::from_env().unwrap();
        assert!(config.registry.data_dir.is_none());
    }

    #[test]
    fn test_config_non_positive_thresholds_are_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("LATENCY_LOW_THRESHOLD", "0");
        env::set_var("LATENCY_MEDIUM_THRESHOLD", "-5");
        let config = Config::from_env().unwrap();
        assert!(config.registry.latency.is_none());
    }

    #[test]
    fn test_config_single_threshold_fills_other_from_default() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("LATENCY_MEDIUM_THRESHOLD", "500");
        let config = Config::from_env().unwrap();
        assert_eq!(
            config.registry.latency,
            Some(LatencyConfig {
                low_threshold: 100,
                medium_threshold: 500,
            })
        );
    }

    #[test]
    fn test_config_rejects_malformed_fallback_flag() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("POOL_FALLBACK", "ture");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, RotaError::InvalidConfig(_)));

        env::set_var("POOL_FALLBACK", "false");
        assert!(!Config::from_env().unwrap().pool.fallback_enabled);
    }

    #[test]
    fn test_config_invalid_numbers() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("LATENCY_LOW_THRESHOLD", "fast");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, RotaError::InvalidConfig(_)));

        env::remove_var("LATENCY_LOW_THRESHOLD");
        env::set_var("POOL_REFRESH_INTERVAL", "soon");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, RotaError::InvalidConfig(_)));
    }
}
