//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Ledger engine configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Ledger engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Serialise operations that touch the same invoice.
    #[serde(default = "default_true")]
    pub lock_invoices: bool,
    /// Resync the invoice cache from the ledger whenever it is loaded.
    #[serde(default = "default_true")]
    pub reconcile_on_read: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_invoices: true,
            reconcile_on_read: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "rentbook=info".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("RENTBOOK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_sources() {
        temp_env::with_vars_unset(
            [
                "RENTBOOK__LEDGER__LOCK_INVOICES",
                "RENTBOOK__LEDGER__RECONCILE_ON_READ",
                "RENTBOOK__LOGGING__FILTER",
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert!(config.ledger.lock_invoices);
                assert!(config.ledger.reconcile_on_read);
                assert_eq!(config.logging.filter, "rentbook=info");
            },
        );
    }

    #[test]
    fn test_environment_overrides() {
        temp_env::with_vars(
            [
                ("RENTBOOK__LEDGER__RECONCILE_ON_READ", Some("false")),
                ("RENTBOOK__LEDGER__LOCK_INVOICES", Some("false")),
                ("RENTBOOK__LOGGING__FILTER", Some("rentbook=trace")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert!(!config.ledger.reconcile_on_read);
                assert!(!config.ledger.lock_invoices);
                assert_eq!(config.logging.filter, "rentbook=trace");
            },
        );
    }
}
