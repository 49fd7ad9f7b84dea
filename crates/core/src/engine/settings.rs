//! Engine settings.

use rentbook_shared::config::LedgerConfig;

/// Runtime knobs for [`super::LedgerEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Serialise operations that touch the same invoice or tenant credit.
    pub lock_invoices: bool,
    /// Resync the invoice cache whenever an invoice is loaded.
    pub reconcile_on_read: bool,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            lock_invoices: true,
            reconcile_on_read: true,
        }
    }
}

impl From<&LedgerConfig> for LedgerSettings {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            lock_invoices: config.lock_invoices,
            reconcile_on_read: config.reconcile_on_read,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_follow_config() {
        let config = LedgerConfig {
            lock_invoices: false,
            reconcile_on_read: true,
        };
        let settings = LedgerSettings::from(&config);
        assert!(!settings.lock_invoices);
        assert_eq!(LedgerSettings::from(&LedgerConfig::default()), LedgerSettings::default());
    }
}
