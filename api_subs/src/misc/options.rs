use common::env_config::Config;

use crate::services::state::{ActiveLabel, CancelPrecedence, ClassifierOptions};

/// Builds classifier options from the server configuration.
/// Unknown values are logged and replaced by the defaults.
impl From<&Config> for ClassifierOptions {
    fn from(config: &Config) -> Self {
        let cancel_precedence = config
            .cancel_precedence
            .parse::<CancelPrecedence>()
            .unwrap_or_else(|e| {
                log::warn!("SUBSCRIPTION_CANCEL_PRECEDENCE: {}, using default", e);
                CancelPrecedence::default()
            });
        let active_label = config.active_label.parse::<ActiveLabel>().unwrap_or_else(|e| {
            log::warn!("SUBSCRIPTION_ACTIVE_LABEL: {}, using default", e);
            ActiveLabel::default()
        });

        ClassifierOptions {
            cancel_precedence,
            active_label,
        }
    }
}
