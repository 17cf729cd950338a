//! Sync status indicator.

use serde::Serialize;

use crate::config::IndicatorConfig;
use crate::sync::SyncStatus;

/// What the "Link with Editor" button shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorView {
    pub icon: String,
    pub tooltip: String,
    /// Toggle button state.
    pub checked: bool,
    /// Tracked status, independent of the icon policy.
    pub status: SyncStatus,
}

/// Renders synchronizer state as icon and tooltip.
#[derive(Debug, Clone, Default)]
pub struct Indicator {
    config: IndicatorConfig,
}

impl Indicator {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    /// Pure function of status and link state.
    pub fn render(&self, status: SyncStatus, enabled: bool) -> IndicatorView {
        let broken = status == SyncStatus::Broken && (enabled || self.config.show_broken_when_disabled);
        let (icon, tooltip) = if broken {
            (&self.config.broken_icon, &self.config.broken_tooltip)
        } else {
            (&self.config.synced_icon, &self.config.synced_tooltip)
        };
        IndicatorView {
            icon: icon.clone(),
            tooltip: tooltip.clone(),
            checked: enabled,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_BROKEN_ICON, DEFAULT_SYNCED_ICON};

    #[test]
    fn test_broken_icon_regardless_of_link_state() {
        let indicator = Indicator::default();
        assert_eq!(indicator.render(SyncStatus::Broken, true).icon, DEFAULT_BROKEN_ICON);
        let view = indicator.render(SyncStatus::Broken, false);
        assert_eq!(view.icon, DEFAULT_BROKEN_ICON);
        assert!(!view.checked);
        assert_eq!(indicator.render(SyncStatus::Synced, false).icon, DEFAULT_SYNCED_ICON);
    }

    #[test]
    fn test_synced_icon_when_disabled_policy() {
        let indicator = Indicator::new(IndicatorConfig {
            show_broken_when_disabled: false,
            ..IndicatorConfig::default()
        });
        let view = indicator.render(SyncStatus::Broken, false);
        assert_eq!(view.icon, DEFAULT_SYNCED_ICON);
        assert_eq!(view.status, SyncStatus::Broken);
        assert_eq!(indicator.render(SyncStatus::Broken, true).icon, DEFAULT_BROKEN_ICON);
    }
}
