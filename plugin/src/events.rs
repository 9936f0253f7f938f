use crate::settings::{ButtonConfig, GlobalCredentials};

/// Lifecycle signals delivered by the host.
///
/// Transport-specific adapters translate their wire messages into these
/// variants; everything past this point is host-agnostic.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A key carrying this action became visible
    Appear {
        instance_id: String,
        settings: ButtonConfig,
    },

    /// The key is no longer visible (page switch, action removed, device gone)
    Disappear { instance_id: String },

    /// The user edited the key's settings
    SettingsChanged {
        instance_id: String,
        settings: ButtonConfig,
    },

    /// The physical key was pressed
    KeyPressed { instance_id: String },

    /// The plugin-wide settings (API token) were loaded or edited
    GlobalSettingsChanged { credentials: GlobalCredentials },
}

impl HostEvent {
    pub fn instance_id(&self) -> Option<&str> {
        match self {
            HostEvent::Appear { instance_id, .. }
            | HostEvent::Disappear { instance_id }
            | HostEvent::SettingsChanged { instance_id, .. }
            | HostEvent::KeyPressed { instance_id } => Some(instance_id),
            HostEvent::GlobalSettingsChanged { .. } => None,
        }
    }

    /// Stable event name for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            HostEvent::Appear { .. } => "appear",
            HostEvent::Disappear { .. } => "disappear",
            HostEvent::SettingsChanged { .. } => "settings_changed",
            HostEvent::KeyPressed { .. } => "key_pressed",
            HostEvent::GlobalSettingsChanged { .. } => "global_settings_changed",
        }
    }
}
