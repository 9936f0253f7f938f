use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.todoist.com/rest/v2";

/// Runtime knobs for the plugin, overridable from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct PluginConfig {
    pub poll_interval_secs: u64,
    pub api_base_url: String,
    /// How long to wait for the host to answer a settings request
    pub settings_timeout_secs: u64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            settings_timeout_secs: 10,
        }
    }
}

macro_rules! env_or_default {
    ($config:expr, $field:ident, $env_var:expr) => {
        if let Ok(val) = std::env::var($env_var)
            && let Ok(parsed) = val.trim().parse()
        {
            $config.$field = parsed;
        }
    };
}

impl PluginConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        env_or_default!(config, poll_interval_secs, "TASK_COUNTER_POLL_INTERVAL_SECS");
        env_or_default!(config, api_base_url, "TASK_COUNTER_API_BASE_URL");
        env_or_default!(config, settings_timeout_secs, "TASK_COUNTER_SETTINGS_TIMEOUT_SECS");

        // A zero period would make tokio's interval panic
        config.poll_interval_secs = config.poll_interval_secs.max(1);
        config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();

        config
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn settings_timeout(&self) -> Duration {
        Duration::from_secs(self.settings_timeout_secs)
    }
}
