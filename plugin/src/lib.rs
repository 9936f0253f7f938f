pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod icon;
pub mod pipeline;
pub mod plugin;
pub mod poller;
pub mod settings;
pub mod state;
pub mod streamdeck;

pub use api::{TaskSource, TodoistClient, fetch_task_count_with_base_url};
pub use app::run;
pub use error::{HostError, LaunchError, RefreshError, RemoteQueryError};
pub use events::HostEvent;
pub use host::Host;
pub use pipeline::Refresher;
pub use plugin::Plugin;
pub use settings::{ButtonConfig, GlobalCredentials};
pub use state::CredentialStore;
