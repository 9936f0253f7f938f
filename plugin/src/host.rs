use crate::error::HostError;
use crate::settings::ButtonConfig;
use async_trait::async_trait;

/// Calls the core makes back into the host application.
#[async_trait]
pub trait Host: Send + Sync {
    /// Fetch the current settings stored for a key instance.
    async fn request_settings(&self, instance_id: &str) -> Result<ButtonConfig, HostError>;

    /// Replace the image shown on a key. `image` is a data URI.
    async fn set_image(&self, instance_id: &str, image: &str) -> Result<(), HostError>;
}
