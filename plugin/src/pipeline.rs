use crate::api::TaskSource;
use crate::error::RefreshError;
use crate::host::Host;
use crate::icon::render_icon;
use crate::settings::ButtonConfig;
use crate::state::CredentialStore;
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span};

/// Turns a refresh signal into a new key image.
///
/// Cheap to clone; every run works on its own settings and count, so runs for
/// the same key may overlap without affecting each other.
pub struct Refresher<H: ?Sized, S: ?Sized> {
    host: Arc<H>,
    source: Arc<S>,
    credentials: CredentialStore,
}

impl<H: ?Sized, S: ?Sized> Clone for Refresher<H, S> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
            source: Arc::clone(&self.source),
            credentials: self.credentials.clone(),
        }
    }
}

impl<H, S> Refresher<H, S>
where
    H: Host + ?Sized,
    S: TaskSource + ?Sized,
{
    pub fn new(host: Arc<H>, source: Arc<S>, credentials: CredentialStore) -> Self {
        Self {
            host,
            source,
            credentials,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Ask the host for the key's current settings, then render with them
    pub async fn refresh(&self, instance_id: &str) -> Result<usize, RefreshError> {
        let config = self.host.request_settings(instance_id).await?;
        self.render(instance_id, &config).await
    }

    /// Fetch the task count for `config` and push the resulting image.
    ///
    /// On any failure the host is not touched, so the previous image stays up.
    /// Everything logged underneath, including fetcher errors, carries the
    /// instance id and filter through the `refresh` span.
    pub async fn render(&self, instance_id: &str, config: &ButtonConfig) -> Result<usize, RefreshError> {
        let span = info_span!("refresh", instance_id, filter = %config.item_filter);
        self.render_in_span(instance_id, config).instrument(span).await
    }

    async fn render_in_span(&self, instance_id: &str, config: &ButtonConfig) -> Result<usize, RefreshError> {
        let credentials = self.credentials.current();
        if !credentials.has_token() {
            return Err(RefreshError::MissingCredentials);
        }

        if !config.has_filter() {
            debug!("Empty filter, counting without constraint");
        }

        let count = self
            .source
            .count_tasks(&credentials.api_token, &config.item_filter)
            .await?;

        let image = render_icon(count, config);
        self.host.set_image(instance_id, &image).await?;

        info!(count, "Key image updated");

        Ok(count)
    }
}
