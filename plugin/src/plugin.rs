use crate::api::TaskSource;
use crate::error::RefreshError;
use crate::events::HostEvent;
use crate::host::Host;
use crate::pipeline::Refresher;
use crate::poller::Poller;
use crate::settings::ButtonConfig;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Routes host lifecycle events to the poller and the refresh pipeline.
///
/// All events and refresh requests are handled on one task, so the timer map
/// is never touched concurrently. Each pipeline run is spawned separately.
pub struct Plugin<H: ?Sized, S: ?Sized> {
    poller: Poller,
    refresher: Refresher<H, S>,
    refresh_rx: mpsc::UnboundedReceiver<String>,
}

impl<H, S> Plugin<H, S>
where
    H: Host + ?Sized + 'static,
    S: TaskSource + ?Sized + 'static,
{
    pub fn new(refresher: Refresher<H, S>, poll_interval: Duration) -> Self {
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
        Self {
            poller: Poller::new(poll_interval, refresh_tx),
            refresher,
            refresh_rx,
        }
    }

    /// Dispatch one host event
    pub fn handle_event(&mut self, event: HostEvent) {
        debug!(event = event.kind(), instance_id = ?event.instance_id(), "Host event received");

        match event {
            HostEvent::Appear {
                instance_id,
                settings,
            } => {
                self.poller.on_appear(&instance_id, &settings);
            }
            HostEvent::Disappear { instance_id } => {
                self.poller.on_disappear(&instance_id);
            }
            HostEvent::SettingsChanged {
                instance_id,
                settings,
            } => {
                self.spawn_render(instance_id, settings);
            }
            HostEvent::KeyPressed { instance_id } => {
                self.poller.request_refresh(&instance_id);
            }
            HostEvent::GlobalSettingsChanged { credentials } => {
                if self.refresher.credentials().update(credentials) {
                    // Keys that appeared before the token loaded are still blank
                    let queued = self.poller.refresh_all();
                    info!(refreshed_keys = queued, "Global settings updated");
                }
            }
        }
    }

    /// Run a full refresh (settings from the host, then render) in the background
    pub fn spawn_refresh(&self, instance_id: String) -> JoinHandle<()> {
        let refresher = self.refresher.clone();
        tokio::spawn(async move {
            let result = refresher.refresh(&instance_id).await;
            log_refresh_result(&instance_id, result);
        })
    }

    /// Render with settings already in hand, skipping the host round-trip
    pub fn spawn_render(&self, instance_id: String, settings: ButtonConfig) -> JoinHandle<()> {
        let refresher = self.refresher.clone();
        tokio::spawn(async move {
            let result = refresher.render(&instance_id, &settings).await;
            log_refresh_result(&instance_id, result);
        })
    }

    /// Process events and refresh requests until the event stream ends or
    /// `cancel_token` fires
    pub async fn run(mut self, mut events: mpsc::Receiver<HostEvent>, cancel_token: CancellationToken) {
        info!("Plugin dispatcher started");

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    info!("Shutdown signal received, stopping dispatcher");
                    break;
                }
                maybe_event = events.recv() => {
                    match maybe_event {
                        Some(event) => self.handle_event(event),
                        None => {
                            info!("Host event stream closed");
                            break;
                        }
                    }
                }
                Some(instance_id) = self.refresh_rx.recv() => {
                    self.spawn_refresh(instance_id);
                }
            }
        }

        self.poller.stop_all();
    }
}

fn log_refresh_result(instance_id: &str, result: Result<usize, RefreshError>) {
    match result {
        Ok(_) => {}
        Err(RefreshError::MissingCredentials) => {
            warn!(instance_id, "Refresh skipped, no API token configured");
        }
        Err(e) => {
            error!(instance_id, "Refresh failed, keeping previous image: {}", e);
        }
    }
}
