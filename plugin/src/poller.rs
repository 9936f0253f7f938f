use crate::settings::ButtonConfig;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Keeps exactly one refresh timer per visible key.
///
/// Timers do not fetch anything themselves; each tick only queues the key's
/// instance id on the refresh channel, and the dispatcher runs the pipeline.
#[derive(Debug)]
pub struct Poller {
    interval: Duration,
    refresh_tx: mpsc::UnboundedSender<String>,
    timers: HashMap<String, CancellationToken>,
}

impl Poller {
    pub fn new(interval: Duration, refresh_tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            interval,
            refresh_tx,
            timers: HashMap::new(),
        }
    }

    /// Start polling for a key that became visible.
    ///
    /// Returns true if a new timer was created. A key with a filter also gets
    /// one immediate refresh so it does not sit stale for a full interval.
    pub fn on_appear(&mut self, instance_id: &str, config: &ButtonConfig) -> bool {
        let created = if self.timers.contains_key(instance_id) {
            debug!(instance_id, "Timer already registered");
            false
        } else {
            let token = CancellationToken::new();
            tokio::spawn(run_timer(
                instance_id.to_string(),
                self.interval,
                self.refresh_tx.clone(),
                token.clone(),
            ));
            self.timers.insert(instance_id.to_string(), token);
            info!(
                instance_id,
                interval_secs = self.interval.as_secs(),
                active_timers = self.timers.len(),
                "Polling started"
            );
            true
        };

        if config.has_filter() {
            self.request_refresh(instance_id);
        }

        created
    }

    /// Stop polling for a key. Returns true if a timer was cancelled.
    pub fn on_disappear(&mut self, instance_id: &str) -> bool {
        match self.timers.remove(instance_id) {
            Some(token) => {
                token.cancel();
                info!(
                    instance_id,
                    active_timers = self.timers.len(),
                    "Polling stopped"
                );
                true
            }
            None => {
                debug!(instance_id, "No timer to stop");
                false
            }
        }
    }

    /// Queue one refresh for a key outside of its timer schedule
    pub fn request_refresh(&self, instance_id: &str) {
        if self.refresh_tx.send(instance_id.to_string()).is_err() {
            warn!(instance_id, "Refresh channel closed, dropping request");
        }
    }

    /// Queue one refresh for every key currently being polled
    pub fn refresh_all(&self) -> usize {
        for instance_id in self.timers.keys() {
            self.request_refresh(instance_id);
        }
        self.timers.len()
    }

    pub fn is_polling(&self, instance_id: &str) -> bool {
        self.timers.contains_key(instance_id)
    }

    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    /// Cancel every timer
    pub fn stop_all(&mut self) {
        for (_, token) in self.timers.drain() {
            token.cancel();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop_all();
    }
}

async fn run_timer(
    instance_id: String,
    period: Duration,
    refresh_tx: mpsc::UnboundedSender<String>,
    cancel_token: CancellationToken,
) {
    // First tick one full period after appearance
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {
                debug!(instance_id = %instance_id, "Poll timer fired");
                if refresh_tx.send(instance_id.clone()).is_err() {
                    break;
                }
            }
        }
    }

    debug!(instance_id = %instance_id, "Poll timer exited");
}
