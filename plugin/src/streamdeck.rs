use crate::api::TodoistClient;
use crate::config::PluginConfig;
use crate::error::{HostError, LaunchError};
use crate::events::HostEvent;
use crate::host::Host;
use crate::pipeline::Refresher;
use crate::plugin::Plugin;
use crate::settings::{ButtonConfig, GlobalCredentials};
use crate::state::CredentialStore;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Arguments the Stream Deck application passes when it launches the plugin
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchArgs {
    pub port: u16,
    pub plugin_uuid: String,
    pub register_event: String,
    pub info: Option<String>,
}

impl LaunchArgs {
    /// Parse `-port 28196 -pluginUUID ... -registerEvent ... -info {...}`
    pub fn parse<I>(args: I) -> Result<Self, LaunchError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut port = None;
        let mut plugin_uuid = None;
        let mut register_event = None;
        let mut info = None;

        let mut args = args.into_iter();
        while let Some(flag) = args.next() {
            let slot = match flag.as_str() {
                "-port" => &mut port,
                "-pluginUUID" => &mut plugin_uuid,
                "-registerEvent" => &mut register_event,
                "-info" => &mut info,
                other => {
                    debug!(argument = other, "Ignoring unknown launch argument");
                    continue;
                }
            };
            *slot = args.next();
        }

        let port = port.ok_or(LaunchError::MissingArgument("port"))?;
        let port = port
            .parse()
            .map_err(|_| LaunchError::InvalidArgument {
                name: "port",
                value: port.clone(),
            })?;

        Ok(Self {
            port,
            plugin_uuid: plugin_uuid.ok_or(LaunchError::MissingArgument("pluginUUID"))?,
            register_event: register_event.ok_or(LaunchError::MissingArgument("registerEvent"))?,
            info,
        })
    }

    pub fn websocket_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Version of the Stream Deck application, if `-info` carried one
    pub fn host_version(&self) -> Option<String> {
        let info: serde_json::Value = serde_json::from_str(self.info.as_deref()?).ok()?;
        info.get("application")?
            .get("version")?
            .as_str()
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize)]
struct InboundMessage {
    event: String,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Decode one inbound WebSocket text frame.
///
/// Returns `Ok(None)` for events this plugin does not act on.
pub fn decode_event(text: &str) -> Result<Option<HostEvent>, HostError> {
    let message: InboundMessage = serde_json::from_str(text)?;
    let context = || {
        message
            .context
            .clone()
            .ok_or_else(|| HostError::Protocol(format!("{} without context", message.event)))
    };
    let settings = || ButtonConfig::from_value(message.payload.get("settings").cloned().unwrap_or_default());

    let event = match message.event.as_str() {
        "willAppear" => HostEvent::Appear {
            instance_id: context()?,
            settings: settings()?,
        },
        "willDisappear" => HostEvent::Disappear {
            instance_id: context()?,
        },
        "didReceiveSettings" => HostEvent::SettingsChanged {
            instance_id: context()?,
            settings: settings()?,
        },
        "keyDown" => HostEvent::KeyPressed {
            instance_id: context()?,
        },
        "didReceiveGlobalSettings" => HostEvent::GlobalSettingsChanged {
            credentials: GlobalCredentials::from_value(
                message.payload.get("settings").cloned().unwrap_or_default(),
            )?,
        },
        _ => return Ok(None),
    };

    Ok(Some(event))
}

pub fn register_message(args: &LaunchArgs) -> serde_json::Value {
    json!({ "event": args.register_event, "uuid": args.plugin_uuid })
}

pub fn get_global_settings_message(plugin_uuid: &str) -> serde_json::Value {
    json!({ "event": "getGlobalSettings", "context": plugin_uuid })
}

pub fn get_settings_message(instance_id: &str) -> serde_json::Value {
    json!({ "event": "getSettings", "context": instance_id })
}

pub fn set_image_message(instance_id: &str, image: &str) -> serde_json::Value {
    // target 0 = hardware and software
    json!({
        "event": "setImage",
        "context": instance_id,
        "payload": { "image": image, "target": 0 }
    })
}

type SettingsWaiters = HashMap<String, Vec<oneshot::Sender<ButtonConfig>>>;

/// `Host` implementation that speaks the Stream Deck WebSocket protocol.
///
/// Outbound frames go through a channel drained by the socket writer task.
/// Settings requests are answered asynchronously by `didReceiveSettings`, so
/// callers park on a oneshot until the reader hands the reply over.
#[derive(Debug)]
pub struct StreamDeckHost {
    outbound: mpsc::UnboundedSender<String>,
    pending: Mutex<SettingsWaiters>,
    settings_timeout: Duration,
}

impl StreamDeckHost {
    pub fn new(settings_timeout: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let host = Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            settings_timeout,
        };
        (host, outbound_rx)
    }

    fn send(&self, message: serde_json::Value) -> Result<(), HostError> {
        self.outbound
            .send(message.to_string())
            .map_err(|_| HostError::Disconnected)
    }

    /// Hand settings to everyone waiting on `instance_id`.
    ///
    /// Returns false when nobody asked, meaning the settings were pushed by
    /// the host on its own (the user edited them).
    pub fn resolve_settings(&self, instance_id: &str, settings: &ButtonConfig) -> bool {
        let waiters = match self.pending.lock() {
            Ok(mut pending) => pending.remove(instance_id),
            Err(poisoned) => poisoned.into_inner().remove(instance_id),
        };

        let mut delivered = false;
        for waiter in waiters.into_iter().flatten() {
            delivered |= waiter.send(settings.clone()).is_ok();
        }
        delivered
    }

    fn add_waiter(&self, instance_id: &str) -> oneshot::Receiver<ButtonConfig> {
        let (tx, rx) = oneshot::channel();
        let mut pending = match self.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };
        let waiters = pending.entry(instance_id.to_string()).or_default();
        waiters.retain(|w| !w.is_closed());
        waiters.push(tx);
        rx
    }

    /// Drop waiters whose requester gave up, and the entry once it is empty
    fn prune_waiters(&self, instance_id: &str) {
        let mut pending = match self.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(waiters) = pending.get_mut(instance_id) {
            waiters.retain(|w| !w.is_closed());
            if waiters.is_empty() {
                pending.remove(instance_id);
            }
        }
    }
}

#[async_trait]
impl Host for StreamDeckHost {
    async fn request_settings(&self, instance_id: &str) -> Result<ButtonConfig, HostError> {
        let rx = self.add_waiter(instance_id);
        if let Err(e) = self.send(get_settings_message(instance_id)) {
            drop(rx);
            self.prune_waiters(instance_id);
            return Err(e);
        }

        match tokio::time::timeout(self.settings_timeout, rx).await {
            Ok(Ok(settings)) => Ok(settings),
            Ok(Err(_)) => Err(HostError::Disconnected),
            Err(_) => {
                // The receiver was dropped with the timeout future
                self.prune_waiters(instance_id);
                Err(HostError::Timeout {
                    instance_id: instance_id.to_string(),
                })
            }
        }
    }

    async fn set_image(&self, instance_id: &str, image: &str) -> Result<(), HostError> {
        self.send(set_image_message(instance_id, image))
    }
}

/// Connect to the Stream Deck application and serve events until it closes
/// the socket or the process is interrupted
pub async fn run_session(args: LaunchArgs, config: PluginConfig) -> Result<(), LaunchError> {
    let url = args.websocket_url();
    info!(
        url = %url,
        host_version = ?args.host_version(),
        "Connecting to Stream Deck"
    );

    let (stream, _) = tokio_tungstenite::connect_async(&url).await?;
    let (mut write, mut read) = stream.split();

    write
        .send(Message::Text(register_message(&args).to_string()))
        .await?;
    write
        .send(Message::Text(
            get_global_settings_message(&args.plugin_uuid).to_string(),
        ))
        .await?;
    info!("Registered with Stream Deck");

    let (host, mut outbound_rx) = StreamDeckHost::new(config.settings_timeout());
    let host = Arc::new(host);

    let writer = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if let Err(e) = write.send(Message::Text(text)).await {
                error!("Failed to write to Stream Deck socket: {}", e);
                break;
            }
        }
    });

    let source = Arc::new(TodoistClient::with_base_url(&config.api_base_url)?);
    let refresher = Refresher::new(Arc::clone(&host), source, CredentialStore::default());
    let plugin = Plugin::new(refresher, config.poll_interval());

    let cancel_token = CancellationToken::new();
    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let dispatcher = tokio::spawn(plugin.run(events_rx, cancel_token.clone()));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, shutting down");
                break;
            }
            maybe_msg = read.next() => {
                let text = match maybe_msg {
                    Some(Ok(Message::Text(text))) => text.to_string(),
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Stream Deck closed the connection");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        error!("Stream Deck socket error: {}", e);
                        break;
                    }
                };

                let event = match decode_event(&text) {
                    Ok(Some(event)) => event,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("Ignoring malformed Stream Deck message: {}", e);
                        continue;
                    }
                };

                if let HostEvent::SettingsChanged { instance_id, settings } = &event
                    && host.resolve_settings(instance_id, settings)
                {
                    continue;
                }

                if events_tx.send(event).await.is_err() {
                    break;
                }
            }
        }
    }

    cancel_token.cancel();
    if let Err(e) = dispatcher.await {
        error!("Dispatcher task failed: {}", e);
    }
    writer.abort();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{assert, let_assert};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_launch_args() {
        let parsed = LaunchArgs::parse(args(&[
            "-port",
            "28196",
            "-pluginUUID",
            "ABC123",
            "-registerEvent",
            "registerPlugin",
            "-info",
            r#"{"application":{"version":"6.5.0"}}"#,
        ]));

        let_assert!(Ok(launch) = parsed);
        assert!(launch.port == 28196);
        assert!(launch.plugin_uuid == "ABC123");
        assert!(launch.websocket_url() == "ws://127.0.0.1:28196");
        assert!(launch.host_version().as_deref() == Some("6.5.0"));
    }

    #[test]
    fn test_parse_launch_args_missing_uuid() {
        let parsed = LaunchArgs::parse(args(&["-port", "1", "-registerEvent", "registerPlugin"]));
        let_assert!(Err(LaunchError::MissingArgument(name)) = parsed);
        assert!(name == "pluginUUID");
    }

    #[test]
    fn test_parse_launch_args_bad_port() {
        let parsed = LaunchArgs::parse(args(&[
            "-port",
            "not-a-port",
            "-pluginUUID",
            "x",
            "-registerEvent",
            "y",
        ]));
        assert!(matches!(parsed, Err(LaunchError::InvalidArgument { name: "port", .. })));
    }

    #[test]
    fn test_decode_will_appear() {
        let text = json!({
            "event": "willAppear",
            "action": "com.example.taskcounter.count",
            "context": "ctx-1",
            "device": "dev",
            "payload": {
                "settings": { "item_name": "Today", "item_filter": "today", "g_cutoff_1": "3" },
                "coordinates": { "column": 0, "row": 0 }
            }
        })
        .to_string();

        let_assert!(Ok(Some(HostEvent::Appear { instance_id, settings })) = decode_event(&text));
        assert!(instance_id == "ctx-1");
        assert!(settings.item_filter == "today");
        assert!(settings.g_cutoff_1 == Some(3.0));
    }

    #[test]
    fn test_decode_key_down_and_disappear() {
        let key = json!({ "event": "keyDown", "context": "ctx-2", "payload": {} }).to_string();
        let_assert!(Ok(Some(HostEvent::KeyPressed { instance_id })) = decode_event(&key));
        assert!(instance_id == "ctx-2");

        let gone = json!({ "event": "willDisappear", "context": "ctx-2" }).to_string();
        assert!(matches!(decode_event(&gone), Ok(Some(HostEvent::Disappear { .. }))));
    }

    #[test]
    fn test_decode_global_settings() {
        let text = json!({
            "event": "didReceiveGlobalSettings",
            "payload": { "settings": { "apiToken": "tok" } }
        })
        .to_string();

        let_assert!(Ok(Some(HostEvent::GlobalSettingsChanged { credentials })) = decode_event(&text));
        assert!(credentials.api_token == "tok");
    }

    #[test]
    fn test_decode_ignores_unhandled_events() {
        let text = json!({ "event": "keyUp", "context": "ctx" }).to_string();
        assert!(matches!(decode_event(&text), Ok(None)));
    }

    #[test]
    fn test_decode_rejects_missing_context() {
        let text = json!({ "event": "keyDown" }).to_string();
        assert!(matches!(decode_event(&text), Err(HostError::Protocol(_))));
        assert!(decode_event("not json").is_err());
    }

    #[test]
    fn test_outbound_messages() {
        let image = set_image_message("ctx", "data:image/svg+xml;base64,AAAA");
        assert!(image["event"] == "setImage");
        assert!(image["context"] == "ctx");
        assert!(image["payload"]["image"] == "data:image/svg+xml;base64,AAAA");

        let settings = get_settings_message("ctx");
        assert!(settings["event"] == "getSettings");
    }

    #[tokio::test]
    async fn test_request_settings_resolves_on_reply() {
        let (host, mut outbound_rx) = StreamDeckHost::new(Duration::from_secs(5));
        let host = Arc::new(host);

        let requester = {
            let host = Arc::clone(&host);
            tokio::spawn(async move { host.request_settings("ctx").await })
        };

        let_assert!(Some(sent) = outbound_rx.recv().await);
        let_assert!(Ok(sent) = serde_json::from_str::<serde_json::Value>(&sent));
        assert!(sent["event"] == "getSettings");

        let reply = ButtonConfig {
            item_filter: "overdue".to_string(),
            ..Default::default()
        };
        assert!(host.resolve_settings("ctx", &reply));

        let_assert!(Ok(Ok(settings)) = requester.await);
        assert!(settings == reply);
    }

    #[test]
    fn test_unsolicited_settings_are_not_consumed() {
        let (host, _outbound_rx) = StreamDeckHost::new(Duration::from_secs(5));
        assert!(!host.resolve_settings("ctx", &ButtonConfig::default()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_settings_times_out() {
        let (host, _outbound_rx) = StreamDeckHost::new(Duration::from_secs(5));

        let result = host.request_settings("ctx").await;

        let_assert!(Err(HostError::Timeout { instance_id }) = result);
        assert!(instance_id == "ctx");
    }

    fn waiter_count(host: &StreamDeckHost, instance_id: &str) -> Option<usize> {
        let pending = match host.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };
        pending.get(instance_id).map(Vec::len)
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_requests_leave_no_waiters() {
        let (host, _outbound_rx) = StreamDeckHost::new(Duration::from_secs(5));

        for _ in 0..3 {
            assert!(host.request_settings("ctx").await.is_err());
        }

        assert!(waiter_count(&host, "ctx").is_none());
        assert!(!host.resolve_settings("ctx", &ButtonConfig::default()));
    }

    #[tokio::test]
    async fn test_failed_send_leaves_no_waiters() {
        let (host, outbound_rx) = StreamDeckHost::new(Duration::from_secs(5));
        drop(outbound_rx);

        assert!(host.request_settings("ctx").await.is_err());
        assert!(waiter_count(&host, "ctx").is_none());
    }

    #[tokio::test]
    async fn test_requests_fail_when_writer_is_gone() {
        let (host, outbound_rx) = StreamDeckHost::new(Duration::from_secs(5));
        drop(outbound_rx);

        assert!(host.set_image("ctx", "data:,").await == Err(HostError::Disconnected));
        assert!(host.request_settings("ctx").await == Err(HostError::Disconnected));
    }
}
