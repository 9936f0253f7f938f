// Common test utilities and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use task_counter::{ButtonConfig, Host, HostError};
use tracing_subscriber::fmt::MakeWriter;

pub const TEST_TOKEN: &str = "test-api-token";

/// Mock Todoist API server for testing
pub struct MockTodoistApi {
    pub server: ServerGuard,
}

impl MockTodoistApi {
    /// Create a new mock API server (async)
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        Self { server }
    }

    /// Get the base URL for the mock server
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Create a mock returning `count` tasks for `filter`
    pub fn mock_tasks(&mut self, filter: &str, count: usize) -> Mock {
        self.tasks_mock(filter, count).create()
    }

    /// Build, but do not register, the task list mock so callers can add expectations
    pub fn tasks_mock(&mut self, filter: &str, count: usize) -> Mock {
        let tasks: Vec<_> = (0..count)
            .map(|i| {
                json!({
                    "id": format!("{}", 1000 + i),
                    "content": format!("Task {}", i),
                    "is_completed": false
                })
            })
            .collect();

        self.server
            .mock("GET", "/tasks")
            .match_query(Matcher::UrlEncoded("filter".into(), filter.into()))
            .match_header("authorization", format!("Bearer {}", TEST_TOKEN).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!(tasks).to_string())
    }

    /// Create a mock for 401 authentication error
    pub fn mock_auth_error(&mut self) -> Mock {
        self.server
            .mock("GET", "/tasks")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_header("content-type", "text/plain")
            .with_body("Forbidden")
            .create()
    }

    /// Create a mock for a server error with an empty body
    pub fn mock_server_error(&mut self) -> Mock {
        self.server
            .mock("GET", "/tasks")
            .match_query(Matcher::Any)
            .with_status(500)
            .create()
    }

    /// Create a mock for invalid JSON response (parse error)
    pub fn mock_invalid_json(&mut self) -> Mock {
        self.server
            .mock("GET", "/tasks")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not valid json {{{")
            .create()
    }
}

/// In-memory host that serves fixed settings and records pushed images
#[derive(Default)]
pub struct RecordingHost {
    settings: Mutex<HashMap<String, ButtonConfig>>,
    images: Mutex<Vec<(String, String)>>,
    settings_requests: Mutex<usize>,
}

impl RecordingHost {
    pub fn with_settings(instance_id: &str, settings: ButtonConfig) -> Self {
        let host = Self::default();
        host.settings
            .lock()
            .unwrap()
            .insert(instance_id.to_string(), settings);
        host
    }

    pub fn images(&self) -> Vec<(String, String)> {
        self.images.lock().unwrap().clone()
    }

    pub fn settings_requests(&self) -> usize {
        *self.settings_requests.lock().unwrap()
    }
}

#[async_trait]
impl Host for RecordingHost {
    async fn request_settings(&self, instance_id: &str) -> Result<ButtonConfig, HostError> {
        *self.settings_requests.lock().unwrap() += 1;
        self.settings
            .lock()
            .unwrap()
            .get(instance_id)
            .cloned()
            .ok_or_else(|| HostError::Protocol(format!("unknown instance {}", instance_id)))
    }

    async fn set_image(&self, instance_id: &str, image: &str) -> Result<(), HostError> {
        self.images
            .lock()
            .unwrap()
            .push((instance_id.to_string(), image.to_string()));
        Ok(())
    }
}

/// `tracing` writer that keeps formatted output in memory
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Install a plain-text subscriber for the current thread
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
