use crate::settings::GlobalCredentials;
use tokio::sync::watch;

/// Shared, read-mostly holder for the global API token.
///
/// The host pushes new global settings at any time; every refresh takes a
/// snapshot, so a refresh in flight keeps the token it started with.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    tx: watch::Sender<GlobalCredentials>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(GlobalCredentials::default())
    }
}

impl CredentialStore {
    pub fn new(initial: GlobalCredentials) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn current(&self) -> GlobalCredentials {
        self.tx.borrow().clone()
    }

    /// Replace the stored credentials, returning true if they changed
    pub fn update(&self, credentials: GlobalCredentials) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == credentials {
                false
            } else {
                *current = credentials;
                true
            }
        })
    }
}
