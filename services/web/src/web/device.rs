//! services/web/src/web/device.rs
//!
//! Per-device state. A browser carrying a session cookie gets one
//! `SessionManager` and one set of page controllers, kept here for as long as
//! the session lives. The pages sit behind an async mutex so a device is
//! served one action at a time.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use readmate_core::controllers::{AllBooksController, ManageBooksController, Notice};
use readmate_core::ports::{BookRepository, IdentityProvider};
use chrono::Utc;
use readmate_core::{SessionManager, SessionState};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// The controllers a device has mounted, plus notices waiting for the next page.
pub struct Pages {
    pub all_books: AllBooksController,
    pub manage: ManageBooksController,
    flash: Vec<Notice>,
}

impl Pages {
    fn new(books: &Arc<dyn BookRepository>) -> Self {
        Self {
            all_books: AllBooksController::new(books.clone()),
            manage: ManageBooksController::new(books.clone()),
            flash: Vec::new(),
        }
    }

    /// Queues a notice for whichever page renders next.
    pub fn flash(&mut self, notice: Notice) {
        self.flash.push(notice);
    }

    pub fn take_flash(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.flash)
    }
}

pub struct DeviceContext {
    pub session: SessionManager,
    pub pages: Mutex<Pages>,
}

pub struct DeviceRegistry {
    books: Arc<dyn BookRepository>,
    identity: Arc<dyn IdentityProvider>,
    devices: DashMap<String, Arc<DeviceContext>>,
}

impl DeviceRegistry {
    pub fn new(books: Arc<dyn BookRepository>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { books, identity, devices: DashMap::new() }
    }

    /// The context for a session token. The first request for a token starts
    /// restoring the session in the background; later requests, including
    /// concurrent ones, share that same context and restore.
    pub fn attach(&self, token: &str) -> Arc<DeviceContext> {
        if !self.devices.contains_key(token) {
            self.evict_expired();
        }
        match self.devices.entry(token.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                debug!("Restoring session for a new device");
                let device = Arc::new(DeviceContext {
                    session: SessionManager::new(self.identity.clone()),
                    pages: Mutex::new(Pages::new(&self.books)),
                });
                entry.insert(device.clone());

                let restoring = device.clone();
                let token = token.to_string();
                tokio::spawn(async move { restoring.session.restore(&token).await });
                device
            }
        }
    }

    /// Registers a session that was just established on this device. Returns
    /// `None` if the session manager holds no token.
    pub fn adopt(&self, session: SessionManager) -> Option<Arc<DeviceContext>> {
        let token = session.token()?;
        self.evict_expired();
        let device = Arc::new(DeviceContext { session, pages: Mutex::new(Pages::new(&self.books)) });
        self.devices.insert(token, device.clone());
        Some(device)
    }

    /// A signed-out manager for requests that carry no session yet.
    pub fn anonymous(&self) -> SessionManager {
        SessionManager::signed_out(self.identity.clone())
    }

    /// Drops devices whose session has expired or ended. Devices still
    /// restoring are kept.
    pub fn evict_expired(&self) {
        let now = Utc::now();
        let before = self.devices.len();
        self.devices.retain(|_, device| match device.session.current() {
            SessionState::Unknown => true,
            SessionState::SignedIn(session) => session.expires_at > now,
            SessionState::SignedOut => false,
        });
        let evicted = before.saturating_sub(self.devices.len());
        if evicted > 0 {
            debug!("Evicted {} stale device(s)", evicted);
        }
    }

    pub fn remove(&self, token: &str) {
        self.devices.remove(token);
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{LocalIdentityProvider, LogResetNotifier, MemoryStore};
    use chrono::Duration;

    fn registry() -> (DeviceRegistry, Arc<LocalIdentityProvider>) {
        registry_with_ttl(Duration::days(1))
    }

    fn registry_with_ttl(session_ttl: Duration) -> (DeviceRegistry, Arc<LocalIdentityProvider>) {
        let store = Arc::new(MemoryStore::new());
        let identity = Arc::new(LocalIdentityProvider::new(
            store.clone(),
            Arc::new(LogResetNotifier),
            session_ttl,
            Duration::minutes(5),
            "http://localhost:3000",
        ));
        (DeviceRegistry::new(store, identity.clone()), identity)
    }

    #[tokio::test]
    async fn attach_restores_a_known_token_once() {
        let (registry, identity) = registry();
        let issued = identity.sign_up("reader@example.com", "secret1").await.unwrap();

        let first = registry.attach(&issued.token);
        let second = registry.attach(&issued.token);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);

        match first.session.settled().await {
            SessionState::SignedIn(session) => assert_eq!(session.user, issued.user),
            other => panic!("expected a signed-in session, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn attach_settles_unknown_tokens_as_signed_out() {
        let (registry, _) = registry();
        let device = registry.attach("not-a-token");
        assert_eq!(device.session.settled().await, SessionState::SignedOut);
    }

    #[tokio::test]
    async fn adopt_and_remove() {
        let (registry, _) = registry();
        let session = registry.anonymous();
        assert!(registry.adopt(session).is_none());

        let session = registry.anonymous();
        session.sign_up("reader@example.com", "secret1").await.unwrap();
        let token = session.token().unwrap();
        let device = registry.adopt(session).unwrap();
        assert!(Arc::ptr_eq(&device, &registry.attach(&token)));

        registry.remove(&token);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn expired_devices_are_evicted() {
        let (registry, _) = registry_with_ttl(Duration::seconds(-1));
        let session = registry.anonymous();
        session.sign_up("reader@example.com", "secret1").await.unwrap();
        registry.adopt(session).unwrap();
        assert_eq!(registry.len(), 1);

        registry.evict_expired();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn adopting_sweeps_out_ended_sessions() {
        let (registry, _) = registry();
        let stale = registry.attach("not-a-token");
        assert_eq!(stale.session.settled().await, SessionState::SignedOut);

        let session = registry.anonymous();
        session.sign_up("reader@example.com", "secret1").await.unwrap();
        let token = session.token().unwrap();
        registry.adopt(session).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&registry.attach(&token), &registry.attach(&token)));
    }
}
