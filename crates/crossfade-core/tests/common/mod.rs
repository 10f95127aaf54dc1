//! Shared test utilities for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use crossfade_core::api::{Backend, Credentials, ServerVersion, TransferRequest, TransferSummary};
use crossfade_core::catalog::{Collection, CollectionKind};
use crossfade_core::error::{Error, Result};
use crossfade_core::service::ServiceId;

/// One scripted answer to `submit_transfer`.
pub struct SubmitScript {
    pub delay: Duration,
    pub result: Result<TransferSummary>,
}

impl SubmitScript {
    pub fn ok(delay_ms: u64, added: u64, total: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            result: Ok(TransferSummary {
                items_transferred: added,
                items_total: total,
                unmatched: Default::default(),
            }),
        }
    }

    /// The server answered with a rejection carrying `message`.
    pub fn fail(delay_ms: u64, message: &str) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            result: Err(Error::RemoteRejection {
                status: 500,
                message: message.to_string(),
            }),
        }
    }

    /// The request never completed.
    pub fn network(delay_ms: u64, message: &str) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            result: Err(Error::Network(message.to_string())),
        }
    }
}

/// Decrements the in-flight counter even when a submission is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory backend driven by scripts.
#[derive(Default)]
pub struct FakeBackend {
    auth: Mutex<HashMap<ServiceId, bool>>,
    listings: Mutex<HashMap<ServiceId, Vec<Collection>>>,
    submits: Mutex<VecDeque<SubmitScript>>,
    progress: Mutex<VecDeque<f64>>,
    login_error: Mutex<Option<String>>,
    failing_auth_polls: AtomicUsize,

    pub submitted: Mutex<Vec<TransferRequest>>,
    pub logins: Mutex<Vec<ServiceId>>,
    pub disconnects: Mutex<Vec<ServiceId>>,
    pub list_calls: Mutex<Vec<ServiceId>>,
    pub auth_calls: AtomicUsize,
    pub progress_calls: AtomicUsize,
    /// Progress polls that arrived while no submission was outstanding
    pub orphan_polls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_auth(&self, pairs: &[(&str, bool)]) {
        *self.auth.lock().unwrap() = pairs
            .iter()
            .map(|(id, a)| (ServiceId::from(*id), *a))
            .collect();
    }

    pub fn set_listing(&self, service: &str, collections: Vec<Collection>) {
        self.listings
            .lock()
            .unwrap()
            .insert(service.into(), collections);
    }

    pub fn script_submits(&self, scripts: Vec<SubmitScript>) {
        self.submits.lock().unwrap().extend(scripts);
    }

    pub fn script_progress(&self, samples: &[f64]) {
        self.progress.lock().unwrap().extend(samples);
    }

    pub fn fail_logins(&self, message: &str) {
        *self.login_error.lock().unwrap() = Some(message.to_string());
    }

    /// Make the next `count` auth status polls fail.
    pub fn fail_auth_polls(&self, count: usize) {
        self.failing_auth_polls.store(count, Ordering::SeqCst);
    }

    pub fn list_calls_for(&self, service: &str) -> usize {
        let service = ServiceId::from(service);
        self.list_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|s| **s == service)
            .count()
    }

    pub fn submitted_ids(&self) -> Vec<String> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.playlist_id.to_string())
            .collect()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn auth_status(&self) -> Result<HashMap<ServiceId, bool>> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_auth_polls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::Network("connection refused".to_string()));
        }
        Ok(self.auth.lock().unwrap().clone())
    }

    async fn list_collections(&self, service: &ServiceId) -> Result<Vec<Collection>> {
        self.list_calls.lock().unwrap().push(service.clone());
        Ok(self
            .listings
            .lock()
            .unwrap()
            .get(service)
            .cloned()
            .unwrap_or_default())
    }

    async fn begin_oauth(&self, service: &ServiceId) -> Result<String> {
        Ok(format!("https://auth.example.com/{service}"))
    }

    async fn credential_login(&self, service: &ServiceId, _credentials: &Credentials) -> Result<()> {
        self.logins.lock().unwrap().push(service.clone());
        if let Some(message) = self.login_error.lock().unwrap().clone() {
            return Err(Error::LoginFailed {
                service: service.to_string(),
                message,
            });
        }
        self.auth.lock().unwrap().insert(service.clone(), true);
        Ok(())
    }

    async fn disconnect(&self, service: &ServiceId) -> Result<()> {
        self.disconnects.lock().unwrap().push(service.clone());
        self.auth.lock().unwrap().insert(service.clone(), false);
        Ok(())
    }

    async fn submit_transfer(&self, request: &TransferRequest) -> Result<TransferSummary> {
        self.submitted.lock().unwrap().push(request.clone());
        let script = self
            .submits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| SubmitScript::ok(0, 1, 1));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);
        tokio::time::sleep(script.delay).await;

        script.result
    }

    async fn transfer_progress(&self) -> Result<f64> {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
        if self.in_flight.load(Ordering::SeqCst) == 0 {
            self.orphan_polls.fetch_add(1, Ordering::SeqCst);
        }
        self.progress
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Network("no progress scripted".to_string()))
    }

    async fn version(&self) -> Result<ServerVersion> {
        Ok(ServerVersion {
            tag: "v0.3.1".to_string(),
            hash: "abc1234".to_string(),
        })
    }
}

/// Playlists named `p0..pN` on `service` with the given sizes.
pub fn playlists(service: &str, sizes: &[u64]) -> Vec<Collection> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, &n)| Collection {
            id: format!("p{i}").as_str().into(),
            name: format!("Playlist {i}"),
            item_count: n,
            kind: CollectionKind::Normal,
            owning_service: service.into(),
        })
        .collect()
}
