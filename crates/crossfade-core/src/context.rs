//! Application context.
//!
//! [`AppContext`] is built once at startup and owns all client-side state:
//! service connections, cached listings, the current selection and the
//! transfer orchestrator. Every mutation goes through its methods.
//!
//! Auth polls produce [`SessionEffect`]s that are applied here. Clearing a
//! service happens under the state lock before the poll returns; catalog
//! refreshes run as detached tasks so a slow listing never delays polling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::{AuthStart, Backend, Credentials, HttpBackend, ServerVersion};
use crate::catalog::{CatalogCache, Collection, CollectionId};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::service::{AuthFlow, ServiceConnection, ServiceId, ServiceRegistry};
use crate::selection::SelectionSet;
use crate::session::{SessionEffect, SessionStateTracker};
use crate::transfer::{
    RunEvent, RunProgress, RunReport, RunState, TransferOrchestrator, TransferPlan,
};

/// Mutable session state guarded by one lock.
#[derive(Debug)]
struct SessionState {
    tracker: SessionStateTracker,
    catalog: CatalogCache,
    selection: SelectionSet,
    source: ServiceId,
}

impl SessionState {
    fn new(registry: &ServiceRegistry, source: ServiceId) -> Self {
        Self {
            tracker: SessionStateTracker::new(registry),
            catalog: CatalogCache::new(),
            selection: SelectionSet::new(),
            source,
        }
    }

    fn clear_service(&mut self, service: &ServiceId) {
        self.catalog.clear(service);
        self.selection.remove_service(service);
    }
}

/// Composition root of the client.
#[derive(Clone)]
pub struct AppContext {
    backend: Arc<dyn Backend>,
    registry: ServiceRegistry,
    state: Arc<Mutex<SessionState>>,
    orchestrator: Arc<TransferOrchestrator>,
    auth_interval: Duration,
    completion_window: Duration,
}

impl AppContext {
    /// Create a context talking to the HTTP backend named in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = HttpBackend::from_config(config)?;
        Self::new(Arc::new(backend), config)
    }

    /// Create a context on top of an arbitrary backend.
    ///
    /// Fails if `config` does not validate or its source service is disabled.
    pub fn new(backend: Arc<dyn Backend>, config: &Config) -> Result<Self> {
        config.validate()?;
        let registry = config.registry()?;
        registry.enabled(&config.transfer.source)?;

        let state = SessionState::new(&registry, config.transfer.source.clone());
        let orchestrator =
            TransferOrchestrator::new(Arc::clone(&backend), config.polling.progress_interval);

        Ok(Self {
            backend,
            registry,
            state: Arc::new(Mutex::new(state)),
            orchestrator: Arc::new(orchestrator),
            auth_interval: config.polling.auth_interval,
            completion_window: config.polling.completion_window,
        })
    }

    /// Configured services.
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Connection record of every configured service.
    pub async fn connections(&self) -> Vec<ServiceConnection> {
        self.state.lock().await.tracker.connections().to_vec()
    }

    /// Whether `service` was authenticated at the last poll.
    pub async fn is_authenticated(&self, service: &ServiceId) -> bool {
        self.state.lock().await.tracker.is_authenticated(service)
    }

    /// Poll the backend once and apply any transitions.
    ///
    /// Returns the effects of this poll, empty when nothing changed.
    pub async fn poll_auth(&self) -> Result<Vec<SessionEffect>> {
        let observed = self.backend.auth_status().await?;

        let mut state = self.state.lock().await;
        let effects = state.tracker.reconcile(&observed);
        for effect in &effects {
            match effect {
                SessionEffect::ClearService(service) => state.clear_service(service),
                SessionEffect::RefreshCatalog(service) => self.spawn_refresh(service.clone()),
            }
        }
        Ok(effects)
    }

    /// Poll auth status on the configured cadence until `shutdown` fires.
    ///
    /// `on_change` sees the effects of every poll that changed something.
    /// Failed polls are logged and retried on the next tick.
    pub async fn watch_sessions<F>(&self, shutdown: CancellationToken, mut on_change: F)
    where
        F: FnMut(&[SessionEffect]) + Send,
    {
        let mut interval = tokio::time::interval(self.auth_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            match self.poll_auth().await {
                Ok(effects) if !effects.is_empty() => on_change(&effects),
                Ok(_) => {}
                Err(e) => tracing::warn!("Auth status poll failed: {}", e),
            }
        }
        tracing::debug!("Session watcher stopped");
    }

    /// Poll until `service` reports authenticated, giving up after `timeout`.
    pub async fn await_connection(&self, service: &ServiceId, timeout: Duration) -> Result<()> {
        let wait = async {
            loop {
                if let Err(e) = self.poll_auth().await {
                    tracing::debug!("Auth status poll failed: {}", e);
                }
                if self.is_authenticated(service).await {
                    return;
                }
                tokio::time::sleep(self.auth_interval).await;
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| Error::Timeout(timeout.as_secs()))
    }

    /// Reload the listing of `service` and wait for it.
    ///
    /// Returns the number of playlists now cached.
    pub async fn refresh_catalog(&self, service: &ServiceId) -> Result<usize> {
        self.registry.get(service)?;
        load_catalog(self.backend.as_ref(), &self.state, service).await
    }

    /// Cached listing of `service`, empty if never loaded.
    pub async fn listing(&self, service: &ServiceId) -> Vec<Collection> {
        self.state.lock().await.catalog.listing(service).to_vec()
    }

    /// Current source service.
    pub async fn source(&self) -> ServiceId {
        self.state.lock().await.source.clone()
    }

    /// Switch the source service. A different source drops the selection.
    pub async fn set_source(&self, service: &ServiceId) -> Result<()> {
        self.registry.enabled(service)?;

        let mut state = self.state.lock().await;
        if &state.source != service {
            tracing::debug!("Source changed from {} to {}", state.source, service);
            state.source = service.clone();
            state.selection.clear();
        }
        Ok(())
    }

    /// Toggle one playlist of the source listing.
    ///
    /// Returns whether it is selected afterwards.
    pub async fn toggle(&self, id: &CollectionId) -> Result<bool> {
        let mut state = self.state.lock().await;
        let SessionState {
            catalog,
            selection,
            source,
            ..
        } = &mut *state;

        let collection = catalog
            .find(source, id)
            .ok_or_else(|| Error::UnknownCollection {
                service: source.to_string(),
                id: id.to_string(),
            })?;
        Ok(selection.toggle(collection))
    }

    /// Select every playlist of the source, or clear if all are selected.
    ///
    /// Returns the number of selected playlists afterwards.
    pub async fn select_all(&self) -> usize {
        let mut state = self.state.lock().await;
        let SessionState {
            catalog,
            selection,
            source,
            ..
        } = &mut *state;

        selection.select_all(catalog.listing(source));
        selection.len()
    }

    /// Selected playlists in source listing order.
    pub async fn selection(&self) -> Vec<Collection> {
        let state = self.state.lock().await;
        state.selection.selected_from(state.catalog.listing(&state.source))
    }

    /// Start authenticating `service` according to its auth flow.
    ///
    /// OAuth services answer with a URL to open; credential services log in
    /// directly and are polled right away so the new session is picked up.
    pub async fn initiate_auth(
        &self,
        service: &ServiceId,
        credentials: Option<Credentials>,
    ) -> Result<AuthStart> {
        let descriptor = self.registry.enabled(service)?;

        match descriptor.auth_flow {
            AuthFlow::OAuth => {
                let url = self.backend.begin_oauth(service).await?;
                tracing::info!("{} authorization started", descriptor.display_name);
                Ok(AuthStart::Redirect(url))
            }
            AuthFlow::Credential => {
                let credentials = credentials
                    .ok_or_else(|| Error::CredentialsRequired(descriptor.display_name.clone()))?;
                self.backend.credential_login(service, &credentials).await?;
                tracing::info!("{} login accepted", descriptor.display_name);

                if let Err(e) = self.poll_auth().await {
                    tracing::warn!("Auth status poll after login failed: {}", e);
                }
                Ok(AuthStart::LoggedIn)
            }
        }
    }

    /// End the session of `service` and drop everything cached for it.
    pub async fn disconnect(&self, service: &ServiceId) -> Result<()> {
        self.registry.get(service)?;
        self.backend.disconnect(service).await?;

        let mut state = self.state.lock().await;
        if let Some(SessionEffect::ClearService(service)) = state.tracker.mark_disconnected(service)
        {
            state.clear_service(&service);
        }
        Ok(())
    }

    /// Disconnect every connected service and start over with empty state.
    pub async fn reset(&self) -> Result<()> {
        let connected: Vec<ServiceId> = self
            .connections()
            .await
            .into_iter()
            .filter(|c| c.authenticated)
            .map(|c| c.service_id)
            .collect();

        for service in &connected {
            if let Err(e) = self.backend.disconnect(service).await {
                tracing::warn!("Failed to disconnect {}: {}", service, e);
            }
        }

        let mut state = self.state.lock().await;
        let source = state.source.clone();
        *state = SessionState::new(&self.registry, source);
        tracing::info!("Session reset");
        Ok(())
    }

    /// Transfer the current selection to `destination`.
    ///
    /// The playlists are captured in source listing order when the run
    /// starts; later selection changes do not affect it. Once the run is
    /// done the destination listing is refreshed, and after the completion
    /// window the selection and run results are cleared.
    pub async fn transfer(&self, destination: &ServiceId) -> Result<RunReport> {
        if self.orchestrator.state() != RunState::Idle {
            return Err(Error::RunInProgress);
        }
        self.registry.enabled(destination)?;

        let plan = {
            let state = self.state.lock().await;
            if &state.source == destination {
                return Err(Error::SameService(destination.to_string()));
            }
            if !state.tracker.is_authenticated(destination) {
                return Err(Error::NotConnected(destination.to_string()));
            }
            let collections = state
                .selection
                .selected_from(state.catalog.listing(&state.source));
            if collections.is_empty() {
                return Err(Error::EmptySelection);
            }
            TransferPlan {
                destination: destination.clone(),
                collections,
            }
        };

        let report = self.orchestrator.run(plan).await?;
        self.spawn_refresh(destination.clone());
        self.spawn_completion_reset();
        Ok(report)
    }

    /// Subscribe to run snapshots.
    pub fn progress(&self) -> watch::Receiver<RunProgress> {
        self.orchestrator.progress()
    }

    /// Subscribe to run events.
    pub fn events(&self) -> broadcast::Receiver<RunEvent> {
        self.orchestrator.events()
    }

    /// Current run snapshot.
    pub fn run_snapshot(&self) -> RunProgress {
        self.orchestrator.snapshot()
    }

    /// Backend build information.
    pub async fn version(&self) -> Result<ServerVersion> {
        self.backend.version().await
    }

    fn spawn_refresh(&self, service: ServiceId) {
        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Err(e) = load_catalog(backend.as_ref(), &state, &service).await {
                tracing::warn!("Failed to load playlists for {}: {}", service, e);
            }
        });
    }

    fn spawn_completion_reset(&self) {
        let orchestrator = Arc::clone(&self.orchestrator);
        let state = Arc::clone(&self.state);
        let window = self.completion_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            state.lock().await.selection.clear();
            orchestrator.reset();
        });
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("registry", &self.registry)
            .field("auth_interval", &self.auth_interval)
            .field("completion_window", &self.completion_window)
            .finish_non_exhaustive()
    }
}

/// Fetch a listing and store it, unless the service logged out meanwhile.
async fn load_catalog(
    backend: &dyn Backend,
    state: &Mutex<SessionState>,
    service: &ServiceId,
) -> Result<usize> {
    let collections = backend.list_collections(service).await?;

    let mut state = state.lock().await;
    if !state.tracker.is_authenticated(service) {
        tracing::debug!("Discarding listing for {}: no longer connected", service);
        return Err(Error::NotConnected(service.to_string()));
    }

    let count = collections.len();
    state.selection.retain_listed(service, &collections);
    state.catalog.replace(service, collections);
    Ok(count)
}
