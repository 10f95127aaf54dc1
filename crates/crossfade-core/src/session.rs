//! Auth status reconciliation.
//!
//! The backend is polled for the authentication state of every service on
//! a fixed cadence. [`SessionStateTracker::reconcile`] compares each poll
//! with the last known state and only reports the transitions: an
//! identical poll changes nothing and produces no effects.

use std::collections::HashMap;

use serde::Serialize;

use crate::service::{ServiceConnection, ServiceId, ServiceRegistry};

/// Follow-up work produced by a state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", content = "service", rename_all = "snake_case")]
pub enum SessionEffect {
    /// Service became authenticated; load its playlists once.
    RefreshCatalog(ServiceId),
    /// Service lost authentication; drop its playlists and selection.
    ClearService(ServiceId),
}

/// Connection state of every configured service.
#[derive(Debug, Clone)]
pub struct SessionStateTracker {
    connections: Vec<ServiceConnection>,
}

impl SessionStateTracker {
    /// Track every service in `registry`, all starting disconnected.
    #[must_use]
    pub fn new(registry: &ServiceRegistry) -> Self {
        Self {
            connections: registry.iter().map(ServiceConnection::from).collect(),
        }
    }

    /// Apply a polled status map.
    ///
    /// Tracked services missing from `observed` count as not authenticated;
    /// ids that are not tracked are ignored. Returns one effect per
    /// transition, or nothing when the poll matches the current state.
    pub fn reconcile(&mut self, observed: &HashMap<ServiceId, bool>) -> Vec<SessionEffect> {
        let changed = self.connections.iter().any(|conn| {
            observed.get(&conn.service_id).copied().unwrap_or(false) != conn.authenticated
        });
        if !changed {
            return Vec::new();
        }

        let mut effects = Vec::new();
        for conn in &mut self.connections {
            let now = observed.get(&conn.service_id).copied().unwrap_or(false);
            if now == conn.authenticated {
                continue;
            }
            conn.authenticated = now;
            if now {
                tracing::info!("{} connected", conn.display_name);
                effects.push(SessionEffect::RefreshCatalog(conn.service_id.clone()));
            } else {
                tracing::info!("{} disconnected", conn.display_name);
                effects.push(SessionEffect::ClearService(conn.service_id.clone()));
            }
        }
        effects
    }

    /// Mark a service as disconnected after an explicit disconnect.
    ///
    /// Returns the clear effect when the service was connected.
    pub fn mark_disconnected(&mut self, service: &ServiceId) -> Option<SessionEffect> {
        let conn = self
            .connections
            .iter_mut()
            .find(|c| &c.service_id == service)?;
        if !conn.authenticated {
            return None;
        }
        conn.authenticated = false;
        tracing::info!("{} disconnected", conn.display_name);
        Some(SessionEffect::ClearService(service.clone()))
    }

    /// Whether `service` is currently authenticated.
    #[must_use]
    pub fn is_authenticated(&self, service: &ServiceId) -> bool {
        self.connections
            .iter()
            .any(|c| &c.service_id == service && c.authenticated)
    }

    /// All connection records in configuration order.
    #[must_use]
    pub fn connections(&self) -> &[ServiceConnection] {
        &self.connections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(pairs: &[(&str, bool)]) -> HashMap<ServiceId, bool> {
        pairs.iter().map(|(id, a)| (ServiceId::from(*id), *a)).collect()
    }

    #[test]
    fn test_identical_polls_refresh_once() {
        let mut tracker = SessionStateTracker::new(&ServiceRegistry::default());
        let payload = status(&[("spotify", true), ("tidal", false), ("qobuz", false)]);

        let first = tracker.reconcile(&payload);
        let second = tracker.reconcile(&payload);

        assert_eq!(first, vec![SessionEffect::RefreshCatalog("spotify".into())]);
        assert!(second.is_empty());
    }

    #[test]
    fn test_initial_all_false_is_not_a_change() {
        let mut tracker = SessionStateTracker::new(&ServiceRegistry::default());
        let effects = tracker.reconcile(&status(&[("spotify", false), ("tidal", false)]));
        assert!(effects.is_empty());
    }

    #[test]
    fn test_logout_transition_clears() {
        let mut tracker = SessionStateTracker::new(&ServiceRegistry::default());
        tracker.reconcile(&status(&[("spotify", true), ("tidal", true)]));

        let effects = tracker.reconcile(&status(&[("spotify", true), ("tidal", false)]));
        assert_eq!(effects, vec![SessionEffect::ClearService("tidal".into())]);
        assert!(tracker.is_authenticated(&"spotify".into()));
        assert!(!tracker.is_authenticated(&"tidal".into()));
    }

    #[test]
    fn test_missing_service_counts_as_disconnected() {
        let mut tracker = SessionStateTracker::new(&ServiceRegistry::default());
        tracker.reconcile(&status(&[("qobuz", true)]));

        let effects = tracker.reconcile(&status(&[]));
        assert_eq!(effects, vec![SessionEffect::ClearService("qobuz".into())]);
    }

    #[test]
    fn test_unknown_services_ignored() {
        let mut tracker = SessionStateTracker::new(&ServiceRegistry::default());
        let effects = tracker.reconcile(&status(&[("napster", true)]));
        assert!(effects.is_empty());
    }

    #[test]
    fn test_mark_disconnected() {
        let mut tracker = SessionStateTracker::new(&ServiceRegistry::default());
        assert_eq!(tracker.mark_disconnected(&"tidal".into()), None);

        tracker.reconcile(&status(&[("tidal", true)]));
        assert_eq!(
            tracker.mark_disconnected(&"tidal".into()),
            Some(SessionEffect::ClearService("tidal".into()))
        );
        assert!(!tracker.is_authenticated(&"tidal".into()));
    }

    #[test]
    fn test_reconnect_refreshes_again() {
        let mut tracker = SessionStateTracker::new(&ServiceRegistry::default());
        tracker.reconcile(&status(&[("spotify", true)]));
        tracker.reconcile(&status(&[("spotify", false)]));
        let effects = tracker.reconcile(&status(&[("spotify", true)]));
        assert_eq!(effects, vec![SessionEffect::RefreshCatalog("spotify".into())]);
    }
}
