//! The set of playlists picked for the next transfer.
//!
//! A selection only ever holds playlists of a single source service.
//! Picking a playlist from another service starts a fresh selection.

use std::collections::HashSet;

use crate::catalog::{Collection, CollectionId};
use crate::service::ServiceId;

/// Selected playlist ids of one source service.
#[derive(Debug, Default, Clone)]
pub struct SelectionSet {
    source: Option<ServiceId>,
    ids: HashSet<CollectionId>,
}

impl SelectionSet {
    /// Create an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `collection` if absent, remove it if present.
    ///
    /// Returns whether the collection is selected afterwards.
    pub fn toggle(&mut self, collection: &Collection) -> bool {
        self.adopt_source(&collection.owning_service);
        if self.ids.remove(&collection.id) {
            false
        } else {
            self.ids.insert(collection.id.clone());
            true
        }
    }

    /// Select everything in `all`, or clear if everything is already selected.
    pub fn select_all(&mut self, all: &[Collection]) {
        if self.is_fully_selected(all) {
            self.clear();
            return;
        }

        self.ids.clear();
        self.source = all.first().map(|c| c.owning_service.clone());
        self.ids.extend(all.iter().map(|c| c.id.clone()));
    }

    /// Whether every collection in `all`, and nothing else, is selected.
    #[must_use]
    pub fn is_fully_selected(&self, all: &[Collection]) -> bool {
        self.ids.len() == all.len() && all.iter().all(|c| self.contains(&c.id))
    }

    /// Whether `id` is selected.
    #[must_use]
    pub fn contains(&self, id: &CollectionId) -> bool {
        self.ids.contains(id)
    }

    /// Number of selected playlists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Service the selection belongs to.
    #[must_use]
    pub fn source(&self) -> Option<&ServiceId> {
        self.source.as_ref()
    }

    /// Empty the selection.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.source = None;
    }

    /// Drop every selected id that belongs to `service`.
    pub fn remove_service(&mut self, service: &ServiceId) {
        if self.source.as_ref() == Some(service) {
            self.clear();
        }
    }

    /// Keep only ids of `service` that still appear in `listing`.
    pub fn retain_listed(&mut self, service: &ServiceId, listing: &[Collection]) {
        if self.source.as_ref() != Some(service) {
            return;
        }
        let before = self.ids.len();
        self.ids.retain(|id| listing.iter().any(|c| &c.id == id));
        if self.ids.len() != before {
            tracing::debug!(
                "Dropped {} selected playlists no longer listed on {}",
                before - self.ids.len(),
                service
            );
        }
        if self.ids.is_empty() {
            self.source = None;
        }
    }

    /// Selected collections of `listing`, in listing order.
    #[must_use]
    pub fn selected_from(&self, listing: &[Collection]) -> Vec<Collection> {
        listing
            .iter()
            .filter(|c| self.source.as_ref() == Some(&c.owning_service) && self.contains(&c.id))
            .cloned()
            .collect()
    }

    fn adopt_source(&mut self, service: &ServiceId) {
        if self.source.as_ref() != Some(service) {
            self.ids.clear();
            self.source = Some(service.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CollectionKind;

    fn playlists(service: &str, n: usize) -> Vec<Collection> {
        (0..n)
            .map(|i| Collection {
                id: CollectionId::new(format!("{service}-{i}")),
                name: format!("Playlist {i}"),
                item_count: 10,
                kind: CollectionKind::Normal,
                owning_service: service.into(),
            })
            .collect()
    }

    #[test]
    fn test_toggle_twice_leaves_empty() {
        let all = playlists("spotify", 1);
        let mut selection = SelectionSet::new();

        assert!(selection.toggle(&all[0]));
        assert!(!selection.toggle(&all[0]));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_select_all_toggles_everything() {
        let all = playlists("spotify", 5);
        let mut selection = SelectionSet::new();

        selection.select_all(&all);
        assert_eq!(selection.len(), 5);

        selection.select_all(&all);
        assert_eq!(selection.len(), 0);
    }

    #[test]
    fn test_select_all_from_partial_selects_everything() {
        let all = playlists("spotify", 5);
        let mut selection = SelectionSet::new();
        selection.toggle(&all[1]);
        selection.toggle(&all[3]);

        selection.select_all(&all);
        assert_eq!(selection.len(), 5);
        assert!(selection.is_fully_selected(&all));
    }

    #[test]
    fn test_toggle_from_other_service_starts_over() {
        let spotify = playlists("spotify", 2);
        let tidal = playlists("tidal", 1);
        let mut selection = SelectionSet::new();
        selection.toggle(&spotify[0]);
        selection.toggle(&spotify[1]);

        selection.toggle(&tidal[0]);
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.source(), Some(&ServiceId::from("tidal")));
    }

    #[test]
    fn test_remove_service_only_touches_that_service() {
        let spotify = playlists("spotify", 3);
        let mut selection = SelectionSet::new();
        selection.select_all(&spotify);

        selection.remove_service(&"tidal".into());
        assert_eq!(selection.len(), 3);

        selection.remove_service(&"spotify".into());
        assert!(selection.is_empty());
        assert!(selection.source().is_none());
    }

    #[test]
    fn test_retain_listed_keeps_surviving_ids() {
        let all = playlists("spotify", 4);
        let mut selection = SelectionSet::new();
        selection.toggle(&all[0]);
        selection.toggle(&all[2]);

        let refreshed = vec![all[2].clone(), all[3].clone()];
        selection.retain_listed(&"spotify".into(), &refreshed);

        assert_eq!(selection.len(), 1);
        assert!(selection.contains(&all[2].id));
    }

    #[test]
    fn test_selected_from_follows_listing_order() {
        let all = playlists("spotify", 4);
        let mut selection = SelectionSet::new();
        selection.toggle(&all[3]);
        selection.toggle(&all[0]);

        let picked: Vec<_> = selection
            .selected_from(&all)
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(picked, vec![all[0].id.clone(), all[3].id.clone()]);
    }
}
