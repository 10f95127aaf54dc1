//! Playlist model and the per-service listing cache.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::service::ServiceId;

/// Backend identifier of a playlist, unique within one service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(String);

impl CollectionId {
    /// Create a collection id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CollectionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Kind of a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// A regular playlist
    #[default]
    Normal,
    /// The "liked songs" pseudo-playlist
    Favorites,
}

impl CollectionKind {
    /// Name the backend uses for this kind (`normal` / `liked`).
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Favorites => "liked",
        }
    }

    /// Parse the backend's `type` field; anything other than `liked` is a normal playlist.
    #[must_use]
    pub fn from_wire(kind: Option<&str>) -> Self {
        match kind {
            Some("liked") => Self::Favorites,
            _ => Self::Normal,
        }
    }
}

/// Snapshot of one playlist from the last listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Backend id
    pub id: CollectionId,
    /// Display name
    pub name: String,
    /// Number of tracks
    pub item_count: u64,
    /// Regular playlist or favorites
    pub kind: CollectionKind,
    /// Service the playlist lives on
    pub owning_service: ServiceId,
}

/// Last known playlist listing per service.
///
/// Refreshes replace a service's listing wholesale; concurrent refreshes
/// for the same service resolve as last-writer-wins.
#[derive(Debug, Default, Clone)]
pub struct CatalogCache {
    listings: HashMap<ServiceId, Vec<Collection>>,
}

impl CatalogCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the listing for `service`.
    pub fn replace(&mut self, service: &ServiceId, collections: Vec<Collection>) {
        tracing::debug!(
            "Catalog for {} replaced with {} playlists",
            service,
            collections.len()
        );
        self.listings.insert(service.clone(), collections);
    }

    /// The cached listing, or an empty slice if the service was never loaded.
    #[must_use]
    pub fn listing(&self, service: &ServiceId) -> &[Collection] {
        self.listings.get(service).map_or(&[], Vec::as_slice)
    }

    /// Whether a listing has been loaded for `service`.
    #[must_use]
    pub fn is_loaded(&self, service: &ServiceId) -> bool {
        self.listings.contains_key(service)
    }

    /// Drop the listing for `service`.
    pub fn clear(&mut self, service: &ServiceId) {
        self.listings.remove(service);
    }

    /// Find a playlist of `service` by id.
    #[must_use]
    pub fn find(&self, service: &ServiceId, id: &CollectionId) -> Option<&Collection> {
        self.listing(service).iter().find(|c| &c.id == id)
    }
}
