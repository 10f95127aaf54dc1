//! Backend boundary.
//!
//! Matching tracks across services is the backend's job. This client only
//! drives it through the [`Backend`] trait; [`HttpBackend`] is the
//! implementation used against the real server.
//!
//! ## Endpoints
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET | `auth/status` | authenticated flag per service |
//! | GET | `<service>/playlists` | playlist listing |
//! | POST | `auth/<service>` | start an OAuth redirect |
//! | POST | `auth/<service>/login` | credential login |
//! | POST | `disconnect/<service>` | end a service session |
//! | POST | `transfer` | transfer one playlist |
//! | GET | `transfer-progress` | progress of the active transfer |
//! | GET | `version` | server build info |

mod http;

pub use http::HttpBackend;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::{Collection, CollectionId, CollectionKind};
use crate::error::Result;
use crate::service::ServiceId;

/// Email and password for credential-based services.
#[derive(Clone, Serialize)]
pub struct Credentials {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One playlist transfer as submitted to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRequest {
    /// Playlist id on the source service
    pub playlist_id: CollectionId,
    /// `normal` or `liked`
    pub playlist_type: &'static str,
    /// Destination service
    pub target_service: ServiceId,
}

impl TransferRequest {
    /// Request moving `collection` to `target`.
    #[must_use]
    pub fn new(collection: &Collection, target: &ServiceId) -> Self {
        Self {
            playlist_id: collection.id.clone(),
            playlist_type: collection.kind.wire_name(),
            target_service: target.clone(),
        }
    }
}

/// Successful transfer response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransferSummary {
    /// Tracks added on the destination
    #[serde(rename = "tracks_added")]
    pub items_transferred: u64,
    /// Tracks in the source playlist
    #[serde(rename = "total_tracks")]
    pub items_total: u64,
    /// Tracks without a match on the destination
    #[serde(rename = "tracks_not_found", default)]
    pub unmatched: Unmatched,
}

/// `tracks_not_found` is either a count or the list of unmatched tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unmatched {
    /// Number of unmatched tracks
    pub count: u64,
    /// Names of unmatched tracks when the backend lists them
    pub names: Vec<String>,
}

impl<'de> Deserialize<'de> for Unmatched {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u64),
            List(Vec<serde_json::Value>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Count(count) => Self {
                count,
                names: Vec::new(),
            },
            Raw::List(items) => Self {
                count: items.len() as u64,
                names: items
                    .into_iter()
                    .filter_map(|v| v.as_str().map(ToOwned::to_owned))
                    .collect(),
            },
        })
    }
}

/// Server build information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerVersion {
    /// Release tag
    pub tag: String,
    /// Commit hash
    pub hash: String,
}

/// First step of authenticating a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStart {
    /// Open this URL in a browser to finish OAuth
    Redirect(String),
    /// Credentials were accepted
    LoggedIn,
}

/// Everything the client needs from the transfer backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Authentication flag for every service the server knows.
    async fn auth_status(&self) -> Result<HashMap<ServiceId, bool>>;

    /// Playlists of `service`.
    async fn list_collections(&self, service: &ServiceId) -> Result<Vec<Collection>>;

    /// Start an OAuth flow; returns the URL to open.
    async fn begin_oauth(&self, service: &ServiceId) -> Result<String>;

    /// Log in with credentials.
    async fn credential_login(&self, service: &ServiceId, credentials: &Credentials)
        -> Result<()>;

    /// End the server-side session for `service`.
    async fn disconnect(&self, service: &ServiceId) -> Result<()>;

    /// Transfer one playlist; resolves when the backend is done with it.
    async fn submit_transfer(&self, request: &TransferRequest) -> Result<TransferSummary>;

    /// Progress (0-100) of the transfer currently running on the server.
    async fn transfer_progress(&self) -> Result<f64>;

    /// Server build information.
    async fn version(&self) -> Result<ServerVersion>;
}

#[derive(Debug, Deserialize)]
struct PlaylistsResponse {
    #[serde(default)]
    playlists: Vec<PlaylistDto>,
}

#[derive(Debug, Deserialize)]
struct PlaylistDto {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    name: String,
    #[serde(default)]
    tracks: u64,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl PlaylistDto {
    fn into_collection(self, service: &ServiceId) -> Collection {
        Collection {
            id: CollectionId::new(self.id),
            name: self.name,
            item_count: self.tracks,
            kind: CollectionKind::from_wire(self.kind.as_deref()),
            owning_service: service.clone(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct ProgressResponse {
    progress: f64,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}
