//! Streaming services known to the client.
//!
//! Each service is described once in the configuration by a
//! [`ServiceDescriptor`]. How a service authenticates is a property of the
//! descriptor ([`AuthFlow`]), so callers never branch on a particular id.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of a streaming service as used by the backend (`spotify`, `tidal`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    /// Create a service id.
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

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ServiceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// How a service is authenticated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthFlow {
    /// Browser redirect handled by the backend
    #[default]
    OAuth,
    /// Email and password posted to the backend
    Credential,
}

/// Static description of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Backend id
    pub id: ServiceId,
    /// Human readable name
    pub display_name: String,
    /// Color used when rendering the service
    #[serde(default)]
    pub color_tag: String,
    /// Whether the service can be used
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Authentication mechanism
    #[serde(default)]
    pub auth_flow: AuthFlow,
}

fn default_enabled() -> bool {
    true
}

impl ServiceDescriptor {
    /// Describe an enabled service.
    #[must_use]
    pub fn new(id: &str, display_name: &str, color_tag: &str, auth_flow: AuthFlow) -> Self {
        Self {
            id: ServiceId::new(id),
            display_name: display_name.to_string(),
            color_tag: color_tag.to_string(),
            enabled: true,
            auth_flow,
        }
    }

    /// Services shipped in the default configuration.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("spotify", "Spotify", "green", AuthFlow::OAuth),
            Self::new("tidal", "Tidal", "blue", AuthFlow::OAuth),
            Self::new("qobuz", "Qobuz", "purple", AuthFlow::Credential),
        ]
    }
}

/// Connection record for one service.
///
/// Only the session tracker changes `authenticated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceConnection {
    /// Backend id
    pub service_id: ServiceId,
    /// Last known authentication state
    pub authenticated: bool,
    /// Human readable name
    pub display_name: String,
    /// Color used when rendering the service
    pub color_tag: String,
    /// Whether the service can be used
    pub enabled: bool,
}

impl From<&ServiceDescriptor> for ServiceConnection {
    fn from(desc: &ServiceDescriptor) -> Self {
        Self {
            service_id: desc.id.clone(),
            authenticated: false,
            display_name: desc.display_name.clone(),
            color_tag: desc.color_tag.clone(),
            enabled: desc.enabled,
        }
    }
}

/// Ordered set of service descriptors.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: Vec<ServiceDescriptor>,
}

impl ServiceRegistry {
    /// Build a registry, rejecting empty or duplicate ids.
    pub fn new(services: Vec<ServiceDescriptor>) -> Result<Self> {
        for (i, service) in services.iter().enumerate() {
            if service.id.as_str().trim().is_empty() {
                return Err(Error::InvalidConfig {
                    key: "services.id".to_string(),
                    reason: "service id must not be empty".to_string(),
                });
            }
            if services[..i].iter().any(|s| s.id == service.id) {
                return Err(Error::InvalidConfig {
                    key: "services.id".to_string(),
                    reason: format!("duplicate service id '{}'", service.id),
                });
            }
        }
        Ok(Self { services })
    }

    /// Look up a service.
    pub fn get(&self, id: &ServiceId) -> Result<&ServiceDescriptor> {
        self.services
            .iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| Error::UnknownService(id.to_string()))
    }

    /// Look up a service that must be enabled.
    pub fn enabled(&self, id: &ServiceId) -> Result<&ServiceDescriptor> {
        let service = self.get(id)?;
        if service.enabled {
            Ok(service)
        } else {
            Err(Error::ServiceDisabled(id.to_string()))
        }
    }

    /// Whether the registry contains `id`.
    #[must_use]
    pub fn contains(&self, id: &ServiceId) -> bool {
        self.services.iter().any(|s| &s.id == id)
    }

    /// All services in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.services.iter()
    }

    /// Service ids in configuration order.
    #[must_use]
    pub fn ids(&self) -> Vec<ServiceId> {
        self.services.iter().map(|s| s.id.clone()).collect()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self {
            services: ServiceDescriptor::defaults(),
        }
    }
}
