//! HTTP implementation of [`Backend`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{redirect, Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{
    Backend, Credentials, ErrorBody, LoginResponse, PlaylistsResponse, ProgressResponse,
    ServerVersion, TransferRequest, TransferSummary,
};
use crate::catalog::Collection;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::service::ServiceId;

/// Backend reached over HTTP.
///
/// Keeps a cookie store so the session established by a login is sent
/// with every later request. Redirects are not followed: an OAuth start
/// answers with the provider URL in `Location`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
    request_timeout: Duration,
    submit_timeout: Option<Duration>,
}

impl HttpBackend {
    /// Create a backend for the server at `base_url`.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).map_err(|e| Error::InvalidConfig {
            key: "server.url".to_string(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .user_agent(concat!("crossfade/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            request_timeout,
            submit_timeout: None,
        })
    }

    /// Create a backend from the `[server]` and `[transfer]` sections.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(&config.server.url, config.server.request_timeout)?
            .with_submit_timeout(config.transfer.submit_timeout))
    }

    /// Bound transfer submissions; `None` waits for the backend indefinitely.
    #[must_use]
    pub fn with_submit_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.submit_timeout = timeout;
        self
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::Internal(format!("invalid endpoint '{path}': {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.endpoint(path)?)
            .header(ACCEPT, "application/json")
            .timeout(self.request_timeout)
            .send()
            .await?;
        decode(response).await
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn auth_status(&self) -> Result<HashMap<ServiceId, bool>> {
        self.get_json("auth/status").await
    }

    async fn list_collections(&self, service: &ServiceId) -> Result<Vec<Collection>> {
        let response: PlaylistsResponse = self.get_json(&format!("{service}/playlists")).await?;
        Ok(response
            .playlists
            .into_iter()
            .map(|p| p.into_collection(service))
            .collect())
    }

    async fn begin_oauth(&self, service: &ServiceId) -> Result<String> {
        #[derive(Deserialize)]
        struct UrlBody {
            url: String,
        }

        let endpoint = self.endpoint(&format!("auth/{service}"))?;
        let response = self
            .client
            .post(endpoint.clone())
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_redirection() {
            if let Some(location) = response.headers().get(LOCATION) {
                let location = location
                    .to_str()
                    .map_err(|e| Error::Serialization(format!("invalid Location header: {e}")))?;
                return Ok(endpoint
                    .join(location)
                    .map_or_else(|_| location.to_string(), String::from));
            }
            return Ok(endpoint.to_string());
        }
        if status.is_success() {
            return Ok(response
                .json::<UrlBody>()
                .await
                .map_or_else(|_| endpoint.to_string(), |body| body.url));
        }
        Err(rejection(status, response).await)
    }

    async fn credential_login(
        &self,
        service: &ServiceId,
        credentials: &Credentials,
    ) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint(&format!("auth/{service}/login"))?)
            .json(credentials)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.json::<LoginResponse>().await.ok();
        match body {
            Some(LoginResponse { success: true, .. }) if status.is_success() => Ok(()),
            other => Err(Error::LoginFailed {
                service: service.to_string(),
                message: other
                    .and_then(|b| b.error)
                    .unwrap_or_else(|| "Login failed".to_string()),
            }),
        }
    }

    async fn disconnect(&self, service: &ServiceId) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint(&format!("disconnect/{service}"))?)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(rejection(status, response).await)
        }
    }

    async fn submit_transfer(&self, request: &TransferRequest) -> Result<TransferSummary> {
        let mut builder = self
            .client
            .post(self.endpoint("transfer")?)
            .header(ACCEPT, "application/json")
            .json(request);
        if let Some(timeout) = self.submit_timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| self.submit_error(e))?;
        decode(response).await
    }

    async fn transfer_progress(&self) -> Result<f64> {
        let response: ProgressResponse = self.get_json("transfer-progress").await?;
        if response.progress.is_finite() {
            Ok(response.progress.clamp(0.0, 100.0))
        } else {
            Err(Error::Serialization(format!(
                "invalid progress value {}",
                response.progress
            )))
        }
    }

    async fn version(&self) -> Result<ServerVersion> {
        self.get_json("version").await
    }
}

impl HttpBackend {
    fn submit_error(&self, err: reqwest::Error) -> Error {
        match self.submit_timeout {
            Some(timeout) if err.is_timeout() => Error::Timeout(timeout.as_secs()),
            _ => err.into(),
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(rejection(status, response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|e| Error::Serialization(format!("invalid response body: {e}")))
}

async fn rejection(status: StatusCode, response: Response) -> Error {
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error)
        .unwrap_or_else(|| format!("server returned {status}"));
    Error::RemoteRejection {
        status: status.as_u16(),
        message,
    }
}
