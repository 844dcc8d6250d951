use std::future::Future;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use siteplan_core::join_endpoint;

use crate::error::{classify_response, classify_transport, ErrorKind, RequestError};
use crate::identity::{IdentityContext, HEADER_ROLE, HEADER_USER_EMAIL, HEADER_USER_ID};
use crate::settings::ClientSettings;

/// HTTP verb for a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

/// The shared request pipeline every remote operation funnels through.
///
/// Identity headers and `Content-Type: application/json` ride on every
/// call; paths are resolved against the configured base address. Bodies and
/// responses are JSON with snake_case field names on the wire.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    settings: ClientSettings,
    identity: IdentityContext,
}

impl RemoteClient {
    pub fn new(settings: ClientSettings, identity: IdentityContext) -> Result<Self, RequestError> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .default_headers(default_headers(&identity)?)
            .build()
            .map_err(|err| RequestError::new(ErrorKind::Unreachable, err.to_string()))?;

        Ok(Self {
            http,
            settings,
            identity,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    pub fn identity(&self) -> &IdentityContext {
        &self.identity
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, RequestError> {
        self.send(Method::Get, path, None::<&()>, cancel).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, RequestError> {
        self.send(Method::Post, path, Some(body), cancel).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, RequestError> {
        self.send(Method::Patch, path, Some(body), cancel).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, RequestError> {
        self.send(Method::Delete, path, None::<&()>, cancel).await
    }

    /// Issues one remote call and decodes the response.
    ///
    /// An empty success (204 or a blank body) decodes as JSON `null`, so
    /// endpoints without a payload are called with `T = ()`. When `cancel`
    /// fires before the round trip finishes the call resolves as
    /// `Cancelled`, never as a transport failure: callers rely on that
    /// distinction to stay silent instead of showing an error.
    pub async fn send<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, RequestError> {
        match cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => Err(RequestError::cancelled()),
                    result = self.perform(method, path, body) => result,
                }
            }
            None => self.perform(method, path, body).await,
        }
    }

    async fn perform<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, RequestError> {
        let url = join_endpoint(&self.settings.base_url, path);
        let mut request = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Patch => self.http.patch(&url),
            Method::Delete => self.http.delete(&url),
        };

        if let Some(body) = body {
            let payload = serde_json::to_string(body)
                .map_err(|err| RequestError::new(ErrorKind::Malformed, err.to_string()))?;
            request = request.body(payload);
        }

        let response = request
            .send()
            .await
            .map_err(|err| classify_transport(&err))?;

        let status = response.status();
        // The body is read exactly once, success or not.
        let body = response
            .text()
            .await
            .map_err(|err| classify_transport(&err))?;

        if !status.is_success() {
            return Err(classify_response(status.as_u16(), &body));
        }

        let body = if body.trim().is_empty() { "null" } else { &body };
        serde_json::from_str(body).map_err(|err| {
            RequestError::new(
                ErrorKind::Malformed,
                format!("unexpected response shape: {err}"),
            )
        })
    }
}

fn default_headers(identity: &IdentityContext) -> Result<HeaderMap, RequestError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in [
        (HEADER_ROLE, &identity.role),
        (HEADER_USER_ID, &identity.user_id),
        (HEADER_USER_EMAIL, &identity.user_email),
    ] {
        let value = HeaderValue::from_str(value).map_err(|err| {
            RequestError::new(
                ErrorKind::Malformed,
                format!("identity value for {name} is not a valid header: {err}"),
            )
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Runs `operation`, substituting `fallback` only when the backend cannot
/// be reached.
///
/// Application errors (any status) and cancellations still propagate, so a
/// development environment without a server degrades to client defaults
/// without hiding real failures.
pub async fn with_fallback<T, Fut, F>(operation: Fut, fallback: F) -> Result<T, RequestError>
where
    Fut: Future<Output = Result<T, RequestError>>,
    F: FnOnce() -> T,
{
    match operation.await {
        Err(err) if err.kind == ErrorKind::Unreachable => Ok(fallback()),
        other => other,
    }
}
