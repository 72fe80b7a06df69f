use crate::core::role_arn::RoleArn;
use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use http::{HeaderMap, Method, StatusCode};
use std::collections::HashMap;
use std::time::Duration;

/// Per-request metadata threaded through every downstream call, primarily the
/// correlation id assigned by the request-id middleware.
#[derive(Debug, Clone)]
pub(crate) struct RequestContext {
    request_id: String,
}

impl RequestContext {
    pub(crate) fn new(request_id: String) -> Self {
        Self { request_id }
    }

    pub(crate) fn request_id(&self) -> &str {
        &self.request_id
    }
}

/// Identifies a specific container and its IAM role/policy labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContainerIdentity {
    pub id: String,
    pub name: String,
    pub role: RoleArn,
    pub policy: String,
}

/// A summary row from the runtime's container listing.
#[derive(Debug, Clone, Default)]
pub(crate) struct ContainerSummary {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    pub state: String,
    pub labels: HashMap<String, String>,
    /// Network name to IP address, as attached by the runtime.
    pub network_ips: HashMap<String, String>,
}

/// The state portion of a single-container inspect.
#[derive(Debug, Clone, Default)]
pub(crate) struct ContainerStatus {
    pub status: String,
}

/// Short-lived role credentials returned by AssumeRole.
#[derive(Debug, Clone)]
pub(crate) struct SessionCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub token: String,
    pub expiration: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub role: RoleArn,
}

impl SessionCredentials {
    pub(crate) fn expired_at(&self, at: DateTime<Utc>) -> bool {
        at > self.expiration
    }

    /// True if the credentials expire within `window` from now.
    pub(crate) fn expires_within(&self, window: Duration) -> bool {
        match ChronoDuration::from_std(window) {
            Ok(window) => self.expired_at(Utc::now() + window),
            Err(_) => true,
        }
    }
}

/// A cache entry pairing the container identity observed at assume time with
/// the credentials obtained for it.
#[derive(Debug, Clone)]
pub(crate) struct CachedCredential {
    pub identity: ContainerIdentity,
    pub credentials: SessionCredentials,
}

impl CachedCredential {
    /// The entry is reusable only while the container still maps to the same
    /// role and id, and the credentials stay valid past the renewal window.
    pub(crate) fn is_valid(&self, current: &ContainerIdentity, renewal_window: Duration) -> bool {
        self.identity.role == current.role
            && self.identity.id == current.id
            && !self.credentials.expires_within(renewal_window)
    }
}

/// An inbound request as seen by the protocol handler, decoupled from the
/// HTTP server framework.
#[derive(Debug, Clone)]
pub(crate) struct ProxiedRequest {
    pub method: Method,
    /// Original request path including any query string.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Raw remote address, `host:port` or bare host.
    pub remote_addr: String,
}

#[derive(Debug)]
pub(crate) struct ProxiedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxiedResponse {
    pub(crate) fn status_only(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub(crate) fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// An outbound request handed to the upstream transport.
#[derive(Debug, Clone)]
pub(crate) struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamRequest {
    pub(crate) fn get(url: String) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}
