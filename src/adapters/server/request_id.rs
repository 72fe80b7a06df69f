use crate::core::types::RequestContext;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Callers may supply their own correlation id through this header;
/// otherwise one is generated.
pub(crate) const REQUEST_ID_HEADER: &str = "x-ec2metaproxy-id";

/// Issues request ids of the form `<hostname>/<prefix>-<counter>`, where the
/// prefix is a 10-character base62 string chosen once per process from OS
/// randomness and the counter is a zero-padded atomic increment.
pub(crate) struct RequestIdSource {
    prefix: String,
    counter: AtomicU64,
}

impl RequestIdSource {
    pub(crate) fn new() -> Self {
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".to_string());
        Self::with_hostname(host)
    }

    fn with_hostname(hostname: String) -> Self {
        let noise: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(10)
            .map(char::from)
            .collect();
        Self {
            prefix: format!("{hostname}/{noise}"),
            counter: AtomicU64::new(0),
        }
    }

    /// Returns the incoming id untouched when present, a generated one
    /// otherwise.
    pub(crate) fn assign(&self, incoming: Option<&str>) -> String {
        match incoming {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let count = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
                format!("{}-{:06}", self.prefix, count)
            }
        }
    }
}

/// Middleware attaching a `RequestContext` with the request id to every
/// inbound request.
pub(crate) async fn assign_request_id(
    State(source): State<Arc<RequestIdSource>>,
    mut request: Request,
    next: Next,
) -> Response {
    let incoming = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok());
    let id = source.assign(incoming);
    request.extensions_mut().insert(RequestContext::new(id));
    next.run(request).await
}
