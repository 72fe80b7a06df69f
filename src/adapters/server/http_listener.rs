use crate::adapters::server::request_id::{assign_request_id, RequestIdSource};
use crate::core::metadata_request_processor::MetadataRequestProcessor;
use crate::core::types::{ProxiedRequest, RequestContext};
use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware;
use axum::response::Response;
use axum::Router;
use http::StatusCode;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Clone)]
pub(crate) struct AppState {
    processor: Arc<MetadataRequestProcessor>,
}

/// Builds the single-route application: every path falls through to the
/// metadata processor, with request-id assignment layered in front.
pub(crate) fn build_router(
    processor: Arc<MetadataRequestProcessor>,
    request_ids: Arc<RequestIdSource>,
) -> Router {
    Router::new()
        .fallback(proxy_metadata)
        .layer(middleware::from_fn_with_state(request_ids, assign_request_id))
        .with_state(AppState { processor })
}

async fn proxy_metadata(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request,
) -> Response {
    let ctx = request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_else(|| RequestContext::new("unassigned".to_string()));

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body) => body,
        Err(e) => {
            debug!(request_id = ctx.request_id(), "Failed to read request body: {}", e);
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::BAD_REQUEST;
            return response;
        }
    };

    // Keep the query string; the processor forwards it upstream verbatim.
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| parts.uri.path())
        .to_string();

    debug!(
        request_id = ctx.request_id(),
        client = %remote,
        method = %parts.method,
        path = %path,
        "Client request"
    );

    let proxied = ProxiedRequest {
        method: parts.method,
        path,
        headers: parts.headers,
        body,
        remote_addr: remote.to_string(),
    };

    let result = state.processor.handle(&ctx, proxied).await;

    let mut response = Response::new(Body::from(result.body));
    *response.status_mut() = result.status;
    *response.headers_mut() = result.headers;
    response
}

/// A bare `:port` listen address means all interfaces.
fn bind_address(listen_addr: &str) -> String {
    if listen_addr.starts_with(':') {
        format!("0.0.0.0{listen_addr}")
    } else {
        listen_addr.to_string()
    }
}

/// Binds the listener and serves until the token is cancelled.
pub(crate) async fn run_http_listener(
    listen_addr: &str,
    router: Router,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(bind_address(listen_addr)).await?;
    info!("HTTP listener started on {}", listen_addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown.cancelled().await;
        info!("HTTP listener shutting down.");
    })
    .await
}
