use crate::core::error::UpstreamError;
use crate::core::types::{RequestContext, UpstreamRequest, UpstreamResponse};
use crate::ports::UpstreamTransport;
use async_trait::async_trait;
use tracing::debug;

/// `UpstreamTransport` backed by a shared reqwest client. The metadata
/// service is plain HTTP on a link-local address with no authentication.
/// Redirects are never followed: a 3xx from the upstream is relayed to the
/// caller as-is.
pub(crate) struct HttpUpstreamTransport {
    client: reqwest::Client,
}

impl HttpUpstreamTransport {
    pub(crate) fn new() -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamTransport for HttpUpstreamTransport {
    async fn round_trip(
        &self,
        ctx: &RequestContext,
        request: UpstreamRequest,
    ) -> Result<UpstreamResponse, UpstreamError> {
        debug!(
            request_id = ctx.request_id(),
            method = %request.method,
            url = %request.url,
            "Forwarding to upstream metadata service"
        );

        let response = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
