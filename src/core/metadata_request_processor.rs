use crate::core::credentials::CredentialsProvider;
use crate::core::types::{
    ProxiedRequest, ProxiedResponse, RequestContext, UpstreamRequest,
};
use crate::ports::UpstreamTransport;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, StatusCode};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Base URL of the real instance metadata service.
pub(crate) const DEFAULT_METADATA_URL: &str = "http://169.254.169.254";

const CREDS_PATH_PATTERN: &str = r"^/(.+?)/meta-data/iam/security-credentials/(.*)$";

const UPSTREAM_ERROR_BODY: &str = "An unexpected error occurred communicating with Amazon";
const CREDENTIALS_ERROR_BODY: &str = "An unexpected error getting container role";

/// Credentials document in the exact shape the metadata service serves.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct MetadataCredentialsBody {
    pub code: String,
    pub last_updated: DateTime<Utc>,
    pub r#type: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub token: String,
    pub expiration: DateTime<Utc>,
}

/// Handles every inbound request: credentials paths are answered locally from
/// per-container role credentials, everything else is reverse-proxied to the
/// real metadata service.
pub(crate) struct MetadataRequestProcessor {
    creds_path: Regex,
    upstream: Arc<dyn UpstreamTransport>,
    credentials: Arc<CredentialsProvider>,
    metadata_url: String,
}

impl MetadataRequestProcessor {
    pub(crate) fn new(
        upstream: Arc<dyn UpstreamTransport>,
        credentials: Arc<CredentialsProvider>,
        metadata_url: String,
    ) -> Self {
        Self {
            creds_path: Regex::new(CREDS_PATH_PATTERN)
                .expect("credentials path pattern must compile"),
            upstream,
            credentials,
            metadata_url,
        }
    }

    pub(crate) async fn handle(
        &self,
        ctx: &RequestContext,
        request: ProxiedRequest,
    ) -> ProxiedResponse {
        // Credentials dispatch looks at the path alone; any query string is
        // only meaningful to forwarded requests.
        let path = request
            .path
            .split_once('?')
            .map_or(request.path.as_str(), |(path, _)| path);
        let captures = self
            .creds_path
            .captures(path)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()));

        match captures {
            Some((api_version, subpath)) => {
                let client_ip = remote_ip(&request.remote_addr).to_string();
                self.handle_credentials(ctx, &api_version, &subpath, &client_ip)
                    .await
            }
            None => self.forward(ctx, request).await,
        }
    }

    /// Reverse-proxies a non-credentials request to the real metadata
    /// service, copying method, headers, body, status, and response verbatim.
    async fn forward(&self, ctx: &RequestContext, request: ProxiedRequest) -> ProxiedResponse {
        let upstream_request = UpstreamRequest {
            method: request.method,
            url: format!("{}{}", self.metadata_url, request.path),
            headers: request.headers,
            body: request.body,
        };

        match self.upstream.round_trip(ctx, upstream_request).await {
            Ok(response) => ProxiedResponse {
                status: response.status,
                headers: response.headers,
                body: response.body,
            },
            Err(e) => {
                error!(
                    request_id = ctx.request_id(),
                    "Error forwarding request to the instance metadata service: {}", e
                );
                ProxiedResponse::text(StatusCode::INTERNAL_SERVER_ERROR, UPSTREAM_ERROR_BODY)
            }
        }
    }

    /// Reproduces the metadata service's credentials endpoints for one
    /// container, after probing that the real service would have answered the
    /// requested API version at all.
    async fn handle_credentials(
        &self,
        ctx: &RequestContext,
        api_version: &str,
        subpath: &str,
        client_ip: &str,
    ) -> ProxiedResponse {
        let probe_url = format!(
            "{}/{}/meta-data/iam/security-credentials/",
            self.metadata_url, api_version
        );
        let probe = match self.upstream.round_trip(ctx, UpstreamRequest::get(probe_url)).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    request_id = ctx.request_id(),
                    api_version,
                    "Error requesting credentials path: {}", e
                );
                return ProxiedResponse::status_only(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };
        if probe.status != StatusCode::OK {
            return ProxiedResponse::status_only(probe.status);
        }

        let credentials = match self.credentials.credentials_for_ip(ctx, client_ip).await {
            Ok(credentials) => credentials,
            Err(e) => {
                error!(
                    request_id = ctx.request_id(),
                    ip = %client_ip,
                    "Error getting credentials: {}", e
                );
                return ProxiedResponse::text(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    CREDENTIALS_ERROR_BODY,
                );
            }
        };

        let role_name = credentials.role.name();

        if subpath.is_empty() {
            return ProxiedResponse::text(StatusCode::OK, role_name.to_string());
        }
        if !subpath_selects_role(subpath, role_name) {
            return ProxiedResponse::status_only(StatusCode::NOT_FOUND);
        }

        let body = MetadataCredentialsBody {
            code: "Success".to_string(),
            last_updated: credentials.generated_at,
            r#type: "AWS-HMAC".to_string(),
            access_key_id: credentials.access_key,
            secret_access_key: credentials.secret_key,
            token: credentials.token,
            expiration: credentials.expiration,
        };
        match serde_json::to_vec(&body) {
            Ok(json) => ProxiedResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Bytes::from(json),
            },
            Err(e) => {
                error!(
                    request_id = ctx.request_id(),
                    "Error marshaling credentials: {}", e
                );
                ProxiedResponse::status_only(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

/// An idiosyncrasy of the standard metadata service: so long as the correct
/// role name is provided, it may be followed by a slash and arbitrary
/// trailing segments, which are ignored.
fn subpath_selects_role(subpath: &str, role_name: &str) -> bool {
    if role_name.is_empty() {
        return false;
    }
    subpath.starts_with(role_name)
        && (subpath.len() == role_name.len() || subpath.as_bytes()[role_name.len()] == b'/')
}

/// Strips the port from a `host:port` remote address; a bare host passes
/// through unchanged.
pub(crate) fn remote_ip(addr: &str) -> &str {
    match addr.find(':') {
        Some(index) => &addr[..index],
        None => addr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{AssumeRoleError, DiscoveryError, UpstreamError};
    use crate::core::role_arn::RoleArn;
    use crate::core::types::{ContainerIdentity, SessionCredentials, UpstreamResponse};
    use crate::ports::{AssumeRoleClient, ContainerService};
    use async_trait::async_trait;
    use http::{HeaderValue, Method};
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    const NOPERMS_ARN: &str = "arn:aws:iam::123456789012:role/NoPerms";
    const DB_ARN: &str = "arn:aws:iam::123456789012:role/SomethingDB";
    const CUSTOM_POLICY: &str = r#"{"Statement":[{"Effect":"Allow"}]}"#;

    const IP_WITH_ROLE: &str = "172.21.0.2";
    const IP_WITHOUT_LABELS: &str = "172.21.0.3";
    const IP_WITH_ALL_LABELS: &str = "172.21.0.4";

    const CREDS_PATH_BASE: &str = "/latest/meta-data/iam/security-credentials/";
    const PROXIED_BODY: &str = "default proxied body";

    struct StubContainers {
        identities: HashMap<String, ContainerIdentity>,
    }

    #[async_trait]
    impl ContainerService for StubContainers {
        async fn container_for_ip(
            &self,
            _ctx: &RequestContext,
            ip: &str,
        ) -> Result<ContainerIdentity, DiscoveryError> {
            self.identities
                .get(ip)
                .cloned()
                .ok_or_else(|| DiscoveryError::NotFound(ip.to_string()))
        }

        fn platform_name(&self) -> &'static str {
            "docker"
        }
    }

    #[derive(Debug, Clone)]
    struct RecordedAssumeRole {
        role_arn: String,
        policy: Option<String>,
        session_name: String,
    }

    struct StubSts {
        calls: StdMutex<Vec<RecordedAssumeRole>>,
        expiration: DateTime<Utc>,
        generated_at: DateTime<Utc>,
    }

    impl StubSts {
        fn new() -> Self {
            let now = Utc::now();
            Self {
                calls: StdMutex::new(Vec::new()),
                expiration: now + chrono::Duration::seconds(900),
                generated_at: now,
            }
        }

        fn calls(&self) -> Vec<RecordedAssumeRole> {
            self.calls.lock().unwrap().clone()
        }

        fn single_call(&self) -> RecordedAssumeRole {
            let calls = self.calls();
            assert_eq!(calls.len(), 1, "expected exactly one AssumeRole call");
            calls[0].clone()
        }
    }

    #[async_trait]
    impl AssumeRoleClient for StubSts {
        async fn assume_role(
            &self,
            _ctx: &RequestContext,
            role: &RoleArn,
            policy: Option<&str>,
            session_name: &str,
        ) -> Result<SessionCredentials, AssumeRoleError> {
            self.calls.lock().unwrap().push(RecordedAssumeRole {
                role_arn: role.to_string(),
                policy: policy.map(str::to_string),
                session_name: session_name.to_string(),
            });
            Ok(SessionCredentials {
                access_key: "fakeAccessKeyId".to_string(),
                secret_key: "fakeSecretAccessKey".to_string(),
                token: "fakeSessionToken".to_string(),
                expiration: self.expiration,
                generated_at: self.generated_at,
                role: role.clone(),
            })
        }
    }

    #[derive(Default)]
    struct StubUpstream {
        requests: StdMutex<Vec<UpstreamRequest>>,
        probe_status: Option<StatusCode>,
        probe_fails: bool,
        forward_fails: bool,
    }

    impl StubUpstream {
        fn requests(&self) -> Vec<UpstreamRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UpstreamTransport for StubUpstream {
        async fn round_trip(
            &self,
            _ctx: &RequestContext,
            request: UpstreamRequest,
        ) -> Result<UpstreamResponse, UpstreamError> {
            let is_probe = request.url.ends_with("/meta-data/iam/security-credentials/");
            self.requests.lock().unwrap().push(request);

            if is_probe {
                if self.probe_fails {
                    return Err(UpstreamError::Network("connection refused".to_string()));
                }
                return Ok(UpstreamResponse {
                    status: self.probe_status.unwrap_or(StatusCode::OK),
                    headers: HeaderMap::new(),
                    body: Bytes::new(),
                });
            }

            if self.forward_fails {
                return Err(UpstreamError::Network("connection refused".to_string()));
            }
            let mut headers = HeaderMap::new();
            headers.insert("x-upstream", HeaderValue::from_static("indeed"));
            Ok(UpstreamResponse {
                status: StatusCode::OK,
                headers,
                body: Bytes::from_static(PROXIED_BODY.as_bytes()),
            })
        }
    }

    struct Fixture {
        processor: MetadataRequestProcessor,
        sts: Arc<StubSts>,
        upstream: Arc<StubUpstream>,
    }

    fn identities() -> HashMap<String, ContainerIdentity> {
        HashMap::from([
            (
                IP_WITH_ROLE.to_string(),
                ContainerIdentity {
                    id: "cafe000000000000".to_string(),
                    name: "/with-role".to_string(),
                    role: RoleArn::parse(NOPERMS_ARN).unwrap(),
                    policy: String::new(),
                },
            ),
            (
                IP_WITHOUT_LABELS.to_string(),
                ContainerIdentity {
                    id: "beef000000000000".to_string(),
                    name: "/without-labels".to_string(),
                    role: RoleArn::default(),
                    policy: String::new(),
                },
            ),
            (
                IP_WITH_ALL_LABELS.to_string(),
                ContainerIdentity {
                    id: "f00d000000000000".to_string(),
                    name: "/with-all-labels".to_string(),
                    role: RoleArn::parse(DB_ARN).unwrap(),
                    policy: CUSTOM_POLICY.to_string(),
                },
            ),
        ])
    }

    fn fixture_with(default_alias_set: bool, default_policy: &str) -> Fixture {
        fixture_with_upstream(default_alias_set, default_policy, StubUpstream::default())
    }

    fn fixture_with_upstream(
        default_alias_set: bool,
        default_policy: &str,
        upstream: StubUpstream,
    ) -> Fixture {
        let sts = Arc::new(StubSts::new());
        let upstream = Arc::new(upstream);
        let default_role = if default_alias_set {
            RoleArn::parse(NOPERMS_ARN).unwrap()
        } else {
            RoleArn::default()
        };
        let credentials = Arc::new(CredentialsProvider::new(
            Arc::new(StubContainers {
                identities: identities(),
            }),
            sts.clone(),
            default_role,
            default_policy.to_string(),
        ));
        let processor = MetadataRequestProcessor::new(
            upstream.clone(),
            credentials,
            DEFAULT_METADATA_URL.to_string(),
        );
        Fixture {
            processor,
            sts,
            upstream,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(true, "")
    }

    fn request(path: &str, client_ip: &str) -> ProxiedRequest {
        let mut headers = HeaderMap::new();
        headers.insert("x-forward-me", HeaderValue::from_static("yes"));
        ProxiedRequest {
            method: Method::GET,
            path: path.to_string(),
            headers,
            body: Bytes::new(),
            remote_addr: format!("{client_ip}:54321"),
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new("test-0001".to_string())
    }

    fn parse_credentials(body: &Bytes) -> MetadataCredentialsBody {
        serde_json::from_slice(body).expect("credentials body must be valid JSON")
    }

    fn assert_fixture_credentials(fx: &Fixture, response: &ProxiedResponse) {
        assert_eq!(response.status, StatusCode::OK);
        let creds = parse_credentials(&response.body);
        assert_eq!(creds.code, "Success");
        assert_eq!(creds.r#type, "AWS-HMAC");
        assert_eq!(creds.access_key_id, "fakeAccessKeyId");
        assert_eq!(creds.secret_access_key, "fakeSecretAccessKey");
        assert_eq!(creds.token, "fakeSessionToken");
        assert_eq!(creds.last_updated, fx.sts.generated_at);
        assert_eq!(creds.expiration, fx.sts.expiration);
    }

    #[tokio::test]
    async fn serves_credentials_for_matching_role_subpath() {
        let fx = fixture();

        let response = fx
            .processor
            .handle(&ctx(), request(&format!("{CREDS_PATH_BASE}NoPerms"), IP_WITH_ROLE))
            .await;

        assert_fixture_credentials(&fx, &response);
        let call = fx.sts.single_call();
        assert_eq!(call.role_arn, NOPERMS_ARN);
        assert_eq!(call.policy, None);
        assert_eq!(call.session_name, "docker-cafe000000000000");
    }

    #[tokio::test]
    async fn rejects_mismatched_role_subpath() {
        let fx = fixture();

        let response = fx
            .processor
            .handle(&ctx(), request(&format!("{CREDS_PATH_BASE}invalid"), IP_WITH_ROLE))
            .await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(response.body.is_empty());
        // Credentials are resolved (and cached) before the subpath verdict.
        let call = fx.sts.single_call();
        assert_eq!(call.role_arn, NOPERMS_ARN);
        assert_eq!(call.policy, None);
    }

    #[tokio::test]
    async fn empty_subpath_returns_plain_role_name() {
        let fx = fixture();

        let response = fx
            .processor
            .handle(&ctx(), request(CREDS_PATH_BASE, IP_WITH_ROLE))
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body.as_ref(), b"NoPerms");
        let call = fx.sts.single_call();
        assert_eq!(call.role_arn, NOPERMS_ARN);
        assert_eq!(call.policy, None);
    }

    #[tokio::test]
    async fn applies_default_role_to_unlabeled_containers() {
        let fx = fixture();

        let response = fx
            .processor
            .handle(
                &ctx(),
                request(&format!("{CREDS_PATH_BASE}NoPerms"), IP_WITHOUT_LABELS),
            )
            .await;

        assert_fixture_credentials(&fx, &response);
        let call = fx.sts.single_call();
        assert_eq!(call.role_arn, NOPERMS_ARN);
        assert_eq!(call.policy, None);
    }

    #[tokio::test]
    async fn applies_default_policy_to_unlabeled_containers() {
        let default_policy = r#"{"Version":"2012-10-17","Statement":[]}"#;
        let fx = fixture_with(true, default_policy);

        let response = fx
            .processor
            .handle(
                &ctx(),
                request(&format!("{CREDS_PATH_BASE}NoPerms"), IP_WITHOUT_LABELS),
            )
            .await;

        assert_fixture_credentials(&fx, &response);
        let call = fx.sts.single_call();
        assert_eq!(call.role_arn, NOPERMS_ARN);
        assert_eq!(call.policy, Some(default_policy.to_string()));
    }

    #[tokio::test]
    async fn honors_role_and_policy_labels() {
        let fx = fixture();

        let response = fx
            .processor
            .handle(
                &ctx(),
                request(&format!("{CREDS_PATH_BASE}SomethingDB"), IP_WITH_ALL_LABELS),
            )
            .await;

        assert_fixture_credentials(&fx, &response);
        let call = fx.sts.single_call();
        assert_eq!(call.role_arn, DB_ARN);
        assert_eq!(call.policy, Some(CUSTOM_POLICY.to_string()));
    }

    #[tokio::test]
    async fn without_defaults_unlabeled_containers_get_404() {
        let fx = fixture_with(false, "");

        let response = fx
            .processor
            .handle(
                &ctx(),
                request(&format!("{CREDS_PATH_BASE}NoPerms"), IP_WITHOUT_LABELS),
            )
            .await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(response.body.is_empty());
        let call = fx.sts.single_call();
        assert_eq!(call.role_arn, "");
        assert_eq!(call.policy, None);
    }

    #[tokio::test]
    async fn forwards_non_credentials_paths_verbatim() {
        let fx = fixture();

        let response = fx
            .processor
            .handle(&ctx(), request("/latest/meta-data/local-hostname", IP_WITH_ROLE))
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body.as_ref(), PROXIED_BODY.as_bytes());
        assert_eq!(
            response.headers.get("x-upstream"),
            Some(&HeaderValue::from_static("indeed"))
        );

        let requests = fx.upstream.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url,
            format!("{DEFAULT_METADATA_URL}/latest/meta-data/local-hostname")
        );
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(
            requests[0].headers.get("x-forward-me"),
            Some(&HeaderValue::from_static("yes"))
        );
        assert!(fx.sts.calls().is_empty());
    }

    #[tokio::test]
    async fn forwarded_requests_keep_the_query_string() {
        let fx = fixture();

        fx.processor
            .handle(
                &ctx(),
                request("/latest/meta-data/local-hostname?bar=1", IP_WITH_ROLE),
            )
            .await;

        let requests = fx.upstream.requests();
        assert_eq!(
            requests[0].url,
            format!("{DEFAULT_METADATA_URL}/latest/meta-data/local-hostname?bar=1")
        );
    }

    #[tokio::test]
    async fn credentials_dispatch_ignores_the_query_string() {
        let fx = fixture();

        let response = fx
            .processor
            .handle(
                &ctx(),
                request(&format!("{CREDS_PATH_BASE}NoPerms?recurse=true"), IP_WITH_ROLE),
            )
            .await;

        assert_fixture_credentials(&fx, &response);
    }

    #[tokio::test]
    async fn forward_failure_returns_opaque_500() {
        let fx = fixture_with_upstream(
            true,
            "",
            StubUpstream {
                forward_fails: true,
                ..StubUpstream::default()
            },
        );

        let response = fx
            .processor
            .handle(&ctx(), request("/latest/meta-data/local-hostname", IP_WITH_ROLE))
            .await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body.as_ref(), UPSTREAM_ERROR_BODY.as_bytes());
    }

    #[tokio::test]
    async fn probe_precedes_credentials_and_targets_requested_api_version() {
        let fx = fixture();

        fx.processor
            .handle(
                &ctx(),
                request("/2021-07-15/meta-data/iam/security-credentials/NoPerms", IP_WITH_ROLE),
            )
            .await;

        let requests = fx.upstream.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url,
            format!("{DEFAULT_METADATA_URL}/2021-07-15/meta-data/iam/security-credentials/")
        );
        assert_eq!(requests[0].method, Method::GET);
    }

    #[tokio::test]
    async fn non_200_probe_status_is_mirrored_with_empty_body() {
        let fx = fixture_with_upstream(
            true,
            "",
            StubUpstream {
                probe_status: Some(StatusCode::NOT_FOUND),
                ..StubUpstream::default()
            },
        );

        let response = fx
            .processor
            .handle(&ctx(), request(&format!("{CREDS_PATH_BASE}NoPerms"), IP_WITH_ROLE))
            .await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(response.body.is_empty());
        assert!(fx.sts.calls().is_empty());
    }

    #[tokio::test]
    async fn probe_transport_failure_returns_500() {
        let fx = fixture_with_upstream(
            true,
            "",
            StubUpstream {
                probe_fails: true,
                ..StubUpstream::default()
            },
        );

        let response = fx
            .processor
            .handle(&ctx(), request(&format!("{CREDS_PATH_BASE}NoPerms"), IP_WITH_ROLE))
            .await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn unknown_client_ip_returns_opaque_500() {
        let fx = fixture();

        let response = fx
            .processor
            .handle(&ctx(), request(&format!("{CREDS_PATH_BASE}NoPerms"), "10.9.9.9"))
            .await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body.as_ref(), CREDENTIALS_ERROR_BODY.as_bytes());
        assert!(fx.sts.calls().is_empty());
    }

    #[tokio::test]
    async fn role_subpath_tolerates_trailing_segments() {
        let fx = fixture();

        for subpath in ["NoPerms", "NoPerms/anything", "NoPerms/NoPerms/deeper"] {
            let response = fx
                .processor
                .handle(&ctx(), request(&format!("{CREDS_PATH_BASE}{subpath}"), IP_WITH_ROLE))
                .await;
            assert_eq!(response.status, StatusCode::OK, "{subpath}");
            parse_credentials(&response.body);
        }

        for subpath in ["NoPermsX", "NoPermsExtra/chars", "Other"] {
            let response = fx
                .processor
                .handle(&ctx(), request(&format!("{CREDS_PATH_BASE}{subpath}"), IP_WITH_ROLE))
                .await;
            assert_eq!(response.status, StatusCode::NOT_FOUND, "{subpath}");
            assert!(response.body.is_empty());
        }
    }

    #[tokio::test]
    async fn credentials_json_uses_exact_field_names() {
        let fx = fixture();

        let response = fx
            .processor
            .handle(&ctx(), request(&format!("{CREDS_PATH_BASE}NoPerms"), IP_WITH_ROLE))
            .await;

        let value: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "Code",
            "LastUpdated",
            "Type",
            "AccessKeyId",
            "SecretAccessKey",
            "Token",
            "Expiration",
        ] {
            assert!(object.contains_key(key), "missing field {key}");
        }
        assert_eq!(object.len(), 7);
        assert_eq!(object["Code"], "Success");
        assert_eq!(object["Type"], "AWS-HMAC");

        // Timestamps must parse back as RFC3339.
        for key in ["LastUpdated", "Expiration"] {
            let raw = object[key].as_str().unwrap();
            DateTime::parse_from_rfc3339(raw).unwrap_or_else(|e| panic!("{key}: {e}"));
        }
    }

    #[test]
    fn subpath_selection_honors_role_boundaries() {
        assert!(subpath_selects_role("NoPerms", "NoPerms"));
        assert!(subpath_selects_role("NoPerms/anything", "NoPerms"));
        assert!(!subpath_selects_role("NoPermsX", "NoPerms"));
        assert!(!subpath_selects_role("Other", "NoPerms"));
        assert!(!subpath_selects_role("NoPerms", ""));
        assert!(!subpath_selects_role("/anything", ""));
    }

    #[test]
    fn remote_ip_strips_port_when_present() {
        assert_eq!(remote_ip("172.21.0.2:54321"), "172.21.0.2");
        assert_eq!(remote_ip("172.21.0.2"), "172.21.0.2");
        assert_eq!(remote_ip(""), "");
    }
}
