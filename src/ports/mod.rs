use crate::core::error::{AssumeRoleError, DiscoveryError, RuntimeError, UpstreamError};
use crate::core::role_arn::RoleArn;
use crate::core::types::{
    ContainerIdentity, ContainerStatus, ContainerSummary, RequestContext, SessionCredentials,
    UpstreamRequest, UpstreamResponse,
};
use async_trait::async_trait;

/// Consumer-side contract of a container runtime daemon (Docker or
/// compatible). Listing yields only what discovery needs; inspect reports the
/// current status of one container, with "not found" distinguishable.
#[async_trait]
pub(crate) trait ContainerRuntime: Send + Sync {
    async fn list_containers(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<ContainerSummary>, RuntimeError>;

    async fn inspect_container(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<ContainerStatus, RuntimeError>;

    /// Platform tag, e.g. `"docker"`; seeds AssumeRole session names.
    fn platform_name(&self) -> &'static str;
}

/// Resolves a remote IP to the identity of the container it belongs to.
#[async_trait]
pub(crate) trait ContainerService: Send + Sync {
    async fn container_for_ip(
        &self,
        ctx: &RequestContext,
        ip: &str,
    ) -> Result<ContainerIdentity, DiscoveryError>;

    fn platform_name(&self) -> &'static str;
}

/// Obtains short-lived session credentials for a role.
///
/// `policy` distinguishes "not provided" (`None`) from an empty string; the
/// implementation must pass the field to the identity service only when
/// `Some`.
#[async_trait]
pub(crate) trait AssumeRoleClient: Send + Sync {
    async fn assume_role(
        &self,
        ctx: &RequestContext,
        role: &RoleArn,
        policy: Option<&str>,
        session_name: &str,
    ) -> Result<SessionCredentials, AssumeRoleError>;
}

/// Plain HTTP transport to the real instance metadata service.
#[async_trait]
pub(crate) trait UpstreamTransport: Send + Sync {
    async fn round_trip(
        &self,
        ctx: &RequestContext,
        request: UpstreamRequest,
    ) -> Result<UpstreamResponse, UpstreamError>;
}
