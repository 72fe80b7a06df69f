use crate::core::error::CredentialsError;
use crate::core::role_arn::RoleArn;
use crate::core::types::{CachedCredential, RequestContext, SessionCredentials};
use crate::ports::{AssumeRoleClient, ContainerService};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Minimum remaining validity for cached credentials to be reused; below
/// this a fresh set is requested.
pub(crate) const RENEWAL_WINDOW: Duration = Duration::from_secs(5 * 60);

const MAX_SESSION_NAME_LEN: usize = 32;

/// Resolves a caller IP to a container, assumes the role named in the
/// container's labels, and caches the resulting session credentials per IP.
///
/// All work runs while the single mutex is held, outbound AssumeRole
/// included: concurrent requests for the same IP collapse into one
/// AssumeRole call, with later callers served from the fresh cache entry.
pub(crate) struct CredentialsProvider {
    containers: Arc<dyn ContainerService>,
    sts: Arc<dyn AssumeRoleClient>,
    default_role: RoleArn,
    default_policy: String,
    cache: Mutex<HashMap<String, CachedCredential>>,
}

impl CredentialsProvider {
    pub(crate) fn new(
        containers: Arc<dyn ContainerService>,
        sts: Arc<dyn AssumeRoleClient>,
        default_role: RoleArn,
        default_policy: String,
    ) -> Self {
        Self {
            containers,
            sts,
            default_role,
            default_policy,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves the IP to a container and returns fresh role credentials for
    /// it, from cache when the cached identity still matches and the
    /// credentials are outside the renewal window.
    pub(crate) async fn credentials_for_ip(
        &self,
        ctx: &RequestContext,
        ip: &str,
    ) -> Result<SessionCredentials, CredentialsError> {
        let mut cache = self.cache.lock().await;

        let identity = self
            .containers
            .container_for_ip(ctx, ip)
            .await
            .map_err(|source| CredentialsError::ContainerLookup {
                ip: ip.to_string(),
                source,
            })?;

        if let Some(entry) = cache.get(ip) {
            if entry.is_valid(&identity, RENEWAL_WINDOW) {
                return Ok(entry.credentials.clone());
            }
        }

        let (role, policy) = if identity.role.is_empty() {
            let policy = if identity.policy.is_empty() {
                self.default_policy.clone()
            } else {
                identity.policy.clone()
            };
            (self.default_role.clone(), policy)
        } else {
            (identity.role.clone(), identity.policy.clone())
        };

        let session_name = session_name(self.containers.platform_name(), &identity.id);
        debug!(
            request_id = ctx.request_id(),
            ip = %ip,
            role = %role,
            session_name = %session_name,
            "Requesting fresh session credentials"
        );

        let credentials = self
            .sts
            .assume_role(
                ctx,
                &role,
                (!policy.is_empty()).then_some(policy.as_str()),
                &session_name,
            )
            .await
            .map_err(|source| CredentialsError::AssumeRole {
                role_arn: role.to_string(),
                container_name: identity.name.clone(),
                source,
            })?;

        let entry = CachedCredential {
            identity,
            credentials,
        };
        let credentials = entry.credentials.clone();
        cache.insert(ip.to_string(), entry);
        Ok(credentials)
    }
}

/// Builds an STS role session name from the platform tag and container id:
/// characters outside `[A-Za-z0-9+=,.@_-]` become `_`, truncated to the STS
/// limit of 32.
fn session_name(platform: &str, container_id: &str) -> String {
    format!("{platform}-{container_id}")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '+' | '=' | ',' | '.' | '@' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_SESSION_NAME_LEN)
        .collect()
}
