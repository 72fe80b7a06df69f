use crate::core::error::{DiscoveryError, RuntimeError};
use crate::core::role_arn::RoleArn;
use crate::core::types::{ContainerIdentity, RequestContext};
use crate::ports::{ContainerRuntime, ContainerService};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Container label holding a role alias; the alias must be mapped in the
/// config file's alias-to-ARN table for the container to be served.
pub(crate) const ROLE_ALIAS_LABEL: &str = "ec2metaproxy.RoleAlias";
/// Container label holding an inline IAM policy JSON for AssumeRole.
pub(crate) const POLICY_LABEL: &str = "ec2metaproxy.Policy";

const RUNNING_STATE: &str = "running";

/// How long a cache entry is trusted before the container is re-inspected.
const REFRESH_TTL: Duration = Duration::from_secs(1);

struct DiscoveryEntry {
    identity: ContainerIdentity,
    refresh_at: Instant,
}

enum Refresh {
    FullSync,
    Inspect(String),
}

/// Queries the container runtime and maintains a mapping of IPs to container
/// identities.
///
/// Entries are trusted for a short TTL; past it the single container is
/// re-inspected, and any inspect failure or non-running status demotes to a
/// full re-sync. A full sync builds a fresh map and swaps it in wholesale, so
/// stale containers drop out without per-entry deletion.
pub(crate) struct ContainerDiscovery {
    runtime: Arc<dyn ContainerRuntime>,
    alias_to_arn: HashMap<String, String>,
    entries: Mutex<HashMap<String, DiscoveryEntry>>,
}

impl ContainerDiscovery {
    pub(crate) fn new(
        runtime: Arc<dyn ContainerRuntime>,
        alias_to_arn: HashMap<String, String>,
    ) -> Self {
        Self {
            runtime,
            alias_to_arn,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Rebuilds the IP map from a full container listing. A listing failure
    /// leaves the current map untouched.
    async fn full_sync(&self, ctx: &RequestContext, entries: &mut HashMap<String, DiscoveryEntry>) {
        let containers = match self.runtime.list_containers(ctx).await {
            Ok(containers) => containers,
            Err(e) => {
                warn!(
                    request_id = ctx.request_id(),
                    "Error listing running containers: {}", e
                );
                return;
            }
        };

        let refresh_at = Instant::now() + REFRESH_TTL;
        let mut next: HashMap<String, DiscoveryEntry> = HashMap::new();

        for container in containers {
            if container.state != RUNNING_STATE {
                continue;
            }
            let Some(alias) = container.labels.get(ROLE_ALIAS_LABEL) else {
                continue;
            };

            let Some(arn_value) = self.alias_to_arn.get(alias) else {
                warn!(
                    request_id = ctx.request_id(),
                    container = %container.id,
                    names = ?container.names,
                    "Container has an unmapped role alias [{}]", alias
                );
                continue;
            };
            let role = match RoleArn::parse(arn_value) {
                Ok(role) => role,
                Err(e) => {
                    warn!(
                        request_id = ctx.request_id(),
                        container = %container.id,
                        alias = %alias,
                        "Role alias maps to an invalid ARN: {}", e
                    );
                    continue;
                }
            };

            let ips: Vec<&String> = container
                .network_ips
                .values()
                .filter(|ip| !ip.is_empty())
                .collect();
            if ips.is_empty() {
                warn!(
                    request_id = ctx.request_id(),
                    container = %container.id,
                    "No IP addresses discovered for container"
                );
                continue;
            }

            let policy = container
                .labels
                .get(POLICY_LABEL)
                .cloned()
                .unwrap_or_default();
            let name = container.names.join(",");

            for ip in ips {
                debug!(
                    request_id = ctx.request_id(),
                    id = %short_id(&container.id),
                    ip = %ip,
                    image = %container.image,
                    role = %role,
                    "Discovered container"
                );
                next.insert(
                    ip.clone(),
                    DiscoveryEntry {
                        identity: ContainerIdentity {
                            id: container.id.clone(),
                            name: name.clone(),
                            role: role.clone(),
                            policy: policy.clone(),
                        },
                        refresh_at,
                    },
                );
            }
        }

        *entries = next;
    }
}

#[async_trait]
impl ContainerService for ContainerDiscovery {
    /// Returns the cached identity for `ip`, refreshing it first when the
    /// entry is missing or past its TTL.
    async fn container_for_ip(
        &self,
        ctx: &RequestContext,
        ip: &str,
    ) -> Result<ContainerIdentity, DiscoveryError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let refresh = match entries.get(ip) {
            None => Refresh::FullSync,
            Some(entry) if now > entry.refresh_at => Refresh::Inspect(entry.identity.id.clone()),
            Some(entry) => return Ok(entry.identity.clone()),
        };

        match refresh {
            Refresh::FullSync => self.full_sync(ctx, &mut entries).await,
            Refresh::Inspect(id) => match self.runtime.inspect_container(ctx, &id).await {
                Ok(status) if status.status == RUNNING_STATE => {
                    if let Some(entry) = entries.get_mut(ip) {
                        entry.refresh_at = now + REFRESH_TTL;
                        return Ok(entry.identity.clone());
                    }
                }
                Ok(status) => {
                    debug!(
                        request_id = ctx.request_id(),
                        container = %id,
                        status = %status.status,
                        "Container no longer running, refreshing container info"
                    );
                    self.full_sync(ctx, &mut entries).await;
                }
                Err(RuntimeError::NotFound { .. }) => {
                    debug!(
                        request_id = ctx.request_id(),
                        container = %id,
                        "Container not found, refreshing container info"
                    );
                    self.full_sync(ctx, &mut entries).await;
                }
                Err(e) => {
                    warn!(
                        request_id = ctx.request_id(),
                        container = %id,
                        "Error inspecting container, refreshing container info: {}", e
                    );
                    self.full_sync(ctx, &mut entries).await;
                }
            },
        }

        entries
            .get(ip)
            .map(|entry| entry.identity.clone())
            .ok_or_else(|| DiscoveryError::NotFound(ip.to_string()))
    }

    fn platform_name(&self) -> &'static str {
        self.runtime.platform_name()
    }
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(6)]
}
