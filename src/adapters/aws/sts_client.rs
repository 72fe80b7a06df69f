use crate::core::error::AssumeRoleError;
use crate::core::role_arn::RoleArn;
use crate::core::types::{RequestContext, SessionCredentials};
use crate::ports::AssumeRoleClient;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use chrono::{DateTime, Utc};
use tracing::{debug, error};

/// Maximum session length accepted for role chaining; 1 hour.
const SESSION_DURATION_SECONDS: i32 = 3600;

/// `AssumeRoleClient` backed by the AWS SDK STS client, configured from the
/// default provider chain (instance profile, environment, shared config).
pub(crate) struct StsAssumeRoleClient {
    client: aws_sdk_sts::Client,
}

impl StsAssumeRoleClient {
    pub(crate) async fn from_env() -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self {
            client: aws_sdk_sts::Client::new(&sdk_config),
        }
    }

    pub(crate) fn from_client(client: aws_sdk_sts::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssumeRoleClient for StsAssumeRoleClient {
    async fn assume_role(
        &self,
        ctx: &RequestContext,
        role: &RoleArn,
        policy: Option<&str>,
        session_name: &str,
    ) -> Result<SessionCredentials, AssumeRoleError> {
        debug!(
            request_id = ctx.request_id(),
            role = %role,
            session_name = %session_name,
            "Assuming role"
        );

        let result = self
            .client
            .assume_role()
            .role_arn(role.to_string())
            .role_session_name(session_name)
            .duration_seconds(SESSION_DURATION_SECONDS)
            .set_policy(policy.map(str::to_string))
            .send()
            .await;

        match result {
            Ok(output) => {
                let creds =
                    output
                        .credentials
                        .ok_or_else(|| AssumeRoleError::MissingCredentials {
                            role_arn: role.to_string(),
                        })?;
                Ok(SessionCredentials {
                    access_key: creds.access_key_id,
                    secret_key: creds.secret_access_key,
                    token: creds.session_token,
                    expiration: DateTime::from_timestamp(
                        creds.expiration.secs(),
                        creds.expiration.subsec_nanos(),
                    )
                    .unwrap_or_else(Utc::now),
                    generated_at: Utc::now(),
                    role: role.clone(),
                })
            }
            Err(e) => {
                let service_error = e.into_service_error();
                error!(
                    request_id = ctx.request_id(),
                    role = %role,
                    "AssumeRole failed: {}", service_error
                );
                Err(AssumeRoleError::Call {
                    role_arn: role.to_string(),
                    source: Box::new(service_error),
                })
            }
        }
    }
}
