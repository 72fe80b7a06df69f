use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse configuration JSON from {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Configuration validation failed: {0}")]
    Validation(String),
    #[error("Error during stat of DOCKER_HOST socket {path}: {source}")]
    SocketStat {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("DOCKER_HOST [{0}] is not a socket")]
    NotASocket(PathBuf),
}

#[derive(Error, Debug)]
pub(crate) enum ArnError {
    #[error("invalid role ARN [{0}]")]
    Invalid(String),
}

/// Errors surfaced by a container runtime client. `NotFound` stays
/// distinguishable so discovery can tell a vanished container apart from a
/// daemon failure.
#[derive(Error, Debug)]
pub(crate) enum RuntimeError {
    #[error("container [{id}] not found")]
    NotFound { id: String },
    #[error("container runtime API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("container runtime transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to decode container runtime response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub(crate) enum DiscoveryError {
    #[error("No container found for IP [{0}]")]
    NotFound(String),
}

#[derive(Error, Debug)]
pub(crate) enum AssumeRoleError {
    #[error("AssumeRole call failed for role [{role_arn}]: {source}")]
    Call {
        role_arn: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("AssumeRole response for role [{role_arn}] contained no credentials")]
    MissingCredentials { role_arn: String },
}

#[derive(Error, Debug)]
pub(crate) enum CredentialsError {
    #[error("Error finding container with IP [{ip}]: {source}")]
    ContainerLookup { ip: String, source: DiscoveryError },
    #[error("Error assuming role [{role_arn}] for container [{container_name}]: {source}")]
    AssumeRole {
        role_arn: String,
        container_name: String,
        source: AssumeRoleError,
    },
}

#[derive(Error, Debug)]
pub(crate) enum UpstreamError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid response from upstream: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Network(format!("HTTP request timeout: {}", err))
        } else if err.is_connect() {
            UpstreamError::Network(format!("HTTP connection error: {}", err))
        } else {
            UpstreamError::Network(format!("HTTP client error: {}", err))
        }
    }
}
