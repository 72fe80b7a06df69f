//! Minimal Docker Engine API client speaking HTTP/1.1 over the daemon's
//! unix socket or a `tcp://` endpoint.

use crate::adapters::docker::models::{ContainerInspectJson, ContainerSummaryJson};
use crate::core::error::{ConfigError, RuntimeError};
use crate::core::types::{ContainerStatus, ContainerSummary, RequestContext};
use crate::ports::ContainerRuntime;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::TokioIo;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, UnixStream};
use tracing::debug;

const DEFAULT_SOCKET_PATH: &str = "/var/run/docker.sock";

#[derive(Debug, Clone, PartialEq, Eq)]
enum DockerEndpoint {
    Unix(PathBuf),
    Tcp(String),
}

/// Docker-specific `ContainerRuntime` implementation. A fresh connection is
/// made per call; the two endpoints this proxy uses are low-volume and the
/// daemon sits on the same host.
#[derive(Debug)]
pub(crate) struct DockerClient {
    endpoint: DockerEndpoint,
}

impl DockerClient {
    /// Builds a client from a `DOCKER_HOST`-style string: `unix://<path>`,
    /// `tcp://<host>:<port>`, or empty for the default socket.
    pub(crate) fn new(docker_host: &str) -> Result<Self, ConfigError> {
        let endpoint = if docker_host.is_empty() {
            DockerEndpoint::Unix(PathBuf::from(DEFAULT_SOCKET_PATH))
        } else if let Some(path) = docker_host.strip_prefix("unix://") {
            DockerEndpoint::Unix(PathBuf::from(path))
        } else if let Some(addr) = docker_host.strip_prefix("tcp://") {
            DockerEndpoint::Tcp(addr.to_string())
        } else {
            return Err(ConfigError::Validation(format!(
                "dockerHost [{docker_host}] must be empty, unix://<path>, or tcp://<host>:<port>"
            )));
        };
        Ok(Self { endpoint })
    }

    async fn get(
        &self,
        ctx: &RequestContext,
        path: &str,
    ) -> Result<(StatusCode, Bytes), RuntimeError> {
        debug!(
            request_id = ctx.request_id(),
            path = %path,
            "Querying container runtime"
        );
        match &self.endpoint {
            DockerEndpoint::Unix(socket) => {
                let stream = UnixStream::connect(socket)
                    .await
                    .map_err(|e| RuntimeError::Transport(Box::new(e)))?;
                round_trip(stream, path).await
            }
            DockerEndpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr)
                    .await
                    .map_err(|e| RuntimeError::Transport(Box::new(e)))?;
                round_trip(stream, path).await
            }
        }
    }
}

async fn round_trip<S>(stream: S, path: &str) -> Result<(StatusCode, Bytes), RuntimeError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(stream);
    let (mut sender, connection) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| RuntimeError::Transport(Box::new(e)))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!("Container runtime connection closed: {}", e);
        }
    });

    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("http://localhost{path}"))
        .header("Host", "localhost")
        .body(Empty::<Bytes>::new())
        .map_err(|e| RuntimeError::Transport(Box::new(e)))?;

    let response = sender
        .send_request(request)
        .await
        .map_err(|e| RuntimeError::Transport(Box::new(e)))?;

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| RuntimeError::Transport(Box::new(e)))?
        .to_bytes();

    Ok((status, body))
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn list_containers(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let (status, body) = self.get(ctx, "/containers/json").await?;
        if !status.is_success() {
            return Err(RuntimeError::Api {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }
        let rows: Vec<ContainerSummaryJson> = serde_json::from_slice(&body)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn inspect_container(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<ContainerStatus, RuntimeError> {
        let (status, body) = self.get(ctx, &format!("/containers/{id}/json")).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(RuntimeError::NotFound { id: id.to_string() });
        }
        if !status.is_success() {
            return Err(RuntimeError::Api {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }
        let inspect: ContainerInspectJson = serde_json::from_slice(&body)?;
        Ok(inspect.into())
    }

    fn platform_name(&self) -> &'static str {
        "docker"
    }
}
