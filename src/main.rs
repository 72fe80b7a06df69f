#![allow(dead_code)]

mod adapters;
mod config;
mod core;
mod ports;

use crate::adapters::aws::sts_client::StsAssumeRoleClient;
use crate::adapters::docker::client::DockerClient;
use crate::adapters::server::http_listener::{build_router, run_http_listener};
use crate::adapters::server::request_id::RequestIdSource;
use crate::adapters::upstream::http_transport::HttpUpstreamTransport;
use crate::config::models::ProxyConfig;
use crate::core::credentials::CredentialsProvider;
use crate::core::discovery::ContainerDiscovery;
use crate::core::metadata_request_processor::{MetadataRequestProcessor, DEFAULT_METADATA_URL};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct CliArgs {
    #[clap(short = 'c', value_name = "FILE", help = "Path to JSON config file")]
    config: PathBuf,

    #[clap(short = 'v', long, action, help = "Print verbose console messages")]
    verbose: bool,
}

fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logger(args.verbose);

    let config = ProxyConfig::load(&args.config)
        .with_context(|| format!("Error loading configuration from {:?}", args.config))?;
    let default_role = config
        .default_role()
        .context("Error resolving the default role alias")?;

    let docker = Arc::new(
        DockerClient::new(&config.docker_host).context("Error creating the docker client")?,
    );
    let discovery = Arc::new(ContainerDiscovery::new(
        docker,
        config.alias_to_arn.clone(),
    ));
    let sts = Arc::new(StsAssumeRoleClient::from_env().await);
    let credentials = Arc::new(CredentialsProvider::new(
        discovery,
        sts,
        default_role,
        config.default_policy.clone(),
    ));
    let upstream = Arc::new(
        HttpUpstreamTransport::new().context("Error creating the upstream HTTP transport")?,
    );
    let processor = Arc::new(MetadataRequestProcessor::new(
        upstream,
        credentials,
        DEFAULT_METADATA_URL.to_string(),
    ));
    let router = build_router(processor, Arc::new(RequestIdSource::new()));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    return;
                }
            };
            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("Ctrl+C received. Initiating shutdown...");
                }
                _ = sigterm.recv() => {
                    info!("SIGTERM received. Initiating shutdown...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = signal::ctrl_c().await;
            info!("Ctrl+C received. Initiating shutdown...");
        }

        signal_token.cancel();
    });

    run_http_listener(&config.listen_addr, router, shutdown)
        .await
        .with_context(|| format!("Error listening on address [{}]", config.listen_addr))?;

    info!("Metadata proxy shut down.");
    Ok(())
}
