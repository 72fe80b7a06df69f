//! Serde models for the slice of the Docker Engine API this proxy consumes.

use crate::core::types::{ContainerStatus, ContainerSummary};
use serde::Deserialize;
use std::collections::HashMap;

/// One row of `GET /containers/json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ContainerSummaryJson {
    pub id: String,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub network_settings: Option<NetworkSettingsJson>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct NetworkSettingsJson {
    #[serde(default)]
    pub networks: HashMap<String, NetworkJson>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NetworkJson {
    #[serde(default, rename = "IPAddress")]
    pub ip_address: String,
}

/// The relevant part of `GET /containers/{id}/json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ContainerInspectJson {
    #[serde(default)]
    pub state: ContainerStateJson,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ContainerStateJson {
    #[serde(default)]
    pub status: String,
}

impl From<ContainerSummaryJson> for ContainerSummary {
    fn from(json: ContainerSummaryJson) -> Self {
        ContainerSummary {
            id: json.id,
            names: json.names,
            image: json.image,
            state: json.state,
            labels: json.labels,
            network_ips: json
                .network_settings
                .map(|settings| {
                    settings
                        .networks
                        .into_iter()
                        .map(|(name, network)| (name, network.ip_address))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

impl From<ContainerInspectJson> for ContainerStatus {
    fn from(json: ContainerInspectJson) -> Self {
        ContainerStatus {
            status: json.state.status,
        }
    }
}
