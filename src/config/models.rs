use crate::core::error::ConfigError;
use crate::core::role_arn::RoleArn;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// The JSON config file selected via the `-c` flag.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ProxyConfig {
    /// Maps human-friendly names to IAM role ARNs.
    #[serde(rename = "aliasToARN")]
    pub alias_to_arn: HashMap<String, String>,
    /// An `aliasToARN` key selecting the role for containers whose labels do
    /// not specify one. Empty disables the fallback.
    pub default_alias: String,
    /// Restricts the effective role's permissions to the intersection of the
    /// role's policy and this JSON policy.
    pub default_policy: String,
    /// A `DOCKER_HOST`-style endpoint string.
    pub docker_host: String,
    /// TCP network address to serve on.
    #[serde(rename = "listen")]
    pub listen_addr: String,
}

impl ProxyConfig {
    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ProxyConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.is_empty() {
            return Err(ConfigError::Validation(
                "config must select a server address ('listen', ex. ':18000')".to_string(),
            ));
        }
        if self.alias_to_arn.is_empty() {
            return Err(ConfigError::Validation(
                "config must include at least one 'aliasToARN' mapping".to_string(),
            ));
        }
        if !self.default_alias.is_empty() {
            self.default_role()?;
        }

        if let Some(socket) = self.docker_host.strip_prefix("unix://") {
            validate_socket(Path::new(socket))?;
        }
        Ok(())
    }

    /// Resolves `defaultAlias` through the alias table; the empty ARN when no
    /// default alias is configured.
    pub(crate) fn default_role(&self) -> Result<RoleArn, ConfigError> {
        if self.default_alias.is_empty() {
            return Ok(RoleArn::default());
        }
        let arn = self.alias_to_arn.get(&self.default_alias).ok_or_else(|| {
            ConfigError::Validation(format!(
                "default alias [{}] is not mapped in 'aliasToARN'",
                self.default_alias
            ))
        })?;
        RoleArn::parse(arn).map_err(|e| {
            ConfigError::Validation(format!(
                "default alias [{}]: {}",
                self.default_alias, e
            ))
        })
    }
}

#[cfg(unix)]
fn validate_socket(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::FileTypeExt;

    let metadata = std::fs::metadata(path).map_err(|source| ConfigError::SocketStat {
        path: path.to_path_buf(),
        source,
    })?;
    if !metadata.file_type().is_socket() {
        return Err(ConfigError::NotASocket(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn validate_socket(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}
