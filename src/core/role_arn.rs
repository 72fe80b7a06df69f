use crate::core::error::ArnError;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const ROLE_ARN_PATTERN: &str = r"^arn:aws:iam::(\d+):role/([^:]+/)?([^:]+?)$";

fn role_arn_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ROLE_ARN_PATTERN).expect("role ARN pattern must compile"))
}

/// Parsed sections of an IAM role ARN.
///
/// The default value is the "empty" ARN used when no default alias is
/// configured; it carries a zero-length value and an empty friendly name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RoleArn {
    value: String,
    path: String,
    name: String,
    account_id: String,
}

impl RoleArn {
    pub(crate) fn parse(value: &str) -> Result<Self, ArnError> {
        let caps = role_arn_regex()
            .captures(value)
            .ok_or_else(|| ArnError::Invalid(value.to_string()))?;

        Ok(Self {
            value: value.to_string(),
            path: format!("/{}", caps.get(2).map_or("", |m| m.as_str())),
            name: caps[3].to_string(),
            account_id: caps[1].to_string(),
        })
    }

    /// The "friendly" name, the final path segment of the ARN.
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// The resource path, always bracketed by `/`.
    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn account_id(&self) -> &str {
        &self.account_id
    }

    /// True if the struct is uninitialized.
    pub(crate) fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl fmt::Display for RoleArn {
    /// Writes the original, unparsed ARN.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
