use crate::config::{DEFAULT_PROBE_PORT, Target};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum TargetParseError {
    #[error("target is empty")]
    Empty,
    #[error("invalid target `{input}`")]
    Invalid { input: String },
    #[error("invalid webhook url `{input}`: only http and https are supported")]
    UnsupportedScheme { input: String },
}

/// Parses `host` or `host:port`; bare hosts get the DNS port.
pub fn parse_target(input: &str) -> Result<Target, TargetParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TargetParseError::Empty);
    }

    let invalid = || TargetParseError::Invalid {
        input: trimmed.to_string(),
    };
    if trimmed.contains("://") {
        return Err(invalid());
    }

    let url = Url::parse(&format!("tcp://{trimmed}")).map_err(|_| invalid())?;
    if url.path() != "" && url.path() != "/" {
        return Err(invalid());
    }
    let host = url.host_str().ok_or_else(invalid)?;
    Ok(Target::new(host, url.port().unwrap_or(DEFAULT_PROBE_PORT)))
}

pub fn parse_webhook_url(input: &str) -> Result<Url, TargetParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TargetParseError::Empty);
    }
    let url = Url::parse(trimmed).map_err(|_| TargetParseError::Invalid {
        input: trimmed.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(TargetParseError::UnsupportedScheme {
            input: trimmed.to_string(),
        }),
    }
}
