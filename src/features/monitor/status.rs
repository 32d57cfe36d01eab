use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Running,
    Slow,
    Down,
    Inactive,
}

impl ConnectionStatus {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionStatus::Running => "RUNNING",
            ConnectionStatus::Slow => "SLOW",
            ConnectionStatus::Down => "DOWN",
            ConnectionStatus::Inactive => "INACTIVE",
        }
    }

    pub fn is_reachable(self) -> bool {
        matches!(self, ConnectionStatus::Running | ConnectionStatus::Slow)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
#[error("unknown connection status `{0}`")]
pub struct ParseStatusError(pub String);

impl FromStr for ConnectionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RUNNING" => Ok(ConnectionStatus::Running),
            "SLOW" => Ok(ConnectionStatus::Slow),
            "DOWN" => Ok(ConnectionStatus::Down),
            "INACTIVE" => Ok(ConnectionStatus::Inactive),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}
