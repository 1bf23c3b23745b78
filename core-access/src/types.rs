use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Privilege resolution state.
///
/// Moves only forward: `Unknown -> Pending -> Granted | Denied`. The two
/// resolved states are terminal for the lifetime of the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    Unknown,
    Pending,
    Granted,
    Denied,
}

impl AccessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessState::Unknown => "unknown",
            AccessState::Pending => "pending",
            AccessState::Granted => "granted",
            AccessState::Denied => "denied",
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, AccessState::Granted | AccessState::Denied)
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, AccessState::Granted)
    }
}

impl fmt::Display for AccessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(AccessState::Unknown),
            "pending" => Ok(AccessState::Pending),
            "granted" => Ok(AccessState::Granted),
            "denied" => Ok(AccessState::Denied),
            other => Err(format!("Invalid access state: {}", other)),
        }
    }
}
