use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default action of a chain once its rule list is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    Accept,
    Drop,
    Queue,
    Return,
    /// The backend reports no policy (user-defined chains).
    Empty,
    /// IPv4 and IPv6 members of a dual-stack chain disagree.
    Inconsistent,
}

/// Values a resource may request.
pub const RESOURCE_POLICIES: &str = "accept, drop, queue, return, empty";
/// Values a backend accepts for `-P`.
pub const BACKEND_POLICIES: &str = "accept, drop, queue, return";

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Accept => "accept",
            Policy::Drop => "drop",
            Policy::Queue => "queue",
            Policy::Return => "return",
            Policy::Empty => "empty",
            Policy::Inconsistent => "inconsistent",
        }
    }

    /// Interpret the policy column of a `*-save` chain line. `-` means no policy.
    pub fn from_dump_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "-" => Some(Policy::Empty),
            "accept" => Some(Policy::Accept),
            "drop" => Some(Policy::Drop),
            "queue" => Some(Policy::Queue),
            "return" => Some(Policy::Return),
            _ => None,
        }
    }

    /// Upper-case argument for `-P <chain> <POLICY>`; `None` for the
    /// state-only values.
    pub fn backend_arg(&self) -> Option<&'static str> {
        match self {
            Policy::Accept => Some("ACCEPT"),
            Policy::Drop => Some("DROP"),
            Policy::Queue => Some("QUEUE"),
            Policy::Return => Some("RETURN"),
            Policy::Empty | Policy::Inconsistent => None,
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accept" => Ok(Policy::Accept),
            "drop" => Ok(Policy::Drop),
            "queue" => Ok(Policy::Queue),
            "return" => Ok(Policy::Return),
            "empty" => Ok(Policy::Empty),
            _ => Err(ValidationError::policy(s, RESOURCE_POLICIES)),
        }
    }
}

/// Desired existence of a chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ensure::Present => f.write_str("present"),
            Ensure::Absent => f.write_str("absent"),
        }
    }
}
