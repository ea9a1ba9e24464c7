use thiserror::Error;

/// Raised while parsing or validating a chain resource, before any backend runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "invalid chain name '{name}': expected {{TABLE}}:{{CHAIN}}:{{PROTOCOL}} where TABLE is one of \
         FILTER, NAT, MANGLE, RAW, RAWPOST, BROUTE or empty (alias for FILTER)"
    )]
    Malformed { name: String },

    #[error("invalid table '{value}' in '{name}': expected one of {expected}")]
    Table {
        name: String,
        value: String,
        expected: String,
    },

    #[error("invalid chain '{value}' in '{name}': {reason}")]
    Chain {
        name: String,
        value: String,
        reason: String,
    },

    #[error("invalid protocol '{value}' in '{name}': {reason}")]
    Protocol {
        name: String,
        value: String,
        reason: String,
    },

    #[error("invalid policy '{value}': expected one of {expected}")]
    Policy { value: String, expected: String },

    #[error("invalid {field} for '{name}': {reason}")]
    Resource {
        name: String,
        field: &'static str,
        reason: String,
    },
}

impl ValidationError {
    /// `expected` is one of the lists in [`crate::policy`].
    pub fn policy(value: impl ToString, expected: &str) -> Self {
        Self::Policy {
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Name of the field that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "name",
            Self::Table { .. } => "table",
            Self::Chain { .. } => "chain",
            Self::Protocol { .. } => "protocol",
            Self::Policy { .. } => "policy",
            Self::Resource { field, .. } => *field,
        }
    }
}
