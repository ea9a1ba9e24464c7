use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chains the kernel creates itself. They cannot be created or deleted, and
/// only they carry a policy.
pub const BUILTIN_CHAINS: [&str; 6] = [
    "PREROUTING",
    "POSTROUTING",
    "BROUTING",
    "INPUT",
    "FORWARD",
    "OUTPUT",
];

pub fn is_builtin_chain(chain: &str) -> bool {
    BUILTIN_CHAINS.contains(&chain)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Filter,
    Nat,
    Mangle,
    Raw,
    Rawpost,
    Broute,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Filter => "filter",
            Table::Nat => "nat",
            Table::Mangle => "mangle",
            Table::Raw => "raw",
            Table::Rawpost => "rawpost",
            Table::Broute => "broute",
        }
    }

    /// Case-insensitive; the empty string is `filter`.
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "" | "FILTER" => Some(Table::Filter),
            "NAT" => Some(Table::Nat),
            "MANGLE" => Some(Table::Mangle),
            "RAW" => Some(Table::Raw),
            "RAWPOST" => Some(Table::Rawpost),
            "BROUTE" => Some(Table::Broute),
            _ => None,
        }
    }

    pub fn admits_user_chains(&self) -> bool {
        matches!(self, Table::Mangle | Table::Rawpost)
    }

    /// Built-in chains the table hosts.
    pub fn builtin_chains(&self) -> &'static [&'static str] {
        match self {
            Table::Filter => &["INPUT", "OUTPUT", "FORWARD"],
            Table::Nat => &["PREROUTING", "POSTROUTING", "OUTPUT"],
            Table::Raw => &["PREROUTING", "OUTPUT"],
            Table::Broute => &["BROUTING"],
            Table::Mangle | Table::Rawpost => &BUILTIN_CHAINS,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which backend(s) an identifier targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolFamily {
    /// IPv4 and IPv6 together.
    #[serde(rename = "IP")]
    Ip,
    #[serde(rename = "IPv4")]
    Ipv4,
    #[serde(rename = "IPv6")]
    Ipv6,
    #[serde(rename = "EB")]
    Eb,
}

impl ProtocolFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolFamily::Ip => "IP",
            ProtocolFamily::Ipv4 => "IPv4",
            ProtocolFamily::Ipv6 => "IPv6",
            ProtocolFamily::Eb => "EB",
        }
    }

    /// Concrete backends a mutation against this family touches.
    pub fn backends(&self) -> &'static [BackendFamily] {
        match self {
            ProtocolFamily::Ip => &[BackendFamily::Ipv4, BackendFamily::Ipv6],
            ProtocolFamily::Ipv4 => &[BackendFamily::Ipv4],
            ProtocolFamily::Ipv6 => &[BackendFamily::Ipv6],
            ProtocolFamily::Eb => &[BackendFamily::Eb],
        }
    }
}

impl fmt::Display for ProtocolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A packet-filtering subsystem with its own pair of tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendFamily {
    #[serde(rename = "IPv4")]
    Ipv4,
    #[serde(rename = "IPv6")]
    Ipv6,
    #[serde(rename = "EB")]
    Eb,
}

impl BackendFamily {
    /// Discovery order. IPv4 must precede IPv6 for dual-stack merging.
    pub const ALL: [BackendFamily; 3] = [
        BackendFamily::Ipv4,
        BackendFamily::Ipv6,
        BackendFamily::Eb,
    ];
}

impl From<BackendFamily> for ProtocolFamily {
    fn from(family: BackendFamily) -> Self {
        match family {
            BackendFamily::Ipv4 => ProtocolFamily::Ipv4,
            BackendFamily::Ipv6 => ProtocolFamily::Ipv6,
            BackendFamily::Eb => ProtocolFamily::Eb,
        }
    }
}

impl fmt::Display for BackendFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ProtocolFamily::from(*self).as_str())
    }
}

/// Strictness of the name grammar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grammar {
    /// Any chain name; protocol may be omitted.
    #[default]
    General,
    /// Built-in chains only; protocol must be explicit.
    BuiltIn,
}

/// Canonical `{TABLE}:{CHAIN}:{PROTOCOL}` form. The table prefix is empty
/// for `filter`.
pub fn render_name(table: &str, chain: &str, family: ProtocolFamily) -> String {
    let prefix = if table == "filter" {
        String::new()
    } else {
        table.to_ascii_uppercase()
    };
    format!("{}:{}:{}", prefix, chain, family)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainId {
    table: Table,
    chain: String,
    family: ProtocolFamily,
}

impl ChainId {
    pub fn parse(name: &str, grammar: Grammar) -> Result<Self, ValidationError> {
        let parts: Vec<&str> = name.split(':').collect();
        let [table, chain, protocol] = parts.as_slice() else {
            return Err(ValidationError::Malformed {
                name: name.to_string(),
            });
        };
        if chain.is_empty() {
            return Err(ValidationError::Malformed {
                name: name.to_string(),
            });
        }

        let table = Table::parse(table).ok_or_else(|| ValidationError::Table {
            name: name.to_string(),
            value: table.to_string(),
            expected: "FILTER, NAT, MANGLE, RAW, RAWPOST, BROUTE or empty".to_string(),
        })?;
        let family = parse_protocol(name, protocol, grammar)?;

        let id = Self {
            table,
            chain: chain.to_string(),
            family,
        };
        id.check_table_rules(name, grammar)?;
        Ok(id)
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub fn family(&self) -> ProtocolFamily {
        self.family
    }

    pub fn is_builtin(&self) -> bool {
        is_builtin_chain(&self.chain)
    }

    /// Same table and chain, scoped to one backend.
    pub fn with_family(&self, family: ProtocolFamily) -> Self {
        Self {
            table: self.table,
            chain: self.chain.clone(),
            family,
        }
    }

    fn check_table_rules(&self, name: &str, grammar: Grammar) -> Result<(), ValidationError> {
        let builtin = self.is_builtin();
        if grammar == Grammar::BuiltIn && !builtin {
            return Err(self.chain_error(
                name,
                format!("built-in chains are {}", BUILTIN_CHAINS.join(", ")),
            ));
        }

        // mangle and rawpost host user chains; the other tables only their own.
        let allowed = self.table.builtin_chains();
        let restricted = builtin || !self.table.admits_user_chains();
        if restricted && !allowed.contains(&self.chain.as_str()) {
            return Err(self.chain_error(
                name,
                format!(
                    "{} are the only chains that can be used in table '{}'",
                    allowed.join(", "),
                    self.table
                ),
            ));
        }

        match self.table {
            Table::Nat if !matches!(self.family, ProtocolFamily::Ipv4 | ProtocolFamily::Eb) => {
                Err(self.protocol_error(
                    name,
                    "table nat has no IPv6 support (nor the default IP, which means IPv4 and IPv6); \
                     use IPv4 or EB",
                ))
            }
            Table::Broute if self.family != ProtocolFamily::Eb => {
                Err(self.protocol_error(name, "table broute is only valid with protocol EB"))
            }
            _ => Ok(()),
        }
    }

    fn chain_error(&self, name: &str, reason: String) -> ValidationError {
        ValidationError::Chain {
            name: name.to_string(),
            value: self.chain.clone(),
            reason,
        }
    }

    fn protocol_error(&self, name: &str, reason: &str) -> ValidationError {
        ValidationError::Protocol {
            name: name.to_string(),
            value: self.family.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn parse_protocol(
    name: &str,
    value: &str,
    grammar: Grammar,
) -> Result<ProtocolFamily, ValidationError> {
    let family = match (grammar, value) {
        (Grammar::General, "" | "IP") | (Grammar::BuiltIn, "IP") => Some(ProtocolFamily::Ip),
        (_, "IPv4") => Some(ProtocolFamily::Ipv4),
        (_, "IPv6") => Some(ProtocolFamily::Ipv6),
        (Grammar::General, "ethernet" | "EB") | (Grammar::BuiltIn, "EB") => {
            Some(ProtocolFamily::Eb)
        }
        _ => None,
    };

    family.ok_or_else(|| ValidationError::Protocol {
        name: name.to_string(),
        value: value.to_string(),
        reason: match grammar {
            Grammar::General => {
                "expected empty or IP (both IPv4 and IPv6), IPv4, IPv6 or ethernet".to_string()
            }
            Grammar::BuiltIn => "expected one of IP, IPv4, IPv6, EB".to_string(),
        },
    })
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_name(self.table.as_str(), &self.chain, self.family))
    }
}

impl FromStr for ChainId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, Grammar::General)
    }
}
