use crate::chain::{ChainId, ProtocolFamily, render_name};
use crate::policy::Policy;
use serde::Serialize;
use std::fmt;

/// One chain as reported by a backend dump, or a synthesized dual-stack
/// record when `family` is [`ProtocolFamily::Ip`].
///
/// `table` is kept as the raw lower-case name from the dump so tables outside
/// the managed set (`security`, ...) still show up in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainRecord {
    pub table: String,
    pub chain: String,
    pub family: ProtocolFamily,
    pub policy: Policy,
}

impl ChainRecord {
    pub fn name(&self) -> String {
        render_name(&self.table, &self.chain, self.family)
    }

    /// Identity comparison; equivalent to comparing canonical names.
    pub fn matches(&self, id: &ChainId) -> bool {
        self.family == id.family() && self.table == id.table().as_str() && self.chain == id.chain()
    }
}

impl fmt::Display for ChainRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.policy)
    }
}
