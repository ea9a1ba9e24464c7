use fc_core::{BackendFamily, ChainId, ChainRecord, DesiredChain, Policy, ProtocolFamily};
use tracing::debug;

/// Observed state of one chain identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    Present { policy: Policy },
    /// Dual-stack chain that exists in only one of the two IP backends.
    Partial {
        present: BackendFamily,
        policy: Policy,
    },
    Absent,
}

impl ChainState {
    pub fn exists(&self) -> bool {
        !matches!(self, ChainState::Absent)
    }

    pub fn policy(&self) -> Option<Policy> {
        match self {
            ChainState::Present { policy } | ChainState::Partial { policy, .. } => Some(*policy),
            ChainState::Absent => None,
        }
    }
}

/// Records from a single discovery pass. Built once, then only read; a new
/// pass builds a new snapshot.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    records: Vec<ChainRecord>,
}

/// A desired resource paired with what discovery saw for it.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub desired: DesiredChain,
    pub state: ChainState,
}

impl Snapshot {
    pub fn new(records: Vec<ChainRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ChainRecord] {
        &self.records
    }

    /// First record whose identity equals `id`.
    pub fn query(&self, id: &ChainId) -> Option<&ChainRecord> {
        self.records.iter().find(|record| record.matches(id))
    }

    /// Like [`Snapshot::query`], but a dual-stack identifier without a merged
    /// record is derived from its IPv4 and IPv6 members.
    pub fn state(&self, id: &ChainId) -> ChainState {
        let state = match self.query(id) {
            Some(record) => ChainState::Present {
                policy: record.policy,
            },
            None if id.family() == ProtocolFamily::Ip => self.derive_dual_stack(id),
            None => ChainState::Absent,
        };
        debug!(chain = %id, ?state, "query");
        state
    }

    fn derive_dual_stack(&self, id: &ChainId) -> ChainState {
        let v4 = self.query(&id.with_family(ProtocolFamily::Ipv4));
        let v6 = self.query(&id.with_family(ProtocolFamily::Ipv6));

        match (v4, v6) {
            (Some(v4), Some(v6)) => ChainState::Present {
                policy: if v4.policy == v6.policy {
                    v4.policy
                } else {
                    Policy::Inconsistent
                },
            },
            (Some(v4), None) => ChainState::Partial {
                present: BackendFamily::Ipv4,
                policy: v4.policy,
            },
            (None, Some(v6)) => ChainState::Partial {
                present: BackendFamily::Ipv6,
                policy: v6.policy,
            },
            (None, None) => ChainState::Absent,
        }
    }

    pub fn exists(&self, id: &ChainId) -> bool {
        self.state(id).exists()
    }

    pub fn policy(&self, id: &ChainId) -> Option<Policy> {
        self.state(id).policy()
    }

    /// Attach the observed state to every desired resource; unmatched ones
    /// resolve to [`ChainState::Absent`].
    pub fn prefetch(&self, resources: &[DesiredChain]) -> Vec<Resolved> {
        resources
            .iter()
            .map(|desired| Resolved {
                desired: desired.clone(),
                state: self.state(&desired.id),
            })
            .collect()
    }
}
