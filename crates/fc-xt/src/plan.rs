use crate::error::ReconcileError;
use crate::reconciler::Reconciler;
use crate::snapshot::{ChainState, Resolved};
use fc_core::{BackendFamily, ChainId, Ensure, Policy, ProtocolFamily};
use serde::Serialize;
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CreateChain {
        #[serde(serialize_with = "as_name")]
        id: ChainId,
    },
    DestroyChain {
        #[serde(serialize_with = "as_name")]
        id: ChainId,
    },
    SetPolicy {
        #[serde(serialize_with = "as_name")]
        id: ChainId,
        policy: Policy,
    },
}

fn as_name<S: serde::Serializer>(id: &ChainId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::CreateChain { id } => write!(f, "Create chain {}", id),
            Action::DestroyChain { id } => write!(f, "Delete chain {}", id),
            Action::SetPolicy { id, policy } => write!(f, "Set policy of {} to {}", id, policy),
        }
    }
}

/// Ordered actions that converge the live chains to the desired ones.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Plan {
    pub actions: Vec<Action>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_resolved(resolved: &[Resolved]) -> Self {
        let mut plan = Plan::new();
        for entry in resolved {
            plan.add_resource(entry);
        }
        plan
    }

    fn add_resource(&mut self, entry: &Resolved) {
        let desired = &entry.desired;
        let id = &desired.id;
        let builtin = id.is_builtin();

        match (desired.ensure, entry.state) {
            (Ensure::Present, ChainState::Absent) if !builtin => {
                self.actions.push(Action::CreateChain { id: id.clone() });
            }
            (Ensure::Present, ChainState::Partial { present, .. }) if !builtin => {
                let missing = match present {
                    BackendFamily::Ipv4 => ProtocolFamily::Ipv6,
                    _ => ProtocolFamily::Ipv4,
                };
                self.actions.push(Action::CreateChain {
                    id: id.with_family(missing),
                });
            }
            (Ensure::Absent, ChainState::Present { .. }) if !builtin => {
                self.actions.push(Action::DestroyChain { id: id.clone() });
            }
            (Ensure::Absent, ChainState::Partial { present, .. }) if !builtin => {
                self.actions.push(Action::DestroyChain {
                    id: id.with_family(present.into()),
                });
            }
            _ => {}
        }

        if desired.ensure == Ensure::Present {
            if let Some(policy) = desired.target_policy() {
                if entry.state.policy() != Some(policy) {
                    self.actions.push(Action::SetPolicy {
                        id: id.clone(),
                        policy,
                    });
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn display(&self) {
        if self.actions.is_empty() {
            println!("Nothing to do, chains are in sync");
            return;
        }
        println!("Plan ({} actions):", self.actions.len());
        for (i, action) in self.actions.iter().enumerate() {
            println!("  {}. {}", i + 1, action);
        }
    }
}

/// Applies a plan through the reconciler, or only logs it in dry-run mode.
pub struct Executor<'a> {
    reconciler: Reconciler<'a>,
    dry_run: bool,
}

impl<'a> Executor<'a> {
    pub fn new(reconciler: Reconciler<'a>, dry_run: bool) -> Self {
        Self {
            reconciler,
            dry_run,
        }
    }

    pub fn execute_action(&self, action: &Action) -> Result<(), ReconcileError> {
        if self.dry_run {
            info!("[DRY RUN] Would execute: {}", action);
            return Ok(());
        }

        info!("Executing: {}", action);
        match action {
            Action::CreateChain { id } => self.reconciler.create(id)?,
            Action::DestroyChain { id } => self.reconciler.destroy(id)?,
            Action::SetPolicy { id, policy } => self.reconciler.set_policy(id, *policy)?,
        }
        Ok(())
    }

    /// Stops at the first failure; earlier actions stay applied.
    pub fn execute(&self, plan: &Plan) -> Result<usize, ReconcileError> {
        for action in &plan.actions {
            self.execute_action(action)?;
        }
        Ok(plan.actions.len())
    }
}
