use crate::backend::BackendRegistry;
use crate::error::{BackendError, ReconcileError};
use fc_core::{BACKEND_POLICIES, ChainId, Policy, ValidationError};
use tracing::{debug, info};

/// Issues chain mutations against every backend an identifier resolves to.
///
/// A failure on one backend does not undo a mutation already applied to a
/// sibling backend of the same identifier.
pub struct Reconciler<'a> {
    registry: &'a BackendRegistry,
}

impl<'a> Reconciler<'a> {
    pub fn new(registry: &'a BackendRegistry) -> Self {
        Self { registry }
    }

    /// `-t <table> -N <chain>`. Built-in chains cannot be created.
    pub fn create(&self, id: &ChainId) -> Result<(), BackendError> {
        if id.is_builtin() {
            debug!(chain = %id, "built-in chain, nothing to create");
            return Ok(());
        }
        info!(chain = %id, "creating chain");
        self.mutate_all(id, &["-N", id.chain()])
    }

    /// `-t <table> -X <chain>`. Built-in chains cannot be deleted.
    pub fn destroy(&self, id: &ChainId) -> Result<(), BackendError> {
        if id.is_builtin() {
            debug!(chain = %id, "built-in chain, nothing to delete");
            return Ok(());
        }
        info!(chain = %id, "deleting chain");
        self.mutate_all(id, &["-X", id.chain()])
    }

    /// `-t <table> -P <chain> <POLICY>`.
    pub fn set_policy(&self, id: &ChainId, policy: Policy) -> Result<(), ReconcileError> {
        let value = policy
            .backend_arg()
            .ok_or_else(|| ValidationError::policy(policy, BACKEND_POLICIES))?;
        info!(chain = %id, %policy, "setting policy");
        self.mutate_all(id, &["-P", id.chain(), value])?;
        Ok(())
    }

    fn mutate_all(&self, id: &ChainId, op: &[&str]) -> Result<(), BackendError> {
        let table = id.table().as_str();
        let mut args = vec!["-t", table];
        args.extend_from_slice(op);

        for &family in id.family().backends() {
            debug!(%family, ?args, "mutate");
            self.registry.resolve(family).mutate(&args)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeRegistry;
    use fc_core::{BackendFamily, Grammar};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn dual_stack_policy_hits_both_ip_backends() {
        let fake = FakeRegistry::new("", "", "");
        let id = ChainId::parse("FILTER:INPUT:IP", Grammar::BuiltIn).unwrap();
        Reconciler::new(&fake.registry)
            .set_policy(&id, "accept".parse().unwrap())
            .unwrap();

        let expected = args(&["-t", "filter", "-P", "INPUT", "ACCEPT"]);
        assert_eq!(
            fake.calls(),
            vec![
                (BackendFamily::Ipv4, expected.clone()),
                (BackendFamily::Ipv6, expected),
            ]
        );
    }

    #[test]
    fn user_chain_create_targets_named_family() {
        let fake = FakeRegistry::new("", "", "");
        let id: ChainId = "MANGLE:mychain:IPv4".parse().unwrap();
        Reconciler::new(&fake.registry).create(&id).unwrap();

        assert_eq!(
            fake.calls(),
            vec![(BackendFamily::Ipv4, args(&["-t", "mangle", "-N", "mychain"]))]
        );
    }

    #[test]
    fn eb_destroy_targets_ebtables_only() {
        let fake = FakeRegistry::new("", "", "");
        let id: ChainId = "MANGLE:bridgechain:ethernet".parse().unwrap();
        Reconciler::new(&fake.registry).destroy(&id).unwrap();

        assert_eq!(
            fake.calls(),
            vec![(BackendFamily::Eb, args(&["-t", "mangle", "-X", "bridgechain"]))]
        );
    }

    #[test]
    fn builtin_chains_are_never_created_or_destroyed() {
        let fake = FakeRegistry::new("", "", "");
        let reconciler = Reconciler::new(&fake.registry);

        for name in [
            "FILTER:INPUT:IP",
            ":FORWARD:IPv6",
            "NAT:POSTROUTING:IPv4",
            "MANGLE:PREROUTING:IP",
            "BROUTE:BROUTING:EB",
            "RAW:OUTPUT:EB",
        ] {
            let id = ChainId::parse(name, Grammar::BuiltIn).unwrap();
            reconciler.create(&id).unwrap();
            reconciler.destroy(&id).unwrap();
        }
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn state_only_policies_are_rejected_before_invocation() {
        let fake = FakeRegistry::new("", "", "");
        let id: ChainId = ":INPUT:IP".parse().unwrap();
        let err = Reconciler::new(&fake.registry)
            .set_policy(&id, Policy::Inconsistent)
            .unwrap_err();

        match err {
            ReconcileError::Validation(err) => {
                assert_eq!(err, ValidationError::policy("inconsistent", BACKEND_POLICIES));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn partial_failure_is_not_rolled_back() {
        let fake = FakeRegistry::failing(BackendFamily::Ipv6);
        let id: ChainId = "MANGLE:mychain:IP".parse().unwrap();
        let err = Reconciler::new(&fake.registry).create(&id).unwrap_err();

        assert!(err.to_string().contains("Chain already exists"));
        let calls = fake.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, BackendFamily::Ipv4);
        assert_eq!(calls[1].0, BackendFamily::Ipv6);
    }
}
