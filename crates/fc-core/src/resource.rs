use crate::chain::{ChainId, Grammar, Table};
use crate::error::ValidationError;
use crate::policy::{Ensure, Policy, RESOURCE_POLICIES};

/// A requested chain: identity plus desired existence and policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredChain {
    pub id: ChainId,
    pub grammar: Grammar,
    pub ensure: Ensure,
    pub policy: Option<Policy>,
}

impl DesiredChain {
    /// Parse `name` and apply the cross-field resource rules.
    ///
    /// Built-in grammar resources without a policy default to `return`.
    pub fn new(
        name: &str,
        grammar: Grammar,
        ensure: Ensure,
        policy: Option<Policy>,
    ) -> Result<Self, ValidationError> {
        let id = ChainId::parse(name, grammar)?;
        let policy = match (grammar, policy) {
            (Grammar::BuiltIn, None) => Some(Policy::Return),
            (_, policy) => policy,
        };

        let resource = Self {
            id,
            grammar,
            ensure,
            policy,
        };
        resource.validate(name)?;
        Ok(resource)
    }

    fn validate(&self, name: &str) -> Result<(), ValidationError> {
        let fail = |field, reason: &str| ValidationError::Resource {
            name: name.to_string(),
            field,
            reason: reason.to_string(),
        };

        if self.policy == Some(Policy::Inconsistent) {
            return Err(ValidationError::policy(
                Policy::Inconsistent,
                RESOURCE_POLICIES,
            ));
        }

        if self.id.table() == Table::Nat && self.policy == Some(Policy::Drop) {
            return Err(fail(
                "policy",
                "the nat table is not intended for filtering, the use of drop is therefore inhibited",
            ));
        }

        if self.grammar == Grammar::General {
            if self.id.is_builtin() {
                if self.ensure == Ensure::Absent {
                    return Err(fail("ensure", "cannot remove built-in chains"));
                }
            } else if self.policy.is_some_and(|p| p != Policy::Empty) {
                return Err(fail("policy", "policy can only be set on built-in chains"));
            }
        }

        Ok(())
    }

    /// Policy the run should converge to, if any.
    pub fn target_policy(&self) -> Option<Policy> {
        self.policy.filter(|p| *p != Policy::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_is_rejected_on_nat() {
        let err = DesiredChain::new(
            "NAT:PREROUTING:IPv4",
            Grammar::General,
            Ensure::Present,
            Some(Policy::Drop),
        )
        .unwrap_err();
        assert_eq!(err.field(), "policy");

        let err = DesiredChain::new(
            "NAT:OUTPUT:EB",
            Grammar::BuiltIn,
            Ensure::Present,
            Some(Policy::Drop),
        )
        .unwrap_err();
        assert_eq!(err.field(), "policy");

        assert!(
            DesiredChain::new(
                "NAT:PREROUTING:IPv4",
                Grammar::General,
                Ensure::Present,
                Some(Policy::Accept),
            )
            .is_ok()
        );
    }

    #[test]
    fn builtin_chains_cannot_be_removed() {
        let err = DesiredChain::new(":INPUT:IP", Grammar::General, Ensure::Absent, None)
            .unwrap_err();
        assert_eq!(err.field(), "ensure");
        assert!(err.to_string().contains("built-in"));
    }

    #[test]
    fn policy_requires_builtin_chain() {
        let err = DesiredChain::new(
            "MANGLE:mychain:IPv4",
            Grammar::General,
            Ensure::Present,
            Some(Policy::Accept),
        )
        .unwrap_err();
        assert_eq!(err.field(), "policy");

        let ok = DesiredChain::new(
            "MANGLE:mychain:IPv4",
            Grammar::General,
            Ensure::Absent,
            Some(Policy::Empty),
        )
        .unwrap();
        assert_eq!(ok.target_policy(), None);
    }

    #[test]
    fn inconsistent_is_not_a_desired_policy() {
        let err = DesiredChain::new(
            ":INPUT:IP",
            Grammar::General,
            Ensure::Present,
            Some(Policy::Inconsistent),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::policy("inconsistent", RESOURCE_POLICIES));
    }

    #[test]
    fn builtin_grammar_defaults_to_return() {
        let chain = DesiredChain::new(":FORWARD:IPv6", Grammar::BuiltIn, Ensure::Present, None)
            .unwrap();
        assert_eq!(chain.policy, Some(Policy::Return));

        let chain = DesiredChain::new(":FORWARD:IPv6", Grammar::General, Ensure::Present, None)
            .unwrap();
        assert_eq!(chain.policy, None);
    }
}
