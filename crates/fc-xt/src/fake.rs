use crate::backend::{Backend, BackendRegistry};
use crate::error::BackendError;
use fc_core::BackendFamily;
use std::cell::RefCell;
use std::rc::Rc;

pub type CallLog = Rc<RefCell<Vec<(BackendFamily, Vec<String>)>>>;

/// Serves a canned dump and records every mutate call.
pub struct FakeBackend {
    family: BackendFamily,
    dump: String,
    calls: CallLog,
    fail_mutate: bool,
}

impl Backend for FakeBackend {
    fn mutate(&self, args: &[&str]) -> Result<(), BackendError> {
        self.calls
            .borrow_mut()
            .push((self.family, args.iter().map(|a| a.to_string()).collect()));
        if self.fail_mutate {
            return Err(BackendError::Failed {
                tool: format!("fake-{}", self.family),
                args: args.join(" "),
                status: "exit status: 1".into(),
                stderr: "Chain already exists.".into(),
            });
        }
        Ok(())
    }

    fn dump(&self) -> Result<String, BackendError> {
        Ok(self.dump.clone())
    }
}

pub struct FakeRegistry {
    pub registry: BackendRegistry,
    pub calls: CallLog,
}

impl FakeRegistry {
    pub fn new(ipv4: &str, ipv6: &str, eb: &str) -> Self {
        Self::build(ipv4, ipv6, eb, None)
    }

    /// Like `new`, but mutate calls against `family` fail.
    pub fn failing(family: BackendFamily) -> Self {
        Self::build("", "", "", Some(family))
    }

    fn build(ipv4: &str, ipv6: &str, eb: &str, failing: Option<BackendFamily>) -> Self {
        let calls = CallLog::default();
        let backend = |family, dump: &str| -> Box<dyn Backend> {
            Box::new(FakeBackend {
                family,
                dump: dump.to_string(),
                calls: Rc::clone(&calls),
                fail_mutate: failing == Some(family),
            })
        };

        let registry = BackendRegistry::new(
            backend(BackendFamily::Ipv4, ipv4),
            backend(BackendFamily::Ipv6, ipv6),
            backend(BackendFamily::Eb, eb),
        );
        Self { registry, calls }
    }

    pub fn calls(&self) -> Vec<(BackendFamily, Vec<String>)> {
        self.calls.borrow().clone()
    }
}
