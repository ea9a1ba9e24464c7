use crate::chain::Grammar;
use crate::policy::{Ensure, Policy};
use crate::resource::DesiredChain;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Contents of `fwchain.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backends: BackendPaths,
    #[serde(default)]
    pub chains: Vec<ChainSpec>,
}

/// Executables for the mutate and dump side of each backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendPaths {
    pub iptables: PathBuf,
    pub iptables_save: PathBuf,
    pub ip6tables: PathBuf,
    pub ip6tables_save: PathBuf,
    pub ebtables: PathBuf,
    pub ebtables_save: PathBuf,
}

impl Default for BackendPaths {
    fn default() -> Self {
        Self {
            iptables: "/sbin/iptables".into(),
            iptables_save: "/sbin/iptables-save".into(),
            ip6tables: "/sbin/ip6tables".into(),
            ip6tables_save: "/sbin/ip6tables-save".into(),
            ebtables: "/sbin/ebtables".into(),
            ebtables_save: "/sbin/ebtables-save".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSpec {
    pub name: String,
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(default)]
    pub policy: Option<Policy>,
    /// Use the strict built-in chain grammar.
    #[serde(default)]
    pub builtin: bool,
}

impl ChainSpec {
    pub fn grammar(&self) -> Grammar {
        if self.builtin {
            Grammar::BuiltIn
        } else {
            Grammar::General
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse config {:?}", path))
    }

    /// Validate every chain entry. Stops at the first invalid one.
    pub fn desired_chains(&self) -> Result<Vec<DesiredChain>> {
        let mut seen = HashSet::new();
        let mut chains = Vec::with_capacity(self.chains.len());

        for spec in &self.chains {
            let chain = DesiredChain::new(&spec.name, spec.grammar(), spec.ensure, spec.policy)
                .with_context(|| format!("Invalid chain entry '{}'", spec.name))?;

            if !seen.insert(chain.id.to_string()) {
                anyhow::bail!(
                    "Duplicate chain entry '{}' (canonical name {})",
                    spec.name,
                    chain.id
                );
            }
            chains.push(chain);
        }

        Ok(chains)
    }
}
