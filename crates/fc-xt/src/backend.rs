use crate::error::BackendError;
use fc_core::{BackendFamily, BackendPaths};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// One packet-filtering subsystem: a tool that changes chain state and a
/// tool that prints the whole ruleset.
pub trait Backend {
    fn mutate(&self, args: &[&str]) -> Result<(), BackendError>;
    fn dump(&self) -> Result<String, BackendError>;
}

/// `iptables`/`ip6tables`/`ebtables` and their `-save` counterparts.
pub struct XtablesTool {
    mutate: PathBuf,
    dump: PathBuf,
}

impl XtablesTool {
    pub fn new(mutate: impl Into<PathBuf>, dump: impl Into<PathBuf>) -> Self {
        Self {
            mutate: mutate.into(),
            dump: dump.into(),
        }
    }

    fn run(program: &Path, args: &[&str]) -> Result<String, BackendError> {
        let tool = program.display().to_string();
        debug!(%tool, ?args, "running backend tool");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => BackendError::NotFound { tool: tool.clone() },
                _ => BackendError::Spawn {
                    tool: tool.clone(),
                    source,
                },
            })?;

        if !output.status.success() {
            return Err(BackendError::Failed {
                tool,
                args: args.join(" "),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Backend for XtablesTool {
    fn mutate(&self, args: &[&str]) -> Result<(), BackendError> {
        Self::run(&self.mutate, args).map(|_| ())
    }

    fn dump(&self) -> Result<String, BackendError> {
        Self::run(&self.dump, &[])
    }
}

/// Fixed family → backend mapping, built once at startup.
pub struct BackendRegistry {
    ipv4: Box<dyn Backend>,
    ipv6: Box<dyn Backend>,
    eb: Box<dyn Backend>,
}

impl BackendRegistry {
    pub fn new(ipv4: Box<dyn Backend>, ipv6: Box<dyn Backend>, eb: Box<dyn Backend>) -> Self {
        Self { ipv4, ipv6, eb }
    }

    pub fn from_paths(paths: &BackendPaths) -> Self {
        Self::new(
            Box::new(XtablesTool::new(
                paths.iptables.clone(),
                paths.iptables_save.clone(),
            )),
            Box::new(XtablesTool::new(
                paths.ip6tables.clone(),
                paths.ip6tables_save.clone(),
            )),
            Box::new(XtablesTool::new(
                paths.ebtables.clone(),
                paths.ebtables_save.clone(),
            )),
        )
    }

    pub fn resolve(&self, family: BackendFamily) -> &dyn Backend {
        match family {
            BackendFamily::Ipv4 => self.ipv4.as_ref(),
            BackendFamily::Ipv6 => self.ipv6.as_ref(),
            BackendFamily::Eb => self.eb.as_ref(),
        }
    }
}
