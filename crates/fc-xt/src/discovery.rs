use crate::backend::BackendRegistry;
use crate::error::BackendError;
use crate::snapshot::Snapshot;
use fc_core::{BackendFamily, ChainRecord, Policy, ProtocolFamily};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, trace};

static TABLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*(\S+)").expect("table header regex"));

// ebtables-save prints no [pkts:bytes] counters.
static CHAIN_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:(\S+)\s+(\S+)(?:\s+\[\d+:\d+\])?\s*$").expect("chain declaration regex")
});

/// Dump every backend in [`BackendFamily::ALL`] order and parse the result.
pub fn discover_all(registry: &BackendRegistry) -> Result<Snapshot, BackendError> {
    let mut parser = DumpParser::default();
    for family in BackendFamily::ALL {
        let text = registry.resolve(family).dump()?;
        parser.ingest(family, &text);
    }
    let snapshot = Snapshot::new(parser.finish());
    debug!(records = snapshot.records().len(), "discovery complete");
    Ok(snapshot)
}

/// Accumulates records across the dumps of one discovery pass.
///
/// IPv4 dumps must be ingested before IPv6 ones: a dual-stack record is only
/// synthesized when the IPv6 side finds its IPv4 twin already recorded.
#[derive(Debug, Default)]
pub struct DumpParser {
    records: Vec<ChainRecord>,
    ipv4: HashMap<(String, String), Policy>,
}

impl DumpParser {
    pub fn ingest(&mut self, family: BackendFamily, text: &str) {
        let mut table: Option<String> = None;

        for line in text.lines() {
            let line = line.trim_end();

            if let Some(caps) = CHAIN_LINE.captures(line) {
                let Some(current) = table.as_deref() else {
                    trace!(family = %family, line, "chain line outside any table");
                    continue;
                };
                let Some(policy) = Policy::from_dump_token(&caps[2]) else {
                    trace!(family = %family, line, "unknown policy token");
                    continue;
                };
                self.push(family, current, &caps[1], policy);
            } else if let Some(caps) = TABLE_LINE.captures(line) {
                table = Some(caps[1].to_string());
            } else {
                trace!(family = %family, line, "skipping dump line");
            }
        }
    }

    fn push(&mut self, family: BackendFamily, table: &str, chain: &str, policy: Policy) {
        let key = (table.to_string(), chain.to_string());

        match family {
            BackendFamily::Ipv4 => {
                self.ipv4.insert(key.clone(), policy);
            }
            BackendFamily::Ipv6 => {
                if let Some(&v4_policy) = self.ipv4.get(&key) {
                    let merged = if v4_policy == policy {
                        policy
                    } else {
                        Policy::Inconsistent
                    };
                    let record = ChainRecord {
                        table: key.0.clone(),
                        chain: key.1.clone(),
                        family: ProtocolFamily::Ip,
                        policy: merged,
                    };
                    debug!(chain = %record.name(), policy = %merged, "dual-stack chain");
                    self.records.push(record);
                }
            }
            BackendFamily::Eb => {}
        }

        let record = ChainRecord {
            table: key.0,
            chain: key.1,
            family: family.into(),
            policy,
        };
        debug!(chain = %record.name(), policy = %policy, "discovered chain");
        self.records.push(record);
    }

    pub fn finish(self) -> Vec<ChainRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeRegistry;

    const IPV4: &str = "\
# Generated by iptables-save v1.8.7 on Thu Oct 15 10:00:00 2026
*mangle
:PREROUTING ACCEPT [120:9000]
:mychain - [0:0]
COMMIT
*filter
:INPUT ACCEPT [0:0]
:FORWARD DROP [0:0]
:OUTPUT ACCEPT [10:800]
:fail2ban - [0:0]
-A INPUT -j fail2ban
COMMIT
";

    const IPV6: &str = "\
*filter
:INPUT ACCEPT [0:0]
:FORWARD ACCEPT [0:0]
:OUTPUT ACCEPT [0:0]
COMMIT
";

    const EB: &str = "\
*filter
:INPUT ACCEPT
:FORWARD ACCEPT
:OUTPUT ACCEPT
*broute
:BROUTING ACCEPT
";

    fn parse(dumps: &[(BackendFamily, &str)]) -> Vec<ChainRecord> {
        let mut parser = DumpParser::default();
        for (family, text) in dumps {
            parser.ingest(*family, text);
        }
        parser.finish()
    }

    fn names(records: &[ChainRecord]) -> Vec<String> {
        records.iter().map(|r| format!("{}={}", r.name(), r.policy)).collect()
    }

    #[test]
    fn matching_policies_merge_into_dual_stack_record() {
        let records = parse(&[
            (BackendFamily::Ipv4, "*filter\n:INPUT ACCEPT [0:0]\n"),
            (BackendFamily::Ipv6, "*filter\n:INPUT ACCEPT [0:0]\n"),
        ]);
        assert_eq!(
            names(&records),
            vec![":INPUT:IPv4=accept", ":INPUT:IP=accept", ":INPUT:IPv6=accept"]
        );
    }

    #[test]
    fn diverging_policies_are_inconsistent() {
        let records = parse(&[
            (BackendFamily::Ipv4, "*filter\n:INPUT ACCEPT [0:0]\n"),
            (BackendFamily::Ipv6, "*filter\n:INPUT DROP [0:0]\n"),
        ]);
        let merged = records
            .iter()
            .find(|r| r.family == ProtocolFamily::Ip)
            .unwrap();
        assert_eq!(merged.policy, Policy::Inconsistent);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn ipv6_first_does_not_merge() {
        let records = parse(&[
            (BackendFamily::Ipv6, "*filter\n:INPUT ACCEPT [0:0]\n"),
            (BackendFamily::Ipv4, "*filter\n:INPUT ACCEPT [0:0]\n"),
        ]);
        assert!(records.iter().all(|r| r.family != ProtocolFamily::Ip));
    }

    #[test]
    fn single_family_chain_has_no_merged_record() {
        let records = parse(&[(BackendFamily::Ipv4, IPV4), (BackendFamily::Ipv6, IPV6)]);
        let names = names(&records);
        assert!(names.contains(&":fail2ban:IPv4=empty".to_string()));
        assert!(!names.iter().any(|n| n.starts_with(":fail2ban:IP=")));
        assert!(names.contains(&"MANGLE:mychain:IPv4=empty".to_string()));
        assert!(names.contains(&":FORWARD:IP=inconsistent".to_string()));
        assert!(names.contains(&":OUTPUT:IP=accept".to_string()));
    }

    #[test]
    fn eb_lines_without_counters_never_merge() {
        let records = parse(&[
            (BackendFamily::Ipv4, IPV4),
            (BackendFamily::Ipv6, IPV6),
            (BackendFamily::Eb, EB),
        ]);
        let eb: Vec<_> = records
            .iter()
            .filter(|r| r.family == ProtocolFamily::Eb)
            .map(|r| r.name())
            .collect();
        assert_eq!(eb, vec![":INPUT:EB", ":FORWARD:EB", ":OUTPUT:EB", "BROUTE:BROUTING:EB"]);
        assert_eq!(
            records.iter().filter(|r| r.family == ProtocolFamily::Ip).count(),
            3
        );
    }

    #[test]
    fn anomalies_are_skipped() {
        let records = parse(&[(
            BackendFamily::Ipv4,
            ":ORPHAN ACCEPT [0:0]\n*filter\ngarbage\n:INPUT BOGUS [0:0]\n:OUTPUT DROP [1:2]\r\n",
        )]);
        assert_eq!(names(&records), vec![":OUTPUT:IPv4=drop"]);
    }

    #[test]
    fn discover_all_reads_every_backend() {
        let fake = FakeRegistry::new(IPV4, IPV6, EB);
        let snapshot = discover_all(&fake.registry).unwrap();
        assert_eq!(snapshot.records().len(), 6 + 3 + 3 + 4);
        assert!(fake.calls().is_empty());
    }
}
