//! Data model: probes, hops, addressing tokens, and trace results.

use crate::{Protocol, TracerConfig};
use std::net::IpAddr;
use std::time::Duration;

/// Placeholder rendered for probes that never received a reply.
pub const UNANSWERED: &str = "*";

/// Semantic class of an ICMP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IcmpClass {
    /// An intermediate router exhausted the probe's hop limit. Expected on
    /// every non-terminal hop.
    TimeExceeded,
    /// The destination (or the probed port) cannot be reached further.
    DestinationUnreachable,
    /// The destination itself answered an Echo Request.
    EchoReply,
    /// Any other recognized ICMP type; displayable but never terminal.
    Other(u8),
}

impl IcmpClass {
    /// Terminal classes end the trace once their hop is gap-free.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IcmpClass::DestinationUnreachable | IcmpClass::EchoReply
        )
    }
}

/// Key attributing an inbound ICMP message to the hop that sent the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKey {
    /// UDP probes are recovered from the destination port embedded in the
    /// ICMP error payload; the hop index is `dst_port - base_port`.
    Udp { dst_port: u16 },
    /// ICMP probes carry the identifier and per-hop sequence number of the
    /// Echo Request.
    Echo { id: u16, seq: u16 },
}

/// Per-hop addressing token, assigned exactly once by the dispatch loop
/// before the hop is allowed to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HopToken {
    /// TTL / hop limit applied to every probe of this hop.
    pub ttl: u8,
    /// Zero-based hop index (`ttl - start_ttl`).
    pub index: usize,
    /// Reply attribution key.
    pub key: ProbeKey,
}

impl HopToken {
    /// Derives the token for hop `index` from the configured addressing
    /// scheme.
    pub fn assign(cfg: &TracerConfig, echo_id: u16, index: usize) -> Self {
        let ttl = cfg.start_ttl + index as u8;
        let key = match cfg.protocol {
            Protocol::Icmp => ProbeKey::Echo {
                id: echo_id,
                seq: index as u16,
            },
            Protocol::Udp | Protocol::Tcp => ProbeKey::Udp {
                dst_port: cfg.base_port + index as u16,
            },
        };
        Self { ttl, index, key }
    }
}

/// A classified reply routed to the probe that is waiting for it.
#[derive(Debug, Clone)]
pub struct IcmpReply {
    /// Address the reply came from.
    pub source: IpAddr,
    /// Semantic class of the reply.
    pub class: IcmpClass,
}

/// Result of a single probe: either an answered reply or the unanswered
/// placeholder.
#[derive(Debug, Clone)]
pub struct Probe {
    /// Reverse-resolved hostname; falls back to the address literal.
    pub host: String,
    /// Source address of the reply.
    pub address: String,
    /// Wall-clock round-trip time.
    pub rtt: Duration,
    /// Classification of the reply, if one arrived.
    pub class: Option<IcmpClass>,
    /// False for the timeout placeholder.
    pub valid: bool,
}

impl Probe {
    /// A probe that received and classified a reply.
    pub fn answered(host: String, address: String, rtt: Duration, class: IcmpClass) -> Self {
        Self {
            host,
            address,
            rtt,
            class: Some(class),
            valid: true,
        }
    }

    /// The timeout placeholder. Not an error; participates in hop assembly
    /// and printing like any other probe.
    pub fn unanswered() -> Self {
        Self {
            host: UNANSWERED.to_string(),
            address: UNANSWERED.to_string(),
            rtt: Duration::ZERO,
            class: None,
            valid: false,
        }
    }
}

/// The aggregated result of all probes issued at one TTL value.
#[derive(Debug, Clone)]
pub struct Hop {
    /// Zero-based index, equal to `ttl - start_ttl`.
    pub index: usize,
    /// Exactly `nprobes` results, ordered by completion.
    pub probes: Vec<Probe>,
}

impl Hop {
    /// True if any contained probe classified as a terminal response.
    pub fn is_terminal(&self) -> bool {
        self.probes
            .iter()
            .any(|p| p.class.map(|c| c.is_terminal()).unwrap_or(false))
    }
}

/// How the trace ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOutcome {
    /// A terminal hop arrived with every smaller-index hop accounted for.
    DestinationReached,
    /// Every TTL in the configured range completed without a terminal hop.
    HopLimitReached,
}

/// Transient collection of finalized hops; consumed for printing and tests,
/// never persisted.
#[derive(Debug)]
pub struct TraceReport {
    pub outcome: TraceOutcome,
    pub hops: Vec<Hop>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classes() {
        assert!(IcmpClass::EchoReply.is_terminal());
        assert!(IcmpClass::DestinationUnreachable.is_terminal());
        assert!(!IcmpClass::TimeExceeded.is_terminal());
        assert!(!IcmpClass::Other(5).is_terminal());
    }

    #[test]
    fn test_unanswered_placeholder_shape() {
        let probe = Probe::unanswered();
        assert!(!probe.valid);
        assert_eq!(probe.host, "*");
        assert_eq!(probe.address, "*");
        assert!(probe.class.is_none());
    }

    #[test]
    fn test_hop_terminal_derivation() {
        let terminal = Hop {
            index: 0,
            probes: vec![
                Probe::unanswered(),
                Probe::answered(
                    "host".to_string(),
                    "10.0.0.1".to_string(),
                    Duration::from_millis(3),
                    IcmpClass::EchoReply,
                ),
            ],
        };
        assert!(terminal.is_terminal());

        let intermediate = Hop {
            index: 1,
            probes: vec![Probe::answered(
                "host".to_string(),
                "10.0.0.1".to_string(),
                Duration::from_millis(3),
                IcmpClass::TimeExceeded,
            )],
        };
        assert!(!intermediate.is_terminal());
    }

    #[test]
    fn test_token_assignment_udp() {
        let cfg = TracerConfig::default();
        let token = HopToken::assign(&cfg, 99, 4);
        assert_eq!(token.ttl, 5);
        assert_eq!(token.index, 4);
        assert_eq!(
            token.key,
            ProbeKey::Udp {
                dst_port: cfg.base_port + 4
            }
        );
    }

    #[test]
    fn test_token_assignment_icmp() {
        let cfg = TracerConfig {
            protocol: Protocol::Icmp,
            start_ttl: 3,
            ..Default::default()
        };
        let token = HopToken::assign(&cfg, 4242, 2);
        assert_eq!(token.ttl, 5);
        assert_eq!(token.key, ProbeKey::Echo { id: 4242, seq: 2 });
    }
}
