//! Per-invocation tracer configuration.

use std::net::IpAddr;
use std::time::Duration;

/// IP family used for resolution and for the raw ICMP sockets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpFamily {
    #[default]
    V4,
    V6,
}

impl IpFamily {
    /// Returns true if `addr` belongs to this family.
    pub fn matches(&self, addr: IpAddr) -> bool {
        match self {
            IpFamily::V4 => addr.is_ipv4(),
            IpFamily::V6 => addr.is_ipv6(),
        }
    }
}

impl std::fmt::Display for IpFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpFamily::V4 => write!(f, "ipv4"),
            IpFamily::V6 => write!(f, "ipv6"),
        }
    }
}

/// Protocol used for outbound probes.
///
/// TCP is part of the configuration surface but is rejected when the
/// transport is opened; SYN probing is not implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Udp,
    Icmp,
    Tcp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Udp => write!(f, "udp"),
            Protocol::Icmp => write!(f, "icmp"),
            Protocol::Tcp => write!(f, "tcp"),
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = crate::TrouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "udp" => Ok(Protocol::Udp),
            "icmp" => Ok(Protocol::Icmp),
            "tcp" => Ok(Protocol::Tcp),
            _ => Err(crate::TrouteError::UnknownProtocol(s.to_string())),
        }
    }
}

/// Immutable tracer configuration, constructed once per invocation.
#[derive(Debug, Clone)]
pub struct TracerConfig {
    /// IP family for resolution and sockets.
    pub family: IpFamily,
    /// Probe protocol.
    pub protocol: Protocol,
    /// First TTL to probe (1-based).
    pub start_ttl: u8,
    /// Last TTL to probe.
    pub max_ttl: u8,
    /// First UDP destination port; each hop increments by one so replies
    /// stay attributable. Unused for ICMP probes.
    pub base_port: u16,
    /// Number of probes per hop.
    pub nprobes: usize,
    /// Concurrent probes within one hop.
    pub cprobes: usize,
    /// Concurrent hops.
    pub chops: usize,
    /// Per-probe send/receive timeout.
    pub probe_timeout: Duration,
    /// Enable probe-level debug logging.
    pub debug: bool,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            family: IpFamily::V4,
            protocol: Protocol::Udp,
            start_ttl: 1,
            max_ttl: 30,
            base_port: 33434,
            nprobes: 3,
            cprobes: 3,
            chops: 1,
            probe_timeout: Duration::from_secs(3),
            debug: false,
        }
    }
}

impl TracerConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), crate::TrouteError> {
        if self.start_ttl < 1 || self.start_ttl > self.max_ttl {
            return Err(crate::TrouteError::InvalidTtlRange {
                start_ttl: self.start_ttl,
                max_ttl: self.max_ttl,
            });
        }
        if self.nprobes == 0 || self.cprobes == 0 || self.chops == 0 {
            return Err(crate::TrouteError::InvalidConfig(
                "probe and hop counts must be greater than zero".to_string(),
            ));
        }
        let hops = (self.max_ttl - self.start_ttl) as u32;
        if u32::from(self.base_port) + hops > u32::from(u16::MAX) {
            return Err(crate::TrouteError::InvalidConfig(format!(
                "base port {} leaves no room for {} hops",
                self.base_port,
                hops + 1
            )));
        }
        Ok(())
    }

    /// Number of hops this configuration will dispatch.
    pub fn hop_count(&self) -> usize {
        (self.max_ttl - self.start_ttl) as usize + 1
    }
}
