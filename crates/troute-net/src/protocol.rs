//! Closed set of probe strategies, selected once when the transport opens.

use crate::packet::build_echo_request;
use std::net::{IpAddr, SocketAddr};
use troute_core::{HopToken, IpFamily, ProbeKey, Protocol, TrouteError};

/// Protocol-specific probe capabilities: request construction and
/// destination addressing. One variant is chosen at configuration time;
/// nothing downstream switches on protocol tags again.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ProbeProto {
    /// A zero-length datagram to the hop's destination port.
    Udp,
    /// An Echo Request whose identifier/sequence carry the hop's key.
    Icmp { family: IpFamily },
}

impl ProbeProto {
    /// Rejects protocols without a probe implementation. TCP is accepted
    /// on the command line but SYN probing is not implemented.
    pub(crate) fn for_config(protocol: Protocol, family: IpFamily) -> Result<Self, TrouteError> {
        match protocol {
            Protocol::Udp => Ok(ProbeProto::Udp),
            Protocol::Icmp => Ok(ProbeProto::Icmp { family }),
            Protocol::Tcp => Err(TrouteError::Unsupported(
                "tcp probes are not implemented".to_string(),
            )),
        }
    }

    pub(crate) fn build_request(&self, token: &HopToken) -> Result<Vec<u8>, TrouteError> {
        match (self, token.key) {
            (ProbeProto::Udp, ProbeKey::Udp { .. }) => Ok(Vec::new()),
            (ProbeProto::Icmp { family }, ProbeKey::Echo { id, seq }) => {
                build_echo_request(*family, id, seq)
            }
            (proto, key) => Err(TrouteError::Internal(format!(
                "addressing key {key:?} does not match probe protocol {proto:?}"
            ))),
        }
    }

    pub(crate) fn destination(&self, dst: IpAddr, token: &HopToken) -> SocketAddr {
        match (self, token.key) {
            (ProbeProto::Udp, ProbeKey::Udp { dst_port }) => SocketAddr::new(dst, dst_port),
            // Raw ICMP sockets have no port; zero is a placeholder.
            _ => SocketAddr::new(dst, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use troute_core::TracerConfig;

    #[test]
    fn test_tcp_is_rejected() {
        assert!(ProbeProto::for_config(Protocol::Tcp, IpFamily::V4).is_err());
    }

    #[test]
    fn test_udp_destination_uses_hop_port() {
        let cfg = TracerConfig::default();
        let token = HopToken::assign(&cfg, 1, 2);
        let proto = ProbeProto::for_config(Protocol::Udp, IpFamily::V4).unwrap();
        let dst: IpAddr = "192.0.2.1".parse().unwrap();
        assert_eq!(
            proto.destination(dst, &token),
            SocketAddr::new(dst, cfg.base_port + 2)
        );
        assert!(proto.build_request(&token).unwrap().is_empty());
    }

    #[test]
    fn test_icmp_request_carries_token_key() {
        let cfg = TracerConfig {
            protocol: Protocol::Icmp,
            ..Default::default()
        };
        let token = HopToken::assign(&cfg, 0x0506, 3);
        let proto = ProbeProto::for_config(Protocol::Icmp, IpFamily::V4).unwrap();
        let request = proto.build_request(&token).unwrap();
        assert_eq!(u16::from_be_bytes([request[4], request[5]]), 0x0506);
        assert_eq!(u16::from_be_bytes([request[6], request[7]]), 3);
    }
}
