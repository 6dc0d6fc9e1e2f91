//! Probe request construction using pnet.

use pnet_packet::icmp::{self, echo_request::MutableEchoRequestPacket, IcmpCode, IcmpPacket, IcmpTypes};
use pnet_packet::icmpv6::{
    echo_request::MutableEchoRequestPacket as MutableEchoRequestPacketV6, Icmpv6Code, Icmpv6Types,
};
use troute_core::{IpFamily, TrouteError};

const ECHO_HEADER_LEN: usize = 8;

/// Builds an ICMP Echo Request message (no IP header; the raw ICMP socket
/// supplies it). Identifier and sequence carry the probe's attribution key.
///
/// For ICMPv6 the checksum is left zero: the kernel fills it in when
/// sending on a raw ICMPv6 socket.
pub fn build_echo_request(
    family: IpFamily,
    echo_id: u16,
    seq: u16,
) -> Result<Vec<u8>, TrouteError> {
    match family {
        IpFamily::V4 => build_echo_request_v4(echo_id, seq),
        IpFamily::V6 => build_echo_request_v6(echo_id, seq),
    }
}

fn build_echo_request_v4(echo_id: u16, seq: u16) -> Result<Vec<u8>, TrouteError> {
    let mut buffer = vec![0u8; ECHO_HEADER_LEN + 1];

    {
        let mut packet = MutableEchoRequestPacket::new(&mut buffer)
            .ok_or_else(|| TrouteError::Internal("failed to create echo request".to_string()))?;
        packet.set_icmp_type(IcmpTypes::EchoRequest);
        packet.set_icmp_code(IcmpCode::new(0));
        packet.set_identifier(echo_id);
        packet.set_sequence_number(seq);
        packet.set_payload(&[0]);
    }

    {
        let view = IcmpPacket::new(&buffer)
            .ok_or_else(|| TrouteError::Internal("failed to create icmp view".to_string()))?;
        let checksum = icmp::checksum(&view);
        buffer[2..4].copy_from_slice(&checksum.to_be_bytes());
    }

    Ok(buffer)
}

fn build_echo_request_v6(echo_id: u16, seq: u16) -> Result<Vec<u8>, TrouteError> {
    let mut buffer = vec![0u8; ECHO_HEADER_LEN + 1];

    let mut packet = MutableEchoRequestPacketV6::new(&mut buffer)
        .ok_or_else(|| TrouteError::Internal("failed to create echo request".to_string()))?;
    packet.set_icmpv6_type(Icmpv6Types::EchoRequest);
    packet.set_icmpv6_code(Icmpv6Code::new(0));
    packet.set_identifier(echo_id);
    packet.set_sequence_number(seq);
    packet.set_payload(&[0]);

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_request_v4_layout() {
        let packet = build_echo_request(IpFamily::V4, 0xabcd, 12).unwrap();
        assert_eq!(packet.len(), 9);
        assert_eq!(packet[0], 8); // echo request
        assert_eq!(packet[1], 0);
        assert_eq!(u16::from_be_bytes([packet[4], packet[5]]), 0xabcd);
        assert_eq!(u16::from_be_bytes([packet[6], packet[7]]), 12);
        assert_ne!(u16::from_be_bytes([packet[2], packet[3]]), 0);
    }

    #[test]
    fn test_echo_request_v6_layout() {
        let packet = build_echo_request(IpFamily::V6, 7, 3).unwrap();
        assert_eq!(packet[0], 128); // echo request
        assert_eq!(u16::from_be_bytes([packet[4], packet[5]]), 7);
        assert_eq!(u16::from_be_bytes([packet[6], packet[7]]), 3);
        // checksum is filled by the kernel for raw ICMPv6 sockets
        assert_eq!(u16::from_be_bytes([packet[2], packet[3]]), 0);
    }
}
