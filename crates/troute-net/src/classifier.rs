//! Byte-level ICMP response classification.
//!
//! Raw ICMPv4 sockets deliver the outer IP header with every message;
//! raw ICMPv6 sockets deliver the ICMPv6 message only. Both parse tables
//! reduce an inbound message to an [`IcmpClass`] and, where the message
//! embeds enough of the original probe, the [`ProbeKey`] that attributes
//! it to the hop that sent that probe.

use troute_core::{IcmpClass, IpFamily, ProbeKey, TrouteError};

const IPV4_HEADER_MIN_LEN: usize = 20;
const IPV6_HEADER_LEN: usize = 40;
const ICMP_HEADER_LEN: usize = 8;

const IPPROTO_ICMP: u8 = 1;
const IPPROTO_UDP: u8 = 17;
const IPPROTO_ICMPV6: u8 = 58;

const ICMPV4_ECHO_REPLY: u8 = 0;
const ICMPV4_DEST_UNREACHABLE: u8 = 3;
const ICMPV4_ECHO_REQUEST: u8 = 8;
const ICMPV4_TIME_EXCEEDED: u8 = 11;

const ICMPV6_DEST_UNREACHABLE: u8 = 1;
const ICMPV6_TIME_EXCEEDED: u8 = 3;
const ICMPV6_ECHO_REQUEST: u8 = 128;
const ICMPV6_ECHO_REPLY: u8 = 129;

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyInfo {
    /// Semantic class of the message.
    pub class: IcmpClass,
    /// Attribution key, when the message carries one. `None` means the
    /// message is recognizable but cannot be matched to a probe.
    pub key: Option<ProbeKey>,
}

/// Parses raw ICMP bytes for one IP family. Pure function of its input:
/// classifying the same bytes twice yields the same result.
#[derive(Debug, Clone, Copy)]
pub struct IcmpClassifier {
    family: IpFamily,
}

impl IcmpClassifier {
    pub fn new(family: IpFamily) -> Self {
        Self { family }
    }

    /// Classifies one inbound message. Truncated or non-ICMP input is a
    /// [`TrouteError::MalformedPacket`].
    pub fn classify(&self, buffer: &[u8]) -> Result<ReplyInfo, TrouteError> {
        match self.family {
            IpFamily::V4 => classify_v4(buffer),
            IpFamily::V6 => classify_v6(buffer),
        }
    }
}

fn classify_v4(buffer: &[u8]) -> Result<ReplyInfo, TrouteError> {
    if buffer.len() < IPV4_HEADER_MIN_LEN + ICMP_HEADER_LEN {
        return Err(TrouteError::MalformedPacket(format!(
            "ipv4 packet too short: {} bytes",
            buffer.len()
        )));
    }
    if buffer[0] >> 4 != 4 {
        return Err(TrouteError::MalformedPacket(format!(
            "unexpected IP version {}",
            buffer[0] >> 4
        )));
    }

    let header_len = ((buffer[0] & 0x0f) as usize) * 4;
    if header_len < IPV4_HEADER_MIN_LEN || buffer.len() < header_len + ICMP_HEADER_LEN {
        return Err(TrouteError::MalformedPacket(
            "ipv4 header length out of range".to_string(),
        ));
    }
    if buffer[9] != IPPROTO_ICMP {
        return Err(TrouteError::MalformedPacket(format!(
            "unexpected transport protocol {}",
            buffer[9]
        )));
    }

    let icmp = &buffer[header_len..];
    match icmp[0] {
        ICMPV4_TIME_EXCEEDED => Ok(ReplyInfo {
            class: IcmpClass::TimeExceeded,
            key: embedded_key_v4(&icmp[ICMP_HEADER_LEN..])?,
        }),
        ICMPV4_DEST_UNREACHABLE => Ok(ReplyInfo {
            class: IcmpClass::DestinationUnreachable,
            key: embedded_key_v4(&icmp[ICMP_HEADER_LEN..])?,
        }),
        ICMPV4_ECHO_REPLY => Ok(ReplyInfo {
            class: IcmpClass::EchoReply,
            key: Some(ProbeKey::Echo {
                id: u16::from_be_bytes([icmp[4], icmp[5]]),
                seq: u16::from_be_bytes([icmp[6], icmp[7]]),
            }),
        }),
        other => Ok(ReplyInfo {
            class: IcmpClass::Other(other),
            key: None,
        }),
    }
}

/// Recovers the probe key from the original packet embedded in an ICMPv4
/// error message: the inner IP header plus the first 8 bytes of the inner
/// transport header.
fn embedded_key_v4(inner: &[u8]) -> Result<Option<ProbeKey>, TrouteError> {
    if inner.len() < IPV4_HEADER_MIN_LEN {
        return Err(TrouteError::MalformedPacket(
            "embedded ipv4 packet truncated".to_string(),
        ));
    }
    let header_len = ((inner[0] & 0x0f) as usize) * 4;
    if header_len < IPV4_HEADER_MIN_LEN || inner.len() < header_len + 8 {
        return Err(TrouteError::MalformedPacket(
            "embedded ipv4 transport truncated".to_string(),
        ));
    }

    let transport = &inner[header_len..];
    match inner[9] {
        IPPROTO_UDP => Ok(Some(ProbeKey::Udp {
            dst_port: u16::from_be_bytes([transport[2], transport[3]]),
        })),
        IPPROTO_ICMP if transport[0] == ICMPV4_ECHO_REQUEST => Ok(Some(ProbeKey::Echo {
            id: u16::from_be_bytes([transport[4], transport[5]]),
            seq: u16::from_be_bytes([transport[6], transport[7]]),
        })),
        _ => Ok(None),
    }
}

fn classify_v6(buffer: &[u8]) -> Result<ReplyInfo, TrouteError> {
    if buffer.len() < ICMP_HEADER_LEN {
        return Err(TrouteError::MalformedPacket(format!(
            "icmpv6 message too short: {} bytes",
            buffer.len()
        )));
    }

    match buffer[0] {
        ICMPV6_TIME_EXCEEDED => Ok(ReplyInfo {
            class: IcmpClass::TimeExceeded,
            key: embedded_key_v6(&buffer[ICMP_HEADER_LEN..])?,
        }),
        ICMPV6_DEST_UNREACHABLE => Ok(ReplyInfo {
            class: IcmpClass::DestinationUnreachable,
            key: embedded_key_v6(&buffer[ICMP_HEADER_LEN..])?,
        }),
        ICMPV6_ECHO_REPLY => Ok(ReplyInfo {
            class: IcmpClass::EchoReply,
            key: Some(ProbeKey::Echo {
                id: u16::from_be_bytes([buffer[4], buffer[5]]),
                seq: u16::from_be_bytes([buffer[6], buffer[7]]),
            }),
        }),
        other => Ok(ReplyInfo {
            class: IcmpClass::Other(other),
            key: None,
        }),
    }
}

fn embedded_key_v6(inner: &[u8]) -> Result<Option<ProbeKey>, TrouteError> {
    if inner.len() < IPV6_HEADER_LEN + 8 {
        return Err(TrouteError::MalformedPacket(
            "embedded ipv6 packet truncated".to_string(),
        ));
    }

    let transport = &inner[IPV6_HEADER_LEN..];
    match inner[6] {
        IPPROTO_UDP => Ok(Some(ProbeKey::Udp {
            dst_port: u16::from_be_bytes([transport[2], transport[3]]),
        })),
        IPPROTO_ICMPV6 if transport[0] == ICMPV6_ECHO_REQUEST => Ok(Some(ProbeKey::Echo {
            id: u16::from_be_bytes([transport[4], transport[5]]),
            seq: u16::from_be_bytes([transport[6], transport[7]]),
        })),
        _ => Ok(None),
    }
}
