//! Trait seams between the engine and the network layer.

use crate::{Hop, IcmpReply, TrouteError};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Instant;
use tokio::sync::oneshot;

/// An in-flight probe: the send timestamp plus the channel the reply router
/// will resolve when a matching ICMP message arrives.
///
/// Dropping the receiver (probe timeout) simply leaves the reply unclaimed;
/// a closed *sender* means the transport was torn down and is fatal.
pub struct PendingReply {
    /// Taken immediately after the probe left the socket.
    pub sent_at: Instant,
    /// Resolved with the classified reply for this probe's key.
    pub rx: oneshot::Receiver<IcmpReply>,
}

/// Transport issuing protocol-specific probes and routing raw ICMP replies.
///
/// Implementations own the raw ICMP listening socket and the send socket.
/// `send_probe` must apply the token's TTL and transmit as one exclusive
/// section so concurrently executing hops cannot interleave between the
/// hop-limit write and the send.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    /// Registers interest in replies for the token's key, then sends one
    /// probe with the token's TTL.
    async fn send_probe(&self, token: &crate::HopToken) -> Result<PendingReply, TrouteError>;

    /// Releases the sockets and stops the reply router. Pending probes see
    /// their reply channel close.
    async fn close(&self) -> Result<(), TrouteError>;
}

/// Best-effort address-to-hostname lookup. Never fails the caller: any
/// lookup problem falls back to the address literal.
#[async_trait]
pub trait ReverseResolver: Send + Sync {
    async fn resolve(&self, addr: IpAddr) -> String;
}

/// Renders one stabilized hop. Called by the aggregation consumer in
/// strictly increasing index order.
pub trait HopPrinter: Send {
    fn print_hop(&mut self, hop: &Hop);
}
