//! Network layer for troute.
//!
//! Owns everything that touches the wire: the raw ICMP listening socket and
//! its dedicated reply router, the protocol-specific send path, byte-level
//! ICMP classification, and the DNS resolvers.

pub mod classifier;
pub mod dns;
pub mod packet;
mod protocol;
mod router;
pub mod transport;

pub use classifier::{IcmpClassifier, ReplyInfo};
pub use dns::{resolve_host, DnsReverseResolver};
pub use transport::IcmpTransport;
