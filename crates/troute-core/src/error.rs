//! Error types for trace operations.
//!
//! A probe timeout is deliberately *not* represented here: it is a normal
//! outcome modeled as the unanswered [`crate::Probe`] placeholder.

use std::net::IpAddr;
use thiserror::Error;

/// Main error type for trace operations.
#[derive(Error, Debug)]
pub enum TrouteError {
    #[error("failed to resolve hostname {hostname}: {source}")]
    ResolutionFailed {
        hostname: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to create socket: {0}")]
    SocketCreation(#[source] std::io::Error),

    #[error("failed to bind to address {addr}: {source}")]
    SocketBind {
        addr: IpAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to send probe: {0}")]
    WriteFailed(#[source] std::io::Error),

    #[error("failed to receive reply: {0}")]
    ReceiveFailed(String),

    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    #[error("invalid TTL range: start={start_ttl}, max={max_ttl}")]
    InvalidTtlRange { start_ttl: u8, max_ttl: u8 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("executing hop with ttl {ttl}: {source}")]
    Hop {
        ttl: u8,
        #[source]
        source: Box<TrouteError>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for trace operations.
pub type TrouteResult<T> = Result<T, TrouteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_error_carries_ttl() {
        let err = TrouteError::Hop {
            ttl: 7,
            source: Box::new(TrouteError::ReceiveFailed("closed".to_string())),
        };
        let text = err.to_string();
        assert!(text.contains("ttl 7"), "unexpected message: {text}");
        assert!(std::error::Error::source(&err).is_some());
    }
}
