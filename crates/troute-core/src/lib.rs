//! Core types, traits, and the concurrent tracing engine for troute.
//!
//! This crate provides the fundamental abstractions used throughout the
//! traceroute implementation:
//!
//! - [`TracerConfig`] and the immutable per-invocation configuration
//! - [`Probe`], [`Hop`] and the other data-model types
//! - [`ProbeTransport`] and [`ReverseResolver`] traits implemented by the
//!   network layer
//! - [`TrouteError`] for error handling
//! - [`execution::trace_hops`], the two-level bounded-concurrency engine

pub mod config;
pub mod error;
pub mod execution;
pub mod traits;
pub mod types;

pub use config::{IpFamily, Protocol, TracerConfig};
pub use error::{TrouteError, TrouteResult};
pub use execution::trace_hops;
pub use traits::{HopPrinter, PendingReply, ProbeTransport, ReverseResolver};
pub use types::{
    Hop, HopToken, IcmpClass, IcmpReply, Probe, ProbeKey, TraceOutcome, TraceReport,
};
