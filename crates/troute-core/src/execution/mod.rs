//! The concurrent tracing engine.
//!
//! Two nested bounded pools: a hop-level pool of `chops` tasks and, within
//! each active hop, a probe-level pool of `cprobes` tasks. Each level feeds
//! a single aggregation consumer through a channel; no collection is ever
//! mutated from more than one task.

mod hop;
mod probe;
mod trace;

pub use trace::trace_hops;

pub(crate) use hop::execute_hop;
pub(crate) use probe::execute_probe;
