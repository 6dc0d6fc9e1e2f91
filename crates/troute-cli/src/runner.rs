//! Trace setup: resolution, destination selection, transport lifetime.

use crate::print::ConsolePrinter;
use rand::Rng;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};
use troute_core::{trace_hops, ProbeTransport, TracerConfig, TrouteError};
use troute_net::{resolve_host, DnsReverseResolver, IcmpTransport};

/// Resolves the destination, opens the transport, and runs the trace.
///
/// Returns `Ok` both for a completed trace and for a hostname with no
/// address of the configured family (reported, zero hops).
pub async fn run(cfg: &TracerConfig, host: &str) -> Result<(), TrouteError> {
    cfg.validate()?;

    let addresses = resolve_host(host, cfg.family).await?;
    if addresses.is_empty() {
        println!("troute: {host} has no {} address", cfg.family);
        return Ok(());
    }

    let (dst, notice) = choose_destination(&mut rand::thread_rng(), host, &addresses);
    if let Some(notice) = notice {
        println!("{notice}");
    }
    println!("troute {host} ({dst}) with max hops {}", cfg.max_ttl);

    let transport = Arc::new(IcmpTransport::open(
        cfg.family,
        cfg.protocol,
        dst,
        cfg.probe_timeout,
    )?);
    let reverse = Arc::new(DnsReverseResolver::new());
    let mut printer = ConsolePrinter;

    let result = trace_hops(cfg, transport.clone(), reverse, &mut printer).await;

    // Release the sockets on every exit path before surfacing the result.
    if let Err(e) = transport.close().await {
        warn!(error = %e, "failed to close transport");
    }

    let report = result?;
    debug!(outcome = ?report.outcome, hops = report.hops.len(), "trace finished");

    Ok(())
}

/// Picks the one destination address for the entire trace. When several
/// candidates exist the choice is uniform-random and accompanied by exactly
/// one notice line; a single candidate is used silently.
fn choose_destination<R: Rng>(
    rng: &mut R,
    host: &str,
    addresses: &[IpAddr],
) -> (IpAddr, Option<String>) {
    let dst = addresses[rng.gen_range(0..addresses.len())];
    let notice = (addresses.len() > 1)
        .then(|| format!("troute: {host} has more than one address. {dst} will be used"));
    (dst, notice)
}
