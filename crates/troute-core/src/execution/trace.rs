//! Trace orchestration: hop dispatch, in-order assembly, and termination.

use crate::execution::execute_hop;
use crate::{
    Hop, HopPrinter, HopToken, ProbeTransport, ReverseResolver, TraceOutcome, TraceReport,
    TracerConfig, TrouteError,
};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::debug;

/// Aborts the hop dispatcher when the orchestrator returns, so a fatal
/// error or an early terminal hop stops further dispatch instead of
/// leaking it.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs the trace across the configured TTL range.
///
/// Hops are dispatched through a semaphore of capacity `chops`; each hop
/// token (TTL plus addressing key) is built inside the dispatch loop, the
/// single serialized assignment point. Completed hops arrive at one
/// consumer, which inserts, stably re-sorts by index, and prints every
/// newly gap-free prefix hop, guaranteeing strictly increasing printed
/// order no matter how hops complete.
///
/// Termination: success once a printed (hence gap-free) hop is terminal;
/// hop-limit exhaustion once every hop in the range completed without one.
/// A hop error aborts immediately, wrapped with the offending TTL.
pub async fn trace_hops(
    cfg: &TracerConfig,
    transport: Arc<dyn ProbeTransport>,
    reverse: Arc<dyn ReverseResolver>,
    printer: &mut dyn HopPrinter,
) -> Result<TraceReport, TrouteError> {
    cfg.validate()?;

    let total = cfg.hop_count();
    let echo_id = (std::process::id() & 0xffff) as u16;
    let admission = Arc::new(Semaphore::new(cfg.chops));
    let (hop_tx, mut hop_rx) = mpsc::channel::<Result<Hop, (u8, TrouteError)>>(total);

    let dispatcher = {
        let cfg = cfg.clone();
        let transport = transport.clone();
        let reverse = reverse.clone();

        tokio::spawn(async move {
            for index in 0..total {
                let Ok(permit) = admission.clone().acquire_owned().await else {
                    return;
                };
                // TTL and addressing key are bound to this hop before it
                // may send; hops run concurrently only after this point.
                let token = HopToken::assign(&cfg, echo_id, index);
                let ttl = token.ttl;
                let transport = transport.clone();
                let reverse = reverse.clone();
                let tx = hop_tx.clone();
                let (nprobes, cprobes, timeout) = (cfg.nprobes, cfg.cprobes, cfg.probe_timeout);

                tokio::spawn(async move {
                    let result =
                        execute_hop(transport, reverse, token, nprobes, cprobes, timeout).await;
                    let _ = tx.send(result.map_err(|e| (ttl, e))).await;
                    drop(permit);
                });
            }
        })
    };
    let _dispatch_guard = AbortOnDrop(dispatcher);

    let mut assembled: Vec<Hop> = Vec::with_capacity(total);
    let mut printed = 0usize;
    let mut completed = 0usize;

    while let Some(result) = hop_rx.recv().await {
        let hop = result.map_err(|(ttl, source)| TrouteError::Hop {
            ttl,
            source: Box::new(source),
        })?;

        debug!(index = hop.index, "hop completed");
        completed += 1;
        assembled.push(hop);
        assembled.sort_by_key(|h| h.index);

        while printed < assembled.len() && assembled[printed].index == printed {
            printer.print_hop(&assembled[printed]);
            let terminal = assembled[printed].is_terminal();
            printed += 1;

            if terminal {
                return Ok(TraceReport {
                    outcome: TraceOutcome::DestinationReached,
                    hops: assembled,
                });
            }
        }

        if completed == total {
            return Ok(TraceReport {
                outcome: TraceOutcome::HopLimitReached,
                hops: assembled,
            });
        }
    }

    Err(TrouteError::Internal(
        "hop results channel closed before termination".to_string(),
    ))
}
