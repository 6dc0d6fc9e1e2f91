//! Single-hop execution: a bounded pool of probes for one TTL value.

use crate::execution::execute_probe;
use crate::{Hop, HopToken, ProbeTransport, ReverseResolver, TrouteError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tracing::debug;

/// Runs exactly `nprobes` probes for one hop, admitted by a semaphore of
/// capacity `cprobes`, and assembles the hop from the results in completion
/// order. Any probe-level I/O error (not timeout) aborts the hop verbatim.
pub(crate) async fn execute_hop(
    transport: Arc<dyn ProbeTransport>,
    reverse: Arc<dyn ReverseResolver>,
    token: HopToken,
    nprobes: usize,
    cprobes: usize,
    probe_timeout: Duration,
) -> Result<Hop, TrouteError> {
    let admission = Arc::new(Semaphore::new(cprobes));
    let (tx, mut rx) = mpsc::channel(nprobes);

    for _ in 0..nprobes {
        let admission = admission.clone();
        let transport = transport.clone();
        let reverse = reverse.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = admission.acquire_owned().await else {
                return;
            };
            let result =
                execute_probe(transport.as_ref(), reverse.as_ref(), &token, probe_timeout).await;
            let _ = tx.send(result).await;
        });
    }
    drop(tx);

    let mut probes = Vec::with_capacity(nprobes);
    while let Some(result) = rx.recv().await {
        probes.push(result?);
    }

    if probes.len() != nprobes {
        return Err(TrouteError::Internal(format!(
            "hop {} collected {} of {} probe results",
            token.index,
            probes.len(),
            nprobes
        )));
    }

    debug!(
        index = token.index,
        ttl = token.ttl,
        answered = probes.iter().filter(|p| p.valid).count(),
        "hop assembled"
    );

    Ok(Hop {
        index: token.index,
        probes,
    })
}
