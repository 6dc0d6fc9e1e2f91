//! Single-probe execution.

use crate::{HopToken, Probe, ProbeTransport, ReverseResolver, TrouteError};
use std::time::Duration;
use tokio::time::timeout;
use tracing::trace;

/// Issues one probe and produces one result.
///
/// A timeout is a normal outcome and yields the unanswered placeholder; a
/// send failure or a torn-down transport is fatal and propagated.
pub(crate) async fn execute_probe(
    transport: &dyn ProbeTransport,
    reverse: &dyn ReverseResolver,
    token: &HopToken,
    probe_timeout: Duration,
) -> Result<Probe, TrouteError> {
    let pending = transport.send_probe(token).await?;

    let reply = match timeout(probe_timeout, pending.rx).await {
        Err(_) => {
            trace!(ttl = token.ttl, "probe timed out");
            return Ok(Probe::unanswered());
        }
        // The reply router dropped our sender: the listening socket failed
        // or the transport was closed underneath us.
        Ok(Err(_)) => {
            return Err(TrouteError::ReceiveFailed(
                "reply channel closed before a response arrived".to_string(),
            ))
        }
        Ok(Ok(reply)) => reply,
    };

    let rtt = pending.sent_at.elapsed();
    let address = reply.source.to_string();
    let host = reverse.resolve(reply.source).await;

    trace!(
        ttl = token.ttl,
        source = %reply.source,
        class = ?reply.class,
        rtt_ms = rtt.as_secs_f64() * 1000.0,
        "probe answered"
    );

    Ok(Probe::answered(host, address, rtt, reply.class))
}
