//! Dedicated reply router: the sole reader of the ICMP listening socket.
//!
//! Every inbound message is classified once and routed to the specific
//! probe waiting for its key through a one-shot channel; probes never read
//! the shared socket themselves, so a reply can never be consumed by a
//! probe that did not send the matching request.

use crate::classifier::IcmpClassifier;
use socket2::Socket;
use std::collections::{HashMap, VecDeque};
use std::mem::MaybeUninit;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use troute_core::{IcmpReply, ProbeKey};

const READ_BUFFER_LEN: usize = 1500;
const POLL_INTERVAL: Duration = Duration::from_millis(1);

type WaiterMap = Arc<Mutex<HashMap<ProbeKey, VecDeque<oneshot::Sender<IcmpReply>>>>>;

#[derive(Debug)]
pub(crate) struct ReplyRouter {
    waiters: WaiterMap,
    task: JoinHandle<()>,
}

impl ReplyRouter {
    /// Takes ownership of the listening socket and starts the reader task.
    pub(crate) fn spawn(socket: Socket, classifier: IcmpClassifier) -> Self {
        let waiters: WaiterMap = Arc::new(Mutex::new(HashMap::new()));
        let task = tokio::spawn(run(socket, classifier, waiters.clone()));
        Self { waiters, task }
    }

    /// Registers interest in the next reply carrying `key`.
    pub(crate) fn subscribe(&self, key: ProbeKey) -> oneshot::Receiver<IcmpReply> {
        let (tx, rx) = oneshot::channel();
        self.waiters
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push_back(tx);
        rx
    }

    /// Stops the reader and wakes every pending probe with a closed
    /// channel.
    pub(crate) fn shutdown(&self) {
        self.task.abort();
        self.waiters.lock().unwrap().clear();
    }
}

impl Drop for ReplyRouter {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(socket: Socket, classifier: IcmpClassifier, waiters: WaiterMap) {
    let mut buffer = [MaybeUninit::<u8>::uninit(); READ_BUFFER_LEN];

    loop {
        let (len, addr) = match socket.recv_from(&mut buffer) {
            Ok(pair) => pair,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                tokio::time::sleep(POLL_INTERVAL).await;
                continue;
            }
            Err(e) => {
                warn!(error = %e, "icmp listener read failed, stopping reply router");
                break;
            }
        };

        // recv_from initialized the first `len` bytes.
        let bytes = unsafe { std::slice::from_raw_parts(buffer.as_ptr() as *const u8, len) };

        let info = match classifier.classify(bytes) {
            Ok(info) => info,
            // A malformed packet invalidates at most the probe that never
            // gets its reply; it does not abort the trace.
            Err(e) => {
                debug!(error = %e, "discarding unparseable icmp packet");
                continue;
            }
        };

        let Some(key) = info.key else {
            trace!(class = ?info.class, "icmp packet carries no probe key");
            continue;
        };
        let Some(source) = addr.as_socket().map(|s| s.ip()) else {
            continue;
        };

        deliver(&waiters, key, IcmpReply {
            source,
            class: info.class,
        });
    }

    // Dropping the senders surfaces a fatal receive error in every
    // in-flight probe.
    waiters.lock().unwrap().clear();
}

/// Hands the reply to the first still-waiting subscriber for `key`.
fn deliver(waiters: &WaiterMap, key: ProbeKey, reply: IcmpReply) {
    let mut map = waiters.lock().unwrap();
    let Some(queue) = map.get_mut(&key) else {
        trace!(?key, "no probe waiting for reply");
        return;
    };

    let mut reply = reply;
    while let Some(tx) = queue.pop_front() {
        match tx.send(reply) {
            Ok(()) => break,
            // That probe already timed out; try the next waiter.
            Err(unclaimed) => reply = unclaimed,
        }
    }

    if queue.is_empty() {
        map.remove(&key);
    }
}
