//! Raw-socket probe transport.

use crate::classifier::IcmpClassifier;
use crate::protocol::ProbeProto;
use crate::router::ReplyRouter;
use async_trait::async_trait;
use socket2::{Domain, Protocol as SockProtocol, SockAddr, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::trace;
use troute_core::{
    HopToken, IpFamily, PendingReply, ProbeTransport, Protocol, TrouteError,
};

/// Transport backed by a raw ICMP listening socket (owned by the reply
/// router) and a separate protocol-specific send socket.
///
/// Opened exactly once per trace; both sockets are released on [`close`]
/// and on drop.
///
/// [`close`]: ProbeTransport::close
#[derive(Debug)]
pub struct IcmpTransport {
    dst: IpAddr,
    proto: ProbeProto,
    send: Mutex<SendSocket>,
    send_deadline: Duration,
    router: ReplyRouter,
}

impl IcmpTransport {
    /// Opens the listening and send sockets for the given destination.
    /// Requires raw-socket privileges. `send_deadline` bounds each
    /// nonblocking send; the probe timeout is the natural value.
    pub fn open(
        family: IpFamily,
        protocol: Protocol,
        dst: IpAddr,
        send_deadline: Duration,
    ) -> Result<Self, TrouteError> {
        let proto = ProbeProto::for_config(protocol, family)?;

        let listen = open_raw_icmp(family)?;
        let router = ReplyRouter::spawn(listen, IcmpClassifier::new(family));

        let socket = match proto {
            ProbeProto::Udp => open_udp_send(family)?,
            ProbeProto::Icmp { .. } => open_raw_icmp(family)?,
        };

        Ok(Self {
            dst,
            proto,
            send: Mutex::new(SendSocket { socket, family }),
            send_deadline,
            router,
        })
    }
}

#[async_trait]
impl ProbeTransport for IcmpTransport {
    async fn send_probe(&self, token: &HopToken) -> Result<PendingReply, TrouteError> {
        let rx = self.router.subscribe(token.key);
        let request = self.proto.build_request(token)?;
        let dest = self.proto.destination(self.dst, token);

        // The hop-limit write and the send form one exclusive section so
        // concurrently executing hops cannot interleave between them.
        let send = self.send.lock().await;
        send.apply_ttl(token.ttl)?;
        let sent_at = Instant::now();
        send.send_to(&request, dest, self.send_deadline).await?;
        drop(send);

        trace!(ttl = token.ttl, dest = %dest, "probe sent");

        Ok(PendingReply { sent_at, rx })
    }

    async fn close(&self) -> Result<(), TrouteError> {
        self.router.shutdown();
        Ok(())
    }
}

#[derive(Debug)]
struct SendSocket {
    socket: Socket,
    family: IpFamily,
}

impl SendSocket {
    fn apply_ttl(&self, ttl: u8) -> Result<(), TrouteError> {
        let result = match self.family {
            IpFamily::V4 => self.socket.set_ttl(u32::from(ttl)),
            IpFamily::V6 => self.socket.set_unicast_hops_v6(u32::from(ttl)),
        };
        result.map_err(|e| TrouteError::Internal(format!("setting hop limit: {e}")))
    }

    async fn send_to(
        &self,
        request: &[u8],
        dest: SocketAddr,
        deadline: Duration,
    ) -> Result<(), TrouteError> {
        let addr = SockAddr::from(dest);
        drive_send(|| self.socket.send_to(request, &addr), deadline).await
    }
}

/// Retries a nonblocking send across `WouldBlock` until it completes or the
/// deadline passes. The send mutex is held for the whole attempt, so the
/// bound also caps how long one probe can stall the others.
async fn drive_send<F>(mut attempt: F, deadline: Duration) -> Result<(), TrouteError>
where
    F: FnMut() -> std::io::Result<usize>,
{
    let give_up = Instant::now() + deadline;
    loop {
        match attempt() {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if Instant::now() >= give_up {
                    return Err(TrouteError::WriteFailed(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "send deadline exceeded",
                    )));
                }
                tokio::task::yield_now().await;
            }
            Err(e) => return Err(TrouteError::WriteFailed(e)),
        }
    }
}

fn open_raw_icmp(family: IpFamily) -> Result<Socket, TrouteError> {
    let (domain, proto) = match family {
        IpFamily::V4 => (Domain::IPV4, SockProtocol::ICMPV4),
        IpFamily::V6 => (Domain::IPV6, SockProtocol::ICMPV6),
    };

    let socket =
        Socket::new(domain, Type::RAW, Some(proto)).map_err(TrouteError::SocketCreation)?;
    socket
        .set_nonblocking(true)
        .map_err(TrouteError::SocketCreation)?;

    let wildcard = wildcard_addr(family);
    socket
        .bind(&SockAddr::from(wildcard))
        .map_err(|e| TrouteError::SocketBind {
            addr: wildcard.ip(),
            source: e,
        })?;

    Ok(socket)
}

fn open_udp_send(family: IpFamily) -> Result<Socket, TrouteError> {
    let domain = match family {
        IpFamily::V4 => Domain::IPV4,
        IpFamily::V6 => Domain::IPV6,
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(SockProtocol::UDP))
        .map_err(TrouteError::SocketCreation)?;
    socket
        .set_nonblocking(true)
        .map_err(TrouteError::SocketCreation)?;

    let wildcard = wildcard_addr(family);
    socket
        .bind(&SockAddr::from(wildcard))
        .map_err(|e| TrouteError::SocketBind {
            addr: wildcard.ip(),
            source: e,
        })?;

    Ok(socket)
}

fn wildcard_addr(family: IpFamily) -> SocketAddr {
    match family {
        IpFamily::V4 => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        IpFamily::V6 => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_transport_is_rejected_before_sockets_open() {
        let dst: IpAddr = "192.0.2.1".parse().unwrap();
        let err = IcmpTransport::open(IpFamily::V4, Protocol::Tcp, dst, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, TrouteError::Unsupported(_)));
    }

    #[test]
    fn test_wildcard_addr_matches_family() {
        assert!(wildcard_addr(IpFamily::V4).ip().is_ipv4());
        assert!(wildcard_addr(IpFamily::V6).ip().is_ipv6());
    }

    #[tokio::test]
    async fn test_send_deadline_bounds_a_persistently_full_buffer() {
        let err = drive_send(
            || Err(std::io::Error::from(std::io::ErrorKind::WouldBlock)),
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();

        match err {
            TrouteError::WriteFailed(e) => assert_eq!(e.kind(), std::io::ErrorKind::TimedOut),
            other => panic!("expected write failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_retries_across_transient_wouldblock() {
        let mut attempts = 0;
        let result = drive_send(
            || {
                attempts += 1;
                if attempts < 3 {
                    Err(std::io::Error::from(std::io::ErrorKind::WouldBlock))
                } else {
                    Ok(0)
                }
            },
            Duration::from_secs(1),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_send_surfaces_hard_errors_immediately() {
        let err = drive_send(
            || Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied)),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();

        match err {
            TrouteError::WriteFailed(e) => {
                assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied)
            }
            other => panic!("expected write failure, got {other:?}"),
        }
    }
}
