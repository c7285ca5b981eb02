//! UDP transport implementation
//!
//! ECHONET Lite nodes on an ordinary IP network need no session set-up, so
//! [`UdpAdaptor`] reports a session as soon as it is opened and hands out
//! [`UdpDatagramSocket`]s bound on the configured local address.

use crate::adaptor::{PanDescriptor, WsunAdaptor, WsunCache, WsunConfig, WsunId};
use crate::events::SessionEvent;
use crate::socket::{Datagram, DatagramSocket};
use async_trait::async_trait;
use enlite_core::{EnliteError, EnliteResult};
use std::net::{IpAddr, Ipv6Addr, SocketAddr, SocketAddrV6};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;

/// Maximum UDP payload size
pub const MAX_UDP_PAYLOAD_SIZE: usize = 65507;

const RECEIVE_QUEUE_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 16;

/// UDP transport layer settings
#[derive(Debug, Clone)]
pub struct UdpSettings {
    /// Local address to bind on
    pub local_address: IpAddr,
    /// Send timeout, `None` for no timeout
    pub send_timeout: Option<Duration>,
}

impl UdpSettings {
    /// Create new UDP settings
    pub fn new(local_address: IpAddr) -> Self {
        Self {
            local_address,
            send_timeout: Some(Duration::from_secs(5)),
        }
    }

    /// Create settings from adaptor configuration
    ///
    /// The `device` field is read as the local address to bind on; anything
    /// that is not an IP address falls back to the IPv6 unspecified address.
    pub fn from_config(config: &WsunConfig) -> Self {
        match config.device.parse::<IpAddr>() {
            Ok(address) => Self::new(address),
            Err(_) => Self::default(),
        }
    }
}

impl Default for UdpSettings {
    fn default() -> Self {
        Self::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED))
    }
}

/// Peer address text for a received datagram
///
/// IPv6 peers with a nonzero scope id keep it as a `%<scope>` suffix, so
/// link-local replies go back out of the interface they came in on.
fn peer_address(addr: &SocketAddr) -> String {
    match addr {
        SocketAddr::V6(v6) if v6.scope_id() != 0 => format!("{}%{}", v6.ip(), v6.scope_id()),
        _ => addr.ip().to_string(),
    }
}

/// Parse peer address text back into a socket address on `port`
///
/// Accepts plain IPv4/IPv6 text and IPv6 text with a numeric `%<scope>`
/// suffix as produced by [`peer_address`].
fn target_address(address: &str, port: u16) -> EnliteResult<SocketAddr> {
    let invalid = |e: &dyn std::fmt::Display| {
        EnliteError::Internal(format!("Invalid address {}: {}", address, e))
    };
    match address.split_once('%') {
        Some((ip, scope)) => {
            let ip: Ipv6Addr = ip.parse().map_err(|e| invalid(&e))?;
            let scope_id: u32 = scope.parse().map_err(|e| invalid(&e))?;
            Ok(SocketAddr::V6(SocketAddrV6::new(ip, port, 0, scope_id)))
        }
        None => {
            let ip: IpAddr = address.parse().map_err(|e| invalid(&e))?;
            Ok(SocketAddr::new(ip, port))
        }
    }
}

/// Datagram socket over tokio's `UdpSocket`
pub struct UdpDatagramSocket {
    settings: UdpSettings,
    socket: Mutex<Option<Arc<UdpSocket>>>,
    receiver: Mutex<Option<JoinHandle<()>>>,
}

impl UdpDatagramSocket {
    /// Create a new, unbound socket
    pub fn new(settings: UdpSettings) -> Self {
        Self {
            settings,
            socket: Mutex::new(None),
            receiver: Mutex::new(None),
        }
    }

    async fn receive_loop(socket: Arc<UdpSocket>, tx: mpsc::Sender<Datagram>) {
        let mut buf = vec![0u8; MAX_UDP_PAYLOAD_SIZE];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, addr)) => {
                    let datagram = Datagram::new(buf[..len].to_vec(), peer_address(&addr));
                    if tx.send(datagram).await.is_err() {
                        log::debug!("udp: receiver dropped, stop receiving");
                        break;
                    }
                }
                Err(e) => {
                    log::error!("udp: error receiving data: {}", e);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl DatagramSocket for UdpDatagramSocket {
    async fn bind(&self, port: u16) -> EnliteResult<mpsc::Receiver<Datagram>> {
        let mut slot = self.socket.lock().await;
        if slot.is_some() {
            return Err(EnliteError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Socket has already been bound",
            )));
        }
        let socket = Arc::new(
            UdpSocket::bind(SocketAddr::new(self.settings.local_address, port)).await?,
        );
        log::info!("udp: listening on {}", SocketAddr::new(self.settings.local_address, port));

        let (tx, rx) = mpsc::channel(RECEIVE_QUEUE_CAPACITY);
        let handle = tokio::spawn(Self::receive_loop(socket.clone(), tx));
        *self.receiver.lock().await = Some(handle);
        *slot = Some(socket);
        Ok(rx)
    }

    async fn send(&self, msg: &[u8], port: u16, address: &str) -> EnliteResult<()> {
        let socket = self.socket.lock().await.clone().ok_or_else(|| {
            EnliteError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "UDP socket not bound",
            ))
        })?;
        let target = target_address(address, port)?;

        let sent = match self.settings.send_timeout {
            Some(timeout) => tokio::time::timeout(timeout, socket.send_to(msg, target))
                .await
                .map_err(|_| EnliteError::SendFailed(format!("send to {} timed out", target)))?,
            None => socket.send_to(msg, target).await,
        };
        match sent {
            Ok(n) if n == msg.len() => Ok(()),
            Ok(n) => Err(EnliteError::SendFailed(format!(
                "sent {} of {} bytes to {}",
                n,
                msg.len(),
                target
            ))),
            Err(e) => Err(EnliteError::SendFailed(format!("send to {}: {}", target, e))),
        }
    }

    async fn close(&self) -> EnliteResult<()> {
        if let Some(handle) = self.receiver.lock().await.take() {
            handle.abort();
        }
        self.socket.lock().await.take();
        Ok(())
    }
}

/// Adaptor for ECHONET Lite over a plain IP network
pub struct UdpAdaptor {
    settings: UdpSettings,
    online: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

impl UdpAdaptor {
    /// Model name of this adaptor
    pub const MODEL: &'static str = "UDP";

    /// Create a new adaptor
    pub fn new(settings: UdpSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            settings,
            online: AtomicBool::new(false),
            events,
        }
    }

    fn emit(&self, event: SessionEvent) {
        // nobody listening is fine
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl WsunAdaptor for UdpAdaptor {
    fn model(&self) -> &str {
        Self::MODEL
    }

    async fn open(&self, _id: &WsunId, cache: Option<&WsunCache>) -> EnliteResult<Option<PanDescriptor>> {
        let descriptor = match cache {
            Some(cache) => PanDescriptor::from(cache),
            None => PanDescriptor::new(0, 0, self.settings.local_address.to_string()),
        };
        self.online.store(true, Ordering::SeqCst);
        self.emit(SessionEvent::Established);
        Ok(Some(descriptor))
    }

    async fn close(&self) -> EnliteResult<()> {
        if self.online.swap(false, Ordering::SeqCst) {
            self.emit(SessionEvent::Ended);
        }
        Ok(())
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn create_socket(&self) -> Arc<dyn DatagramSocket> {
        Arc::new(UdpDatagramSocket::new(self.settings.clone()))
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
