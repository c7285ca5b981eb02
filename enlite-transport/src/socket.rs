//! Datagram socket trait for the transport layer

use async_trait::async_trait;
use enlite_core::EnliteResult;
use tokio::sync::mpsc;

/// A datagram received from a remote node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Payload bytes
    pub data: Vec<u8>,
    /// Address of the sender, as the transport spells it
    pub address: String,
}

impl Datagram {
    /// Create a new datagram
    pub fn new(data: Vec<u8>, address: impl Into<String>) -> Self {
        Self {
            data,
            address: address.into(),
        }
    }
}

/// Byte-datagram channel to remote nodes
///
/// Sockets are shared between the receive loop and every sender, so all
/// operations take `&self`.
#[async_trait]
pub trait DatagramSocket: Send + Sync {
    /// Bind to a local port and start receiving
    ///
    /// # Returns
    /// The stream of inbound datagrams, in arrival order. The stream ends
    /// when the socket is closed.
    async fn bind(&self, port: u16) -> EnliteResult<mpsc::Receiver<Datagram>>;

    /// Send a datagram
    ///
    /// # Errors
    /// Returns `EnliteError::SendFailed` if the transport reports that the
    /// transmission did not go through
    async fn send(&self, msg: &[u8], port: u16, address: &str) -> EnliteResult<()>;

    /// Close the socket
    async fn close(&self) -> EnliteResult<()>;
}
