//! Network session adaptor trait and its parameter types

use crate::events::SessionEvent;
use crate::socket::DatagramSocket;
use async_trait::async_trait;
use enlite_core::EnliteResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Route-B credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsunId {
    pub id: String,
    pub password: String,
}

/// Adaptor-specific connection parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsunConfig {
    /// Device the adaptor is attached to, e.g. a serial port
    pub device: String,
}

/// The part of a PAN descriptor worth remembering between sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsunCache {
    pub channel: u8,
    pub pan_id: u16,
    pub addr: String,
}

/// PAN descriptor returned by a successful session establishment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanDescriptor {
    pub channel: u8,
    pub pan_id: u16,
    pub addr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair_id: Option<String>,
    #[serde(default, rename = "LQI", skip_serializing_if = "Option::is_none")]
    pub lqi: Option<u8>,
}

impl PanDescriptor {
    /// Create a descriptor with only the cached fields set
    pub fn new(channel: u8, pan_id: u16, addr: impl Into<String>) -> Self {
        Self {
            channel,
            pan_id,
            addr: addr.into(),
            page: None,
            pair_id: None,
            lqi: None,
        }
    }

    /// Get the fields to be cached
    pub fn cache(&self) -> WsunCache {
        WsunCache {
            channel: self.channel,
            pan_id: self.pan_id,
            addr: self.addr.clone(),
        }
    }
}

impl From<&WsunCache> for PanDescriptor {
    fn from(cache: &WsunCache) -> Self {
        Self::new(cache.channel, cache.pan_id, cache.addr.clone())
    }
}

/// Network session adaptor
///
/// An adaptor owns the link to the wireless module. It establishes the
/// session, creates datagram sockets over it, and publishes session
/// lifecycle events.
#[async_trait]
pub trait WsunAdaptor: Send + Sync {
    /// Model name the adaptor is selected by in the configuration
    fn model(&self) -> &str;

    /// Establish a session
    ///
    /// # Arguments
    /// * `id` - Credentials
    /// * `cache` - PAN descriptor cached from a previous session, if any,
    ///   to skip the active scan
    ///
    /// # Returns
    /// The descriptor of the joined PAN, or `None` if no session could be
    /// established
    async fn open(&self, id: &WsunId, cache: Option<&WsunCache>) -> EnliteResult<Option<PanDescriptor>>;

    /// Close the session
    async fn close(&self) -> EnliteResult<()>;

    /// Check whether a session is established
    fn is_online(&self) -> bool;

    /// Create a datagram socket over the session
    fn create_socket(&self) -> Arc<dyn DatagramSocket>;

    /// Subscribe to session lifecycle events
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}
