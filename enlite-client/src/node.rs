//! Addressable object base
//!
//! Every local object (device proxy, controller, node profile) is built
//! around a [`Node`]: an identity, an open/closed flag and a transaction
//! counter. Inbound frames reach an object through [`FrameHandler::on_data`],
//! whose default routes by service code to three overridable handlers.

use async_trait::async_trait;
use enlite_core::{Eoj, EnliteResult, Esv, Frame, FrameParams};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

/// Identity, lifecycle and TID sequencing shared by all local objects
#[derive(Debug)]
pub struct Node {
    id: Eoj,
    open: AtomicBool,
    tid: AtomicU16,
}

impl Node {
    /// Create a closed node
    pub fn new(id: Eoj) -> Self {
        Self {
            id,
            open: AtomicBool::new(false),
            tid: AtomicU16::new(0),
        }
    }

    /// Get the object identifier
    pub fn id(&self) -> Eoj {
        self.id
    }

    /// Check whether the node is open
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Open the node
    ///
    /// # Returns
    /// `true` if the node went from closed to open, `false` if it was
    /// already open
    pub fn open(&self) -> bool {
        log::debug!("node {}: open", self.id);
        if self.open.swap(true, Ordering::SeqCst) {
            log::info!("enlite: {} is already opened", self.id);
            return false;
        }
        true
    }

    /// Close the node
    ///
    /// # Returns
    /// `true` if the node went from open to closed, `false` if it was not
    /// open
    pub fn close(&self) -> bool {
        log::debug!("node {}: close", self.id);
        if !self.open.swap(false, Ordering::SeqCst) {
            log::info!("enlite: {} is not opened", self.id);
            return false;
        }
        true
    }

    /// Allocate the next transaction ID
    ///
    /// The counter starts at 0 and wraps from 0xFFFF to 0, so the first call
    /// returns 1.
    pub fn next_tid(&self) -> u16 {
        self.tid.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    /// Get the last issued transaction ID
    pub fn current_tid(&self) -> u16 {
        self.tid.load(Ordering::SeqCst)
    }
}

/// Inbound frame handling for a local object
///
/// Implementors provide [`node`](FrameHandler::node) and override whichever
/// of the three service handlers they care about. The defaults do nothing.
#[async_trait]
pub trait FrameHandler: Send + Sync {
    /// The node backing this object
    fn node(&self) -> &Node;

    /// Handle a GET_RES frame
    async fn on_get_response(&self, address: &str, frame: &Frame) -> EnliteResult<()> {
        log::debug!("node {}: on_get_response from {}: {}", self.node().id(), address, frame);
        Ok(())
    }

    /// Handle an INF frame
    async fn on_notify(&self, address: &str, frame: &Frame) -> EnliteResult<()> {
        log::debug!("node {}: on_notify from {}: {}", self.node().id(), address, frame);
        Ok(())
    }

    /// Handle an INFC frame
    async fn on_notify_confirm(&self, address: &str, frame: &Frame) -> EnliteResult<()> {
        log::debug!("node {}: on_notify_confirm from {}: {}", self.node().id(), address, frame);
        Ok(())
    }

    /// Single inbound entry point
    async fn on_data(&self, address: &str, frame: &Frame) -> EnliteResult<()> {
        dispatch_frame(self, address, frame).await
    }
}

/// Route a frame to the handler for its service code
///
/// Does nothing if the node is closed. Service codes other than GET_RES,
/// INF and INFC are logged and ignored.
pub async fn dispatch_frame<H>(handler: &H, address: &str, frame: &Frame) -> EnliteResult<()>
where
    H: FrameHandler + ?Sized,
{
    if !handler.node().is_open() {
        return Ok(());
    }
    match frame.esv() {
        Esv::GetRes => handler.on_get_response(address, frame).await,
        Esv::Inf => handler.on_notify(address, frame).await,
        Esv::InfC => handler.on_notify_confirm(address, frame).await,
        esv => {
            log::debug!("node {}: unknown esv {:02X}, {}", handler.node().id(), esv.to_byte(), frame);
            Ok(())
        }
    }
}

/// Outbound path towards a remote node
#[async_trait]
pub trait SendToRemote: Send + Sync {
    /// Send a request to the node at `address`
    async fn send(&self, params: FrameParams, address: &str) -> EnliteResult<()>;
}
