//! Remote device proxy
//!
//! A [`Device`] stands in for one object on a remote node. It issues GET
//! requests correlated by TID, waits for the matching GET_RES with a
//! timeout, retries on timeouts and transmission failures, and answers
//! INFC notifications.
//!
//! # Read state machine
//!
//! Each proxy has a single read slot:
//!
//! ```text
//! Idle --read_once--> AwaitingResponse{tid} --GET_RES(tid)--> Resolved --> Idle
//!                                           --timeout-------> TimedOut --> Idle
//! ```
//!
//! [`Device::read`] runs single attempts until one resolves, an error that
//! is not retryable occurs, or the attempt budget of the [`ReadPolicy`] is
//! spent. Only one read is outstanding per proxy: reads hold a gate for
//! their whole retry loop, so concurrent reads on the same proxy queue up
//! in order and never share the slot.

use crate::node::{FrameHandler, Node, SendToRemote};
use async_trait::async_trait;
use enlite_core::{ClassCode, Eoj, EnliteError, EnliteResult, Epc, Esv, Frame, FrameParams, Property};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, oneshot};

/// Maximum width of a numeric property value in bytes
pub const MAX_NUMERIC_WIDTH: usize = 6;

/// Timeout and retry settings of a property read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPolicy {
    /// How long a single attempt waits for GET_RES
    pub timeout: Duration,
    /// Total number of attempts, including the first
    pub attempts: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// State of the read slot
#[derive(Debug)]
enum ReadState {
    Idle,
    AwaitingResponse {
        tid: u16,
        responder: oneshot::Sender<Vec<Property>>,
    },
}

/// Proxy for an object on a remote node
pub struct Device {
    node: Node,
    address: String,
    sender: Arc<dyn SendToRemote>,
    policy: ReadPolicy,
    read_gate: Mutex<()>,
    state: Mutex<ReadState>,
}

impl Device {
    /// Create a new device proxy
    ///
    /// # Arguments
    /// * `sender` - Outbound path, normally the controller
    /// * `address` - Address of the remote node
    /// * `class_code` - Class of the remote object
    /// * `instance_code` - Instance of the remote object, from 1 to 255
    ///
    /// # Errors
    /// Returns `EnliteError::InvalidIdentity` if the instance code is out of
    /// range
    pub fn new(
        sender: Arc<dyn SendToRemote>,
        address: impl Into<String>,
        class_code: ClassCode,
        instance_code: u16,
    ) -> EnliteResult<Self> {
        let id = Eoj::new(class_code, instance_code)?;
        let address = address.into();
        log::debug!("device {} at {}: created", id, address);
        Ok(Self {
            node: Node::new(id),
            address,
            sender,
            policy: ReadPolicy::default(),
            read_gate: Mutex::new(()),
            state: Mutex::new(ReadState::Idle),
        })
    }

    /// Replace the read policy
    pub fn with_policy(mut self, policy: ReadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Get the object identifier
    pub fn id(&self) -> Eoj {
        self.node.id()
    }

    /// Get the address of the remote node
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Check whether the proxy is open
    pub fn is_open(&self) -> bool {
        self.node.is_open()
    }

    /// Open the proxy; responses and notifications are only handled while open
    pub fn open(&self) -> bool {
        self.node.open()
    }

    /// Close the proxy
    ///
    /// A read still waiting for its response fails with
    /// `EnliteError::ReadTimeout`.
    pub async fn close(&self) -> bool {
        *self.state.lock().await = ReadState::Idle;
        self.node.close()
    }

    /// Send a frame through the sender
    pub async fn send(&self, params: FrameParams, address: &str) -> EnliteResult<()> {
        self.sender.send(params, address).await
    }

    /// Read properties, retrying according to the read policy
    ///
    /// Waits for any read already running on this proxy to finish first.
    ///
    /// # Errors
    /// * `EnliteError::ReadTimeout` if no attempt got its response
    /// * `EnliteError::SendFailed` if the last attempt could not be sent
    /// * any other error of the sender, without retrying
    pub async fn read(&self, properties: &[Property]) -> EnliteResult<Vec<Property>> {
        log::debug!("device {}: read", self.id());
        let _gate = self.read_gate.lock().await;
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(properties).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    log::info!("enlite: read from {} failed ({}), retry {}", self.id(), e, attempt);
                    attempt += 1;
                    tokio::time::sleep(self.policy.delay).await;
                }
                Err(e) => {
                    log::warn!("enlite: failed to read properties from {}: {}", self.id(), e);
                    return Err(e);
                }
            }
        }
    }

    /// Single read attempt without retry
    ///
    /// Waits for any read already running on this proxy to finish first.
    pub async fn read_once(&self, properties: &[Property]) -> EnliteResult<Vec<Property>> {
        let _gate = self.read_gate.lock().await;
        self.attempt(properties).await
    }

    /// Allocate a TID, install the responder in the read slot, send a GET to
    /// this object and wait for the matching GET_RES or the timeout
    ///
    /// The caller holds the read gate. The slot is cleared on every exit
    /// path.
    async fn attempt(&self, properties: &[Property]) -> EnliteResult<Vec<Property>> {
        let tid = self.node.next_tid();
        let (responder, response) = oneshot::channel();
        *self.state.lock().await = ReadState::AwaitingResponse { tid, responder };

        let params = FrameParams::new(Esv::Get, properties.to_vec())
            .with_tid(tid)
            .with_deoj(self.id());
        let result = match self.send(params, &self.address).await {
            Ok(()) => match tokio::time::timeout(self.policy.timeout, response).await {
                Ok(Ok(properties)) => Ok(properties),
                Ok(Err(_)) | Err(_) => Err(EnliteError::ReadTimeout),
            },
            Err(e) => Err(e),
        };

        let mut state = self.state.lock().await;
        if matches!(&*state, ReadState::AwaitingResponse { tid: pending, .. } if *pending == tid) {
            *state = ReadState::Idle;
        }
        result
    }

    /// Read a single numeric property
    ///
    /// # Arguments
    /// * `epc` - Property to read
    /// * `width` - Expected payload width in bytes, from 1 to 6
    ///
    /// # Returns
    /// The big-endian signed value of the first returned property with the
    /// requested code and exactly `width` bytes of payload, or `None` if
    /// there is no such property
    pub async fn read_numeric(&self, epc: Epc, width: usize) -> EnliteResult<Option<i64>> {
        if width == 0 || width > MAX_NUMERIC_WIDTH {
            return Err(EnliteError::Format(format!(
                "numeric width must be 1 to {}, got {}",
                MAX_NUMERIC_WIDTH, width
            )));
        }
        let response = self.read(&[Property::new(epc)]).await?;
        Ok(response
            .iter()
            .filter(|property| property.epc() == epc)
            .find_map(|property| property.edt().filter(|edt| edt.len() == width))
            .map(read_int_be))
    }

    async fn resolve(&self, address: &str, frame: &Frame) {
        let tid = self.node.current_tid();
        if frame.tid() != tid {
            log::info!(
                "enlite: unexpected tid received from {}, expected {:04X} got {:04X}",
                address,
                tid,
                frame.tid()
            );
            return;
        }
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, ReadState::Idle) {
            ReadState::AwaitingResponse { tid: pending, responder } if pending == tid => {
                // the reader may have timed out already
                let _ = responder.send(frame.properties());
            }
            other => {
                log::debug!("device {}: no read waiting for {:04X}", self.id(), tid);
                *state = other;
            }
        }
    }
}

/// Decode a big-endian two's complement integer of up to 8 bytes
fn read_int_be(bytes: &[u8]) -> i64 {
    let value = bytes.iter().fold(0i64, |acc, byte| acc << 8 | i64::from(*byte));
    let shift = 64 - 8 * bytes.len() as u32;
    (value << shift) >> shift
}

#[async_trait]
impl FrameHandler for Device {
    fn node(&self) -> &Node {
        &self.node
    }

    async fn on_get_response(&self, address: &str, frame: &Frame) -> EnliteResult<()> {
        log::debug!("device {}: on_get_response {}", self.id(), frame);
        self.resolve(address, frame).await;
        Ok(())
    }

    async fn on_notify_confirm(&self, address: &str, frame: &Frame) -> EnliteResult<()> {
        log::info!("enlite: notification from {}: {}", address, frame);
        self.send(frame.confirmed(), address).await
    }
}

/// A device proxy as seen by the controller and the application
///
/// Concrete device classes wrap a [`Device`] and implement this trait so
/// they can be routed to, created by a registered factory, and recovered
/// from a `dyn RemoteDevice` with [`as_any`](RemoteDevice::as_any).
#[async_trait]
pub trait RemoteDevice: FrameHandler {
    /// The wrapped proxy
    fn device(&self) -> &Device;

    /// Upcast for downcasting to the concrete device class
    fn as_any(&self) -> &dyn Any;

    /// Upcast an owned handle for downcasting to the concrete device class
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Open the device
    async fn open(&self) -> bool {
        self.device().open()
    }

    /// Close the device
    async fn close(&self) -> bool {
        self.device().close().await
    }
}

#[async_trait]
impl RemoteDevice for Device {
    fn device(&self) -> &Device {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id())
            .field("address", &self.address)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Constructor registered for a device class
///
/// Called with the sender, the remote address, the class code and the
/// instance code of a discovered object.
pub type DeviceFactory = Arc<
    dyn Fn(Arc<dyn SendToRemote>, &str, ClassCode, u16) -> EnliteResult<Arc<dyn RemoteDevice>>
        + Send
        + Sync,
>;

/// Factory for plain [`Device`] proxies
pub fn generic_device_factory() -> DeviceFactory {
    Arc::new(
        |sender: Arc<dyn SendToRemote>,
         address: &str,
         class_code: ClassCode,
         instance_code: u16|
         -> EnliteResult<Arc<dyn RemoteDevice>> {
            Ok(Arc::new(Device::new(sender, address, class_code, instance_code)?))
        },
    )
}

/// Shared test doubles
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tokio::sync::mpsc;

    /// Sender that records every request and answers with a fixed result
    pub struct FakeSender {
        requests: mpsc::UnboundedSender<(FrameParams, String)>,
        result: fn() -> EnliteResult<()>,
    }

    impl FakeSender {
        pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<(FrameParams, String)>) {
            Self::with_result(|| Ok(()))
        }

        pub fn with_result(
            result: fn() -> EnliteResult<()>,
        ) -> (Arc<Self>, mpsc::UnboundedReceiver<(FrameParams, String)>) {
            let (requests, rx) = mpsc::unbounded_channel();
            (Arc::new(Self { requests, result }), rx)
        }
    }

    #[async_trait]
    impl SendToRemote for FakeSender {
        async fn send(&self, params: FrameParams, address: &str) -> EnliteResult<()> {
            let _ = self.requests.send((params, address.to_string()));
            (self.result)()
        }
    }

    pub fn fast_policy(attempts: u32) -> ReadPolicy {
        ReadPolicy {
            timeout: Duration::from_millis(100),
            attempts,
            delay: Duration::from_millis(10),
        }
    }

    /// Build the GET_RES a remote object would send for `request`
    pub fn get_response(request: &FrameParams, tid: u16, properties: Vec<Property>) -> Frame {
        let params = FrameParams::new(Esv::GetRes, properties)
            .with_tid(tid)
            .with_seoj(request.deoj.unwrap_or(Eoj::from_raw(0)))
            .with_deoj(Eoj::from_raw(0x05ff01));
        Frame::create(&params).unwrap()
    }
}
