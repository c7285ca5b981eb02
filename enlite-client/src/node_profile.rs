//! Local node profile object (0x0EF001)
//!
//! The node profile owns the datagram socket. Inbound frames addressed to
//! another local object go to the controller; frames addressed to the node
//! profile itself carry instance list notifications, which drive device
//! discovery.

use crate::controller::Controller;
use crate::device::RemoteDevice;
use crate::node::{FrameHandler, Node, SendToRemote, dispatch_frame};
use async_trait::async_trait;
use enlite_core::{ClassCode, Eoj, EnliteError, EnliteResult, Epc, Frame, FrameParams, PORT_ENLITE, Property};
use enlite_transport::{Datagram, DatagramSocket};
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;

/// Size of one entry of an instance list: class code (2) and instance code (1)
const INSTANCE_ENTRY_LENGTH: usize = 3;

/// Services the node profile needs from its owner
#[async_trait]
pub trait EnliteLocal: Send + Sync {
    /// Create a proxy for a discovered object
    ///
    /// # Returns
    /// `None` if no factory is registered for the class or the factory
    /// failed
    async fn create_device(
        &self,
        controller: Arc<Controller>,
        class_code: ClassCode,
        address: &str,
        instance_code: u16,
    ) -> Option<Arc<dyn RemoteDevice>>;

    /// Create the socket to bind
    fn create_socket(&self) -> Arc<dyn DatagramSocket>;
}

/// Front-end bound to the ECHONET Lite port
pub struct NodeProfile {
    node: Node,
    local: Arc<dyn EnliteLocal>,
    controller: RwLock<Option<Arc<Controller>>>,
    socket: RwLock<Option<Arc<dyn DatagramSocket>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl NodeProfile {
    /// Create a closed node profile
    pub fn new(local: Arc<dyn EnliteLocal>) -> Self {
        let id = Eoj::from_raw(u32::from(ClassCode::NODE_PROFILE.value()) << 8 | 0x01);
        log::debug!("nodeprofile {}: created", id);
        Self {
            node: Node::new(id),
            local,
            controller: RwLock::new(None),
            socket: RwLock::new(None),
            listener: Mutex::new(None),
        }
    }

    /// Get the object identifier
    pub fn id(&self) -> Eoj {
        self.node.id()
    }

    /// Check whether the node profile is open
    pub fn is_open(&self) -> bool {
        self.node.is_open()
    }

    /// Get the controller while open
    pub async fn controller(&self) -> Option<Arc<Controller>> {
        self.controller.read().await.clone()
    }

    /// Open the node profile with its controller
    ///
    /// Opens the controller, binds a new socket to port 3610 and starts
    /// feeding received frames to [`on_data`](FrameHandler::on_data) in
    /// arrival order.
    ///
    /// # Returns
    /// `Ok(false)` if the node profile or the controller is already open
    ///
    /// # Errors
    /// Returns the socket error if binding fails; nothing is left open
    pub async fn open(self: &Arc<Self>, controller: Arc<Controller>) -> EnliteResult<bool> {
        log::debug!("nodeprofile {}: open", self.id());
        if !self.node.open() {
            return Ok(false);
        }
        if !controller.open() {
            self.node.close();
            return Ok(false);
        }

        let socket = self.local.create_socket();
        let datagrams = match socket.bind(PORT_ENLITE).await {
            Ok(datagrams) => datagrams,
            Err(e) => {
                log::error!("enlite: failed to bind port {}: {}", PORT_ENLITE, e);
                controller.close().await;
                self.node.close();
                return Err(e);
            }
        };
        *self.controller.write().await = Some(controller);
        *self.socket.write().await = Some(socket);

        let handle = tokio::spawn(Self::listen(Arc::downgrade(self), datagrams));
        *self.listener.lock().await = Some(handle);
        Ok(true)
    }

    /// Stop listening, close the socket, then close the controller and
    /// with it every device proxy
    pub async fn close(&self) -> bool {
        log::debug!("nodeprofile {}: close", self.id());
        if !self.node.is_open() {
            return false;
        }
        let listener = self.listener.lock().await.take();
        if let Some(listener) = listener {
            listener.abort();
        }
        let socket = self.socket.write().await.take();
        if let Some(socket) = socket {
            if let Err(e) = socket.close().await {
                log::warn!("enlite: failed to close socket: {}", e);
            }
        }
        let controller = self.controller.write().await.take();
        if let Some(controller) = controller {
            controller.close().await;
        }
        self.node.close()
    }

    async fn listen(profile: Weak<Self>, mut datagrams: mpsc::Receiver<Datagram>) {
        while let Some(datagram) = datagrams.recv().await {
            let Some(profile) = profile.upgrade() else {
                break;
            };
            let frame = match Frame::decode(&datagram.data) {
                Ok(frame) => frame,
                Err(e) => {
                    log::info!("enlite: dropped datagram from {}: {}", datagram.address, e);
                    continue;
                }
            };
            log::debug!("nodeprofile: {} from {}", frame, datagram.address);
            if let Err(e) = profile.on_data(&datagram.address, &frame).await {
                log::warn!("enlite: failed to handle frame from {}: {}", datagram.address, e);
            }
        }
        log::debug!("nodeprofile: listener stopped");
    }

    async fn on_instance_list_notification(&self, address: &str, property: &Property) -> EnliteResult<()> {
        let Some(controller) = self.controller().await else {
            log::info!("enlite: not opened");
            return Ok(());
        };
        let Some((&count, entries)) = property.edt().and_then(|edt| edt.split_first()) else {
            log::debug!("nodeprofile: instance list without edt");
            return Ok(());
        };
        let count = usize::from(count);
        if entries.len() < count * INSTANCE_ENTRY_LENGTH {
            log::info!(
                "enlite: instance list from {} is truncated, {} entries announced, {} bytes present",
                address,
                count,
                entries.len()
            );
        }
        for entry in entries.chunks_exact(INSTANCE_ENTRY_LENGTH).take(count) {
            let class_code = ClassCode(u16::from_be_bytes([entry[0], entry[1]]));
            let instance_code = u16::from(entry[2]);
            if let Some(device) = self
                .local
                .create_device(controller.clone(), class_code, address, instance_code)
                .await
            {
                controller.add_device(device).await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FrameHandler for NodeProfile {
    fn node(&self) -> &Node {
        &self.node
    }

    async fn on_data(&self, address: &str, frame: &Frame) -> EnliteResult<()> {
        let controller = match self.controller().await {
            Some(controller) if self.node.is_open() => controller,
            _ => {
                log::info!("enlite: not opened");
                return Ok(());
            }
        };
        if frame.opc() == 0 {
            log::info!("enlite: a frame without properties received from {}", address);
            return Ok(());
        }
        if frame.deoj() != self.id() {
            return controller.on_data(address, frame).await;
        }
        dispatch_frame(self, address, frame).await
    }

    async fn on_notify(&self, address: &str, frame: &Frame) -> EnliteResult<()> {
        for property in frame.properties() {
            if property.epc() == Epc::INSTANCE_LIST_NOTIFICATION {
                return self.on_instance_list_notification(address, &property).await;
            }
            log::debug!("nodeprofile: unknown epc {}, {}", property.epc(), frame);
        }
        Ok(())
    }
}

#[async_trait]
impl SendToRemote for NodeProfile {
    async fn send(&self, params: FrameParams, address: &str) -> EnliteResult<()> {
        if !self.node.is_open() {
            log::info!("enlite: not opened");
            return Ok(());
        }
        let socket = self
            .socket
            .read()
            .await
            .clone()
            .ok_or_else(|| EnliteError::Internal("no socket to send".to_string()))?;
        let frame = Frame::create(&params)?;
        log::debug!("nodeprofile: send {} to {}", frame, address);
        socket.send(frame.as_bytes(), PORT_ENLITE, address).await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use enlite_core::Esv;

    const REMOTE: &str = "FE80:0000:0000:0000:021D:1290:0003:C890";

    async fn opened() -> (Arc<NodeProfile>, Arc<Controller>, Arc<FakeLocal>) {
        let local = FakeLocal::new();
        let profile = Arc::new(NodeProfile::new(local.clone()));
        let controller = Arc::new(Controller::new(profile.clone()));
        assert!(profile.open(controller.clone()).await.unwrap());
        (profile, controller, local)
    }

    fn instance_list(edt: Vec<u8>) -> Frame {
        let params = FrameParams::new(Esv::Inf, vec![Property::with_data(Epc::INSTANCE_LIST_NOTIFICATION, edt)])
            .with_tid(0)
            .with_seoj(Eoj::from_raw(0x0ef001))
            .with_deoj(Eoj::from_raw(0x0ef001));
        Frame::create(&params).unwrap()
    }

    #[tokio::test]
    async fn test_open_binds_port_and_close_cascades() {
        let (profile, controller, local) = opened().await;
        assert_eq!(profile.id(), Eoj::from_raw(0x0ef001));
        assert!(profile.is_open());
        assert!(controller.is_open());
        assert_eq!(*local.socket.bound.lock().await, Some(PORT_ENLITE));
        assert!(!profile.open(controller.clone()).await.unwrap());

        assert!(profile.close().await);
        assert!(!profile.is_open());
        assert!(!controller.is_open());
        assert!(*local.socket.closed.lock().await);
        assert!(profile.controller().await.is_none());
        assert!(!profile.close().await);
    }

    #[tokio::test]
    async fn test_discovery_creates_devices() {
        let (profile, controller, _local) = opened().await;
        let frame = instance_list(vec![0x02, 0x02, 0x88, 0x01, 0x02, 0x88, 0x02]);
        profile.on_data(REMOTE, &frame).await.unwrap();

        assert_eq!(controller.device_count().await, 2);
        assert!(controller.lookup(REMOTE, Eoj::from_raw(0x028801)).await.is_some());
        assert!(controller.lookup(REMOTE, Eoj::from_raw(0x028802)).await.is_some());

        // the same list again adds nothing
        profile.on_data(REMOTE, &frame).await.unwrap();
        assert_eq!(controller.device_count().await, 2);
        profile.close().await;
    }

    #[tokio::test]
    async fn test_discovery_skips_unregistered_and_truncated() {
        let (profile, controller, _local) = opened().await;
        let frame = instance_list(vec![0x04, 0x01, 0x30, 0x01, 0x02, 0x88, 0x01, 0x02, 0x88]);
        profile.on_data(REMOTE, &frame).await.unwrap();
        assert_eq!(controller.device_count().await, 1);

        let frame = instance_list(vec![0x00]);
        profile.on_data(REMOTE, &frame).await.unwrap();
        assert_eq!(controller.device_count().await, 1);
        profile.close().await;
    }

    #[tokio::test]
    async fn test_frame_without_properties_dropped() {
        let (profile, controller, _local) = opened().await;
        let params = FrameParams::new(Esv::Inf, Vec::new())
            .with_tid(0)
            .with_seoj(Eoj::from_raw(0x0ef001))
            .with_deoj(Eoj::from_raw(0x0ef001));
        profile.on_data(REMOTE, &Frame::create(&params).unwrap()).await.unwrap();
        assert_eq!(controller.device_count().await, 0);
        profile.close().await;
    }

    #[tokio::test]
    async fn test_frames_for_devices_go_to_controller() {
        let (profile, controller, local) = opened().await;
        profile
            .on_data(REMOTE, &instance_list(vec![0x01, 0x02, 0x88, 0x01]))
            .await
            .unwrap();
        let device = controller.lookup(REMOTE, Eoj::from_raw(0x028801)).await.unwrap();
        device.open().await;

        let params = FrameParams::new(
            Esv::InfC,
            vec![Property::with_data(Epc::INSTANTANEOUS_ELECTRIC_ENERGY, vec![0, 0, 0, 1])],
        )
        .with_tid(0x10)
        .with_seoj(Eoj::from_raw(0x028801))
        .with_deoj(Eoj::from_raw(0x05ff01));
        profile.on_data(REMOTE, &Frame::create(&params).unwrap()).await.unwrap();

        let sent = local.socket.sent.lock().await;
        assert_eq!(sent.len(), 1);
        let (frame, port, address) = &sent[0];
        assert_eq!(*port, PORT_ENLITE);
        assert_eq!(address, REMOTE);
        assert_eq!(frame.esv(), Esv::InfCRes);
        assert_eq!(frame.seoj(), Eoj::from_raw(0x05ff01));
        assert_eq!(frame.deoj(), Eoj::from_raw(0x028801));
        assert_eq!(frame.tid(), 0x10);
    }

    #[tokio::test]
    async fn test_send_when_closed_is_noop() {
        let local = FakeLocal::new();
        let profile = NodeProfile::new(local.clone());
        let params = FrameParams::new(Esv::Get, vec![Property::new(Epc::UNIT)])
            .with_tid(1)
            .with_seoj(Eoj::from_raw(0x05ff01))
            .with_deoj(Eoj::from_raw(0x028801));
        profile.send(params, REMOTE).await.unwrap();
        assert!(local.socket.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_send_incomplete_params() {
        let (profile, _controller, _local) = opened().await;
        let params = FrameParams::new(Esv::Get, vec![Property::new(Epc::UNIT)]).with_tid(1);
        assert!(matches!(
            profile.send(params, REMOTE).await,
            Err(EnliteError::IncompleteParameters(_))
        ));
        profile.close().await;
    }

    #[tokio::test]
    async fn test_listener_decodes_datagrams() {
        let (profile, controller, local) = opened().await;
        local.socket.inject(vec![0x10, 0x81, 0x00], REMOTE).await;
        let frame = instance_list(vec![0x01, 0x02, 0x88, 0x01]);
        local.socket.inject(frame.as_bytes().to_vec(), REMOTE).await;

        let controller_ref = controller.clone();
        assert!(wait_until(|| {
            let controller = controller_ref.clone();
            async move { controller.device_count().await == 1 }
        })
        .await);
        profile.close().await;
    }
}
