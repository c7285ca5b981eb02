//! Local controller object (0x05FF01)
//!
//! The controller owns the device proxies and routes inbound frames to the
//! proxy matching the sender's address and source object. Requests from the
//! proxies pass through it on the way out, where it stamps itself as SEOJ.

use crate::device::RemoteDevice;
use crate::node::{FrameHandler, Node, SendToRemote};
use async_trait::async_trait;
use enlite_core::{ClassCode, Eoj, EnliteError, EnliteResult, Frame, FrameParams};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Aggregator of device proxies
pub struct Controller {
    node: Node,
    upstream: Arc<dyn SendToRemote>,
    devices: RwLock<Vec<Arc<dyn RemoteDevice>>>,
}

impl Controller {
    /// Create a controller sending through `upstream`, normally the node profile
    pub fn new(upstream: Arc<dyn SendToRemote>) -> Self {
        // instance 1 is always valid
        let id = Eoj::from_raw(u32::from(ClassCode::CONTROLLER.value()) << 8 | 0x01);
        log::debug!("controller {}: created", id);
        Self {
            node: Node::new(id),
            upstream,
            devices: RwLock::new(Vec::new()),
        }
    }

    /// Get the object identifier
    pub fn id(&self) -> Eoj {
        self.node.id()
    }

    /// Check whether the controller is open
    pub fn is_open(&self) -> bool {
        self.node.is_open()
    }

    /// Open the controller
    pub fn open(&self) -> bool {
        self.node.open()
    }

    /// Close every device proxy, forget them, then close the controller
    pub async fn close(&self) -> bool {
        log::debug!("controller {}: close", self.id());
        let devices = std::mem::take(&mut *self.devices.write().await);
        for device in devices {
            device.close().await;
        }
        self.node.close()
    }

    /// Add a device proxy
    ///
    /// # Returns
    /// `false` without adding anything if a proxy for the same address and
    /// object is already registered
    pub async fn add_device(&self, device: Arc<dyn RemoteDevice>) -> bool {
        let mut devices = self.devices.write().await;
        let (address, id) = (device.device().address(), device.device().id());
        if devices.iter().any(|d| d.device().address() == address && d.device().id() == id) {
            log::info!("enlite: the device is already added, {} {}", id, address);
            return false;
        }
        log::debug!("controller {}: add device {} at {}", self.id(), id, address);
        devices.push(device);
        true
    }

    /// Find the proxy for an object at an address
    pub async fn lookup(&self, address: &str, id: Eoj) -> Option<Arc<dyn RemoteDevice>> {
        self.devices
            .read()
            .await
            .iter()
            .find(|d| d.device().address() == address && d.device().id() == id)
            .cloned()
    }

    /// Get the registered proxies
    pub async fn devices(&self) -> Vec<Arc<dyn RemoteDevice>> {
        self.devices.read().await.clone()
    }

    /// Get the number of registered proxies
    pub async fn device_count(&self) -> usize {
        self.devices.read().await.len()
    }
}

#[async_trait]
impl FrameHandler for Controller {
    fn node(&self) -> &Node {
        &self.node
    }

    async fn on_data(&self, address: &str, frame: &Frame) -> EnliteResult<()> {
        log::debug!("controller {}: on_data from {} seoj {}", self.id(), address, frame.seoj());
        match self.lookup(address, frame.seoj()).await {
            Some(device) => device.on_data(address, frame).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SendToRemote for Controller {
    async fn send(&self, mut params: FrameParams, address: &str) -> EnliteResult<()> {
        if params.deoj.is_none() {
            return Err(EnliteError::IncompleteParameters(format!(
                "Controller.send: deoj is missing, {}",
                params.dump()
            )));
        }
        params.seoj = Some(self.id());
        self.upstream.send(params, address).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::FakeSender;
    use crate::device::Device;
    use enlite_core::{Epc, Esv, Property};
    use tokio::sync::Mutex;

    const ADDRESS_A: &str = "FE80::A";
    const ADDRESS_B: &str = "FE80::B";

    /// Device that counts the frames routed to it
    struct RecordingDevice {
        device: Device,
        frames: Mutex<usize>,
    }

    #[async_trait]
    impl FrameHandler for RecordingDevice {
        fn node(&self) -> &Node {
            self.device.node()
        }

        async fn on_data(&self, _address: &str, _frame: &Frame) -> EnliteResult<()> {
            *self.frames.lock().await += 1;
            Ok(())
        }
    }

    #[async_trait]
    impl RemoteDevice for RecordingDevice {
        fn device(&self) -> &Device {
            &self.device
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn into_any(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
            self
        }
    }

    fn recording_device(sender: Arc<dyn SendToRemote>, address: &str, instance: u16) -> Arc<RecordingDevice> {
        let device = Device::new(sender, address, ClassCode::LOW_VOLTAGE_SMART_ELECTRIC_ENERGY_METER, instance).unwrap();
        device.open();
        Arc::new(RecordingDevice {
            device,
            frames: Mutex::new(0),
        })
    }

    fn frame_from(seoj: u32) -> Frame {
        let params = FrameParams::new(Esv::Inf, vec![Property::new(Epc::UNIT)])
            .with_tid(1)
            .with_seoj(Eoj::from_raw(seoj))
            .with_deoj(Eoj::from_raw(0x05ff01));
        Frame::create(&params).unwrap()
    }

    #[tokio::test]
    async fn test_add_device_rejects_duplicates() {
        let (upstream, _rx) = FakeSender::new();
        let controller = Arc::new(Controller::new(upstream));
        assert_eq!(controller.id(), Eoj::from_raw(0x05ff01));

        assert!(controller.add_device(recording_device(controller.clone(), ADDRESS_A, 1)).await);
        assert!(!controller.add_device(recording_device(controller.clone(), ADDRESS_A, 1)).await);
        assert!(controller.add_device(recording_device(controller.clone(), ADDRESS_B, 1)).await);
        assert!(controller.add_device(recording_device(controller.clone(), ADDRESS_A, 2)).await);
        assert_eq!(controller.device_count().await, 3);
        controller.close().await;
    }

    #[tokio::test]
    async fn test_routing_by_address_and_seoj() {
        let (upstream, _rx) = FakeSender::new();
        let controller = Arc::new(Controller::new(upstream));
        let a1 = recording_device(controller.clone(), ADDRESS_A, 1);
        let a2 = recording_device(controller.clone(), ADDRESS_A, 2);
        let b1 = recording_device(controller.clone(), ADDRESS_B, 1);
        for device in [&a1, &a2, &b1] {
            controller.add_device(device.clone()).await;
        }

        controller.on_data(ADDRESS_A, &frame_from(0x028802)).await.unwrap();
        controller.on_data(ADDRESS_B, &frame_from(0x028801)).await.unwrap();
        controller.on_data(ADDRESS_B, &frame_from(0x028803)).await.unwrap();
        controller.on_data("FE80::C", &frame_from(0x028801)).await.unwrap();

        assert_eq!(*a1.frames.lock().await, 0);
        assert_eq!(*a2.frames.lock().await, 1);
        assert_eq!(*b1.frames.lock().await, 1);
        controller.close().await;
    }

    #[tokio::test]
    async fn test_send_stamps_seoj() {
        let (upstream, mut rx) = FakeSender::new();
        let controller = Controller::new(upstream);

        let params = FrameParams::new(Esv::Get, vec![Property::new(Epc::UNIT)])
            .with_tid(7)
            .with_deoj(Eoj::from_raw(0x028801));
        controller.send(params, ADDRESS_A).await.unwrap();

        let (sent, address) = rx.recv().await.unwrap();
        assert_eq!(address, ADDRESS_A);
        assert_eq!(sent.seoj, Some(Eoj::from_raw(0x05ff01)));
        assert_eq!(sent.deoj, Some(Eoj::from_raw(0x028801)));
        assert_eq!(sent.tid, Some(7));
    }

    #[tokio::test]
    async fn test_send_requires_deoj() {
        let (upstream, mut rx) = FakeSender::new();
        let controller = Controller::new(upstream);

        let params = FrameParams::new(Esv::Get, vec![Property::new(Epc::UNIT)]).with_tid(7);
        assert!(matches!(
            controller.send(params, ADDRESS_A).await,
            Err(EnliteError::IncompleteParameters(_))
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_closes_devices() {
        let (upstream, _rx) = FakeSender::new();
        let controller = Arc::new(Controller::new(upstream));
        controller.open();
        let a1 = recording_device(controller.clone(), ADDRESS_A, 1);
        controller.add_device(a1.clone()).await;

        assert!(controller.close().await);
        assert!(!controller.is_open());
        assert!(!a1.device.is_open());
        assert_eq!(controller.device_count().await, 0);
    }
}
