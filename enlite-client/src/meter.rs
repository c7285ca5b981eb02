//! Low-voltage smart electric energy meter (class 0x0288)

use crate::device::{Device, DeviceFactory, ReadPolicy, RemoteDevice};
use crate::node::{FrameHandler, Node, SendToRemote};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use enlite_core::{ClassCode, EnliteResult, Epc, Frame, TimeValue};
use std::any::Any;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast};

const EVENT_CAPACITY: usize = 32;

/// Notification published by a meter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterEvent {
    /// Cumulative amount of energy, normal direction (EPC 0xEA)
    CumulativeNormal { time: NaiveDateTime, value: u32 },
    /// Cumulative amount of energy, reverse direction (EPC 0xEB)
    CumulativeReverse { time: NaiveDateTime, value: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Normal,
    Reverse,
}

/// Proxy for a smart electric energy meter
///
/// Adds typed reads of the meter's scaling properties and turns the two
/// cumulative-energy notifications into [`MeterEvent`]s. A notification
/// whose timestamp is not newer than the last one accepted on the same
/// channel is dropped and not confirmed, so the meter sends it again.
pub struct SmartElectricEnergyMeter {
    device: Device,
    events: RwLock<broadcast::Sender<MeterEvent>>,
    last_normal: Mutex<Option<NaiveDateTime>>,
    last_reverse: Mutex<Option<NaiveDateTime>>,
}

impl SmartElectricEnergyMeter {
    /// Class code of the meter
    pub const CLASS_CODE: ClassCode = ClassCode::LOW_VOLTAGE_SMART_ELECTRIC_ENERGY_METER;

    /// Create a meter proxy
    pub fn new(
        sender: Arc<dyn SendToRemote>,
        address: impl Into<String>,
        instance_code: u16,
    ) -> EnliteResult<Self> {
        Ok(Self::from_device(Device::new(sender, address, Self::CLASS_CODE, instance_code)?))
    }

    /// Wrap an existing proxy
    pub fn from_device(device: Device) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            device,
            events: RwLock::new(events),
            last_normal: Mutex::new(None),
            last_reverse: Mutex::new(None),
        }
    }

    /// Replace the read policy
    pub fn with_policy(self, policy: ReadPolicy) -> Self {
        Self {
            device: self.device.with_policy(policy),
            ..self
        }
    }

    /// Factory to register for class 0x0288
    pub fn factory() -> DeviceFactory {
        Arc::new(
            |sender: Arc<dyn SendToRemote>,
             address: &str,
             _class_code: ClassCode,
             instance_code: u16|
             -> EnliteResult<Arc<dyn RemoteDevice>> {
                Ok(Arc::new(Self::new(sender, address, instance_code)?))
            },
        )
    }

    /// Subscribe to cumulative-energy notifications
    pub async fn subscribe(&self) -> broadcast::Receiver<MeterEvent> {
        self.events.read().await.subscribe()
    }

    /// Read the coefficient (EPC 0xD3)
    pub async fn coefficient(&self) -> EnliteResult<Option<i64>> {
        self.device.read_numeric(Epc::COEFFICIENT, 4).await
    }

    /// Read the number of effective digits of cumulative amounts (EPC 0xD7)
    pub async fn effective_digits(&self) -> EnliteResult<Option<i64>> {
        self.device.read_numeric(Epc::EFFECTIVE_DIGITS, 1).await
    }

    /// Read the unit of cumulative amounts (EPC 0xE1)
    pub async fn unit(&self) -> EnliteResult<Option<i64>> {
        self.device.read_numeric(Epc::UNIT, 1).await
    }

    /// Read the measured instantaneous electric energy in W (EPC 0xE7)
    pub async fn instantaneous_electric_energy(&self) -> EnliteResult<Option<i64>> {
        self.device.read_numeric(Epc::INSTANTANEOUS_ELECTRIC_ENERGY, 4).await
    }

    /// Record `time` as the latest on `channel` if it is newer
    ///
    /// The first timestamp seen on a channel is always accepted.
    async fn accept(&self, channel: Channel, time: NaiveDateTime) -> bool {
        let mut last = match channel {
            Channel::Normal => self.last_normal.lock().await,
            Channel::Reverse => self.last_reverse.lock().await,
        };
        match *last {
            Some(previous) if previous >= time => false,
            _ => {
                *last = Some(time);
                true
            }
        }
    }
}

#[async_trait]
impl FrameHandler for SmartElectricEnergyMeter {
    fn node(&self) -> &Node {
        self.device.node()
    }

    async fn on_get_response(&self, address: &str, frame: &Frame) -> EnliteResult<()> {
        self.device.on_get_response(address, frame).await
    }

    async fn on_notify_confirm(&self, address: &str, frame: &Frame) -> EnliteResult<()> {
        log::debug!("meter {}: on_notify_confirm {}", self.device.id(), frame);
        for property in frame.properties() {
            let channel = match property.epc() {
                Epc::CUMULATIVE_AMOUNTS_OF_ENERGY_NORMAL => Channel::Normal,
                Epc::CUMULATIVE_AMOUNTS_OF_ENERGY_REVERSE => Channel::Reverse,
                _ => continue,
            };
            let Some(time_value) = TimeValue::decode(property.edt()) else {
                log::info!("enlite: undecodable {} from {}: {}", property.epc(), address, property);
                return Ok(());
            };
            if !self.accept(channel, time_value.time).await {
                log::info!("enlite: stale {} from {} at {}", property.epc(), address, time_value.time);
                return Ok(());
            }
            let event = match channel {
                Channel::Normal => MeterEvent::CumulativeNormal {
                    time: time_value.time,
                    value: time_value.value,
                },
                Channel::Reverse => MeterEvent::CumulativeReverse {
                    time: time_value.time,
                    value: time_value.value,
                },
            };
            // no subscriber is fine
            let _ = self.events.read().await.send(event);
        }
        let confirmed = frame.confirmed();
        log::debug!("meter {}: confirm {} to {}", self.device.id(), confirmed.dump(), address);
        self.device.send(confirmed, address).await
    }
}

#[async_trait]
impl RemoteDevice for SmartElectricEnergyMeter {
    fn device(&self) -> &Device {
        &self.device
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    async fn close(&self) -> bool {
        log::debug!("meter {}: close", self.device.id());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        *self.events.write().await = events;
        self.device.close().await
    }
}
