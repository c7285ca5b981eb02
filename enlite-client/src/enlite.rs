//! Client facade
//!
//! [`Enlite`] is the context object an application creates once and keeps
//! for the lifetime of its network session. It owns the adaptor, the node
//! profile and the device class registry, and publishes [`EnliteEvent`]s.
//!
//! Events go through a bounded broadcast channel. A subscriber that falls
//! more than the event capacity behind loses the oldest events and gets
//! `RecvError::Lagged`; proxies announced in lost `DeviceCreated` events
//! stay closed, so size the capacity with [`Enlite::with_event_capacity`]
//! for networks with many objects.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use enlite_client::{ConfigStore, Enlite, EnliteEvent, SmartElectricEnergyMeter};
//! use enlite_transport::AdaptorRegistry;
//! use tokio::sync::broadcast::error::RecvError;
//!
//! # async fn run() -> enlite_core::EnliteResult<()> {
//! let enlite = Enlite::from_config(ConfigStore::load_default()?, &AdaptorRegistry::default()).await?;
//! enlite
//!     .add_device_class(SmartElectricEnergyMeter::CLASS_CODE, SmartElectricEnergyMeter::factory())
//!     .await;
//! let mut events = enlite.subscribe().await;
//! enlite.open().await?;
//! loop {
//!     match events.recv().await {
//!         Ok(EnliteEvent::DeviceCreated(device)) => {
//!             device.open().await;
//!         }
//!         Ok(EnliteEvent::Session(_)) => {}
//!         Err(RecvError::Lagged(skipped)) => log::warn!("{} events dropped", skipped),
//!         Err(RecvError::Closed) => break,
//!     }
//! }
//! enlite.close().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::ConfigStore;
use crate::controller::Controller;
use crate::device::{DeviceFactory, RemoteDevice};
use crate::node::SendToRemote;
use crate::node_profile::{EnliteLocal, NodeProfile};
use async_trait::async_trait;
use enlite_core::{ClassCode, EnliteError, EnliteResult};
use enlite_transport::{AdaptorRegistry, DatagramSocket, SessionEvent, WsunAdaptor};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;

/// Default capacity of the event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Event published by the facade
#[derive(Clone)]
pub enum EnliteEvent {
    /// Session lifecycle event re-emitted from the adaptor
    Session(SessionEvent),
    /// A device proxy was created for a discovered object
    DeviceCreated(Arc<dyn RemoteDevice>),
}

impl fmt::Debug for EnliteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnliteEvent::Session(event) => f.debug_tuple("Session").field(event).finish(),
            EnliteEvent::DeviceCreated(device) => f.debug_tuple("DeviceCreated").field(device.device()).finish(),
        }
    }
}

/// State shared with the node profile
struct Shared {
    adaptor: Arc<dyn WsunAdaptor>,
    factories: RwLock<HashMap<ClassCode, DeviceFactory>>,
    event_capacity: usize,
    events: RwLock<broadcast::Sender<EnliteEvent>>,
}

impl Shared {
    async fn emit(&self, event: EnliteEvent) {
        // no subscriber is fine
        let _ = self.events.read().await.send(event);
    }
}

#[async_trait]
impl EnliteLocal for Shared {
    async fn create_device(
        &self,
        controller: Arc<Controller>,
        class_code: ClassCode,
        address: &str,
        instance_code: u16,
    ) -> Option<Arc<dyn RemoteDevice>> {
        log::debug!("enlite: create_device {} {} at {}", class_code, instance_code, address);
        let factory = self.factories.read().await.get(&class_code).cloned();
        let Some(factory) = factory else {
            log::info!("enlite: no device class registered for {}", class_code);
            return None;
        };
        let sender: Arc<dyn SendToRemote> = controller;
        match factory(sender, address, class_code, instance_code) {
            Ok(device) => {
                self.emit(EnliteEvent::DeviceCreated(device.clone())).await;
                Some(device)
            }
            Err(e) => {
                log::warn!("enlite: failed to create {} {} at {}: {}", class_code, instance_code, address, e);
                None
            }
        }
    }

    fn create_socket(&self) -> Arc<dyn DatagramSocket> {
        self.adaptor.create_socket()
    }
}

/// ECHONET Lite client context
pub struct Enlite {
    store: ConfigStore,
    shared: Arc<Shared>,
    node_profile: Arc<NodeProfile>,
    controller: RwLock<Option<Arc<Controller>>>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl Enlite {
    /// Create a client over an adaptor
    pub fn new(store: ConfigStore, adaptor: Arc<dyn WsunAdaptor>) -> Self {
        Self::with_event_capacity(store, adaptor, DEFAULT_EVENT_CAPACITY)
    }

    /// Create a client whose event channel holds `capacity` events per
    /// subscriber (at least 1)
    pub fn with_event_capacity(
        store: ConfigStore,
        adaptor: Arc<dyn WsunAdaptor>,
        capacity: usize,
    ) -> Self {
        let event_capacity = capacity.max(1);
        let (events, _) = broadcast::channel(event_capacity);
        let shared = Arc::new(Shared {
            adaptor,
            factories: RwLock::new(HashMap::new()),
            event_capacity,
            events: RwLock::new(events),
        });
        let node_profile = Arc::new(NodeProfile::new(shared.clone()));
        Self {
            store,
            shared,
            node_profile,
            controller: RwLock::new(None),
            forwarder: Mutex::new(None),
        }
    }

    /// Create a client over the adaptor named in the configuration
    ///
    /// # Errors
    /// Returns `EnliteError::Config` if the registry has no adaptor of that
    /// model
    pub async fn from_config(store: ConfigStore, registry: &AdaptorRegistry) -> EnliteResult<Self> {
        let wsun = store.config().await.wsun;
        let adaptor = registry.create(&wsun.adaptor, &wsun.config).ok_or_else(|| {
            EnliteError::Config(format!("cannot get an adaptor for {}", wsun.adaptor))
        })?;
        Ok(Self::new(store, adaptor))
    }

    /// Check whether a session is open
    pub async fn is_open(&self) -> bool {
        self.controller.read().await.is_some()
    }

    /// Get the controller of the open session
    pub async fn controller(&self) -> Option<Arc<Controller>> {
        self.controller.read().await.clone()
    }

    /// Get the configuration store
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Subscribe to session and device events
    ///
    /// Receivers end when the client is closed.
    pub async fn subscribe(&self) -> broadcast::Receiver<EnliteEvent> {
        self.shared.events.read().await.subscribe()
    }

    /// Register the factory for a device class
    pub async fn add_device_class(&self, class_code: ClassCode, factory: DeviceFactory) {
        log::debug!("enlite: add_device_class {}", class_code);
        self.shared.factories.write().await.insert(class_code, factory);
    }

    /// Create a device proxy through the registered factory
    ///
    /// Publishes [`EnliteEvent::DeviceCreated`] on success.
    ///
    /// # Returns
    /// `None` if the class is not registered or its factory failed
    pub async fn create_device(
        &self,
        controller: Arc<Controller>,
        class_code: ClassCode,
        address: &str,
        instance_code: u16,
    ) -> Option<Arc<dyn RemoteDevice>> {
        self.shared
            .create_device(controller, class_code, address, instance_code)
            .await
    }

    /// Establish the session and start listening
    ///
    /// # Returns
    /// `true` if the client is open, including when it already was;
    /// `false` if the adaptor could not establish a session
    pub async fn open(&self) -> EnliteResult<bool> {
        log::debug!("enlite: open");
        if self.is_open().await {
            log::info!("enlite: already opened");
            return Ok(true);
        }
        self.start_forwarder().await;

        let wsun = self.store.config().await.wsun;
        let descriptor = match self.shared.adaptor.open(&wsun.id, wsun.cache.as_ref()).await {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => {
                log::info!("enlite: opening enlite is failed");
                self.stop_forwarder().await;
                return Ok(false);
            }
            Err(e) => {
                log::error!("enlite: adaptor {} failed to open: {}", self.shared.adaptor.model(), e);
                self.stop_forwarder().await;
                return Err(e);
            }
        };
        if let Err(e) = self.store.update_cache(&descriptor).await {
            log::warn!("enlite: failed to save the PAN descriptor: {}", e);
        }

        let controller = Arc::new(Controller::new(self.node_profile.clone()));
        if let Err(e) = self.node_profile.open(controller.clone()).await {
            self.stop_forwarder().await;
            if let Err(close_error) = self.shared.adaptor.close().await {
                log::warn!("enlite: failed to close adaptor: {}", close_error);
            }
            return Err(e);
        }
        *self.controller.write().await = Some(controller);
        log::info!("enlite: opened successfully");
        Ok(true)
    }

    /// Close the session
    ///
    /// Ends every event subscription, closes the node profile, controller
    /// and device proxies, then closes the adaptor.
    pub async fn close(&self) -> EnliteResult<()> {
        log::debug!("enlite: close");
        if !self.is_open().await {
            log::info!("enlite: not opened");
            return Ok(());
        }
        self.stop_forwarder().await;
        let (events, _) = broadcast::channel(self.shared.event_capacity);
        *self.shared.events.write().await = events;

        self.node_profile.close().await;
        self.controller.write().await.take();
        self.shared.adaptor.close().await?;
        log::info!("enlite: closed successfully");
        Ok(())
    }

    async fn start_forwarder(&self) {
        let mut session = self.shared.adaptor.subscribe();
        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            loop {
                match session.recv().await {
                    Ok(event) => {
                        if event.is_termination() {
                            log::warn!("enlite: session lost: {}", event);
                        } else {
                            log::debug!("enlite: {}", event);
                        }
                        shared.emit(EnliteEvent::Session(event)).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("enlite: {} session events dropped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        if let Some(previous) = self.forwarder.lock().await.replace(handle) {
            previous.abort();
        }
    }

    async fn stop_forwarder(&self) {
        let forwarder = self.forwarder.lock().await.take();
        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }
    }
}
