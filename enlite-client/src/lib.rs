//! ECHONET Lite client engine
//!
//! Local objects and the protocol logic running between them:
//!
//! - [`NodeProfile`] binds the ECHONET Lite port, decodes inbound frames and
//!   handles instance list notifications (device discovery)
//! - [`Controller`] owns the device proxies and routes frames to them
//! - [`Device`] is the proxy for a remote object: correlated reads with
//!   timeout and retry, notification confirmation
//! - [`SmartElectricEnergyMeter`] is the proxy for class 0x0288
//! - [`Enlite`] ties them to a network session adaptor and the
//!   configuration file
//!
//! ```text
//! socket -> NodeProfile --deoj != 0EF001--> Controller --(address, seoj)--> Device
//!                       \--deoj == 0EF001--> on_notify (instance list)
//! Device --GET/INFC_RES--> Controller (seoj = 05FF01) --> NodeProfile --> socket
//! ```

pub mod config;
pub mod controller;
pub mod device;
pub mod enlite;
pub mod meter;
pub mod node;
pub mod node_profile;

pub use config::{CONFIG_FILE_NAME, ConfigStore, EnliteConfig, WsunSection};
pub use controller::Controller;
pub use device::{Device, DeviceFactory, ReadPolicy, RemoteDevice, generic_device_factory};
pub use enlite::{DEFAULT_EVENT_CAPACITY, Enlite, EnliteEvent};
pub use enlite_core::{EnliteError, EnliteResult};
pub use meter::{MeterEvent, SmartElectricEnergyMeter};
pub use node::{FrameHandler, Node, SendToRemote, dispatch_frame};
pub use node_profile::{EnliteLocal, NodeProfile};
