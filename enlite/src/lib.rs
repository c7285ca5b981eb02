//! enlite - ECHONET Lite client for smart electric energy meters
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `enlite-core`: error type, identifiers, service and property codes,
//!   frame codec
//! - `enlite-transport`: datagram socket and session adaptor traits, UDP
//!   implementation
//! - `enlite-client`: local objects, routing, reads with retry, discovery,
//!   the smart meter class and the [`client::Enlite`] facade
//!
//! # Usage
//!
//! ```no_run
//! use enlite::client::{ConfigStore, Enlite, SmartElectricEnergyMeter};
//! use enlite::transport::AdaptorRegistry;
//!
//! # async fn run() -> enlite::EnliteResult<()> {
//! let enlite = Enlite::from_config(ConfigStore::load_default()?, &AdaptorRegistry::default()).await?;
//! enlite
//!     .add_device_class(SmartElectricEnergyMeter::CLASS_CODE, SmartElectricEnergyMeter::factory())
//!     .await;
//! enlite.open().await?;
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use enlite_core::datatypes::*;
pub use enlite_core::{
    ClassCode, Eoj, EnliteError, EnliteResult, Epc, Esv, Frame, FrameParams, PORT_ENLITE, Property,
};

// Re-export client API
pub mod client {
    pub use enlite_client::*;
}

// Re-export transport API
pub mod transport {
    pub use enlite_transport::*;
}
