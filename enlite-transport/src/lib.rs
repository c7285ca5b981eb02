//! Transport layer module for the ECHONET Lite client engine
//!
//! The wireless link and its session establishment are external
//! collaborators. This crate defines the seams the engine talks to:
//!
//! - [`DatagramSocket`]: bind / send / receive byte datagrams
//! - [`WsunAdaptor`]: open and close the network session, hand out sockets,
//!   and publish [`SessionEvent`]s
//!
//! A plain UDP implementation of both is provided for ECHONET Lite nodes
//! reachable over an ordinary IP network.

pub mod adaptor;
pub mod events;
pub mod registry;
pub mod socket;
pub mod udp;

pub use adaptor::{PanDescriptor, WsunAdaptor, WsunCache, WsunConfig, WsunId};
pub use enlite_core::{EnliteError, EnliteResult};
pub use events::SessionEvent;
pub use registry::{AdaptorFactory, AdaptorRegistry};
pub use socket::{Datagram, DatagramSocket};
pub use udp::{UdpAdaptor, UdpDatagramSocket, UdpSettings, MAX_UDP_PAYLOAD_SIZE};
