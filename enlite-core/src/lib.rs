//! Core types and utilities for the ECHONET Lite protocol
//!
//! This crate provides the fundamental types shared by every layer of the
//! client engine: the error type, object identifiers, service and property
//! codes, and the binary frame codec.
//!
//! # Frame layout
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 2 | EHD (0x1081) |
//! | 2 | 2 | TID |
//! | 4 | 3 | SEOJ |
//! | 7 | 3 | DEOJ |
//! | 10 | 1 | ESV |
//! | 11 | 1 | OPC |
//! | 12 | … | OPC × (EPC, PDC, EDT) |

pub mod class_code;
pub mod datatypes;
pub mod epc;
pub mod error;
pub mod esv;
pub mod frame;
pub mod hex;
pub mod object_id;
pub mod params;
pub mod property;

pub use class_code::ClassCode;
pub use datatypes::TimeValue;
pub use epc::Epc;
pub use error::{EnliteError, EnliteResult};
pub use esv::Esv;
pub use frame::{Frame, EHD, HEADER_LENGTH};
pub use object_id::Eoj;
pub use params::FrameParams;
pub use property::Property;

/// UDP port reserved for ECHONET Lite
pub const PORT_ENLITE: u16 = 3610;
