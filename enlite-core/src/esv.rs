//! ECHONET Lite service codes (ESV)

use std::fmt;

/// Service code indicating the intent of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Esv {
    /// Property value read request
    Get,
    /// Property value read response
    GetRes,
    /// Property value notification
    Inf,
    /// Property value notification requiring a response
    InfC,
    /// Response to an `InfC`
    InfCRes,
    /// Any other service code, carried opaquely
    Other(u8),
}

impl Esv {
    /// Get the service code from its wire value
    pub fn from_byte(value: u8) -> Self {
        match value {
            0x62 => Esv::Get,
            0x72 => Esv::GetRes,
            0x73 => Esv::Inf,
            0x74 => Esv::InfC,
            0x7a => Esv::InfCRes,
            other => Esv::Other(other),
        }
    }

    /// Get the wire value of this service code
    pub fn to_byte(self) -> u8 {
        match self {
            Esv::Get => 0x62,
            Esv::GetRes => 0x72,
            Esv::Inf => 0x73,
            Esv::InfC => 0x74,
            Esv::InfCRes => 0x7a,
            Esv::Other(value) => value,
        }
    }

    /// Service code a responder answers this one with
    ///
    /// `Get` maps to `GetRes` and `InfC` maps to `InfCRes`; every other code
    /// maps to itself.
    pub fn response(self) -> Self {
        match self {
            Esv::Get => Esv::GetRes,
            Esv::InfC => Esv::InfCRes,
            other => other,
        }
    }
}

impl From<u8> for Esv {
    fn from(value: u8) -> Self {
        Esv::from_byte(value)
    }
}

impl From<Esv> for u8 {
    fn from(esv: Esv) -> Self {
        esv.to_byte()
    }
}

impl fmt::Display for Esv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.to_byte())
    }
}
