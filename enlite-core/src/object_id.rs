use crate::class_code::ClassCode;
use crate::error::{EnliteError, EnliteResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ECHONET object identifier (EOJ)
///
/// An EOJ is a 24-bit value made of a 16-bit class code followed by an 8-bit
/// instance code: `class << 8 | instance`. Identifiers built locally are
/// validated; identifiers read off the wire are taken as they come.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Eoj(u32);

impl Eoj {
    /// Number of bytes an EOJ occupies on the wire
    pub const LENGTH: usize = 3;

    /// Create a new object identifier
    ///
    /// # Arguments
    ///
    /// * `class_code` - Class group and class code
    /// * `instance_code` - Instance code, from 1 to 255
    ///
    /// # Errors
    ///
    /// Returns `EnliteError::InvalidIdentity` if the instance code is 0 or
    /// greater than 255
    pub fn new(class_code: ClassCode, instance_code: u16) -> EnliteResult<Self> {
        if instance_code < 1 || instance_code > 0xff {
            return Err(EnliteError::InvalidIdentity {
                instance: instance_code,
            });
        }
        Ok(Self(u32::from(class_code.value()) << 8 | u32::from(instance_code)))
    }

    /// Create an identifier from its raw 24-bit value without validation
    pub fn from_raw(value: u32) -> Self {
        Self(value & 0x00ff_ffff)
    }

    /// Create an identifier from its wire representation
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
    }

    /// Get the wire representation
    pub fn to_bytes(&self) -> [u8; 3] {
        let [_, a, b, c] = self.0.to_be_bytes();
        [a, b, c]
    }

    /// Get the raw 24-bit value
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Get the class code
    pub fn class_code(&self) -> ClassCode {
        ClassCode((self.0 >> 8) as u16)
    }

    /// Get the instance code
    pub fn instance_code(&self) -> u8 {
        (self.0 & 0xff) as u8
    }
}

impl fmt::Display for Eoj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06X}", self.0)
    }
}
