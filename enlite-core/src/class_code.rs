//! ECHONET object class codes

use serde::{Deserialize, Serialize};
use std::fmt;

/// 16-bit class group + class code of an ECHONET object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassCode(pub u16);

impl ClassCode {
    /// Node profile (profile class group)
    pub const NODE_PROFILE: ClassCode = ClassCode(0x0ef0);
    /// Controller (management/operation class group)
    pub const CONTROLLER: ClassCode = ClassCode(0x05ff);
    /// Low-voltage smart electric energy meter (housing/facility class group)
    pub const LOW_VOLTAGE_SMART_ELECTRIC_ENERGY_METER: ClassCode = ClassCode(0x0288);

    /// Get the wire value
    pub fn value(self) -> u16 {
        self.0
    }
}

impl From<u16> for ClassCode {
    fn from(value: u16) -> Self {
        ClassCode(value)
    }
}

impl fmt::Display for ClassCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}
