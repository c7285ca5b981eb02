//! ECHONET property codes (EPC)

use std::fmt;

/// 8-bit property code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Epc(pub u8);

impl Epc {
    /// Coefficient for the cumulative amounts of electric energy
    pub const COEFFICIENT: Epc = Epc(0xd3);
    /// Self-node instance list notification (node profile)
    pub const INSTANCE_LIST_NOTIFICATION: Epc = Epc(0xd5);
    /// Number of effective digits for cumulative amounts of electric energy
    pub const EFFECTIVE_DIGITS: Epc = Epc(0xd7);
    /// Unit for cumulative amounts of electric energy
    pub const UNIT: Epc = Epc(0xe1);
    /// Measured instantaneous electric power
    pub const INSTANTANEOUS_ELECTRIC_ENERGY: Epc = Epc(0xe7);
    /// Cumulative amounts of electric energy measured at fixed time (normal direction)
    pub const CUMULATIVE_AMOUNTS_OF_ENERGY_NORMAL: Epc = Epc(0xea);
    /// Cumulative amounts of electric energy measured at fixed time (reverse direction)
    pub const CUMULATIVE_AMOUNTS_OF_ENERGY_REVERSE: Epc = Epc(0xeb);

    /// Get the wire value
    pub fn value(self) -> u8 {
        self.0
    }
}

impl From<u8> for Epc {
    fn from(value: u8) -> Self {
        Epc(value)
    }
}

impl fmt::Display for Epc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}
