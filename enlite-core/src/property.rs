//! ECHONET property (EPC, PDC, EDT)

use crate::epc::Epc;
use crate::hex::num_to_hex;
use bytes::Bytes;
use std::fmt;

/// A property carried in a frame
///
/// A property is an 8-bit code (EPC) and an optional payload (EDT). The
/// payload length is the PDC field; a property without payload has PDC = 0.
/// An empty payload is stored as no payload, so equality is by code and
/// payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    epc: Epc,
    edt: Option<Bytes>,
}

impl Property {
    /// Create a property without payload, as used in read requests
    pub fn new(epc: Epc) -> Self {
        Self { epc, edt: None }
    }

    /// Create a property carrying a payload
    pub fn with_data(epc: Epc, edt: impl Into<Bytes>) -> Self {
        let edt: Bytes = edt.into();
        Self {
            epc,
            edt: if edt.is_empty() { None } else { Some(edt) },
        }
    }

    /// The acknowledgment form of a property: same code, payload stripped
    pub fn confirmed(&self) -> Self {
        Self::new(self.epc)
    }

    /// Get the property code
    pub fn epc(&self) -> Epc {
        self.epc
    }

    /// Get the payload length
    pub fn pdc(&self) -> usize {
        self.edt.as_ref().map_or(0, |edt| edt.len())
    }

    /// Get the payload
    pub fn edt(&self) -> Option<&[u8]> {
        self.edt.as_deref()
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let epc = num_to_hex(u64::from(self.epc.value()), 1).map_err(|_| fmt::Error)?;
        let pdc = num_to_hex(self.pdc() as u64, 1).map_err(|_| fmt::Error)?;
        write!(f, "epc:{} pdc:{}", epc, pdc)?;
        match &self.edt {
            Some(edt) => {
                write!(f, " edt:")?;
                for byte in edt.iter() {
                    let byte = num_to_hex(u64::from(*byte), 1).map_err(|_| fmt::Error)?;
                    write!(f, "{} ", byte)?;
                }
                Ok(())
            }
            None => write!(f, " "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_without_data() {
        let property = Property::new(Epc::INSTANCE_LIST_NOTIFICATION);
        assert_eq!(property.pdc(), 0);
        assert_eq!(property.edt(), None);
        assert_eq!(property.to_string(), "epc:D5 pdc:00 ");
    }

    #[test]
    fn test_property_with_data() {
        let property = Property::with_data(
            Epc::INSTANTANEOUS_ELECTRIC_ENERGY,
            vec![0x00, 0x00, 0x02, 0x23],
        );
        assert_eq!(property.pdc(), 4);
        assert_eq!(property.edt(), Some(&[0x00, 0x00, 0x02, 0x23][..]));
        assert_eq!(property.to_string(), "epc:E7 pdc:04 edt:00 00 02 23 ");
    }

    #[test]
    fn test_property_empty_payload_is_absent() {
        let property = Property::with_data(Epc::UNIT, Vec::new());
        assert_eq!(property, Property::new(Epc::UNIT));
    }

    #[test]
    fn test_property_confirmed() {
        let property = Property::with_data(Epc::CUMULATIVE_AMOUNTS_OF_ENERGY_NORMAL, vec![1, 2, 3]);
        let confirmed = property.confirmed();
        assert_eq!(confirmed.epc(), Epc::CUMULATIVE_AMOUNTS_OF_ENERGY_NORMAL);
        assert_eq!(confirmed.pdc(), 0);
    }
}
