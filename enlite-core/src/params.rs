//! Request parameters, the pre-wire form of a frame

use crate::esv::Esv;
use crate::hex::num_to_hex;
use crate::object_id::Eoj;
use crate::property::Property;

/// Parameters of a frame before it is encoded
///
/// TID, SEOJ and DEOJ are filled in by the layers a request travels through:
/// the device proxy sets TID and DEOJ, the controller stamps SEOJ. Encoding
/// with any of them missing fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameParams {
    /// Transaction ID
    pub tid: Option<u16>,
    /// Source object
    pub seoj: Option<Eoj>,
    /// Destination object
    pub deoj: Option<Eoj>,
    /// Service code
    pub esv: Esv,
    /// Properties, possibly empty
    pub properties: Vec<Property>,
}

impl FrameParams {
    /// Create parameters with only the mandatory fields set
    pub fn new(esv: Esv, properties: Vec<Property>) -> Self {
        Self {
            tid: None,
            seoj: None,
            deoj: None,
            esv,
            properties,
        }
    }

    /// Set the transaction ID
    pub fn with_tid(mut self, tid: u16) -> Self {
        self.tid = Some(tid);
        self
    }

    /// Set the source object
    pub fn with_seoj(mut self, seoj: Eoj) -> Self {
        self.seoj = Some(seoj);
        self
    }

    /// Set the destination object
    pub fn with_deoj(mut self, deoj: Eoj) -> Self {
        self.deoj = Some(deoj);
        self
    }

    /// Human-readable dump of the fields that are present
    pub fn dump(&self) -> String {
        let mut result = String::new();
        if let Some(tid) = self.tid {
            result.push_str(&format!("tid:{} ", num_to_hex(u64::from(tid), 2).unwrap_or_default()));
        }
        if let Some(seoj) = self.seoj {
            result.push_str(&format!("seoj:{} ", num_to_hex(u64::from(seoj.value()), 3).unwrap_or_default()));
        }
        if let Some(deoj) = self.deoj {
            result.push_str(&format!("deoj:{} ", num_to_hex(u64::from(deoj.value()), 3).unwrap_or_default()));
        }
        for property in &self.properties {
            result.push_str(&property.to_string());
        }
        result
    }
}
