//! ECHONET Lite frame structure and encoding/decoding

use crate::error::{EnliteError, EnliteResult};
use crate::esv::Esv;
use crate::hex::num_to_hex;
use crate::object_id::Eoj;
use crate::params::FrameParams;
use crate::property::Property;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// ECHONET Lite header (EHD1 = 0x10, EHD2 = 0x81 for the specified message format)
pub const EHD: u16 = 0x1081;

/// Length of the fixed part of a frame, up to and including OPC
pub const HEADER_LENGTH: usize = 12;

const MAX_PROPERTIES: usize = 0xff;
const MAX_PDC: usize = 0xff;

/// An encoded ECHONET Lite frame
///
/// The frame owns its wire bytes and reads fields directly out of them.
/// Apart from the TID, which can be rewritten in place, a frame is
/// immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    buffer: BytesMut,
}

impl Frame {
    /// Encode request parameters into a frame
    ///
    /// OPC and every PDC are derived from the property list.
    ///
    /// # Errors
    /// * `EnliteError::IncompleteParameters` if TID, SEOJ or DEOJ is missing
    /// * `EnliteError::Format` if there are more than 255 properties or a
    ///   payload is longer than 255 bytes
    pub fn create(params: &FrameParams) -> EnliteResult<Self> {
        let (tid, seoj, deoj) = match (params.tid, params.seoj, params.deoj) {
            (Some(tid), Some(seoj), Some(deoj)) => (tid, seoj, deoj),
            _ => {
                return Err(EnliteError::IncompleteParameters(format!(
                    "Frame: params are not enough {}",
                    params.dump()
                )));
            }
        };
        if params.properties.len() > MAX_PROPERTIES {
            return Err(EnliteError::Format(format!(
                "too many properties: {}",
                params.properties.len()
            )));
        }

        let length = HEADER_LENGTH
            + params
                .properties
                .iter()
                .map(|property| 2 + property.pdc())
                .sum::<usize>();
        let mut buffer = BytesMut::with_capacity(length);
        buffer.put_u16(EHD);
        buffer.put_u16(tid);
        buffer.put_slice(&seoj.to_bytes());
        buffer.put_slice(&deoj.to_bytes());
        buffer.put_u8(params.esv.to_byte());
        buffer.put_u8(params.properties.len() as u8);
        for property in &params.properties {
            if property.pdc() > MAX_PDC {
                return Err(EnliteError::Format(format!(
                    "property {} is too long: {} bytes",
                    property.epc(),
                    property.pdc()
                )));
            }
            buffer.put_u8(property.epc().value());
            buffer.put_u8(property.pdc() as u8);
            if let Some(edt) = property.edt() {
                buffer.put_slice(edt);
            }
        }
        Ok(Self { buffer })
    }

    /// Decode a frame from received bytes
    ///
    /// The buffer is checked before it is accepted: it must hold the fixed
    /// header, start with [`EHD`], and contain every one of the OPC
    /// properties it announces. Bytes after the last property are ignored.
    ///
    /// # Errors
    /// Returns `EnliteError::FrameInvalid` if the buffer is malformed
    pub fn decode(data: &[u8]) -> EnliteResult<Self> {
        Self::validate(data)?;
        Ok(Self {
            buffer: BytesMut::from(data),
        })
    }

    fn validate(data: &[u8]) -> EnliteResult<()> {
        if data.len() < HEADER_LENGTH {
            return Err(EnliteError::FrameInvalid(format!(
                "frame too short: expected at least {}, got {}",
                HEADER_LENGTH,
                data.len()
            )));
        }
        let ehd = u16::from_be_bytes([data[0], data[1]]);
        if ehd != EHD {
            return Err(EnliteError::FrameInvalid(format!(
                "unexpected header 0x{:04X}",
                ehd
            )));
        }
        let opc = data[11];
        let mut offset = HEADER_LENGTH;
        for index in 0..opc {
            if offset + 2 > data.len() {
                return Err(EnliteError::FrameInvalid(format!(
                    "property {} of {} is truncated",
                    index + 1,
                    opc
                )));
            }
            offset += 2 + usize::from(data[offset + 1]);
            if offset > data.len() {
                return Err(EnliteError::FrameInvalid(format!(
                    "payload of property {} of {} is truncated",
                    index + 1,
                    opc
                )));
            }
        }
        Ok(())
    }

    /// Build the counter-message acknowledging a received frame
    ///
    /// The TID is kept, SEOJ and DEOJ are swapped, the service code is mapped
    /// to its response code and every property is re-emitted without payload.
    pub fn confirmed(&self) -> FrameParams {
        FrameParams {
            tid: Some(self.tid()),
            seoj: Some(self.deoj()),
            deoj: Some(self.seoj()),
            esv: self.esv().response(),
            properties: self.properties().iter().map(Property::confirmed).collect(),
        }
    }

    /// Get the header
    pub fn ehd(&self) -> u16 {
        u16::from_be_bytes([self.buffer[0], self.buffer[1]])
    }

    /// Get the transaction ID
    pub fn tid(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    /// Rewrite the transaction ID in place
    pub fn set_tid(&mut self, tid: u16) {
        self.buffer[2..4].copy_from_slice(&tid.to_be_bytes());
    }

    /// Get the source object
    pub fn seoj(&self) -> Eoj {
        Eoj::from_bytes([self.buffer[4], self.buffer[5], self.buffer[6]])
    }

    /// Get the destination object
    pub fn deoj(&self) -> Eoj {
        Eoj::from_bytes([self.buffer[7], self.buffer[8], self.buffer[9]])
    }

    /// Get the service code
    pub fn esv(&self) -> Esv {
        Esv::from_byte(self.buffer[10])
    }

    /// Get the number of properties
    pub fn opc(&self) -> u8 {
        self.buffer[11]
    }

    /// Parse the properties, in wire order
    pub fn properties(&self) -> Vec<Property> {
        let mut properties = Vec::with_capacity(usize::from(self.opc()));
        let mut offset = HEADER_LENGTH;
        for _ in 0..self.opc() {
            let epc = self.buffer[offset].into();
            let pdc = usize::from(self.buffer[offset + 1]);
            offset += 2;
            let edt = Bytes::copy_from_slice(&self.buffer[offset..offset + pdc]);
            properties.push(Property::with_data(epc, edt));
            offset += pdc;
        }
        properties
    }

    /// Get the wire bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = |value: u64, bytes: usize| num_to_hex(value, bytes).map_err(|_| fmt::Error);
        write!(
            f,
            "ehd:{} tid:{} seoj:{} deoj:{} esv:{} opc:{} ",
            hex(u64::from(self.ehd()), 2)?,
            hex(u64::from(self.tid()), 2)?,
            hex(u64::from(self.seoj().value()), 3)?,
            hex(u64::from(self.deoj().value()), 3)?,
            hex(u64::from(self.esv().to_byte()), 1)?,
            hex(u64::from(self.opc()), 1)?,
        )?;
        for property in self.properties() {
            write!(f, "{}", property)?;
        }
        Ok(())
    }
}
