//! Date and value pair used by fixed-time cumulative energy properties

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Length of an encoded time value
pub const TIME_VALUE_LENGTH: usize = 11;

/// A measured value stamped with the meter's local date and time
///
/// Wire format (11 bytes, big-endian):
/// year (2), month (1), day (1), hour (1), minute (1), second (1), value (4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeValue {
    pub time: NaiveDateTime,
    pub value: u32,
}

impl TimeValue {
    /// Create a new time value
    pub fn new(time: NaiveDateTime, value: u32) -> Self {
        Self { time, value }
    }

    /// Decode a time value from a property payload
    ///
    /// # Returns
    /// `None` if there is no payload, its length is not
    /// [`TIME_VALUE_LENGTH`], or the date/time fields are out of range
    pub fn decode(edt: Option<&[u8]>) -> Option<Self> {
        let edt = edt?;
        if edt.len() != TIME_VALUE_LENGTH {
            return None;
        }
        let year = i32::from(u16::from_be_bytes([edt[0], edt[1]]));
        let time = NaiveDate::from_ymd_opt(year, u32::from(edt[2]), u32::from(edt[3]))?
            .and_hms_opt(u32::from(edt[4]), u32::from(edt[5]), u32::from(edt[6]))?;
        let value = u32::from_be_bytes([edt[7], edt[8], edt[9], edt[10]]);
        Some(Self { time, value })
    }

    /// Encode this time value into a property payload
    pub fn encode(&self) -> [u8; TIME_VALUE_LENGTH] {
        let mut buffer = [0u8; TIME_VALUE_LENGTH];
        buffer[0..2].copy_from_slice(&(self.time.year() as u16).to_be_bytes());
        buffer[2] = self.time.month() as u8;
        buffer[3] = self.time.day() as u8;
        buffer[4] = self.time.hour() as u8;
        buffer[5] = self.time.minute() as u8;
        buffer[6] = self.time.second() as u8;
        buffer[7..11].copy_from_slice(&self.value.to_be_bytes());
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_decode() {
        let cases = [
            (
                [0x07, 0xe4, 0x0c, 0x1f, 0x17, 0x3b, 0x3b, 0x12, 0x34, 0x56, 0x78],
                at(2020, 12, 31, 23, 59, 59),
            ),
            (
                [0x07, 0xe5, 0x01, 0x01, 0x00, 0x00, 0x00, 0x12, 0x34, 0x56, 0x78],
                at(2021, 1, 1, 0, 0, 0),
            ),
            (
                [0x07, 0xe5, 0x01, 0x01, 0x09, 0x00, 0x00, 0x12, 0x34, 0x56, 0x78],
                at(2021, 1, 1, 9, 0, 0),
            ),
        ];
        for (edt, time) in cases {
            assert_eq!(
                TimeValue::decode(Some(&edt)),
                Some(TimeValue::new(time, 0x12345678))
            );
        }
    }

    #[test]
    fn test_decode_wrong_length() {
        let short = [0x07, 0xe5, 0x01, 0x01, 0x09, 0x00, 0x00, 0x12, 0x34, 0x56];
        let long = [0x07, 0xe5, 0x01, 0x01, 0x09, 0x00, 0x00, 0x12, 0x34, 0x56, 0x78, 0x90];
        assert_eq!(TimeValue::decode(Some(&short)), None);
        assert_eq!(TimeValue::decode(Some(&long)), None);
        assert_eq!(TimeValue::decode(None), None);
    }

    #[test]
    fn test_decode_invalid_date() {
        let edt = [0x07, 0xe5, 0x0d, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01];
        assert_eq!(TimeValue::decode(Some(&edt)), None);
    }

    #[test]
    fn test_encode() {
        let value = TimeValue::new(at(2020, 12, 31, 23, 59, 59), 0x12345678);
        assert_eq!(
            value.encode(),
            [0x07, 0xe4, 0x0c, 0x1f, 0x17, 0x3b, 0x3b, 0x12, 0x34, 0x56, 0x78]
        );
        assert_eq!(TimeValue::decode(Some(&value.encode())), Some(value));
    }
}
