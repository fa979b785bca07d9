//! Autosampler info decoding.
//!
//! A 24-byte tray geometry block followed by the tray name.

use crate::stream::read_string;
use crate::stream::{field, FieldTemplate, FieldType, Reader, Record};
use crate::RawError;

const AS_PREAMBLE: [FieldTemplate; 6] = [
    field("tray_index", FieldType::I32, "Tray index"),
    field("vial_index", FieldType::I32, "Vial index"),
    field("vials_per_tray", FieldType::I32, "Vials per tray"),
    field("vials_per_tray_x", FieldType::I32, "Vials per tray (x)"),
    field("vials_per_tray_y", FieldType::I32, "Vials per tray (y)"),
    field("tray_shape", FieldType::I32, "Tray shape"),
];

/// Parsed autosampler info.
#[derive(Debug, Clone)]
pub struct AsInfo {
    pub tray_index: i32,
    pub vial_index: i32,
    pub vials_per_tray: i32,
    pub tray_name: String,
}

impl AsInfo {
    /// Decode the autosampler block at the reader's current position.
    pub fn decode(reader: &mut Reader) -> Result<Self, RawError> {
        let preamble = Record::read(reader, &AS_PREAMBLE)?;
        let tray_name = read_string(reader, "tray_name")?;
        Ok(Self {
            tray_index: preamble.i32("tray_index")?,
            vial_index: preamble.i32("vial_index")?,
            vials_per_tray: preamble.i32("vials_per_tray")?,
            tray_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode() {
        let mut data = Vec::new();
        for v in [2i32, 17, 96, 12, 8, 0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&4u32.to_le_bytes());
        for c in "Tray".encode_utf16() {
            data.extend_from_slice(&c.to_le_bytes());
        }
        data.extend_from_slice(&0x55u32.to_le_bytes());

        let mut reader = Reader::new(&data);
        let info = AsInfo::decode(&mut reader).unwrap();
        assert_eq!(info.tray_index, 2);
        assert_eq!(info.vials_per_tray, 96);
        assert_eq!(info.tray_name, "Tray");
        assert_eq!(reader.read_u32().unwrap(), 0x55);
    }
}
