//! SeqRow decoding (the sequence-table row for this acquisition).
//!
//! Follows the FileHeader. A 60-byte injection block, then a run of counted
//! UTF-16 strings; v58 adds fifteen extra user columns at the end.

use crate::stream::{field, read_string, FieldTemplate, FieldType, Reader, Record};
use crate::RawError;

const INJECTION: [FieldTemplate; 9] = [
    field("unknown", FieldType::U32, "Unknown"),
    field("row_number", FieldType::U32, "Row number"),
    field("sample_type", FieldType::U32, "Sample type"),
    field("vial", FieldType::Utf16Fixed(8), "Vial"),
    field("injection_volume", FieldType::F64, "Injection volume"),
    field("sample_weight", FieldType::F64, "Sample weight"),
    field("sample_volume", FieldType::F64, "Sample volume"),
    field("istd_amount", FieldType::F64, "ISTD amount"),
    field("dilution_factor", FieldType::F64, "Dilution factor"),
];

/// String fields present in every supported version, in stream order.
const BASE_STRINGS: [&str; 15] = [
    "sample_name",
    "sample_id",
    "comment",
    "user_label1",
    "user_label2",
    "user_label3",
    "user_label4",
    "user_label5",
    "inst_method",
    "proc_method",
    "raw_file_name",
    "path",
    "vial_name",
    "calib_file",
    "barcode",
];

/// Number of extra user columns appended from v58 on.
const EXTRA_USER_COLUMNS: usize = 15;

/// Parsed sequence row.
#[derive(Debug, Clone)]
pub struct SeqRow {
    pub row_number: u32,
    pub vial: String,
    pub injection_volume: f64,
    pub sample_weight: f64,
    pub sample_volume: f64,
    pub istd_amount: f64,
    pub dilution_factor: f64,
    pub sample_name: String,
    pub sample_id: String,
    pub comment: String,
    pub inst_method: String,
    pub proc_method: String,
    pub raw_file_name: String,
    pub path: String,
    pub barcode_status: u32,
}

impl SeqRow {
    /// Decode the SeqRow at the reader's current position.
    pub fn decode(reader: &mut Reader, version: u32) -> Result<Self, RawError> {
        let injection = Record::read(reader, &INJECTION)?;

        let mut strings = Vec::with_capacity(BASE_STRINGS.len());
        for name in BASE_STRINGS {
            strings.push((name, read_string(reader, name)?));
        }
        let barcode_status = reader.read_u32()?;

        if version >= 58 {
            for _ in 0..EXTRA_USER_COLUMNS {
                read_string(reader, "extra_user_column")?;
            }
        }

        let get = |name: &str| -> String {
            strings
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, s)| s.clone())
                .unwrap_or_default()
        };

        Ok(Self {
            row_number: injection.u32("row_number")?,
            vial: injection.str("vial")?.to_string(),
            injection_volume: injection.f64("injection_volume")?,
            sample_weight: injection.f64("sample_weight")?,
            sample_volume: injection.f64("sample_volume")?,
            istd_amount: injection.f64("istd_amount")?,
            dilution_factor: injection.f64("dilution_factor")?,
            sample_name: get("sample_name"),
            sample_id: get("sample_id"),
            comment: get("comment"),
            inst_method: get("inst_method"),
            proc_method: get("proc_method"),
            raw_file_name: get("raw_file_name"),
            path: get("path"),
            barcode_status,
        })
    }
}
