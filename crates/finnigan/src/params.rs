//! Scan parameters stream: runtime schema plus per-scan records.
//!
//! The parameter area is self-describing. After the error log comes a scan
//! hierarchy (segments of scan event templates, consumed only to advance the
//! stream), then a GenericDataHeader: a list of (type code, length, label)
//! descriptors that governs how every per-scan record at `params_addr` is
//! decoded. The records themselves are flat and fixed-size; the header is
//! the only place their layout is written down.

use crate::scan_event::ScanEvent;
use crate::stream::read_string;
use crate::stream::Reader;
use crate::RawError;
use std::collections::HashMap;

/// Type codes for GenericDataDescriptor.
pub mod type_codes {
    pub const SEPARATOR: u32 = 0x00;
    pub const BOOL: u32 = 0x01;
    pub const I8: u32 = 0x02;
    pub const U8: u32 = 0x03;
    pub const I16: u32 = 0x04;
    pub const U16: u32 = 0x05;
    pub const I32: u32 = 0x06;
    pub const U32: u32 = 0x07;
    pub const F32: u32 = 0x08;
    pub const F64: u32 = 0x09;
    pub const ASCII: u32 = 0x0C;
    pub const WIDE_STRING: u32 = 0x0D;
}

/// A field descriptor in the GenericDataHeader.
#[derive(Debug, Clone)]
pub struct GenericDataDescriptor {
    pub type_code: u32,
    /// Declared length: string length for string types, unused otherwise.
    pub length: u32,
    pub label: String,
}

impl GenericDataDescriptor {
    /// Byte size of the field within a record.
    pub fn byte_size(&self) -> usize {
        match self.type_code {
            type_codes::SEPARATOR => 0,
            type_codes::BOOL | type_codes::I8 | type_codes::U8 => 1,
            type_codes::I16 | type_codes::U16 => 2,
            type_codes::I32 | type_codes::U32 | type_codes::F32 => 4,
            type_codes::F64 => 8,
            type_codes::ASCII => self.length as usize,
            type_codes::WIDE_STRING => self.length as usize * 2,
            _ => self.length as usize,
        }
    }
}

/// The runtime schema for ScanParameters records.
#[derive(Debug, Clone)]
pub struct GenericDataHeader {
    pub descriptors: Vec<GenericDataDescriptor>,
}

impl GenericDataHeader {
    /// Decode the header at the reader's current position.
    pub fn decode(reader: &mut Reader) -> Result<Self, RawError> {
        let n_fields = reader.read_u32()?;
        if n_fields > 10_000 {
            return Err(RawError::format(
                "generic_data_header",
                format!("unreasonable field count: {n_fields}"),
            ));
        }

        let mut descriptors = Vec::with_capacity(n_fields as usize);
        for _ in 0..n_fields {
            let type_code = reader.read_u32()?;
            let length = reader.read_u32()?;
            let label = read_string(reader, "descriptor_label")?;
            descriptors.push(GenericDataDescriptor {
                type_code,
                length,
                label,
            });
        }

        Ok(Self { descriptors })
    }

    /// Total byte size of one record decoded against this header.
    pub fn record_size(&self) -> usize {
        self.descriptors.iter().map(|d| d.byte_size()).sum()
    }

    /// Index of the descriptor with the given label (trailing colons and
    /// case ignored).
    pub fn find(&self, label: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| {
            d.label
                .trim_end_matches(':')
                .trim()
                .eq_ignore_ascii_case(label)
        })
    }

    pub fn labels(&self) -> Vec<String> {
        self.descriptors
            .iter()
            .map(|d| d.label.trim_end_matches(':').trim().to_string())
            .collect()
    }
}

/// One decoded field of a ScanParameters record.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Empty,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    F32(f32),
    F64(f64),
    Str(String),
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Empty => Ok(()),
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::I8(v) => write!(f, "{}", v),
            ParamValue::U8(v) => write!(f, "{}", v),
            ParamValue::I16(v) => write!(f, "{}", v),
            ParamValue::U16(v) => write!(f, "{}", v),
            ParamValue::I32(v) => write!(f, "{}", v),
            ParamValue::U32(v) => write!(f, "{}", v),
            ParamValue::F32(v) => write!(f, "{}", v),
            ParamValue::F64(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "{}", v),
        }
    }
}

impl ParamValue {
    fn as_u32(&self) -> Option<u32> {
        match *self {
            ParamValue::U8(v) => Some(v as u32),
            ParamValue::I8(v) if v >= 0 => Some(v as u32),
            ParamValue::U16(v) => Some(v as u32),
            ParamValue::I16(v) if v >= 0 => Some(v as u32),
            ParamValue::U32(v) => Some(v),
            ParamValue::I32(v) if v >= 0 => Some(v as u32),
            _ => None,
        }
    }
}

/// One scan's parameter record, decoded against a GenericDataHeader.
#[derive(Debug, Clone)]
pub struct ScanParameters {
    pub values: Vec<ParamValue>,
}

impl ScanParameters {
    /// Decode one record at the reader's current position.
    pub fn decode(reader: &mut Reader, header: &GenericDataHeader) -> Result<Self, RawError> {
        let mut values = Vec::with_capacity(header.descriptors.len());
        for desc in &header.descriptors {
            values.push(decode_field(reader, desc)?);
        }
        Ok(Self { values })
    }

    /// The precursor charge state, when the schema has the field and the
    /// stored value is nonzero.
    pub fn charge_state(&self, header: &GenericDataHeader) -> Option<u32> {
        let idx = header.find("Charge State")?;
        self.values
            .get(idx)
            .and_then(ParamValue::as_u32)
            .filter(|&c| c > 0)
    }

    /// Label → printable value map, for dump tooling.
    pub fn to_map(&self, header: &GenericDataHeader) -> HashMap<String, String> {
        header
            .labels()
            .into_iter()
            .zip(self.values.iter())
            .map(|(label, value)| (label, value.to_string()))
            .collect()
    }
}

fn decode_field(
    reader: &mut Reader,
    desc: &GenericDataDescriptor,
) -> Result<ParamValue, RawError> {
    Ok(match desc.type_code {
        type_codes::SEPARATOR => ParamValue::Empty,
        type_codes::BOOL => ParamValue::Bool(reader.read_u8()? != 0),
        type_codes::I8 => ParamValue::I8(reader.read_u8()? as i8),
        type_codes::U8 => ParamValue::U8(reader.read_u8()?),
        type_codes::I16 => ParamValue::I16(reader.read_i16()?),
        type_codes::U16 => ParamValue::U16(reader.read_u16()?),
        type_codes::I32 => ParamValue::I32(reader.read_i32()?),
        type_codes::U32 => ParamValue::U32(reader.read_u32()?),
        type_codes::F32 => ParamValue::F32(reader.read_f32()?),
        type_codes::F64 => ParamValue::F64(reader.read_f64()?),
        type_codes::ASCII => {
            let bytes = reader.read_bytes(desc.length as usize)?;
            ParamValue::Str(
                String::from_utf8_lossy(&bytes)
                    .trim_end_matches('\0')
                    .to_string(),
            )
        }
        type_codes::WIDE_STRING => {
            ParamValue::Str(reader.read_utf16_fixed(desc.length as usize * 2)?)
        }
        _ => {
            // Unknown type code: skip the declared length.
            reader.skip(desc.byte_size())?;
            ParamValue::Empty
        }
    })
}

/// Advance the reader past the scan hierarchy: a u32 segment count, each
/// segment a u32-counted list of scan event templates. The templates share
/// the ScanEvent wire shape and are not retained.
pub fn skip_hierarchy(reader: &mut Reader, ver: u32) -> Result<(), RawError> {
    let nsegs = reader.read_u32()?;
    if nsegs > 1_000 {
        return Err(RawError::format(
            "hierarchy",
            format!("unreasonable segment count: {nsegs}"),
        ));
    }
    for _ in 0..nsegs {
        let n_templates = reader.read_u32()?;
        if n_templates > 10_000 {
            return Err(RawError::format(
                "hierarchy",
                format!("unreasonable template count: {n_templates}"),
            ));
        }
        for _ in 0..n_templates {
            let _ = ScanEvent::decode(reader, ver)?;
        }
    }
    Ok(())
}

/// Decode per-scan parameter records sequentially from `params_addr`,
/// returning the charge state for scans in `[from, to]`.
///
/// The stream is not random-accessible, so records for scans before `from`
/// are decoded and discarded.
pub fn decode_charge_states(
    data: &[u8],
    header: &GenericDataHeader,
    params_addr: u64,
    first_scan: u32,
    from: u32,
    to: u32,
) -> Result<Vec<Option<u32>>, RawError> {
    let mut reader = Reader::at_offset(data, params_addr);
    let mut charges = Vec::new();
    let mut scan = first_scan;
    while scan <= to {
        let record = ScanParameters::decode(&mut reader, header)?;
        if scan >= from {
            charges.push(record.charge_state(header));
        }
        scan += 1;
    }
    Ok(charges)
}
