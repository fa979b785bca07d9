//! RawFileInfo decoding.
//!
//! The preamble carries the acquisition timestamp and the absolute addresses
//! of up to two RunHeaders (one per acquisition stream). Addresses are 32-bit
//! below v64 and 64-bit from v64 on; the two layouts are separate template
//! lists, selected by version.

use crate::stream::read_string;
use crate::stream::{field, FieldTemplate, FieldType, Reader, Record};
use crate::version;
use crate::RawError;

const PREAMBLE_HEAD: [FieldTemplate; 12] = [
    field("method_present", FieldType::U32, "Method file present"),
    field("year", FieldType::U16, "Year"),
    field("month", FieldType::U16, "Month"),
    field("day_of_week", FieldType::U16, "Day of week"),
    field("day", FieldType::U16, "Day"),
    field("hour", FieldType::U16, "Hour"),
    field("minute", FieldType::U16, "Minute"),
    field("second", FieldType::U16, "Second"),
    field("millisecond", FieldType::U16, "Millisecond"),
    field("in_acquisition", FieldType::U32, "In acquisition"),
    field("n_streams", FieldType::U32, "Number of streams"),
    field("unknown", FieldType::U32, "Unknown"),
];

const ADDRESSES_32: [FieldTemplate; 5] = [
    field("data_addr", FieldType::U32, "Data stream address"),
    field("run_header_addr0", FieldType::U32, "Run header address (stream 0)"),
    field("run_header_addr1", FieldType::U32, "Run header address (stream 1)"),
    field("pad1", FieldType::U32, "Padding"),
    field("pad2", FieldType::U32, "Padding"),
];

const ADDRESSES_64: [FieldTemplate; 5] = [
    field("data_addr", FieldType::U64, "Data stream address"),
    field("run_header_addr0", FieldType::U64, "Run header address (stream 0)"),
    field("run_header_addr1", FieldType::U64, "Run header address (stream 1)"),
    field("pad1", FieldType::U32, "Padding"),
    field("pad2", FieldType::U32, "Padding"),
];

fn address_templates(version: u32) -> &'static [FieldTemplate] {
    if version::uses_64bit_addresses(version) {
        &ADDRESSES_64
    } else {
        &ADDRESSES_32
    }
}

/// Parsed RawFileInfo.
#[derive(Debug, Clone)]
pub struct RawFileInfo {
    pub year: u16,
    pub month: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    /// Absolute RunHeader addresses; index 1 is zero for single-stream files.
    pub run_header_addr: [u64; 2],
    pub n_streams: u32,
    /// User labels and computer name.
    pub headings: Vec<String>,
}

impl RawFileInfo {
    /// Decode RawFileInfo at the reader's current position.
    pub fn decode(reader: &mut Reader, version: u32) -> Result<Self, RawError> {
        let head = Record::read(reader, &PREAMBLE_HEAD)?;
        let addrs = Record::read(reader, address_templates(version))?;

        let mut headings = Vec::with_capacity(6);
        for _ in 0..5 {
            headings.push(read_string(reader, "heading")?);
        }
        headings.push(read_string(reader, "computer_name")?);

        Ok(Self {
            year: head.u16("year")?,
            month: head.u16("month")?,
            day: head.u16("day")?,
            hour: head.u16("hour")?,
            minute: head.u16("minute")?,
            second: head.u16("second")?,
            run_header_addr: [addrs.addr("run_header_addr0")?, addrs.addr("run_header_addr1")?],
            n_streams: head.u32("n_streams")?,
            headings,
        })
    }

    /// Format the acquisition date as ISO 8601.
    pub fn acquisition_date(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}
