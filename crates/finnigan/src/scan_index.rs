//! ScanIndex decoding (per-scan offset table).
//!
//! Fixed-size entries keyed by scan number, mapping each scan to its byte
//! offset in the data stream plus lightweight metadata (RT, TIC, base peak,
//! m/z range). The first entry is decoded once as a probe to learn the
//! record stride, then the requested range is decoded as an array.
//!
//! Entries carry `index`/`next` link fields suggesting a linked list; in
//! every file observed they are physically sequential, and this decoder
//! assumes so. The stored links are decoded but not followed.
//!
//! Layout:
//! - v<64 (72 bytes): 32-bit data offset at the front
//! - v64+ (80 bytes): adds a 64-bit data offset at the end, superseding the
//!   32-bit field

use crate::stream::{field, FieldTemplate, FieldType, Reader, Record};
use crate::version;
use crate::RawError;

const ENTRY_32: [FieldTemplate; 13] = [
    field("offset", FieldType::U32, "Data offset"),
    field("index", FieldType::U32, "Scan index"),
    field("scan_event", FieldType::U16, "Scan event"),
    field("scan_segment", FieldType::U16, "Scan segment"),
    field("next", FieldType::U32, "Next scan index"),
    field("unknown", FieldType::U32, "Unknown"),
    field("data_size", FieldType::U32, "Data size"),
    field("start_time", FieldType::F64, "Start time (min)"),
    field("total_current", FieldType::F64, "Total ion current"),
    field("base_mz", FieldType::F64, "Base peak m/z"),
    field("base_intensity", FieldType::F64, "Base peak intensity"),
    field("low_mz", FieldType::F64, "Low m/z"),
    field("high_mz", FieldType::F64, "High m/z"),
];

const ENTRY_64: [FieldTemplate; 14] = [
    field("offset32", FieldType::U32, "Data offset (32-bit)"),
    field("index", FieldType::U32, "Scan index"),
    field("scan_event", FieldType::U16, "Scan event"),
    field("scan_segment", FieldType::U16, "Scan segment"),
    field("next", FieldType::U32, "Next scan index"),
    field("unknown", FieldType::U32, "Unknown"),
    field("data_size", FieldType::U32, "Data size"),
    field("start_time", FieldType::F64, "Start time (min)"),
    field("total_current", FieldType::F64, "Total ion current"),
    field("base_mz", FieldType::F64, "Base peak m/z"),
    field("base_intensity", FieldType::F64, "Base peak intensity"),
    field("low_mz", FieldType::F64, "Low m/z"),
    field("high_mz", FieldType::F64, "High m/z"),
    field("offset", FieldType::U64, "Data offset"),
];

fn entry_templates(ver: u32) -> &'static [FieldTemplate] {
    if version::uses_64bit_addresses(ver) {
        &ENTRY_64
    } else {
        &ENTRY_32
    }
}

/// A single entry in the scan index.
#[derive(Debug, Clone)]
pub struct ScanIndexEntry {
    /// Byte offset of the scan, relative to the data stream address.
    pub offset: u64,
    /// Stored 0-based index of this entry (link field, not relied upon).
    pub index: u32,
    /// Stored index of the following entry (link field, not relied upon).
    pub next: u32,
    pub scan_event: u16,
    pub scan_segment: u16,
    /// Scan data size in bytes (0 when the writer did not fill it in).
    pub data_size: u32,
    /// Retention time in minutes.
    pub start_time: f64,
    pub total_current: f64,
    pub base_mz: f64,
    pub base_intensity: f64,
    pub low_mz: f64,
    pub high_mz: f64,
}

impl ScanIndexEntry {
    fn from_record(rec: &Record) -> Result<Self, RawError> {
        Ok(Self {
            offset: rec.addr("offset")?,
            index: rec.u32("index")?,
            next: rec.u32("next")?,
            scan_event: rec.u16("scan_event")?,
            scan_segment: rec.u16("scan_segment")?,
            data_size: rec.u32("data_size")?,
            start_time: rec.f64("start_time")?,
            total_current: rec.f64("total_current")?,
            base_mz: rec.f64("base_mz")?,
            base_intensity: rec.f64("base_intensity")?,
            low_mz: rec.f64("low_mz")?,
            high_mz: rec.f64("high_mz")?,
        })
    }
}

/// Decode scan index entries for scans `[from, to]` (1-based, inclusive,
/// clamped to `[first_scan, last_scan]`).
///
/// The returned vector is keyed by zero-based offset from the clamped `from`.
pub fn decode_range(
    data: &[u8],
    scan_index_addr: u64,
    ver: u32,
    first_scan: u32,
    last_scan: u32,
    from: u32,
    to: u32,
) -> Result<Vec<ScanIndexEntry>, RawError> {
    let from = from.max(first_scan);
    let to = to.min(last_scan);
    if from > to {
        return Ok(vec![]);
    }

    let templates = entry_templates(ver);

    // Probe the first entry to learn the record stride, then seek back.
    let mut reader = Reader::at_offset(data, scan_index_addr);
    let probe = Record::read(&mut reader, templates)?;
    let record_size = probe.size();

    let start = scan_index_addr + (from - first_scan) as u64 * record_size;
    reader.set_position(start);

    let count = to - from + 1;
    let records = Record::read_array(&mut reader, count, templates)?;
    records.iter().map(ScanIndexEntry::from_record).collect()
}
