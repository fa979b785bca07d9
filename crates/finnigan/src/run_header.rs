//! RunHeader decoding.
//!
//! Each acquisition stream has a RunHeader holding the scan range
//! (SampleInfo) and the absolute addresses of the data, scan index, trailer,
//! error log, and scan parameter regions. A file may carry two RunHeaders;
//! exactly one, the one with `ntrailer > 0`, is authoritative.
//!
//! Below v64 all addresses are 32-bit and live partly in SampleInfo, partly
//! in the tail; from v64 a block of 64-bit addresses in the tail supersedes
//! the 32-bit fields. Both layouts are template lists selected by version.

use crate::stream::{field, FieldTemplate, FieldType, Reader, Record};
use crate::version;
use crate::RawError;

const SAMPLE_INFO: [FieldTemplate; 18] = [
    field("unknown1", FieldType::U32, "Unknown"),
    field("unknown2", FieldType::U32, "Unknown"),
    field("first_scan", FieldType::U32, "First scan number"),
    field("last_scan", FieldType::U32, "Last scan number"),
    field("inst_log_len", FieldType::U32, "Instrument log length"),
    field("error_log_len", FieldType::U32, "Error log length"),
    field("ntrailer", FieldType::U32, "Trailer event count"),
    field("nparams", FieldType::U32, "Scan parameter record count"),
    field("data_addr", FieldType::U32, "Data stream address"),
    field("scan_index_addr", FieldType::U32, "Scan index address"),
    field("inst_log_addr", FieldType::U32, "Instrument log address"),
    field("error_log_addr", FieldType::U32, "Error log address"),
    field("max_ion_current", FieldType::F64, "Max ion current"),
    field("low_mz", FieldType::F64, "Low m/z"),
    field("high_mz", FieldType::F64, "High m/z"),
    field("start_time", FieldType::F64, "Start time (min)"),
    field("end_time", FieldType::F64, "End time (min)"),
    field("unknown_area", FieldType::Bytes(56), "Unknown area"),
];

const SAMPLE_TAGS: [FieldTemplate; 3] = [
    field("tag1", FieldType::Utf16Fixed(88), "Tag 1"),
    field("tag2", FieldType::Utf16Fixed(40), "Tag 2"),
    field("tag3", FieldType::Utf16Fixed(320), "Tag 3"),
];

const TAIL_32: [FieldTemplate; 11] = [
    field("unknown_d1", FieldType::F64, "Unknown"),
    field("unknown_d2", FieldType::F64, "Unknown"),
    field("trailer_addr", FieldType::U32, "Trailer address"),
    field("params_addr", FieldType::U32, "Scan parameters address"),
    field("unknown3", FieldType::U32, "Unknown"),
    field("unknown4", FieldType::U32, "Unknown"),
    field("nsegs", FieldType::U32, "Segment count"),
    field("unknown5", FieldType::U32, "Unknown"),
    field("unknown6", FieldType::U32, "Unknown"),
    field("unknown7", FieldType::U32, "Unknown"),
    field("own_addr", FieldType::U32, "Run header address"),
];

const TAIL_64: [FieldTemplate; 13] = [
    field("unknown_d1", FieldType::F64, "Unknown"),
    field("unknown_d2", FieldType::F64, "Unknown"),
    field("scan_index_addr", FieldType::U64, "Scan index address"),
    field("data_addr", FieldType::U64, "Data stream address"),
    field("inst_log_addr", FieldType::U64, "Instrument log address"),
    field("error_log_addr", FieldType::U64, "Error log address"),
    field("own_addr", FieldType::U64, "Run header address"),
    field("trailer_addr", FieldType::U64, "Trailer address"),
    field("params_addr", FieldType::U64, "Scan parameters address"),
    field("nsegs", FieldType::U32, "Segment count"),
    field("unknown3", FieldType::U32, "Unknown"),
    field("unknown4", FieldType::U32, "Unknown"),
    field("unknown5", FieldType::U32, "Unknown"),
];

const INSTRUMENT_TYPE: [FieldTemplate; 1] =
    [field("instrument_type", FieldType::I32, "Instrument type")];

/// Parsed RunHeader with all addresses resolved to 64-bit.
#[derive(Debug, Clone, PartialEq)]
pub struct RunHeader {
    pub first_scan: u32,
    pub last_scan: u32,
    /// Number of trailer scan events; nonzero marks the authoritative stream.
    pub ntrailer: u32,
    pub nparams: u32,
    pub max_ion_current: f64,
    pub low_mz: f64,
    pub high_mz: f64,
    /// Acquisition start/end time in minutes.
    pub start_time: f64,
    pub end_time: f64,
    pub data_addr: u64,
    pub scan_index_addr: u64,
    pub inst_log_addr: u64,
    pub error_log_addr: u64,
    pub trailer_addr: u64,
    pub params_addr: u64,
    /// Instrument type identifier (v66+ only, 0 otherwise).
    pub instrument_type: i32,
    /// Absolute offset the RunHeader was decoded from.
    pub start_offset: u64,
    /// Absolute offset just past the RunHeader (where InstID begins).
    pub end_offset: u64,
}

impl RunHeader {
    /// Decode a RunHeader at the reader's current position.
    pub fn decode(reader: &mut Reader, version: u32) -> Result<Self, RawError> {
        let start_offset = reader.position();
        let sample_info = Record::read(reader, &SAMPLE_INFO)?;
        let _tags = Record::read(reader, &SAMPLE_TAGS)?;

        let wide = version::uses_64bit_addresses(version);
        let tail = Record::read(reader, if wide { &TAIL_64[..] } else { &TAIL_32[..] })?;

        let instrument_type = if version >= 66 {
            Record::read(reader, &INSTRUMENT_TYPE)?.i32("instrument_type")?
        } else {
            0
        };

        // The v64+ tail supersedes the 32-bit SampleInfo addresses.
        let addr_rec = if wide { &tail } else { &sample_info };

        Ok(Self {
            first_scan: sample_info.u32("first_scan")?,
            last_scan: sample_info.u32("last_scan")?,
            ntrailer: sample_info.u32("ntrailer")?,
            nparams: sample_info.u32("nparams")?,
            max_ion_current: sample_info.f64("max_ion_current")?,
            low_mz: sample_info.f64("low_mz")?,
            high_mz: sample_info.f64("high_mz")?,
            start_time: sample_info.f64("start_time")?,
            end_time: sample_info.f64("end_time")?,
            data_addr: addr_rec.addr("data_addr")?,
            scan_index_addr: addr_rec.addr("scan_index_addr")?,
            inst_log_addr: addr_rec.addr("inst_log_addr")?,
            error_log_addr: addr_rec.addr("error_log_addr")?,
            trailer_addr: tail.addr("trailer_addr")?,
            params_addr: tail.addr("params_addr")?,
            instrument_type,
            start_offset,
            end_offset: reader.position(),
        })
    }

    /// Number of scans in the acquisition.
    pub fn n_scans(&self) -> u32 {
        if self.last_scan >= self.first_scan {
            self.last_scan - self.first_scan + 1
        } else {
            0
        }
    }
}
