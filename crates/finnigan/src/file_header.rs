//! FileHeader decoding, the first structure in the file.
//!
//! Layout (2384 bytes, all versions):
//! - 2 bytes: magic (0xA101)
//! - 18 bytes: signature (UTF-16LE, "Finnigan")
//! - 16 bytes: 4 unknown u32
//! - 4 bytes: version
//! - 112 bytes: audit_start (AuditTag)
//! - 112 bytes: audit_end (AuditTag)
//! - 4 bytes: unknown
//! - 60 bytes: unknown area
//! - 2056 bytes: tag (UTF-16LE, 1028 chars)

use crate::stream::{field, FieldTemplate, FieldType, Reader, Record};
use crate::version::FINNIGAN_MAGIC;
use crate::RawError;

const FILE_HEADER_HEAD: [FieldTemplate; 7] = [
    field("magic", FieldType::U16, "Magic"),
    field("signature", FieldType::Utf16Fixed(18), "Signature"),
    field("unknown1", FieldType::U32, "Unknown"),
    field("unknown2", FieldType::U32, "Unknown"),
    field("unknown3", FieldType::U32, "Unknown"),
    field("unknown4", FieldType::U32, "Unknown"),
    field("version", FieldType::U32, "Version"),
];

const AUDIT_TAG: [FieldTemplate; 3] = [
    field("time", FieldType::U64, "Time"),
    field("tag", FieldType::Utf16Fixed(100), "Tag"),
    field("unknown", FieldType::U32, "Unknown"),
];

const FILE_HEADER_TAIL: [FieldTemplate; 3] = [
    field("unknown5", FieldType::U32, "Unknown"),
    field("unknown_area", FieldType::Bytes(60), "Unknown area"),
    field("tag", FieldType::Utf16Fixed(2056), "Tag"),
];

/// Audit tag: Windows FILETIME plus a user tag.
#[derive(Debug, Clone)]
pub struct AuditTag {
    pub time: u64,
    pub tag: String,
}

impl AuditTag {
    fn decode(reader: &mut Reader) -> Result<Self, RawError> {
        let rec = Record::read(reader, &AUDIT_TAG)?;
        Ok(Self {
            time: rec.u64("time")?,
            tag: rec.str("tag")?.to_string(),
        })
    }
}

/// Parsed Finnigan file header.
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub magic: u16,
    pub signature: String,
    pub version: u32,
    pub audit_start: AuditTag,
    pub audit_end: AuditTag,
    pub tag: String,
}

impl FileHeader {
    /// Size of the FileHeader in bytes.
    pub const SIZE: u64 = 2384;

    /// Decode the FileHeader at the reader's current position.
    pub fn decode(reader: &mut Reader) -> Result<Self, RawError> {
        let head = Record::read(reader, &FILE_HEADER_HEAD)?;

        let magic = head.u16("magic")?;
        if magic != FINNIGAN_MAGIC {
            return Err(RawError::NotRawFile);
        }

        let audit_start = AuditTag::decode(reader)?;
        let audit_end = AuditTag::decode(reader)?;
        let tail = Record::read(reader, &FILE_HEADER_TAIL)?;

        Ok(Self {
            magic,
            signature: head.str("signature")?.to_string(),
            version: head.u32("version")?,
            audit_start,
            audit_end,
            tag: tail.str("tag")?.to_string(),
        })
    }
}

/// Convert Windows FILETIME (100-nanosecond intervals since 1601-01-01) to
/// an ISO 8601 date string.
pub fn filetime_to_string(filetime: u64) -> String {
    const FILETIME_UNIX_DIFF: u64 = 116_444_736_000_000_000;
    if filetime < FILETIME_UNIX_DIFF {
        // Zero or pre-epoch: the audit field was never written.
        return "unknown".to_string();
    }
    let unix_secs = (filetime - FILETIME_UNIX_DIFF) / 10_000_000;
    let (year, month, day) = days_to_ymd(unix_secs / 86400);
    let secs_of_day = unix_secs % 86400;

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        secs_of_day / 3600,
        (secs_of_day % 3600) / 60,
        secs_of_day % 60
    )
}

fn is_leap_year(year: u64) -> bool {
    year.is_multiple_of(4) && (!year.is_multiple_of(100) || year.is_multiple_of(400))
}

fn year_days(year: u64) -> u64 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// Days since 1970-01-01 to (year, month, day).
fn days_to_ymd(mut days: u64) -> (u64, u64, u64) {
    let mut year = 1970;
    while days >= year_days(year) {
        days -= year_days(year);
        year += 1;
    }

    let feb = if is_leap_year(year) { 29 } else { 28 };
    let month_days = [31u64, feb, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let mut month = 1;
    for len in month_days {
        if days < len {
            break;
        }
        days -= len;
        month += 1;
    }
    (year, month, days + 1)
}
