//! File-level metadata extraction.
//!
//! Combines information from the header chain into one flat record.

use crate::file_header::{filetime_to_string, FileHeader};
use crate::inst_id::InstId;
use crate::raw_file_info::RawFileInfo;
use crate::run_header::RunHeader;
use crate::seq_row::SeqRow;
use crate::types::FileMetadata;

/// Build FileMetadata from the decoded header chain.
pub fn build_metadata(
    header: &FileHeader,
    seq_row: &SeqRow,
    info: &RawFileInfo,
    run_header: &RunHeader,
    inst_id: &InstId,
) -> FileMetadata {
    // Prefer the RawFileInfo timestamp; fall back to the audit trail.
    let acquisition_date = if info.year > 0 {
        info.acquisition_date()
    } else {
        filetime_to_string(header.audit_start.time)
    };

    FileMetadata {
        acquisition_date,
        instrument_model: inst_id.model.clone(),
        instrument_serial: inst_id.serial_number.clone(),
        software_version: inst_id.software_version.clone(),
        sample_name: seq_row.sample_name.clone(),
        comment: seq_row.comment.clone(),
        first_scan: run_header.first_scan,
        last_scan: run_header.last_scan,
        start_time: run_header.start_time,
        end_time: run_header.end_time,
        low_mass: run_header.low_mz,
        high_mass: run_header.high_mz,
    }
}
