//! Top-level entry point: open and read Finnigan RAW files.
//!
//! Opening a file decodes the whole header chain and the per-scan index
//! tables eagerly; scan payloads are decoded on demand. The chain is
//!
//! ```text
//! FileHeader -> SeqRow -> ASInfo -> RawFileInfo -> RunHeader(s) -> InstID
//! ```
//!
//! followed by the scan index, the trailer (scan events), the error log,
//! the scan hierarchy, and the self-describing scan parameters stream.

use crate::as_info::AsInfo;
use crate::error_log::{decode_error_log, ErrorLogEntry, ErrorLogHandler};
use crate::file_header::FileHeader;
use crate::inst_id::InstId;
use crate::metadata;
use crate::params::{self, GenericDataHeader, ScanParameters};
use crate::peak_lookup::{self, DEFAULT_TOLERANCE};
use crate::raw_file_info::RawFileInfo;
use crate::run_header::RunHeader;
use crate::scan_data::{self, PeakMode, ScanPayload};
use crate::scan_event::{self, ScanEvent};
use crate::scan_index::{self, ScanIndexEntry};
use crate::seq_row::SeqRow;
use crate::stream::Reader;
use crate::types::{FileMetadata, MsLevel, ScanMetadata};
use crate::version;
use crate::RawError;
use std::ops::Deref;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Count of scans decoded so far by a parallel read.
///
/// Workers increment it after each scan; a UI can poll it on a timer to
/// drive a progress bar without coupling the decoder to any frontend.
pub type ProgressCounter = Arc<AtomicU64>;

/// Create a zero-initialized scan-progress counter.
pub fn new_counter() -> ProgressCounter {
    Arc::new(AtomicU64::new(0))
}

/// Abstraction over file data sources (owned bytes or memory-mapped).
#[derive(Debug)]
enum FileData {
    Owned(Vec<u8>),
    Mapped(memmap2::Mmap),
}

impl Deref for FileData {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        match self {
            FileData::Owned(v) => v,
            FileData::Mapped(m) => m,
        }
    }
}

/// One decoded scan: eagerly-populated metadata plus the raw payload.
#[derive(Debug, Clone)]
pub struct Scan {
    pub metadata: ScanMetadata,
    payload: ScanPayload,
    mode: PeakMode,
    dependent: bool,
}

impl Scan {
    /// Render the (m/z, intensity) sequence. Rendering is deferred until
    /// called; profile bookends and mode fallback apply here.
    pub fn peaks(&self) -> Result<Vec<(f64, f32)>, RawError> {
        self.payload.peaks(self.mode)
    }

    /// The decoded payload (profile / centroid sections).
    pub fn payload(&self) -> &ScanPayload {
        &self.payload
    }

    /// Whether this scan depends on a preceding MS1 scan.
    pub fn dependent(&self) -> bool {
        self.dependent
    }
}

/// A Finnigan RAW file opened for reading.
#[derive(Debug)]
pub struct RawFile {
    /// Raw file bytes (owned or memory-mapped).
    data: FileData,
    /// RAW file schema version.
    version: u32,
    file_metadata: FileMetadata,
    run_header: RunHeader,
    inst_id: InstId,
    /// Scan index, one entry per scan, keyed by zero-based index.
    scan_index: Vec<ScanIndexEntry>,
    /// Trailer scan events, one per scan.
    scan_events: Vec<ScanEvent>,
    /// Charge state per scan from the parameters stream.
    charge_states: Vec<Option<u32>>,
    /// Schema of the scan parameters stream.
    params_header: GenericDataHeader,
    /// Entries decoded from the file's own error log.
    error_log: Vec<ErrorLogEntry>,
}

impl RawFile {
    /// Open a RAW file, reading it entirely into memory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RawError> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_data(FileData::Owned(data), None)
    }

    /// Open a RAW file using memory-mapping.
    ///
    /// More memory-efficient for large files; the OS pages data on demand.
    ///
    /// # Safety
    /// The file must not be modified while the RawFile is open.
    pub fn open_mmap(path: impl AsRef<Path>) -> Result<Self, RawError> {
        let file = std::fs::File::open(path.as_ref())?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Self::from_data(FileData::Mapped(mmap), None)
    }

    /// Open with a callback for instrument error-log entries. The callback
    /// runs once per entry; returning `true` suppresses the default
    /// `log::warn!`.
    pub fn open_with_handler(
        path: impl AsRef<Path>,
        handler: &mut ErrorLogHandler<'_>,
    ) -> Result<Self, RawError> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_data(FileData::Owned(data), Some(handler))
    }

    /// Decode a RAW file from an in-memory byte image.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, RawError> {
        Self::from_data(FileData::Owned(data), None)
    }

    /// Like [`RawFile::from_bytes`], with an error-log callback.
    pub fn from_bytes_with_handler(
        data: Vec<u8>,
        handler: &mut ErrorLogHandler<'_>,
    ) -> Result<Self, RawError> {
        Self::from_data(FileData::Owned(data), Some(handler))
    }

    fn from_data(
        data: FileData,
        handler: Option<&mut ErrorLogHandler<'_>>,
    ) -> Result<Self, RawError> {
        let mut reader = Reader::new(&data);

        // Front matter, in physical order.
        let file_header = FileHeader::decode(&mut reader)?;
        let ver = file_header.version;
        if !version::is_supported(ver) {
            return Err(RawError::UnsupportedVersion(ver));
        }
        let seq_row = SeqRow::decode(&mut reader, ver)?;
        let as_info = AsInfo::decode(&mut reader)?;
        let raw_file_info = RawFileInfo::decode(&mut reader, ver)?;
        log::debug!(
            "file v{}: acquired {}, tray {:?}",
            ver,
            raw_file_info.acquisition_date(),
            as_info.tray_name
        );

        // Resolve the authoritative run header.
        let run_header = Self::resolve_run_header(&data, &raw_file_info, ver)?;
        let n_scans = run_header.n_scans();

        // InstID sits immediately after the authoritative RunHeader.
        reader.set_position(run_header.end_offset);
        let inst_id = InstId::decode(&mut reader)?;

        // Index tables for the full acquisition range.
        let scan_index = scan_index::decode_range(
            &data,
            run_header.scan_index_addr,
            ver,
            run_header.first_scan,
            run_header.last_scan,
            run_header.first_scan,
            run_header.last_scan,
        )?;

        let scan_events = scan_event::decode_trailer(
            &data,
            run_header.trailer_addr,
            ver,
            run_header.first_scan,
            run_header.first_scan,
            run_header.last_scan,
        )?;

        if scan_index.len() != n_scans as usize || scan_events.len() != n_scans as usize {
            return Err(RawError::format(
                "index_tables",
                format!(
                    "expected {} scans, decoded {} index entries and {} trailer events",
                    n_scans,
                    scan_index.len(),
                    scan_events.len()
                ),
            ));
        }

        // Error log, hierarchy, and the parameters schema follow each other;
        // the per-scan records live at params_addr.
        reader.set_position(run_header.error_log_addr);
        let error_log = decode_error_log(&mut reader, handler)?;
        params::skip_hierarchy(&mut reader, ver)?;
        let params_header = GenericDataHeader::decode(&mut reader)?;
        let charge_states = params::decode_charge_states(
            &data,
            &params_header,
            run_header.params_addr,
            run_header.first_scan,
            run_header.first_scan,
            run_header.last_scan,
        )?;

        let file_metadata =
            metadata::build_metadata(&file_header, &seq_row, &raw_file_info, &run_header, &inst_id);

        Ok(Self {
            data,
            version: ver,
            file_metadata,
            run_header,
            inst_id,
            scan_index,
            scan_events,
            charge_states,
            params_header,
            error_log,
        })
    }

    /// Decode the RunHeader(s) named by RawFileInfo and pick the one with
    /// trailer events.
    fn resolve_run_header(
        data: &[u8],
        info: &RawFileInfo,
        ver: u32,
    ) -> Result<RunHeader, RawError> {
        let addr0 = info.run_header_addr[0];
        if addr0 == 0 {
            return Err(RawError::format(
                "raw_file_info",
                "no acquisition streams (run_header_addr[0] = 0)",
            ));
        }

        let mut reader = Reader::at_offset(data, addr0);
        let first = RunHeader::decode(&mut reader, ver)?;

        let addr1 = info.run_header_addr[1];
        if addr1 == 0 {
            return if first.ntrailer > 0 {
                Ok(first)
            } else {
                Err(RawError::MissingRunHeader {
                    first: first.ntrailer,
                    second: 0,
                })
            };
        }

        reader.set_position(addr1);
        let second = RunHeader::decode(&mut reader, ver)?;

        match (first.ntrailer > 0, second.ntrailer > 0) {
            (true, false) => Ok(first),
            (false, true) => Ok(second),
            (true, true) => Err(RawError::AmbiguousRunHeader {
                first: first.ntrailer,
                second: second.ntrailer,
            }),
            (false, false) => Err(RawError::MissingRunHeader {
                first: first.ntrailer,
                second: second.ntrailer,
            }),
        }
    }

    /// RAW file schema version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// File-level metadata.
    pub fn metadata(&self) -> &FileMetadata {
        &self.file_metadata
    }

    /// Total number of scans.
    pub fn n_scans(&self) -> u32 {
        self.scan_index.len() as u32
    }

    pub fn first_scan(&self) -> u32 {
        self.run_header.first_scan
    }

    pub fn last_scan(&self) -> u32 {
        self.run_header.last_scan
    }

    /// Instrument identification.
    pub fn inst_id(&self) -> &InstId {
        &self.inst_id
    }

    /// Entries from the file's own error log.
    pub fn error_log(&self) -> &[ErrorLogEntry] {
        &self.error_log
    }

    /// The raw scan index entries.
    pub fn scan_index(&self) -> &[ScanIndexEntry] {
        &self.scan_index
    }

    /// The trailer scan events, one per scan.
    pub fn scan_events(&self) -> &[ScanEvent] {
        &self.scan_events
    }

    /// Labels of the scan parameters schema.
    pub fn param_labels(&self) -> Vec<String> {
        self.params_header.labels()
    }

    /// Decode the full parameters record for one scan, as label → value.
    pub fn scan_parameters(
        &self,
        scan_number: u32,
    ) -> Result<std::collections::HashMap<String, String>, RawError> {
        let idx = self.scan_idx(scan_number)?;
        let record_size = self.params_header.record_size() as u64;
        let mut reader = Reader::at_offset(
            &self.data,
            self.run_header.params_addr + idx as u64 * record_size,
        );
        let record = ScanParameters::decode(&mut reader, &self.params_header)?;
        Ok(record.to_map(&self.params_header))
    }

    /// Iterate scans `[from, to]` (1-based, inclusive) in ascending order,
    /// preferring centroid data.
    pub fn scans(&self, from: u32, to: u32) -> Result<ScanIter<'_>, RawError> {
        self.scans_with_mode(from, to, PeakMode::Centroid)
    }

    /// Iterate scans with an explicit peak-data selection.
    pub fn scans_with_mode(
        &self,
        from: u32,
        to: u32,
        mode: PeakMode,
    ) -> Result<ScanIter<'_>, RawError> {
        self.check_range(from, to)?;
        Ok(ScanIter {
            raw: self,
            next: from,
            to,
            mode,
            parent: None,
        })
    }

    /// Read a single scan. No parent context: `precursor_intensity` is not
    /// resolved.
    pub fn scan(&self, scan_number: u32) -> Result<Scan, RawError> {
        self.scan_with_mode(scan_number, PeakMode::Centroid)
    }

    pub fn scan_with_mode(&self, scan_number: u32, mode: PeakMode) -> Result<Scan, RawError> {
        let idx = self.scan_idx(scan_number)?;
        self.decode_scan_at(idx, scan_number, mode)
    }

    /// Read scans `[from, to]` decoding payloads in parallel.
    ///
    /// Payload decoding is independent per scan; precursor intensities need
    /// the parent scan and are resolved in a sequential second pass.
    pub fn read_scans_parallel(
        &self,
        from: u32,
        to: u32,
        mode: PeakMode,
    ) -> Result<Vec<Scan>, RawError> {
        self.read_scans_parallel_inner(from, to, mode, None)
    }

    /// Like [`RawFile::read_scans_parallel`], ticking the progress counter
    /// after each decoded scan.
    pub fn read_scans_parallel_with_progress(
        &self,
        from: u32,
        to: u32,
        mode: PeakMode,
        counter: &ProgressCounter,
    ) -> Result<Vec<Scan>, RawError> {
        self.read_scans_parallel_inner(from, to, mode, Some(counter))
    }

    fn read_scans_parallel_inner(
        &self,
        from: u32,
        to: u32,
        mode: PeakMode,
        counter: Option<&ProgressCounter>,
    ) -> Result<Vec<Scan>, RawError> {
        use rayon::prelude::*;
        self.check_range(from, to)?;

        let mut scans = (from..=to)
            .into_par_iter()
            .map(|n| {
                let scan = self.decode_scan_at((n - self.run_header.first_scan) as usize, n, mode);
                if let Some(c) = counter {
                    c.fetch_add(1, Ordering::Relaxed);
                }
                scan
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Sequential pass: attribute precursor intensities to the most
        // recent non-dependent scan.
        let mut parent_idx: Option<usize> = None;
        for i in 0..scans.len() {
            if !scans[i].dependent {
                parent_idx = Some(i);
                continue;
            }
            if let (Some(p), Some(mz)) = (parent_idx, scans[i].metadata.precursor_mz) {
                let intensity =
                    peak_lookup::find_peak_intensity(&scans[p].payload, mode, mz, DEFAULT_TOLERANCE);
                scans[i].metadata.precursor_intensity = Some(intensity);
            }
        }

        Ok(scans)
    }

    fn check_range(&self, from: u32, to: u32) -> Result<(), RawError> {
        let (first, last) = (self.run_header.first_scan, self.run_header.last_scan);
        if from > to {
            return Err(RawError::Range(format!("from {from} > to {to}")));
        }
        if from < first || to > last {
            return Err(RawError::Range(format!(
                "[{from}, {to}] exceeds acquisition range [{first}, {last}]"
            )));
        }
        let event = &self.scan_events[(from - first) as usize];
        if event.preamble.dependent {
            return Err(RawError::Range(format!(
                "cannot form valid output starting with dependent scan {from}"
            )));
        }
        Ok(())
    }

    fn scan_idx(&self, scan_number: u32) -> Result<usize, RawError> {
        let idx = scan_number
            .checked_sub(self.run_header.first_scan)
            .ok_or(RawError::ScanOutOfRange(scan_number))? as usize;
        if idx >= self.scan_index.len() {
            return Err(RawError::ScanOutOfRange(scan_number));
        }
        Ok(idx)
    }

    /// Decode one scan's payload and assemble its metadata.
    fn decode_scan_at(&self, idx: usize, scan_number: u32, mode: PeakMode) -> Result<Scan, RawError> {
        let entry = &self.scan_index[idx];
        let event = &self.scan_events[idx];
        let payload = scan_data::decode_scan(
            &self.data,
            self.run_header.data_addr,
            entry,
            event,
            scan_number,
        )?;

        let preamble = &event.preamble;
        let reaction = event.reaction().filter(|_| !matches!(preamble.ms_power, MsLevel::Ms1));

        let metadata = ScanMetadata {
            num: scan_number,
            ms_level: preamble.ms_power,
            polarity: preamble.polarity,
            scan_type: preamble.scan_type.to_string(),
            filter_line: event.to_string(),
            retention_time_seconds: entry.start_time * 60.0,
            low_mz: entry.low_mz,
            high_mz: entry.high_mz,
            base_peak_mz: entry.base_mz,
            base_peak_intensity: entry.base_intensity,
            total_ion_current: entry.total_current,
            charge_state: self.charge_states[idx],
            collision_energy: reaction.map(|r| r.energy),
            precursor_mz: reaction.map(|r| r.precursor_mz),
            precursor_intensity: None,
            activation_method: reaction.map(|r| r.activation().to_string()),
        };

        Ok(Scan {
            metadata,
            payload,
            mode,
            dependent: preamble.dependent,
        })
    }
}

/// Ascending iterator over a scan range.
///
/// Holds the single parent-scan slot: each non-dependent scan replaces it,
/// and dependent scans resolve their precursor intensity against it.
pub struct ScanIter<'a> {
    raw: &'a RawFile,
    next: u32,
    to: u32,
    mode: PeakMode,
    parent: Option<ScanPayload>,
}

impl Iterator for ScanIter<'_> {
    type Item = Result<Scan, RawError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.to {
            return None;
        }
        let n = self.next;
        self.next += 1;

        let idx = (n - self.raw.run_header.first_scan) as usize;
        let mut scan = match self.raw.decode_scan_at(idx, n, self.mode) {
            Ok(scan) => scan,
            Err(e) => return Some(Err(e)),
        };

        if scan.dependent {
            if let (Some(parent), Some(mz)) = (&self.parent, scan.metadata.precursor_mz) {
                scan.metadata.precursor_intensity = Some(peak_lookup::find_peak_intensity(
                    parent,
                    self.mode,
                    mz,
                    DEFAULT_TOLERANCE,
                ));
            }
        } else {
            self.parent = Some(scan.payload.clone());
        }

        Some(Ok(scan))
    }
}
