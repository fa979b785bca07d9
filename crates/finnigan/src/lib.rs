//! Pure Rust Finnigan RAW file decoder.
//!
//! This crate reads the flat, self-describing binary container produced by
//! Thermo/Finnigan mass spectrometers and exposes a random-accessible view
//! of its scans. It supports:
//!
//! - Header chain decoding (file, sequence row, run headers, instrument ID)
//! - Scan index, trailer scan events, error log, and scan parameter tables
//! - Profile reconstruction (gap-compressed chunks, calibration transforms,
//!   zero bookends) and centroid peak lists
//! - Precursor intensity lookup for dependent MS2 scans
//! - Parallel scan decoding via rayon
//!
//! # Example
//!
//! ```no_run
//! use finnigan::RawFile;
//!
//! let raw = RawFile::open("sample.raw").unwrap();
//! println!("Scans: {}", raw.n_scans());
//!
//! for scan in raw.scans(raw.first_scan(), raw.last_scan()).unwrap() {
//!     let scan = scan.unwrap();
//!     println!("#{}: {} peaks", scan.metadata.num, scan.peaks().unwrap().len());
//! }
//! ```

pub mod as_info;
pub mod calibration;
pub mod centroid;
pub mod error;
pub mod error_log;
pub mod file_header;
pub mod inst_id;
pub mod metadata;
pub mod params;
pub mod peak_lookup;
pub mod profile;
pub mod raw_file;
pub mod raw_file_info;
pub mod run_header;
pub mod scan_data;
pub mod scan_event;
pub mod scan_index;
pub mod seq_row;
pub mod stream;
pub mod types;
pub mod version;

pub use calibration::{Calibration, Converter};
pub use error::RawError;
pub use error_log::ErrorLogEntry;
pub use peak_lookup::DEFAULT_TOLERANCE;
pub use profile::BOOKEND_BINS;
pub use raw_file::{new_counter, ProgressCounter, RawFile, Scan, ScanIter};
pub use scan_data::PeakMode;
pub use types::*;
