use serde::{Deserialize, Serialize};

/// Mass spectrometry polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    Positive,
    Negative,
    Any,
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarity::Positive => write!(f, "+"),
            Polarity::Negative => write!(f, "-"),
            Polarity::Any => write!(f, "any"),
        }
    }
}

/// MS scan level (MS power from the scan event preamble).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MsLevel {
    Ms1,
    Ms2,
    Other(u8),
}

impl MsLevel {
    pub fn as_u8(&self) -> u8 {
        match self {
            MsLevel::Ms1 => 1,
            MsLevel::Ms2 => 2,
            MsLevel::Other(n) => *n,
        }
    }
}

/// Per-scan metadata, eagerly populated when a scan is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMetadata {
    /// 1-based scan number.
    pub num: u32,
    pub ms_level: MsLevel,
    pub polarity: Polarity,
    /// Scan type label (Full, Zoom, SIM, SRM, CRM).
    pub scan_type: String,
    /// Thermo-style filter line rendered from the scan event.
    pub filter_line: String,
    pub retention_time_seconds: f64,
    pub low_mz: f64,
    pub high_mz: f64,
    pub base_peak_mz: f64,
    pub base_peak_intensity: f64,
    pub total_ion_current: f64,
    /// Precursor charge state from the scan parameters stream, when nonzero.
    pub charge_state: Option<u32>,
    pub collision_energy: Option<f64>,
    pub precursor_mz: Option<f64>,
    /// Intensity of the precursor peak in the parent MS1 scan.
    pub precursor_intensity: Option<f32>,
    pub activation_method: Option<String>,
}

/// File-level metadata assembled from the header chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Acquisition timestamp (ISO 8601, from the RawFileInfo preamble).
    pub acquisition_date: String,
    pub instrument_model: String,
    pub instrument_serial: String,
    pub software_version: String,
    pub sample_name: String,
    pub comment: String,
    pub first_scan: u32,
    pub last_scan: u32,
    /// Acquisition start/end time in minutes.
    pub start_time: f64,
    pub end_time: f64,
    pub low_mass: f64,
    pub high_mass: f64,
}
