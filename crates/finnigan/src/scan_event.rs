//! ScanEvent decoding (trailer records).
//!
//! The trailer at `trailer_addr` is a u32 count followed by one
//! variable-length ScanEvent per scan. There is no index into the trailer,
//! so events must be decoded sequentially: a range request always walks the
//! stream from the beginning.
//!
//! Per-event layout:
//! 1. preamble: fixed-size block, version-gated (80/120/128/132 bytes)
//! 2. reactions: u32 count + count * Reaction (32/48/56 bytes by version)
//! 3. mass ranges: u32 count + count * (f64 low, f64 high)
//! 4. calibration coefficients: u32 count + count * f64
//! 5. source fragmentation values and ranges (decoded, not retained)
//! 6. name: counted UTF-16 string (v65+ only)

use crate::calibration::Calibration;
use crate::stream::read_string;
use crate::stream::Reader;
use crate::types::{MsLevel, Polarity};
use crate::version;
use crate::RawError;
use serde::{Deserialize, Serialize};

/// Parsed ScanEvent preamble fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEventPreamble {
    pub polarity: Polarity,
    /// Scan data mode the instrument recorded (centroid/profile).
    pub scan_mode: ScanMode,
    /// MS power (1 = MS1, 2 = MS2).
    pub ms_power: MsLevel,
    pub scan_type: ScanType,
    /// Whether this is a dependent (data-dependent MS2) scan.
    pub dependent: bool,
    pub ionization: IonizationType,
    pub detector: DetectorType,
    pub analyzer: AnalyzerType,
}

/// Scan acquisition mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanMode {
    Centroid,
    Profile,
    Unknown,
}

/// Scan type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanType {
    Full,
    Zoom,
    Sim,
    Srm,
    Crm,
    Unknown(u8),
}

impl std::fmt::Display for ScanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanType::Full => write!(f, "Full"),
            ScanType::Zoom => write!(f, "Zoom"),
            ScanType::Sim => write!(f, "SIM"),
            ScanType::Srm => write!(f, "SRM"),
            ScanType::Crm => write!(f, "CRM"),
            ScanType::Unknown(n) => write!(f, "Unknown({})", n),
        }
    }
}

/// Ionization type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IonizationType {
    Ei,
    Ci,
    Fab,
    Esi,
    Apci,
    Nsi,
    Tsi,
    Fdi,
    Maldi,
    Gd,
    Unknown(u8),
}

impl std::fmt::Display for IonizationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IonizationType::Ei => "EI",
            IonizationType::Ci => "CI",
            IonizationType::Fab => "FAB",
            IonizationType::Esi => "ESI",
            IonizationType::Apci => "APCI",
            IonizationType::Nsi => "NSI",
            IonizationType::Tsi => "TSI",
            IonizationType::Fdi => "FDI",
            IonizationType::Maldi => "MALDI",
            IonizationType::Gd => "GD",
            IonizationType::Unknown(_) => "?",
        };
        write!(f, "{}", s)
    }
}

/// Detector selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorType {
    Any,
    ElectronMultiplier,
    Faraday,
    Unknown(u8),
}

/// Activation (dissociation) type for MS2 reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationType {
    Cid,
    Mpd,
    Ecd,
    Pqd,
    Etd,
    Hcd,
    Any,
    Ptr,
    Unknown(u8),
}

impl std::fmt::Display for ActivationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActivationType::Cid => "CID",
            ActivationType::Mpd => "MPD",
            ActivationType::Ecd => "ECD",
            ActivationType::Pqd => "PQD",
            ActivationType::Etd => "ETD",
            ActivationType::Hcd => "HCD",
            ActivationType::Any => "Any",
            ActivationType::Ptr => "PTR",
            ActivationType::Unknown(n) => return write!(f, "Unknown({})", n),
        };
        write!(f, "{}", s)
    }
}

/// Analyzer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalyzerType {
    Itms,
    Tqms,
    Sqms,
    Tofms,
    Ftms,
    Sector,
    Unknown(u8),
}

impl std::fmt::Display for AnalyzerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnalyzerType::Itms => "ITMS",
            AnalyzerType::Tqms => "TQMS",
            AnalyzerType::Sqms => "SQMS",
            AnalyzerType::Tofms => "TOFMS",
            AnalyzerType::Ftms => "FTMS",
            AnalyzerType::Sector => "Sector",
            AnalyzerType::Unknown(n) => return write!(f, "Unknown({})", n),
        };
        write!(f, "{}", s)
    }
}

/// MS2 reaction: precursor isolation and fragmentation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub precursor_mz: f64,
    pub isolation_width: f64,
    /// Collision energy in normalized units.
    pub energy: f64,
    /// Bit 0: energy valid; bits 1-8: activation type.
    pub energy_valid: u32,
    /// First/last precursor mass of the isolation range (v65+ only).
    pub precursor_range: Option<(f64, f64)>,
    /// Isolation width offset (v66+ only).
    pub isolation_width_offset: f64,
}

impl Reaction {
    /// Derive the activation type from the energy-valid field.
    pub fn activation(&self) -> ActivationType {
        if self.energy_valid == 0 {
            return ActivationType::Cid;
        }
        match ((self.energy_valid >> 1) & 0xFF) as u8 {
            0 => ActivationType::Cid,
            1 => ActivationType::Mpd,
            2 => ActivationType::Ecd,
            3 => ActivationType::Pqd,
            4 => ActivationType::Etd,
            5 => ActivationType::Hcd,
            6 => ActivationType::Any,
            8 => ActivationType::Ptr,
            n => ActivationType::Unknown(n),
        }
    }

    fn decode(reader: &mut Reader, ver: u32) -> Result<Self, RawError> {
        let size = version::reaction_size(ver) as u64;
        let start = reader.position();

        let precursor_mz = reader.read_f64()?;
        let isolation_width = reader.read_f64()?;
        let energy = reader.read_f64()?;
        let energy_valid = reader.read_u32()?;

        let precursor_range = if ver >= 65 {
            let valid = reader.read_i32()? > 0;
            let first = reader.read_f64()?;
            let last = reader.read_f64()?;
            valid.then_some((first, last))
        } else {
            None
        };

        let isolation_width_offset = if ver >= 66 { reader.read_f64()? } else { 0.0 };

        // Consume struct padding up to the versioned record size.
        let expected_end = start + size;
        if reader.position() != expected_end {
            reader.set_position(expected_end);
        }

        Ok(Self {
            precursor_mz,
            isolation_width,
            energy,
            energy_valid,
            precursor_range,
            isolation_width_offset,
        })
    }
}

/// A complete ScanEvent: preamble, reactions, mass ranges, calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    pub preamble: ScanEventPreamble,
    pub reactions: Vec<Reaction>,
    pub mass_ranges: Vec<(f64, f64)>,
    pub calibration: Calibration,
    /// Event name (v65+ only).
    pub name: Option<String>,
}

impl ScanEvent {
    /// The MS2 reaction, if any.
    pub fn reaction(&self) -> Option<&Reaction> {
        self.reactions.last()
    }

    /// Decode one ScanEvent at the reader's current position.
    pub fn decode(reader: &mut Reader, ver: u32) -> Result<Self, RawError> {
        let preamble_size = version::scan_event_preamble_size(ver);
        let preamble_bytes = reader.read_bytes(preamble_size)?;
        let preamble = decode_preamble(&preamble_bytes);

        let n_reactions = bounded_count(reader, 100, "reactions")?;
        let mut reactions = Vec::with_capacity(n_reactions as usize);
        for _ in 0..n_reactions {
            reactions.push(Reaction::decode(reader, ver)?);
        }

        let mass_ranges = read_range_array(reader)?;
        let coefficients = read_doubles_array(reader)?;
        let calibration = Calibration::from_coefficients(&coefficients);

        // Source fragmentation data is transient; decode past it without
        // retaining.
        let _ = read_doubles_array(reader)?;
        let _ = read_range_array(reader)?;

        let name = if version::scan_event_has_name(ver) {
            Some(read_string(reader, "event_name")?)
        } else {
            None
        };

        Ok(Self {
            preamble,
            reactions,
            mass_ranges,
            calibration,
            name,
        })
    }
}

/// Render the Thermo-style filter line for this event, e.g.
/// `FTMS + p NSI d Full ms2 445.1200@hcd28.00 [100.0000-2000.0000]`.
impl std::fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let p = &self.preamble;
        write!(f, "{} {}", p.analyzer, p.polarity)?;
        match p.scan_mode {
            ScanMode::Centroid => write!(f, " c")?,
            ScanMode::Profile => write!(f, " p")?,
            ScanMode::Unknown => {}
        }
        write!(f, " {}", p.ionization)?;
        if p.dependent {
            write!(f, " d")?;
        }
        write!(f, " {}", p.scan_type)?;
        match p.ms_power {
            MsLevel::Ms1 => write!(f, " ms")?,
            level => write!(f, " ms{}", level.as_u8())?,
        }
        if let Some(rxn) = self.reaction() {
            write!(
                f,
                " {:.4}@{}{:.2}",
                rxn.precursor_mz,
                rxn.activation().to_string().to_lowercase(),
                rxn.energy
            )?;
        }
        if let Some(&(low, high)) = self.mass_ranges.first() {
            write!(f, " [{:.4}-{:.4}]", low, high)?;
        }
        Ok(())
    }
}

/// Decode the fixed preamble block. Key fields sit at well-known byte
/// positions; the block size varies by version but the positions do not.
fn decode_preamble(data: &[u8]) -> ScanEventPreamble {
    let at = |i: usize| data.get(i).copied().unwrap_or(0);

    let polarity = match at(4) {
        0 => Polarity::Negative,
        1 => Polarity::Positive,
        _ => Polarity::Any,
    };

    let scan_mode = match at(5) {
        0 => ScanMode::Centroid,
        1 => ScanMode::Profile,
        _ => ScanMode::Unknown,
    };

    let ms_power = match at(6) {
        2 => MsLevel::Ms2,
        0 | 1 => MsLevel::Ms1,
        n => MsLevel::Other(n),
    };

    let scan_type = match at(7) {
        0 => ScanType::Full,
        1 => ScanType::Zoom,
        2 => ScanType::Sim,
        3 => ScanType::Srm,
        4 => ScanType::Crm,
        n => ScanType::Unknown(n),
    };

    let dependent = at(10) == 1;

    let ionization = match at(11) {
        0 => IonizationType::Ei,
        1 => IonizationType::Ci,
        2 => IonizationType::Fab,
        3 => IonizationType::Esi,
        4 => IonizationType::Apci,
        5 => IonizationType::Nsi,
        6 => IonizationType::Tsi,
        7 => IonizationType::Fdi,
        8 => IonizationType::Maldi,
        9 => IonizationType::Gd,
        n => IonizationType::Unknown(n),
    };

    let detector = match at(12) {
        0 => DetectorType::Any,
        1 => DetectorType::ElectronMultiplier,
        2 => DetectorType::Faraday,
        n => DetectorType::Unknown(n),
    };

    let analyzer = match at(40) {
        0 => AnalyzerType::Itms,
        1 => AnalyzerType::Tqms,
        2 => AnalyzerType::Sqms,
        3 => AnalyzerType::Tofms,
        4 => AnalyzerType::Ftms,
        5 => AnalyzerType::Sector,
        n => AnalyzerType::Unknown(n),
    };

    ScanEventPreamble {
        polarity,
        scan_mode,
        ms_power,
        scan_type,
        dependent,
        ionization,
        detector,
        analyzer,
    }
}

/// Read a u32 count, rejecting impossible values.
fn bounded_count(reader: &mut Reader, max: u32, what: &str) -> Result<u32, RawError> {
    let count = reader.read_u32()?;
    if count > max {
        return Err(RawError::format(
            what,
            format!("unreasonable count: {count}"),
        ));
    }
    Ok(count)
}

/// u32 count followed by count f64 values.
fn read_doubles_array(reader: &mut Reader) -> Result<Vec<f64>, RawError> {
    let count = bounded_count(reader, 10_000, "doubles array")?;
    let mut values = Vec::with_capacity(count as usize);
    for _ in 0..count {
        values.push(reader.read_f64()?);
    }
    Ok(values)
}

/// u32 count followed by count (f64 low, f64 high) pairs.
fn read_range_array(reader: &mut Reader) -> Result<Vec<(f64, f64)>, RawError> {
    let count = bounded_count(reader, 10_000, "mass range array")?;
    let mut ranges = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let low = reader.read_f64()?;
        let high = reader.read_f64()?;
        ranges.push((low, high));
    }
    Ok(ranges)
}

/// Decode the trailer stream: u32 count at `trailer_addr`, then sequential
/// ScanEvents. Retains events for scans `>= from`, stops after `to`.
///
/// The first retained event must not be a dependent scan; a range starting
/// mid-cycle has no parent to attribute precursors to.
pub fn decode_trailer(
    data: &[u8],
    trailer_addr: u64,
    ver: u32,
    first_scan: u32,
    from: u32,
    to: u32,
) -> Result<Vec<ScanEvent>, RawError> {
    let mut reader = Reader::at_offset(data, trailer_addr);
    let count = bounded_count(&mut reader, 10_000_000, "trailer events")?;

    let mut events = Vec::new();
    for i in 0..count {
        let scan_number = first_scan + i;
        if scan_number > to {
            break;
        }
        let event = ScanEvent::decode(&mut reader, ver)?;
        if scan_number >= from {
            events.push(event);
        }
    }

    if let Some(first) = events.first() {
        if first.preamble.dependent {
            return Err(RawError::Range(format!(
                "cannot form valid output starting with dependent scan {from}"
            )));
        }
    }

    Ok(events)
}
