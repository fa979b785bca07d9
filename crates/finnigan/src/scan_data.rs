//! Per-scan data packet decoding.
//!
//! Each scan's raw data sits at `data_addr + ScanIndexEntry.offset`: a
//! 40-byte packet header, then the profile section (if `profile_size > 0`)
//! and the centroid list (if `peak_list_size > 0`). Both section sizes are
//! in 4-byte words.

use crate::centroid::CentroidList;
use crate::profile::Profile;
use crate::scan_event::ScanEvent;
use crate::scan_index::ScanIndexEntry;
use crate::stream::{field, FieldTemplate, FieldType, Reader, Record};
use crate::RawError;

const PACKET_HEADER: [FieldTemplate; 10] = [
    field("unknown1", FieldType::U32, "Unknown"),
    field("profile_size", FieldType::U32, "Profile size (words)"),
    field("peak_list_size", FieldType::U32, "Peak list size (words)"),
    field("layout", FieldType::U32, "Layout"),
    field("descriptor_list_size", FieldType::U32, "Descriptor list size"),
    field("unknown_stream_size", FieldType::U32, "Unknown stream size"),
    field("triplet_stream_size", FieldType::U32, "Triplet stream size"),
    field("unknown2", FieldType::U32, "Unknown"),
    field("low_mz", FieldType::F32, "Low m/z"),
    field("high_mz", FieldType::F32, "High m/z"),
];

/// Parsed scan packet header.
#[derive(Debug, Clone)]
pub struct PacketHeader {
    pub profile_size: u32,
    pub peak_list_size: u32,
    /// 0 = chunks without fudge, >0 = chunks carry a fudge correction.
    pub layout: u32,
    pub low_mz: f32,
    pub high_mz: f32,
}

impl PacketHeader {
    pub const SIZE: u64 = 40;

    pub fn decode(reader: &mut Reader) -> Result<Self, RawError> {
        let rec = Record::read(reader, &PACKET_HEADER)?;
        Ok(Self {
            profile_size: rec.u32("profile_size")?,
            peak_list_size: rec.u32("peak_list_size")?,
            layout: rec.u32("layout")?,
            low_mz: rec.f32("low_mz")?,
            high_mz: rec.f32("high_mz")?,
        })
    }
}

/// Peak data selection for rendered scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakMode {
    /// Prefer the centroid list; fall back to profile bins when absent.
    Centroid,
    /// Require profile bins; fail with `NoProfile` when absent.
    Profile,
}

/// Decoded payload of one scan.
#[derive(Debug, Clone)]
pub struct ScanPayload {
    pub scan_number: u32,
    pub header: Option<PacketHeader>,
    pub profile: Option<Profile>,
    pub centroids: Option<CentroidList>,
}

impl ScanPayload {
    /// Render the (m/z, intensity) sequence under the given mode.
    pub fn peaks(&self, mode: PeakMode) -> Result<Vec<(f64, f32)>, RawError> {
        match mode {
            PeakMode::Centroid => {
                if let Some(centroids) = &self.centroids {
                    Ok(centroids.peaks.clone())
                } else if let Some(profile) = &self.profile {
                    Ok(profile.peaks())
                } else {
                    Ok(vec![])
                }
            }
            PeakMode::Profile => match &self.profile {
                Some(profile) => Ok(profile.peaks()),
                None => Err(RawError::NoProfile {
                    scan: self.scan_number,
                }),
            },
        }
    }

    /// Whether the scan stored no data at all.
    pub fn is_empty(&self) -> bool {
        self.profile.is_none() && self.centroids.is_none()
    }
}

/// Decode one scan's payload.
///
/// `event` supplies the calibration bound into the profile's converter.
pub fn decode_scan(
    data: &[u8],
    data_addr: u64,
    entry: &ScanIndexEntry,
    event: &ScanEvent,
    scan_number: u32,
) -> Result<ScanPayload, RawError> {
    let abs_offset = data_addr + entry.offset;
    if abs_offset >= data.len() as u64 {
        return Err(RawError::format(
            format!("scan[{scan_number}]"),
            format!(
                "data offset {} beyond end of file ({} bytes)",
                abs_offset,
                data.len()
            ),
        ));
    }

    let mut reader = Reader::at_offset(data, abs_offset);
    let header = PacketHeader::decode(&mut reader)?;

    let profile = if header.profile_size > 0 {
        let start = reader.position();
        let profile = Profile::decode(&mut reader, header.layout, event.calibration.clone())?;
        // The declared size is authoritative; chunks may leave padding.
        reader.set_position(start + header.profile_size as u64 * 4);
        Some(profile)
    } else {
        None
    };

    let centroids = if header.peak_list_size > 0 {
        let start = reader.position();
        let list = CentroidList::decode(&mut reader)?;
        reader.set_position(start + header.peak_list_size as u64 * 4);
        Some(list)
    } else {
        None
    };

    Ok(ScanPayload {
        scan_number,
        header: Some(header),
        profile,
        centroids,
    })
}
