//! Centroid (peak list) decoding.
//!
//! Layout: u32 peak count, then count * (f64 m/z, f32 intensity) pairs in
//! ascending m/z order.

use crate::stream::Reader;
use crate::RawError;

/// Decoded centroid peak list.
#[derive(Debug, Clone, Default)]
pub struct CentroidList {
    pub peaks: Vec<(f64, f32)>,
}

impl CentroidList {
    /// Decode the peak list at the reader's current position.
    pub fn decode(reader: &mut Reader) -> Result<Self, RawError> {
        let count = reader.read_u32()?;
        if count > 10_000_000 {
            return Err(RawError::format(
                "centroid_list",
                format!("unreasonable peak count: {count}"),
            ));
        }
        if count == 0 {
            return Ok(Self::default());
        }

        // Batch read: 12 bytes per peak.
        let total = count as usize * 12;
        let raw = reader.slice(total)?;
        let mut peaks = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let base = i * 12;
            let mz = f64::from_le_bytes(raw[base..base + 8].try_into().unwrap());
            let intensity = f32::from_le_bytes(raw[base + 8..base + 12].try_into().unwrap());
            peaks.push((mz, intensity));
        }
        reader.skip(total)?;

        Ok(Self { peaks })
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }
}
