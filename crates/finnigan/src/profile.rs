//! Profile decoding and rendering.
//!
//! A profile is a gap-compressed spectrum: a header
//! (first_value f64, step f64, nchunks u32, nbins u32) followed by chunks.
//! Each chunk covers bins `[first_bin, first_bin + len)`:
//!   layout == 0: first_bin (u32), nbins (u32), signal[nbins] (f32)
//!   layout > 0:  first_bin (u32), nbins (u32), fudge (f32), signal[nbins]
//!
//! The m/z of bin k is the bound converter applied to k, plus the chunk's
//! fudge (a small additive drift correction). Rendering a multi-chunk
//! profile pads every chunk with zero-intensity bookend bins so downstream
//! peak pickers see a defined baseline at chunk edges.

use crate::calibration::{Calibration, Converter};
use crate::stream::Reader;
use crate::RawError;

/// Bookend width in bins for multi-chunk profiles.
pub const BOOKEND_BINS: u32 = 4;

/// One gap-compressed chunk of intensity bins.
#[derive(Debug, Clone)]
pub struct ProfileChunk {
    pub first_bin: u32,
    /// Additive m/z correction; 0 for layout 0 profiles.
    pub fudge: f32,
    pub signal: Vec<f32>,
}

impl ProfileChunk {
    /// Last bin index covered by this chunk.
    fn last_bin(&self) -> u32 {
        self.first_bin + self.signal.len() as u32 - 1
    }
}

/// A decoded profile with its calibration-bound converter.
#[derive(Debug, Clone)]
pub struct Profile {
    pub first_value: f64,
    pub step: f64,
    pub nbins: u32,
    pub chunks: Vec<ProfileChunk>,
    pub converter: Converter,
}

impl Profile {
    /// Decode a profile at the reader's current position, binding the scan
    /// event's calibration into the converter.
    pub fn decode(
        reader: &mut Reader,
        layout: u32,
        calibration: Calibration,
    ) -> Result<Self, RawError> {
        let first_value = reader.read_f64()?;
        let step = reader.read_f64()?;
        let nchunks = reader.read_u32()?;
        let nbins = reader.read_u32()?;

        if nchunks > 1_000_000 || nbins > 100_000_000 {
            return Err(RawError::format(
                "profile",
                format!("unreasonable dimensions: nchunks={nchunks}, nbins={nbins}"),
            ));
        }

        let mut chunks = Vec::with_capacity(nchunks as usize);
        for _ in 0..nchunks {
            let first_bin = reader.read_u32()?;
            let chunk_nbins = reader.read_u32()?;
            if chunk_nbins > nbins {
                return Err(RawError::format(
                    "profile.chunk",
                    format!("chunk of {chunk_nbins} bins exceeds profile total {nbins}"),
                ));
            }
            let fudge = if layout > 0 { reader.read_f32()? } else { 0.0 };

            // Batch read the signal bins.
            let byte_len = chunk_nbins as usize * 4;
            let raw = reader.slice(byte_len)?;
            let signal = raw
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            reader.skip(byte_len)?;

            chunks.push(ProfileChunk {
                first_bin,
                fudge,
                signal,
            });
        }

        Ok(Self {
            first_value,
            step,
            nbins,
            chunks,
            converter: Converter::new(first_value, step, calibration),
        })
    }

    /// m/z of a bin under a chunk's fudge correction.
    fn mz_at(&self, bin: u32, fudge: f32) -> f64 {
        self.converter.mz(bin as f64) + fudge as f64
    }

    /// Render (m/z, intensity) pairs.
    ///
    /// Single-chunk profiles render their stored bins as-is; multi-chunk
    /// profiles get zero bookends of [`BOOKEND_BINS`] on both sides of every
    /// chunk, clipped against neighbouring chunks and the valid bin range.
    pub fn peaks(&self) -> Vec<(f64, f32)> {
        let width = if self.chunks.len() > 1 {
            BOOKEND_BINS
        } else {
            0
        };
        self.peaks_with_bookends(width)
    }

    /// Render with an explicit bookend width.
    pub fn peaks_with_bookends(&self, width: u32) -> Vec<(f64, f32)> {
        let mut out = Vec::new();
        for (i, chunk) in self.chunks.iter().enumerate() {
            if chunk.signal.is_empty() {
                continue;
            }
            let first = chunk.first_bin;
            let last = chunk.last_bin();

            if width > 0 {
                // Leading bookend: clip at the previous chunk's end and bin 0.
                let floor = match i.checked_sub(1).map(|p| &self.chunks[p]) {
                    Some(prev) if !prev.signal.is_empty() => prev.last_bin() + 1,
                    _ => 0,
                };
                let start = first.saturating_sub(width).max(floor);
                for bin in start..first {
                    out.push((self.mz_at(bin, chunk.fudge), 0.0));
                }
            }

            for (k, &intensity) in chunk.signal.iter().enumerate() {
                out.push((self.mz_at(first + k as u32, chunk.fudge), intensity));
            }

            if width > 0 {
                // Trailing bookend: clip at the next chunk's start and the
                // profile's bin range.
                let mut ceil = self.nbins.saturating_sub(1);
                if let Some(next) = self.chunks.get(i + 1) {
                    if !next.signal.is_empty() && next.first_bin > 0 {
                        ceil = ceil.min(next.first_bin - 1);
                    }
                }
                let end = (last + width).min(ceil);
                for bin in (last + 1)..=end {
                    out.push((self.mz_at(bin, chunk.fudge), 0.0));
                }
            }
        }
        out
    }

    /// Total number of stored (non-bookend) bins.
    pub fn stored_bins(&self) -> usize {
        self.chunks.iter().map(|c| c.signal.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_profile(
        first_value: f64,
        step: f64,
        nbins: u32,
        layout: u32,
        chunks: &[(u32, f32, &[f32])],
    ) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&first_value.to_le_bytes());
        buf.extend_from_slice(&step.to_le_bytes());
        buf.extend_from_slice(&(chunks.len() as u32).to_le_bytes());
        buf.extend_from_slice(&nbins.to_le_bytes());
        for (first_bin, fudge, signal) in chunks {
            buf.extend_from_slice(&first_bin.to_le_bytes());
            buf.extend_from_slice(&(signal.len() as u32).to_le_bytes());
            if layout > 0 {
                buf.extend_from_slice(&fudge.to_le_bytes());
            }
            for s in *signal {
                buf.extend_from_slice(&s.to_le_bytes());
            }
        }
        buf
    }

    #[test]
    fn test_single_chunk_identity_converter() {
        let signal: Vec<f32> = (0..10).map(|i| (i as f32) * 10.0).collect();
        let data = build_profile(100.0, 1.0, 10, 0, &[(0, 0.0, &signal)]);
        let profile = Profile::decode(&mut Reader::new(&data), 0, Calibration::Identity).unwrap();

        let peaks = profile.peaks();
        assert_eq!(peaks.len(), 10);
        for (k, (mz, intensity)) in peaks.iter().enumerate() {
            assert!((mz - (100.0 + k as f64)).abs() < 1e-12);
            assert!((intensity - signal[k]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_mz_strictly_increasing_within_chunk() {
        let signal = vec![1.0f32; 50];
        let data = build_profile(400.0, 0.005, 50, 0, &[(0, 0.0, &signal)]);
        let profile = Profile::decode(&mut Reader::new(&data), 0, Calibration::Identity).unwrap();
        let peaks = profile.peaks();
        for pair in peaks.windows(2) {
            assert!(pair[1].0 > pair[0].0);
        }
    }

    #[test]
    fn test_fudge_shifts_mz() {
        let signal = vec![100.0f32, 200.0, 300.0];
        let data = build_profile(400.0, 0.005, 100, 1, &[(10, 0.001, &signal)]);
        let profile = Profile::decode(&mut Reader::new(&data), 1, Calibration::Identity).unwrap();
        let peaks = profile.peaks();
        // mz[0] = 400.0 + 10 * 0.005 + 0.001
        assert!((peaks[0].0 - 400.051).abs() < 1e-9);
        assert!((peaks[0].1 - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_two_chunk_bookends_clipped() {
        // Chunk 1 at bins [20..23], chunk 2 at bins [30..32], bookend 4.
        // Expected bins: [16..27] then [26..36].
        let c1 = vec![10.0f32; 4];
        let c2 = vec![20.0f32; 3];
        let data = build_profile(0.0, 1.0, 40, 0, &[(20, 0.0, &c1), (30, 0.0, &c2)]);
        let profile = Profile::decode(&mut Reader::new(&data), 0, Calibration::Identity).unwrap();

        let peaks = profile.peaks();
        let bins: Vec<u32> = peaks.iter().map(|(mz, _)| *mz as u32).collect();

        let expected: Vec<u32> = (16..=27).chain(26..=36).collect();
        assert_eq!(bins, expected);

        // Stored bins keep their intensities, bookends are zero.
        let by_bin: Vec<(u32, f32)> = peaks.iter().map(|&(mz, i)| (mz as u32, i)).collect();
        for &(bin, intensity) in &by_bin {
            if (20..=23).contains(&bin) {
                assert_eq!(intensity, 10.0);
            } else if (30..=32).contains(&bin) {
                assert_eq!(intensity, 20.0);
            } else {
                assert_eq!(intensity, 0.0);
            }
        }
    }

    #[test]
    fn test_bookend_point_count() {
        // Away from all edges: every chunk renders len + 2 * width points.
        let c1 = vec![1.0f32; 5];
        let c2 = vec![2.0f32; 6];
        let data = build_profile(0.0, 1.0, 1000, 0, &[(100, 0.0, &c1), (200, 0.0, &c2)]);
        let profile = Profile::decode(&mut Reader::new(&data), 0, Calibration::Identity).unwrap();
        let peaks = profile.peaks();
        let w = BOOKEND_BINS as usize;
        assert_eq!(peaks.len(), (5 + 2 * w) + (6 + 2 * w));
    }

    #[test]
    fn test_bookends_clipped_at_profile_range() {
        // A chunk flush against both ends of the bin range gets no bookends.
        let signal = vec![1.0f32; 10];
        let data = build_profile(0.0, 1.0, 10, 0, &[(0, 0.0, &signal), (0, 0.0, &[])]);
        let profile = Profile::decode(&mut Reader::new(&data), 0, Calibration::Identity).unwrap();
        let peaks = profile.peaks();
        assert_eq!(peaks.len(), 10);
    }
}
