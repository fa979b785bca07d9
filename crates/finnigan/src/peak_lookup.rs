//! Precursor peak lookup in a parent MS1 scan.
//!
//! MS2 metadata carries the precursor's m/z but not its intensity; the
//! intensity comes from the most recent MS1 scan's data. The lookup returns
//! the maximum intensity within a small m/z window around the target:
//! profile parents are addressed through the inverse converter, centroid
//! parents by bisection. An empty window yields 0.0.

use crate::profile::Profile;
use crate::scan_data::{PeakMode, ScanPayload};

/// Nominal half-width of the precursor search window, in m/z.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// Max intensity near `target_mz` in a parent scan's data.
pub fn find_peak_intensity(parent: &ScanPayload, mode: PeakMode, target_mz: f64, tol: f64) -> f32 {
    match mode {
        PeakMode::Centroid => {
            if let Some(centroids) = &parent.centroids {
                centroid_peak_intensity(&centroids.peaks, target_mz, tol)
            } else if let Some(profile) = &parent.profile {
                profile_peak_intensity(profile, target_mz, tol)
            } else {
                0.0
            }
        }
        PeakMode::Profile => match &parent.profile {
            Some(profile) => profile_peak_intensity(profile, target_mz, tol),
            None => 0.0,
        },
    }
}

/// Profile lookup: invert the converter to bracket the candidate bins, then
/// take the max stored intensity whose corrected m/z lands in the window.
pub fn profile_peak_intensity(profile: &Profile, target_mz: f64, tol: f64) -> f32 {
    if profile.nbins == 0 {
        return 0.0;
    }
    let lo_bin = match profile.converter.bin(target_mz - tol, profile.nbins) {
        Ok(b) => b,
        Err(_) => return 0.0,
    };
    let hi_bin = match profile.converter.bin(target_mz + tol, profile.nbins) {
        Ok(b) => b,
        Err(_) => return 0.0,
    };
    let (lo_bin, hi_bin) = (lo_bin.min(hi_bin), lo_bin.max(hi_bin));

    let mut best = 0.0f32;
    for chunk in &profile.chunks {
        let first = chunk.first_bin;
        for (k, &intensity) in chunk.signal.iter().enumerate() {
            let bin = first + k as u32;
            if bin + 1 < lo_bin || bin > hi_bin + 1 {
                continue;
            }
            let mz = profile.converter.mz(bin as f64) + chunk.fudge as f64;
            if (mz - target_mz).abs() <= tol && intensity > best {
                best = intensity;
            }
        }
    }
    best
}

/// Centroid lookup: bisect the sorted peak list, then scan the window.
pub fn centroid_peak_intensity(peaks: &[(f64, f32)], target_mz: f64, tol: f64) -> f32 {
    if peaks.is_empty() {
        return 0.0;
    }
    let start = peaks.partition_point(|&(mz, _)| mz < target_mz - tol);
    let mut best = 0.0f32;
    for &(mz, intensity) in &peaks[start..] {
        if mz > target_mz + tol {
            break;
        }
        if intensity > best {
            best = intensity;
        }
    }
    best
}
