//! Integration tests over complete synthetic RAW files.
//!
//! The builder below assembles byte-exact files (header chain, run
//! headers, scan index, trailer, error log, parameters, and scan data)
//! and the tests drive the public read API against them.

use finnigan::peak_lookup::centroid_peak_intensity;
use finnigan::{MsLevel, PeakMode, Polarity, RawError, RawFile};

const FINNIGAN_MAGIC: u16 = 0xA101;

// ---------------------------------------------------------------------------
// Byte builders
// ---------------------------------------------------------------------------

fn counted_utf16(s: &str) -> Vec<u8> {
    let units: Vec<u16> = s.encode_utf16().collect();
    let mut buf = Vec::with_capacity(4 + units.len() * 2);
    buf.extend_from_slice(&(units.len() as u32).to_le_bytes());
    for u in units {
        buf.extend_from_slice(&u.to_le_bytes());
    }
    buf
}

fn build_file_header(version: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&FINNIGAN_MAGIC.to_le_bytes());
    let mut sig = Vec::new();
    for c in "Finnigan".encode_utf16() {
        sig.extend_from_slice(&c.to_le_bytes());
    }
    sig.resize(18, 0);
    buf.extend_from_slice(&sig);
    buf.extend_from_slice(&[0u8; 16]);
    buf.extend_from_slice(&version.to_le_bytes());
    buf.extend_from_slice(&[0u8; 112]); // audit_start
    buf.extend_from_slice(&[0u8; 112]); // audit_end
    buf.extend_from_slice(&[0u8; 4]);
    buf.extend_from_slice(&[0u8; 60]);
    buf.extend_from_slice(&[0u8; 2056]); // tag
    assert_eq!(buf.len(), 2384);
    buf
}

fn build_seq_row(version: u32) -> Vec<u8> {
    let mut buf = vec![0u8; 60]; // injection block
    for _ in 0..15 {
        buf.extend_from_slice(&counted_utf16(""));
    }
    buf.extend_from_slice(&0u32.to_le_bytes()); // barcode_status
    if version >= 58 {
        for _ in 0..15 {
            buf.extend_from_slice(&counted_utf16(""));
        }
    }
    buf
}

fn build_as_info() -> Vec<u8> {
    let mut buf = vec![0u8; 24];
    buf.extend_from_slice(&counted_utf16(""));
    buf
}

fn build_raw_file_info(version: u32, rh_addrs: [u64; 2]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&1u32.to_le_bytes()); // method_present
    for v in [2021u16, 3, 2, 16, 9, 30, 0, 0] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf.extend_from_slice(&0u32.to_le_bytes()); // in_acquisition
    buf.extend_from_slice(&1u32.to_le_bytes()); // n_streams
    buf.extend_from_slice(&0u32.to_le_bytes());
    if version >= 64 {
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&rh_addrs[0].to_le_bytes());
        buf.extend_from_slice(&rh_addrs[1].to_le_bytes());
    } else {
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&(rh_addrs[0] as u32).to_le_bytes());
        buf.extend_from_slice(&(rh_addrs[1] as u32).to_le_bytes());
    }
    buf.extend_from_slice(&[0u8; 8]); // padding
    for _ in 0..6 {
        buf.extend_from_slice(&counted_utf16(""));
    }
    buf
}

fn raw_file_info_len(version: u32) -> u64 {
    if version >= 64 {
        88
    } else {
        76
    }
}

#[derive(Clone, Copy)]
struct Addrs {
    data: u64,
    scan_index: u64,
    error_log: u64,
    trailer: u64,
    params: u64,
}

fn build_run_header(
    version: u32,
    addrs: &Addrs,
    own_addr: u64,
    first_scan: u32,
    last_scan: u32,
    ntrailer: u32,
    nerrors: u32,
) -> Vec<u8> {
    let nscans = last_scan - first_scan + 1;
    let mut buf = Vec::new();
    // SampleInfo
    for v in [
        0u32,
        0,
        first_scan,
        last_scan,
        0,
        nerrors,
        ntrailer,
        nscans,
        addrs.data as u32,
        addrs.scan_index as u32,
        0,
        addrs.error_log as u32,
    ] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    for v in [1.5e8f64, 100.0, 2000.0, 0.0, 30.0] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf.extend_from_slice(&[0u8; 56]);
    // Sample tags
    buf.extend_from_slice(&[0u8; 88 + 40 + 320]);
    // Tail
    buf.extend_from_slice(&0f64.to_le_bytes());
    buf.extend_from_slice(&0f64.to_le_bytes());
    if version >= 64 {
        for v in [
            addrs.scan_index,
            addrs.data,
            0,
            addrs.error_log,
            own_addr,
            addrs.trailer,
            addrs.params,
        ] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        for v in [0u32, 0, 0, 0] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
    } else {
        for v in [
            addrs.trailer as u32,
            addrs.params as u32,
            0,
            0,
            0,
            0,
            0,
            0,
            own_addr as u32,
        ] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }
    if version >= 66 {
        buf.extend_from_slice(&0i32.to_le_bytes());
    }
    buf
}

fn run_header_len(version: u32) -> u64 {
    let tail = if version >= 64 { 88 } else { 52 };
    let inst_type = if version >= 66 { 4 } else { 0 };
    144 + 448 + tail + inst_type
}

fn build_inst_id() -> Vec<u8> {
    let mut buf = vec![0u8; 8];
    for s in ["LTQ FT", "", "SN1001", "2.2", "", "", "", ""] {
        buf.extend_from_slice(&counted_utf16(s));
    }
    buf
}

fn preamble_size(version: u32) -> usize {
    if version >= 65 {
        132
    } else if version >= 63 {
        128
    } else if version >= 62 {
        120
    } else {
        80
    }
}

fn build_event(version: u32, spec: &ScanSpec) -> Vec<u8> {
    let mut preamble = vec![0u8; preamble_size(version)];
    preamble[4] = 1; // positive
    preamble[5] = if spec.profile.is_some() { 1 } else { 0 };
    preamble[6] = spec.ms_power;
    preamble[7] = 0; // Full
    preamble[10] = spec.dependent as u8;
    preamble[11] = 5; // NSI
    preamble[40] = 4; // FTMS

    let mut buf = preamble;
    match spec.precursor {
        Some((mz, energy, act)) => {
            buf.extend_from_slice(&1u32.to_le_bytes());
            buf.extend_from_slice(&mz.to_le_bytes());
            buf.extend_from_slice(&2.0f64.to_le_bytes());
            buf.extend_from_slice(&energy.to_le_bytes());
            buf.extend_from_slice(&(1u32 | ((act as u32) << 1)).to_le_bytes());
            if version >= 65 {
                buf.extend_from_slice(&0i32.to_le_bytes());
                buf.extend_from_slice(&0f64.to_le_bytes());
                buf.extend_from_slice(&0f64.to_le_bytes());
                if version >= 66 {
                    buf.extend_from_slice(&0f64.to_le_bytes());
                }
            } else {
                buf.extend_from_slice(&0u32.to_le_bytes());
            }
        }
        None => buf.extend_from_slice(&0u32.to_le_bytes()),
    }
    // one mass range
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf.extend_from_slice(&100.0f64.to_le_bytes());
    buf.extend_from_slice(&2000.0f64.to_le_bytes());
    // calibration coefficients (none: identity)
    buf.extend_from_slice(&0u32.to_le_bytes());
    // source fragmentation values + ranges
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    if version >= 65 {
        buf.extend_from_slice(&counted_utf16(""));
    }
    buf
}

fn build_profile_bytes(spec: &ProfileSpec) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&spec.first_value.to_le_bytes());
    buf.extend_from_slice(&spec.step.to_le_bytes());
    buf.extend_from_slice(&(spec.chunks.len() as u32).to_le_bytes());
    buf.extend_from_slice(&spec.nbins.to_le_bytes());
    for (first_bin, fudge, signal) in &spec.chunks {
        buf.extend_from_slice(&first_bin.to_le_bytes());
        buf.extend_from_slice(&(signal.len() as u32).to_le_bytes());
        if spec.layout > 0 {
            buf.extend_from_slice(&fudge.to_le_bytes());
        }
        for s in signal {
            buf.extend_from_slice(&s.to_le_bytes());
        }
    }
    buf
}

fn build_centroid_bytes(peaks: &[(f64, f32)]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(peaks.len() as u32).to_le_bytes());
    for (mz, int) in peaks {
        buf.extend_from_slice(&mz.to_le_bytes());
        buf.extend_from_slice(&int.to_le_bytes());
    }
    buf
}

fn build_packet(spec: &ScanSpec) -> Vec<u8> {
    let profile = spec.profile.as_ref().map(build_profile_bytes);
    let centroids = spec.centroids.as_ref().map(|c| build_centroid_bytes(c));

    let profile_words = profile.as_ref().map_or(0, |p| p.len().div_ceil(4)) as u32;
    let peak_words = centroids.as_ref().map_or(0, |c| c.len().div_ceil(4)) as u32;
    let layout = spec.profile.as_ref().map_or(0, |p| p.layout);

    let mut buf = Vec::new();
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&profile_words.to_le_bytes());
    buf.extend_from_slice(&peak_words.to_le_bytes());
    buf.extend_from_slice(&layout.to_le_bytes());
    buf.extend_from_slice(&[0u8; 16]);
    buf.extend_from_slice(&100.0f32.to_le_bytes());
    buf.extend_from_slice(&2000.0f32.to_le_bytes());
    if let Some(p) = profile {
        let padded = profile_words as usize * 4;
        buf.extend_from_slice(&p);
        buf.resize(buf.len() + padded - p.len(), 0);
    }
    if let Some(c) = centroids {
        let padded = peak_words as usize * 4;
        buf.extend_from_slice(&c);
        buf.resize(buf.len() + padded - c.len(), 0);
    }
    buf
}

fn build_scan_index_entry(version: u32, offset: u64, i: u32, rt: f64) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(offset as u32).to_le_bytes());
    buf.extend_from_slice(&i.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&(i + 1).to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // data_size
    for v in [rt, 1e7, 445.12, 5e5, 100.0, 2000.0] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    if version >= 64 {
        buf.extend_from_slice(&offset.to_le_bytes());
    }
    buf
}

// ---------------------------------------------------------------------------
// File assembly
// ---------------------------------------------------------------------------

struct ProfileSpec {
    first_value: f64,
    step: f64,
    nbins: u32,
    layout: u32,
    chunks: Vec<(u32, f32, Vec<f32>)>,
}

struct ScanSpec {
    ms_power: u8,
    dependent: bool,
    precursor: Option<(f64, f64, u8)>,
    charge: u32,
    rt_min: f64,
    profile: Option<ProfileSpec>,
    centroids: Option<Vec<(f64, f32)>>,
}

impl ScanSpec {
    fn ms1_profile(profile: ProfileSpec) -> Self {
        Self {
            ms_power: 1,
            dependent: false,
            precursor: None,
            charge: 0,
            rt_min: 0.5,
            profile: Some(profile),
            centroids: None,
        }
    }

    fn ms1_centroids(peaks: Vec<(f64, f32)>) -> Self {
        Self {
            ms_power: 1,
            dependent: false,
            precursor: None,
            charge: 0,
            rt_min: 0.5,
            profile: None,
            centroids: Some(peaks),
        }
    }

    fn ms2(precursor_mz: f64, energy: f64, charge: u32, peaks: Vec<(f64, f32)>) -> Self {
        Self {
            ms_power: 2,
            dependent: true,
            precursor: Some((precursor_mz, energy, 5)), // HCD
            charge,
            rt_min: 0.6,
            profile: None,
            centroids: Some(peaks),
        }
    }
}

enum StreamLayout {
    /// One run header, authoritative.
    Single,
    /// Stream 0 has no trailer events; stream 1 is authoritative.
    EmptyThenActive,
    /// Two run headers with explicit trailer counts (malformed cases).
    Both { first: u32, second: u32 },
}

struct FileSpec {
    version: u32,
    first_scan: u32,
    scans: Vec<ScanSpec>,
    streams: StreamLayout,
    errors: Vec<(f64, &'static str)>,
}

impl FileSpec {
    fn new(version: u32, scans: Vec<ScanSpec>) -> Self {
        Self {
            version,
            first_scan: 1,
            scans,
            streams: StreamLayout::Single,
            errors: vec![],
        }
    }

    fn build(&self) -> Vec<u8> {
        let ver = self.version;
        let n = self.scans.len() as u32;
        let last_scan = self.first_scan + n - 1;

        let mut front = build_file_header(ver);
        front.extend(build_seq_row(ver));
        front.extend(build_as_info());

        let rfi_offset = front.len() as u64;
        let rh0_addr = rfi_offset + raw_file_info_len(ver);
        let rh_len = run_header_len(ver);
        let two_streams = !matches!(self.streams, StreamLayout::Single);
        let rh1_addr = if two_streams { rh0_addr + rh_len } else { 0 };
        let auth_addr = if two_streams { rh1_addr } else { rh0_addr };
        let inst_addr = auth_addr + rh_len;

        let inst_id = build_inst_id();
        let data_addr = inst_addr + inst_id.len() as u64;

        // Data region.
        let mut data_region = Vec::new();
        let mut offsets = Vec::with_capacity(self.scans.len());
        for scan in &self.scans {
            offsets.push(data_region.len() as u64);
            data_region.extend(build_packet(scan));
        }

        let scan_index_addr = data_addr + data_region.len() as u64;
        let mut scan_index = Vec::new();
        for (i, scan) in self.scans.iter().enumerate() {
            scan_index.extend(build_scan_index_entry(
                ver,
                offsets[i],
                i as u32,
                scan.rt_min,
            ));
        }

        let trailer_addr = scan_index_addr + scan_index.len() as u64;
        let mut trailer = Vec::new();
        trailer.extend_from_slice(&n.to_le_bytes());
        for scan in &self.scans {
            trailer.extend(build_event(ver, scan));
        }

        let error_log_addr = trailer_addr + trailer.len() as u64;
        let mut error_block = Vec::new();
        error_block.extend_from_slice(&(self.errors.len() as u32).to_le_bytes());
        for (time, message) in &self.errors {
            error_block.extend_from_slice(&time.to_le_bytes());
            error_block.extend(counted_utf16(message));
        }
        // hierarchy: no segments
        error_block.extend_from_slice(&0u32.to_le_bytes());
        // GenericDataHeader: one u32 field, "Charge State:"
        error_block.extend_from_slice(&1u32.to_le_bytes());
        error_block.extend_from_slice(&0x07u32.to_le_bytes()); // U32 type code
        error_block.extend_from_slice(&0u32.to_le_bytes());
        error_block.extend(counted_utf16("Charge State:"));

        let params_addr = error_log_addr + error_block.len() as u64;
        let mut params = Vec::new();
        for scan in &self.scans {
            params.extend_from_slice(&scan.charge.to_le_bytes());
        }

        let addrs = Addrs {
            data: data_addr,
            scan_index: scan_index_addr,
            error_log: error_log_addr,
            trailer: trailer_addr,
            params: params_addr,
        };
        let zero_addrs = Addrs {
            data: 0,
            scan_index: 0,
            error_log: 0,
            trailer: 0,
            params: 0,
        };

        let (rh0_ntrailer, rh1_ntrailer) = match self.streams {
            StreamLayout::Single => (n, 0),
            StreamLayout::EmptyThenActive => (0, n),
            StreamLayout::Both { first, second } => (first, second),
        };

        let mut buf = front;
        buf.extend(build_raw_file_info(ver, [rh0_addr, rh1_addr]));
        if two_streams {
            // Stream 0 carries no usable addresses when it has no events.
            let rh0_addrs = if rh0_ntrailer == 0 { &zero_addrs } else { &addrs };
            buf.extend(build_run_header(
                ver,
                rh0_addrs,
                rh0_addr,
                self.first_scan,
                last_scan,
                rh0_ntrailer,
                self.errors.len() as u32,
            ));
            buf.extend(build_run_header(
                ver,
                &addrs,
                rh1_addr,
                self.first_scan,
                last_scan,
                rh1_ntrailer,
                self.errors.len() as u32,
            ));
        } else {
            buf.extend(build_run_header(
                ver,
                &addrs,
                rh0_addr,
                self.first_scan,
                last_scan,
                rh0_ntrailer,
                self.errors.len() as u32,
            ));
        }
        assert_eq!(buf.len() as u64, inst_addr);
        buf.extend(inst_id);
        assert_eq!(buf.len() as u64, data_addr);
        buf.extend(data_region);
        buf.extend(scan_index);
        buf.extend(trailer);
        buf.extend(error_block);
        assert_eq!(buf.len() as u64, params_addr);
        buf.extend(params);
        buf
    }
}

fn dda_cycle_spec(version: u32) -> FileSpec {
    // MS1, MS2, MS1, MS2, MS1: a small DDA cycle.
    FileSpec::new(
        version,
        vec![
            ScanSpec::ms1_centroids(vec![(110.02, 5000.0), (445.12, 9000.0)]),
            ScanSpec::ms2(110.0, 28.0, 2, vec![(86.1, 300.0), (101.07, 800.0)]),
            ScanSpec::ms1_centroids(vec![(445.12, 9500.0)]),
            ScanSpec::ms2(445.1, 35.0, 3, vec![(201.1, 40.0)]),
            ScanSpec::ms1_centroids(vec![(501.3, 120.0)]),
        ],
    )
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_open_single_stream() {
    let raw = RawFile::from_bytes(dda_cycle_spec(57).build()).unwrap();
    assert_eq!(raw.version(), 57);
    assert_eq!(raw.n_scans(), 5);
    assert_eq!(raw.first_scan(), 1);
    assert_eq!(raw.last_scan(), 5);
    assert_eq!(raw.metadata().instrument_model, "LTQ FT");
    assert_eq!(raw.metadata().acquisition_date, "2021-03-16T09:30:00");
}

#[test]
fn test_two_run_headers_selects_stream_with_trailer_events() {
    let mut spec = dda_cycle_spec(57);
    spec.streams = StreamLayout::EmptyThenActive;
    let raw = RawFile::from_bytes(spec.build()).unwrap();
    // The second run header is authoritative; all index entries are read.
    assert_eq!(raw.n_scans(), 5);
    assert_eq!(raw.scan_index().len(), 5);
    assert_eq!(raw.scan_events().len(), 5);
}

#[test]
fn test_ambiguous_run_headers() {
    let mut spec = dda_cycle_spec(57);
    spec.streams = StreamLayout::Both { first: 5, second: 5 };
    match RawFile::from_bytes(spec.build()) {
        Err(RawError::AmbiguousRunHeader { first, second }) => {
            assert_eq!((first, second), (5, 5));
        }
        other => panic!("expected AmbiguousRunHeader, got {:?}", other.err()),
    }
}

#[test]
fn test_missing_run_headers() {
    let mut spec = dda_cycle_spec(57);
    spec.streams = StreamLayout::Both { first: 0, second: 0 };
    match RawFile::from_bytes(spec.build()) {
        Err(RawError::MissingRunHeader { first, second }) => {
            assert_eq!((first, second), (0, 0));
        }
        other => panic!("expected MissingRunHeader, got {:?}", other.err()),
    }
}

#[test]
fn test_range_starting_with_dependent_scan() {
    let raw = RawFile::from_bytes(dda_cycle_spec(57).build()).unwrap();
    // Scan 2 is a dependent MS2.
    match raw.scans(2, 4) {
        Err(RawError::Range(msg)) => {
            assert!(msg.contains("dependent scan 2"), "message: {msg}");
        }
        other => panic!("expected Range error, got {:?}", other.err()),
    }
}

#[test]
fn test_range_validation() {
    let raw = RawFile::from_bytes(dda_cycle_spec(57).build()).unwrap();
    assert!(matches!(raw.scans(4, 3), Err(RawError::Range(_))));
    assert!(matches!(raw.scans(1, 6), Err(RawError::Range(_))));
    assert!(matches!(raw.scans(0, 2), Err(RawError::Range(_))));
}

#[test]
fn test_single_chunk_profile_identity_converter() {
    let signal: Vec<f32> = (0..10).map(|k| (k as f32) * 10.0).collect();
    let spec = FileSpec::new(
        57,
        vec![ScanSpec::ms1_profile(ProfileSpec {
            first_value: 100.0,
            step: 1.0,
            nbins: 10,
            layout: 0,
            chunks: vec![(0, 0.0, signal.clone())],
        })],
    );
    let raw = RawFile::from_bytes(spec.build()).unwrap();

    let scans: Vec<_> = raw
        .scans_with_mode(1, 1, PeakMode::Profile)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let peaks = scans[0].peaks().unwrap();
    assert_eq!(peaks.len(), 10);
    for (k, &(mz, intensity)) in peaks.iter().enumerate() {
        assert!((mz - (100.0 + k as f64)).abs() < 1e-12);
        assert!((intensity - signal[k]).abs() < 1e-6);
    }
}

#[test]
fn test_two_chunk_profile_bookends_clipped() {
    // Chunk 1 at bins [20..23], chunk 2 at bins [30..32], bookend width 4:
    // the rendered bins are [16..27] followed by [26..36].
    let spec = FileSpec::new(
        57,
        vec![ScanSpec::ms1_profile(ProfileSpec {
            first_value: 0.0,
            step: 1.0,
            nbins: 40,
            layout: 0,
            chunks: vec![(20, 0.0, vec![10.0; 4]), (30, 0.0, vec![20.0; 3])],
        })],
    );
    let raw = RawFile::from_bytes(spec.build()).unwrap();
    let scan = raw.scan_with_mode(1, PeakMode::Profile).unwrap();
    let bins: Vec<u32> = scan.peaks().unwrap().iter().map(|&(mz, _)| mz as u32).collect();
    let expected: Vec<u32> = (16..=27).chain(26..=36).collect();
    assert_eq!(bins, expected);
}

#[test]
fn test_precursor_intensity_from_parent_centroids() {
    let raw = RawFile::from_bytes(dda_cycle_spec(57).build()).unwrap();
    let scans: Vec<_> = raw
        .scans(1, 5)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    // Scan 2: precursor 110.0, parent scan 1 has (110.02, 5000).
    let ms2 = &scans[1];
    assert!(matches!(ms2.metadata.ms_level, MsLevel::Ms2));
    assert_eq!(ms2.metadata.precursor_mz, Some(110.0));
    assert_eq!(ms2.metadata.precursor_intensity, Some(5000.0));
    assert_eq!(ms2.metadata.charge_state, Some(2));
    assert_eq!(ms2.metadata.collision_energy, Some(28.0));
    assert_eq!(ms2.metadata.activation_method.as_deref(), Some("HCD"));

    // Scan 4's parent is scan 3 (the most recent MS1), not scan 1.
    let ms2b = &scans[3];
    assert_eq!(ms2b.metadata.precursor_mz, Some(445.1));
    assert_eq!(ms2b.metadata.precursor_intensity, Some(9500.0));

    // MS1 scans have no precursor fields.
    assert_eq!(scans[0].metadata.precursor_mz, None);
    assert_eq!(scans[4].metadata.precursor_intensity, None);
}

#[test]
fn test_precursor_without_nearby_peak_is_zero() {
    let spec = FileSpec::new(
        57,
        vec![
            ScanSpec::ms1_centroids(vec![(500.0, 100.0)]),
            ScanSpec::ms2(110.0, 28.0, 2, vec![(86.1, 300.0)]),
        ],
    );
    let raw = RawFile::from_bytes(spec.build()).unwrap();
    let scans: Vec<_> = raw.scans(1, 2).unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(scans[1].metadata.precursor_intensity, Some(0.0));
}

#[test]
fn test_error_log_callback_invoked_once() {
    let mut spec = dda_cycle_spec(57);
    spec.errors = vec![(1.23, "foo")];
    let data = spec.build();

    let mut calls = 0u32;
    let mut handler = |entry: &finnigan::ErrorLogEntry| {
        calls += 1;
        assert!((entry.time - 1.23).abs() < 1e-12);
        assert_eq!(entry.message, "foo");
        false // do not suppress
    };
    let raw = RawFile::from_bytes_with_handler(data, &mut handler).unwrap();

    assert_eq!(calls, 1);
    assert_eq!(raw.error_log().len(), 1);
    // Decode continued past the error log.
    assert_eq!(raw.n_scans(), 5);
}

#[test]
fn test_profile_only_mode_fails_without_profile() {
    let raw = RawFile::from_bytes(dda_cycle_spec(57).build()).unwrap();
    match raw.scan_with_mode(1, PeakMode::Profile) {
        Ok(scan) => match scan.peaks() {
            Err(RawError::NoProfile { scan }) => assert_eq!(scan, 1),
            other => panic!("expected NoProfile, got {other:?}"),
        },
        Err(e) => panic!("scan decode failed: {e}"),
    }
}

#[test]
fn test_scan_metadata() {
    let raw = RawFile::from_bytes(dda_cycle_spec(57).build()).unwrap();
    let scan = raw.scan(1).unwrap();
    let md = &scan.metadata;

    assert_eq!(md.num, 1);
    assert!(matches!(md.ms_level, MsLevel::Ms1));
    assert_eq!(md.polarity, Polarity::Positive);
    assert_eq!(md.scan_type, "Full");
    assert!((md.retention_time_seconds - 30.0).abs() < 1e-9); // 0.5 min
    assert_eq!(md.low_mz, 100.0);
    assert_eq!(md.high_mz, 2000.0);
    assert_eq!(md.base_peak_mz, 445.12);
    assert_eq!(md.base_peak_intensity, 5e5);
    assert_eq!(md.total_ion_current, 1e7);
    assert_eq!(md.charge_state, None);
    assert_eq!(md.filter_line, "FTMS + c NSI Full ms [100.0000-2000.0000]");

    let ms2 = raw.scan(2).unwrap();
    assert_eq!(
        ms2.metadata.filter_line,
        "FTMS + c NSI d Full ms2 110.0000@hcd28.00 [100.0000-2000.0000]"
    );
}

#[test]
fn test_scan_parameters_dump() {
    let raw = RawFile::from_bytes(dda_cycle_spec(57).build()).unwrap();
    assert_eq!(raw.param_labels(), vec!["Charge State"]);
    let map = raw.scan_parameters(2).unwrap();
    assert_eq!(map.get("Charge State").map(String::as_str), Some("2"));
}

#[test]
fn test_parallel_read_matches_sequential() {
    let raw = RawFile::from_bytes(dda_cycle_spec(57).build()).unwrap();

    let sequential: Vec<_> = raw.scans(1, 5).unwrap().collect::<Result<_, _>>().unwrap();
    let parallel = raw.read_scans_parallel(1, 5, PeakMode::Centroid).unwrap();

    assert_eq!(sequential.len(), parallel.len());
    for (s, p) in sequential.iter().zip(&parallel) {
        assert_eq!(s.metadata.num, p.metadata.num);
        assert_eq!(s.metadata.precursor_intensity, p.metadata.precursor_intensity);
        assert_eq!(s.peaks().unwrap(), p.peaks().unwrap());
    }
}

#[test]
fn test_parallel_read_with_progress() {
    let raw = RawFile::from_bytes(dda_cycle_spec(57).build()).unwrap();
    let counter = finnigan::new_counter();
    let scans = raw
        .read_scans_parallel_with_progress(1, 5, PeakMode::Centroid, &counter)
        .unwrap();
    assert_eq!(scans.len(), 5);
    assert_eq!(counter.load(std::sync::atomic::Ordering::Relaxed), 5);
}

#[test]
fn test_centroid_mode_falls_back_to_profile() {
    let spec = FileSpec::new(
        57,
        vec![ScanSpec::ms1_profile(ProfileSpec {
            first_value: 200.0,
            step: 0.5,
            nbins: 4,
            layout: 0,
            chunks: vec![(0, 0.0, vec![1.0, 2.0, 3.0, 4.0])],
        })],
    );
    let raw = RawFile::from_bytes(spec.build()).unwrap();
    let scan = raw.scan(1).unwrap(); // centroid mode by default
    let peaks = scan.peaks().unwrap();
    assert_eq!(peaks.len(), 4);
    assert!((peaks[3].0 - 201.5).abs() < 1e-12);
}

#[test]
fn test_unsupported_version() {
    let spec = dda_cycle_spec(50);
    match RawFile::from_bytes(spec.build()) {
        Err(RawError::UnsupportedVersion(50)) => {}
        other => panic!("expected UnsupportedVersion, got {:?}", other.err()),
    }
}

#[test]
fn test_versions_with_wider_layouts() {
    // v62 widens the event preamble; v64 widens addresses and index
    // entries; v66 adds the instrument type. The same logical content must
    // decode identically under every gate.
    for ver in [62, 64, 66] {
        let raw = RawFile::from_bytes(dda_cycle_spec(ver).build())
            .unwrap_or_else(|e| panic!("v{ver}: {e}"));
        assert_eq!(raw.version(), ver);
        assert_eq!(raw.n_scans(), 5);
        let scans: Vec<_> = raw.scans(1, 5).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(scans[1].metadata.precursor_intensity, Some(5000.0));
    }
}

#[test]
fn test_truncated_file_is_fatal() {
    let data = dda_cycle_spec(57).build();
    let err = RawFile::from_bytes(data[..data.len() - 3].to_vec()).unwrap_err();
    assert!(matches!(err, RawError::ShortRead { .. } | RawError::Io(_)));
}

#[test]
fn test_peak_lookup_window_maximum() {
    // find_peak_intensity returns the max within the window, so querying at
    // any stored peak's m/z can never return less than that peak.
    let peaks = vec![(100.0, 10.0f32), (100.05, 70.0), (200.0, 5.0)];
    for &(mz, intensity) in &peaks {
        assert!(centroid_peak_intensity(&peaks, mz, 0.1) >= intensity);
    }
}
