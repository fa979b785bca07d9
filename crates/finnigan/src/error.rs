use thiserror::Error;

#[derive(Error, Debug)]
pub enum RawError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a Finnigan RAW file (magic mismatch)")]
    NotRawFile,

    #[error("Unsupported RAW file version: {0}")]
    UnsupportedVersion(u32),

    #[error("Short read decoding field '{field}' at offset {offset}")]
    ShortRead { field: String, offset: u64 },

    #[error("Format error at {path}: {reason}")]
    Format { path: String, reason: String },

    #[error("Ambiguous run headers: both streams have trailer events ({first}, {second})")]
    AmbiguousRunHeader { first: u32, second: u32 },

    #[error("No usable run header: neither stream has trailer events ({first}, {second})")]
    MissingRunHeader { first: u32, second: u32 },

    #[error("Invalid scan range: {0}")]
    Range(String),

    #[error("Scan {0} out of range")]
    ScanOutOfRange(u32),

    #[error("Scan {scan} has no profile data")]
    NoProfile { scan: u32 },
}

impl RawError {
    /// Shorthand for a format error with a field path.
    pub fn format(path: impl Into<String>, reason: impl Into<String>) -> Self {
        RawError::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
