//! Instrument error log decoding.
//!
//! A u32-counted list of (time, message) records at `error_log_addr`.
//! Entries are diagnostics recorded by the acquisition software, not decode
//! failures: they are surfaced through an optional callback (and `log::warn!`
//! unless the callback suppresses them) and never abort the decode.

use crate::stream::read_string;
use crate::stream::Reader;
use crate::RawError;
use serde::{Deserialize, Serialize};

/// One entry from the file's own error log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    /// Retention time of the error, in minutes.
    pub time: f64,
    pub message: String,
}

/// Per-entry callback; return `true` to suppress the default `log::warn!`.
pub type ErrorLogHandler<'a> = dyn FnMut(&ErrorLogEntry) -> bool + 'a;

/// Decode the error log at the reader's current position, leaving the reader
/// just past it.
pub fn decode_error_log(
    reader: &mut Reader,
    mut handler: Option<&mut ErrorLogHandler<'_>>,
) -> Result<Vec<ErrorLogEntry>, RawError> {
    let count = reader.read_u32()?;
    if count > 1_000_000 {
        return Err(RawError::format(
            "error_log",
            format!("unreasonable entry count: {count}"),
        ));
    }

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let time = reader.read_f64()?;
        let message = read_string(reader, "error_message")?;
        let entry = ErrorLogEntry { time, message };

        let suppressed = match handler {
            Some(ref mut h) => h(&entry),
            None => false,
        };
        if !suppressed {
            log::warn!(
                "instrument error at {:.2} min: {}",
                entry.time,
                entry.message
            );
        }
        entries.push(entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_log(entries: &[(f64, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for (time, msg) in entries {
            buf.extend_from_slice(&time.to_le_bytes());
            let units: Vec<u16> = msg.encode_utf16().collect();
            buf.extend_from_slice(&(units.len() as u32).to_le_bytes());
            for u in units {
                buf.extend_from_slice(&u.to_le_bytes());
            }
        }
        buf
    }

    #[test]
    fn test_decode_entries() {
        let data = build_log(&[(1.23, "foo"), (2.5, "spray unstable")]);
        let mut reader = Reader::new(&data);
        let entries = decode_error_log(&mut reader, None).unwrap();
        assert_eq!(entries.len(), 2);
        assert!((entries[0].time - 1.23).abs() < 1e-12);
        assert_eq!(entries[0].message, "foo");
        assert_eq!(reader.position(), data.len() as u64);
    }

    #[test]
    fn test_handler_called_once_per_entry_and_decode_continues() {
        let data = build_log(&[(1.23, "foo")]);
        let mut reader = Reader::new(&data);
        let mut calls = 0;
        let mut handler = |entry: &ErrorLogEntry| {
            calls += 1;
            assert_eq!(entry.message, "foo");
            false // not suppressed
        };
        let entries = decode_error_log(&mut reader, Some(&mut handler)).unwrap();
        assert_eq!(calls, 1);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_empty_log() {
        let data = build_log(&[]);
        let mut reader = Reader::new(&data);
        assert!(decode_error_log(&mut reader, None).unwrap().is_empty());
    }
}
