//! InstID decoding (instrument identification strings).
//!
//! Sits immediately after the authoritative RunHeader: two u32s, then eight
//! counted UTF-16 strings.

use crate::stream::read_string;
use crate::stream::Reader;
use crate::RawError;

/// Parsed instrument identification.
#[derive(Debug, Clone)]
pub struct InstId {
    pub model: String,
    pub model_alias: String,
    pub serial_number: String,
    pub software_version: String,
    pub tags: [String; 4],
}

impl InstId {
    /// Decode the InstID block at the reader's current position.
    pub fn decode(reader: &mut Reader) -> Result<Self, RawError> {
        let _unknown1 = reader.read_u32()?;
        let _unknown2 = reader.read_u32()?;

        let model = read_string(reader, "model")?;
        let model_alias = read_string(reader, "model_alias")?;
        let serial_number = read_string(reader, "serial_number")?;
        let software_version = read_string(reader, "software_version")?;
        let mut tags: [String; 4] = Default::default();
        for (i, slot) in tags.iter_mut().enumerate() {
            *slot = read_string(reader, TAG_NAMES[i])?;
        }

        Ok(Self {
            model,
            model_alias,
            serial_number,
            software_version,
            tags,
        })
    }
}

const TAG_NAMES: [&str; 4] = ["tag1", "tag2", "tag3", "tag4"];
