//! Template-driven binary decoding over a seekable byte stream.
//!
//! All Finnigan structures are little-endian. Fixed records are described by
//! declarative field-template lists ([`FieldTemplate`]); [`Record::read`]
//! consumes the templates in order and records the absolute offset, byte
//! size, and decoded value of every field. Version-gated layouts are
//! expressed as alternative template lists (see `version.rs`), not as
//! conditionals inside the decoders.

use crate::RawError;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// A cursor wrapper for reading binary data from a byte slice.
pub struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    /// Create a reader starting at a specific absolute offset.
    pub fn at_offset(data: &'a [u8], offset: u64) -> Self {
        let mut cursor = Cursor::new(data);
        cursor.set_position(offset);
        Self { cursor }
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn set_position(&mut self, pos: u64) {
        self.cursor.set_position(pos);
    }

    pub fn remaining(&self) -> usize {
        let pos = self.cursor.position() as usize;
        let len = self.cursor.get_ref().len();
        len.saturating_sub(pos)
    }

    pub fn read_u8(&mut self) -> Result<u8, RawError> {
        self.cursor.read_u8().map_err(RawError::Io)
    }

    pub fn read_u16(&mut self) -> Result<u16, RawError> {
        self.cursor.read_u16::<LittleEndian>().map_err(RawError::Io)
    }

    pub fn read_i16(&mut self) -> Result<i16, RawError> {
        self.cursor.read_i16::<LittleEndian>().map_err(RawError::Io)
    }

    pub fn read_u32(&mut self) -> Result<u32, RawError> {
        self.cursor.read_u32::<LittleEndian>().map_err(RawError::Io)
    }

    pub fn read_i32(&mut self) -> Result<i32, RawError> {
        self.cursor.read_i32::<LittleEndian>().map_err(RawError::Io)
    }

    pub fn read_u64(&mut self) -> Result<u64, RawError> {
        self.cursor.read_u64::<LittleEndian>().map_err(RawError::Io)
    }

    pub fn read_f32(&mut self) -> Result<f32, RawError> {
        self.cursor.read_f32::<LittleEndian>().map_err(RawError::Io)
    }

    pub fn read_f64(&mut self) -> Result<f64, RawError> {
        self.cursor.read_f64::<LittleEndian>().map_err(RawError::Io)
    }

    /// Read N bytes into a new Vec.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, RawError> {
        let pos = self.cursor.position() as usize;
        let data = self.cursor.get_ref();
        if pos + n > data.len() {
            return Err(RawError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "tried to read {} bytes at offset {}, but only {} available",
                    n,
                    pos,
                    data.len().saturating_sub(pos)
                ),
            )));
        }
        let result = data[pos..pos + n].to_vec();
        self.cursor.set_position((pos + n) as u64);
        Ok(result)
    }

    /// Skip N bytes, failing on EOF.
    pub fn skip(&mut self, n: usize) -> Result<(), RawError> {
        let new_pos = self.cursor.position() + n as u64;
        if new_pos > self.cursor.get_ref().len() as u64 {
            return Err(RawError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "tried to skip to offset {}, but input is only {} bytes",
                    new_pos,
                    self.cursor.get_ref().len()
                ),
            )));
        }
        self.cursor.set_position(new_pos);
        Ok(())
    }

    /// Get a slice of the underlying data at the current position without
    /// advancing.
    pub fn slice(&self, len: usize) -> Result<&'a [u8], RawError> {
        let pos = self.cursor.position() as usize;
        let data = self.cursor.get_ref();
        if pos + len > data.len() {
            return Err(RawError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "requested {} bytes at {}, only {} available",
                    len,
                    pos,
                    data.len().saturating_sub(pos)
                ),
            )));
        }
        Ok(&data[pos..pos + len])
    }

    /// Read a fixed-size UTF-16LE string (size in bytes, not chars),
    /// stripping NUL padding.
    pub fn read_utf16_fixed(&mut self, byte_len: usize) -> Result<String, RawError> {
        let bytes = self.read_bytes(byte_len)?;
        Ok(decode_utf16(&bytes))
    }

    /// Read a counted UTF-16LE string: u32 character count, then 2n bytes.
    pub fn read_utf16_counted(&mut self) -> Result<String, RawError> {
        let len = self.read_u32()?;
        self.read_utf16_fixed(len as usize * 2)
    }

    /// Read a counted ASCII string: u32 byte count, then n bytes.
    pub fn read_ascii_counted(&mut self) -> Result<String, RawError> {
        let len = self.read_u32()?;
        let bytes = self.read_bytes(len as usize)?;
        Ok(String::from_utf8_lossy(&bytes)
            .trim_end_matches('\0')
            .to_string())
    }
}

/// Read a counted UTF-16 string, mapping EOF to a named short read.
pub fn read_string(reader: &mut Reader, name: &str) -> Result<String, RawError> {
    let offset = reader.position();
    reader.read_utf16_counted().map_err(|e| match e {
        RawError::Io(_) => RawError::ShortRead {
            field: name.to_string(),
            offset,
        },
        other => other,
    })
}

fn decode_utf16(bytes: &[u8]) -> String {
    let u16s: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .filter(|&c| c != 0)
        .collect();
    String::from_utf16_lossy(&u16s)
}

/// Primitive field types understood by the template decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    U16,
    U32,
    U64,
    I16,
    I32,
    F32,
    F64,
    /// u32 byte count followed by that many ASCII bytes.
    AsciiCounted,
    /// u32 character count followed by 2n bytes of UTF-16LE.
    Utf16Counted,
    /// Fixed-width UTF-16LE, size in bytes.
    Utf16Fixed(u32),
    /// Opaque fixed-width area, kept as raw bytes.
    Bytes(u32),
}

impl FieldType {
    /// Byte size of the field, when it is fixed.
    pub fn fixed_size(&self) -> Option<u32> {
        match self {
            FieldType::U16 | FieldType::I16 => Some(2),
            FieldType::U32 | FieldType::I32 | FieldType::F32 => Some(4),
            FieldType::U64 | FieldType::F64 => Some(8),
            FieldType::Utf16Fixed(n) | FieldType::Bytes(n) => Some(*n),
            FieldType::AsciiCounted | FieldType::Utf16Counted => None,
        }
    }
}

/// One entry of a record layout: field name, type, human-readable label.
#[derive(Debug, Clone, Copy)]
pub struct FieldTemplate {
    pub name: &'static str,
    pub ty: FieldType,
    pub label: &'static str,
}

/// Shorthand constructor used by the per-record layout tables.
pub const fn field(name: &'static str, ty: FieldType, label: &'static str) -> FieldTemplate {
    FieldTemplate { name, ty, label }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U16(u16),
    U32(u32),
    U64(u64),
    I16(i16),
    I32(i32),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
}

/// A decoded field: absolute offset, byte size, value.
#[derive(Debug, Clone)]
pub struct Field {
    pub offset: u64,
    pub size: u32,
    pub value: Value,
}

/// A record decoded from a template list, keyed by field name.
///
/// Field order is preserved; `size()` is the total number of bytes consumed.
#[derive(Debug, Clone)]
pub struct Record {
    start: u64,
    size: u64,
    fields: Vec<(&'static str, Field)>,
}

impl Record {
    /// Positional read: consume the template list sequentially from the
    /// reader's current position.
    ///
    /// A short read on any primitive aborts the whole record; no partial
    /// object is returned.
    pub fn read(reader: &mut Reader, templates: &[FieldTemplate]) -> Result<Self, RawError> {
        let start = reader.position();
        let mut fields = Vec::with_capacity(templates.len());
        for tpl in templates {
            let offset = reader.position();
            let value = Self::read_value(reader, tpl).map_err(|e| match e {
                RawError::Io(_) => RawError::ShortRead {
                    field: tpl.name.to_string(),
                    offset,
                },
                other => other,
            })?;
            let size = (reader.position() - offset) as u32;
            fields.push((tpl.name, Field { offset, size, value }));
        }
        Ok(Self {
            start,
            size: reader.position() - start,
            fields,
        })
    }

    /// Iterate-object mode: having just read a count, read `count` instances
    /// of a sub-record into an ordered sequence.
    pub fn read_array(
        reader: &mut Reader,
        count: u32,
        templates: &[FieldTemplate],
    ) -> Result<Vec<Record>, RawError> {
        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            records.push(Self::read(reader, templates)?);
        }
        Ok(records)
    }

    fn read_value(reader: &mut Reader, tpl: &FieldTemplate) -> Result<Value, RawError> {
        Ok(match tpl.ty {
            FieldType::U16 => Value::U16(reader.read_u16()?),
            FieldType::U32 => Value::U32(reader.read_u32()?),
            FieldType::U64 => Value::U64(reader.read_u64()?),
            FieldType::I16 => Value::I16(reader.read_i16()?),
            FieldType::I32 => Value::I32(reader.read_i32()?),
            FieldType::F32 => Value::F32(reader.read_f32()?),
            FieldType::F64 => Value::F64(reader.read_f64()?),
            FieldType::AsciiCounted => Value::Str(reader.read_ascii_counted()?),
            FieldType::Utf16Counted => Value::Str(reader.read_utf16_counted()?),
            FieldType::Utf16Fixed(n) => Value::Str(reader.read_utf16_fixed(n as usize)?),
            FieldType::Bytes(n) => Value::Bytes(reader.read_bytes(n as usize)?),
        })
    }

    /// Absolute offset of the first field.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Total bytes consumed by the record.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn get(&self, name: &str) -> Result<&Field, RawError> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, f)| f)
            .ok_or_else(|| RawError::format(name, "no such field in record"))
    }

    pub fn u16(&self, name: &str) -> Result<u16, RawError> {
        match self.get(name)?.value {
            Value::U16(v) => Ok(v),
            ref v => Err(type_mismatch(name, "u16", v)),
        }
    }

    pub fn u32(&self, name: &str) -> Result<u32, RawError> {
        match self.get(name)?.value {
            Value::U32(v) => Ok(v),
            ref v => Err(type_mismatch(name, "u32", v)),
        }
    }

    pub fn u64(&self, name: &str) -> Result<u64, RawError> {
        match self.get(name)?.value {
            Value::U64(v) => Ok(v),
            ref v => Err(type_mismatch(name, "u64", v)),
        }
    }

    /// Read an address field as u64, accepting both u32 and u64 storage.
    ///
    /// Address fields widen from 32 to 64 bits at v64; accessors stay
    /// width-agnostic.
    pub fn addr(&self, name: &str) -> Result<u64, RawError> {
        match self.get(name)?.value {
            Value::U32(v) => Ok(v as u64),
            Value::U64(v) => Ok(v),
            ref v => Err(type_mismatch(name, "u32/u64", v)),
        }
    }

    pub fn i32(&self, name: &str) -> Result<i32, RawError> {
        match self.get(name)?.value {
            Value::I32(v) => Ok(v),
            ref v => Err(type_mismatch(name, "i32", v)),
        }
    }

    pub fn f32(&self, name: &str) -> Result<f32, RawError> {
        match self.get(name)?.value {
            Value::F32(v) => Ok(v),
            ref v => Err(type_mismatch(name, "f32", v)),
        }
    }

    pub fn f64(&self, name: &str) -> Result<f64, RawError> {
        match self.get(name)?.value {
            Value::F64(v) => Ok(v),
            ref v => Err(type_mismatch(name, "f64", v)),
        }
    }

    pub fn str(&self, name: &str) -> Result<&str, RawError> {
        match self.get(name)?.value {
            Value::Str(ref s) => Ok(s),
            ref v => Err(type_mismatch(name, "string", v)),
        }
    }
}

fn type_mismatch(name: &str, wanted: &str, got: &Value) -> RawError {
    RawError::format(name, format!("expected {wanted}, decoded {got:?}"))
}
