//! Table schema: the attribute list persisted on page 0 of every table
//! file, plus the byte-layout arithmetic (widths, offsets, record size)
//! everything else in this crate builds on.

use dbcore::{StoreError, StoreResult};
use pagestore::PAGE_SIZE;

/// One of the four attribute types the record manager supports. `String`
/// carries its fixed on-disk length, matching the original's
/// `typeLength` field (meaningful only for strings here; other types
/// have a fixed, type-determined width).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    Int,
    Float,
    Bool,
    String(u32),
}

impl DataType {
    /// Width in bytes of one value of this type, on disk and in a
    /// materialized [`crate::Record`]'s payload buffer.
    pub fn width(&self) -> usize {
        match self {
            DataType::Int => 4,
            DataType::Float => 4,
            DataType::Bool => 1,
            DataType::String(len) => *len as usize,
        }
    }

    fn tag(&self) -> i32 {
        match self {
            DataType::Int => 0,
            DataType::Float => 1,
            DataType::Bool => 2,
            DataType::String(_) => 3,
        }
    }

    fn from_tag(tag: i32, type_length: i32) -> StoreResult<Self> {
        match tag {
            0 => Ok(DataType::Int),
            1 => Ok(DataType::Float),
            2 => Ok(DataType::Bool),
            3 => Ok(DataType::String(type_length as u32)),
            other => Err(StoreError::Parameter(format!(
                "unknown schema data type tag {other}"
            ))),
        }
    }
}

/// A named, typed column.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub data_type: DataType,
}

impl Attribute {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered attribute list plus the key-attribute index list. Records
/// laid out against a `Schema` are always fixed-width: `record_size()`
/// is the sum of each attribute's width in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    pub attrs: Vec<Attribute>,
    pub key_attrs: Vec<usize>,
}

impl Schema {
    pub fn new(attrs: Vec<Attribute>, key_attrs: Vec<usize>) -> StoreResult<Self> {
        for &k in &key_attrs {
            if k >= attrs.len() {
                return Err(StoreError::Parameter(format!(
                    "key attribute index {k} out of range (schema has {} attributes)",
                    attrs.len()
                )));
            }
        }
        Ok(Self { attrs, key_attrs })
    }

    pub fn num_attrs(&self) -> usize {
        self.attrs.len()
    }

    /// Byte offset of attribute `idx` within a record's payload: the
    /// prefix sum of the widths of every attribute before it.
    pub fn attr_offset(&self, idx: usize) -> StoreResult<usize> {
        self.check_idx(idx)?;
        Ok(self.attrs[..idx].iter().map(|a| a.data_type.width()).sum())
    }

    pub fn attr(&self, idx: usize) -> StoreResult<&Attribute> {
        self.check_idx(idx)?;
        Ok(&self.attrs[idx])
    }

    fn check_idx(&self, idx: usize) -> StoreResult<()> {
        if idx >= self.attrs.len() {
            return Err(StoreError::Parameter(format!(
                "attribute index {idx} out of range (schema has {} attributes)",
                self.attrs.len()
            )));
        }
        Ok(())
    }

    /// Total width of one record laid out against this schema.
    pub fn record_size(&self) -> usize {
        self.attrs.iter().map(|a| a.data_type.width()).sum()
    }

    /// Encode the schema into page 0's layout: `num_attr, key_size`, then
    /// per-attribute `{data_type, type_length, name_len, name}`, then the
    /// key-attribute indices. Fails with [`StoreError::Resource`] rather
    /// than silently truncating if the encoding doesn't fit in one page.
    pub fn serialize(&self) -> StoreResult<[u8; PAGE_SIZE]> {
        let mut buf = [0u8; PAGE_SIZE];
        let mut offset = 0usize;

        write_i32(&mut buf, &mut offset, self.attrs.len() as i32)?;
        write_i32(&mut buf, &mut offset, self.key_attrs.len() as i32)?;

        for attr in &self.attrs {
            write_i32(&mut buf, &mut offset, attr.data_type.tag())?;
            let type_length = match attr.data_type {
                DataType::String(len) => len as i32,
                _ => 0,
            };
            write_i32(&mut buf, &mut offset, type_length)?;

            let name_bytes = attr.name.as_bytes();
            write_i32(&mut buf, &mut offset, name_bytes.len() as i32)?;
            write_bytes(&mut buf, &mut offset, name_bytes)?;
        }

        for &key in &self.key_attrs {
            write_i32(&mut buf, &mut offset, key as i32)?;
        }

        Ok(buf)
    }

    /// Decode a schema previously written by [`Schema::serialize`].
    pub fn deserialize(buf: &[u8]) -> StoreResult<Self> {
        let mut offset = 0usize;
        let num_attr = read_i32(buf, &mut offset)? as usize;
        let key_size = read_i32(buf, &mut offset)? as usize;

        let mut attrs = Vec::with_capacity(num_attr);
        for _ in 0..num_attr {
            let tag = read_i32(buf, &mut offset)?;
            let type_length = read_i32(buf, &mut offset)?;
            let name_len = read_i32(buf, &mut offset)? as usize;
            let name_bytes = read_bytes(buf, &mut offset, name_len)?;
            let name = String::from_utf8_lossy(name_bytes).into_owned();
            let data_type = DataType::from_tag(tag, type_length)?;
            attrs.push(Attribute { name, data_type });
        }

        let mut key_attrs = Vec::with_capacity(key_size);
        for _ in 0..key_size {
            key_attrs.push(read_i32(buf, &mut offset)? as usize);
        }

        Schema::new(attrs, key_attrs)
    }
}

fn write_i32(buf: &mut [u8], offset: &mut usize, value: i32) -> StoreResult<()> {
    write_bytes(buf, offset, &value.to_le_bytes())
}

fn write_bytes(buf: &mut [u8], offset: &mut usize, bytes: &[u8]) -> StoreResult<()> {
    let end = *offset + bytes.len();
    if end > buf.len() {
        return Err(StoreError::Resource(
            "schema too large to fit in one page".into(),
        ));
    }
    buf[*offset..end].copy_from_slice(bytes);
    *offset = end;
    Ok(())
}

fn read_i32(buf: &[u8], offset: &mut usize) -> StoreResult<i32> {
    let bytes = read_bytes(buf, offset, 4)?;
    Ok(i32::from_le_bytes(bytes.try_into().unwrap()))
}

fn read_bytes<'a>(buf: &'a [u8], offset: &mut usize, len: usize) -> StoreResult<&'a [u8]> {
    let end = *offset + len;
    if end > buf.len() {
        return Err(StoreError::Parameter(
            "schema page truncated or corrupt".into(),
        ));
    }
    let slice = &buf[*offset..end];
    *offset = end;
    Ok(slice)
}
