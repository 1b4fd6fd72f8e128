//! In-memory record buffers and attribute-level get/set against a
//! [`Schema`]'s fixed-width layout.

use crate::schema::{DataType, Schema};
use dbcore::{DataTypeTag, Rid, StoreError, StoreResult};
use predicate::Value;

/// One record: a stable identifier plus a fixed-width payload buffer
/// laid out per [`Schema::record_size`]. Constructed zero-filled and
/// unplaced via [`Record::new`]; `insert`/`get`/`next` fill in `rid` and
/// `data` from there.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub rid: Rid,
    pub data: Vec<u8>,
}

impl Record {
    pub fn new(schema: &Schema) -> Self {
        Self {
            rid: Rid::UNPLACED,
            data: vec![0u8; schema.record_size()],
        }
    }

    pub fn get_attr(&self, schema: &Schema, idx: usize) -> StoreResult<Value> {
        let attr = schema.attr(idx)?;
        let offset = schema.attr_offset(idx)?;
        let width = attr.data_type.width();
        let bytes = &self.data[offset..offset + width];

        Ok(match attr.data_type {
            DataType::Int => Value::Int(i32::from_le_bytes(bytes.try_into().unwrap())),
            DataType::Float => Value::Float(f32::from_le_bytes(bytes.try_into().unwrap())),
            DataType::Bool => Value::Bool(bytes[0] != 0),
            DataType::String(_) => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                Value::String(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
        })
    }

    pub fn set_attr(&mut self, schema: &Schema, idx: usize, value: Value) -> StoreResult<()> {
        let attr = schema.attr(idx)?;
        let offset = schema.attr_offset(idx)?;
        let width = attr.data_type.width();

        match (attr.data_type, &value) {
            (DataType::Int, Value::Int(v)) => {
                self.data[offset..offset + width].copy_from_slice(&v.to_le_bytes());
            }
            (DataType::Float, Value::Float(v)) => {
                self.data[offset..offset + width].copy_from_slice(&v.to_le_bytes());
            }
            (DataType::Bool, Value::Bool(v)) => {
                self.data[offset] = if *v { 1 } else { 0 };
            }
            (DataType::String(len), Value::String(v)) => {
                let slot = &mut self.data[offset..offset + width];
                slot.fill(0);
                let bytes = v.as_bytes();
                let copy_len = bytes.len().min(len as usize);
                slot[..copy_len].copy_from_slice(&bytes[..copy_len]);
            }
            _ => {
                return Err(StoreError::TypeMismatch {
                    expected: tag_of(attr.data_type),
                    got: tag_of_value(&value),
                });
            }
        }
        Ok(())
    }
}

fn tag_of(data_type: DataType) -> DataTypeTag {
    match data_type {
        DataType::Int => DataTypeTag::Int,
        DataType::Float => DataTypeTag::Float,
        DataType::Bool => DataTypeTag::Bool,
        DataType::String(_) => DataTypeTag::String,
    }
}

fn tag_of_value(value: &Value) -> DataTypeTag {
    match value {
        Value::Int(_) => DataTypeTag::Int,
        Value::Float(_) => DataTypeTag::Float,
        Value::Bool(_) => DataTypeTag::Bool,
        Value::String(_) => DataTypeTag::String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;

    fn schema() -> Schema {
        Schema::new(
            vec![
                Attribute::new("id", DataType::Int),
                Attribute::new("name", DataType::String(4)),
                Attribute::new("salary", DataType::Float),
                Attribute::new("active", DataType::Bool),
            ],
            vec![0],
        )
        .unwrap()
    }

    #[test]
    fn new_record_is_unplaced_and_zeroed() {
        let schema = schema();
        let r = Record::new(&schema);
        assert_eq!(r.rid, Rid::UNPLACED);
        assert_eq!(r.data.len(), schema.record_size());
        assert!(r.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn round_trip_every_type() {
        let schema = schema();
        let mut r = Record::new(&schema);

        r.set_attr(&schema, 0, Value::Int(42)).unwrap();
        r.set_attr(&schema, 1, Value::String("AB".into())).unwrap();
        r.set_attr(&schema, 2, Value::Float(3.5)).unwrap();
        r.set_attr(&schema, 3, Value::Bool(true)).unwrap();

        assert_eq!(r.get_attr(&schema, 0).unwrap(), Value::Int(42));
        assert_eq!(r.get_attr(&schema, 1).unwrap(), Value::String("AB".into()));
        assert_eq!(r.get_attr(&schema, 2).unwrap(), Value::Float(3.5));
        assert_eq!(r.get_attr(&schema, 3).unwrap(), Value::Bool(true));
    }

    #[test]
    fn string_longer_than_declared_length_is_truncated() {
        let schema = schema();
        let mut r = Record::new(&schema);
        r.set_attr(&schema, 1, Value::String("ABCDE".into())).unwrap();
        assert_eq!(r.get_attr(&schema, 1).unwrap(), Value::String("ABCD".into()));
    }

    #[test]
    fn set_attr_type_mismatch_fails() {
        let schema = schema();
        let mut r = Record::new(&schema);
        let err = r.set_attr(&schema, 0, Value::Bool(true)).unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch { .. }));
    }

    #[test]
    fn out_of_range_index_fails() {
        let schema = schema();
        let r = Record::new(&schema);
        assert!(matches!(
            r.get_attr(&schema, 99),
            Err(StoreError::Parameter(_))
        ));
    }
}
