//! Attribute values as JSON in node metadata.
//!
//! Integers are read as 8-byte integers (signed unless they only fit
//! unsigned), other numbers as doubles, booleans as `|u1` and strings as
//! fixed-size text. Arrays of numbers are rank-1 with one common type.
use super::{convert::convert_element, StoreError};
use crate::dtype::{ByteOrder, Datatype};
use serde_json::{Number, Value};

/// A decoded attribute: its type, extent and native element bytes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AttrData {
    pub dtype: Datatype,
    pub dims: Vec<u64>,
    pub bytes: Vec<u8>,
}

fn unsupported(value: &Value) -> StoreError {
    StoreError::UnsupportedType(format!("attribute value {value}"))
}

fn scalar_type(value: &Value) -> Result<Datatype, StoreError> {
    match value {
        Value::Number(n) if n.is_i64() => Ok(Datatype::integer(8, true, ByteOrder::NATIVE)),
        Value::Number(n) if n.is_u64() => Ok(Datatype::integer(8, false, ByteOrder::NATIVE)),
        Value::Number(_) => Ok(Datatype::float(8, ByteOrder::NATIVE)),
        Value::Bool(_) => Ok(Datatype::integer(1, false, ByteOrder::NATIVE)),
        _ => Err(unsupported(value)),
    }
}

/// One type all `items` convert to without loss of sign.
fn common_type(items: &[Value]) -> Result<Datatype, StoreError> {
    let mut types = items.iter().map(scalar_type).collect::<Result<Vec<_>, _>>()?;
    types.dedup();
    Ok(match types.as_slice() {
        [dtype] => dtype.clone(),
        _ => Datatype::float(8, ByteOrder::NATIVE),
    })
}

fn push_native(dtype: &Datatype, value: &Value, out: &mut Vec<u8>) -> Result<(), StoreError> {
    match (dtype, value) {
        (_, Value::Bool(b)) => out.push(u8::from(*b)),
        (Datatype::Integer { signed: true, .. }, Value::Number(n)) => {
            out.extend_from_slice(&n.as_i64().ok_or_else(|| unsupported(value))?.to_ne_bytes());
        }
        (Datatype::Integer { signed: false, .. }, Value::Number(n)) => {
            out.extend_from_slice(&n.as_u64().ok_or_else(|| unsupported(value))?.to_ne_bytes());
        }
        (Datatype::Float { .. }, Value::Number(n)) => {
            out.extend_from_slice(&n.as_f64().ok_or_else(|| unsupported(value))?.to_ne_bytes());
        }
        _ => return Err(unsupported(value)),
    }
    Ok(())
}

/// Decodes a JSON attribute value.
pub(crate) fn from_json(value: &Value) -> Result<AttrData, StoreError> {
    match value {
        Value::String(text) => {
            let size = text.len().max(1);
            let mut bytes = text.as_bytes().to_vec();
            bytes.resize(size, 0);
            Ok(AttrData { dtype: Datatype::FixedString { size }, dims: Vec::new(), bytes })
        }
        Value::Array(items) => {
            let dtype = common_type(items)?;
            let mut bytes = Vec::with_capacity(items.len() * dtype.size());
            for item in items {
                // mixed arrays fall back to doubles, where booleans are numbers too
                match (&dtype, item) {
                    (Datatype::Float { .. }, Value::Bool(b)) => {
                        bytes.extend_from_slice(&f64::from(u8::from(*b)).to_ne_bytes());
                    }
                    _ => push_native(&dtype, item, &mut bytes)?,
                }
            }
            Ok(AttrData { dtype, dims: vec![items.len() as u64], bytes })
        }
        value => {
            let dtype = scalar_type(value)?;
            let mut bytes = Vec::with_capacity(dtype.size());
            push_native(&dtype, value, &mut bytes)?;
            Ok(AttrData { dtype, dims: Vec::new(), bytes })
        }
    }
}

fn element_to_json(dtype: &Datatype, bytes: &[u8]) -> Result<Value, StoreError> {
    match *dtype {
        Datatype::FixedString { size } => {
            let text = &bytes[..size];
            let end = text.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
            Ok(Value::String(String::from_utf8_lossy(&text[..end]).into_owned()))
        }
        Datatype::Integer { signed, .. } => {
            let mut wide = [0u8; 8];
            convert_element(dtype, &Datatype::integer(8, signed, ByteOrder::NATIVE), bytes, &mut wide)?;
            Ok(if signed {
                Value::from(i64::from_ne_bytes(wide))
            } else {
                Value::from(u64::from_ne_bytes(wide))
            })
        }
        Datatype::Float { .. } => {
            let mut wide = [0u8; 8];
            convert_element(dtype, &Datatype::float(8, ByteOrder::NATIVE), bytes, &mut wide)?;
            Number::from_f64(f64::from_ne_bytes(wide))
                .map(Value::Number)
                .ok_or_else(|| StoreError::OutOfRange("a JSON number (non-finite value)".into()))
        }
        Datatype::Compound(_) => Err(StoreError::UnsupportedType(dtype.to_string())),
    }
}

/// Encodes elements of `dtype` in an extent of `dims` as JSON. Rank-0 gives
/// a bare value, anything else a flat array.
pub(crate) fn to_json(dtype: &Datatype, dims: &[u64], bytes: &[u8]) -> Result<Value, StoreError> {
    let size = dtype.size();
    if dims.is_empty() {
        return element_to_json(dtype, bytes);
    }
    let n = dims.iter().product::<u64>() as usize;
    (0..n)
        .map(|i| element_to_json(dtype, &bytes[i * size..(i + 1) * size]))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_take_the_widest_type() {
        let int = from_json(&json!(-3)).unwrap();
        assert_eq!(int.dtype, Datatype::integer(8, true, ByteOrder::NATIVE));
        assert_eq!(int.bytes, (-3i64).to_ne_bytes());
        let big = from_json(&json!(u64::MAX)).unwrap();
        assert_eq!(big.dtype, Datatype::integer(8, false, ByteOrder::NATIVE));
        let real = from_json(&json!(0.5)).unwrap();
        assert_eq!(real.dtype, Datatype::float(8, ByteOrder::NATIVE));
        assert!(real.dims.is_empty());
    }

    #[test]
    fn arrays_are_rank_one() {
        let mixed = from_json(&json!([1, 2.5, true])).unwrap();
        assert_eq!(mixed.dtype, Datatype::float(8, ByteOrder::NATIVE));
        assert_eq!(mixed.dims, vec![3]);
        let back = to_json(&mixed.dtype, &mixed.dims, &mixed.bytes).unwrap();
        assert_eq!(back, json!([1.0, 2.5, 1.0]));
        assert!(from_json(&json!([1, "a"])).is_err());
        assert!(from_json(&json!({"a": 1})).is_err());
    }

    #[test]
    fn text_drops_padding() {
        let text = from_json(&json!("me")).unwrap();
        assert_eq!(text.dtype, Datatype::FixedString { size: 2 });
        let padded = Datatype::FixedString { size: 4 };
        assert_eq!(to_json(&padded, &[], b"me\0\0").unwrap(), json!("me"));
        let empty = from_json(&json!("")).unwrap();
        assert_eq!(to_json(&empty.dtype, &empty.dims, &empty.bytes).unwrap(), json!(""));
    }

    #[test]
    fn narrow_elements_widen() {
        let i2 = Datatype::integer(2, true, ByteOrder::Big);
        assert_eq!(to_json(&i2, &[], &(-7i16).to_be_bytes()).unwrap(), json!(-7));
        let f4 = Datatype::float(4, ByteOrder::Little);
        assert_eq!(to_json(&f4, &[2], &[0.5f32.to_le_bytes(), 2f32.to_le_bytes()].concat()).unwrap(), json!([0.5, 2.0]));
        let err = to_json(&Datatype::float(8, ByteOrder::NATIVE), &[], &f64::NAN.to_ne_bytes()).unwrap_err();
        assert!(matches!(err, StoreError::OutOfRange(_)));
    }
}
