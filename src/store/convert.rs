//! Element conversion between stored and in-memory datatypes.
use super::StoreError;
use crate::dtype::{ByteOrder, Datatype};
use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use half::f16;
use num_traits::NumCast;

/// A decoded element.
#[derive(Clone, Debug, PartialEq)]
enum Value {
    Int(i128),
    Float(f64),
    Text(Vec<u8>),
    Fields(Vec<Value>),
}

fn conversion(from: &Datatype, to: &Datatype) -> StoreError {
    StoreError::Conversion { from: from.to_string(), to: to.to_string() }
}

fn decode(dtype: &Datatype, bytes: &[u8]) -> Result<Value, StoreError> {
    match *dtype {
        Datatype::Integer { size, signed, order } if (1..=8).contains(&size) => {
            let bytes = &bytes[..size];
            Ok(Value::Int(match (order, signed) {
                (ByteOrder::Big, true) => BigEndian::read_int(bytes, size).into(),
                (ByteOrder::Big, false) => BigEndian::read_uint(bytes, size).into(),
                (_, true) => LittleEndian::read_int(bytes, size).into(),
                (_, false) => LittleEndian::read_uint(bytes, size).into(),
            }))
        }
        Datatype::Float { size: 8, order } => Ok(Value::Float(match order {
            ByteOrder::Big => BigEndian::read_f64(bytes),
            _ => LittleEndian::read_f64(bytes),
        })),
        Datatype::Float { size: 4, order } => Ok(Value::Float(<f64 as From<f32>>::from(match order {
            ByteOrder::Big => BigEndian::read_f32(bytes),
            _ => LittleEndian::read_f32(bytes),
        }))),
        Datatype::Float { size: 2, order } => Ok(Value::Float(
            f16::from_bits(match order {
                ByteOrder::Big => BigEndian::read_u16(bytes),
                _ => LittleEndian::read_u16(bytes),
            })
            .to_f64(),
        )),
        Datatype::FixedString { size } => Ok(Value::Text(bytes[..size].to_vec())),
        Datatype::Compound(ref fields) => {
            let mut offset = 0;
            let mut values = Vec::with_capacity(fields.len());
            for field in fields {
                let size = field.dtype.size();
                values.push(decode(&field.dtype, &bytes[offset..offset + size])?);
                offset += size;
            }
            Ok(Value::Fields(values))
        }
        Datatype::Integer { .. } | Datatype::Float { .. } => {
            Err(StoreError::UnsupportedType(dtype.to_string()))
        }
    }
}

fn int_range(size: usize, signed: bool) -> (i128, i128) {
    let bits = 8 * size as u32;
    if signed {
        (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
    } else {
        (0, (1i128 << bits) - 1)
    }
}

fn encode_int(dtype: &Datatype, n: i128, out: &mut [u8]) -> Result<(), StoreError> {
    let Datatype::Integer { size, signed, order } = *dtype else {
        return Err(StoreError::UnsupportedType(dtype.to_string()));
    };
    let (min, max) = int_range(size, signed);
    if n < min || n > max {
        return Err(StoreError::OutOfRange(dtype.to_string()));
    }
    let out = &mut out[..size];
    // both casts are lossless after the range check
    match (order, signed) {
        (ByteOrder::Big, true) => BigEndian::write_int(out, n as i64, size),
        (ByteOrder::Big, false) => BigEndian::write_uint(out, n as u64, size),
        (_, true) => LittleEndian::write_int(out, n as i64, size),
        (_, false) => LittleEndian::write_uint(out, n as u64, size),
    }
    Ok(())
}

fn encode_float(size: usize, order: ByteOrder, f: f64, out: &mut [u8]) {
    match (size, order) {
        (8, ByteOrder::Big) => BigEndian::write_f64(out, f),
        (8, _) => LittleEndian::write_f64(out, f),
        (2, ByteOrder::Big) => BigEndian::write_u16(out, f16::from_f64(f).to_bits()),
        (2, _) => LittleEndian::write_u16(out, f16::from_f64(f).to_bits()),
        (_, ByteOrder::Big) => BigEndian::write_f32(out, f as f32),
        _ => LittleEndian::write_f32(out, f as f32),
    }
}

fn encode(dtype: &Datatype, value: &Value, out: &mut [u8]) -> Result<(), StoreError> {
    match (dtype, value) {
        (&Datatype::Integer { size, .. }, _) if !(1..=8).contains(&size) => {
            Err(StoreError::UnsupportedType(dtype.to_string()))
        }
        (&Datatype::Float { size, .. }, _) if ![2, 4, 8].contains(&size) => {
            Err(StoreError::UnsupportedType(dtype.to_string()))
        }
        (Datatype::Integer { .. }, &Value::Int(n)) => encode_int(dtype, n, out),
        (Datatype::Integer { .. }, &Value::Float(f)) => {
            let n = <i128 as NumCast>::from(f)
                .ok_or_else(|| StoreError::OutOfRange(dtype.to_string()))?;
            encode_int(dtype, n, out)
        }
        (&Datatype::Float { size, order }, &Value::Int(n)) => {
            encode_float(size, order, n as f64, out);
            Ok(())
        }
        (&Datatype::Float { size, order }, &Value::Float(f)) => {
            encode_float(size, order, f, out);
            Ok(())
        }
        (&Datatype::FixedString { size }, Value::Text(text)) => {
            let out = &mut out[..size];
            let n = text.len().min(size);
            out[..n].copy_from_slice(&text[..n]);
            out[n..].fill(0);
            Ok(())
        }
        (Datatype::Compound(fields), Value::Fields(values)) if fields.len() == values.len() => {
            let mut offset = 0;
            for (field, value) in fields.iter().zip(values) {
                let size = field.dtype.size();
                encode(&field.dtype, value, &mut out[offset..offset + size])?;
                offset += size;
            }
            Ok(())
        }
        _ => Err(StoreError::Conversion {
            from: value_kind(value).to_string(),
            to: dtype.to_string(),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Int(_) => "integer",
        Value::Float(_) => "float",
        Value::Text(_) => "string",
        Value::Fields(_) => "compound",
    }
}

/// Converts one element of type `from` in `src` into type `to` in `dst`.
///
/// Both slices must be at least as long as their type.
pub(crate) fn convert_element(
    from: &Datatype,
    to: &Datatype,
    src: &[u8],
    dst: &mut [u8],
) -> Result<(), StoreError> {
    if from == to {
        let size = from.size();
        dst[..size].copy_from_slice(&src[..size]);
        return Ok(());
    }
    let value = decode(from, src)?;
    encode(to, &value, dst).map_err(|err| match err {
        StoreError::Conversion { .. } => conversion(from, to),
        other => other,
    })
}

/// Whether elements of `from` can in principle be converted into `to`.
pub(crate) fn convertible(from: &Datatype, to: &Datatype) -> bool {
    match (from, to) {
        (
            Datatype::Integer { .. } | Datatype::Float { .. },
            Datatype::Integer { .. } | Datatype::Float { .. },
        ) => true,
        (Datatype::FixedString { .. }, Datatype::FixedString { .. }) => true,
        (Datatype::Compound(a), Datatype::Compound(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| convertible(&x.dtype, &y.dtype))
        }
        _ => false,
    }
}
