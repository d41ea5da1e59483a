//! Host values: typed n-dimensional arrays and attribute values.
use crate::{
    dtype::HostKind,
    order::{from_store_layout, to_store_layout, StoreVec},
};
use byteorder::{ByteOrder as _, NativeEndian};
use ndarray::{ArrayD, IxDyn};
use num_complex::Complex64;

/// An array element type that can cross the host boundary.
pub trait Element: Copy + Default + 'static {
    /// The host kind of arrays of this element.
    const KIND: HostKind;
    /// Bytes per element in a transfer buffer.
    const SIZE: usize;

    /// Wraps an array of this element.
    fn into_host(array: ArrayD<Self>) -> HostArray;

    /// Unwraps an array of this element, or gives the value back.
    fn from_host(array: HostArray) -> Result<ArrayD<Self>, HostArray>;

    /// Appends `slice` to `out` in native byte order.
    fn write_native(slice: &[Self], out: &mut Vec<u8>);

    /// Decodes native-order bytes. Returns `None` if `bytes` is not a whole
    /// number of elements.
    fn read_native(bytes: &[u8]) -> Option<Vec<Self>>;
}

macro_rules! impl_element {
    ($elem:ty, $kind:ident, $size:expr, $read:ident, $write:ident) => {
        impl Element for $elem {
            const KIND: HostKind = HostKind::$kind;
            const SIZE: usize = $size;

            fn into_host(array: ArrayD<Self>) -> HostArray {
                HostArray::$kind(array)
            }

            fn from_host(array: HostArray) -> Result<ArrayD<Self>, HostArray> {
                match array {
                    HostArray::$kind(a) => Ok(a),
                    other => Err(other),
                }
            }

            fn write_native(slice: &[Self], out: &mut Vec<u8>) {
                let start = out.len();
                out.resize(start + slice.len() * Self::SIZE, 0);
                NativeEndian::$write(slice, &mut out[start..]);
            }

            fn read_native(bytes: &[u8]) -> Option<Vec<Self>> {
                if bytes.len() % Self::SIZE != 0 {
                    return None;
                }
                let mut data = vec![Self::default(); bytes.len() / Self::SIZE];
                NativeEndian::$read(bytes, &mut data);
                Some(data)
            }
        }
    };
}

impl_element!(f64, Real64, 8, read_f64_into, write_f64_into);
impl_element!(f32, Real32, 4, read_f32_into, write_f32_into);
impl_element!(i16, Int16, 2, read_i16_into, write_i16_into);
impl_element!(i32, Int32, 4, read_i32_into, write_i32_into);
impl_element!(i64, Int64, 8, read_i64_into, write_i64_into);
impl_element!(u16, UInt16, 2, read_u16_into, write_u16_into);
impl_element!(u32, UInt32, 4, read_u32_into, write_u32_into);
impl_element!(u64, UInt64, 8, read_u64_into, write_u64_into);

impl Element for u8 {
    const KIND: HostKind = HostKind::UInt8;
    const SIZE: usize = 1;

    fn into_host(array: ArrayD<Self>) -> HostArray {
        HostArray::UInt8(array)
    }

    fn from_host(array: HostArray) -> Result<ArrayD<Self>, HostArray> {
        match array {
            HostArray::UInt8(a) => Ok(a),
            other => Err(other),
        }
    }

    fn write_native(slice: &[Self], out: &mut Vec<u8>) {
        out.extend_from_slice(slice);
    }

    fn read_native(bytes: &[u8]) -> Option<Vec<Self>> {
        Some(bytes.to_vec())
    }
}

impl Element for i8 {
    const KIND: HostKind = HostKind::Int8;
    const SIZE: usize = 1;

    fn into_host(array: ArrayD<Self>) -> HostArray {
        HostArray::Int8(array)
    }

    fn from_host(array: HostArray) -> Result<ArrayD<Self>, HostArray> {
        match array {
            HostArray::Int8(a) => Ok(a),
            other => Err(other),
        }
    }

    fn write_native(slice: &[Self], out: &mut Vec<u8>) {
        out.extend(slice.iter().map(|&v| v.to_ne_bytes()[0]));
    }

    fn read_native(bytes: &[u8]) -> Option<Vec<Self>> {
        Some(bytes.iter().map(|&b| i8::from_ne_bytes([b])).collect())
    }
}

// Real part first, then imaginary part.
impl Element for Complex64 {
    const KIND: HostKind = HostKind::Complex;
    const SIZE: usize = 16;

    fn into_host(array: ArrayD<Self>) -> HostArray {
        HostArray::Complex(array)
    }

    fn from_host(array: HostArray) -> Result<ArrayD<Self>, HostArray> {
        match array {
            HostArray::Complex(a) => Ok(a),
            other => Err(other),
        }
    }

    fn write_native(slice: &[Self], out: &mut Vec<u8>) {
        let parts: Vec<f64> = slice.iter().flat_map(|c| [c.re, c.im]).collect();
        f64::write_native(&parts, out);
    }

    fn read_native(bytes: &[u8]) -> Option<Vec<Self>> {
        if bytes.len() % Self::SIZE != 0 {
            return None;
        }
        let parts = f64::read_native(bytes)?;
        Some(parts.chunks_exact(2).map(|p| Complex64::new(p[0], p[1])).collect())
    }
}

/// A typed host array.
///
/// Shapes are in host order. Any memory layout is accepted; the element
/// sequence the store sees is the array's column-major sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum HostArray {
    /// 64-bit floats.
    Real64(ArrayD<f64>),
    /// 32-bit floats.
    Real32(ArrayD<f32>),
    /// Signed 8-bit integers.
    Int8(ArrayD<i8>),
    /// Signed 16-bit integers.
    Int16(ArrayD<i16>),
    /// Signed 32-bit integers.
    Int32(ArrayD<i32>),
    /// Signed 64-bit integers.
    Int64(ArrayD<i64>),
    /// Unsigned 8-bit integers.
    UInt8(ArrayD<u8>),
    /// Unsigned 16-bit integers.
    UInt16(ArrayD<u16>),
    /// Unsigned 32-bit integers.
    UInt32(ArrayD<u32>),
    /// Unsigned 64-bit integers.
    UInt64(ArrayD<u64>),
    /// Complex numbers.
    Complex(ArrayD<Complex64>),
}

macro_rules! dispatch {
    ($value:expr, $array:ident => $body:expr) => {
        match $value {
            HostArray::Real64($array) => $body,
            HostArray::Real32($array) => $body,
            HostArray::Int8($array) => $body,
            HostArray::Int16($array) => $body,
            HostArray::Int32($array) => $body,
            HostArray::Int64($array) => $body,
            HostArray::UInt8($array) => $body,
            HostArray::UInt16($array) => $body,
            HostArray::UInt32($array) => $body,
            HostArray::UInt64($array) => $body,
            HostArray::Complex($array) => $body,
        }
    };
}

impl HostArray {
    /// A rank-0 array holding `value`.
    pub fn scalar<T: Element>(value: T) -> Self {
        T::into_host(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// Host kind of the elements.
    pub fn kind(&self) -> HostKind {
        match self {
            Self::Real64(_) => HostKind::Real64,
            Self::Real32(_) => HostKind::Real32,
            Self::Int8(_) => HostKind::Int8,
            Self::Int16(_) => HostKind::Int16,
            Self::Int32(_) => HostKind::Int32,
            Self::Int64(_) => HostKind::Int64,
            Self::UInt8(_) => HostKind::UInt8,
            Self::UInt16(_) => HostKind::UInt16,
            Self::UInt32(_) => HostKind::UInt32,
            Self::UInt64(_) => HostKind::UInt64,
            Self::Complex(_) => HostKind::Complex,
        }
    }

    /// Host-order shape.
    pub fn shape(&self) -> &[usize] {
        dispatch!(self, a => a.shape())
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        dispatch!(self, a => a.len())
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unwraps the array if its elements are `T`.
    pub fn into_array<T: Element>(self) -> Option<ArrayD<T>> {
        T::from_host(self).ok()
    }

    /// Linearizes the array into a native-order transfer buffer in store
    /// layout, together with its store-order extent.
    pub fn to_store_bytes(&self) -> (Vec<u8>, StoreVec<usize>) {
        dispatch!(self, a => {
            let (data, dims) = to_store_layout(a);
            let mut out = Vec::new();
            Element::write_native(data.as_slice(), &mut out);
            (out, dims)
        })
    }

    /// Rebuilds an array of `kind` from a native-order transfer buffer in
    /// store layout.
    ///
    /// Returns `None` for [`HostKind::String`] or if `bytes` does not hold
    /// exactly the elements `dims` describes.
    pub fn from_native_bytes(kind: HostKind, dims: StoreVec<usize>, bytes: &[u8]) -> Option<Self> {
        fn build<T: Element>(dims: StoreVec<usize>, bytes: &[u8]) -> Option<HostArray> {
            from_store_layout(dims, T::read_native(bytes)?).map(T::into_host)
        }
        match kind {
            HostKind::Real64 => build::<f64>(dims, bytes),
            HostKind::Real32 => build::<f32>(dims, bytes),
            HostKind::Int8 => build::<i8>(dims, bytes),
            HostKind::Int16 => build::<i16>(dims, bytes),
            HostKind::Int32 => build::<i32>(dims, bytes),
            HostKind::Int64 => build::<i64>(dims, bytes),
            HostKind::UInt8 => build::<u8>(dims, bytes),
            HostKind::UInt16 => build::<u16>(dims, bytes),
            HostKind::UInt32 => build::<u32>(dims, bytes),
            HostKind::UInt64 => build::<u64>(dims, bytes),
            HostKind::Complex => build::<Complex64>(dims, bytes),
            HostKind::String => None,
        }
    }
}

impl<T: Element> From<ArrayD<T>> for HostArray {
    fn from(array: ArrayD<T>) -> Self {
        T::into_host(array)
    }
}

/// The value of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// A numeric scalar (or, when read back, a vector).
    Numeric(HostArray),
    /// Text, stored as a fixed-size string.
    Text(String),
}

impl From<HostArray> for AttrValue {
    fn from(array: HostArray) -> Self {
        Self::Numeric(array)
    }
}

impl From<String> for AttrValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for AttrValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

macro_rules! impl_attr_scalar {
    ($($elem:ty),*) => {
        $(
            impl From<$elem> for AttrValue {
                fn from(value: $elem) -> Self {
                    Self::Numeric(HostArray::scalar(value))
                }
            }
        )*
    };
}

impl_attr_scalar!(f64, f32, i8, i16, i32, i64, u8, u16, u32, u64, Complex64);
