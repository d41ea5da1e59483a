//! Element types of the store and the host kinds they map to.
use crate::error::TypeError;
use std::{fmt, str::FromStr};

/// Byte order of a stored element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
    /// Single-byte and string elements.
    NotApplicable,
}

impl ByteOrder {
    /// Byte order of the running platform.
    pub const NATIVE: Self = if cfg!(target_endian = "little") {
        Self::Little
    } else {
        Self::Big
    };

    fn prefix(self) -> char {
        match self {
            Self::Little => '<',
            Self::Big => '>',
            Self::NotApplicable => '|',
        }
    }
}

/// Coarse class of a stored element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    /// Fixed-width integers.
    Integer,
    /// IEEE floating point.
    Float,
    /// Records of named fields.
    Compound,
    /// Fixed-size, NUL-terminated byte strings.
    String,
}

/// A named member of a compound type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    /// Member name.
    pub name: String,
    /// Member type.
    pub dtype: Datatype,
}

/// A stored element type.
///
/// Displays in numpy's descriptor spelling (`<f8`, `|u1`, `|S5`, or a list of
/// `(name, descr)` pairs for compounds).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Datatype {
    /// Fixed-width integer of `size` bytes.
    Integer {
        /// Width in bytes.
        size: usize,
        /// Two's complement if set.
        signed: bool,
        /// Byte order.
        order: ByteOrder,
    },
    /// Floating point number of `size` bytes.
    Float {
        /// Width in bytes.
        size: usize,
        /// Byte order.
        order: ByteOrder,
    },
    /// Packed record of fields.
    Compound(Vec<Field>),
    /// Fixed-size string of `size` bytes, NUL-terminated when shorter.
    FixedString {
        /// Width in bytes.
        size: usize,
    },
}

/// Field names of the complex-number compound.
pub const COMPLEX_FIELDS: [&str; 2] = ["real", "imag"];

impl Datatype {
    /// Integer type. Single-byte integers carry no byte order.
    pub fn integer(size: usize, signed: bool, order: ByteOrder) -> Self {
        let order = if size == 1 { ByteOrder::NotApplicable } else { order };
        Self::Integer { size, signed, order }
    }

    /// Floating point type.
    pub fn float(size: usize, order: ByteOrder) -> Self {
        Self::Float { size, order }
    }

    /// The two-field complex compound with both parts of type `member`.
    pub fn complex(member: Datatype) -> Self {
        Self::Compound(
            COMPLEX_FIELDS
                .iter()
                .map(|name| Field { name: name.to_string(), dtype: member.clone() })
                .collect(),
        )
    }

    /// Class of this type.
    pub fn class(&self) -> TypeClass {
        match self {
            Self::Integer { .. } => TypeClass::Integer,
            Self::Float { .. } => TypeClass::Float,
            Self::Compound(_) => TypeClass::Compound,
            Self::FixedString { .. } => TypeClass::String,
        }
    }

    /// Width of one element in bytes. Compound members are packed.
    pub fn size(&self) -> usize {
        match self {
            Self::Integer { size, .. } | Self::Float { size, .. } | Self::FixedString { size } => {
                *size
            }
            Self::Compound(fields) => fields.iter().map(|f| f.dtype.size()).sum(),
        }
    }

    /// Structural compatibility of two compounds: the same number of members
    /// and the same class member by member. Non-compounds are never
    /// compatible.
    pub fn is_compatible(&self, other: &Datatype) -> bool {
        match (self, other) {
            (Self::Compound(a), Self::Compound(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| x.dtype.class() == y.dtype.class())
            }
            _ => false,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Integer { size, signed, order } => {
                let kind = if *signed { 'i' } else { 'u' };
                write!(f, "{}{kind}{size}", order.prefix())
            }
            Self::Float { size, order } => write!(f, "{}f{size}", order.prefix()),
            Self::FixedString { size } => write!(f, "|S{size}"),
            Self::Compound(fields) => {
                write!(f, "[")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "('{}', '{}')", field.name, field.dtype)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl FromStr for Datatype {
    type Err = TypeError;

    /// Parses a scalar descriptor such as `<f8`, `>i2`, `|u1` or `|S12`.
    /// `=` stands for the native byte order.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = || TypeError::UnsupportedStoreType(s.to_string());
        let mut chars = s.chars();
        let order = match chars.next() {
            Some('<') => ByteOrder::Little,
            Some('>') => ByteOrder::Big,
            Some('|') => ByteOrder::NotApplicable,
            Some('=') => ByteOrder::NATIVE,
            _ => return Err(unsupported()),
        };
        let kind = chars.next().ok_or_else(unsupported)?;
        let size = chars.as_str().parse::<usize>().map_err(|_| unsupported())?;
        if size == 0 {
            return Err(unsupported());
        }
        let multi_byte = |order| match order {
            ByteOrder::NotApplicable if size > 1 => Err(unsupported()),
            ByteOrder::NotApplicable => Ok(ByteOrder::NATIVE),
            order => Ok(order),
        };
        match kind {
            'i' | 'u' => Ok(Self::integer(size, kind == 'i', multi_byte(order)?)),
            'f' => Ok(Self::float(size, multi_byte(order)?)),
            'S' if order == ByteOrder::NotApplicable => Ok(Self::FixedString { size }),
            _ => Err(unsupported()),
        }
    }
}

/// The closed set of value kinds the host exchanges with the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    /// 64-bit float.
    Real64,
    /// 32-bit float.
    Real32,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// Pair of 64-bit floats.
    Complex,
    /// Text, for attributes only.
    String,
}

impl HostKind {
    /// The host's name for this kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Real64 => "double",
            Self::Real32 => "single",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Complex => "complex",
            Self::String => "string",
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HostKind {
    type Err = TypeError;

    /// Accepts the element type names a dataset can be created with.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "double" => Self::Real64,
            "single" => Self::Real32,
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "uint8" => Self::UInt8,
            "uint16" => Self::UInt16,
            "uint32" => Self::UInt32,
            "uint64" => Self::UInt64,
            _ => return Err(TypeError::UnknownName(s.to_string())),
        })
    }
}

/// One row of the dispatch table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    /// Host kind.
    pub kind: HostKind,
    /// Type the store persists.
    pub on_disk: Datatype,
    /// Type of the transfer buffer.
    pub in_memory: Datatype,
    /// Bytes per element in memory.
    pub size: usize,
    /// Whether the kind is a signed integer.
    pub signed: bool,
}

impl TypeMapping {
    /// The mapping of a numeric host kind, with multi-byte elements in
    /// `order`.
    ///
    /// Strings have no fixed size and are mapped with
    /// [`TypeMapping::for_string`] instead.
    pub fn for_kind(kind: HostKind, order: ByteOrder) -> Result<Self, TypeError> {
        let int = |size, signed| (Datatype::integer(size, signed, order), signed);
        let (dtype, signed) = match kind {
            HostKind::Real64 => (Datatype::float(8, order), false),
            HostKind::Real32 => (Datatype::float(4, order), false),
            HostKind::Int8 => int(1, true),
            HostKind::Int16 => int(2, true),
            HostKind::Int32 => int(4, true),
            HostKind::Int64 => int(8, true),
            HostKind::UInt8 => int(1, false),
            HostKind::UInt16 => int(2, false),
            HostKind::UInt32 => int(4, false),
            HostKind::UInt64 => int(8, false),
            HostKind::Complex => (Datatype::complex(Datatype::float(8, order)), false),
            HostKind::String => {
                return Err(TypeError::UnsupportedKind { kind, context: "fixed-size mapping" })
            }
        };
        Ok(Self { kind, size: dtype.size(), on_disk: dtype.clone(), in_memory: dtype, signed })
    }

    /// The mapping of a string of `len` bytes. Empty strings take one byte.
    pub fn for_string(len: usize) -> Self {
        let dtype = Datatype::FixedString { size: len.max(1) };
        Self {
            kind: HostKind::String,
            size: dtype.size(),
            on_disk: dtype.clone(),
            in_memory: dtype,
            signed: false,
        }
    }
}

/// Classifies a stored element type into the host kind it is read as.
///
/// Complex compounds are recognized first, then integers by width and
/// signedness, then floats. Integers of an unusual width up to 8 bytes are
/// read as [`HostKind::Int64`] and floats of any width other than 4 bytes
/// (half precision, extended precision) are read as [`HostKind::Real64`].
pub fn classify_on_disk_type(dtype: &Datatype) -> Result<HostKind, TypeError> {
    if dtype.is_compatible(&Datatype::complex(Datatype::float(8, ByteOrder::NATIVE))) {
        return Ok(HostKind::Complex);
    }
    match *dtype {
        Datatype::Integer { size, signed, .. } => Ok(match (size, signed) {
            (1, true) => HostKind::Int8,
            (2, true) => HostKind::Int16,
            (4, true) => HostKind::Int32,
            (8, true) => HostKind::Int64,
            (1, false) => HostKind::UInt8,
            (2, false) => HostKind::UInt16,
            (4, false) => HostKind::UInt32,
            (8, false) => HostKind::UInt64,
            (3..=7, _) => {
                tracing::warn!(%dtype, "unknown integer width, reading as int64");
                HostKind::Int64
            }
            _ => return Err(TypeError::UnsupportedStoreType(dtype.to_string())),
        }),
        Datatype::Float { size: 4, .. } => Ok(HostKind::Real32),
        Datatype::Float { .. } => Ok(HostKind::Real64),
        Datatype::FixedString { .. } => Ok(HostKind::String),
        Datatype::Compound(_) => Err(TypeError::UnsupportedStoreType(dtype.to_string())),
    }
}
