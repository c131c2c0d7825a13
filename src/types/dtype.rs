//! Element type tags

/// Registered element type tag
///
/// Discriminants double as the promotion rank: a tag later in the list is
/// never narrower than an earlier one of the same kind, and every tag can be
/// held by `Object`. `Bytes` and `Void` are flexible: their size lives in the
/// descriptor, not in the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TypeTag {
    Bool = 0x00,
    Int8 = 0x01,
    UInt8 = 0x02,
    Int16 = 0x03,
    UInt16 = 0x04,
    Int32 = 0x05,
    UInt32 = 0x06,
    Int64 = 0x07,
    UInt64 = 0x08,
    Float16 = 0x09,
    Float32 = 0x0A,
    Float64 = 0x0B,
    Complex64 = 0x0C,
    Complex128 = 0x0D,
    Object = 0x0E,
    Bytes = 0x0F,
    Void = 0x10,
}

/// Broad family a tag belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Bool,
    Signed,
    Unsigned,
    Float,
    Complex,
    Object,
    Bytes,
    Void,
}

/// Size in bytes of an object slot
pub const OBJECT_ITEMSIZE: usize = 8;

impl TypeTag {
    /// Every registered tag in rank order
    pub const ALL: [TypeTag; 17] = [
        TypeTag::Bool,
        TypeTag::Int8,
        TypeTag::UInt8,
        TypeTag::Int16,
        TypeTag::UInt16,
        TypeTag::Int32,
        TypeTag::UInt32,
        TypeTag::Int64,
        TypeTag::UInt64,
        TypeTag::Float16,
        TypeTag::Float32,
        TypeTag::Float64,
        TypeTag::Complex64,
        TypeTag::Complex128,
        TypeTag::Object,
        TypeTag::Bytes,
        TypeTag::Void,
    ];

    /// Try to convert from u8 tag
    pub fn from_u8(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn kind(self) -> TypeKind {
        match self {
            TypeTag::Bool => TypeKind::Bool,
            TypeTag::Int8 | TypeTag::Int16 | TypeTag::Int32 | TypeTag::Int64 => TypeKind::Signed,
            TypeTag::UInt8 | TypeTag::UInt16 | TypeTag::UInt32 | TypeTag::UInt64 => {
                TypeKind::Unsigned
            }
            TypeTag::Float16 | TypeTag::Float32 | TypeTag::Float64 => TypeKind::Float,
            TypeTag::Complex64 | TypeTag::Complex128 => TypeKind::Complex,
            TypeTag::Object => TypeKind::Object,
            TypeTag::Bytes => TypeKind::Bytes,
            TypeTag::Void => TypeKind::Void,
        }
    }

    /// Size in bytes of a single element, `None` for flexible tags
    pub fn element_size(self) -> Option<usize> {
        match self {
            TypeTag::Bool | TypeTag::Int8 | TypeTag::UInt8 => Some(1),
            TypeTag::Int16 | TypeTag::UInt16 | TypeTag::Float16 => Some(2),
            TypeTag::Int32 | TypeTag::UInt32 | TypeTag::Float32 => Some(4),
            TypeTag::Int64 | TypeTag::UInt64 | TypeTag::Float64 | TypeTag::Complex64 => Some(8),
            TypeTag::Complex128 => Some(16),
            TypeTag::Object => Some(OBJECT_ITEMSIZE),
            TypeTag::Bytes | TypeTag::Void => None,
        }
    }

    /// Natural alignment of one element
    pub fn alignment(self) -> usize {
        match self {
            TypeTag::Complex64 => 4,
            TypeTag::Complex128 => 8,
            TypeTag::Bytes | TypeTag::Void => 1,
            other => other.element_size().unwrap_or(1),
        }
    }

    /// One-character type code
    pub fn type_char(self) -> char {
        match self {
            TypeTag::Bool => '?',
            TypeTag::Int8 => 'b',
            TypeTag::UInt8 => 'B',
            TypeTag::Int16 => 'h',
            TypeTag::UInt16 => 'H',
            TypeTag::Int32 => 'i',
            TypeTag::UInt32 => 'I',
            TypeTag::Int64 => 'l',
            TypeTag::UInt64 => 'L',
            TypeTag::Float16 => 'e',
            TypeTag::Float32 => 'f',
            TypeTag::Float64 => 'd',
            TypeTag::Complex64 => 'F',
            TypeTag::Complex128 => 'D',
            TypeTag::Object => 'O',
            TypeTag::Bytes => 'S',
            TypeTag::Void => 'V',
        }
    }

    /// Kind character used in type strings (`<i4`, `|S5`, ...)
    pub fn kind_char(self) -> char {
        match self.kind() {
            TypeKind::Bool => 'b',
            TypeKind::Signed => 'i',
            TypeKind::Unsigned => 'u',
            TypeKind::Float => 'f',
            TypeKind::Complex => 'c',
            TypeKind::Object => 'O',
            TypeKind::Bytes => 'S',
            TypeKind::Void => 'V',
        }
    }

    pub fn is_flexible(self) -> bool {
        matches!(self, TypeTag::Bytes | TypeTag::Void)
    }

    pub fn is_integer(self) -> bool {
        matches!(self.kind(), TypeKind::Signed | TypeKind::Unsigned)
    }

    pub fn is_number(self) -> bool {
        self <= TypeTag::Complex128
    }

    /// Whether the in-memory representation depends on byte order
    pub fn has_byte_order(self) -> bool {
        self.is_number() && self.element_size().is_some_and(|size| size > 1)
    }

    /// Widest decimal rendering of a value of this tag, used when casting to `Bytes`
    pub(crate) fn rendered_width(self) -> Option<usize> {
        match self {
            TypeTag::Bool => Some(5),
            TypeTag::Int8 => Some(4),
            TypeTag::UInt8 => Some(3),
            TypeTag::Int16 => Some(6),
            TypeTag::UInt16 => Some(5),
            TypeTag::Int32 => Some(11),
            TypeTag::UInt32 => Some(10),
            TypeTag::Int64 => Some(21),
            TypeTag::UInt64 => Some(20),
            TypeTag::Float16 | TypeTag::Float32 | TypeTag::Float64 => Some(32),
            TypeTag::Complex64 | TypeTag::Complex128 => Some(64),
            TypeTag::Object | TypeTag::Bytes | TypeTag::Void => None,
        }
    }
}
