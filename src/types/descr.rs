//! Element descriptors
//!
//! A [`Descr`] is immutable once shared. Every operation that changes byte
//! order or field names returns a new descriptor and leaves the original
//! untouched.

use super::dtype::{OBJECT_ITEMSIZE, TypeKind, TypeTag};
use super::fields::{Field, Fields};
use super::registry;
use crate::error::{ArrayError, Result};
use bitflags::bitflags;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Byte order stored in a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    Little,
    Big,
    /// Order is irrelevant (single bytes, strings, records)
    Ignore,
}

impl ByteOrder {
    #[cfg(target_endian = "little")]
    pub const NATIVE: ByteOrder = ByteOrder::Little;
    #[cfg(target_endian = "big")]
    pub const NATIVE: ByteOrder = ByteOrder::Big;

    pub fn is_native(self) -> bool {
        self == ByteOrder::Ignore || self == Self::NATIVE
    }

    pub fn swapped(self) -> Self {
        match self {
            ByteOrder::Little => ByteOrder::Big,
            ByteOrder::Big => ByteOrder::Little,
            ByteOrder::Ignore => ByteOrder::Ignore,
        }
    }

    pub(crate) fn is_little(self) -> bool {
        match self {
            ByteOrder::Little => true,
            ByteOrder::Big => false,
            ByteOrder::Ignore => Self::NATIVE == ByteOrder::Little,
        }
    }

    /// Character used in type strings and on the wire
    pub fn as_char(self) -> char {
        match self {
            ByteOrder::Little => '<',
            ByteOrder::Big => '>',
            ByteOrder::Ignore => '|',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(ByteOrder::Little),
            '>' => Some(ByteOrder::Big),
            '|' => Some(ByteOrder::Ignore),
            '=' => Some(Self::NATIVE),
            _ => None,
        }
    }
}

/// Requested byte order for [`Descr::new_with_byte_order`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Little,
    Big,
    Native,
    /// Flip whatever order each component currently has
    Swap,
    /// Leave the byte order as it is
    Ignore,
}

bitflags! {
    /// Capability flags of a descriptor
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DescrFlags: u8 {
        /// Elements hold counted references that must be released
        const ITEM_REFCOUNT = 0x01;
        /// State capture must use a list of boxed items
        const LIST_PICKLE = 0x02;
        const ITEM_IS_POINTER = 0x04;
        /// Storage must be zeroed before first use
        const NEEDS_INIT = 0x08;
        const NEEDS_API = 0x10;
        const USE_GETITEM = 0x20;
        const USE_SETITEM = 0x40;

        /// Flags a structured descriptor inherits from its fields
        const FROM_FIELDS = Self::NEEDS_INIT.bits()
            | Self::LIST_PICKLE.bits()
            | Self::ITEM_REFCOUNT.bits()
            | Self::NEEDS_API.bits();

        const OBJECT = Self::LIST_PICKLE.bits()
            | Self::USE_GETITEM.bits()
            | Self::ITEM_IS_POINTER.bits()
            | Self::ITEM_REFCOUNT.bits()
            | Self::NEEDS_INIT.bits()
            | Self::NEEDS_API.bits();
    }
}

/// Element type descriptor
#[derive(Debug, Clone)]
pub struct Descr {
    tag: TypeTag,
    itemsize: usize,
    alignment: usize,
    byteorder: ByteOrder,
    flags: DescrFlags,
    fields: Option<Arc<Fields>>,
}

impl Descr {
    pub(crate) fn new_builtin(tag: TypeTag) -> Self {
        let byteorder = if tag.has_byte_order() {
            ByteOrder::NATIVE
        } else {
            ByteOrder::Ignore
        };
        let flags = if tag == TypeTag::Object {
            DescrFlags::OBJECT
        } else {
            DescrFlags::empty()
        };
        Self {
            tag,
            itemsize: tag.element_size().unwrap_or(0),
            alignment: tag.alignment(),
            byteorder,
            flags,
            fields: None,
        }
    }

    pub(crate) fn new_record(fields: Fields, itemsize: usize, alignment: usize) -> Self {
        let flags = fields
            .iter()
            .fold(DescrFlags::empty(), |acc, f| acc | f.descr().flags())
            & DescrFlags::FROM_FIELDS;
        Self {
            tag: TypeTag::Void,
            itemsize,
            alignment,
            byteorder: ByteOrder::Ignore,
            flags,
            fields: Some(Arc::new(fields)),
        }
    }

    /// Canonical native-order descriptor for `tag`
    ///
    /// Flexible tags come back unsized (item size zero); use [`Descr::bytes`]
    /// or [`Descr::void`] to give them a width.
    pub fn builtin(tag: TypeTag) -> Arc<Descr> {
        registry::lookup(tag)
    }

    /// Fixed-width byte string of `size` bytes
    pub fn bytes(size: usize) -> Arc<Descr> {
        Arc::new(Self {
            itemsize: size,
            ..Self::new_builtin(TypeTag::Bytes)
        })
    }

    /// Unstructured raw record of `size` bytes
    pub fn void(size: usize) -> Arc<Descr> {
        Arc::new(Self {
            itemsize: size,
            ..Self::new_builtin(TypeTag::Void)
        })
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn kind(&self) -> TypeKind {
        self.tag.kind()
    }

    pub fn itemsize(&self) -> usize {
        self.itemsize
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn byteorder(&self) -> ByteOrder {
        self.byteorder
    }

    pub fn flags(&self) -> DescrFlags {
        self.flags
    }

    pub fn fields(&self) -> Option<&Fields> {
        self.fields.as_deref()
    }

    pub(crate) fn fields_arc(&self) -> Option<&Arc<Fields>> {
        self.fields.as_ref()
    }

    pub fn has_fields(&self) -> bool {
        self.fields.is_some()
    }

    /// Look up a field by name or title
    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.as_ref().and_then(|f| f.get(key))
    }

    pub fn needs_init(&self) -> bool {
        self.flags
            .intersects(DescrFlags::NEEDS_INIT | DescrFlags::ITEM_REFCOUNT)
    }

    pub fn is_refcounted(&self) -> bool {
        self.flags.contains(DescrFlags::ITEM_REFCOUNT)
    }

    pub fn uses_list_pickle(&self) -> bool {
        self.flags.contains(DescrFlags::LIST_PICKLE)
    }

    /// Flexible or structured, i.e. not fully described by its tag
    pub fn is_extended(&self) -> bool {
        self.tag.is_flexible() || self.fields.is_some()
    }

    /// Whether reading elements needs no byte swapping, recursing into fields
    pub fn is_native(&self) -> bool {
        match &self.fields {
            Some(fields) => fields.iter().all(|f| f.descr().is_native()),
            None => !self.tag.has_byte_order() || self.byteorder.is_native(),
        }
    }

    /// Byte-compatible layout check
    ///
    /// The byte-order flag only counts for tags whose representation depends
    /// on it.
    pub fn equivalent(&self, other: &Descr) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.tag != other.tag || self.itemsize != other.itemsize {
            return false;
        }
        if self.tag.has_byte_order() && self.byteorder.is_little() != other.byteorder.is_little()
        {
            return false;
        }
        match (&self.fields, &other.fields) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                Arc::ptr_eq(a, b)
                    || (a.len() == b.len()
                        && a.iter().zip(b.iter()).all(|(x, y)| {
                            x.name() == y.name()
                                && x.title() == y.title()
                                && x.offset() == y.offset()
                                && x.descr().equivalent(y.descr())
                        }))
            }
            _ => false,
        }
    }

    /// Copy of this descriptor with a different byte order
    ///
    /// Structured descriptors keep their own `Ignore` order and pass the
    /// request down to every field. When nothing changes the same descriptor
    /// is returned, and an unchanged field table is shared rather than copied.
    pub fn new_with_byte_order(self: &Arc<Self>, endian: Endian) -> Arc<Descr> {
        let byteorder = if self.byteorder == ByteOrder::Ignore {
            ByteOrder::Ignore
        } else {
            match endian {
                Endian::Little => ByteOrder::Little,
                Endian::Big => ByteOrder::Big,
                Endian::Native => ByteOrder::NATIVE,
                Endian::Swap => self.byteorder.swapped(),
                Endian::Ignore => self.byteorder,
            }
        };

        let fields = match &self.fields {
            Some(fields) => {
                let mut changed = false;
                let entries: Vec<Field> = fields
                    .iter()
                    .map(|f| {
                        let descr = f.descr().new_with_byte_order(endian);
                        changed |= !Arc::ptr_eq(&descr, f.descr());
                        f.with_descr(descr)
                    })
                    .collect();
                if changed {
                    Some(Arc::new(Fields::from_entries(entries)))
                } else {
                    Some(Arc::clone(fields))
                }
            }
            None => None,
        };

        let fields_shared = match (&fields, &self.fields) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => true,
        };
        if byteorder == self.byteorder && fields_shared {
            return Arc::clone(self);
        }
        Arc::new(Self {
            byteorder,
            fields,
            ..(**self).clone()
        })
    }

    /// Copy of a structured descriptor with its fields renamed, offsets preserved
    pub fn replace_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Arc<Descr>> {
        let fields = self
            .fields
            .as_ref()
            .ok_or_else(|| ArrayError::value("there are no fields defined"))?;
        if names.len() != fields.len() {
            return Err(ArrayError::LengthMismatch {
                what: "field names",
                expected: fields.len(),
                actual: names.len(),
            });
        }
        let mut seen: HashSet<&str> = fields.iter().filter_map(|f| f.title()).collect();
        for name in names {
            if !seen.insert(name.as_ref()) {
                return Err(ArrayError::value(format!(
                    "duplicate field name {:?}",
                    name.as_ref()
                )));
            }
        }
        let entries = fields
            .iter()
            .zip(names)
            .map(|(f, name)| f.with_name(name.as_ref()))
            .collect();
        Ok(Arc::new(Self {
            fields: Some(Arc::new(Fields::from_entries(entries))),
            ..self.clone()
        }))
    }

    /// Same descriptor with a different item size; used for flexible tags
    pub(crate) fn resized(&self, itemsize: usize) -> Arc<Descr> {
        Arc::new(Self {
            itemsize,
            ..self.clone()
        })
    }
}

impl fmt::Display for Descr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fields {
            Some(fields) => {
                write!(f, "[")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "('{}', '{}')", field.name(), field.descr())?;
                }
                write!(f, "]")
            }
            None if self.tag == TypeTag::Object => write!(f, "|O"),
            None => write!(
                f,
                "{}{}{}",
                self.byteorder.as_char(),
                self.tag.kind_char(),
                self.itemsize
            ),
        }
    }
}
