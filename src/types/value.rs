//! Boxed element values
//!
//! An [`Item`] is what a single array element looks like outside the array:
//! the result of reading one element, the input for writing one, and the
//! entries of a list-style state payload.

use crate::error::{ArrayError, Result};
use num_complex::Complex64;
use std::fmt;
use std::sync::Arc;

/// Item wire tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ItemTag {
    None = 0x00,
    Bool = 0x01,
    Int = 0x02,
    UInt = 0x03,
    Float = 0x04,
    Complex = 0x05,
    Bytes = 0x06,
    Object = 0x07,
    Record = 0x08,
    List = 0x09,
}

impl ItemTag {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0x00 => Some(ItemTag::None),
            0x01 => Some(ItemTag::Bool),
            0x02 => Some(ItemTag::Int),
            0x03 => Some(ItemTag::UInt),
            0x04 => Some(ItemTag::Float),
            0x05 => Some(ItemTag::Complex),
            0x06 => Some(ItemTag::Bytes),
            0x07 => Some(ItemTag::Object),
            0x08 => Some(ItemTag::Record),
            0x09 => Some(ItemTag::List),
            _ => None,
        }
    }
}

/// Shared handle to a value stored in an object element
///
/// Cloning the handle is the reference-count increment; dropping it is the
/// decrement. Equality compares the referenced values, use
/// [`ObjectRef::ptr_eq`] for identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<Item>);

impl ObjectRef {
    pub fn new(item: Item) -> Self {
        Self(Arc::new(item))
    }

    pub fn get(&self) -> &Item {
        &self.0
    }

    /// Number of live handles to the referenced value
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectRef").field(&*self.0).finish()
    }
}

/// One array element as a standalone value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Item {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex(Complex64),
    Bytes(Vec<u8>),
    Object(ObjectRef),
    /// One value per field of a structured element, in field order
    Record(Vec<Item>),
    /// Nested sequence, as produced by [`crate::Array::to_list`]
    List(Vec<Item>),
}

impl Item {
    pub fn tag(&self) -> ItemTag {
        match self {
            Item::None => ItemTag::None,
            Item::Bool(_) => ItemTag::Bool,
            Item::Int(_) => ItemTag::Int,
            Item::UInt(_) => ItemTag::UInt,
            Item::Float(_) => ItemTag::Float,
            Item::Complex(_) => ItemTag::Complex,
            Item::Bytes(_) => ItemTag::Bytes,
            Item::Object(_) => ItemTag::Object,
            Item::Record(_) => ItemTag::Record,
            Item::List(_) => ItemTag::List,
        }
    }

    /// Short name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Item::None => "none",
            Item::Bool(_) => "bool",
            Item::Int(_) => "int",
            Item::UInt(_) => "uint",
            Item::Float(_) => "float",
            Item::Complex(_) => "complex",
            Item::Bytes(_) => "bytes",
            Item::Object(_) => "object",
            Item::Record(_) => "record",
            Item::List(_) => "list",
        }
    }

    /// Whether this is a single value rather than a sequence
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Item::List(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Item::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Item::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Item::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Item::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Item]> {
        match self {
            Item::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&[Item]> {
        match self {
            Item::Record(items) => Some(items),
            _ => None,
        }
    }

    /// Value as a signed integer, truncating floats and wrapping wide unsigned values
    pub fn to_i64(&self) -> Result<i64> {
        match self {
            Item::Bool(b) => Ok(*b as i64),
            Item::Int(v) => Ok(*v),
            Item::UInt(v) => Ok(*v as i64),
            Item::Float(v) => Ok(*v as i64),
            Item::Complex(c) => Ok(c.re as i64),
            Item::Bytes(b) => parse_number(b).map(|n| n.to_i64()),
            Item::Object(r) => r.get().to_i64(),
            other => Err(not_a_number(other)),
        }
    }

    /// Value as an unsigned integer, wrapping negative values
    pub fn to_u64(&self) -> Result<u64> {
        match self {
            Item::Bool(b) => Ok(*b as u64),
            Item::Int(v) => Ok(*v as u64),
            Item::UInt(v) => Ok(*v),
            Item::Float(v) => Ok(float_to_u64(*v)),
            Item::Complex(c) => Ok(float_to_u64(c.re)),
            Item::Bytes(b) => parse_number(b).map(|n| n.to_u64()),
            Item::Object(r) => r.get().to_u64(),
            other => Err(not_a_number(other)),
        }
    }

    /// Value as a float, dropping any imaginary part
    pub fn to_f64(&self) -> Result<f64> {
        match self {
            Item::Bool(b) => Ok(*b as u8 as f64),
            Item::Int(v) => Ok(*v as f64),
            Item::UInt(v) => Ok(*v as f64),
            Item::Float(v) => Ok(*v),
            Item::Complex(c) => Ok(c.re),
            Item::Bytes(b) => parse_number(b).map(|n| n.to_f64()),
            Item::Object(r) => r.get().to_f64(),
            other => Err(not_a_number(other)),
        }
    }

    pub fn to_complex(&self) -> Result<Complex64> {
        match self {
            Item::Complex(c) => Ok(*c),
            Item::Object(r) => r.get().to_complex(),
            other => other.to_f64().map(|re| Complex64::new(re, 0.0)),
        }
    }

    /// Truth value used when storing into a boolean element
    pub fn truthy(&self) -> Result<bool> {
        match self {
            Item::None => Ok(false),
            Item::Bool(b) => Ok(*b),
            Item::Int(v) => Ok(*v != 0),
            Item::UInt(v) => Ok(*v != 0),
            Item::Float(v) => Ok(*v != 0.0),
            Item::Complex(c) => Ok(c.re != 0.0 || c.im != 0.0),
            Item::Bytes(b) => Ok(b.iter().any(|&byte| byte != 0)),
            Item::Object(r) => r.get().truthy(),
            Item::Record(items) | Item::List(items) => Ok(!items.is_empty()),
        }
    }

    /// Text rendering used when storing into a byte-string element
    pub fn render(&self) -> Vec<u8> {
        match self {
            Item::None => b"None".to_vec(),
            Item::Bool(true) => b"True".to_vec(),
            Item::Bool(false) => b"False".to_vec(),
            Item::Int(v) => v.to_string().into_bytes(),
            Item::UInt(v) => v.to_string().into_bytes(),
            Item::Float(v) => format!("{v:?}").into_bytes(),
            Item::Complex(c) => format!("({:?}{:+?}j)", c.re, c.im).into_bytes(),
            Item::Bytes(b) => b.clone(),
            Item::Object(r) => r.get().render(),
            Item::Record(items) | Item::List(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|i| String::from_utf8_lossy(&i.render()).into_owned())
                    .collect();
                format!("({})", parts.join(", ")).into_bytes()
            }
        }
    }
}

fn not_a_number(item: &Item) -> ArrayError {
    ArrayError::wrong_kind(format!("cannot convert {} to a number", item.type_name()))
}

fn float_to_u64(v: f64) -> u64 {
    if v < 0.0 { v as i64 as u64 } else { v as u64 }
}

enum Parsed {
    Int(i64),
    Float(f64),
}

impl Parsed {
    fn to_i64(&self) -> i64 {
        match self {
            Parsed::Int(v) => *v,
            Parsed::Float(v) => *v as i64,
        }
    }

    fn to_u64(&self) -> u64 {
        match self {
            Parsed::Int(v) => *v as u64,
            Parsed::Float(v) => float_to_u64(*v),
        }
    }

    fn to_f64(&self) -> f64 {
        match self {
            Parsed::Int(v) => *v as f64,
            Parsed::Float(v) => *v,
        }
    }
}

fn parse_number(bytes: &[u8]) -> Result<Parsed> {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    let text = std::str::from_utf8(&bytes[..end])
        .map_err(|_| ArrayError::value("byte string is not valid UTF-8"))?
        .trim();
    if let Ok(v) = text.parse::<i64>() {
        return Ok(Parsed::Int(v));
    }
    text.parse::<f64>()
        .map(Parsed::Float)
        .map_err(|_| ArrayError::value(format!("invalid literal for a number: {text:?}")))
}

impl From<bool> for Item {
    fn from(v: bool) -> Self {
        Item::Bool(v)
    }
}

impl From<i64> for Item {
    fn from(v: i64) -> Self {
        Item::Int(v)
    }
}

impl From<i32> for Item {
    fn from(v: i32) -> Self {
        Item::Int(v as i64)
    }
}

impl From<u64> for Item {
    fn from(v: u64) -> Self {
        Item::UInt(v)
    }
}

impl From<f64> for Item {
    fn from(v: f64) -> Self {
        Item::Float(v)
    }
}

impl From<f32> for Item {
    fn from(v: f32) -> Self {
        Item::Float(v as f64)
    }
}

impl From<Complex64> for Item {
    fn from(v: Complex64) -> Self {
        Item::Complex(v)
    }
}

impl From<Vec<u8>> for Item {
    fn from(v: Vec<u8>) -> Self {
        Item::Bytes(v)
    }
}

impl From<&[u8]> for Item {
    fn from(v: &[u8]) -> Self {
        Item::Bytes(v.to_vec())
    }
}

impl From<ObjectRef> for Item {
    fn from(v: ObjectRef) -> Self {
        Item::Object(v)
    }
}

impl From<Vec<Item>> for Item {
    fn from(v: Vec<Item>) -> Self {
        Item::List(v)
    }
}

/// Deep-copy facility applied to reference-bearing element values
pub trait DeepCopy {
    fn deep_copy(&self, item: &Item) -> Result<Item>;
}

/// Default deep copy: every object handle is replaced by a handle to a fresh clone
#[derive(Debug, Clone, Copy, Default)]
pub struct CloneDeep;

impl DeepCopy for CloneDeep {
    fn deep_copy(&self, item: &Item) -> Result<Item> {
        Ok(clone_deep(item))
    }
}

fn clone_deep(item: &Item) -> Item {
    match item {
        Item::Object(r) => Item::Object(ObjectRef::new(clone_deep(r.get()))),
        Item::Record(items) => Item::Record(items.iter().map(clone_deep).collect()),
        Item::List(items) => Item::List(items.iter().map(clone_deep).collect()),
        other => other.clone(),
    }
}
