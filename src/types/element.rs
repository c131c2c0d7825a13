//! Per-element read, write and byte-swap operations

use super::descr::Descr;
use super::dtype::TypeTag;
use super::value::{Item, ObjectRef};
use crate::error::{ArrayError, Result};
use crate::storage::{RawBuffer, Storage};
use half::f16;
use num_complex::Complex64;

fn element(bytes: &[u8], offset: usize, size: usize) -> Result<&[u8]> {
    offset
        .checked_add(size)
        .and_then(|end| bytes.get(offset..end))
        .ok_or(ArrayError::InvalidStrides {
            buffer_len: bytes.len(),
        })
}

fn element_mut(bytes: &mut [u8], offset: usize, size: usize) -> Result<&mut [u8]> {
    let buffer_len = bytes.len();
    offset
        .checked_add(size)
        .and_then(|end| bytes.get_mut(offset..end))
        .ok_or(ArrayError::InvalidStrides { buffer_len })
}

fn fixed<const N: usize>(raw: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&raw[..N]);
    out
}

macro_rules! decode {
    ($ty:ty, $raw:expr, $little:expr) => {{
        let bytes = fixed::<{ std::mem::size_of::<$ty>() }>($raw);
        if $little {
            <$ty>::from_le_bytes(bytes)
        } else {
            <$ty>::from_be_bytes(bytes)
        }
    }};
}

macro_rules! encode {
    ($value:expr, $little:expr) => {{
        let value = $value;
        if $little {
            value.to_le_bytes().to_vec()
        } else {
            value.to_be_bytes().to_vec()
        }
    }};
}

/// Read the element of type `descr` stored at byte `offset`
pub(crate) fn get_item(descr: &Descr, storage: &Storage, offset: usize) -> Result<Item> {
    if let Some(fields) = descr.fields() {
        let items = fields
            .iter()
            .map(|f| get_item(f.descr(), storage, offset + f.offset()))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Item::Record(items));
    }
    if descr.tag() == TypeTag::Object {
        return Ok(storage
            .object(offset)
            .map(|r| Item::Object(r.clone()))
            .unwrap_or(Item::None));
    }

    let raw = element(storage.bytes(), offset, descr.itemsize())?;
    let little = descr.byteorder().is_little();
    let item = match descr.tag() {
        TypeTag::Bool => Item::Bool(raw[0] != 0),
        TypeTag::Int8 => Item::Int(raw[0] as i8 as i64),
        TypeTag::UInt8 => Item::UInt(raw[0] as u64),
        TypeTag::Int16 => Item::Int(decode!(i16, raw, little) as i64),
        TypeTag::UInt16 => Item::UInt(decode!(u16, raw, little) as u64),
        TypeTag::Int32 => Item::Int(decode!(i32, raw, little) as i64),
        TypeTag::UInt32 => Item::UInt(decode!(u32, raw, little) as u64),
        TypeTag::Int64 => Item::Int(decode!(i64, raw, little)),
        TypeTag::UInt64 => Item::UInt(decode!(u64, raw, little)),
        TypeTag::Float16 => Item::Float(decode!(f16, raw, little).to_f64()),
        TypeTag::Float32 => Item::Float(decode!(f32, raw, little) as f64),
        TypeTag::Float64 => Item::Float(decode!(f64, raw, little)),
        TypeTag::Complex64 => Item::Complex(Complex64::new(
            decode!(f32, &raw[..4], little) as f64,
            decode!(f32, &raw[4..], little) as f64,
        )),
        TypeTag::Complex128 => Item::Complex(Complex64::new(
            decode!(f64, &raw[..8], little),
            decode!(f64, &raw[8..], little),
        )),
        TypeTag::Bytes => {
            let end = raw.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
            Item::Bytes(raw[..end].to_vec())
        }
        TypeTag::Void => Item::Bytes(raw.to_vec()),
        TypeTag::Object => Item::None,
    };
    Ok(item)
}

/// Write `item` into the element of type `descr` at byte `offset`
pub(crate) fn set_item(descr: &Descr, raw: &mut RawBuffer, offset: usize, item: &Item) -> Result<()> {
    if let Some(fields) = descr.fields() {
        let items = match item {
            Item::Record(items) | Item::List(items) => items,
            Item::Object(r) => return set_item(descr, raw, offset, r.get()),
            other => {
                return Err(ArrayError::ItemMismatch {
                    value: other.type_name(),
                    tag: descr.tag(),
                });
            }
        };
        if items.len() != fields.len() {
            return Err(ArrayError::LengthMismatch {
                what: "record fields",
                expected: fields.len(),
                actual: items.len(),
            });
        }
        for (field, item) in fields.iter().zip(items) {
            set_item(field.descr(), raw, offset + field.offset(), item)?;
        }
        return Ok(());
    }

    if descr.tag() == TypeTag::Object {
        element(raw.as_bytes(), offset, descr.itemsize())?;
        let slot = match item {
            Item::None => None,
            Item::Object(r) => Some(r.clone()),
            other => Some(ObjectRef::new(other.clone())),
        };
        raw.set_object(offset, slot);
        return Ok(());
    }

    let little = descr.byteorder().is_little();
    let encoded: Vec<u8> = match descr.tag() {
        TypeTag::Bool => vec![item.truthy()? as u8],
        TypeTag::Int8 => vec![item.to_i64()? as i8 as u8],
        TypeTag::UInt8 => vec![item.to_u64()? as u8],
        TypeTag::Int16 => encode!(item.to_i64()? as i16, little),
        TypeTag::UInt16 => encode!(item.to_u64()? as u16, little),
        TypeTag::Int32 => encode!(item.to_i64()? as i32, little),
        TypeTag::UInt32 => encode!(item.to_u64()? as u32, little),
        TypeTag::Int64 => encode!(item.to_i64()?, little),
        TypeTag::UInt64 => encode!(item.to_u64()?, little),
        TypeTag::Float16 => encode!(f16::from_f64(item.to_f64()?), little),
        TypeTag::Float32 => encode!(item.to_f64()? as f32, little),
        TypeTag::Float64 => encode!(item.to_f64()?, little),
        TypeTag::Complex64 => {
            let c = item.to_complex()?;
            let mut out = encode!(c.re as f32, little);
            out.extend(encode!(c.im as f32, little));
            out
        }
        TypeTag::Complex128 => {
            let c = item.to_complex()?;
            let mut out = encode!(c.re, little);
            out.extend(encode!(c.im, little));
            out
        }
        TypeTag::Bytes => match item {
            Item::Bytes(b) => b.clone(),
            other => other.render(),
        },
        TypeTag::Void => match item {
            Item::Bytes(b) => b.clone(),
            Item::Object(r) => return set_item(descr, raw, offset, r.get()),
            other => {
                return Err(ArrayError::ItemMismatch {
                    value: other.type_name(),
                    tag: TypeTag::Void,
                });
            }
        },
        TypeTag::Object => Vec::new(),
    };

    let dst = element_mut(raw.as_bytes_mut(), offset, descr.itemsize())?;
    let n = encoded.len().min(dst.len());
    dst[..n].copy_from_slice(&encoded[..n]);
    dst[n..].fill(0);
    Ok(())
}

/// Reverse the byte order of one element in place, recursing into fields
pub(crate) fn swap_element(descr: &Descr, bytes: &mut [u8]) {
    if let Some(fields) = descr.fields() {
        for field in fields {
            let end = field.offset() + field.descr().itemsize();
            if let Some(sub) = bytes.get_mut(field.offset()..end) {
                swap_element(field.descr(), sub);
            }
        }
        return;
    }
    match descr.tag() {
        TypeTag::Complex64 | TypeTag::Complex128 => {
            let half = bytes.len() / 2;
            let (re, im) = bytes.split_at_mut(half);
            re.reverse();
            im.reverse();
        }
        tag if tag.has_byte_order() => bytes.reverse(),
        _ => {}
    }
}

/// Copy one element from `src` into `dst`, swapping its byte order when asked
pub(crate) fn copy_swap(descr: &Descr, dst: &mut [u8], src: &[u8], swap: bool) {
    dst.copy_from_slice(src);
    if swap {
        swap_element(descr, dst);
    }
}
