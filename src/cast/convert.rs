//! Buffered element-wise conversion between arrays

use crate::array::Array;
use crate::config::Config;
use crate::error::{ArrayError, Result};
use crate::layout::{OffsetIter, Order, broadcast_strides};
use crate::types::element::{get_item, set_item};
use crate::types::{Descr, Item, ObjectRef, TypeTag};
use tracing::{debug, trace};

/// Whether any conversion (safe or not) exists from `from` to `to`
///
/// Structured descriptors only convert to structures with the same number of
/// fields, or through `Object`. Raw records only convert to raw records and
/// byte strings.
pub fn has_cast_path(from: &Descr, to: &Descr) -> bool {
    if from.equivalent(to) || from.tag() == TypeTag::Object || to.tag() == TypeTag::Object {
        return true;
    }
    match (from.fields(), to.fields()) {
        (Some(a), Some(b)) => a.len() == b.len(),
        (Some(_), None) | (None, Some(_)) => false,
        (None, None) => match (from.tag(), to.tag()) {
            (TypeTag::Void, TypeTag::Void | TypeTag::Bytes) => true,
            (TypeTag::Bytes, TypeTag::Void) => true,
            (TypeTag::Void, _) | (_, TypeTag::Void) => false,
            _ => true,
        },
    }
}

/// Cast `src` into `dst`, broadcasting `src` to the shape of `dst`
pub fn cast_to(dst: &Array, src: &Array) -> Result<()> {
    cast_to_with_config(dst, src, &Config::default())
}

pub fn cast_to_with_config(dst: &Array, src: &Array, config: &Config) -> Result<()> {
    dst.ensure_writeable()?;
    let strides = broadcast_strides(src.shape(), src.strides(), dst.shape())?;
    let src_offsets = OffsetIter::new(src.byte_offset(), dst.shape(), &strides, Order::C);
    let dst_offsets = OffsetIter::new(dst.byte_offset(), dst.shape(), dst.strides(), Order::C);
    transfer(dst, dst_offsets, src, src_offsets, config)
}

/// Cast `src` into `dst` element by element in C order; shapes may differ but sizes must match
pub fn cast_any_to(dst: &Array, src: &Array) -> Result<()> {
    cast_any_to_with_config(dst, src, &Config::default())
}

pub fn cast_any_to_with_config(dst: &Array, src: &Array, config: &Config) -> Result<()> {
    dst.ensure_writeable()?;
    flat_transfer(dst, src, config)
}

/// Element-wise write-back into an array whose `WRITEABLE` flag is held
/// cleared while a stand-in copy is alive
pub(crate) fn write_back(dst: &Array, src: &Array) -> Result<()> {
    flat_transfer(dst, src, &Config::default())
}

fn flat_transfer(dst: &Array, src: &Array, config: &Config) -> Result<()> {
    if dst.size() != src.size() {
        return Err(ArrayError::LengthMismatch {
            what: "elements",
            expected: dst.size(),
            actual: src.size(),
        });
    }
    let src_offsets = OffsetIter::new(src.byte_offset(), src.shape(), src.strides(), Order::C);
    let dst_offsets = OffsetIter::new(dst.byte_offset(), dst.shape(), dst.strides(), Order::C);
    transfer(dst, dst_offsets, src, src_offsets, config)
}

fn transfer(
    dst: &Array,
    dst_offsets: OffsetIter,
    src: &Array,
    src_offsets: OffsetIter,
    config: &Config,
) -> Result<()> {
    if !has_cast_path(src.descr(), dst.descr()) {
        return Err(ArrayError::NoCastPath {
            from: src.descr().to_string(),
            to: dst.descr().to_string(),
        });
    }
    let chunk = config.buffer_size.max(1);
    debug!(
        from = %src.descr(),
        to = %dst.descr(),
        elements = dst_offsets.len(),
        chunk,
        "casting array"
    );
    if src.descr().equivalent(dst.descr()) {
        copy_raw(dst, dst_offsets, src, src_offsets, chunk)
    } else {
        copy_items(dst, dst_offsets, src, src_offsets, chunk)
    }
}

/// Same layout on both sides: move bytes, and object slots with them
fn copy_raw(
    dst: &Array,
    mut dst_offsets: OffsetIter,
    src: &Array,
    mut src_offsets: OffsetIter,
    chunk: usize,
) -> Result<()> {
    let itemsize = dst.itemsize();
    let refcounted = dst.descr().is_refcounted();
    let bytes = chunk
        .checked_mul(itemsize)
        .ok_or(ArrayError::Memory { bytes: usize::MAX })?;
    let mut scratch: Vec<u8> = Vec::new();
    scratch
        .try_reserve_exact(bytes)
        .map_err(|_| ArrayError::Memory { bytes })?;
    let mut slots: Vec<(usize, ObjectRef)> = Vec::new();

    loop {
        scratch.clear();
        slots.clear();
        {
            let storage = src.buffer().read();
            for (i, offset) in src_offsets.by_ref().take(chunk).enumerate() {
                let element = storage.bytes().get(offset..offset + itemsize).ok_or(
                    ArrayError::InvalidStrides {
                        buffer_len: storage.bytes().len(),
                    },
                )?;
                scratch.extend_from_slice(element);
                if refcounted {
                    slots.extend(
                        storage
                            .objects_in(offset..offset + itemsize)
                            .into_iter()
                            .map(|(at, obj)| (at - offset + i * itemsize, obj)),
                    );
                }
            }
        }
        if scratch.is_empty() {
            return Ok(());
        }
        let n = scratch.len() / itemsize;
        trace!(elements = n, "raw copy chunk");

        let targets: Vec<usize> = dst_offsets.by_ref().take(n).collect();
        let mut storage = dst.buffer().write();
        let raw = storage.owned_mut()?;
        let buffer_len = raw.as_bytes().len();
        for (i, &offset) in targets.iter().enumerate() {
            raw.as_bytes_mut()
                .get_mut(offset..offset + itemsize)
                .ok_or(ArrayError::InvalidStrides { buffer_len })?
                .copy_from_slice(&scratch[i * itemsize..(i + 1) * itemsize]);
            if refcounted {
                raw.clear_objects(offset..offset + itemsize);
            }
        }
        for (relative, obj) in slots.drain(..) {
            let target = targets[relative / itemsize] + relative % itemsize;
            raw.set_object(target, Some(obj));
        }
    }
}

/// Different layouts: read boxed items, convert on write
fn copy_items(
    dst: &Array,
    mut dst_offsets: OffsetIter,
    src: &Array,
    mut src_offsets: OffsetIter,
    chunk: usize,
) -> Result<()> {
    let mut scratch: Vec<Item> = Vec::new();
    scratch
        .try_reserve_exact(chunk)
        .map_err(|_| ArrayError::Memory {
            bytes: chunk.saturating_mul(std::mem::size_of::<Item>()),
        })?;

    loop {
        scratch.clear();
        {
            let storage = src.buffer().read();
            for offset in src_offsets.by_ref().take(chunk) {
                scratch.push(get_item(src.descr(), &storage, offset)?);
            }
        }
        if scratch.is_empty() {
            return Ok(());
        }
        trace!(elements = scratch.len(), "converting chunk");

        let mut storage = dst.buffer().write();
        let raw = storage.owned_mut()?;
        for (item, offset) in scratch.iter().zip(dst_offsets.by_ref()) {
            set_item(dst.descr(), raw, offset, item)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::RecordBuilder;
    use std::sync::Arc;

    #[test]
    fn zeros_cast_to_float() {
        let ints = Array::new(Descr::builtin(TypeTag::Int32), &[4, 5], Order::C).unwrap();
        let floats = Array::new(Descr::builtin(TypeTag::Float64), &[4, 5], Order::C).unwrap();
        cast_to(&floats, &ints).unwrap();
        assert!(floats.to_vec::<f64>().unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn small_chunks_cover_everything() {
        let src = Array::from_slice(&[7], &[1i16, 2, 3, 4, 5, 6, 7]).unwrap();
        let dst = Array::new(Descr::builtin(TypeTag::Float32), &[7], Order::C).unwrap();
        let config = Config::default().with_buffer_size(3);
        cast_to_with_config(&dst, &src, &config).unwrap();
        assert_eq!(
            dst.to_vec::<f32>().unwrap(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]
        );

        let same = Array::new(Descr::builtin(TypeTag::Int16), &[7], Order::C).unwrap();
        cast_to_with_config(&same, &src, &config).unwrap();
        assert_eq!(same.to_vec::<i16>().unwrap(), src.to_vec::<i16>().unwrap());
    }

    #[test]
    fn broadcasting_rows() {
        let row = Array::from_slice(&[3], &[1u8, 2, 3]).unwrap();
        let grid = Array::new(Descr::builtin(TypeTag::Int64), &[2, 3], Order::Fortran).unwrap();
        cast_to(&grid, &row).unwrap();
        assert_eq!(grid.to_vec::<i64>().unwrap(), vec![1, 2, 3, 1, 2, 3]);

        let wrong = Array::new(Descr::builtin(TypeTag::Int64), &[2, 4], Order::C).unwrap();
        assert!(matches!(cast_to(&wrong, &row), Err(ArrayError::Broadcast { .. })));
    }

    #[test]
    fn any_cast_needs_equal_sizes() {
        let src = Array::from_slice(&[2, 3], &[0u32, 1, 2, 3, 4, 5]).unwrap();
        let dst = Array::new(Descr::builtin(TypeTag::UInt32), &[6], Order::C).unwrap();
        cast_any_to(&dst, &src).unwrap();
        assert_eq!(dst.to_vec::<u32>().unwrap(), vec![0, 1, 2, 3, 4, 5]);

        let short = Array::new(Descr::builtin(TypeTag::UInt32), &[5], Order::C).unwrap();
        assert!(cast_any_to(&short, &src).is_err());
    }

    #[test]
    fn object_cast_shares_references() {
        let shared = ObjectRef::new(Item::Bytes(b"payload".to_vec()));
        let src = Array::new(Descr::builtin(TypeTag::Object), &[2], Order::C).unwrap();
        src.item_set(&[0], &Item::Object(shared.clone())).unwrap();
        let dst = Array::new(Descr::builtin(TypeTag::Object), &[2], Order::C).unwrap();
        cast_to(&dst, &src).unwrap();
        assert_eq!(shared.ref_count(), 3);
        match dst.item(&[0]).unwrap() {
            Item::Object(r) => assert!(r.ptr_eq(&shared)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(dst.item(&[1]).unwrap(), Item::None);
    }

    #[test]
    fn numbers_to_objects_and_back() {
        let src = Array::from_slice(&[3], &[1.5f64, -2.0, 0.0]).unwrap();
        let objects = src.astype(Descr::builtin(TypeTag::Object), Order::C).unwrap();
        let back = objects.astype(Descr::builtin(TypeTag::Float32), Order::C).unwrap();
        assert_eq!(back.to_vec::<f32>().unwrap(), vec![1.5, -2.0, 0.0]);
    }

    #[test]
    fn missing_cast_path_is_a_type_error() {
        let record = RecordBuilder::new()
            .field("a", Descr::builtin(TypeTag::Int32))
            .build()
            .unwrap();
        let src = Array::new(Arc::clone(&record), &[2], Order::C).unwrap();
        let dst = Array::new(Descr::builtin(TypeTag::Float64), &[2], Order::C).unwrap();
        let err = cast_to(&dst, &src).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert!(!has_cast_path(&Descr::void(4), &Descr::builtin(TypeTag::Int32)));
        assert!(has_cast_path(&Descr::void(4), &Descr::bytes(4)));
    }

    #[test]
    fn read_only_destination() {
        let src = Array::from_slice(&[2], &[1u8, 2]).unwrap();
        let dst = Array::from_bytes(
            Descr::builtin(TypeTag::UInt8),
            &[2],
            None,
            bytes::Bytes::from_static(&[0, 0]),
        )
        .unwrap();
        assert!(matches!(cast_to(&dst, &src), Err(ArrayError::ReadOnly)));
    }
}
