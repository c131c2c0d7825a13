use super::{ArrayState, Payload};
use crate::array::Array;
use crate::error::{ArrayError, Result};
use crate::layout::{Dims, Order, checked_size, fill_strides, is_aligned};
use crate::types::element::{copy_swap, set_item};
use crate::types::{Descr, Endian, Item, SUPPORTED_VERSIONS};
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// Rebuild `target` in place from `state`
///
/// The target's previous storage and base are released before the record is
/// checked any further, so on error `target` is left as an empty array and
/// should be discarded.
pub fn restore(target: &mut Array, state: ArrayState) -> Result<()> {
    check_version(state.version)?;
    target.release();
    *target = assemble(state)?;
    Ok(())
}

pub(super) fn build(state: ArrayState) -> Result<Array> {
    check_version(state.version)?;
    assemble(state)
}

fn check_version(version: u32) -> Result<()> {
    if SUPPORTED_VERSIONS.contains(&version) {
        Ok(())
    } else {
        Err(ArrayError::UnsupportedVersion(version))
    }
}

fn assemble(state: ArrayState) -> Result<Array> {
    let ArrayState {
        shape,
        descr,
        fortran,
        payload,
        ..
    } = state;
    let shape = shape
        .iter()
        .map(|&d| usize::try_from(d).map_err(|_| ArrayError::Memory { bytes: usize::MAX }))
        .collect::<Result<Dims>>()?;
    let order = if fortran { Order::Fortran } else { Order::C };
    let count = checked_size(&shape).ok_or(ArrayError::Memory { bytes: usize::MAX })?;

    if descr.uses_list_pickle() {
        let Payload::List(items) = payload else {
            return Err(ArrayError::wrong_kind(
                "elements holding object references must be restored from a list of items",
            ));
        };
        return from_items(descr, &shape, order, count, items);
    }
    let Payload::Bytes(bytes) = payload else {
        return Err(ArrayError::wrong_kind(
            "plain elements must be restored from a byte payload",
        ));
    };
    from_payload(descr, &shape, order, count, bytes)
}

fn from_items(
    descr: Arc<Descr>,
    shape: &[usize],
    order: Order,
    count: usize,
    items: Vec<Item>,
) -> Result<Array> {
    if items.len() != count {
        return Err(ArrayError::LengthMismatch {
            what: "items",
            expected: count,
            actual: items.len(),
        });
    }
    let array = Array::new(descr, shape, order)?;
    {
        let mut storage = array.buffer().write();
        let raw = storage.owned_mut()?;
        for (offset, item) in array.offsets(Order::C).zip(&items) {
            set_item(array.descr(), raw, offset, item)?;
        }
    }
    debug!(shape = ?shape, items = count, "restored array from items");
    Ok(array)
}

fn from_payload(
    descr: Arc<Descr>,
    shape: &[usize],
    order: Order,
    count: usize,
    bytes: Bytes,
) -> Result<Array> {
    let itemsize = descr.itemsize();
    if itemsize == 0 {
        return Err(ArrayError::ZeroItemSize);
    }
    let expected = count
        .checked_mul(itemsize)
        .ok_or(ArrayError::Memory { bytes: usize::MAX })?;
    if bytes.len() != expected {
        return Err(ArrayError::LengthMismatch {
            what: "payload bytes",
            expected,
            actual: bytes.len(),
        });
    }

    let swap = !descr.is_native();
    let strides = fill_strides(shape, itemsize, order);
    if !swap && is_aligned(bytes.as_ptr() as usize, shape, &strides, descr.alignment()) {
        debug!(shape = ?shape, bytes = expected, "restored array aliasing its payload");
        return Array::from_bytes(descr, shape, Some(&strides), bytes);
    }

    // the copy is stored natively, so the descriptor has to say so
    let native = match (swap, descr.is_extended()) {
        (false, _) => Arc::clone(&descr),
        (true, false) => Descr::builtin(descr.tag()),
        (true, true) => descr.new_with_byte_order(Endian::Swap),
    };
    let array = Array::new(native, shape, order)?;
    {
        let mut storage = array.buffer().write();
        let dst = storage.owned_mut()?.as_bytes_mut();
        if swap {
            for (dst, src) in dst
                .chunks_exact_mut(itemsize)
                .zip(bytes.chunks_exact(itemsize))
            {
                copy_swap(&descr, dst, src, true);
            }
        } else {
            dst.copy_from_slice(&bytes);
        }
    }
    debug!(shape = ?shape, bytes = expected, swap, "restored array into fresh storage");
    Ok(array)
}
