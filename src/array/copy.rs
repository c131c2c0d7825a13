//! Copies, conversions and whole-array element operations

use super::Array;
use crate::cast::cast_to;
use crate::error::{ArrayError, Result};
use crate::layout::{Order, keep_order_strides};
use crate::storage::RawBuffer;
use crate::types::element::{get_item, set_item, swap_element};
use crate::types::{DeepCopy, Descr, Endian, Item, TypeTag};
use std::sync::Arc;
use tracing::debug;

impl Array {
    /// Fresh zeroed array of this shape laid out in `order`
    pub(crate) fn alloc_like(&self, descr: Arc<Descr>, order: Order) -> Result<Array> {
        match self.resolve_order(order) {
            Order::Keep => {
                let strides = keep_order_strides(&self.dims, &self.strides, descr.itemsize());
                Array::with_strides(descr, &self.dims, &strides)
            }
            order => Array::new(descr, &self.dims, order),
        }
    }

    /// Owned copy contiguous in `order`
    pub fn copy(&self, order: Order) -> Result<Array> {
        let out = self.alloc_like(Arc::clone(&self.descr), order)?;
        cast_to(&out, self)?;
        Ok(out)
    }

    /// Owned copy converted to `descr` in a single allocation
    ///
    /// An unsized byte-string or raw target takes its width from this
    /// array's element type.
    pub fn astype(&self, descr: Arc<Descr>, order: Order) -> Result<Array> {
        let descr = self.sized_target(descr)?;
        let out = self.alloc_like(descr, order)?;
        cast_to(&out, self)?;
        Ok(out)
    }

    fn sized_target(&self, descr: Arc<Descr>) -> Result<Arc<Descr>> {
        if descr.itemsize() != 0 {
            return Ok(descr);
        }
        let width = match descr.tag() {
            TypeTag::Bytes => match self.descr.tag() {
                TypeTag::Bytes | TypeTag::Void => self.itemsize(),
                tag => tag.rendered_width().ok_or(ArrayError::NoCastPath {
                    from: self.descr.to_string(),
                    to: descr.to_string(),
                })?,
            },
            TypeTag::Void => self.itemsize(),
            _ => return Err(ArrayError::ZeroItemSize),
        };
        Ok(descr.resized(width))
    }

    /// Copy in which every object reference is replaced by `copier`'s copy of it
    ///
    /// Fields are visited once each per element; title aliases are not separate
    /// entries and are never visited twice.
    pub fn deep_copy(&self, copier: &dyn DeepCopy) -> Result<Array> {
        let out = self.copy(Order::Keep)?;
        if !self.descr.is_refcounted() {
            return Ok(out);
        }
        let offsets: Vec<usize> = out.offsets(Order::C).collect();
        {
            let mut storage = out.data.write();
            let raw = storage.owned_mut()?;
            for offset in offsets {
                deep_copy_element(&out.descr, raw, offset, copier)?;
            }
        }
        debug!(elements = out.size(), "deep copied object references");
        Ok(out)
    }

    /// Store `value` into every element
    pub fn fill(&self, value: &Item) -> Result<()> {
        self.ensure_writeable()?;
        let offsets: Vec<usize> = self.offsets(Order::C).collect();
        let mut storage = self.data.write();
        let raw = storage.owned_mut()?;
        for offset in offsets {
            set_item(&self.descr, raw, offset, value)?;
        }
        Ok(())
    }

    /// Elements as nested lists in C order; a zero-dimensional array gives its only item
    pub fn to_list(&self) -> Result<Item> {
        let mut items = self.items()?.into_iter();
        Ok(nest(&mut items, &self.dims))
    }

    /// Every element boxed, flat in C order
    pub(crate) fn items(&self) -> Result<Vec<Item>> {
        let storage = self.data.read();
        self.offsets(Order::C)
            .map(|offset| get_item(&self.descr, &storage, offset))
            .collect()
    }

    /// Element bytes concatenated in `order`, in the descriptor's own byte order
    pub fn to_bytes(&self, order: Order) -> Result<Vec<u8>> {
        if self.descr.is_refcounted() {
            return Err(ArrayError::wrong_kind(
                "arrays holding object references have no byte representation",
            ));
        }
        let order = match self.resolve_order(order) {
            Order::Keep => Order::C,
            order => order,
        };
        let itemsize = self.itemsize();
        let mut out = Vec::new();
        out.try_reserve_exact(self.nbytes())
            .map_err(|_| ArrayError::Memory {
                bytes: self.nbytes(),
            })?;
        let storage = self.data.read();
        let bytes = storage.bytes();
        for offset in self.offsets(order) {
            let element = bytes
                .get(offset..offset + itemsize)
                .ok_or(ArrayError::InvalidStrides {
                    buffer_len: bytes.len(),
                })?;
            out.extend_from_slice(element);
        }
        Ok(out)
    }

    /// Reverse the byte order of every element
    ///
    /// In place the result is a view of this array; otherwise a swapped copy.
    /// The descriptor is unchanged either way, so the values read differently.
    pub fn byteswap(&self, inplace: bool) -> Result<Array> {
        if !inplace {
            let out = self.copy(Order::Keep)?;
            out.byteswap(true)?;
            return Ok(out);
        }
        self.ensure_writeable()?;
        let itemsize = self.itemsize();
        let offsets: Vec<usize> = self.offsets(Order::C).collect();
        {
            let mut storage = self.data.write();
            let raw = storage.owned_mut()?;
            let buffer_len = raw.as_bytes().len();
            for offset in offsets {
                let element = raw
                    .as_bytes_mut()
                    .get_mut(offset..offset + itemsize)
                    .ok_or(ArrayError::InvalidStrides { buffer_len })?;
                swap_element(&self.descr, element);
            }
        }
        Ok(self.view())
    }

    /// Copy stored in another byte order; the element values are unchanged
    pub fn to_byte_order(&self, endian: Endian) -> Result<Array> {
        let mut out = self.copy(Order::Keep)?;
        let target = self.descr.new_with_byte_order(endian);
        if Arc::ptr_eq(&target, &self.descr) {
            return Ok(out);
        }
        out.byteswap(true)?;
        out.descr = target;
        out.update_flags();
        Ok(out)
    }
}

fn deep_copy_element(
    descr: &Descr,
    raw: &mut RawBuffer,
    offset: usize,
    copier: &dyn DeepCopy,
) -> Result<()> {
    if !descr.is_refcounted() {
        return Ok(());
    }
    if let Some(fields) = descr.fields() {
        for field in fields {
            deep_copy_element(field.descr(), raw, offset + field.offset(), copier)?;
        }
        return Ok(());
    }
    if descr.tag() == TypeTag::Object {
        if let Some(current) = raw.object(offset).cloned() {
            let copied = copier.deep_copy(&Item::Object(current))?;
            set_item(descr, raw, offset, &copied)?;
        }
    }
    Ok(())
}

fn nest(items: &mut impl Iterator<Item = Item>, dims: &[usize]) -> Item {
    match dims {
        [] => items.next().unwrap_or_default(),
        [n] => Item::List(items.by_ref().take(*n).collect()),
        [n, rest @ ..] => Item::List((0..*n).map(|_| nest(items, rest)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ByteOrder, CloneDeep, ObjectRef, RecordBuilder};
    use pretty_assertions::assert_eq;

    fn grid() -> Array {
        Array::from_slice(&[2, 3], &[1i32, 2, 3, 4, 5, 6]).unwrap()
    }

    #[test]
    fn copies_are_owned_and_contiguous() {
        let t = grid().transpose(None).unwrap();
        assert!(!t.is_c_contiguous());
        let c = t.copy(Order::C).unwrap();
        assert!(c.owns_data() && c.is_c_contiguous());
        assert_eq!(c.to_vec::<i32>().unwrap(), vec![1, 4, 2, 5, 3, 6]);

        let any = t.copy(Order::Any).unwrap();
        assert!(any.is_f_contiguous() && !any.is_c_contiguous());
        let keep = t.copy(Order::Keep).unwrap();
        assert_eq!(keep.strides(), t.strides());
        assert_eq!(keep.to_vec::<i32>().unwrap(), c.to_vec::<i32>().unwrap());
    }

    #[test]
    fn keep_order_handles_reversed_axes() {
        let a = Array::with_strides(Descr::builtin(TypeTag::Int32), &[3], &[-4]).unwrap();
        a.fill(&Item::Int(9)).unwrap();
        let keep = a.copy(Order::Keep).unwrap();
        assert_eq!(keep.strides(), &[4]);
        assert_eq!(keep.to_vec::<i32>().unwrap(), vec![9, 9, 9]);
    }

    #[test]
    fn astype_sizes_byte_strings_from_the_source() {
        let a = Array::from_slice(&[2], &[-12i16, 7]).unwrap();
        let s = a.astype(Descr::builtin(TypeTag::Bytes), Order::C).unwrap();
        assert_eq!(s.itemsize(), 6);
        assert_eq!(s.item(&[0]).unwrap(), Item::Bytes(b"-12".to_vec()));
        let back = s.astype(Descr::builtin(TypeTag::Int32), Order::C).unwrap();
        assert_eq!(back.to_vec::<i32>().unwrap(), vec![-12, 7]);
    }

    #[test]
    fn nested_lists() {
        let list = grid().to_list().unwrap();
        assert_eq!(
            list,
            Item::List(vec![
                Item::List(vec![Item::Int(1), Item::Int(2), Item::Int(3)]),
                Item::List(vec![Item::Int(4), Item::Int(5), Item::Int(6)]),
            ])
        );
        let scalar = Array::from_slice(&[], &[2.0f64]).unwrap();
        assert_eq!(scalar.to_list().unwrap(), Item::Float(2.0));
    }

    #[test]
    fn byte_dumps_follow_the_requested_order() {
        let a = Array::from_slice(&[2, 2], &[1u8, 2, 3, 4]).unwrap();
        assert_eq!(a.to_bytes(Order::C).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(a.to_bytes(Order::Fortran).unwrap(), vec![1, 3, 2, 4]);
        let objects = Array::new(Descr::builtin(TypeTag::Object), &[1], Order::C).unwrap();
        assert!(objects.to_bytes(Order::C).is_err());
    }

    #[test]
    fn byteswap_in_place_and_copied() {
        let a = Array::from_slice(&[2], &[1u16, 0x0102]).unwrap();
        let copy = a.byteswap(false).unwrap();
        assert_eq!(copy.to_vec::<u16>().unwrap(), vec![0x0100, 0x0201]);
        assert_eq!(a.to_vec::<u16>().unwrap(), vec![1, 0x0102]);

        let view = a.byteswap(true).unwrap();
        assert!(view.shares_memory(&a));
        let relabeled = a.new_byte_order(Endian::Swap);
        assert_eq!(relabeled.to_vec::<u16>().unwrap(), vec![1, 0x0102]);
    }

    #[test]
    fn converting_byte_order_keeps_values() {
        let a = Array::from_slice(&[2], &[258u16, 7]).unwrap();
        let big = a.to_byte_order(Endian::Big).unwrap();
        assert_eq!(big.descr().byteorder(), ByteOrder::Big);
        assert_eq!(big.to_vec::<u16>().unwrap(), vec![258, 7]);
        assert_eq!(big.to_bytes(Order::C).unwrap(), vec![1, 2, 0, 7]);
    }

    #[test]
    fn ignoring_byte_order_leaves_data_alone() {
        let a = Array::from_slice(&[2], &[1i32, 256]).unwrap();
        let same = a.to_byte_order(Endian::Ignore).unwrap();
        assert!(Arc::ptr_eq(same.descr(), a.descr()));
        assert_eq!(same.to_vec::<i32>().unwrap(), vec![1, 256]);

        let big = a.to_byte_order(Endian::Big).unwrap();
        let still_big = big.to_byte_order(Endian::Ignore).unwrap();
        assert_eq!(still_big.descr().byteorder(), ByteOrder::Big);
        assert_eq!(still_big.to_bytes(Order::C).unwrap(), big.to_bytes(Order::C).unwrap());
        assert_eq!(still_big.to_vec::<i32>().unwrap(), vec![1, 256]);
    }

    #[test]
    fn deep_copies_replace_references() {
        let rec = RecordBuilder::new()
            .field("id", Descr::builtin(TypeTag::Int32))
            .field("payload", Descr::builtin(TypeTag::Object))
            .build()
            .unwrap();
        let a = Array::new(rec, &[2], Order::C).unwrap();
        let shared = ObjectRef::new(Item::List(vec![Item::Int(1)]));
        a.item_set(&[0], &Item::Record(vec![Item::Int(5), Item::Object(shared.clone())]))
            .unwrap();

        let shallow = a.copy(Order::C).unwrap();
        let deep = a.deep_copy(&CloneDeep).unwrap();
        assert_eq!(shared.ref_count(), 3);
        match deep.item(&[0]).unwrap() {
            Item::Record(fields) => {
                assert_eq!(fields[0], Item::Int(5));
                match &fields[1] {
                    Item::Object(r) => {
                        assert!(!r.ptr_eq(&shared));
                        assert_eq!(r.get(), shared.get());
                    }
                    other => panic!("unexpected {other:?}"),
                }
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(deep.item(&[1]).unwrap(), shallow.item(&[1]).unwrap());
    }
}
