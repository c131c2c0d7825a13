//! Views: new headers over the same storage

use super::Array;
use crate::cast::cast_to;
use crate::error::{ArrayError, Result};
use crate::types::{Descr, Endian};
use std::sync::Arc;

impl Array {
    /// Array sharing this one's storage, shape and strides; its base is `self`
    pub fn view(&self) -> Array {
        self.derive(
            Arc::clone(&self.descr),
            self.dims.clone(),
            self.strides.clone(),
            self.offset,
        )
    }

    /// View reinterpreting the elements as `descr`
    ///
    /// With a different item size the array must be contiguous: the last axis
    /// (the first, for a Fortran array) is rescaled so the byte extent of each
    /// row stays the same. Arrays holding object references can only be viewed
    /// with an equivalent descriptor.
    pub fn view_as(&self, descr: Arc<Descr>) -> Result<Array> {
        if descr.itemsize() == 0 {
            return Err(ArrayError::ZeroItemSize);
        }
        if (descr.is_refcounted() || self.descr.is_refcounted()) && !descr.equivalent(&self.descr)
        {
            return Err(ArrayError::wrong_kind(
                "cannot change the data type of an array holding object references",
            ));
        }
        let mut dims = self.dims.clone();
        let mut strides = self.strides.clone();
        let (old, new) = (self.itemsize(), descr.itemsize());
        if old != new {
            if self.ndim() == 0 || !(self.is_c_contiguous() || self.is_f_contiguous()) {
                return Err(ArrayError::value(
                    "changing the item size requires a contiguous array with at least one axis",
                ));
            }
            let axis = if self.is_c_contiguous() {
                self.ndim() - 1
            } else {
                0
            };
            let row = dims[axis] * old;
            if row % new != 0 {
                return Err(ArrayError::value(
                    "new item size does not divide the bytes along the resized axis",
                ));
            }
            dims[axis] = row / new;
            strides[axis] = new as isize;
        }
        Ok(self.derive(descr, dims, strides, self.offset))
    }

    /// The `index`-th sub-array along the first axis, as a view
    pub fn sub_array(&self, index: isize) -> Result<Array> {
        if self.ndim() == 0 {
            return Err(ArrayError::value("cannot index a zero-dimensional array"));
        }
        let size = self.dims[0];
        let wrapped = if index < 0 {
            index + size as isize
        } else {
            index
        };
        if wrapped < 0 || wrapped as usize >= size {
            return Err(ArrayError::IndexOutOfBounds { index, size });
        }
        let offset = (self.offset as isize).wrapping_add(wrapped.wrapping_mul(self.strides[0]));
        Ok(self.derive(
            Arc::clone(&self.descr),
            self.dims[1..].into(),
            self.strides[1..].into(),
            offset as usize,
        ))
    }

    /// View of the bytes at `offset` inside every element, typed as `descr`
    ///
    /// Reinterpreting bytes as or from object references is only allowed
    /// along a declared field of exactly that type.
    pub fn get_field(&self, descr: Arc<Descr>, offset: usize) -> Result<Array> {
        let end = offset.checked_add(descr.itemsize());
        if descr.itemsize() == 0 || end.is_none_or(|end| end > self.itemsize()) {
            return Err(ArrayError::FieldOutOfRange {
                offset,
                field_size: descr.itemsize(),
                itemsize: self.itemsize(),
            });
        }
        if descr.is_refcounted() || self.descr.is_refcounted() {
            let declared = self.descr.fields().is_some_and(|fields| {
                fields
                    .iter()
                    .any(|f| f.offset() == offset && f.descr().equivalent(&descr))
            });
            let whole = offset == 0 && descr.equivalent(&self.descr);
            if !declared && !whole && descr.is_refcounted() {
                return Err(ArrayError::wrong_kind(
                    "object references can only be read through a declared field",
                ));
            }
            if !declared && !whole && self.descr.is_refcounted() && !descr.is_refcounted() {
                let overlaps_object = self.descr.fields().is_none_or(|fields| {
                    fields.iter().any(|f| {
                        f.descr().is_refcounted()
                            && f.offset() < offset + descr.itemsize()
                            && offset < f.offset() + f.descr().itemsize()
                    })
                });
                if overlaps_object {
                    return Err(ArrayError::wrong_kind(
                        "cannot reinterpret object references as raw bytes",
                    ));
                }
            }
        }
        Ok(self.derive(
            descr,
            self.dims.clone(),
            self.strides.clone(),
            self.offset + offset,
        ))
    }

    /// Cast `value` into the bytes at `offset` of every element
    pub fn set_field(&self, descr: Arc<Descr>, offset: usize, value: &Array) -> Result<()> {
        let target = self.get_field(descr, offset)?;
        cast_to(&target, value)
    }

    /// View of a named field (or title) of a structured array
    pub fn field(&self, name: &str) -> Result<Array> {
        let field = self
            .descr
            .field(name)
            .ok_or_else(|| ArrayError::value(format!("no field of name {name}")))?;
        self.get_field(Arc::clone(field.descr()), field.offset())
    }

    /// View whose descriptor claims a different byte order; the bytes are untouched
    pub fn new_byte_order(&self, endian: Endian) -> Array {
        self.derive(
            self.descr.new_with_byte_order(endian),
            self.dims.clone(),
            self.strides.clone(),
            self.offset,
        )
    }
}
