//! Shape manipulation: resize, reshape and axis permutations

use super::{Array, ArrayFlags};
use crate::error::{ArrayError, Result};
use crate::layout::{Dims, Order, Strides, checked_nbytes, checked_size, fill_strides};
use crate::storage::{DataBuffer, RawBuffer};
use std::sync::Arc;
use tracing::{debug, warn};

impl Array {
    /// Change the shape of an array that owns its storage, reallocating in place
    ///
    /// New elements read as zero. With `refcheck` the call fails while any view
    /// still shares the buffer; without it those views keep the old buffer.
    /// Every check runs before anything is changed.
    pub fn resize(&mut self, new_shape: &[usize], refcheck: bool) -> Result<()> {
        if new_shape.len() > crate::config::MAX_DIMS {
            return Err(ArrayError::TooManyDims {
                ndim: new_shape.len(),
                max: crate::config::MAX_DIMS,
            });
        }
        let size = checked_size(new_shape).ok_or(ArrayError::Memory { bytes: usize::MAX })?;
        checked_nbytes(new_shape, self.itemsize())
            .ok_or(ArrayError::Memory { bytes: usize::MAX })?;
        let nbytes = size * self.itemsize();

        if !self.owns_data() {
            return Err(ArrayError::Resize("it does not own its data"));
        }
        if self.base.is_some() || self.flags.contains(ArrayFlags::UPDATEIFCOPY) {
            return Err(ArrayError::Resize("it references another array"));
        }
        if !(self.is_c_contiguous() || self.is_f_contiguous()) {
            return Err(ArrayError::Resize("only single-segment arrays can be resized"));
        }
        let shared = Arc::strong_count(&self.data) > 1;
        if refcheck && shared {
            return Err(ArrayError::Resize(
                "it is referenced by another array; use refcheck=false to detach it",
            ));
        }

        let order = if self.is_fortran() && new_shape.len() > 1 {
            Order::Fortran
        } else {
            Order::C
        };
        match Arc::get_mut(&mut self.data) {
            Some(buffer) => buffer.get_mut().owned_mut()?.resize(nbytes)?,
            None => {
                warn!(
                    shape = ?new_shape,
                    "resizing a shared buffer; existing views keep the old data"
                );
                let mut raw = RawBuffer::zeroed(nbytes)?;
                {
                    let old = self.data.read();
                    let keep = old.bytes().len().min(nbytes);
                    raw.as_bytes_mut()[..keep].copy_from_slice(&old.bytes()[..keep]);
                    for (offset, object) in old.objects_in(0..keep) {
                        raw.set_object(offset, Some(object));
                    }
                }
                self.data = Arc::new(DataBuffer::from_raw(raw));
                self.data.set_writeable(self.is_writeable());
            }
        }
        debug!(shape = ?new_shape, bytes = nbytes, "resized array");
        self.dims = new_shape.into();
        self.strides = fill_strides(new_shape, self.itemsize(), order);
        self.offset = 0;
        self.update_flags();
        Ok(())
    }

    /// Same elements under a new shape; at most one extent may be `-1`
    ///
    /// Returns a view when the array is contiguous in `order`, an owned copy
    /// otherwise.
    pub fn reshape(&self, shape: &[isize], order: Order) -> Result<Array> {
        let dims = self.resolve_shape(shape)?;
        let order = match self.resolve_order(order) {
            Order::Keep => {
                return Err(ArrayError::value("order 'Keep' is not valid for reshape"));
            }
            order => order,
        };
        let strides = fill_strides(&dims, self.itemsize(), order);
        if self.is_contiguous(order) {
            return Ok(self.derive(Arc::clone(&self.descr), dims, strides, self.offset));
        }
        let mut out = self.copy(order)?;
        out.dims = dims;
        out.strides = strides;
        out.update_flags();
        Ok(out)
    }

    fn resolve_shape(&self, shape: &[isize]) -> Result<Dims> {
        if shape.len() > crate::config::MAX_DIMS {
            return Err(ArrayError::TooManyDims {
                ndim: shape.len(),
                max: crate::config::MAX_DIMS,
            });
        }
        let mut unknown = None;
        let mut known = 1usize;
        for (k, &dim) in shape.iter().enumerate() {
            match dim {
                -1 if unknown.is_some() => {
                    return Err(ArrayError::value("can only specify one unknown dimension"));
                }
                -1 => unknown = Some(k),
                d if d < 0 => return Err(ArrayError::value("negative dimensions not allowed")),
                d => {
                    known = known
                        .checked_mul(d as usize)
                        .ok_or(ArrayError::Memory { bytes: usize::MAX })?;
                }
            }
        }
        let size = self.size();
        let mut dims: Dims = shape.iter().map(|&d| d.max(0) as usize).collect();
        if let Some(k) = unknown {
            if known == 0 || size % known != 0 {
                return Err(ArrayError::value("total size of new array must be unchanged"));
            }
            dims[k] = size / known;
        } else if known != size {
            return Err(ArrayError::value("total size of new array must be unchanged"));
        }
        Ok(dims)
    }

    /// View with axes permuted; `None` reverses them
    pub fn transpose(&self, axes: Option<&[usize]>) -> Result<Array> {
        let nd = self.ndim();
        let perm: Dims = match axes {
            None => (0..nd).rev().collect(),
            Some(axes) => {
                let mut seen = [false; crate::config::MAX_DIMS];
                let valid = axes.len() == nd
                    && axes
                        .iter()
                        .all(|&a| a < nd && !std::mem::replace(&mut seen[a], true));
                if !valid {
                    return Err(ArrayError::value("axes don't match array"));
                }
                axes.into()
            }
        };
        let dims: Dims = perm.iter().map(|&a| self.dims[a]).collect();
        let strides: Strides = perm.iter().map(|&a| self.strides[a]).collect();
        Ok(self.derive(Arc::clone(&self.descr), dims, strides, self.offset))
    }

    /// View with two axes exchanged; negative axes count from the end
    pub fn swap_axes(&self, a: isize, b: isize) -> Result<Array> {
        let nd = self.ndim();
        let normalize = |axis: isize| {
            let wrapped = if axis < 0 { axis + nd as isize } else { axis };
            if wrapped < 0 || wrapped as usize >= nd {
                Err(ArrayError::IndexOutOfBounds {
                    index: axis,
                    size: nd,
                })
            } else {
                Ok(wrapped as usize)
            }
        };
        let (a, b) = (normalize(a)?, normalize(b)?);
        let mut perm: Dims = (0..nd).collect();
        perm.swap(a, b);
        self.transpose(Some(perm.as_slice()))
    }

    /// View without the axes of extent one
    pub fn squeeze(&self) -> Array {
        let (dims, strides): (Dims, Strides) = self
            .dims
            .iter()
            .zip(&self.strides)
            .filter(|&(&d, _)| d != 1)
            .map(|(&d, &s)| (d, s))
            .unzip();
        self.derive(Arc::clone(&self.descr), dims, strides, self.offset)
    }

    /// One-dimensional array of the elements in `order`; a view when possible
    pub fn ravel(&self, order: Order) -> Result<Array> {
        let order = match order {
            Order::Keep => Order::Any,
            order => order,
        };
        self.reshape(&[-1], order)
    }

    /// One-dimensional owned copy of the elements in `order`
    pub fn flatten(&self, order: Order) -> Result<Array> {
        let mut out = self.copy(self.resolve_order(order))?;
        out.dims = [self.size()].into_iter().collect();
        out.strides = [self.itemsize() as isize].into_iter().collect();
        out.update_flags();
        Ok(out)
    }
}
