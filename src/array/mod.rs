//! The strided array object
//!
//! An [`Array`] is a descriptor, a shape, signed byte strides and an offset
//! into a shared [`DataBuffer`]. Views share the buffer and keep a snapshot
//! of the array they were derived from as their [`Base`], so the chain of
//! bases always points at arrays created earlier and plain reference
//! counting keeps the storage alive.

mod copy;
mod flags;
mod index;
mod shape;
mod view;
mod writeback;

pub use flags::{ArrayFlags, FlagsUpdate};
pub use writeback::UpdateIfCopy;

use crate::config::Config;
use crate::error::{ArrayError, Result};
use crate::layout::{
    Dims, OffsetIter, Order, Strides, byte_extent, check_strides, checked_nbytes, checked_size,
    fill_strides, is_aligned, is_c_contiguous, is_contiguous, is_f_contiguous,
};
use crate::storage::{DataBuffer, RawBuffer};
use crate::types::{Descr, NativeType};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// What a view's storage lifetime depends on
#[derive(Clone)]
pub enum Base {
    /// Snapshot of the array this one was derived from
    Array(Arc<Array>),
    /// External immutable buffer the bytes are borrowed from
    Owner(Bytes),
}

impl fmt::Debug for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Base::Array(array) => f
                .debug_struct("Array")
                .field("descr", &array.descr.to_string())
                .field("shape", &array.shape())
                .finish(),
            Base::Owner(bytes) => f.debug_tuple("Owner").field(&bytes.len()).finish(),
        }
    }
}

/// N-dimensional strided array over a shared, typed byte buffer
pub struct Array {
    descr: Arc<Descr>,
    dims: Dims,
    strides: Strides,
    offset: usize,
    data: Arc<DataBuffer>,
    flags: ArrayFlags,
    base: Option<Base>,
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("descr", &self.descr.to_string())
            .field("shape", &self.dims.as_slice())
            .field("strides", &self.strides.as_slice())
            .field("offset", &self.offset)
            .field("flags", &self.flags)
            .field("base", &self.base)
            .finish()
    }
}

impl Array {
    /// Zero-filled array that owns its storage
    ///
    /// ```
    /// use ndstride::{Array, Descr, Order, TypeTag};
    ///
    /// let a = Array::new(Descr::builtin(TypeTag::Float32), &[2, 3], Order::Fortran).unwrap();
    /// assert_eq!(a.strides(), &[4, 8]);
    /// assert!(a.owns_data());
    /// ```
    pub fn new(descr: Arc<Descr>, shape: &[usize], order: Order) -> Result<Self> {
        Self::new_with_config(descr, shape, order, &Config::default())
    }

    pub fn new_with_config(
        descr: Arc<Descr>,
        shape: &[usize],
        order: Order,
        config: &Config,
    ) -> Result<Self> {
        let nbytes = check_new(&descr, shape, config)?;
        let strides = fill_strides(shape, descr.itemsize(), order);
        let data = DataBuffer::owned(nbytes)?;
        Ok(Self::assemble(descr, shape.into(), strides, 0, Arc::new(data), None))
    }

    /// Zero-filled owned array with explicit strides
    ///
    /// The buffer is sized to the bytes the strides reach. Negative strides
    /// place element zero past the start of the buffer.
    pub fn with_strides(descr: Arc<Descr>, shape: &[usize], strides: &[isize]) -> Result<Self> {
        check_new(&descr, shape, &Config::default())?;
        if strides.len() != shape.len() {
            return Err(ArrayError::LengthMismatch {
                what: "strides",
                expected: shape.len(),
                actual: strides.len(),
            });
        }
        let (lo, hi) = byte_extent(shape, strides, descr.itemsize());
        let span = hi
            .checked_sub(lo)
            .ok_or(ArrayError::Memory { bytes: usize::MAX })?;
        let data = DataBuffer::owned(span as usize)?;
        Ok(Self::assemble(
            descr,
            shape.into(),
            strides.into(),
            lo.unsigned_abs(),
            Arc::new(data),
            None,
        ))
    }

    /// Read-only array over an external buffer
    ///
    /// `strides` defaults to C order. The buffer becomes the array's base.
    pub fn from_bytes(
        descr: Arc<Descr>,
        shape: &[usize],
        strides: Option<&[isize]>,
        data: Bytes,
    ) -> Result<Self> {
        check_new(&descr, shape, &Config::default())?;
        if descr.is_refcounted() {
            return Err(ArrayError::wrong_kind(
                "arrays holding object references cannot borrow external bytes",
            ));
        }
        let strides: Strides = match strides {
            Some(s) if s.len() != shape.len() => {
                return Err(ArrayError::LengthMismatch {
                    what: "strides",
                    expected: shape.len(),
                    actual: s.len(),
                });
            }
            Some(s) => s.into(),
            None => fill_strides(shape, descr.itemsize(), Order::C),
        };
        if !check_strides(0, shape, &strides, descr.itemsize(), data.len()) {
            return Err(ArrayError::InvalidStrides {
                buffer_len: data.len(),
            });
        }
        let buffer = Arc::new(DataBuffer::foreign(data.clone()));
        Ok(Self::assemble(
            descr,
            shape.into(),
            strides,
            0,
            buffer,
            Some(Base::Owner(data)),
        ))
    }

    /// Array of native values in C order
    pub fn from_slice<T: NativeType>(shape: &[usize], values: &[T]) -> Result<Self> {
        let expected = checked_size(shape).ok_or(ArrayError::Memory { bytes: usize::MAX })?;
        if values.len() != expected {
            return Err(ArrayError::LengthMismatch {
                what: "elements",
                expected,
                actual: values.len(),
            });
        }
        let array = Self::new(Descr::builtin(T::TAG), shape, Order::C)?;
        {
            let mut storage = array.data.write();
            storage
                .owned_mut()?
                .as_bytes_mut()
                .copy_from_slice(bytemuck::cast_slice(values));
        }
        Ok(array)
    }

    /// Elements in C order as native values, casting first if the element type differs
    pub fn to_vec<T: NativeType>(&self) -> Result<Vec<T>> {
        if self.descr.tag() != T::TAG || !self.descr.is_native() {
            return self.astype(Descr::builtin(T::TAG), Order::C)?.to_vec();
        }
        let size = std::mem::size_of::<T>();
        let mut out = Vec::new();
        out.try_reserve_exact(self.size())
            .map_err(|_| ArrayError::Memory {
                bytes: self.size().saturating_mul(size),
            })?;
        let storage = self.data.read();
        let bytes = storage.bytes();
        for offset in self.offsets(Order::C) {
            let element = bytes
                .get(offset..offset + size)
                .ok_or(ArrayError::InvalidStrides {
                    buffer_len: bytes.len(),
                })?;
            out.push(bytemuck::pod_read_unaligned(element));
        }
        Ok(out)
    }

    fn assemble(
        descr: Arc<Descr>,
        dims: Dims,
        strides: Strides,
        offset: usize,
        data: Arc<DataBuffer>,
        base: Option<Base>,
    ) -> Self {
        let flags = if data.is_foreign() {
            ArrayFlags::empty()
        } else {
            ArrayFlags::OWNDATA | ArrayFlags::WRITEABLE
        };
        let mut array = Self {
            descr,
            dims,
            strides,
            offset,
            data,
            flags,
            base,
        };
        array.update_flags();
        array
    }

    /// Copy of the array header sharing storage and base; used as a base snapshot
    fn shallow(&self) -> Array {
        Array {
            descr: Arc::clone(&self.descr),
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
            data: Arc::clone(&self.data),
            flags: self.flags,
            base: self.base.clone(),
        }
    }

    /// New header over the same buffer whose base is this array
    pub(crate) fn derive(
        &self,
        descr: Arc<Descr>,
        dims: Dims,
        strides: Strides,
        offset: usize,
    ) -> Array {
        let flags = self.flags - ArrayFlags::OWNDATA - ArrayFlags::UPDATEIFCOPY;
        let mut view = Array {
            descr,
            dims,
            strides,
            offset,
            data: Arc::clone(&self.data),
            flags,
            base: Some(Base::Array(Arc::new(self.shallow()))),
        };
        view.update_flags();
        view
    }

    /// Recompute contiguity and alignment from shape, strides and address
    pub(crate) fn update_flags(&mut self) {
        let itemsize = self.descr.itemsize();
        self.flags.set(
            ArrayFlags::C_CONTIGUOUS,
            is_c_contiguous(&self.dims, &self.strides, itemsize),
        );
        self.flags.set(
            ArrayFlags::F_CONTIGUOUS,
            is_f_contiguous(&self.dims, &self.strides, itemsize),
        );
        let aligned = self.check_aligned();
        self.flags.set(ArrayFlags::ALIGNED, aligned);
    }

    /// Whether the data address and strides honour the descriptor alignment
    pub(crate) fn check_aligned(&self) -> bool {
        is_aligned(
            self.data_address(),
            &self.dims,
            &self.strides,
            self.descr.alignment(),
        )
    }

    /// Whether the storage behind this array may be written at all
    ///
    /// Owned storage is writeable. A view defers to the current state of the
    /// array that owns its storage; bytes borrowed from an external buffer
    /// never are.
    pub(crate) fn storage_writeable(&self) -> bool {
        if self.data.is_foreign() {
            return false;
        }
        self.flags.contains(ArrayFlags::OWNDATA) || self.data.is_writeable()
    }

    /// Set or clear `WRITEABLE`; the owner publishes the change to its views
    pub(crate) fn set_writeable(&mut self, value: bool) {
        self.flags.set(ArrayFlags::WRITEABLE, value);
        if self.owns_data() {
            self.data.set_writeable(value);
        }
    }

    /// Resolve `Any` against this array's layout; `Keep` and the explicit orders pass through
    pub(crate) fn resolve_order(&self, order: Order) -> Order {
        match order {
            Order::Any if self.is_fortran() => Order::Fortran,
            Order::Any => Order::C,
            order => order,
        }
    }

    pub(crate) fn offsets(&self, order: Order) -> OffsetIter {
        OffsetIter::new(self.offset, &self.dims, &self.strides, order)
    }

    /// Drop the storage and base and reset to an empty owned scalar header
    pub(crate) fn release(&mut self) {
        self.data = Arc::new(DataBuffer::from_raw(RawBuffer::default()));
        self.dims.clear();
        self.strides.clear();
        self.offset = 0;
        self.base = None;
        self.flags = ArrayFlags::OWNDATA | ArrayFlags::WRITEABLE;
        self.update_flags();
    }

    pub(crate) fn ensure_writeable(&self) -> Result<()> {
        if self.is_writeable() {
            Ok(())
        } else {
            Err(ArrayError::ReadOnly)
        }
    }

    pub fn descr(&self) -> &Arc<Descr> {
        &self.descr
    }

    pub fn shape(&self) -> &[usize] {
        &self.dims
    }

    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Number of elements
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn itemsize(&self) -> usize {
        self.descr.itemsize()
    }

    /// Bytes covered by the elements, ignoring gaps between them
    pub fn nbytes(&self) -> usize {
        self.size() * self.itemsize()
    }

    pub fn flags(&self) -> ArrayFlags {
        self.flags
    }

    pub fn base(&self) -> Option<&Base> {
        self.base.as_ref()
    }

    pub fn owns_data(&self) -> bool {
        self.flags.contains(ArrayFlags::OWNDATA)
    }

    pub fn is_writeable(&self) -> bool {
        self.flags.contains(ArrayFlags::WRITEABLE)
    }

    pub fn is_c_contiguous(&self) -> bool {
        self.flags.contains(ArrayFlags::C_CONTIGUOUS)
    }

    pub fn is_f_contiguous(&self) -> bool {
        self.flags.contains(ArrayFlags::F_CONTIGUOUS)
    }

    /// Fortran contiguous and not also C contiguous
    pub fn is_fortran(&self) -> bool {
        self.is_f_contiguous() && !self.is_c_contiguous()
    }

    pub fn is_aligned(&self) -> bool {
        self.flags.contains(ArrayFlags::ALIGNED)
    }

    /// Whether the elements are contiguous in `order`
    pub fn is_contiguous(&self, order: Order) -> bool {
        match self.resolve_order(order) {
            Order::Keep => self.is_c_contiguous() || self.is_f_contiguous(),
            order => is_contiguous(&self.dims, &self.strides, self.itemsize(), order),
        }
    }

    /// Byte offset of element zero inside the shared buffer
    pub fn byte_offset(&self) -> usize {
        self.offset
    }

    /// Address of element zero
    pub fn data_address(&self) -> usize {
        self.data.address().wrapping_add(self.offset)
    }

    /// Whether both arrays read the same buffer
    pub fn shares_memory(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub(crate) fn buffer(&self) -> &Arc<DataBuffer> {
        &self.data
    }
}

/// Validate a descriptor and shape for a new array; returns the contiguous byte count
fn check_new(descr: &Descr, shape: &[usize], config: &Config) -> Result<usize> {
    if descr.itemsize() == 0 {
        return Err(ArrayError::ZeroItemSize);
    }
    if shape.len() > config.max_dims {
        return Err(ArrayError::TooManyDims {
            ndim: shape.len(),
            max: config.max_dims,
        });
    }
    let size = checked_size(shape).ok_or(ArrayError::Memory { bytes: usize::MAX })?;
    checked_nbytes(shape, descr.itemsize()).ok_or(ArrayError::Memory { bytes: usize::MAX })?;
    Ok(size * descr.itemsize())
}
