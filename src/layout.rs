//! Shape, stride and offset arithmetic
//!
//! Everything here is pure: functions take shapes and strides and return
//! byte offsets. Addressing is unchecked; bounds checks belong to callers.

use crate::error::{ArrayError, Result};
use smallvec::SmallVec;

/// Extents of an array, inline up to eight axes
pub type Dims = SmallVec<[usize; 8]>;

/// Signed byte strides of an array, inline up to eight axes
pub type Strides = SmallVec<[isize; 8]>;

/// Memory order requested for a new layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Order {
    /// Row-major, last axis varies fastest
    #[default]
    C,
    /// Column-major, first axis varies fastest
    Fortran,
    /// Fortran if the source is Fortran contiguous and not C contiguous, else C
    Any,
    /// Follow the stride ordering of the source as closely as possible
    Keep,
}

impl Order {
    /// Whether this order lays out the first axis fastest
    pub fn is_fortran(self) -> bool {
        self == Order::Fortran
    }
}

/// Compute contiguous strides for `shape`
///
/// Zero-extent axes contribute a factor of one, so the strides of an empty
/// array still look contiguous to [`is_contiguous`]. Anything other than
/// [`Order::Fortran`] produces row-major strides.
pub fn fill_strides(shape: &[usize], itemsize: usize, order: Order) -> Strides {
    let mut strides: Strides = SmallVec::from_elem(0, shape.len());
    let mut running = itemsize as isize;
    if order.is_fortran() {
        for (stride, &dim) in strides.iter_mut().zip(shape) {
            *stride = running;
            running = running.wrapping_mul(dim.max(1) as isize);
        }
    } else {
        for (stride, &dim) in strides.iter_mut().zip(shape).rev() {
            *stride = running;
            running = running.wrapping_mul(dim.max(1) as isize);
        }
    }
    strides
}

/// Strides that keep the axis ordering of `strides` but pack elements densely
pub fn keep_order_strides(shape: &[usize], strides: &[isize], itemsize: usize) -> Strides {
    let mut axes: SmallVec<[usize; 8]> = (0..shape.len()).collect();
    // stable: equal strides keep C ordering
    axes.sort_by(|&a, &b| strides[b].unsigned_abs().cmp(&strides[a].unsigned_abs()));
    let mut out: Strides = SmallVec::from_elem(0, shape.len());
    let mut running = itemsize as isize;
    for &axis in axes.iter().rev() {
        out[axis] = running;
        running = running.wrapping_mul(shape[axis].max(1) as isize);
    }
    out
}

/// Whether `strides` are exactly what [`fill_strides`] would produce for `order`
///
/// Axes of extent one accept any stride. An array with a zero-extent axis is
/// contiguous in every order.
pub fn is_contiguous(shape: &[usize], strides: &[isize], itemsize: usize, order: Order) -> bool {
    if shape.contains(&0) {
        return true;
    }
    let mut expected = itemsize as isize;
    let mut check = |dim: usize, stride: isize| {
        if dim == 1 {
            return true;
        }
        if stride != expected {
            return false;
        }
        expected = expected.wrapping_mul(dim as isize);
        true
    };
    if order.is_fortran() {
        shape.iter().zip(strides).all(|(&d, &s)| check(d, s))
    } else {
        shape.iter().zip(strides).rev().all(|(&d, &s)| check(d, s))
    }
}

pub fn is_c_contiguous(shape: &[usize], strides: &[isize], itemsize: usize) -> bool {
    is_contiguous(shape, strides, itemsize, Order::C)
}

pub fn is_f_contiguous(shape: &[usize], strides: &[isize], itemsize: usize) -> bool {
    is_contiguous(shape, strides, itemsize, Order::Fortran)
}

/// Byte offset of `index` relative to the buffer start
///
/// No bounds checking: every `index[k]` must already satisfy `index[k] < shape[k]`.
pub fn offset_of(base: usize, strides: &[isize], index: &[usize]) -> usize {
    let delta = strides
        .iter()
        .zip(index)
        .fold(0isize, |acc, (&s, &i)| acc.wrapping_add(s.wrapping_mul(i as isize)));
    (base as isize).wrapping_add(delta) as usize
}

/// Lowest and one-past-highest byte touched by the layout, relative to element zero
pub fn byte_extent(shape: &[usize], strides: &[isize], itemsize: usize) -> (isize, isize) {
    if shape.contains(&0) {
        return (0, 0);
    }
    let mut lo = 0isize;
    let mut hi = 0isize;
    for (&dim, &stride) in shape.iter().zip(strides) {
        let span = stride.saturating_mul(dim as isize - 1);
        if span < 0 {
            lo = lo.saturating_add(span);
        } else {
            hi = hi.saturating_add(span);
        }
    }
    (lo, hi.saturating_add(itemsize as isize))
}

/// Whether every reachable element stays inside a buffer of `buffer_len` bytes
pub fn check_strides(
    offset: usize,
    shape: &[usize],
    strides: &[isize],
    itemsize: usize,
    buffer_len: usize,
) -> bool {
    let (lo, hi) = byte_extent(shape, strides, itemsize);
    if lo == hi {
        return offset <= buffer_len;
    }
    let offset = offset as isize;
    offset.saturating_add(lo) >= 0 && offset.saturating_add(hi) <= buffer_len as isize
}

/// Whether the data address and every stride along a non-trivial axis are multiples of `alignment`
pub fn is_aligned(address: usize, shape: &[usize], strides: &[isize], alignment: usize) -> bool {
    if alignment <= 1 {
        return true;
    }
    if address % alignment != 0 {
        return false;
    }
    shape
        .iter()
        .zip(strides)
        .filter(|&(&dim, _)| dim > 1)
        .all(|(_, &stride)| stride.unsigned_abs() % alignment == 0)
}

/// Number of elements, `None` on overflow
pub fn checked_size(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Bytes spanned by a contiguous layout of `shape`, `None` if strides would overflow
pub(crate) fn checked_nbytes(shape: &[usize], itemsize: usize) -> Option<usize> {
    let span = shape
        .iter()
        .try_fold(itemsize, |acc, &d| acc.checked_mul(d.max(1)))?;
    (span <= isize::MAX as usize).then_some(span)
}

/// Decompose a row-major flat index into a multi-index
pub fn unravel(mut flat: usize, shape: &[usize]) -> Dims {
    let mut index: Dims = SmallVec::from_elem(0, shape.len());
    let mut factor = checked_size(shape).unwrap_or(0);
    for (k, &dim) in shape.iter().enumerate() {
        if dim == 0 {
            break;
        }
        factor /= dim;
        if factor == 0 {
            break;
        }
        index[k] = flat / factor;
        flat %= factor;
    }
    index
}

/// Strides that read an array of `src_shape` as if it had `dst_shape`
///
/// Missing leading axes and axes of extent one get stride zero.
pub fn broadcast_strides(
    src_shape: &[usize],
    src_strides: &[isize],
    dst_shape: &[usize],
) -> Result<Strides> {
    let mismatch = || ArrayError::Broadcast {
        src: src_shape.to_vec(),
        dst: dst_shape.to_vec(),
    };
    if src_shape.len() > dst_shape.len() {
        let extra = src_shape.len() - dst_shape.len();
        if src_shape[..extra].iter().any(|&d| d != 1) {
            return Err(mismatch());
        }
        return broadcast_strides(&src_shape[extra..], &src_strides[extra..], dst_shape);
    }
    let lead = dst_shape.len() - src_shape.len();
    let mut out: Strides = SmallVec::from_elem(0, dst_shape.len());
    for (k, &dim) in dst_shape.iter().enumerate().skip(lead) {
        let src_dim = src_shape[k - lead];
        out[k] = if src_dim == dim {
            src_strides[k - lead]
        } else if src_dim == 1 {
            0
        } else {
            return Err(mismatch());
        };
    }
    Ok(out)
}

/// Iterator over the byte offsets of every element, in C or Fortran order
#[derive(Debug, Clone)]
pub struct OffsetIter {
    current: isize,
    dims: Dims,
    strides: Strides,
    index: Dims,
    remaining: usize,
    fortran: bool,
}

impl OffsetIter {
    pub fn new(base: usize, shape: &[usize], strides: &[isize], order: Order) -> Self {
        Self {
            current: base as isize,
            dims: shape.iter().copied().collect(),
            strides: strides.iter().copied().collect(),
            index: SmallVec::from_elem(0, shape.len()),
            remaining: checked_size(shape).unwrap_or(0),
            fortran: order.is_fortran(),
        }
    }

    fn bump(&mut self, axis: usize) -> bool {
        self.index[axis] += 1;
        self.current = self.current.wrapping_add(self.strides[axis]);
        if self.index[axis] < self.dims[axis] {
            return true;
        }
        let back = self.strides[axis].wrapping_mul(self.dims[axis] as isize);
        self.current = self.current.wrapping_sub(back);
        self.index[axis] = 0;
        false
    }
}

impl Iterator for OffsetIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let out = self.current as usize;
        self.remaining -= 1;
        if self.remaining > 0 {
            let nd = self.dims.len();
            if self.fortran {
                for axis in 0..nd {
                    if self.bump(axis) {
                        break;
                    }
                }
            } else {
                for axis in (0..nd).rev() {
                    if self.bump(axis) {
                        break;
                    }
                }
            }
        }
        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for OffsetIter {}
