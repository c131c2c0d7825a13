//! Single-element access by flat or per-axis index

use super::Array;
use crate::error::{ArrayError, Result};
use crate::layout::{offset_of, unravel};
use crate::types::Item;
use crate::types::element::{get_item, set_item};
use smallvec::SmallVec;

fn wrap(index: isize, size: usize) -> Result<usize> {
    let wrapped = if index < 0 {
        index + size as isize
    } else {
        index
    };
    if wrapped < 0 || wrapped as usize >= size {
        return Err(ArrayError::IndexOutOfBounds { index, size });
    }
    Ok(wrapped as usize)
}

impl Array {
    /// Byte offset of the element selected by `index`
    ///
    /// An empty index selects the only element of a size-1 array. A single
    /// index is a flat row-major position; otherwise there must be one index
    /// per axis. Negative indices count from the end.
    pub(crate) fn element_offset(&self, index: &[isize]) -> Result<usize> {
        let nd = self.ndim();
        match index.len() {
            0 => {
                if self.size() != 1 {
                    return Err(ArrayError::NotScalar);
                }
                Ok(self.offset)
            }
            1 if nd != 1 => {
                if nd == 0 {
                    return Err(ArrayError::IncorrectIndexCount { got: 1, ndim: 0 });
                }
                let flat = wrap(index[0], self.size())?;
                Ok(offset_of(self.offset, &self.strides, &unravel(flat, &self.dims)))
            }
            n if n != nd => Err(ArrayError::IncorrectIndexCount { got: n, ndim: nd }),
            _ => {
                let multi: SmallVec<[usize; 8]> = index
                    .iter()
                    .zip(&self.dims)
                    .map(|(&i, &dim)| wrap(i, dim))
                    .collect::<Result<_>>()?;
                Ok(offset_of(self.offset, &self.strides, &multi))
            }
        }
    }

    /// Boxed copy of one element
    ///
    /// ```
    /// use ndstride::{Array, Item};
    ///
    /// let a = Array::from_slice(&[2, 3], &[0i32, 1, 2, 3, 4, 5]).unwrap();
    /// assert_eq!(a.item(&[4]).unwrap(), Item::Int(4));
    /// assert_eq!(a.item(&[-1]).unwrap(), a.item(&[1, 2]).unwrap());
    /// ```
    pub fn item(&self, index: &[isize]) -> Result<Item> {
        let offset = self.element_offset(index)?;
        let storage = self.data.read();
        get_item(&self.descr, &storage, offset)
    }

    /// Store `value` into one element, converting it to the element type
    pub fn item_set(&self, index: &[isize], value: &Item) -> Result<()> {
        self.ensure_writeable()?;
        let offset = self.element_offset(index)?;
        let mut storage = self.data.write();
        set_item(&self.descr, storage.owned_mut()?, offset, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn grid() -> Array {
        Array::from_slice(&[2, 3], &[10i64, 11, 12, 13, 14, 15]).unwrap()
    }

    #[test]
    fn flat_indices_unravel_row_major() {
        let a = grid();
        assert_eq!(a.item(&[4]).unwrap(), a.item(&[1, 1]).unwrap());
        assert_eq!(a.item(&[-1]).unwrap(), a.item(&[1, 2]).unwrap());
        assert_eq!(a.item(&[-6]).unwrap(), Item::Int(10));
    }

    #[test]
    fn flat_indices_follow_strides() {
        let t = grid().transpose(None).unwrap();
        assert_eq!(t.item(&[1]).unwrap(), Item::Int(13));
        assert_eq!(t.item(&[2, 1]).unwrap(), Item::Int(15));
    }

    #[test]
    fn out_of_range_indices() {
        let a = grid();
        let err = a.item(&[6]).unwrap_err();
        assert!(matches!(err, ArrayError::IndexOutOfBounds { index: 6, size: 6 }));
        assert_eq!(err.kind(), ErrorKind::Value);
        assert!(a.item(&[-7]).is_err());
        assert!(matches!(
            a.item(&[0, 3]),
            Err(ArrayError::IndexOutOfBounds { index: 3, size: 3 })
        ));
        assert!(a.item(&[-3, 0]).is_err());
    }

    #[test]
    fn wrong_index_counts() {
        let a = grid();
        assert!(matches!(
            a.item(&[0, 0, 0]),
            Err(ArrayError::IncorrectIndexCount { got: 3, ndim: 2 })
        ));
        assert!(matches!(a.item(&[]), Err(ArrayError::NotScalar)));
        let one = Array::from_slice(&[1, 1], &[7u16]).unwrap();
        assert_eq!(one.item(&[]).unwrap(), Item::UInt(7));
    }

    #[test]
    fn item_set_converts_and_respects_read_only() {
        let mut a = grid();
        a.item_set(&[1, 0], &Item::Float(-3.9)).unwrap();
        assert_eq!(a.item(&[3]).unwrap(), Item::Int(-3));
        a.set_flags(crate::array::FlagsUpdate::writeable(false))
            .unwrap();
        assert!(matches!(
            a.item_set(&[0], &Item::Int(1)),
            Err(ArrayError::ReadOnly)
        ));
    }
}
