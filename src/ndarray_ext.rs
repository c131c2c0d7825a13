//! ndarray integration
//!
//! Conversions between [`Array`] and ndarray's `ArrayD`, plus a borrowed
//! `ArrayViewD` over an array's storage when its layout allows one.
//!
//! Enable with the `ndarray` feature flag.

use crate::array::Array;
use crate::error::ArrayError;
use crate::layout::byte_extent;
use crate::types::{NativeType, TypeTag};
use ndarray::{ArrayD, ArrayViewD, IxDyn, ShapeBuilder};
use thiserror::Error;

/// Error type for ndarray conversions
#[derive(Debug, Error)]
pub enum NdarrayError {
    /// Element type differs from the requested Rust type
    #[error("element type mismatch: expected {expected:?}, got {actual}")]
    TypeMismatch { expected: TypeTag, actual: String },

    /// Storage cannot be borrowed as a typed ndarray view
    #[error("cannot borrow array as an ndarray view: {0}")]
    Layout(&'static str),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Array(#[from] ArrayError),
}

impl Array {
    /// Owned C-ordered array holding the elements of `arr`
    pub fn from_ndarray<T: NativeType>(arr: &ArrayD<T>) -> Result<Self, NdarrayError> {
        let array = match arr.as_slice() {
            Some(values) => Array::from_slice(arr.shape(), values)?,
            None => {
                let values: Vec<T> = arr.iter().copied().collect();
                Array::from_slice(arr.shape(), &values)?
            }
        };
        Ok(array)
    }

    /// Owned ndarray copy of the elements
    ///
    /// The element type must be `T` exactly; the byte order may differ.
    pub fn to_ndarray<T: NativeType>(&self) -> Result<ArrayD<T>, NdarrayError> {
        self.check_type::<T>()?;
        let values = self.to_vec::<T>()?;
        Ok(ArrayD::from_shape_vec(IxDyn(self.shape()), values)?)
    }

    /// Run `f` on a zero-copy ndarray view of the elements
    ///
    /// Needs native byte order, aligned storage and non-negative strides that
    /// are whole multiples of the element size. The storage stays read-locked
    /// while `f` runs.
    pub fn with_ndarray_view<T, R>(
        &self,
        f: impl FnOnce(ArrayViewD<'_, T>) -> R,
    ) -> Result<R, NdarrayError>
    where
        T: NativeType,
    {
        self.check_type::<T>()?;
        if !self.descr().is_native() {
            return Err(NdarrayError::Layout("byte order is not native"));
        }
        if !self.is_aligned() {
            return Err(NdarrayError::Layout("data is not aligned"));
        }
        let size = std::mem::size_of::<T>();
        let mut strides = Vec::with_capacity(self.ndim());
        for &stride in self.strides() {
            if stride < 0 || stride as usize % size != 0 {
                return Err(NdarrayError::Layout(
                    "strides must be non-negative multiples of the element size",
                ));
            }
            strides.push(stride as usize / size);
        }
        let shape = IxDyn(self.shape()).strides(IxDyn(&strides));
        if self.size() == 0 {
            let empty: &[T] = &[];
            return Ok(f(ArrayViewD::from_shape(shape, empty)?));
        }

        let storage = self.buffer().read();
        let (_, hi) = byte_extent(self.shape(), self.strides(), size);
        let start = self.byte_offset();
        let bytes = storage
            .bytes()
            .get(start..start + hi as usize)
            .ok_or(NdarrayError::Layout("strides reach past the buffer"))?;
        let elements: &[T] = bytemuck::try_cast_slice(bytes)
            .map_err(|_| NdarrayError::Layout("data is not aligned"))?;
        Ok(f(ArrayViewD::from_shape(shape, elements)?))
    }

    fn check_type<T: NativeType>(&self) -> Result<(), NdarrayError> {
        if self.descr().tag() != T::TAG || self.descr().has_fields() {
            return Err(NdarrayError::TypeMismatch {
                expected: T::TAG,
                actual: self.descr().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Order;
    use crate::types::{Descr, Endian};
    use ndarray::array;

    #[test]
    fn roundtrip_2d_i32() {
        let arr = array![[1i32, 2, 3], [4, 5, 6]].into_dyn();
        let a = Array::from_ndarray(&arr).unwrap();
        assert_eq!(a.shape(), &[2, 3]);
        assert_eq!(a.descr().tag(), TypeTag::Int32);
        let back: ArrayD<i32> = a.to_ndarray().unwrap();
        assert_eq!(arr, back);
    }

    #[test]
    fn non_standard_layouts_are_copied_in_logical_order() {
        let arr = array![[1u8, 2], [3, 4]].reversed_axes().into_dyn();
        let a = Array::from_ndarray(&arr).unwrap();
        assert!(a.is_c_contiguous());
        assert_eq!(a.to_vec::<u8>().unwrap(), vec![1, 3, 2, 4]);
    }

    #[test]
    fn type_mismatch_error() {
        let a = Array::from_slice(&[2], &[1.0f32, 2.0]).unwrap();
        let result: Result<ArrayD<f64>, _> = a.to_ndarray();
        assert!(matches!(result, Err(NdarrayError::TypeMismatch { .. })));
    }

    #[test]
    fn views_follow_strides() {
        let a = Array::from_slice(&[2, 3], &[0i64, 1, 2, 3, 4, 5]).unwrap();
        let t = a.transpose(None).unwrap();
        let sum = t
            .with_ndarray_view(|v: ArrayViewD<'_, i64>| {
                assert_eq!(v.shape(), &[3, 2]);
                assert_eq!(v[[2, 1]], 5);
                v.sum()
            })
            .unwrap();
        assert_eq!(sum, 15);

        let column = t.sub_array(1).unwrap();
        let values = column
            .with_ndarray_view(|v: ArrayViewD<'_, i64>| v.iter().copied().collect::<Vec<_>>())
            .unwrap();
        assert_eq!(values, vec![1, 4]);
    }

    #[test]
    fn views_need_native_order() {
        let a = Array::from_slice(&[2], &[1u32, 2])
            .unwrap()
            .to_byte_order(Endian::Swap)
            .unwrap();
        assert!(matches!(
            a.with_ndarray_view(|_: ArrayViewD<'_, u32>| ()),
            Err(NdarrayError::Layout(_))
        ));
        assert_eq!(a.to_ndarray::<u32>().unwrap(), array![1u32, 2].into_dyn());

        let empty = Array::new(Descr::builtin(TypeTag::Float64), &[0, 3], Order::C).unwrap();
        let len = empty
            .with_ndarray_view(|v: ArrayViewD<'_, f64>| v.len())
            .unwrap();
        assert_eq!(len, 0);
    }
}
