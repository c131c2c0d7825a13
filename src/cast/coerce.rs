//! Converting a mixed sequence of arrays and scalars to one common type

use super::{can_cast_to, can_cast_safely, smallest_compatible};
use crate::array::{Array, ArrayFlags};
use crate::error::{ArrayError, Result};
use crate::layout::Order;
use crate::types::{Descr, Item, TypeKind, TypeTag};
use std::sync::Arc;
use tracing::debug;

/// Coercion category of a scalar value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    NoScalar,
    Bool,
    /// Integer known to be non-negative
    IntPos,
    /// Integer that may be negative
    IntNeg,
    Float,
    Complex,
    Object,
}

impl ScalarKind {
    /// Category of a tag with no value information; signed integers count as non-negative
    pub fn of(tag: TypeTag) -> Self {
        match tag.kind() {
            TypeKind::Bool => ScalarKind::Bool,
            TypeKind::Signed | TypeKind::Unsigned => ScalarKind::IntPos,
            TypeKind::Float => ScalarKind::Float,
            TypeKind::Complex => ScalarKind::Complex,
            TypeKind::Object => ScalarKind::Object,
            TypeKind::Bytes | TypeKind::Void => ScalarKind::NoScalar,
        }
    }

    /// Category of a tag holding `value`; a negative signed value is `IntNeg`
    pub fn of_value(tag: TypeTag, value: &Item) -> Self {
        let negative = match value {
            Item::Int(v) => *v < 0,
            Item::Float(v) => *v < 0.0,
            _ => false,
        };
        match Self::of(tag) {
            ScalarKind::IntPos if negative && tag.kind() == TypeKind::Signed => ScalarKind::IntNeg,
            kind => kind,
        }
    }
}

/// Decides whether a scalar can join arrays of another kind without widening them
pub trait CoercionPolicy {
    fn can_coerce_scalar(&self, scalar: TypeTag, needed: TypeTag, kind: ScalarKind) -> bool;
}

/// Default policy: a scalar only forces widening when the array type cannot
/// hold its kind at all (a negative integer into an unsigned array, a float
/// into an integer array, a complex into a real array)
#[derive(Debug, Clone, Copy, Default)]
pub struct KindCoercion;

impl CoercionPolicy for KindCoercion {
    fn can_coerce_scalar(&self, scalar: TypeTag, needed: TypeTag, kind: ScalarKind) -> bool {
        match kind {
            ScalarKind::NoScalar | ScalarKind::Bool | ScalarKind::Object => {
                can_cast_safely(scalar, needed)
            }
            ScalarKind::IntPos => needed >= TypeTag::Int8,
            ScalarKind::IntNeg => needed >= TypeTag::Int8 && needed.kind() != TypeKind::Unsigned,
            ScalarKind::Float => needed >= TypeTag::Float16,
            ScalarKind::Complex => needed >= TypeTag::Complex64,
        }
    }
}

/// One entry of a sequence to convert
#[derive(Debug, Clone, Copy)]
pub enum Element<'a> {
    Array(&'a Array),
    Scalar(&'a Item),
}

impl<'a> From<&'a Array> for Element<'a> {
    fn from(array: &'a Array) -> Self {
        Element::Array(array)
    }
}

impl<'a> From<&'a Item> for Element<'a> {
    fn from(item: &'a Item) -> Self {
        Element::Scalar(item)
    }
}

/// Descriptor a standalone boxed value naturally has
pub fn scalar_descr(item: &Item) -> Arc<Descr> {
    match item {
        Item::Bool(_) => Descr::builtin(TypeTag::Bool),
        Item::Int(_) => Descr::builtin(TypeTag::Int64),
        Item::UInt(_) => Descr::builtin(TypeTag::UInt64),
        Item::Float(_) => Descr::builtin(TypeTag::Float64),
        Item::Complex(_) => Descr::builtin(TypeTag::Complex128),
        Item::Bytes(b) => Descr::bytes(b.len().max(1)),
        Item::None | Item::Object(_) | Item::Record(_) | Item::List(_) => {
            Descr::builtin(TypeTag::Object)
        }
    }
}

/// Resolved common type and whether every input was a scalar
pub(crate) fn resolve_common(
    elements: &[Element<'_>],
    policy: &dyn CoercionPolicy,
) -> Result<(Arc<Descr>, bool)> {
    let mut array_type: Option<Arc<Descr>> = None;
    let mut scalar_type: Option<Arc<Descr>> = None;
    let mut any_negative = false;

    for element in elements {
        match element {
            Element::Array(array) => {
                array_type = Some(match array_type {
                    None => Arc::clone(array.descr()),
                    Some(current) => smallest_compatible(&current, array.descr()),
                });
            }
            Element::Scalar(item) => {
                let descr = scalar_descr(item);
                any_negative |= ScalarKind::of_value(descr.tag(), item) == ScalarKind::IntNeg;
                scalar_type = Some(match scalar_type {
                    None => descr,
                    Some(current) => smallest_compatible(&current, &descr),
                });
            }
        }
    }

    let resolved = match (array_type, scalar_type) {
        (None, None) => return Err(ArrayError::EmptySequence),
        (None, Some(scalar)) => (scalar, true),
        (Some(array), None) => (array, false),
        (Some(array), Some(scalar)) => {
            let mut kind = ScalarKind::of(scalar.tag());
            if kind == ScalarKind::IntPos && any_negative && scalar.kind() == TypeKind::Signed {
                kind = ScalarKind::IntNeg;
            }
            let array_kind = ScalarKind::of(array.tag());
            if array_kind != kind && !policy.can_coerce_scalar(scalar.tag(), array.tag(), kind) {
                (smallest_compatible(&array, &scalar), false)
            } else {
                (array, false)
            }
        }
    };
    debug!(common = %resolved.0, all_scalars = resolved.1, "resolved common type");
    Ok(resolved)
}

fn materialize(element: &Element<'_>, common: &Arc<Descr>, all_scalars: bool) -> Result<Array> {
    match element {
        Element::Scalar(item) => {
            let array = Array::new(Arc::clone(common), &[], Order::C)?;
            array.item_set(&[], item)?;
            Ok(array)
        }
        Element::Array(array) => {
            if !all_scalars && !can_cast_to(array.descr(), common) {
                return Err(ArrayError::UnsafeCast {
                    from: array.descr().to_string(),
                    to: common.to_string(),
                });
            }
            let behaved = array
                .flags()
                .contains(ArrayFlags::C_CONTIGUOUS | ArrayFlags::ALIGNED);
            if behaved && array.descr().equivalent(common) {
                Ok(array.view())
            } else {
                array.astype(Arc::clone(common), Order::C)
            }
        }
    }
}

/// Convert every element to an array of one common type
///
/// Uses the default [`KindCoercion`] policy. Scalars become zero-dimensional
/// arrays and are force-cast; arrays are only cast safely.
pub fn convert_to_common_type(elements: &[Element<'_>]) -> Result<Vec<Array>> {
    convert_to_common_type_with(elements, &KindCoercion)
}

pub fn convert_to_common_type_with(
    elements: &[Element<'_>],
    policy: &dyn CoercionPolicy,
) -> Result<Vec<Array>> {
    if elements.is_empty() {
        return Err(ArrayError::EmptySequence);
    }
    let (common, all_scalars) = resolve_common(elements, policy)?;
    elements
        .iter()
        .map(|e| materialize(e, &common, all_scalars))
        .collect()
}

/// Split an array along its first axis, as the sequence form of common-type conversion
///
/// The pieces are views unless the source is not C contiguous and aligned,
/// in which case each piece is copied to C order.
pub fn split_to_common_type(array: &Array) -> Result<Vec<Array>> {
    if array.ndim() == 0 {
        return Err(ArrayError::value("cannot split a zero-dimensional array"));
    }
    let n = array.shape()[0];
    if n == 0 {
        return Err(ArrayError::EmptySequence);
    }
    let behaved = array
        .flags()
        .contains(ArrayFlags::C_CONTIGUOUS | ArrayFlags::ALIGNED);
    (0..n as isize)
        .map(|i| {
            let piece = array.sub_array(i)?;
            if behaved { Ok(piece) } else { piece.copy(Order::C) }
        })
        .collect()
}

impl Array {
    /// One-dimensional array of the common type of `items`
    ///
    /// ```
    /// use ndstride::{Array, Item, TypeTag};
    ///
    /// let array = Array::from_scalars(&[Item::Int(1), Item::Float(2.5), Item::Int(3)]).unwrap();
    /// assert_eq!(array.descr().tag(), TypeTag::Float64);
    /// assert_eq!(array.shape(), &[3]);
    /// ```
    pub fn from_scalars(items: &[Item]) -> Result<Array> {
        if items.is_empty() {
            return Err(ArrayError::EmptySequence);
        }
        let elements: Vec<Element<'_>> = items.iter().map(Element::Scalar).collect();
        let (common, _) = resolve_common(&elements, &KindCoercion)?;
        let array = Array::new(common, &[items.len()], Order::C)?;
        for (i, item) in items.iter().enumerate() {
            array.item_set(&[i as isize], item)?;
        }
        Ok(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn scalar_kinds() {
        assert_eq!(ScalarKind::of(TypeTag::Int32), ScalarKind::IntPos);
        assert_eq!(
            ScalarKind::of_value(TypeTag::Int64, &Item::Int(-3)),
            ScalarKind::IntNeg
        );
        assert_eq!(
            ScalarKind::of_value(TypeTag::UInt64, &Item::UInt(3)),
            ScalarKind::IntPos
        );
        assert_eq!(ScalarKind::of(TypeTag::Bytes), ScalarKind::NoScalar);
    }

    #[test]
    fn kind_coercion_table() {
        let p = KindCoercion;
        assert!(p.can_coerce_scalar(TypeTag::Int64, TypeTag::Int8, ScalarKind::IntPos));
        assert!(!p.can_coerce_scalar(TypeTag::Int64, TypeTag::UInt8, ScalarKind::IntNeg));
        assert!(!p.can_coerce_scalar(TypeTag::Float64, TypeTag::Int32, ScalarKind::Float));
        assert!(p.can_coerce_scalar(TypeTag::Float64, TypeTag::Float32, ScalarKind::Float));
        assert!(!p.can_coerce_scalar(TypeTag::Complex128, TypeTag::Float64, ScalarKind::Complex));
        assert!(!p.can_coerce_scalar(TypeTag::Bool, TypeTag::Bool, ScalarKind::IntPos));
    }

    #[test]
    fn all_scalars_promote_together() {
        let items = [Item::Int(1), Item::Float(2.5), Item::Int(3)];
        let elements: Vec<Element<'_>> = items.iter().map(Element::from).collect();
        let arrays = convert_to_common_type(&elements).unwrap();
        assert_eq!(arrays.len(), 3);
        for array in &arrays {
            assert_eq!(array.descr().tag(), TypeTag::Float64);
            assert_eq!(array.ndim(), 0);
        }
        assert_eq!(arrays[1].item(&[]).unwrap(), Item::Float(2.5));
    }

    #[test]
    fn empty_sequence_is_a_value_error() {
        let err = convert_to_common_type(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
        assert!(matches!(Array::from_scalars(&[]), Err(ArrayError::EmptySequence)));
    }

    #[test]
    fn scalar_of_same_kind_does_not_widen_array() {
        let small = Array::from_slice(&[3], &[1i8, 2, 3]).unwrap();
        let scalar = Item::Int(7);
        let arrays =
            convert_to_common_type(&[Element::from(&small), Element::from(&scalar)]).unwrap();
        assert_eq!(arrays[0].descr().tag(), TypeTag::Int8);
        assert_eq!(arrays[1].descr().tag(), TypeTag::Int8);
        assert_eq!(arrays[1].item(&[]).unwrap(), Item::Int(7));
    }

    #[test]
    fn float_scalar_widens_integer_array() {
        let ints = Array::from_slice(&[2], &[1i32, 2]).unwrap();
        let scalar = Item::Float(0.5);
        let arrays =
            convert_to_common_type(&[Element::from(&ints), Element::from(&scalar)]).unwrap();
        assert_eq!(arrays[0].descr().tag(), TypeTag::Float64);
        assert_eq!(arrays[0].item(&[1]).unwrap(), Item::Float(2.0));
    }

    #[test]
    fn negative_scalar_widens_unsigned_array() {
        let bytes = Array::from_slice(&[2], &[1u8, 2]).unwrap();
        let scalar = Item::Int(-1);
        let arrays =
            convert_to_common_type(&[Element::from(&bytes), Element::from(&scalar)]).unwrap();
        assert_eq!(arrays[0].descr().tag(), TypeTag::Int64);
    }

    #[test]
    fn splitting_copies_non_contiguous_sources() {
        let base = Array::from_slice(&[2, 3], &[0i16, 1, 2, 3, 4, 5]).unwrap();
        let pieces = split_to_common_type(&base).unwrap();
        assert_eq!(pieces.len(), 2);
        assert!(!pieces[1].owns_data());
        assert_eq!(pieces[1].item(&[0]).unwrap(), Item::Int(3));

        let transposed = base.transpose(None).unwrap();
        let pieces = split_to_common_type(&transposed).unwrap();
        assert_eq!(pieces.len(), 3);
        assert!(pieces[2].owns_data());
        assert_eq!(pieces[2].to_vec::<i16>().unwrap(), vec![2, 5]);

        let scalar = Array::new(Descr::builtin(TypeTag::Int8), &[], Order::C).unwrap();
        assert!(split_to_common_type(&scalar).is_err());
    }
}
