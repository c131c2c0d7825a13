//! Casting rules and type promotion
//!
//! [`can_cast_safely`] is the fixed safety table over type tags.
//! [`can_cast_to`] refines it with descriptor sizes, and
//! [`smallest_compatible`] picks the narrowest descriptor both inputs cast to.

mod coerce;
mod convert;

pub use coerce::{
    CoercionPolicy, Element, KindCoercion, ScalarKind, convert_to_common_type,
    convert_to_common_type_with, scalar_descr, split_to_common_type,
};
pub use convert::{
    cast_any_to, cast_any_to_with_config, cast_to, cast_to_with_config, has_cast_path,
};
pub(crate) use convert::write_back;

use crate::types::{Descr, TypeKind, TypeTag};
use std::sync::Arc;
use tracing::trace;

/// Whether every value of `from` is representable in `to`
///
/// Total over all registered tags and deterministic. Within one kind (signed,
/// unsigned, float, complex) it is a total order by width.
pub fn can_cast_safely(from: TypeTag, to: TypeTag) -> bool {
    if from == to || from == TypeTag::Bool {
        return true;
    }
    if to == TypeTag::Bool {
        return false;
    }
    if matches!(to, TypeTag::Object | TypeTag::Void) {
        return true;
    }
    if matches!(from, TypeTag::Object | TypeTag::Void) {
        return false;
    }

    let from_size = from.element_size().unwrap_or(0);
    let to_size = to.element_size().unwrap_or(0);
    // a float only holds an integer exactly if it is strictly wider, except at 64 bits
    let float_holds = |to_size: usize| {
        if from_size < 8 {
            to_size > from_size
        } else {
            to_size >= from_size
        }
    };

    match (from.kind(), to.kind()) {
        (TypeKind::Signed, TypeKind::Unsigned) => false,
        (TypeKind::Signed, TypeKind::Signed) => to_size >= from_size,
        (TypeKind::Unsigned, TypeKind::Signed) => to_size > from_size,
        (TypeKind::Unsigned, TypeKind::Unsigned) => to_size >= from_size,
        (TypeKind::Signed | TypeKind::Unsigned, TypeKind::Float) => float_holds(to_size),
        (TypeKind::Signed | TypeKind::Unsigned, TypeKind::Complex) => float_holds(to_size / 2),
        (TypeKind::Float, TypeKind::Float) => to_size >= from_size,
        (TypeKind::Float, TypeKind::Complex) => to_size / 2 >= from_size,
        (TypeKind::Complex, TypeKind::Complex) => to_size >= from_size,
        _ => to > from,
    }
}

/// Descriptor-level safe-cast check
///
/// Adds size rules for flexible targets: `Bytes(n) -> Bytes(m)` needs
/// `m >= n`, a number needs room for its widest decimal rendering. An unsized
/// flexible target accepts anything its tag accepts.
pub fn can_cast_to(from: &Descr, to: &Descr) -> bool {
    if from.equivalent(to) {
        return true;
    }
    if from.has_fields() || to.has_fields() {
        return to.tag() == TypeTag::Object && !to.has_fields();
    }
    if !can_cast_safely(from.tag(), to.tag()) {
        return false;
    }
    if to.itemsize() == 0 {
        return true;
    }
    match to.tag() {
        TypeTag::Bytes => match from.tag() {
            TypeTag::Bytes => to.itemsize() >= from.itemsize(),
            tag => tag
                .rendered_width()
                .is_some_and(|width| to.itemsize() >= width),
        },
        TypeTag::Void => to.itemsize() >= from.itemsize(),
        _ => true,
    }
}

fn flexible_width(descr: &Descr) -> usize {
    match descr.tag() {
        TypeTag::Bytes => descr.itemsize(),
        tag => tag.rendered_width().unwrap_or(0),
    }
}

/// Narrowest descriptor that both `a` and `b` cast to safely
///
/// Equivalent inputs return `a` itself. Byte strings widen to fit the other
/// operand. Structured, raw and object operands fall back to `Object`.
pub fn smallest_compatible(a: &Arc<Descr>, b: &Arc<Descr>) -> Arc<Descr> {
    if a.equivalent(b) {
        return Arc::clone(a);
    }
    let (ta, tb) = (a.tag(), b.tag());
    let result = if a.has_fields()
        || b.has_fields()
        || matches!(ta, TypeTag::Object | TypeTag::Void)
        || matches!(tb, TypeTag::Object | TypeTag::Void)
    {
        Descr::builtin(TypeTag::Object)
    } else if ta == TypeTag::Bytes || tb == TypeTag::Bytes {
        Descr::bytes(flexible_width(a).max(flexible_width(b)))
    } else {
        let start = ta.max(tb);
        let tag = TypeTag::ALL
            .iter()
            .copied()
            .filter(|&t| t >= start && t <= TypeTag::Object)
            .find(|&t| can_cast_safely(ta, t) && can_cast_safely(tb, t))
            .unwrap_or(TypeTag::Object);
        Descr::builtin(tag)
    };
    trace!(a = %a, b = %b, result = %result, "smallest compatible type");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Endian, RecordBuilder};

    fn b(tag: TypeTag) -> Arc<Descr> {
        Descr::builtin(tag)
    }

    #[test]
    fn safety_table_basics() {
        use TypeTag::*;
        assert!(can_cast_safely(Bool, Float16));
        assert!(!can_cast_safely(Int8, Bool));
        assert!(can_cast_safely(Int8, Int16));
        assert!(!can_cast_safely(Int8, UInt64));
        assert!(can_cast_safely(UInt8, Int16));
        assert!(!can_cast_safely(UInt16, Int16));
        assert!(can_cast_safely(Int8, Float16));
        assert!(!can_cast_safely(Int16, Float16));
        assert!(can_cast_safely(Int32, Float64));
        assert!(can_cast_safely(Int64, Float64));
        assert!(!can_cast_safely(Int64, Float32));
        assert!(can_cast_safely(Int16, Complex64));
        assert!(!can_cast_safely(Int32, Complex64));
        assert!(can_cast_safely(Float32, Complex64));
        assert!(!can_cast_safely(Float64, Complex64));
        assert!(!can_cast_safely(Float32, Int64));
        assert!(!can_cast_safely(Complex64, Float64));
        assert!(can_cast_safely(Float64, Object));
        assert!(!can_cast_safely(Object, Float64));
        assert!(can_cast_safely(Int32, Bytes));
        assert!(!can_cast_safely(Bytes, Int32));
        assert!(can_cast_safely(Object, Void));
    }

    #[test]
    fn descriptor_sizes_matter_for_byte_strings() {
        assert!(can_cast_to(&Descr::bytes(3), &Descr::bytes(5)));
        assert!(!can_cast_to(&Descr::bytes(5), &Descr::bytes(3)));
        assert!(can_cast_to(&b(TypeTag::Int32), &Descr::bytes(11)));
        assert!(!can_cast_to(&b(TypeTag::Int32), &Descr::bytes(10)));
        assert!(can_cast_to(&b(TypeTag::Int32), &b(TypeTag::Bytes)));
    }

    #[test]
    fn byte_order_does_not_block_casts() {
        let big = b(TypeTag::Int32).new_with_byte_order(Endian::Big);
        assert!(can_cast_to(&big, &b(TypeTag::Int32)));
        assert!(can_cast_to(&b(TypeTag::Int16), &big));
    }

    #[test]
    fn records_only_cast_to_equivalents_or_object() {
        let rec = RecordBuilder::new()
            .field("a", b(TypeTag::Int32))
            .build()
            .unwrap();
        assert!(can_cast_to(&rec, &rec));
        assert!(can_cast_to(&rec, &b(TypeTag::Object)));
        assert!(!can_cast_to(&rec, &b(TypeTag::Int64)));
        assert!(!can_cast_to(&b(TypeTag::Int8), &rec));
    }

    #[test]
    fn promotion() {
        use TypeTag::*;
        let tag = |x, y| smallest_compatible(&b(x), &b(y)).tag();
        assert_eq!(tag(Int8, UInt8), Int16);
        assert_eq!(tag(Int64, UInt64), Float64);
        assert_eq!(tag(Int16, Float16), Float32);
        assert_eq!(tag(Bool, Int8), Int8);
        assert_eq!(tag(Float64, Complex64), Complex128);
        assert_eq!(tag(UInt32, Int8), Int64);
        assert_eq!(tag(Object, Int8), Object);
    }

    #[test]
    fn promotion_with_byte_strings() {
        let out = smallest_compatible(&Descr::bytes(3), &b(TypeTag::Int32));
        assert_eq!(out.tag(), TypeTag::Bytes);
        assert_eq!(out.itemsize(), 11);
        let out = smallest_compatible(&Descr::bytes(30), &b(TypeTag::Int8));
        assert_eq!(out.itemsize(), 30);
        let out = smallest_compatible(&Descr::bytes(3), &Descr::void(4));
        assert_eq!(out.tag(), TypeTag::Object);
    }

    #[test]
    fn promotion_is_idempotent_and_returns_the_input() {
        let big = b(TypeTag::Float32).new_with_byte_order(Endian::Big);
        assert!(Arc::ptr_eq(&smallest_compatible(&big, &big), &big));
    }
}
