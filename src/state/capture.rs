use super::{ArrayState, Payload};
use crate::array::Array;
use crate::error::Result;
use crate::layout::Order;
use crate::types::{DeepCopy, STATE_VERSION};
use bytes::Bytes;
use std::sync::Arc;
use tracing::trace;

/// State record of `array`
///
/// Descriptors that hold references are captured as one boxed item per
/// element in C order. Everything else is captured as raw bytes in the
/// array's own order, Fortran when the array is Fortran contiguous.
pub fn capture(array: &Array) -> Result<ArrayState> {
    let descr = Arc::clone(array.descr());
    let fortran = array.is_fortran();
    let payload = if descr.uses_list_pickle() {
        Payload::List(array.items()?)
    } else {
        Payload::Bytes(Bytes::from(array.to_bytes(Order::Any)?))
    };
    trace!(
        shape = ?array.shape(),
        descr = %descr,
        fortran,
        list = matches!(payload, Payload::List(_)),
        "captured array state"
    );
    Ok(ArrayState {
        version: STATE_VERSION,
        shape: array.shape().iter().map(|&d| d as u64).collect(),
        descr,
        fortran,
        payload,
    })
}

/// State record of a deep copy of `array`; no reference in it is shared with `array`
pub fn capture_detached(array: &Array, copier: &dyn DeepCopy) -> Result<ArrayState> {
    capture(&array.deep_copy(copier)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CloneDeep, Descr, Item, ObjectRef, RecordBuilder, TypeTag};
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers_capture_as_bytes() {
        let a = Array::from_slice(&[2, 2], &[1u16, 2, 3, 4]).unwrap();
        let state = capture(&a).unwrap();
        assert_eq!(state.version, STATE_VERSION);
        assert_eq!(state.shape, vec![2, 2]);
        assert!(!state.fortran);
        let expected: Vec<u8> = [1u16, 2, 3, 4]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        assert_eq!(state.payload, Payload::Bytes(expected.into()));
    }

    #[test]
    fn fortran_arrays_keep_their_order() {
        let a = Array::from_slice(&[2, 3], &[0u8, 1, 2, 3, 4, 5])
            .unwrap()
            .transpose(None)
            .unwrap();
        let state = capture(&a).unwrap();
        assert!(state.fortran);
        assert_eq!(state.shape, vec![3, 2]);
        assert_eq!(
            state.payload,
            Payload::Bytes(Bytes::from_static(&[0, 1, 2, 3, 4, 5]))
        );
    }

    #[test]
    fn strided_views_capture_in_c_order() {
        let a = Array::from_slice(&[3, 2], &[0u8, 1, 2, 3, 4, 5]).unwrap();
        let column = a.transpose(None).unwrap().sub_array(1).unwrap();
        let state = capture(&column).unwrap();
        assert_eq!(state.payload, Payload::Bytes(Bytes::from_static(&[1, 3, 5])));
    }

    #[test]
    fn objects_capture_as_items() {
        let rec = RecordBuilder::new()
            .field("n", Descr::builtin(TypeTag::Int32))
            .field("o", Descr::builtin(TypeTag::Object))
            .build()
            .unwrap();
        let a = Array::new(rec, &[2], Order::C).unwrap();
        let shared = ObjectRef::new(Item::Bytes(b"x".to_vec()));
        a.item_set(&[1], &Item::Record(vec![Item::Int(7), Item::Object(shared.clone())]))
            .unwrap();

        let state = capture(&a).unwrap();
        let Payload::List(items) = &state.payload else {
            panic!("expected a list payload");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Item::Record(vec![Item::Int(0), Item::None]));

        let detached = capture_detached(&a, &CloneDeep).unwrap();
        let Payload::List(items) = &detached.payload else {
            panic!("expected a list payload");
        };
        let Item::Record(fields) = &items[1] else {
            panic!("expected a record");
        };
        match &fields[1] {
            Item::Object(copy) => {
                assert!(!copy.ptr_eq(&shared));
                assert_eq!(copy.get(), shared.get());
            }
            other => panic!("expected an object, got {other:?}"),
        }
    }
}
