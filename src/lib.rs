//! ndstride - strided, typed n-dimensional arrays
//!
//! An [`Array`] is a descriptor, a shape, signed byte strides and an offset
//! into reference-counted storage. Views share the storage with the array
//! they come from; copies, casts and resizes own theirs.
//!
//! # Features
//!
//! - C, Fortran and arbitrary strided layouts, including negative strides
//! - Builtin numeric, byte-string, object and structured record elements
//! - A fixed casting-safety table and promotion to a common type
//! - Flag bookkeeping for writeability, alignment and update-if-copy stand-ins
//! - Byte-exact state capture and restore with byte swapping on read
//!
//! # Example
//!
//! ```rust
//! use ndstride::{Array, Descr, Item, Order, RecordBuilder, TypeTag, state};
//!
//! let point = RecordBuilder::aligned()
//!     .field("id", Descr::builtin(TypeTag::Int32))
//!     .field("x", Descr::builtin(TypeTag::Float64))
//!     .build()
//!     .unwrap();
//! let points = Array::new(point, &[2], Order::C).unwrap();
//! points
//!     .item_set(&[1], &Item::Record(vec![Item::Int(7), Item::Float(0.5)]))
//!     .unwrap();
//!
//! let x = points.field("x").unwrap();
//! assert_eq!(x.to_vec::<f64>().unwrap(), vec![0.0, 0.5]);
//!
//! let bytes = state::dumps(&points).unwrap();
//! let restored = state::loads(bytes.into()).unwrap();
//! assert_eq!(restored.to_list().unwrap(), points.to_list().unwrap());
//! ```

pub mod array;
pub mod cast;
pub mod config;
pub mod error;
pub mod layout;
pub mod parser;
pub mod state;
pub(crate) mod storage;
pub mod types;
pub mod writer;

#[cfg(feature = "ndarray")]
pub mod ndarray_ext;

// Re-export common types at crate root
pub use array::{Array, ArrayFlags, Base, FlagsUpdate, UpdateIfCopy};
pub use cast::{
    CoercionPolicy, Element, KindCoercion, ScalarKind, can_cast_safely, can_cast_to, cast_any_to,
    cast_to, convert_to_common_type, has_cast_path, smallest_compatible,
};
pub use config::{Config, MAX_DIMS};
pub use error::{ArrayError, ErrorKind, ParseError, Result};
pub use layout::Order;
pub use state::{ArrayState, Payload, capture, dumps, loads, restore};
pub use types::{
    ByteOrder, CloneDeep, DeepCopy, Descr, Endian, Item, ObjectRef, RecordBuilder, TypeTag,
};

#[cfg(feature = "ndarray")]
pub use ndarray_ext::NdarrayError;
