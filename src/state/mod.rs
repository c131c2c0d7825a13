//! Portable array state
//!
//! An [`ArrayState`] is the five-part record an array is saved as: version,
//! shape, descriptor, Fortran flag and payload. [`capture`] produces one and
//! [`restore`] rebuilds an array from it; [`dumps`] and [`loads`] add the
//! binary framing of [`crate::writer`] and [`crate::parser`].

mod capture;
mod restore;

pub use crate::types::{HEADER_SIZE, MAGIC, STATE_VERSION, SUPPORTED_VERSIONS};
pub use capture::{capture, capture_detached};
pub use restore::restore;

use crate::array::Array;
use crate::error::Result;
use crate::types::{Descr, Item};
use crate::{parser, writer};
use bytes::Bytes;
use std::sync::Arc;

/// Element data of a captured array
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw element bytes in the array's storage order
    Bytes(Bytes),
    /// One boxed value per element in C order, for descriptors that hold references
    List(Vec<Item>),
}

impl Payload {
    pub fn tag(&self) -> PayloadTag {
        match self {
            Payload::Bytes(_) => PayloadTag::Bytes,
            Payload::List(_) => PayloadTag::List,
        }
    }
}

/// Payload wire tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PayloadTag {
    Bytes = 0x01,
    List = 0x02,
}

impl PayloadTag {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(PayloadTag::Bytes),
            0x02 => Some(PayloadTag::List),
            _ => None,
        }
    }
}

/// Full state of an array
#[derive(Debug, Clone)]
pub struct ArrayState {
    pub version: u32,
    pub shape: Vec<u64>,
    pub descr: Arc<Descr>,
    /// Payload bytes are in Fortran order
    pub fortran: bool,
    pub payload: Payload,
}

impl ArrayState {
    /// Number of elements the shape describes, `None` on overflow
    pub fn size(&self) -> Option<u64> {
        self.shape.iter().try_fold(1u64, |acc, &d| acc.checked_mul(d))
    }
}

impl Array {
    /// New array rebuilt from `state`
    pub fn from_state(state: ArrayState) -> Result<Array> {
        restore::build(state)
    }
}

/// Serialize an array to the binary state format
///
/// ```
/// use ndstride::{Array, state};
///
/// let a = Array::from_slice(&[2, 2], &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
/// let bytes = state::dumps(&a).unwrap();
/// let b = state::loads(bytes.into()).unwrap();
/// assert_eq!(b.to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
/// ```
pub fn dumps(array: &Array) -> Result<Vec<u8>> {
    Ok(writer::to_bytes(&capture(array)?)?)
}

/// Rebuild an array from the binary state format
///
/// The payload is sliced out of `data` without copying; when no byte
/// swapping or realignment is needed the array reads it in place.
pub fn loads(data: Bytes) -> Result<Array> {
    Array::from_state(parser::parse(&data)?)
}
