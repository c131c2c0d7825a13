//! Binary parser for the array state format
//!
//! The combinators run over the bytes of a shared [`Bytes`] buffer; a raw
//! payload comes back as a slice of that buffer, so restoring can read the
//! elements in place.

mod array;
mod descr;
mod primitives;
mod string;
mod take;
mod value;

pub use array::parse_state_body;
pub use descr::parse_descr;
pub use value::parse_item;

use crate::error::ParseError;
use crate::state::ArrayState;
use crate::types::{HEADER_SIZE, MAGIC, SUPPORTED_VERSIONS};
use bytes::Bytes;
use parsicomb::{ByteCursor, Cursor, Parser};
use take::take;
use tracing::trace;

/// Deepest nesting of descriptors or items accepted from the input
pub(crate) const MAX_DEPTH: usize = 64;

/// Parse a state record
///
/// Versions 0 and 1 are accepted. Trailing bytes after the payload are
/// rejected.
pub fn parse(bytes: &Bytes) -> Result<ArrayState, ParseError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ParseError::UnexpectedEof {
            position: bytes.len(),
        });
    }
    if &bytes[0..8] != MAGIC {
        return Err(ParseError::InvalidMagic);
    }
    let version = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(ParseError::UnsupportedVersion(version));
    }

    let (_, cursor) = take(HEADER_SIZE).parse(ByteCursor::new(&bytes[..]))?;
    let (state, cursor) = parse_state_body(bytes, version).parse(cursor)?;
    let (data, position) = cursor.inner();
    if position < data.len() {
        return Err(ParseError::Syntax {
            message: format!("{} trailing bytes after the payload", data.len() - position).into(),
            position,
        });
    }
    trace!(version, ndim = state.shape.len(), "parsed array state");
    Ok(state)
}
