//! Serialization of array states

pub(crate) mod array;
pub(crate) mod descr;
pub(crate) mod value;

pub use array::write_state_body;
pub use descr::write_descr;
pub use value::write_item;

use crate::state::ArrayState;
use crate::types::MAGIC;
use std::io::{self, Write};

/// Write a state record: header, then the body
pub fn write<W: Write>(writer: &mut W, state: &ArrayState) -> io::Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_all(&state.version.to_le_bytes())?;
    writer.write_all(&0u32.to_le_bytes())?; // flags (reserved)
    write_state_body(writer, state)
}

/// Write a state record to bytes
pub fn to_bytes(state: &ArrayState) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    write(&mut buf, state)?;
    Ok(buf)
}
