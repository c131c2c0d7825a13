//! Array state body serialization

use super::descr::write_descr;
use super::value::write_item;
use crate::state::{ArrayState, Payload};
use std::io::{self, Write};

/// Write shape, descriptor, Fortran flag and payload
pub fn write_state_body<W: Write>(writer: &mut W, state: &ArrayState) -> io::Result<()> {
    let ndim = u8::try_from(state.shape.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many dimensions"))?;
    writer.write_all(&[ndim])?;
    for dim in &state.shape {
        writer.write_all(&dim.to_le_bytes())?;
    }
    write_descr(writer, &state.descr)?;
    writer.write_all(&[state.fortran as u8, state.payload.tag() as u8])?;
    match &state.payload {
        Payload::Bytes(bytes) => {
            writer.write_all(&(bytes.len() as u64).to_le_bytes())?;
            writer.write_all(bytes)?;
        }
        Payload::List(items) => {
            writer.write_all(&(items.len() as u64).to_le_bytes())?;
            for item in items {
                write_item(writer, item)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PayloadTag;
    use crate::types::{Descr, TypeTag};
    use bytes::Bytes;

    #[test]
    fn test_write_body_layout() {
        let state = ArrayState {
            version: 1,
            shape: vec![3, 1],
            descr: Descr::builtin(TypeTag::Int8),
            fortran: true,
            payload: Payload::Bytes(Bytes::from_static(&[1, 2, 3])),
        };
        let mut buf = Vec::new();
        write_state_body(&mut buf, &state).unwrap();

        assert_eq!(buf[0], 2);
        assert_eq!(u64::from_le_bytes(buf[1..9].try_into().unwrap()), 3);
        assert_eq!(u64::from_le_bytes(buf[9..17].try_into().unwrap()), 1);
        let after_descr = 17 + 18;
        assert_eq!(buf[after_descr], 1);
        assert_eq!(buf[after_descr + 1], PayloadTag::Bytes as u8);
        assert_eq!(&buf[buf.len() - 3..], &[1, 2, 3]);
    }
}
