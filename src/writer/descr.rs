//! Descriptor serialization

use crate::types::Descr;
use std::io::{self, Write};

/// Write a descriptor with its byte order and, recursively, its fields
pub fn write_descr<W: Write>(writer: &mut W, descr: &Descr) -> io::Result<()> {
    writer.write_all(&[descr.tag() as u8, descr.byteorder().as_char() as u8])?;
    writer.write_all(&(descr.itemsize() as u64).to_le_bytes())?;
    writer.write_all(&(descr.alignment() as u32).to_le_bytes())?;
    let Some(fields) = descr.fields() else {
        return writer.write_all(&0u32.to_le_bytes());
    };
    writer.write_all(&(fields.len() as u32).to_le_bytes())?;
    for field in fields {
        write_str(writer, field.name())?;
        match field.title() {
            Some(title) => {
                writer.write_all(&[1])?;
                write_str(writer, title)?;
            }
            None => writer.write_all(&[0])?,
        }
        writer.write_all(&(field.offset() as u64).to_le_bytes())?;
        write_descr(writer, field.descr())?;
    }
    Ok(())
}

fn write_str<W: Write>(writer: &mut W, s: &str) -> io::Result<()> {
    let len = u32::try_from(s.len()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "field name longer than 4 GiB")
    })?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Endian, RecordBuilder, TypeTag};

    #[test]
    fn test_write_builtin() {
        let descr = Descr::builtin(TypeTag::Int64).new_with_byte_order(Endian::Big);
        let mut buf = Vec::new();
        write_descr(&mut buf, &descr).unwrap();
        assert_eq!(buf.len(), 18);
        assert_eq!(buf[0], TypeTag::Int64 as u8);
        assert_eq!(buf[1], b'>');
        assert_eq!(u64::from_le_bytes(buf[2..10].try_into().unwrap()), 8);
        assert_eq!(&buf[14..18], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_write_record() {
        let rec = RecordBuilder::new()
            .field("x", Descr::builtin(TypeTag::UInt8))
            .title("ex")
            .build()
            .unwrap();
        let mut buf = Vec::new();
        write_descr(&mut buf, &rec).unwrap();
        assert_eq!(buf[0], TypeTag::Void as u8);
        assert_eq!(u32::from_le_bytes(buf[14..18].try_into().unwrap()), 1);
        // name, title flag, title, offset, nested descriptor
        assert_eq!(buf.len(), 18 + (4 + 1) + 1 + (4 + 2) + 8 + 18);
    }
}
