//! Boxed item serialization

use crate::types::{Item, ItemTag};
use std::io::{self, Write};

/// Write a tagged item; object handles are written as the value they refer to
pub fn write_item<W: Write>(writer: &mut W, item: &Item) -> io::Result<()> {
    writer.write_all(&[item.tag() as u8])?;
    match item {
        Item::None => {}
        Item::Bool(b) => writer.write_all(&[*b as u8])?,
        Item::Int(i) => writer.write_all(&i.to_le_bytes())?,
        Item::UInt(u) => writer.write_all(&u.to_le_bytes())?,
        Item::Float(f) => writer.write_all(&f.to_le_bytes())?,
        Item::Complex(c) => {
            writer.write_all(&c.re.to_le_bytes())?;
            writer.write_all(&c.im.to_le_bytes())?;
        }
        Item::Bytes(bytes) => {
            writer.write_all(&(bytes.len() as u64).to_le_bytes())?;
            writer.write_all(bytes)?;
        }
        Item::Object(r) => write_item(writer, r.get())?,
        Item::Record(items) => {
            let n = u32::try_from(items.len()).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, "record has too many fields")
            })?;
            writer.write_all(&n.to_le_bytes())?;
            for item in items {
                write_item(writer, item)?;
            }
        }
        Item::List(items) => {
            writer.write_all(&(items.len() as u64).to_le_bytes())?;
            for item in items {
                write_item(writer, item)?;
            }
        }
    }
    Ok(())
}
