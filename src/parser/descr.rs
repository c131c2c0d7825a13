//! Descriptor parsing

use super::MAX_DEPTH;
use super::primitives::{u8_parser, u32_le, u64_le};
use super::string::parse_string;
use crate::error::ParseError;
use crate::types::{ByteOrder, Descr, Endian, RecordBuilder, TypeTag};
use parsicomb::{ByteCursor, Cursor, Parser};
use std::sync::Arc;

/// Parse a self-describing descriptor
///
/// Layout: tag u8, byte-order char u8, item size u64, alignment u32,
/// field count u32, then per field its name, an optional title (flag u8 +
/// string), its offset u64 and its own descriptor.
pub fn parse_descr<'a>()
-> impl Parser<'a, Cursor = ByteCursor<'a>, Output = Arc<Descr>, Error = ParseError> {
    DescrParser { depth: 0 }
}

struct DescrParser {
    depth: usize,
}

struct FieldEntry {
    name: String,
    title: Option<String>,
    offset: usize,
    descr: Arc<Descr>,
}

impl DescrParser {
    fn field<'a>(
        &self,
        cursor: ByteCursor<'a>,
    ) -> Result<(FieldEntry, ByteCursor<'a>), ParseError> {
        let (name, cursor) = parse_string().parse(cursor)?;
        let (has_title, cursor) = u8_parser().parse(cursor)?;
        let (title, cursor) = if has_title != 0 {
            let (title, cursor) = parse_string().parse(cursor)?;
            (Some(title), cursor)
        } else {
            (None, cursor)
        };
        let (_, offset_position) = cursor.inner();
        let (offset, cursor) = u64_le().parse(cursor)?;
        let offset = usize::try_from(offset).map_err(|_| ParseError::Syntax {
            message: "field offset out of range".into(),
            position: offset_position,
        })?;
        let nested = DescrParser {
            depth: self.depth + 1,
        };
        let (descr, cursor) = nested.parse(cursor)?;
        Ok((
            FieldEntry {
                name,
                title,
                offset,
                descr,
            },
            cursor,
        ))
    }
}

impl<'a> Parser<'a> for DescrParser {
    type Cursor = ByteCursor<'a>;
    type Output = Arc<Descr>;
    type Error = ParseError;

    fn parse(&self, cursor: Self::Cursor) -> Result<(Self::Output, Self::Cursor), Self::Error> {
        let (_, start) = cursor.inner();
        if self.depth > MAX_DEPTH {
            return Err(ParseError::Syntax {
                message: "descriptor nesting too deep".into(),
                position: start,
            });
        }

        let (tag_byte, cursor) = u8_parser().parse(cursor)?;
        let tag = TypeTag::from_u8(tag_byte).ok_or(ParseError::InvalidTypeTag {
            tag: tag_byte,
            position: start,
        })?;
        let (order_byte, cursor) = u8_parser().parse(cursor)?;
        let byteorder =
            ByteOrder::from_char(order_byte as char).ok_or(ParseError::InvalidByteOrder {
                order: order_byte,
                position: start + 1,
            })?;
        let (itemsize, cursor) = u64_le().parse(cursor)?;
        let (alignment, cursor) = u32_le().parse(cursor)?;
        let (nfields, mut cursor) = u32_le().parse(cursor)?;
        let itemsize = usize::try_from(itemsize).map_err(|_| ParseError::Syntax {
            message: "item size out of range".into(),
            position: start + 2,
        })?;

        if nfields > 0 {
            if tag != TypeTag::Void {
                return Err(ParseError::Syntax {
                    message: format!("only raw records can have fields, found {tag:?}").into(),
                    position: start,
                });
            }
            let mut builder = if alignment > 1 {
                RecordBuilder::aligned()
            } else {
                RecordBuilder::new()
            };
            for _ in 0..nfields {
                let (entry, next) = self.field(cursor)?;
                cursor = next;
                builder = builder.field_at(entry.name, entry.descr, entry.offset);
                if let Some(title) = entry.title {
                    builder = builder.title(title);
                }
            }
            let descr = builder
                .itemsize(itemsize)
                .build()
                .map_err(|e| ParseError::Syntax {
                    message: e.to_string().into(),
                    position: start,
                })?;
            return Ok((descr, cursor));
        }

        let descr = match tag {
            TypeTag::Bytes => Descr::bytes(itemsize),
            TypeTag::Void => Descr::void(itemsize),
            tag => {
                let descr = Descr::builtin(tag);
                if descr.itemsize() != itemsize {
                    return Err(ParseError::Syntax {
                        message: format!(
                            "{tag:?} has an item size of {}, found {itemsize}",
                            descr.itemsize()
                        )
                        .into(),
                        position: start + 2,
                    });
                }
                match byteorder {
                    ByteOrder::Little => descr.new_with_byte_order(Endian::Little),
                    ByteOrder::Big => descr.new_with_byte_order(Endian::Big),
                    ByteOrder::Ignore => descr,
                }
            }
        };
        Ok((descr, cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::descr::write_descr;

    fn reparse(descr: &Arc<Descr>) -> Arc<Descr> {
        let mut buf = Vec::new();
        write_descr(&mut buf, descr).unwrap();
        let (parsed, cursor) = parse_descr().parse(ByteCursor::new(&buf)).unwrap();
        assert!(cursor.eos());
        parsed
    }

    #[test]
    fn test_builtin_keeps_byte_order() {
        let big = Descr::builtin(TypeTag::Float32).new_with_byte_order(Endian::Big);
        let parsed = reparse(&big);
        assert_eq!(parsed.byteorder(), ByteOrder::Big);
        assert!(parsed.equivalent(&big));
    }

    #[test]
    fn test_flexible_sizes() {
        assert_eq!(reparse(&Descr::bytes(12)).itemsize(), 12);
        assert_eq!(reparse(&Descr::void(3)).tag(), TypeTag::Void);
    }

    #[test]
    fn test_records_with_titles_and_offsets() {
        let rec = RecordBuilder::aligned()
            .field("a", Descr::builtin(TypeTag::UInt8))
            .title("alpha")
            .field("b", Descr::builtin(TypeTag::Int32))
            .field_at("c", Descr::builtin(TypeTag::Int16), 2)
            .itemsize(12)
            .build()
            .unwrap();
        let parsed = reparse(&rec);
        assert!(parsed.equivalent(&rec));
        assert_eq!(parsed.alignment(), 4);
        assert_eq!(parsed.field("alpha").unwrap().name(), "a");
        assert_eq!(parsed.field("c").unwrap().offset(), 2);
    }

    #[test]
    fn test_invalid_tag_and_order() {
        let bytes = [0x7F, b'<'];
        let err = parse_descr().parse(ByteCursor::new(&bytes)).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidTypeTag {
                tag: 0x7F,
                position: 0
            }
        );

        let bytes = [TypeTag::Int32 as u8, b'?'];
        let err = parse_descr().parse(ByteCursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, ParseError::InvalidByteOrder { order: b'?', .. }));
    }

    #[test]
    fn test_wrong_builtin_size() {
        let mut buf = vec![TypeTag::Int32 as u8, b'<'];
        buf.extend_from_slice(&2u64.to_le_bytes());
        buf.extend_from_slice(&4u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            parse_descr().parse(ByteCursor::new(&buf)),
            Err(ParseError::Syntax { position: 2, .. })
        ));
    }

    /// Record header for a raw record of `itemsize` bytes with one field
    fn one_field_record(itemsize: u64, offset: u64, field: TypeTag) -> Vec<u8> {
        let mut buf = vec![TypeTag::Void as u8, b'|'];
        buf.extend_from_slice(&itemsize.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.push(b'f');
        buf.push(0);
        buf.extend_from_slice(&offset.to_le_bytes());
        write_descr(&mut buf, &Descr::builtin(field)).unwrap();
        buf
    }

    #[test]
    fn test_fields_must_fit_the_record() {
        let fits = one_field_record(8, 4, TypeTag::Int32);
        let (parsed, _) = parse_descr().parse(ByteCursor::new(&fits)).unwrap();
        assert_eq!(parsed.field("f").unwrap().offset(), 4);

        for offset in [5, u64::MAX - 1, u64::MAX] {
            let hostile = one_field_record(8, offset, TypeTag::Int32);
            let err = parse_descr().parse(ByteCursor::new(&hostile)).unwrap_err();
            assert!(
                matches!(err, ParseError::Syntax { position: 0, .. }),
                "offset {offset}: {err:?}"
            );
        }
    }
}
