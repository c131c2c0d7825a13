//! Boxed item parsing

use super::MAX_DEPTH;
use super::primitives::{f64_le, i64_le, u8_parser, u32_le, u64_le};
use super::take::take;
use crate::error::ParseError;
use crate::types::{Item, ItemTag, ObjectRef};
use num_complex::Complex64;
use parsicomb::{ByteCursor, Cursor, Parser};

/// Parse one tagged item
pub fn parse_item<'a>()
-> impl Parser<'a, Cursor = ByteCursor<'a>, Output = Item, Error = ParseError> {
    ItemParser { depth: 0 }
}

/// Parse `count` items in sequence
pub(crate) fn parse_items<'a>(
    count: usize,
    cursor: ByteCursor<'a>,
) -> Result<(Vec<Item>, ByteCursor<'a>), ParseError> {
    ItemParser { depth: 0 }.sequence(count, cursor)
}

struct ItemParser {
    depth: usize,
}

impl ItemParser {
    fn nested(&self) -> ItemParser {
        ItemParser {
            depth: self.depth + 1,
        }
    }

    fn sequence<'a>(
        &self,
        count: usize,
        mut cursor: ByteCursor<'a>,
    ) -> Result<(Vec<Item>, ByteCursor<'a>), ParseError> {
        let (data, pos) = cursor.inner();
        // every item takes at least its tag byte
        let mut items = Vec::with_capacity(count.min(data.len().saturating_sub(pos)));
        for _ in 0..count {
            let (item, next) = self.parse(cursor)?;
            items.push(item);
            cursor = next;
        }
        Ok((items, cursor))
    }
}

impl<'a> Parser<'a> for ItemParser {
    type Cursor = ByteCursor<'a>;
    type Output = Item;
    type Error = ParseError;

    fn parse(&self, cursor: Self::Cursor) -> Result<(Self::Output, Self::Cursor), Self::Error> {
        let (_, start) = cursor.inner();
        if self.depth > MAX_DEPTH {
            return Err(ParseError::Syntax {
                message: "item nesting too deep".into(),
                position: start,
            });
        }
        let (tag_byte, cursor) = u8_parser().parse(cursor)?;
        let tag = ItemTag::from_u8(tag_byte).ok_or(ParseError::InvalidItemTag {
            tag: tag_byte,
            position: start,
        })?;

        match tag {
            ItemTag::None => Ok((Item::None, cursor)),
            ItemTag::Bool => {
                let (b, cursor) = u8_parser().parse(cursor)?;
                Ok((Item::Bool(b != 0), cursor))
            }
            ItemTag::Int => {
                let (v, cursor) = i64_le().parse(cursor)?;
                Ok((Item::Int(v), cursor))
            }
            ItemTag::UInt => {
                let (v, cursor) = u64_le().parse(cursor)?;
                Ok((Item::UInt(v), cursor))
            }
            ItemTag::Float => {
                let (v, cursor) = f64_le().parse(cursor)?;
                Ok((Item::Float(v), cursor))
            }
            ItemTag::Complex => {
                let (re, cursor) = f64_le().parse(cursor)?;
                let (im, cursor) = f64_le().parse(cursor)?;
                Ok((Item::Complex(Complex64::new(re, im)), cursor))
            }
            ItemTag::Bytes => {
                let (len, cursor) = u64_le().parse(cursor)?;
                let len = usize::try_from(len).unwrap_or(usize::MAX);
                let (bytes, cursor) = take(len).parse(cursor)?;
                Ok((Item::Bytes(bytes.to_vec()), cursor))
            }
            ItemTag::Object => {
                let (inner, cursor) = self.nested().parse(cursor)?;
                Ok((Item::Object(ObjectRef::new(inner)), cursor))
            }
            ItemTag::Record => {
                let (n, cursor) = u32_le().parse(cursor)?;
                let (items, cursor) = self.nested().sequence(n as usize, cursor)?;
                Ok((Item::Record(items), cursor))
            }
            ItemTag::List => {
                let (n, cursor) = u64_le().parse(cursor)?;
                let n = usize::try_from(n).unwrap_or(usize::MAX);
                let (items, cursor) = self.nested().sequence(n, cursor)?;
                Ok((Item::List(items), cursor))
            }
        }
    }
}
