//! String parsing helpers

use super::primitives::u32_le;
use super::take::take;
use crate::error::ParseError;
use parsicomb::{ByteCursor, Cursor, Parser};

/// Parse a u32 length-prefixed UTF-8 string (field names and titles)
pub fn parse_string<'a>()
-> impl Parser<'a, Cursor = ByteCursor<'a>, Output = String, Error = ParseError> {
    StringParser
}

struct StringParser;

impl<'a> Parser<'a> for StringParser {
    type Cursor = ByteCursor<'a>;
    type Output = String;
    type Error = ParseError;

    fn parse(&self, cursor: Self::Cursor) -> Result<(Self::Output, Self::Cursor), Self::Error> {
        let (len, cursor) = u32_le().parse(cursor)?;
        let (_, start) = cursor.inner();
        let (bytes, cursor) = take(len as usize).parse(cursor)?;
        let s = std::str::from_utf8(bytes).map_err(|e| ParseError::InvalidUtf8 {
            position: start + e.valid_up_to(),
        })?;
        Ok((s.to_owned(), cursor))
    }
}
