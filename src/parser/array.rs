//! Array state body parsing

use super::primitives::{u8_parser, u64_le};
use super::take::take;
use super::descr::parse_descr;
use super::value::parse_items;
use crate::error::ParseError;
use crate::state::{ArrayState, Payload, PayloadTag};
use bytes::Bytes;
use parsicomb::{ByteCursor, Cursor, Parser, ntimes};

/// Parse the state body that follows the header
///
/// Layout: ndim u8, ndim extents u64, descriptor, Fortran flag u8, payload
/// tag u8, then either a u64 byte count and the raw bytes or a u64 item
/// count and the items. The cursor must run over `source`; raw bytes come
/// back as a slice of it, not a copy.
pub fn parse_state_body<'a>(
    source: &'a Bytes,
    version: u32,
) -> impl Parser<'a, Cursor = ByteCursor<'a>, Output = ArrayState, Error = ParseError> {
    StateBodyParser { source, version }
}

struct StateBodyParser<'s> {
    source: &'s Bytes,
    version: u32,
}

impl StateBodyParser<'_> {
    fn share(&self, slice: &[u8]) -> Bytes {
        let start = self.source.as_ptr() as usize;
        let at = slice.as_ptr() as usize;
        if slice.is_empty() || at < start || at + slice.len() > start + self.source.len() {
            return Bytes::copy_from_slice(slice);
        }
        self.source.slice_ref(slice)
    }
}

impl<'a> Parser<'a> for StateBodyParser<'a> {
    type Cursor = ByteCursor<'a>;
    type Output = ArrayState;
    type Error = ParseError;

    fn parse(&self, cursor: Self::Cursor) -> Result<(Self::Output, Self::Cursor), Self::Error> {
        let (ndim, cursor) = u8_parser().parse(cursor)?;
        let (shape, cursor) = ntimes(ndim as usize, u64_le()).parse(cursor)?;
        let (descr, cursor) = parse_descr().parse(cursor)?;
        let (fortran, cursor) = u8_parser().parse(cursor)?;

        let (_, tag_position) = cursor.inner();
        let (tag_byte, cursor) = u8_parser().parse(cursor)?;
        let tag = PayloadTag::from_u8(tag_byte).ok_or(ParseError::InvalidPayloadTag {
            tag: tag_byte,
            position: tag_position,
        })?;
        let (len, cursor) = u64_le().parse(cursor)?;
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        let (payload, cursor) = match tag {
            PayloadTag::Bytes => {
                let (bytes, cursor) = take(len).parse(cursor)?;
                (Payload::Bytes(self.share(bytes)), cursor)
            }
            PayloadTag::List => {
                let (items, cursor) = parse_items(len, cursor)?;
                (Payload::List(items), cursor)
            }
        };

        Ok((
            ArrayState {
                version: self.version,
                shape,
                descr,
                fortran: fortran != 0,
                payload,
            },
            cursor,
        ))
    }
}
