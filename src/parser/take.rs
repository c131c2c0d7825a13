//! Zero-copy take combinator

use parsicomb::{ByteCursor, CodeLoc, Cursor, Parser, ParsicombError};

/// Parser that takes exactly N bytes as a slice of the input
pub struct Take {
    count: usize,
}

impl Take {
    pub fn new(count: usize) -> Self {
        Take { count }
    }
}

impl<'a> Parser<'a> for Take {
    type Cursor = ByteCursor<'a>;
    type Output = &'a [u8];
    type Error = ParsicombError<'a>;

    fn parse(&self, cursor: Self::Cursor) -> Result<(Self::Output, Self::Cursor), Self::Error> {
        let (data, pos) = cursor.inner();
        // a count read from the input may be anything up to u64::MAX
        let end = match pos.checked_add(self.count) {
            Some(end) if end <= data.len() => end,
            _ => return Err(ParsicombError::UnexpectedEndOfFile(CodeLoc::new(data, pos))),
        };

        let next = if end >= data.len() {
            ByteCursor::EndOfFile { data }
        } else {
            ByteCursor::Valid {
                data,
                position: end,
            }
        };
        Ok((&data[pos..end], next))
    }
}

/// Take exactly N bytes without copying them
pub fn take(count: usize) -> Take {
    Take::new(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_zero() {
        let data = b"hello";
        let (slice, cursor) = take(0).parse(ByteCursor::new(data)).unwrap();
        assert!(slice.is_empty());
        assert_eq!(cursor.inner().1, 0);
    }

    #[test]
    fn test_take_chained() {
        let data = b"helloworld";
        let cursor = ByteCursor::new(data);
        let (first, cursor) = take(5).parse(cursor).unwrap();
        let (second, cursor) = take(5).parse(cursor).unwrap();
        assert_eq!(first, b"hello");
        assert_eq!(second, b"world");
        assert!(cursor.eos());
    }

    #[test]
    fn test_take_too_many() {
        let data = b"hi";
        let (_, cursor) = take(1).parse(ByteCursor::new(data)).unwrap();
        let err = take(10).parse(cursor).unwrap_err();
        assert!(matches!(err, ParsicombError::UnexpectedEndOfFile(loc) if loc.position() == 1));

        let (_, cursor) = take(1).parse(ByteCursor::new(data)).unwrap();
        assert!(take(usize::MAX).parse(cursor).is_err());
    }

    #[test]
    fn test_take_is_zero_copy() {
        let data = b"hello";
        let (_, cursor) = take(2).parse(ByteCursor::new(data)).unwrap();
        let (slice, _) = take(3).parse(cursor).unwrap();
        assert!(std::ptr::eq(slice.as_ptr(), data[2..].as_ptr()));
    }
}
