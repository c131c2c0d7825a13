//! Primitive little-endian parsers built from combinators

use super::take::take;
use parsicomb::map::MapExt;
use parsicomb::{ByteCursor, Parser, ParsicombError, byte::byte};

/// Parse a u8
pub fn u8_parser<'a>()
-> impl Parser<'a, Cursor = ByteCursor<'a>, Output = u8, Error = ParsicombError<'a>> {
    byte()
}

/// Parse a u32 (little-endian)
pub fn u32_le<'a>()
-> impl Parser<'a, Cursor = ByteCursor<'a>, Output = u32, Error = ParsicombError<'a>> {
    take(4).map(|bytes: &[u8]| u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Parse a u64 (little-endian)
pub fn u64_le<'a>()
-> impl Parser<'a, Cursor = ByteCursor<'a>, Output = u64, Error = ParsicombError<'a>> {
    take(8).map(|bytes: &[u8]| u64::from_le_bytes(word(bytes)))
}

/// Parse an i64 (little-endian)
pub fn i64_le<'a>()
-> impl Parser<'a, Cursor = ByteCursor<'a>, Output = i64, Error = ParsicombError<'a>> {
    take(8).map(|bytes: &[u8]| i64::from_le_bytes(word(bytes)))
}

/// Parse an f64 (little-endian)
pub fn f64_le<'a>()
-> impl Parser<'a, Cursor = ByteCursor<'a>, Output = f64, Error = ParsicombError<'a>> {
    take(8).map(|bytes: &[u8]| f64::from_le_bytes(word(bytes)))
}

fn word(bytes: &[u8]) -> [u8; 8] {
    [
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8() {
        let data = &[0x42, 0x43];
        let (val, cursor) = u8_parser().parse(ByteCursor::new(data)).unwrap();
        assert_eq!(val, 0x42);
        let (val, _) = u8_parser().parse(cursor).unwrap();
        assert_eq!(val, 0x43);
    }

    #[test]
    fn test_u32_le() {
        let data = &[0x01, 0x02, 0x03, 0x04];
        let (val, _) = u32_le().parse(ByteCursor::new(data)).unwrap();
        assert_eq!(val, 0x04030201);
    }

    #[test]
    fn test_u64_le() {
        let data = &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let (val, _) = u64_le().parse(ByteCursor::new(data)).unwrap();
        assert_eq!(val, 0x0807060504030201);
    }

    #[test]
    fn test_chained() {
        let mut data = Vec::new();
        data.extend_from_slice(&42u32.to_le_bytes());
        data.extend_from_slice(&(-123i64).to_le_bytes());
        data.extend_from_slice(&2.5f64.to_le_bytes());

        let cursor = ByteCursor::new(&data);
        let (v1, cursor) = u32_le().parse(cursor).unwrap();
        let (v2, cursor) = i64_le().parse(cursor).unwrap();
        let (v3, _) = f64_le().parse(cursor).unwrap();
        assert_eq!((v1, v2, v3), (42, -123, 2.5));
    }

    #[test]
    fn test_short_input() {
        let data = &[1, 2, 3];
        assert!(u32_le().parse(ByteCursor::new(data)).is_err());
    }
}
