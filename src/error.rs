//! Error types for ndstride

use crate::types::TypeTag;
use parsicomb::{CodeLoc, ErrorLeaf, ErrorNode, ParsicombError};
use std::borrow::Cow;
use thiserror::Error;

/// Crate-wide result alias
pub type Result<T, E = ArrayError> = std::result::Result<T, E>;

/// Abstract class of an [`ArrayError`]
///
/// Callers that only care about the broad failure category (bad argument,
/// impossible conversion, out of memory) match on this instead of the
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad shape, index, argument cardinality or state version
    Value,
    /// No cast path, wrong payload kind
    Type,
    /// Allocation failure
    Memory,
}

/// Errors raised by array construction, casting, access and state restore
#[derive(Debug, Error)]
pub enum ArrayError {
    #[error("maximum supported dimension for an array is {max}, found {ndim}")]
    TooManyDims { ndim: usize, max: usize },

    #[error("data-type must have a non-zero item size")]
    ZeroItemSize,

    #[error("strides are not compatible with a buffer of {buffer_len} bytes")]
    InvalidStrides { buffer_len: usize },

    #[error("expected {expected} {what}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("shape mismatch: {src:?} cannot be broadcast to {dst:?}")]
    Broadcast { src: Vec<usize>, dst: Vec<usize> },

    #[error("index {index} is out of bounds for size {size}")]
    IndexOutOfBounds { index: isize, size: usize },

    #[error("incorrect number of indices for array: got {got}, array has {ndim} dimensions")]
    IncorrectIndexCount { got: usize, ndim: usize },

    #[error("can only convert an array of size 1 to a scalar")]
    NotScalar,

    #[error("field of {field_size} bytes at offset {offset} does not fit an item of {itemsize} bytes")]
    FieldOutOfRange {
        offset: usize,
        field_size: usize,
        itemsize: usize,
    },

    #[error("cannot resize this array: {0}")]
    Resize(&'static str),

    #[error("{0}")]
    Flags(&'static str),

    #[error("array is read-only")]
    ReadOnly,

    #[error("can't handle version {0} of array state")]
    UnsupportedVersion(u32),

    #[error("zero-length sequence")]
    EmptySequence,

    #[error("{0}")]
    InvalidValue(Cow<'static, str>),

    #[error("cannot cast from {from} to {to}")]
    NoCastPath { from: String, to: String },

    #[error("cannot safely cast array data from {from} to {to}")]
    UnsafeCast { from: String, to: String },

    #[error("cannot store {value} in an element of type {tag:?}")]
    ItemMismatch { value: &'static str, tag: TypeTag },

    #[error("{0}")]
    WrongKind(Cow<'static, str>),

    #[error("could not allocate {bytes} bytes")]
    Memory { bytes: usize },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ArrayError {
    /// Abstract error class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArrayError::NoCastPath { .. }
            | ArrayError::UnsafeCast { .. }
            | ArrayError::ItemMismatch { .. }
            | ArrayError::WrongKind(_) => ErrorKind::Type,
            ArrayError::Memory { .. } => ErrorKind::Memory,
            ArrayError::Parse(e) => e.kind(),
            _ => ErrorKind::Value,
        }
    }

    pub(crate) fn value(message: impl Into<Cow<'static, str>>) -> Self {
        ArrayError::InvalidValue(message.into())
    }

    pub(crate) fn wrong_kind(message: impl Into<Cow<'static, str>>) -> Self {
        ArrayError::WrongKind(message.into())
    }
}

/// Errors raised while decoding a serialized array state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected end of input at position {position}")]
    UnexpectedEof { position: usize },

    #[error("invalid magic bytes, not an ndstride state record")]
    InvalidMagic,

    #[error("can't handle version {0} of array state")]
    UnsupportedVersion(u32),

    #[error("invalid type tag 0x{tag:02X} at position {position}")]
    InvalidTypeTag { tag: u8, position: usize },

    #[error("invalid byte order 0x{order:02X} at position {position}")]
    InvalidByteOrder { order: u8, position: usize },

    #[error("invalid item tag 0x{tag:02X} at position {position}")]
    InvalidItemTag { tag: u8, position: usize },

    #[error("invalid payload tag 0x{tag:02X} at position {position}")]
    InvalidPayloadTag { tag: u8, position: usize },

    #[error("invalid UTF-8 at position {position}")]
    InvalidUtf8 { position: usize },

    #[error("{message} at position {position}")]
    Syntax {
        message: Cow<'static, str>,
        position: usize,
    },
}

impl ParseError {
    /// Position in the input where decoding stopped
    pub fn position(&self) -> usize {
        match self {
            ParseError::UnexpectedEof { position }
            | ParseError::InvalidTypeTag { position, .. }
            | ParseError::InvalidByteOrder { position, .. }
            | ParseError::InvalidItemTag { position, .. }
            | ParseError::InvalidPayloadTag { position, .. }
            | ParseError::InvalidUtf8 { position }
            | ParseError::Syntax { position, .. } => *position,
            ParseError::InvalidMagic => 0,
            ParseError::UnsupportedVersion(_) => crate::state::MAGIC.len(),
        }
    }

    /// Abstract error class; a payload of the wrong kind is a type error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::InvalidPayloadTag { .. } => ErrorKind::Type,
            _ => ErrorKind::Value,
        }
    }
}

impl<'a> From<ParsicombError<'a>> for ParseError {
    fn from(e: ParsicombError<'a>) -> Self {
        match e {
            ParsicombError::UnexpectedEndOfFile(loc) => ParseError::UnexpectedEof {
                position: loc.position(),
            },
            ParsicombError::SyntaxError { message, loc } => ParseError::Syntax {
                message: Cow::Owned(message.into_owned()),
                position: loc.position(),
            },
            other => {
                let position = other.loc().position();
                ParseError::Syntax {
                    message: other.to_string().into(),
                    position,
                }
            }
        }
    }
}

impl<'a> ErrorLeaf<'a> for ParseError {
    type Element = u8;

    fn loc(&self) -> CodeLoc<'a, Self::Element> {
        // the input is not kept; `position()` carries the offset
        CodeLoc::new(&[], 0)
    }
}

impl<'a> ErrorNode<'a> for ParseError {
    type Element = u8;

    fn likely_error(&self) -> &dyn ErrorLeaf<'a, Element = Self::Element> {
        self
    }
}
