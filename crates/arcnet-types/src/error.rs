//! Error types for the type layer.

/// Errors raised by network type codecs, conversions, and definitions.
///
/// Receivers turn these into sentinel reports and drop the call. Senders
/// surface them to the caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    /// The buffer ended before a value was fully read.
    #[error("unexpected end of buffer: needed {needed} bytes, {remaining} left")]
    UnexpectedEnd { needed: usize, remaining: usize },

    /// Bytes were left over after every argument was decoded.
    #[error("{0} trailing bytes after the last argument")]
    TrailingBytes(usize),

    /// A boolean byte was neither 0 nor 1.
    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    /// A string field held invalid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// A sequence or blob is longer than the 32-bit length header allows.
    #[error("length {0} does not fit a 32-bit header")]
    TooLong(usize),

    /// The type has no binary codec (identity references, `unknown`).
    /// A sequence header claims more elements than the frame can hold.
    #[error("sequence of {count} elements cannot fit in {remaining} bytes")]
    CountExceedsBuffer { count: usize, remaining: usize },

    #[error("{0} has no buffer codec")]
    NoCodec(String),

    /// A value of the wrong shape reached a codec or conversion.
    #[error("expected {expected}, got {found}")]
    Mismatch {
        expected: String,
        found: &'static str,
    },

    /// A literal ordinal outside the declared set.
    #[error("{type_name}: unknown ordinal {ordinal}")]
    UnknownOrdinal { type_name: String, ordinal: u64 },

    /// An enum or variant hash that matches no declared member.
    #[error("{type_name}: unknown tag hash {hash:#010x}")]
    UnknownTag { type_name: String, hash: u32 },

    /// A custom conversion failed.
    #[error("{type_name}: {message}")]
    Custom { type_name: String, message: String },

    /// A type constructor was given an inconsistent definition.
    #[error("invalid type definition: {0}")]
    InvalidDefinition(String),
}

/// A [`TypeError`] tied to the argument position that caused it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("argument {index}: {source}")]
pub struct ArgumentError {
    /// Zero-based argument position.
    pub index: usize,
    #[source]
    pub source: TypeError,
}

impl ArgumentError {
    pub fn new(index: usize, source: TypeError) -> Self {
        Self { index, source }
    }
}
