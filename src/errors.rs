use nom::error::{ErrorKind, ParseError};

/// Errors that can occur while moving DNS messages to or from their
/// RFC 1035 wire form.
#[derive(Debug, thiserror::Error)]
pub enum DnsWireError {
    /// The input ended before a fixed-size field could be read.
    #[error("truncated input: need at least {needed} bytes, have {available}")]
    TruncatedInput { needed: usize, available: usize },

    /// A declared count or length disagrees with the bytes actually
    /// present, or a name label carries a reserved type.
    #[error("malformed message: {0}")]
    MalformedSection(String),

    /// A name-compression pointer chain came back to an offset it had
    /// already visited.
    #[error("compression pointer loop at offset {offset}")]
    CompressionLoop { offset: usize },

    /// A value does not fit the bits its wire field allocates. Raised
    /// before writing, never fixed up by silent masking.
    #[error("{field} value {value} does not fit in {bits} bits")]
    FieldOverflow {
        field: &'static str,
        value: usize,
        bits: u32,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DnsWireError {
    pub(crate) fn truncated(needed: usize, available: usize) -> Self {
        Self::TruncatedInput { needed, available }
    }
}

// Carried as the error type inside nom's IResult so decode failures keep
// their kind across the parser layer. nom reports a too-short input for a
// fixed-size read as `ErrorKind::Eof`.
impl<'a> ParseError<&'a [u8]> for DnsWireError {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Eof => Self::truncated(input.len() + 1, input.len()),
            other => Self::MalformedSection(format!("unparseable bytes ({:?})", other)),
        }
    }

    fn append(_input: &'a [u8], _kind: ErrorKind, other: Self) -> Self {
        other
    }
}
