use core::fmt;
use thiserror::Error as ThisError;

#[derive(Clone, Debug)]
struct Chained {
    kind: ErrorKind,
    position: Option<usize>,
    src: Option<Error>,
}

/// Represents an error while decoding an SMF file.
///
/// This type wraps an [`ErrorKind`](enum.ErrorKind.html), the absolute byte offset at which the
/// failure was detected (when known) and the underlying error that caused it, if any.
/// Errors raised deep inside the decoder are wrapped with context as they bubble up, so the
/// outermost `kind` describes *what* was being read and [`root_kind`](#method.root_kind)
/// describes *why* it failed.
#[derive(Clone)]
pub struct Error {
    inner: Box<Chained>,
}
impl Error {
    /// An error with no position or cause.
    #[inline]
    pub fn new(kind: ErrorKind) -> Error {
        Error::from(kind)
    }

    /// Create a new error that occurred at the given absolute byte offset.
    #[inline]
    pub fn at(kind: ErrorKind, position: usize) -> Error {
        Error {
            inner: Box::new(Chained {
                kind,
                position: Some(position),
                src: None,
            }),
        }
    }

    /// What went wrong at this level of the chain.
    #[inline]
    pub fn kind(&self) -> &ErrorKind {
        &self.inner.kind
    }

    /// The kind of the innermost error in the chain, ie. the original cause.
    pub fn root_kind(&self) -> &ErrorKind {
        let mut err = self;
        while let Some(src) = err.source() {
            err = src;
        }
        err.kind()
    }

    /// The absolute byte offset into the input at which the error was detected.
    ///
    /// Context errors inherit the position of the error they wrap.
    pub fn position(&self) -> Option<usize> {
        self.inner
            .position
            .or_else(|| self.source().and_then(Error::position))
    }

    /// The error this one adds context to.
    #[inline]
    pub fn source(&self) -> Option<&Error> {
        self.inner.src.as_ref()
    }

    /// Attach a position to an error that has none yet.
    pub(crate) fn or_at(mut self, position: usize) -> Error {
        if self.position().is_none() {
            self.inner.position = Some(position);
        }
        self
    }

    #[inline]
    fn chain_ctx(self, ctx: ErrorKind) -> Error {
        Error {
            inner: Box::new(Chained {
                kind: ctx,
                position: None,
                src: Some(self),
            }),
        }
    }
}
impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Box::new(Chained {
                kind,
                position: None,
                src: None,
            }),
        }
    }
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self.kind(), f)?;
        if let Some(pos) = self.inner.position {
            write!(f, " (at byte {})", pos)?;
        }
        Ok(())
    }
}
impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)?;
        let mut maybe_src = self.source();
        while let Some(src) = maybe_src {
            writeln!(f)?;
            write!(f, "  caused by: {}", src)?;
            maybe_src = src.source();
        }
        Ok(())
    }
}
impl std::error::Error for Error {
    #[inline]
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// The type of error that occurred while decoding.
///
/// Every kind is fatal for the track being decoded: once an event fails to decode, the byte
/// alignment of everything after it is unknown.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ErrorKind {
    /// A fixed-size field or message did not have its protocol-mandated size.
    #[error("expected {expected} bytes, found {found}")]
    Length { expected: usize, found: usize },

    /// A meta event declared a length that its type does not allow.
    #[error("meta event 0x{meta_type:02X} declares length {found}, expected {expected}")]
    EventLength {
        meta_type: u8,
        expected: usize,
        found: u64,
    },

    /// A text meta event carried a byte outside of 7-bit ASCII.
    #[error("non-ascii byte 0x{byte:02X} at offset {offset} of text event")]
    EventText { byte: u8, offset: usize },

    /// A decoded field fell outside its legal numeric range.
    #[error("{what} out of range: {value}")]
    Range { what: &'static str, value: i128 },

    /// Bits that the format reserves as zero were set.
    #[error("reserved bits set in {field}: 0x{bits:02X}")]
    MalformedReservedBits { field: &'static str, bits: u8 },

    /// The input ended in the middle of a field.
    #[error("unexpected end of data")]
    UnexpectedEndOfData,

    /// A channel voice message was built from a status byte of another message type.
    #[error("status byte 0x{found:02X} is not a 0x{expected:02X} message")]
    InvalidStatus { expected: u8, found: u8 },

    /// An integer was requested from an empty byte run.
    #[error("cannot build an integer from zero bytes")]
    EmptyInteger,

    /// Structural errors, and context for errors further down the chain.
    #[error("invalid midi: {0}")]
    Invalid(&'static str),
}

macro_rules! err_invalid {
    ($msg:expr) => {{
        ErrorKind::Invalid($msg)
    }};
}
macro_rules! err_range {
    ($what:expr, $value:expr) => {{
        ErrorKind::Range {
            what: $what,
            value: $value as i128,
        }
    }};
}

pub(crate) trait ResultExt<T> {
    fn context(self, ctx: ErrorKind) -> StdResult<T, Error>;
}
impl<T> ResultExt<T> for StdResult<T, Error> {
    #[inline]
    fn context(self, ctx: ErrorKind) -> StdResult<T, Error> {
        self.map_err(|err| err.chain_ctx(ctx))
    }
}
impl<T> ResultExt<T> for StdResult<T, ErrorKind> {
    #[inline]
    fn context(self, ctx: ErrorKind) -> StdResult<T, Error> {
        self.map_err(|kind| Error::from(kind).chain_ctx(ctx))
    }
}

/// The result type used by the MIDI decoder.
pub type Result<T> = StdResult<T, Error>;
pub(crate) use core::result::Result as StdResult;
