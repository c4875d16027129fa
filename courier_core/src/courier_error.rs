use crate::protocol::DecodeError;
use thiserror::Error;

/// A list specifying categories of errors produced by this crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CourierError {
    /// An input datagram was rejected by the decoder;
    /// the contained `DecodeError` describes the concrete reason.
    #[error("Input datagram is malformed")]
    Malformed {
        /// The causing error.
        #[from]
        source: DecodeError,
    },

    /// The memory pool cannot satisfy a reservation.
    ///
    /// This is a recoverable overload condition, not a bug: the caller is
    /// expected to discard the message and report the discard.
    #[error("Memory pool exhausted, reservation of {requested} bytes denied")]
    PoolExhausted {
        /// Size of the denied reservation.
        requested: usize,
    },

    /// A payload exceeds the representable length of its wire field.
    ///
    /// This indicates a caller bug; the codec itself clamps oversized
    /// payloads rather than producing an out-of-contract datagram.
    #[error("{field} length {len} exceeds the wire maximum of {max}")]
    OversizedInput {
        /// Name of the offending wire field.
        field: &'static str,
        /// Length the caller supplied.
        len: usize,
        /// Maximum representable length.
        max: usize,
    },

    /// Error occured in thread synchronization.
    #[error("Error occured in thread synchronization")]
    Poison,

    /// Error occured while writing a datagram.
    #[error(transparent)]
    Io {
        /// The causing Error.
        #[from]
        source: std::io::Error,
    },
}

/// Abbreviation of `Result<T, CourierError>`.
pub type CourierResult<T> = std::result::Result<T, CourierError>;

impl<G> From<std::sync::PoisonError<G>> for CourierError {
    fn from(_error: std::sync::PoisonError<G>) -> Self {
        Self::Poison
    }
}
