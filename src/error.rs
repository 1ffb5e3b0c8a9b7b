//! Centralized error handling for bitwire.
//!
//! Every fallible operation in the crate returns [`Result`], a specialization
//! of `std::result::Result` over the closed [`BitwireError`] taxonomy. There
//! is no panicking error path: the library enforces this through
//! `#![deny(clippy::panic)]` and `#![deny(clippy::unwrap_used)]`.
//!
//! ## Design Philosophy
//!
//! 1. **Closed set:** every failure the runtime can produce is one of the
//!    variants below. Generated code layered on top of the runtime reports
//!    its own failures (unknown enum values, constraint violations, offset
//!    mismatches) through the same set, so callers match on one type.
//!
//! 2. **Cheap values:** errors are fieldless and `Copy`. A failed read deep
//!    inside a packed array costs a single register to propagate.
//!
//! 3. **No interior messages:** diagnostics come from the `Display` message
//!    table; the variant itself tells the caller what went wrong and where
//!    to look.
//!
//! ## Usage
//!
//! ```rust
//! use bitwire::{BitReader, BitwireError};
//!
//! let data = [0xFFu8];
//! let mut reader = BitReader::new(&data);
//! assert_eq!(reader.read_bits(4), Ok(0x0F));
//! // Only four bits remain, so an eight-bit read must fail.
//! assert_eq!(reader.read_bits(8), Err(BitwireError::EndOfStream));
//! ```

use std::fmt;

/// A specialized `Result` type for bitwire operations.
///
/// Used throughout the library and by generated code calling into it.
pub type Result<T> = std::result::Result<T, BitwireError>;

/// The closed error taxonomy covering all failure domains in bitwire.
///
/// Variants are grouped by origin:
///
/// - **Input validation:** the caller handed the runtime an argument it
///   cannot act on (`InvalidParameter`, `InvalidValue`, `OutOfRange`,
///   `InvalidNumBits`, `InvalidBitPosition`, `InvalidAlignment`).
/// - **Stream:** the bit stream itself ran dry or overflowed
///   (`EndOfStream`, `BufferOverflow`, `WrongBufferBitSize`,
///   `BufferSizeExceeded`).
/// - **Decode:** well-formed bits that decode to an invalid value
///   (`InvalidEnumValue`, `InvalidChoice`, `InvalidUnion`,
///   `ConstraintViolation`, `DivisionByZero`).
/// - **Structural:** mismatches between the stream and the schema contract
///   (`ArrayLengthMismatch`, `ParameterMismatch`, `UninitializedParameter`,
///   `UninitializedField`, `InvalidOffset`).
/// - **Resource:** allocation and arithmetic limits (`AllocationFailed`,
///   `InsufficientCapacity`, `NumericOverflow`).
/// - **File:** the convenience file helpers (`FileOpenFailed`,
///   `FileReadFailed`, `FileWriteFailed`).
/// - **Adjunct:** reserved for codec layers outside the pure bit path
///   (`TypeMismatch`, `EmptyContainer`, `NullPointer`, `InvalidOperation`).
///
/// Errors are never caught inside the runtime; they flow outward to the
/// caller. A failed write may leave a partially populated buffer behind;
/// callers must treat such a buffer as garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BitwireError {
    /// An argument does not satisfy the operation's contract.
    InvalidParameter,
    /// A value is not representable in the requested encoding.
    InvalidValue,
    /// A decoded or supplied value exceeds the permitted range.
    OutOfRange,
    /// The requested bit count exceeds the operation's type width.
    InvalidNumBits,
    /// A bit position lies beyond the stream's bit size.
    InvalidBitPosition,
    /// An alignment request the stream cannot satisfy.
    InvalidAlignment,

    /// A read would cross the end of the stream.
    EndOfStream,
    /// A write would cross the writer's declared bit size.
    BufferOverflow,
    /// The declared bit size is inconsistent with the span length.
    WrongBufferBitSize,
    /// The byte span is too large for bit arithmetic to stay exact.
    BufferSizeExceeded,

    /// Decoded bits do not name a known enumeration value.
    InvalidEnumValue,
    /// A choice selector selects no declared case.
    InvalidChoice,
    /// A union tag selects no declared branch.
    InvalidUnion,
    /// A schema constraint evaluated to false.
    ConstraintViolation,
    /// A length computation divided by a zero-bit element size.
    DivisionByZero,

    /// An array's length disagrees with its schema-driven expectation.
    ArrayLengthMismatch,
    /// A parameterized type was re-initialized with different parameters.
    ParameterMismatch,
    /// A type parameter was used before initialization.
    UninitializedParameter,
    /// A field was used before it was set.
    UninitializedField,
    /// A stored byte offset disagrees with the actual stream position.
    InvalidOffset,

    /// Dynamic allocation failed.
    AllocationFailed,
    /// A fixed-capacity destination cannot hold the result.
    InsufficientCapacity,
    /// Integer arithmetic overflowed during a size computation.
    NumericOverflow,

    /// A file could not be opened.
    FileOpenFailed,
    /// A file read did not complete.
    FileReadFailed,
    /// A file write did not complete.
    FileWriteFailed,

    /// A value's runtime type disagrees with the requested one.
    TypeMismatch,
    /// An operation requires a non-empty container.
    EmptyContainer,
    /// A required reference was absent.
    NullPointer,
    /// The operation is not valid in the current state.
    InvalidOperation,
}

impl BitwireError {
    /// Returns the human-readable message for this error.
    ///
    /// This is the table behind the `Display` impl, exposed for callers that
    /// build their own diagnostics.
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidParameter => "invalid parameter",
            Self::InvalidValue => "invalid value",
            Self::OutOfRange => "value out of range",
            Self::InvalidNumBits => "invalid number of bits",
            Self::InvalidBitPosition => "invalid bit position",
            Self::InvalidAlignment => "invalid alignment",

            Self::EndOfStream => "end of stream",
            Self::BufferOverflow => "buffer overflow",
            Self::WrongBufferBitSize => "wrong buffer bit size",
            Self::BufferSizeExceeded => "buffer size exceeded",

            Self::InvalidEnumValue => "invalid enum value",
            Self::InvalidChoice => "invalid choice",
            Self::InvalidUnion => "invalid union",
            Self::ConstraintViolation => "constraint violation",
            Self::DivisionByZero => "division by zero",

            Self::ArrayLengthMismatch => "array length mismatch",
            Self::ParameterMismatch => "parameter mismatch",
            Self::UninitializedParameter => "uninitialized parameter",
            Self::UninitializedField => "uninitialized field",
            Self::InvalidOffset => "invalid offset",

            Self::AllocationFailed => "memory allocation failed",
            Self::InsufficientCapacity => "insufficient capacity",
            Self::NumericOverflow => "numeric overflow",

            Self::FileOpenFailed => "file open failed",
            Self::FileReadFailed => "file read failed",
            Self::FileWriteFailed => "file write failed",

            Self::TypeMismatch => "type mismatch",
            Self::EmptyContainer => "empty container",
            Self::NullPointer => "null pointer",
            Self::InvalidOperation => "invalid operation",
        }
    }
}

impl fmt::Display for BitwireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for BitwireError {}
