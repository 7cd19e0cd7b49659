//! Unified error types for the crypto-conditions core.
//!
//! Decoding failures and construction failures are separate taxonomies:
//! a `DecodeError` always means the input bytes were rejected, while a
//! `ConstructionError` rejects invalid values before they ever reach the
//! wire. Verification is a boolean, never an error channel.

use thiserror::Error;

/// Failure while decoding a condition or fulfillment from bytes.
///
/// Every variant carries the byte offset of the offending field so a
/// rejected input can be reproduced in a test.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The input ended before the announced value did.
    #[error("input truncated at offset {offset}: needed {needed} more bytes")]
    TruncatedInput {
        /// Offset at which more bytes were required
        offset: usize,
        /// Number of missing bytes
        needed: usize,
    },

    /// Bytes remained after the outermost value was fully read.
    #[error("{count} trailing bytes after the value ending at offset {offset}")]
    TrailingBytes {
        /// Offset of the first trailing byte
        offset: usize,
        /// Number of trailing bytes
        count: usize,
    },

    /// A length field was not the minimal encoding of its value.
    #[error("non-canonical length field at offset {offset}")]
    NonCanonicalLength {
        /// Offset of the length field
        offset: usize,
    },

    /// An integer field carried superfluous leading octets.
    #[error("non-canonical integer content at offset {offset}")]
    NonCanonicalInteger {
        /// Offset of the integer content
        offset: usize,
    },

    /// A set element broke the canonical (length, then lexicographic) order.
    #[error("set element at offset {offset} breaks canonical ordering")]
    NonCanonicalOrdering {
        /// Offset of the out-of-order element
        offset: usize,
    },

    /// A CHOICE tag or subtype bit named a condition type outside the
    /// closed set defined by the specification.
    #[error("unknown condition type {type_id}")]
    UnknownType {
        /// The unrecognized numeric type id
        type_id: u8,
    },

    /// A tag other than the expected one was found.
    #[error("unexpected tag at offset {offset}: expected {expected:#04x}, found {found:#04x}")]
    UnexpectedTag {
        /// Offset of the tag byte
        offset: usize,
        /// Tag that the grammar required
        expected: u8,
        /// Tag actually present
        found: u8,
    },

    /// A field decoded to a value outside its permitted range or shape.
    #[error("{field} out of range at offset {offset}: {reason}")]
    FieldOutOfRange {
        /// Offset of the field content
        offset: usize,
        /// Name of the offending field
        field: &'static str,
        /// What the field violated, with expected vs. actual where known
        reason: String,
    },
}

/// Failure while constructing a condition or fulfillment from parts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// A threshold asked for more fulfillments than were supplied.
    #[error("threshold {threshold} exceeds the {available} available subfulfillments")]
    InsufficientFulfillments {
        /// Requested threshold
        threshold: u16,
        /// Number of branches for which a fulfillment was available
        available: usize,
    },

    /// A field violated its permitted range or shape.
    #[error("{field} out of range: {reason}")]
    FieldOutOfRange {
        /// Name of the offending field
        field: &'static str,
        /// What the field violated
        reason: String,
    },
}

/// Top-level error for fallible crate operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Input bytes were rejected by the codec.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A value could not be constructed from the supplied parts.
    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

/// Standard result type for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_display_carries_offsets() {
        let err = DecodeError::TruncatedInput {
            offset: 7,
            needed: 3,
        };
        assert_eq!(
            err.to_string(),
            "input truncated at offset 7: needed 3 more bytes"
        );
    }

    #[test]
    fn construction_error_display() {
        let err = ConstructionError::InsufficientFulfillments {
            threshold: 3,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "threshold 3 exceeds the 2 available subfulfillments"
        );
    }

    #[test]
    fn error_wraps_both_taxonomies() {
        let decode: Error = DecodeError::UnknownType { type_id: 9 }.into();
        assert!(matches!(decode, Error::Decode(_)));

        let construction: Error = ConstructionError::FieldOutOfRange {
            field: "threshold",
            reason: "must be at least 1".into(),
        }
        .into();
        assert!(matches!(construction, Error::Construction(_)));
    }
}
