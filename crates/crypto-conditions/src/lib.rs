//! Crypto-conditions: composable boolean conditions over hash preimages and
//! signatures, with a canonical binary wire format.
//!
//! A [`Condition`] is a commitment — type, fingerprint, cost, and subtype
//! set — and a [`Fulfillment`] is the proof that satisfies it. Five types
//! compose: SHA-256 preimages, message prefixing, RSA-PSS and Ed25519
//! signatures, and `t`-of-`n` thresholds over any mix of the others.
//!
//! Everything here is pure and synchronous: encoding, decoding, condition
//! derivation, and verification are functions of their inputs, values are
//! immutable once constructed, and independent workers can process them
//! concurrently with no coordination.
//!
//! The wire format is strict DER: decoding rejects every non-canonical
//! input (non-minimal lengths, padded integers, unsorted sets), so a byte
//! string accepted by the decoder is the unique encoding of its value and
//! `encode(decode(b)) == b` always holds.
//!
//! ```
//! use crypto_conditions::Fulfillment;
//!
//! let fulfillment = Fulfillment::preimage(b"my secret".to_vec());
//! let condition = fulfillment.condition();
//!
//! // Advertise the condition; later, prove it over any message.
//! let bytes = condition.encode();
//! assert!(fulfillment.verify(&condition, b"message"));
//! ```

#![forbid(unsafe_code)]

/// Wire codec for conditions and fulfillments
pub mod codec;
/// Canonical DER reader and writer
mod der;
/// Decode, construction, and top-level error types
pub mod error;
/// The cost/fingerprint derivation engine
mod fingerprint;
/// The fulfillment model and constructors
pub mod fulfillment;
/// Text encodings over the binary codec
pub mod text;
/// Canonical ordering and threshold subset selection
pub mod threshold;
/// Condition types, subtype sets, and the condition value
pub mod types;
/// Condition URI rendering
mod uri;
/// The verifier and its signature backend seam
pub mod verify;

pub use codec::{decode_condition, decode_fulfillment, encode_condition, encode_fulfillment};
pub use error::{ConstructionError, DecodeError, Error, Result};
pub use fulfillment::Fulfillment;
pub use text::TextError;
pub use threshold::ThresholdBranch;
pub use types::{Condition, ConditionType, TypeSet};
pub use verify::{DefaultBackend, SignatureBackend};
