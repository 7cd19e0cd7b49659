//! Text encodings over the binary codec.
//!
//! A thin wrapping layer: the canonical representation is always the DER
//! bytes, and these helpers only transport them as hex or base64. Base64
//! decoding accepts both padded and unpadded input; encoding emits unpadded
//! URL-safe and padded standard forms, matching common usage of the wire
//! format in URIs and documents respectively.

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurpose;
use base64::engine::{DecodePaddingMode, GeneralPurposeConfig};
use base64::Engine;
use thiserror::Error;

use crate::error::DecodeError;
use crate::fulfillment::Fulfillment;
use crate::types::Condition;

pub(crate) const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const BASE64_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Failure while decoding a textual representation.
#[derive(Debug, Error)]
pub enum TextError {
    /// The text was not valid hex.
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The text was not valid base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded bytes were not a canonical encoding.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Hex form of a condition's canonical encoding.
pub fn condition_to_hex(condition: &Condition) -> String {
    hex::encode(condition.encode())
}

/// Decode a condition from hex.
pub fn condition_from_hex(text: &str) -> Result<Condition, TextError> {
    Ok(Condition::decode(&hex::decode(text)?)?)
}

/// Hex form of a fulfillment's canonical encoding.
pub fn fulfillment_to_hex(fulfillment: &Fulfillment) -> String {
    hex::encode(fulfillment.encode())
}

/// Decode a fulfillment from hex.
pub fn fulfillment_from_hex(text: &str) -> Result<Fulfillment, TextError> {
    Ok(Fulfillment::decode(&hex::decode(text)?)?)
}

/// Unpadded URL-safe base64 form of a condition's canonical encoding.
pub fn condition_to_base64_url(condition: &Condition) -> String {
    BASE64_URL.encode(condition.encode())
}

/// Decode a condition from URL-safe base64, padded or not.
pub fn condition_from_base64_url(text: &str) -> Result<Condition, TextError> {
    Ok(Condition::decode(&BASE64_URL.decode(text)?)?)
}

/// Unpadded URL-safe base64 form of a fulfillment's canonical encoding.
pub fn fulfillment_to_base64_url(fulfillment: &Fulfillment) -> String {
    BASE64_URL.encode(fulfillment.encode())
}

/// Decode a fulfillment from URL-safe base64, padded or not.
pub fn fulfillment_from_base64_url(text: &str) -> Result<Fulfillment, TextError> {
    Ok(Fulfillment::decode(&BASE64_URL.decode(text)?)?)
}

/// Padded standard base64 form of a condition's canonical encoding.
pub fn condition_to_base64(condition: &Condition) -> String {
    BASE64_STANDARD.encode(condition.encode())
}

/// Decode a condition from standard base64, padded or not.
pub fn condition_from_base64(text: &str) -> Result<Condition, TextError> {
    Ok(Condition::decode(&BASE64_STANDARD.decode(text)?)?)
}

/// Padded standard base64 form of a fulfillment's canonical encoding.
pub fn fulfillment_to_base64(fulfillment: &Fulfillment) -> String {
    BASE64_STANDARD.encode(fulfillment.encode())
}

/// Decode a fulfillment from standard base64, padded or not.
pub fn fulfillment_from_base64(text: &str) -> Result<Fulfillment, TextError> {
    Ok(Fulfillment::decode(&BASE64_STANDARD.decode(text)?)?)
}
