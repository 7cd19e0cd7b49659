//! `ni:` URI rendering for conditions.
//!
//! Conditions are advertised as RFC 6920 named-information URIs carrying the
//! fingerprint, type, cost, and (for compounds) the subtype list:
//!
//! `ni:///sha-256;<fingerprint>?fpt=<type>&cost=<cost>[&subtypes=<a>,<b>]`
//!
//! with the fingerprint in unpadded URL-safe base64. Only generation lives
//! in the core; parsing belongs to the document-integration layer.

use base64::Engine;

use crate::text::BASE64_URL;
use crate::types::Condition;

/// Render the `ni:` URI form of a condition.
pub(crate) fn condition_uri(condition: &Condition) -> String {
    let fingerprint = BASE64_URL.encode(condition.fingerprint);
    let mut uri = format!(
        "ni:///sha-256;{fingerprint}?fpt={}&cost={}",
        condition.condition_type.name(),
        condition.cost
    );
    if !condition.subtypes.is_empty() {
        uri.push_str("&subtypes=");
        uri.push_str(&condition.subtypes.to_string());
    }
    uri
}
