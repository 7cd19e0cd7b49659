//! The verifier: checks a fulfillment against an expected condition and
//! message.
//!
//! Verification is a pure, terminating recursion over the fulfillment tree.
//! Signature primitives sit behind [`SignatureBackend`] so the core carries
//! no dependency on a particular crypto implementation and tests can inject
//! fakes. Every failure mode, including malformed key material handed to the
//! backend, folds into `false`.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use rsa::{BigUint, Pss, RsaPublicKey};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::fulfillment::Fulfillment;
use crate::types::Condition;

/// RSA public exponent fixed by the wire format.
const RSA_EXPONENT: u32 = 65_537;

/// Salt length of the RSA-PSS scheme, in bytes.
const RSA_PSS_SALT_LEN: usize = 32;

/// Narrow capability interface over the signature primitives the verifier
/// delegates to. Implementations must be pure functions of their inputs and
/// safe for concurrent use.
pub trait SignatureBackend {
    /// Verify an RSA-PSS signature (SHA-256, MGF1-SHA-256, 32-byte salt,
    /// exponent 65537) over `message`, given the raw public modulus.
    fn verify_rsa_sha256(&self, modulus: &[u8], signature: &[u8], message: &[u8]) -> bool;

    /// Verify an Ed25519 signature over `message`.
    fn verify_ed25519(&self, public_key: &[u8; 32], signature: &[u8; 64], message: &[u8])
        -> bool;
}

/// Default backend over the `rsa` and `ed25519-dalek` crates.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBackend;

impl SignatureBackend for DefaultBackend {
    fn verify_rsa_sha256(&self, modulus: &[u8], signature: &[u8], message: &[u8]) -> bool {
        let n = BigUint::from_bytes_be(modulus);
        let e = BigUint::from(RSA_EXPONENT);
        let Ok(public_key) = RsaPublicKey::new(n, e) else {
            return false;
        };
        let digest = Sha256::digest(message);
        public_key
            .verify(Pss::new_with_salt::<Sha256>(RSA_PSS_SALT_LEN), &digest, signature)
            .is_ok()
    }

    fn verify_ed25519(
        &self,
        public_key: &[u8; 32],
        signature: &[u8; 64],
        message: &[u8],
    ) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
            return false;
        };
        let signature = Signature::from_bytes(signature);
        verifying_key.verify(message, &signature).is_ok()
    }
}

/// Structural equality between the derived and expected condition, with the
/// fingerprints compared in constant time.
fn conditions_match(actual: &Condition, expected: &Condition) -> bool {
    let fingerprints_equal: bool = actual
        .fingerprint
        .as_ref()
        .ct_eq(expected.fingerprint.as_ref())
        .into();
    actual.condition_type == expected.condition_type
        && fingerprints_equal
        && actual.cost == expected.cost
        && actual.subtypes == expected.subtypes
}

/// Check `fulfillment` against `expected` and `message`.
///
/// Step one is purely structural: the fulfillment's derived condition must
/// equal the expected condition, otherwise the message is never inspected.
/// Step two dispatches on type to check the proof itself.
pub(crate) fn verify_fulfillment(
    backend: &dyn SignatureBackend,
    fulfillment: &Fulfillment,
    expected: &Condition,
    message: &[u8],
) -> bool {
    let actual = fulfillment.condition();
    if !conditions_match(&actual, expected) {
        debug!(
            expected = %expected.condition_type,
            actual = %actual.condition_type,
            "fulfillment does not derive the expected condition"
        );
        return false;
    }

    match fulfillment {
        // The structural check above already proved the preimage hashes to
        // the fingerprint; the message plays no part.
        Fulfillment::Preimage { .. } => true,

        Fulfillment::Prefix {
            prefix,
            max_message_length,
            subfulfillment,
        } => {
            if message.len() as u64 > *max_message_length {
                debug!(
                    len = message.len(),
                    max = max_message_length,
                    "message exceeds the prefix length bound"
                );
                return false;
            }
            let mut prefixed = Vec::with_capacity(prefix.len() + message.len());
            prefixed.extend_from_slice(prefix);
            prefixed.extend_from_slice(message);
            let subcondition = subfulfillment.condition();
            verify_fulfillment(backend, subfulfillment, &subcondition, &prefixed)
        }

        Fulfillment::Threshold {
            threshold,
            subfulfillments,
            ..
        } => {
            // Unfulfilled branches only complete the structural fingerprint;
            // no proof was supplied for them by design.
            subfulfillments.len() >= usize::from(*threshold)
                && subfulfillments.iter().all(|sub| {
                    let subcondition = sub.condition();
                    verify_fulfillment(backend, sub, &subcondition, message)
                })
        }

        Fulfillment::Rsa { modulus, signature } => {
            backend.verify_rsa_sha256(modulus, signature, message)
        }

        Fulfillment::Ed25519 {
            public_key,
            signature,
        } => backend.verify_ed25519(public_key, signature, message),
    }
}
