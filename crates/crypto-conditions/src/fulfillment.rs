//! The fulfillment model: the proof half of a crypto-condition.
//!
//! A [`Fulfillment`] owns its payload and can do three things: derive the
//! unique [`Condition`] it proves, encode itself canonically, and verify
//! itself against an expected condition and message. All values are
//! immutable once constructed; composites own their children by value, so
//! decoded structures are trees and recursion is bounded by input length.

use crate::codec;
use crate::error::{ConstructionError, DecodeError};
use crate::fingerprint;
use crate::threshold::{select_subfulfillments, ThresholdBranch};
use crate::types::{Condition, ConditionType, TypeSet};
use crate::verify::{verify_fulfillment, DefaultBackend, SignatureBackend};

/// The proof payload for one of the five condition types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fulfillment {
    /// Proof by revealing the SHA-256 preimage.
    Preimage {
        /// The revealed preimage.
        preimage: Vec<u8>,
    },
    /// Proof that a subfulfillment holds over a prefixed message.
    Prefix {
        /// Bytes prepended to the message before recursing.
        prefix: Vec<u8>,
        /// Largest message length this fulfillment will accept.
        max_message_length: u64,
        /// Proof for the inner condition, checked against `prefix ++ message`.
        subfulfillment: Box<Fulfillment>,
    },
    /// Proof by at least `threshold` fulfilled branches.
    Threshold {
        /// Number of branches that must be proven.
        threshold: u16,
        /// The branches actually proven, in canonical encoding order.
        subfulfillments: Vec<Fulfillment>,
        /// The remaining branches, represented only by their conditions.
        subconditions: Vec<Condition>,
    },
    /// Proof by RSA-PSS signature (SHA-256, MGF1-SHA-256, 32-byte salt,
    /// public exponent 65537).
    Rsa {
        /// Raw unsigned big-endian public modulus.
        modulus: Vec<u8>,
        /// Signature over the verified message, as long as the modulus.
        signature: Vec<u8>,
    },
    /// Proof by Ed25519 signature.
    Ed25519 {
        /// 32-byte public key.
        public_key: [u8; 32],
        /// 64-byte signature over the verified message.
        signature: [u8; 64],
    },
}

impl Fulfillment {
    /// Fulfillment revealing a SHA-256 preimage.
    pub fn preimage(preimage: impl Into<Vec<u8>>) -> Self {
        Fulfillment::Preimage {
            preimage: preimage.into(),
        }
    }

    /// Fulfillment prefixing the message seen by `subfulfillment`.
    pub fn prefix(
        prefix: impl Into<Vec<u8>>,
        max_message_length: u64,
        subfulfillment: Fulfillment,
    ) -> Result<Self, ConstructionError> {
        if max_message_length > u64::from(u32::MAX) {
            return Err(ConstructionError::FieldOutOfRange {
                field: "max_message_length",
                reason: format!("{max_message_length} exceeds 4294967295"),
            });
        }
        Ok(Fulfillment::Prefix {
            prefix: prefix.into(),
            max_message_length,
            subfulfillment: Box::new(subfulfillment),
        })
    }

    /// Threshold fulfillment over the given branches.
    ///
    /// Exactly the `threshold` cheapest branches with available fulfillments
    /// are kept as proof; every other branch is represented by its
    /// condition. Fails with
    /// [`ConstructionError::InsufficientFulfillments`] when fewer than
    /// `threshold` branches can be fulfilled.
    pub fn threshold(
        threshold: u16,
        branches: Vec<ThresholdBranch>,
    ) -> Result<Self, ConstructionError> {
        if threshold == 0 {
            return Err(ConstructionError::FieldOutOfRange {
                field: "threshold",
                reason: "must be at least 1".to_string(),
            });
        }
        let (subfulfillments, subconditions) = select_subfulfillments(threshold, branches)?;
        Ok(Fulfillment::Threshold {
            threshold,
            subfulfillments,
            subconditions,
        })
    }

    /// RSA fulfillment from a raw public modulus and signature.
    pub fn rsa(
        modulus: impl Into<Vec<u8>>,
        signature: impl Into<Vec<u8>>,
    ) -> Result<Self, ConstructionError> {
        let modulus = modulus.into();
        let signature = signature.into();
        codec::rsa_modulus_shape(&modulus)?;
        if signature.len() != modulus.len() {
            return Err(ConstructionError::FieldOutOfRange {
                field: "signature",
                reason: format!(
                    "expected {} bytes to match the modulus, found {}",
                    modulus.len(),
                    signature.len()
                ),
            });
        }
        Ok(Fulfillment::Rsa { modulus, signature })
    }

    /// Ed25519 fulfillment from a public key and signature.
    pub fn ed25519(public_key: [u8; 32], signature: [u8; 64]) -> Self {
        Fulfillment::Ed25519 {
            public_key,
            signature,
        }
    }

    /// The condition type this fulfillment proves.
    pub fn condition_type(&self) -> ConditionType {
        match self {
            Fulfillment::Preimage { .. } => ConditionType::Preimage,
            Fulfillment::Prefix { .. } => ConditionType::Prefix,
            Fulfillment::Threshold { .. } => ConditionType::Threshold,
            Fulfillment::Rsa { .. } => ConditionType::Rsa,
            Fulfillment::Ed25519 { .. } => ConditionType::Ed25519,
        }
    }

    /// Derive the unique condition this fulfillment proves.
    ///
    /// Pure and deterministic: the same payload always derives the same
    /// `(type, fingerprint, cost, subtypes)` tuple, recursively through
    /// composites.
    pub fn condition(&self) -> Condition {
        match self {
            Fulfillment::Preimage { preimage } => Condition::new(
                ConditionType::Preimage,
                fingerprint::preimage_fingerprint(preimage),
                fingerprint::preimage_cost(preimage),
                TypeSet::EMPTY,
            ),
            Fulfillment::Prefix {
                prefix,
                max_message_length,
                subfulfillment,
            } => {
                let subcondition = subfulfillment.condition();
                Condition::new(
                    ConditionType::Prefix,
                    fingerprint::prefix_fingerprint(prefix, *max_message_length, &subcondition),
                    fingerprint::prefix_cost(prefix, *max_message_length, subcondition.cost),
                    fingerprint::compound_subtypes(
                        ConditionType::Prefix,
                        std::slice::from_ref(&subcondition),
                    ),
                )
            }
            Fulfillment::Threshold {
                threshold,
                subfulfillments,
                subconditions,
            } => {
                // The logical branch set is the derived conditions of the
                // proven branches plus the unproven conditions verbatim.
                let mut branches: Vec<Condition> =
                    subfulfillments.iter().map(Fulfillment::condition).collect();
                branches.extend(subconditions.iter().cloned());
                Condition::new(
                    ConditionType::Threshold,
                    fingerprint::threshold_fingerprint(*threshold, &branches),
                    fingerprint::threshold_cost(*threshold, &branches),
                    fingerprint::compound_subtypes(ConditionType::Threshold, &branches),
                )
            }
            Fulfillment::Rsa { modulus, .. } => Condition::new(
                ConditionType::Rsa,
                fingerprint::rsa_fingerprint(modulus),
                fingerprint::rsa_cost(modulus),
                TypeSet::EMPTY,
            ),
            Fulfillment::Ed25519 { public_key, .. } => Condition::new(
                ConditionType::Ed25519,
                fingerprint::ed25519_fingerprint(public_key),
                fingerprint::ED25519_COST,
                TypeSet::EMPTY,
            ),
        }
    }

    /// Canonical binary encoding of this fulfillment.
    pub fn encode(&self) -> Vec<u8> {
        codec::encode_fulfillment(self)
    }

    /// Decode a fulfillment from its canonical binary encoding.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        codec::decode_fulfillment(bytes)
    }

    /// Verify this fulfillment against an expected condition and message
    /// using the default signature backend.
    ///
    /// Total over all well-formed inputs: a fulfillment that fails to prove
    /// the condition is `false`, never an error.
    pub fn verify(&self, condition: &Condition, message: &[u8]) -> bool {
        self.verify_with(&DefaultBackend, condition, message)
    }

    /// Verify with an injected signature backend.
    pub fn verify_with(
        &self,
        backend: &dyn SignatureBackend,
        condition: &Condition,
        message: &[u8],
    ) -> bool {
        verify_fulfillment(backend, self, condition, message)
    }
}
