//! The cost/fingerprint engine: pure derivation of a condition's identity
//! from fulfillment payloads.
//!
//! The numeric formulas and fingerprint-contents encodings here are a fixed
//! external contract shared with every other crypto-conditions
//! implementation. They are reproduced from the reference specification and
//! validated against its published vectors, not derived from first
//! principles; changing any constant silently breaks interoperability.

use sha2::{Digest, Sha256};

use crate::der::{context_constructed, context_primitive, DerWriter, TAG_SEQUENCE};
use crate::threshold::sort_encodings;
use crate::types::{Condition, ConditionType, TypeSet};

/// Fixed cost of every Ed25519 condition, regardless of key or signature.
pub(crate) const ED25519_COST: u64 = 131_072;

/// Per-branch overhead in the threshold cost formula.
const THRESHOLD_BRANCH_COST: u64 = 1024;

/// Base overhead in the prefix cost formula.
const PREFIX_BASE_COST: u64 = 1024;

fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// PREIMAGE-SHA-256: the fingerprint is the digest of the raw preimage, with
/// no structural wrapper.
pub(crate) fn preimage_fingerprint(preimage: &[u8]) -> [u8; 32] {
    sha256(preimage)
}

pub(crate) fn preimage_cost(preimage: &[u8]) -> u64 {
    preimage.len() as u64
}

/// PREFIX-SHA-256 fingerprint contents:
/// `SEQUENCE { [0] prefix, [1] maxMessageLength, [2] subcondition }`.
pub(crate) fn prefix_fingerprint(
    prefix: &[u8],
    max_message_length: u64,
    subcondition: &Condition,
) -> [u8; 32] {
    let mut body = DerWriter::new();
    body.write_tlv(context_primitive(0), prefix);
    body.write_unsigned(context_primitive(1), max_message_length);
    body.write_tlv(context_constructed(2), &subcondition.encode());

    let mut contents = DerWriter::new();
    contents.write_tlv(TAG_SEQUENCE, &body.into_bytes());
    sha256(&contents.into_bytes())
}

pub(crate) fn prefix_cost(prefix: &[u8], max_message_length: u64, subcondition_cost: u64) -> u64 {
    (prefix.len() as u64)
        .saturating_add(max_message_length)
        .saturating_add(subcondition_cost)
        .saturating_add(PREFIX_BASE_COST)
}

/// THRESHOLD-SHA-256 fingerprint contents:
/// `SEQUENCE { [0] threshold, [1] SET OF subcondition }` with the branch
/// conditions in canonical ascending order. Only conditions participate;
/// fulfillment data never reaches the fingerprint, which is what makes the
/// derivation independent of which branches were actually proven.
pub(crate) fn threshold_fingerprint(threshold: u16, subconditions: &[Condition]) -> [u8; 32] {
    let mut encodings: Vec<Vec<u8>> = subconditions.iter().map(Condition::encode).collect();
    sort_encodings(&mut encodings);

    let mut set = Vec::new();
    for encoding in &encodings {
        set.extend_from_slice(encoding);
    }

    let mut body = DerWriter::new();
    body.write_unsigned(context_primitive(0), u64::from(threshold));
    body.write_tlv(context_constructed(1), &set);

    let mut contents = DerWriter::new();
    contents.write_tlv(TAG_SEQUENCE, &body.into_bytes());
    sha256(&contents.into_bytes())
}

/// Sum of the `threshold` largest branch costs, plus a fixed overhead per
/// declared branch. The largest costs bound the verifier's worst case over
/// every valid choice of proven branches.
pub(crate) fn threshold_cost(threshold: u16, subconditions: &[Condition]) -> u64 {
    let mut costs: Vec<u64> = subconditions.iter().map(|c| c.cost).collect();
    costs.sort_unstable_by(|a, b| b.cmp(a));
    let sum = costs
        .iter()
        .take(usize::from(threshold))
        .fold(0u64, |acc, c| acc.saturating_add(*c));
    sum.saturating_add(THRESHOLD_BRANCH_COST.saturating_mul(subconditions.len() as u64))
}

/// RSA-SHA-256 fingerprint contents: `SEQUENCE { [0] modulus }`.
pub(crate) fn rsa_fingerprint(modulus: &[u8]) -> [u8; 32] {
    let mut body = DerWriter::new();
    body.write_tlv(context_primitive(0), modulus);

    let mut contents = DerWriter::new();
    contents.write_tlv(TAG_SEQUENCE, &body.into_bytes());
    sha256(&contents.into_bytes())
}

pub(crate) fn rsa_cost(modulus: &[u8]) -> u64 {
    (modulus.len() as u64).saturating_mul(modulus.len() as u64)
}

/// ED25519-SHA-256 fingerprint contents: `SEQUENCE { [0] publicKey }`.
pub(crate) fn ed25519_fingerprint(public_key: &[u8; 32]) -> [u8; 32] {
    let mut body = DerWriter::new();
    body.write_tlv(context_primitive(0), public_key);

    let mut contents = DerWriter::new();
    contents.write_tlv(TAG_SEQUENCE, &body.into_bytes());
    sha256(&contents.into_bytes())
}

/// Subtype set of a compound condition: the union over every branch of the
/// branch's own type and its subtypes, minus the compound's own type. A
/// verifier that reached the compound necessarily supports its type already,
/// so advertising it would be redundant.
pub(crate) fn compound_subtypes(own: ConditionType, branches: &[Condition]) -> TypeSet {
    let mut subtypes = TypeSet::EMPTY;
    for branch in branches {
        subtypes.insert(branch.condition_type);
        subtypes = subtypes.union(branch.subtypes);
    }
    subtypes.remove(own);
    subtypes
}
