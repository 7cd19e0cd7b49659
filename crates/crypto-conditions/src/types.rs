//! Condition types, subtype sets, and the `Condition` value.
//!
//! A [`Condition`] is the commitment half of a crypto-condition: the tuple
//! `(type, fingerprint, cost, subtypes)` that a fulfillment proves. It never
//! contains proof material, and two conditions are equal iff all four fields
//! are equal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{ConstructionError, DecodeError};
use crate::fingerprint;
use crate::threshold::{has_adjacent_duplicate, sort_encodings};

/// Closed set of condition types defined by the crypto-conditions
/// specification. The numeric id of each type doubles as its CHOICE tag
/// index on the wire and its bit position in a [`TypeSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    /// SHA-256 hash preimage.
    Preimage,
    /// Message prefixing over a single subcondition.
    Prefix,
    /// Weighted boolean composition: at least `t` of `n` branches.
    Threshold,
    /// RSA-PSS signature (SHA-256, MGF1-SHA-256, 32-byte salt).
    Rsa,
    /// Ed25519 signature.
    Ed25519,
}

impl ConditionType {
    /// All condition types, in type-id order.
    pub const ALL: [ConditionType; 5] = [
        ConditionType::Preimage,
        ConditionType::Prefix,
        ConditionType::Threshold,
        ConditionType::Rsa,
        ConditionType::Ed25519,
    ];

    /// The numeric id used for CHOICE tagging and subtype bitmasks.
    pub fn type_id(self) -> u8 {
        match self {
            ConditionType::Preimage => 0,
            ConditionType::Prefix => 1,
            ConditionType::Threshold => 2,
            ConditionType::Rsa => 3,
            ConditionType::Ed25519 => 4,
        }
    }

    /// Look up a type by numeric id. Unknown ids are a decode error at the
    /// caller, never a silent default.
    pub fn from_type_id(id: u8) -> Option<Self> {
        ConditionType::ALL.get(usize::from(id)).copied()
    }

    /// The wire name of this type, as used in condition URIs.
    pub fn name(self) -> &'static str {
        match self {
            ConditionType::Preimage => "preimage-sha-256",
            ConditionType::Prefix => "prefix-sha-256",
            ConditionType::Threshold => "threshold-sha-256",
            ConditionType::Rsa => "rsa-sha-256",
            ConditionType::Ed25519 => "ed25519-sha-256",
        }
    }

    /// Compound types carry a subtype set in their condition encoding.
    pub fn is_compound(self) -> bool {
        matches!(self, ConditionType::Prefix | ConditionType::Threshold)
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of condition types, stored as a bitmask with bit position equal to
/// the type id.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeSet(u8);

impl TypeSet {
    /// The empty set.
    pub const EMPTY: TypeSet = TypeSet(0);

    /// Insert a type into the set.
    pub fn insert(&mut self, condition_type: ConditionType) {
        self.0 |= 1 << condition_type.type_id();
    }

    /// Remove a type from the set.
    pub fn remove(&mut self, condition_type: ConditionType) {
        self.0 &= !(1 << condition_type.type_id());
    }

    /// Whether the set contains the given type.
    pub fn contains(self, condition_type: ConditionType) -> bool {
        self.0 & (1 << condition_type.type_id()) != 0
    }

    /// The union of two sets.
    pub fn union(self, other: TypeSet) -> TypeSet {
        TypeSet(self.0 | other.0)
    }

    /// Whether the set is empty.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the members in type-id order.
    pub fn iter(self) -> impl Iterator<Item = ConditionType> {
        ConditionType::ALL.into_iter().filter(move |t| self.contains(*t))
    }

    /// DER BIT STRING content octets for this set: an unused-bits count
    /// followed by the mask with bit 0 as the most significant bit.
    pub(crate) fn to_bit_string_content(self) -> Vec<u8> {
        if self.0 == 0 {
            return vec![0x00];
        }
        let mut bits = 0u8;
        let mut highest = 0u8;
        for t in self.iter() {
            let id = t.type_id();
            bits |= 0x80 >> id;
            highest = id;
        }
        vec![7 - highest, bits]
    }

    /// Parse DER BIT STRING content octets, enforcing canonical form:
    /// minimal unused-bit count, zero padding bits, no trailing octets.
    pub(crate) fn from_bit_string_content(
        content: &[u8],
        offset: usize,
    ) -> Result<Self, DecodeError> {
        let out_of_range = |reason: &str| DecodeError::FieldOutOfRange {
            offset,
            field: "subtypes",
            reason: reason.to_string(),
        };

        match content {
            [0x00] => Ok(TypeSet::EMPTY),
            [unused, bits] => {
                if *bits == 0 {
                    return Err(out_of_range("empty mask must omit its content octet"));
                }
                if *unused > 7 || bits.trailing_zeros() != u32::from(*unused) {
                    return Err(out_of_range("unused-bit count is not minimal"));
                }
                let mut set = TypeSet::EMPTY;
                for id in 0..8u8 {
                    if bits & (0x80 >> id) != 0 {
                        match ConditionType::from_type_id(id) {
                            Some(t) => set.insert(t),
                            None => return Err(DecodeError::UnknownType { type_id: id }),
                        }
                    }
                }
                Ok(set)
            }
            [] => Err(out_of_range("missing unused-bit count")),
            [_] => Err(out_of_range("empty mask must use a zero unused-bit count")),
            _ => Err(out_of_range("mask longer than one octet")),
        }
    }
}

impl FromIterator<ConditionType> for TypeSet {
    fn from_iter<I: IntoIterator<Item = ConditionType>>(iter: I) -> Self {
        let mut set = TypeSet::EMPTY;
        for t in iter {
            set.insert(t);
        }
        set
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for t in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(t.name())?;
            first = false;
        }
        Ok(())
    }
}

/// The commitment half of a crypto-condition.
///
/// Immutable once constructed. Equality is structural over all four fields;
/// proof material never participates. Conditions are obtained either by
/// decoding bytes or by deriving them from a [`crate::Fulfillment`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    /// Which of the five condition types this commitment uses.
    pub condition_type: ConditionType,
    /// SHA-256 digest uniquely identifying the condition within its type.
    pub fingerprint: [u8; 32],
    /// Upper bound on the expense of verifying a fulfillment of this
    /// condition. Consumers reject conditions whose cost exceeds their
    /// budget before ever verifying.
    pub cost: u64,
    /// Types a fulfillment of this condition may recursively contain.
    /// Empty except for compound conditions.
    pub subtypes: TypeSet,
}

impl Condition {
    /// Assemble a condition from its four identity fields.
    ///
    /// Only compound types carry a subtype set on the wire; for the others
    /// `subtypes` is discarded, so the result always round-trips through the
    /// codec.
    pub fn new(
        condition_type: ConditionType,
        fingerprint: [u8; 32],
        cost: u64,
        subtypes: TypeSet,
    ) -> Self {
        let subtypes = if condition_type.is_compound() {
            subtypes
        } else {
            TypeSet::EMPTY
        };
        Condition {
            condition_type,
            fingerprint,
            cost,
            subtypes,
        }
    }

    /// Condition committing to a SHA-256 preimage.
    pub fn preimage(preimage: &[u8]) -> Self {
        Condition::new(
            ConditionType::Preimage,
            fingerprint::preimage_fingerprint(preimage),
            fingerprint::preimage_cost(preimage),
            TypeSet::EMPTY,
        )
    }

    /// Prefix condition over a subcondition, without any proof material.
    pub fn prefix(
        prefix: &[u8],
        max_message_length: u64,
        subcondition: &Condition,
    ) -> Result<Self, ConstructionError> {
        if max_message_length > u64::from(u32::MAX) {
            return Err(ConstructionError::FieldOutOfRange {
                field: "max_message_length",
                reason: format!("{max_message_length} exceeds 4294967295"),
            });
        }
        Ok(Condition::new(
            ConditionType::Prefix,
            fingerprint::prefix_fingerprint(prefix, max_message_length, subcondition),
            fingerprint::prefix_cost(prefix, max_message_length, subcondition.cost),
            fingerprint::compound_subtypes(
                ConditionType::Prefix,
                std::slice::from_ref(subcondition),
            ),
        ))
    }

    /// Threshold condition from its branch conditions alone.
    ///
    /// This is how a `t`-of-`n` condition is advertised before any of the
    /// `n` parties has produced a proof; a later fulfillment over the same
    /// branches derives an equal condition.
    pub fn threshold(
        threshold: u16,
        subconditions: &[Condition],
    ) -> Result<Self, ConstructionError> {
        if threshold == 0 {
            return Err(ConstructionError::FieldOutOfRange {
                field: "threshold",
                reason: "must be at least 1".to_string(),
            });
        }
        if usize::from(threshold) > subconditions.len() {
            return Err(ConstructionError::FieldOutOfRange {
                field: "threshold",
                reason: format!(
                    "{threshold} exceeds the {} branches",
                    subconditions.len()
                ),
            });
        }
        let mut encodings: Vec<Vec<u8>> = subconditions.iter().map(Condition::encode).collect();
        sort_encodings(&mut encodings);
        if has_adjacent_duplicate(encodings.into_iter()) {
            return Err(ConstructionError::FieldOutOfRange {
                field: "branches",
                reason: "duplicate branch".to_string(),
            });
        }
        Ok(Condition::new(
            ConditionType::Threshold,
            fingerprint::threshold_fingerprint(threshold, subconditions),
            fingerprint::threshold_cost(threshold, subconditions),
            fingerprint::compound_subtypes(ConditionType::Threshold, subconditions),
        ))
    }

    /// RSA condition from a raw public modulus.
    pub fn rsa(modulus: &[u8]) -> Result<Self, ConstructionError> {
        codec::rsa_modulus_shape(modulus)?;
        Ok(Condition::new(
            ConditionType::Rsa,
            fingerprint::rsa_fingerprint(modulus),
            fingerprint::rsa_cost(modulus),
            TypeSet::EMPTY,
        ))
    }

    /// Ed25519 condition from a public key.
    pub fn ed25519(public_key: &[u8; 32]) -> Self {
        Condition::new(
            ConditionType::Ed25519,
            fingerprint::ed25519_fingerprint(public_key),
            fingerprint::ED25519_COST,
            TypeSet::EMPTY,
        )
    }

    /// Canonical binary encoding of this condition.
    pub fn encode(&self) -> Vec<u8> {
        codec::encode_condition(self)
    }

    /// Decode a condition from its canonical binary encoding.
    ///
    /// Rejects any input that is not the unique canonical encoding of the
    /// decoded value.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        codec::decode_condition(bytes)
    }

    /// The `ni:` URI form of this condition.
    pub fn uri(&self) -> String {
        crate::uri::condition_uri(self)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ids_are_stable() {
        for (id, t) in ConditionType::ALL.into_iter().enumerate() {
            assert_eq!(usize::from(t.type_id()), id);
            assert_eq!(ConditionType::from_type_id(t.type_id()), Some(t));
        }
        assert_eq!(ConditionType::from_type_id(5), None);
    }

    #[test]
    fn only_prefix_and_threshold_are_compound() {
        assert!(ConditionType::Prefix.is_compound());
        assert!(ConditionType::Threshold.is_compound());
        assert!(!ConditionType::Preimage.is_compound());
        assert!(!ConditionType::Rsa.is_compound());
        assert!(!ConditionType::Ed25519.is_compound());
    }

    #[test]
    fn typeset_insert_remove_contains() {
        let mut set = TypeSet::EMPTY;
        assert!(set.is_empty());

        set.insert(ConditionType::Ed25519);
        set.insert(ConditionType::Preimage);
        assert!(set.contains(ConditionType::Ed25519));
        assert!(set.contains(ConditionType::Preimage));
        assert!(!set.contains(ConditionType::Rsa));

        set.remove(ConditionType::Ed25519);
        assert!(!set.contains(ConditionType::Ed25519));
    }

    #[test]
    fn typeset_bit_string_content_single_type() {
        // Ed25519 has id 4: bit 4 from the MSB, three unused bits.
        let set: TypeSet = [ConditionType::Ed25519].into_iter().collect();
        assert_eq!(set.to_bit_string_content(), vec![0x03, 0x08]);

        // Preimage has id 0: the MSB, seven unused bits.
        let set: TypeSet = [ConditionType::Preimage].into_iter().collect();
        assert_eq!(set.to_bit_string_content(), vec![0x07, 0x80]);
    }

    #[test]
    fn typeset_bit_string_content_round_trips() {
        let set: TypeSet = [ConditionType::Preimage, ConditionType::Ed25519]
            .into_iter()
            .collect();
        let content = set.to_bit_string_content();
        assert_eq!(content, vec![0x03, 0x88]);
        assert_eq!(TypeSet::from_bit_string_content(&content, 0), Ok(set));

        let content = TypeSet::EMPTY.to_bit_string_content();
        assert_eq!(content, vec![0x00]);
        assert_eq!(
            TypeSet::from_bit_string_content(&content, 0),
            Ok(TypeSet::EMPTY)
        );
    }

    #[test]
    fn typeset_rejects_non_minimal_unused_count() {
        // {Preimage} with an understated unused-bit count.
        let err = TypeSet::from_bit_string_content(&[0x06, 0x80], 3).unwrap_err();
        assert!(matches!(err, DecodeError::FieldOutOfRange { offset: 3, .. }));

        // Padding bits must be zero.
        let err = TypeSet::from_bit_string_content(&[0x03, 0x09], 0).unwrap_err();
        assert!(matches!(err, DecodeError::FieldOutOfRange { .. }));
    }

    #[test]
    fn typeset_rejects_unknown_subtype_bits() {
        // Bit 5 does not name a condition type.
        let err = TypeSet::from_bit_string_content(&[0x02, 0x04], 0).unwrap_err();
        assert_eq!(err, DecodeError::UnknownType { type_id: 5 });
    }

    #[test]
    fn condition_equality_is_structural() {
        let a = Condition::new(ConditionType::Preimage, [7; 32], 3, TypeSet::EMPTY);
        let b = Condition::new(ConditionType::Preimage, [7; 32], 3, TypeSet::EMPTY);
        assert_eq!(a, b);

        let c = Condition::new(ConditionType::Preimage, [7; 32], 4, TypeSet::EMPTY);
        assert_ne!(a, c);
    }

    #[test]
    fn conditions_from_parts_match_fulfillment_derivation() {
        use crate::fulfillment::Fulfillment;

        assert_eq!(
            Condition::preimage(b"abc"),
            Fulfillment::preimage(b"abc".to_vec()).condition()
        );

        let inner = Condition::preimage(b"Y");
        let from_parts = Condition::prefix(b"X", 10, &inner).unwrap();
        let derived = Fulfillment::prefix(b"X".to_vec(), 10, Fulfillment::preimage(b"Y".to_vec()))
            .unwrap()
            .condition();
        assert_eq!(from_parts, derived);

        let modulus = vec![0xAB; 256];
        assert_eq!(
            Condition::rsa(&modulus).unwrap(),
            Fulfillment::rsa(modulus, vec![0xCD; 256]).unwrap().condition()
        );

        assert_eq!(
            Condition::ed25519(&[7; 32]),
            Fulfillment::ed25519([7; 32], [0; 64]).condition()
        );
    }

    #[test]
    fn threshold_condition_needs_no_proof_material() {
        // A 2-of-3 advertised from branch conditions alone must equal the
        // condition later derived from a fulfillment over the same branches.
        let branches = [
            Condition::preimage(b"a"),
            Condition::preimage(b"bb"),
            Condition::preimage(b"ccc"),
        ];
        let condition = Condition::threshold(2, &branches).unwrap();
        assert_eq!(
            hex::encode(condition.encode()),
            "a22a802070bd610651e36fa1e9937c5a2bfa3f2f75c4ce0c233b9fdb17f9f450c55297fb81020c0582020780"
        );

        // Zero-of-anything, more branches demanded than exist, and repeated
        // branches are all rejected.
        assert!(Condition::threshold(0, &branches).is_err());
        assert!(Condition::threshold(4, &branches).is_err());
        let duplicated = [Condition::preimage(b"a"), Condition::preimage(b"a")];
        assert!(Condition::threshold(2, &duplicated).is_err());
    }

    #[test]
    fn prefix_condition_rejects_oversized_max_message_length() {
        let inner = Condition::preimage(b"x");
        let err = Condition::prefix(b"p", u64::from(u32::MAX) + 1, &inner).unwrap_err();
        assert!(matches!(
            err,
            ConstructionError::FieldOutOfRange {
                field: "max_message_length",
                ..
            }
        ));
    }

    #[test]
    fn rsa_condition_rejects_a_short_modulus() {
        let err = Condition::rsa(&[0xAB; 64]).unwrap_err();
        assert!(matches!(
            err,
            ConstructionError::FieldOutOfRange { field: "modulus", .. }
        ));
    }

    #[test]
    fn non_compound_conditions_never_carry_subtypes() {
        let stray: TypeSet = [ConditionType::Ed25519].into_iter().collect();
        let condition = Condition::new(ConditionType::Preimage, [7; 32], 3, stray);
        assert!(condition.subtypes.is_empty());
        // And therefore the value round-trips through the codec.
        assert_eq!(Condition::decode(&condition.encode()).unwrap(), condition);
    }

    #[test]
    fn condition_serde_round_trips() {
        let condition = Condition::threshold(
            2,
            &[
                Condition::preimage(b"a"),
                Condition::preimage(b"bb"),
                Condition::preimage(b"ccc"),
            ],
        )
        .unwrap();
        let json = serde_json::to_string(&condition).unwrap();
        let back: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, condition);
    }

    #[test]
    fn typeset_display_lists_names() {
        let set: TypeSet = [ConditionType::Preimage, ConditionType::Ed25519]
            .into_iter()
            .collect();
        assert_eq!(set.to_string(), "preimage-sha-256,ed25519-sha-256");
    }
}
