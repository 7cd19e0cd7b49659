//! Wire codec for conditions and fulfillments.
//!
//! Both kinds are DER CHOICE values tagged `[type_id]` (context,
//! constructed); the caller supplies which kind it expects, exactly as the
//! surrounding protocol does. Decoding enforces canonical form throughout,
//! so `encode(decode(b)) == b` for every accepted `b` and two distinct byte
//! strings never decode to the same logical value.

use tracing::trace;

use crate::der::{context_constructed, context_primitive, DerReader, DerWriter, Element};
use crate::error::{ConstructionError, DecodeError};
use crate::fulfillment::Fulfillment;
use crate::threshold::{canonical_cmp, sort_encodings};
use crate::types::{Condition, ConditionType, TypeSet};

/// RSA moduli accepted by the wire format, in bytes.
pub(crate) const RSA_MODULUS_BYTES: std::ops::RangeInclusive<usize> = 128..=512;

// --- Encoding ---------------------------------------------------------

/// Canonical binary encoding of a condition.
pub fn encode_condition(condition: &Condition) -> Vec<u8> {
    let mut body = DerWriter::new();
    body.write_tlv(context_primitive(0), &condition.fingerprint);
    body.write_unsigned(context_primitive(1), condition.cost);
    if condition.condition_type.is_compound() {
        body.write_tlv(
            context_primitive(2),
            &condition.subtypes.to_bit_string_content(),
        );
    }

    let mut out = DerWriter::new();
    out.write_tlv(
        context_constructed(condition.condition_type.type_id()),
        &body.into_bytes(),
    );
    out.into_bytes()
}

/// Canonical binary encoding of a fulfillment.
pub fn encode_fulfillment(fulfillment: &Fulfillment) -> Vec<u8> {
    let body = match fulfillment {
        Fulfillment::Preimage { preimage } => {
            let mut body = DerWriter::new();
            body.write_tlv(context_primitive(0), preimage);
            body.into_bytes()
        }
        Fulfillment::Prefix {
            prefix,
            max_message_length,
            subfulfillment,
        } => {
            let mut body = DerWriter::new();
            body.write_tlv(context_primitive(0), prefix);
            body.write_unsigned(context_primitive(1), *max_message_length);
            body.write_tlv(context_constructed(2), &encode_fulfillment(subfulfillment));
            body.into_bytes()
        }
        Fulfillment::Threshold {
            subfulfillments,
            subconditions,
            ..
        } => {
            let mut fulfillment_set: Vec<Vec<u8>> =
                subfulfillments.iter().map(encode_fulfillment).collect();
            sort_encodings(&mut fulfillment_set);
            let mut condition_set: Vec<Vec<u8>> =
                subconditions.iter().map(Condition::encode).collect();
            sort_encodings(&mut condition_set);

            let mut body = DerWriter::new();
            body.write_tlv(context_constructed(0), &fulfillment_set.concat());
            body.write_tlv(context_constructed(1), &condition_set.concat());
            body.into_bytes()
        }
        Fulfillment::Rsa { modulus, signature } => {
            let mut body = DerWriter::new();
            body.write_tlv(context_primitive(0), modulus);
            body.write_tlv(context_primitive(1), signature);
            body.into_bytes()
        }
        Fulfillment::Ed25519 {
            public_key,
            signature,
        } => {
            let mut body = DerWriter::new();
            body.write_tlv(context_primitive(0), public_key);
            body.write_tlv(context_primitive(1), signature);
            body.into_bytes()
        }
    };

    let mut out = DerWriter::new();
    out.write_tlv(
        context_constructed(fulfillment.condition_type().type_id()),
        &body,
    );
    out.into_bytes()
}

// --- Decoding ---------------------------------------------------------

/// Decode a condition, rejecting any non-canonical encoding.
pub fn decode_condition(bytes: &[u8]) -> Result<Condition, DecodeError> {
    trace!(len = bytes.len(), "decoding condition");
    let mut reader = DerReader::new(bytes);
    let condition = read_condition(&mut reader)?;
    reader.finish()?;
    Ok(condition)
}

/// Decode a fulfillment, rejecting any non-canonical encoding.
pub fn decode_fulfillment(bytes: &[u8]) -> Result<Fulfillment, DecodeError> {
    trace!(len = bytes.len(), "decoding fulfillment");
    let mut reader = DerReader::new(bytes);
    let fulfillment = read_fulfillment(&mut reader)?;
    reader.finish()?;
    Ok(fulfillment)
}

/// Read the CHOICE header and resolve its condition type.
fn read_choice<'a>(
    reader: &mut DerReader<'a>,
) -> Result<(ConditionType, Element<'a>), DecodeError> {
    let element = reader.read_element()?;
    if element.tag & 0xE0 != 0xA0 {
        return Err(DecodeError::UnexpectedTag {
            offset: element.offset,
            expected: 0xA0,
            found: element.tag,
        });
    }
    let type_id = element.tag & 0x1F;
    let condition_type = ConditionType::from_type_id(type_id)
        .ok_or(DecodeError::UnknownType { type_id })?;
    Ok((condition_type, element))
}

pub(crate) fn read_condition(reader: &mut DerReader<'_>) -> Result<Condition, DecodeError> {
    let (condition_type, element) = read_choice(reader)?;
    let mut body = DerReader::descend(element);

    let fingerprint_field = body.read_expected(context_primitive(0))?;
    let fingerprint: [u8; 32] =
        fingerprint_field
            .content
            .try_into()
            .map_err(|_| DecodeError::FieldOutOfRange {
                offset: fingerprint_field.content_offset,
                field: "fingerprint",
                reason: format!("expected 32 bytes, found {}", fingerprint_field.content.len()),
            })?;

    let cost = body.read_unsigned(context_primitive(1), "cost")?;

    let subtypes = if condition_type.is_compound() {
        let subtypes_field = body.read_expected(context_primitive(2))?;
        TypeSet::from_bit_string_content(subtypes_field.content, subtypes_field.content_offset)?
    } else {
        TypeSet::EMPTY
    };

    body.finish()?;
    Ok(Condition::new(condition_type, fingerprint, cost, subtypes))
}

pub(crate) fn read_fulfillment(reader: &mut DerReader<'_>) -> Result<Fulfillment, DecodeError> {
    let (condition_type, element) = read_choice(reader)?;
    let mut body = DerReader::descend(element);

    let fulfillment = match condition_type {
        ConditionType::Preimage => {
            let preimage = body.read_expected(context_primitive(0))?;
            Fulfillment::Preimage {
                preimage: preimage.content.to_vec(),
            }
        }
        ConditionType::Prefix => {
            let prefix = body.read_expected(context_primitive(0))?;
            let max_field_offset = body.offset();
            let max_message_length =
                body.read_unsigned(context_primitive(1), "max_message_length")?;
            if max_message_length > u64::from(u32::MAX) {
                return Err(DecodeError::FieldOutOfRange {
                    offset: max_field_offset,
                    field: "max_message_length",
                    reason: format!("{max_message_length} exceeds 4294967295"),
                });
            }
            let wrapper = body.read_expected(context_constructed(2))?;
            let mut inner = DerReader::descend(wrapper);
            let subfulfillment = read_fulfillment(&mut inner)?;
            inner.finish()?;
            Fulfillment::Prefix {
                prefix: prefix.content.to_vec(),
                max_message_length,
                subfulfillment: Box::new(subfulfillment),
            }
        }
        ConditionType::Threshold => {
            let fulfillment_set = body.read_expected(context_constructed(0))?;
            let subfulfillments = read_set(fulfillment_set, read_fulfillment)?;
            if subfulfillments.is_empty() {
                return Err(DecodeError::FieldOutOfRange {
                    offset: fulfillment_set.content_offset,
                    field: "subfulfillments",
                    reason: "a threshold must carry at least one subfulfillment".to_string(),
                });
            }
            // The wire carries no explicit threshold; it is the number of
            // fulfillments actually supplied, and must fit the field.
            let threshold = u16::try_from(subfulfillments.len()).map_err(|_| {
                DecodeError::FieldOutOfRange {
                    offset: fulfillment_set.content_offset,
                    field: "subfulfillments",
                    reason: format!(
                        "{} subfulfillments exceed the threshold limit of {}",
                        subfulfillments.len(),
                        u16::MAX
                    ),
                }
            })?;
            let condition_set = body.read_expected(context_constructed(1))?;
            let subconditions = read_set(condition_set, read_condition)?;
            Fulfillment::Threshold {
                threshold,
                subfulfillments,
                subconditions,
            }
        }
        ConditionType::Rsa => {
            let modulus = body.read_expected(context_primitive(0))?;
            check_rsa_modulus(modulus.content, modulus.content_offset)?;
            let signature = body.read_expected(context_primitive(1))?;
            if signature.content.len() != modulus.content.len() {
                return Err(DecodeError::FieldOutOfRange {
                    offset: signature.content_offset,
                    field: "signature",
                    reason: format!(
                        "expected {} bytes to match the modulus, found {}",
                        modulus.content.len(),
                        signature.content.len()
                    ),
                });
            }
            Fulfillment::Rsa {
                modulus: modulus.content.to_vec(),
                signature: signature.content.to_vec(),
            }
        }
        ConditionType::Ed25519 => {
            let public_key = body.read_expected(context_primitive(0))?;
            let public_key: [u8; 32] =
                public_key
                    .content
                    .try_into()
                    .map_err(|_| DecodeError::FieldOutOfRange {
                        offset: public_key.content_offset,
                        field: "public_key",
                        reason: format!("expected 32 bytes, found {}", public_key.content.len()),
                    })?;
            let signature = body.read_expected(context_primitive(1))?;
            let signature: [u8; 64] =
                signature
                    .content
                    .try_into()
                    .map_err(|_| DecodeError::FieldOutOfRange {
                        offset: signature.content_offset,
                        field: "signature",
                        reason: format!("expected 64 bytes, found {}", signature.content.len()),
                    })?;
            Fulfillment::Ed25519 {
                public_key,
                signature,
            }
        }
    };

    body.finish()?;
    Ok(fulfillment)
}

/// Read a SET OF from a constructed element, enforcing strictly ascending
/// canonical order of the raw element encodings. Duplicates are rejected:
/// a branch listed twice would double-count toward the threshold.
fn read_set<'a, T>(
    set: Element<'a>,
    mut read_one: impl FnMut(&mut DerReader<'a>) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let mut reader = DerReader::descend(set);
    let mut items = Vec::new();
    let mut previous: Option<&[u8]> = None;
    while !reader.is_empty() {
        let offset = reader.offset();
        let item = read_one(&mut reader)?;
        // Raw encoding of the element just read, for the ordering check.
        let raw = &set.content[offset - set.content_offset..reader.offset() - set.content_offset];
        if let Some(prev) = previous {
            if canonical_cmp(prev, raw) != std::cmp::Ordering::Less {
                return Err(DecodeError::NonCanonicalOrdering { offset });
            }
        }
        previous = Some(raw);
        items.push(item);
    }
    Ok(items)
}

/// Modulus shape check for constructors, folded into a construction error.
pub(crate) fn rsa_modulus_shape(modulus: &[u8]) -> Result<(), ConstructionError> {
    check_rsa_modulus(modulus, 0).map_err(|err| match err {
        DecodeError::FieldOutOfRange { field, reason, .. } => {
            ConstructionError::FieldOutOfRange { field, reason }
        }
        _ => ConstructionError::FieldOutOfRange {
            field: "modulus",
            reason: err.to_string(),
        },
    })
}

pub(crate) fn check_rsa_modulus(modulus: &[u8], offset: usize) -> Result<(), DecodeError> {
    if !RSA_MODULUS_BYTES.contains(&modulus.len()) {
        return Err(DecodeError::FieldOutOfRange {
            offset,
            field: "modulus",
            reason: format!(
                "expected between {} and {} bytes, found {}",
                RSA_MODULUS_BYTES.start(),
                RSA_MODULUS_BYTES.end(),
                modulus.len()
            ),
        });
    }
    if modulus[0] == 0 {
        return Err(DecodeError::FieldOutOfRange {
            offset,
            field: "modulus",
            reason: "leading zero octet".to_string(),
        });
    }
    Ok(())
}
