//! Canonical DER reader and writer for the condition wire format.
//!
//! Only the small TLV subset the wire format needs is implemented: context
//! tags, SEQUENCE, minimal definite lengths, and non-negative minimal
//! INTEGER contents. The reader enforces canonical form while reading, so a
//! successfully decoded value re-encodes byte-for-byte to its input.

use crate::error::DecodeError;

/// Universal SEQUENCE tag (constructed).
pub(crate) const TAG_SEQUENCE: u8 = 0x30;

/// Context-class primitive tag `[n]`.
pub(crate) fn context_primitive(n: u8) -> u8 {
    0x80 | n
}

/// Context-class constructed tag `[n]`.
pub(crate) fn context_constructed(n: u8) -> u8 {
    0xA0 | n
}

/// Minimal DER INTEGER content octets for a non-negative value: big-endian,
/// no superfluous leading octets, a zero octet prepended when the high bit
/// would otherwise read as a sign.
pub(crate) fn unsigned_content(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count().min(7);
    let mut content = bytes[skip..].to_vec();
    if content[0] & 0x80 != 0 {
        content.insert(0, 0x00);
    }
    content
}

/// Parse minimal DER INTEGER content octets into a non-negative value.
pub(crate) fn unsigned_from_content(
    content: &[u8],
    offset: usize,
    field: &'static str,
) -> Result<u64, DecodeError> {
    match content {
        [] => Err(DecodeError::NonCanonicalInteger { offset }),
        [first, ..] if *first & 0x80 != 0 => Err(DecodeError::FieldOutOfRange {
            offset,
            field,
            reason: "negative integer".to_string(),
        }),
        [0x00, second, ..] if *second & 0x80 == 0 => {
            Err(DecodeError::NonCanonicalInteger { offset })
        }
        _ => {
            // At most 8 value octets fit in u64; 9 are allowed when the
            // first is the sign-clearing zero.
            let digits = if content[0] == 0x00 {
                &content[1..]
            } else {
                content
            };
            if digits.len() > 8 {
                return Err(DecodeError::FieldOutOfRange {
                    offset,
                    field,
                    reason: format!("{} integer octets exceed 64 bits", content.len()),
                });
            }
            let mut value = 0u64;
            for b in digits {
                value = value << 8 | u64::from(*b);
            }
            Ok(value)
        }
    }
}

/// Append-only writer producing canonical DER.
#[derive(Debug, Default)]
pub(crate) struct DerWriter {
    buf: Vec<u8>,
}

impl DerWriter {
    pub(crate) fn new() -> Self {
        DerWriter::default()
    }

    /// Write one tag-length-value with a minimal length field.
    pub(crate) fn write_tlv(&mut self, tag: u8, content: &[u8]) {
        self.buf.push(tag);
        self.write_length(content.len());
        self.buf.extend_from_slice(content);
    }

    /// Write a tagged non-negative INTEGER.
    pub(crate) fn write_unsigned(&mut self, tag: u8, value: u64) {
        let content = unsigned_content(value);
        self.write_tlv(tag, &content);
    }

    fn write_length(&mut self, len: usize) {
        if len < 0x80 {
            self.buf.push(len as u8);
        } else {
            let bytes = len.to_be_bytes();
            let skip = bytes.iter().take_while(|b| **b == 0).count();
            let digits = &bytes[skip..];
            self.buf.push(0x80 | digits.len() as u8);
            self.buf.extend_from_slice(digits);
        }
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// One element read from the input: its tag, content octets, and the full
/// encoding including the header (used for canonical set ordering).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Element<'a> {
    pub(crate) tag: u8,
    pub(crate) content: &'a [u8],
    pub(crate) raw: &'a [u8],
    /// Absolute offset of the element's tag byte.
    pub(crate) offset: usize,
    /// Absolute offset of the element's content octets.
    pub(crate) content_offset: usize,
}

/// Cursor over DER input that rejects non-canonical form as it reads.
#[derive(Debug)]
pub(crate) struct DerReader<'a> {
    input: &'a [u8],
    pos: usize,
    /// Absolute offset of `input[0]` in the outermost buffer, so nested
    /// readers report offsets against the original input.
    base: usize,
}

impl<'a> DerReader<'a> {
    pub(crate) fn new(input: &'a [u8]) -> Self {
        DerReader {
            input,
            pos: 0,
            base: 0,
        }
    }

    fn nested(element: Element<'a>) -> Self {
        DerReader {
            input: element.content,
            pos: 0,
            base: element.content_offset,
        }
    }

    /// Absolute offset of the next unread byte.
    pub(crate) fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos == self.input.len()
    }

    /// Require that every byte was consumed.
    pub(crate) fn finish(&self) -> Result<(), DecodeError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::TrailingBytes {
                offset: self.offset(),
                count: self.input.len() - self.pos,
            })
        }
    }

    /// Read the next element, whatever its tag.
    pub(crate) fn read_element(&mut self) -> Result<Element<'a>, DecodeError> {
        let offset = self.offset();
        let start = self.pos;
        let tag = *self
            .input
            .get(self.pos)
            .ok_or(DecodeError::TruncatedInput { offset, needed: 1 })?;
        self.pos += 1;
        let len = self.read_length()?;
        let content_offset = self.offset();
        if self.input.len() - self.pos < len {
            return Err(DecodeError::TruncatedInput {
                offset: content_offset,
                needed: len - (self.input.len() - self.pos),
            });
        }
        let content = &self.input[self.pos..self.pos + len];
        self.pos += len;
        Ok(Element {
            tag,
            content,
            raw: &self.input[start..self.pos],
            offset,
            content_offset,
        })
    }

    /// Read the next element and require a specific tag.
    pub(crate) fn read_expected(&mut self, expected: u8) -> Result<Element<'a>, DecodeError> {
        let element = self.read_element()?;
        if element.tag != expected {
            return Err(DecodeError::UnexpectedTag {
                offset: element.offset,
                expected,
                found: element.tag,
            });
        }
        Ok(element)
    }

    /// Read a tagged non-negative INTEGER with canonical content.
    pub(crate) fn read_unsigned(
        &mut self,
        expected: u8,
        field: &'static str,
    ) -> Result<u64, DecodeError> {
        let element = self.read_expected(expected)?;
        unsigned_from_content(element.content, element.content_offset, field)
    }

    /// Descend into a constructed element's content.
    pub(crate) fn descend(element: Element<'a>) -> DerReader<'a> {
        DerReader::nested(element)
    }

    /// Read a definite length field, rejecting every non-minimal form.
    fn read_length(&mut self) -> Result<usize, DecodeError> {
        let offset = self.offset();
        let first = *self
            .input
            .get(self.pos)
            .ok_or(DecodeError::TruncatedInput { offset, needed: 1 })?;
        self.pos += 1;

        if first < 0x80 {
            return Ok(usize::from(first));
        }
        // 0x80 is the indefinite form, never canonical in DER.
        let count = usize::from(first & 0x7f);
        if count == 0 || count > 8 {
            return Err(DecodeError::NonCanonicalLength { offset });
        }
        if self.input.len() - self.pos < count {
            return Err(DecodeError::TruncatedInput {
                offset: self.offset(),
                needed: count - (self.input.len() - self.pos),
            });
        }
        let digits = &self.input[self.pos..self.pos + count];
        self.pos += count;
        if digits[0] == 0 {
            return Err(DecodeError::NonCanonicalLength { offset });
        }
        let mut len = 0usize;
        for b in digits {
            len = len
                .checked_shl(8)
                .and_then(|v| v.checked_add(usize::from(*b)))
                .ok_or(DecodeError::NonCanonicalLength { offset })?;
        }
        // The long form is only canonical when the short form cannot hold it.
        if len < 0x80 {
            return Err(DecodeError::NonCanonicalLength { offset });
        }
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
        let mut w = DerWriter::new();
        w.write_tlv(tag, content);
        w.into_bytes()
    }

    #[test]
    fn short_form_length() {
        assert_eq!(tlv(0x80, &[0xAB]), vec![0x80, 0x01, 0xAB]);
        assert_eq!(tlv(0x80, &[]), vec![0x80, 0x00]);
    }

    #[test]
    fn long_form_length() {
        let content = vec![0x55u8; 130];
        let encoded = tlv(0x80, &content);
        assert_eq!(&encoded[..3], &[0x80, 0x81, 130]);
        assert_eq!(encoded.len(), 3 + 130);

        let content = vec![0x55u8; 300];
        let encoded = tlv(0x80, &content);
        assert_eq!(&encoded[..4], &[0x80, 0x82, 0x01, 0x2C]);
    }

    #[test]
    fn reader_round_trips_writer() {
        let encoded = tlv(0xA1, &[1, 2, 3]);
        let mut reader = DerReader::new(&encoded);
        let element = reader.read_expected(0xA1).unwrap();
        assert_eq!(element.content, &[1, 2, 3]);
        assert_eq!(element.raw, &encoded[..]);
        reader.finish().unwrap();
    }

    #[test]
    fn rejects_long_form_for_short_value() {
        // 0x81 0x05 announces 5 bytes that fit the short form.
        let bytes = [0x80, 0x81, 0x05, 1, 2, 3, 4, 5];
        let mut reader = DerReader::new(&bytes);
        assert_matches!(
            reader.read_element(),
            Err(DecodeError::NonCanonicalLength { offset: 1 })
        );
    }

    #[test]
    fn rejects_leading_zero_length_digit() {
        let mut bytes = vec![0x80, 0x82, 0x00, 0x81];
        bytes.extend(vec![0u8; 0x81]);
        let mut reader = DerReader::new(&bytes);
        assert_matches!(
            reader.read_element(),
            Err(DecodeError::NonCanonicalLength { .. })
        );
    }

    #[test]
    fn rejects_indefinite_length() {
        let bytes = [0x80, 0x80, 0x00, 0x00];
        let mut reader = DerReader::new(&bytes);
        assert_matches!(
            reader.read_element(),
            Err(DecodeError::NonCanonicalLength { .. })
        );
    }

    #[test]
    fn reports_truncation_with_missing_count() {
        let bytes = [0x80, 0x05, 1, 2];
        let mut reader = DerReader::new(&bytes);
        assert_matches!(
            reader.read_element(),
            Err(DecodeError::TruncatedInput { needed: 3, .. })
        );
    }

    #[test]
    fn unsigned_content_is_minimal() {
        assert_eq!(unsigned_content(0), vec![0x00]);
        assert_eq!(unsigned_content(3), vec![0x03]);
        assert_eq!(unsigned_content(127), vec![0x7F]);
        // High bit set: a sign-clearing zero octet is required.
        assert_eq!(unsigned_content(128), vec![0x00, 0x80]);
        assert_eq!(unsigned_content(131072), vec![0x02, 0x00, 0x00]);
    }

    #[test]
    fn unsigned_content_round_trips() {
        for value in [0u64, 1, 127, 128, 255, 256, 65535, 131072, u64::MAX] {
            let content = unsigned_content(value);
            assert_eq!(unsigned_from_content(&content, 0, "test"), Ok(value));
        }
    }

    #[test]
    fn rejects_padded_integer() {
        // 0x00 0x03 encodes 3 with a superfluous leading octet.
        assert_matches!(
            unsigned_from_content(&[0x00, 0x03], 5, "cost"),
            Err(DecodeError::NonCanonicalInteger { offset: 5 })
        );
    }

    #[test]
    fn rejects_negative_integer() {
        assert_matches!(
            unsigned_from_content(&[0xFF], 0, "cost"),
            Err(DecodeError::FieldOutOfRange { field: "cost", .. })
        );
    }

    #[test]
    fn rejects_empty_integer() {
        assert_matches!(
            unsigned_from_content(&[], 0, "cost"),
            Err(DecodeError::NonCanonicalInteger { .. })
        );
    }

    #[test]
    fn nested_reader_reports_absolute_offsets() {
        // Outer [1] wrapping inner [0] with a bad length.
        let bytes = [0xA1, 0x04, 0x80, 0x81, 0x01, 0xAA];
        let mut reader = DerReader::new(&bytes);
        let outer = reader.read_expected(0xA1).unwrap();
        let mut inner = DerReader::descend(outer);
        assert_matches!(
            inner.read_element(),
            Err(DecodeError::NonCanonicalLength { offset: 3 })
        );
    }
}
