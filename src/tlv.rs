//! ISO 7816 flavoured BER-TLV.
//!
//! The LDS files and the secure messaging data objects use BER with hex tag names (`5F1F`,
//! `7F61`) rather than ASN.1 class/number pairs, so they are parsed here instead of through
//! `der`. Parsing is lazy: [`TlvIter`] yields one object at a time and constructed values are
//! only descended into through [`Tlv::children`].

use {
    crate::ensure_err,
    std::fmt::{self, Display, Formatter},
    thiserror::Error,
};

/// Maximum number of bytes in a tag.
const MAX_TAG_LEN: usize = 3;

/// Maximum number of bytes in a long form length.
const MAX_LENGTH_LEN: usize = 4;

/// Maximum nesting of constructed values. LDS files nest at most five levels deep.
pub const MAX_DEPTH: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("truncated tag")]
    TruncatedTag,

    #[error("tag longer than three bytes")]
    TagTooLong,

    #[error("truncated length")]
    TruncatedLength,

    #[error("unsupported length form {0:#04X}")]
    UnsupportedLength(u8),

    #[error("length {length} exceeds remaining {remaining} bytes")]
    LengthExceedsBuffer { length: usize, remaining: usize },

    #[error("indefinite length without end-of-contents")]
    MissingEndOfContents,

    #[error("indefinite length on primitive tag {0}")]
    IndefinitePrimitive(Tag),

    #[error("unexpected end-of-contents marker")]
    UnexpectedEndOfContents,

    #[error("expected tag {expected}, found {found}")]
    UnexpectedTag { expected: Tag, found: Tag },

    #[error("missing tag {0}")]
    MissingTag(Tag),

    #[error("trailing data after TLV")]
    TrailingData,

    #[error("nesting deeper than {MAX_DEPTH} levels")]
    NestingTooDeep,

    #[error("invalid value: {0}")]
    InvalidValue(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A BER tag, stored with its leading byte most significant: `5F1F` is `Tag(0x5F1F)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub u32);

/// A single tag-length-value object borrowing from the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tlv<'a> {
    tag: Tag,
    value: &'a [u8],
    /// Encoded size including tag, length and, for indefinite lengths, the terminator.
    encoded_len: usize,
}

/// Lazy iterator over consecutive TLV objects.
///
/// After the first error the iterator is fused.
#[derive(Clone, Debug)]
pub struct TlvIter<'a> {
    data: &'a [u8],
    failed: bool,
}

impl Tag {
    /// Number of bytes in the encoded tag.
    pub fn byte_len(self) -> usize {
        match self.0 {
            0..=0xFF => 1,
            0x100..=0xFFFF => 2,
            0x1_0000..=0xFF_FFFF => 3,
            _ => 4,
        }
    }

    fn leading_byte(self) -> u8 {
        (self.0 >> (8 * (self.byte_len() - 1))) as u8
    }

    /// Bit 6 of the leading byte.
    pub fn is_constructed(self) -> bool {
        self.leading_byte() & 0x20 != 0
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.0.to_be_bytes()[4 - self.byte_len()..].to_vec()
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$X}", self.0, width = 2 * self.byte_len())
    }
}

impl From<u32> for Tag {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl<'a> Tlv<'a> {
    /// Parse exactly one TLV object spanning all of `data`.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let (tlv, rest) = parse_next(data)?;
        ensure_err!(rest.is_empty(), Error::TrailingData);
        Ok(tlv)
    }

    /// Parse one TLV object and require it to carry `tag`. Trailing bytes are ignored.
    pub fn parse_tagged(data: &'a [u8], tag: u32) -> Result<Self> {
        let (tlv, _) = parse_next(data)?;
        tlv.expect_tag(tag)
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn value(&self) -> &'a [u8] {
        self.value
    }

    pub fn encoded_len(&self) -> usize {
        self.encoded_len
    }

    pub fn is_constructed(&self) -> bool {
        self.tag.is_constructed()
    }

    pub fn expect_tag(self, tag: u32) -> Result<Self> {
        let expected = Tag(tag);
        ensure_err!(
            self.tag == expected,
            Error::UnexpectedTag {
                expected,
                found: self.tag,
            }
        );
        Ok(self)
    }

    /// Nested objects of a constructed value.
    pub fn children(&self) -> TlvIter<'a> {
        TlvIter::new(self.value)
    }

    /// First direct child with the given tag.
    pub fn find(&self, tag: u32) -> Result<Option<Tlv<'a>>> {
        let tag = Tag(tag);
        for child in self.children() {
            let child = child?;
            if child.tag == tag {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    pub fn require(&self, tag: u32) -> Result<Tlv<'a>> {
        self.find(tag)?.ok_or(Error::MissingTag(Tag(tag)))
    }

    /// Fully descend into all constructed values, failing on the first structural error.
    pub fn validate(&self) -> Result<()> {
        self.validate_at(0)
    }

    fn validate_at(&self, depth: usize) -> Result<()> {
        if self.is_constructed() {
            ensure_err!(depth < MAX_DEPTH, Error::NestingTooDeep);
            for child in self.children() {
                child?.validate_at(depth + 1)?;
            }
        }
        Ok(())
    }
}

impl<'a> TlvIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            failed: false,
        }
    }
}

impl<'a> Iterator for TlvIter<'a> {
    type Item = Result<Tlv<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.data.is_empty() {
            return None;
        }
        match parse_next(self.data) {
            Ok((tlv, rest)) => {
                self.data = rest;
                Some(Ok(tlv))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Parse the next TLV object, returning it and the remaining input.
pub fn parse_next(data: &[u8]) -> Result<(Tlv<'_>, &[u8])> {
    parse_next_at(data, 0)
}

fn parse_next_at(data: &[u8], depth: usize) -> Result<(Tlv<'_>, &[u8])> {
    let (tag, tag_len) = parse_tag(data)?;
    ensure_err!(tag != Tag(0), Error::UnexpectedEndOfContents);
    let rest = &data[tag_len..];
    let (length, length_len) = parse_length(rest)?;
    let rest = &rest[length_len..];
    match length {
        Some(length) => {
            ensure_err!(
                length <= rest.len(),
                Error::LengthExceedsBuffer {
                    length,
                    remaining: rest.len(),
                }
            );
            let tlv = Tlv {
                tag,
                value: &rest[..length],
                encoded_len: tag_len + length_len + length,
            };
            Ok((tlv, &rest[length..]))
        }
        None => {
            ensure_err!(tag.is_constructed(), Error::IndefinitePrimitive(tag));
            ensure_err!(depth < MAX_DEPTH, Error::NestingTooDeep);
            let length = indefinite_value_len(rest, depth + 1)?;
            let tlv = Tlv {
                tag,
                value: &rest[..length],
                encoded_len: tag_len + length_len + length + 2,
            };
            Ok((tlv, &rest[length + 2..]))
        }
    }
}

/// Length of an indefinite value, excluding its `00 00` terminator.
fn indefinite_value_len(data: &[u8], depth: usize) -> Result<usize> {
    let mut offset = 0;
    loop {
        let rest = &data[offset..];
        match rest {
            [] | [0x00] => return Err(Error::MissingEndOfContents),
            [0x00, 0x00, ..] => return Ok(offset),
            _ => {
                let (child, _) = parse_next_at(rest, depth).map_err(|err| match err {
                    Error::TruncatedTag | Error::TruncatedLength => Error::MissingEndOfContents,
                    err => err,
                })?;
                offset += child.encoded_len;
            }
        }
    }
}

fn parse_tag(data: &[u8]) -> Result<(Tag, usize)> {
    let first = *data.first().ok_or(Error::TruncatedTag)?;
    let mut tag = first as u32;
    let mut len = 1;
    if first & 0x1F == 0x1F {
        loop {
            let byte = *data.get(len).ok_or(Error::TruncatedTag)?;
            len += 1;
            ensure_err!(len <= MAX_TAG_LEN, Error::TagTooLong);
            tag = (tag << 8) | byte as u32;
            if byte & 0x80 == 0 {
                break;
            }
        }
    }
    Ok((Tag(tag), len))
}

/// Returns `None` for the indefinite form.
fn parse_length(data: &[u8]) -> Result<(Option<usize>, usize)> {
    let first = *data.first().ok_or(Error::TruncatedLength)?;
    match first {
        0x00..=0x7F => Ok((Some(first as usize), 1)),
        0x80 => Ok((None, 1)),
        0x81..=0x84 => {
            let n = (first & 0x7F) as usize;
            debug_assert!(n <= MAX_LENGTH_LEN);
            let bytes = data.get(1..1 + n).ok_or(Error::TruncatedLength)?;
            let length = bytes
                .iter()
                .fold(0_usize, |acc, &b| (acc << 8) | b as usize);
            Ok((Some(length), 1 + n))
        }
        _ => Err(Error::UnsupportedLength(first)),
    }
}

/// Total encoded size of the TLV object starting at `data`, if its header is complete.
///
/// Used to size a file from its first read. Indefinite lengths are rejected since the size
/// cannot be known up front.
pub fn sniff_len(data: &[u8]) -> Result<Option<usize>> {
    let (tag_len, length_len, length) = match parse_tag(data) {
        Ok((_, tag_len)) => match parse_length(&data[tag_len..]) {
            Ok((Some(length), length_len)) => (tag_len, length_len, length),
            Ok((None, _)) => return Err(Error::UnsupportedLength(0x80)),
            Err(Error::TruncatedLength) => return Ok(None),
            Err(err) => return Err(err),
        },
        Err(Error::TruncatedTag) => return Ok(None),
        Err(err) => return Err(err),
    };
    Ok(Some(tag_len + length_len + length))
}

pub fn encode_length(length: usize, out: &mut Vec<u8>) {
    match length {
        0..=0x7F => out.push(length as u8),
        0x80..=0xFF => out.extend_from_slice(&[0x81, length as u8]),
        0x100..=0xFFFF => {
            out.push(0x82);
            out.extend_from_slice(&(length as u16).to_be_bytes());
        }
        0x1_0000..=0xFF_FFFF => {
            out.push(0x83);
            out.extend_from_slice(&(length as u32).to_be_bytes()[1..]);
        }
        _ => {
            out.push(0x84);
            out.extend_from_slice(&(length as u32).to_be_bytes());
        }
    }
}

/// Definite length encoding of a single object.
pub fn encode(tag: u32, value: &[u8]) -> Vec<u8> {
    let mut out = Tag(tag).to_bytes();
    encode_length(value.len(), &mut out);
    out.extend_from_slice(value);
    out
}
