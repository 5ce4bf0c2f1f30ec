//! `ContentInfo` with the content type fixed at compile time.
//!
//! [`cms::content_info::ContentInfo`] carries the content as an untyped `Any`; here the
//! content type OID comes from the [`ContentType`] implementation of the payload, so a
//! mismatch is reported while decoding.

use der::{
    asn1::{ContextSpecific, ContextSpecificRef, ObjectIdentifier},
    Decode, DecodeValue, Encode, EncodeValue, Error, ErrorKind, Header, Length, Reader, Result,
    Sequence, Tag, TagMode, TagNumber, Tagged, Writer,
};

pub trait ContentType: Encode + EncodeValue + Tagged + for<'a> Decode<'a> {
    const CONTENT_TYPE: ObjectIdentifier;
}

/// RFC 5652 section 3:
///
/// ```text
///   ContentInfo ::= SEQUENCE {
///       contentType        ContentType,
///       content            [0] EXPLICIT ANY DEFINED BY contentType }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContentInfo<T: ContentType>(pub T);

impl<T: ContentType> ContentInfo<T> {
    fn content(&self) -> ContextSpecificRef<'_, T> {
        ContextSpecificRef {
            tag_number: TagNumber::N0,
            tag_mode: TagMode::Explicit,
            value: &self.0,
        }
    }
}

impl<T: ContentType> Sequence<'_> for ContentInfo<T> {}

impl<T: ContentType> EncodeValue for ContentInfo<T> {
    fn value_len(&self) -> Result<Length> {
        T::CONTENT_TYPE.encoded_len()? + self.content().encoded_len()?
    }

    fn encode_value(&self, writer: &mut impl Writer) -> Result<()> {
        T::CONTENT_TYPE.encode(writer)?;
        self.content().encode(writer)
    }
}

impl<'a, T: ContentType> DecodeValue<'a> for ContentInfo<T> {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> Result<Self> {
        reader.read_nested(header.length, |reader| {
            let oid: ObjectIdentifier = reader.decode()?;
            if oid != T::CONTENT_TYPE {
                return Err(Error::new(ErrorKind::OidUnknown { oid }, reader.position()));
            }
            let content = ContextSpecific::<T>::decode_explicit(reader, TagNumber::N0)?
                .ok_or_else(|| {
                    Tag::ContextSpecific {
                        number: TagNumber::N0,
                        constructed: true,
                    }
                    .value_error()
                })?;
            Ok(Self(content.value))
        })
    }
}
