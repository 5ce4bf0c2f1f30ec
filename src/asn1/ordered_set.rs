use {
    der::{
        Decode, DecodeValue, Encode, EncodeValue, FixedTag, Header, Length, Reader, Result, Tag,
        Writer,
    },
    std::ops::Deref,
};

/// ASN.1 `SET OF` that keeps elements in the order they appear on the chip.
///
/// DER requires sorted `SET OF` elements, but chips in the field do not always comply. File
/// order also matters to the PACE descriptor selection, so it is preserved as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderedSet<T>(pub Vec<T>);

impl<T> Default for OrderedSet<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Deref for OrderedSet<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T> FixedTag for OrderedSet<T> {
    const TAG: Tag = Tag::Set;
}

impl<T: Encode> EncodeValue for OrderedSet<T> {
    fn value_len(&self) -> Result<Length> {
        self.0
            .iter()
            .try_fold(Length::ZERO, |len, elem| len + elem.encoded_len()?)
    }

    fn encode_value(&self, writer: &mut impl Writer) -> Result<()> {
        self.0.iter().try_for_each(|elem| elem.encode(writer))
    }
}

impl<'a, T: Decode<'a>> DecodeValue<'a> for OrderedSet<T> {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> Result<Self> {
        reader.read_nested(header.length, |reader| {
            let mut elements = Vec::new();
            while !reader.is_finished() {
                elements.push(T::decode(reader)?);
            }
            Ok(Self(elements))
        })
    }
}
