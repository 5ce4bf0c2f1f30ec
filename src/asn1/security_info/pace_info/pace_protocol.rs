use {
    super::super::{KeyAgreement, SymmetricCipher},
    der::{
        asn1::ObjectIdentifier as Oid, DecodeValue, EncodeValue, Error, ErrorKind, FixedTag,
        Header, Length, Reader, Result, Tag, Writer,
    },
    std::fmt::{self, Display, Formatter},
};

/// `id-PACE`, ICAO 9303-11 section 9.2.3.
pub const PACE_OID: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.4");

/// A PACE protocol object identifier: `id-PACE.<mapping>.<cipher>`.
///
/// Domain parameter infos carry the identifier without the cipher arc.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PaceProtocol {
    pub key_agreement: KeyAgreement,
    pub key_mapping: KeyMapping,
    pub cipher: Option<SymmetricCipher>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyMapping {
    /// Generic Mapping
    Gm,

    /// Integrated Mapping
    Im,

    /// Chip Authentication Mapping
    Cam,
}

impl PaceProtocol {
    pub fn oid(&self) -> Result<Oid> {
        let mapping = match (self.key_agreement, self.key_mapping) {
            (KeyAgreement::Dh, KeyMapping::Gm) => 1,
            (KeyAgreement::Ecdh, KeyMapping::Gm) => 2,
            (KeyAgreement::Dh, KeyMapping::Im) => 3,
            (KeyAgreement::Ecdh, KeyMapping::Im) => 4,
            (KeyAgreement::Ecdh, KeyMapping::Cam) => 6,
            (KeyAgreement::Dh, KeyMapping::Cam) => {
                return Err(Error::new(ErrorKind::Value { tag: Oid::TAG }, Length::ZERO))
            }
        };
        let oid = PACE_OID.push_arc(mapping)?;
        match self.cipher {
            None => Ok(oid),
            Some(cipher) => Ok(oid.push_arc(match cipher {
                SymmetricCipher::Tdes => 1,
                SymmetricCipher::Aes128 => 2,
                SymmetricCipher::Aes192 => 3,
                SymmetricCipher::Aes256 => 4,
            })?),
        }
    }
}

impl Display for PaceProtocol {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "PACE-{}-{}", self.key_agreement, self.key_mapping)?;
        if let Some(cipher) = self.cipher {
            write!(f, "-{cipher}")?;
        }
        Ok(())
    }
}

impl TryFrom<Oid> for PaceProtocol {
    type Error = Error;

    fn try_from(oid: Oid) -> Result<Self> {
        let err = Error::new(ErrorKind::OidUnknown { oid }, Length::ZERO);
        let arcs: Vec<_> = oid.arcs().collect();
        let prefix: Vec<_> = PACE_OID.arcs().collect();
        let Some(rest) = arcs.strip_prefix(prefix.as_slice()) else {
            return Err(err);
        };
        let (mapping, cipher) = match *rest {
            [mapping] => (mapping, None),
            [mapping, cipher] => (mapping, Some(cipher)),
            _ => return Err(err),
        };
        let (key_agreement, key_mapping) = match mapping {
            1 => (KeyAgreement::Dh, KeyMapping::Gm),
            2 => (KeyAgreement::Ecdh, KeyMapping::Gm),
            3 => (KeyAgreement::Dh, KeyMapping::Im),
            4 => (KeyAgreement::Ecdh, KeyMapping::Im),
            6 => (KeyAgreement::Ecdh, KeyMapping::Cam),
            _ => return Err(err),
        };
        let cipher = match cipher {
            None => None,
            // 3DES is not defined for CAM.
            Some(1) if key_mapping != KeyMapping::Cam => Some(SymmetricCipher::Tdes),
            Some(2) => Some(SymmetricCipher::Aes128),
            Some(3) => Some(SymmetricCipher::Aes192),
            Some(4) => Some(SymmetricCipher::Aes256),
            Some(_) => return Err(err),
        };
        Ok(Self {
            key_agreement,
            key_mapping,
            cipher,
        })
    }
}

impl FixedTag for PaceProtocol {
    const TAG: Tag = Oid::TAG;
}

impl EncodeValue for PaceProtocol {
    fn value_len(&self) -> Result<Length> {
        self.oid()?.value_len()
    }

    fn encode_value(&self, writer: &mut impl Writer) -> Result<()> {
        self.oid()?.encode_value(writer)
    }
}

impl<'a> DecodeValue<'a> for PaceProtocol {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> Result<Self> {
        let oid = Oid::decode_value(reader, header)?;
        Self::try_from(oid).map_err(|err| Error::new(err.kind(), reader.position()))
    }
}

impl Display for KeyMapping {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Gm => write!(f, "GM"),
            Self::Im => write!(f, "IM"),
            Self::Cam => write!(f, "CAM"),
        }
    }
}
