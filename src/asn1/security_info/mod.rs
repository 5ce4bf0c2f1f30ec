mod pace_info;

pub use self::pace_info::{
    KeyMapping, PaceDomainParameterInfo, PaceInfo, PaceProtocol, PACE_OID,
};
use {
    super::ordered_set::OrderedSet,
    der::{
        asn1::ObjectIdentifier as Oid, Any, Decode, DecodeValue, Encode, EncodeValue, Error,
        Header, Length, Reader, Result, Sequence, Writer,
    },
    serde::{Deserialize, Serialize},
    std::fmt::{self, Display, Formatter},
};

/// A `SecurityInfos` object from ICAO 9303-11 section 9.2, in file order.
///
/// ```asn1
/// SecurityInfos ::= SET OF SecurityInfo
/// ```
pub type SecurityInfos = OrderedSet<SecurityInfo>;

/// The `SecurityInfo` subtypes this reader acts on. Everything else (chip authentication,
/// terminal authentication, EF.DIR, ...) is kept undecoded.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SecurityInfo {
    Pace(PaceInfo),
    PaceDomainParameter(PaceDomainParameterInfo),
    Other(AnySecurityInfo),
}

/// A generic `SecurityInfo` from ICAO 9303-11 section 9.2.
///
/// ```asn1
/// SecurityInfo ::= SEQUENCE {
///     protocol OBJECT IDENTIFIER,
///     requiredData ANY DEFINED BY protocol,
///     optionalData ANY DEFINED BY protocol OPTIONAL
/// }
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Sequence)]
pub struct AnySecurityInfo {
    pub protocol: Oid,
    pub required_data: Any,
    pub optional_data: Option<Any>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyAgreement {
    /// Diffie-Hellman over a prime field.
    Dh,

    /// Elliptic Curve Diffie-Hellman.
    Ecdh,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SymmetricCipher {
    Tdes,
    Aes128,
    Aes192,
    Aes256,
}

impl SecurityInfo {
    pub fn protocol(&self) -> Result<Oid> {
        match self {
            Self::Pace(info) => info.protocol.oid(),
            Self::PaceDomainParameter(info) => info.protocol.oid(),
            Self::Other(info) => Ok(info.protocol),
        }
    }
}

impl SecurityInfos {
    /// PACE descriptors in file order.
    pub fn pace_infos(&self) -> impl Iterator<Item = &PaceInfo> {
        self.iter().filter_map(|info| match info {
            SecurityInfo::Pace(pace) => Some(pace),
            _ => None,
        })
    }
}

impl Sequence<'_> for SecurityInfo {}

impl EncodeValue for SecurityInfo {
    fn value_len(&self) -> Result<Length> {
        match self {
            Self::Pace(info) => info.value_len(),
            Self::PaceDomainParameter(info) => info.value_len(),
            Self::Other(info) => info.value_len(),
        }
    }

    fn encode_value(&self, writer: &mut impl Writer) -> Result<()> {
        match self {
            Self::Pace(info) => info.encode_value(writer),
            Self::PaceDomainParameter(info) => info.encode_value(writer),
            Self::Other(info) => info.encode_value(writer),
        }
    }
}

impl<'a> DecodeValue<'a> for SecurityInfo {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> Result<Self> {
        let offset = reader.position();
        let at_offset = |err: Error| {
            let position = err
                .position()
                .and_then(|p| (p + offset).ok())
                .unwrap_or(offset);
            Error::new(err.kind(), position)
        };
        let any = AnySecurityInfo::decode_value(reader, header)?;
        let Ok(protocol) = PaceProtocol::try_from(any.protocol) else {
            return Ok(Self::Other(any));
        };
        let der = any.to_der()?;
        if protocol.cipher.is_some() {
            PaceInfo::from_der(&der).map(Self::Pace).map_err(at_offset)
        } else {
            PaceDomainParameterInfo::from_der(&der)
                .map(Self::PaceDomainParameter)
                .map_err(at_offset)
        }
    }
}

impl Display for KeyAgreement {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Dh => write!(f, "DH"),
            Self::Ecdh => write!(f, "ECDH"),
        }
    }
}

impl Display for SymmetricCipher {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tdes => write!(f, "3DES-CBC-CBC"),
            Self::Aes128 => write!(f, "AES-CBC-CMAC-128"),
            Self::Aes192 => write!(f, "AES-CBC-CMAC-192"),
            Self::Aes256 => write!(f, "AES-CBC-CMAC-256"),
        }
    }
}
