//! Pure ASN.1 types, no application logic.
//!
//! `SecurityInfo` entries are decoded into an enum of the protocols this reader uses, with a
//! catch-all for everything else, so any valid `SecurityInfos` parses and re-encodes to the
//! same bytes.

mod content_info;
mod ordered_set;
pub mod security_info;

pub use self::{
    content_info::{ContentInfo, ContentType},
    ordered_set::OrderedSet,
};
use {
    self::security_info::SecurityInfos,
    cms::signed_data::SignedData,
    der::{
        asn1::{ObjectIdentifier as Oid, OctetString},
        Decode, Error, ErrorKind, Length, Result, Tag,
    },
};

/// `id-SecurityObject`, the content type of the signed `SecurityInfos` in EF.CardSecurity.
///
/// See BSI TR-03110-3 section A.1.2.
pub const ID_SECURITY_OBJECT: Oid = Oid::new_unwrap("0.4.0.127.0.7.3.2.1");

impl ContentType for SignedData {
    const CONTENT_TYPE: Oid = Oid::new_unwrap("1.2.840.113549.1.7.2");
}

/// EF.CardAccess is a [`SecurityInfos`] with no further wrapping.
///
/// See ICAO 9303-10 section 3.11.3
pub type EfCardAccess = SecurityInfos;

/// EF.CardSecurity is a [`SignedData`] over a [`SecurityInfos`].
pub type EfCardSecurity = ContentInfo<SignedData>;

impl SecurityInfos {
    pub fn from_card_access(bytes: &[u8]) -> Result<Self> {
        EfCardAccess::from_der(bytes)
    }

    /// Extract the embedded [`SecurityInfos`]. The signature is not verified.
    pub fn from_card_security(bytes: &[u8]) -> Result<Self> {
        let ContentInfo(signed_data) = EfCardSecurity::from_der(bytes)?;
        let encap = signed_data.encap_content_info;
        if encap.econtent_type != ID_SECURITY_OBJECT {
            return Err(Error::new(
                ErrorKind::OidUnknown {
                    oid: encap.econtent_type,
                },
                Length::ZERO,
            ));
        }
        let econtent = encap
            .econtent
            .ok_or_else(|| Tag::OctetString.value_error())?;
        let octets = econtent.decode_as::<OctetString>()?;
        Self::from_der(octets.as_bytes())
    }
}
