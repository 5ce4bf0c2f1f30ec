//! Standardized domain parameters for PACE, ICAO 9303-11 section 9.5.1.

use {
    super::elliptic_curve::EllipticCurve,
    crate::error::{Error, Result},
    hex_literal::hex,
    std::fmt::{self, Display, Formatter},
};

/// Standardized domain parameter identifiers. Only the elliptic curves listed here are
/// implemented; the MODP groups (ids 0 to 2) and the remaining curves are rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StandardizedDomainParameters {
    Secp256r1,
    BrainpoolP256r1,
    Secp384r1,
}

impl StandardizedDomainParameters {
    pub fn from_id(id: u64) -> Option<Self> {
        match id {
            12 => Some(Self::Secp256r1),
            13 => Some(Self::BrainpoolP256r1),
            15 => Some(Self::Secp384r1),
            _ => None,
        }
    }

    pub fn id(self) -> u64 {
        match self {
            Self::Secp256r1 => 12,
            Self::BrainpoolP256r1 => 13,
            Self::Secp384r1 => 15,
        }
    }

    pub fn curve(self) -> Result<EllipticCurve> {
        match self {
            Self::Secp256r1 => EllipticCurve::from_parameters(
                &hex!("FFFFFFFF00000001000000000000000000000000FFFFFFFFFFFFFFFFFFFFFFFF"),
                &hex!("FFFFFFFF00000001000000000000000000000000FFFFFFFFFFFFFFFFFFFFFFFC"),
                &hex!("5AC635D8AA3A93E7B3EBBD55769886BC651D06B0CC53B0F63BCE3C3E27D2604B"),
                &hex!("6B17D1F2E12C4247F8BCE6E563A440F277037D812DEB33A0F4A13945D898C296"),
                &hex!("4FE342E2FE1A7F9B8EE7EB4A7C0F9E162BCE33576B315ECECBB6406837BF51F5"),
                &hex!("FFFFFFFF00000000FFFFFFFFFFFFFFFFBCE6FAADA7179E84F3B9CAC2FC632551"),
            ),
            Self::BrainpoolP256r1 => EllipticCurve::from_parameters(
                &hex!("A9FB57DBA1EEA9BC3E660A909D838D726E3BF623D52620282013481D1F6E5377"),
                &hex!("7D5A0975FC2C3057EEF67530417AFFE7FB8055C126DC5C6CE94A4B44F330B5D9"),
                &hex!("26DC5C6CE94A4B44F330B5D9BBD77CBF958416295CF7E1CE6BCCDC18FF8C07B6"),
                &hex!("8BD2AEB9CB7E57CB2C4B482FFC81B7AFB9DE27E1E3BD23C23A4453BD9ACE3262"),
                &hex!("547EF835C3DAC4FD97F8461A14611DC9C27745132DED8E545C1D54C72F046997"),
                &hex!("A9FB57DBA1EEA9BC3E660A909D838D718C397AA3B561A6F7901E0E82974856A7"),
            ),
            Self::Secp384r1 => EllipticCurve::from_parameters(
                &hex!(
                    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFE"
                    "FFFFFFFF0000000000000000FFFFFFFF"
                ),
                &hex!(
                    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFE"
                    "FFFFFFFF0000000000000000FFFFFFFC"
                ),
                &hex!(
                    "B3312FA7E23EE7E4988E056BE3F82D19181D9C6EFE8141120314088F5013875A"
                    "C656398D8A2ED19D2A85C8EDD3EC2AEF"
                ),
                &hex!(
                    "AA87CA22BE8B05378EB1C71EF320AD746E1D3B628BA79B9859F741E082542A38"
                    "5502F25DBF55296C3A545E3872760AB7"
                ),
                &hex!(
                    "3617DE4A96262C6F5D9E98BF9292DC29F8F41DBD289A147CE9DA3113B5F0B8C0"
                    "0A60B1CE1D7E819D7A431D7C90EA0E5F"
                ),
                &hex!(
                    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFC7634D81F4372DDF"
                    "581A0DB248B0A77AECEC196ACCC52973"
                ),
            ),
        }
    }
}

impl Display for StandardizedDomainParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secp256r1 => write!(f, "secp256r1"),
            Self::BrainpoolP256r1 => write!(f, "brainpoolP256r1"),
            Self::Secp384r1 => write!(f, "secp384r1"),
        }
    }
}

/// Curve for a `PACEInfo.parameterId`.
pub fn standardized_domain_parameters(id: u64) -> Result<EllipticCurve> {
    StandardizedDomainParameters::from_id(id)
        .ok_or_else(|| Error::UnsupportedPace(format!("standardized domain parameters {id}")))?
        .curve()
}
