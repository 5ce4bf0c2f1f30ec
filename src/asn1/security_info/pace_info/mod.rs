mod pace_protocol;

pub use pace_protocol::{KeyMapping, PaceProtocol, PACE_OID};
use der::{Any, Sequence};

/// ICAO 9303-11 section 9.2.1
///
/// ```asn1
/// PACEInfo ::= SEQUENCE {
///     protocol    OBJECT IDENTIFIER(id-PACE-...),
///     version     INTEGER, -- SHOULD be 2
///     parameterId INTEGER OPTIONAL
/// }
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Sequence)]
pub struct PaceInfo {
    pub protocol: PaceProtocol,
    pub version: u64,
    pub parameter_id: Option<u64>,
}

/// ICAO 9303-11 section 9.2.2. Only used by chips with proprietary domain parameters,
/// which are not supported for key agreement; the entry is still decoded and kept.
#[derive(Clone, PartialEq, Eq, Debug, Sequence)]
pub struct PaceDomainParameterInfo {
    pub protocol: PaceProtocol,
    pub domain_parameter: Any,
    pub parameter_id: Option<u64>,
}
