//! Reads identity data from ICAO 9303 electronic machine readable travel documents.
//!
//! The host supplies an [`NfcReader`] and the document's MRZ access data. The reader unlocks the
//! chip with PACE, falling back to BAC, and decodes DG1, DG11 and optionally DG2 under secure
//! messaging. See [`read_document`] and [`DocumentReader`].

pub mod asn1;
pub mod config;
pub mod crypto;
pub mod emrtd;
pub mod error;
pub mod iso7816;
pub mod lds;
pub mod nfc;
pub mod tlv;

pub use self::{
    config::{ReaderConfig, SecurityInfoSource},
    emrtd::{
        read_document, AccessControl, BacKey, Diagnostic, DocumentReader, PassportReadResult,
        ReadState,
    },
    error::{Error, Result},
    lds::{AdditionalPersonalData, FacePhoto, MrzInfo},
    nfc::{NfcReader, TransportError},
};
