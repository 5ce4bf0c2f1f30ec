//! ICAO 9303 eMRTD protocol layer: access control, secure messaging and file access on top of
//! an [`NfcReader`].

mod access_key;
mod bac;
mod files;
mod pace;
mod read;
pub mod secure_messaging;
mod security_info;
#[cfg(test)]
pub(crate) mod simulator;

pub use self::{
    access_key::BacKey,
    files::{DedicatedId, FileId, EMRTD_LDS1_AID},
    read::{
        read_document, AccessControl, Diagnostic, DocumentReader, PassportReadResult, ReadState,
    },
};
use {
    self::secure_messaging::{Invalidated, PlainText, SecureMessaging},
    crate::{
        error::{Error, Result},
        iso7816::StatusWord,
        nfc::NfcReader,
    },
    sha1::{Digest, Sha1},
    tracing::{debug, warn},
};

/// A connection to a single document chip and its secure messaging state.
pub struct Emrtd {
    nfc: Box<dyn NfcReader>,
    secure_messaging: Box<dyn SecureMessaging>,
    parent: DedicatedId,
    max_read_len: usize,
}

impl Emrtd {
    pub fn new(nfc: Box<dyn NfcReader>, max_read_len: usize) -> Self {
        Self {
            nfc,
            secure_messaging: Box::new(PlainText),
            parent: DedicatedId::MasterFile,
            max_read_len,
        }
    }

    pub fn set_secure_messaging(&mut self, secure_messaging: Box<dyn SecureMessaging>) {
        self.secure_messaging = secure_messaging;
    }

    pub fn nfc(&mut self) -> &mut dyn NfcReader {
        self.nfc.as_mut()
    }

    pub fn into_nfc(self) -> Box<dyn NfcReader> {
        self.nfc
    }

    /// Send a command through the current secure messaging session.
    ///
    /// A failed response MAC replaces the session with one that rejects every further command.
    pub fn send_apdu(&mut self, apdu: &[u8]) -> Result<(StatusWord, Vec<u8>)> {
        let protected_apdu = self.secure_messaging.enc_apdu(apdu)?;
        let (status, data) = self.nfc.send_apdu(&protected_apdu)?;
        let status = StatusWord::from(status);
        debug!(
            ins = apdu.get(1).copied().unwrap_or_default(),
            command_len = protected_apdu.len(),
            response_len = data.len(),
            %status,
            "APDU exchange"
        );
        match self.secure_messaging.dec_response(status, &data) {
            Ok(data) => Ok((status, data)),
            Err(err @ Error::IntegrityCheckFailed) => {
                warn!("Response MAC mismatch, invalidating secure messaging session");
                self.secure_messaging = Box::new(Invalidated);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

/// `K = SHA-1(MRZ_information)`, the shared secret both access control protocols start from.
///
/// See ICAO 9303-11 section 4.3.2 and 9.7.3.
pub fn password_hash(mrz_information: &str) -> [u8; 20] {
    Sha1::digest(mrz_information.as_bytes()).into()
}

/// BAC key seed, the first 16 bytes of [`password_hash`].
pub fn seed_from_mrz(mrz_information: &str) -> [u8; 16] {
    let mut seed = [0; 16];
    seed.copy_from_slice(&password_hash(mrz_information)[..16]);
    seed
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            asn1::security_info::SymmetricCipher,
            emrtd::secure_messaging::construct_secure_messaging, nfc::TransportError,
        },
        hex_literal::hex,
        std::{collections::VecDeque, time::Duration},
    };

    /// Replays canned responses regardless of the command.
    struct Replay(VecDeque<(u16, Vec<u8>)>);

    impl NfcReader for Replay {
        fn connect(&mut self) -> Result<(), TransportError> {
            Ok(())
        }

        fn disconnect(&mut self) -> Result<(), TransportError> {
            Ok(())
        }

        fn set_timeout(&mut self, _timeout: Duration) {}

        fn send_apdu(&mut self, _apdu: &[u8]) -> Result<(u16, Vec<u8>), TransportError> {
            self.0.pop_front().ok_or(TransportError::LinkLost)
        }
    }

    #[test]
    fn test_seed_from_mrz() {
        assert_eq!(
            seed_from_mrz("L898902C<369080619406236"),
            hex!("239AB9CB282DAF66231DC5A4DF6BFBAE")
        );
    }

    #[test]
    fn test_plain_status_passes_through() {
        let replay = Replay([(0x6A82, vec![])].into());
        let mut emrtd = Emrtd::new(Box::new(replay), 0xDF);
        emrtd.set_secure_messaging(construct_secure_messaging(
            SymmetricCipher::Tdes,
            &hex!("0036D272F5C350ACAC50C3F572D23600"),
            0,
        ));
        let (status, data) = emrtd.send_apdu(&hex!("00B0810008")).unwrap();
        assert_eq!(status, StatusWord::FILE_NOT_FOUND);
        assert!(data.is_empty());
    }

    #[test]
    fn test_integrity_failure_invalidates_session() {
        let replay = Replay(
            [
                (0x9000, hex!("990290008E080000000000000000").to_vec()),
                (0x9000, vec![]),
            ]
            .into(),
        );
        let mut emrtd = Emrtd::new(Box::new(replay), 0xDF);
        emrtd.set_secure_messaging(construct_secure_messaging(
            SymmetricCipher::Tdes,
            &hex!("0036D272F5C350ACAC50C3F572D23600"),
            0,
        ));
        let err = emrtd.send_apdu(&hex!("00B0810008")).unwrap_err();
        assert!(matches!(err, Error::IntegrityCheckFailed));
        assert!(err.is_session_fatal());

        let err = emrtd.send_apdu(&hex!("00B0810008")).unwrap_err();
        assert!(matches!(err, Error::SessionInvalidated));
    }

    #[test]
    fn test_transport_error() {
        let mut emrtd = Emrtd::new(Box::new(Replay(VecDeque::new())), 0xDF);
        let err = emrtd.send_apdu(&hex!("0084000008")).unwrap_err();
        assert!(matches!(err, Error::TransportLost(TransportError::LinkLost)));
    }
}
