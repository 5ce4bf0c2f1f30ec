use {
    super::{Emrtd, FileId},
    crate::{
        asn1::security_info::SecurityInfos,
        config::SecurityInfoSource,
        error::{Error, Result},
    },
    tracing::debug,
};

impl Emrtd {
    /// Read and decode the security infos, in the clear, from the given file.
    ///
    /// A missing or undecodable file is reported as [`Error::SecurityInfoUnavailable`]. Errors
    /// that end the session are passed through as-is.
    pub fn read_security_infos(&mut self, source: SecurityInfoSource) -> Result<SecurityInfos> {
        let file = match source {
            SecurityInfoSource::CardSecurity => FileId::CardSecurity,
            SecurityInfoSource::CardAccess => FileId::CardAccess,
        };
        let decoded = self.read_file(file).and_then(|bytes| {
            let infos = match source {
                SecurityInfoSource::CardSecurity => SecurityInfos::from_card_security(&bytes)?,
                SecurityInfoSource::CardAccess => SecurityInfos::from_card_access(&bytes)?,
            };
            Ok(infos)
        });
        match decoded {
            Ok(infos) => {
                debug!(%file, entries = infos.len(), "Decoded security infos");
                Ok(infos)
            }
            Err(err) if err.is_session_fatal() => Err(err),
            Err(err) => Err(Error::SecurityInfoUnavailable(Box::new(err))),
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            asn1::tests::PACE_CARD_ACCESS,
            emrtd::simulator::SimulatedChip,
            nfc::TransportError,
        },
    };

    #[test]
    fn test_read_card_security() {
        let chip = SimulatedChip::specimen();
        let mut emrtd = Emrtd::new(Box::new(chip), 0xDF);
        let infos = emrtd
            .read_security_infos(SecurityInfoSource::CardSecurity)
            .unwrap();
        assert_eq!(infos, SecurityInfos::from_card_access(&PACE_CARD_ACCESS).unwrap());
    }

    #[test]
    fn test_read_card_access() {
        let mut emrtd = Emrtd::new(Box::new(SimulatedChip::specimen()), 0xDF);
        let infos = emrtd
            .read_security_infos(SecurityInfoSource::CardAccess)
            .unwrap();
        assert_eq!(infos.pace_infos().count(), 1);
    }

    #[test]
    fn test_missing_card_security() {
        let mut chip = SimulatedChip::specimen();
        chip.remove_file(FileId::CardSecurity);
        let mut emrtd = Emrtd::new(Box::new(chip), 0xDF);
        let err = emrtd
            .read_security_infos(SecurityInfoSource::CardSecurity)
            .unwrap_err();
        assert!(matches!(err, Error::SecurityInfoUnavailable(_)));
        assert!(!err.is_session_fatal());
    }

    #[test]
    fn test_undecodable_card_security() {
        let mut chip = SimulatedChip::specimen();
        chip.insert_file(FileId::CardSecurity, PACE_CARD_ACCESS.to_vec());
        let mut emrtd = Emrtd::new(Box::new(chip), 0xDF);
        let err = emrtd
            .read_security_infos(SecurityInfoSource::CardSecurity)
            .unwrap_err();
        assert!(matches!(err, Error::SecurityInfoUnavailable(_)));
    }

    #[test]
    fn test_link_loss_is_fatal() {
        let mut chip = SimulatedChip::specimen();
        chip.lose_link_after(0);
        let mut emrtd = Emrtd::new(Box::new(chip), 0xDF);
        let err = emrtd
            .read_security_infos(SecurityInfoSource::CardSecurity)
            .unwrap_err();
        assert!(matches!(err, Error::TransportLost(TransportError::LinkLost)));
    }
}
