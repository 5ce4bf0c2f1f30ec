//! A software chip for tests. It implements the card side of BAC, PACE with generic mapping,
//! secure messaging and file access, holding the ICAO specimen document by default.

use {
    super::{
        pace::{map_generator, public_key_data_object},
        password_hash,
        secure_messaging::{
            cbc_encrypt, tdes::TDesCipher, Cipher, SecureSession, SymmetricCipher, KDF_PACE,
        },
        seed_from_mrz, BacKey, DedicatedId, FileId, EMRTD_LDS1_AID,
    },
    crate::{
        asn1::{
            security_info::{PaceInfo, SecurityInfo, SecurityInfos},
            tests::{card_security, PACE_CARD_ACCESS},
            ID_SECURITY_OBJECT,
        },
        crypto::{ct_eq, standardized_domain_parameters, EllipticCurve},
        iso7816::{parse_apdu, ApduRef, StatusWord},
        lds,
        nfc::{NfcReader, TransportError},
        tlv::{self, Tlv},
    },
    der::{asn1::ObjectIdentifier as Oid, Encode},
    hex_literal::hex,
    rand::{rngs::StdRng, RngCore, SeedableRng},
    std::{array, cell::RefCell, collections::BTreeMap, rc::Rc, time::Duration},
};

const FILES: [FileId; 6] = [
    FileId::CardAccess,
    FileId::CardSecurity,
    FileId::Com,
    FileId::Dg1,
    FileId::Dg2,
    FileId::Dg11,
];

/// What the chip observed, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Connected,
    Disconnected,
    TimeoutSet(Duration),
    /// A command after secure messaging was removed, with the status it was answered with.
    Apdu { ins: u8, status: StatusWord },
    BacEstablished,
    PaceEstablished,
}

type Response = (StatusWord, Vec<u8>);

/// Card side of a PACE run in progress.
struct PaceRun {
    protocol: Oid,
    cipher: SymmetricCipher,
    curve: EllipticCurve,
    nonce: Option<Vec<u8>>,
    mapped: bool,
    keys: Option<PaceKeys>,
}

struct PaceKeys {
    pk_pcd: Vec<u8>,
    pk_picc: Vec<u8>,
    session: Box<dyn Cipher>,
}

pub struct SimulatedChip {
    key: BacKey,
    files: BTreeMap<FileId, Vec<u8>>,
    events: Rc<RefCell<Vec<Event>>>,
    rng: StdRng,
    session: Option<SecureSession<Box<dyn Cipher>>>,
    authenticated: bool,
    plain_reads: bool,
    reject_pace: bool,
    tampered: Option<FileId>,
    link_budget: Option<usize>,
    selected: DedicatedId,
    current: Option<FileId>,
    challenge: Option<[u8; 8]>,
    pace: Option<PaceRun>,
}

impl SimulatedChip {
    /// The ICAO 9303 specimen passport, advertising PACE-ECDH-GM-AES-128 on brainpoolP256r1.
    pub fn specimen() -> Self {
        let com = hex!("6015 5F010430313037 5F3606303430303030 5C0361756B").to_vec();
        // A JPEG large enough to need several reads.
        let mut jpeg = hex!("FFD8FFE000104A46494600010100000100010000").to_vec();
        jpeg.extend((0..64).map(|i| i as u8));
        jpeg.extend_from_slice(&hex!("FFD9"));
        let files = BTreeMap::from([
            (FileId::CardAccess, PACE_CARD_ACCESS.to_vec()),
            (
                FileId::CardSecurity,
                card_security(&PACE_CARD_ACCESS, ID_SECURITY_OBJECT),
            ),
            (FileId::Com, com),
            (FileId::Dg1, lds::dg1(&lds::td3_specimen())),
            (FileId::Dg2, lds::dg2(&lds::face_record(&jpeg))),
            (FileId::Dg11, lds::SPECIMEN_DG11.to_vec()),
        ]);
        Self {
            key: Self::specimen_key(),
            files,
            events: Rc::default(),
            rng: StdRng::seed_from_u64(9303),
            session: None,
            authenticated: false,
            plain_reads: false,
            reject_pace: false,
            tampered: None,
            link_budget: None,
            selected: DedicatedId::MasterFile,
            current: None,
            challenge: None,
            pace: None,
        }
    }

    pub fn specimen_key() -> BacKey {
        BacKey::new("L898902C3", "740812", "120415").unwrap()
    }

    pub fn events(&self) -> Rc<RefCell<Vec<Event>>> {
        Rc::clone(&self.events)
    }

    /// Serve LDS files without access control, like chips that skip BAC.
    pub fn allow_plain_reads(&mut self) {
        self.plain_reads = true;
    }

    /// Answer `MSE:Set AT` with an error.
    pub fn reject_pace(&mut self) {
        self.reject_pace = true;
    }

    /// Corrupt the response MAC of every protected read of `file`.
    pub fn tamper_reads_of(&mut self, file: FileId) {
        self.tampered = Some(file);
    }

    /// Fail every exchange after the next `count` with a lost link.
    pub fn lose_link_after(&mut self, count: usize) {
        self.link_budget = Some(count);
    }

    pub fn file(&self, file: FileId) -> Option<&[u8]> {
        self.files.get(&file).map(Vec::as_slice)
    }

    pub fn insert_file(&mut self, file: FileId, contents: Vec<u8>) {
        self.files.insert(file, contents);
    }

    pub fn remove_file(&mut self, file: FileId) {
        self.files.remove(&file);
    }

    /// Advertise the given PACE descriptors in both EF.CardAccess and EF.CardSecurity.
    pub fn set_security_infos(&mut self, infos: &[PaceInfo]) {
        let der = infos
            .iter()
            .cloned()
            .map(SecurityInfo::Pace)
            .collect::<SecurityInfos>()
            .to_der()
            .unwrap();
        self.files
            .insert(FileId::CardSecurity, card_security(&der, ID_SECURITY_OBJECT));
        self.files.insert(FileId::CardAccess, der);
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn end_session(&mut self) {
        self.session = None;
        self.authenticated = false;
    }

    fn process(&mut self, apdu: &[u8]) -> Response {
        let protected = self.session.is_some();
        let plain = match self.session.as_mut().map(|session| session.dec_command(apdu)) {
            None => apdu.to_vec(),
            Some(Ok(plain)) => plain,
            Some(Err(_)) => {
                self.end_session();
                return (StatusWord::SM_DATA_OBJECTS_INCORRECT, Vec::new());
            }
        };
        let (status, data) = match parse_apdu(&plain) {
            Ok(command) => self.execute(command).unwrap_or_else(|status| (status, Vec::new())),
            Err(_) => (StatusWord::WRONG_LENGTH, Vec::new()),
        };
        self.record(Event::Apdu {
            ins: plain.get(1).copied().unwrap_or_default(),
            status,
        });

        if !protected {
            return (status, data);
        }
        let tamper = matches!(plain.get(1), Some(0xB0 | 0xB1))
            && self.tampered.is_some()
            && self.tampered == self.current;
        match self.session.as_mut().map(|session| session.enc_response(status, &data)) {
            Some(Ok(mut resp)) => {
                if tamper {
                    if let Some(last) = resp.last_mut() {
                        *last ^= 0x01;
                    }
                }
                (status, resp)
            }
            _ => (status, Vec::new()),
        }
    }

    fn execute(&mut self, command: ApduRef) -> Result<Response, StatusWord> {
        match command.ins() {
            0xA4 => self.select(command),
            0xB0 => self.read_binary(command),
            0xB1 => self.read_binary_odd(command),
            0x84 => self.get_challenge(),
            0x82 => self.external_authenticate(command.data),
            0x22 => self.mse_set_at(command.data),
            0x86 => self.general_authenticate(command.data),
            _ => Err(StatusWord::INS_NOT_SUPPORTED),
        }
    }

    fn select(&mut self, command: ApduRef) -> Result<Response, StatusWord> {
        let selected = match (command.p1(), command.data) {
            (0x00, [0x3F, 0x00]) => DedicatedId::MasterFile,
            (0x04, aid) if aid == EMRTD_LDS1_AID => DedicatedId::EmrtdLds1,
            _ => return Err(StatusWord::FILE_NOT_FOUND),
        };
        self.selected = selected;
        self.current = None;
        Ok((StatusWord::SUCCESS, Vec::new()))
    }

    fn read_binary(&mut self, command: ApduRef) -> Result<Response, StatusWord> {
        let (file, offset) = if command.p1() & 0x80 != 0 {
            let sfi = command.p1() & 0x1F;
            let file = FILES
                .into_iter()
                .find(|file| file.parent() == self.selected && file.short_id() == sfi)
                .ok_or(StatusWord::FILE_NOT_FOUND)?;
            (file, command.p2() as usize)
        } else {
            let file = self.current.ok_or(StatusWord::NO_CURRENT_EF)?;
            (file, u16::from_be_bytes([command.p1(), command.p2()]) as usize)
        };
        let le = command.expected_len().unwrap_or(256);
        self.serve(file, offset, le)
    }

    /// Odd INS READ BINARY of the current file, offset in `54`, data returned in `53`.
    fn read_binary_odd(&mut self, command: ApduRef) -> Result<Response, StatusWord> {
        if command.p1() != 0 || command.p2() != 0 {
            return Err(StatusWord::INCORRECT_DATA);
        }
        let file = self.current.ok_or(StatusWord::NO_CURRENT_EF)?;
        let offset = Tlv::parse(command.data)
            .and_then(|tlv| tlv.expect_tag(0x54))
            .map_err(|_| StatusWord::INCORRECT_DATA)?
            .value()
            .iter()
            .fold(0_usize, |acc, &b| (acc << 8) | b as usize);
        // Room for the `53` header within Le.
        let le = match command.expected_len().unwrap_or(256) {
            le @ 0x83.. => le - 3,
            0x82 => 0x7F,
            le => le.saturating_sub(2),
        };
        let (status, data) = self.serve(file, offset, le)?;
        Ok((status, tlv::encode(0x53, &data)))
    }

    fn serve(&mut self, file: FileId, offset: usize, le: usize) -> Result<Response, StatusWord> {
        if file.parent() == DedicatedId::EmrtdLds1 && !self.authenticated && !self.plain_reads {
            return Err(StatusWord::SECURITY_STATUS_NOT_SATISFIED);
        }
        let contents = self.files.get(&file).ok_or(StatusWord::FILE_NOT_FOUND)?;
        self.current = Some(file);

        if offset > contents.len() {
            return Err(StatusWord::WRONG_OFFSET);
        }
        let end = contents.len().min(offset + le);
        let status = if end - offset < le {
            StatusWord::END_OF_FILE
        } else {
            StatusWord::SUCCESS
        };
        Ok((status, contents[offset..end].to_vec()))
    }

    fn get_challenge(&mut self) -> Result<Response, StatusWord> {
        let mut challenge = [0_u8; 8];
        self.rng.fill_bytes(&mut challenge);
        self.challenge = Some(challenge);
        Ok((StatusWord::SUCCESS, challenge.to_vec()))
    }

    fn external_authenticate(&mut self, data: &[u8]) -> Result<Response, StatusWord> {
        let rnd_ic = self
            .challenge
            .take()
            .ok_or(StatusWord::CONDITIONS_NOT_SATISFIED)?;
        if data.len() != 40 {
            return Err(StatusWord::WRONG_LENGTH);
        }
        let cipher = TDesCipher::from_seed(&seed_from_mrz(&self.key.mrz_information()));
        let failed = |_| StatusWord::VERIFICATION_FAILED;

        let (cryptogram, mac) = data.split_at(32);
        if !ct_eq(mac, &cipher.authentication_token(cryptogram).map_err(failed)?) {
            return Err(StatusWord::VERIFICATION_FAILED);
        }
        let mut plain = [0_u8; 32];
        plain.copy_from_slice(cryptogram);
        cipher.dec(0, &mut plain).map_err(failed)?;
        if plain[8..16] != rnd_ic {
            return Err(StatusWord::VERIFICATION_FAILED);
        }
        let rnd_ifd = &plain[..8];
        let k_ifd = &plain[16..];

        let mut k_ic = [0_u8; 16];
        self.rng.fill_bytes(&mut k_ic);
        let mut response = rnd_ic.to_vec();
        response.extend_from_slice(rnd_ifd);
        response.extend_from_slice(&k_ic);
        cipher.enc(0, &mut response).map_err(failed)?;
        let mac = cipher.authentication_token(&response).map_err(failed)?;
        response.extend_from_slice(&mac);

        let seed: [u8; 16] = array::from_fn(|i| k_ifd[i] ^ k_ic[i]);
        let mut ssc = [0_u8; 8];
        ssc[..4].copy_from_slice(&rnd_ic[4..]);
        ssc[4..].copy_from_slice(&rnd_ifd[4..]);
        self.session = Some(SecureSession::new(
            Box::new(TDesCipher::from_seed(&seed)),
            u64::from_be_bytes(ssc),
        ));
        self.authenticated = true;
        self.record(Event::BacEstablished);
        Ok((StatusWord::SUCCESS, response))
    }

    fn mse_set_at(&mut self, data: &[u8]) -> Result<Response, StatusWord> {
        if self.reject_pace {
            return Err(StatusWord::INCORRECT_DATA);
        }
        let mut protocol = None;
        let mut parameter_id = None;
        for object in tlv::TlvIter::new(data) {
            let object = object.map_err(|_| StatusWord::INCORRECT_DATA)?;
            match (object.tag().0, object.value()) {
                (0x80, oid) => protocol = Some(oid.to_vec()),
                (0x83, [0x01]) => {}
                (0x84, [id]) => parameter_id = Some(u64::from(*id)),
                _ => return Err(StatusWord::INCORRECT_DATA),
            }
        }
        let advertised = self
            .files
            .get(&FileId::CardAccess)
            .and_then(|bytes| SecurityInfos::from_card_access(bytes).ok())
            .ok_or(StatusWord::CONDITIONS_NOT_SATISFIED)?;
        let info = advertised
            .pace_infos()
            .find(|info| {
                info.protocol.oid().ok().map(|oid| oid.as_bytes().to_vec()) == protocol
                    && info.parameter_id == parameter_id
            })
            .ok_or(StatusWord::INCORRECT_DATA)?;
        let cipher = info.protocol.cipher.ok_or(StatusWord::INCORRECT_DATA)?;
        let protocol = info.protocol.oid().map_err(|_| StatusWord::INCORRECT_DATA)?;
        let curve = parameter_id
            .and_then(|id| standardized_domain_parameters(id).ok())
            .ok_or(StatusWord::INCORRECT_DATA)?;
        self.pace = Some(PaceRun {
            protocol,
            cipher,
            curve,
            nonce: None,
            mapped: false,
            keys: None,
        });
        Ok((StatusWord::SUCCESS, Vec::new()))
    }

    fn general_authenticate(&mut self, data: &[u8]) -> Result<Response, StatusWord> {
        let result = self.pace_step(data);
        if result.is_err() {
            self.pace = None;
        }
        result
    }

    fn pace_step(&mut self, data: &[u8]) -> Result<Response, StatusWord> {
        let dynamic = Tlv::parse(data)
            .and_then(|tlv| tlv.expect_tag(0x7C))
            .map_err(|_| StatusWord::INCORRECT_DATA)?;
        let object = dynamic
            .children()
            .next()
            .transpose()
            .map_err(|_| StatusWord::INCORRECT_DATA)?;
        let mrz_information = self.key.mrz_information();
        let run = self.pace.as_mut().ok_or(StatusWord::CONDITIONS_NOT_SATISFIED)?;
        let invalid = |_| StatusWord::INCORRECT_DATA;
        let stage = (run.nonce.is_some(), run.mapped, run.keys.is_some());

        let (tag, value) = match (object.map(|object| object.tag().0), stage) {
            // Encrypted nonce
            (None, (false, false, false)) => {
                let mut nonce = vec![0_u8; run.cipher.block_size()];
                self.rng.fill_bytes(&mut nonce);
                let k_pi = run.cipher.kdf(&password_hash(&mrz_information), KDF_PACE);
                let mut z = nonce.clone();
                encrypt_zero_iv(run.cipher, &k_pi, &mut z).map_err(invalid)?;
                run.nonce = Some(nonce);
                (0x80, z)
            }
            // Generic mapping
            (Some(0x81), (true, false, false)) => {
                let value = object.map(|object| object.value()).unwrap_or_default();
                let pk_map_pcd = run.curve.pt_from_bytes(value).map_err(invalid)?;
                let sk_map = run.curve.random_scalar(&mut self.rng);
                let pk_map_picc = run.curve.mul(sk_map, &run.curve.generator());
                let shared = run.curve.mul(sk_map, &pk_map_pcd);
                let nonce = run.nonce.as_deref().unwrap_or_default();
                let mapped = map_generator(&run.curve, nonce, &shared).map_err(invalid)?;
                let pk_map_picc = run.curve.pt_to_bytes(&pk_map_picc);
                run.curve = mapped;
                run.mapped = true;
                (0x82, pk_map_picc)
            }
            // Key agreement
            (Some(0x83), (true, true, false)) => {
                let value = object.map(|object| object.value()).unwrap_or_default();
                let pk_pcd = run.curve.pt_from_bytes(value).map_err(invalid)?;
                let sk = run.curve.random_scalar(&mut self.rng);
                let pk_picc = run.curve.pt_to_bytes(&run.curve.mul(sk, &run.curve.generator()));
                let secret = run.curve.ecka(sk, &pk_pcd).map_err(invalid)?;
                run.keys = Some(PaceKeys {
                    pk_pcd: value.to_vec(),
                    pk_picc: pk_picc.clone(),
                    session: run.cipher.cipher(&secret),
                });
                (0x84, pk_picc)
            }
            // Mutual authentication
            (Some(0x85), (true, true, true)) => {
                let value = object.map(|object| object.value()).unwrap_or_default();
                let keys = run.keys.as_ref().ok_or(StatusWord::CONDITIONS_NOT_SATISFIED)?;
                let expected = keys
                    .session
                    .authentication_token(&public_key_data_object(run.protocol, &keys.pk_picc))
                    .map_err(invalid)?;
                if !ct_eq(value, &expected) {
                    return Err(StatusWord::VERIFICATION_FAILED);
                }
                let token = keys
                    .session
                    .authentication_token(&public_key_data_object(run.protocol, &keys.pk_pcd))
                    .map_err(invalid)?;
                (0x86, token.to_vec())
            }
            _ => return Err(StatusWord::CONDITIONS_NOT_SATISFIED),
        };

        if tag == 0x86 {
            if let Some(PaceKeys { session, .. }) = self.pace.take().and_then(|run| run.keys) {
                self.session = Some(SecureSession::new(session, 0));
                self.authenticated = true;
                self.record(Event::PaceEstablished);
            }
        }
        Ok((StatusWord::SUCCESS, tlv::encode(0x7C, &tlv::encode(tag, &value))))
    }
}

fn encrypt_zero_iv(cipher: SymmetricCipher, key: &[u8], data: &mut [u8]) -> crate::error::Result<()> {
    match cipher {
        SymmetricCipher::Tdes => cbc_encrypt::<des::TdesEde2>(key, &[0; 8], data),
        SymmetricCipher::Aes128 => cbc_encrypt::<aes::Aes128>(key, &[0; 16], data),
        SymmetricCipher::Aes192 => cbc_encrypt::<aes::Aes192>(key, &[0; 16], data),
        SymmetricCipher::Aes256 => cbc_encrypt::<aes::Aes256>(key, &[0; 16], data),
    }
}

impl NfcReader for SimulatedChip {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.record(Event::Connected);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.end_session();
        self.selected = DedicatedId::MasterFile;
        self.record(Event::Disconnected);
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.record(Event::TimeoutSet(timeout));
    }

    fn send_apdu(&mut self, apdu: &[u8]) -> Result<(u16, Vec<u8>), TransportError> {
        if let Some(budget) = &mut self.link_budget {
            if *budget == 0 {
                return Err(TransportError::LinkLost);
            }
            *budget -= 1;
        }
        let (status, data) = self.process(apdu);
        Ok((status.into(), data))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::emrtd::{secure_messaging::SecureMessaging, Emrtd},
    };

    #[test]
    fn test_access_control() {
        let mut chip = SimulatedChip::specimen();
        let (status, _) = chip.send_apdu(&hex!("00A4040C07A0000002471001")).unwrap();
        assert_eq!(status, 0x9000);
        let (status, _) = chip.send_apdu(&hex!("00B09E0004")).unwrap();
        assert_eq!(status, 0x6982);
    }

    #[test]
    fn test_read_binary_semantics() {
        let mut chip = SimulatedChip::specimen();
        let card_access = chip.file(FileId::CardAccess).unwrap().to_vec();
        let (status, data) = chip.send_apdu(&hex!("00B09C0004")).unwrap();
        assert_eq!((status, data.as_slice()), (0x9000, &card_access[..4]));
        let (status, data) = chip.send_apdu(&hex!("00B0001000")).unwrap();
        assert_eq!((status, data.as_slice()), (0x6282, &card_access[0x10..]));
        let (status, _) = chip.send_apdu(&hex!("00B0004000")).unwrap();
        assert_eq!(status, 0x6B00);
        let (status, _) = chip.send_apdu(&hex!("00B0850000")).unwrap();
        assert_eq!(status, 0x6A82);
    }

    #[test]
    fn test_protected_command_after_bac() {
        let chip = SimulatedChip::specimen();
        let events = chip.events();
        let mut emrtd = Emrtd::new(Box::new(chip), 0xDF);
        let mut rng = StdRng::seed_from_u64(7);
        emrtd
            .basic_access_control(&mut rng, &SimulatedChip::specimen_key())
            .unwrap();
        emrtd.select_dedicated_file(DedicatedId::EmrtdLds1).unwrap();
        let dg1 = emrtd.read_file(FileId::Dg1).unwrap();
        assert_eq!(dg1, lds::dg1(&lds::td3_specimen()));

        // A command without secure messaging ends the session.
        let mut plain = crate::emrtd::secure_messaging::PlainText;
        let apdu = plain.enc_apdu(&hex!("00B0810004")).unwrap();
        let (status, _) = emrtd.nfc().send_apdu(&apdu).unwrap();
        assert_eq!(status, 0x6988);
        assert!(events
            .borrow()
            .iter()
            .all(|event| !matches!(event, Event::PaceEstablished)));
    }
}
