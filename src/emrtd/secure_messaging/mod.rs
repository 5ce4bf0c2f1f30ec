//! Secure Messaging
//!
//! See ICAO 9303-11 section 9.8.

pub mod aes;
pub mod tdes;

pub use crate::asn1::security_info::SymmetricCipher;
use {
    self::{
        aes::{Aes128Cipher, Aes192Cipher, Aes256Cipher},
        tdes::TDesCipher,
    },
    crate::{
        crypto::{ct_eq, pad, unpad},
        ensure_err,
        error::{Error, Result},
        iso7816::{parse_apdu, StatusWord},
        tlv::{self, Tlv},
    },
    cipher::{
        block_padding::NoPadding, BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit,
        KeyIvInit as _,
    },
};

pub const KDF_ENC: u32 = 1;
pub const KDF_MAC: u32 = 2;
pub const KDF_PACE: u32 = 3;

pub trait SecureMessaging {
    fn enc_apdu(&mut self, apdu: &[u8]) -> Result<Vec<u8>>;
    fn dec_response(&mut self, status: StatusWord, resp: &[u8]) -> Result<Vec<u8>>;
}

/// Session keys of one of the secure messaging cipher suites.
pub trait Cipher {
    fn block_size(&self) -> usize;

    /// Encrypt block aligned data in place for the message protected under `ssc`.
    fn enc(&self, ssc: u64, data: &mut [u8]) -> Result<()>;

    fn dec(&self, ssc: u64, data: &mut [u8]) -> Result<()>;

    /// MAC over block aligned data. The input already starts with the send sequence counter.
    fn mac(&self, data: &[u8]) -> Result<[u8; 8]>;

    /// PACE authentication token over an encoded public key, ICAO 9303-11 section 4.4.3.4.
    fn authentication_token(&self, data: &[u8]) -> Result<[u8; 8]>;
}

/// Secure Messaging protocol that passes APDUs and responses as-is.
#[derive(Debug, Default)]
pub struct PlainText;

/// The state after a response failed its integrity check. Nothing can be sent anymore.
#[derive(Debug, Default)]
pub struct Invalidated;

/// An established session: session keys and the send sequence counter.
pub struct SecureSession<C: Cipher> {
    cipher: C,
    ssc: u64,
}

impl SymmetricCipher {
    pub fn block_size(self) -> usize {
        match self {
            Self::Tdes => 8,
            Self::Aes128 | Self::Aes192 | Self::Aes256 => 16,
        }
    }

    /// Key derivation function from ICAO 9303-11 section 9.7.1.
    pub fn kdf(self, secret: &[u8], counter: u32) -> Vec<u8> {
        match self {
            Self::Tdes => tdes::kdf(secret, counter).to_vec(),
            Self::Aes128 => aes::kdf_128(secret, counter).to_vec(),
            Self::Aes192 => aes::kdf_192(secret, counter).to_vec(),
            Self::Aes256 => aes::kdf_256(secret, counter).to_vec(),
        }
    }

    /// Decrypt block aligned data in CBC mode with a zero IV.
    pub fn decrypt_zero_iv(self, key: &[u8], data: &mut [u8]) -> Result<()> {
        match self {
            Self::Tdes => cbc_decrypt::<des::TdesEde2>(key, &[0; 8], data),
            Self::Aes128 => cbc_decrypt::<::aes::Aes128>(key, &[0; 16], data),
            Self::Aes192 => cbc_decrypt::<::aes::Aes192>(key, &[0; 16], data),
            Self::Aes256 => cbc_decrypt::<::aes::Aes256>(key, &[0; 16], data),
        }
    }

    /// Derive the encryption and MAC keys for a session from a shared secret.
    pub fn cipher(self, seed: &[u8]) -> Box<dyn Cipher> {
        match self {
            Self::Tdes => Box::new(TDesCipher::from_seed(seed)),
            Self::Aes128 => Box::new(Aes128Cipher::from_seed(seed)),
            Self::Aes192 => Box::new(Aes192Cipher::from_seed(seed)),
            Self::Aes256 => Box::new(Aes256Cipher::from_seed(seed)),
        }
    }
}

pub fn construct_secure_messaging(
    cipher: SymmetricCipher,
    seed: &[u8],
    ssc: u64,
) -> Box<dyn SecureMessaging> {
    Box::new(SecureSession::new(cipher.cipher(seed), ssc))
}

pub(crate) fn cbc_encrypt<C>(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()>
where
    C: BlockEncryptMut + BlockCipher + KeyInit,
{
    let len = data.len();
    cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| Error::Crypto("invalid key or IV length"))?
        .encrypt_padded_mut::<NoPadding>(data, len)
        .map_err(|_| Error::Crypto("data is not block aligned"))?;
    Ok(())
}

pub(crate) fn cbc_decrypt<C>(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
{
    cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| Error::Crypto("invalid key or IV length"))?
        .decrypt_padded_mut::<NoPadding>(data)
        .map_err(|_| Error::Crypto("data is not block aligned"))?;
    Ok(())
}

impl SecureMessaging for PlainText {
    fn enc_apdu(&mut self, apdu: &[u8]) -> Result<Vec<u8>> {
        Ok(apdu.to_vec())
    }

    fn dec_response(&mut self, _status: StatusWord, resp: &[u8]) -> Result<Vec<u8>> {
        Ok(resp.to_vec())
    }
}

impl SecureMessaging for Invalidated {
    fn enc_apdu(&mut self, _apdu: &[u8]) -> Result<Vec<u8>> {
        Err(Error::SessionInvalidated)
    }

    fn dec_response(&mut self, _status: StatusWord, _resp: &[u8]) -> Result<Vec<u8>> {
        Err(Error::SessionInvalidated)
    }
}

impl<C: Cipher> SecureSession<C> {
    pub fn new(cipher: C, ssc: u64) -> Self {
        Self { cipher, ssc }
    }

    pub fn ssc(&self) -> u64 {
        self.ssc
    }

    /// `SSC` as the first MAC input block.
    fn mac_prefix(&self, ssc: u64) -> Vec<u8> {
        let mut message = vec![0; self.cipher.block_size() - 8];
        message.extend_from_slice(&ssc.to_be_bytes());
        message
    }
}

impl<C: Cipher> SecureMessaging for SecureSession<C> {
    fn enc_apdu(&mut self, apdu: &[u8]) -> Result<Vec<u8>> {
        // Increment send sequence counter
        let ssc = self.ssc.wrapping_add(1);
        let block_size = self.cipher.block_size();

        let apdu = parse_apdu(apdu)?;
        let mut header = apdu.header.to_vec();
        header[0] |= 0x0C; // Set SM bit

        let mut objects = Vec::new();
        if !apdu.data.is_empty() {
            let mut payload = apdu.data.to_vec();
            pad(&mut payload, block_size);
            self.cipher.enc(ssc, &mut payload)?;
            if apdu.ins() & 1 == 0 {
                // Padding content indicator
                payload.insert(0, 0x01);
                objects.extend(tlv::encode(0x87, &payload));
            } else {
                objects.extend(tlv::encode(0x85, &payload));
            }
        }
        if !apdu.le.is_empty() {
            // Extended Le without Lc has a leading zero byte that is not part of the value.
            let le = if apdu.le.len() == 3 {
                &apdu.le[1..]
            } else {
                apdu.le
            };
            objects.extend(tlv::encode(0x97, le));
        }

        // MAC over SSC, padded header and data objects.
        let mut message = self.mac_prefix(ssc);
        message.extend_from_slice(&header);
        pad(&mut message, block_size);
        message.extend_from_slice(&objects);
        pad(&mut message, block_size);
        let mac = self.cipher.mac(&message)?;
        objects.extend(tlv::encode(0x8E, &mac));

        let extended_length = apdu.is_extended_length() || objects.len() > 0xFF;
        let mut papdu = header;
        if extended_length {
            papdu.push(0x00);
            papdu.extend_from_slice(&(objects.len() as u16).to_be_bytes());
            papdu.extend_from_slice(&objects);
            papdu.extend_from_slice(&[0x00, 0x00]);
        } else {
            papdu.push(objects.len() as u8);
            papdu.extend_from_slice(&objects);
            papdu.push(0x00);
        }

        // Commit SSC
        self.ssc = ssc;
        Ok(papdu)
    }

    fn dec_response(&mut self, status: StatusWord, resp: &[u8]) -> Result<Vec<u8>> {
        self.ssc = self.ssc.wrapping_add(1);

        // The chip may answer an error with a bare status word.
        if resp.is_empty() && !status.is_success() {
            return Ok(Vec::new());
        }

        let mut cryptogram = None;
        let mut do99 = None;
        let mut mac = None;
        let mut rest = resp;
        while !rest.is_empty() {
            ensure_err!(mac.is_none(), Error::SecureMessagingInvalid);
            let offset = resp.len() - rest.len();
            let (object, tail) =
                tlv::parse_next(rest).map_err(|_| Error::SecureMessagingInvalid)?;
            match object.tag().0 {
                0x85 | 0x87 if cryptogram.is_none() => cryptogram = Some(object),
                0x99 if do99.is_none() => do99 = Some(object),
                0x8E => mac = Some((offset, object)),
                _ => return Err(Error::SecureMessagingInvalid),
            }
            rest = tail;
        }
        let (mac_offset, mac) = mac.ok_or(Error::SecureMessagingInvalid)?;

        // Compute and verify MAC
        let mut message = self.mac_prefix(self.ssc);
        message.extend_from_slice(&resp[..mac_offset]);
        pad(&mut message, self.cipher.block_size());
        let expected = self.cipher.mac(&message)?;
        ensure_err!(ct_eq(mac.value(), &expected), Error::IntegrityCheckFailed);

        // Protected status word must match the transmitted one.
        if let Some(do99) = do99 {
            ensure_err!(
                do99.value() == [status.sw1(), status.sw2()],
                Error::SecureMessagingInvalid
            );
        }

        let Some(cryptogram) = cryptogram else {
            return Ok(Vec::new());
        };
        self.decrypt_object(self.ssc, cryptogram)
    }
}

impl<C: Cipher> SecureSession<C> {
    fn decrypt_object(&self, ssc: u64, object: Tlv) -> Result<Vec<u8>> {
        let ciphertext = match (object.tag().0, object.value()) {
            (0x87, [0x01, ciphertext @ ..]) => ciphertext,
            (0x85, ciphertext) => ciphertext,
            _ => return Err(Error::SecureMessagingInvalid),
        };
        ensure_err!(
            !ciphertext.is_empty() && ciphertext.len() % self.cipher.block_size() == 0,
            Error::SecureMessagingInvalid
        );
        let mut data = ciphertext.to_vec();
        self.cipher.dec(ssc, &mut data)?;
        let len = unpad(&data).ok_or(Error::SecureMessagingInvalid)?.len();
        data.truncate(len);
        Ok(data)
    }
}

impl<C: Cipher + ?Sized> Cipher for Box<C> {
    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn enc(&self, ssc: u64, data: &mut [u8]) -> Result<()> {
        (**self).enc(ssc, data)
    }

    fn dec(&self, ssc: u64, data: &mut [u8]) -> Result<()> {
        (**self).dec(ssc, data)
    }

    fn mac(&self, data: &[u8]) -> Result<[u8; 8]> {
        (**self).mac(data)
    }

    fn authentication_token(&self, data: &[u8]) -> Result<[u8; 8]> {
        (**self).authentication_token(data)
    }
}

/// The chip's half of the session, used by the simulated chip in tests.
#[cfg(test)]
impl<C: Cipher> SecureSession<C> {
    /// Verify and decrypt a protected command, returning the plain command APDU.
    pub(crate) fn dec_command(&mut self, papdu: &[u8]) -> Result<Vec<u8>> {
        self.ssc = self.ssc.wrapping_add(1);
        let apdu = parse_apdu(papdu)?;
        ensure_err!(apdu.cla() & 0x0C == 0x0C, Error::SecureMessagingInvalid);

        let mut cryptogram = None;
        let mut le = None;
        let mut mac = None;
        let mut rest = apdu.data;
        while !rest.is_empty() {
            let offset = apdu.data.len() - rest.len();
            let (object, tail) = tlv::parse_next(rest)?;
            match object.tag().0 {
                0x85 | 0x87 => cryptogram = Some(object),
                0x97 => le = Some(object.value()),
                0x8E => mac = Some((offset, object)),
                _ => return Err(Error::SecureMessagingInvalid),
            }
            rest = tail;
        }
        let (mac_offset, mac) = mac.ok_or(Error::SecureMessagingInvalid)?;

        let mut message = self.mac_prefix(self.ssc);
        message.extend_from_slice(apdu.header);
        pad(&mut message, self.cipher.block_size());
        message.extend_from_slice(&apdu.data[..mac_offset]);
        pad(&mut message, self.cipher.block_size());
        ensure_err!(
            ct_eq(mac.value(), &self.cipher.mac(&message)?),
            Error::IntegrityCheckFailed
        );

        let data = match cryptogram {
            Some(object) => self.decrypt_object(self.ssc, object)?,
            None => Vec::new(),
        };
        let mut plain = apdu.header.to_vec();
        plain[0] &= !0x0C;
        let extended = data.len() > 0xFF || le.is_some_and(|le| le.len() > 1);
        if !data.is_empty() {
            if extended {
                plain.push(0x00);
                plain.extend_from_slice(&(data.len() as u16).to_be_bytes());
            } else {
                plain.push(data.len() as u8);
            }
            plain.extend_from_slice(&data);
        }
        if let Some(le) = le {
            if extended && data.is_empty() {
                plain.push(0x00);
            }
            plain.extend_from_slice(le);
        }
        Ok(plain)
    }

    /// Protect a response, returning the data field to transmit with `status`.
    pub(crate) fn enc_response(&mut self, status: StatusWord, data: &[u8]) -> Result<Vec<u8>> {
        self.ssc = self.ssc.wrapping_add(1);
        let block_size = self.cipher.block_size();
        let mut resp = Vec::new();
        if !data.is_empty() {
            let mut payload = data.to_vec();
            pad(&mut payload, block_size);
            self.cipher.enc(self.ssc, &mut payload)?;
            payload.insert(0, 0x01);
            resp.extend(tlv::encode(0x87, &payload));
        }
        resp.extend(tlv::encode(0x99, &[status.sw1(), status.sw2()]));
        let mut message = self.mac_prefix(self.ssc);
        message.extend_from_slice(&resp);
        pad(&mut message, block_size);
        let mac = self.cipher.mac(&message)?;
        resp.extend(tlv::encode(0x8E, &mac));
        Ok(resp)
    }
}
