//! Basic Access Control, ICAO 9303-11 section 4.3.

use {
    super::{
        secure_messaging::{tdes::TDesCipher, Cipher, SecureSession},
        seed_from_mrz, BacKey, Emrtd,
    },
    crate::{
        crypto::ct_eq,
        ensure_err,
        error::{Error, Result},
    },
    rand::{CryptoRng, RngCore},
    std::array,
    tracing::info,
};

impl Emrtd {
    /// Get random nonce for authentication.
    ///
    /// See ICAO 9303-11 section 4.3.4.1.
    pub fn get_challenge(&mut self) -> Result<[u8; 8]> {
        let (status, data) = self.send_apdu(&[0x00, 0x84, 0x00, 0x00, 0x08])?;
        ensure_err!(
            status.is_success(),
            Error::AuthenticationFailed(format!("GET CHALLENGE returned {status}"))
        );
        data.as_slice()
            .try_into()
            .map_err(|_| Error::AuthenticationFailed("challenge is not 8 bytes".into()))
    }

    pub fn external_authenticate(&mut self, data: &[u8; 40]) -> Result<Vec<u8>> {
        let mut apdu = vec![0x00, 0x82, 0x00, 0x00, 0x28];
        apdu.extend_from_slice(data);
        apdu.push(0x28);
        let (status, data) = self.send_apdu(&apdu)?;
        ensure_err!(
            status.is_success(),
            Error::AuthenticationFailed(format!("EXTERNAL AUTHENTICATE rejected: {status}"))
        );
        Ok(data)
    }

    /// Run BAC and install the resulting 3DES session.
    pub fn basic_access_control(
        &mut self,
        rng: &mut (impl CryptoRng + RngCore),
        key: &BacKey,
    ) -> Result<()> {
        // Compute local randomness
        let mut rnd_ifd = [0_u8; 8];
        let mut k_ifd = [0_u8; 16];
        rng.fill_bytes(&mut rnd_ifd);
        rng.fill_bytes(&mut k_ifd);

        // Compute encryption / authentication keys from MRZ
        let seed = seed_from_mrz(&key.mrz_information());
        let cipher = TDesCipher::from_seed(&seed);

        // GET CHALLENGE
        let rnd_ic = self.get_challenge()?;

        // Construct authentication data
        let mut cryptogram = [0_u8; 32];
        cryptogram[..8].copy_from_slice(&rnd_ifd);
        cryptogram[8..16].copy_from_slice(&rnd_ic);
        cryptogram[16..].copy_from_slice(&k_ifd);
        cipher.enc(0, &mut cryptogram)?;
        let mut msg = [0_u8; 40];
        msg[..32].copy_from_slice(&cryptogram);
        msg[32..].copy_from_slice(&cipher.authentication_token(&cryptogram)?);

        // EXTERNAL AUTHENTICATE
        let resp_data = self.external_authenticate(&msg)?;
        ensure_err!(
            resp_data.len() == 40,
            Error::AuthenticationFailed("response is not 40 bytes".into())
        );

        // Check MAC and decrypt response
        let (cryptogram, mac) = resp_data.split_at(32);
        ensure_err!(
            ct_eq(mac, &cipher.authentication_token(cryptogram)?),
            Error::AuthenticationFailed("response MAC mismatch".into())
        );
        let mut plain = [0_u8; 32];
        plain.copy_from_slice(cryptogram);
        cipher.dec(0, &mut plain)?;

        // Check nonce consistency
        ensure_err!(
            plain[0..8] == rnd_ic && plain[8..16] == rnd_ifd,
            Error::AuthenticationFailed("nonce mismatch".into())
        );
        let k_ic = &plain[16..];

        // Construct seed and ssc for session keys
        let seed: [u8; 16] = array::from_fn(|i| k_ifd[i] ^ k_ic[i]);

        // Construct initial send sequence counter
        // See ICAO 9303-11 section 9.8.6.3
        let mut ssc_bytes = [0_u8; 8];
        ssc_bytes[..4].copy_from_slice(&rnd_ic[4..]);
        ssc_bytes[4..].copy_from_slice(&rnd_ifd[4..]);
        let ssc = u64::from_be_bytes(ssc_bytes);

        // Add TDES session keys to secure messaging
        self.set_secure_messaging(Box::new(SecureSession::new(
            TDesCipher::from_seed(&seed),
            ssc,
        )));
        info!("BAC established");
        Ok(())
    }
}
