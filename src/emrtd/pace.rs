//! PACE with Generic Mapping over elliptic curves, ICAO 9303-11 section 4.4.
//!
//! The four `GENERAL AUTHENTICATE` steps are
//!
//! 1. encrypted nonce `z`, decrypted to `s` with `K_π`;
//! 2. mapping keys, giving the ephemeral generator `G' = s·G + H`;
//! 3. ephemeral keys over `G'`, giving the shared secret `K`;
//! 4. authentication tokens under `K_mac`.

use {
    super::{
        password_hash,
        secure_messaging::{SecureSession, SymmetricCipher, KDF_PACE},
        BacKey, Emrtd,
    },
    crate::{
        asn1::security_info::{KeyAgreement, KeyMapping, PaceInfo},
        crypto::{ct_eq, standardized_domain_parameters, EllipticCurve, Point, Uint},
        ensure_err,
        error::{Error, Result},
        iso7816::StatusWord,
        tlv::{self, Tlv},
    },
    der::asn1::ObjectIdentifier as Oid,
    rand::{CryptoRng, RngCore},
    tracing::{debug, info},
};

/// `K_π`, the key that protects the PACE nonce, derived from an MRZ password.
pub fn pace_password_key(cipher: SymmetricCipher, key: &BacKey) -> Vec<u8> {
    cipher.kdf(&password_hash(&key.mrz_information()), KDF_PACE)
}

/// Decrypt the chip nonce `z` with `K_π`.
pub fn decrypt_nonce(cipher: SymmetricCipher, k_pi: &[u8], z: &[u8]) -> Result<Vec<u8>> {
    ensure_err!(
        !z.is_empty() && z.len() % cipher.block_size() == 0,
        Error::Crypto("nonce is not block aligned")
    );
    let mut s = z.to_vec();
    cipher.decrypt_zero_iv(k_pi, &mut s)?;
    Ok(s)
}

/// `G' = s·G + H`, ICAO 9303-11 section 4.4.3.3.1.
pub fn map_generator(curve: &EllipticCurve, nonce: &[u8], shared: &Point) -> Result<EllipticCurve> {
    ensure_err!(*shared != Point::Infinity, Error::Crypto("mapping point at infinity"));
    let s = Uint::try_from_be_slice(nonce).ok_or(Error::Crypto("nonce too large"))?;
    let generator = curve.add(&curve.mul(s, &curve.generator()), shared);
    curve.with_generator(generator)
}

/// Public key data object `7F49 { 06 oid, 86 point }` that authentication tokens are computed
/// over. See BSI TR-03110-3 section D.3.
pub fn public_key_data_object(protocol: Oid, point: &[u8]) -> Vec<u8> {
    let mut value = tlv::encode(0x06, protocol.as_bytes());
    value.extend(tlv::encode(0x86, point));
    tlv::encode(0x7F49, &value)
}

impl Emrtd {
    /// Run PACE for one descriptor and install the resulting session on success.
    ///
    /// Failures are reported as [`Error::PaceAttemptFailed`], except for errors that end the
    /// session, which are passed through.
    pub fn pace(
        &mut self,
        rng: &mut (impl CryptoRng + RngCore),
        key: &BacKey,
        info: &PaceInfo,
    ) -> Result<()> {
        self.pace_generic_mapping(rng, key, info).map_err(|err| {
            if err.is_session_fatal() {
                err
            } else {
                Error::PaceAttemptFailed {
                    protocol: info.protocol.to_string(),
                    source: Box::new(err),
                }
            }
        })
    }

    fn pace_generic_mapping(
        &mut self,
        rng: &mut (impl CryptoRng + RngCore),
        key: &BacKey,
        info: &PaceInfo,
    ) -> Result<()> {
        let protocol = info.protocol;
        let cipher = match protocol {
            p if p.key_agreement != KeyAgreement::Ecdh || p.key_mapping != KeyMapping::Gm => {
                return Err(Error::UnsupportedPace(protocol.to_string()))
            }
            p => p
                .cipher
                .ok_or_else(|| Error::UnsupportedPace(protocol.to_string()))?,
        };
        let parameter_id = info
            .parameter_id
            .ok_or_else(|| Error::UnsupportedPace("proprietary domain parameters".into()))?;
        let curve = standardized_domain_parameters(parameter_id)?;
        let oid = protocol.oid()?;

        self.mse_set_at(oid, parameter_id)?;

        // Step 1: encrypted nonce
        let k_pi = pace_password_key(cipher, key);
        let z = self.general_authenticate(&[], 0x80, false)?;
        let s = decrypt_nonce(cipher, &k_pi, &z)?;
        debug!("PACE nonce received");

        // Step 2: map the nonce to an ephemeral generator
        let sk_map = curve.random_scalar(rng);
        let pk_map = curve.pt_to_bytes(&curve.mul(sk_map, &curve.generator()));
        let pk_map_chip = self.general_authenticate(&tlv::encode(0x81, &pk_map), 0x82, false)?;
        let pk_map_chip = curve.pt_from_bytes(&pk_map_chip)?;
        let shared = curve.mul(sk_map, &pk_map_chip);
        let mapped = map_generator(&curve, &s, &shared)?;
        debug!("PACE generator mapped");

        // Step 3: key agreement over the mapped generator
        let sk = mapped.random_scalar(rng);
        let pk = mapped.pt_to_bytes(&mapped.mul(sk, &mapped.generator()));
        let pk_chip = self.general_authenticate(&tlv::encode(0x83, &pk), 0x84, false)?;
        ensure_err!(
            pk_chip != pk,
            Error::AuthenticationFailed("chip reflected the terminal key".into())
        );
        let secret = mapped.ecka(sk, &mapped.pt_from_bytes(&pk_chip)?)?;
        let session = cipher.cipher(&secret);

        // Step 4: mutual authentication
        let token = session.authentication_token(&public_key_data_object(oid, &pk_chip))?;
        let token_chip = self.general_authenticate(&tlv::encode(0x85, &token), 0x86, true)?;
        let expected = session.authentication_token(&public_key_data_object(oid, &pk))?;
        ensure_err!(
            ct_eq(&token_chip, &expected),
            Error::AuthenticationFailed("PACE token mismatch".into())
        );

        self.set_secure_messaging(Box::new(SecureSession::new(session, 0)));
        info!(%protocol, parameter_id, "PACE established");
        Ok(())
    }

    /// `MSE:Set AT` selecting the PACE protocol, the MRZ password and the domain parameters.
    fn mse_set_at(&mut self, oid: Oid, parameter_id: u64) -> Result<()> {
        let parameter_id = u8::try_from(parameter_id)
            .map_err(|_| Error::UnsupportedPace(format!("parameter id {parameter_id}")))?;
        let mut data = tlv::encode(0x80, oid.as_bytes());
        data.extend(tlv::encode(0x83, &[0x01]));
        data.extend(tlv::encode(0x84, &[parameter_id]));
        let mut apdu = vec![0x00, 0x22, 0xC1, 0xA4, data.len() as u8];
        apdu.extend(data);
        let (status, _) = self.send_apdu(&apdu)?;
        ensure_err!(status.is_success(), status.into());
        Ok(())
    }

    /// One `GENERAL AUTHENTICATE` step, returning the value of the expected response object.
    fn general_authenticate(&mut self, data: &[u8], response_tag: u32, last: bool) -> Result<Vec<u8>> {
        let data = tlv::encode(0x7C, data);
        // Command chaining on all but the last step.
        let mut apdu = vec![if last { 0x00 } else { 0x10 }, 0x86, 0x00, 0x00, data.len() as u8];
        apdu.extend(data);
        apdu.push(0x00);
        let (status, resp) = self.send_apdu(&apdu)?;
        ensure_err!(status == StatusWord::SUCCESS, status.into());
        let dynamic = Tlv::parse_tagged(&resp, 0x7C)?;
        Ok(dynamic.require(response_tag)?.value().to_vec())
    }
}
