//! 3DES cipher for Secure Messaging

use {
    super::{cbc_decrypt, cbc_encrypt, Cipher, KDF_ENC, KDF_MAC},
    crate::{
        crypto::pad,
        ensure_err,
        error::{Error, Result},
    },
    cipher::{BlockDecrypt as _, BlockEncrypt as _, KeyInit as _},
    des::{Des, TdesEde2},
    sha1::{Digest, Sha1},
};

const BLOCK_SIZE: usize = 8;

pub struct TDesCipher {
    kenc: [u8; 16],
    kmac: [u8; 16],
}

impl TDesCipher {
    pub fn from_seed(seed: &[u8]) -> Self {
        Self {
            kenc: kdf(seed, KDF_ENC),
            kmac: kdf(seed, KDF_MAC),
        }
    }
}

impl Cipher for TDesCipher {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn enc(&self, _ssc: u64, data: &mut [u8]) -> Result<()> {
        cbc_encrypt::<TdesEde2>(&self.kenc, &[0; BLOCK_SIZE], data)
    }

    fn dec(&self, _ssc: u64, data: &mut [u8]) -> Result<()> {
        cbc_decrypt::<TdesEde2>(&self.kenc, &[0; BLOCK_SIZE], data)
    }

    fn mac(&self, data: &[u8]) -> Result<[u8; 8]> {
        retail_mac(&self.kmac, data)
    }

    fn authentication_token(&self, data: &[u8]) -> Result<[u8; 8]> {
        let mut data = data.to_vec();
        pad(&mut data, BLOCK_SIZE);
        retail_mac(&self.kmac, &data)
    }
}

/// Retail MAC (ISO 9797-1 mode 3) using DES.
// See <https://crypto.stackexchange.com/questions/18951/what-are-options-to-compute-des-retail-mac-aka-iso-9797-1-mode-3-under-pkcs11>
pub fn retail_mac(key: &[u8; 16], data: &[u8]) -> Result<[u8; 8]> {
    ensure_err!(
        data.len() % BLOCK_SIZE == 0,
        Error::Crypto("MAC input is not block aligned")
    );
    let invalid_key = |_| Error::Crypto("invalid DES key length");
    let des1 = Des::new_from_slice(&key[..8]).map_err(invalid_key)?;
    let des2 = Des::new_from_slice(&key[8..]).map_err(invalid_key)?;
    let mut state = [0_u8; 8];
    for block in data.chunks_exact(BLOCK_SIZE) {
        for (s, b) in state.iter_mut().zip(block) {
            *s ^= b;
        }
        des1.encrypt_block((&mut state).into());
    }
    des2.decrypt_block((&mut state).into());
    des1.encrypt_block((&mut state).into());
    Ok(state)
}

/// ICAO 9303-11 section 9.7.1.1
pub fn kdf(seed: &[u8], counter: u32) -> [u8; 16] {
    let mut hasher = Sha1::new();
    hasher.update(seed);
    hasher.update(counter.to_be_bytes());
    let hash = hasher.finalize();
    let mut key = [0; 16];
    key.copy_from_slice(&hash[..16]);
    set_parity_bits(&mut key);
    key
}

/// DES keys use only 7 bits per byte, with the least significant bit used for parity.
fn set_parity_bits(key: &mut [u8]) {
    for byte in key {
        *byte &= 0xFE;
        *byte |= 1 ^ (byte.count_ones() as u8 & 1);
    }
}
