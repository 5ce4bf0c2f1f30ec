//! AES ciphers for Secure Messaging, ICAO 9303-11 section 9.8.7.

use {
    super::{cbc_decrypt, cbc_encrypt, Cipher, KDF_ENC, KDF_MAC},
    crate::error::{Error, Result},
    aes::{Aes128, Aes192, Aes256},
    cipher::{BlockEncrypt as _, KeyInit as _},
    cmac::{Cmac, Mac},
    sha1::{Digest, Sha1},
    sha2::Sha256,
};

// All AES variants have the same block size
const BLOCK_SIZE: usize = 16;

/// Key Derivation Function (KDF) for 128-bit AES keys.
/// ICAO 9303-11 section 9.7.1.2
pub fn kdf_128(secret: &[u8], counter: u32) -> [u8; 16] {
    let mut hasher = Sha1::new();
    hasher.update(secret);
    hasher.update(counter.to_be_bytes());
    let hash = hasher.finalize();
    let mut key = [0; 16];
    key.copy_from_slice(&hash[..16]);
    key
}

/// Key Derivation Function (KDF) for 192-bit AES keys.
/// ICAO 9303-11 section 9.7.1.2
pub fn kdf_192(secret: &[u8], counter: u32) -> [u8; 24] {
    let mut key = [0; 24];
    key.copy_from_slice(&kdf_256(secret, counter)[..24]);
    key
}

/// Key Derivation Function (KDF) for 256-bit AES keys.
/// ICAO 9303-11 section 9.7.1.2
pub fn kdf_256(secret: &[u8], counter: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hasher.update(counter.to_be_bytes());
    hasher.finalize().into()
}

macro_rules! aes_cipher {
    ($name:ident, $aes:ty, $key_len:literal, $kdf:ident) => {
        pub struct $name {
            kenc: [u8; $key_len],
            kmac: [u8; $key_len],
        }

        impl $name {
            pub fn from_seed(seed: &[u8]) -> Self {
                Self {
                    kenc: $kdf(seed, KDF_ENC),
                    kmac: $kdf(seed, KDF_MAC),
                }
            }

            /// `IV = E(K_enc, SSC)`, with the counter as a full block.
            fn iv(&self, ssc: u64) -> Result<[u8; BLOCK_SIZE]> {
                let cipher = <$aes>::new_from_slice(&self.kenc)
                    .map_err(|_| Error::Crypto("invalid AES key length"))?;
                let mut block = [0; BLOCK_SIZE];
                block[8..].copy_from_slice(&ssc.to_be_bytes());
                cipher.encrypt_block((&mut block).into());
                Ok(block)
            }

            fn cmac(&self, data: &[u8]) -> Result<[u8; 8]> {
                let mut mac = <Cmac<$aes> as Mac>::new_from_slice(&self.kmac)
                    .map_err(|_| Error::Crypto("invalid AES key length"))?;
                mac.update(data);
                let tag = mac.finalize().into_bytes();
                let mut truncated = [0; 8];
                truncated.copy_from_slice(&tag[..8]);
                Ok(truncated)
            }
        }

        impl Cipher for $name {
            fn block_size(&self) -> usize {
                BLOCK_SIZE
            }

            fn enc(&self, ssc: u64, data: &mut [u8]) -> Result<()> {
                cbc_encrypt::<$aes>(&self.kenc, &self.iv(ssc)?, data)
            }

            fn dec(&self, ssc: u64, data: &mut [u8]) -> Result<()> {
                cbc_decrypt::<$aes>(&self.kenc, &self.iv(ssc)?, data)
            }

            fn mac(&self, data: &[u8]) -> Result<[u8; 8]> {
                self.cmac(data)
            }

            // CMAC pads internally, the token input is not padded.
            fn authentication_token(&self, data: &[u8]) -> Result<[u8; 8]> {
                self.cmac(data)
            }
        }
    };
}

aes_cipher!(Aes128Cipher, Aes128, 16, kdf_128);
aes_cipher!(Aes192Cipher, Aes192, 24, kdf_192);
aes_cipher!(Aes256Cipher, Aes256, 32, kdf_256);
