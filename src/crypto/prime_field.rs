use {
    crate::{
        ensure_err,
        error::{Error, Result},
    },
    std::fmt::{self, Debug, Formatter},
};

/// Large enough for every field of the supported PACE domain parameters (up to 384 bits).
pub type Uint = ruint::Uint<384, 6>;

/// The integers modulo a prime `p`.
///
/// Elements are plain [`Uint`]s kept reduced below the modulus. See BSI TR-03111 section 2.2.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PrimeField {
    modulus: Uint,
}

impl PrimeField {
    pub fn from_modulus(modulus: Uint) -> Self {
        debug_assert!(modulus.bit(0), "modulus must be an odd prime");
        Self { modulus }
    }

    pub fn modulus(&self) -> Uint {
        self.modulus
    }

    /// Length of an encoded field element in bytes.
    pub fn byte_len(&self) -> usize {
        self.modulus.bit_len().div_ceil(8)
    }

    pub fn from_u64(&self, value: u64) -> Uint {
        Uint::from(value).reduce_mod(self.modulus)
    }

    pub fn add(&self, a: Uint, b: Uint) -> Uint {
        a.add_mod(b, self.modulus)
    }

    pub fn sub(&self, a: Uint, b: Uint) -> Uint {
        a.add_mod(self.neg(b), self.modulus)
    }

    pub fn neg(&self, a: Uint) -> Uint {
        if a.is_zero() {
            a
        } else {
            self.modulus - a
        }
    }

    pub fn mul(&self, a: Uint, b: Uint) -> Uint {
        a.mul_mod(b, self.modulus)
    }

    pub fn square(&self, a: Uint) -> Uint {
        self.mul(a, a)
    }

    /// Multiplicative inverse by Fermat's little theorem. Not constant time.
    pub fn inv(&self, a: Uint) -> Option<Uint> {
        if a.is_zero() {
            return None;
        }
        Some(a.pow_mod(self.modulus - Uint::from(2_u64), self.modulus))
    }

    /// Octet string to field element, TR-03111 section 3.1.3.
    pub fn os2fe(&self, bytes: &[u8]) -> Result<Uint> {
        let value = Uint::try_from_be_slice(bytes).ok_or(Error::Crypto("field element too large"))?;
        ensure_err!(value < self.modulus, Error::Crypto("field element not reduced"));
        Ok(value)
    }

    /// Field element to fixed length octet string, TR-03111 section 3.1.3.
    pub fn fe2os(&self, value: Uint) -> Vec<u8> {
        let bytes = value.to_be_bytes_vec();
        bytes[bytes.len() - self.byte_len()..].to_vec()
    }
}

impl Debug for PrimeField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "PrimeField({:#x})", self.modulus)
    }
}
