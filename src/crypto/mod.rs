//! Cryptographic algorithms and utility functions.

mod elliptic_curve;
mod named_curves;
mod prime_field;

pub use self::{
    elliptic_curve::{EllipticCurve, Point},
    named_curves::{standardized_domain_parameters, StandardizedDomainParameters},
    prime_field::{PrimeField, Uint},
};
use subtle::ConstantTimeEq;

/// ISO/IEC 9797-1 padding method 2.
pub fn pad(bytes: &mut Vec<u8>, block_size: usize) {
    bytes.push(0x80);
    bytes.resize(bytes.len().next_multiple_of(block_size), 0x00);
}

/// Strip ISO/IEC 9797-1 padding method 2, returning `None` if it is malformed.
pub fn unpad(bytes: &[u8]) -> Option<&[u8]> {
    let end = bytes.iter().rposition(|&b| b != 0x00)?;
    (bytes[end] == 0x80).then(|| &bytes[..end])
}

/// Constant time comparison of MACs and authentication tokens.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    #[test]
    fn test_pad() {
        let mut data = hex!("011E").to_vec();
        pad(&mut data, 8);
        assert_eq!(data, hex!("011E800000000000"));

        let mut data = vec![0xAA; 8];
        pad(&mut data, 8);
        assert_eq!(data.len(), 16);
        assert_eq!(data[8], 0x80);

        let mut data = vec![];
        pad(&mut data, 16);
        assert_eq!(data, hex!("80000000000000000000000000000000"));
    }

    #[test]
    fn test_unpad() {
        assert_eq!(unpad(&hex!("011E800000000000")), Some(&hex!("011E")[..]));
        assert_eq!(unpad(&hex!("8000000000000000")), Some(&[][..]));
        assert_eq!(unpad(&hex!("011E000000000000")), None);
        assert_eq!(unpad(&hex!("0000000000000000")), None);
        assert_eq!(unpad(&hex!("80011E0000000000")), None);
    }

    #[test]
    fn test_ct_eq() {
        assert!(ct_eq(&hex!("0102"), &hex!("0102")));
        assert!(!ct_eq(&hex!("0102"), &hex!("0103")));
        assert!(!ct_eq(&hex!("0102"), &hex!("010203")));
    }
}
