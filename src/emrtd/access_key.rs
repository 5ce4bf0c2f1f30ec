use {
    crate::{
        ensure_err,
        error::{Error, Result},
        lds::{check_digit, MrzInfo},
    },
    std::fmt::{self, Debug, Formatter},
};

/// The MRZ derived password used by BAC and by PACE with an MRZ password.
///
/// See ICAO 9303-11 section 9.7.3.
#[derive(Clone, PartialEq, Eq)]
pub struct BacKey {
    document_number: String,
    date_of_birth: String,
    date_of_expiry: String,
}

impl BacKey {
    /// Dates are `YYMMDD`. Lowercase letters in the document number are accepted.
    pub fn new(document_number: &str, date_of_birth: &str, date_of_expiry: &str) -> Result<Self> {
        let document_number = document_number.trim().to_ascii_uppercase();
        ensure_err!(
            !document_number.is_empty() && document_number.len() <= 9,
            Error::InvalidAccessKey("document number must be 1 to 9 characters")
        );
        ensure_err!(
            document_number
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '<'),
            Error::InvalidAccessKey("document number contains non-MRZ characters")
        );
        for date in [date_of_birth, date_of_expiry] {
            ensure_err!(
                date.len() == 6 && date.bytes().all(|b| b.is_ascii_digit()),
                Error::InvalidAccessKey("dates must be six digits YYMMDD")
            );
        }
        Ok(Self {
            document_number,
            date_of_birth: date_of_birth.to_string(),
            date_of_expiry: date_of_expiry.to_string(),
        })
    }

    pub fn from_mrz(mrz: &MrzInfo) -> Result<Self> {
        Self::new(&mrz.document_number, &mrz.date_of_birth, &mrz.date_of_expiry)
    }

    /// `MRZ_information`: each field followed by its check digit.
    pub fn mrz_information(&self) -> String {
        let document_number = format!("{:<<9}", self.document_number);
        let mut out = String::with_capacity(24);
        for field in [&document_number, &self.date_of_birth, &self.date_of_expiry] {
            out.push_str(field);
            // Fields were validated to the MRZ alphabet on construction.
            out.push(check_digit(field).unwrap_or('0'));
        }
        out
    }
}

impl Debug for BacKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BacKey").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mrz_information() {
        // ICAO 9303-11 Appendix D.2
        let key = BacKey::new("L898902C", "690806", "940623").unwrap();
        assert_eq!(key.mrz_information(), "L898902C<369080619406236");

        let key = BacKey::new("l898902c3", "740812", "120415").unwrap();
        assert_eq!(key.mrz_information(), "L898902C3674081221204159");
    }

    #[test]
    fn test_invalid() {
        assert!(BacKey::new("", "690806", "940623").is_err());
        assert!(BacKey::new("L898902C3X", "690806", "940623").is_err());
        assert!(BacKey::new("L898-02C", "690806", "940623").is_err());
        assert!(BacKey::new("L898902C", "69086", "940623").is_err());
        assert!(BacKey::new("L898902C", "690806", "94O623").is_err());
    }

    #[test]
    fn test_debug_redacted() {
        let key = BacKey::new("L898902C", "690806", "940623").unwrap();
        assert!(!format!("{key:?}").contains("L898902C"));
    }
}
