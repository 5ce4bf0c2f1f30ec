//! Machine readable zone text, ICAO 9303-3 section 4.9 and parts 4 to 6.

use {
    crate::{
        ensure_err,
        error::{Error, Result},
        tlv,
    },
    serde::Serialize,
    std::fmt::{self, Display, Formatter},
    tracing::warn,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MrzFormat {
    /// Three lines of 30 characters (ID cards).
    Td1,
    /// Two lines of 36 characters.
    Td2,
    /// Two lines of 44 characters (passport booklets).
    Td3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Gender {
    Male,
    Female,
    Unspecified,
}

/// Fields of the MRZ as stored in DG1. Dates are kept as `YYMMDD`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MrzInfo {
    pub format: MrzFormat,
    pub document_code: String,
    pub issuing_state: String,
    pub document_number: String,
    pub primary_identifier: String,
    pub secondary_identifier: String,
    pub nationality: String,
    pub date_of_birth: String,
    pub gender: Gender,
    pub date_of_expiry: String,
    pub personal_number: String,
    pub check_digits_valid: bool,
    pub raw_mrz: String,
}

/// ICAO 9303-3 section 4.9 check digit over an MRZ field.
///
/// Returns `None` if the field contains characters outside the MRZ alphabet.
pub fn check_digit(field: &str) -> Option<char> {
    const WEIGHTS: [u32; 3] = [7, 3, 1];
    let mut sum = 0;
    for (i, c) in field.chars().enumerate() {
        let value = match c {
            '0'..='9' => c as u32 - '0' as u32,
            'A'..='Z' => c as u32 - 'A' as u32 + 10,
            '<' => 0,
            _ => return None,
        };
        sum += value * WEIGHTS[i % 3];
    }
    char::from_digit(sum % 10, 10)
}

fn is_mrz_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || c == '<'
}

fn malformed(reason: &'static str) -> Error {
    Error::MalformedEncoding(tlv::Error::InvalidValue(reason))
}

/// Replace fillers with spaces and trim.
fn defill(field: &str) -> String {
    field.replace('<', " ").trim().to_string()
}

/// Split an MRZ name into primary and secondary identifier at the first `<<`.
fn split_name(name: &str) -> (String, String) {
    match name.split_once("<<") {
        Some((primary, secondary)) => (defill(primary), defill(secondary)),
        None => (defill(name), String::new()),
    }
}

/// Collects check digit results, logging each mismatch.
struct Checks(bool);

impl Checks {
    fn verify(&mut self, name: &str, field: &str, digit: &str) {
        // An empty optional field may carry a filler instead of a zero check digit.
        if digit == "<" && field.chars().all(|c| c == '<') {
            return;
        }
        if check_digit(field).map(String::from).as_deref() != Some(digit) {
            warn!(field = name, "MRZ check digit mismatch");
            self.0 = false;
        }
    }
}

impl MrzInfo {
    pub fn parse(mrz: &str) -> Result<Self> {
        ensure_err!(mrz.chars().all(is_mrz_char), malformed("invalid MRZ character"));
        // All characters are ASCII from here on, byte slicing is safe.
        match mrz.len() {
            90 => Ok(Self::parse_td1(mrz)),
            72 => Ok(Self::parse_td2_td3(mrz, MrzFormat::Td2)),
            88 => Ok(Self::parse_td2_td3(mrz, MrzFormat::Td3)),
            _ => Err(malformed("MRZ length does not match TD1, TD2 or TD3")),
        }
    }

    fn parse_td1(mrz: &str) -> Self {
        let (line1, rest) = mrz.split_at(30);
        let (line2, line3) = rest.split_at(30);
        let mut checks = Checks(true);

        // A document number longer than 9 characters continues in the optional data, with its
        // check digit as the last character before the first filler.
        let (document_number, optional1) = if &line1[14..15] == "<" && &line1[15..16] != "<" {
            let optional = &line1[15..30];
            let end = optional.find('<').unwrap_or(optional.len());
            let (extension, digit) = optional[..end].split_at(end.saturating_sub(1));
            let number = format!("{}{}", &line1[5..14], extension);
            checks.verify("document number", &number, digit);
            (number, &optional[end..])
        } else {
            checks.verify("document number", &line1[5..14], &line1[14..15]);
            (line1[5..14].to_string(), &line1[15..30])
        };
        checks.verify("date of birth", &line2[0..6], &line2[6..7]);
        checks.verify("date of expiry", &line2[8..14], &line2[14..15]);
        let composite = [&line1[5..30], &line2[0..7], &line2[8..15], &line2[18..29]].concat();
        checks.verify("composite", &composite, &line2[29..30]);

        let (primary_identifier, secondary_identifier) = split_name(line3);
        Self {
            format: MrzFormat::Td1,
            document_code: defill(&line1[0..2]),
            issuing_state: defill(&line1[2..5]),
            document_number: defill(&document_number),
            primary_identifier,
            secondary_identifier,
            nationality: defill(&line2[15..18]),
            date_of_birth: line2[0..6].to_string(),
            gender: gender(&line2[7..8]),
            date_of_expiry: line2[8..14].to_string(),
            personal_number: defill(optional1),
            check_digits_valid: checks.0,
            raw_mrz: mrz.to_string(),
        }
    }

    fn parse_td2_td3(mrz: &str, format: MrzFormat) -> Self {
        let (line1, line2) = mrz.split_at(mrz.len() / 2);
        let width = line2.len();
        let mut checks = Checks(true);

        checks.verify("document number", &line2[0..9], &line2[9..10]);
        checks.verify("date of birth", &line2[13..19], &line2[19..20]);
        checks.verify("date of expiry", &line2[21..27], &line2[27..28]);
        let optional = match format {
            MrzFormat::Td3 => {
                checks.verify("personal number", &line2[28..42], &line2[42..43]);
                &line2[28..42]
            }
            _ => &line2[28..35],
        };
        let composite = [&line2[0..10], &line2[13..20], &line2[21..width - 1]].concat();
        checks.verify("composite", &composite, &line2[width - 1..]);

        let (primary_identifier, secondary_identifier) = split_name(&line1[5..]);
        Self {
            format,
            document_code: defill(&line1[0..2]),
            issuing_state: defill(&line1[2..5]),
            document_number: defill(&line2[0..9]),
            primary_identifier,
            secondary_identifier,
            nationality: defill(&line2[10..13]),
            date_of_birth: line2[13..19].to_string(),
            gender: gender(&line2[20..21]),
            date_of_expiry: line2[21..27].to_string(),
            personal_number: defill(optional),
            check_digits_valid: checks.0,
            raw_mrz: mrz.to_string(),
        }
    }
}

fn gender(code: &str) -> Gender {
    match code {
        "M" => Gender::Male,
        "F" => Gender::Female,
        _ => Gender::Unspecified,
    }
}

impl Display for MrzFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Td1 => write!(f, "TD1"),
            Self::Td2 => write!(f, "TD2"),
            Self::Td3 => write!(f, "TD3"),
        }
    }
}
