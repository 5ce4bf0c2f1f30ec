//! EF.DG11 additional personal details, ICAO 9303-10 section 4.7.11.

use {
    crate::{
        emrtd::FileId,
        ensure_err,
        error::{Error, Result},
        tlv::{self, Tlv},
    },
    serde::Serialize,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AdditionalPersonalData {
    pub surname: String,
    pub given_names: String,
    pub other_names: Vec<String>,
    pub personal_number: Option<String>,
    /// `YYYYMMDD`
    pub full_date_of_birth: Option<String>,
    pub place_of_birth: Option<String>,
    pub address: Option<String>,
    pub telephone: Option<String>,
    pub profession: Option<String>,
    pub title: Option<String>,
}

impl AdditionalPersonalData {
    pub fn from_dg11(bytes: &[u8]) -> Result<Self> {
        ensure_err!(!bytes.is_empty(), Error::EmptyDataGroup(FileId::Dg11));
        let dg11 = Tlv::parse(bytes)?.expect_tag(0x6B)?;
        ensure_err!(!dg11.value().is_empty(), Error::EmptyDataGroup(FileId::Dg11));

        let mut result = Self::default();
        let mut name = None;
        for field in dg11.children() {
            let field = field?;
            match field.tag().0 {
                // Tag list
                0x5C => {}
                0x5F0E => name = Some(text(field.value())?),
                0x5F10 => result.personal_number = Some(joined(field.value())?),
                0x5F11 => result.place_of_birth = Some(joined(field.value())?),
                0x5F2B => result.full_date_of_birth = Some(full_date(field.value())?),
                0x5F42 => result.address = Some(joined(field.value())?),
                0x5F12 => result.telephone = Some(joined(field.value())?),
                0x5F13 => result.profession = Some(joined(field.value())?),
                0x5F14 => result.title = Some(joined(field.value())?),
                0xA0 => {
                    for other in field.children() {
                        let other = other?;
                        if other.tag().0 == 0x5F0F {
                            let (surname, given_names) = split_name(&text(other.value())?);
                            result.other_names.push(
                                [surname, given_names]
                                    .into_iter()
                                    .filter(|part| !part.is_empty())
                                    .collect::<Vec<_>>()
                                    .join(" "),
                            );
                        }
                    }
                }
                _ => {}
            }
        }
        let name = name.ok_or(tlv::Error::MissingTag(0x5F0E.into()))?;
        (result.surname, result.given_names) = split_name(&name);
        Ok(result)
    }
}

/// Split `SURNAME<<GIVEN<NAMES` at the last `<<`.
///
/// Trailing fillers are ignored. Without a `<<` the whole name is taken as the surname.
pub fn split_name(name: &str) -> (String, String) {
    let name = name.trim_end_matches('<');
    let defill = |part: &str| part.replace('<', " ").trim().to_string();
    match name.rsplit_once("<<") {
        Some((surname, given_names)) => (defill(surname), defill(given_names)),
        None => (defill(name), String::new()),
    }
}

fn text(value: &[u8]) -> Result<String> {
    Ok(std::str::from_utf8(value)
        .map_err(|_| tlv::Error::InvalidValue("DG11 field is not UTF-8"))?
        .to_string())
}

/// Multi-part fields separate their parts with `<`.
fn joined(value: &[u8]) -> Result<String> {
    Ok(text(value)?
        .split('<')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" "))
}

/// Full date of birth, either as ASCII `YYYYMMDD` or as four BCD bytes.
fn full_date(value: &[u8]) -> Result<String> {
    if value.len() == 4 && !value.iter().all(u8::is_ascii_digit) {
        let mut date = String::with_capacity(8);
        for nibble in value.iter().flat_map(|b| [b >> 4, b & 0x0F]) {
            let digit = char::from_digit(nibble.into(), 10)
                .ok_or(tlv::Error::InvalidValue("invalid BCD date"))?;
            date.push(digit);
        }
        return Ok(date);
    }
    text(value)
}
