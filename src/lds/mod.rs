//! Logical Data Structure decoders, ICAO 9303-10.

mod dg1;
mod dg11;
mod dg2;
mod mrz;

pub use self::{
    dg11::AdditionalPersonalData,
    dg2::{FacePhoto, ImageType},
    mrz::{check_digit, Gender, MrzFormat, MrzInfo},
};

#[cfg(test)]
pub(crate) use self::{
    dg1::tests::dg1,
    dg11::tests::SPECIMEN_DG11,
    dg2::tests::{dg2, face_record},
    mrz::tests::td3_specimen,
};
