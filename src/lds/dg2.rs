//! EF.DG2 encoded face, ICAO 9303-10 section 4.7.2 and ISO/IEC 19794-5.

use {
    crate::{
        ensure_err,
        error::{Error, Result},
        tlv::{self, Tlv},
    },
    bytes::Buf,
    serde::Serialize,
};

/// Facial record header magic, `FAC\0`.
const FACIAL_RECORD_MAGIC: u32 = 0x4641_4300;

const FACIAL_RECORD_HEADER_LEN: usize = 14;
const FACIAL_INFORMATION_LEN: usize = 20;
const FEATURE_POINT_LEN: usize = 8;
const IMAGE_INFORMATION_LEN: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ImageType {
    Jpeg,
    Jpeg2000,
}

/// The first image of the first facial record.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct FacePhoto {
    pub image_type: ImageType,
    pub width: u16,
    pub height: u16,
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
}

fn malformed(reason: &'static str) -> Error {
    Error::MalformedEncoding(tlv::Error::InvalidValue(reason))
}

impl FacePhoto {
    /// Decode EF.DG2: `75 { 7F61 { 02 count, 7F60 { A1 header, 5F2E data }, .. } }`.
    ///
    /// Takes the first image across all biometric information templates, so a leading record
    /// without images does not hide a later one. Returns `None` if no record holds an image.
    pub fn from_dg2(bytes: &[u8]) -> Result<Option<Self>> {
        let dg2 = Tlv::parse(bytes)?.expect_tag(0x75)?;
        let group = dg2.require(0x7F61)?;
        if let Some(count) = group.find(0x02)? {
            if count.value().iter().all(|&b| b == 0) {
                return Ok(None);
            }
        }
        for template in group.children() {
            let template = template?;
            if template.tag().0 != 0x7F60 {
                continue;
            }
            let block = match template.find(0x5F2E)? {
                Some(block) => block,
                None => template.require(0x7F2E)?,
            };
            if let Some(photo) = Self::from_facial_record(block.value())? {
                return Ok(Some(photo));
            }
        }
        Ok(None)
    }

    /// Parse an ISO/IEC 19794-5 facial record and take its first image.
    pub fn from_facial_record(mut record: &[u8]) -> Result<Option<Self>> {
        // Facial record header
        ensure_err!(
            record.remaining() >= FACIAL_RECORD_HEADER_LEN,
            malformed("facial record header truncated")
        );
        ensure_err!(
            record.get_u32() == FACIAL_RECORD_MAGIC,
            malformed("not a facial record")
        );
        let _version = record.get_u32();
        let record_len = record.get_u32() as usize;
        ensure_err!(
            record_len >= FACIAL_RECORD_HEADER_LEN,
            malformed("facial record length too small")
        );
        if record.get_u16() == 0 {
            return Ok(None);
        }

        // Facial information
        ensure_err!(
            record.remaining() >= FACIAL_INFORMATION_LEN,
            malformed("facial information truncated")
        );
        let block_len = record.get_u32() as usize;
        let feature_points = record.get_u16() as usize;
        // Gender, eye and hair colour, feature mask, expression, pose angle and uncertainty
        record.advance(FACIAL_INFORMATION_LEN - 6);
        let feature_points_len = feature_points * FEATURE_POINT_LEN;
        ensure_err!(
            record.remaining() >= feature_points_len + IMAGE_INFORMATION_LEN,
            malformed("image information truncated")
        );
        record.advance(feature_points_len);

        // Image information
        let _face_image_type = record.get_u8();
        let image_type = match record.get_u8() {
            0 => ImageType::Jpeg,
            1 => ImageType::Jpeg2000,
            _ => return Err(malformed("unknown image data type")),
        };
        let width = record.get_u16();
        let height = record.get_u16();
        // Colour space, source type, device type and quality
        record.advance(IMAGE_INFORMATION_LEN - 6);

        let image_len = block_len
            .checked_sub(FACIAL_INFORMATION_LEN + feature_points_len + IMAGE_INFORMATION_LEN)
            .ok_or_else(|| malformed("facial block length too small"))?;
        ensure_err!(
            image_len > 0 && record.remaining() >= image_len,
            malformed("image data truncated")
        );
        Ok(Some(Self {
            image_type,
            width,
            height,
            data: record[..image_len].to_vec(),
        }))
    }
}

impl std::fmt::Debug for FacePhoto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacePhoto")
            .field("image_type", &self.image_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.data.len())
            .finish()
    }
}
