mod file_id;

pub use self::file_id::{DedicatedId, FileId, EMRTD_LDS1_AID};
use {
    super::Emrtd,
    crate::{
        ensure_err,
        error::{Error, Result},
        iso7816::StatusWord,
        tlv::{self, Tlv},
    },
    tracing::debug,
};

/// READ BINARY with an even instruction byte only addresses 15 bit offsets.
const MAX_OFFSET: usize = 0x7FFF;

/// Beyond [`MAX_OFFSET`] the offset is sent in a three byte data object.
const MAX_ODD_OFFSET: usize = 0xFF_FFFF;

impl Emrtd {
    /// Reads an elementary file in full, selecting its parent first if necessary.
    ///
    /// Assumes the file is a single TLV structure. An empty file reads as an empty vector.
    pub fn read_file(&mut self, file: FileId) -> Result<Vec<u8>> {
        // Select parent file if necessary.
        if self.parent != file.parent() {
            self.select_dedicated_file(file.parent())?;
        }

        // Read file by short EF.
        let mut result = match self.read_binary_short_ef(file.short_id(), self.max_read_len) {
            Err(Error::ErrorResponse(StatusWord::FILE_NOT_FOUND)) => {
                return Err(Error::FileNotFound(file))
            }
            result => result?,
        };
        loop {
            // Check if we are done by parsing the header.
            let expected = tlv::sniff_len(&result)?;
            if result.is_empty() || expected.is_some_and(|len| result.len() >= len) {
                break;
            }
            ensure_err!(result.len() <= MAX_ODD_OFFSET, Error::FileTooLarge(file));
            let remaining = expected.map_or(self.max_read_len, |len| len - result.len());
            let chunk = if result.len() <= MAX_OFFSET {
                self.read_binary_offset(result.len(), remaining.min(self.max_read_len))?
            } else {
                // Leave room for the `53` header around the data.
                let len = (remaining + 3).min(self.max_read_len);
                self.read_binary_extended_offset(result.len(), len)?
            };
            if chunk.is_empty() {
                break;
            }
            result.extend(&chunk);
        }

        // Some chips zero-extend the file on READ BINARY. Trim the file to the actual length.
        if !result.is_empty() {
            let expected = tlv::sniff_len(&result)?.ok_or(tlv::Error::TruncatedLength)?;
            ensure_err!(
                result.len() >= expected,
                tlv::Error::LengthExceedsBuffer {
                    length: expected,
                    remaining: result.len(),
                }
                .into()
            );
            result.truncate(expected);
        }
        debug!(%file, len = result.len(), "Read file");
        Ok(result)
    }

    pub fn select_dedicated_file(&mut self, dedicated: DedicatedId) -> Result<()> {
        // Select by file identifier or by DF name.
        // See ISO/IEC 7816-4 section 11.2.2
        let apdu = match dedicated.aid() {
            None => vec![0x00, 0xA4, 0x00, 0x0C, 0x02, 0x3F, 0x00],
            Some(aid) => {
                let mut apdu = vec![0x00, 0xA4, 0x04, 0x0C, aid.len() as u8];
                apdu.extend_from_slice(aid);
                apdu
            }
        };
        let (status, _) = self.send_apdu(&apdu)?;
        ensure_err!(status.is_success(), status.into());
        self.parent = dedicated;
        Ok(())
    }

    /// Read binary data from an elementary file using a Short EF identifier.
    ///
    /// This also makes the file current for subsequent [`Self::read_binary_offset`] calls.
    /// See ICAO 9303-10 section 3.6.3.2 and ISO 7816-4 section 11.3.3.
    pub fn read_binary_short_ef(&mut self, file: u8, len: usize) -> Result<Vec<u8>> {
        ensure_err!(file <= 0x1F, Error::InvalidApdu("short EF identifier out of range"));
        // Note b8 of p1 must be set to 1 to indicate that a short file id is used.
        // Setting P2 to 0 means 'offset zero'.
        self.read_binary([0x80 | file, 0x00], len)
    }

    /// Reads the current file at a given offset.
    pub fn read_binary_offset(&mut self, offset: usize, len: usize) -> Result<Vec<u8>> {
        ensure_err!(offset <= MAX_OFFSET, Error::InvalidApdu("offset exceeds 15 bits"));
        self.read_binary((offset as u16).to_be_bytes(), len)
    }

    /// READ BINARY with odd INS for offsets past 15 bits, ISO 7816-4 section 11.3.3.
    ///
    /// The offset goes in data object `54` and the chip answers with the data wrapped in `53`.
    /// `len` bounds the whole response, so each call returns a few bytes less than asked for.
    pub fn read_binary_extended_offset(&mut self, offset: usize, len: usize) -> Result<Vec<u8>> {
        ensure_err!(
            offset <= MAX_ODD_OFFSET,
            Error::InvalidApdu("offset exceeds 24 bits")
        );
        ensure_err!(
            (1..=0xFF).contains(&len),
            Error::InvalidApdu("Le must fit in a short APDU")
        );
        let offset_bytes = (offset as u32).to_be_bytes();
        let offset_bytes = if offset <= 0xFFFF {
            &offset_bytes[2..]
        } else {
            &offset_bytes[1..]
        };
        let data = tlv::encode(0x54, offset_bytes);
        let mut apdu = vec![0x00, 0xB1, 0x00, 0x00, data.len() as u8];
        apdu.extend_from_slice(&data);
        apdu.push(len as u8);
        let (status, data) = self.send_apdu(&apdu)?;
        ensure_err!(
            status.is_success() || status == StatusWord::END_OF_FILE,
            status.into()
        );
        if data.is_empty() {
            return Ok(data);
        }
        Ok(Tlv::parse_tagged(&data, 0x53)?.value().to_vec())
    }

    fn read_binary(&mut self, [p1, p2]: [u8; 2], len: usize) -> Result<Vec<u8>> {
        ensure_err!(
            (1..=0xFF).contains(&len),
            Error::InvalidApdu("Le must fit in a short APDU")
        );
        let (status, data) = self.send_apdu(&[0x00, 0xB0, p1, p2, len as u8])?;
        // Reading past the end of the file returns what is available with a warning.
        ensure_err!(
            status.is_success() || status == StatusWord::END_OF_FILE,
            status.into()
        );
        Ok(data)
    }
}
