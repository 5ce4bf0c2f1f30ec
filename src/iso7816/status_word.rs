//! ISO/IEC 7816-4 section 5.6

use {
    serde::Serialize,
    std::fmt::{self, Display, Formatter},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize)]
pub struct StatusWord(u16);

impl StatusWord {
    pub const SUCCESS: Self = Self(0x9000);
    pub const END_OF_FILE: Self = Self(0x6282);
    pub const VERIFICATION_FAILED: Self = Self(0x6300);
    pub const WRONG_LENGTH: Self = Self(0x6700);
    pub const SECURITY_STATUS_NOT_SATISFIED: Self = Self(0x6982);
    pub const CONDITIONS_NOT_SATISFIED: Self = Self(0x6985);
    pub const NO_CURRENT_EF: Self = Self(0x6986);
    pub const SM_DATA_OBJECTS_MISSING: Self = Self(0x6987);
    pub const SM_DATA_OBJECTS_INCORRECT: Self = Self(0x6988);
    pub const INCORRECT_DATA: Self = Self(0x6A80);
    pub const FILE_NOT_FOUND: Self = Self(0x6A82);
    pub const WRONG_OFFSET: Self = Self(0x6B00);
    pub const INS_NOT_SUPPORTED: Self = Self(0x6D00);

    pub fn sw1(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn sw2(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub fn is_success(self) -> bool {
        matches!(self.0, 0x9000 | 0x6100..=0x61FF)
    }

    pub fn data_remaining(self) -> Option<usize> {
        match self.0 {
            0x6100..=0x61FF => Some(self.0 as usize & 0xFF),
            _ => None,
        }
    }

    pub fn is_warning(self) -> bool {
        matches!(self.0, 0x6200..=0x63FF)
    }

    /// Counter-based authentication failure, `63Cx` with `x` tries left.
    pub fn retries_left(self) -> Option<u8> {
        match self.0 {
            0x63C0..=0x63CF => Some(self.sw2() & 0x0F),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        #[allow(clippy::match_overlapping_arm)]
        match self.0 {
            0x9000 => "Success",
            0x6100..=0x61FF => "Success, data remaining",
            0x6282 => "End of file reached before reading Le bytes",
            0x6300 => "Verification failed",
            0x63C0..=0x63CF => "Verification failed, counter provided",
            0x6200..=0x63FF => "Warning",
            0x6581 => "Memory failure",
            0x6700 => "Wrong length",
            0x6882 => "Secure messaging not supported",
            0x6982 => "Security status not satisfied",
            0x6983 => "Authentication method blocked",
            0x6984 => "Reference data not usable",
            0x6985 => "Conditions of use not satisfied",
            0x6986 => "Command not allowed, no current EF",
            0x6987 => "Expected secure messaging data objects missing",
            0x6988 => "Incorrect secure messaging data objects",
            0x6A80 => "Incorrect parameters in the command data field",
            0x6A82 => "File or application not found",
            0x6A86 => "Incorrect parameters P1-P2",
            0x6A88 => "Referenced data not found",
            0x6B00 => "Wrong parameters P1-P2",
            0x6D00 => "Instruction code not supported or invalid",
            0x6E00 => "Class not supported",
            0x6F00 => "No precise diagnosis",
            0x6400..=0x6FFF => "Error",
            _ => "Unknown status word",
        }
    }
}

impl Display for StatusWord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X} ({})", self.0, self.as_str())
    }
}

impl From<u16> for StatusWord {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<(u8, u8)> for StatusWord {
    fn from((sw1, sw2): (u8, u8)) -> Self {
        Self(u16::from_be_bytes([sw1, sw2]))
    }
}

impl From<StatusWord> for u16 {
    fn from(status: StatusWord) -> Self {
        status.0
    }
}
