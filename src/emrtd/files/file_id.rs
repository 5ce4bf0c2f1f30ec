//! ICAO 9303-10 Table 38.

use {
    serde::Serialize,
    std::fmt::{self, Display, Formatter},
};

pub const EMRTD_LDS1_AID: &[u8] = &[0xA0, 0x00, 0x00, 0x02, 0x47, 0x10, 0x01];

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum DedicatedId {
    MasterFile,
    EmrtdLds1,
}

/// Elementary files this reader knows how to locate.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Serialize)]
pub enum FileId {
    CardAccess,
    CardSecurity,
    Com,
    Dg1,
    Dg2,
    Dg11,
}

impl DedicatedId {
    pub fn aid(&self) -> Option<&'static [u8]> {
        match self {
            Self::MasterFile => None,
            Self::EmrtdLds1 => Some(EMRTD_LDS1_AID),
        }
    }
}

impl FileId {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CardAccess => "EF.CardAccess",
            Self::CardSecurity => "EF.CardSecurity",
            Self::Com => "EF.COM",
            Self::Dg1 => "EF.DG1",
            Self::Dg2 => "EF.DG2",
            Self::Dg11 => "EF.DG11",
        }
    }

    /// ICAO 9303-10 section 3.11
    pub fn parent(&self) -> DedicatedId {
        match self {
            Self::CardAccess | Self::CardSecurity => DedicatedId::MasterFile,
            Self::Com | Self::Dg1 | Self::Dg2 | Self::Dg11 => DedicatedId::EmrtdLds1,
        }
    }

    pub fn file_id(&self) -> u16 {
        match self {
            Self::CardAccess => 0x011C,
            Self::CardSecurity => 0x011D,
            Self::Com => 0x011E,
            Self::Dg1 => 0x0101,
            Self::Dg2 => 0x0102,
            Self::Dg11 => 0x010B,
        }
    }

    pub fn short_id(&self) -> u8 {
        // The file identifier's low byte doubles as the short EF identifier.
        (self.file_id() & 0x1F) as u8
    }

    /// Outermost tag of the file contents, ICAO 9303-10 section 4.6.
    pub fn tag(&self) -> Option<u32> {
        match self {
            Self::Com => Some(0x60),
            Self::Dg1 => Some(0x61),
            Self::Dg2 => Some(0x75),
            Self::Dg11 => Some(0x6B),
            Self::CardAccess | Self::CardSecurity => None,
        }
    }
}

impl Display for FileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_ids() {
        assert_eq!(FileId::CardAccess.short_id(), 0x1C);
        assert_eq!(FileId::CardSecurity.short_id(), 0x1D);
        assert_eq!(FileId::Com.short_id(), 0x1E);
        assert_eq!(FileId::Dg1.short_id(), 0x01);
        assert_eq!(FileId::Dg2.short_id(), 0x02);
        assert_eq!(FileId::Dg11.short_id(), 0x0B);
    }

    #[test]
    fn test_parents() {
        assert_eq!(FileId::CardSecurity.parent(), DedicatedId::MasterFile);
        assert_eq!(FileId::Dg11.parent(), DedicatedId::EmrtdLds1);
        assert_eq!(DedicatedId::EmrtdLds1.aid(), Some(EMRTD_LDS1_AID));
    }
}
