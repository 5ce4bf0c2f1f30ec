use {
    super::MrzInfo,
    crate::{
        error::Result,
        tlv::{self, Tlv},
    },
};

impl MrzInfo {
    /// Decode EF.DG1: `61 { 5F1F <MRZ> }`.
    pub fn from_dg1(bytes: &[u8]) -> Result<Self> {
        let dg1 = Tlv::parse(bytes)?.expect_tag(0x61)?;
        let mrz = dg1.require(0x5F1F)?.value();
        let mrz = std::str::from_utf8(mrz)
            .map_err(|_| tlv::Error::InvalidValue("MRZ is not ASCII"))?;
        Self::parse(mrz)
    }
}
