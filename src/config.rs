//! Reader settings. Hosts typically deserialize these from their own configuration file.

use {
    crate::{
        ensure_err,
        error::{Error, Result},
    },
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

/// Which file the PACE descriptors are read from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityInfoSource {
    /// EF.CardSecurity, the signed superset of EF.CardAccess.
    #[default]
    CardSecurity,
    CardAccess,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// Bound on a single APDU exchange.
    pub timeout_ms: u64,

    /// Le for READ BINARY. The default leaves room for secure messaging overhead in a short
    /// response APDU.
    pub max_read_len: usize,

    /// Read and decode DG2.
    pub include_images: bool,

    /// Try PACE before falling back to BAC.
    pub attempt_pace: bool,

    pub security_info_source: SecurityInfoSource,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_read_len: 0xDF,
            include_images: false,
            attempt_pace: true,
            security_info_source: SecurityInfoSource::default(),
        }
    }
}

impl ReaderConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_err!(self.timeout_ms > 0, Error::InvalidConfig("timeout must be positive"));
        ensure_err!(
            (1..=0xFF).contains(&self.max_read_len),
            Error::InvalidConfig("max_read_len must be between 1 and 255")
        );
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: ReaderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ReaderConfig::default());
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.security_info_source, SecurityInfoSource::CardSecurity);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial() {
        let config: ReaderConfig = serde_json::from_str(
            r#"{"include_images": true, "security_info_source": "card_access"}"#,
        )
        .unwrap();
        assert!(config.include_images);
        assert!(config.attempt_pace);
        assert_eq!(config.security_info_source, SecurityInfoSource::CardAccess);
        assert_eq!(config.max_read_len, 0xDF);
    }

    #[test]
    fn test_validate() {
        let config = ReaderConfig {
            timeout_ms: 0,
            ..ReaderConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        for max_read_len in [0, 0x100] {
            let config = ReaderConfig {
                max_read_len,
                ..ReaderConfig::default()
            };
            assert!(config.validate().is_err());
        }

        assert!(serde_json::from_str::<ReaderConfig>(r#"{"timeout": 5}"#).is_err());
    }
}
