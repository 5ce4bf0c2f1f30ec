use {
    crate::{
        emrtd::{FileId, ReadState},
        iso7816::StatusWord,
        nfc::TransportError,
        tlv,
    },
    thiserror::Error,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Returns `Err($err)` from the enclosing function unless `$cond` holds.
#[macro_export]
macro_rules! ensure_err {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("transport lost: {0}")]
    TransportLost(#[from] TransportError),

    #[error("security info unavailable: {0}")]
    SecurityInfoUnavailable(#[source] Box<Error>),

    #[error("PACE with {protocol} failed: {source}")]
    PaceAttemptFailed {
        protocol: String,
        #[source]
        source: Box<Error>,
    },

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("secure messaging integrity check failed")]
    IntegrityCheckFailed,

    #[error("malformed encoding: {0}")]
    MalformedEncoding(#[from] tlv::Error),

    #[error("{0} is empty")]
    EmptyDataGroup(FileId),

    #[error("reading {file} failed: {source}")]
    DataGroup {
        file: FileId,
        #[source]
        source: Box<Error>,
    },

    #[error("card returned {0}")]
    ErrorResponse(StatusWord),

    #[error("file {0} not found")]
    FileNotFound(FileId),

    #[error("file {0} extends beyond the 24 bit READ BINARY offset range")]
    FileTooLarge(FileId),

    #[error("invalid secure messaging response")]
    SecureMessagingInvalid,

    #[error("secure messaging session was invalidated")]
    SessionInvalidated,

    #[error("invalid APDU: {0}")]
    InvalidApdu(&'static str),

    #[error("invalid access key: {0}")]
    InvalidAccessKey(&'static str),

    #[error("unsupported PACE configuration: {0}")]
    UnsupportedPace(String),

    #[error("cryptographic failure: {0}")]
    Crypto(&'static str),

    #[error("reader cannot proceed from state {0:?}")]
    InvalidState(ReadState),

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("ASN.1 error: {0}")]
    Asn1(#[from] der::Error),
}

impl Error {
    /// Errors after which no further command can be exchanged with the chip.
    pub fn is_session_fatal(&self) -> bool {
        match self {
            Self::TransportLost(_) | Self::IntegrityCheckFailed | Self::SessionInvalidated => true,
            Self::DataGroup { source, .. } => source.is_session_fatal(),
            _ => false,
        }
    }

    /// Attribute a failure to a data group. Empty groups and session loss are kept as-is.
    pub(crate) fn data_group(file: FileId, err: Error) -> Self {
        match err {
            err @ Self::EmptyDataGroup(_) => err,
            err if err.is_session_fatal() => err,
            err => Self::DataGroup {
                file,
                source: Box::new(err),
            },
        }
    }
}

impl From<StatusWord> for Error {
    fn from(status: StatusWord) -> Self {
        Self::ErrorResponse(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_group_wrapping() {
        let err = Error::data_group(FileId::Dg1, Error::ErrorResponse(StatusWord::FILE_NOT_FOUND));
        assert!(matches!(err, Error::DataGroup { file: FileId::Dg1, .. }));
        assert!(err.to_string().starts_with("reading EF.DG1 failed: card returned 6A82"));

        let err = Error::data_group(FileId::Dg11, Error::EmptyDataGroup(FileId::Dg11));
        assert!(matches!(err, Error::EmptyDataGroup(FileId::Dg11)));

        let err = Error::data_group(FileId::Dg2, Error::IntegrityCheckFailed);
        assert!(matches!(err, Error::IntegrityCheckFailed));
    }

    #[test]
    fn test_asn1_source() {
        let err = Error::from(der::Error::from(der::ErrorKind::Failed));
        assert!(matches!(err, Error::Asn1(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_session_fatal() {
        assert!(Error::from(TransportError::LinkLost).is_session_fatal());
        assert!(Error::SessionInvalidated.is_session_fatal());
        assert!(!Error::AuthenticationFailed("token".into()).is_session_fatal());
        assert!(!Error::FileNotFound(FileId::Com).is_session_fatal());
    }
}
