//! Contactless transport seam. Hosts implement [`NfcReader`] on top of their platform's
//! ISO 14443-4 channel (IsoDep, PC/SC, a Proxmark, ...).

use {std::time::Duration, thiserror::Error};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("link to the card was lost")]
    LinkLost,

    #[error("{0}")]
    Other(String),
}

/// A half-duplex APDU channel to a single card.
pub trait NfcReader {
    fn connect(&mut self) -> Result<(), TransportError>;

    fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Bound on how long a single exchange may block.
    fn set_timeout(&mut self, timeout: Duration);

    /// Transmit a command APDU and return the status word and response data.
    fn send_apdu(&mut self, apdu: &[u8]) -> Result<(u16, Vec<u8>), TransportError>;
}
