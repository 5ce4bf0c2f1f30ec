//! Document read orchestration.
//!
//! A read walks through [`ReadState`] one transition per [`DocumentReader::step`]:
//!
//! ```text
//! Connected -> SecurityInfoRead -> PaceAttempted -> AppletSelected
//!           -> Dg1Read -> Dg11Read -> [Dg2Read] -> Done
//! ```
//!
//! Any fatal error moves the reader to `Failed`. Failures that do not end the read are recorded
//! as [`Diagnostic`]s on the result.

use {
    super::{BacKey, DedicatedId, Emrtd, FileId},
    crate::{
        asn1::security_info::{PaceInfo, SecurityInfos},
        config::ReaderConfig,
        error::{Error, Result},
        lds::{AdditionalPersonalData, FacePhoto, MrzInfo},
        nfc::NfcReader,
    },
    rand::{CryptoRng, RngCore},
    serde::Serialize,
    tracing::{debug, info, info_span, warn},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ReadState {
    Connected,
    SecurityInfoRead,
    PaceAttempted,
    AppletSelected,
    Dg1Read,
    Dg11Read,
    Dg2Read,
    Done,
    Failed,
}

/// How the chip was unlocked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum AccessControl {
    /// PACE with the named protocol.
    Pace(String),
    Bac,
    /// The chip served its files without authentication.
    None,
}

/// A failure that did not abort the read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// State the reader was in when the failure happened.
    pub state: ReadState,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PassportReadResult {
    pub mrz: MrzInfo,
    pub personal_data: AdditionalPersonalData,
    pub face_photo: Option<FacePhoto>,
    pub access_control: AccessControl,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct DocumentReader {
    emrtd: Emrtd,
    config: ReaderConfig,
    state: ReadState,
    security_infos: SecurityInfos,
    access_control: AccessControl,
    mrz: Option<MrzInfo>,
    personal_data: Option<AdditionalPersonalData>,
    face_photo: Option<FacePhoto>,
    diagnostics: Vec<Diagnostic>,
}

/// Read a document with the default configuration.
pub fn read_document(
    transport: Box<dyn NfcReader>,
    key: &BacKey,
    include_images: bool,
) -> Result<PassportReadResult> {
    let config = ReaderConfig {
        include_images,
        ..ReaderConfig::default()
    };
    DocumentReader::new(transport, config)?.read(key, &mut rand::thread_rng())
}

impl DocumentReader {
    pub fn new(transport: Box<dyn NfcReader>, config: ReaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            emrtd: Emrtd::new(transport, config.max_read_len),
            config,
            state: ReadState::Connected,
            security_infos: SecurityInfos::default(),
            access_control: AccessControl::None,
            mrz: None,
            personal_data: None,
            face_photo: None,
            diagnostics: Vec::new(),
        })
    }

    pub fn state(&self) -> ReadState {
        self.state
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Connect, run all transitions and disconnect, whatever the outcome.
    pub fn read(
        mut self,
        key: &BacKey,
        rng: &mut (impl CryptoRng + RngCore),
    ) -> Result<PassportReadResult> {
        let span = info_span!("read_document", include_images = self.config.include_images);
        let _guard = span.enter();

        self.emrtd.nfc().set_timeout(self.config.timeout());
        let result = match self.emrtd.nfc().connect() {
            Ok(()) => self.run(key, rng),
            Err(err) => {
                self.state = ReadState::Failed;
                Err(err.into())
            }
        };
        if let Err(err) = self.emrtd.nfc().disconnect() {
            warn!(error = %err, "Disconnect failed");
        }
        result
    }

    fn run(
        &mut self,
        key: &BacKey,
        rng: &mut (impl CryptoRng + RngCore),
    ) -> Result<PassportReadResult> {
        while self.state != ReadState::Done {
            self.step(key, rng)?;
        }
        self.result()
    }

    /// Perform one transition. Stepping a finished reader does nothing.
    pub fn step(
        &mut self,
        key: &BacKey,
        rng: &mut (impl CryptoRng + RngCore),
    ) -> Result<ReadState> {
        match self.transition(key, rng) {
            Ok(next) => {
                if next != self.state {
                    info!(from = ?self.state, to = ?next, "Read state transition");
                }
                self.state = next;
                Ok(next)
            }
            Err(err) => {
                warn!(state = ?self.state, error = %err, "Read failed");
                self.state = ReadState::Failed;
                Err(err)
            }
        }
    }

    fn transition(
        &mut self,
        key: &BacKey,
        rng: &mut (impl CryptoRng + RngCore),
    ) -> Result<ReadState> {
        Ok(match self.state {
            ReadState::Connected => {
                self.read_security_infos()?;
                ReadState::SecurityInfoRead
            }
            ReadState::SecurityInfoRead => {
                self.attempt_pace(key, rng)?;
                ReadState::PaceAttempted
            }
            ReadState::PaceAttempted => {
                self.select_applet(key, rng)?;
                ReadState::AppletSelected
            }
            ReadState::AppletSelected => {
                self.mrz = Some(self.read_dg1()?);
                ReadState::Dg1Read
            }
            ReadState::Dg1Read => {
                self.personal_data = Some(self.read_dg11()?);
                ReadState::Dg11Read
            }
            ReadState::Dg11Read if self.config.include_images => {
                self.read_dg2()?;
                ReadState::Dg2Read
            }
            ReadState::Dg11Read | ReadState::Dg2Read | ReadState::Done => ReadState::Done,
            ReadState::Failed => return Err(Error::InvalidState(self.state)),
        })
    }

    fn diagnose(&mut self, err: &Error) {
        warn!(state = ?self.state, error = %err, "Continuing after failure");
        self.diagnostics.push(Diagnostic {
            state: self.state,
            message: err.to_string(),
        });
    }

    fn read_security_infos(&mut self) -> Result<()> {
        if !self.config.attempt_pace {
            debug!("PACE disabled, not reading security infos");
            return Ok(());
        }
        match self
            .emrtd
            .read_security_infos(self.config.security_info_source)
        {
            Ok(infos) => self.security_infos = infos,
            Err(err) if err.is_session_fatal() => return Err(err),
            Err(err) => self.diagnose(&err),
        }
        Ok(())
    }

    /// Try each PACE descriptor in file order until one succeeds.
    fn attempt_pace(&mut self, key: &BacKey, rng: &mut (impl CryptoRng + RngCore)) -> Result<()> {
        let descriptors: Vec<PaceInfo> = self.security_infos.pace_infos().cloned().collect();
        if descriptors.is_empty() {
            debug!("No PACE descriptors, skipping PACE");
        }
        for info in descriptors {
            match self.emrtd.pace(rng, key, &info) {
                Ok(()) => {
                    self.access_control = AccessControl::Pace(info.protocol.to_string());
                    break;
                }
                Err(err) if err.is_session_fatal() => return Err(err),
                Err(err) => self.diagnose(&err),
            }
        }
        Ok(())
    }

    /// Select the LDS1 application, then probe and fall back to BAC if PACE did not succeed.
    fn select_applet(&mut self, key: &BacKey, rng: &mut (impl CryptoRng + RngCore)) -> Result<()> {
        let pace_succeeded = matches!(self.access_control, AccessControl::Pace(_));
        info!(pace_succeeded, "Selecting eMRTD application");
        // After PACE the SELECT goes out under the session installed by `Emrtd::pace`, which is
        // all the PACE-success flag changes about the command.
        self.emrtd.select_dedicated_file(DedicatedId::EmrtdLds1)?;
        if pace_succeeded {
            return Ok(());
        }

        // Some chips serve the LDS without access control.
        match self.emrtd.read_file(FileId::Com) {
            Ok(_) => {
                info!("Chip allows unauthenticated reads, skipping BAC");
                self.access_control = AccessControl::None;
            }
            Err(err) if err.is_session_fatal() => return Err(err),
            Err(err) => {
                debug!(error = %err, "Probe read failed, falling back to BAC");
                self.emrtd.basic_access_control(rng, key)?;
                self.access_control = AccessControl::Bac;
            }
        }
        Ok(())
    }

    fn read_dg1(&mut self) -> Result<MrzInfo> {
        let mrz = self
            .emrtd
            .read_file(FileId::Dg1)
            .and_then(|bytes| MrzInfo::from_dg1(&bytes))
            .map_err(|err| Error::data_group(FileId::Dg1, err))?;
        if !mrz.check_digits_valid {
            self.diagnostics.push(Diagnostic {
                state: self.state,
                message: "MRZ check digit mismatch".into(),
            });
        }
        Ok(mrz)
    }

    fn read_dg11(&mut self) -> Result<AdditionalPersonalData> {
        self.emrtd
            .read_file(FileId::Dg11)
            .and_then(|bytes| AdditionalPersonalData::from_dg11(&bytes))
            .map_err(|err| Error::data_group(FileId::Dg11, err))
    }

    /// The photo is optional. Any failure, including loss of the session, leaves it absent since
    /// no later command needs the chip.
    fn read_dg2(&mut self) -> Result<()> {
        match self
            .emrtd
            .read_file(FileId::Dg2)
            .and_then(|bytes| FacePhoto::from_dg2(&bytes))
        {
            Ok(photo) => {
                if photo.is_none() {
                    debug!("DG2 holds no face image");
                }
                self.face_photo = photo;
            }
            Err(err) => self.diagnose(&Error::DataGroup {
                file: FileId::Dg2,
                source: Box::new(err),
            }),
        }
        Ok(())
    }

    fn result(&mut self) -> Result<PassportReadResult> {
        let (Some(mrz), Some(personal_data)) = (self.mrz.take(), self.personal_data.take()) else {
            return Err(Error::InvalidState(self.state));
        };
        info!(access_control = ?self.access_control, "Document read");
        Ok(PassportReadResult {
            mrz,
            personal_data,
            face_photo: self.face_photo.take(),
            access_control: self.access_control.clone(),
            diagnostics: std::mem::take(&mut self.diagnostics),
        })
    }
}
