//! Pass-through dispatch
//!
//! [`ScsiPassThrough`] is the single primitive a device handle has to
//! offer. [`SgRaw`] builds on it: it owns the transfer and sense buffers,
//! validates CDBs and residual counts, and turns every completion into
//! either data or a classified [`ScsiError`].

use std::time::Duration;

use anyhow::{format_err, Error};

use crate::asc_table::get_asc_ascq_string;
use crate::category::{classify, CommandFailure, ScsiCategory};
use crate::cdb::{is_scsi_cdb, CdbError};
use crate::sense::normalize_sense;
use crate::text::{sense_key_text, SENSE_KEY_ILLEGAL_REQUEST};

/// Used when the timeout is set to zero
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Sense buffer size handed to the device
pub const SENSE_BUFFER_LEN: usize = 64;

/// Data phase of a command
pub enum DataTransfer<'a> {
    None,
    /// Device to host
    In(&'a mut [u8]),
    /// Host to device
    Out(&'a [u8]),
}

impl DataTransfer<'_> {
    pub fn len(&self) -> usize {
        match self {
            DataTransfer::None => 0,
            DataTransfer::In(data) => data.len(),
            DataTransfer::Out(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What happened below the SCSI layer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportStatus {
    Ok,
    /// Host adapter or driver reported a problem
    Host { host: u16, driver: u16 },
    /// The OS refused or failed the request (errno)
    Os(i32),
    Timeout,
}

/// Raw completion of one command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Completion {
    /// SCSI status byte
    pub status: u8,
    /// Number of valid bytes written into the sense buffer
    pub sense_len: usize,
    /// Requested minus actually transferred bytes
    pub resid: usize,
    pub transport: TransportStatus,
}

impl Completion {
    pub fn good() -> Self {
        Self {
            status: 0,
            sense_len: 0,
            resid: 0,
            transport: TransportStatus::Ok,
        }
    }
}

/// A device which can execute SCSI commands
///
/// Implementations issue exactly one command per call and must not retry.
pub trait ScsiPassThrough {
    fn execute(
        &mut self,
        cdb: &[u8],
        data: DataTransfer<'_>,
        sense: &mut [u8],
        timeout: Duration,
    ) -> Result<Completion, Error>;
}

impl<T: ScsiPassThrough + ?Sized> ScsiPassThrough for &mut T {
    fn execute(
        &mut self,
        cdb: &[u8],
        data: DataTransfer<'_>,
        sense: &mut [u8],
        timeout: Duration,
    ) -> Result<Completion, Error> {
        (**self).execute(cdb, data, sense, timeout)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub struct SenseInfo {
    pub sense_key: u8,
    pub asc: u8,
    pub ascq: u8,
}

impl std::fmt::Display for SenseInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sense_text = sense_key_text(self.sense_key);

        if self.asc == 0 && self.ascq == 0 {
            write!(f, "{}", sense_text)
        } else {
            let additional_sense_text = get_asc_ascq_string(self.asc, self.ascq);
            write!(f, "{}, {}", sense_text, additional_sense_text)
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ScsiError {
    #[error("{0}")]
    Error(#[from] Error),
    #[error("{0}")]
    Failed(#[from] CommandFailure),
}

impl From<std::io::Error> for ScsiError {
    fn from(error: std::io::Error) -> Self {
        Self::Error(error.into())
    }
}

impl From<CdbError> for ScsiError {
    fn from(error: CdbError) -> Self {
        Self::Error(error.into())
    }
}

impl ScsiError {
    /// Classification of the failure, `Other` for unclassified errors
    pub fn category(&self) -> ScsiCategory {
        match self {
            ScsiError::Error(_) => ScsiCategory::Other {
                status: None,
                errno: None,
            },
            ScsiError::Failed(failure) => failure.category.clone(),
        }
    }

    pub fn sense(&self) -> Option<&SenseInfo> {
        match self {
            ScsiError::Error(_) => None,
            ScsiError::Failed(failure) => failure.sense.as_ref(),
        }
    }
}

/// True if the given sense info is INVALID COMMAND OPERATION CODE
/// means that the device does not know/support the command
/// <https://www.t10.org/lists/asc-num.htm#ASC_20>
pub fn sense_err_is_invalid_command(err: &SenseInfo) -> bool {
    err.sense_key == SENSE_KEY_ILLEGAL_REQUEST && err.asc == 0x20 && err.ascq == 0x00
}

/// Safe interface to run RAW SCSI commands
pub struct SgRaw<'a, D: ?Sized> {
    device: &'a mut D,
    buffer: Box<[u8]>,
    sense_buffer: [u8; SENSE_BUFFER_LEN],
    sense_len: usize,
    timeout: Duration,
    last_category: ScsiCategory,
}

fn check_cdb(cmd: &[u8]) -> Result<(), ScsiError> {
    if !is_scsi_cdb(cmd) {
        return Err(format_err!("no valid SCSI command").into());
    }
    Ok(())
}

fn check_resid(resid: usize, len: usize) -> Result<usize, ScsiError> {
    if resid > len {
        return Err(format_err!("do_scsi_pt failed - got strange resid (value too big)").into());
    }
    Ok(len - resid)
}

impl<'a, D: ScsiPassThrough + ?Sized> SgRaw<'a, D> {
    /// Create a new instance to run commands
    ///
    /// `buffer_size` is the size of the internal data-in buffer used by
    /// [`do_command`](Self::do_command).
    pub fn new(device: &'a mut D, buffer_size: usize) -> Self {
        Self {
            device,
            buffer: vec![0u8; buffer_size].into_boxed_slice(),
            sense_buffer: [0u8; SENSE_BUFFER_LEN],
            sense_len: 0,
            timeout: DEFAULT_TIMEOUT,
            last_category: ScsiCategory::Clean,
        }
    }

    /// Set the command timeout in seconds (0 means default (60 seconds))
    pub fn set_timeout(&mut self, seconds: usize) {
        self.timeout = if seconds == 0 {
            DEFAULT_TIMEOUT
        } else {
            Duration::from_secs(seconds as u64)
        };
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sense data returned by the last command
    pub fn sense(&self) -> &[u8] {
        &self.sense_buffer[..self.sense_len]
    }

    /// Category of the last command, also set for successful ones
    pub fn last_category(&self) -> &ScsiCategory {
        &self.last_category
    }

    fn check_completion(&mut self, cmd: &[u8], completion: &Completion) -> Result<(), ScsiError> {
        self.sense_len = completion.sense_len.min(self.sense_buffer.len());
        let sense = &self.sense_buffer[..self.sense_len];

        if !sense.is_empty() {
            log::debug!(
                "cdb [{}] status 0x{:02x} sense [{}]",
                crate::hex_string(cmd),
                completion.status,
                crate::hex_string(sense)
            );
        }

        let category = classify(completion.status, sense, completion.transport);
        self.last_category = category.clone();

        if category.is_success() {
            return Ok(());
        }

        Err(ScsiError::Failed(CommandFailure {
            category,
            sense: normalize_sense(sense),
        }))
    }

    fn execute(&mut self, cmd: &[u8], data: DataTransfer<'_>) -> Result<Completion, ScsiError> {
        self.sense_buffer.fill(0);
        self.sense_len = 0;
        let completion = self
            .device
            .execute(cmd, data, &mut self.sense_buffer, self.timeout)
            .map_err(|err| format_err!("do_scsi_pt failed - {}", err))?;
        Ok(completion)
    }

    /// Run the specified RAW SCSI command
    pub fn do_command(&mut self, cmd: &[u8]) -> Result<&[u8], ScsiError> {
        check_cdb(cmd)?;

        if self.buffer.len() < 16 {
            return Err(format_err!("input buffer too small").into());
        }

        let mut buffer = std::mem::take(&mut self.buffer);
        let result = self.execute(cmd, DataTransfer::In(&mut buffer));
        self.buffer = buffer;
        let completion = result?;

        self.check_completion(cmd, &completion)?;

        let data_len = check_resid(completion.resid, self.buffer.len())?;

        Ok(&self.buffer[..data_len])
    }

    /// Run the specified RAW SCSI command, use data as input buffer
    pub fn do_in_command<'b>(&mut self, cmd: &[u8], data: &'b mut [u8]) -> Result<&'b [u8], ScsiError> {
        check_cdb(cmd)?;

        if data.is_empty() {
            return Err(format_err!("got zero-sized input buffer").into());
        }

        let completion = self.execute(cmd, DataTransfer::In(data))?;
        self.check_completion(cmd, &completion)?;

        let data_len = check_resid(completion.resid, data.len())?;

        Ok(&data[..data_len])
    }

    /// Run dataout command
    pub fn do_out_command(&mut self, cmd: &[u8], data: &[u8]) -> Result<(), ScsiError> {
        check_cdb(cmd)?;

        let completion = self.execute(cmd, DataTransfer::Out(data))?;
        self.check_completion(cmd, &completion)?;

        check_resid(completion.resid, data.len())?;

        Ok(())
    }

    /// Run a command without data phase (TEST UNIT READY, SYNCHRONIZE CACHE, ...)
    pub fn do_no_data_command(&mut self, cmd: &[u8]) -> Result<(), ScsiError> {
        check_cdb(cmd)?;

        let completion = self.execute(cmd, DataTransfer::None)?;
        self.check_completion(cmd, &completion)
    }
}
