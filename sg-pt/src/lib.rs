//! SCSI command building, dispatch and response decoding
//!
//! CDBs are built by the functions in [`cdb`], executed through a
//! [`ScsiPassThrough`] device with [`SgRaw`], and the outcome of every
//! command is classified into a [`ScsiCategory`]. Response decoders are pure
//! functions over byte slices; each decoded record can render itself as
//! human readable text or JSON through an [`sg_json::SgjState`].

pub mod asc_table;
pub mod ata;
pub mod capacity;
pub mod category;
pub mod cdb;
pub mod codec;
pub mod commands;
pub mod designator;
pub mod element_status;
pub mod inquiry;
pub mod lba_status;
pub mod log_page;
pub mod luns;
pub mod mode_sense;
pub mod persistent_reserve;
pub mod sense;
pub mod sg_pt;
pub mod text;
pub mod tpg;

pub use category::{classify, CommandFailure, ScsiCategory};
pub use cdb::CdbError;
pub use codec::CodecError;
pub use sg_pt::{Completion, DataTransfer, ScsiError, ScsiPassThrough, SenseInfo, SgRaw, TransportStatus};

/// Malformed or short response data
///
/// Always local to one decode step: callers report it and go on with
/// what was decoded so far (or fall back to a hex dump).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{what} truncated: need {need} bytes, have {have}")]
    Truncated {
        what: &'static str,
        need: usize,
        have: usize,
    },
    #[error("{0}")]
    Invalid(String),
}

impl From<CodecError> for DecodeError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::OutOfBounds { offset, width, len } => DecodeError::Truncated {
                what: "response",
                need: offset.saturating_add(width),
                have: len,
            },
            other => DecodeError::Invalid(other.to_string()),
        }
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        DecodeError::Invalid(format!("read failed - {err}"))
    }
}

/// Fail with [`DecodeError::Truncated`] if `data` is shorter than `need`
pub(crate) fn need_len(what: &'static str, data: &[u8], need: usize) -> Result<(), DecodeError> {
    if data.len() < need {
        return Err(DecodeError::Truncated {
            what,
            need,
            have: data.len(),
        });
    }
    Ok(())
}

/// Converts SCSI ASCII text into String, trim zero and spaces
pub fn scsi_ascii_to_string(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .trim_matches(char::from(0))
        .trim()
        .to_string()
}

/// Space separated hex bytes, as used in human readable output
pub fn hex_string(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Classic 16 bytes per line hex dump with offsets
pub fn hex_dump(data: &[u8], indent: usize) -> String {
    let mut out = String::new();
    for (i, chunk) in data.chunks(16).enumerate() {
        out.push_str(&format!(
            "{:indent$}{:02x}     {}\n",
            "",
            i * 16,
            hex_string(chunk)
        ));
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn helpers() {
        assert_eq!(scsi_ascii_to_string(b"ACME    \0\0"), "ACME");
        assert_eq!(hex_string(&[0x70, 0, 0x5]), "70 00 05");
        assert_eq!(hex_dump(&[1, 2], 2), "  00     01 02\n");
        assert_eq!(
            DecodeError::from(CodecError::OutOfBounds {
                offset: 4,
                width: 4,
                len: 6
            }),
            DecodeError::Truncated {
                what: "response",
                need: 8,
                have: 6
            }
        );
    }
}
