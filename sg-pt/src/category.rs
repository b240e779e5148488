//! Result classification of a single command attempt
//!
//! [`classify`] is a pure function over status byte, sense buffer and
//! transport outcome. It never retries, that is left to the caller.

use crate::sense::{decode_sense, SenseData};
use crate::sg_pt::{SenseInfo, TransportStatus};
use crate::text::*;

/// Closed set of command outcomes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScsiCategory {
    /// GOOD status
    Clean,
    /// CHECK CONDITION with sense key NO SENSE
    NoSense,
    /// RECOVERED ERROR, the command succeeded
    Recovered,
    ConditionMet,
    NotReady,
    /// MEDIUM ERROR, HARDWARE ERROR or BLANK CHECK
    MediumHard { info: Option<u64> },
    IllegalRequest { info: Option<u64> },
    /// ILLEGAL REQUEST with ASC/ASCQ 0x20/0x00
    InvalidOpcode,
    UnitAttention,
    DataProtect,
    CopyAborted,
    AbortedCommand,
    /// ABORTED COMMAND caused by a protection information check
    Protection { info: Option<u64> },
    Miscompare,
    ReservationConflict,
    /// Sense keys without category of their own
    OtherSense { sense_key: u8 },
    /// CHECK CONDITION without usable sense data
    SenseDecodeError,
    TransportError { host: u16, driver: u16 },
    Other { status: Option<u8>, errno: Option<i32> },
}

impl ScsiCategory {
    /// The command completed and its data can be used
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ScsiCategory::Clean
                | ScsiCategory::NoSense
                | ScsiCategory::Recovered
                | ScsiCategory::ConditionMet
        )
    }

    /// Information field, when the device supplied one
    pub fn info(&self) -> Option<u64> {
        match self {
            ScsiCategory::MediumHard { info }
            | ScsiCategory::IllegalRequest { info }
            | ScsiCategory::Protection { info } => *info,
            _ => None,
        }
    }
}

impl std::fmt::Display for ScsiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScsiCategory::Clean => write!(f, "No errors"),
            ScsiCategory::NoSense => write!(f, "No sense"),
            ScsiCategory::Recovered => write!(f, "Recovered error"),
            ScsiCategory::ConditionMet => write!(f, "Condition met"),
            ScsiCategory::NotReady => write!(f, "Not ready"),
            ScsiCategory::MediumHard { info } => match info {
                Some(info) => write!(f, "Medium or hardware error, lba=0x{info:x}"),
                None => write!(f, "Medium or hardware error"),
            },
            ScsiCategory::IllegalRequest { info } => match info {
                Some(info) => write!(f, "Illegal request, info=0x{info:x}"),
                None => write!(f, "Illegal request"),
            },
            ScsiCategory::InvalidOpcode => write!(f, "Invalid opcode"),
            ScsiCategory::UnitAttention => write!(f, "Unit attention"),
            ScsiCategory::DataProtect => write!(f, "Data protect"),
            ScsiCategory::CopyAborted => write!(f, "Copy aborted"),
            ScsiCategory::AbortedCommand => write!(f, "Aborted command"),
            ScsiCategory::Protection { info } => match info {
                Some(info) => write!(f, "Protection error, lba=0x{info:x}"),
                None => write!(f, "Protection error"),
            },
            ScsiCategory::Miscompare => write!(f, "Miscompare"),
            ScsiCategory::ReservationConflict => write!(f, "Reservation conflict"),
            ScsiCategory::OtherSense { sense_key } => {
                write!(f, "Sense category, sense key: {}", sense_key_text(*sense_key))
            }
            ScsiCategory::SenseDecodeError => write!(f, "Malformed sense data"),
            ScsiCategory::TransportError { host, driver } => write!(
                f,
                "Transport error, host_status=0x{host:x}, driver_status=0x{driver:x}"
            ),
            ScsiCategory::Other { status, errno } => {
                write!(f, "Some other error")?;
                if let Some(status) = status {
                    write!(f, ", status: {}", scsi_status_text(*status))?;
                }
                if let Some(errno) = errno {
                    write!(f, ", {}", nix::errno::Errno::from_i32(*errno).desc())?;
                }
                Ok(())
            }
        }
    }
}

/// Classified failure of a command, with the short sense summary
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    pub category: ScsiCategory,
    pub sense: Option<SenseInfo>,
}

impl std::fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.sense {
            Some(sense) => write!(f, "{} - {}", self.category, sense),
            None => write!(f, "{}", self.category),
        }
    }
}

fn category_from_sense(sense: &SenseData) -> ScsiCategory {
    let info = sense.information;
    match sense.sense_key {
        SENSE_KEY_NO_SENSE => ScsiCategory::NoSense,
        SENSE_KEY_RECOVERED_ERROR => {
            log::warn!(
                "recovered error: {}",
                SenseInfo {
                    sense_key: sense.sense_key,
                    asc: sense.asc,
                    ascq: sense.ascq
                }
            );
            ScsiCategory::Recovered
        }
        SENSE_KEY_NOT_READY => ScsiCategory::NotReady,
        SENSE_KEY_MEDIUM_ERROR | SENSE_KEY_HARDWARE_ERROR | SENSE_KEY_BLANK_CHECK => {
            ScsiCategory::MediumHard { info }
        }
        SENSE_KEY_ILLEGAL_REQUEST => {
            if sense.asc == 0x20 && sense.ascq == 0x00 {
                ScsiCategory::InvalidOpcode
            } else {
                ScsiCategory::IllegalRequest { info }
            }
        }
        SENSE_KEY_UNIT_ATTENTION => ScsiCategory::UnitAttention,
        SENSE_KEY_DATA_PROTECT => ScsiCategory::DataProtect,
        SENSE_KEY_COPY_ABORTED => ScsiCategory::CopyAborted,
        SENSE_KEY_ABORTED_COMMAND => {
            if sense.asc == 0x10 {
                ScsiCategory::Protection { info }
            } else {
                ScsiCategory::AbortedCommand
            }
        }
        SENSE_KEY_MISCOMPARE => ScsiCategory::Miscompare,
        sense_key => ScsiCategory::OtherSense { sense_key },
    }
}

fn classify_sense(sense: &[u8]) -> ScsiCategory {
    match decode_sense(sense) {
        Ok(data) if !data.malformed => category_from_sense(&data),
        Ok(_) => ScsiCategory::SenseDecodeError,
        Err(err) => {
            log::debug!("unable to decode sense data - {err}");
            ScsiCategory::SenseDecodeError
        }
    }
}

/// Classify one command attempt
pub fn classify(status: u8, sense: &[u8], transport: TransportStatus) -> ScsiCategory {
    let status = status & 0x7e;

    match transport {
        TransportStatus::Ok => {}
        TransportStatus::Os(errno) => {
            return ScsiCategory::Other {
                status: None,
                errno: Some(errno),
            }
        }
        TransportStatus::Timeout => {
            return ScsiCategory::Other {
                status: None,
                errno: Some(libc::ETIMEDOUT),
            }
        }
        TransportStatus::Host { host, driver } => {
            // some HBAs report a transport error together with valid sense
            if status == SAM_STAT_CHECK_CONDITION && !sense.is_empty() {
                return classify_sense(sense);
            }
            return ScsiCategory::TransportError { host, driver };
        }
    }

    match status {
        SAM_STAT_GOOD => ScsiCategory::Clean,
        SAM_STAT_CHECK_CONDITION | SAM_STAT_COMMAND_TERMINATED => classify_sense(sense),
        SAM_STAT_CONDITION_MET => ScsiCategory::ConditionMet,
        SAM_STAT_RESERVATION_CONFLICT => ScsiCategory::ReservationConflict,
        status => ScsiCategory::Other {
            status: Some(status),
            errno: None,
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fixed_sense(response_code: u8, sense_key: u8, asc: u8, ascq: u8) -> Vec<u8> {
        let mut sense = vec![0u8; 18];
        sense[0] = response_code;
        sense[2] = sense_key;
        sense[7] = 10;
        sense[12] = asc;
        sense[13] = ascq;
        sense
    }

    fn descriptor_sense(response_code: u8, sense_key: u8, asc: u8, ascq: u8) -> Vec<u8> {
        vec![response_code, sense_key, asc, ascq, 0, 0, 0, 0]
    }

    fn check(sense: &[u8]) -> ScsiCategory {
        classify(SAM_STAT_CHECK_CONDITION, sense, TransportStatus::Ok)
    }

    #[test]
    fn every_sense_key_and_format_is_classified() {
        for response_code in [0x70, 0x71, 0x72, 0x73] {
            for sense_key in 0u8..=0xf {
                let sense = if response_code < 0x72 {
                    fixed_sense(response_code, sense_key, 0x04, 0x01)
                } else {
                    descriptor_sense(response_code, sense_key, 0x04, 0x01)
                };
                let expected = match sense_key {
                    0x0 => ScsiCategory::NoSense,
                    0x1 => ScsiCategory::Recovered,
                    0x2 => ScsiCategory::NotReady,
                    0x3 | 0x4 | 0x8 => ScsiCategory::MediumHard { info: None },
                    0x5 => ScsiCategory::IllegalRequest { info: None },
                    0x6 => ScsiCategory::UnitAttention,
                    0x7 => ScsiCategory::DataProtect,
                    0xa => ScsiCategory::CopyAborted,
                    0xb => ScsiCategory::AbortedCommand,
                    0xe => ScsiCategory::Miscompare,
                    sense_key => ScsiCategory::OtherSense { sense_key },
                };
                assert_eq!(check(&sense), expected, "code {response_code:x} key {sense_key:x}");
            }
        }
    }

    #[test]
    fn asc_dependent_categories() {
        assert_eq!(check(&fixed_sense(0x70, 5, 0x20, 0)), ScsiCategory::InvalidOpcode);
        assert_eq!(
            check(&fixed_sense(0x70, 0xb, 0x10, 0x01)),
            ScsiCategory::Protection { info: None }
        );

        let mut sense = fixed_sense(0xf0, 3, 0x11, 0);
        sense[3..7].copy_from_slice(&0x1234u32.to_be_bytes());
        assert_eq!(check(&sense), ScsiCategory::MediumHard { info: Some(0x1234) });
        assert_eq!(check(&sense).info(), Some(0x1234));
    }

    #[test]
    fn status_without_sense() {
        assert_eq!(classify(0, &[], TransportStatus::Ok), ScsiCategory::Clean);
        assert_eq!(classify(4, &[], TransportStatus::Ok), ScsiCategory::ConditionMet);
        assert_eq!(classify(0x18, &[], TransportStatus::Ok), ScsiCategory::ReservationConflict);
        assert_eq!(
            classify(8, &[], TransportStatus::Ok),
            ScsiCategory::Other {
                status: Some(8),
                errno: None
            }
        );
        assert_eq!(classify(2, &[], TransportStatus::Ok), ScsiCategory::SenseDecodeError);
        assert_eq!(classify(2, &[0x12, 0, 5], TransportStatus::Ok), ScsiCategory::SenseDecodeError);
        assert_eq!(
            classify(0x22, &fixed_sense(0x70, 6, 0x29, 0), TransportStatus::Ok),
            ScsiCategory::UnitAttention
        );
    }

    #[test]
    fn transport_outcomes() {
        assert_eq!(
            classify(0, &[], TransportStatus::Os(libc::EIO)),
            ScsiCategory::Other {
                status: None,
                errno: Some(libc::EIO)
            }
        );
        assert_eq!(
            classify(0, &[], TransportStatus::Timeout),
            ScsiCategory::Other {
                status: None,
                errno: Some(libc::ETIMEDOUT)
            }
        );
        assert_eq!(
            classify(0, &[], TransportStatus::Host { host: 1, driver: 0 }),
            ScsiCategory::TransportError { host: 1, driver: 0 }
        );
        assert_eq!(
            classify(
                2,
                &fixed_sense(0x70, 2, 0x04, 0x01),
                TransportStatus::Host { host: 7, driver: 8 }
            ),
            ScsiCategory::NotReady
        );
    }

    #[test]
    fn display() {
        assert_eq!(ScsiCategory::UnitAttention.to_string(), "Unit attention");
        assert_eq!(
            ScsiCategory::MediumHard { info: Some(0x20) }.to_string(),
            "Medium or hardware error, lba=0x20"
        );
        let failure = CommandFailure {
            category: ScsiCategory::IllegalRequest { info: None },
            sense: Some(SenseInfo {
                sense_key: 5,
                asc: 0x24,
                ascq: 0,
            }),
        };
        assert_eq!(
            failure.to_string(),
            "Illegal request - Illegal Request, Invalid field in cdb"
        );
    }
}
