//! Process exit status of the utilities
//!
//! The numeric values are what scripts check for, so they never change.

use sg_pt::{ScsiCategory, ScsiError};

pub const EXIT_CLEAN: i32 = 0;
pub const EXIT_SYNTAX_ERROR: i32 = 1;
pub const EXIT_NOT_READY: i32 = 2;
pub const EXIT_MEDIUM_HARD: i32 = 3;
pub const EXIT_ILLEGAL_REQUEST: i32 = 5;
pub const EXIT_UNIT_ATTENTION: i32 = 6;
pub const EXIT_DATA_PROTECT: i32 = 7;
pub const EXIT_INVALID_OPCODE: i32 = 9;
pub const EXIT_COPY_ABORTED: i32 = 10;
pub const EXIT_ABORTED_COMMAND: i32 = 11;
pub const EXIT_MISCOMPARE: i32 = 14;
pub const EXIT_FILE_ERROR: i32 = 15;
pub const EXIT_ILLEGAL_REQUEST_WITH_INFO: i32 = 17;
pub const EXIT_MEDIUM_HARD_WITH_INFO: i32 = 18;
pub const EXIT_NO_SENSE: i32 = 20;
pub const EXIT_RECOVERED: i32 = 21;
pub const EXIT_RESERVATION_CONFLICT: i32 = 24;
pub const EXIT_CONDITION_MET: i32 = 25;
pub const EXIT_TRANSPORT: i32 = 35;
pub const EXIT_PROTECTION: i32 = 40;
pub const EXIT_PROTECTION_WITH_INFO: i32 = 41;
pub const EXIT_MALFORMED: i32 = 97;
pub const EXIT_SENSE: i32 = 98;
pub const EXIT_OTHER: i32 = 99;

/// Exit status for the outcome of a command
pub fn exit_status(category: &ScsiCategory) -> i32 {
    match category {
        ScsiCategory::Clean => EXIT_CLEAN,
        ScsiCategory::NoSense => EXIT_NO_SENSE,
        ScsiCategory::Recovered => EXIT_RECOVERED,
        ScsiCategory::ConditionMet => EXIT_CONDITION_MET,
        ScsiCategory::NotReady => EXIT_NOT_READY,
        ScsiCategory::MediumHard { info: None } => EXIT_MEDIUM_HARD,
        ScsiCategory::MediumHard { info: Some(_) } => EXIT_MEDIUM_HARD_WITH_INFO,
        ScsiCategory::IllegalRequest { info: None } => EXIT_ILLEGAL_REQUEST,
        ScsiCategory::IllegalRequest { info: Some(_) } => EXIT_ILLEGAL_REQUEST_WITH_INFO,
        ScsiCategory::InvalidOpcode => EXIT_INVALID_OPCODE,
        ScsiCategory::UnitAttention => EXIT_UNIT_ATTENTION,
        ScsiCategory::DataProtect => EXIT_DATA_PROTECT,
        ScsiCategory::CopyAborted => EXIT_COPY_ABORTED,
        ScsiCategory::AbortedCommand => EXIT_ABORTED_COMMAND,
        ScsiCategory::Protection { info: None } => EXIT_PROTECTION,
        ScsiCategory::Protection { info: Some(_) } => EXIT_PROTECTION_WITH_INFO,
        ScsiCategory::Miscompare => EXIT_MISCOMPARE,
        ScsiCategory::ReservationConflict => EXIT_RESERVATION_CONFLICT,
        ScsiCategory::OtherSense { .. } => EXIT_SENSE,
        ScsiCategory::SenseDecodeError => EXIT_MALFORMED,
        ScsiCategory::TransportError { .. } => EXIT_TRANSPORT,
        ScsiCategory::Other { .. } => EXIT_OTHER,
    }
}

pub fn error_exit_status(err: &ScsiError) -> i32 {
    exit_status(&err.category())
}

/// Human readable meaning of an exit status
pub fn exit_status_text(status: i32) -> &'static str {
    match status {
        EXIT_CLEAN => "No errors",
        EXIT_SYNTAX_ERROR => "Syntax error",
        EXIT_NOT_READY => "Not ready",
        EXIT_MEDIUM_HARD => "Medium or hardware error",
        EXIT_ILLEGAL_REQUEST => "Illegal request",
        EXIT_UNIT_ATTENTION => "Unit attention",
        EXIT_DATA_PROTECT => "Data protect",
        EXIT_INVALID_OPCODE => "Illegal request, invalid opcode",
        EXIT_COPY_ABORTED => "Copy aborted",
        EXIT_ABORTED_COMMAND => "Aborted command",
        EXIT_MISCOMPARE => "Miscompare",
        EXIT_FILE_ERROR => "File error",
        EXIT_ILLEGAL_REQUEST_WITH_INFO => "Illegal request, with info",
        EXIT_MEDIUM_HARD_WITH_INFO => "Medium or hardware error, with info",
        EXIT_NO_SENSE => "No sense key",
        EXIT_RECOVERED => "Recovered error",
        EXIT_RESERVATION_CONFLICT => "Reservation conflict",
        EXIT_CONDITION_MET => "Condition met",
        EXIT_TRANSPORT => "Transport error",
        EXIT_PROTECTION => "Protection error",
        EXIT_PROTECTION_WITH_INFO => "Protection error, with info",
        EXIT_MALFORMED => "Malformed SCSI command response",
        EXIT_SENSE => "Some other sense data problem",
        EXIT_OTHER => "Some other error/warning",
        _ => "Unknown exit status",
    }
}

/// Log a one line diagnostic for a failed command and return the exit status
///
/// Unless `verbose` is set a hint to re-run with `-v` follows.
pub fn report_failure(command: &str, err: &ScsiError, verbose: bool) -> i32 {
    let status = error_exit_status(err);
    log::error!("{command} failed: {err}");
    if !verbose {
        log::error!("    try again with '-v' for more information");
    }
    status
}
