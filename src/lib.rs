//! Utility layer on top of the `sg-pt` command set
//!
//! Retry orchestration with program wide budgets, the block copy engine and
//! the mapping of command outcomes to process exit status codes.

pub mod copy;
pub mod exit;
pub mod retry;
pub mod signals;

pub use copy::{CopyConfig, CopyOutcome, CopySession, CopyStats};
pub use exit::{exit_status, exit_status_text, report_failure};
pub use retry::{retry_command, RetryBudget, RetryKind, RetryLimits};
