//! Bounded retries on top of the classifier
//!
//! Classification never retries. Callers wrap a single command attempt with
//! [`retry_command`], which re-issues it after UNIT ATTENTION or ABORTED
//! COMMAND while the program wide [`RetryBudget`] allows.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use sg_pt::{ScsiCategory, ScsiError};

pub const DEFAULT_UNIT_ATTENTION_RETRIES: u32 = 5;
pub const DEFAULT_ABORTED_COMMAND_RETRIES: u32 = 5;
pub const DEFAULT_MEDIUM_REREADS: u32 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryKind {
    UnitAttention,
    AbortedCommand,
    /// Medium error reported with the failing LBA
    MediumReread,
}

impl RetryKind {
    /// Retry kind handled by [`retry_command`], medium errors are left to the
    /// caller
    pub fn for_category(category: &ScsiCategory) -> Option<Self> {
        match category {
            ScsiCategory::UnitAttention => Some(RetryKind::UnitAttention),
            ScsiCategory::AbortedCommand => Some(RetryKind::AbortedCommand),
            _ => None,
        }
    }
}

/// Retry limits as configured
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct RetryLimits {
    pub unit_attention: u32,
    pub aborted_command: u32,
    pub medium_reread: u32,
}

impl Default for RetryLimits {
    fn default() -> Self {
        Self {
            unit_attention: DEFAULT_UNIT_ATTENTION_RETRIES,
            aborted_command: DEFAULT_ABORTED_COMMAND_RETRIES,
            medium_reread: DEFAULT_MEDIUM_REREADS,
        }
    }
}

/// Remaining retries for the whole program run
///
/// Counters only go down, a used retry is never given back.
#[derive(Debug)]
pub struct RetryBudget {
    unit_attention: AtomicU32,
    aborted_command: AtomicU32,
    medium_reread: AtomicU32,
}

impl RetryBudget {
    pub fn new(limits: &RetryLimits) -> Self {
        Self {
            unit_attention: AtomicU32::new(limits.unit_attention),
            aborted_command: AtomicU32::new(limits.aborted_command),
            medium_reread: AtomicU32::new(limits.medium_reread),
        }
    }

    fn counter(&self, kind: RetryKind) -> &AtomicU32 {
        match kind {
            RetryKind::UnitAttention => &self.unit_attention,
            RetryKind::AbortedCommand => &self.aborted_command,
            RetryKind::MediumReread => &self.medium_reread,
        }
    }

    /// Use one retry of `kind`, false if none is left
    pub fn take(&self, kind: RetryKind) -> bool {
        self.counter(kind)
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |left| left.checked_sub(1))
            .is_ok()
    }

    pub fn remaining(&self, kind: RetryKind) -> u32 {
        self.counter(kind).load(Ordering::Relaxed)
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(&RetryLimits::default())
    }
}

/// Run `command` until it succeeds, fails without retry, or the budget is
/// used up
///
/// `on_retry` is called before each new attempt.
pub fn retry_command<T, F, R>(
    budget: &RetryBudget,
    what: &str,
    mut on_retry: R,
    mut command: F,
) -> Result<T, ScsiError>
where
    F: FnMut() -> Result<T, ScsiError>,
    R: FnMut(RetryKind),
{
    loop {
        let err = match command() {
            Ok(res) => return Ok(res),
            Err(err) => err,
        };

        let kind = match RetryKind::for_category(&err.category()) {
            Some(kind) => kind,
            None => return Err(err),
        };

        if !budget.take(kind) {
            log::error!("{what}: {err}, no retries left");
            return Err(err);
        }

        log::warn!(
            "{what}: {err}, retrying ({} left)",
            budget.remaining(kind)
        );
        on_retry(kind);
    }
}
