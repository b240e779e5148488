//! Block copy between two devices (`sg_dd` style)
//!
//! One READ and one WRITE of up to `blocks_per_transfer` blocks per loop
//! iteration. Unit attention and aborted command are retried against the
//! session [`RetryBudget`]. A medium error with a valid information field
//! either ends the copy or, with `coe` set, the transfer is re-read one
//! block at a time and unreadable blocks are written as zeros.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{bail, format_err, Error};
use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};

use sg_json::{NodeId, SgjState};

use sg_pt::cdb::{build_read_cdb, build_write_cdb, RwParams};
use sg_pt::commands::scsi_read_capacity;
use sg_pt::{ScsiCategory, ScsiError, ScsiPassThrough, SgRaw};

use crate::retry::{retry_command, RetryBudget, RetryKind, RetryLimits};
use crate::signals;

/// Largest buffer used for one transfer
pub const MAX_TRANSFER_SIZE: usize = 64 * 1024 * 1024;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RwFlags {
    /// Disable page out
    pub dpo: bool,
    /// Force unit access
    pub fua: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct CopyConfig {
    pub block_size: usize,
    pub blocks_per_transfer: u32,
    /// READ CDB size (6, 10, 12 or 16)
    pub in_cdb_len: usize,
    /// WRITE CDB size (6, 10, 12 or 16)
    pub out_cdb_len: usize,
    pub in_flags: RwFlags,
    pub out_flags: RwFlags,
    /// Blocks to skip on input
    pub skip: u64,
    /// Blocks to skip on output
    pub seek: u64,
    /// Blocks to copy, up to the end of the input if not set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Continue on (medium) error
    pub coe: bool,
    pub retries: RetryLimits,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            block_size: 512,
            blocks_per_transfer: 128,
            in_cdb_len: 10,
            out_cdb_len: 10,
            in_flags: RwFlags::default(),
            out_flags: RwFlags::default(),
            skip: 0,
            seek: 0,
            count: None,
            coe: false,
            retries: RetryLimits::default(),
        }
    }
}

impl CopyConfig {
    pub fn check(&self) -> Result<(), Error> {
        if self.block_size == 0 {
            bail!("block size must not be zero");
        }
        if self.blocks_per_transfer == 0 {
            bail!("blocks per transfer must not be zero");
        }
        match self.block_size.checked_mul(self.blocks_per_transfer as usize) {
            Some(size) if size <= MAX_TRANSFER_SIZE => {}
            _ => bail!(
                "transfer size {} * {} too large (max {MAX_TRANSFER_SIZE} bytes)",
                self.block_size,
                self.blocks_per_transfer
            ),
        }
        for (what, len) in [("input", self.in_cdb_len), ("output", self.out_cdb_len)] {
            if !matches!(len, 6 | 10 | 12 | 16) {
                bail!("unsupported {what} cdb size {len}");
            }
        }
        Ok(())
    }
}

/// Counters of a copy session
///
/// Updated by the copy loop only, reads (progress report) may see slightly
/// stale values.
#[derive(Debug, Default)]
pub struct CopyStats {
    pub in_full: AtomicU64,
    /// Zero filled or short records
    pub in_partial: AtomicU64,
    pub out_full: AtomicU64,
    pub recovered_errors: AtomicU64,
    pub unrecovered_errors: AtomicU64,
    pub retries: AtomicU64,
    pub unit_attentions: AtomicU64,
}

/// Point in time copy of [`CopyStats`]
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyStatsSnapshot {
    pub in_full: u64,
    pub in_partial: u64,
    pub out_full: u64,
    pub recovered_errors: u64,
    pub unrecovered_errors: u64,
    pub retries: u64,
    pub unit_attentions: u64,
}

fn add(counter: &AtomicU64, value: u64) {
    counter.fetch_add(value, Ordering::Relaxed);
}

impl CopyStats {
    pub fn snapshot(&self) -> CopyStatsSnapshot {
        CopyStatsSnapshot {
            in_full: self.in_full.load(Ordering::Relaxed),
            in_partial: self.in_partial.load(Ordering::Relaxed),
            out_full: self.out_full.load(Ordering::Relaxed),
            recovered_errors: self.recovered_errors.load(Ordering::Relaxed),
            unrecovered_errors: self.unrecovered_errors.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            unit_attentions: self.unit_attentions.load(Ordering::Relaxed),
        }
    }

    fn note_retry(&self, kind: RetryKind) {
        add(&self.retries, 1);
        if kind == RetryKind::UnitAttention {
            add(&self.unit_attentions, 1);
        }
    }

    pub fn report(&self) -> String {
        let stats = self.snapshot();
        let mut text = format!(
            "{}+{} records in\n{}+0 records out\n",
            stats.in_full, stats.in_partial, stats.out_full
        );
        if stats.recovered_errors > 0 {
            text.push_str(&format!(">> Number of recovered errors: {}\n", stats.recovered_errors));
        }
        if stats.unrecovered_errors > 0 {
            text.push_str(&format!(
                ">> Number of unrecovered read errors: {}\n",
                stats.unrecovered_errors
            ));
        }
        if stats.retries > 0 {
            text.push_str(&format!(
                ">> Number of retries: {} (unit attentions: {})\n",
                stats.retries, stats.unit_attentions
            ));
        }
        text
    }

    /// Final statistics as text, or as JSON members of `obj`
    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>) {
        if !sgj.as_json {
            sg_json::sgj_hr!(sgj, "{}", self.report());
            return;
        }
        let stats = self.snapshot();
        sgj.js_nv_i(obj, "records_in_full", stats.in_full);
        sgj.js_nv_i(obj, "records_in_partial", stats.in_partial);
        sgj.js_nv_i(obj, "records_out_full", stats.out_full);
        sgj.js_nv_i(obj, "recovered_errors", stats.recovered_errors);
        sgj.js_nv_i(obj, "unrecovered_read_errors", stats.unrecovered_errors);
        sgj.js_nv_i(obj, "retries", stats.retries);
        sgj.js_nv_i(obj, "unit_attentions", stats.unit_attentions);
    }

    pub fn log_report(&self) {
        for line in self.report().lines() {
            log::info!("{line}");
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyOutcome {
    Completed,
    /// Stopped between two commands, see [`finish_interrupted`]
    Interrupted(Signal),
}

pub struct CopySession<'a, I: ?Sized, O: ?Sized> {
    input: &'a mut I,
    output: &'a mut O,
    config: CopyConfig,
    budget: RetryBudget,
    stats: CopyStats,
}

impl<'a, I, O> CopySession<'a, I, O>
where
    I: ScsiPassThrough + ?Sized,
    O: ScsiPassThrough + ?Sized,
{
    pub fn new(input: &'a mut I, output: &'a mut O, config: CopyConfig) -> Result<Self, Error> {
        config.check()?;
        let budget = RetryBudget::new(&config.retries);
        Ok(Self {
            input,
            output,
            config,
            budget,
            stats: CopyStats::default(),
        })
    }

    pub fn stats(&self) -> &CopyStats {
        &self.stats
    }

    pub fn budget(&self) -> &RetryBudget {
        &self.budget
    }

    /// Number of blocks on the input device
    fn input_blocks(&mut self) -> Result<u64, ScsiError> {
        let capacity = scsi_read_capacity(&mut *self.input)?;
        if capacity.block_len as usize != self.config.block_size {
            return Err(format_err!(
                "input block size is {}, configured {}",
                capacity.block_len,
                self.config.block_size
            )
            .into());
        }
        Ok(capacity.number_of_blocks())
    }

    pub fn run(&mut self) -> Result<CopyOutcome, ScsiError> {
        let block_size = self.config.block_size;
        let bpt = self.config.blocks_per_transfer as u64;

        let mut remaining = match self.config.count {
            Some(count) => count,
            None => self.input_blocks()?.saturating_sub(self.config.skip),
        };
        let mut in_lba = self.config.skip;
        let mut out_lba = self.config.seek;

        log::debug!("copy {remaining} blocks of {block_size} bytes, skip={in_lba} seek={out_lba}");

        let mut buffer = vec![0u8; block_size * bpt as usize];

        while remaining > 0 {
            if let Some(sig) = signals::pending_interrupt() {
                return Ok(CopyOutcome::Interrupted(sig));
            }
            if signals::take_progress_request() {
                log::info!("Progress report, continuing ...");
                self.stats.log_report();
            }

            let blocks = remaining.min(bpt) as u32;
            let len = blocks as usize * block_size;

            let read = self.read_blocks(in_lba, blocks, &mut buffer[..len])?;
            if read > 0 {
                self.write_blocks(out_lba, read, &buffer[..read as usize * block_size])?;
            }
            if read < blocks {
                log::info!("short read at lba 0x{:x}, end of input", in_lba + read as u64);
                break;
            }

            in_lba += read as u64;
            out_lba += read as u64;
            remaining -= read as u64;
        }

        Ok(CopyOutcome::Completed)
    }

    /// One READ with retries, returns the number of complete blocks
    fn read_attempt(&mut self, lba: u64, blocks: u32, buf: &mut [u8]) -> Result<u32, ScsiError> {
        let params = RwParams {
            dpo: self.config.in_flags.dpo,
            fua: self.config.in_flags.fua,
            ..RwParams::new(lba, blocks)
        };
        let cmd = build_read_cdb(self.config.in_cdb_len, &params)?;

        let input = &mut *self.input;
        let stats = &self.stats;
        let (len, category) = retry_command(
            &self.budget,
            "read",
            |kind| stats.note_retry(kind),
            || {
                let mut sg_raw = SgRaw::new(&mut *input, 0);
                let len = sg_raw.do_in_command(&cmd, &mut *buf)?.len();
                Ok((len, sg_raw.last_category().clone()))
            },
        )?;

        if category == ScsiCategory::Recovered {
            log::warn!("recovered error reading lba 0x{lba:x}");
            add(&self.stats.recovered_errors, 1);
        }

        let block_size = self.config.block_size;
        let full = (len / block_size) as u32;
        add(&self.stats.in_full, full as u64);
        if len % block_size != 0 {
            add(&self.stats.in_partial, 1);
        }
        Ok(full)
    }

    fn read_blocks(&mut self, lba: u64, blocks: u32, buf: &mut [u8]) -> Result<u32, ScsiError> {
        loop {
            let err = match self.read_attempt(lba, blocks, buf) {
                Ok(read) => return Ok(read),
                Err(err) => err,
            };

            let bad_lba = match err.category() {
                ScsiCategory::MediumHard { info: Some(info) } => info,
                _ => return Err(err),
            };

            if self.budget.take(RetryKind::MediumReread) {
                log::warn!("medium error at lba 0x{bad_lba:x}, reading again");
                self.stats.note_retry(RetryKind::MediumReread);
                continue;
            }

            if !self.config.coe {
                add(&self.stats.unrecovered_errors, 1);
                return Err(err);
            }

            log::warn!("medium error at lba 0x{bad_lba:x}, continuing block by block");
            return self.read_block_by_block(lba, blocks, buf);
        }
    }

    fn read_block_by_block(&mut self, lba: u64, blocks: u32, buf: &mut [u8]) -> Result<u32, ScsiError> {
        let block_size = self.config.block_size;

        for (i, block) in buf.chunks_exact_mut(block_size).take(blocks as usize).enumerate() {
            let block_lba = lba + i as u64;
            match self.read_attempt(block_lba, 1, block) {
                Ok(1) => {}
                Ok(_) => return Ok(i as u32),
                Err(err) if matches!(err.category(), ScsiCategory::MediumHard { .. }) => {
                    log::error!("unrecovered read error at lba 0x{block_lba:x}, writing zeros - {err}");
                    block.fill(0);
                    add(&self.stats.unrecovered_errors, 1);
                    add(&self.stats.in_partial, 1);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(blocks)
    }

    fn write_blocks(&mut self, lba: u64, blocks: u32, data: &[u8]) -> Result<(), ScsiError> {
        let params = RwParams {
            dpo: self.config.out_flags.dpo,
            fua: self.config.out_flags.fua,
            ..RwParams::new(lba, blocks)
        };
        let cmd = build_write_cdb(self.config.out_cdb_len, &params)?;

        let output = &mut *self.output;
        let stats = &self.stats;
        let category = retry_command(
            &self.budget,
            "write",
            |kind| stats.note_retry(kind),
            || {
                let mut sg_raw = SgRaw::new(&mut *output, 0);
                sg_raw.do_out_command(&cmd, data)?;
                Ok(sg_raw.last_category().clone())
            },
        )?;

        if category == ScsiCategory::Recovered {
            log::warn!("recovered error writing lba 0x{lba:x}");
            add(&self.stats.recovered_errors, 1);
        }
        add(&self.stats.out_full, blocks as u64);
        Ok(())
    }
}

/// Print the final statistics, then terminate by the interrupting signal
pub fn finish_interrupted(sig: Signal, stats: &CopyStats) -> Result<(), Error> {
    log::info!("Interrupted by signal {sig}");
    stats.log_report();
    signals::reraise(sig)
}

#[cfg(test)]
mod test {
    use super::*;
    use sg_json::JsonOptions;

    #[test]
    fn config_defaults_and_check() -> Result<(), Error> {
        let config: CopyConfig = serde_json::from_str(
            r#"{ "block-size": 4096, "blocks-per-transfer": 16, "coe": true, "count": 100 }"#,
        )?;
        assert_eq!(config.block_size, 4096);
        assert_eq!(config.in_cdb_len, 10);
        assert_eq!(config.count, Some(100));
        assert!(config.coe);
        config.check()?;

        let bad = CopyConfig {
            in_cdb_len: 8,
            ..Default::default()
        };
        assert!(bad.check().is_err());

        let bad = CopyConfig {
            blocks_per_transfer: u32::MAX,
            ..Default::default()
        };
        assert!(bad.check().is_err());
        Ok(())
    }

    #[test]
    fn stats_as_json() -> Result<(), Error> {
        let stats = CopyStats::default();
        add(&stats.in_full, 8);
        add(&stats.out_full, 8);
        add(&stats.recovered_errors, 2);

        let mut sgj = SgjState::new(JsonOptions::parse("-l")?, true);
        let obj = sgj.start(None, None, &[]);
        stats.render(&mut sgj, obj);
        let mut out = Vec::new();
        sgj.finish_output(None, &mut out)?;

        let value: serde_json::Value = serde_json::from_slice(&out)?;
        assert_eq!(value["records_in_full"], 8);
        assert_eq!(value["recovered_errors"], 2);
        assert_eq!(value["unit_attentions"], 0);
        Ok(())
    }

    #[test]
    fn stats_report() {
        let stats = CopyStats::default();
        add(&stats.in_full, 10);
        add(&stats.in_partial, 1);
        add(&stats.out_full, 11);
        assert_eq!(stats.report(), "10+1 records in\n11+0 records out\n");

        stats.note_retry(RetryKind::UnitAttention);
        add(&stats.unrecovered_errors, 1);
        assert_eq!(
            stats.report(),
            "10+1 records in\n11+0 records out\n\
             >> Number of unrecovered read errors: 1\n\
             >> Number of retries: 1 (unit attentions: 1)\n"
        );
    }
}
