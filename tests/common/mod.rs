//! In-memory block device with injectable failures

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anyhow::{bail, Error};

use sg_pt::cdb::{READ_10, READ_16, READ_CAPACITY_10, WRITE_10, WRITE_16};
use sg_pt::{Completion, DataTransfer, ScsiPassThrough, TransportStatus};

const SENSE_KEY_RECOVERED_ERROR: u8 = 0x01;
const SENSE_KEY_MEDIUM_ERROR: u8 = 0x03;
const SENSE_KEY_ILLEGAL_REQUEST: u8 = 0x05;
const SENSE_KEY_UNIT_ATTENTION: u8 = 0x06;
const SENSE_KEY_ABORTED_COMMAND: u8 = 0x0b;

pub struct MemDisk {
    pub block_size: usize,
    pub data: Vec<u8>,
    /// Report UNIT ATTENTION for the next n commands
    pub unit_attentions: u32,
    /// Report ABORTED COMMAND for the next n commands
    pub aborted_commands: u32,
    /// Reads touching these blocks always fail
    pub bad_blocks: HashSet<u64>,
    /// Reads touching these blocks fail the given number of times
    pub flaky_blocks: HashMap<u64, u32>,
    /// Reads touching these blocks succeed with RECOVERED ERROR
    pub recovered_blocks: HashSet<u64>,
    pub cdbs: Vec<Vec<u8>>,
}

impl MemDisk {
    pub fn new(block_size: usize, blocks: usize) -> Self {
        Self {
            block_size,
            data: vec![0u8; block_size * blocks],
            unit_attentions: 0,
            aborted_commands: 0,
            bad_blocks: HashSet::new(),
            flaky_blocks: HashMap::new(),
            recovered_blocks: HashSet::new(),
            cdbs: Vec::new(),
        }
    }

    /// Every block filled with its own LBA (low byte), plus one
    pub fn with_pattern(block_size: usize, blocks: usize) -> Self {
        let mut disk = Self::new(block_size, blocks);
        for (lba, block) in disk.data.chunks_exact_mut(block_size).enumerate() {
            block.fill((lba as u8).wrapping_add(1));
        }
        disk
    }

    pub fn blocks(&self) -> u64 {
        (self.data.len() / self.block_size) as u64
    }

    pub fn block(&self, lba: u64) -> &[u8] {
        let start = lba as usize * self.block_size;
        &self.data[start..start + self.block_size]
    }

    fn range(&self, lba: u64, blocks: u64) -> Option<std::ops::Range<usize>> {
        if lba.checked_add(blocks)? > self.blocks() {
            return None;
        }
        let start = lba as usize * self.block_size;
        Some(start..start + blocks as usize * self.block_size)
    }

    fn first_failing_block(&mut self, lba: u64, blocks: u64) -> Option<u64> {
        for block in lba..lba + blocks {
            if self.bad_blocks.contains(&block) {
                return Some(block);
            }
            if let Some(left) = self.flaky_blocks.get_mut(&block) {
                if *left > 0 {
                    *left -= 1;
                    return Some(block);
                }
            }
        }
        None
    }
}

/// Fixed format sense, with the information field if `info` is set
fn fixed_sense(sense_key: u8, asc: u8, ascq: u8, info: Option<u64>) -> Vec<u8> {
    let mut sense = vec![0u8; 18];
    sense[0] = 0x70;
    sense[2] = sense_key;
    if let Some(info) = info {
        sense[0] |= 0x80;
        sense[3..7].copy_from_slice(&(info as u32).to_be_bytes());
    }
    sense[7] = 10;
    sense[12] = asc;
    sense[13] = ascq;
    sense
}

fn check_condition(sense_buf: &mut [u8], sense: &[u8]) -> Completion {
    let len = sense.len().min(sense_buf.len());
    sense_buf[..len].copy_from_slice(&sense[..len]);
    Completion {
        status: 0x02,
        sense_len: len,
        resid: 0,
        transport: TransportStatus::Ok,
    }
}

fn lba_and_blocks(cdb: &[u8]) -> (u64, u64) {
    match cdb.len() {
        10 => (
            u32::from_be_bytes([cdb[2], cdb[3], cdb[4], cdb[5]]) as u64,
            u16::from_be_bytes([cdb[7], cdb[8]]) as u64,
        ),
        _ => (
            u64::from_be_bytes([cdb[2], cdb[3], cdb[4], cdb[5], cdb[6], cdb[7], cdb[8], cdb[9]]),
            u32::from_be_bytes([cdb[10], cdb[11], cdb[12], cdb[13]]) as u64,
        ),
    }
}

impl ScsiPassThrough for MemDisk {
    fn execute(
        &mut self,
        cdb: &[u8],
        data: DataTransfer<'_>,
        sense: &mut [u8],
        _timeout: Duration,
    ) -> Result<Completion, Error> {
        self.cdbs.push(cdb.to_vec());

        if self.unit_attentions > 0 {
            self.unit_attentions -= 1;
            // power on, reset or bus device reset occurred
            return Ok(check_condition(sense, &fixed_sense(SENSE_KEY_UNIT_ATTENTION, 0x29, 0, None)));
        }
        if self.aborted_commands > 0 {
            self.aborted_commands -= 1;
            return Ok(check_condition(sense, &fixed_sense(SENSE_KEY_ABORTED_COMMAND, 0, 0, None)));
        }

        let mut completion = Completion::good();

        match (cdb[0], data) {
            (READ_CAPACITY_10, DataTransfer::In(buffer)) => {
                let mut reply = ((self.blocks() - 1) as u32).to_be_bytes().to_vec();
                reply.extend_from_slice(&(self.block_size as u32).to_be_bytes());
                let len = reply.len().min(buffer.len());
                buffer[..len].copy_from_slice(&reply[..len]);
                completion.resid = buffer.len() - len;
            }
            (READ_10 | READ_16, DataTransfer::In(buffer)) => {
                let (lba, blocks) = lba_and_blocks(cdb);
                let range = match self.range(lba, blocks) {
                    Some(range) => range,
                    // logical block address out of range
                    None => {
                        let sense_data = fixed_sense(SENSE_KEY_ILLEGAL_REQUEST, 0x21, 0, None);
                        return Ok(check_condition(sense, &sense_data));
                    }
                };
                if let Some(bad) = self.first_failing_block(lba, blocks) {
                    // unrecovered read error
                    let sense_data = fixed_sense(SENSE_KEY_MEDIUM_ERROR, 0x11, 0, Some(bad));
                    return Ok(check_condition(sense, &sense_data));
                }
                let len = range.len().min(buffer.len());
                buffer[..len].copy_from_slice(&self.data[range.start..range.start + len]);
                completion.resid = buffer.len() - len;

                if (lba..lba + blocks).any(|block| self.recovered_blocks.contains(&block)) {
                    // recovered data with retries
                    let sense_data = fixed_sense(SENSE_KEY_RECOVERED_ERROR, 0x17, 0x01, None);
                    let resid = completion.resid;
                    completion = check_condition(sense, &sense_data);
                    completion.resid = resid;
                }
            }
            (WRITE_10 | WRITE_16, DataTransfer::Out(buffer)) => {
                let (lba, blocks) = lba_and_blocks(cdb);
                let range = match self.range(lba, blocks) {
                    Some(range) if range.len() == buffer.len() => range,
                    _ => {
                        let sense_data = fixed_sense(SENSE_KEY_ILLEGAL_REQUEST, 0x21, 0, None);
                        return Ok(check_condition(sense, &sense_data));
                    }
                };
                self.data[range].copy_from_slice(buffer);
            }
            (opcode, _) => bail!("unexpected command 0x{opcode:02x}"),
        }

        Ok(completion)
    }
}
