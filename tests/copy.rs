use anyhow::Error;

use sg3_utils::copy::{CopyConfig, CopyOutcome, CopySession};
use sg3_utils::exit::{error_exit_status, EXIT_ILLEGAL_REQUEST, EXIT_MEDIUM_HARD_WITH_INFO, EXIT_UNIT_ATTENTION};
use sg3_utils::retry::{RetryKind, RetryLimits};
use sg_pt::cdb::{READ_16, READ_CAPACITY_10, WRITE_16};
use sg_pt::ScsiCategory;

mod common;
use common::MemDisk;

const BS: usize = 512;

fn config(count: Option<u64>, bpt: u32) -> CopyConfig {
    CopyConfig {
        block_size: BS,
        blocks_per_transfer: bpt,
        count,
        ..Default::default()
    }
}

#[test]
fn copy_whole_device() -> Result<(), Error> {
    let mut src = MemDisk::with_pattern(BS, 64);
    let mut dst = MemDisk::new(BS, 64);

    let mut session = CopySession::new(&mut src, &mut dst, config(None, 16))?;
    assert_eq!(session.run()?, CopyOutcome::Completed);
    let stats = session.stats().snapshot();

    assert_eq!(stats.in_full, 64);
    assert_eq!(stats.in_partial, 0);
    assert_eq!(stats.out_full, 64);
    assert_eq!(src.cdbs[0][0], READ_CAPACITY_10);
    assert_eq!(src.cdbs.len(), 1 + 4);
    assert_eq!(dst.cdbs.len(), 4);
    assert!(src.data == dst.data);
    Ok(())
}

#[test]
fn skip_seek_and_count() -> Result<(), Error> {
    let mut src = MemDisk::with_pattern(BS, 32);
    let mut dst = MemDisk::new(BS, 32);

    let config = CopyConfig {
        skip: 4,
        seek: 10,
        in_cdb_len: 16,
        out_cdb_len: 16,
        ..config(Some(8), 3)
    };
    let mut session = CopySession::new(&mut src, &mut dst, config)?;
    session.run()?;
    assert_eq!(session.stats().snapshot().out_full, 8);

    for i in 0..8 {
        assert_eq!(dst.block(10 + i), src.block(4 + i));
    }
    assert!(dst.block(9).iter().all(|b| *b == 0));
    assert!(dst.block(18).iter().all(|b| *b == 0));

    // 3 + 3 + 2 blocks
    assert_eq!(src.cdbs.len(), 3);
    assert!(src.cdbs.iter().all(|cdb| cdb[0] == READ_16));
    assert!(dst.cdbs.iter().all(|cdb| cdb[0] == WRITE_16));
    assert_eq!(&src.cdbs[2][10..14], &2u32.to_be_bytes());
    Ok(())
}

#[test]
fn unit_attention_and_aborted_command_are_retried() -> Result<(), Error> {
    let mut src = MemDisk::with_pattern(BS, 16);
    src.unit_attentions = 2;
    let mut dst = MemDisk::new(BS, 16);
    dst.aborted_commands = 1;

    let mut session = CopySession::new(&mut src, &mut dst, config(Some(16), 8))?;
    session.run()?;

    let stats = session.stats().snapshot();
    assert_eq!(stats.retries, 3);
    assert_eq!(stats.unit_attentions, 2);
    assert_eq!(session.budget().remaining(RetryKind::UnitAttention), 3);
    assert_eq!(session.budget().remaining(RetryKind::AbortedCommand), 4);
    drop(session);

    assert!(src.data == dst.data);
    Ok(())
}

#[test]
fn unit_attention_budget_runs_out() -> Result<(), Error> {
    let mut src = MemDisk::with_pattern(BS, 16);
    src.unit_attentions = 3;
    let mut dst = MemDisk::new(BS, 16);

    let config = CopyConfig {
        retries: RetryLimits {
            unit_attention: 1,
            ..Default::default()
        },
        ..config(Some(16), 8)
    };
    let mut session = CopySession::new(&mut src, &mut dst, config)?;
    let err = match session.run() {
        Ok(outcome) => panic!("copy should fail, got {outcome:?}"),
        Err(err) => err,
    };
    assert_eq!(err.category(), ScsiCategory::UnitAttention);
    assert_eq!(error_exit_status(&err), EXIT_UNIT_ATTENTION);
    assert_eq!(session.stats().snapshot().out_full, 0);
    Ok(())
}

#[test]
fn medium_error_stops_copy() -> Result<(), Error> {
    let mut src = MemDisk::with_pattern(BS, 16);
    src.bad_blocks.insert(5);
    let mut dst = MemDisk::new(BS, 16);

    let mut session = CopySession::new(&mut src, &mut dst, config(Some(16), 8))?;
    let err = match session.run() {
        Ok(outcome) => panic!("copy should fail, got {outcome:?}"),
        Err(err) => err,
    };
    assert_eq!(err.category(), ScsiCategory::MediumHard { info: Some(5) });
    assert_eq!(error_exit_status(&err), EXIT_MEDIUM_HARD_WITH_INFO);

    let stats = session.stats().snapshot();
    assert_eq!(stats.unrecovered_errors, 1);
    assert_eq!(stats.in_full, 0);
    assert_eq!(stats.out_full, 0);
    Ok(())
}

#[test]
fn continue_on_error_zero_fills_bad_blocks() -> Result<(), Error> {
    let mut src = MemDisk::with_pattern(BS, 16);
    src.bad_blocks.insert(5);
    src.bad_blocks.insert(6);
    let mut dst = MemDisk::with_pattern(BS, 16);
    dst.data.iter_mut().for_each(|b| *b = 0xff);

    let config = CopyConfig {
        coe: true,
        ..config(Some(16), 8)
    };
    let mut session = CopySession::new(&mut src, &mut dst, config)?;
    assert_eq!(session.run()?, CopyOutcome::Completed);

    let stats = session.stats().snapshot();
    assert_eq!(stats.in_full, 14);
    assert_eq!(stats.in_partial, 2);
    assert_eq!(stats.unrecovered_errors, 2);
    assert_eq!(stats.out_full, 16);
    assert!(session.stats().report().contains("14+2 records in"));
    drop(session);

    // one failed 8 block read, 8 single block reads, one 8 block read
    assert_eq!(src.cdbs.len(), 10);
    for lba in 0..16u64 {
        if lba == 5 || lba == 6 {
            assert!(dst.block(lba).iter().all(|b| *b == 0), "block {lba}");
        } else {
            assert_eq!(dst.block(lba), src.block(lba), "block {lba}");
        }
    }
    Ok(())
}

#[test]
fn medium_error_reread_budget() -> Result<(), Error> {
    let mut src = MemDisk::with_pattern(BS, 8);
    src.flaky_blocks.insert(3, 1);
    let mut dst = MemDisk::new(BS, 8);

    let config = CopyConfig {
        retries: RetryLimits {
            medium_reread: 1,
            ..Default::default()
        },
        ..config(Some(8), 8)
    };
    let mut session = CopySession::new(&mut src, &mut dst, config)?;
    session.run()?;

    let stats = session.stats().snapshot();
    assert_eq!(stats.retries, 1);
    assert_eq!(stats.unrecovered_errors, 0);
    assert_eq!(session.budget().remaining(RetryKind::MediumReread), 0);
    drop(session);

    assert!(src.data == dst.data);
    Ok(())
}

#[test]
fn recovered_errors_are_counted() -> Result<(), Error> {
    let mut src = MemDisk::with_pattern(BS, 8);
    src.recovered_blocks.insert(2);
    let mut dst = MemDisk::new(BS, 8);

    let mut session = CopySession::new(&mut src, &mut dst, config(Some(8), 4))?;
    session.run()?;

    let stats = session.stats().snapshot();
    assert_eq!(stats.recovered_errors, 1);
    assert_eq!(stats.in_full, 8);
    drop(session);

    assert!(src.data == dst.data);
    Ok(())
}

#[test]
fn copy_past_end_of_input() -> Result<(), Error> {
    let mut src = MemDisk::with_pattern(BS, 8);
    let mut dst = MemDisk::new(BS, 16);

    let mut session = CopySession::new(&mut src, &mut dst, config(Some(16), 8))?;
    let err = match session.run() {
        Ok(outcome) => panic!("copy should fail, got {outcome:?}"),
        Err(err) => err,
    };
    assert_eq!(error_exit_status(&err), EXIT_ILLEGAL_REQUEST);
    assert_eq!(session.stats().snapshot().out_full, 8);
    Ok(())
}

#[test]
fn block_size_mismatch() -> Result<(), Error> {
    let mut src = MemDisk::with_pattern(BS, 8);
    let mut dst = MemDisk::new(BS, 8);

    let config = CopyConfig {
        block_size: 4096,
        ..config(None, 8)
    };
    let mut session = CopySession::new(&mut src, &mut dst, config)?;
    assert!(session.run().is_err());
    drop(session);

    assert_eq!(src.cdbs.len(), 1);
    assert!(dst.cdbs.is_empty());
    Ok(())
}
