//! Command wrappers: build the CDB, run it through [`SgRaw`] and decode the
//! response
//!
//! Dispatch failures are returned as [`ScsiError`] so callers can still
//! branch on the [`ScsiCategory`](crate::ScsiCategory); decode failures
//! become [`ScsiError::Error`] with a "decode ... failed" message.

use anyhow::{bail, format_err, Error};

use crate::ata::{decode_ata_log_directory, AtaLogDirectory, ATA_LOG_DIRECTORY_LEN};
use crate::capacity::{
    decode_block_limits, decode_identifying_information, decode_media_serial_number,
    decode_read_capacity10, decode_read_capacity16, BlockLimits, Capacity, READ_CAPACITY16_LEN,
};
use crate::cdb::*;
use crate::designator::Designator;
use crate::element_status::{decode_physical_element_status, PhysicalElementStatus};
use crate::inquiry::{
    decode_device_identification, decode_standard_inquiry, decode_supported_vpd_pages,
    decode_unit_serial_number, InquiryInfo, INQUIRY_PAGE_LEN, VPD_DEVICE_IDENTIFICATION,
    VPD_SUPPORTED_VPDS, VPD_UNIT_SERIAL_NUMBER,
};
use crate::lba_status::{decode_lba_status, LbaStatus};
use crate::log_page::{decode_log_page, decode_supported_log_pages, LogPage};
use crate::luns::{decode_report_luns, LunList};
use crate::mode_sense::{decode_mode_sense10, decode_mode_sense6, ModeSense};
use crate::persistent_reserve::{
    build_prout_param_list, decode_read_keys, decode_read_reservation, RegisteredKeys,
    Reservation, PRIN_READ_KEYS, PRIN_READ_RESERVATION,
};
use crate::sense::{decode_sense, SenseData};
use crate::sg_pt::{sense_err_is_invalid_command, ScsiError, ScsiPassThrough, SgRaw};
use crate::tpg::{decode_target_port_groups, TargetPortGroups};

/// Allocation length for variable sized responses
pub const DEFAULT_ALLOC_LEN: usize = 8192;

const ATA_READ_LOG_EXT: u8 = 0x2f;
const ATA_PROTOCOL_PIO_DATA_IN: u8 = 4;

pub fn scsi_test_unit_ready<D: ScsiPassThrough + ?Sized>(device: &mut D) -> Result<(), ScsiError> {
    let mut sg_raw = SgRaw::new(device, 16);
    sg_raw.set_timeout(30); // use short timeout
    sg_raw.do_no_data_command(&build_test_unit_ready_cdb())
}

/// REQUEST SENSE, returns the decoded sense data
pub fn scsi_request_sense<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    desc: bool,
) -> Result<SenseData, ScsiError> {
    let alloc_len = 252u8;
    let mut sg_raw = SgRaw::new(device, alloc_len as usize);
    sg_raw.set_timeout(30);

    let data = sg_raw.do_command(&build_request_sense_cdb(desc, alloc_len))?;
    let sense = decode_sense(data).map_err(|err| format_err!("decode request sense failed - {err}"))?;
    Ok(sense)
}

/// Read SCSI Inquiry page
///
/// Returns Product/Vendor/Revision and device type.
pub fn scsi_inquiry<D: ScsiPassThrough + ?Sized>(device: &mut D) -> Result<InquiryInfo, ScsiError> {
    let allocation_len = INQUIRY_PAGE_LEN as u16;

    let mut sg_raw = SgRaw::new(device, allocation_len as usize);
    sg_raw.set_timeout(30); // use short timeout

    let cmd = build_inquiry_cdb(false, 0, allocation_len)?;
    let data = sg_raw.do_command(&cmd)?;

    let info = decode_standard_inquiry(data)
        .map_err(|err| format_err!("decode inquiry page failed - {err}"))?;
    Ok(info)
}

/// Read a VPD page, the returned data includes the 4 byte page header
pub fn scsi_vpd_page<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    page_code: u8,
) -> Result<Vec<u8>, ScsiError> {
    let alloc_len: u16 = 0xfffc;
    let mut sg_raw = SgRaw::new(device, alloc_len as usize);
    sg_raw.set_timeout(30);

    let cmd = build_inquiry_cdb(true, page_code, alloc_len)?;
    let data = sg_raw.do_command(&cmd)?;
    Ok(data.to_vec())
}

pub fn scsi_unit_serial_number<D: ScsiPassThrough + ?Sized>(device: &mut D) -> Result<String, ScsiError> {
    let data = scsi_vpd_page(device, VPD_UNIT_SERIAL_NUMBER)?;
    let serial = decode_unit_serial_number(&data)
        .map_err(|err| format_err!("decode unit serial number failed - {err}"))?;
    Ok(serial)
}

pub fn scsi_supported_vpd_pages<D: ScsiPassThrough + ?Sized>(device: &mut D) -> Result<Vec<u8>, ScsiError> {
    let data = scsi_vpd_page(device, VPD_SUPPORTED_VPDS)?;
    let pages = decode_supported_vpd_pages(&data)
        .map_err(|err| format_err!("decode supported vpd pages failed - {err}"))?;
    Ok(pages)
}

/// Designators of the device identification VPD page (0x83)
pub fn scsi_device_identification<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
) -> Result<Vec<Designator>, ScsiError> {
    let data = scsi_vpd_page(device, VPD_DEVICE_IDENTIFICATION)?;
    let designators = decode_device_identification(&data)
        .map_err(|err| format_err!("decode device identification page failed - {err}"))?;
    Ok(designators)
}

/// Run SCSI Mode Sense - try Mode Sense(10) first, fallback to Mode Sense(6)
pub fn scsi_mode_sense<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    disable_block_descriptor: bool,
    page_code: u8,
    sub_page_code: u8,
) -> Result<ModeSense, ScsiError> {
    let mut sg_raw = SgRaw::new(device, 4096);

    let mut params = ModeSenseParams {
        long: true,
        dbd: disable_block_descriptor,
        page_control: 0,
        page_code,
        sub_page_code,
        alloc_len: 4096,
    };
    let cmd10 = build_mode_sense_cdb(&params)?;

    match sg_raw.do_command(&cmd10) {
        Ok(data10) => Ok(decode_mode_sense10(data10)
            .map_err(|err| format_err!("decode mode sense(10) failed - {err}"))?),
        Err(ScsiError::Failed(failure))
            if failure.sense.as_ref().map(sense_err_is_invalid_command) == Some(true) =>
        {
            log::debug!("mode sense(10) not supported, falling back to mode sense(6)");
            params.long = false;
            params.alloc_len = 0xff;
            let cmd6 = build_mode_sense_cdb(&params)?;
            let data6 = sg_raw.do_command(&cmd6)?;
            Ok(decode_mode_sense6(data6)
                .map_err(|err| format_err!("decode mode sense(6) failed - {err}"))?)
        }
        Err(err) => Err(err),
    }
}

/// LOG SENSE for the current cumulative values of a page
pub fn scsi_log_sense<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    page_code: u8,
    sub_page_code: u8,
) -> Result<LogPage, ScsiError> {
    let alloc_len: u16 = 8192;
    let mut sg_raw = SgRaw::new(device, alloc_len as usize);

    let cmd = build_log_sense_cdb(1, page_code, sub_page_code, 0, alloc_len)?;
    let data = sg_raw.do_command(&cmd)?;

    let page = proxmox_lang::try_block!({
        let page = decode_log_page(data)?;
        if page.page_code != page_code {
            bail!("got log page 0x{:02x}", page.page_code);
        }
        Ok(page)
    })
    .map_err(|err: Error| format_err!("decode log page 0x{page_code:02x} failed - {err}"))?;
    Ok(page)
}

/// Supported log pages, with subpages if the device knows about them
pub fn scsi_supported_log_pages<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    subpages: bool,
) -> Result<Vec<(u8, u8)>, ScsiError> {
    let alloc_len: u16 = 1024;
    let mut sg_raw = SgRaw::new(device, alloc_len as usize);

    let sub_page_code = if subpages { 0xff } else { 0 };
    let cmd = build_log_sense_cdb(1, 0, sub_page_code, 0, alloc_len)?;
    let data = sg_raw.do_command(&cmd)?;

    let pages = decode_supported_log_pages(data)
        .map_err(|err| format_err!("decode supported log pages failed - {err}"))?;
    Ok(pages)
}

/// READ CAPACITY(10), or READ CAPACITY(16) if the device is too large
pub fn scsi_read_capacity<D: ScsiPassThrough + ?Sized>(device: &mut D) -> Result<Capacity, ScsiError> {
    let mut sg_raw = SgRaw::new(device, READ_CAPACITY16_LEN);

    let data = sg_raw.do_command(&build_read_capacity10_cdb())?;
    let capacity = decode_read_capacity10(data)
        .map_err(|err| format_err!("decode read capacity(10) failed - {err}"))?;
    if !capacity.needs_capacity16() {
        return Ok(capacity);
    }

    let data = sg_raw.do_command(&build_read_capacity16_cdb(READ_CAPACITY16_LEN as u32)?)?;
    let capacity = decode_read_capacity16(data)
        .map_err(|err| format_err!("decode read capacity(16) failed - {err}"))?;
    Ok(capacity)
}

pub fn scsi_read_capacity16<D: ScsiPassThrough + ?Sized>(device: &mut D) -> Result<Capacity, ScsiError> {
    let mut sg_raw = SgRaw::new(device, READ_CAPACITY16_LEN);
    let data = sg_raw.do_command(&build_read_capacity16_cdb(READ_CAPACITY16_LEN as u32)?)?;
    let capacity = decode_read_capacity16(data)
        .map_err(|err| format_err!("decode read capacity(16) failed - {err}"))?;
    Ok(capacity)
}

pub fn scsi_report_luns<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    select_report: u8,
) -> Result<LunList, ScsiError> {
    let mut sg_raw = SgRaw::new(device, DEFAULT_ALLOC_LEN);
    let data = sg_raw.do_command(&build_report_luns_cdb(select_report, DEFAULT_ALLOC_LEN as u32)?)?;
    let luns = decode_report_luns(data).map_err(|err| format_err!("decode report luns failed - {err}"))?;
    Ok(luns)
}

/// GET LBA STATUS(16) starting at `lba`
pub fn scsi_get_lba_status<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    lba: u64,
    report_type: u8,
) -> Result<LbaStatus, ScsiError> {
    let mut sg_raw = SgRaw::new(device, DEFAULT_ALLOC_LEN);
    let cmd = build_get_lba_status16_cdb(lba, DEFAULT_ALLOC_LEN as u32, report_type)?;
    let data = sg_raw.do_command(&cmd)?;
    let status = decode_lba_status(data).map_err(|err| format_err!("decode lba status failed - {err}"))?;
    Ok(status)
}

pub fn scsi_get_physical_element_status<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    starting_element: u32,
    filter: u8,
    report_type: u8,
) -> Result<PhysicalElementStatus, ScsiError> {
    let mut sg_raw = SgRaw::new(device, DEFAULT_ALLOC_LEN);
    let cmd = build_get_physical_element_status_cdb(
        starting_element,
        DEFAULT_ALLOC_LEN as u32,
        filter,
        report_type,
    )?;
    let data = sg_raw.do_command(&cmd)?;
    let status = decode_physical_element_status(data)
        .map_err(|err| format_err!("decode physical element status failed - {err}"))?;
    Ok(status)
}

pub fn scsi_report_target_port_groups<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    extended: bool,
) -> Result<TargetPortGroups, ScsiError> {
    let mut sg_raw = SgRaw::new(device, DEFAULT_ALLOC_LEN);
    let cmd = build_report_target_port_groups_cdb(extended, DEFAULT_ALLOC_LEN as u32)?;
    let data = sg_raw.do_command(&cmd)?;
    let groups = decode_target_port_groups(data)
        .map_err(|err| format_err!("decode target port groups failed - {err}"))?;
    Ok(groups)
}

/// SET TARGET PORT GROUPS for `(asymmetric access state, group id)` pairs
pub fn scsi_set_target_port_groups<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    groups: &[(u8, u16)],
) -> Result<(), ScsiError> {
    let param_list = build_set_target_port_groups_param_list(groups)?;
    let mut sg_raw = SgRaw::new(device, 16);
    let cmd = build_set_target_port_groups_cdb(param_list.len() as u32)?;
    sg_raw.do_out_command(&cmd, &param_list)
}

pub fn scsi_read_keys<D: ScsiPassThrough + ?Sized>(device: &mut D) -> Result<RegisteredKeys, ScsiError> {
    let alloc_len: u16 = 8192;
    let mut sg_raw = SgRaw::new(device, alloc_len as usize);
    let cmd = build_persistent_reserve_in_cdb(PRIN_READ_KEYS, alloc_len)?;
    let data = sg_raw.do_command(&cmd)?;
    let keys = decode_read_keys(data).map_err(|err| format_err!("decode read keys failed - {err}"))?;
    Ok(keys)
}

pub fn scsi_read_reservation<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
) -> Result<(u32, Option<Reservation>), ScsiError> {
    let alloc_len: u16 = 256;
    let mut sg_raw = SgRaw::new(device, alloc_len as usize);
    let cmd = build_persistent_reserve_in_cdb(PRIN_READ_RESERVATION, alloc_len)?;
    let data = sg_raw.do_command(&cmd)?;
    let res = decode_read_reservation(data)
        .map_err(|err| format_err!("decode read reservation failed - {err}"))?;
    Ok(res)
}

/// PERSISTENT RESERVE OUT with the basic parameter list (scope LU)
pub fn scsi_persistent_reserve_out<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    service_action: u8,
    pr_type: u8,
    key: u64,
    sa_key: u64,
) -> Result<(), ScsiError> {
    let param_list = build_prout_param_list(key, sa_key, false);
    let cmd = build_persistent_reserve_out_cdb(service_action, 0, pr_type, param_list.len() as u32)?;
    let mut sg_raw = SgRaw::new(device, 0);
    sg_raw.do_out_command(&cmd, &param_list)
}

pub fn scsi_read_block_limits<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    mloi: bool,
) -> Result<BlockLimits, ScsiError> {
    let mut sg_raw = SgRaw::new(device, 20);
    let data = sg_raw.do_command(&build_read_block_limits_cdb(mloi))?;
    let limits = decode_block_limits(data).map_err(|err| format_err!("decode block limits failed - {err}"))?;
    Ok(limits)
}

pub fn scsi_read_media_serial_number<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
) -> Result<Vec<u8>, ScsiError> {
    let mut sg_raw = SgRaw::new(device, DEFAULT_ALLOC_LEN);
    let data = sg_raw.do_command(&build_read_media_serial_number_cdb(DEFAULT_ALLOC_LEN as u32)?)?;
    let serial = decode_media_serial_number(data)
        .map_err(|err| format_err!("decode media serial number failed - {err}"))?;
    Ok(serial)
}

pub fn scsi_report_identifying_information<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    info_type: u8,
) -> Result<Vec<u8>, ScsiError> {
    let mut sg_raw = SgRaw::new(device, DEFAULT_ALLOC_LEN);
    let cmd = build_report_identifying_info_cdb(info_type, DEFAULT_ALLOC_LEN as u32)?;
    let data = sg_raw.do_command(&cmd)?;
    let info = decode_identifying_information(data)
        .map_err(|err| format_err!("decode identifying information failed - {err}"))?;
    Ok(info)
}

/// READ into `buffer`, which must hold `params.blocks` blocks
pub fn scsi_read<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    cdb_len: usize,
    params: &RwParams,
    buffer: &mut [u8],
) -> Result<usize, ScsiError> {
    let cmd = build_read_cdb(cdb_len, params)?;
    let mut sg_raw = SgRaw::new(device, 0);
    let data = sg_raw.do_in_command(&cmd, buffer)?;
    Ok(data.len())
}

pub fn scsi_write<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    cdb_len: usize,
    params: &RwParams,
    data: &[u8],
) -> Result<(), ScsiError> {
    let cmd = build_write_cdb(cdb_len, params)?;
    let mut sg_raw = SgRaw::new(device, 0);
    sg_raw.do_out_command(&cmd, data)
}

/// VERIFY without data out (BYTCHK=0), medium verification only
pub fn scsi_verify<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    cdb_len: usize,
    params: &VerifyParams,
) -> Result<(), ScsiError> {
    let cmd = build_verify_cdb(cdb_len, params)?;
    let mut sg_raw = SgRaw::new(device, 0);
    sg_raw.set_timeout(0);
    sg_raw.do_no_data_command(&cmd)
}

/// UNMAP the given `(lba, blocks)` ranges
pub fn scsi_unmap<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
    ranges: &[(u64, u32)],
    anchor: bool,
) -> Result<(), ScsiError> {
    let param_list = build_unmap_param_list(ranges)?;
    let cmd = build_unmap_cdb(anchor, 0, param_list.len() as u16)?;
    let mut sg_raw = SgRaw::new(device, 0);
    sg_raw.do_out_command(&cmd, &param_list)
}

/// Read the ATA general purpose log directory with READ LOG EXT
pub fn ata_read_log_directory<D: ScsiPassThrough + ?Sized>(
    device: &mut D,
) -> Result<AtaLogDirectory, ScsiError> {
    let ata = AtaPassThrough {
        protocol: ATA_PROTOCOL_PIO_DATA_IN,
        extend: true,
        t_dir: true,
        byte_block: true,
        t_length: 2, // sector count field
        count: 1,
        lba: 0, // log address 0, page 0
        command: ATA_READ_LOG_EXT,
        ..Default::default()
    };
    let cmd = build_ata_pass_through_cdb(16, &ata)?;

    let mut sg_raw = SgRaw::new(device, ATA_LOG_DIRECTORY_LEN);
    let data = sg_raw.do_command(&cmd)?;
    let dir = decode_ata_log_directory(data)
        .map_err(|err| format_err!("decode ATA log directory failed - {err}"))?;
    Ok(dir)
}
