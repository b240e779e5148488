//! Command descriptor block builders
//!
//! Every builder either returns a complete CDB of the exact length for the
//! command, or rejects the request. Values are never clamped or truncated
//! to make them fit.

use crate::codec::{put_be16, put_be24, put_be32, put_be48, put_be64, CodecError};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CdbError {
    #[error("unsupported cdb length {0}")]
    InvalidLength(usize),
    #[error("{field} value {value:#x} exceeds maximum {max:#x}")]
    FieldTooLarge {
        field: &'static str,
        value: u64,
        max: u64,
    },
    #[error("invalid {field} value {value}")]
    InvalidValue { field: &'static str, value: u64 },
    #[error("{0} is not supported with this cdb length")]
    UnsupportedFlag(&'static str),
    #[error("there is no {0} command")]
    NoSuchCommand(&'static str),
    #[error("cdb encoding failed - {0}")]
    Codec(#[from] CodecError),
}

pub const TEST_UNIT_READY: u8 = 0x00;
pub const REQUEST_SENSE: u8 = 0x03;
pub const FORMAT_UNIT: u8 = 0x04;
pub const READ_BLOCK_LIMITS: u8 = 0x05;
pub const REASSIGN_BLOCKS: u8 = 0x07;
pub const READ_6: u8 = 0x08;
pub const WRITE_6: u8 = 0x0a;
pub const INQUIRY: u8 = 0x12;
pub const MODE_SENSE_6: u8 = 0x1a;
pub const RECEIVE_DIAGNOSTIC_RESULTS: u8 = 0x1c;
pub const SEND_DIAGNOSTIC: u8 = 0x1d;
pub const READ_CAPACITY_10: u8 = 0x25;
pub const READ_10: u8 = 0x28;
pub const WRITE_10: u8 = 0x2a;
pub const VERIFY_10: u8 = 0x2f;
pub const READ_DEFECT_DATA_10: u8 = 0x37;
pub const WRITE_BUFFER: u8 = 0x3b;
pub const READ_BUFFER_10: u8 = 0x3c;
pub const READ_LONG_10: u8 = 0x3e;
pub const WRITE_LONG_10: u8 = 0x3f;
pub const UNMAP: u8 = 0x42;
pub const LOG_SENSE: u8 = 0x4d;
pub const MODE_SENSE_10: u8 = 0x5a;
pub const PERSISTENT_RESERVE_IN: u8 = 0x5e;
pub const PERSISTENT_RESERVE_OUT: u8 = 0x5f;
pub const VARIABLE_LENGTH: u8 = 0x7f;
pub const ATA_PASS_THROUGH_16: u8 = 0x85;
pub const READ_16: u8 = 0x88;
pub const WRITE_16: u8 = 0x8a;
pub const VERIFY_16: u8 = 0x8f;
pub const READ_BUFFER_16: u8 = 0x9b;
pub const SERVICE_ACTION_IN_16: u8 = 0x9e;
pub const SERVICE_ACTION_OUT_16: u8 = 0x9f;
pub const REPORT_LUNS: u8 = 0xa0;
pub const ATA_PASS_THROUGH_12: u8 = 0xa1;
pub const MAINTENANCE_IN: u8 = 0xa3;
pub const MAINTENANCE_OUT: u8 = 0xa4;
pub const READ_12: u8 = 0xa8;
pub const WRITE_12: u8 = 0xaa;
pub const SERVICE_ACTION_IN_12: u8 = 0xab;
pub const VERIFY_12: u8 = 0xaf;
pub const READ_DEFECT_DATA_12: u8 = 0xb7;

// service actions
pub const SAI_READ_CAPACITY_16: u8 = 0x10;
pub const SAI_READ_LONG_16: u8 = 0x11;
pub const SAI_GET_LBA_STATUS: u8 = 0x12;
pub const SAI_REPORT_REFERRALS: u8 = 0x13;
pub const SAI_GET_PHYSICAL_ELEMENT_STATUS: u8 = 0x17;
pub const SAO_WRITE_LONG_16: u8 = 0x11;
pub const MI_REPORT_IDENTIFYING_INFORMATION: u8 = 0x05;
pub const MI_REPORT_TARGET_PORT_GROUPS: u8 = 0x0a;
pub const MI_REPORT_SUPPORTED_OPCODES: u8 = 0x0c;
pub const MO_SET_TARGET_PORT_GROUPS: u8 = 0x0a;
pub const SAI_READ_MEDIA_SERIAL_NUMBER: u8 = 0x01;
pub const VL_ATA_PASS_THROUGH_32: u16 = 0x1ff0;
pub const VL_GET_LBA_STATUS_32: u16 = 0x0012;

fn check(field: &'static str, value: u64, max: u64) -> Result<(), CdbError> {
    if value > max {
        return Err(CdbError::FieldTooLarge { field, value, max });
    }
    Ok(())
}

/// Parameters shared by READ and WRITE
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RwParams {
    pub lba: u64,
    pub blocks: u32,
    pub dpo: bool,
    pub fua: bool,
    /// RDPROTECT/WRPROTECT (3 bits)
    pub protect: u8,
    pub group: u8,
    /// Command duration limit index (3 bits), 16 byte CDBs only
    pub cdl: u8,
}

impl RwParams {
    pub fn new(lba: u64, blocks: u32) -> Self {
        Self {
            lba,
            blocks,
            ..Default::default()
        }
    }
}

/// Build a READ or WRITE CDB of `cdb_len` (6, 10, 12 or 16) bytes
pub fn build_rw_cdb(cdb_len: usize, write: bool, params: &RwParams) -> Result<Vec<u8>, CdbError> {
    let opcodes = if write {
        [WRITE_6, WRITE_10, WRITE_12, WRITE_16]
    } else {
        [READ_6, READ_10, READ_12, READ_16]
    };

    if cdb_len != 16 && params.cdl != 0 {
        return Err(CdbError::UnsupportedFlag("command duration limit"));
    }
    check("protect", params.protect as u64, 7)?;
    check("group number", params.group as u64, 0x3f)?;
    check("command duration limit", params.cdl as u64, 7)?;

    let mut cdb = vec![0u8; cdb_len];
    match cdb_len {
        6 => {
            if params.dpo {
                return Err(CdbError::UnsupportedFlag("DPO"));
            }
            if params.fua {
                return Err(CdbError::UnsupportedFlag("FUA"));
            }
            if params.protect != 0 {
                return Err(CdbError::UnsupportedFlag("protect"));
            }
            if params.group != 0 {
                return Err(CdbError::UnsupportedFlag("group number"));
            }
            if params.blocks == 0 {
                return Err(CdbError::InvalidValue {
                    field: "transfer length",
                    value: 0,
                });
            }
            check("transfer length", params.blocks as u64, 256)?;
            let last = params.lba.saturating_add(params.blocks as u64 - 1);
            if last > 0x1f_ffff {
                return Err(CdbError::FieldTooLarge {
                    field: "logical block address",
                    value: last,
                    max: 0x1f_ffff,
                });
            }
            cdb[0] = opcodes[0];
            put_be24(&mut cdb, 1, params.lba as u32)?;
            cdb[4] = if params.blocks == 256 {
                0
            } else {
                params.blocks as u8
            };
            return Ok(cdb);
        }
        10 => {
            check("logical block address", params.lba, u32::MAX as u64)?;
            check("transfer length", params.blocks as u64, u16::MAX as u64)?;
            cdb[0] = opcodes[1];
            put_be32(&mut cdb, 2, params.lba as u32)?;
            cdb[6] = params.group;
            put_be16(&mut cdb, 7, params.blocks as u16)?;
        }
        12 => {
            check("logical block address", params.lba, u32::MAX as u64)?;
            cdb[0] = opcodes[2];
            put_be32(&mut cdb, 2, params.lba as u32)?;
            put_be32(&mut cdb, 6, params.blocks)?;
            cdb[10] = params.group;
        }
        16 => {
            cdb[0] = opcodes[3];
            put_be64(&mut cdb, 2, params.lba)?;
            put_be32(&mut cdb, 10, params.blocks)?;
            cdb[14] = params.group;
            if params.cdl & 0x4 != 0 {
                cdb[1] |= 0x01;
            }
            cdb[14] |= (params.cdl & 0x3) << 6;
        }
        other => return Err(CdbError::InvalidLength(other)),
    }

    cdb[1] |= params.protect << 5;
    if params.dpo {
        cdb[1] |= 0x10;
    }
    if params.fua {
        cdb[1] |= 0x08;
    }

    Ok(cdb)
}

pub fn build_read_cdb(cdb_len: usize, params: &RwParams) -> Result<Vec<u8>, CdbError> {
    build_rw_cdb(cdb_len, false, params)
}

pub fn build_write_cdb(cdb_len: usize, params: &RwParams) -> Result<Vec<u8>, CdbError> {
    build_rw_cdb(cdb_len, true, params)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerifyParams {
    pub lba: u64,
    pub blocks: u32,
    /// VRPROTECT (3 bits)
    pub vrprotect: u8,
    pub dpo: bool,
    /// BYTCHK (2 bits)
    pub bytchk: u8,
    pub group: u8,
}

/// Build a VERIFY CDB of 10, 12 or 16 bytes
pub fn build_verify_cdb(cdb_len: usize, params: &VerifyParams) -> Result<Vec<u8>, CdbError> {
    check("vrprotect", params.vrprotect as u64, 7)?;
    check("bytchk", params.bytchk as u64, 3)?;
    check("group number", params.group as u64, 0x3f)?;

    let mut cdb = vec![0u8; cdb_len];
    match cdb_len {
        6 => return Err(CdbError::NoSuchCommand("VERIFY(6)")),
        10 => {
            check("logical block address", params.lba, u32::MAX as u64)?;
            check("verification length", params.blocks as u64, u16::MAX as u64)?;
            cdb[0] = VERIFY_10;
            put_be32(&mut cdb, 2, params.lba as u32)?;
            cdb[6] = params.group;
            put_be16(&mut cdb, 7, params.blocks as u16)?;
        }
        12 => {
            check("logical block address", params.lba, u32::MAX as u64)?;
            cdb[0] = VERIFY_12;
            put_be32(&mut cdb, 2, params.lba as u32)?;
            put_be32(&mut cdb, 6, params.blocks)?;
            cdb[10] = params.group;
        }
        16 => {
            cdb[0] = VERIFY_16;
            put_be64(&mut cdb, 2, params.lba)?;
            put_be32(&mut cdb, 10, params.blocks)?;
            cdb[14] = params.group;
        }
        other => return Err(CdbError::InvalidLength(other)),
    }

    cdb[1] = (params.vrprotect << 5) | (params.bytchk << 1);
    if params.dpo {
        cdb[1] |= 0x10;
    }

    Ok(cdb)
}

/// ATA command tunneled through SAT
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AtaPassThrough {
    /// ATA protocol (4 bits), e.g. 4 for PIO data-in
    pub protocol: u8,
    /// 48-bit command
    pub extend: bool,
    /// OFF_LINE (2 bits)
    pub off_line: u8,
    pub ck_cond: bool,
    pub t_type: bool,
    /// Data from device to host
    pub t_dir: bool,
    pub byte_block: bool,
    /// T_LENGTH (2 bits), where the transfer length is taken from
    pub t_length: u8,
    pub features: u16,
    pub count: u16,
    pub lba: u64,
    pub device: u8,
    pub command: u8,
    /// 32 byte form only
    pub icc: u8,
    /// 32 byte form only
    pub auxiliary: u32,
}

impl AtaPassThrough {
    fn flags(&self) -> u8 {
        let mut flags = (self.off_line & 0x3) << 6 | (self.t_length & 0x3);
        if self.ck_cond {
            flags |= 0x20;
        }
        if self.t_type {
            flags |= 0x10;
        }
        if self.t_dir {
            flags |= 0x08;
        }
        if self.byte_block {
            flags |= 0x04;
        }
        flags
    }
}

/// Build an ATA PASS-THROUGH CDB of 12, 16 or 32 bytes
pub fn build_ata_pass_through_cdb(cdb_len: usize, ata: &AtaPassThrough) -> Result<Vec<u8>, CdbError> {
    check("protocol", ata.protocol as u64, 0xf)?;
    check("off_line", ata.off_line as u64, 3)?;
    check("t_length", ata.t_length as u64, 3)?;
    check("logical block address", ata.lba, 0xffff_ffff_ffff)?;

    if cdb_len != 32 && (ata.icc != 0 || ata.auxiliary != 0) {
        return Err(CdbError::UnsupportedFlag("ICC/auxiliary"));
    }

    let mut cdb = vec![0u8; cdb_len];
    match cdb_len {
        12 => {
            if ata.extend {
                return Err(CdbError::UnsupportedFlag("extend"));
            }
            check("features", ata.features as u64, 0xff)?;
            check("count", ata.count as u64, 0xff)?;
            check("logical block address", ata.lba, 0xff_ffff)?;
            cdb[0] = ATA_PASS_THROUGH_12;
            cdb[1] = ata.protocol << 1;
            cdb[2] = ata.flags();
            cdb[3] = ata.features as u8;
            cdb[4] = ata.count as u8;
            cdb[5] = ata.lba as u8;
            cdb[6] = (ata.lba >> 8) as u8;
            cdb[7] = (ata.lba >> 16) as u8;
            cdb[8] = ata.device;
            cdb[9] = ata.command;
        }
        16 => {
            if !ata.extend {
                check("features", ata.features as u64, 0xff)?;
                check("count", ata.count as u64, 0xff)?;
                check("logical block address", ata.lba, 0xff_ffff)?;
            }
            cdb[0] = ATA_PASS_THROUGH_16;
            cdb[1] = ata.protocol << 1;
            if ata.extend {
                cdb[1] |= 0x01;
            }
            cdb[2] = ata.flags();
            put_be16(&mut cdb, 3, ata.features)?;
            put_be16(&mut cdb, 5, ata.count)?;
            // high and low LBA bytes are interleaved
            cdb[7] = (ata.lba >> 24) as u8;
            cdb[8] = ata.lba as u8;
            cdb[9] = (ata.lba >> 32) as u8;
            cdb[10] = (ata.lba >> 8) as u8;
            cdb[11] = (ata.lba >> 40) as u8;
            cdb[12] = (ata.lba >> 16) as u8;
            cdb[13] = ata.device;
            cdb[14] = ata.command;
        }
        32 => {
            cdb[0] = VARIABLE_LENGTH;
            cdb[7] = 0x18; // additional cdb length
            put_be16(&mut cdb, 8, VL_ATA_PASS_THROUGH_32)?;
            cdb[10] = ata.protocol << 1;
            if ata.extend {
                cdb[10] |= 0x01;
            }
            cdb[11] = ata.flags();
            put_be48(&mut cdb, 14, ata.lba)?;
            put_be16(&mut cdb, 20, ata.features)?;
            put_be16(&mut cdb, 22, ata.count)?;
            cdb[24] = ata.device;
            cdb[25] = ata.command;
            cdb[27] = ata.icc;
            put_be32(&mut cdb, 28, ata.auxiliary)?;
        }
        other => return Err(CdbError::InvalidLength(other)),
    }

    Ok(cdb)
}

/// UNMAP(10)
pub fn build_unmap_cdb(anchor: bool, group: u8, param_len: u16) -> Result<Vec<u8>, CdbError> {
    check("group number", group as u64, 0x3f)?;
    let mut cdb = vec![0u8; 10];
    cdb[0] = UNMAP;
    if anchor {
        cdb[1] = 0x01;
    }
    cdb[6] = group;
    put_be16(&mut cdb, 7, param_len)?;
    Ok(cdb)
}

/// UNMAP parameter list for `(lba, blocks)` ranges
pub fn build_unmap_param_list(ranges: &[(u64, u32)]) -> Result<Vec<u8>, CdbError> {
    let desc_len = ranges.len() * 16;
    check("unmap block descriptor data length", desc_len as u64, 0xffff - 6)?;

    let mut list = vec![0u8; 8 + desc_len];
    put_be16(&mut list, 0, (desc_len + 6) as u16)?;
    put_be16(&mut list, 2, desc_len as u16)?;
    for (i, (lba, blocks)) in ranges.iter().enumerate() {
        let offset = 8 + i * 16;
        put_be64(&mut list, offset, *lba)?;
        put_be32(&mut list, offset + 8, *blocks)?;
    }
    Ok(list)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormatUnitParams {
    /// FMTPINFO (2 bits)
    pub fmtpinfo: u8,
    pub longlist: bool,
    pub fmtdata: bool,
    pub cmplst: bool,
    /// Defect list format (3 bits)
    pub defect_list_format: u8,
    /// FFMT (2 bits)
    pub ffmt: u8,
}

/// FORMAT UNIT(6)
pub fn build_format_unit_cdb(params: &FormatUnitParams) -> Result<Vec<u8>, CdbError> {
    check("fmtpinfo", params.fmtpinfo as u64, 3)?;
    check("defect list format", params.defect_list_format as u64, 7)?;
    check("ffmt", params.ffmt as u64, 3)?;

    let mut cdb = vec![0u8; 6];
    cdb[0] = FORMAT_UNIT;
    cdb[1] = (params.fmtpinfo << 6) | params.defect_list_format;
    if params.longlist {
        cdb[1] |= 0x20;
    }
    if params.fmtdata {
        cdb[1] |= 0x10;
    }
    if params.cmplst {
        cdb[1] |= 0x08;
    }
    cdb[4] = params.ffmt;
    Ok(cdb)
}

/// PERSISTENT RESERVE IN, service action 0 is READ KEYS
pub fn build_persistent_reserve_in_cdb(service_action: u8, alloc_len: u16) -> Result<Vec<u8>, CdbError> {
    check("service action", service_action as u64, 0x1f)?;
    let mut cdb = vec![0u8; 10];
    cdb[0] = PERSISTENT_RESERVE_IN;
    cdb[1] = service_action;
    put_be16(&mut cdb, 7, alloc_len)?;
    Ok(cdb)
}

/// PERSISTENT RESERVE OUT
pub fn build_persistent_reserve_out_cdb(
    service_action: u8,
    scope: u8,
    pr_type: u8,
    param_len: u32,
) -> Result<Vec<u8>, CdbError> {
    check("service action", service_action as u64, 0x1f)?;
    check("scope", scope as u64, 0xf)?;
    check("type", pr_type as u64, 0xf)?;
    let mut cdb = vec![0u8; 10];
    cdb[0] = PERSISTENT_RESERVE_OUT;
    cdb[1] = service_action;
    cdb[2] = (scope << 4) | pr_type;
    put_be32(&mut cdb, 5, param_len)?;
    Ok(cdb)
}

/// GET LBA STATUS(16)
pub fn build_get_lba_status16_cdb(lba: u64, alloc_len: u32, report_type: u8) -> Result<Vec<u8>, CdbError> {
    let mut cdb = vec![0u8; 16];
    cdb[0] = SERVICE_ACTION_IN_16;
    cdb[1] = SAI_GET_LBA_STATUS;
    put_be64(&mut cdb, 2, lba)?;
    put_be32(&mut cdb, 10, alloc_len)?;
    cdb[14] = report_type;
    Ok(cdb)
}

/// GET LBA STATUS(32)
pub fn build_get_lba_status32_cdb(
    lba: u64,
    scan_len: u32,
    element_id: u32,
    alloc_len: u32,
    report_type: u8,
) -> Result<Vec<u8>, CdbError> {
    let mut cdb = vec![0u8; 32];
    cdb[0] = VARIABLE_LENGTH;
    cdb[7] = 0x18;
    put_be16(&mut cdb, 8, VL_GET_LBA_STATUS_32)?;
    cdb[10] = report_type;
    put_be64(&mut cdb, 12, lba)?;
    put_be32(&mut cdb, 20, scan_len)?;
    put_be32(&mut cdb, 24, element_id)?;
    put_be32(&mut cdb, 28, alloc_len)?;
    Ok(cdb)
}

/// GET PHYSICAL ELEMENT STATUS
pub fn build_get_physical_element_status_cdb(
    starting_element: u32,
    alloc_len: u32,
    filter: u8,
    report_type: u8,
) -> Result<Vec<u8>, CdbError> {
    check("filter", filter as u64, 3)?;
    check("report type", report_type as u64, 0xf)?;
    let mut cdb = vec![0u8; 16];
    cdb[0] = SERVICE_ACTION_IN_16;
    cdb[1] = SAI_GET_PHYSICAL_ELEMENT_STATUS;
    put_be32(&mut cdb, 6, starting_element)?;
    put_be32(&mut cdb, 10, alloc_len)?;
    cdb[14] = (filter << 6) | report_type;
    Ok(cdb)
}

/// REPORT TARGET PORT GROUPS, optionally asking for the extended header
pub fn build_report_target_port_groups_cdb(extended: bool, alloc_len: u32) -> Result<Vec<u8>, CdbError> {
    let mut cdb = vec![0u8; 12];
    cdb[0] = MAINTENANCE_IN;
    cdb[1] = MI_REPORT_TARGET_PORT_GROUPS;
    if extended {
        cdb[1] |= 1 << 5;
    }
    put_be32(&mut cdb, 6, alloc_len)?;
    Ok(cdb)
}

/// SET TARGET PORT GROUPS
pub fn build_set_target_port_groups_cdb(param_len: u32) -> Result<Vec<u8>, CdbError> {
    let mut cdb = vec![0u8; 12];
    cdb[0] = MAINTENANCE_OUT;
    cdb[1] = MO_SET_TARGET_PORT_GROUPS;
    put_be32(&mut cdb, 6, param_len)?;
    Ok(cdb)
}

/// SET TARGET PORT GROUPS parameter list for `(asymmetric access state, group id)`
pub fn build_set_target_port_groups_param_list(groups: &[(u8, u16)]) -> Result<Vec<u8>, CdbError> {
    let mut list = vec![0u8; 4 + groups.len() * 4];
    for (i, (state, id)) in groups.iter().enumerate() {
        check("asymmetric access state", *state as u64, 0xf)?;
        let offset = 4 + i * 4;
        list[offset] = *state;
        put_be16(&mut list, offset + 2, *id)?;
    }
    Ok(list)
}

/// READ LONG(10) or READ LONG(16)
pub fn build_read_long_cdb(
    cdb_len: usize,
    pblock: bool,
    correct: bool,
    lba: u64,
    xfer_len: u16,
) -> Result<Vec<u8>, CdbError> {
    let mut cdb = vec![0u8; cdb_len];
    match cdb_len {
        10 => {
            check("logical block address", lba, u32::MAX as u64)?;
            cdb[0] = READ_LONG_10;
            if pblock {
                cdb[1] |= 0x04;
            }
            if correct {
                cdb[1] |= 0x02;
            }
            put_be32(&mut cdb, 2, lba as u32)?;
            put_be16(&mut cdb, 7, xfer_len)?;
        }
        16 => {
            cdb[0] = SERVICE_ACTION_IN_16;
            cdb[1] = SAI_READ_LONG_16;
            put_be64(&mut cdb, 2, lba)?;
            put_be16(&mut cdb, 12, xfer_len)?;
            if pblock {
                cdb[14] |= 0x02;
            }
            if correct {
                cdb[14] |= 0x01;
            }
        }
        other => return Err(CdbError::InvalidLength(other)),
    }
    Ok(cdb)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteLongParams {
    pub cor_dis: bool,
    pub wr_uncor: bool,
    pub pblock: bool,
    pub lba: u64,
    pub xfer_len: u16,
}

/// WRITE LONG(10) or WRITE LONG(16)
pub fn build_write_long_cdb(cdb_len: usize, params: &WriteLongParams) -> Result<Vec<u8>, CdbError> {
    let mut flags = 0u8;
    if params.cor_dis {
        flags |= 0x80;
    }
    if params.wr_uncor {
        flags |= 0x40;
    }
    if params.pblock {
        flags |= 0x20;
    }

    let mut cdb = vec![0u8; cdb_len];
    match cdb_len {
        10 => {
            check("logical block address", params.lba, u32::MAX as u64)?;
            cdb[0] = WRITE_LONG_10;
            cdb[1] = flags;
            put_be32(&mut cdb, 2, params.lba as u32)?;
            put_be16(&mut cdb, 7, params.xfer_len)?;
        }
        16 => {
            cdb[0] = SERVICE_ACTION_OUT_16;
            cdb[1] = flags | SAO_WRITE_LONG_16;
            put_be64(&mut cdb, 2, params.lba)?;
            put_be16(&mut cdb, 12, params.xfer_len)?;
        }
        other => return Err(CdbError::InvalidLength(other)),
    }
    Ok(cdb)
}

/// READ BUFFER(10) or READ BUFFER(16)
pub fn build_read_buffer_cdb(
    cdb_len: usize,
    mode: u8,
    buffer_id: u8,
    offset: u64,
    alloc_len: u32,
) -> Result<Vec<u8>, CdbError> {
    check("mode", mode as u64, 0x1f)?;
    let mut cdb = vec![0u8; cdb_len];
    match cdb_len {
        10 => {
            check("buffer offset", offset, 0xff_ffff)?;
            check("allocation length", alloc_len as u64, 0xff_ffff)?;
            cdb[0] = READ_BUFFER_10;
            cdb[1] = mode;
            cdb[2] = buffer_id;
            put_be24(&mut cdb, 3, offset as u32)?;
            put_be24(&mut cdb, 6, alloc_len)?;
        }
        16 => {
            cdb[0] = READ_BUFFER_16;
            cdb[1] = mode;
            put_be64(&mut cdb, 2, offset)?;
            put_be32(&mut cdb, 10, alloc_len)?;
            cdb[14] = buffer_id;
        }
        other => return Err(CdbError::InvalidLength(other)),
    }
    Ok(cdb)
}

/// WRITE BUFFER(10)
pub fn build_write_buffer_cdb(
    mode: u8,
    mode_specific: u8,
    buffer_id: u8,
    offset: u32,
    param_len: u32,
) -> Result<Vec<u8>, CdbError> {
    check("mode", mode as u64, 0x1f)?;
    check("mode specific", mode_specific as u64, 7)?;
    check("buffer offset", offset as u64, 0xff_ffff)?;
    check("parameter list length", param_len as u64, 0xff_ffff)?;
    let mut cdb = vec![0u8; 10];
    cdb[0] = WRITE_BUFFER;
    cdb[1] = (mode_specific << 5) | mode;
    cdb[2] = buffer_id;
    put_be24(&mut cdb, 3, offset)?;
    put_be24(&mut cdb, 6, param_len)?;
    Ok(cdb)
}

/// RECEIVE DIAGNOSTIC RESULTS
pub fn build_receive_diagnostic_cdb(pcv: bool, page_code: u8, alloc_len: u16) -> Result<Vec<u8>, CdbError> {
    let mut cdb = vec![0u8; 6];
    cdb[0] = RECEIVE_DIAGNOSTIC_RESULTS;
    if pcv {
        cdb[1] = 0x01;
    }
    cdb[2] = page_code;
    put_be16(&mut cdb, 3, alloc_len)?;
    Ok(cdb)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SendDiagnosticParams {
    /// SELF-TEST CODE (3 bits)
    pub self_test_code: u8,
    pub pf: bool,
    pub self_test: bool,
    pub devoffl: bool,
    pub unitoffl: bool,
    pub param_len: u16,
}

/// SEND DIAGNOSTIC
pub fn build_send_diagnostic_cdb(params: &SendDiagnosticParams) -> Result<Vec<u8>, CdbError> {
    check("self-test code", params.self_test_code as u64, 7)?;
    if params.self_test && params.self_test_code != 0 {
        return Err(CdbError::UnsupportedFlag("self-test code together with SELFTEST"));
    }
    let mut cdb = vec![0u8; 6];
    cdb[0] = SEND_DIAGNOSTIC;
    cdb[1] = params.self_test_code << 5;
    if params.pf {
        cdb[1] |= 0x10;
    }
    if params.self_test {
        cdb[1] |= 0x04;
    }
    if params.devoffl {
        cdb[1] |= 0x02;
    }
    if params.unitoffl {
        cdb[1] |= 0x01;
    }
    put_be16(&mut cdb, 3, params.param_len)?;
    Ok(cdb)
}

/// REPORT LUNS
pub fn build_report_luns_cdb(select_report: u8, alloc_len: u32) -> Result<Vec<u8>, CdbError> {
    let mut cdb = vec![0u8; 12];
    cdb[0] = REPORT_LUNS;
    cdb[2] = select_report;
    put_be32(&mut cdb, 6, alloc_len)?;
    Ok(cdb)
}

/// REPORT SUPPORTED OPERATION CODES
pub fn build_report_supported_opcodes_cdb(
    rctd: bool,
    reporting_options: u8,
    opcode: u8,
    service_action: u16,
    alloc_len: u32,
) -> Result<Vec<u8>, CdbError> {
    check("reporting options", reporting_options as u64, 7)?;
    let mut cdb = vec![0u8; 12];
    cdb[0] = MAINTENANCE_IN;
    cdb[1] = MI_REPORT_SUPPORTED_OPCODES;
    cdb[2] = reporting_options;
    if rctd {
        cdb[2] |= 0x80;
    }
    cdb[3] = opcode;
    put_be16(&mut cdb, 4, service_action)?;
    put_be32(&mut cdb, 6, alloc_len)?;
    Ok(cdb)
}

/// REPORT IDENTIFYING INFORMATION
pub fn build_report_identifying_info_cdb(info_type: u8, alloc_len: u32) -> Result<Vec<u8>, CdbError> {
    check("identifying information type", info_type as u64, 0x7f)?;
    let mut cdb = vec![0u8; 12];
    cdb[0] = MAINTENANCE_IN;
    cdb[1] = MI_REPORT_IDENTIFYING_INFORMATION;
    put_be32(&mut cdb, 6, alloc_len)?;
    cdb[10] = info_type << 1;
    Ok(cdb)
}

/// READ BLOCK LIMITS, `mloi` asks for the maximum logical object identifier
pub fn build_read_block_limits_cdb(mloi: bool) -> Vec<u8> {
    let mut cdb = vec![0u8; 6];
    cdb[0] = READ_BLOCK_LIMITS;
    if mloi {
        cdb[1] = 0x01;
    }
    cdb
}

/// READ MEDIA SERIAL NUMBER
pub fn build_read_media_serial_number_cdb(alloc_len: u32) -> Result<Vec<u8>, CdbError> {
    let mut cdb = vec![0u8; 12];
    cdb[0] = SERVICE_ACTION_IN_12;
    cdb[1] = SAI_READ_MEDIA_SERIAL_NUMBER;
    put_be32(&mut cdb, 6, alloc_len)?;
    Ok(cdb)
}

/// READ DEFECT DATA(10) or READ DEFECT DATA(12)
pub fn build_read_defect_data_cdb(
    cdb_len: usize,
    req_plist: bool,
    req_glist: bool,
    list_format: u8,
    alloc_len: u32,
) -> Result<Vec<u8>, CdbError> {
    check("defect list format", list_format as u64, 7)?;
    let mut flags = list_format;
    if req_plist {
        flags |= 0x10;
    }
    if req_glist {
        flags |= 0x08;
    }

    let mut cdb = vec![0u8; cdb_len];
    match cdb_len {
        10 => {
            check("allocation length", alloc_len as u64, u16::MAX as u64)?;
            cdb[0] = READ_DEFECT_DATA_10;
            cdb[2] = flags;
            put_be16(&mut cdb, 7, alloc_len as u16)?;
        }
        12 => {
            cdb[0] = READ_DEFECT_DATA_12;
            cdb[1] = flags;
            put_be32(&mut cdb, 6, alloc_len)?;
        }
        other => return Err(CdbError::InvalidLength(other)),
    }
    Ok(cdb)
}

/// REASSIGN BLOCKS
pub fn build_reassign_blocks_cdb(longlba: bool, longlist: bool) -> Vec<u8> {
    let mut cdb = vec![0u8; 6];
    cdb[0] = REASSIGN_BLOCKS;
    if longlba {
        cdb[1] |= 0x02;
    }
    if longlist {
        cdb[1] |= 0x01;
    }
    cdb
}

/// REPORT REFERRALS
pub fn build_report_referrals_cdb(lba: u64, alloc_len: u32, one_segment: bool) -> Result<Vec<u8>, CdbError> {
    let mut cdb = vec![0u8; 16];
    cdb[0] = SERVICE_ACTION_IN_16;
    cdb[1] = SAI_REPORT_REFERRALS;
    put_be64(&mut cdb, 2, lba)?;
    put_be32(&mut cdb, 10, alloc_len)?;
    if one_segment {
        cdb[14] = 0x01;
    }
    Ok(cdb)
}

/// INQUIRY, standard data or a VPD page
pub fn build_inquiry_cdb(evpd: bool, page_code: u8, alloc_len: u16) -> Result<Vec<u8>, CdbError> {
    if !evpd && page_code != 0 {
        return Err(CdbError::InvalidValue {
            field: "page code without EVPD",
            value: page_code as u64,
        });
    }
    let mut cdb = vec![0u8; 6];
    cdb[0] = INQUIRY;
    if evpd {
        cdb[1] = 0x01;
    }
    cdb[2] = page_code;
    put_be16(&mut cdb, 3, alloc_len)?;
    Ok(cdb)
}

/// REQUEST SENSE, `desc` asks for descriptor format
pub fn build_request_sense_cdb(desc: bool, alloc_len: u8) -> Vec<u8> {
    let mut cdb = vec![REQUEST_SENSE, 0, 0, 0, alloc_len, 0];
    if desc {
        cdb[1] = 0x01;
    }
    cdb
}

pub fn build_test_unit_ready_cdb() -> Vec<u8> {
    vec![TEST_UNIT_READY, 0, 0, 0, 0, 0]
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModeSenseParams {
    /// MODE SENSE(10) instead of MODE SENSE(6)
    pub long: bool,
    /// Disable block descriptors
    pub dbd: bool,
    /// Page control (2 bits): current, changeable, default, saved
    pub page_control: u8,
    pub page_code: u8,
    pub sub_page_code: u8,
    pub alloc_len: u16,
}

/// MODE SENSE(6) or MODE SENSE(10)
pub fn build_mode_sense_cdb(params: &ModeSenseParams) -> Result<Vec<u8>, CdbError> {
    check("page control", params.page_control as u64, 3)?;
    check("page code", params.page_code as u64, 0x3f)?;

    let mut cdb = if params.long {
        vec![0u8; 10]
    } else {
        check("allocation length", params.alloc_len as u64, 0xff)?;
        vec![0u8; 6]
    };
    cdb[0] = if params.long { MODE_SENSE_10 } else { MODE_SENSE_6 };
    if params.dbd {
        cdb[1] = 8; // DBD=1 (Disable Block Descriptors)
    }
    cdb[2] = (params.page_control << 6) | params.page_code;
    cdb[3] = params.sub_page_code;
    if params.long {
        put_be16(&mut cdb, 7, params.alloc_len)?;
    } else {
        cdb[4] = params.alloc_len as u8;
    }
    Ok(cdb)
}

/// LOG SENSE
pub fn build_log_sense_cdb(
    page_control: u8,
    page_code: u8,
    sub_page_code: u8,
    param_pointer: u16,
    alloc_len: u16,
) -> Result<Vec<u8>, CdbError> {
    check("page control", page_control as u64, 3)?;
    check("page code", page_code as u64, 0x3f)?;
    let mut cdb = vec![0u8; 10];
    cdb[0] = LOG_SENSE;
    cdb[2] = (page_control << 6) | page_code;
    cdb[3] = sub_page_code;
    put_be16(&mut cdb, 5, param_pointer)?;
    put_be16(&mut cdb, 7, alloc_len)?;
    Ok(cdb)
}

/// READ CAPACITY(10)
pub fn build_read_capacity10_cdb() -> Vec<u8> {
    let mut cdb = vec![0u8; 10];
    cdb[0] = READ_CAPACITY_10;
    cdb
}

/// READ CAPACITY(16)
pub fn build_read_capacity16_cdb(alloc_len: u32) -> Result<Vec<u8>, CdbError> {
    let mut cdb = vec![0u8; 16];
    cdb[0] = SERVICE_ACTION_IN_16;
    cdb[1] = SAI_READ_CAPACITY_16;
    put_be32(&mut cdb, 10, alloc_len)?;
    Ok(cdb)
}

/// Expected CDB length for an operation code, `None` for the variable
/// length form and vendor specific groups.
pub fn cdb_length_for_opcode(opcode: u8) -> Option<usize> {
    match opcode >> 5 {
        0 => Some(6),
        1 | 2 => Some(10),
        4 => Some(16),
        5 => Some(12),
        _ => None,
    }
}

/// Returns true if `cdb` has a valid length for its operation code
pub fn is_scsi_cdb(cdb: &[u8]) -> bool {
    let Some(&opcode) = cdb.first() else {
        return false;
    };
    match cdb.len() {
        6 | 10 | 12 | 16 => true,
        len if len >= 8 && opcode == VARIABLE_LENGTH => {
            // additional cdb length at byte 7
            len == 8 + cdb[7] as usize && len % 4 == 0
        }
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::{get_be16, get_be24, get_be32, get_be48, get_be64};
    use anyhow::Error;

    #[test]
    fn read16_field_layout() -> Result<(), Error> {
        let cdb = build_read_cdb(16, &RwParams::new(0x1_0000_0000, 128))?;
        assert_eq!(cdb.len(), 16);
        assert_eq!(cdb[0], READ_16);
        assert_eq!(&cdb[2..10], &[0, 0, 0, 1, 0, 0, 0, 0]);
        assert_eq!(&cdb[10..14], &[0, 0, 0, 0x80]);
        Ok(())
    }

    #[test]
    fn rw_round_trip_all_lengths() -> Result<(), Error> {
        let params = RwParams {
            lba: 0x1234,
            blocks: 200,
            dpo: true,
            fua: true,
            protect: 5,
            group: 0x11,
            cdl: 0,
        };

        let cdb = build_write_cdb(10, &params)?;
        assert_eq!(cdb[0], WRITE_10);
        assert_eq!(cdb[1], (5 << 5) | 0x10 | 0x08);
        assert_eq!(get_be32(&cdb, 2)?, 0x1234);
        assert_eq!(cdb[6], 0x11);
        assert_eq!(get_be16(&cdb, 7)?, 200);

        let cdb = build_read_cdb(12, &params)?;
        assert_eq!(cdb[0], READ_12);
        assert_eq!(get_be32(&cdb, 2)?, 0x1234);
        assert_eq!(get_be32(&cdb, 6)?, 200);
        assert_eq!(cdb[10], 0x11);

        let cdb = build_read_cdb(16, &RwParams { cdl: 7, ..params.clone() })?;
        assert_eq!(get_be64(&cdb, 2)?, 0x1234);
        assert_eq!(get_be32(&cdb, 10)?, 200);
        assert_eq!(cdb[1] & 0x01, 0x01);
        assert_eq!(cdb[14], 0xc0 | 0x11);

        let cdb = build_read_cdb(6, &RwParams::new(0x1f_ff00, 256))?;
        assert_eq!(cdb, vec![READ_6, 0x1f, 0xff, 0x00, 0, 0]);
        assert_eq!(get_be24(&cdb, 1)?, 0x1f_ff00);
        Ok(())
    }

    #[test]
    fn rw_length_limits() {
        assert_eq!(
            build_read_cdb(6, &RwParams::new(0, 257)),
            Err(CdbError::FieldTooLarge {
                field: "transfer length",
                value: 257,
                max: 256
            })
        );
        assert!(matches!(
            build_read_cdb(10, &RwParams::new(0, 0x10001)),
            Err(CdbError::FieldTooLarge { value: 0x10001, .. })
        ));
        assert!(build_read_cdb(10, &RwParams::new(0x1_0000_0000, 1)).is_err());
        assert!(build_read_cdb(6, &RwParams::new(0x1f_ffff, 2)).is_err());
        assert!(build_read_cdb(6, &RwParams::new(0, 0)).is_err());
        assert_eq!(
            build_read_cdb(6, &RwParams { fua: true, ..RwParams::new(0, 1) }),
            Err(CdbError::UnsupportedFlag("FUA"))
        );
        assert_eq!(
            build_read_cdb(10, &RwParams { cdl: 1, ..RwParams::new(0, 1) }),
            Err(CdbError::UnsupportedFlag("command duration limit"))
        );
        assert_eq!(
            build_read_cdb(8, &RwParams::new(0, 1)),
            Err(CdbError::InvalidLength(8))
        );
    }

    #[test]
    fn verify_variants() -> Result<(), Error> {
        let params = VerifyParams {
            lba: 0x55,
            blocks: 3,
            vrprotect: 1,
            dpo: true,
            bytchk: 1,
            group: 0,
        };
        assert_eq!(
            build_verify_cdb(6, &params),
            Err(CdbError::NoSuchCommand("VERIFY(6)"))
        );

        let cdb = build_verify_cdb(10, &params)?;
        assert_eq!(cdb[0], VERIFY_10);
        assert_eq!(cdb[1], 0x20 | 0x10 | 0x02);
        assert_eq!(get_be32(&cdb, 2)?, 0x55);
        assert_eq!(get_be16(&cdb, 7)?, 3);

        let cdb = build_verify_cdb(16, &params)?;
        assert_eq!(cdb[0], VERIFY_16);
        assert_eq!(get_be64(&cdb, 2)?, 0x55);
        assert_eq!(get_be32(&cdb, 10)?, 3);
        Ok(())
    }

    #[test]
    fn ata_pass_through_layouts() -> Result<(), Error> {
        // IDENTIFY DEVICE, PIO data-in
        let identify = AtaPassThrough {
            protocol: 4,
            t_dir: true,
            byte_block: true,
            t_length: 2,
            count: 1,
            command: 0xec,
            ..Default::default()
        };
        let cdb = build_ata_pass_through_cdb(12, &identify)?;
        assert_eq!(cdb, vec![0xa1, 0x08, 0x0e, 0, 1, 0, 0, 0, 0, 0xec, 0, 0]);

        let read_log = AtaPassThrough {
            protocol: 4,
            extend: true,
            t_dir: true,
            byte_block: true,
            t_length: 2,
            count: 1,
            lba: 0x0000_1234_5678,
            command: 0x2f,
            ..Default::default()
        };
        let cdb = build_ata_pass_through_cdb(16, &read_log)?;
        assert_eq!(cdb[0], ATA_PASS_THROUGH_16);
        assert_eq!(cdb[1], 0x09);
        assert_eq!(get_be16(&cdb, 5)?, 1);
        assert_eq!(&cdb[7..13], &[0x12, 0x78, 0x00, 0x56, 0x00, 0x34]);
        assert_eq!(cdb[14], 0x2f);

        let cdb = build_ata_pass_through_cdb(
            32,
            &AtaPassThrough {
                icc: 3,
                auxiliary: 0xdead_beef,
                ..read_log.clone()
            },
        )?;
        assert_eq!(cdb.len(), 32);
        assert!(is_scsi_cdb(&cdb));
        assert_eq!(get_be16(&cdb, 8)?, VL_ATA_PASS_THROUGH_32);
        assert_eq!(get_be48(&cdb, 14)?, 0x0000_1234_5678);
        assert_eq!(get_be16(&cdb, 22)?, 1);
        assert_eq!(cdb[25], 0x2f);
        assert_eq!(cdb[27], 3);
        assert_eq!(get_be32(&cdb, 28)?, 0xdead_beef);

        assert_eq!(
            build_ata_pass_through_cdb(12, &read_log),
            Err(CdbError::UnsupportedFlag("extend"))
        );
        assert!(build_ata_pass_through_cdb(16, &AtaPassThrough { count: 0x100, ..identify }).is_err());
        Ok(())
    }

    #[test]
    fn misc_service_actions() -> Result<(), Error> {
        let cdb = build_get_lba_status32_cdb(0x10, 0x20, 0x30, 0x40, 2)?;
        assert!(is_scsi_cdb(&cdb));
        assert_eq!(get_be16(&cdb, 8)?, VL_GET_LBA_STATUS_32);
        assert_eq!(cdb[10], 2);
        assert_eq!(get_be64(&cdb, 12)?, 0x10);
        assert_eq!(get_be32(&cdb, 20)?, 0x20);
        assert_eq!(get_be32(&cdb, 24)?, 0x30);
        assert_eq!(get_be32(&cdb, 28)?, 0x40);

        let cdb = build_get_lba_status16_cdb(0x99, 4096, 1)?;
        assert_eq!(&cdb[..2], &[SERVICE_ACTION_IN_16, SAI_GET_LBA_STATUS]);
        assert_eq!(get_be64(&cdb, 2)?, 0x99);
        assert_eq!(get_be32(&cdb, 10)?, 4096);

        let cdb = build_report_target_port_groups_cdb(true, 1024)?;
        assert_eq!(cdb[1], 0x2a);
        assert_eq!(get_be32(&cdb, 6)?, 1024);

        let cdb = build_set_target_port_groups_cdb(12)?;
        assert_eq!(&cdb[..2], &[MAINTENANCE_OUT, MO_SET_TARGET_PORT_GROUPS]);
        assert_eq!(get_be32(&cdb, 6)?, 12);

        let cdb = build_report_luns_cdb(2, 0x1_0000)?;
        assert_eq!(&cdb[..3], &[REPORT_LUNS, 0, 2]);
        assert_eq!(get_be32(&cdb, 6)?, 0x1_0000);

        let cdb = build_read_media_serial_number_cdb(512)?;
        assert_eq!(&cdb[..2], &[SERVICE_ACTION_IN_12, SAI_READ_MEDIA_SERIAL_NUMBER]);
        assert_eq!(get_be32(&cdb, 6)?, 512);

        let cdb = build_report_referrals_cdb(0x1234, 64, true)?;
        assert_eq!(get_be64(&cdb, 2)?, 0x1234);
        assert_eq!(get_be32(&cdb, 10)?, 64);
        assert_eq!(cdb[14], 0x01);

        let cdb = build_read_capacity16_cdb(32)?;
        assert_eq!(&cdb[..2], &[SERVICE_ACTION_IN_16, SAI_READ_CAPACITY_16]);
        assert_eq!(get_be32(&cdb, 10)?, 32);

        let cdb = build_receive_diagnostic_cdb(true, 0x80, 0x1ff)?;
        assert_eq!(&cdb[..3], &[RECEIVE_DIAGNOSTIC_RESULTS, 0x01, 0x80]);
        assert_eq!(get_be16(&cdb, 3)?, 0x1ff);

        let cdb = build_persistent_reserve_out_cdb(1, 0, 5, 24)?;
        assert_eq!(&cdb[..3], &[PERSISTENT_RESERVE_OUT, 1, 5]);
        assert_eq!(get_be32(&cdb, 5)?, 24);

        let cdb = build_read_buffer_cdb(10, 2, 1, 0x10, 0x200)?;
        assert_eq!(get_be24(&cdb, 3)?, 0x10);
        assert_eq!(get_be24(&cdb, 6)?, 0x200);
        assert!(build_read_buffer_cdb(10, 2, 1, 0x100_0000, 0x200).is_err());

        let cdb = build_write_long_cdb(
            16,
            &WriteLongParams {
                wr_uncor: true,
                lba: 7,
                ..Default::default()
            },
        )?;
        assert_eq!(&cdb[..2], &[SERVICE_ACTION_OUT_16, 0x51]);
        assert_eq!(get_be64(&cdb, 2)?, 7);

        assert!(build_read_defect_data_cdb(10, true, true, 5, 0x1_0000).is_err());
        assert_eq!(build_read_defect_data_cdb(12, true, false, 5, 0x1_0000)?[1], 0x15);

        let cdb = build_report_identifying_info_cdb(0x7f, 256)?;
        assert_eq!(cdb[10], 0xfe);
        Ok(())
    }

    #[test]
    fn unmap_parameter_list() -> Result<(), Error> {
        let list = build_unmap_param_list(&[(0x1000, 8), (0x2000, 16)])?;
        assert_eq!(list.len(), 8 + 32);
        assert_eq!(get_be16(&list, 0)?, 38);
        assert_eq!(get_be16(&list, 2)?, 32);
        assert_eq!(get_be64(&list, 24)?, 0x2000);
        assert_eq!(get_be32(&list, 32)?, 16);

        let cdb = build_unmap_cdb(true, 0, list.len() as u16)?;
        assert_eq!(cdb[1], 1);
        assert_eq!(get_be16(&cdb, 7)?, 40);
        Ok(())
    }

    #[test]
    fn cdb_validation() {
        assert!(is_scsi_cdb(&build_test_unit_ready_cdb()));
        assert!(is_scsi_cdb(&[0u8; 12]));
        assert!(!is_scsi_cdb(&[0u8; 7]));
        assert!(!is_scsi_cdb(&[]));
        let mut var = vec![0u8; 32];
        var[0] = VARIABLE_LENGTH;
        assert!(!is_scsi_cdb(&var));
        var[7] = 0x18;
        assert!(is_scsi_cdb(&var));

        assert_eq!(cdb_length_for_opcode(READ_6), Some(6));
        assert_eq!(cdb_length_for_opcode(READ_10), Some(10));
        assert_eq!(cdb_length_for_opcode(READ_12), Some(12));
        assert_eq!(cdb_length_for_opcode(READ_16), Some(16));
        assert_eq!(cdb_length_for_opcode(VARIABLE_LENGTH), None);
    }
}
