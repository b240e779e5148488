//! Names for numeric codes used in SCSI responses

//  SENSE KEYS
pub const SENSE_KEY_NO_SENSE: u8 = 0x00;
pub const SENSE_KEY_RECOVERED_ERROR: u8 = 0x01;
pub const SENSE_KEY_NOT_READY: u8 = 0x02;
pub const SENSE_KEY_MEDIUM_ERROR: u8 = 0x03;
pub const SENSE_KEY_HARDWARE_ERROR: u8 = 0x04;
pub const SENSE_KEY_ILLEGAL_REQUEST: u8 = 0x05;
pub const SENSE_KEY_UNIT_ATTENTION: u8 = 0x06;
pub const SENSE_KEY_DATA_PROTECT: u8 = 0x07;
pub const SENSE_KEY_BLANK_CHECK: u8 = 0x08;
pub const SENSE_KEY_VENDOR_SPECIFIC: u8 = 0x09;
pub const SENSE_KEY_COPY_ABORTED: u8 = 0x0a;
pub const SENSE_KEY_ABORTED_COMMAND: u8 = 0x0b;
pub const SENSE_KEY_VOLUME_OVERFLOW: u8 = 0x0d;
pub const SENSE_KEY_MISCOMPARE: u8 = 0x0e;
pub const SENSE_KEY_COMPLETED: u8 = 0x0f;

// SAM STAT
pub const SAM_STAT_GOOD: u8 = 0x00;
pub const SAM_STAT_CHECK_CONDITION: u8 = 0x02;
pub const SAM_STAT_CONDITION_MET: u8 = 0x04;
pub const SAM_STAT_BUSY: u8 = 0x08;
pub const SAM_STAT_INTERMEDIATE: u8 = 0x10;
pub const SAM_STAT_INTERMEDIATE_CONDITION_MET: u8 = 0x14;
pub const SAM_STAT_RESERVATION_CONFLICT: u8 = 0x18;
pub const SAM_STAT_COMMAND_TERMINATED: u8 = 0x22;
pub const SAM_STAT_TASK_SET_FULL: u8 = 0x28;
pub const SAM_STAT_ACA_ACTIVE: u8 = 0x30;
pub const SAM_STAT_TASK_ABORTED: u8 = 0x40;

/// Sense Key Descriptions
pub const SENSE_KEY_DESCRIPTIONS: [&str; 16] = [
    "No Sense",
    "Recovered Error",
    "Not Ready",
    "Medium Error",
    "Hardware Error",
    "Illegal Request",
    "Unit Attention",
    "Data Protect",
    "Blank Check",
    "Vendor specific",
    "Copy Aborted",
    "Aborted Command",
    "Equal",
    "Volume Overflow",
    "Miscompare",
    "Completed",
];

pub fn sense_key_text(sense_key: u8) -> String {
    SENSE_KEY_DESCRIPTIONS
        .get(sense_key as usize)
        .map(|s| String::from(*s))
        .unwrap_or_else(|| format!("Invalid sense {:02X}", sense_key))
}

/// SCSI status byte text
pub fn scsi_status_text(status: u8) -> String {
    let text = match status & 0x7e {
        SAM_STAT_GOOD => "Good",
        SAM_STAT_CHECK_CONDITION => "Check Condition",
        SAM_STAT_CONDITION_MET => "Condition Met",
        SAM_STAT_BUSY => "Busy",
        SAM_STAT_INTERMEDIATE => "Intermediate (obsolete)",
        SAM_STAT_INTERMEDIATE_CONDITION_MET => "Intermediate-Condition Met (obsolete)",
        SAM_STAT_RESERVATION_CONFLICT => "Reservation Conflict",
        SAM_STAT_COMMAND_TERMINATED => "Command Terminated (obsolete)",
        SAM_STAT_TASK_SET_FULL => "Task Set Full",
        SAM_STAT_ACA_ACTIVE => "ACA Active",
        SAM_STAT_TASK_ABORTED => "Task Aborted",
        _ => return format!("Unknown status [0x{status:x}]"),
    };
    text.to_string()
}

/// Peripheral device type text (see `inquiry` command)
///
/// see <https://en.wikipedia.org/wiki/SCSI_Peripheral_Device_Type>
pub const PERIPHERAL_DEVICE_TYPE_TEXT: [&str; 32] = [
    "Disk Drive",
    "Tape Drive",
    "Printer",
    "Processor",
    "Write-once",
    "CD-ROM", // 05h
    "Scanner",
    "Optical",
    "Medium Changer", // 08h
    "Communications",
    "ASC IT8",
    "ASC IT8",
    "RAID Array",
    "Enclosure Services",
    "Simplified direct-access",
    "Optical card reader/writer",
    "Bridging Expander",
    "Object-based Storage",
    "Automation/Drive Interface",
    "Security manager",
    "Host managed zoned block",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Well known logical unit",
    "Unknown",
];

pub fn peripheral_device_type_text(pdt: u8) -> &'static str {
    PERIPHERAL_DEVICE_TYPE_TEXT[(pdt & 0x1f) as usize]
}

const PROTOCOL_IDENTIFIER_TEXT: [&str; 16] = [
    "Fibre Channel (FCP-4)",
    "Parallel SCSI (SPI-5)",
    "SSA (SSA-S3P)",
    "IEEE 1394 (SBP-3)",
    "Remote Direct Memory Access (SRP)",
    "Internet SCSI (iSCSI)",
    "Serial Attached SCSI Protocol (SPL-4)",
    "Automation/Drive Interface Transport (ADT-2)",
    "AT Attachment Interface (ACS-2)",
    "USB Attached SCSI (UAS-2)",
    "SCSI over PCI Express (SOP)",
    "PCIe",
    "[0xc]",
    "[0xd]",
    "[0xe]",
    "No specific protocol",
];

pub const PROTOCOL_ID_UAS: u8 = 0x9;
pub const PROTOCOL_ID_SOP: u8 = 0xa;

pub fn protocol_identifier_text(proto_id: u8) -> &'static str {
    PROTOCOL_IDENTIFIER_TEXT[(proto_id & 0xf) as usize]
}

const DESIGNATOR_TYPE_TEXT: [&str; 16] = [
    "vendor specific [0x0]",
    "T10 vendor identification",
    "EUI-64 based",
    "NAA",
    "Relative target port",
    "Target port group",
    "Logical unit group",
    "MD5 logical unit identifier",
    "SCSI name string",
    "Protocol specific port identifier",
    "UUID identifier",
    "[0xb]",
    "[0xc]",
    "[0xd]",
    "[0xe]",
    "[0xf]",
];

pub fn designator_type_text(designator_type: u8) -> &'static str {
    DESIGNATOR_TYPE_TEXT[(designator_type & 0xf) as usize]
}

const ASSOCIATION_TEXT: [&str; 4] = [
    "Addressed logical unit",
    "Target port",
    "Target device that contains addressed lu",
    "Reserved [0x3]",
];

pub fn association_text(association: u8) -> &'static str {
    ASSOCIATION_TEXT[(association & 0x3) as usize]
}

const CODE_SET_TEXT: [&str; 16] = [
    "Reserved [0x0]",
    "Binary",
    "ASCII",
    "UTF-8",
    "[0x4]",
    "[0x5]",
    "[0x6]",
    "[0x7]",
    "[0x8]",
    "[0x9]",
    "[0xa]",
    "[0xb]",
    "[0xc]",
    "[0xd]",
    "[0xe]",
    "[0xf]",
];

pub fn code_set_text(code_set: u8) -> &'static str {
    CODE_SET_TEXT[(code_set & 0xf) as usize]
}

/// Asymmetric access state of a target port group
pub fn tpg_asymmetric_access_state_text(state: u8) -> &'static str {
    match state & 0xf {
        0x0 => "active/optimized",
        0x1 => "active/non optimized",
        0x2 => "standby",
        0x3 => "unavailable",
        0x4 => "logical block dependent",
        0xe => "offline",
        0xf => "transitioning between states",
        _ => "unknown",
    }
}

/// Status code of a target port group descriptor
pub fn tpg_status_code_text(status: u8) -> &'static str {
    match status {
        0x0 => "no status available",
        0x1 => "target port asym. state changed by SET TARGET PORT GROUPS command",
        0x2 => "target port asym. state changed by implicit lu behaviour",
        _ => "unknown status code",
    }
}

/// Provisioning status of a GET LBA STATUS descriptor
pub fn provisioning_status_text(status: u8) -> &'static str {
    match status {
        0 => "mapped (or unknown)",
        1 => "deallocated",
        2 => "anchored",
        3 => "mapped",
        4 => "unknown",
        _ => "reserved",
    }
}

/// Physical element health text
pub fn element_health_text(health: u8) -> &'static str {
    match health {
        0x00 => "not reported",
        0x01..=0x63 => "within manufacturer's specification limits",
        0x64 => "at manufacturer's specification limits",
        0x65..=0xcf => "outside manufacturer's specification limits",
        0xd0..=0xfa => "reserved",
        0xfb => "depopulation revocation completed, errors detected",
        0xfc => "depopulation revocation in progress",
        0xfd => "depopulation completed, errors detected",
        0xfe => "depopulation operations in progress",
        0xff => "depopulation completed, no errors",
    }
}

/// Physical element type
pub fn element_type_text(element_type: u8) -> &'static str {
    match element_type {
        1 => "storage",
        _ => "reserved",
    }
}
