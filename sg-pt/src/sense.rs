//! Sense data decoding
//!
//! Handles fixed (0x70/0x71) and descriptor (0x72/0x73) format sense. The
//! declared additional length is always clamped to the supplied buffer;
//! anything cut off is reported through [`SenseData::truncated`] (and
//! [`SenseDescriptor::Undecoded`] for a partial descriptor), never read.

use sg_json::{NodeId, Separator, SgjState};

use crate::asc_table::get_asc_ascq_string;
use crate::codec::{get_be16, get_be32, get_be64};
use crate::designator::Designator;
use crate::sg_pt::SenseInfo;
use crate::text::*;
use crate::{hex_string, need_len, DecodeError};

/// Nesting limit for forwarded sense data descriptors
pub const MAX_FORWARDED_SENSE_DEPTH: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SenseFormat {
    Fixed,
    Descriptor,
}

/// Sense key specific information (SKSV set)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SenseKeySpecific {
    /// ILLEGAL REQUEST: position of the offending field
    FieldPointer {
        /// field is in the CDB (else in the parameter data)
        command: bool,
        bit_pointer: Option<u8>,
        field_pointer: u16,
    },
    /// RECOVERED, MEDIUM or HARDWARE ERROR
    ActualRetryCount(u16),
    /// NO SENSE or NOT READY, fraction of 65536
    Progress(u16),
    /// COPY ABORTED
    SegmentPointer {
        /// relative to the start of the segment descriptor
        segment_descriptor: bool,
        bit_pointer: Option<u8>,
        field_pointer: u16,
    },
    /// UNIT ATTENTION condition queue overflow
    UnitAttentionOverflow(bool),
    Raw([u8; 3]),
}

impl SenseKeySpecific {
    /// Decode the three SKS bytes, `None` if SKSV is not set
    pub fn decode(sense_key: u8, sks: &[u8]) -> Option<Self> {
        if sks.len() < 3 || (sks[0] & 0x80) == 0 {
            return None;
        }
        let value = u16::from_be_bytes([sks[1], sks[2]]);
        let bit_pointer = if (sks[0] & 0x08) != 0 {
            Some(sks[0] & 0x7)
        } else {
            None
        };

        Some(match sense_key {
            SENSE_KEY_ILLEGAL_REQUEST => SenseKeySpecific::FieldPointer {
                command: (sks[0] & 0x40) != 0,
                bit_pointer,
                field_pointer: value,
            },
            SENSE_KEY_RECOVERED_ERROR | SENSE_KEY_MEDIUM_ERROR | SENSE_KEY_HARDWARE_ERROR => {
                SenseKeySpecific::ActualRetryCount(value)
            }
            SENSE_KEY_NO_SENSE | SENSE_KEY_NOT_READY => SenseKeySpecific::Progress(value),
            SENSE_KEY_COPY_ABORTED => SenseKeySpecific::SegmentPointer {
                segment_descriptor: (sks[0] & 0x20) != 0,
                bit_pointer,
                field_pointer: value,
            },
            SENSE_KEY_UNIT_ATTENTION => SenseKeySpecific::UnitAttentionOverflow((sks[0] & 0x1) != 0),
            _ => SenseKeySpecific::Raw([sks[0], sks[1], sks[2]]),
        })
    }

    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>, indent: usize) {
        let pointer_text = |bit_pointer: &Option<u8>, field_pointer: u16| match bit_pointer {
            Some(bit) => format!("byte {field_pointer} bit {bit}"),
            None => format!("byte {field_pointer}"),
        };

        match self {
            SenseKeySpecific::FieldPointer {
                command,
                bit_pointer,
                field_pointer,
            } => {
                let text = format!(
                    "Error in {}: {}",
                    if *command { "Command" } else { "Data parameters" },
                    pointer_text(bit_pointer, *field_pointer)
                );
                sgj.haj_vs(obj, indent, "Field pointer", Separator::ColonSpace, &text);
            }
            SenseKeySpecific::ActualRetryCount(count) => {
                sgj.haj_vi(obj, indent, "Actual retry count", Separator::ColonSpace, *count, false);
            }
            SenseKeySpecific::Progress(progress) => {
                sgj.haj_vs(
                    obj,
                    indent,
                    "Progress indication",
                    Separator::ColonSpace,
                    &progress_percent(*progress),
                );
            }
            SenseKeySpecific::SegmentPointer {
                segment_descriptor,
                bit_pointer,
                field_pointer,
            } => {
                let text = format!(
                    "relative to start of {}, {}",
                    if *segment_descriptor {
                        "segment descriptor"
                    } else {
                        "parameter list"
                    },
                    pointer_text(bit_pointer, *field_pointer)
                );
                sgj.haj_vs(obj, indent, "Segment pointer", Separator::ColonSpace, &text);
            }
            SenseKeySpecific::UnitAttentionOverflow(overflow) => {
                sgj.haj_vb(obj, indent, "Unit attention condition queue overflow", Separator::ColonSpace, *overflow);
            }
            SenseKeySpecific::Raw(raw) => {
                sgj.haj_vs(obj, indent, "Sense key specific", Separator::ColonSpace, &hex_string(raw));
            }
        }
    }
}

/// Progress as percentage text
pub fn progress_percent(progress: u16) -> String {
    format!("{:.2}%", progress as f64 * 100.0 / 65536.0)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtaStatusReturn {
    pub extend: bool,
    pub error: u8,
    pub count: u16,
    pub lba: u64,
    pub device: u8,
    pub status: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferralTargetPortGroup {
    pub asymmetric_access_state: u8,
    pub target_port_group: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferralSegment {
    pub first_lba: u64,
    pub last_lba: u64,
    pub groups: Vec<ReferralTargetPortGroup>,
}

/// One descriptor of descriptor format sense data
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SenseDescriptor {
    Information {
        valid: bool,
        information: u64,
    },
    CommandSpecific(u64),
    SenseKeySpecific(Option<SenseKeySpecific>),
    FieldReplaceableUnit(u8),
    Stream {
        filemark: bool,
        eom: bool,
        ili: bool,
    },
    Block {
        ili: bool,
    },
    /// OSD object identification, integrity check value or attribute
    /// identification, kept raw
    Osd {
        desc_type: u8,
        data: Vec<u8>,
    },
    AtaStatusReturn(AtaStatusReturn),
    AnotherProgress {
        sense_key: u8,
        asc: u8,
        ascq: u8,
        progress: u16,
    },
    UserDataSegmentReferral {
        not_all_r: bool,
        segments: Vec<ReferralSegment>,
    },
    ForwardedSense {
        fsdt: bool,
        source: u8,
        status: u8,
        sense: Box<SenseData>,
    },
    DirectAccessBlock {
        valid: bool,
        ili: bool,
        sense_key_specific: Option<SenseKeySpecific>,
        fru: u8,
        information: u64,
        command_specific: u64,
    },
    DeviceDesignation(Designator),
    MicrocodeActivation {
        time: u16,
    },
    NvmeStatus {
        dnr: bool,
        more: bool,
        sct_sc: u16,
    },
    Vendor {
        desc_type: u8,
        data: Vec<u8>,
    },
    Unknown {
        desc_type: u8,
        data: Vec<u8>,
    },
    /// Known type, but too short or otherwise unusable
    Undecoded {
        desc_type: u8,
        data: Vec<u8>,
        reason: String,
    },
}

pub fn descriptor_type_name(desc_type: u8) -> &'static str {
    match desc_type {
        0x00 => "Information",
        0x01 => "Command specific",
        0x02 => "Sense key specific",
        0x03 => "Field replaceable unit",
        0x04 => "Stream commands",
        0x05 => "Block commands",
        0x06 => "OSD object identification",
        0x07 => "OSD response integrity check value",
        0x08 => "OSD attribute identification",
        0x09 => "ATA status return",
        0x0a => "Another progress indication",
        0x0b => "User data segment referral",
        0x0c => "Forwarded sense data",
        0x0d => "Direct-access block device",
        0x0e => "Device designation",
        0x0f => "Microcode activation",
        0xde => "NVMe status",
        0x80..=0xff => "Vendor specific",
        _ => "Unknown",
    }
}

fn forwarded_source_text(source: u8) -> &'static str {
    match source {
        0 => "Unknown",
        1 => "Extended copy command copy source device",
        2 => "Extended copy command copy destination device",
        _ => "reserved",
    }
}

/// Decoded sense buffer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SenseData {
    /// Response code without the VALID bit
    pub response_code: u8,
    pub format: SenseFormat,
    pub deferred: bool,
    /// Response code was not 0x70-0x73, fields are best effort
    pub malformed: bool,
    /// Declared length exceeds the supplied buffer
    pub truncated: bool,
    pub sense_key: u8,
    pub asc: u8,
    pub ascq: u8,
    /// Information field (only when marked valid)
    pub information: Option<u64>,
    pub command_specific: Option<u64>,
    pub fru: Option<u8>,
    pub sense_key_specific: Option<SenseKeySpecific>,
    pub filemark: bool,
    pub eom: bool,
    pub ili: bool,
    pub sdat_ovfl: bool,
    pub additional_length: usize,
    pub descriptors: Vec<SenseDescriptor>,
}

impl SenseData {
    fn new(response_code: u8) -> Self {
        let format = if matches!(response_code, 0x72 | 0x73) {
            SenseFormat::Descriptor
        } else {
            SenseFormat::Fixed
        };
        Self {
            response_code,
            format,
            deferred: matches!(response_code, 0x71 | 0x73),
            malformed: !matches!(response_code, 0x70..=0x73),
            truncated: false,
            sense_key: 0,
            asc: 0,
            ascq: 0,
            information: None,
            command_specific: None,
            fru: None,
            sense_key_specific: None,
            filemark: false,
            eom: false,
            ili: false,
            sdat_ovfl: false,
            additional_length: 0,
            descriptors: Vec::new(),
        }
    }

    pub fn response_code_text(&self) -> String {
        match self.response_code {
            0x70 => "Fixed format, current".to_string(),
            0x71 => "Fixed format, <<<deferred>>>".to_string(),
            0x72 => "Descriptor format, current".to_string(),
            0x73 => "Descriptor format, <<<deferred>>>".to_string(),
            code => format!("Unknown or vendor specific response code 0x{code:x}"),
        }
    }

    pub fn sense_info(&self) -> SenseInfo {
        SenseInfo {
            sense_key: self.sense_key,
            asc: self.asc,
            ascq: self.ascq,
        }
    }

    pub fn additional_sense_text(&self) -> String {
        get_asc_ascq_string(self.asc, self.ascq)
    }

    /// Render the sense record (and its descriptors) into `obj`
    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>, indent: usize) {
        let response_text = self.response_code_text();
        let sense_key_name = sense_key_text(self.sense_key);
        let additional = self.additional_sense_text();

        sg_json::sgj_hr!(
            sgj,
            "{:indent$}{}; Sense key: {}\n",
            "",
            response_text,
            sense_key_name
        );
        sg_json::sgj_hr!(sgj, "{:indent$}Additional sense: {}\n", "", additional);

        sgj.js_nv_ihexstr(obj, "response_code", self.response_code, None, Some(&response_text));
        sgj.js_nv_ihexstr(obj, "sense_key", self.sense_key, None, Some(&sense_key_name));
        sgj.js_nv_ihex(obj, "additional_sense_code", self.asc);
        sgj.js_nv_ihex(obj, "additional_sense_code_qualifier", self.ascq);
        sgj.js_nv_s(obj, "additional_sense_str", &additional);

        let inner = indent + 2;
        if self.malformed {
            sgj.haj_vb(obj, inner, "malformed", Separator::ColonSpace, true);
        }
        if self.truncated {
            sgj.haj_vb(obj, inner, "truncated", Separator::ColonSpace, true);
        }

        if self.format == SenseFormat::Fixed {
            if let Some(info) = self.information {
                sgj.haj_vi(obj, inner, "Info fld", Separator::Equal, info, true);
            }
            if let Some(command_specific) = self.command_specific.filter(|v| *v != 0) {
                sgj.haj_vi(obj, inner, "Command specific information", Separator::ColonSpace, command_specific, true);
            }
            if let Some(fru) = self.fru {
                sgj.haj_vi(obj, inner, "Field replaceable unit code", Separator::ColonSpace, fru, false);
            }
            if self.filemark || self.eom || self.ili {
                sgj.haj_vb(obj, inner, "filemark", Separator::ColonSpace, self.filemark);
                sgj.haj_vb(obj, inner, "eom", Separator::ColonSpace, self.eom);
                sgj.haj_vb(obj, inner, "ili", Separator::ColonSpace, self.ili);
            }
            if let Some(sks) = &self.sense_key_specific {
                let sub = sgj.named_subobject(obj, "sense_key_specific");
                sks.render(sgj, sub, inner);
            }
        } else {
            if self.sdat_ovfl {
                sgj.haj_vb(obj, inner, "sdat_ovfl", Separator::ColonSpace, true);
            }
            let list = sgj.named_subarray(obj, "sense_data_descriptor_list");
            for desc in &self.descriptors {
                let item = sgj.js_arr_push_object(list);
                desc.render(sgj, item, inner);
            }
        }
    }
}

fn bit(byte: u8, bit: u8) -> bool {
    (byte & (1 << bit)) != 0
}

fn decode_ata_status_return(d: &[u8]) -> Result<AtaStatusReturn, DecodeError> {
    need_len("ATA status return descriptor", d, 14)?;
    let extend = bit(d[2], 0);
    let mut count = d[5] as u16;
    let mut lba = d[7] as u64 | ((d[9] as u64) << 8) | ((d[11] as u64) << 16);
    if extend {
        count |= (d[4] as u16) << 8;
        lba |= ((d[6] as u64) << 24) | ((d[8] as u64) << 32) | ((d[10] as u64) << 40);
    }
    Ok(AtaStatusReturn {
        extend,
        error: d[3],
        count,
        lba,
        device: d[12],
        status: d[13],
    })
}

fn decode_referral(d: &[u8]) -> Result<SenseDescriptor, DecodeError> {
    need_len("user data segment referral descriptor", d, 4)?;
    let mut segments = Vec::new();
    let mut off = 4;
    while off < d.len() {
        need_len("referral segment", d, off + 20)?;
        let count = d[off + 3] as usize;
        let first_lba = get_be64(d, off + 4)?;
        let last_lba = get_be64(d, off + 12)?;
        let mut groups = Vec::with_capacity(count);
        let mut tpg = off + 20;
        for _ in 0..count {
            need_len("referral target port group", d, tpg + 4)?;
            groups.push(ReferralTargetPortGroup {
                asymmetric_access_state: d[tpg] & 0xf,
                target_port_group: get_be16(d, tpg + 2)?,
            });
            tpg += 4;
        }
        segments.push(ReferralSegment {
            first_lba,
            last_lba,
            groups,
        });
        off = tpg;
    }
    Ok(SenseDescriptor::UserDataSegmentReferral {
        not_all_r: bit(d[2], 0),
        segments,
    })
}

fn decode_descriptor(desc_type: u8, d: &[u8], sense_key: u8, depth: usize) -> Result<SenseDescriptor, DecodeError> {
    let desc = match desc_type {
        0x00 => {
            need_len("information descriptor", d, 12)?;
            SenseDescriptor::Information {
                valid: bit(d[2], 7),
                information: get_be64(d, 4)?,
            }
        }
        0x01 => SenseDescriptor::CommandSpecific(get_be64(d, 4)?),
        0x02 => {
            need_len("sense key specific descriptor", d, 7)?;
            SenseDescriptor::SenseKeySpecific(SenseKeySpecific::decode(sense_key, &d[4..7]))
        }
        0x03 => {
            need_len("field replaceable unit descriptor", d, 4)?;
            SenseDescriptor::FieldReplaceableUnit(d[3])
        }
        0x04 => {
            need_len("stream commands descriptor", d, 4)?;
            SenseDescriptor::Stream {
                filemark: bit(d[3], 7),
                eom: bit(d[3], 6),
                ili: bit(d[3], 5),
            }
        }
        0x05 => {
            need_len("block commands descriptor", d, 4)?;
            SenseDescriptor::Block { ili: bit(d[3], 5) }
        }
        0x06..=0x08 => SenseDescriptor::Osd {
            desc_type,
            data: d.to_vec(),
        },
        0x09 => SenseDescriptor::AtaStatusReturn(decode_ata_status_return(d)?),
        0x0a => {
            need_len("another progress indication descriptor", d, 8)?;
            SenseDescriptor::AnotherProgress {
                sense_key: d[2] & 0xf,
                asc: d[3],
                ascq: d[4],
                progress: get_be16(d, 6)?,
            }
        }
        0x0b => decode_referral(d)?,
        0x0c => {
            need_len("forwarded sense data descriptor", d, 5)?;
            if depth >= MAX_FORWARDED_SENSE_DEPTH {
                return Err(DecodeError::Invalid(format!(
                    "forwarded sense data nested deeper than {MAX_FORWARDED_SENSE_DEPTH} levels"
                )));
            }
            let sense = decode_sense_nested(&d[4..], depth + 1)?;
            SenseDescriptor::ForwardedSense {
                fsdt: bit(d[2], 7),
                source: d[2] & 0xf,
                status: d[3],
                sense: Box::new(sense),
            }
        }
        0x0d => {
            need_len("direct-access block device descriptor", d, 24)?;
            SenseDescriptor::DirectAccessBlock {
                valid: bit(d[2], 7),
                ili: bit(d[2], 5),
                sense_key_specific: SenseKeySpecific::decode(sense_key, &d[4..7]),
                fru: d[7],
                information: get_be64(d, 8)?,
                command_specific: get_be64(d, 16)?,
            }
        }
        0x0e => {
            need_len("device designation descriptor", d, 5)?;
            let (designator, _) = Designator::decode(&d[4..])?;
            SenseDescriptor::DeviceDesignation(designator)
        }
        0x0f => SenseDescriptor::MicrocodeActivation {
            time: get_be16(d, 6)?,
        },
        0xde => {
            need_len("NVMe status descriptor", d, 12)?;
            SenseDescriptor::NvmeStatus {
                dnr: bit(d[5], 7),
                more: bit(d[5], 6),
                sct_sc: get_be16(d, 10)?,
            }
        }
        0x80..=0xff => SenseDescriptor::Vendor {
            desc_type,
            data: d.to_vec(),
        },
        _ => SenseDescriptor::Unknown {
            desc_type,
            data: d.to_vec(),
        },
    };
    Ok(desc)
}

fn decode_fixed(buf: &[u8], sense: &mut SenseData) {
    let len = buf.len();
    let valid = bit(buf[0], 7);

    if len > 2 {
        sense.filemark = bit(buf[2], 7);
        sense.eom = bit(buf[2], 6);
        sense.ili = bit(buf[2], 5);
        sense.sdat_ovfl = bit(buf[2], 4);
        sense.sense_key = buf[2] & 0xf;
    }
    if valid && len >= 7 {
        sense.information = get_be32(buf, 3).ok().map(u64::from);
    }

    sense.additional_length = if len > 7 { buf[7] as usize } else { 0 };
    let declared = 8 + sense.additional_length;
    sense.truncated = declared > len;
    let end = declared.min(len);

    if end >= 12 {
        sense.command_specific = get_be32(buf, 8).ok().map(u64::from);
    }
    if end > 12 {
        sense.asc = buf[12];
    }
    if end > 13 {
        sense.ascq = buf[13];
    }
    if end > 14 && buf[14] != 0 {
        sense.fru = Some(buf[14]);
    }
    if end >= 18 {
        sense.sense_key_specific = SenseKeySpecific::decode(sense.sense_key, &buf[15..18]);
    }
}

fn decode_descriptor_format(buf: &[u8], sense: &mut SenseData, depth: usize) {
    let len = buf.len();
    sense.sense_key = buf.get(1).map(|b| b & 0xf).unwrap_or(0);
    sense.asc = buf.get(2).copied().unwrap_or(0);
    sense.ascq = buf.get(3).copied().unwrap_or(0);
    sense.sdat_ovfl = buf.get(4).map(|b| bit(*b, 7)).unwrap_or(false);

    sense.additional_length = buf.get(7).map(|b| *b as usize).unwrap_or(0);
    let declared = 8 + sense.additional_length;
    sense.truncated = declared > len;
    let end = declared.min(len);

    let mut off = 8;
    while off < end {
        if off + 2 > end {
            sense.truncated = true;
            break;
        }
        let desc_type = buf[off];
        let total = 2 + buf[off + 1] as usize;
        let avail = total.min(end - off);
        let data = &buf[off..off + avail];

        let desc = if avail < total {
            sense.truncated = true;
            SenseDescriptor::Undecoded {
                desc_type,
                data: data.to_vec(),
                reason: format!("descriptor truncated: need {total} bytes, have {avail}"),
            }
        } else {
            decode_descriptor(desc_type, data, sense.sense_key, depth).unwrap_or_else(|err| {
                log::debug!("sense descriptor 0x{desc_type:02x} - {err}");
                SenseDescriptor::Undecoded {
                    desc_type,
                    data: data.to_vec(),
                    reason: err.to_string(),
                }
            })
        };
        sense.descriptors.push(desc);
        off += total;
    }

    for desc in &sense.descriptors {
        match desc {
            SenseDescriptor::Information {
                valid: true,
                information,
            } => {
                sense.information.get_or_insert(*information);
            }
            SenseDescriptor::CommandSpecific(value) => {
                sense.command_specific.get_or_insert(*value);
            }
            SenseDescriptor::SenseKeySpecific(Some(sks)) => {
                sense.sense_key_specific.get_or_insert_with(|| sks.clone());
            }
            SenseDescriptor::FieldReplaceableUnit(fru) if *fru != 0 => {
                sense.fru.get_or_insert(*fru);
            }
            SenseDescriptor::Stream { filemark, eom, ili } => {
                sense.filemark |= *filemark;
                sense.eom |= *eom;
                sense.ili |= *ili;
            }
            SenseDescriptor::Block { ili } => sense.ili |= *ili,
            SenseDescriptor::DirectAccessBlock {
                valid,
                ili,
                sense_key_specific,
                fru,
                information,
                command_specific,
            } => {
                if *valid {
                    sense.information.get_or_insert(*information);
                }
                sense.command_specific.get_or_insert(*command_specific);
                if let Some(sks) = sense_key_specific {
                    sense.sense_key_specific.get_or_insert_with(|| sks.clone());
                }
                if *fru != 0 {
                    sense.fru.get_or_insert(*fru);
                }
                sense.ili |= *ili;
            }
            _ => {}
        }
    }
}

fn decode_sense_nested(buf: &[u8], depth: usize) -> Result<SenseData, DecodeError> {
    need_len("sense data", buf, 1)?;

    let mut sense = SenseData::new(buf[0] & 0x7f);
    if sense.malformed {
        log::warn!(
            "unknown or vendor specific sense response code 0x{:02x}, decoding as fixed format",
            sense.response_code
        );
    }

    match sense.format {
        SenseFormat::Fixed => decode_fixed(buf, &mut sense),
        SenseFormat::Descriptor => decode_descriptor_format(buf, &mut sense, depth),
    }

    Ok(sense)
}

/// Decode a sense buffer
///
/// Only an empty buffer is an error. An unknown response code is decoded
/// as fixed format with [`SenseData::malformed`] set.
pub fn decode_sense(buf: &[u8]) -> Result<SenseData, DecodeError> {
    decode_sense_nested(buf, 0)
}

/// Information field of fixed or descriptor format sense, if valid
pub fn sense_info_field(buf: &[u8]) -> Option<u64> {
    decode_sense(buf).ok()?.information
}

/// Progress indication (fraction of 65536), from sense key specific data
/// or an another progress indication descriptor
pub fn sense_progress_indication(buf: &[u8]) -> Option<u16> {
    let sense = decode_sense(buf).ok()?;
    if let Some(SenseKeySpecific::Progress(progress)) = sense.sense_key_specific {
        return Some(progress);
    }
    sense.descriptors.iter().find_map(|desc| match desc {
        SenseDescriptor::AnotherProgress { progress, .. } => Some(*progress),
        _ => None,
    })
}

/// Sense key, ASC and ASCQ of a well formed sense buffer
pub fn normalize_sense(buf: &[u8]) -> Option<SenseInfo> {
    match decode_sense(buf) {
        Ok(sense) if !sense.malformed => Some(sense.sense_info()),
        _ => None,
    }
}

impl SenseDescriptor {
    pub fn desc_type(&self) -> u8 {
        match self {
            SenseDescriptor::Information { .. } => 0x00,
            SenseDescriptor::CommandSpecific(_) => 0x01,
            SenseDescriptor::SenseKeySpecific(_) => 0x02,
            SenseDescriptor::FieldReplaceableUnit(_) => 0x03,
            SenseDescriptor::Stream { .. } => 0x04,
            SenseDescriptor::Block { .. } => 0x05,
            SenseDescriptor::AtaStatusReturn(_) => 0x09,
            SenseDescriptor::AnotherProgress { .. } => 0x0a,
            SenseDescriptor::UserDataSegmentReferral { .. } => 0x0b,
            SenseDescriptor::ForwardedSense { .. } => 0x0c,
            SenseDescriptor::DirectAccessBlock { .. } => 0x0d,
            SenseDescriptor::DeviceDesignation(_) => 0x0e,
            SenseDescriptor::MicrocodeActivation { .. } => 0x0f,
            SenseDescriptor::NvmeStatus { .. } => 0xde,
            SenseDescriptor::Osd { desc_type, .. }
            | SenseDescriptor::Vendor { desc_type, .. }
            | SenseDescriptor::Unknown { desc_type, .. }
            | SenseDescriptor::Undecoded { desc_type, .. } => *desc_type,
        }
    }

    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>, indent: usize) {
        let desc_type = self.desc_type();
        let name = descriptor_type_name(desc_type);
        sg_json::sgj_hr!(sgj, "{:indent$}Descriptor type: {} [0x{:x}]\n", "", name, desc_type);
        sgj.js_nv_ihexstr(obj, "descriptor_type", desc_type, None, Some(name));

        let inner = indent + 2;
        match self {
            SenseDescriptor::Information { valid, information } => {
                sgj.haj_vb(obj, inner, "valid", Separator::Equal, *valid);
                sgj.haj_vi(obj, inner, "information", Separator::Equal, *information, true);
            }
            SenseDescriptor::CommandSpecific(value) => {
                sgj.haj_vi(obj, inner, "command specific information", Separator::Equal, *value, true);
            }
            SenseDescriptor::SenseKeySpecific(sks) => match sks {
                Some(sks) => sks.render(sgj, obj, inner),
                None => sgj.haj_vb(obj, inner, "sksv", Separator::Equal, false),
            },
            SenseDescriptor::FieldReplaceableUnit(fru) => {
                sgj.haj_vi(obj, inner, "field replaceable unit code", Separator::Equal, *fru, true);
            }
            SenseDescriptor::Stream { filemark, eom, ili } => {
                sgj.haj_vb(obj, inner, "filemark", Separator::Equal, *filemark);
                sgj.haj_vb(obj, inner, "eom", Separator::Equal, *eom);
                sgj.haj_vb(obj, inner, "ili", Separator::Equal, *ili);
            }
            SenseDescriptor::Block { ili } => {
                sgj.haj_vb(obj, inner, "ili", Separator::Equal, *ili);
            }
            SenseDescriptor::AtaStatusReturn(ata) => {
                sgj.haj_vb(obj, inner, "extend", Separator::Equal, ata.extend);
                sgj.haj_vi(obj, inner, "error", Separator::Equal, ata.error, true);
                sgj.haj_vi(obj, inner, "count", Separator::Equal, ata.count, true);
                sgj.haj_vi(obj, inner, "lba", Separator::Equal, ata.lba, true);
                sgj.haj_vi(obj, inner, "device", Separator::Equal, ata.device, true);
                sgj.haj_vi(obj, inner, "status", Separator::Equal, ata.status, true);
            }
            SenseDescriptor::AnotherProgress {
                sense_key,
                asc,
                ascq,
                progress,
            } => {
                sgj.haj_vistr(obj, inner, "sense key", Separator::Equal, *sense_key, &sense_key_text(*sense_key));
                sgj.haj_vs(obj, inner, "additional sense", Separator::ColonSpace, &get_asc_ascq_string(*asc, *ascq));
                sgj.haj_vs(obj, inner, "progress indication", Separator::ColonSpace, &progress_percent(*progress));
            }
            SenseDescriptor::UserDataSegmentReferral { not_all_r, segments } => {
                sgj.haj_vb(obj, inner, "not_all_r", Separator::Equal, *not_all_r);
                let list = sgj.named_subarray(obj, "user_data_segment_referral_list");
                for (i, segment) in segments.iter().enumerate() {
                    sg_json::sgj_hr!(sgj, "{:inner$}Segment {}:\n", "", i + 1);
                    let item = sgj.js_arr_push_object(list);
                    let seg_indent = inner + 2;
                    sgj.haj_vi(item, seg_indent, "first user data segment lba", Separator::ColonSpace, segment.first_lba, true);
                    sgj.haj_vi(item, seg_indent, "last user data segment lba", Separator::ColonSpace, segment.last_lba, true);
                    let groups = sgj.named_subarray(item, "target_port_group_list");
                    for group in &segment.groups {
                        let entry = sgj.js_arr_push_object(groups);
                        sgj.haj_vistr(
                            entry,
                            seg_indent + 2,
                            "asymmetric access state",
                            Separator::ColonSpace,
                            group.asymmetric_access_state,
                            tpg_asymmetric_access_state_text(group.asymmetric_access_state),
                        );
                        sgj.haj_vi(entry, seg_indent + 2, "target port group", Separator::ColonSpace, group.target_port_group, true);
                    }
                }
            }
            SenseDescriptor::ForwardedSense {
                fsdt,
                source,
                status,
                sense,
            } => {
                sgj.haj_vb(obj, inner, "fsdt", Separator::Equal, *fsdt);
                sgj.haj_vistr(obj, inner, "sense data source", Separator::ColonSpace, *source, forwarded_source_text(*source));
                sgj.haj_vistr(obj, inner, "forwarded status", Separator::ColonSpace, *status, &scsi_status_text(*status));
                let sub = sgj.named_subobject(obj, "forwarded_sense_data");
                sense.render(sgj, sub, inner);
            }
            SenseDescriptor::DirectAccessBlock {
                valid,
                ili,
                sense_key_specific,
                fru,
                information,
                command_specific,
            } => {
                sgj.haj_vb(obj, inner, "valid", Separator::Equal, *valid);
                sgj.haj_vb(obj, inner, "ili", Separator::Equal, *ili);
                if let Some(sks) = sense_key_specific {
                    let sub = sgj.named_subobject(obj, "sense_key_specific");
                    sks.render(sgj, sub, inner);
                }
                sgj.haj_vi(obj, inner, "field replaceable unit code", Separator::Equal, *fru, true);
                sgj.haj_vi(obj, inner, "information", Separator::Equal, *information, true);
                sgj.haj_vi(obj, inner, "command specific information", Separator::Equal, *command_specific, true);
            }
            SenseDescriptor::DeviceDesignation(designator) => {
                let sub = sgj.named_subobject(obj, "designation_descriptor");
                designator.render(sgj, sub, inner);
            }
            SenseDescriptor::MicrocodeActivation { time } => {
                sgj.haj_vi(obj, inner, "microcode activation time (seconds)", Separator::ColonSpace, *time, false);
            }
            SenseDescriptor::NvmeStatus { dnr, more, sct_sc } => {
                sgj.haj_vb(obj, inner, "dnr", Separator::Equal, *dnr);
                sgj.haj_vb(obj, inner, "m", Separator::Equal, *more);
                sgj.haj_vi(obj, inner, "sct_sc", Separator::Equal, *sct_sc, true);
            }
            SenseDescriptor::Osd { data, .. }
            | SenseDescriptor::Vendor { data, .. }
            | SenseDescriptor::Unknown { data, .. } => {
                sgj.haj_vs(obj, inner, "descriptor", Separator::ColonSpace, &hex_string(data));
            }
            SenseDescriptor::Undecoded { data, reason, .. } => {
                sgj.haj_vs(obj, inner, "decode error", Separator::ColonSpace, reason);
                sgj.haj_vs(obj, inner, "descriptor", Separator::ColonSpace, &hex_string(data));
            }
        }
    }
}
