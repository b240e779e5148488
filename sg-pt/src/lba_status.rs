//! GET LBA STATUS response

use endian_trait::Endian;
use sg_json::{NodeId, Separator, SgjState};

use proxmox_io::ReadExt;

use crate::text::provisioning_status_text;
use crate::{need_len, DecodeError};

pub const LBA_STATUS_HEADER_LEN: usize = 8;
pub const LBA_STATUS_DESCRIPTOR_LEN: usize = 16;

#[repr(C, packed)]
#[derive(Endian)]
struct LbaStatusHeader {
    parameter_data_len: u32,
    reserved: [u8; 3],
    flags: u8,
}

#[repr(C, packed)]
#[derive(Endian)]
struct LbaStatusDescriptorRaw {
    lba: u64,
    blocks: u32,
    provisioning: u8,
    additional_status: u8,
    reserved: [u8; 2],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LbaStatusDescriptor {
    pub lba: u64,
    pub blocks: u32,
    pub provisioning_status: u8,
    pub additional_status: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LbaStatus {
    /// PARAMETER DATA LENGTH as reported by the device
    pub parameter_data_len: u32,
    pub completion_condition: u8,
    pub rtp: bool,
    pub descriptors: Vec<LbaStatusDescriptor>,
    /// Bytes of an incomplete trailing descriptor
    pub trailing: usize,
    /// Declared length exceeds the supplied buffer
    pub truncated: bool,
}

pub fn completion_condition_text(condition: u8) -> &'static str {
    match condition {
        0 => "No indication",
        1 => "Command completed due to meeting allocation length",
        2 => "Command completed due to meeting scan length",
        3 => "Command completed due to meeting maximum number of descriptors",
        _ => "Reserved",
    }
}

/// Decode the GET LBA STATUS(16/32) parameter data
pub fn decode_lba_status(data: &[u8]) -> Result<LbaStatus, DecodeError> {
    need_len("LBA status header", data, LBA_STATUS_HEADER_LEN)?;

    let mut reader = data;
    let head: LbaStatusHeader = unsafe { reader.read_be_value()? };

    let declared = (head.parameter_data_len as usize).saturating_add(4);
    let truncated = declared > data.len();
    let end = declared.min(data.len());

    let mut reader = &data[LBA_STATUS_HEADER_LEN..end.max(LBA_STATUS_HEADER_LEN)];
    let mut descriptors = Vec::new();
    while reader.len() >= LBA_STATUS_DESCRIPTOR_LEN {
        let desc: LbaStatusDescriptorRaw = unsafe { reader.read_be_value()? };
        descriptors.push(LbaStatusDescriptor {
            lba: desc.lba,
            blocks: desc.blocks,
            provisioning_status: desc.provisioning & 0xf,
            additional_status: desc.additional_status,
        });
    }

    if !reader.is_empty() {
        log::warn!(
            "LBA status: ignoring {} bytes of incomplete trailing descriptor",
            reader.len()
        );
    }

    Ok(LbaStatus {
        parameter_data_len: head.parameter_data_len,
        completion_condition: (head.flags >> 1) & 0x7,
        rtp: (head.flags & 0x1) != 0,
        descriptors,
        trailing: reader.len(),
        truncated,
    })
}

impl LbaStatus {
    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>) {
        sgj.haj_vistr(
            obj,
            0,
            "Completion condition",
            Separator::ColonSpace,
            self.completion_condition,
            completion_condition_text(self.completion_condition),
        );
        sgj.haj_vb(obj, 0, "RTP", Separator::Equal, self.rtp);
        if self.truncated {
            sgj.haj_vb(obj, 0, "truncated", Separator::ColonSpace, true);
        }
        if self.trailing > 0 {
            sg_json::sgj_hr!(sgj, "<< {} bytes of incomplete trailing descriptor >>\n", self.trailing);
        }

        let list = sgj.named_subarray(obj, "lba_status_descriptor");
        for desc in &self.descriptors {
            let text = provisioning_status_text(desc.provisioning_status);
            sg_json::sgj_hr!(sgj, "[0x{:x}, 0x{:x}]  {}\n", desc.lba, desc.blocks, text);

            let item = sgj.js_arr_push_object(list);
            sgj.js_nv_ihex(item, "lba", desc.lba);
            sgj.js_nv_ihex(item, "num_blocks", desc.blocks);
            sgj.js_nv_ihexstr(item, "provisioning_status", desc.provisioning_status, None, Some(text));
            sgj.js_nv_ihex(item, "additional_status", desc.additional_status);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Error;
    use sg_json::JsonOptions;

    fn build_lba_status(flags: u8, descriptors: &[(u64, u32, u8)], trailing: &[u8]) -> Vec<u8> {
        let mut res = Vec::new();
        let len = 4 + descriptors.len() * 16 + trailing.len();
        res.extend_from_slice(&(len as u32).to_be_bytes());
        res.extend_from_slice(&[0, 0, 0, flags]);
        for (lba, blocks, status) in descriptors {
            res.extend_from_slice(&lba.to_be_bytes());
            res.extend_from_slice(&blocks.to_be_bytes());
            res.extend_from_slice(&[*status, 0, 0, 0]);
        }
        res.extend_from_slice(trailing);
        res
    }

    #[test]
    fn lba_status_descriptors() -> Result<(), Error> {
        let data = build_lba_status(0x03, &[(0, 0x1000, 0), (0x1000, 0x800, 1), (0x1800, 8, 0x0d)], &[]);
        let status = decode_lba_status(&data)?;
        assert_eq!(status.completion_condition, 1);
        assert!(status.rtp);
        assert!(!status.truncated);
        assert_eq!(status.descriptors.len(), 3);
        assert_eq!(
            status.descriptors[1],
            LbaStatusDescriptor {
                lba: 0x1000,
                blocks: 0x800,
                provisioning_status: 1,
                additional_status: 0
            }
        );
        // only the low nibble is the provisioning status
        assert_eq!(status.descriptors[2].provisioning_status, 0xd);
        assert_eq!(provisioning_status_text(0xd), "reserved");
        Ok(())
    }

    #[test]
    fn partial_records_are_reported() -> Result<(), Error> {
        let data = build_lba_status(0, &[(0x20, 1, 3)], &[1, 2, 3]);
        let status = decode_lba_status(&data)?;
        assert_eq!(status.descriptors.len(), 1);
        assert_eq!(status.trailing, 3);

        // declared length larger than the buffer
        let mut data = build_lba_status(0, &[(0x20, 1, 3), (0x40, 1, 1)], &[]);
        data.truncate(8 + 16 + 5);
        let status = decode_lba_status(&data)?;
        assert!(status.truncated);
        assert_eq!(status.descriptors.len(), 1);
        assert_eq!(status.trailing, 5);

        assert!(decode_lba_status(&[0, 0, 0]).is_err());
        Ok(())
    }

    #[test]
    fn render_text() -> Result<(), Error> {
        let data = build_lba_status(0, &[(0x1000, 0x80, 1)], &[]);
        let status = decode_lba_status(&data)?;
        let mut sgj = SgjState::with_buffer(JsonOptions::default(), false);
        status.render(&mut sgj, None);
        assert_eq!(
            sgj.take_human_output(),
            "Completion condition: 0 [No indication]\nRTP=0\n[0x1000, 0x80]  deallocated\n"
        );
        Ok(())
    }
}
