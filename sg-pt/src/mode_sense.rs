//! MODE SENSE(6/10) parameter data

use endian_trait::Endian;
use sg_json::{NodeId, Separator, SgjState};

use proxmox_io::ReadExt;

use crate::{hex_string, need_len, DecodeError};

#[repr(C, packed)]
#[derive(Endian, Debug, Copy, Clone)]
pub struct ModeParameterHeader10 {
    pub mode_data_len: u16,
    pub medium_type: u8,
    pub flags3: u8,
    pub flags4: u8,
    reserved5: u8,
    pub block_descriptor_len: u16,
}

#[repr(C, packed)]
#[derive(Endian, Debug, Copy, Clone)]
pub struct ModeParameterHeader6 {
    pub mode_data_len: u8,
    pub medium_type: u8,
    pub flags3: u8,
    pub block_descriptor_len: u8,
}

impl ModeParameterHeader10 {
    /// Device specific parameter bit 7, write protected for disks and tapes
    pub fn write_protect(&self) -> bool {
        (self.flags3 & 0b1000_0000) != 0
    }

    pub fn long_lba(&self) -> bool {
        (self.flags4 & 0x01) != 0
    }
}

impl ModeParameterHeader6 {
    pub fn write_protect(&self) -> bool {
        (self.flags3 & 0b1000_0000) != 0
    }
}

#[derive(Debug, Copy, Clone)]
pub enum ModeParameterHeader {
    Long(ModeParameterHeader10),
    Short(ModeParameterHeader6),
}

impl ModeParameterHeader {
    pub fn medium_type(&self) -> u8 {
        match self {
            ModeParameterHeader::Long(mode) => mode.medium_type,
            ModeParameterHeader::Short(mode) => mode.medium_type,
        }
    }

    pub fn device_specific(&self) -> u8 {
        match self {
            ModeParameterHeader::Long(mode) => mode.flags3,
            ModeParameterHeader::Short(mode) => mode.flags3,
        }
    }

    pub fn write_protect(&self) -> bool {
        match self {
            ModeParameterHeader::Long(mode) => mode.write_protect(),
            ModeParameterHeader::Short(mode) => mode.write_protect(),
        }
    }

    pub fn long_lba(&self) -> bool {
        match self {
            ModeParameterHeader::Long(mode) => mode.long_lba(),
            ModeParameterHeader::Short(_) => false,
        }
    }
}

/// Block descriptor, short (8 byte) or long LBA (16 byte) form
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModeBlockDescriptor {
    Short {
        /// Density code for sequential access devices, number of blocks
        /// bits 31..24 for direct access devices
        density_code: u8,
        number_of_blocks: u32,
        block_length: u32,
    },
    Long {
        number_of_blocks: u64,
        block_length: u32,
    },
}

impl ModeBlockDescriptor {
    pub fn block_length(&self) -> u32 {
        match self {
            ModeBlockDescriptor::Short { block_length, .. } => *block_length,
            ModeBlockDescriptor::Long { block_length, .. } => *block_length,
        }
    }

    fn decode_short(d: &[u8]) -> Self {
        ModeBlockDescriptor::Short {
            density_code: d[0],
            number_of_blocks: u32::from_be_bytes([d[0], d[1], d[2], d[3]]),
            block_length: u32::from_be_bytes([0, d[5], d[6], d[7]]),
        }
    }

    fn decode_long(d: &[u8]) -> Self {
        let mut blocks = [0u8; 8];
        blocks.copy_from_slice(&d[0..8]);
        ModeBlockDescriptor::Long {
            number_of_blocks: u64::from_be_bytes(blocks),
            block_length: u32::from_be_bytes([d[12], d[13], d[14], d[15]]),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModePage {
    pub page_code: u8,
    pub subpage_code: u8,
    /// Parameters saveable
    pub ps: bool,
    pub spf: bool,
    /// Page bytes following the page header
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ModeSense {
    pub header: ModeParameterHeader,
    pub block_descriptors: Vec<ModeBlockDescriptor>,
    pub pages: Vec<ModePage>,
}

fn decode_pages(mut data: &[u8]) -> Vec<ModePage> {
    let mut pages = Vec::new();
    while data.len() >= 2 {
        let spf = (data[0] & 0x40) != 0;
        let (header_len, page_len, subpage_code) = if spf {
            if data.len() < 4 {
                break;
            }
            (4, u16::from_be_bytes([data[2], data[3]]) as usize, data[1])
        } else {
            (2, data[1] as usize, 0)
        };
        let end = header_len + page_len;
        if end > data.len() {
            log::warn!(
                "mode page 0x{:02x} truncated: need {end} bytes, have {}",
                data[0] & 0x3f,
                data.len()
            );
            break;
        }
        pages.push(ModePage {
            page_code: data[0] & 0x3f,
            subpage_code,
            ps: (data[0] & 0x80) != 0,
            spf,
            data: data[header_len..end].to_vec(),
        });
        data = &data[end..];
    }
    pages
}

fn decode_block_descriptors(data: &[u8], long_lba: bool) -> Result<Vec<ModeBlockDescriptor>, DecodeError> {
    let size = if long_lba { 16 } else { 8 };
    if data.len() % size != 0 {
        return Err(DecodeError::Invalid(format!(
            "wrong block_descriptor_len: {}, expected a multiple of {size}",
            data.len()
        )));
    }
    Ok(data
        .chunks_exact(size)
        .map(|d| {
            if long_lba {
                ModeBlockDescriptor::decode_long(d)
            } else {
                ModeBlockDescriptor::decode_short(d)
            }
        })
        .collect())
}

/// Limit the data to `expected_len`
///
/// Some devices return the allocation length instead of the real data
/// length, so longer data is accepted.
fn clamp_mode_data(data: &[u8], expected_len: usize) -> Result<&[u8], DecodeError> {
    use std::cmp::Ordering;
    match data.len().cmp(&expected_len) {
        Ordering::Less => Err(DecodeError::Invalid(format!(
            "wrong mode_data_len: got {}, expected {}",
            data.len(),
            expected_len
        ))),
        Ordering::Greater => Ok(&data[..expected_len]),
        Ordering::Equal => Ok(data),
    }
}

pub fn decode_mode_sense10(data: &[u8]) -> Result<ModeSense, DecodeError> {
    need_len("mode parameter header(10)", data, 8)?;

    let mut reader = data;
    let head: ModeParameterHeader10 = unsafe { reader.read_be_value()? };
    let data = clamp_mode_data(data, head.mode_data_len as usize + 2)?;

    let bd_end = 8 + head.block_descriptor_len as usize;
    need_len("mode block descriptors", data, bd_end)?;
    let block_descriptors = decode_block_descriptors(&data[8..bd_end], head.long_lba())?;

    Ok(ModeSense {
        header: ModeParameterHeader::Long(head),
        block_descriptors,
        pages: decode_pages(&data[bd_end..]),
    })
}

pub fn decode_mode_sense6(data: &[u8]) -> Result<ModeSense, DecodeError> {
    need_len("mode parameter header(6)", data, 4)?;

    let mut reader = data;
    let head: ModeParameterHeader6 = unsafe { reader.read_be_value()? };
    let data = clamp_mode_data(data, head.mode_data_len as usize + 1)?;

    let bd_end = 4 + head.block_descriptor_len as usize;
    need_len("mode block descriptors", data, bd_end)?;
    let block_descriptors = decode_block_descriptors(&data[4..bd_end], false)?;

    Ok(ModeSense {
        header: ModeParameterHeader::Short(head),
        block_descriptors,
        pages: decode_pages(&data[bd_end..]),
    })
}

impl ModeSense {
    pub fn page(&self, page_code: u8, subpage_code: u8) -> Option<&ModePage> {
        self.pages
            .iter()
            .find(|page| page.page_code == page_code && page.subpage_code == subpage_code)
    }

    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>) {
        let header = &self.header;
        let mph = sgj.named_subobject(obj, "mode_parameter_header");
        sg_json::sgj_hr!(sgj, "Mode parameter header:\n");
        sgj.haj_vi(mph, 2, "Medium type", Separator::ColonSpace, header.medium_type(), true);
        sgj.haj_vi(mph, 2, "Device specific parameter", Separator::ColonSpace, header.device_specific(), true);
        sgj.haj_vb(mph, 4, "WP", Separator::Equal, header.write_protect());
        sgj.haj_vb(mph, 2, "Long LBA", Separator::ColonSpace, header.long_lba());

        let list = sgj.named_subarray(obj, "block_descriptor_list");
        for desc in &self.block_descriptors {
            let item = sgj.js_arr_push_object(list);
            match desc {
                ModeBlockDescriptor::Short {
                    density_code,
                    number_of_blocks,
                    block_length,
                } => {
                    sg_json::sgj_hr!(sgj, "  Block descriptor:\n");
                    sgj.haj_vi(item, 4, "Density code", Separator::ColonSpace, *density_code, true);
                    sgj.haj_vi(item, 4, "Number of blocks", Separator::ColonSpace, *number_of_blocks, false);
                    sgj.haj_vi(item, 4, "Block length", Separator::ColonSpace, *block_length, false);
                }
                ModeBlockDescriptor::Long {
                    number_of_blocks,
                    block_length,
                } => {
                    sg_json::sgj_hr!(sgj, "  Long LBA block descriptor:\n");
                    sgj.haj_vi(item, 4, "Number of blocks", Separator::ColonSpace, *number_of_blocks, false);
                    sgj.haj_vi(item, 4, "Block length", Separator::ColonSpace, *block_length, false);
                }
            }
        }

        let list = sgj.named_subarray(obj, "mode_page_list");
        for page in &self.pages {
            if page.spf {
                sg_json::sgj_hr!(sgj, "  Mode page 0x{:02x},0x{:02x}:\n", page.page_code, page.subpage_code);
            } else {
                sg_json::sgj_hr!(sgj, "  Mode page 0x{:02x}:\n", page.page_code);
            }
            let item = sgj.js_arr_push_object(list);
            sgj.js_nv_ihex(item, "page_code", page.page_code);
            sgj.js_nv_ihex(item, "subpage_code", page.subpage_code);
            sgj.haj_vb(item, 4, "PS", Separator::Equal, page.ps);
            sgj.haj_vs(item, 4, "Page bytes", Separator::ColonSpace, &hex_string(&page.data));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Error;

    fn build_mode_sense10(flags3: u8, long_lba: bool, bds: &[u8], pages: &[u8]) -> Vec<u8> {
        let mut res = Vec::new();
        let len = 6 + bds.len() + pages.len();
        res.extend_from_slice(&(len as u16).to_be_bytes());
        res.extend_from_slice(&[0, flags3, if long_lba { 1 } else { 0 }, 0]);
        res.extend_from_slice(&(bds.len() as u16).to_be_bytes());
        res.extend_from_slice(bds);
        res.extend_from_slice(pages);
        res
    }

    #[test]
    fn mode_sense10_with_caching_page() -> Result<(), Error> {
        let bd = [0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00];
        let page = [0x88, 0x12, 0x04, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let data = build_mode_sense10(0x80, false, &bd, &page);
        let mode = decode_mode_sense10(&data)?;

        assert!(mode.header.write_protect());
        assert_eq!(
            mode.block_descriptors,
            vec![ModeBlockDescriptor::Short {
                density_code: 0,
                number_of_blocks: 0x0010_0000,
                block_length: 512
            }]
        );
        let caching = mode.page(0x08, 0).ok_or_else(|| anyhow::format_err!("no page"))?;
        assert!(caching.ps);
        assert_eq!(caching.data.len(), 0x12);
        assert_eq!(caching.data[0], 0x04);
        Ok(())
    }

    #[test]
    fn long_lba_and_subpages() -> Result<(), Error> {
        let mut bd = Vec::new();
        bd.extend_from_slice(&0x1_0000_0000u64.to_be_bytes());
        bd.extend_from_slice(&[0, 0, 0, 0]);
        bd.extend_from_slice(&4096u32.to_be_bytes());
        let page = [0x4a, 0x01, 0x00, 0x02, 0xaa, 0xbb];
        let data = build_mode_sense10(0, true, &bd, &page);
        let mode = decode_mode_sense10(&data)?;

        assert_eq!(
            mode.block_descriptors,
            vec![ModeBlockDescriptor::Long {
                number_of_blocks: 0x1_0000_0000,
                block_length: 4096
            }]
        );
        let page = mode.page(0x0a, 1).ok_or_else(|| anyhow::format_err!("no page"))?;
        assert_eq!(page.data, vec![0xaa, 0xbb]);
        Ok(())
    }

    #[test]
    fn mode_sense6_allocation_length_quirk() -> Result<(), Error> {
        // mode data length 5, but padded up to the allocation length
        let mut data = vec![5, 0, 0, 0, 0x01, 0x00];
        data.resize(252, 0);
        let mode = decode_mode_sense6(&data)?;
        assert!(mode.block_descriptors.is_empty());
        assert_eq!(mode.pages.len(), 1);
        assert_eq!(mode.pages[0].page_code, 1);

        assert!(decode_mode_sense6(&[20, 0, 0, 0]).is_err());
        assert!(decode_mode_sense6(&[7, 0, 0, 4, 0, 0, 0, 0]).is_err());
        Ok(())
    }
}
