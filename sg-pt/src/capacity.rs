//! READ CAPACITY, READ BLOCK LIMITS, READ MEDIA SERIAL NUMBER and
//! REPORT IDENTIFYING INFORMATION responses

use endian_trait::Endian;
use serde::Serialize;
use sg_json::{NodeId, Separator, SgjState};

use proxmox_io::ReadExt;

use crate::codec::{get_be16, get_be24, get_be32, get_be64};
use crate::{need_len, DecodeError};

pub const READ_CAPACITY10_LEN: usize = 8;
pub const READ_CAPACITY16_LEN: usize = 32;

#[repr(C, packed)]
#[derive(Endian)]
struct ReadCapacity10Data {
    last_lba: u32,
    block_len: u32,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Capacity {
    pub last_lba: u64,
    pub block_len: u32,
    /// Protection type (1..3), `None` if protection is disabled
    pub protection_type: Option<u8>,
    /// Logical blocks per physical block exponent
    pub lbppbe: u8,
    pub p_i_exponent: u8,
    /// Logical block provisioning management enabled
    pub lbpme: bool,
    /// Unmapped blocks read as zeros
    pub lbprz: bool,
    pub lowest_aligned_lba: u16,
}

impl Capacity {
    pub fn number_of_blocks(&self) -> u64 {
        self.last_lba.saturating_add(1)
    }

    pub fn size_bytes(&self) -> u128 {
        self.number_of_blocks() as u128 * self.block_len as u128
    }

    /// READ CAPACITY(10) hit its limit, READ CAPACITY(16) is required
    pub fn needs_capacity16(&self) -> bool {
        self.last_lba == u32::MAX as u64
    }

    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>) {
        sg_json::sgj_hr!(sgj, "Read Capacity results:\n");
        match self.protection_type {
            Some(p_type) => {
                sgj.haj_vb(obj, 3, "Protection", Separator::Equal, true);
                sgj.haj_vi(obj, 3, "Protection type", Separator::Equal, p_type, false);
            }
            None => sgj.haj_vb(obj, 3, "Protection", Separator::Equal, false),
        }
        sgj.haj_vb(obj, 3, "LBPME", Separator::Equal, self.lbpme);
        sgj.haj_vb(obj, 3, "LBPRZ", Separator::Equal, self.lbprz);
        sgj.haj_vi(obj, 3, "Last LBA", Separator::Equal, self.last_lba, true);
        sgj.haj_vi(obj, 3, "Number of logical blocks", Separator::Equal, self.number_of_blocks(), false);
        sgj.haj_vi(obj, 3, "Logical block length", Separator::Equal, self.block_len, false);
        sgj.haj_vi(
            obj,
            3,
            "Logical blocks per physical block exponent",
            Separator::Equal,
            self.lbppbe,
            false,
        );
        sgj.haj_vi(obj, 3, "Lowest aligned LBA", Separator::Equal, self.lowest_aligned_lba, false);

        let size = self.size_bytes();
        sg_json::sgj_hr!(
            sgj,
            "Hence:\n   Device size: {} bytes, {:.1} MiB, {:.2} GB\n",
            size,
            size as f64 / (1024.0 * 1024.0),
            size as f64 / 1_000_000_000.0
        );
        sgj.js_nv_i(obj, "device_size_bytes", size as i128);
    }
}

pub fn decode_read_capacity10(data: &[u8]) -> Result<Capacity, DecodeError> {
    need_len("READ CAPACITY(10) data", data, READ_CAPACITY10_LEN)?;

    let mut reader = data;
    let cap: ReadCapacity10Data = unsafe { reader.read_be_value()? };

    Ok(Capacity {
        last_lba: cap.last_lba as u64,
        block_len: cap.block_len,
        protection_type: None,
        lbppbe: 0,
        p_i_exponent: 0,
        lbpme: false,
        lbprz: false,
        lowest_aligned_lba: 0,
    })
}

pub fn decode_read_capacity16(data: &[u8]) -> Result<Capacity, DecodeError> {
    // bytes 16..32 are reserved, 16 bytes are enough
    need_len("READ CAPACITY(16) data", data, 16)?;

    let prot_en = (data[12] & 0x01) != 0;
    let lowest = get_be16(data, 14)?;

    Ok(Capacity {
        last_lba: get_be64(data, 0)?,
        block_len: get_be32(data, 8)?,
        protection_type: prot_en.then(|| ((data[12] >> 1) & 0x7) + 1),
        lbppbe: data[13] & 0xf,
        p_i_exponent: data[13] >> 4,
        lbpme: (lowest & 0x8000) != 0,
        lbprz: (lowest & 0x4000) != 0,
        lowest_aligned_lba: lowest & 0x3fff,
    })
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct BlockLimits {
    pub granularity: u8,
    pub max_block_len: u32,
    pub min_block_len: u16,
    /// Maximum logical object identifier, only in the 20 byte (MLOI) form
    pub max_logical_object_id: Option<u64>,
}

/// Decode READ BLOCK LIMITS data, 6 byte or 20 byte (MLOI) form
pub fn decode_block_limits(data: &[u8]) -> Result<BlockLimits, DecodeError> {
    match data.len() {
        6..=19 => Ok(BlockLimits {
            granularity: data[0] & 0x1f,
            max_block_len: get_be24(data, 1)?,
            min_block_len: get_be16(data, 4)?,
            max_logical_object_id: None,
        }),
        len if len >= 20 => Ok(BlockLimits {
            granularity: 0,
            max_block_len: 0,
            min_block_len: 0,
            max_logical_object_id: Some(get_be64(data, 12)?),
        }),
        have => Err(DecodeError::Truncated {
            what: "READ BLOCK LIMITS data",
            need: 6,
            have,
        }),
    }
}

impl BlockLimits {
    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>) {
        if let Some(mloi) = self.max_logical_object_id {
            sgj.haj_vi(obj, 2, "Maximum logical object identifier", Separator::ColonSpace, mloi, false);
            return;
        }
        sg_json::sgj_hr!(sgj, "Read Block Limits results:\n");
        sgj.haj_vi(obj, 2, "Granularity", Separator::ColonSpace, self.granularity, false);
        sgj.haj_vi(obj, 2, "Maximum block length", Separator::ColonSpace, self.max_block_len, false);
        sgj.haj_vi(obj, 2, "Minimum block length", Separator::ColonSpace, self.min_block_len, false);
    }
}

/// Media serial number, the bytes as returned (usually ASCII)
pub fn decode_media_serial_number(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    need_len("media serial number header", data, 4)?;
    let len = get_be32(data, 0)? as usize;
    let end = len.saturating_add(4);
    if end > data.len() {
        return Err(DecodeError::Truncated {
            what: "media serial number",
            need: end,
            have: data.len(),
        });
    }
    Ok(data[4..end].to_vec())
}

/// Identifying information from REPORT IDENTIFYING INFORMATION
///
/// For the "supported information types" request (type 0x7f) the data is
/// a list of 4 byte descriptors; other types return the information as is.
pub fn decode_identifying_information(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    need_len("identifying information header", data, 4)?;
    let len = get_be32(data, 0)? as usize;
    let end = len.saturating_add(4).min(data.len());
    if end < len.saturating_add(4) {
        log::warn!(
            "identifying information truncated: {} of {} bytes",
            end - 4,
            len
        );
    }
    Ok(data[4..end].to_vec())
}

/// `(information type, maximum length)` pairs of the supported types list
pub fn decode_supported_identifying_info_types(data: &[u8]) -> Result<Vec<(u8, u16)>, DecodeError> {
    let info = decode_identifying_information(data)?;
    let mut res = Vec::new();
    for desc in info.chunks_exact(4) {
        res.push((desc[0] >> 1, get_be16(desc, 2)?));
    }
    Ok(res)
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Error;
    use sg_json::JsonOptions;

    #[test]
    fn read_capacity10() -> Result<(), Error> {
        let data = [0x00, 0x1f, 0xff, 0xff, 0x00, 0x00, 0x02, 0x00];
        let cap = decode_read_capacity10(&data)?;
        assert_eq!(cap.last_lba, 0x1f_ffff);
        assert_eq!(cap.number_of_blocks(), 0x20_0000);
        assert_eq!(cap.block_len, 512);
        assert_eq!(cap.size_bytes(), 1024 * 1024 * 1024);
        assert!(!cap.needs_capacity16());

        let cap = decode_read_capacity10(&[0xff, 0xff, 0xff, 0xff, 0, 0, 2, 0])?;
        assert!(cap.needs_capacity16());
        assert!(decode_read_capacity10(&data[..6]).is_err());
        Ok(())
    }

    #[test]
    fn read_capacity16() -> Result<(), Error> {
        let mut data = vec![0u8; 32];
        data[0..8].copy_from_slice(&0x1_0000_0000u64.to_be_bytes());
        data[8..12].copy_from_slice(&4096u32.to_be_bytes());
        data[12] = 0x03; // P_TYPE 1 => type 2, PROT_EN
        data[13] = 0x03;
        data[14] = 0xc0;
        data[15] = 0x07;
        let cap = decode_read_capacity16(&data)?;
        assert_eq!(cap.last_lba, 0x1_0000_0000);
        assert_eq!(cap.block_len, 4096);
        assert_eq!(cap.protection_type, Some(2));
        assert_eq!(cap.lbppbe, 3);
        assert!(cap.lbpme);
        assert!(cap.lbprz);
        assert_eq!(cap.lowest_aligned_lba, 7);
        Ok(())
    }

    #[test]
    fn block_limits() -> Result<(), Error> {
        let limits = decode_block_limits(&[0x02, 0x01, 0x00, 0x00, 0x00, 0x01])?;
        assert_eq!(limits.granularity, 2);
        assert_eq!(limits.max_block_len, 0x10000);
        assert_eq!(limits.min_block_len, 1);
        assert_eq!(limits.max_logical_object_id, None);

        let mut data = vec![0u8; 20];
        data[12..20].copy_from_slice(&0xffff_ffffu64.to_be_bytes());
        let limits = decode_block_limits(&data)?;
        assert_eq!(limits.max_logical_object_id, Some(0xffff_ffff));

        assert!(decode_block_limits(&[0, 0, 0]).is_err());
        Ok(())
    }

    #[test]
    fn serial_and_identifying_info() -> Result<(), Error> {
        let data = [0, 0, 0, 4, b'M', b'S', b'N', b'1'];
        assert_eq!(decode_media_serial_number(&data)?, b"MSN1".to_vec());
        assert!(decode_media_serial_number(&data[..6]).is_err());

        let data = [0, 0, 0, 8, 0x00, 0, 0x01, 0x00, 0x04, 0, 0x00, 0x40];
        assert_eq!(
            decode_supported_identifying_info_types(&data)?,
            vec![(0, 0x100), (2, 0x40)]
        );
        Ok(())
    }

    #[test]
    fn render_capacity() -> Result<(), Error> {
        let cap = decode_read_capacity10(&[0x00, 0x1f, 0xff, 0xff, 0x00, 0x00, 0x02, 0x00])?;
        let mut sgj = SgjState::new(JsonOptions::parse("-l")?, true);
        sgj.start(None, None, &[]);
        cap.render(&mut sgj, None);
        let mut out = Vec::new();
        sgj.finish_output(None, &mut out)?;
        let value: serde_json::Value = serde_json::from_slice(&out)?;
        assert_eq!(value["protection"], false);
        assert_eq!(value["number_of_logical_blocks"], 0x20_0000);
        assert_eq!(value["device_size_bytes"], 1024 * 1024 * 1024);
        Ok(())
    }
}
