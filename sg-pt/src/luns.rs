//! REPORT LUNS response

use sg_json::{NodeId, Separator, SgjState};

use crate::codec::get_be32;
use crate::{hex_string, need_len, DecodeError};

pub const LUN_LEN: usize = 8;

/// Address method of the first level of a LUN
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LunAddress {
    Peripheral { bus_id: u8, target_or_lun: u8 },
    Flat { lun: u16 },
    LogicalUnit { target: u8, bus: u8, lun: u8 },
    Extended { length: u8, extended_method: u8 },
}

/// One 8 byte LUN from the list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lun(pub [u8; LUN_LEN]);

impl Lun {
    /// The Linux integer representation (scsilun_to_int)
    pub fn to_int(&self) -> u64 {
        let b = &self.0;
        (0..LUN_LEN)
            .step_by(2)
            .fold(0u64, |lun, i| lun | ((((b[i] as u64) << 8) | b[i + 1] as u64) << (i * 8)))
    }

    pub fn first_level(&self) -> LunAddress {
        let b = &self.0;
        match b[0] >> 6 {
            0 => LunAddress::Peripheral {
                bus_id: b[0] & 0x3f,
                target_or_lun: b[1],
            },
            1 => LunAddress::Flat {
                lun: u16::from_be_bytes([b[0] & 0x3f, b[1]]),
            },
            2 => LunAddress::LogicalUnit {
                target: b[0] & 0x3f,
                bus: b[1] >> 5,
                lun: b[1] & 0x1f,
            },
            _ => LunAddress::Extended {
                length: (b[0] >> 4) & 0x3,
                extended_method: b[0] & 0xf,
            },
        }
    }

    /// REPORT LUNS well known logical unit (W-LUN)
    pub fn is_well_known(&self) -> bool {
        self.0[0] == 0xc1 && self.0[1] == 0x01
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LunList {
    pub luns: Vec<Lun>,
    /// LUN list length as reported, may exceed what was returned
    pub list_len: u32,
}

impl LunList {
    pub fn truncated(&self) -> bool {
        self.luns.len() * LUN_LEN < self.list_len as usize
    }
}

pub fn decode_report_luns(data: &[u8]) -> Result<LunList, DecodeError> {
    need_len("REPORT LUNS header", data, 8)?;

    let list_len = get_be32(data, 0)?;
    let end = (list_len as usize).saturating_add(8).min(data.len());

    let luns = data[8..end]
        .chunks_exact(LUN_LEN)
        .map(|chunk| {
            let mut lun = [0u8; LUN_LEN];
            lun.copy_from_slice(chunk);
            Lun(lun)
        })
        .collect();

    Ok(LunList { luns, list_len })
}

impl LunList {
    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>) {
        sg_json::sgj_hr!(sgj, "Lun list length = {} which implies {} lun entries\n", self.list_len, self.list_len / 8);
        sgj.js_nv_i(obj, "lun_list_length", self.list_len);

        let list = sgj.named_subarray(obj, "lun_list");
        for lun in &self.luns {
            sg_json::sgj_hr!(sgj, "    {}\n", hex_string(&lun.0).replace(' ', ""));
            let item = sgj.js_arr_push_object(list);
            sgj.js_nv_s(item, "lun_hex", &hex_string(&lun.0).replace(' ', ""));
            sgj.haj_vi(item, 6, "Linux LUN", Separator::EqualSpace, lun.to_int(), false);
            if lun.is_well_known() {
                sgj.haj_vs(item, 6, "Well known logical unit", Separator::ColonSpace, "REPORT LUNS");
            }
        }
        if self.truncated() {
            sg_json::sgj_hr!(sgj, "  << list truncated, increase allocation length >>\n");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Error;

    fn build_report_luns(luns: &[[u8; 8]], declared: Option<u32>) -> Vec<u8> {
        let len = declared.unwrap_or((luns.len() * 8) as u32);
        let mut res = len.to_be_bytes().to_vec();
        res.extend_from_slice(&[0, 0, 0, 0]);
        for lun in luns {
            res.extend_from_slice(lun);
        }
        res
    }

    #[test]
    fn lun_list() -> Result<(), Error> {
        let data = build_report_luns(
            &[
                [0, 0, 0, 0, 0, 0, 0, 0],
                [0, 1, 0, 0, 0, 0, 0, 0],
                [0x40, 0x10, 0, 0, 0, 0, 0, 0],
                [0xc1, 0x01, 0, 0, 0, 0, 0, 0],
            ],
            None,
        );
        let list = decode_report_luns(&data)?;
        assert_eq!(list.luns.len(), 4);
        assert!(!list.truncated());

        assert_eq!(list.luns[1].to_int(), 1);
        assert_eq!(
            list.luns[1].first_level(),
            LunAddress::Peripheral {
                bus_id: 0,
                target_or_lun: 1
            }
        );
        assert_eq!(list.luns[2].first_level(), LunAddress::Flat { lun: 0x10 });
        assert_eq!(list.luns[2].to_int(), 0x4010);
        assert!(list.luns[3].is_well_known());
        Ok(())
    }

    #[test]
    fn second_level_to_int() {
        let lun = Lun([0x00, 0x02, 0x00, 0x03, 0, 0, 0, 0]);
        assert_eq!(lun.to_int(), 0x0003_0002);
    }

    #[test]
    fn truncated_list() -> Result<(), Error> {
        let data = build_report_luns(&[[0, 1, 0, 0, 0, 0, 0, 0]], Some(64));
        let list = decode_report_luns(&data)?;
        assert_eq!(list.luns.len(), 1);
        assert!(list.truncated());
        assert!(decode_report_luns(&data[..4]).is_err());
        Ok(())
    }
}
