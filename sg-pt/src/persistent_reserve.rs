//! PERSISTENT RESERVE IN responses and the basic PERSISTENT RESERVE OUT
//! parameter list

use sg_json::{NodeId, Separator, SgjState};

use crate::codec::{get_be32, get_be64};
use crate::{need_len, DecodeError};

pub const PRIN_READ_KEYS: u8 = 0x00;
pub const PRIN_READ_RESERVATION: u8 = 0x01;

pub const PROUT_REGISTER: u8 = 0x00;
pub const PROUT_RESERVE: u8 = 0x01;
pub const PROUT_RELEASE: u8 = 0x02;
pub const PROUT_CLEAR: u8 = 0x03;

pub const PROUT_PARAM_LIST_LEN: usize = 24;

pub fn pr_type_text(pr_type: u8) -> &'static str {
    match pr_type {
        1 => "Write Exclusive",
        3 => "Exclusive Access",
        5 => "Write Exclusive, registrants only",
        6 => "Exclusive Access, registrants only",
        7 => "Write Exclusive, all registrants",
        8 => "Exclusive Access, all registrants",
        _ => "obsolete [or reserved]",
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisteredKeys {
    pub generation: u32,
    pub keys: Vec<u64>,
    /// Additional length exceeds the returned data
    pub truncated: bool,
}

fn decode_prin_header(data: &[u8]) -> Result<(u32, &[u8], bool), DecodeError> {
    need_len("PERSISTENT RESERVE IN header", data, 8)?;
    let generation = get_be32(data, 0)?;
    let additional_len = get_be32(data, 4)? as usize;
    let declared = additional_len.saturating_add(8);
    let end = declared.min(data.len());
    Ok((generation, &data[8..end], declared > data.len()))
}

pub fn decode_read_keys(data: &[u8]) -> Result<RegisteredKeys, DecodeError> {
    let (generation, list, truncated) = decode_prin_header(data)?;
    let mut keys = Vec::with_capacity(list.len() / 8);
    for off in (0..list.len() / 8).map(|i| i * 8) {
        keys.push(get_be64(list, off)?);
    }
    Ok(RegisteredKeys {
        generation,
        keys,
        truncated,
    })
}

impl RegisteredKeys {
    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>) {
        sgj.haj_vi(obj, 2, "PR generation", Separator::Equal, self.generation, true);
        if self.keys.is_empty() {
            sg_json::sgj_hr!(sgj, "  there are NO registered reservation keys\n");
        } else {
            sg_json::sgj_hr!(sgj, "  {} registered reservation key(s) follow:\n", self.keys.len());
        }
        let list = sgj.named_subarray(obj, "reservation_key_list");
        for key in &self.keys {
            sg_json::sgj_hr!(sgj, "    0x{:x}\n", key);
            sgj.js_arr_push_s(list, &format!("0x{key:x}"));
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reservation {
    pub key: u64,
    pub scope: u8,
    pub pr_type: u8,
}

/// Decode READ RESERVATION data, `None` if there is no reservation
pub fn decode_read_reservation(data: &[u8]) -> Result<(u32, Option<Reservation>), DecodeError> {
    let (generation, desc, _) = decode_prin_header(data)?;
    if desc.is_empty() {
        return Ok((generation, None));
    }
    need_len("reservation descriptor", desc, 16)?;
    Ok((
        generation,
        Some(Reservation {
            key: get_be64(desc, 0)?,
            scope: desc[13] >> 4,
            pr_type: desc[13] & 0xf,
        }),
    ))
}

/// Parameter list for REGISTER, RESERVE, RELEASE and CLEAR
pub fn build_prout_param_list(key: u64, sa_key: u64, aptpl: bool) -> Vec<u8> {
    let mut list = vec![0u8; PROUT_PARAM_LIST_LEN];
    list[0..8].copy_from_slice(&key.to_be_bytes());
    list[8..16].copy_from_slice(&sa_key.to_be_bytes());
    if aptpl {
        list[20] |= 0x01;
    }
    list
}
