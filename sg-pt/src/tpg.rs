//! REPORT TARGET PORT GROUPS response

use sg_json::{NodeId, Separator, SgjState};

use crate::codec::{get_be16, get_be32};
use crate::text::{tpg_asymmetric_access_state_text, tpg_status_code_text};
use crate::{need_len, DecodeError};

const TPG_DESCRIPTOR_HEADER_LEN: usize = 8;
const TARGET_PORT_DESCRIPTOR_LEN: usize = 4;

/// Supported asymmetric access states of a target port group
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TpgSupport {
    pub transitioning: bool,
    pub offline: bool,
    pub lba_dependent: bool,
    pub unavailable: bool,
    pub standby: bool,
    pub active_non_optimized: bool,
    pub active_optimized: bool,
}

impl TpgSupport {
    fn from_byte(b: u8) -> Self {
        Self {
            transitioning: (b & 0x80) != 0,
            offline: (b & 0x40) != 0,
            lba_dependent: (b & 0x10) != 0,
            unavailable: (b & 0x08) != 0,
            standby: (b & 0x04) != 0,
            active_non_optimized: (b & 0x02) != 0,
            active_optimized: (b & 0x01) != 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetPortGroup {
    pub pref: bool,
    pub asymmetric_access_state: u8,
    pub support: TpgSupport,
    pub group_id: u16,
    pub status_code: u8,
    pub vendor_specific: u8,
    /// Relative target port identifiers
    pub ports: Vec<u16>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetPortGroups {
    /// Transition time in seconds, only with the extended header
    pub implicit_transition_time: Option<u8>,
    pub groups: Vec<TargetPortGroup>,
    /// Declared length exceeds the supplied buffer
    pub truncated: bool,
}

fn decode_group(data: &[u8]) -> Result<(TargetPortGroup, usize), DecodeError> {
    need_len("target port group descriptor", data, TPG_DESCRIPTOR_HEADER_LEN)?;

    let port_count = data[7] as usize;
    let len = TPG_DESCRIPTOR_HEADER_LEN + port_count * TARGET_PORT_DESCRIPTOR_LEN;
    need_len("target port group descriptor", data, len)?;

    let mut ports = Vec::with_capacity(port_count);
    for i in 0..port_count {
        let off = TPG_DESCRIPTOR_HEADER_LEN + i * TARGET_PORT_DESCRIPTOR_LEN;
        ports.push(get_be16(data, off + 2)?);
    }

    let group = TargetPortGroup {
        pref: (data[0] & 0x80) != 0,
        asymmetric_access_state: data[0] & 0xf,
        support: TpgSupport::from_byte(data[1]),
        group_id: get_be16(data, 2)?,
        status_code: data[5],
        vendor_specific: data[6],
        ports,
    };
    Ok((group, len))
}

/// Decode REPORT TARGET PORT GROUPS parameter data
///
/// A descriptor running past the available data ends the list, the groups
/// decoded so far are kept.
pub fn decode_target_port_groups(data: &[u8]) -> Result<TargetPortGroups, DecodeError> {
    need_len("target port groups header", data, 4)?;

    let return_len = get_be32(data, 0)? as usize;
    let declared = return_len.saturating_add(4);
    let truncated = declared > data.len();
    let end = declared.min(data.len());

    let extended = data.len() > 4 && ((data[4] >> 4) & 0x7) == 1;
    let (mut off, implicit_transition_time) = if extended {
        need_len("extended target port groups header", data, 8)?;
        (8, Some(data[5]))
    } else {
        (4, None)
    };

    let mut groups = Vec::new();
    let mut truncated = truncated;
    while off < end {
        match decode_group(&data[off..end]) {
            Ok((group, len)) => {
                groups.push(group);
                off += len;
            }
            Err(err) => {
                log::warn!("target port groups: {err}");
                truncated = true;
                break;
            }
        }
    }

    Ok(TargetPortGroups {
        implicit_transition_time,
        groups,
        truncated,
    })
}

impl TargetPortGroups {
    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>) {
        if let Some(time) = self.implicit_transition_time {
            sgj.haj_vi(obj, 0, "Implicit transition time", Separator::ColonSpace, time, false);
        }
        sg_json::sgj_hr!(sgj, "Report target port groups:\n");

        let list = sgj.named_subarray(obj, "target_port_group_list");
        for group in &self.groups {
            let item = sgj.js_arr_push_object(list);
            group.render(sgj, item);
        }
        if self.truncated {
            sg_json::sgj_hr!(sgj, "  << truncated >>\n");
        }
    }
}

impl TargetPortGroup {
    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>) {
        sgj.haj_vi(obj, 2, "target port group id", Separator::ColonSpace, self.group_id, true);
        sgj.haj_vb(obj, 4, "Pref", Separator::Equal, self.pref);
        sgj.haj_vistr(
            obj,
            4,
            "Asymmetric access state",
            Separator::ColonSpace,
            self.asymmetric_access_state,
            tpg_asymmetric_access_state_text(self.asymmetric_access_state),
        );

        let support = &self.support;
        if sgj.as_json {
            let sub = sgj.named_subobject(obj, "supported_states");
            sgj.js_nv_b(sub, "t_sup", support.transitioning);
            sgj.js_nv_b(sub, "o_sup", support.offline);
            sgj.js_nv_b(sub, "lbd_sup", support.lba_dependent);
            sgj.js_nv_b(sub, "u_sup", support.unavailable);
            sgj.js_nv_b(sub, "s_sup", support.standby);
            sgj.js_nv_b(sub, "an_sup", support.active_non_optimized);
            sgj.js_nv_b(sub, "ao_sup", support.active_optimized);
        } else {
            sg_json::sgj_hr!(
                sgj,
                "    T_SUP : {}, O_SUP : {}, LBD_SUP : {}, U_SUP : {}, S_SUP : {}, AN_SUP : {}, AO_SUP : {}\n",
                support.transitioning as u8,
                support.offline as u8,
                support.lba_dependent as u8,
                support.unavailable as u8,
                support.standby as u8,
                support.active_non_optimized as u8,
                support.active_optimized as u8,
            );
        }

        sgj.haj_vistr(
            obj,
            4,
            "Status code",
            Separator::ColonSpace,
            self.status_code,
            tpg_status_code_text(self.status_code),
        );
        sgj.haj_vi(obj, 4, "Vendor unique status", Separator::ColonSpace, self.vendor_specific, true);
        sg_json::sgj_hr!(sgj, "    Target port count: {:02x}\n", self.ports.len());

        if !self.ports.is_empty() {
            sg_json::sgj_hr!(sgj, "    Relative target port ids:\n");
        }
        let list = sgj.named_subarray(obj, "relative_target_port_list");
        for port in &self.ports {
            sg_json::sgj_hr!(sgj, "      0x{:02x}\n", port);
            sgj.js_arr_push_i(list, *port);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Error;
    use sg_json::JsonOptions;

    fn build_group(state: u8, support: u8, id: u16, status: u8, ports: &[u16]) -> Vec<u8> {
        let mut res = vec![state, support];
        res.extend_from_slice(&id.to_be_bytes());
        res.extend_from_slice(&[0, status, 0, ports.len() as u8]);
        for port in ports {
            res.extend_from_slice(&[0, 0]);
            res.extend_from_slice(&port.to_be_bytes());
        }
        res
    }

    fn build_report(extended: Option<u8>, groups: &[Vec<u8>]) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(time) = extended {
            body.extend_from_slice(&[0x10, time, 0, 0]);
        }
        for group in groups {
            body.extend_from_slice(group);
        }
        let mut res = (body.len() as u32).to_be_bytes().to_vec();
        res.extend_from_slice(&body);
        res
    }

    #[test]
    fn plain_header() -> Result<(), Error> {
        let data = build_report(
            None,
            &[
                build_group(0x80, 0x8f, 1, 2, &[1, 2]),
                build_group(0x01, 0x0f, 2, 0, &[3]),
            ],
        );
        let tpgs = decode_target_port_groups(&data)?;
        assert_eq!(tpgs.implicit_transition_time, None);
        assert!(!tpgs.truncated);
        assert_eq!(tpgs.groups.len(), 2);

        let first = &tpgs.groups[0];
        assert!(first.pref);
        assert_eq!(first.asymmetric_access_state, 0);
        assert!(first.support.transitioning);
        assert!(!first.support.offline);
        assert!(first.support.unavailable);
        assert!(first.support.active_optimized);
        assert_eq!(first.status_code, 2);
        assert_eq!(first.ports, vec![1, 2]);

        assert_eq!(tpgs.groups[1].group_id, 2);
        assert_eq!(tpgs.groups[1].asymmetric_access_state, 1);
        Ok(())
    }

    #[test]
    fn extended_header() -> Result<(), Error> {
        let data = build_report(Some(60), &[build_group(0x0e, 0x40, 7, 0, &[])]);
        let tpgs = decode_target_port_groups(&data)?;
        assert_eq!(tpgs.implicit_transition_time, Some(60));
        assert_eq!(tpgs.groups[0].group_id, 7);
        assert_eq!(
            tpg_asymmetric_access_state_text(tpgs.groups[0].asymmetric_access_state),
            "offline"
        );
        Ok(())
    }

    #[test]
    fn truncated_port_list() -> Result<(), Error> {
        let mut data = build_report(
            None,
            &[build_group(0, 0, 1, 0, &[1]), build_group(0, 0, 2, 0, &[4, 5])],
        );
        data.truncate(data.len() - 2);
        let tpgs = decode_target_port_groups(&data)?;
        assert!(tpgs.truncated);
        assert_eq!(tpgs.groups.len(), 1);
        Ok(())
    }

    #[test]
    fn render_json() -> Result<(), Error> {
        let data = build_report(None, &[build_group(0x80, 0x01, 0x11, 0, &[9])]);
        let tpgs = decode_target_port_groups(&data)?;
        let mut sgj = SgjState::new(JsonOptions::parse("-l")?, true);
        sgj.start(None, None, &[]);
        tpgs.render(&mut sgj, None);
        let mut out = Vec::new();
        sgj.finish_output(None, &mut out)?;
        let value: serde_json::Value = serde_json::from_slice(&out)?;
        let group = &value["target_port_group_list"][0];
        assert_eq!(group["target_port_group_id"], 0x11);
        assert_eq!(group["pref"], true);
        assert_eq!(group["supported_states"]["ao_sup"], true);
        assert_eq!(group["relative_target_port_list"][0], 9);
        Ok(())
    }
}
