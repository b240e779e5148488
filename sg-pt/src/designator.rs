//! Designation descriptors (device identification VPD page and sense)

use sg_json::{NodeId, Separator, SgjState};

use crate::codec::{get_be16, get_be24, get_be32, get_be64};
use crate::text::{
    association_text, code_set_text, designator_type_text, protocol_identifier_text,
    PROTOCOL_ID_SOP, PROTOCOL_ID_UAS,
};
use crate::{hex_string, need_len, DecodeError};

pub const DESIGNATOR_VENDOR_SPECIFIC: u8 = 0x0;
pub const DESIGNATOR_T10_VENDOR_ID: u8 = 0x1;
pub const DESIGNATOR_EUI64: u8 = 0x2;
pub const DESIGNATOR_NAA: u8 = 0x3;
pub const DESIGNATOR_RELATIVE_TARGET_PORT: u8 = 0x4;
pub const DESIGNATOR_TARGET_PORT_GROUP: u8 = 0x5;
pub const DESIGNATOR_LOGICAL_UNIT_GROUP: u8 = 0x6;
pub const DESIGNATOR_MD5: u8 = 0x7;
pub const DESIGNATOR_SCSI_NAME_STRING: u8 = 0x8;
pub const DESIGNATOR_PROTOCOL_SPECIFIC_PORT: u8 = 0x9;
pub const DESIGNATOR_UUID: u8 = 0xa;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Naa {
    /// NAA 2
    IeeeExtended {
        vsid_a: u16,
        company_id: u32,
        vsid_b: u32,
    },
    /// NAA 3
    LocallyAssigned { value: u64 },
    /// NAA 5
    IeeeRegistered { company_id: u32, vsid: u64 },
    /// NAA 6
    IeeeRegisteredExtended {
        company_id: u32,
        vsid: u64,
        extension: u64,
    },
    Unknown { naa: u8 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolSpecificPort {
    Uas {
        device_address: u8,
        interface_number: u8,
    },
    Sop { routing_id: u16 },
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DesignatorValue {
    VendorSpecific,
    T10VendorId {
        vendor: String,
        vendor_specific: String,
    },
    Eui64 { id: Vec<u8> },
    Naa(Naa),
    RelativeTargetPort(u16),
    TargetPortGroup(u16),
    LogicalUnitGroup(u16),
    Md5([u8; 16]),
    ScsiNameString(String),
    ProtocolSpecificPort(ProtocolSpecificPort),
    Uuid([u8; 16]),
    Reserved,
    /// Header was fine, but the payload does not match its type
    Malformed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Designator {
    pub protocol_id: u8,
    pub code_set: u8,
    pub piv: bool,
    pub association: u8,
    pub designator_type: u8,
    /// Designator bytes (after the 4 byte header)
    pub raw: Vec<u8>,
    pub value: DesignatorValue,
}

fn decode_naa(d: &[u8]) -> Result<Naa, DecodeError> {
    let naa = d[0] >> 4;
    let need = match naa {
        2 | 3 | 5 => 8,
        6 => 16,
        naa => return Ok(Naa::Unknown { naa }),
    };
    if d.len() != need {
        return Err(DecodeError::Invalid(format!(
            "NAA {naa} designator length {} (expected {need})",
            d.len()
        )));
    }

    let registered_company_id = |d: &[u8]| -> u32 {
        ((d[0] as u32 & 0xf) << 20) | ((d[1] as u32) << 12) | ((d[2] as u32) << 4) | (d[3] as u32 >> 4)
    };

    Ok(match naa {
        2 => Naa::IeeeExtended {
            vsid_a: (((d[0] & 0xf) as u16) << 8) | d[1] as u16,
            company_id: get_be24(d, 2)?,
            vsid_b: get_be24(d, 5)?,
        },
        3 => Naa::LocallyAssigned {
            value: get_be64(d, 0)? & 0x0fff_ffff_ffff_ffff,
        },
        5 => Naa::IeeeRegistered {
            company_id: registered_company_id(d),
            vsid: (((d[3] & 0xf) as u64) << 32) | get_be32(d, 4)? as u64,
        },
        _ => Naa::IeeeRegisteredExtended {
            company_id: registered_company_id(d),
            vsid: (((d[3] & 0xf) as u64) << 32) | get_be32(d, 4)? as u64,
            extension: get_be64(d, 8)?,
        },
    })
}

fn string_payload(d: &[u8]) -> String {
    String::from_utf8_lossy(d)
        .trim_end_matches(char::from(0))
        .trim_end()
        .to_string()
}

fn decode_value(protocol_id: u8, designator_type: u8, d: &[u8]) -> Result<DesignatorValue, DecodeError> {
    let value = match designator_type {
        DESIGNATOR_VENDOR_SPECIFIC => DesignatorValue::VendorSpecific,
        DESIGNATOR_T10_VENDOR_ID => {
            let split = d.len().min(8);
            DesignatorValue::T10VendorId {
                vendor: crate::scsi_ascii_to_string(&d[..split]),
                vendor_specific: string_payload(&d[split..]),
            }
        }
        DESIGNATOR_EUI64 => {
            if !matches!(d.len(), 8 | 12 | 16) {
                return Err(DecodeError::Invalid(format!(
                    "EUI-64 designator length {} (expected 8, 12 or 16)",
                    d.len()
                )));
            }
            DesignatorValue::Eui64 { id: d.to_vec() }
        }
        DESIGNATOR_NAA => {
            need_len("NAA designator", d, 1)?;
            DesignatorValue::Naa(decode_naa(d)?)
        }
        DESIGNATOR_RELATIVE_TARGET_PORT => DesignatorValue::RelativeTargetPort(get_be16(d, 2)?),
        DESIGNATOR_TARGET_PORT_GROUP => DesignatorValue::TargetPortGroup(get_be16(d, 2)?),
        DESIGNATOR_LOGICAL_UNIT_GROUP => DesignatorValue::LogicalUnitGroup(get_be16(d, 2)?),
        DESIGNATOR_MD5 => {
            let md5: [u8; 16] = d
                .try_into()
                .map_err(|_| DecodeError::Invalid(format!("MD5 designator length {} (expected 16)", d.len())))?;
            DesignatorValue::Md5(md5)
        }
        DESIGNATOR_SCSI_NAME_STRING => DesignatorValue::ScsiNameString(string_payload(d)),
        DESIGNATOR_PROTOCOL_SPECIFIC_PORT => {
            let port = match protocol_id {
                PROTOCOL_ID_UAS => {
                    need_len("UAS port designator", d, 3)?;
                    ProtocolSpecificPort::Uas {
                        device_address: d[0] & 0x7f,
                        interface_number: d[2],
                    }
                }
                PROTOCOL_ID_SOP => ProtocolSpecificPort::Sop {
                    routing_id: get_be16(d, 2)?,
                },
                _ => ProtocolSpecificPort::Other,
            };
            DesignatorValue::ProtocolSpecificPort(port)
        }
        DESIGNATOR_UUID => {
            if d.len() != 18 || (d[0] >> 4) != 1 {
                return Err(DecodeError::Invalid(format!(
                    "UUID designator length {} or type {} invalid",
                    d.len(),
                    d.first().map(|b| b >> 4).unwrap_or(0)
                )));
            }
            let mut uuid = [0u8; 16];
            uuid.copy_from_slice(&d[2..18]);
            DesignatorValue::Uuid(uuid)
        }
        _ => DesignatorValue::Reserved,
    };
    Ok(value)
}

impl Designator {
    /// Decode one designation descriptor at the start of `buf`
    ///
    /// Returns the descriptor and the number of bytes it occupies.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), DecodeError> {
        need_len("designation descriptor header", buf, 4)?;
        let len = buf[3] as usize;
        need_len("designation descriptor", buf, 4 + len)?;

        let protocol_id = buf[0] >> 4;
        let code_set = buf[0] & 0xf;
        let piv = (buf[1] & 0x80) != 0;
        let association = (buf[1] >> 4) & 0x3;
        let designator_type = buf[1] & 0xf;
        let raw = buf[4..4 + len].to_vec();

        let value = decode_value(protocol_id, designator_type, &raw)
            .unwrap_or_else(|err| DesignatorValue::Malformed(err.to_string()));

        Ok((
            Self {
                protocol_id,
                code_set,
                piv,
                association,
                designator_type,
                raw,
                value,
            },
            4 + len,
        ))
    }

    /// Protocol identifier, only meaningful for target port associations
    pub fn protocol(&self) -> Option<u8> {
        if self.piv && matches!(self.association, 1 | 2) {
            Some(self.protocol_id)
        } else {
            None
        }
    }

    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>, indent: usize) {
        let inner = indent + 2;
        sgj.haj_vistr(
            obj,
            indent,
            "designator_type",
            Separator::ColonSpace,
            self.designator_type,
            designator_type_text(self.designator_type),
        );
        sgj.haj_vistr(
            obj,
            indent,
            "code_set",
            Separator::ColonSpace,
            self.code_set,
            code_set_text(self.code_set),
        );
        sgj.haj_vistr(
            obj,
            indent,
            "association",
            Separator::ColonSpace,
            self.association,
            association_text(self.association),
        );
        if let Some(protocol) = self.protocol() {
            sgj.haj_vistr(
                obj,
                indent,
                "protocol_identifier",
                Separator::ColonSpace,
                protocol,
                protocol_identifier_text(protocol),
            );
        }

        match &self.value {
            DesignatorValue::VendorSpecific | DesignatorValue::Reserved => {
                sgj.haj_vs(obj, inner, "vendor specific", Separator::ColonSpace, &hex_string(&self.raw));
            }
            DesignatorValue::T10VendorId {
                vendor,
                vendor_specific,
            } => {
                sgj.haj_vs(obj, inner, "T10 vendor identification", Separator::ColonSpace, vendor);
                sgj.haj_vs(obj, inner, "vendor specific identifier", Separator::ColonSpace, vendor_specific);
            }
            DesignatorValue::Eui64 { id } => {
                let text = format!("0x{}", hex::encode(id));
                sgj.haj_vs(obj, inner, "EUI-64 based designator", Separator::ColonSpace, &text);
            }
            DesignatorValue::Naa(naa) => self.render_naa(sgj, obj, inner, naa),
            DesignatorValue::RelativeTargetPort(port) => {
                sgj.haj_vi(obj, inner, "Relative target port", Separator::ColonSpace, *port, true);
            }
            DesignatorValue::TargetPortGroup(group) => {
                sgj.haj_vi(obj, inner, "Target port group", Separator::ColonSpace, *group, true);
            }
            DesignatorValue::LogicalUnitGroup(group) => {
                sgj.haj_vi(obj, inner, "Logical unit group", Separator::ColonSpace, *group, true);
            }
            DesignatorValue::Md5(md5) => {
                let text = format!("0x{}", hex::encode(md5));
                sgj.haj_vs(obj, inner, "MD5 logical unit identifier", Separator::ColonSpace, &text);
            }
            DesignatorValue::ScsiNameString(name) => {
                sgj.haj_vs(obj, inner, "SCSI name string", Separator::ColonSpace, name);
            }
            DesignatorValue::ProtocolSpecificPort(port) => match port {
                ProtocolSpecificPort::Uas {
                    device_address,
                    interface_number,
                } => {
                    sgj.haj_vi(obj, inner, "UAS device address", Separator::ColonSpace, *device_address, true);
                    sgj.haj_vi(obj, inner, "UAS interface number", Separator::ColonSpace, *interface_number, true);
                }
                ProtocolSpecificPort::Sop { routing_id } => {
                    sgj.haj_vi(obj, inner, "PCIe routing ID", Separator::ColonSpace, *routing_id, true);
                }
                ProtocolSpecificPort::Other => {
                    sgj.haj_vs(obj, inner, "protocol specific", Separator::ColonSpace, &hex_string(&self.raw));
                }
            },
            DesignatorValue::Uuid(uuid) => {
                sgj.haj_vs(obj, inner, "UUID", Separator::ColonSpace, &format_uuid(uuid));
            }
            DesignatorValue::Malformed(reason) => {
                sgj.haj_vs(obj, inner, "malformed designator", Separator::ColonSpace, reason);
                sgj.haj_vs(obj, inner, "designator", Separator::ColonSpace, &hex_string(&self.raw));
            }
        }
    }

    fn render_naa(&self, sgj: &mut SgjState, obj: Option<NodeId>, indent: usize, naa: &Naa) {
        let naa_type = self.raw.first().map(|b| b >> 4).unwrap_or(0);
        sgj.haj_vi(obj, indent, "NAA", Separator::ColonSpace, naa_type, false);
        match naa {
            Naa::IeeeExtended {
                vsid_a,
                company_id,
                vsid_b,
            } => {
                sgj.haj_vi(obj, indent, "Vendor specific identifier A", Separator::ColonSpace, *vsid_a, true);
                sgj.haj_vi(obj, indent, "IEEE company id", Separator::ColonSpace, *company_id, true);
                sgj.haj_vi(obj, indent, "Vendor specific identifier B", Separator::ColonSpace, *vsid_b, true);
            }
            Naa::LocallyAssigned { value } => {
                sgj.haj_vi(obj, indent, "Locally assigned value", Separator::ColonSpace, *value, true);
            }
            Naa::IeeeRegistered { company_id, vsid } => {
                sgj.haj_vi(obj, indent, "IEEE company id", Separator::ColonSpace, *company_id, true);
                sgj.haj_vi(obj, indent, "Vendor specific identifier", Separator::ColonSpace, *vsid, true);
            }
            Naa::IeeeRegisteredExtended {
                company_id,
                vsid,
                extension,
            } => {
                sgj.haj_vi(obj, indent, "IEEE company id", Separator::ColonSpace, *company_id, true);
                sgj.haj_vi(obj, indent, "Vendor specific identifier", Separator::ColonSpace, *vsid, true);
                sgj.haj_vi(
                    obj,
                    indent,
                    "Vendor specific identifier extension",
                    Separator::ColonSpace,
                    *extension,
                    true,
                );
            }
            Naa::Unknown { .. } => {
                sgj.haj_vs(obj, indent, "unknown NAA", Separator::ColonSpace, &hex_string(&self.raw));
            }
        }
        let text = format!("0x{}", hex::encode(&self.raw));
        sgj.haj_vs(obj, indent, "naa_designator", Separator::ColonSpace, &text);
    }
}

/// 8-4-4-4-12 UUID text
pub fn format_uuid(uuid: &[u8; 16]) -> String {
    let text = hex::encode(uuid);
    format!(
        "{}-{}-{}-{}-{}",
        &text[0..8],
        &text[8..12],
        &text[12..16],
        &text[16..20],
        &text[20..32]
    )
}

/// Iterate over a list of designation descriptors
///
/// Stops after the first malformed (truncated) descriptor.
pub struct DesignatorIter<'a> {
    data: &'a [u8],
    done: bool,
}

impl<'a> DesignatorIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, done: false }
    }
}

impl<'a> Iterator for DesignatorIter<'a> {
    type Item = Result<Designator, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.data.is_empty() {
            return None;
        }
        match Designator::decode(self.data) {
            Ok((designator, len)) => {
                self.data = &self.data[len..];
                Some(Ok(designator))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Render a designation descriptor list, like the one of VPD page 0x83
pub fn render_designator_list(sgj: &mut SgjState, obj: Option<NodeId>, data: &[u8]) {
    let list = sgj.named_subarray(obj, "designation_descriptor_list");
    for (i, designator) in DesignatorIter::new(data).enumerate() {
        match designator {
            Ok(designator) => {
                sg_json::sgj_hr!(
                    sgj,
                    "  Designation descriptor number {}, descriptor length: {}\n",
                    i + 1,
                    designator.raw.len() + 4
                );
                let item = sgj.js_arr_push_object(list);
                designator.render(sgj, item, 4);
            }
            Err(err) => {
                log::warn!("designation descriptor {} - {err}", i + 1);
                sg_json::sgj_hr!(sgj, "  unable to decode designation descriptor {}: {err}\n", i + 1);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sg_json::JsonOptions;

    fn build_designator(proto_code: u8, flags: u8, payload: &[u8]) -> Vec<u8> {
        let mut data = vec![proto_code, flags, 0, payload.len() as u8];
        data.extend_from_slice(payload);
        data
    }

    fn decode_value_of(designator_type: u8, proto: u8, payload: &[u8]) -> Result<DesignatorValue, DecodeError> {
        let data = build_designator((proto << 4) | 1, 0x80 | 0x10 | designator_type, payload);
        let (designator, len) = Designator::decode(&data)?;
        assert_eq!(len, data.len());
        assert_eq!(designator.designator_type, designator_type);
        Ok(designator.value)
    }

    #[test]
    fn all_designator_types() -> Result<(), DecodeError> {
        assert_eq!(decode_value_of(0x0, 0, &[1, 2])?, DesignatorValue::VendorSpecific);
        assert_eq!(
            decode_value_of(0x1, 0, b"ACME    disk 42\0")?,
            DesignatorValue::T10VendorId {
                vendor: "ACME".to_string(),
                vendor_specific: "disk 42".to_string()
            }
        );
        assert_eq!(
            decode_value_of(0x2, 0, &[1, 2, 3, 4, 5, 6, 7, 8])?,
            DesignatorValue::Eui64 {
                id: vec![1, 2, 3, 4, 5, 6, 7, 8]
            }
        );
        assert_eq!(
            decode_value_of(0x3, 0, &[0x50, 0x00, 0xc5, 0x00, 0x12, 0x34, 0x56, 0x78])?,
            DesignatorValue::Naa(Naa::IeeeRegistered {
                company_id: 0x000c50,
                vsid: 0x12345678
            })
        );
        assert_eq!(decode_value_of(0x4, 0, &[0, 0, 0, 2])?, DesignatorValue::RelativeTargetPort(2));
        assert_eq!(decode_value_of(0x5, 0, &[0, 0, 0x01, 0x01])?, DesignatorValue::TargetPortGroup(0x101));
        assert_eq!(decode_value_of(0x6, 0, &[0, 0, 0, 7])?, DesignatorValue::LogicalUnitGroup(7));
        assert_eq!(decode_value_of(0x7, 0, &[0xaa; 16])?, DesignatorValue::Md5([0xaa; 16]));
        assert_eq!(
            decode_value_of(0x8, 0, b"naa.5000c500\0\0\0\0")?,
            DesignatorValue::ScsiNameString("naa.5000c500".to_string())
        );
        assert_eq!(
            decode_value_of(0x9, PROTOCOL_ID_UAS, &[0x85, 0, 3, 0])?,
            DesignatorValue::ProtocolSpecificPort(ProtocolSpecificPort::Uas {
                device_address: 5,
                interface_number: 3
            })
        );
        assert_eq!(
            decode_value_of(0x9, PROTOCOL_ID_SOP, &[0, 0, 0x12, 0x34])?,
            DesignatorValue::ProtocolSpecificPort(ProtocolSpecificPort::Sop { routing_id: 0x1234 })
        );

        let mut uuid = vec![0x10, 0];
        uuid.extend(0u8..16);
        let mut expected = [0u8; 16];
        expected.iter_mut().enumerate().for_each(|(i, b)| *b = i as u8);
        assert_eq!(decode_value_of(0xa, 0, &uuid)?, DesignatorValue::Uuid(expected));
        assert_eq!(format_uuid(&expected), "00010203-0405-0607-0809-0a0b0c0d0e0f");

        assert_eq!(decode_value_of(0xc, 0, &[1])?, DesignatorValue::Reserved);
        Ok(())
    }

    #[test]
    fn naa_variants() -> Result<(), DecodeError> {
        assert_eq!(
            decode_value_of(0x3, 0, &[0x21, 0x23, 0x00, 0x10, 0x86, 0x01, 0x02, 0x03])?,
            DesignatorValue::Naa(Naa::IeeeExtended {
                vsid_a: 0x123,
                company_id: 0x001086,
                vsid_b: 0x010203
            })
        );
        let naa6 = [
            0x60, 0x01, 0x40, 0x5f, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0, 0, 0, 0, 9,
        ];
        assert_eq!(
            decode_value_of(0x3, 0, &naa6)?,
            DesignatorValue::Naa(Naa::IeeeRegisteredExtended {
                company_id: 0x001405,
                vsid: 0xf_ffff_ffff,
                extension: 9
            })
        );

        // unknown NAA keeps the raw bytes
        let data = build_designator(1, 0x03, &[0x70, 1, 2, 3, 4, 5, 6, 7]);
        let (designator, _) = Designator::decode(&data)?;
        assert_eq!(designator.value, DesignatorValue::Naa(Naa::Unknown { naa: 7 }));
        assert_eq!(designator.raw, vec![0x70, 1, 2, 3, 4, 5, 6, 7]);

        // wrong length for NAA 5
        assert!(matches!(
            decode_value_of(0x3, 0, &[0x50, 0, 0])?,
            DesignatorValue::Malformed(_)
        ));
        Ok(())
    }

    #[test]
    fn length_validation() {
        let data = build_designator(1, 0x03, &[0x50; 8]);
        assert_eq!(
            Designator::decode(&data[..10]),
            Err(DecodeError::Truncated {
                what: "designation descriptor",
                need: 12,
                have: 10
            })
        );
        assert!(Designator::decode(&[1, 2]).is_err());
    }

    #[test]
    fn list_iteration_stops_on_truncation() {
        let mut data = build_designator(2, 0x01, b"ACME    x");
        data.extend(build_designator(1, 0x14, &[0, 0, 0, 1]));
        data.extend([1, 3, 0, 8, 0x50]);

        let items: Vec<_> = DesignatorIter::new(&data).collect();
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(matches!(
            items[1].as_ref().map(|d| &d.value),
            Ok(DesignatorValue::RelativeTargetPort(1))
        ));
        assert!(items[2].is_err());
    }

    #[test]
    fn render_json_and_text() -> Result<(), anyhow::Error> {
        let data = build_designator(1, 0x03, &[0x50, 0x00, 0xc5, 0x00, 0x12, 0x34, 0x56, 0x78]);

        let mut sgj = SgjState::with_buffer(JsonOptions::default(), false);
        render_designator_list(&mut sgj, None, &data);
        let text = sgj.take_human_output();
        assert!(text.contains("Designation descriptor number 1, descriptor length: 12"));
        assert!(text.contains("IEEE company id: 0xc50"));

        let mut sgj = SgjState::new(JsonOptions::parse("-l")?, true);
        sgj.start(None, None, &[]);
        render_designator_list(&mut sgj, None, &data);
        let mut out = Vec::new();
        sgj.finish_output(None, &mut out)?;
        let value: serde_json::Value = serde_json::from_slice(&out)?;
        let desc = &value["designation_descriptor_list"][0];
        assert_eq!(desc["designator_type"]["i"], 3);
        assert_eq!(desc["designator_type"]["meaning"], "NAA");
        assert_eq!(desc["ieee_company_id"], 0xc50);
        assert_eq!(desc["naa"], 5);
        Ok(())
    }
}
