//! INQUIRY: standard data and the VPD pages used for identification

use endian_trait::Endian;
use serde::{Deserialize, Serialize};
use sg_json::{NodeId, Separator, SgjState};

use proxmox_io::ReadExt;

use crate::designator::{render_designator_list, Designator, DesignatorIter};
use crate::text::peripheral_device_type_text;
use crate::{need_len, scsi_ascii_to_string, DecodeError};

pub const VPD_SUPPORTED_VPDS: u8 = 0x00;
pub const VPD_UNIT_SERIAL_NUMBER: u8 = 0x80;
pub const VPD_DEVICE_IDENTIFICATION: u8 = 0x83;

#[repr(C, packed)]
#[derive(Endian)]
// Standard Inquiry page - 36 bytes
struct InquiryPage {
    peripheral_type: u8,
    rmb: u8,
    version: u8,
    flags3: u8,
    additional_length: u8,
    flags5: u8,
    flags6: u8,
    flags7: u8,
    vendor: [u8; 8],
    product: [u8; 16],
    revision: [u8; 4],
}

pub const INQUIRY_PAGE_LEN: usize = std::mem::size_of::<InquiryPage>();

/// Inquiry result
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct InquiryInfo {
    /// Peripheral qualifier (0-7)
    pub peripheral_qualifier: u8,
    /// Peripheral device type (0-31)
    pub peripheral_type: u8,
    /// Peripheral device type as string
    pub peripheral_type_text: String,
    pub removable: bool,
    pub version: u8,
    pub response_data_format: u8,
    pub hisup: bool,
    /// Target port group support (2 bits)
    pub tpgs: u8,
    pub protect: bool,
    pub cmdque: bool,
    /// Vendor
    pub vendor: String,
    /// Product
    pub product: String,
    /// Revision
    pub revision: String,
}

pub fn version_text(version: u8) -> &'static str {
    match version {
        0 => "no conformance claimed",
        3 => "SPC",
        4 => "SPC-2",
        5 => "SPC-3",
        6 => "SPC-4",
        7 => "SPC-5",
        _ => "",
    }
}

/// Decode standard INQUIRY data
///
/// Returns Product/Vendor/Revision and device type.
pub fn decode_standard_inquiry(data: &[u8]) -> Result<InquiryInfo, DecodeError> {
    need_len("standard INQUIRY data", data, INQUIRY_PAGE_LEN)?;

    let mut reader = data;
    let page: InquiryPage = unsafe { reader.read_be_value()? };

    let peripheral_type = page.peripheral_type & 31;

    Ok(InquiryInfo {
        peripheral_qualifier: page.peripheral_type >> 5,
        peripheral_type,
        peripheral_type_text: peripheral_device_type_text(peripheral_type).to_string(),
        removable: (page.rmb & 0x80) != 0,
        version: page.version,
        response_data_format: page.flags3 & 0xf,
        hisup: (page.flags3 & 0x10) != 0,
        tpgs: (page.flags5 >> 4) & 0x3,
        protect: (page.flags5 & 0x01) != 0,
        cmdque: (page.flags7 & 0x02) != 0,
        vendor: scsi_ascii_to_string(&page.vendor),
        product: scsi_ascii_to_string(&page.product),
        revision: scsi_ascii_to_string(&page.revision),
    })
}

impl InquiryInfo {
    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>) {
        sg_json::sgj_hr!(sgj, "standard INQUIRY:\n");
        sgj.haj_vi(obj, 2, "PQual", Separator::Equal, self.peripheral_qualifier, false);
        sgj.haj_vistr(
            obj,
            2,
            "Peripheral device type",
            Separator::ColonSpace,
            self.peripheral_type,
            &self.peripheral_type_text,
        );
        sgj.haj_vb(obj, 2, "RMB", Separator::Equal, self.removable);
        sgj.haj_vistr(obj, 2, "Version", Separator::Equal, self.version, version_text(self.version));
        sgj.haj_vi(obj, 2, "Response data format", Separator::Equal, self.response_data_format, false);
        sgj.haj_vb(obj, 2, "HiSUP", Separator::Equal, self.hisup);
        sgj.haj_vi(obj, 2, "TPGS", Separator::Equal, self.tpgs, false);
        sgj.haj_vb(obj, 2, "Protect", Separator::Equal, self.protect);
        sgj.haj_vb(obj, 2, "CmdQue", Separator::Equal, self.cmdque);
        sgj.haj_vs(obj, 1, "Vendor identification", Separator::ColonSpace, &self.vendor);
        sgj.haj_vs(obj, 1, "Product identification", Separator::ColonSpace, &self.product);
        sgj.haj_vs(obj, 1, "Product revision level", Separator::ColonSpace, &self.revision);
    }
}

/// VPD page with its 4 byte header removed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VpdPage<'a> {
    pub peripheral_type: u8,
    pub page_code: u8,
    pub data: &'a [u8],
}

/// Split a VPD response into header fields and page data
///
/// `expected` is the page code that was asked for.
pub fn decode_vpd_page(data: &[u8], expected: u8) -> Result<VpdPage<'_>, DecodeError> {
    need_len("VPD page header", data, 4)?;

    if data[1] != expected {
        return Err(DecodeError::Invalid(format!(
            "expected VPD page 0x{expected:02x}, got 0x{:02x}",
            data[1]
        )));
    }

    let page_len = u16::from_be_bytes([data[2], data[3]]) as usize;
    let end = page_len + 4;
    if end > data.len() {
        log::warn!(
            "VPD page 0x{expected:02x} truncated: need {end} bytes, have {}",
            data.len()
        );
    }

    Ok(VpdPage {
        peripheral_type: data[0] & 0x1f,
        page_code: data[1],
        data: &data[4..end.min(data.len())],
    })
}

pub fn decode_supported_vpd_pages(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let page = decode_vpd_page(data, VPD_SUPPORTED_VPDS)?;
    Ok(page.data.to_vec())
}

pub fn decode_unit_serial_number(data: &[u8]) -> Result<String, DecodeError> {
    let page = decode_vpd_page(data, VPD_UNIT_SERIAL_NUMBER)?;
    Ok(scsi_ascii_to_string(page.data))
}

/// Device identification page, all designators that could be decoded
pub fn decode_device_identification(data: &[u8]) -> Result<Vec<Designator>, DecodeError> {
    let page = decode_vpd_page(data, VPD_DEVICE_IDENTIFICATION)?;
    DesignatorIter::new(page.data).collect()
}

pub fn render_device_identification(
    sgj: &mut SgjState,
    obj: Option<NodeId>,
    data: &[u8],
) -> Result<(), DecodeError> {
    let page = decode_vpd_page(data, VPD_DEVICE_IDENTIFICATION)?;
    sg_json::sgj_hr!(sgj, "Device Identification VPD page:\n");
    render_designator_list(sgj, obj, page.data);
    Ok(())
}
