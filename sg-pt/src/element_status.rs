//! GET PHYSICAL ELEMENT STATUS response

use endian_trait::Endian;
use sg_json::{NodeId, Separator, SgjState};

use proxmox_io::ReadExt;

use crate::text::{element_health_text, element_type_text};
use crate::{need_len, DecodeError};

pub const ELEMENT_STATUS_HEADER_LEN: usize = 32;
pub const ELEMENT_STATUS_DESCRIPTOR_LEN: usize = 32;

#[repr(C, packed)]
#[derive(Endian)]
struct ElementStatusHeader {
    number_of_descriptors: u32,
    descriptors_returned: u32,
    depopulating_element: u32,
    reserved: [u8; 20],
}

#[repr(C, packed)]
#[derive(Endian)]
struct ElementStatusDescriptorRaw {
    reserved0: [u8; 4],
    element_identifier: u32,
    reserved8: [u8; 5],
    flags: u8,
    element_type: u8,
    health: u8,
    capacity: u64,
    reserved24: [u8; 8],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhysicalElement {
    pub identifier: u32,
    pub restoration_allowed: bool,
    pub element_type: u8,
    pub health: u8,
    /// Associated capacity in logical blocks
    pub capacity: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhysicalElementStatus {
    pub number_of_descriptors: u32,
    pub descriptors_returned: u32,
    /// Identifier of the element being depopulated, 0 for none
    pub depopulating_element: u32,
    pub elements: Vec<PhysicalElement>,
    /// Bytes of an incomplete trailing descriptor
    pub trailing: usize,
}

/// Decode the GET PHYSICAL ELEMENT STATUS parameter data
///
/// A buffer shorter than the header only yields the descriptor count.
pub fn decode_physical_element_status(data: &[u8]) -> Result<PhysicalElementStatus, DecodeError> {
    need_len("physical element status header", data, 4)?;

    if data.len() < ELEMENT_STATUS_HEADER_LEN {
        let count = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        return Ok(PhysicalElementStatus {
            number_of_descriptors: count,
            descriptors_returned: 0,
            depopulating_element: 0,
            elements: Vec::new(),
            trailing: data.len() - 4,
        });
    }

    let mut reader = data;
    let head: ElementStatusHeader = unsafe { reader.read_be_value()? };

    let mut elements = Vec::new();
    for _ in 0..head.descriptors_returned {
        if reader.len() < ELEMENT_STATUS_DESCRIPTOR_LEN {
            break;
        }
        let desc: ElementStatusDescriptorRaw = unsafe { reader.read_be_value()? };
        elements.push(PhysicalElement {
            identifier: desc.element_identifier,
            restoration_allowed: (desc.flags & 0x1) != 0,
            element_type: desc.element_type,
            health: desc.health,
            capacity: desc.capacity,
        });
    }

    let mut trailing = 0;
    if (elements.len() as u32) < head.descriptors_returned {
        trailing = reader.len();
        log::warn!(
            "physical element status: {} of {} descriptors present",
            elements.len(),
            head.descriptors_returned
        );
    }

    Ok(PhysicalElementStatus {
        number_of_descriptors: head.number_of_descriptors,
        descriptors_returned: head.descriptors_returned,
        depopulating_element: head.depopulating_element,
        elements,
        trailing,
    })
}

impl PhysicalElementStatus {
    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>) {
        sgj.haj_vi(obj, 0, "Number of descriptors", Separator::ColonSpace, self.number_of_descriptors, false);
        sgj.haj_vi(obj, 0, "Number of descriptors returned", Separator::ColonSpace, self.descriptors_returned, false);
        sgj.haj_vi(
            obj,
            0,
            "Identifier of element being depopulated",
            Separator::ColonSpace,
            self.depopulating_element,
            false,
        );

        let list = sgj.named_subarray(obj, "physical_element_status_descriptor");
        for (i, element) in self.elements.iter().enumerate() {
            sg_json::sgj_hr!(sgj, "Element {} descriptor\n", i + 1);
            let item = sgj.js_arr_push_object(list);
            sgj.haj_vi(item, 2, "Element identifier", Separator::ColonSpace, element.identifier, false);
            sgj.haj_vb(item, 2, "Restoration allowed", Separator::ColonSpace, element.restoration_allowed);
            sgj.haj_vistr(
                item,
                2,
                "Physical element type",
                Separator::ColonSpace,
                element.element_type,
                element_type_text(element.element_type),
            );
            sgj.haj_vistr(
                item,
                2,
                "Physical element health",
                Separator::ColonSpace,
                element.health,
                element_health_text(element.health),
            );
            sgj.haj_vi(item, 2, "Associated capacity", Separator::ColonSpace, element.capacity, true);
        }
    }
}
