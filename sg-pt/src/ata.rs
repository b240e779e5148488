//! ATA general purpose log directory (log address 0), read through SAT

use sg_json::{NodeId, Separator, SgjState};

use crate::codec::get_le16;
use crate::{need_len, DecodeError};

pub const ATA_LOG_DIRECTORY_LEN: usize = 512;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtaLogEntry {
    pub log_address: u8,
    pub pages: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtaLogDirectory {
    pub version: u16,
    /// Non empty log addresses, in address order
    pub entries: Vec<AtaLogEntry>,
}

pub fn ata_log_address_name(log_address: u8) -> Option<&'static str> {
    Some(match log_address {
        0x00 => "Log directory",
        0x01 => "Summary SMART error log",
        0x02 => "Comprehensive SMART error log",
        0x03 => "Extended comprehensive SMART error log",
        0x04 => "Device statistics",
        0x06 => "SMART self-test log",
        0x07 => "Extended SMART self-test log",
        0x08 => "Power conditions",
        0x09 => "Selective self-test log",
        0x0c => "Pending defects log",
        0x0d => "LPS mis-alignment log",
        0x10 => "NCQ command error log",
        0x11 => "SATA Phy event counters log",
        0x13 => "SATA NCQ send and receive log",
        0x18 => "Command duration limits log",
        0x30 => "IDENTIFY DEVICE data",
        0x80..=0x9f => "Host specific log",
        0xa0..=0xdf => "Device vendor specific log",
        _ => return None,
    })
}

/// Decode the log directory from a buffer of little endian words
///
/// Word 0 is the logging version, word N the number of pages at log
/// address N. Shorter buffers are accepted, a trailing odd byte is ignored.
pub fn decode_ata_log_directory(data: &[u8]) -> Result<AtaLogDirectory, DecodeError> {
    need_len("ATA log directory", data, 2)?;

    let data = &data[..data.len().min(ATA_LOG_DIRECTORY_LEN)];
    let version = get_le16(data, 0)?;

    let mut entries = Vec::new();
    for log_address in 1..(data.len() / 2) {
        let pages = get_le16(data, log_address * 2)?;
        if pages == 0 {
            continue;
        }
        entries.push(AtaLogEntry {
            log_address: log_address as u8,
            pages,
        });
    }

    Ok(AtaLogDirectory { version, entries })
}

impl AtaLogDirectory {
    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>) {
        sgj.haj_vi(obj, 0, "General purpose logging version", Separator::ColonSpace, self.version, false);

        let list = sgj.named_subarray(obj, "log_address_list");
        for entry in &self.entries {
            let name = ata_log_address_name(entry.log_address);
            match name {
                Some(name) => sg_json::sgj_hr!(
                    sgj,
                    "  Log address 0x{:02x} [{}]: {} pages\n",
                    entry.log_address,
                    name,
                    entry.pages
                ),
                None => sg_json::sgj_hr!(
                    sgj,
                    "  Log address 0x{:02x}: {} pages\n",
                    entry.log_address,
                    entry.pages
                ),
            }

            let item = sgj.js_arr_push_object(list);
            sgj.js_nv_ihexstr(item, "log_address", entry.log_address, Some("name"), name);
            sgj.js_nv_i(item, "number_of_pages", entry.pages);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Error;
    use sg_json::JsonOptions;

    fn build_directory(version: u16, pages: &[(u8, u16)]) -> Vec<u8> {
        let mut res = vec![0u8; ATA_LOG_DIRECTORY_LEN];
        res[0..2].copy_from_slice(&version.to_le_bytes());
        for (addr, count) in pages {
            let off = *addr as usize * 2;
            res[off..off + 2].copy_from_slice(&count.to_le_bytes());
        }
        res
    }

    #[test]
    fn log_directory() -> Result<(), Error> {
        let data = build_directory(1, &[(0x03, 0x100), (0x04, 8), (0x30, 9), (0xff, 1)]);
        let dir = decode_ata_log_directory(&data)?;
        assert_eq!(dir.version, 1);
        assert_eq!(
            dir.entries,
            vec![
                AtaLogEntry { log_address: 0x03, pages: 0x100 },
                AtaLogEntry { log_address: 0x04, pages: 8 },
                AtaLogEntry { log_address: 0x30, pages: 9 },
                AtaLogEntry { log_address: 0xff, pages: 1 },
            ]
        );
        Ok(())
    }

    #[test]
    fn short_and_odd_buffers() -> Result<(), Error> {
        let dir = decode_ata_log_directory(&[1, 0, 0, 0, 5, 0, 7])?;
        assert_eq!(dir.entries, vec![AtaLogEntry { log_address: 2, pages: 5 }]);
        assert!(decode_ata_log_directory(&[1]).is_err());
        Ok(())
    }

    #[test]
    fn render_text() -> Result<(), Error> {
        let dir = decode_ata_log_directory(&build_directory(1, &[(0x04, 8), (0x05, 1)]))?;
        let mut sgj = SgjState::with_buffer(JsonOptions::default(), false);
        dir.render(&mut sgj, None);
        assert_eq!(
            sgj.take_human_output(),
            "General purpose logging version: 1\n  \
             Log address 0x04 [Device statistics]: 8 pages\n  \
             Log address 0x05: 1 pages\n"
        );
        Ok(())
    }
}
