//! LOG SENSE pages: header, generic parameter list and the supported pages

use std::io::Read;

use anyhow::{bail, Error};
use endian_trait::Endian;
use sg_json::{NodeId, Separator, SgjState};

use proxmox_io::ReadExt;

use crate::{hex_string, need_len, DecodeError};

pub const LOG_PAGE_HEADER_LEN: usize = 4;

pub const SUPPORTED_LOG_PAGES: u8 = 0x00;
pub const SUPPORTED_SUBPAGES: u8 = 0xff;

#[repr(C, packed)]
#[derive(Endian)]
struct LogPageHeader {
    page_code: u8,
    subpage_code: u8,
    page_len: u16,
}

#[repr(C, packed)]
#[derive(Endian)]
struct LpParameterHeader {
    parameter_code: u16,
    control: u8,
    parameter_len: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogParameter {
    pub parameter_code: u16,
    pub control: u8,
    pub data: Vec<u8>,
}

impl LogParameter {
    /// Parameter value as big endian counter (1 to 8 bytes)
    pub fn counter(&self) -> Result<u64, Error> {
        let len = self.data.len();
        if len == 0 || len > 8 {
            bail!("invalid counter size '{}'", len);
        }
        let mut buffer = [0u8; 8];
        let mut reader = &self.data[..];
        reader.read_exact(&mut buffer[..len])?;

        Ok(buffer
            .iter()
            .take(len)
            .fold(0, |value, curr| (value << 8) | *curr as u64))
    }

    /// Format and linking (bits 0..1 of the control byte)
    pub fn format_and_linking(&self) -> u8 {
        self.control & 0x3
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogPage {
    pub page_code: u8,
    pub subpage_code: u8,
    pub ds: bool,
    pub spf: bool,
    pub parameters: Vec<LogParameter>,
    /// Page length larger than the data returned
    pub truncated: bool,
}

/// Decode a log page into its parameter list
///
/// If the page is shorter than declared, decoding stops at the last
/// complete parameter.
pub fn decode_log_page(data: &[u8]) -> Result<LogPage, DecodeError> {
    need_len("log page header", data, LOG_PAGE_HEADER_LEN)?;

    let mut reader = data;
    let head: LogPageHeader = unsafe { reader.read_be_value()? };

    let expected_len = head.page_len as usize + LOG_PAGE_HEADER_LEN;
    let truncated = expected_len > data.len();
    if truncated {
        log::warn!(
            "log page 0x{:02x}: wrong page length: got {}, expected {}",
            head.page_code & 0x3f,
            data.len(),
            expected_len
        );
    }
    let mut reader = &data[LOG_PAGE_HEADER_LEN..expected_len.min(data.len())];

    let mut parameters = Vec::new();
    let mut truncated = truncated;
    while !reader.is_empty() {
        if reader.len() < std::mem::size_of::<LpParameterHeader>() {
            truncated = true;
            break;
        }
        let param: LpParameterHeader = unsafe { reader.read_be_value()? };
        let len = param.parameter_len as usize;
        if reader.len() < len {
            truncated = true;
            break;
        }
        let (value, rest) = reader.split_at(len);
        parameters.push(LogParameter {
            parameter_code: param.parameter_code,
            control: param.control,
            data: value.to_vec(),
        });
        reader = rest;
    }

    Ok(LogPage {
        page_code: head.page_code & 0x3f,
        subpage_code: head.subpage_code,
        ds: (head.page_code & 0x80) != 0,
        spf: (head.page_code & 0x40) != 0,
        parameters,
        truncated,
    })
}

/// Decode the supported log pages (page 0x00) response
///
/// Subpage 0x00 lists page codes, subpage 0xff lists `(page, subpage)`
/// pairs.
pub fn decode_supported_log_pages(data: &[u8]) -> Result<Vec<(u8, u8)>, DecodeError> {
    need_len("log page header", data, LOG_PAGE_HEADER_LEN)?;

    if (data[0] & 0x3f) != SUPPORTED_LOG_PAGES {
        return Err(DecodeError::Invalid(format!(
            "expected supported log pages, got page 0x{:02x}",
            data[0] & 0x3f
        )));
    }

    let page_len = u16::from_be_bytes([data[2], data[3]]) as usize;
    let end = (page_len + LOG_PAGE_HEADER_LEN).min(data.len());
    let list = &data[LOG_PAGE_HEADER_LEN..end];

    if data[1] == SUPPORTED_SUBPAGES {
        Ok(list
            .chunks_exact(2)
            .map(|pair| (pair[0] & 0x3f, pair[1]))
            .collect())
    } else {
        Ok(list.iter().map(|page| (page & 0x3f, 0)).collect())
    }
}

pub fn log_page_name(page_code: u8, subpage_code: u8) -> Option<&'static str> {
    Some(match (page_code, subpage_code) {
        (0x00, 0x00) => "Supported log pages",
        (0x00, 0xff) => "Supported log pages and subpages",
        (0x02, 0x00) => "Write error counter",
        (0x03, 0x00) => "Read error counter",
        (0x05, 0x00) => "Verify error counter",
        (0x06, 0x00) => "Non-medium error",
        (0x0d, 0x00) => "Temperature",
        (0x0e, 0x00) => "Start-stop cycle counter",
        (0x10, 0x00) => "Self-test results",
        (0x11, 0x00) => "Solid state media",
        (0x15, 0x00) => "Background scan results",
        (0x17, 0x00) => "Volume statistics",
        (0x18, 0x00) => "Protocol specific port",
        (0x19, 0x00) => "General statistics and performance",
        (0x2e, 0x00) => "Tape alert",
        (0x2f, 0x00) => "Informational exceptions",
        _ => return None,
    })
}

impl LogPage {
    pub fn render(&self, sgj: &mut SgjState, obj: Option<NodeId>) {
        let name = log_page_name(self.page_code, self.subpage_code).unwrap_or("Unknown log page");
        if self.spf {
            sg_json::sgj_hr!(
                sgj,
                "{} [0x{:x},0x{:x}]\n",
                name,
                self.page_code,
                self.subpage_code
            );
        } else {
            sg_json::sgj_hr!(sgj, "{} [0x{:x}]\n", name, self.page_code);
        }
        sgj.js_nv_ihexstr(obj, "page_code", self.page_code, Some("name"), Some(name));
        sgj.js_nv_ihex(obj, "subpage_code", self.subpage_code);
        sgj.js_nv_b(obj, "ds", self.ds);
        sgj.js_nv_b(obj, "spf", self.spf);

        let list = sgj.named_subarray(obj, "parameter_list");
        for param in &self.parameters {
            let item = sgj.js_arr_push_object(list);
            sgj.haj_vi(item, 2, "Parameter code", Separator::EqualSpace, param.parameter_code, true);
            sgj.haj_vi(item, 4, "Control", Separator::EqualSpace, param.control, true);
            sgj.haj_vs(item, 4, "Parameter bytes", Separator::ColonSpace, &hex_string(&param.data));
        }
        if self.truncated {
            sgj.haj_vb(obj, 0, "truncated", Separator::ColonSpace, true);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sg_json::JsonOptions;

    fn build_log_page(page: u8, subpage: u8, params: &[(u16, u8, Vec<u8>)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (code, control, value) in params {
            body.extend_from_slice(&code.to_be_bytes());
            body.push(*control);
            body.push(value.len() as u8);
            body.extend_from_slice(value);
        }
        let mut res = vec![page, subpage];
        res.extend_from_slice(&(body.len() as u16).to_be_bytes());
        res.extend_from_slice(&body);
        res
    }

    #[test]
    fn parameter_list() -> Result<(), Error> {
        let data = build_log_page(
            0x0d,
            0,
            &[(0x0000, 0x03, vec![0, 38]), (0x0001, 0x03, vec![0, 65])],
        );
        let page = decode_log_page(&data)?;
        assert_eq!(page.page_code, 0x0d);
        assert!(!page.spf);
        assert_eq!(page.parameters.len(), 2);
        assert_eq!(page.parameters[0].counter()?, 38);
        assert_eq!(page.parameters[1].parameter_code, 1);
        assert_eq!(page.parameters[1].format_and_linking(), 3);
        Ok(())
    }

    #[test]
    fn counters() -> Result<(), Error> {
        let param = LogParameter {
            parameter_code: 0,
            control: 0,
            data: vec![0x01, 0x00, 0x00, 0x00, 0x00],
        };
        assert_eq!(param.counter()?, 0x01_0000_0000);

        let param = LogParameter {
            parameter_code: 0,
            control: 0,
            data: vec![0; 9],
        };
        assert!(param.counter().is_err());
        Ok(())
    }

    #[test]
    fn short_page() -> Result<(), Error> {
        let mut data = build_log_page(0x17, 0, &[(1, 0, vec![1, 2, 3, 4]), (2, 0, vec![5, 6, 7, 8])]);
        data.truncate(data.len() - 2);
        let page = decode_log_page(&data)?;
        assert!(page.truncated);
        assert_eq!(page.parameters.len(), 1);
        Ok(())
    }

    #[test]
    fn supported_pages() -> Result<(), Error> {
        let data = [0x00, 0x00, 0x00, 0x04, 0x00, 0x02, 0x0d, 0x2f];
        assert_eq!(
            decode_supported_log_pages(&data)?,
            vec![(0, 0), (2, 0), (0x0d, 0), (0x2f, 0)]
        );

        let data = [0x40, 0xff, 0x00, 0x04, 0x0d, 0x00, 0x0d, 0x01];
        assert_eq!(decode_supported_log_pages(&data)?, vec![(0x0d, 0), (0x0d, 1)]);

        assert!(decode_supported_log_pages(&[0x0d, 0, 0, 0]).is_err());
        Ok(())
    }

    #[test]
    fn render_text() -> Result<(), Error> {
        let page = decode_log_page(&build_log_page(0x0d, 0, &[(0, 3, vec![0, 38])]))?;
        let mut sgj = SgjState::with_buffer(JsonOptions::default(), false);
        page.render(&mut sgj, None);
        assert_eq!(
            sgj.take_human_output(),
            "Temperature [0xd]\n  Parameter code = 0x0\n    Control = 0x3\n    Parameter bytes: 00 26\n"
        );
        Ok(())
    }
}
