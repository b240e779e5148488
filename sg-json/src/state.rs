//! Rendering state shared by all decoders of one command run
//!
//! Lifecycle: [`SgjState::start`] allocates the document root, decoders
//! add members, and [`SgjState::finish_output`] serializes the document and
//! drops it again. All `js_*` helpers are no-ops outside of JSON mode and
//! never fail: a problem building the tree is logged at debug level and the
//! value is simply missing from the output.

use std::io::Write;

use anyhow::Error;

use crate::names::name_to_snake;
use crate::options::{JsonOptions, JSON_OPTS_ENV};
use crate::tree::{JsonTree, NodeId};
use crate::JsonError;

/// Longest string pushed into the mirrored `output` array
pub const MAX_HR_LINE: usize = 256;

/// Where human readable text goes
#[derive(Debug)]
pub enum HrSink {
    Stdout,
    /// Collected in memory, see [`SgjState::take_human_output`]
    Buffer(String),
}

/// Separator between a label and its value in human readable output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Separator {
    None,
    /// `n` spaces
    Space(usize),
    /// `name=value`
    Equal,
    /// `name = value`
    EqualSpace,
    /// `name:value`
    Colon,
    /// `name: value`
    ColonSpace,
}

impl Separator {
    fn as_str(&self) -> std::borrow::Cow<'static, str> {
        match self {
            Separator::None => "".into(),
            Separator::Space(n) => " ".repeat(*n).into(),
            Separator::Equal => "=".into(),
            Separator::EqualSpace => " = ".into(),
            Separator::Colon => ":".into(),
            Separator::ColonSpace => ": ".into(),
        }
    }
}

pub struct SgjState {
    pub opts: JsonOptions,
    /// JSON output requested (`--json`)
    pub as_json: bool,
    tree: JsonTree,
    root: Option<NodeId>,
    out_hr: Option<NodeId>,
    /// Free for use by the application, cleared with the document
    pub userp: Option<NodeId>,
    hr_sink: HrSink,
}

/// Collapse a block of text into a single line for the `output` array
fn canonical_hr_line(text: &str) -> String {
    let text = text.strip_prefix('\n').unwrap_or(text);
    let text = text.strip_suffix('\n').unwrap_or(text);

    let mut line = text
        .split('\n')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
        .replace('\t', " ");

    if line.len() > MAX_HR_LINE {
        let mut end = MAX_HR_LINE;
        while !line.is_char_boundary(end) {
            end -= 1;
        }
        line.truncate(end);
    }
    line
}

impl SgjState {
    pub fn new(opts: JsonOptions, as_json: bool) -> Self {
        Self {
            opts,
            as_json,
            tree: JsonTree::new(),
            root: None,
            out_hr: None,
            userp: None,
            hr_sink: HrSink::Stdout,
        }
    }

    /// Like [`new`](Self::new), but human readable text is kept in memory
    pub fn with_buffer(opts: JsonOptions, as_json: bool) -> Self {
        let mut state = Self::new(opts, as_json);
        state.hr_sink = HrSink::Buffer(String::new());
        state
    }

    pub fn tree(&self) -> &JsonTree {
        &self.tree
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Returns true while a document is being built
    pub fn is_started(&self) -> bool {
        self.root.is_some()
    }

    /// Show hex alongside decimal values
    pub fn show_hex(&self) -> bool {
        self.as_json && self.opts.hex
    }

    /// Start a new document
    ///
    /// Any previous document is dropped first. Returns the root object, or
    /// `None` outside of JSON mode.
    pub fn start(
        &mut self,
        util_name: Option<&str>,
        version_date: Option<&str>,
        argv: &[String],
    ) -> Option<NodeId> {
        self.finish();
        if !self.as_json {
            return None;
        }

        let root = self.tree.new_object();
        self.root = Some(root);

        let mut invoked = None;
        if self.opts.leadin {
            if let Some(version) = self.named_subarray(Some(root), "json_format_version") {
                let major = self.tree.new_integer(1);
                self.js_arr_push(version, major);
                let minor = self.tree.new_integer(0);
                self.js_arr_push(version, minor);
            }

            if let Some(util_name) = util_name {
                invoked = self.named_subobject(Some(root), "utility_invoked");
                self.js_nv_s(invoked, "name", util_name);
                self.js_nv_s(invoked, "version_date", version_date.unwrap_or("0.0"));
                if let Some(list) = self.named_subarray(invoked, "argv") {
                    for arg in argv {
                        let arg = self.tree.new_string(arg.as_str());
                        self.js_arr_push(list, arg);
                    }
                }
                if self.opts.verbose > 0 {
                    self.js_nv_s(invoked, "environment_variable_name", JSON_OPTS_ENV);
                    let value = std::env::var(JSON_OPTS_ENV)
                        .unwrap_or_else(|_| "no available".to_string());
                    self.js_nv_s(invoked, "environment_variable_value", &value);
                    let summary = self.opts.summary();
                    self.js_nv_s(invoked, "json_options", &summary);
                }
            }
        } else if self.opts.out_hr && util_name.is_some() {
            invoked = self.named_subobject(Some(root), "utility_invoked");
        }

        if self.opts.out_hr && invoked.is_some() {
            self.out_hr = self.named_subarray(invoked, "output");
        }

        Some(root)
    }

    /// Human readable output
    ///
    /// Printed as is in text mode. In JSON mode the text is either mirrored
    /// into the `output` array as one line, or dropped.
    pub fn hr(&mut self, text: &str) {
        if !self.as_json {
            match &mut self.hr_sink {
                HrSink::Stdout => print!("{text}"),
                HrSink::Buffer(buffer) => buffer.push_str(text),
            }
            return;
        }

        if let Some(output) = self.out_hr {
            let line = canonical_hr_line(text);
            let node = self.tree.new_string(line);
            self.js_arr_push(output, node);
        }
    }

    /// Human readable text collected so far (with [`HrSink::Buffer`])
    pub fn take_human_output(&mut self) -> String {
        match &mut self.hr_sink {
            HrSink::Buffer(buffer) => std::mem::take(buffer),
            HrSink::Stdout => String::new(),
        }
    }

    fn log_err(&self, name: Option<&str>, err: JsonError) {
        match name {
            Some(name) => log::debug!("unable to add json member '{name}' - {err}"),
            None => log::debug!("unable to add json array element - {err}"),
        }
    }

    fn target(&self, obj: Option<NodeId>) -> Option<NodeId> {
        if !self.as_json {
            return None;
        }
        obj.or(self.root)
    }

    fn attach_named(&mut self, obj: Option<NodeId>, name: &str, node: NodeId) -> Option<NodeId> {
        let parent = self.target(obj)?;
        match self.tree.attach(parent, Some(name), node) {
            Ok(node) => Some(node),
            Err(err) => {
                self.log_err(Some(name), err);
                None
            }
        }
    }

    /// Append `node` to the array `arr`
    pub fn js_arr_push(&mut self, arr: NodeId, node: NodeId) -> Option<NodeId> {
        match self.tree.attach(arr, None, node) {
            Ok(node) => Some(node),
            Err(err) => {
                self.log_err(None, err);
                None
            }
        }
    }

    /// New object appended to the array `arr`
    pub fn js_arr_push_object(&mut self, arr: Option<NodeId>) -> Option<NodeId> {
        let arr = arr.filter(|_| self.as_json)?;
        let node = self.tree.new_object();
        self.js_arr_push(arr, node)
    }

    /// New string appended to the array `arr`
    pub fn js_arr_push_s(&mut self, arr: Option<NodeId>, value: &str) -> Option<NodeId> {
        let arr = arr.filter(|_| self.as_json)?;
        let node = self.tree.new_string(value);
        self.js_arr_push(arr, node)
    }

    /// New integer appended to the array `arr`
    pub fn js_arr_push_i<I: Into<i128>>(&mut self, arr: Option<NodeId>, value: I) -> Option<NodeId> {
        let arr = arr.filter(|_| self.as_json)?;
        let node = self.tree.new_integer(value);
        self.js_arr_push(arr, node)
    }

    pub fn named_subobject(&mut self, obj: Option<NodeId>, name: &str) -> Option<NodeId> {
        self.target(obj)?;
        let node = self.tree.new_object();
        self.attach_named(obj, name, node)
    }

    pub fn named_subarray(&mut self, obj: Option<NodeId>, name: &str) -> Option<NodeId> {
        self.target(obj)?;
        let node = self.tree.new_array();
        self.attach_named(obj, name, node)
    }

    /// Attach an existing node as member `name`
    pub fn js_nv_o(&mut self, obj: Option<NodeId>, name: &str, node: NodeId) -> Option<NodeId> {
        self.attach_named(obj, name, node)
    }

    pub fn js_nv_s(&mut self, obj: Option<NodeId>, name: &str, value: &str) -> Option<NodeId> {
        self.target(obj)?;
        let node = self.tree.new_string(value);
        self.attach_named(obj, name, node)
    }

    /// String member with raw bytes made printable first
    pub fn js_nv_str_esc(&mut self, obj: Option<NodeId>, name: &str, value: &[u8]) -> Option<NodeId> {
        self.target(obj)?;
        let node = self.tree.new_string(crate::escape::escape_for_json(value));
        self.attach_named(obj, name, node)
    }

    pub fn js_nv_i<I: Into<i128>>(&mut self, obj: Option<NodeId>, name: &str, value: I) -> Option<NodeId> {
        self.target(obj)?;
        let node = self.tree.new_integer(value);
        self.attach_named(obj, name, node)
    }

    pub fn js_nv_b(&mut self, obj: Option<NodeId>, name: &str, value: bool) -> Option<NodeId> {
        self.target(obj)?;
        let node = self.tree.new_bool(value);
        self.attach_named(obj, name, node)
    }

    pub fn js_nv_null(&mut self, obj: Option<NodeId>, name: &str) -> Option<NodeId> {
        self.target(obj)?;
        let node = self.tree.new_null();
        self.attach_named(obj, name, node)
    }

    /// Integer member, or `{"i": value, "hex": "..."}` with the `h` option
    pub fn js_nv_ihex<I: Into<i128>>(&mut self, obj: Option<NodeId>, name: &str, value: I) -> Option<NodeId> {
        let value = value.into();
        if !self.opts.hex {
            return self.js_nv_i(obj, name, value);
        }
        let sub = self.named_subobject(obj, name)?;
        self.js_nv_i(Some(sub), "i", value);
        self.js_nv_s(Some(sub), "hex", &format!("{value:x}"));
        Some(sub)
    }

    /// Integer with a meaning: `{"i": value, "hex": "...", str_name: text}`
    ///
    /// The `hex` member needs the `h` option, the text needs the `s` option.
    /// Without either the member is a plain integer.
    pub fn js_nv_ihexstr<I: Into<i128>>(
        &mut self,
        obj: Option<NodeId>,
        name: &str,
        value: I,
        str_name: Option<&str>,
        text: Option<&str>,
    ) -> Option<NodeId> {
        let value = value.into();
        let show_text = self.opts.string && text.is_some();
        if !self.opts.hex && !show_text {
            return self.js_nv_i(obj, name, value);
        }
        let sub = self.named_subobject(obj, name)?;
        self.js_nv_i(Some(sub), "i", value);
        if self.opts.hex {
            self.js_nv_s(Some(sub), "hex", &format!("{value:x}"));
        }
        if let (true, Some(text)) = (show_text, text) {
            self.js_nv_s(Some(sub), str_name.unwrap_or("meaning"), text);
        }
        Some(sub)
    }

    /// Bytes as space separated hex string
    pub fn js_nv_hex_bytes(&mut self, obj: Option<NodeId>, name: &str, data: &[u8]) -> Option<NodeId> {
        self.target(obj)?;
        let text = data
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ");
        self.js_nv_s(obj, name, &text)
    }

    fn hr_pair(&mut self, indent: usize, label: &str, sep: Separator, value: &str) {
        let line = format!("{:indent$}{label}{}{value}\n", "", sep.as_str());
        self.hr(&line);
    }

    /// Human and JSON: integer value
    ///
    /// Text mode prints `label<sep>value`, JSON mode adds `label` in
    /// snake_case as member of `obj`.
    pub fn haj_vi<I: Into<i128>>(
        &mut self,
        obj: Option<NodeId>,
        indent: usize,
        label: &str,
        sep: Separator,
        value: I,
        hex_haj: bool,
    ) {
        let value = value.into();
        if self.as_json {
            let name = name_to_snake(label);
            if hex_haj {
                self.js_nv_ihex(obj, &name, value);
            } else {
                self.js_nv_i(obj, &name, value);
            }
        } else {
            let text = if hex_haj {
                format!("0x{value:x}")
            } else {
                value.to_string()
            };
            self.hr_pair(indent, label, sep, &text);
        }
    }

    /// Human and JSON: string value
    pub fn haj_vs(&mut self, obj: Option<NodeId>, indent: usize, label: &str, sep: Separator, value: &str) {
        if self.as_json {
            let name = name_to_snake(label);
            self.js_nv_s(obj, &name, value);
        } else {
            self.hr_pair(indent, label, sep, value);
        }
    }

    /// Human and JSON: integer with meaning
    pub fn haj_vistr<I: Into<i128>>(
        &mut self,
        obj: Option<NodeId>,
        indent: usize,
        label: &str,
        sep: Separator,
        value: I,
        text: &str,
    ) {
        let value = value.into();
        if self.as_json {
            let name = name_to_snake(label);
            self.js_nv_ihexstr(obj, &name, value, None, Some(text));
        } else {
            self.hr_pair(indent, label, sep, &format!("{value} [{text}]"));
        }
    }

    /// Human and JSON: flag, printed as 0 or 1
    pub fn haj_vb(&mut self, obj: Option<NodeId>, indent: usize, label: &str, sep: Separator, value: bool) {
        if self.as_json {
            let name = name_to_snake(label);
            self.js_nv_b(obj, &name, value);
        } else {
            self.hr_pair(indent, label, sep, if value { "1" } else { "0" });
        }
    }

    /// Serialize the current document
    ///
    /// Adds `exit_status` first when enabled. Returns `None` if no document
    /// was started or serialization failed.
    pub fn serialize_document(&mut self, exit_status: Option<i32>) -> Option<Vec<u8>> {
        let root = self.root?;
        if let (true, Some(status)) = (self.opts.exit_status, exit_status) {
            self.js_nv_i(Some(root), "exit_status", status);
        }
        match self.tree.serialize(root, &self.opts.serialize_options()) {
            Ok(data) => Some(data),
            Err(err) => {
                log::debug!("unable to serialize json output - {err}");
                None
            }
        }
    }

    /// Write the document to `out` and drop it
    pub fn finish_output<W: Write>(&mut self, exit_status: Option<i32>, out: &mut W) -> Result<(), Error> {
        let data = self.serialize_document(exit_status);
        self.finish();
        if let Some(data) = data {
            out.write_all(&data)?;
            out.write_all(b"\n")?;
            out.flush()?;
        }
        Ok(())
    }

    /// Drop the current document, if any
    pub fn finish(&mut self) {
        self.tree.clear();
        self.root = None;
        self.out_hr = None;
        self.userp = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::{json, Value};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn parse_output(sgj: &mut SgjState, exit_status: Option<i32>) -> Result<Value, Error> {
        let mut out = Vec::new();
        sgj.finish_output(exit_status, &mut out)?;
        Ok(serde_json::from_slice(&out)?)
    }

    #[test]
    fn text_mode_prints_only_text() {
        let mut sgj = SgjState::with_buffer(JsonOptions::default(), false);
        assert_eq!(sgj.start(Some("sg_decode"), None, &[]), None);

        sgj.haj_vi(None, 2, "Sense key", Separator::ColonSpace, 5, false);
        sgj.haj_vi(None, 2, "Info", Separator::Equal, 0x1234, true);
        sgj.haj_vs(None, 0, "Vendor", Separator::ColonSpace, "ACME");
        assert_eq!(sgj.js_nv_i(None, "x", 1), None);

        assert_eq!(
            sgj.take_human_output(),
            "  Sense key: 5\n  Info=0x1234\nVendor: ACME\n"
        );
    }

    #[test]
    fn leadin_and_exit_status() -> Result<(), Error> {
        let mut sgj = SgjState::with_buffer(JsonOptions::default(), true);
        let root = sgj.start(Some("sg_decode"), Some("1.2"), &args(&["sg_decode", "-j"]));
        assert!(root.is_some());

        sgj.haj_vs(None, 0, "Peripheral device type", Separator::ColonSpace, "disk");
        sgj.hr("ignored without out_hr\n");

        let value = parse_output(&mut sgj, Some(0))?;
        assert_eq!(
            value,
            json!({
                "json_format_version": [1, 0],
                "utility_invoked": {
                    "name": "sg_decode",
                    "version_date": "1.2",
                    "argv": ["sg_decode", "-j"],
                },
                "peripheral_device_type": "disk",
                "exit_status": 0,
            })
        );
        assert!(!sgj.is_started());
        assert_eq!(sgj.take_human_output(), "");
        Ok(())
    }

    #[test]
    fn mirrored_text_lines() -> Result<(), Error> {
        let opts = JsonOptions::parse("o-l-e")?;
        let mut sgj = SgjState::new(opts, true);
        sgj.start(Some("sg_decode"), None, &[]);

        sgj.hr("\nfirst\tline\n\nsecond line\n");
        let long = "x".repeat(300);
        sgj.hr(&long);

        let value = parse_output(&mut sgj, Some(3))?;
        let output = &value["utility_invoked"]["output"];
        assert_eq!(output[0], json!("first line; second line"));
        assert_eq!(output[1].as_str().map(str::len), Some(MAX_HR_LINE));
        assert!(value.get("exit_status").is_none());
        assert!(value.get("json_format_version").is_none());
        Ok(())
    }

    #[test]
    fn hex_and_meaning_members() -> Result<(), Error> {
        let opts = JsonOptions::parse("h")?;
        let mut sgj = SgjState::new(opts, true);
        sgj.start(None, None, &[]);

        sgj.js_nv_ihex(None, "lba", 0x20u32);
        sgj.js_nv_ihexstr(None, "sense_key", 5u8, None, Some("Illegal Request"));
        sgj.js_nv_hex_bytes(None, "raw", &[0x70, 0x00, 0x05]);
        sgj.js_nv_str_esc(None, "vendor", b"AB\x01");

        let value = parse_output(&mut sgj, None)?;
        assert_eq!(value["lba"], json!({"i": 32, "hex": "20"}));
        assert_eq!(
            value["sense_key"],
            json!({"i": 5, "hex": "5", "meaning": "Illegal Request"})
        );
        assert_eq!(value["raw"], json!("70 00 05"));
        assert_eq!(value["vendor"], json!("AB\\x01"));
        Ok(())
    }

    #[test]
    fn verbose_environment_info() -> Result<(), Error> {
        let opts = JsonOptions::parse("v")?;
        let mut sgj = SgjState::new(opts, true);
        sgj.start(Some("sg_decode"), None, &[]);

        let value = parse_output(&mut sgj, None)?;
        let invoked = &value["utility_invoked"];
        assert_eq!(invoked["version_date"], json!("0.0"));
        assert_eq!(invoked["environment_variable_name"], json!(JSON_OPTS_ENV));
        assert!(invoked["environment_variable_value"].is_string());
        assert!(invoked["json_options"].is_string());
        Ok(())
    }

    #[test]
    fn finish_is_idempotent() -> Result<(), Error> {
        let mut sgj = SgjState::new(JsonOptions::default(), true);
        sgj.start(None, None, &[]);
        sgj.finish();
        sgj.finish();
        assert!(sgj.serialize_document(Some(0)).is_none());

        let mut out = Vec::new();
        sgj.finish_output(Some(0), &mut out)?;
        assert!(out.is_empty());
        Ok(())
    }

    #[test]
    fn canonical_lines() {
        assert_eq!(canonical_hr_line("a\n"), "a");
        assert_eq!(canonical_hr_line("\n\na\n\n"), "a");
        assert_eq!(canonical_hr_line("a\nb\tc"), "a; b c");
        assert_eq!(canonical_hr_line(""), "");
    }
}
