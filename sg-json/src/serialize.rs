//! Render a [`JsonTree`] to bytes
//!
//! The output size is measured first, then a buffer of exactly that size
//! is allocated and filled. Both passes run the same emitter over a
//! different sink, so they cannot disagree.

use crate::tree::{JsonTree, JsonValue, NodeId};
use crate::JsonError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerializeMode {
    /// One member per line, indented
    Multiline,
    /// Everything on one line, with a space after `,` and `:`
    SingleLine,
    /// No whitespace at all
    Packed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SerializeOptions {
    pub mode: SerializeMode,
    pub indent_size: usize,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            mode: SerializeMode::Multiline,
            indent_size: 4,
        }
    }
}

trait Sink {
    fn put(&mut self, data: &[u8]);

    fn put_byte(&mut self, byte: u8) {
        self.put(&[byte]);
    }
}

struct Measure(usize);

impl Sink for Measure {
    fn put(&mut self, data: &[u8]) {
        self.0 += data.len();
    }
}

impl Sink for Vec<u8> {
    fn put(&mut self, data: &[u8]) {
        self.extend_from_slice(data);
    }

    fn put_byte(&mut self, byte: u8) {
        self.push(byte);
    }
}

fn emit_newline<S: Sink>(opts: &SerializeOptions, depth: usize, sink: &mut S) {
    if opts.mode == SerializeMode::Multiline {
        sink.put_byte(b'\n');
        for _ in 0..(depth * opts.indent_size) {
            sink.put_byte(b' ');
        }
    }
}

fn emit_separator<S: Sink>(opts: &SerializeOptions, sink: &mut S) {
    sink.put_byte(b',');
    if opts.mode == SerializeMode::SingleLine {
        sink.put_byte(b' ');
    }
}

fn emit_string<S: Sink>(text: &str, sink: &mut S) {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    sink.put_byte(b'"');
    for &byte in text.as_bytes() {
        match byte {
            b'"' => sink.put(b"\\\""),
            b'\\' => sink.put(b"\\\\"),
            0x08 => sink.put(b"\\b"),
            0x0c => sink.put(b"\\f"),
            b'\n' => sink.put(b"\\n"),
            b'\r' => sink.put(b"\\r"),
            b'\t' => sink.put(b"\\t"),
            byte if byte < 0x20 => {
                sink.put(b"\\u00");
                sink.put_byte(HEX[(byte >> 4) as usize]);
                sink.put_byte(HEX[(byte & 0xf) as usize]);
            }
            byte => sink.put_byte(byte),
        }
    }
    sink.put_byte(b'"');
}

impl JsonTree {
    fn emit<S: Sink>(
        &self,
        id: NodeId,
        opts: &SerializeOptions,
        depth: usize,
        sink: &mut S,
    ) -> Result<(), JsonError> {
        let value = self
            .get(id)
            .ok_or(JsonError::UnknownNode(id.0))?;

        match value {
            JsonValue::Object(members) => {
                if members.is_empty() {
                    sink.put(b"{}");
                    return Ok(());
                }
                sink.put_byte(b'{');
                for (i, (name, child)) in members.iter().enumerate() {
                    if i > 0 {
                        emit_separator(opts, sink);
                    }
                    emit_newline(opts, depth + 1, sink);
                    emit_string(name, sink);
                    sink.put_byte(b':');
                    if opts.mode != SerializeMode::Packed {
                        sink.put_byte(b' ');
                    }
                    self.emit(*child, opts, depth + 1, sink)?;
                }
                emit_newline(opts, depth, sink);
                sink.put_byte(b'}');
            }
            JsonValue::Array(items) => {
                if items.is_empty() {
                    sink.put(b"[]");
                    return Ok(());
                }
                sink.put_byte(b'[');
                for (i, child) in items.iter().enumerate() {
                    if i > 0 {
                        emit_separator(opts, sink);
                    }
                    emit_newline(opts, depth + 1, sink);
                    self.emit(*child, opts, depth + 1, sink)?;
                }
                emit_newline(opts, depth, sink);
                sink.put_byte(b']');
            }
            JsonValue::String(text) => emit_string(text, sink),
            JsonValue::Integer(value) => sink.put(value.to_string().as_bytes()),
            JsonValue::Bool(true) => sink.put(b"true"),
            JsonValue::Bool(false) => sink.put(b"false"),
            JsonValue::Null => sink.put(b"null"),
        }

        Ok(())
    }

    /// Exact number of bytes [`serialize`](Self::serialize) will produce
    pub fn measure(&self, root: NodeId, opts: &SerializeOptions) -> Result<usize, JsonError> {
        let mut measure = Measure(0);
        self.emit(root, opts, 0, &mut measure)?;
        Ok(measure.0)
    }

    /// Serialize everything reachable from `root`
    pub fn serialize(&self, root: NodeId, opts: &SerializeOptions) -> Result<Vec<u8>, JsonError> {
        let len = self.measure(root, opts)?;

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|_| JsonError::OutOfMemory(len))?;

        self.emit(root, opts, 0, &mut buffer)?;
        debug_assert_eq!(buffer.len(), len);

        Ok(buffer)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Error;

    fn build_sample(tree: &mut JsonTree) -> Result<NodeId, JsonError> {
        let root = tree.new_object();
        let name = tree.new_string("sg_decode");
        tree.attach(root, Some("name"), name)?;

        let list = tree.new_array();
        tree.attach(root, Some("mixed"), list)?;
        let text = tree.new_string("text");
        tree.attach(list, None, text)?;
        let number = tree.new_integer(-17);
        tree.attach(list, None, number)?;
        let flag = tree.new_bool(true);
        tree.attach(list, None, flag)?;

        let empty = tree.new_object();
        tree.attach(root, Some("empty"), empty)?;

        Ok(root)
    }

    fn strip_whitespace(data: &[u8]) -> Vec<u8> {
        data.iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect()
    }

    #[test]
    fn pretty_output_layout() -> Result<(), Error> {
        let mut tree = JsonTree::new();
        let root = build_sample(&mut tree)?;
        let opts = SerializeOptions {
            mode: SerializeMode::Multiline,
            indent_size: 2,
        };

        let data = tree.serialize(root, &opts)?;
        let expected = "{\n  \"name\": \"sg_decode\",\n  \"mixed\": [\n    \"text\",\n    -17,\n    true\n  ],\n  \"empty\": {}\n}";
        assert_eq!(String::from_utf8(data)?, expected);
        Ok(())
    }

    #[test]
    fn reparse_with_serde_json() -> Result<(), Error> {
        let mut tree = JsonTree::new();
        let root = build_sample(&mut tree)?;

        let data = tree.serialize(root, &SerializeOptions::default())?;
        let parsed: serde_json::Value = serde_json::from_slice(&data)?;

        assert_eq!(
            parsed,
            serde_json::json!({
                "name": "sg_decode",
                "mixed": ["text", -17, true],
                "empty": {},
            })
        );
        assert_eq!(parsed, serde_json::to_value(tree.node_ref(root))?);
        Ok(())
    }

    #[test]
    fn modes_only_differ_in_whitespace() -> Result<(), Error> {
        let mut tree = JsonTree::new();
        let root = build_sample(&mut tree)?;

        let mut outputs = Vec::new();
        for mode in [
            SerializeMode::Multiline,
            SerializeMode::SingleLine,
            SerializeMode::Packed,
        ] {
            let opts = SerializeOptions {
                mode,
                indent_size: 4,
            };
            let data = tree.serialize(root, &opts)?;
            assert_eq!(data.len(), tree.measure(root, &opts)?);
            outputs.push(data);
        }

        assert_eq!(
            String::from_utf8(outputs[2].clone())?,
            r#"{"name":"sg_decode","mixed":["text",-17,true],"empty":{}}"#
        );
        assert_eq!(
            String::from_utf8(outputs[1].clone())?,
            r#"{"name": "sg_decode", "mixed": ["text", -17, true], "empty": {}}"#
        );
        assert_eq!(strip_whitespace(&outputs[0]), outputs[2]);
        assert_eq!(strip_whitespace(&outputs[1]), outputs[2]);
        Ok(())
    }

    #[test]
    fn string_escaping() -> Result<(), Error> {
        let mut tree = JsonTree::new();
        let root = tree.new_string("a\"b\\c\nd\u{1}");
        let data = tree.serialize(root, &SerializeOptions::default())?;
        assert_eq!(data, br#""a\"b\\c\nd\u0001""#.to_vec());

        let parsed: serde_json::Value = serde_json::from_slice(&data)?;
        assert_eq!(parsed, serde_json::json!("a\"b\\c\nd\u{1}"));
        Ok(())
    }

    #[test]
    fn unattached_nodes_are_not_serialized() -> Result<(), Error> {
        let mut tree = JsonTree::new();
        let root = tree.new_object();
        let _orphan = tree.new_string("orphan");
        let data = tree.serialize(root, &SerializeOptions::default())?;
        assert_eq!(data, b"{}".to_vec());
        Ok(())
    }
}
