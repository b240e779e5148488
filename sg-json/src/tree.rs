//! Arena backed JSON document tree
//!
//! Every node lives in the [`JsonTree`] that created it, whether it is
//! attached or not. Attaching a node to an object or array links it into
//! the document; serialization only visits what is reachable from the
//! root it is given, so a node that was never attached just does not show
//! up. Dropping (or clearing) the tree releases all nodes at once.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::JsonError;

/// Handle to a node inside a [`JsonTree`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Node payload
#[derive(Clone, Debug, PartialEq)]
pub enum JsonValue {
    /// Ordered name/value pairs. Names are not required to be unique.
    Object(Vec<(String, NodeId)>),
    Array(Vec<NodeId>),
    String(String),
    Integer(i128),
    Bool(bool),
    Null,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsonKind {
    Object,
    Array,
    String,
    Integer,
    Bool,
    Null,
}

impl std::fmt::Display for JsonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            JsonKind::Object => "object",
            JsonKind::Array => "array",
            JsonKind::String => "string",
            JsonKind::Integer => "integer",
            JsonKind::Bool => "boolean",
            JsonKind::Null => "null",
        };
        f.write_str(text)
    }
}

impl JsonValue {
    pub fn kind(&self) -> JsonKind {
        match self {
            JsonValue::Object(_) => JsonKind::Object,
            JsonValue::Array(_) => JsonKind::Array,
            JsonValue::String(_) => JsonKind::String,
            JsonValue::Integer(_) => JsonKind::Integer,
            JsonValue::Bool(_) => JsonKind::Bool,
            JsonValue::Null => JsonKind::Null,
        }
    }
}

struct Node {
    value: JsonValue,
    parent: Option<NodeId>,
}

#[derive(Default)]
pub struct JsonTree {
    nodes: Vec<Node>,
}

impl JsonTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, value: JsonValue) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            value,
            parent: None,
        });
        id
    }

    pub fn new_object(&mut self) -> NodeId {
        self.alloc(JsonValue::Object(Vec::new()))
    }

    pub fn new_array(&mut self) -> NodeId {
        self.alloc(JsonValue::Array(Vec::new()))
    }

    pub fn new_string<S: Into<String>>(&mut self, value: S) -> NodeId {
        self.alloc(JsonValue::String(value.into()))
    }

    pub fn new_integer<I: Into<i128>>(&mut self, value: I) -> NodeId {
        self.alloc(JsonValue::Integer(value.into()))
    }

    pub fn new_bool(&mut self, value: bool) -> NodeId {
        self.alloc(JsonValue::Bool(value))
    }

    pub fn new_null(&mut self) -> NodeId {
        self.alloc(JsonValue::Null)
    }

    /// Number of allocated nodes, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop all nodes. Handles from before the call become invalid.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    fn node(&self, id: NodeId) -> Result<&Node, JsonError> {
        self.nodes.get(id.0).ok_or(JsonError::UnknownNode(id.0))
    }

    pub fn get(&self, id: NodeId) -> Option<&JsonValue> {
        self.nodes.get(id.0).map(|node| &node.value)
    }

    pub fn kind(&self, id: NodeId) -> Option<JsonKind> {
        self.get(id).map(JsonValue::kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.parent(id).is_some()
    }

    /// First member called `name` of an object node
    pub fn member(&self, object: NodeId, name: &str) -> Option<NodeId> {
        match self.get(object)? {
            JsonValue::Object(members) => members
                .iter()
                .find(|(member, _)| member == name)
                .map(|(_, id)| *id),
            _ => None,
        }
    }

    /// Children of an array, or member values of an object, in order
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.get(id) {
            Some(JsonValue::Object(members)) => members.iter().map(|(_, id)| *id).collect(),
            Some(JsonValue::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    /// Attach `child` to `parent`.
    ///
    /// With a name the parent must be an object and the pair is appended,
    /// without a name the parent must be an array. The child must not be
    /// attached yet and must not be an ancestor of `parent`.
    pub fn attach(
        &mut self,
        parent: NodeId,
        name: Option<&str>,
        child: NodeId,
    ) -> Result<NodeId, JsonError> {
        let parent_kind = self.node(parent)?.value.kind();
        if self.node(child)?.parent.is_some() {
            return Err(JsonError::AlreadyAttached);
        }

        let mut ancestor = Some(parent);
        while let Some(id) = ancestor {
            if id == child {
                return Err(JsonError::Cycle);
            }
            ancestor = self.node(id)?.parent;
        }

        match (&mut self.nodes[parent.0].value, name) {
            (JsonValue::Object(members), Some(name)) => {
                if members.iter().any(|(member, _)| member == name) {
                    log::debug!("json object already has a member named '{name}'");
                }
                members.push((name.to_string(), child));
            }
            (JsonValue::Array(items), None) => items.push(child),
            (_, Some(_)) => return Err(JsonError::NotAnObject(parent_kind)),
            (_, None) => return Err(JsonError::NotAnArray(parent_kind)),
        }

        self.nodes[child.0].parent = Some(parent);

        Ok(child)
    }

    /// Borrow a node for use with serde (e.g. `serde_json::to_value`)
    ///
    /// Note: duplicate object member names collapse into one entry in
    /// most serde data formats.
    pub fn node_ref(&self, id: NodeId) -> JsonNodeRef<'_> {
        JsonNodeRef { tree: self, id }
    }
}

pub struct JsonNodeRef<'a> {
    tree: &'a JsonTree,
    id: NodeId,
}

impl<'a> Serialize for JsonNodeRef<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = match self.tree.get(self.id) {
            Some(value) => value,
            None => return serializer.serialize_unit(),
        };
        match value {
            JsonValue::Object(members) => {
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (name, id) in members {
                    map.serialize_entry(name, &self.tree.node_ref(*id))?;
                }
                map.end()
            }
            JsonValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for id in items {
                    seq.serialize_element(&self.tree.node_ref(*id))?;
                }
                seq.end()
            }
            JsonValue::String(text) => serializer.serialize_str(text),
            JsonValue::Integer(value) => {
                if let Ok(value) = i64::try_from(*value) {
                    serializer.serialize_i64(value)
                } else if let Ok(value) = u64::try_from(*value) {
                    serializer.serialize_u64(value)
                } else {
                    serializer.serialize_i128(*value)
                }
            }
            JsonValue::Bool(value) => serializer.serialize_bool(*value),
            JsonValue::Null => serializer.serialize_unit(),
        }
    }
}
