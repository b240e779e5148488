//! Structured (JSON) and human readable output for the sg utilities
//!
//! Decoders write through one [`SgjState`]: in text mode lines go to
//! stdout, in JSON mode values are collected in a [`JsonTree`] and
//! serialized once the command is done.

pub mod escape;
pub mod names;
pub mod options;
pub mod serialize;
pub mod state;
pub mod tree;

pub use escape::{escape_for_json, escape_for_json_into, escaped_len};
pub use names::{name_to_snake, name_to_snake_unparen};
pub use options::{JsonOptions, JsonOptionsError, JSON_OPTS_ENV};
pub use serialize::{SerializeMode, SerializeOptions};
pub use state::{HrSink, Separator, SgjState};
pub use tree::{JsonKind, JsonTree, JsonValue, NodeId};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum JsonError {
    #[error("unknown json node {0}")]
    UnknownNode(usize),
    #[error("cannot add a named member to a json {0}")]
    NotAnObject(JsonKind),
    #[error("cannot push an element to a json {0}")]
    NotAnArray(JsonKind),
    #[error("json node is already attached")]
    AlreadyAttached,
    #[error("attaching json node would create a cycle")]
    Cycle,
    #[error("escaped string needs {need} bytes, but only {capacity} available")]
    EscapeCapacity { need: usize, capacity: usize },
    #[error("unable to allocate {0} bytes for json output")]
    OutOfMemory(usize),
}

/// Print a human readable line through a [`SgjState`]
///
/// ```
/// # let mut sgj = sg_json::SgjState::with_buffer(Default::default(), false);
/// sg_json::sgj_hr!(sgj, "  Sense key: {}\n", "Illegal Request");
/// assert_eq!(sgj.take_human_output(), "  Sense key: Illegal Request\n");
/// ```
#[macro_export]
macro_rules! sgj_hr {
    ($state:expr, $($arg:tt)*) => {
        $state.hr(&::std::format!($($arg)*))
    };
}
