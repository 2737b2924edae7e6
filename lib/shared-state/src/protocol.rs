//! Wire protocol spoken between a handle in `crate::handle` and the
//! [`crate::StateBroker`] that owns the named object.

use serde::{Deserialize, Serialize};

/// The closed set of shared-state primitives, matching the tag strings
/// `{dict, list, Lock, Value:bool, Value:int, Value:float, Value:string}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Dict,
    List,
    Lock,
    ValueBool,
    ValueInt,
    ValueFloat,
    ValueString,
}

impl ObjectKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Dict => "dict",
            Self::List => "list",
            Self::Lock => "Lock",
            Self::ValueBool => "Value:bool",
            Self::ValueInt => "Value:int",
            Self::ValueFloat => "Value:float",
            Self::ValueString => "Value:string",
        }
    }

    /// The reverse of [`Self::tag`], parsing a topology document's
    /// `shared_objects` tag string against this closed set of kinds.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "dict" => Some(Self::Dict),
            "list" => Some(Self::List),
            "Lock" => Some(Self::Lock),
            "Value:bool" => Some(Self::ValueBool),
            "Value:int" => Some(Self::ValueInt),
            "Value:float" => Some(Self::ValueFloat),
            "Value:string" => Some(Self::ValueString),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) enum Request {
    DictGet { name: String, key: String },
    DictSet { name: String, key: String, value: Vec<u8> },
    DictDel { name: String, key: String },
    DictKeys { name: String },
    DictLen { name: String },

    ListPush { name: String, value: Vec<u8> },
    ListPop { name: String },
    ListGet { name: String, index: usize },
    ListSnapshot { name: String },
    ListLen { name: String },

    ValueGet { name: String },
    ValueSet { name: String, value: Vec<u8> },

    /// Blocks until the lock is held by this handle.
    LockAcquire { name: String },
    LockRelease { name: String },
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) enum Response {
    Ack,
    Item(Vec<u8>),
    NoItem,
    Keys(Vec<String>),
    Snapshot(Vec<Vec<u8>>),
    Len(usize),
    UnknownObject,
    WrongKind,
}
