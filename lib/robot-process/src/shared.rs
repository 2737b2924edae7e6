use shared_state::{DictHandle, ListHandle, LockHandle, ValueHandle};

use crate::error::{ErrorKind, Result};

/// One entry of a worker's shared-state bundle, tagged by the kind its
/// `shared_objects` topology entry declared: one of a closed set of
/// primitive kinds, checked here rather than deferred to a runtime type
/// mismatch at first use.
#[derive(Clone)]
pub enum SharedHandle {
    Dict(DictHandle),
    List(ListHandle),
    Lock(LockHandle),
    ValueBool(ValueHandle<bool>),
    ValueInt(ValueHandle<i64>),
    ValueFloat(ValueHandle<f64>),
    ValueString(ValueHandle<String>),
}

macro_rules! accessor {
    ($method:ident, $variant:ident, $ty:ty) => {
        pub fn $method(&self) -> Result<&$ty> {
            match self {
                Self::$variant(handle) => Ok(handle),
                _ => Err(error_stack::report!(ErrorKind::Configuration)
                    .attach_printable(concat!("shared object is not a ", stringify!($variant)))),
            }
        }
    };
}

impl SharedHandle {
    accessor!(as_dict, Dict, DictHandle);
    accessor!(as_list, List, ListHandle);
    accessor!(as_lock, Lock, LockHandle);
    accessor!(as_value_bool, ValueBool, ValueHandle<bool>);
    accessor!(as_value_int, ValueInt, ValueHandle<i64>);
    accessor!(as_value_float, ValueFloat, ValueHandle<f64>);
    accessor!(as_value_string, ValueString, ValueHandle<String>);
}
