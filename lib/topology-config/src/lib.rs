//! Topology document types and a minimal YAML + `${ENV_VAR}` substitution
//! loader. The full external loader (schema validation, multi-file
//! includes) is out of scope; this crate supplies just enough of a
//! parsed-topology type to hand to `dispatcher`.

mod error;
mod loader;
mod model;
mod substitution;

pub use error::{ErrorKind, Result};
pub use loader::{load_path, load_str};
pub use model::{Description, ProcessSpec, QueueNames, Topology, DEFAULT_QUEUE_CAPACITY};
pub use substitution::substitute_env;
