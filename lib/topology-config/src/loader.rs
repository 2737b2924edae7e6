use std::path::Path;

use error_stack::{IntoReport, ResultExt};

use crate::{
    error::{ErrorKind, Result},
    model::Topology,
    substitution::substitute_env,
};

/// Parses a topology document already substituted/read into memory.
pub fn load_str(yaml: &str) -> Result<Topology> {
    let substituted = substitute_env(yaml)?;
    serde_yaml::from_str(&substituted)
        .into_report()
        .attach_printable("could not parse topology YAML")
        .change_context(ErrorKind::Parse)
}

/// Reads `path`, substitutes `${ENV_VAR}`/`${ENV_VAR:-default}` tokens, and
/// parses the result into a [`Topology`]. This is a minimal stand-in for
/// the full external topology loader (schema validation, multi-file
/// includes), just enough to unblock the Dispatcher.
pub fn load_path(path: impl AsRef<Path>) -> Result<Topology> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .into_report()
        .attach_printable_lazy(|| format!("could not read topology file {}", path.display()))
        .change_context(ErrorKind::Io)?;
    load_str(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_topology_with_substitution() {
        std::env::set_var("TOPOLOGY_CONFIG_LOADER_TEST", "my-robot");
        let yaml = r#"
description:
  robot: ${TOPOLOGY_CONFIG_LOADER_TEST}
processes:
  p1:
    publish: messages
  p2:
    consume: messages
"#;
        let topology = load_str(yaml).unwrap();
        assert_eq!(topology.description.unwrap().robot, "my-robot");
        std::env::remove_var("TOPOLOGY_CONFIG_LOADER_TEST");
    }
}
