use std::collections::HashMap;

use serde::{de::Deserializer, Deserialize};

/// A queue name or an ordered list of queue names — `consume`/`publish` in
/// a process's param block may be written either way in the YAML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueNames(pub Vec<String>);

impl<'de> Deserialize<'de> for QueueNames {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::One(name) => QueueNames(vec![name]),
            Repr::Many(names) => QueueNames(names),
        })
    }
}

impl QueueNames {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// One worker's entry under `processes:`. `consume`/`publish` are lifted out
/// by name; every other key is an arbitrary passthrough construction
/// parameter handed to the worker — unknown keys inside a worker's param
/// block are passed through as construction kwargs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessSpec {
    #[serde(default)]
    pub consume: QueueNames,
    #[serde(default)]
    pub publish: QueueNames,
    #[serde(flatten)]
    pub params: HashMap<String, serde_yaml::Value>,
}

impl ProcessSpec {
    /// `params`, converted to JSON values — the generic payload type used
    /// everywhere else in the workspace (`Request::data`,
    /// `HeartbeatMessage::data`).
    pub fn params_as_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.params
            .iter()
            .filter_map(|(key, value)| {
                serde_json::to_value(value)
                    .ok()
                    .map(|value| (key.clone(), value))
            })
            .collect()
    }

    /// `keep_alive` defaults to `true` when absent: a missing key means
    /// "keep alive".
    pub fn keep_alive(&self) -> bool {
        self.params
            .get("keep_alive")
            .and_then(serde_yaml::Value::as_bool)
            .unwrap_or(true)
    }
}

/// `description:` forwarded verbatim into every worker's log records.
#[derive(Debug, Clone, Deserialize)]
pub struct Description {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub subsystem: String,
    #[serde(default)]
    pub robot: String,
}

/// The parsed shape of a topology document. `processes` must be non-empty
/// for a Dispatcher to be constructible; that invariant, and every
/// cross-reference invariant between `consume`/`publish` lists, is checked
/// by `dispatcher`, not here: this crate only parses.
#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    pub processes: HashMap<String, ProcessSpec>,
    #[serde(default)]
    pub queues_sizes: HashMap<String, u32>,
    #[serde(default)]
    pub shared_objects: HashMap<String, String>,
    #[serde(default)]
    pub description: Option<Description>,
}

/// Default queue capacity for a name absent from `queues_sizes` (see
/// DESIGN.md's Open Question OQ-1 on the separate, larger `1000` constant
/// used for per-worker system inboxes, a different purpose).
pub const DEFAULT_QUEUE_CAPACITY: u32 = 50;

impl Topology {
    /// Resolves a queue's declared capacity, or [`DEFAULT_QUEUE_CAPACITY`].
    pub fn queue_capacity(&self, queue_name: &str) -> u32 {
        self.queues_sizes
            .get(queue_name)
            .copied()
            .unwrap_or(DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_consume_and_publish_as_either_scalar_or_list() {
        let yaml = r#"
processes:
  p1:
    publish: messages
  p2:
    consume: [messages, other]
    some_param: 42
"#;
        let topology: Topology = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(topology.processes["p1"].publish.as_slice(), ["messages"]);
        assert_eq!(
            topology.processes["p2"].consume.as_slice(),
            ["messages", "other"]
        );
        assert_eq!(
            topology.processes["p2"].params_as_json()["some_param"],
            serde_json::json!(42)
        );
    }

    #[test]
    fn defaults_queues_sizes_and_keep_alive() {
        let yaml = "processes:\n  p1:\n    publish: messages\n";
        let topology: Topology = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(topology.queue_capacity("messages"), DEFAULT_QUEUE_CAPACITY);
        assert!(topology.processes["p1"].keep_alive());
    }

    #[test]
    fn keep_alive_false_is_read_from_params() {
        let yaml = "processes:\n  p1:\n    publish: messages\n    keep_alive: false\n";
        let topology: Topology = serde_yaml::from_str(yaml).unwrap();
        assert!(!topology.processes["p1"].keep_alive());
    }
}
