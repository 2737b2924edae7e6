use std::collections::HashMap;

use robot_process::RobotProcess;

/// Builds a worker's `RobotProcess` implementation from its topology
/// construction parameters (the passthrough kwargs left over after
/// `consume`/`publish` are lifted out).
///
/// The embedding application (not this crate) owns the concrete worker
/// types: camera producers, packers, ML inference workers, command
/// senders. Those are external collaborators; this crate only owns the
/// *shape* of "a name resolves to a constructor".
pub type WorkerFactory =
    Box<dyn Fn(&serde_json::Map<String, serde_json::Value>) -> Box<dyn RobotProcess> + Send + Sync>;

/// Maps a worker *name* (the topology's `processes` key) to the factory
/// that builds its `RobotProcess`.
#[derive(Default)]
pub struct WorkerRegistry {
    factories: HashMap<String, WorkerFactory>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(&serde_json::Map<String, serde_json::Value>) -> Box<dyn RobotProcess>
            + Send
            + Sync
            + 'static,
    ) -> &mut Self {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn build(
        &self,
        name: &str,
        params: &serde_json::Map<String, serde_json::Value>,
    ) -> Option<Box<dyn RobotProcess>> {
        self.factories.get(name).map(|factory| factory(params))
    }
}
