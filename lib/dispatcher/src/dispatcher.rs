use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use error_stack::ResultExt;
use queue_fabric::{QueueBroker, QueueHandle};
use robot_logging::RemoteLogSink;
use robot_process::{ProcessContext, RobotProcess, SharedHandle, WatcherHandle};
use shared_state::{ObjectKind, StateBroker};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use topology_config::Topology;

use crate::{
    constants::SYSTEM_INBOX_CAPACITY,
    endpoint::{Endpoint, EndpointKind},
    error::{ErrorKind, Result},
    registry::WorkerRegistry,
    supervisor, backpressure,
};

/// What a spawned worker needs for `run()`, built once during
/// [`Dispatcher::build`]/[`Dispatcher::add_process`] and handed to
/// [`supervisor::run_supervised`].
struct PendingWorker {
    name: String,
    worker: Box<dyn RobotProcess>,
    ctx: Arc<ProcessContext>,
    keep_alive: bool,
}

struct RunningWorker {
    shutdown: CancellationToken,
    join: tokio::task::JoinHandle<()>,
}

/// Configuration that does not come from the topology document itself:
/// identity used in heartbeats/log records, and whether a heartbeat outbox
/// should be wired at all (heartbeats are only produced when the framework
/// is configured with a gateway-reachable heartbeat outbox).
pub struct DispatcherOptions {
    pub robot_name: String,
    pub socket_prefix: String,
    pub log_level: String,
    pub heartbeat: bool,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            robot_name: "robot".to_owned(),
            socket_prefix: format!("rembrain-{}", std::process::id()),
            log_level: "INFO".to_owned(),
            heartbeat: false,
        }
    }
}

/// Owns topology construction, the queue/shared-state brokers, every
/// worker's supervised lifecycle, the backpressure monitor, and the log
/// aggregator.
pub struct Dispatcher {
    queue_broker: QueueBroker,
    state_broker: StateBroker,
    robot_name: String,
    system_queues: HashMap<String, QueueHandle>,
    queue_owners: Mutex<HashMap<String, Vec<(String, QueueHandle)>>>,
    endpoints: Mutex<Vec<Endpoint>>,
    known_process_names: Mutex<HashSet<String>>,
    workers: Mutex<HashMap<String, RunningWorker>>,
    pending_workers: Mutex<Vec<PendingWorker>>,
    remote_log_sink: Mutex<Option<Box<dyn RemoteLogSink>>>,
    shared: Mutex<HashMap<String, SharedHandle>>,
    watcher_outbox: Option<QueueHandle>,
    shutdown: CancellationToken,
}

fn configuration_error(message: impl Into<String>) -> error_stack::Report<ErrorKind> {
    error_stack::report!(ErrorKind::Configuration).attach_printable(message.into())
}

impl Dispatcher {
    /// Runs the construction algorithm: validates the topology, allocates
    /// the fan-out queue fabric, the shared-state registry, each worker's
    /// system inbox, and (optionally) a heartbeat outbox. Spawning each
    /// worker under supervision happens in [`Self::run`], once the caller
    /// has had a chance to also register a remote log sink.
    pub async fn build(
        topology: &Topology,
        registry: &WorkerRegistry,
        options: DispatcherOptions,
    ) -> Result<Self> {
        validate(topology)?;

        let queue_broker = QueueBroker::new(format!("{}-queues", options.socket_prefix));
        let state_broker = StateBroker::new(format!("{}-state", options.socket_prefix));

        let mut queue_owners: HashMap<String, Vec<(String, QueueHandle)>> = HashMap::new();
        let mut endpoints = Vec::new();
        let mut consume_queues_per_process: HashMap<String, HashMap<String, QueueHandle>> =
            HashMap::new();

        // Step 3: one dedicated physical queue per (consumer, logical name).
        for (proc_name, spec) in &topology.processes {
            let mut consume_map = HashMap::new();
            for name in spec.consume.as_slice() {
                let capacity = topology.queue_capacity(name);
                let physical_key = format!("{proc_name}::{name}");
                queue_broker
                    .declare_queue(&physical_key, capacity as usize)
                    .await;
                let handle = queue_broker.handle(physical_key);
                queue_owners
                    .entry(name.clone())
                    .or_default()
                    .push((proc_name.clone(), handle.clone()));
                endpoints.push(Endpoint {
                    owner: proc_name.clone(),
                    queue_name: name.clone(),
                    kind: EndpointKind::Consume,
                    capacity,
                    handle: handle.clone(),
                });
                consume_map.insert(name.clone(), handle);
            }
            consume_queues_per_process.insert(proc_name.clone(), consume_map);
        }

        // Publish fan-out: every publisher of `name` gets a handle to every
        // consumer's dedicated queue for `name`.
        let mut publish_queues_per_process: HashMap<String, HashMap<String, Vec<QueueHandle>>> =
            HashMap::new();
        for (proc_name, spec) in &topology.processes {
            let mut publish_map = HashMap::new();
            for name in spec.publish.as_slice() {
                let owners = queue_owners.get(name).cloned().unwrap_or_default();
                let mut handles = Vec::with_capacity(owners.len());
                for (_, handle) in owners {
                    endpoints.push(Endpoint {
                        owner: proc_name.clone(),
                        queue_name: name.clone(),
                        kind: EndpointKind::Publish,
                        capacity: topology.queue_capacity(name),
                        handle: handle.clone(),
                    });
                    handles.push(handle);
                }
                publish_map.insert(name.clone(), handles);
            }
            publish_queues_per_process.insert(proc_name.clone(), publish_map);
        }

        // Step 5a: one system inbox per worker, default-sized, shared
        // read-only by every worker for `respond_to` routing.
        let mut system_queues = HashMap::new();
        for proc_name in topology.processes.keys() {
            let physical_key = format!("__system__::{proc_name}");
            queue_broker
                .declare_queue(&physical_key, SYSTEM_INBOX_CAPACITY as usize)
                .await;
            system_queues.insert(proc_name.clone(), queue_broker.handle(physical_key));
        }

        // Step 5b: shared-state registry — `shared_objects` is topology-wide,
        // not per-process, so every worker's bundle is the same map.
        let mut shared = HashMap::new();
        for (name, tag) in &topology.shared_objects {
            let kind = ObjectKind::from_tag(tag)
                .ok_or_else(|| configuration_error(format!("unknown shared-object tag '{tag}' for '{name}'")))?;
            state_broker
                .add_shared_object(name, kind)
                .await
                .change_context(ErrorKind::Configuration)?;
            let handle = match kind {
                ObjectKind::Dict => SharedHandle::Dict(state_broker.dict(name.clone())),
                ObjectKind::List => SharedHandle::List(state_broker.list(name.clone())),
                ObjectKind::Lock => SharedHandle::Lock(state_broker.lock(name.clone())),
                ObjectKind::ValueBool => SharedHandle::ValueBool(state_broker.value(name.clone())),
                ObjectKind::ValueInt => SharedHandle::ValueInt(state_broker.value(name.clone())),
                ObjectKind::ValueFloat => SharedHandle::ValueFloat(state_broker.value(name.clone())),
                ObjectKind::ValueString => SharedHandle::ValueString(state_broker.value(name.clone())),
            };
            shared.insert(name.clone(), handle);
        }

        // Step 5c: heartbeat outbox, only when out-of-cluster forwarding was
        // requested.
        let watcher_outbox = if options.heartbeat {
            let key = "__heartbeat__".to_owned();
            queue_broker
                .declare_queue(&key, topology_config::DEFAULT_QUEUE_CAPACITY as usize)
                .await;
            Some(queue_broker.handle(key))
        } else {
            None
        };

        // Log pipeline's shared queue.
        queue_broker
            .declare_queue(
                robot_logging::LOG_QUEUE_NAME,
                robot_logging::LOG_QUEUE_CAPACITY,
            )
            .await;

        let mut pending_workers = Vec::new();
        let mut known_process_names = HashSet::new();
        for (proc_name, spec) in &topology.processes {
            known_process_names.insert(proc_name.clone());
            let worker = registry
                .build(proc_name, &spec.params_as_json())
                .ok_or_else(|| configuration_error(format!("no worker factory registered for '{proc_name}'")))?;

            let watcher = WatcherHandle::new(watcher_outbox.clone(), options.robot_name.clone(), proc_name.clone());
            let ctx = Arc::new(ProcessContext::new(
                proc_name.clone(),
                consume_queues_per_process.remove(proc_name).unwrap_or_default(),
                publish_queues_per_process.remove(proc_name).unwrap_or_default(),
                system_queues.clone(),
                system_queues[proc_name].clone(),
                shared.clone(),
                watcher,
            ));

            pending_workers.push(PendingWorker {
                name: proc_name.clone(),
                worker,
                ctx,
                keep_alive: spec.keep_alive(),
            });
        }

        Ok(Self {
            queue_broker,
            state_broker,
            robot_name: options.robot_name,
            system_queues,
            queue_owners: Mutex::new(queue_owners),
            endpoints: Mutex::new(endpoints),
            known_process_names: Mutex::new(known_process_names),
            workers: Mutex::new(HashMap::new()),
            pending_workers: Mutex::new(pending_workers),
            remote_log_sink: Mutex::new(None),
            shared: Mutex::new(shared),
            watcher_outbox,
            shutdown: CancellationToken::new(),
        })
    }

    /// Registers the remote log sink the log aggregator forwards to (when
    /// credentials/gateway resolved one). Must be called before
    /// [`Self::run`].
    pub async fn set_remote_log_sink(&self, sink: Box<dyn RemoteLogSink>) {
        *self.remote_log_sink.lock().await = Some(sink);
    }

    /// A clone of the heartbeat outbox handle, for a heartbeat-sender
    /// worker (`ws-bridge`) to drain and forward to the remote gateway.
    pub fn watcher_outbox(&self) -> Option<QueueHandle> {
        self.watcher_outbox.clone()
    }

    pub fn log_queue(&self) -> QueueHandle {
        self.queue_broker.handle(robot_logging::LOG_QUEUE_NAME)
    }

    /// Spawns the queue/shared-state brokers' accept loops, every
    /// constructed worker's supervised lifecycle, the backpressure monitor,
    /// and the log aggregator; runs until [`Self::shutdown`] is called.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let broker_shutdown = self.shutdown.clone();
        let queue_broker = self.queue_broker.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = queue_broker.serve() => {
                    if let Err(error) = result {
                        tracing::error!(?error, "queue broker stopped");
                    }
                }
                () = broker_shutdown.cancelled() => {}
            }
        });

        let broker_shutdown = self.shutdown.clone();
        let state_broker = self.state_broker.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = state_broker.serve() => {
                    if let Err(error) = result {
                        tracing::error!(?error, "shared-state broker stopped");
                    }
                }
                () = broker_shutdown.cancelled() => {}
            }
        });

        // Give the brokers a moment to bind before workers start dialing.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let pending = std::mem::take(&mut *self.pending_workers.lock().await);
        for worker in pending {
            self.spawn_worker(worker.name, worker.worker, worker.ctx, worker.keep_alive)
                .await;
        }

        let endpoints = self.endpoints.lock().await.clone();
        tokio::spawn(backpressure::run_monitor(endpoints, self.shutdown.clone()));

        let remote_sink = self.remote_log_sink.lock().await.take();
        let log_queue = self.log_queue();
        tokio::spawn(robot_logging::run_aggregator(log_queue, remote_sink));

        Ok(())
    }

    async fn spawn_worker(
        &self,
        name: String,
        worker: Box<dyn RobotProcess>,
        ctx: Arc<ProcessContext>,
        keep_alive: bool,
    ) {
        let token = self.shutdown.child_token();
        let join = tokio::spawn(supervisor::run_supervised(
            name.clone(),
            worker,
            ctx,
            keep_alive,
            token.clone(),
        ));
        self.workers
            .lock()
            .await
            .insert(name, RunningWorker { shutdown: token, join });
    }

    /// Adds a new worker after start. Fails if `name` collides with the
    /// topology or a previously added process. The new worker's `publish`
    /// endpoints are wired against whatever consumers already exist for
    /// those names; a name it newly `consume`s gets a fresh dedicated
    /// queue. It cannot retroactively inject itself into an
    /// already-running publisher's fixed `publish_queues` map — see
    /// DESIGN.md's Open Question on this limitation.
    pub async fn add_process(
        &self,
        name: impl Into<String>,
        consume: Vec<String>,
        publish: Vec<String>,
        capacity_for: impl Fn(&str) -> u32,
        worker: Box<dyn RobotProcess>,
        keep_alive: bool,
    ) -> Result<()> {
        let name = name.into();
        {
            let mut known = self.known_process_names.lock().await;
            if known.contains(&name) {
                return Err(configuration_error(format!(
                    "add_process: '{name}' collides with an existing process"
                )));
            }
            known.insert(name.clone());
        }

        let mut consume_map = HashMap::new();
        let mut queue_owners = self.queue_owners.lock().await;
        let mut endpoints = self.endpoints.lock().await;
        for queue_name in &consume {
            let capacity = capacity_for(queue_name);
            let physical_key = format!("{name}::{queue_name}");
            self.queue_broker
                .declare_queue(&physical_key, capacity as usize)
                .await;
            let handle = self.queue_broker.handle(physical_key);
            queue_owners
                .entry(queue_name.clone())
                .or_default()
                .push((name.clone(), handle.clone()));
            endpoints.push(Endpoint {
                owner: name.clone(),
                queue_name: queue_name.clone(),
                kind: EndpointKind::Consume,
                capacity,
                handle: handle.clone(),
            });
            consume_map.insert(queue_name.clone(), handle);
        }

        let mut publish_map = HashMap::new();
        for queue_name in &publish {
            let owners = queue_owners.get(queue_name).cloned().unwrap_or_default();
            let mut handles = Vec::with_capacity(owners.len());
            for (_, handle) in owners {
                endpoints.push(Endpoint {
                    owner: name.clone(),
                    queue_name: queue_name.clone(),
                    kind: EndpointKind::Publish,
                    capacity: capacity_for(queue_name),
                    handle: handle.clone(),
                });
                handles.push(handle);
            }
            publish_map.insert(queue_name.clone(), handles);
        }
        drop(queue_owners);
        drop(endpoints);

        let inbox_key = format!("__system__::{name}");
        self.queue_broker
            .declare_queue(&inbox_key, SYSTEM_INBOX_CAPACITY as usize)
            .await;
        let own_inbox = self.queue_broker.handle(inbox_key);

        let watcher = WatcherHandle::new(self.watcher_outbox.clone(), self.robot_name.clone(), name.clone());
        let mut system_queues = self.system_queues.clone();
        system_queues.insert(name.clone(), own_inbox.clone());

        let shared = self.shared.lock().await.clone();
        let ctx = Arc::new(ProcessContext::new(
            name.clone(),
            consume_map,
            publish_map,
            system_queues,
            own_inbox,
            shared,
            watcher,
        ));

        self.spawn_worker(name, worker, ctx, keep_alive).await;
        Ok(())
    }

    /// Cancels the named worker's supervised loop. A no-op (warns) if no
    /// such worker is running.
    pub async fn stop_process(&self, name: &str) {
        match self.workers.lock().await.remove(name) {
            Some(running) => {
                running.shutdown.cancel();
                drop(running.join);
            }
            None => tracing::warn!(name, "stop_process: no such running process"),
        }
    }

    /// Adds a topology-wide shared object after start. Fails on a name
    /// collision. Workers spawned afterward (via [`Self::add_process`])
    /// see it in their shared bundle; already-running workers do not, since
    /// their bundle was handed to them once at spawn time (the same
    /// snapshot-at-spawn limitation `add_process` has for `publish_queues`).
    pub async fn add_shared_object(&self, name: &str, kind: ObjectKind) -> Result<()> {
        self.state_broker
            .add_shared_object(name, kind)
            .await
            .change_context(ErrorKind::Configuration)?;

        let handle = match kind {
            ObjectKind::Dict => SharedHandle::Dict(self.state_broker.dict(name)),
            ObjectKind::List => SharedHandle::List(self.state_broker.list(name)),
            ObjectKind::Lock => SharedHandle::Lock(self.state_broker.lock(name)),
            ObjectKind::ValueBool => SharedHandle::ValueBool(self.state_broker.value(name)),
            ObjectKind::ValueInt => SharedHandle::ValueInt(self.state_broker.value(name)),
            ObjectKind::ValueFloat => SharedHandle::ValueFloat(self.state_broker.value(name)),
            ObjectKind::ValueString => SharedHandle::ValueString(self.state_broker.value(name)),
        };
        self.shared.lock().await.insert(name.to_owned(), handle);
        Ok(())
    }

    /// Idempotent: warns (does not fail) if `name` is absent, matching
    /// `del_shared_object`'s Python counterpart.
    pub async fn del_shared_object(&self, name: &str) {
        self.state_broker.del_shared_object(name).await;
        self.shared.lock().await.remove(name);
    }

    /// Stops the backpressure monitor, log aggregator, and every running
    /// worker's supervised loop.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// `processes` must be non-empty, and every `consume` name must be
/// published somewhere.
fn validate(topology: &Topology) -> Result<()> {
    if topology.processes.is_empty() {
        return Err(configuration_error("topology has no processes"));
    }

    let mut published: HashSet<&str> = HashSet::new();
    for spec in topology.processes.values() {
        for name in spec.publish.as_slice() {
            published.insert(name.as_str());
        }
    }

    for (proc_name, spec) in &topology.processes {
        for name in spec.consume.as_slice() {
            if !published.contains(name.as_str()) {
                return Err(configuration_error(format!(
                    "queue '{name}' is consumed by '{proc_name}' but never published"
                )));
            }
        }
    }

    Ok(())
}
