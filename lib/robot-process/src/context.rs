use std::{collections::HashMap, sync::Mutex as SyncMutex, time::Duration};

use error_stack::{IntoReport, ResultExt};
use queue_fabric::QueueHandle;
use rpc_models::Request;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::{ErrorKind, Result},
    shared::SharedHandle,
    watcher::WatcherHandle,
};

/// A worker's injected runtime: its queue endpoints, its shared-state
/// bundle, its own system inbox, and its heartbeat outbox. The Dispatcher
/// builds one of these per spawned worker (per the fan-out allocation
/// algorithm) and hands it to whatever implements [`crate::RobotProcess`].
///
/// `send_request`/`wait_response`/`respond_to` correlate by the `Request`
/// envelope's uid and `client_process` fields rather than a separate
/// correlation type, since those three fields are all routing needs.
pub struct ProcessContext {
    name: String,
    consume_queues: HashMap<String, QueueHandle>,
    publish_queues: HashMap<String, Vec<QueueHandle>>,
    system_queues: HashMap<String, QueueHandle>,
    own_inbox: QueueHandle,
    shared: HashMap<String, SharedHandle>,
    watcher: WatcherHandle,
    queues_to_clear: SyncMutex<Vec<String>>,
    received_replies: Mutex<HashMap<Uuid, serde_json::Value>>,
}

/// Per-worker buffered-reply cap; `wait_response` fails past 50 unclaimed
/// out-of-order replies.
const MAX_BUFFERED_REPLIES: usize = 50;

/// Per-item drain bound inside `clear_queue`, matching `queue.get(timeout=2.0)`.
const CLEAR_QUEUE_TIMEOUT: Duration = Duration::from_secs(2);

impl ProcessContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        consume_queues: HashMap<String, QueueHandle>,
        publish_queues: HashMap<String, Vec<QueueHandle>>,
        system_queues: HashMap<String, QueueHandle>,
        own_inbox: QueueHandle,
        shared: HashMap<String, SharedHandle>,
        watcher: WatcherHandle,
    ) -> Self {
        Self {
            name: name.into(),
            consume_queues,
            publish_queues,
            system_queues,
            own_inbox,
            shared,
            watcher,
            queues_to_clear: SyncMutex::new(Vec::new()),
            received_replies: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_consume_queue(&self, queue_name: &str) -> bool {
        self.consume_queues.contains_key(queue_name)
    }

    pub fn has_publish_queue(&self, queue_name: &str) -> bool {
        self.publish_queues.contains_key(queue_name)
    }

    /// Looks up one entry of the shared-state bundle by name.
    pub fn shared(&self, name: &str) -> Result<&SharedHandle> {
        self.shared
            .get(name)
            .ok_or_else(|| configuration_error(format!("no shared object named '{name}'")))
    }

    /// Registers `queue_name` to be drained during `free_resources`, the
    /// Rust equivalent of a subclass appending to `self.queues_to_clear`.
    pub fn mark_queue_for_clearing(&self, queue_name: impl Into<String>) {
        self.queues_to_clear
            .lock()
            .expect("queues_to_clear mutex poisoned")
            .push(queue_name.into());
    }

    /// Publishes one copy of `message` into every queue subscribed under
    /// `queue_name` (fan-out). Omitting `queue_name` only works when there
    /// is exactly one publish endpoint.
    pub async fn publish(
        &self,
        message: serde_json::Value,
        queue_name: Option<&str>,
        clear_on_overflow: bool,
    ) -> Result<()> {
        let name = resolve_name(&self.publish_queues, queue_name, "publish")?;
        let payload = encode(&message)?;
        for queue in &self.publish_queues[&name] {
            queue
                .put(payload.clone(), clear_on_overflow)
                .await
                .change_context(ErrorKind::Transport)?;
        }
        Ok(())
    }

    /// Blocks on the chosen consume queue. With `clear_all_messages`, keeps
    /// draining non-blockingly after the first item and returns only the
    /// last one retrieved.
    pub async fn consume(
        &self,
        queue_name: Option<&str>,
        clear_all_messages: bool,
    ) -> Result<Vec<u8>> {
        let name = resolve_name(&self.consume_queues, queue_name, "consume")?;
        let queue = &self.consume_queues[&name];

        let mut message = queue.get().await.change_context(ErrorKind::Transport)?;
        if clear_all_messages {
            while let Some(next) = queue.try_get().await.change_context(ErrorKind::Transport)? {
                message = next;
            }
        }
        Ok(message)
    }

    /// Exactly one of `publish_queue_name`/`consume_queue_name` must be set.
    /// For a publish name, true if *any* fan-out copy is full.
    pub async fn is_full(
        &self,
        publish_queue_name: Option<&str>,
        consume_queue_name: Option<&str>,
    ) -> Result<bool> {
        match (publish_queue_name, consume_queue_name) {
            (None, None) => Err(configuration_error(
                "is_full called with neither a publish nor a consume queue name",
            )),
            (Some(_), Some(_)) => Err(configuration_error(
                "is_full called with both a publish and a consume queue name",
            )),
            (Some(name), None) => {
                let queues = self.publish_queues.get(name).ok_or_else(|| {
                    configuration_error(format!("no publish queue named '{name}'"))
                })?;
                for queue in queues {
                    if queue.is_full().await.change_context(ErrorKind::Transport)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            (None, Some(name)) => {
                let queue = self
                    .consume_queues
                    .get(name)
                    .ok_or_else(|| configuration_error(format!("no consume queue named '{name}'")))?;
                queue.is_full().await.change_context(ErrorKind::Transport)
            }
        }
    }

    pub async fn is_empty(&self, consume_queue_name: Option<&str>) -> Result<bool> {
        let name = resolve_name(&self.consume_queues, consume_queue_name, "is_empty")?;
        self.consume_queues[&name]
            .is_empty()
            .await
            .change_context(ErrorKind::Transport)
    }

    /// Wraps `data` in a `Request` envelope, publishes it, and returns the
    /// envelope's uid for a later `wait_response`.
    pub async fn send_request(
        &self,
        data: serde_json::Value,
        queue_name: Option<&str>,
        service_name: &str,
    ) -> Result<Uuid> {
        let request = Request::new(self.name.as_str(), service_name, data)
            .change_context(ErrorKind::Configuration)?;
        let uid = request.uid;
        let payload = request.to_bson().change_context(ErrorKind::Transport)?;

        let name = resolve_name(&self.publish_queues, queue_name, "send_request")?;
        for queue in &self.publish_queues[&name] {
            queue
                .put(payload.clone(), false)
                .await
                .change_context(ErrorKind::Transport)?;
        }
        Ok(uid)
    }

    /// Blocks until the reply with this `uid` arrives on the worker's own
    /// system inbox, buffering any other replies that arrive first so a
    /// later `wait_response` for a different uid can still find them.
    /// Ordering of arrival does not matter.
    pub async fn wait_response(&self, uid: Uuid) -> Result<serde_json::Value> {
        if let Some(data) = self.received_replies.lock().await.remove(&uid) {
            return Ok(data);
        }

        loop {
            if self.received_replies.lock().await.len() > MAX_BUFFERED_REPLIES {
                return Err(error_stack::report!(ErrorKind::RpcOverflow)).attach_printable(
                    format!("too many buffered replies for '{}'", self.name),
                );
            }

            let bytes = self.own_inbox.get().await.change_context(ErrorKind::Transport)?;
            let reply = Request::from_bson(&bytes).change_context(ErrorKind::Transport)?;
            if reply.uid == uid {
                return Ok(reply.data);
            }
            self.received_replies.lock().await.insert(reply.uid, reply.data);
        }
    }

    /// Routes `data` back into the caller's system inbox, keyed by
    /// `request.client_process`.
    pub async fn respond_to(&self, request: &Request, data: serde_json::Value) -> Result<()> {
        let reply = Request {
            uid: request.uid,
            client_process: request.client_process.clone(),
            service_name: request.service_name.clone(),
            data,
        };
        let payload = reply.to_bson().change_context(ErrorKind::Transport)?;

        let inbox = self.system_queues.get(&request.client_process).ok_or_else(|| {
            configuration_error(format!(
                "no system inbox for client process '{}'",
                request.client_process
            ))
        })?;
        inbox.put(payload, false).await.change_context(ErrorKind::Transport)
    }

    /// Non-blocking, fire-and-forget: never fails the calling worker.
    pub fn heartbeat(&self, data: serde_json::Value) {
        self.watcher.notify(&self.name, data);
    }

    /// Drains every queue registered via `mark_queue_for_clearing`. Called
    /// automatically by `RobotProcess::free_resources`.
    pub async fn clear_queues(&self) {
        let names = self
            .queues_to_clear
            .lock()
            .expect("queues_to_clear mutex poisoned")
            .clone();
        if names.is_empty() {
            return;
        }

        tracing::info!(queues = ?names, "clearing queues");
        for name in names {
            self.clear_queue(&name).await;
        }
    }

    async fn clear_queue(&self, queue_name: &str) {
        if let Some(queue) = self.consume_queues.get(queue_name) {
            Self::drain(queue).await;
        } else if let Some(queues) = self.publish_queues.get(queue_name) {
            for queue in queues {
                Self::drain(queue).await;
            }
        }
    }

    async fn drain(queue: &QueueHandle) {
        loop {
            match tokio::time::timeout(CLEAR_QUEUE_TIMEOUT, queue.get()).await {
                Ok(Ok(_)) => continue,
                _ => break,
            }
        }
    }
}

fn configuration_error(message: impl Into<String>) -> error_stack::Report<ErrorKind> {
    error_stack::report!(ErrorKind::Configuration).attach_printable(message.into())
}

fn encode(message: &serde_json::Value) -> Result<Vec<u8>> {
    serde_json::to_vec(message)
        .into_report()
        .attach_printable("could not encode message for publish")
        .change_context(ErrorKind::Transport)
}

/// Shared defaulting rule behind `publish`/`consume`/`is_empty`/
/// `send_request`: a queue name is required unless exactly one candidate
/// exists, in which case it is picked automatically.
fn resolve_name<V>(
    map: &HashMap<String, V>,
    queue_name: Option<&str>,
    verb: &str,
) -> Result<String> {
    if map.is_empty() {
        return Err(configuration_error(format!("{verb} called with 0 queues available")));
    }

    match queue_name {
        Some(name) => {
            if !map.contains_key(name) {
                return Err(configuration_error(format!("no queue named '{name}'")));
            }
            Ok(name.to_owned())
        }
        None => {
            if map.len() != 1 {
                return Err(configuration_error(format!(
                    "{verb} called with >1 queues available; a queue name must be specified"
                )));
            }
            Ok(map.keys().next().expect("checked len == 1").clone())
        }
    }
}
