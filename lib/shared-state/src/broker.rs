//! The broker owns every shared object's backing storage and runs inside the
//! Dispatcher process, exactly as [`crate::StateBroker`]'s sibling
//! `queue_fabric::QueueBroker` owns queue deques. Worker processes never see
//! storage directly — only a typed handle from `crate::handle` that dials
//! this broker's local socket per call.

use std::{collections::HashMap, collections::VecDeque, sync::Arc};

use error_stack::{IntoReport, ResultExt};
use interprocess::local_socket::tokio::{LocalSocketListener, LocalSocketStream};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::{
    error::{ErrorKind, Result},
    handle::{DictHandle, ListHandle, LockHandle, ValueHandle},
    protocol::{ObjectKind, Request, Response},
    transport,
};

type ObjectChannel = mpsc::UnboundedSender<(Request, oneshot::Sender<Response>)>;
type Registry = Arc<Mutex<HashMap<String, (ObjectKind, ObjectChannel)>>>;

/// Owns every shared object declared during topology construction
/// (`add_shared_object`/`del_shared_object`) and serves reads/writes over a
/// local socket. Cheap to clone, same reasoning as
/// `queue_fabric::QueueBroker`.
#[derive(Clone)]
pub struct StateBroker {
    socket_name: String,
    objects: Registry,
}

impl StateBroker {
    pub fn new(socket_name: impl Into<String>) -> Self {
        Self {
            socket_name: socket_name.into(),
            objects: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn socket_name(&self) -> &str {
        &self.socket_name
    }

    /// Registers a new shared object. Fails if `name` already exists, per
    /// `add_shared_object`'s invariant.
    pub async fn add_shared_object(&self, name: &str, kind: ObjectKind) -> Result<()> {
        let mut objects = self.objects.lock().await;
        if objects.contains_key(name) {
            return Err(error_stack::report!(ErrorKind::AlreadyExists))
                .attach_printable_lazy(|| format!("shared object {name} already exists"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_object(kind, rx));
        objects.insert(name.to_owned(), (kind, tx));
        Ok(())
    }

    /// Idempotent: removing an absent name only warns, it never fails.
    pub async fn del_shared_object(&self, name: &str) {
        if self.objects.lock().await.remove(name).is_none() {
            tracing::warn!(name, "del_shared_object: no such shared object");
        }
    }

    pub fn dict(&self, name: impl Into<String>) -> DictHandle {
        DictHandle::new(self.socket_name.clone(), name.into())
    }

    pub fn list(&self, name: impl Into<String>) -> ListHandle {
        ListHandle::new(self.socket_name.clone(), name.into())
    }

    pub fn lock(&self, name: impl Into<String>) -> LockHandle {
        LockHandle::new(self.socket_name.clone(), name.into())
    }

    pub fn value<T>(&self, name: impl Into<String>) -> ValueHandle<T> {
        ValueHandle::new(self.socket_name.clone(), name.into())
    }

    /// Runs the accept loop forever. Intended to be spawned as its own task
    /// in the Dispatcher process.
    pub async fn serve(self) -> Result<()> {
        let listener = LocalSocketListener::bind(self.socket_name.clone())
            .into_report()
            .attach_printable_lazy(|| format!("could not bind socket {}", self.socket_name))
            .change_context(ErrorKind::BrokerStart)?;

        tracing::info!(socket = %self.socket_name, "shared-state broker listening");
        let objects = self.objects;
        loop {
            let stream = listener
                .accept()
                .await
                .into_report()
                .attach_printable("could not accept connection")
                .change_context(ErrorKind::BrokerStart)?;
            tokio::spawn(serve_connection(stream, Arc::clone(&objects)));
        }
    }
}

async fn serve_connection(stream: LocalSocketStream, objects: Registry) {
    let mut socket = transport::frame(stream);
    loop {
        let request: Request = match transport::read_frame(&mut socket).await {
            Ok(request) => request,
            Err(_) => return,
        };

        let response = route(request, &objects).await;
        if transport::write_frame(&mut socket, &response).await.is_err() {
            return;
        }
    }
}

fn object_name(request: &Request) -> &str {
    match request {
        Request::DictGet { name, .. }
        | Request::DictSet { name, .. }
        | Request::DictDel { name, .. }
        | Request::DictKeys { name }
        | Request::DictLen { name }
        | Request::ListPush { name, .. }
        | Request::ListPop { name }
        | Request::ListGet { name, .. }
        | Request::ListSnapshot { name }
        | Request::ListLen { name }
        | Request::ValueGet { name }
        | Request::ValueSet { name, .. }
        | Request::LockAcquire { name }
        | Request::LockRelease { name } => name,
    }
}

async fn route(request: Request, objects: &Registry) -> Response {
    let name = object_name(&request);
    let sender = objects.lock().await.get(name).map(|(_, tx)| tx.clone());
    let Some(sender) = sender else {
        return Response::UnknownObject;
    };

    let (reply_tx, reply_rx) = oneshot::channel();
    if sender.send((request, reply_tx)).is_err() {
        return Response::UnknownObject;
    }
    reply_rx.await.unwrap_or(Response::UnknownObject)
}

enum Storage {
    Dict(HashMap<String, Vec<u8>>),
    List(Vec<Vec<u8>>),
    Value(Vec<u8>),
    Lock {
        held: bool,
        waiters: VecDeque<oneshot::Sender<Response>>,
    },
}

fn initial_storage(kind: ObjectKind) -> Storage {
    match kind {
        ObjectKind::Dict => Storage::Dict(HashMap::new()),
        ObjectKind::List => Storage::List(Vec::new()),
        ObjectKind::Lock => Storage::Lock {
            held: false,
            waiters: VecDeque::new(),
        },
        ObjectKind::ValueBool => Storage::Value(bincode::serialize(&false).unwrap()),
        ObjectKind::ValueInt => Storage::Value(bincode::serialize(&0i64).unwrap()),
        ObjectKind::ValueFloat => Storage::Value(bincode::serialize(&0.0f64).unwrap()),
        ObjectKind::ValueString => Storage::Value(bincode::serialize(&String::new()).unwrap()),
    }
}

/// The task backing a single shared object. Owns its storage exclusively so
/// no locking is needed inside it (mirrors `queue_fabric::broker::run_queue`).
async fn run_object(kind: ObjectKind, mut rx: mpsc::UnboundedReceiver<(Request, oneshot::Sender<Response>)>) {
    let mut storage = initial_storage(kind);

    while let Some((request, reply)) = rx.recv().await {
        let response = match (&mut storage, request) {
            (Storage::Dict(map), Request::DictGet { key, .. }) => {
                map.get(&key).cloned().map_or(Response::NoItem, Response::Item)
            }
            (Storage::Dict(map), Request::DictSet { key, value, .. }) => {
                map.insert(key, value);
                Response::Ack
            }
            (Storage::Dict(map), Request::DictDel { key, .. }) => {
                map.remove(&key);
                Response::Ack
            }
            (Storage::Dict(map), Request::DictKeys { .. }) => {
                Response::Keys(map.keys().cloned().collect())
            }
            (Storage::Dict(map), Request::DictLen { .. }) => Response::Len(map.len()),

            (Storage::List(items), Request::ListPush { value, .. }) => {
                items.push(value);
                Response::Ack
            }
            (Storage::List(items), Request::ListPop { .. }) => {
                items.pop().map_or(Response::NoItem, Response::Item)
            }
            (Storage::List(items), Request::ListGet { index, .. }) => items
                .get(index)
                .cloned()
                .map_or(Response::NoItem, Response::Item),
            (Storage::List(items), Request::ListSnapshot { .. }) => {
                Response::Snapshot(items.clone())
            }
            (Storage::List(items), Request::ListLen { .. }) => Response::Len(items.len()),

            (Storage::Value(stored), Request::ValueGet { .. }) => Response::Item(stored.clone()),
            (Storage::Value(stored), Request::ValueSet { value, .. }) => {
                *stored = value;
                Response::Ack
            }

            (Storage::Lock { held, waiters }, Request::LockAcquire { .. }) => {
                if *held {
                    waiters.push_back(reply);
                    continue;
                }
                *held = true;
                Response::Ack
            }
            (Storage::Lock { held, waiters }, Request::LockRelease { .. }) => {
                if let Some(next) = waiters.pop_front() {
                    let _ = next.send(Response::Ack);
                } else {
                    *held = false;
                }
                Response::Ack
            }

            _ => Response::WrongKind,
        };
        let _ = reply.send(response);
    }
}
