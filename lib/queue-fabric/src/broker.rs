//! The broker owns every physical queue's backing deque and runs inside the
//! Dispatcher process. Worker processes never see a deque directly — they
//! only hold a [`crate::QueueHandle`], a thin client that dials the broker's
//! local socket per call, mirroring how `lib/nano`'s `Client` dials an
//! `nng` socket owned by a separate process.

use std::{collections::HashMap, collections::VecDeque, sync::Arc};

use error_stack::{IntoReport, ResultExt};
use interprocess::local_socket::tokio::{LocalSocketListener, LocalSocketStream};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::{
    error::{ErrorKind, Result},
    protocol::{Request, Response},
    transport,
};

enum Command {
    Put {
        payload: Vec<u8>,
        clear_on_overflow: bool,
        reply: oneshot::Sender<()>,
    },
    Get {
        reply: oneshot::Sender<Vec<u8>>,
    },
    TryGet {
        reply: oneshot::Sender<Option<Vec<u8>>>,
    },
    TryPut {
        payload: Vec<u8>,
        reply: oneshot::Sender<bool>,
    },
    IsEmpty {
        reply: oneshot::Sender<bool>,
    },
    IsFull {
        reply: oneshot::Sender<bool>,
    },
    Len {
        reply: oneshot::Sender<usize>,
    },
}

type Registry = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Command>>>>;

/// Owns the named physical queues declared during topology construction and
/// serves them over a local socket. Cheap to clone — the registry is an
/// `Arc`, so a Dispatcher can keep one handle for `declare_queue`/`handle`
/// calls while moving another into the task that runs [`Self::serve`].
#[derive(Clone)]
pub struct QueueBroker {
    socket_name: String,
    queues: Registry,
}

impl QueueBroker {
    /// Creates a broker that will listen on `socket_name` once [`Self::serve`]
    /// is called. `socket_name` should be unique per Dispatcher run (the CLI
    /// derives it from the topology's robot name and a run id).
    pub fn new(socket_name: impl Into<String>) -> Self {
        Self {
            socket_name: socket_name.into(),
            queues: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn socket_name(&self) -> &str {
        &self.socket_name
    }

    /// Declares a physical queue of the given `capacity`. Idempotent: calling
    /// it twice for the same name replaces the queue (used by `add_process`
    /// wiring new consumers after start).
    pub async fn declare_queue(&self, name: &str, capacity: usize) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_queue(capacity.max(1), cmd_rx));
        self.queues.lock().await.insert(name.to_owned(), cmd_tx);
    }

    /// Builds a client handle bound to this broker's socket for `name`.
    /// Does not itself declare the queue — callers must have done so (the
    /// Dispatcher always declares queues before handing out handles).
    pub fn handle(&self, name: impl Into<String>) -> crate::QueueHandle {
        crate::QueueHandle::new(self.socket_name.clone(), name.into())
    }

    /// Runs the accept loop forever, dispatching each connection's frames to
    /// the named queue's task. Intended to be spawned as its own task in the
    /// Dispatcher process.
    pub async fn serve(self) -> Result<()> {
        let listener = LocalSocketListener::bind(self.socket_name.clone())
            .into_report()
            .attach_printable_lazy(|| format!("could not bind socket {}", self.socket_name))
            .change_context(ErrorKind::BrokerStart)?;

        tracing::info!(socket = %self.socket_name, "queue broker listening");
        let queues = self.queues;
        loop {
            let stream = listener
                .accept()
                .await
                .into_report()
                .attach_printable("could not accept connection")
                .change_context(ErrorKind::BrokerStart)?;
            tokio::spawn(serve_connection(stream, Arc::clone(&queues)));
        }
    }
}

async fn serve_connection(stream: LocalSocketStream, queues: Registry) {
    let mut socket = transport::frame(stream);
    loop {
        let request: Request = match transport::read_frame(&mut socket).await {
            Ok(request) => request,
            Err(_) => return,
        };

        let response = handle_request(request, &queues).await;
        if transport::write_frame(&mut socket, &response).await.is_err() {
            return;
        }
    }
}

async fn handle_request(request: Request, queues: &Registry) -> Response {
    macro_rules! dispatch {
        ($queue:expr, $make_cmd:expr, $on_reply:expr) => {{
            let sender = queues.lock().await.get($queue).cloned();
            let Some(sender) = sender else {
                return Response::UnknownQueue;
            };
            let (reply_tx, reply_rx) = oneshot::channel();
            if sender.send($make_cmd(reply_tx)).is_err() {
                return Response::UnknownQueue;
            }
            match reply_rx.await {
                Ok(value) => $on_reply(value),
                Err(_) => Response::UnknownQueue,
            }
        }};
    }

    match request {
        Request::Put {
            queue,
            payload,
            clear_on_overflow,
        } => dispatch!(
            &queue,
            |reply| Command::Put {
                payload,
                clear_on_overflow,
                reply,
            },
            |()| Response::Ack
        ),
        Request::Get { queue } => {
            dispatch!(&queue, |reply| Command::Get { reply }, Response::Item)
        }
        Request::TryGet { queue } => dispatch!(
            &queue,
            |reply| Command::TryGet { reply },
            |item: Option<Vec<u8>>| item.map_or(Response::NoItem, Response::Item)
        ),
        Request::TryPut { queue, payload } => dispatch!(
            &queue,
            |reply| Command::TryPut { payload, reply },
            |admitted: bool| if admitted { Response::Ack } else { Response::Dropped }
        ),
        Request::IsEmpty { queue } => {
            dispatch!(&queue, |reply| Command::IsEmpty { reply }, Response::Bool)
        }
        Request::IsFull { queue } => {
            dispatch!(&queue, |reply| Command::IsFull { reply }, Response::Bool)
        }
        Request::Len { queue } => {
            dispatch!(&queue, |reply| Command::Len { reply }, Response::Len)
        }
    }
}

/// The task backing a single physical queue. One instance per queue name;
/// owns the deque exclusively so no locking is needed inside it.
async fn run_queue(capacity: usize, mut cmd_rx: mpsc::UnboundedReceiver<Command>) {
    let mut items: VecDeque<Vec<u8>> = VecDeque::with_capacity(capacity.min(1024));
    let mut waiting_gets: VecDeque<oneshot::Sender<Vec<u8>>> = VecDeque::new();
    let mut waiting_puts: VecDeque<(Vec<u8>, oneshot::Sender<()>)> = VecDeque::new();

    while let Some(command) = cmd_rx.recv().await {
        match command {
            Command::Put {
                payload,
                clear_on_overflow,
                reply,
            } => {
                if let Some(get_reply) = waiting_gets.pop_front() {
                    let _ = get_reply.send(payload);
                    let _ = reply.send(());
                    continue;
                }

                if clear_on_overflow {
                    while items.len() >= capacity {
                        items.pop_front();
                    }
                    items.push_back(payload);
                    let _ = reply.send(());
                } else if items.len() < capacity {
                    items.push_back(payload);
                    let _ = reply.send(());
                } else {
                    waiting_puts.push_back((payload, reply));
                }
            }
            Command::Get { reply } => {
                if let Some(item) = items.pop_front() {
                    if let Some((queued_payload, put_reply)) = waiting_puts.pop_front() {
                        items.push_back(queued_payload);
                        let _ = put_reply.send(());
                    }
                    let _ = reply.send(item);
                } else if let Some((queued_payload, put_reply)) = waiting_puts.pop_front() {
                    let _ = put_reply.send(());
                    let _ = reply.send(queued_payload);
                } else {
                    waiting_gets.push_back(reply);
                }
            }
            Command::TryGet { reply } => {
                if let Some(item) = items.pop_front() {
                    if let Some((queued_payload, put_reply)) = waiting_puts.pop_front() {
                        items.push_back(queued_payload);
                        let _ = put_reply.send(());
                    }
                    let _ = reply.send(Some(item));
                } else if let Some((queued_payload, put_reply)) = waiting_puts.pop_front() {
                    let _ = put_reply.send(());
                    let _ = reply.send(Some(queued_payload));
                } else {
                    let _ = reply.send(None);
                }
            }
            Command::TryPut { payload, reply } => {
                if let Some(get_reply) = waiting_gets.pop_front() {
                    let _ = get_reply.send(payload);
                    let _ = reply.send(true);
                } else if items.len() < capacity {
                    items.push_back(payload);
                    let _ = reply.send(true);
                } else {
                    let _ = reply.send(false);
                }
            }
            Command::IsEmpty { reply } => {
                let _ = reply.send(items.is_empty() && waiting_puts.is_empty());
            }
            Command::IsFull { reply } => {
                let _ = reply.send(items.len() >= capacity && waiting_gets.is_empty());
            }
            Command::Len { reply } => {
                let _ = reply.send(items.len() + waiting_puts.len());
            }
        }
    }
}
