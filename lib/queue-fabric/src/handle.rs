use std::sync::Arc;

use error_stack::{IntoReport, ResultExt};
use interprocess::local_socket::tokio::LocalSocketStream;
use tokio::sync::Mutex;

use crate::{
    error::{ErrorKind, Result},
    protocol::{Request, Response},
    transport::{self, FramedSocket},
};

/// A client-side reference to one physical queue owned by a
/// [`crate::QueueBroker`]. Cheap to clone (an `Arc`'d lazily-established
/// connection is shared), and is what a spawned worker process actually
/// holds in its `consume_queues`/`publish_queues` bundle — never the deque
/// itself, which never leaves the Dispatcher process.
#[derive(Clone)]
pub struct QueueHandle {
    socket_name: String,
    queue_name: String,
    connection: Arc<Mutex<Option<FramedSocket>>>,
}

impl QueueHandle {
    pub fn new(socket_name: impl Into<String>, queue_name: impl Into<String>) -> Self {
        Self {
            socket_name: socket_name.into(),
            queue_name: queue_name.into(),
            connection: Arc::new(Mutex::new(None)),
        }
    }

    pub fn name(&self) -> &str {
        &self.queue_name
    }

    /// Enqueues `payload`. Blocks until the broker admits it (or, with
    /// `clear_on_overflow`, until the broker has drained enough backlog to
    /// make room).
    pub async fn put(&self, payload: Vec<u8>, clear_on_overflow: bool) -> Result<()> {
        let response = self
            .roundtrip(Request::Put {
                queue: self.queue_name.clone(),
                payload,
                clear_on_overflow,
            })
            .await?;
        match response {
            Response::Ack => Ok(()),
            Response::UnknownQueue => Err(error_stack::report!(ErrorKind::UnknownQueue)),
            _ => Err(error_stack::report!(ErrorKind::Receive))
                .attach_printable("unexpected response to put"),
        }
    }

    /// Blocks until an item is available.
    pub async fn get(&self) -> Result<Vec<u8>> {
        let response = self
            .roundtrip(Request::Get {
                queue: self.queue_name.clone(),
            })
            .await?;
        match response {
            Response::Item(item) => Ok(item),
            Response::UnknownQueue => Err(error_stack::report!(ErrorKind::UnknownQueue)),
            _ => Err(error_stack::report!(ErrorKind::Receive))
                .attach_printable("unexpected response to get"),
        }
    }

    /// Non-blocking: enqueues `payload` if there is room, otherwise reports
    /// `false` rather than blocking (used by the log pipeline, which must
    /// never stall a worker waiting for its log queue to drain).
    pub async fn try_put(&self, payload: Vec<u8>) -> Result<bool> {
        let response = self
            .roundtrip(Request::TryPut {
                queue: self.queue_name.clone(),
                payload,
            })
            .await?;
        match response {
            Response::Ack => Ok(true),
            Response::Dropped => Ok(false),
            Response::UnknownQueue => Err(error_stack::report!(ErrorKind::UnknownQueue)),
            _ => Err(error_stack::report!(ErrorKind::Receive))
                .attach_printable("unexpected response to try_put"),
        }
    }

    /// Non-blocking: `None` if the queue is currently empty.
    pub async fn try_get(&self) -> Result<Option<Vec<u8>>> {
        let response = self
            .roundtrip(Request::TryGet {
                queue: self.queue_name.clone(),
            })
            .await?;
        match response {
            Response::Item(item) => Ok(Some(item)),
            Response::NoItem => Ok(None),
            Response::UnknownQueue => Err(error_stack::report!(ErrorKind::UnknownQueue)),
            _ => Err(error_stack::report!(ErrorKind::Receive))
                .attach_printable("unexpected response to try_get"),
        }
    }

    pub async fn is_empty(&self) -> Result<bool> {
        self.bool_query(Request::IsEmpty {
            queue: self.queue_name.clone(),
        })
        .await
    }

    pub async fn is_full(&self) -> Result<bool> {
        self.bool_query(Request::IsFull {
            queue: self.queue_name.clone(),
        })
        .await
    }

    pub async fn len(&self) -> Result<usize> {
        let response = self
            .roundtrip(Request::Len {
                queue: self.queue_name.clone(),
            })
            .await?;
        match response {
            Response::Len(len) => Ok(len),
            Response::UnknownQueue => Err(error_stack::report!(ErrorKind::UnknownQueue)),
            _ => Err(error_stack::report!(ErrorKind::Receive))
                .attach_printable("unexpected response to len"),
        }
    }

    async fn bool_query(&self, request: Request) -> Result<bool> {
        match self.roundtrip(request).await? {
            Response::Bool(value) => Ok(value),
            Response::UnknownQueue => Err(error_stack::report!(ErrorKind::UnknownQueue)),
            _ => Err(error_stack::report!(ErrorKind::Receive))
                .attach_printable("unexpected response to boolean query"),
        }
    }

    async fn roundtrip(&self, request: Request) -> Result<Response> {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }

        let socket = guard.as_mut().expect("just populated");
        if transport::write_frame(socket, &request).await.is_err() {
            // Stale connection (broker restarted or reset). Reconnect once.
            *guard = Some(self.connect().await?);
            let socket = guard.as_mut().expect("just populated");
            transport::write_frame(socket, &request).await?;
        }

        transport::read_frame(guard.as_mut().expect("just populated")).await
    }

    /// Dials the broker, retrying briefly since callers commonly spawn the
    /// broker's accept loop and a handle's first call in the same breath
    /// (the Dispatcher does this for every worker it starts).
    async fn connect(&self) -> Result<FramedSocket> {
        const ATTEMPTS: u32 = 20;
        const RETRY_DELAY: std::time::Duration = std::time::Duration::from_millis(25);

        let mut last_error = None;
        for attempt in 0..ATTEMPTS {
            match LocalSocketStream::connect(self.socket_name.as_str()).await {
                Ok(stream) => return Ok(transport::frame(stream)),
                Err(error) => {
                    last_error = Some(error);
                    if attempt + 1 < ATTEMPTS {
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        }

        Err(last_error.expect("loop ran at least once"))
            .into_report()
            .attach_printable_lazy(|| {
                format!("could not connect to queue broker at {}", self.socket_name)
            })
            .change_context(ErrorKind::Connect)
    }
}

impl core::fmt::Debug for QueueHandle {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fmt.debug_struct("QueueHandle")
            .field("queue_name", &self.queue_name)
            .finish_non_exhaustive()
    }
}
