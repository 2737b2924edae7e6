use std::{marker::PhantomData, sync::Arc};

use error_stack::{IntoReport, ResultExt};
use interprocess::local_socket::tokio::LocalSocketStream;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;

use crate::{
    error::{ErrorKind, Result},
    protocol::{Request, Response},
    transport::{self, FramedSocket},
};

/// Connection plumbing shared by every typed handle. Not exposed directly —
/// callers go through `DictHandle`/`ListHandle`/`ValueHandle`/`LockHandle`.
#[derive(Clone)]
struct RawHandle {
    socket_name: String,
    name: String,
    connection: Arc<Mutex<Option<FramedSocket>>>,
}

impl RawHandle {
    fn new(socket_name: String, name: String) -> Self {
        Self {
            socket_name,
            name,
            connection: Arc::new(Mutex::new(None)),
        }
    }

    async fn roundtrip(&self, request: Request) -> Result<Response> {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }

        let socket = guard.as_mut().expect("just populated");
        if transport::write_frame(socket, &request).await.is_err() {
            *guard = Some(self.connect().await?);
            let socket = guard.as_mut().expect("just populated");
            transport::write_frame(socket, &request).await?;
        }

        let response = transport::read_frame(guard.as_mut().expect("just populated")).await?;
        match response {
            Response::UnknownObject => Err(error_stack::report!(ErrorKind::UnknownObject))
                .attach_printable_lazy(|| format!("no such shared object {}", self.name)),
            Response::WrongKind => Err(error_stack::report!(ErrorKind::WrongKind))
                .attach_printable_lazy(|| format!("shared object {} is a different kind", self.name)),
            other => Ok(other),
        }
    }

    /// Dials the broker, retrying briefly (mirrors `queue_fabric::handle`).
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
                format!("could not connect to shared-state broker at {}", self.socket_name)
            })
            .change_context(ErrorKind::Connect)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value)
        .into_report()
        .attach_printable("could not encode shared-state value")
        .change_context(ErrorKind::Send)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes)
        .into_report()
        .attach_printable("could not decode shared-state value")
        .change_context(ErrorKind::Receive)
}

/// A reference to a shared `dict`. Keys are strings; values are anything
/// `serde`-capable, encoded with bincode on the wire.
#[derive(Clone)]
pub struct DictHandle {
    raw: RawHandle,
}

impl DictHandle {
    pub(crate) fn new(socket_name: String, name: String) -> Self {
        Self {
            raw: RawHandle::new(socket_name, name),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let response = self
            .raw
            .roundtrip(Request::DictGet {
                name: self.raw.name.clone(),
                key: key.to_owned(),
            })
            .await?;
        match response {
            Response::Item(bytes) => Ok(Some(decode(&bytes)?)),
            Response::NoItem => Ok(None),
            _ => Err(error_stack::report!(ErrorKind::Receive)),
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = encode(value)?;
        match self
            .raw
            .roundtrip(Request::DictSet {
                name: self.raw.name.clone(),
                key: key.to_owned(),
                value,
            })
            .await?
        {
            Response::Ack => Ok(()),
            _ => Err(error_stack::report!(ErrorKind::Receive)),
        }
    }

    pub async fn del(&self, key: &str) -> Result<()> {
        match self
            .raw
            .roundtrip(Request::DictDel {
                name: self.raw.name.clone(),
                key: key.to_owned(),
            })
            .await?
        {
            Response::Ack => Ok(()),
            _ => Err(error_stack::report!(ErrorKind::Receive)),
        }
    }

    pub async fn keys(&self) -> Result<Vec<String>> {
        match self
            .raw
            .roundtrip(Request::DictKeys {
                name: self.raw.name.clone(),
            })
            .await?
        {
            Response::Keys(keys) => Ok(keys),
            _ => Err(error_stack::report!(ErrorKind::Receive)),
        }
    }

    pub async fn len(&self) -> Result<usize> {
        match self
            .raw
            .roundtrip(Request::DictLen {
                name: self.raw.name.clone(),
            })
            .await?
        {
            Response::Len(len) => Ok(len),
            _ => Err(error_stack::report!(ErrorKind::Receive)),
        }
    }
}

/// A reference to a shared `list`, append/pop-from-end like `multiprocessing.Manager().list()`.
#[derive(Clone)]
pub struct ListHandle {
    raw: RawHandle,
}

impl ListHandle {
    pub(crate) fn new(socket_name: String, name: String) -> Self {
        Self {
            raw: RawHandle::new(socket_name, name),
        }
    }

    pub async fn push<T: Serialize>(&self, value: &T) -> Result<()> {
        let value = encode(value)?;
        match self
            .raw
            .roundtrip(Request::ListPush {
                name: self.raw.name.clone(),
                value,
            })
            .await?
        {
            Response::Ack => Ok(()),
            _ => Err(error_stack::report!(ErrorKind::Receive)),
        }
    }

    pub async fn pop<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self
            .raw
            .roundtrip(Request::ListPop {
                name: self.raw.name.clone(),
            })
            .await?
        {
            Response::Item(bytes) => Ok(Some(decode(&bytes)?)),
            Response::NoItem => Ok(None),
            _ => Err(error_stack::report!(ErrorKind::Receive)),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>> {
        match self
            .raw
            .roundtrip(Request::ListGet {
                name: self.raw.name.clone(),
                index,
            })
            .await?
        {
            Response::Item(bytes) => Ok(Some(decode(&bytes)?)),
            Response::NoItem => Ok(None),
            _ => Err(error_stack::report!(ErrorKind::Receive)),
        }
    }

    pub async fn snapshot<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        match self
            .raw
            .roundtrip(Request::ListSnapshot {
                name: self.raw.name.clone(),
            })
            .await?
        {
            Response::Snapshot(items) => items.iter().map(|bytes| decode(bytes)).collect(),
            _ => Err(error_stack::report!(ErrorKind::Receive)),
        }
    }

    pub async fn len(&self) -> Result<usize> {
        match self
            .raw
            .roundtrip(Request::ListLen {
                name: self.raw.name.clone(),
            })
            .await?
        {
            Response::Len(len) => Ok(len),
            _ => Err(error_stack::report!(ErrorKind::Receive)),
        }
    }
}

/// A reference to a shared scalar cell (`Value:bool`/`Value:int`/
/// `Value:float`/`Value:string`). `T` is pinned by whichever `value::<T>`
/// call the caller made when first referencing the name; the broker does
/// not itself type-check `T`, only that the object kind is a `Value`.
#[derive(Clone)]
pub struct ValueHandle<T> {
    raw: RawHandle,
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> ValueHandle<T> {
    pub(crate) fn new(socket_name: String, name: String) -> Self {
        Self {
            raw: RawHandle::new(socket_name, name),
            _marker: PhantomData,
        }
    }

    pub async fn get(&self) -> Result<T> {
        match self
            .raw
            .roundtrip(Request::ValueGet {
                name: self.raw.name.clone(),
            })
            .await?
        {
            Response::Item(bytes) => decode(&bytes),
            _ => Err(error_stack::report!(ErrorKind::Receive)),
        }
    }

    pub async fn set(&self, value: &T) -> Result<()> {
        let value = encode(value)?;
        match self
            .raw
            .roundtrip(Request::ValueSet {
                name: self.raw.name.clone(),
                value,
            })
            .await?
        {
            Response::Ack => Ok(()),
            _ => Err(error_stack::report!(ErrorKind::Receive)),
        }
    }
}

/// A reference to a shared `Lock`. `acquire` blocks (via the broker's
/// waiter queue) until the lock is free; `release` is a no-op if the caller
/// does not currently hold it (mirrors `multiprocessing.Lock`'s forgiving
/// behavior under misuse rather than panicking).
#[derive(Clone)]
pub struct LockHandle {
    raw: RawHandle,
}

impl LockHandle {
    pub(crate) fn new(socket_name: String, name: String) -> Self {
        Self {
            raw: RawHandle::new(socket_name, name),
        }
    }

    pub async fn acquire(&self) -> Result<()> {
        match self
            .raw
            .roundtrip(Request::LockAcquire {
                name: self.raw.name.clone(),
            })
            .await?
        {
            Response::Ack => Ok(()),
            _ => Err(error_stack::report!(ErrorKind::Receive)),
        }
    }

    pub async fn release(&self) -> Result<()> {
        match self
            .raw
            .roundtrip(Request::LockRelease {
                name: self.raw.name.clone(),
            })
            .await?
        {
            Response::Ack => Ok(()),
            _ => Err(error_stack::report!(ErrorKind::Receive)),
        }
    }
}
