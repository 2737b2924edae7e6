//! Length-delimited bincode framing shared by the broker and its clients.
//!
//! A local (Unix-domain / named-pipe) socket carries one frame per request
//! and one frame per reply, matching the request/reply cadence `lib/nano`'s
//! own `nng`-backed client and server use.

use error_stack::{IntoReport, ResultExt};
use futures_util::{SinkExt, StreamExt};
use interprocess::local_socket::tokio::LocalSocketStream;
use serde::{de::DeserializeOwned, Serialize};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::error::{ErrorKind, Result};

pub(crate) type FramedSocket = Framed<LocalSocketStream, LengthDelimitedCodec>;

pub(crate) fn frame(stream: LocalSocketStream) -> FramedSocket {
    Framed::new(stream, LengthDelimitedCodec::new())
}

pub(crate) async fn write_frame<T: Serialize>(socket: &mut FramedSocket, value: &T) -> Result<()> {
    let bytes = bincode::serialize(value)
        .into_report()
        .attach_printable("could not encode frame")
        .change_context(ErrorKind::Send)?;
    socket
        .send(bytes.into())
        .await
        .into_report()
        .attach_printable("could not write frame to socket")
        .change_context(ErrorKind::Send)
}

pub(crate) async fn read_frame<T: DeserializeOwned>(socket: &mut FramedSocket) -> Result<T> {
    let bytes = socket
        .next()
        .await
        .ok_or_else(|| error_stack::report!(ErrorKind::Receive))
        .attach_printable("broker closed the connection")?
        .into_report()
        .attach_printable("could not read frame from socket")
        .change_context(ErrorKind::Receive)?;
    bincode::deserialize(&bytes)
        .into_report()
        .attach_printable("could not decode frame")
        .change_context(ErrorKind::Receive)
}
