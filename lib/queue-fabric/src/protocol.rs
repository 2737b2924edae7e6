//! Wire protocol spoken between a [`crate::QueueHandle`] and the
//! [`crate::QueueBroker`] it was vended by.
//!
//! Frames are bincode-encoded and length-delimited on the socket; see
//! [`crate::transport`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub(crate) enum Request {
    /// Enqueue `payload` onto `queue`, retrying until there is space if
    /// `clear_on_overflow` first drains a blocking amount of backlog.
    Put {
        queue: String,
        payload: Vec<u8>,
        clear_on_overflow: bool,
    },
    /// Block until an item is available, then return it.
    Get { queue: String },
    /// Non-blocking: return `None` if the queue is currently empty.
    TryGet { queue: String },
    /// Non-blocking: enqueue `payload` if there is room, otherwise report
    /// back that it was dropped rather than blocking the caller.
    TryPut { queue: String, payload: Vec<u8> },
    IsEmpty { queue: String },
    IsFull { queue: String },
    Len { queue: String },
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) enum Response {
    Ack,
    Item(Vec<u8>),
    NoItem,
    Dropped,
    Bool(bool),
    Len(usize),
    UnknownQueue,
}
