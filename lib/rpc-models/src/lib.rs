//! Wire models shared by the RPC, WebSocket bridge, and heartbeat protocols.
//! BSON for queue-carried envelopes (`Request`, `BindRequest`,
//! `HeartbeatMessage`), plain JSON for the gateway's control packet.

mod bind_request;
mod control_packet;
mod error;
mod heartbeat;
mod request;

pub use bind_request::{BindRequest, RequestSource};
pub use control_packet::{CommandType, ControlPacket, ExchangeType, Ping};
pub use error::{ErrorKind, Result};
pub use heartbeat::HeartbeatMessage;
pub use request::Request;
