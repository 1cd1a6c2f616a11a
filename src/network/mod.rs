//! Network Layer
//!
//! Line-oriented TCP server for field devices.
//! Connection tasks never touch match state; they feed the registry mailbox
//! and drain their own outbound queue.

pub mod protocol;
pub mod client;
pub mod registry;
pub mod server;

pub use protocol::{ProtocolError, decode_handshake};
pub use client::{Client, ClientError, ClientHandle, ClientKind};
pub use registry::{ClientRegistry, ConnectionStatus};
pub use server::{FieldServer, FieldServerError, GameLoop, ServerConfig};
