//! Network Layer
//!
//! WebSocket transport in front of the request dispatcher. Nothing here
//! knows about keys or handlers; frames go in, responses come out.

pub mod protocol;
pub mod server;

pub use protocol::{ClientRequest, ServerResponse};
pub use server::{respond, BackendServer, ServerConfig, ServerError};
