//! IPC module for observers of the decoding session

mod protocol;
mod server;

pub use protocol::{DecoderStatus, Notification, Request, Response};
pub use server::Server;
