//! Commands Layer
//!
//! Handlers a transport (IPC, HTTP) calls into. Arguments arrive already
//! decoded; the repository re-validates names and positions.

mod item_cmd;

pub use item_cmd::*;
