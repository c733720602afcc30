//! Head link transports for Embody.
//!
//! Each transport implements one of the core traits and is otherwise
//! independent of the runtime.
//!
//! Available transports:
//! - **Memory** — in-process broadcast publisher and injectable command queue
//! - **TCP** — newline-delimited JSON over TCP: a publisher every connected
//!   subscriber receives percepts from, and a pull endpoint any number of
//!   Heads can push commands into

pub mod memory;
pub mod tcp;

pub use memory::{BroadcastPublisher, QueueSource};
pub use tcp::{PerceptSubscriber, TcpCommandSource, TcpPublisher, send_command};
