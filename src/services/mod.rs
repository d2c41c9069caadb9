//! Background task subsystem
//!
//! Everything here runs off the request path: bounded hand-off queues, the
//! reminder dispatch worker, the periodic archiver and the async log sink.

pub mod archiver;
pub mod logsink;
pub mod notifier;
pub mod queue;
pub mod reminder;
