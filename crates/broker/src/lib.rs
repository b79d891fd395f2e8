//! Admission-controlled job broker for the synthesis backend.
//!
//! At most `concurrency` jobs hold a slot against the backend at once.
//! Everything else waits in a FIFO backlog until the [`Dispatcher`]
//! promotes it. Terminal results sit in a single-consumption store until
//! the client polls them or the retention sweeper evicts them.

pub mod backlog;
pub mod broker;
pub mod config;
pub mod dispatcher;
pub mod gate;
pub mod retention;
pub mod store;

pub use broker::{Broker, BrokerStats, JobView};
pub use config::BrokerConfig;
pub use dispatcher::Dispatcher;
