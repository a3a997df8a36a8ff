//! Readiness-based TCP networking
//!
//! This module owns every socket: the fixed pool of client slots, the mio event
//! loop that multiplexes them, and the callback trait that protocol code plugs
//! into.

pub mod connection_table;
pub mod event_loop;
pub mod monitor;

pub use connection_table::{Connection, ConnectionId, ConnectionTable, DEFAULT_MAX_CLIENTS};
pub use event_loop::{
    ConnectionContext, ConnectionHandler, EventLoop, LoopSettings, ShutdownHandle,
    DEFAULT_BUFFER_SIZE, DEFAULT_MAX_OUTBOUND, DEFAULT_MAX_READS_PER_EVENT, DEFAULT_POLL_TIMEOUT,
};
pub use monitor::{TrafficLogger, DEFAULT_MONITOR_PORT};
