//! Configuration management
//!
//! This module handles the daemon settings: listening port, store and
//! connection capacities, and event loop tuning.

pub mod settings;

pub use settings::{Config, DEFAULT_PORT};
