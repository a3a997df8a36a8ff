//! # PhantomID - Anonymous Account Daemon
//!
//! A single-process TCP service that hands out throwaway anonymous accounts.
//! When I come back to this code, here's what I need to remember:
//!
//! ## What It Does
//! - **Accounts**: each one is a random 32-byte seed plus the SHA-256 of that
//!   seed as a 64-character hex id. Expiry is 90 days out and only informational.
//! - **Protocol**: plaintext, one read is one command (`create`, `delete <id>`,
//!   `list`, `help`, `quit`), one reply per command.
//! - **Networking**: a single mio readiness loop owns every socket; clients sit in
//!   a fixed pool of slots.
//!
//! ## How I Organized My Code
//! - `utils/`: seed generation, id derivation, timestamps
//! - `account/`: the account record and the bounded store
//! - `network/`: connection slots, the event loop, the handler trait
//! - `protocol/`: command parsing and reply formatting
//! - `daemon/`: `init` / `run` / `cleanup` wiring store and loop together
//! - `config/`: settings from defaults, a TOML file and the environment
//! - `cli/`: command-line arguments for the binary
//!
//! ## Key Design Decisions I Made
//! - The store and the connection table lock internally even though only the
//!   loop thread touches them today, so adding worker threads later needs no
//!   changes there.
//! - The protocol handler owns an `Arc` to the store instead of using a global.
//! - Slots are scanned linearly; capacities are small and `list` order stays
//!   tied to slot position.
//! - No reassembly of partial reads: whatever one read returns is one command.

pub mod account;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod network;
pub mod protocol;
pub mod utils;

// Re-export commonly used types for convenience
pub use account::{Account, AccountStore, ACCOUNT_LIFETIME_SECS};
pub use config::Config;
pub use daemon::PhantomDaemon;
pub use error::{PhantomError, Result};
pub use network::{ConnectionHandler, ConnectionTable, EventLoop, ShutdownHandle};
pub use protocol::CommandHandler;
pub use utils::{derive_id, generate_seed};
