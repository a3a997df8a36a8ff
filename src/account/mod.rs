//! Anonymous accounts
//!
//! This module holds the account record and the bounded store that owns
//! every live account.

#[allow(clippy::module_inception)]
pub mod account;
pub mod store;

pub use account::{Account, ACCOUNT_LIFETIME_SECS};
pub use store::{AccountStore, DEFAULT_MAX_ACCOUNTS};
