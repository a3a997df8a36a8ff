use crate::error::Result;
use crate::utils::{current_timestamp, derive_id, generate_seed, SEED_LEN};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Accounts expire 90 days after creation. Nothing enforces it; the value is
/// only reported to clients.
pub const ACCOUNT_LIFETIME_SECS: u64 = 90 * 24 * 60 * 60;

/// An anonymous account: a secret seed and the public id derived from it.
///
/// The whole record is scrubbed when dropped so seeds do not linger in freed
/// memory after `delete` or teardown.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Account {
    seed: [u8; SEED_LEN],
    id: String,
    created_at: u64,
    expires_at: u64,
}

impl Account {
    /// Create a brand new account with a random seed, stamped with the current time.
    pub fn generate() -> Result<Account> {
        let seed = generate_seed()?;
        let created_at = current_timestamp()?;
        Ok(Account::from_seed(seed, created_at))
    }

    /// Build an account from a known seed. The id is always derived, never supplied.
    pub fn from_seed(seed: [u8; SEED_LEN], created_at: u64) -> Account {
        let id = derive_id(&seed);
        Account {
            seed,
            id,
            created_at,
            expires_at: created_at + ACCOUNT_LIFETIME_SECS,
        }
    }

    pub fn get_seed(&self) -> &[u8; SEED_LEN] {
        &self.seed
    }

    pub fn get_id(&self) -> &str {
        self.id.as_str()
    }

    pub fn get_created_at(&self) -> u64 {
        self.created_at
    }

    pub fn get_expires_at(&self) -> u64 {
        self.expires_at
    }
}

// Keep the seed out of logs.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
