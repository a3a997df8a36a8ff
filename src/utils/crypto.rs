use data_encoding::HEXLOWER;
use ring::digest::{Context, SHA256};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{PhantomError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Length in bytes of an account seed
pub const SEED_LEN: usize = 32;

/// Length in characters of a hex-encoded SHA-256 account id
pub const ID_LEN: usize = 64;

pub fn current_timestamp() -> Result<u64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| PhantomError::Crypto(format!("System time error: {e}")))?;
    Ok(duration.as_secs())
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

/// Fill a fresh seed from the operating system's CSPRNG.
pub fn generate_seed() -> Result<[u8; SEED_LEN]> {
    let rng = SystemRandom::new();
    let mut seed = [0u8; SEED_LEN];
    rng.fill(&mut seed)
        .map_err(|e| PhantomError::Crypto(format!("Failed to generate seed: {e}")))?;
    Ok(seed)
}

/// Derive the public account id: lowercase hex of SHA-256(seed).
pub fn derive_id(seed: &[u8; SEED_LEN]) -> String {
    HEXLOWER.encode(&sha256_digest(seed))
}

/// Draw once from the randomness source so a broken source fails startup
/// instead of the first `create`.
pub fn probe_randomness() -> Result<()> {
    generate_seed().map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn test_known_vector() {
        let seed = [0u8; SEED_LEN];
        assert_eq!(
            derive_id(&seed),
            "66687aadf862bd776c8fc18b8e9f8e20089714856ee233b3902a591d0d5f2925"
        );
    }

    #[test]
    fn test_derive_id_is_deterministic() {
        let mut rng = rand::thread_rng();
        for _ in 0..32 {
            let mut seed = [0u8; SEED_LEN];
            rng.fill_bytes(&mut seed);

            let first = derive_id(&seed);
            let second = derive_id(&seed);
            assert_eq!(first, second);
            assert_eq!(first.len(), ID_LEN);
            assert!(first
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }

    #[test]
    fn test_generated_seeds_differ() {
        let a = generate_seed().unwrap();
        let b = generate_seed().unwrap();
        assert_ne!(a, b);
        assert_ne!(derive_id(&a), derive_id(&b));
    }

    #[test]
    fn test_probe_randomness() {
        assert!(probe_randomness().is_ok());
    }

    #[test]
    fn test_current_timestamp_is_seconds() {
        let now = current_timestamp().unwrap();
        // Well after 2020 and nowhere near a millisecond-scale value.
        assert!(now > 1_577_836_800);
        assert!(now < 100_000_000_000);
    }
}
