//! PhantomID daemon lifecycle
//!
//! Ties the account store to the event loop and exposes the three calls the
//! binary needs: `init`, `run` and `cleanup`.

use crate::account::{Account, AccountStore};
use crate::config::Config;
use crate::error::Result;
use crate::network::{EventLoop, ShutdownHandle};
use crate::protocol::CommandHandler;
use crate::utils::probe_randomness;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;

pub struct PhantomDaemon {
    store: Arc<AccountStore>,
    server: EventLoop<CommandHandler>,
}

impl PhantomDaemon {
    /// Prepare the daemon: check the randomness source, build the store and
    /// bind the listener. Nothing is left open if any step fails.
    pub fn init(config: &Config) -> Result<PhantomDaemon> {
        config.validate()?;
        probe_randomness()?;

        let store = Arc::new(AccountStore::new(config.max_accounts));
        let handler = CommandHandler::new(Arc::clone(&store));
        let server = EventLoop::bind(config.listen_addr(), &config.loop_settings(), handler)?;

        info!(
            "PhantomID daemon initialized on port {} ({} account slots, {} client slots)",
            config.port, config.max_accounts, config.max_clients
        );
        Ok(PhantomDaemon { store, server })
    }

    /// Create `count` accounts before serving, returning copies for display.
    pub fn create_initial_accounts(&self, count: usize) -> Result<Vec<Account>> {
        (0..count).map(|_| self.store.create()).collect()
    }

    /// Block serving clients until the shutdown handle fires.
    pub fn run(&mut self) {
        info!("PhantomID daemon starting...");
        self.server.run();
    }

    /// Drop all accounts and release every socket.
    pub fn cleanup(self) {
        self.store.clear();
        drop(self.server);
        info!("PhantomID daemon stopped");
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.server.shutdown_handle()
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.server.local_addr()
    }

    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PhantomError;

    fn test_config() -> Config {
        Config {
            port: 0,
            max_accounts: 4,
            max_clients: 2,
            ..Config::default()
        }
    }

    #[test]
    fn test_init_and_cleanup() {
        let daemon = PhantomDaemon::init(&test_config()).unwrap();
        assert_ne!(daemon.local_addr().unwrap().port(), 0);
        assert!(daemon.store().is_empty());
        daemon.cleanup();
    }

    #[test]
    fn test_initial_accounts() {
        let daemon = PhantomDaemon::init(&test_config()).unwrap();
        let accounts = daemon.create_initial_accounts(2).unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(daemon.store().len(), 2);

        let store = Arc::clone(daemon.store());
        daemon.cleanup();
        assert!(store.is_empty());
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let config = Config {
            max_accounts: 0,
            ..test_config()
        };
        assert!(matches!(
            PhantomDaemon::init(&config),
            Err(PhantomError::Config(_))
        ));
    }

    #[test]
    fn test_run_returns_after_shutdown() {
        let mut daemon = PhantomDaemon::init(&test_config()).unwrap();
        daemon.shutdown_handle().shutdown();
        daemon.run();
        assert!(daemon.local_addr().is_err());
        daemon.cleanup();
    }
}
