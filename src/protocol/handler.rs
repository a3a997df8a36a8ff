use crate::account::AccountStore;
use crate::network::{ConnectionContext, ConnectionHandler};
use crate::protocol::command::{execute, Command};
use log::{debug, info};
use std::net::SocketAddr;
use std::sync::Arc;

/// Bridges the event loop to the account store
///
/// Holds its own handle to the store instead of reaching for process-wide
/// state, so several daemons can coexist (tests do exactly that).
pub struct CommandHandler {
    store: Arc<AccountStore>,
}

impl CommandHandler {
    pub fn new(store: Arc<AccountStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }
}

impl ConnectionHandler for CommandHandler {
    fn on_connect(&self, peer: SocketAddr) {
        info!("New client connected for account creation: {peer}");
    }

    fn on_disconnect(&self, peer: SocketAddr) {
        info!("Client disconnected: {peer}");
    }

    fn on_receive(&self, ctx: &mut ConnectionContext<'_>, data: &[u8]) {
        let input = String::from_utf8_lossy(data);
        let command = Command::parse(&input);
        debug!("Received command from {}: {:?}", ctx.peer(), input.trim_end());

        let reply = execute(&self.store, &command);
        ctx.send(reply.text.as_bytes());
        if reply.close {
            ctx.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::command::UNKNOWN_COMMAND;

    fn peer() -> SocketAddr {
        "127.0.0.1:5555".parse().unwrap()
    }

    #[test]
    fn test_receive_writes_reply() {
        let handler = CommandHandler::new(Arc::new(AccountStore::new(4)));
        let mut outbound = Vec::new();
        let mut ctx = ConnectionContext::new(peer(), &mut outbound);

        handler.on_receive(&mut ctx, b"create\n");
        assert!(!ctx.close_requested());
        assert_eq!(handler.store().len(), 1);

        let text = String::from_utf8(outbound).unwrap();
        assert!(text.contains("Account created:"));
    }

    #[test]
    fn test_unknown_keeps_connection() {
        let handler = CommandHandler::new(Arc::new(AccountStore::new(4)));
        let mut outbound = Vec::new();
        let mut ctx = ConnectionContext::new(peer(), &mut outbound);

        handler.on_receive(&mut ctx, b"frobnicate");
        assert!(!ctx.close_requested());
        assert_eq!(outbound, UNKNOWN_COMMAND.as_bytes());
    }

    #[test]
    fn test_quit_requests_close() {
        let handler = CommandHandler::new(Arc::new(AccountStore::new(4)));
        let mut outbound = Vec::new();
        let mut ctx = ConnectionContext::new(peer(), &mut outbound);

        handler.on_receive(&mut ctx, b"quit\r\n");
        assert!(ctx.close_requested());
    }

    #[test]
    fn test_invalid_utf8_is_unknown() {
        let handler = CommandHandler::new(Arc::new(AccountStore::new(4)));
        let mut outbound = Vec::new();
        let mut ctx = ConnectionContext::new(peer(), &mut outbound);

        handler.on_receive(&mut ctx, &[0xff, 0xfe, 0x00]);
        assert_eq!(outbound, UNKNOWN_COMMAND.as_bytes());
    }
}
