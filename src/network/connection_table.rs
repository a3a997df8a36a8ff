use log::{error, warn};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard};

/// Default number of simultaneous client connections
pub const DEFAULT_MAX_CLIENTS: usize = 10;

/// Index of a connection slot. Slot numbers are reused once a connection is removed.
pub type ConnectionId = usize;

/// A live client connection
///
/// `outbound` holds bytes the socket would not take yet; they are flushed the
/// next time the socket reports write readiness. A closing connection is no
/// longer read from and is released once `outbound` is empty.
pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    outbound: Vec<u8>,
    write_interest: bool,
    closing: bool,
}

impl<S> Connection<S> {
    pub fn new(stream: S, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            outbound: Vec::new(),
            write_interest: false,
            closing: false,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn has_pending_output(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Bytes queued but not yet accepted by the socket.
    pub fn pending_len(&self) -> usize {
        self.outbound.len()
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    pub(crate) fn begin_close(&mut self) {
        self.closing = true;
    }

    pub(crate) fn outbound_mut(&mut self) -> &mut Vec<u8> {
        &mut self.outbound
    }

    /// Whether the socket is currently registered for write readiness.
    pub(crate) fn write_interest(&self) -> bool {
        self.write_interest
    }

    pub(crate) fn set_write_interest(&mut self, enabled: bool) {
        self.write_interest = enabled;
    }
}

impl<S: Write> Connection<S> {
    /// Write as much pending output as the socket accepts.
    ///
    /// Stops quietly on `WouldBlock` with the rest still queued. Any other
    /// failure is returned and the queued bytes are discarded.
    pub fn flush_pending(&mut self) -> io::Result<()> {
        while !self.outbound.is_empty() {
            match self.stream.write(&self.outbound) {
                Ok(0) => {
                    self.outbound.clear();
                    return Err(io::ErrorKind::WriteZero.into());
                }
                Ok(n) => {
                    self.outbound.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.outbound.clear();
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

/// Fixed pool of connection slots
///
/// Each slot has its own lock, so `add` from one thread and a read on another
/// slot from a different thread never contend. A slot is active exactly when
/// it holds a `Connection`, so an inactive slot can never carry a stale socket.
pub struct ConnectionTable<S> {
    slots: Vec<Mutex<Option<Connection<S>>>>,
}

impl<S> ConnectionTable<S> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Mutex::new(None)).collect(),
        }
    }

    fn slot(&self, id: ConnectionId) -> Option<MutexGuard<'_, Option<Connection<S>>>> {
        let slot = self.slots.get(id)?;
        match slot.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                error!("Failed to acquire lock on connection slot {id}");
                None
            }
        }
    }

    /// Place a connection in the first free slot.
    ///
    /// Returns `None` when every slot is taken; the stream is dropped, which
    /// closes the socket.
    pub fn add(&self, stream: S, peer: SocketAddr) -> Option<ConnectionId> {
        for id in 0..self.slots.len() {
            if let Some(mut slot) = self.slot(id) {
                if slot.is_none() {
                    *slot = Some(Connection::new(stream, peer));
                    return Some(id);
                }
            }
        }
        warn!("Connection table full, refusing {peer}");
        None
    }

    /// Deactivate a slot and hand its connection back to the caller.
    pub fn take(&self, id: ConnectionId) -> Option<Connection<S>> {
        self.slot(id)?.take()
    }

    /// Deactivate a slot and close its socket. Removing an empty slot is a no-op.
    pub fn remove(&self, id: ConnectionId) -> bool {
        self.take(id).is_some()
    }

    /// Run `f` against an active connection while holding its slot lock.
    pub fn with_connection<R>(
        &self,
        id: ConnectionId,
        f: impl FnOnce(&mut Connection<S>) -> R,
    ) -> Option<R> {
        let mut slot = self.slot(id)?;
        slot.as_mut().map(f)
    }

    pub fn is_active(&self, id: ConnectionId) -> bool {
        self.slot(id).map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Ids of active slots in slot order.
    pub fn active_ids(&self) -> Vec<ConnectionId> {
        (0..self.slots.len())
            .filter(|&id| self.is_active(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.active_ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Empty every slot, returning the connections that were still open.
    pub fn drain(&self) -> Vec<Connection<S>> {
        (0..self.slots.len())
            .filter_map(|id| self.take(id))
            .collect()
    }
}
