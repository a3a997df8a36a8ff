use crate::error::{PhantomError, Result};
use crate::network::connection_table::{Connection, ConnectionId, ConnectionTable};
use log::{debug, error, info, warn};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Registry, Token, Waker};
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Size of the per-read receive buffer
pub const DEFAULT_BUFFER_SIZE: usize = 1024;
/// Upper bound on a single readiness wait
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(500);
/// Unsent reply bytes a client may accumulate before it is dropped. A full
/// `list` of 1000 accounts is roughly 115 KB, so this holds a few of them.
pub const DEFAULT_MAX_OUTBOUND: usize = 512 * 1024;
/// Reads handed to the handler per readiness event before other slots get a turn
pub const DEFAULT_MAX_READS_PER_EVENT: usize = 16;

const EVENTS_CAPACITY: usize = 128;

// Client slots use their index as token, so the fixed tokens sit at the top.
const LISTENER: Token = Token(usize::MAX - 1);
const WAKER: Token = Token(usize::MAX);

/// Tunables for the readiness loop
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub max_clients: usize,
    pub buffer_size: usize,
    pub poll_timeout: Duration,
    pub max_outbound: usize,
    pub max_reads_per_event: usize,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_clients: crate::network::DEFAULT_MAX_CLIENTS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            max_outbound: DEFAULT_MAX_OUTBOUND,
            max_reads_per_event: DEFAULT_MAX_READS_PER_EVENT,
        }
    }
}

// Per-connection limits applied while servicing a slot.
#[derive(Debug, Clone, Copy)]
struct Limits {
    max_outbound: usize,
    max_reads: usize,
}

/// What a handler sees while processing one read
pub struct ConnectionContext<'a> {
    peer: SocketAddr,
    outbound: &'a mut Vec<u8>,
    close_requested: bool,
}

impl<'a> ConnectionContext<'a> {
    pub fn new(peer: SocketAddr, outbound: &'a mut Vec<u8>) -> Self {
        Self {
            peer,
            outbound,
            close_requested: false,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Queue bytes for the client. They are written as soon as the handler returns.
    pub fn send(&mut self, data: &[u8]) {
        self.outbound.extend_from_slice(data);
    }

    /// Close the connection once everything queued so far has been written.
    ///
    /// No further reads are dispatched for this client. If the peer stops
    /// reading, the connection is dropped when the write fails instead.
    pub fn close(&mut self) {
        self.close_requested = true;
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }
}

/// Callbacks invoked by the event loop, always on the loop thread
pub trait ConnectionHandler {
    fn on_connect(&self, _peer: SocketAddr) {}

    fn on_disconnect(&self, _peer: SocketAddr) {}

    /// `data` is exactly the bytes of one read; it is not null-terminated and
    /// may hold a partial or several commands.
    fn on_receive(&self, ctx: &mut ConnectionContext<'_>, data: &[u8]);
}

/// Stops a running loop from any thread
#[derive(Clone)]
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    /// Clear the running flag and wake the loop. Only the first call has any effect.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Shutdown requested");
            if let Err(e) = self.waker.wake() {
                warn!("Failed to wake event loop: {e}");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Keep,
    /// Still readable after the per-event read cap; serviced again next turn.
    Pending,
    Disconnected(SocketAddr),
    Closed(SocketAddr),
}

/// Single-threaded readiness loop
///
/// Owns the listening socket and every client socket. Each iteration waits for
/// readiness, accepts pending connections first, then services ready clients in
/// slot order. A client that is still readable after its read cap is serviced
/// again on the next iteration without waiting for a new event.
pub struct EventLoop<H> {
    poll: Poll,
    events: Events,
    listener: Option<TcpListener>,
    table: ConnectionTable<TcpStream>,
    handler: H,
    buffer: Vec<u8>,
    poll_timeout: Duration,
    limits: Limits,
    revisit: Vec<ConnectionId>,
    running: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl<H: ConnectionHandler> EventLoop<H> {
    /// Bind the listener and set up the poll instance.
    ///
    /// On Unix mio enables `SO_REUSEADDR` before binding. Anything acquired
    /// before a failing step is dropped on the way out.
    pub fn bind(addr: SocketAddr, settings: &LoopSettings, handler: H) -> Result<Self> {
        let poll = Poll::new()
            .map_err(|e| PhantomError::Network(format!("Failed to create poll instance: {e}")))?;

        let mut listener = TcpListener::bind(addr)
            .map_err(|e| PhantomError::Network(format!("Failed to bind to {addr}: {e}")))?;

        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .map_err(|e| PhantomError::Network(format!("Failed to register listener: {e}")))?;

        let waker = Waker::new(poll.registry(), WAKER)
            .map_err(|e| PhantomError::Network(format!("Failed to create waker: {e}")))?;

        Ok(Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            listener: Some(listener),
            table: ConnectionTable::new(settings.max_clients),
            handler,
            buffer: vec![0; settings.buffer_size.max(1)],
            poll_timeout: settings.poll_timeout,
            limits: Limits {
                max_outbound: settings.max_outbound,
                max_reads: settings.max_reads_per_event.max(1),
            },
            revisit: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            waker: Arc::new(waker),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| PhantomError::Network("Listener already closed".to_string()))?;
        Ok(listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            running: Arc::clone(&self.running),
            waker: Arc::clone(&self.waker),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn connection_count(&self) -> usize {
        self.table.len()
    }

    /// Run until the shutdown handle fires, then close every socket.
    pub fn run(&mut self) {
        if self.listener.is_none() {
            warn!("Event loop already stopped");
            return;
        }
        info!("Server started, waiting for connections...");

        while self.running.load(Ordering::SeqCst) {
            self.poll_once();
        }

        self.close_all();
    }

    /// Wait for readiness once and dispatch everything that became ready.
    ///
    /// The wait is skipped when clients from the previous iteration still
    /// have unread input.
    pub fn poll_once(&mut self) {
        let timeout = if self.revisit.is_empty() {
            self.poll_timeout
        } else {
            Duration::ZERO
        };
        if let Err(e) = self.poll.poll(&mut self.events, Some(timeout)) {
            if e.kind() != io::ErrorKind::Interrupted {
                error!("Readiness wait failed: {e}");
            }
            return;
        }

        let mut listener_ready = false;
        let mut ready: Vec<(ConnectionId, bool, bool)> =
            self.revisit.drain(..).map(|id| (id, true, false)).collect();
        for event in self.events.iter() {
            match event.token() {
                LISTENER => listener_ready = true,
                WAKER => {}
                Token(id) => ready.push((
                    id,
                    event.is_readable() || event.is_read_closed() || event.is_error(),
                    event.is_writable() || event.is_error(),
                )),
            }
        }
        ready.sort_unstable_by_key(|&(id, _, _)| id);
        ready.dedup_by(|later, earlier| {
            if later.0 != earlier.0 {
                return false;
            }
            earlier.1 |= later.1;
            earlier.2 |= later.2;
            true
        });

        if listener_ready {
            self.accept_pending();
        }
        for (id, readable, writable) in ready {
            self.service(id, readable, writable);
        }
    }

    // Readiness is edge-triggered, so keep accepting until the backlog is empty.
    fn accept_pending(&mut self) {
        let Some(listener) = self.listener.as_ref() else {
            return;
        };

        loop {
            let (stream, peer) = match listener.accept() {
                Ok(pair) => pair,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("Error accepting connection: {e}");
                    break;
                }
            };

            let Some(id) = self.table.add(stream, peer) else {
                warn!(
                    "Rejecting connection from {peer}: limit of {} connections reached",
                    self.table.capacity()
                );
                continue;
            };

            let registry = self.poll.registry();
            let registered = self.table.with_connection(id, |conn| {
                registry.register(conn.stream_mut(), Token(id), Interest::READABLE)
            });
            match registered {
                Some(Ok(())) => {
                    info!("New connection from {peer} in slot {id}");
                    self.handler.on_connect(peer);
                }
                Some(Err(e)) => {
                    error!("Failed to register connection from {peer}: {e}");
                    self.table.remove(id);
                }
                None => {}
            }
        }
    }

    fn service(&mut self, id: ConnectionId, readable: bool, writable: bool) {
        let registry = self.poll.registry();
        let handler = &self.handler;
        let buffer = &mut self.buffer;
        let limits = self.limits;

        let outcome = self.table.with_connection(id, |conn| {
            let outcome = drive(conn, handler, buffer, limits, readable, writable);
            if matches!(outcome, Outcome::Keep | Outcome::Pending) {
                update_interest(registry, id, conn);
            }
            outcome
        });

        match outcome {
            None => debug!("Ignoring readiness for inactive slot {id}"),
            Some(Outcome::Keep) => {}
            Some(Outcome::Pending) => self.revisit.push(id),
            Some(Outcome::Disconnected(peer)) => {
                info!("Peer {peer} disconnected");
                self.handler.on_disconnect(peer);
                release(&self.table, self.poll.registry(), id);
            }
            Some(Outcome::Closed(peer)) => {
                info!("Closing connection to {peer}");
                self.handler.on_disconnect(peer);
                release(&self.table, self.poll.registry(), id);
            }
        }
    }

    fn close_all(&mut self) {
        let registry = self.poll.registry();
        let connections = self.table.drain();
        let closed = connections.len();
        for mut conn in connections {
            if let Err(e) = registry.deregister(conn.stream_mut()) {
                debug!("Failed to deregister {}: {e}", conn.peer());
            }
        }

        if let Some(mut listener) = self.listener.take() {
            if let Err(e) = registry.deregister(&mut listener) {
                debug!("Failed to deregister listener: {e}");
            }
        }
        info!("Event loop stopped, closed {closed} client connections");
    }
}

// Flush first so a closing connection can finish, then read if allowed.
fn drive<S: Read + Write, H: ConnectionHandler>(
    conn: &mut Connection<S>,
    handler: &H,
    buffer: &mut [u8],
    limits: Limits,
    readable: bool,
    writable: bool,
) -> Outcome {
    let peer = conn.peer();
    if writable && conn.has_pending_output() {
        if let Err(e) = conn.flush_pending() {
            warn!("Failed to send pending output to {peer}: {e}");
        }
    }

    if conn.is_closing() {
        return if conn.has_pending_output() {
            Outcome::Keep
        } else {
            Outcome::Closed(peer)
        };
    }

    if readable {
        read_ready(conn, handler, buffer, limits)
    } else {
        Outcome::Keep
    }
}

// Edge-triggered again: read until WouldBlock, handing each read to the
// handler, but stop after `max_reads` so one busy client cannot starve the rest.
fn read_ready<S: Read + Write, H: ConnectionHandler>(
    conn: &mut Connection<S>,
    handler: &H,
    buffer: &mut [u8],
    limits: Limits,
) -> Outcome {
    let peer = conn.peer();
    let mut reads = 0;
    while reads < limits.max_reads {
        match conn.stream_mut().read(buffer) {
            Ok(0) => return Outcome::Disconnected(peer),
            Ok(n) => {
                reads += 1;
                let mut ctx = ConnectionContext::new(peer, conn.outbound_mut());
                handler.on_receive(&mut ctx, &buffer[..n]);
                let close = ctx.close_requested();

                if let Err(e) = conn.flush_pending() {
                    warn!("Failed to send response to {peer}: {e}");
                }
                if conn.pending_len() > limits.max_outbound {
                    warn!(
                        "Dropping {peer}: {} unsent bytes exceed the limit of {}",
                        conn.pending_len(),
                        limits.max_outbound
                    );
                    return Outcome::Disconnected(peer);
                }
                if close {
                    if !conn.has_pending_output() {
                        return Outcome::Closed(peer);
                    }
                    conn.begin_close();
                    return Outcome::Keep;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Outcome::Keep,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Failed to read from {peer}: {e}");
                return Outcome::Disconnected(peer);
            }
        }
    }
    Outcome::Pending
}

// Only ask for write readiness while there is output waiting.
fn update_interest(registry: &Registry, id: ConnectionId, conn: &mut Connection<TcpStream>) {
    let wants_write = conn.has_pending_output();
    if wants_write == conn.write_interest() {
        return;
    }

    let interest = if wants_write {
        Interest::READABLE | Interest::WRITABLE
    } else {
        Interest::READABLE
    };
    match registry.reregister(conn.stream_mut(), Token(id), interest) {
        Ok(()) => conn.set_write_interest(wants_write),
        Err(e) => warn!("Failed to update interest for {}: {e}", conn.peer()),
    }
}

fn release(table: &ConnectionTable<TcpStream>, registry: &Registry, id: ConnectionId) {
    if let Some(mut conn) = table.take(id) {
        if let Err(e) = registry.deregister(conn.stream_mut()) {
            debug!("Failed to deregister {}: {e}", conn.peer());
        }
        debug!("Released connection slot {id}");
    }
}
