//! The connection manager: owns the server's network thread.
//!
//! All socket I/O happens on one dedicated OS thread running a
//! single-threaded Tokio runtime. The simulation thread never touches a
//! socket; it drains [`NetworkEvent`]s once per tick through
//! [`ConnectionManager::process_events`] and sends through a
//! [`PacketSender`].
//!
//! # Network tick
//!
//! ```text
//! ┌───────────── poll (at most poll_timeout) ─────────────┐
//! │ accept │ reader event │ datagram │ send failure │ idle │
//! └───────────────────────────┬───────────────────────────┘
//!                             ▼
//!                  sweep PendingRemoval endpoints
//! ```
//!
//! A dead connection is only ever *marked* during the poll phase. The
//! sweep afterwards closes it, releases its reader and writer, and tells
//! the simulation side with `ClientRemoved`.

use std::collections::HashMap;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use homestead_protocol::Packet;
use homestead_transport::{
    ConnectionId, PacketQueue, PacketSender, SendFailure, read_frame, send_channel,
};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle as TaskHandle;

use crate::{Endpoint, EndpointRegistry, SessionError};

/// Receive buffer for one datagram.
const DATAGRAM_BUFFER: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Configuration and events
// ---------------------------------------------------------------------------

/// Network thread settings.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Longest the network loop waits for activity before sweeping.
    ///
    /// Default: 5 ms. Zero is clamped up to 1 ms so the loop never spins.
    pub poll_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(5),
        }
    }
}

impl ManagerConfig {
    /// Returns a copy with out-of-range values clamped.
    pub fn validated(mut self) -> Self {
        if self.poll_timeout.is_zero() {
            self.poll_timeout = Duration::from_millis(1);
        }
        self
    }
}

/// Which channel a packet arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketSource {
    /// The stream of this connection.
    Reliable(ConnectionId),
    /// A datagram from this address.
    Datagram(SocketAddr),
}

/// Something the network thread observed.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    ClientAdded {
        connection_id: ConnectionId,
        peer: SocketAddr,
    },
    ClientRemoved {
        connection_id: ConnectionId,
    },
    Packet {
        packet: Packet,
        source: PacketSource,
    },
}

/// Receives network events on the simulation thread.
pub trait ConnectionHandler {
    fn on_client_add(&mut self, connection_id: ConnectionId, peer: SocketAddr);

    fn on_client_remove(&mut self, connection_id: ConnectionId);

    fn on_receive_packet(&mut self, packet: Packet, source: PacketSource);
}

// ---------------------------------------------------------------------------
// ConnectionManager
// ---------------------------------------------------------------------------

/// Handle to the running network thread.
pub struct ConnectionManager {
    events: Arc<PacketQueue<NetworkEvent>>,
    sender: PacketSender,
    tcp_addr: SocketAddr,
    udp_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    /// Binds both sockets and starts the network thread.
    ///
    /// Binding happens before this returns, so the reported addresses are
    /// usable immediately (port 0 resolves to the real port).
    ///
    /// # Errors
    /// [`SessionError::Bind`] if either socket can't be bound,
    /// [`SessionError::Startup`] if the runtime or thread can't start.
    pub fn start(
        tcp_addr: impl ToSocketAddrs + std::fmt::Debug,
        udp_addr: impl ToSocketAddrs + std::fmt::Debug,
        config: ManagerConfig,
    ) -> Result<Self, SessionError> {
        let config = config.validated();

        let std_listener = std::net::TcpListener::bind(&tcp_addr).map_err(|source| {
            SessionError::Bind {
                addr: format!("{tcp_addr:?}"),
                source,
            }
        })?;
        let std_udp = std::net::UdpSocket::bind(&udp_addr).map_err(|source| SessionError::Bind {
            addr: format!("{udp_addr:?}"),
            source,
        })?;
        std_listener
            .set_nonblocking(true)
            .map_err(SessionError::Startup)?;
        std_udp.set_nonblocking(true).map_err(SessionError::Startup)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SessionError::Startup)?;

        // Registering the sockets needs the runtime's reactor in scope.
        let (listener, udp) = {
            let _guard = runtime.enter();
            let listener = TcpListener::from_std(std_listener).map_err(SessionError::Startup)?;
            let udp = UdpSocket::from_std(std_udp).map_err(SessionError::Startup)?;
            (listener, Arc::new(udp))
        };
        let tcp_addr = listener.local_addr().map_err(SessionError::Startup)?;
        let udp_addr = udp.local_addr().map_err(SessionError::Startup)?;

        let events = Arc::new(PacketQueue::new());
        let (sender, worker, failures) = send_channel(Arc::clone(&udp));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (reader_tx, reader_rx) = mpsc::unbounded_channel();

        let network = NetworkLoop {
            listener,
            udp,
            sender: sender.clone(),
            registry: EndpointRegistry::new(),
            readers: HashMap::new(),
            events: Arc::clone(&events),
            reader_tx,
            reader_rx,
            failures,
            poll_timeout: config.poll_timeout,
        };

        let thread = std::thread::Builder::new()
            .name("homestead-net".into())
            .spawn(move || {
                runtime.block_on(async move {
                    tokio::spawn(worker.run());
                    network.run(shutdown_rx).await;
                });
            })
            .map_err(SessionError::Startup)?;

        tracing::info!(%tcp_addr, %udp_addr, "connection manager started");

        Ok(Self {
            events,
            sender,
            tcp_addr,
            udp_addr,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// A handle for queueing outbound packets from any thread.
    pub fn sender(&self) -> PacketSender {
        self.sender.clone()
    }

    pub fn tcp_addr(&self) -> SocketAddr {
        self.tcp_addr
    }

    pub fn udp_addr(&self) -> SocketAddr {
        self.udp_addr
    }

    /// Drains everything the network thread queued since the last call and
    /// dispatches it to `handler` in arrival order.
    ///
    /// Returns the number of events handled.
    pub fn process_events<H: ConnectionHandler>(&self, handler: &mut H) -> usize {
        let events = self.events.drain();
        let count = events.len();
        for event in events {
            match event {
                NetworkEvent::ClientAdded {
                    connection_id,
                    peer,
                } => handler.on_client_add(connection_id, peer),
                NetworkEvent::ClientRemoved { connection_id } => {
                    handler.on_client_remove(connection_id);
                }
                NetworkEvent::Packet { packet, source } => {
                    handler.on_receive_packet(packet, source);
                }
            }
        }
        count
    }

    /// Stops the network thread and waits for it to exit.
    pub fn shutdown(&mut self) {
        if let Some(thread) = self.signal_shutdown() {
            join_network_thread(thread);
        }
    }

    /// Stops the network thread, joining it on Tokio's blocking pool so the
    /// calling task's worker keeps running.
    pub async fn shutdown_async(&mut self) {
        if let Some(thread) = self.signal_shutdown() {
            let joined = tokio::task::spawn_blocking(move || join_network_thread(thread)).await;
            if let Err(error) = joined {
                tracing::error!(%error, "joining the network thread failed");
            }
        }
    }

    fn signal_shutdown(&mut self) -> Option<JoinHandle<()>> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.thread.take()
    }
}

fn join_network_thread(thread: JoinHandle<()>) {
    if thread.join().is_err() {
        tracing::error!("network thread panicked");
    }
    tracing::info!("connection manager stopped");
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Network loop
// ---------------------------------------------------------------------------

enum ReaderEvent {
    Frame(ConnectionId, Packet),
    Closed(ConnectionId, String),
}

struct NetworkLoop {
    listener: TcpListener,
    udp: Arc<UdpSocket>,
    sender: PacketSender,
    registry: EndpointRegistry,
    readers: HashMap<ConnectionId, TaskHandle<()>>,
    events: Arc<PacketQueue<NetworkEvent>>,
    reader_tx: mpsc::UnboundedSender<ReaderEvent>,
    reader_rx: mpsc::UnboundedReceiver<ReaderEvent>,
    failures: mpsc::UnboundedReceiver<SendFailure>,
    poll_timeout: Duration,
}

impl NetworkLoop {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut buf = vec![0u8; DATAGRAM_BUFFER];
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.on_accept(stream, peer),
                    Err(error) => tracing::warn!(%error, "accept failed"),
                },
                Some(event) = self.reader_rx.recv() => self.on_reader_event(event),
                received = self.udp.recv_from(&mut buf) => match received {
                    Ok((n, from)) => self.on_datagram(&buf[..n], from),
                    // Some platforms surface ICMP errors from earlier sends here.
                    Err(error) => tracing::debug!(%error, "datagram receive failed"),
                },
                Some(failure) = self.failures.recv() => {
                    tracing::debug!(
                        connection_id = %failure.connection_id,
                        error = %failure.error,
                        "reliable send failed"
                    );
                    self.registry.mark_for_removal(failure.connection_id);
                },
                () = tokio::time::sleep(self.poll_timeout) => {}
            }
            self.sweep();
        }

        for (_, reader) in self.readers.drain() {
            reader.abort();
        }
        self.sender.shutdown();
        tracing::debug!("network loop exited");
    }

    fn on_accept(&mut self, stream: TcpStream, peer: SocketAddr) {
        let connection_id = ConnectionId::next();
        if let Err(error) = stream.set_nodelay(true) {
            tracing::debug!(%connection_id, %error, "failed to set TCP_NODELAY");
        }
        let (read_half, write_half) = stream.into_split();

        if self.sender.register(connection_id, Box::new(write_half)).is_err() {
            tracing::warn!(%connection_id, "send worker gone, refusing connection");
            return;
        }
        self.registry.insert(Endpoint::new(connection_id, peer));
        let reader = tokio::spawn(read_loop(connection_id, read_half, self.reader_tx.clone()));
        self.readers.insert(connection_id, reader);

        if let Err(error) = self.registry.activate(connection_id) {
            tracing::warn!(%connection_id, %error, "failed to activate endpoint");
            return;
        }
        tracing::info!(%connection_id, %peer, "client connected");
        self.events.push(NetworkEvent::ClientAdded {
            connection_id,
            peer,
        });
    }

    fn on_reader_event(&mut self, event: ReaderEvent) {
        match event {
            ReaderEvent::Frame(connection_id, packet) => {
                if !self.registry.is_active(connection_id) {
                    tracing::trace!(%connection_id, "frame from inactive endpoint dropped");
                    return;
                }
                tracing::trace!(%connection_id, kind = %packet.kind(), "reliable packet received");
                self.events.push(NetworkEvent::Packet {
                    packet,
                    source: PacketSource::Reliable(connection_id),
                });
            }
            ReaderEvent::Closed(connection_id, reason) => {
                tracing::debug!(%connection_id, %reason, "connection closed");
                self.registry.mark_for_removal(connection_id);
            }
        }
    }

    fn on_datagram(&mut self, bytes: &[u8], from: SocketAddr) {
        match Packet::decode(bytes) {
            Ok(packet) => {
                tracing::trace!(%from, kind = %packet.kind(), "datagram received");
                self.events.push(NetworkEvent::Packet {
                    packet,
                    source: PacketSource::Datagram(from),
                });
            }
            Err(error) => tracing::warn!(%from, %error, "undecodable datagram dropped"),
        }
    }

    fn sweep(&mut self) {
        for endpoint in self.registry.sweep() {
            let connection_id = endpoint.id();
            if let Some(reader) = self.readers.remove(&connection_id) {
                reader.abort();
            }
            let _ = self.sender.unregister(connection_id);
            tracing::info!(%connection_id, peer = %endpoint.peer(), "client removed");
            self.events
                .push(NetworkEvent::ClientRemoved { connection_id });
        }
    }
}

/// Reads frames until the stream ends or a frame is unusable.
async fn read_loop(
    connection_id: ConnectionId,
    mut reader: OwnedReadHalf,
    events: mpsc::UnboundedSender<ReaderEvent>,
) {
    let reason = loop {
        match read_frame(&mut reader).await {
            Ok(Some(frame)) => match Packet::decode(&frame) {
                Ok(packet) => {
                    if events.send(ReaderEvent::Frame(connection_id, packet)).is_err() {
                        return;
                    }
                }
                Err(error) => break format!("decode failed: {error}"),
            },
            Ok(None) => break "peer closed the stream".to_owned(),
            Err(error) => break error.to_string(),
        }
    };
    let _ = events.send(ReaderEvent::Closed(connection_id, reason));
}
