//! The client's network thread.
//!
//! Mirrors the server side: one OS thread running a single-threaded Tokio
//! runtime does all socket I/O. The game thread calls [`NetworkClient::send`]
//! and drains received packets with [`NetworkClient::drain`] once per frame.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use homestead_protocol::Packet;
use homestead_transport::{MAX_DATAGRAM_SIZE, PacketQueue, TransportError, read_frame, write_frame};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::{ClientConfig, HomesteadError};

const DATAGRAM_BUFFER: usize = 64 * 1024;

fn resolve(addr: &str) -> Result<SocketAddr, HomesteadError> {
    addr.to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| HomesteadError::InvalidAddress(addr.to_owned()))
}

struct Outgoing {
    frame: Vec<u8>,
    vital: bool,
}

/// A connection to a Homestead server over both channels.
pub struct NetworkClient {
    outgoing: mpsc::UnboundedSender<Outgoing>,
    incoming: Arc<PacketQueue<Packet>>,
    connected: Arc<AtomicBool>,
    local_udp_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for NetworkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkClient")
            .field("local_udp_addr", &self.local_udp_addr)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl NetworkClient {
    /// Opens the stream, binds the datagram socket and starts the network
    /// thread.
    ///
    /// # Errors
    /// [`HomesteadError::InvalidAddress`] for an unresolvable address,
    /// [`HomesteadError::Connect`] if the server can't be reached or a
    /// socket can't be set up.
    pub fn connect(config: &ClientConfig) -> Result<Self, HomesteadError> {
        let config = config.clone().validated();
        let server_tcp = resolve(&config.server_tcp_addr)?;
        let server_udp = resolve(&config.server_udp_addr)?;

        let io_error = |addr: &str| {
            let addr = addr.to_owned();
            move |source| HomesteadError::Connect { addr, source }
        };

        let stream = std::net::TcpStream::connect(server_tcp)
            .map_err(io_error(&config.server_tcp_addr))?;
        stream
            .set_nonblocking(true)
            .map_err(io_error(&config.server_tcp_addr))?;
        if let Err(error) = stream.set_nodelay(true) {
            debug!(%error, "failed to set TCP_NODELAY");
        }
        let udp = std::net::UdpSocket::bind(&config.client_udp_addr)
            .map_err(io_error(&config.client_udp_addr))?;
        udp.set_nonblocking(true)
            .map_err(io_error(&config.client_udp_addr))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(io_error("client runtime"))?;
        let (stream, udp) = {
            let _guard = runtime.enter();
            (
                TcpStream::from_std(stream).map_err(io_error(&config.server_tcp_addr))?,
                UdpSocket::from_std(udp).map_err(io_error(&config.client_udp_addr))?,
            )
        };
        let local_udp_addr = udp.local_addr().map_err(io_error(&config.client_udp_addr))?;

        let incoming = Arc::new(PacketQueue::new());
        let connected = Arc::new(AtomicBool::new(true));
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker = ClientWorker {
            stream,
            udp,
            server_udp,
            incoming: Arc::clone(&incoming),
            connected: Arc::clone(&connected),
            outgoing: outgoing_rx,
            poll_timeout: config.poll_timeout(),
        };
        let thread = std::thread::Builder::new()
            .name("homestead-client-net".into())
            .spawn(move || runtime.block_on(worker.run(shutdown_rx)))
            .map_err(io_error("client network thread"))?;

        info!(server = %server_tcp, %local_udp_addr, "connected to server");

        Ok(Self {
            outgoing,
            incoming,
            connected,
            local_udp_addr,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// Queues a packet. Vital packets go on the stream, the rest as
    /// datagrams.
    ///
    /// # Errors
    /// Encoding errors, [`TransportError::DatagramTooLarge`], or
    /// [`HomesteadError::Disconnected`] once the connection is gone.
    pub fn send(&self, packet: &Packet) -> Result<(), HomesteadError> {
        if !self.is_connected() {
            return Err(HomesteadError::Disconnected);
        }
        let frame = packet.encode()?;
        let vital = packet.is_vital();
        if !vital && frame.len() > MAX_DATAGRAM_SIZE {
            return Err(TransportError::DatagramTooLarge {
                size: frame.len(),
                max: MAX_DATAGRAM_SIZE,
            }
            .into());
        }
        self.outgoing
            .send(Outgoing { frame, vital })
            .map_err(|_| HomesteadError::Disconnected)
    }

    /// Every packet received since the last call, in arrival order.
    pub fn drain(&self) -> Vec<Packet> {
        self.incoming.drain()
    }

    /// `false` once the stream has closed or the client was shut down.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn local_udp_addr(&self) -> SocketAddr {
        self.local_udp_addr
    }

    /// Closes both sockets and waits for the network thread to exit.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("client network thread panicked");
            }
            debug!("client network thread stopped");
        }
        self.connected.store(false, Ordering::Release);
    }
}

impl Drop for NetworkClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Network thread
// ---------------------------------------------------------------------------

struct ClientWorker {
    stream: TcpStream,
    udp: UdpSocket,
    server_udp: SocketAddr,
    incoming: Arc<PacketQueue<Packet>>,
    connected: Arc<AtomicBool>,
    outgoing: mpsc::UnboundedReceiver<Outgoing>,
    poll_timeout: Duration,
}

impl ClientWorker {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let (read_half, mut write_half) = self.stream.into_split();
        let reader = tokio::spawn(read_stream(
            read_half,
            Arc::clone(&self.incoming),
            Arc::clone(&self.connected),
        ));
        let mut buf = vec![0u8; DATAGRAM_BUFFER];

        while self.connected.load(Ordering::Acquire) {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(out) = self.outgoing.recv() => {
                    Self::send(&mut write_half, &self.udp, self.server_udp, out, &self.connected).await;
                }
                received = self.udp.recv_from(&mut buf) => match received {
                    Ok((n, from)) => {
                        if let Some(packet) = accept_datagram(from, self.server_udp, &buf[..n]) {
                            self.incoming.push(packet);
                        }
                    }
                    Err(error) => debug!(%error, "datagram receive failed"),
                },
                () = tokio::time::sleep(self.poll_timeout) => {}
            }
        }

        reader.abort();
        self.connected.store(false, Ordering::Release);
        debug!("client network loop exited");
    }

    async fn send(
        write_half: &mut OwnedWriteHalf,
        udp: &UdpSocket,
        server_udp: SocketAddr,
        out: Outgoing,
        connected: &AtomicBool,
    ) {
        if out.vital {
            if let Err(error) = write_frame(write_half, &out.frame).await {
                warn!(%error, "stream write failed, disconnecting");
                connected.store(false, Ordering::Release);
            }
        } else if let Err(error) = udp.send_to(&out.frame, server_udp).await {
            debug!(%error, "datagram send failed");
        }
    }
}

/// Decodes a datagram, dropping anything not sent by the server's socket.
fn accept_datagram(from: SocketAddr, server_udp: SocketAddr, bytes: &[u8]) -> Option<Packet> {
    if from != server_udp {
        debug!(%from, "datagram from unknown sender dropped");
        return None;
    }
    match Packet::decode(bytes) {
        Ok(packet) => {
            trace!(%from, kind = %packet.kind(), "datagram received");
            Some(packet)
        }
        Err(error) => {
            warn!(%from, %error, "undecodable datagram dropped");
            None
        }
    }
}

async fn read_stream(
    mut reader: OwnedReadHalf,
    incoming: Arc<PacketQueue<Packet>>,
    connected: Arc<AtomicBool>,
) {
    loop {
        match read_frame(&mut reader).await {
            Ok(Some(frame)) => match Packet::decode(&frame) {
                Ok(packet) => {
                    trace!(kind = %packet.kind(), "reliable packet received");
                    incoming.push(packet);
                }
                Err(error) => {
                    warn!(%error, "undecodable frame from server");
                    break;
                }
            },
            Ok(None) => {
                info!("server closed the connection");
                break;
            }
            Err(error) => {
                warn!(%error, "stream read failed");
                break;
            }
        }
    }
    connected.store(false, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use homestead_protocol::{ClientServerTestUdp, PlayerId};

    use super::*;

    fn server() -> SocketAddr {
        "127.0.0.1:7778".parse().unwrap()
    }

    fn test_udp_frame() -> (Packet, Vec<u8>) {
        let packet: Packet = ClientServerTestUdp {
            player_id: PlayerId(4),
        }
        .into();
        let frame = packet.encode().unwrap();
        (packet, frame)
    }

    #[test]
    fn test_accept_datagram_from_server_is_decoded() {
        let (packet, frame) = test_udp_frame();
        assert_eq!(accept_datagram(server(), server(), &frame), Some(packet));
    }

    #[test]
    fn test_accept_datagram_from_other_sender_is_dropped() {
        let (_, frame) = test_udp_frame();
        let stray: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        assert_eq!(accept_datagram(stray, server(), &frame), None);
    }

    #[test]
    fn test_accept_datagram_garbage_from_server_is_dropped() {
        assert_eq!(accept_datagram(server(), server(), &[0xff, 0x00, 0x01]), None);
    }
}
