//! Outbound send queue.
//!
//! [`PacketSender`] is a cheap, cloneable handle any thread can push
//! packets into. The [`SendWorker`] lives on the network thread's runtime,
//! holds delayed frames until they are due and sends datagrams itself.
//! Each reliable connection gets its own writer task, so a peer that
//! stops reading only stalls its own stream.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use homestead_protocol::Packet;
use tokio::io::AsyncWrite;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::{ConnectionId, TransportError, write_frame};

/// Largest frame we put in a single datagram (IPv4 UDP payload limit).
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// A reliable-channel write half, type-erased so tests can use in-memory
/// pipes in place of sockets.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Where a frame goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendTarget {
    /// The stream of a registered connection.
    Reliable(ConnectionId),
    /// A datagram to this address.
    Datagram(SocketAddr),
}

/// A reliable write that failed. The connection should be removed.
#[derive(Debug)]
pub struct SendFailure {
    pub connection_id: ConnectionId,
    pub error: TransportError,
}

enum SendCommand {
    Register(ConnectionId, BoxedWriter),
    Unregister(ConnectionId),
    Send {
        target: SendTarget,
        frame: Vec<u8>,
        delay: Duration,
    },
    Shutdown,
}

/// Creates a connected sender handle and worker.
///
/// Spawn [`SendWorker::run`] on the runtime that owns `udp`. Failed
/// reliable writes are reported on the returned receiver.
pub fn send_channel(
    udp: Arc<UdpSocket>,
) -> (PacketSender, SendWorker, mpsc::UnboundedReceiver<SendFailure>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (failures_tx, failures_rx) = mpsc::unbounded_channel();
    let worker = SendWorker {
        rx,
        udp,
        connections: HashMap::new(),
        delayed: BinaryHeap::new(),
        next_seq: 0,
        failures: failures_tx,
    };
    (PacketSender { tx }, worker, failures_rx)
}

// ---------------------------------------------------------------------------
// PacketSender
// ---------------------------------------------------------------------------

/// Handle for queueing outbound packets.
#[derive(Clone)]
pub struct PacketSender {
    tx: mpsc::UnboundedSender<SendCommand>,
}

impl std::fmt::Debug for PacketSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketSender")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl PacketSender {
    /// Encodes `packet` now and queues it for `target`.
    ///
    /// With `delay_ms == 0` the frame goes out as soon as the worker runs;
    /// otherwise it is held back for `delay_ms` milliseconds.
    ///
    /// # Errors
    /// Encoding errors, or [`TransportError::Shutdown`] if the worker is
    /// gone.
    pub fn add_packet_to_send(
        &self,
        target: SendTarget,
        packet: &Packet,
        delay_ms: u64,
    ) -> Result<(), TransportError> {
        let frame = packet.encode()?;
        self.send_frame(target, frame, Duration::from_millis(delay_ms))
    }

    /// Queues an already-encoded frame.
    pub fn send_frame(
        &self,
        target: SendTarget,
        frame: Vec<u8>,
        delay: Duration,
    ) -> Result<(), TransportError> {
        self.command(SendCommand::Send {
            target,
            frame,
            delay,
        })
    }

    /// Hands the write half of a new connection to the worker.
    pub fn register(&self, id: ConnectionId, writer: BoxedWriter) -> Result<(), TransportError> {
        self.command(SendCommand::Register(id, writer))
    }

    /// Drops the worker's write half. Later sends to `id` are dropped.
    pub fn unregister(&self, id: ConnectionId) -> Result<(), TransportError> {
        self.command(SendCommand::Unregister(id))
    }

    /// Stops the worker. Frames still waiting on a delay are discarded.
    pub fn shutdown(&self) {
        let _ = self.tx.send(SendCommand::Shutdown);
    }

    fn command(&self, cmd: SendCommand) -> Result<(), TransportError> {
        self.tx.send(cmd).map_err(|_| TransportError::Shutdown)
    }
}

// ---------------------------------------------------------------------------
// SendWorker
// ---------------------------------------------------------------------------

struct Delayed {
    due: Instant,
    seq: u64,
    target: SendTarget,
    frame: Vec<u8>,
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Delayed {}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the max-heap pops the earliest deadline first; `seq` keeps
// same-deadline frames in submission order.
impl Ord for Delayed {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Performs the writes queued through [`PacketSender`].
pub struct SendWorker {
    rx: mpsc::UnboundedReceiver<SendCommand>,
    udp: Arc<UdpSocket>,
    /// Frame queues of the per-connection writer tasks.
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<Vec<u8>>>,
    delayed: BinaryHeap<Delayed>,
    next_seq: u64,
    failures: mpsc::UnboundedSender<SendFailure>,
}

impl SendWorker {
    /// Runs until [`PacketSender::shutdown`] or until every handle is
    /// dropped.
    pub async fn run(mut self) {
        loop {
            let next_due = self.delayed.peek().map(|d| d.due);
            tokio::select! {
                cmd = self.rx.recv() => match cmd {
                    None | Some(SendCommand::Shutdown) => break,
                    Some(cmd) => self.handle(cmd).await,
                },
                () = sleep_until_opt(next_due) => self.flush_due().await,
            }
        }
        tracing::debug!(
            dropped_delayed = self.delayed.len(),
            "send worker stopped"
        );
    }

    async fn handle(&mut self, cmd: SendCommand) {
        match cmd {
            SendCommand::Register(id, writer) => {
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(write_connection(id, writer, rx, self.failures.clone()));
                self.connections.insert(id, tx);
            }
            SendCommand::Unregister(id) => {
                // The writer task finishes what is queued, then closes.
                self.connections.remove(&id);
            }
            SendCommand::Send {
                target,
                frame,
                delay,
            } if delay.is_zero() => self.write(target, frame).await,
            SendCommand::Send {
                target,
                frame,
                delay,
            } => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.delayed.push(Delayed {
                    due: Instant::now() + delay,
                    seq,
                    target,
                    frame,
                });
            }
            SendCommand::Shutdown => {}
        }
    }

    async fn flush_due(&mut self) {
        let now = Instant::now();
        while self.delayed.peek().is_some_and(|d| d.due <= now) {
            if let Some(d) = self.delayed.pop() {
                self.write(d.target, d.frame).await;
            }
        }
    }

    async fn write(&mut self, target: SendTarget, frame: Vec<u8>) {
        match target {
            SendTarget::Reliable(id) => {
                let Some(queue) = self.connections.get(&id) else {
                    tracing::debug!(connection_id = %id, "send to unknown connection dropped");
                    return;
                };
                if queue.send(frame).is_err() {
                    // Its writer already failed and reported it.
                    tracing::debug!(connection_id = %id, "send to failed connection dropped");
                    self.connections.remove(&id);
                }
            }
            SendTarget::Datagram(addr) => {
                if frame.len() > MAX_DATAGRAM_SIZE {
                    let error = TransportError::DatagramTooLarge {
                        size: frame.len(),
                        max: MAX_DATAGRAM_SIZE,
                    };
                    tracing::warn!(%addr, %error, "datagram dropped");
                    return;
                }
                if let Err(error) = self.udp.send_to(&frame, addr).await {
                    tracing::warn!(%addr, %error, "datagram send failed");
                }
            }
        }
    }
}

/// Writes one connection's frames in order until its queue closes or a
/// write fails. A failure is reported once and ends the task.
async fn write_connection(
    id: ConnectionId,
    mut writer: BoxedWriter,
    mut frames: mpsc::UnboundedReceiver<Vec<u8>>,
    failures: mpsc::UnboundedSender<SendFailure>,
) {
    while let Some(frame) = frames.recv().await {
        if let Err(error) = write_frame(&mut writer, &frame).await {
            tracing::warn!(connection_id = %id, %error, "reliable write failed");
            let _ = failures.send(SendFailure {
                connection_id: id,
                error,
            });
            return;
        }
    }
    tracing::trace!(connection_id = %id, "connection writer closed");
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
