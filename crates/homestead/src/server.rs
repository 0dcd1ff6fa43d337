//! `HomesteadServer` builder and simulation loop.
//!
//! The server runs on two threads. The network thread (owned by the
//! [`ConnectionManager`]) does all socket I/O. The simulation loop here
//! wakes once per tick, drains what the network thread queued, applies
//! it, and ticks every world:
//!
//! ```text
//! wait_for_tick → clock.tick → process_events → worlds.tick → record_tick_end
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use homestead_session::{ConnectionManager, CredentialStore, InMemoryCredentials};
use homestead_tick::{GameClock, TickConfig, TickMetrics, TickScheduler};
use homestead_world::{PacketSink, WorldManager};
use tokio::sync::watch;
use tracing::info;

use crate::{HomesteadError, ServerConfig, ServerHandler};

/// Builder for configuring and starting a Homestead server.
///
/// # Example
///
/// ```rust,no_run
/// use homestead::prelude::*;
///
/// # async fn run() -> Result<(), HomesteadError> {
/// let mut server = HomesteadServer::builder()
///     .config(ServerConfig::load("server.json")?)
///     .start()?;
/// server.run().await
/// # }
/// ```
pub struct HomesteadServerBuilder {
    config: ServerConfig,
    credentials: Option<Arc<dyn CredentialStore>>,
}

impl HomesteadServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            credentials: None,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides both listening addresses, e.g. `127.0.0.1:0` in tests.
    pub fn bind(mut self, tcp_addr: &str, udp_addr: &str) -> Self {
        self.config.tcp_addr = tcp_addr.to_owned();
        self.config.udp_addr = udp_addr.to_owned();
        self
    }

    /// Sets where logins are checked. Defaults to [`InMemoryCredentials`].
    pub fn credentials(mut self, credentials: impl CredentialStore) -> Self {
        self.credentials = Some(Arc::new(credentials));
        self
    }

    /// Shares an existing credential store with the server.
    pub fn shared_credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Loads the worlds, binds both sockets and starts the network
    /// thread. Ticking starts with [`HomesteadServer::run`].
    ///
    /// # Errors
    /// [`HomesteadError::World`] for a bad world list (duplicate names,
    /// unknown starting world), [`HomesteadError::Session`] if a socket
    /// can't be bound.
    pub fn start(self) -> Result<HomesteadServer, HomesteadError> {
        let config = self.config.validated();
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(InMemoryCredentials::new()));

        let connections = ConnectionManager::start(
            config.tcp_addr.as_str(),
            config.udp_addr.as_str(),
            config.manager_config(),
        )?;
        let sink: Arc<dyn PacketSink> = Arc::new(connections.sender());
        let worlds = WorldManager::new(
            &config.worlds,
            &config.starting_world,
            config.sync_config(),
            Arc::clone(&sink),
        )?;

        let (shutdown_tx, _) = watch::channel(false);

        Ok(HomesteadServer {
            connections,
            handler: ServerHandler::new(worlds, credentials, sink),
            tick_config: config.tick_config(),
            clock: GameClock::new(),
            metrics: TickMetrics::default(),
            shutdown: Arc::new(shutdown_tx),
        })
    }
}

impl Default for HomesteadServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Stops a running [`HomesteadServer::run`] loop from anywhere.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }
}

/// A started Homestead server.
pub struct HomesteadServer {
    connections: ConnectionManager,
    handler: ServerHandler,
    tick_config: TickConfig,
    clock: GameClock,
    metrics: TickMetrics,
    shutdown: Arc<watch::Sender<bool>>,
}

impl HomesteadServer {
    /// Creates a new builder.
    pub fn builder() -> HomesteadServerBuilder {
        HomesteadServerBuilder::new()
    }

    /// Actual stream address (port 0 resolved).
    pub fn tcp_addr(&self) -> SocketAddr {
        self.connections.tcp_addr()
    }

    /// Actual datagram address (port 0 resolved).
    pub fn udp_addr(&self) -> SocketAddr {
        self.connections.udp_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown),
        }
    }

    pub fn handler(&self) -> &ServerHandler {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut ServerHandler {
        &mut self.handler
    }

    pub fn worlds(&self) -> &WorldManager {
        self.handler.worlds()
    }

    /// Scheduler counters from the last [`run`](Self::run).
    pub fn tick_metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    /// One simulation step: advance the clock, apply everything the
    /// network thread queued, then tick the worlds. Returns the number of
    /// network events applied.
    pub fn step(&mut self) -> usize {
        self.clock.tick();
        let events = self.connections.process_events(&mut self.handler);
        self.handler.tick(&self.clock);
        events
    }

    /// Runs the simulation loop at the configured tick rate until a
    /// [`ShutdownHandle`] fires, then stops the network thread.
    pub async fn run(&mut self) -> Result<(), HomesteadError> {
        let mut scheduler = TickScheduler::new(self.tick_config.clone());
        let mut shutdown = self.shutdown.subscribe();

        info!(
            tcp = %self.tcp_addr(),
            udp = %self.udp_addr(),
            rate_hz = scheduler.tick_rate_hz(),
            worlds = self.worlds().world_count(),
            "Homestead server running"
        );

        while !*shutdown.borrow_and_update() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = scheduler.wait_for_tick() => {
                    self.step();
                    scheduler.record_tick_end();
                }
            }
        }

        self.metrics = scheduler.metrics().clone();
        self.connections.shutdown_async().await;
        info!(ticks = self.metrics.total_ticks, "Homestead server stopped");
        Ok(())
    }
}
