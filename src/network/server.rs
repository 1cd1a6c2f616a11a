//! Field Server
//!
//! TCP accept loop for field devices and the fixed-period game loop that
//! owns the match state.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::core::clock::MonotonicClock;
use crate::game::state::GameState;
use crate::game::tick::{run_tick, TickResult};
use crate::network::registry::{ClientRegistry, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_LIVENESS_INTERVAL};
use crate::operator::{OperatorCommand, Scoreboard};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Game loop period.
    pub tick_period: Duration,
    /// How often each connection checks whether it should close.
    pub liveness_interval: Duration,
    /// How long a new connection may take to identify itself.
    pub handshake_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 23)),
            tick_period: crate::TICK_PERIOD,
            liveness_interval: DEFAULT_LIVENESS_INTERVAL,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

/// Field server errors.
#[derive(Debug, thiserror::Error)]
pub enum FieldServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(#[from] std::io::Error),
}

// =============================================================================
// SERVER
// =============================================================================

/// Accepts device connections and hands them to the registry.
pub struct FieldServer {
    /// Server configuration.
    config: ServerConfig,
    /// Connection grid and mailbox.
    registry: Arc<ClientRegistry>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl FieldServer {
    /// Create a new field server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let registry = Arc::new(
            ClientRegistry::new(config.liveness_interval).with_handshake_timeout(config.handshake_timeout),
        );

        Self {
            config,
            registry,
            shutdown_tx,
        }
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Shared registry.
    pub fn registry(&self) -> Arc<ClientRegistry> {
        self.registry.clone()
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Build the game loop for this server.
    pub fn game_loop(
        &self,
        state: GameState,
        commands: mpsc::UnboundedReceiver<OperatorCommand>,
    ) -> (GameLoop, watch::Receiver<Scoreboard>) {
        GameLoop::new(state, self.registry(), commands, self.config.tick_period)
    }

    /// Bind and run the accept loop until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), FieldServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Run the accept loop on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), FieldServerError> {
        let local_addr = listener.local_addr()?;
        info!("Field server listening on {}", local_addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Spawn the task for a new connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
        }

        let registry = self.registry.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            if let Err(e) = registry.handle_connection(stream, addr.to_string(), shutdown_rx).await {
                warn!("Connection {} ended: {}", addr, e);
            }
        });
    }

    /// Shutdown the server, its connections, and the game loop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Number of registered devices.
    pub async fn connection_count(&self) -> usize {
        self.registry.connection_count().await
    }
}

// =============================================================================
// GAME LOOP
// =============================================================================

/// Sole owner of the match state.
pub struct GameLoop {
    state: GameState,
    registry: Arc<ClientRegistry>,
    commands: mpsc::UnboundedReceiver<OperatorCommand>,
    scoreboard: watch::Sender<Scoreboard>,
    clock: MonotonicClock,
    tick_period: Duration,
}

impl GameLoop {
    /// Create a game loop and the scoreboard it publishes to.
    pub fn new(
        state: GameState,
        registry: Arc<ClientRegistry>,
        commands: mpsc::UnboundedReceiver<OperatorCommand>,
        tick_period: Duration,
    ) -> (Self, watch::Receiver<Scoreboard>) {
        let (scoreboard, scoreboard_rx) = watch::channel(Scoreboard::new(state.snapshot(), Vec::new()));

        let game_loop = Self {
            state,
            registry,
            commands,
            scoreboard,
            clock: MonotonicClock::new(),
            tick_period,
        };
        (game_loop, scoreboard_rx)
    }

    /// Current match state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Run one tick with the clock at `now_ns`.
    pub async fn tick_at(&mut self, now_ns: u64) -> TickResult {
        self.state.advance_clock(now_ns);

        while let Ok(command) = self.commands.try_recv() {
            match command {
                OperatorCommand::Advance => {
                    self.state.advance_mode(now_ns);
                }
            }
        }

        for client in self.registry.get_new_clients().await {
            debug!(
                alliance = %client.alliance(),
                element = %client.element(),
                "Sending initial state"
            );
            client.send_init_state(&self.state);
        }

        let messages = self.registry.get_messages().await;
        let result = run_tick(&mut self.state, &messages);
        self.registry.deliver(&result.outbox).await;

        let connections = self.registry.connection_statuses().await;
        self.scoreboard.send_replace(Scoreboard::new(self.state.snapshot(), connections));

        result
    }

    /// Tick every period until shutdown.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let mut tick_interval = interval(self.tick_period);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Game loop running every {:?}", self.tick_period);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    let now_ns = self.clock.now_ns();
                    self.tick_at(now_ns).await;
                }
                _ = shutdown.recv() => {
                    info!("Game loop stopping");
                    break;
                }
            }
        }
    }
}
