//! Client Registry
//!
//! Owns the 2x2 connection grid (alliance x field element), the mailbox of
//! device events, and the queue of connections waiting for initial state.
//! Connection tasks only produce into the mailbox; the game loop drains it.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::game::messages::ClientMessage;
use crate::game::output::Outbox;
use crate::game::types::{Alliance, FieldElement};
use crate::network::client::{Client, ClientError, ClientHandle};
use crate::network::protocol::{self, ACK_NO, ACK_OK};

/// Default liveness poll period for connections.
pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_millis(500);

/// Default time a new connection has to send its handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type Grid = [[Option<ClientHandle>; 2]; 2];

/// Presence of a device in one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// Slot alliance
    pub alliance: Alliance,
    /// Slot device kind
    pub element: FieldElement,
    /// Whether a live connection holds the slot
    pub connected: bool,
}

/// Connection grid, mailbox, and pending-init queue.
pub struct ClientRegistry {
    /// Indexed `[alliance][element]`
    grid: RwLock<Grid>,
    mailbox_tx: mpsc::UnboundedSender<ClientMessage>,
    mailbox_rx: Mutex<mpsc::UnboundedReceiver<ClientMessage>>,
    pending_tx: mpsc::UnboundedSender<ClientHandle>,
    pending_rx: Mutex<mpsc::UnboundedReceiver<ClientHandle>>,
    liveness_interval: Duration,
    handshake_timeout: Duration,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new(liveness_interval: Duration) -> Self {
        let (mailbox_tx, mailbox_rx) = mpsc::unbounded_channel();
        let (pending_tx, pending_rx) = mpsc::unbounded_channel();

        Self {
            grid: RwLock::new(Default::default()),
            mailbox_tx,
            mailbox_rx: Mutex::new(mailbox_rx),
            pending_tx,
            pending_rx: Mutex::new(pending_rx),
            liveness_interval,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Set how long a new connection may wait before identifying itself.
    pub fn with_handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }

    // =========================================================================
    // GRID
    // =========================================================================

    /// Put a connection in its slot, displacing any previous occupant.
    pub async fn connect(&self, handle: ClientHandle) {
        let (alliance, element) = (handle.alliance(), handle.element());
        let mut grid = self.grid.write().await;
        let slot = &mut grid[alliance.index()][element.index()];

        if let Some(previous) = slot.replace(handle) {
            info!(%alliance, %element, id = %previous.id(), "Displacing previous connection");
            previous.close();
        }
    }

    /// Clear a slot if it still holds connection `id`.
    pub async fn disconnect(&self, id: Uuid, alliance: Alliance, element: FieldElement) -> bool {
        let mut grid = self.grid.write().await;
        let slot = &mut grid[alliance.index()][element.index()];

        match slot {
            Some(handle) if handle.id() == id => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Handle for the connection in a slot.
    pub async fn get(&self, alliance: Alliance, element: FieldElement) -> Option<ClientHandle> {
        self.grid.read().await[alliance.index()][element.index()].clone()
    }

    /// Whether a live connection holds a slot.
    pub async fn is_connected(&self, alliance: Alliance, element: FieldElement) -> bool {
        self.grid.read().await[alliance.index()][element.index()]
            .as_ref()
            .is_some_and(|handle| !handle.is_closed())
    }

    /// Presence of every slot, red then blue, speaker then amp.
    pub async fn connection_statuses(&self) -> Vec<ConnectionStatus> {
        let grid = self.grid.read().await;
        Alliance::ALL
            .iter()
            .flat_map(|&alliance| {
                FieldElement::ALL.iter().map(move |&element| (alliance, element))
            })
            .map(|(alliance, element)| ConnectionStatus {
                alliance,
                element,
                connected: grid[alliance.index()][element.index()]
                    .as_ref()
                    .is_some_and(|handle| !handle.is_closed()),
            })
            .collect()
    }

    /// Number of occupied slots.
    pub async fn connection_count(&self) -> usize {
        self.grid.read().await.iter().flatten().filter(|slot| slot.is_some()).count()
    }

    // =========================================================================
    // MAILBOX
    // =========================================================================

    /// Sender side of the mailbox, for connection tasks.
    pub fn mailbox(&self) -> mpsc::UnboundedSender<ClientMessage> {
        self.mailbox_tx.clone()
    }

    /// Append a device event. Never blocks.
    pub fn receive_message(&self, message: ClientMessage) {
        // The registry owns the receiver, so the channel stays open
        let _ = self.mailbox_tx.send(message);
    }

    /// Drain the mailbox in arrival order.
    pub async fn get_messages(&self) -> Vec<ClientMessage> {
        let mut rx = self.mailbox_rx.lock().await;
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Drain connections that have not yet received initial state.
    pub async fn get_new_clients(&self) -> Vec<ClientHandle> {
        let mut rx = self.pending_rx.lock().await;
        let mut clients = Vec::new();
        while let Ok(handle) = rx.try_recv() {
            if !handle.is_closed() {
                clients.push(handle);
            }
        }
        clients
    }

    // =========================================================================
    // OUTPUT
    // =========================================================================

    /// Queue a line for the device in a slot. Dropped if the slot is empty.
    pub async fn output(&self, alliance: Alliance, element: FieldElement, text: &str) -> bool {
        let grid = self.grid.read().await;
        Self::route(&grid, alliance, element, text)
    }

    /// Route every command in an outbox, in order.
    pub async fn deliver(&self, outbox: &Outbox) {
        if outbox.is_empty() {
            return;
        }
        let grid = self.grid.read().await;
        for command in outbox.commands() {
            Self::route(&grid, command.alliance, command.element, &command.output.to_string());
        }
    }

    fn route(grid: &Grid, alliance: Alliance, element: FieldElement, text: &str) -> bool {
        let delivered = grid[alliance.index()][element.index()]
            .as_ref()
            .is_some_and(|handle| handle.output(text));
        if !delivered {
            warn!(%alliance, %element, text, "No device connected, dropping output");
        }
        delivered
    }

    // =========================================================================
    // CONNECTIONS
    // =========================================================================

    /// Run a device connection from handshake to termination.
    ///
    /// Rejected or timed-out handshakes get `NO` and are never registered.
    /// Shutdown before the handshake closes the stream silently. Accepted ones
    /// get `OK`, take their slot, and queue for initial state before any
    /// input is read. On exit the slot is cleared unless a newer connection
    /// already holds it.
    #[instrument(skip(self, stream, shutdown))]
    pub async fn handle_connection<S>(
        self: Arc<Self>,
        stream: S,
        peer: String,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ClientError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        let first_line = tokio::select! {
            read = timeout(self.handshake_timeout, protocol::read_line(&mut reader, &mut buf)) => match read {
                Ok(line) => line?.unwrap_or_default(),
                Err(_) => {
                    warn!(timeout = ?self.handshake_timeout, "No handshake from device");
                    send_ack(&mut writer, ACK_NO).await?;
                    return Err(ClientError::HandshakeTimeout);
                }
            },
            _ = shutdown.recv() => {
                debug!("Shutdown before handshake");
                return Ok(());
            }
        };

        let (alliance, element) = match protocol::decode_handshake(&first_line) {
            Ok(slot) => slot,
            Err(e) => {
                warn!("Unable to connect device: {}", e);
                send_ack(&mut writer, ACK_NO).await?;
                return Err(e.into());
            }
        };

        send_ack(&mut writer, ACK_OK).await?;

        let (client, handle) = Client::new(alliance, element, self.mailbox(), self.liveness_interval);
        let id = client.id();
        info!(%alliance, %element, %id, "Device connected");

        self.connect(handle.clone()).await;
        // Queue for initial state
        let _ = self.pending_tx.send(handle);

        let reason = client.run(reader, writer, shutdown).await;
        let cleared = self.disconnect(id, alliance, element).await;
        info!(%alliance, %element, %id, cleared, "Device connection ended: {}", reason);

        match reason {
            ClientError::Disconnected | ClientError::Displaced | ClientError::Shutdown => Ok(()),
            other => {
                debug!("Connection error: {}", other);
                Err(other)
            }
        }
    }
}

async fn send_ack<W>(writer: &mut W, ack: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(protocol::frame(ack).as_bytes()).await?;
    writer.flush().await
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_LIVENESS_INTERVAL)
    }
}
