//! Device Connections
//!
//! One `Client` per connected device. It runs three branches as a single
//! cancellation group: input decoding, output writing, and a liveness
//! monitor. The first branch to finish ends the connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{trace, warn};
use uuid::Uuid;

use crate::game::actions;
use crate::game::messages::{ClientMessage, Message};
use crate::game::output::DeviceOutput;
use crate::game::state::GameState;
use crate::game::types::{Alliance, FieldElement};
use crate::network::protocol::{self, ProtocolError};

/// Why a connection ended, or failed to start.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Peer closed the stream.
    #[error("Device disconnected")]
    Disconnected,

    /// Another connection took this slot.
    #[error("Displaced by a newer connection")]
    Displaced,

    /// Server is shutting down.
    #[error("Server shutting down")]
    Shutdown,

    /// Handshake was refused.
    #[error("Handshake rejected: {0}")]
    Rejected(#[from] ProtocolError),

    /// No handshake arrived in time.
    #[error("Handshake timed out")]
    HandshakeTimeout,

    /// Transport error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// CLIENT KIND
// =============================================================================

/// Device grammar, selected once at handshake time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientKind {
    /// Amp: scores, amp button, coopertition button
    Amp,
    /// Speaker: scores only
    Speaker,
}

impl ClientKind {
    /// Grammar for a field element.
    pub const fn for_element(element: FieldElement) -> Self {
        match element {
            FieldElement::Amp => ClientKind::Amp,
            FieldElement::Speaker => ClientKind::Speaker,
        }
    }

    /// Field element this grammar belongs to.
    pub const fn element(self) -> FieldElement {
        match self {
            ClientKind::Amp => FieldElement::Amp,
            ClientKind::Speaker => FieldElement::Speaker,
        }
    }

    /// Decode one input line.
    pub fn decode(self, line: &str) -> Result<Message, ProtocolError> {
        let line = protocol::trim_line(line);
        let unknown = || ProtocolError::UnknownCommand(line.to_string());

        if let Some(message) = protocol::decode_score(line) {
            return Ok(message);
        }

        match (self, line.chars().next()) {
            (ClientKind::Amp, Some('A')) => Ok(Message::AmpButtonPressed),
            (ClientKind::Amp, Some('C')) => Ok(Message::CoopertitionButtonPressed),
            _ => Err(unknown()),
        }
    }

    /// Full display state for a device of this kind.
    pub fn initial_state(self, state: &GameState, alliance: Alliance) -> Vec<DeviceOutput> {
        actions::initial_state(state, alliance, self.element())
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cheap, cloneable reference to a live connection.
#[derive(Clone, Debug)]
pub struct ClientHandle {
    id: Uuid,
    alliance: Alliance,
    element: FieldElement,
    outbound: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

impl ClientHandle {
    /// Connection id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Alliance this device belongs to.
    pub fn alliance(&self) -> Alliance {
        self.alliance
    }

    /// Device kind.
    pub fn element(&self) -> FieldElement {
        self.element
    }

    /// Device grammar.
    pub fn kind(&self) -> ClientKind {
        ClientKind::for_element(self.element)
    }

    /// Queue a line for the device. Returns false if the connection is gone.
    pub fn output(&self, line: impl Into<String>) -> bool {
        !self.is_closed() && self.outbound.send(line.into()).is_ok()
    }

    /// Push the device's full display state.
    pub fn send_init_state(&self, state: &GameState) -> bool {
        self.kind()
            .initial_state(state, self.alliance)
            .into_iter()
            .all(|output| self.output(output.to_string()))
    }

    /// Ask the connection to shut down.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Whether the connection has ended or been asked to.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// A device connection after a successful handshake.
pub struct Client {
    id: Uuid,
    alliance: Alliance,
    kind: ClientKind,
    outbound: mpsc::UnboundedReceiver<String>,
    mailbox: mpsc::UnboundedSender<ClientMessage>,
    closed: Arc<AtomicBool>,
    liveness_interval: Duration,
}

impl Client {
    /// Create a connection and its handle.
    ///
    /// Outbound lines stay queued until `run` starts writing them.
    pub fn new(
        alliance: Alliance,
        element: FieldElement,
        mailbox: mpsc::UnboundedSender<ClientMessage>,
        liveness_interval: Duration,
    ) -> (Self, ClientHandle) {
        let id = Uuid::new_v4();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let client = Self {
            id,
            alliance,
            kind: ClientKind::for_element(element),
            outbound: outbound_rx,
            mailbox,
            closed: closed.clone(),
            liveness_interval,
        };
        let handle = ClientHandle {
            id,
            alliance,
            element,
            outbound: outbound_tx,
            closed,
        };
        (client, handle)
    }

    /// Connection id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Serve the connection until any branch ends; returns why.
    pub async fn run<R, W>(
        mut self,
        mut reader: R,
        mut writer: W,
        mut shutdown: broadcast::Receiver<()>,
    ) -> ClientError
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let reason = tokio::select! {
            reason = input_loop(&mut reader, self.alliance, self.kind, &self.mailbox) => reason,
            reason = output_loop(&mut writer, &mut self.outbound) => reason,
            reason = liveness_monitor(&self.closed, &mut shutdown, self.liveness_interval) => reason,
        };

        self.closed.store(true, Ordering::Release);
        reason
    }
}

async fn input_loop<R>(
    reader: &mut R,
    alliance: Alliance,
    kind: ClientKind,
    mailbox: &mpsc::UnboundedSender<ClientMessage>,
) -> ClientError
where
    R: AsyncBufRead + Unpin,
{
    let element = kind.element();
    let mut buf = Vec::new();
    loop {
        let line = match protocol::read_line(reader, &mut buf).await {
            Ok(Some(line)) => line,
            Ok(None) => return ClientError::Disconnected,
            Err(e) => return ClientError::Io(e),
        };
        trace!(%alliance, %element, line = %line, "Device input");

        match kind.decode(&line) {
            Ok(message) => {
                if mailbox.send(ClientMessage::new(alliance, element, message)).is_err() {
                    return ClientError::Shutdown;
                }
            }
            Err(e) => warn!(%alliance, %element, "Ignoring device input: {}", e),
        }
    }
}

async fn output_loop<W>(writer: &mut W, outbound: &mut mpsc::UnboundedReceiver<String>) -> ClientError
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = outbound.recv().await {
        trace!(line = %line, "Device output");
        if let Err(e) = writer.write_all(protocol::frame(&line).as_bytes()).await {
            return ClientError::Io(e);
        }
        if let Err(e) = writer.flush().await {
            return ClientError::Io(e);
        }
    }
    // All handles dropped
    ClientError::Displaced
}

async fn liveness_monitor(
    closed: &AtomicBool,
    shutdown: &mut broadcast::Receiver<()>,
    period: Duration,
) -> ClientError {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if closed.load(Ordering::Acquire) {
                    return ClientError::Displaced;
                }
            }
            _ = shutdown.recv() => return ClientError::Shutdown,
        }
    }
}
