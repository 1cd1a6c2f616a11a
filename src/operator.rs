//! Operator Console
//!
//! Local control surface for the field operator: the mode "advance" trigger
//! and a read-only scoreboard. Commands go to the game loop over a channel;
//! the loop publishes a `Scoreboard` every tick on a watch channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::game::state::{GameState, MatchSnapshot};
use crate::network::registry::ConnectionStatus;

/// Requests from the operator to the game loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Advance the mode state machine (start, start teleop, or abort)
    Advance,
}

/// A parsed console line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Empty line, space, `go`, or `advance`
    Advance,
    /// Print the scoreboard as JSON
    Status,
    /// List commands
    Help,
    /// Anything else
    Unknown(String),
}

impl ConsoleCommand {
    /// Parse a console line. Case-insensitive; surrounding whitespace ignored.
    pub fn parse(line: &str) -> Self {
        let command = line.trim().to_ascii_lowercase();
        match command.as_str() {
            "" | "go" | "advance" => ConsoleCommand::Advance,
            "status" => ConsoleCommand::Status,
            "help" | "?" => ConsoleCommand::Help,
            _ => ConsoleCommand::Unknown(command),
        }
    }
}

const HELP: &str = "\
commands:
  <enter> | go | advance   advance the match mode
  status                   print the scoreboard
  help                     show this message
";

// =============================================================================
// SCOREBOARD
// =============================================================================

/// What the field display shows: match state plus device presence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scoreboard {
    /// When this snapshot was taken
    pub taken_at: DateTime<Utc>,
    /// Match state
    #[serde(flatten)]
    pub match_state: MatchSnapshot,
    /// Device presence per slot
    pub connections: Vec<ConnectionStatus>,
}

impl Scoreboard {
    /// Snapshot taken now.
    pub fn new(match_state: MatchSnapshot, connections: Vec<ConnectionStatus>) -> Self {
        Self {
            taken_at: Utc::now(),
            match_state,
            connections,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for Scoreboard {
    fn default() -> Self {
        Self::new(GameState::new().snapshot(), Vec::new())
    }
}

// =============================================================================
// CONSOLE
// =============================================================================

/// Read operator commands from `input` until EOF or the game loop stops.
pub async fn run_console<R, W>(
    input: R,
    mut output: W,
    commands: mpsc::UnboundedSender<OperatorCommand>,
    scoreboard: watch::Receiver<Scoreboard>,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        let reply = match ConsoleCommand::parse(&line) {
            ConsoleCommand::Advance => {
                if commands.send(OperatorCommand::Advance).is_err() {
                    debug!("Game loop gone, closing console");
                    break;
                }
                info!("Operator requested mode advance");
                let mode = scoreboard.borrow().match_state.mode_name.clone();
                format!("advance requested (was {})\n", mode)
            }
            ConsoleCommand::Status => {
                let board = scoreboard.borrow().clone();
                match board.to_json() {
                    Ok(json) => format!("{}\n", json),
                    Err(e) => format!("error: {}\n", e),
                }
            }
            ConsoleCommand::Help => HELP.to_string(),
            ConsoleCommand::Unknown(command) => {
                format!("unknown command {:?}, try `help`\n", command)
            }
        };

        output.write_all(reply.as_bytes()).await?;
        output.flush().await?;
    }

    Ok(())
}

/// Run the console on the process's stdin and stdout.
pub async fn run_stdin_console(
    commands: mpsc::UnboundedSender<OperatorCommand>,
    scoreboard: watch::Receiver<Scoreboard>,
) -> std::io::Result<()> {
    run_console(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        commands,
        scoreboard,
    )
    .await
}
