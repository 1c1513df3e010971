//! Lobby configuration and phase machine.

use serde::{Deserialize, Serialize};
use trivia_tick::TickConfig;

// ---------------------------------------------------------------------------
// LobbyConfig
// ---------------------------------------------------------------------------

/// Timing and sizing for a lobby instance.
///
/// Every duration is counted in ticks of `tick.tick` length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Length of the pre-game countdown.
    pub countdown_ticks: u32,

    /// How long each round's guess window stays open.
    pub guess_window_ticks: u32,

    /// Pause after a score reveal before the next round.
    pub reveal_ticks: u32,

    /// Rounds per game.
    pub rounds: u32,

    /// Tick clock settings.
    pub tick: TickConfig,

    /// Capacity of the lobby's command channel.
    pub command_buffer: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: 5,
            guess_window_ticks: 30,
            reveal_ticks: 8,
            rounds: 5,
            tick: TickConfig::default(),
            command_buffer: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// LobbyPhase
// ---------------------------------------------------------------------------

/// Where a lobby is in its life.
///
/// ```text
/// Waiting ⇄ Countdown → RoundActive → RoundReveal ─┬→ RoundActive (next round)
///                                                   └→ GameOver
/// ```
///
/// - **Waiting**: accepting players, ready flags matter.
/// - **Countdown**: everyone was ready; ticking down, re-checked every tick.
/// - **RoundActive**: a question is out and guesses are accepted.
/// - **RoundReveal**: scores were broadcast; pausing before the next round.
/// - **GameOver**: the last round was revealed. Inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LobbyPhase {
    Waiting,
    Countdown,
    RoundActive,
    RoundReveal,
    GameOver,
}

impl LobbyPhase {
    /// Returns `true` while guesses are accepted.
    pub fn accepts_guesses(&self) -> bool {
        matches!(self, Self::RoundActive)
    }
}

impl std::fmt::Display for LobbyPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::Countdown => write!(f, "Countdown"),
            Self::RoundActive => write!(f, "RoundActive"),
            Self::RoundReveal => write!(f, "RoundReveal"),
            Self::GameOver => write!(f, "GameOver"),
        }
    }
}
