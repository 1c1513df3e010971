//! Lobby actor: an isolated Tokio task that owns one game session.
//!
//! Each lobby runs in its own task and talks to the outside world through
//! an mpsc channel. Player sessions, the directory, and tests all hold a
//! [`LobbyHandle`]; only the actor touches player state.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use trivia_protocol::{PlayerId, Question, RosterEntry, ScoreEntry, ServerMessage, SessionId};
use trivia_questions::QuestionSource;
use trivia_session::{LobbyInbox, PlayerSession};
use trivia_tick::TickClock;
use trivia_transport::Connection;

use crate::scoring::round_deltas;
use crate::{LobbyConfig, LobbyError, LobbyPhase};

/// Commands sent to a lobby actor through its channel.
///
/// Variants carrying a `oneshot::Sender` are request/reply; the rest are
/// fire-and-forget.
pub(crate) enum LobbyCommand<C: Connection> {
    /// Add a player.
    Admit {
        session: Arc<PlayerSession<C>>,
        reply: oneshot::Sender<Result<(), LobbyError>>,
    },

    /// Drop a player (their connection is gone).
    Remove { player_id: PlayerId },

    /// Set a player's ready flag.
    SetReady { player_id: PlayerId, ready: bool },

    /// Record a player's guess for the open round.
    SubmitGuess { player_id: PlayerId, value: f64 },

    /// Request a snapshot.
    Info { reply: oneshot::Sender<LobbyInfo> },
}

/// A snapshot of lobby state.
#[derive(Debug, Clone)]
pub struct LobbyInfo {
    pub session_id: SessionId,
    pub category: String,
    pub phase: LobbyPhase,
    /// Current round, 1-based; 0 before the game starts.
    pub round: u32,
    /// `None` only when the lobby has no members.
    pub host: Option<PlayerId>,
    /// Members in join order.
    pub roster: Vec<RosterEntry>,
}

/// Handle to a running lobby actor.
///
/// Cheap to clone: it wraps an `mpsc::Sender`. The directory keeps one per
/// lobby and every player session gets its own clone.
pub struct LobbyHandle<C: Connection> {
    session_id: SessionId,
    sender: mpsc::Sender<LobbyCommand<C>>,
}

impl<C: Connection> Clone for LobbyHandle<C> {
    fn clone(&self) -> Self {
        Self {
            session_id: self.session_id.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<C: Connection> LobbyHandle<C> {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Admits a player. The first player admitted becomes host.
    ///
    /// # Errors
    /// - [`LobbyError::AlreadyInLobby`] if the player ID is taken
    /// - [`LobbyError::Closed`] if the lobby has stopped or its game is over
    pub async fn admit(&self, session: Arc<PlayerSession<C>>) -> Result<(), LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command(LobbyCommand::Admit {
            session,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.closed())?
    }

    /// Removes a player. Removing the host ends the session.
    pub async fn remove(&self, player_id: PlayerId) -> Result<(), LobbyError> {
        self.command(LobbyCommand::Remove { player_id }).await
    }

    pub async fn set_ready(&self, player_id: PlayerId, ready: bool) -> Result<(), LobbyError> {
        self.command(LobbyCommand::SetReady { player_id, ready })
            .await
    }

    pub async fn submit_guess(&self, player_id: PlayerId, value: f64) -> Result<(), LobbyError> {
        self.command(LobbyCommand::SubmitGuess { player_id, value })
            .await
    }

    /// Requests a snapshot of the lobby.
    pub async fn info(&self) -> Result<LobbyInfo, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command(LobbyCommand::Info { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.closed())
    }

    async fn command(&self, cmd: LobbyCommand<C>) -> Result<(), LobbyError> {
        self.sender.send(cmd).await.map_err(|_| self.closed())
    }

    fn closed(&self) -> LobbyError {
        LobbyError::Closed(self.session_id.clone())
    }
}

impl<C: Connection> LobbyInbox for LobbyHandle<C> {
    type Error = LobbyError;

    async fn set_ready(&self, player: &PlayerId, ready: bool) -> Result<(), LobbyError> {
        LobbyHandle::set_ready(self, player.clone(), ready).await
    }

    async fn submit_guess(&self, player: &PlayerId, value: f64) -> Result<(), LobbyError> {
        LobbyHandle::submit_guess(self, player.clone(), value).await
    }

    async fn remove(&self, player: &PlayerId) -> Result<(), LobbyError> {
        LobbyHandle::remove(self, player.clone()).await
    }
}

/// One member, as the actor tracks it.
struct Player<C: Connection> {
    session: Arc<PlayerSession<C>>,
    ready: bool,
    score: u32,
    last_delta: u32,
    guess: f64,
}

impl<C: Connection> Player<C> {
    fn new(session: Arc<PlayerSession<C>>) -> Self {
        Self {
            session,
            ready: false,
            score: 0,
            last_delta: 0,
            guess: 0.0,
        }
    }

    fn id(&self) -> &PlayerId {
        self.session.id()
    }

    fn roster_entry(&self) -> RosterEntry {
        RosterEntry {
            id: self.id().clone(),
            name: self.session.name().to_owned(),
            ready: self.ready,
            score: self.score,
        }
    }
}

/// What the select loop woke up for.
enum Event<C: Connection> {
    Command(Option<LobbyCommand<C>>),
    Tick,
}

/// Whether the actor keeps running after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// The internal lobby state. Runs inside a Tokio task.
struct LobbyActor<C: Connection, Q: QuestionSource> {
    session_id: SessionId,
    category: String,
    config: LobbyConfig,
    questions: Arc<Q>,
    /// Join order.
    players: Vec<Player<C>>,
    host: Option<PlayerId>,
    phase: LobbyPhase,
    round: u32,
    /// Ticks left in the current timed phase.
    remaining: u32,
    question: Option<Question>,
    clock: TickClock,
}

impl<C: Connection, Q: QuestionSource> LobbyActor<C, Q> {
    /// Runs the actor loop until the session ends or every handle is gone.
    async fn run(mut self, mut receiver: mpsc::Receiver<LobbyCommand<C>>) {
        tracing::info!(session_id = %self.session_id, category = %self.category, "lobby started");

        loop {
            let event = tokio::select! {
                cmd = receiver.recv() => Event::Command(cmd),
                _ = self.clock.wait_for_tick() => Event::Tick,
            };
            let flow = match event {
                Event::Command(Some(cmd)) => self.handle_command(cmd).await,
                Event::Command(None) => Flow::Stop,
                Event::Tick => self.handle_tick().await,
            };
            if flow == Flow::Stop {
                break;
            }
        }

        self.clock.stop();
        tracing::info!(session_id = %self.session_id, "lobby stopped");
    }

    async fn handle_command(&mut self, cmd: LobbyCommand<C>) -> Flow {
        match cmd {
            LobbyCommand::Admit { session, reply } => {
                let result = self.handle_admit(session).await;
                let _ = reply.send(result);
                Flow::Continue
            }
            LobbyCommand::Remove { player_id } => self.handle_remove(&player_id).await,
            LobbyCommand::SetReady { player_id, ready } => {
                self.handle_set_ready(&player_id, ready).await
            }
            LobbyCommand::SubmitGuess { player_id, value } => {
                self.handle_guess(&player_id, value);
                Flow::Continue
            }
            LobbyCommand::Info { reply } => {
                let _ = reply.send(self.info());
                Flow::Continue
            }
        }
    }

    async fn handle_admit(&mut self, session: Arc<PlayerSession<C>>) -> Result<(), LobbyError> {
        if self.phase == LobbyPhase::GameOver {
            return Err(LobbyError::Closed(self.session_id.clone()));
        }
        let player_id = session.id().clone();
        if self.position(&player_id).is_some() {
            return Err(LobbyError::AlreadyInLobby(player_id));
        }

        if self.host.is_none() {
            self.host = Some(player_id.clone());
        }
        self.players.push(Player::new(Arc::clone(&session)));
        tracing::info!(
            session_id = %self.session_id,
            %player_id,
            name = session.name(),
            players = self.players.len(),
            "player admitted"
        );

        self.send_to(&session, &ServerMessage::SessionAssigned(self.session_id.clone()))
            .await;
        self.send_to(&session, &ServerMessage::PlayerIdAssigned(player_id))
            .await;
        self.broadcast_roster().await;
        Ok(())
    }

    async fn handle_remove(&mut self, player_id: &PlayerId) -> Flow {
        let Some(index) = self.position(player_id) else {
            tracing::debug!(session_id = %self.session_id, %player_id, "remove for non-member");
            return Flow::Continue;
        };
        self.players.remove(index);
        tracing::info!(
            session_id = %self.session_id,
            %player_id,
            players = self.players.len(),
            "player removed"
        );

        if self.host.as_ref() == Some(player_id) {
            tracing::info!(session_id = %self.session_id, "host left, ending session");
            self.end_session().await;
            return Flow::Stop;
        }

        self.broadcast_roster().await;
        if self.phase == LobbyPhase::Waiting && self.all_ready() {
            self.start_countdown().await;
        }
        Flow::Continue
    }

    async fn handle_set_ready(&mut self, player_id: &PlayerId, ready: bool) -> Flow {
        let Some(index) = self.position(player_id) else {
            tracing::warn!(session_id = %self.session_id, %player_id, "ready from non-member, ignoring");
            return Flow::Continue;
        };
        self.players[index].ready = ready;
        self.broadcast_roster().await;

        match self.phase {
            LobbyPhase::Waiting if self.all_ready() => self.start_countdown().await,
            LobbyPhase::Countdown if !ready => self.abort_countdown().await,
            _ => {}
        }
        Flow::Continue
    }

    fn handle_guess(&mut self, player_id: &PlayerId, value: f64) {
        if !self.phase.accepts_guesses() {
            tracing::debug!(
                session_id = %self.session_id,
                %player_id,
                phase = %self.phase,
                "guess outside round, ignoring"
            );
            return;
        }
        let Some(index) = self.position(player_id) else {
            tracing::warn!(session_id = %self.session_id, %player_id, "guess from non-member, ignoring");
            return;
        };
        self.players[index].guess = value;
        tracing::debug!(session_id = %self.session_id, %player_id, value, "guess recorded");
    }

    // -----------------------------------------------------------------
    // Timed phases
    // -----------------------------------------------------------------

    async fn handle_tick(&mut self) -> Flow {
        self.remaining = self.remaining.saturating_sub(1);
        match self.phase {
            LobbyPhase::Countdown => {
                if !self.all_ready() {
                    self.abort_countdown().await;
                } else if self.remaining == 0 {
                    return self.start_round().await;
                } else {
                    self.broadcast(&ServerMessage::countdown(self.remaining))
                        .await;
                }
            }
            LobbyPhase::RoundActive => {
                if self.remaining == 0 {
                    self.close_round().await;
                } else {
                    self.broadcast(&ServerMessage::timer(self.remaining)).await;
                }
            }
            LobbyPhase::RoundReveal => {
                if self.remaining > 0 {
                    self.broadcast(&ServerMessage::timer(self.remaining)).await;
                } else if self.round >= self.config.rounds {
                    self.game_over().await;
                } else {
                    return self.start_round().await;
                }
            }
            LobbyPhase::Waiting | LobbyPhase::GameOver => self.clock.stop(),
        }
        Flow::Continue
    }

    async fn start_countdown(&mut self) {
        self.phase = LobbyPhase::Countdown;
        self.remaining = self.config.countdown_ticks;
        tracing::info!(session_id = %self.session_id, "all players ready, counting down");
        self.broadcast(&ServerMessage::countdown(self.remaining))
            .await;
        self.clock.start();
    }

    async fn abort_countdown(&mut self) {
        self.phase = LobbyPhase::Waiting;
        self.remaining = 0;
        self.clock.stop();
        tracing::info!(session_id = %self.session_id, "countdown aborted");
        self.broadcast(&ServerMessage::waiting()).await;
    }

    async fn start_round(&mut self) -> Flow {
        self.round += 1;
        let question = match self.questions.question(&self.category).await {
            Ok(question) => question,
            Err(e) => {
                tracing::error!(
                    session_id = %self.session_id,
                    category = %self.category,
                    round = self.round,
                    error = %e,
                    "question source failed, ending session"
                );
                self.end_session().await;
                return Flow::Stop;
            }
        };

        for player in &mut self.players {
            player.guess = 0.0;
        }
        self.phase = LobbyPhase::RoundActive;
        self.remaining = self.config.guess_window_ticks;
        tracing::info!(session_id = %self.session_id, round = self.round, "round started");

        self.broadcast(&ServerMessage::Question(question.clone()))
            .await;
        self.question = Some(question);
        self.broadcast(&ServerMessage::timer(self.remaining)).await;
        self.clock.start();
        Flow::Continue
    }

    async fn close_round(&mut self) {
        let answer = self.question.as_ref().map_or(0.0, |q| q.answer);
        let guesses: Vec<f64> = self.players.iter().map(|p| p.guess).collect();
        let deltas = round_deltas(answer, &guesses);

        let mut reveal = Vec::with_capacity(self.players.len());
        for (player, delta) in self.players.iter_mut().zip(deltas) {
            player.score += delta;
            player.last_delta = delta;
            reveal.push(ScoreEntry {
                id: player.id().clone(),
                name: player.session.name().to_owned(),
                score: player.score,
                delta: player.last_delta,
                guess: player.guess,
            });
        }
        tracing::info!(session_id = %self.session_id, round = self.round, answer, "round scored");
        self.broadcast(&ServerMessage::ScoreReveal(reveal)).await;

        for player in &mut self.players {
            player.guess = 0.0;
        }
        self.phase = LobbyPhase::RoundReveal;
        self.remaining = self.config.reveal_ticks;
        self.broadcast(&ServerMessage::timer(self.remaining)).await;
    }

    async fn game_over(&mut self) {
        self.phase = LobbyPhase::GameOver;
        self.question = None;
        self.clock.stop();
        tracing::info!(session_id = %self.session_id, rounds = self.round, "game over");
        self.broadcast(&ServerMessage::game_over()).await;
    }

    /// Tells every member the session is over, closes their connections,
    /// and empties the lobby.
    async fn end_session(&mut self) {
        self.broadcast(&ServerMessage::session_ended()).await;
        for player in self.players.drain(..) {
            if let Err(e) = player.session.close().await {
                tracing::debug!(player_id = %player.session.id(), error = %e, "close failed");
            }
        }
        self.host = None;
        self.clock.stop();
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    fn position(&self, player_id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id() == player_id)
    }

    fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.ready)
    }

    fn roster(&self) -> Vec<RosterEntry> {
        self.players.iter().map(Player::roster_entry).collect()
    }

    async fn broadcast_roster(&self) {
        self.broadcast(&ServerMessage::RosterUpdate(self.roster()))
            .await;
    }

    /// Sends to every current member in join order. A failed send is
    /// logged and skipped; the player's own receive loop handles removal.
    async fn broadcast(&self, message: &ServerMessage) {
        for player in &self.players {
            self.send_to(&player.session, message).await;
        }
    }

    async fn send_to(&self, session: &PlayerSession<C>, message: &ServerMessage) {
        if let Err(e) = session.send(message).await {
            tracing::warn!(
                session_id = %self.session_id,
                player_id = %session.id(),
                error = %e,
                "send failed, skipping"
            );
        }
    }

    fn info(&self) -> LobbyInfo {
        LobbyInfo {
            session_id: self.session_id.clone(),
            category: self.category.clone(),
            phase: self.phase,
            round: self.round,
            host: self.host.clone(),
            roster: self.roster(),
        }
    }
}

/// Spawns a new lobby actor task and returns a handle to it.
pub(crate) fn spawn_lobby<C: Connection, Q: QuestionSource>(
    session_id: SessionId,
    category: String,
    mut config: LobbyConfig,
    questions: Arc<Q>,
) -> LobbyHandle<C> {
    // Every timed phase lasts at least one tick.
    config.countdown_ticks = config.countdown_ticks.max(1);
    config.guess_window_ticks = config.guess_window_ticks.max(1);
    config.reveal_ticks = config.reveal_ticks.max(1);

    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));

    let actor = LobbyActor::<C, Q> {
        session_id: session_id.clone(),
        category,
        clock: TickClock::new(config.tick.clone()),
        config,
        questions,
        players: Vec::new(),
        host: None,
        phase: LobbyPhase::Waiting,
        round: 0,
        remaining: 0,
        question: None,
    };

    tokio::spawn(actor.run(rx));

    LobbyHandle {
        session_id,
        sender: tx,
    }
}
