//! Owns the one active mini-game and routes input and ticks to it.

use chrono::{DateTime, Utc};
use hushcalc_core::error::DomainError;
use hushcalc_core::rng::DeterministicRng;
use hushcalc_story::step::{MiniGameKind, MiniGameSpec};
use serde::Serialize;
use tracing::{debug, info};

use crate::chaos::KeyboardChaos;
use crate::oracle::{LexiconOracle, WordOracle};
use crate::outcome::{GameStatus, MiniGameInput, MiniGameOutcome};
use crate::scramble::Scramble;
use crate::whack::WhackAMole;
use crate::word::WordGame;

/// The game currently holding the input.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum ActiveGame {
    /// Whack-a-mole round.
    WhackAMole(WhackAMole),
    /// Keyboard chaos.
    Chaos(KeyboardChaos),
    /// Falling-letter word game.
    WordGame(WordGame),
    /// Letter scramble.
    Scramble(Scramble),
}

impl ActiveGame {
    fn kind(&self) -> MiniGameKind {
        match self {
            Self::WhackAMole(_) => MiniGameKind::WhackAMole,
            Self::Chaos(_) => MiniGameKind::Chaos,
            Self::WordGame(_) => MiniGameKind::WordGame,
            Self::Scramble(_) => MiniGameKind::Scramble,
        }
    }

    fn status(&self) -> GameStatus {
        match self {
            Self::WhackAMole(g) => g.status(),
            Self::Chaos(g) => g.status(),
            Self::WordGame(g) => g.status(),
            Self::Scramble(g) => g.status(),
        }
    }

    fn shift(&mut self, by: chrono::Duration) {
        match self {
            Self::WhackAMole(g) => g.shift(by),
            Self::Chaos(g) => g.shift(by),
            Self::WordGame(g) => g.shift(by),
            Self::Scramble(g) => g.shift(by),
        }
    }
}

/// Guarantees mutual exclusion of the mini-games.
pub struct MiniGameSupervisor {
    active: Option<ActiveGame>,
    round: u8,
    paused_at: Option<DateTime<Utc>>,
    oracle: Box<dyn WordOracle>,
}

impl std::fmt::Debug for MiniGameSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniGameSupervisor")
            .field("active", &self.active)
            .field("round", &self.round)
            .field("paused_at", &self.paused_at)
            .finish_non_exhaustive()
    }
}

impl Default for MiniGameSupervisor {
    fn default() -> Self {
        Self::new(Box::new(LexiconOracle::default()))
    }
}

impl MiniGameSupervisor {
    /// Creates an idle supervisor with the given word oracle.
    #[must_use]
    pub fn new(oracle: Box<dyn WordOracle>) -> Self {
        Self {
            active: None,
            round: 1,
            paused_at: None,
            oracle,
        }
    }

    /// Whether a game holds the input.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Kind of the active game.
    #[must_use]
    pub fn active_kind(&self) -> Option<MiniGameKind> {
        self.active.as_ref().map(ActiveGame::kind)
    }

    /// The active game, for inspection.
    #[must_use]
    pub fn active(&self) -> Option<&ActiveGame> {
        self.active.as_ref()
    }

    /// Starts the game described by `spec`. `lit_buttons` lists the buttons
    /// that are not darkened.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MiniGameConflict` if another game is active.
    pub fn start(
        &mut self,
        spec: &MiniGameSpec,
        lit_buttons: &[String],
        now: DateTime<Utc>,
        rng: &mut dyn DeterministicRng,
    ) -> Result<(), DomainError> {
        if let Some(active) = &self.active {
            return Err(DomainError::MiniGameConflict {
                active: active.kind().as_str().to_owned(),
                requested: spec.kind.as_str().to_owned(),
            });
        }

        let game = match spec.kind {
            MiniGameKind::WhackAMole => {
                ActiveGame::WhackAMole(WhackAMole::start(spec.round, lit_buttons, now, rng))
            }
            MiniGameKind::Chaos => ActiveGame::Chaos(KeyboardChaos::start(now, rng)),
            MiniGameKind::WordGame => {
                ActiveGame::WordGame(WordGame::start(self.oracle.vocabulary(), now))
            }
            MiniGameKind::Scramble => ActiveGame::Scramble(Scramble::start(now, rng)),
        };
        info!(kind = spec.kind.as_str(), round = spec.round, "mini-game started");
        self.active = Some(game);
        self.round = spec.round;
        self.paused_at = None;
        Ok(())
    }

    /// Routes input to the active game. Returns the outcome if the game
    /// ended; input that does not fit the active game is ignored.
    pub fn input(
        &mut self,
        input: &MiniGameInput,
        now: DateTime<Utc>,
        rng: &mut dyn DeterministicRng,
    ) -> Option<MiniGameOutcome> {
        if self.paused_at.is_some() {
            return None;
        }
        let oracle = self.oracle.as_ref();
        match (self.active.as_mut()?, input) {
            (ActiveGame::WhackAMole(g), MiniGameInput::ButtonClick { label }) => {
                g.click(label, now, rng);
            }
            (ActiveGame::Chaos(g), MiniGameInput::ConnectTokens { from, to }) => {
                g.connect(*from, *to);
            }
            (ActiveGame::Chaos(g), MiniGameInput::TapToken { id }) => g.tap(*id),
            (ActiveGame::WordGame(g), MiniGameInput::SelectCell { row, col }) => {
                g.select(*row, *col);
            }
            (ActiveGame::WordGame(g), MiniGameInput::SubmitWord) => {
                let verdict = g.submit(oracle);
                debug!(?verdict, "word submitted");
            }
            (ActiveGame::WordGame(g), MiniGameInput::ClearSelection) => g.clear_selection(),
            (ActiveGame::Scramble(g), MiniGameInput::SelectTile { index }) => {
                g.select_tile(*index);
            }
            (ActiveGame::Scramble(g), MiniGameInput::SelectSlot { index }) => {
                g.select_slot(*index);
            }
            (game, other) => {
                debug!(kind = game.kind().as_str(), ?other, "input ignored by mini-game");
            }
        }
        self.finish_if_done()
    }

    /// Advances the active game's timers.
    pub fn tick(
        &mut self,
        now: DateTime<Utc>,
        rng: &mut dyn DeterministicRng,
    ) -> Option<MiniGameOutcome> {
        if self.paused_at.is_some() {
            return None;
        }
        match self.active.as_mut()? {
            ActiveGame::WhackAMole(g) => g.tick(now, rng),
            ActiveGame::Chaos(g) => g.tick(now),
            ActiveGame::WordGame(g) => g.tick(now, rng),
            ActiveGame::Scramble(g) => g.tick(now),
        }
        self.finish_if_done()
    }

    /// Freezes the active game's timers.
    pub fn pause(&mut self, now: DateTime<Utc>) {
        if self.active.is_some() && self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    /// Unfreezes the timers, moving every deadline by the paused time.
    pub fn resume(&mut self, now: DateTime<Utc>) {
        if let Some(paused_at) = self.paused_at.take() {
            if let Some(game) = self.active.as_mut() {
                game.shift(now - paused_at);
            }
        }
    }

    /// Drops the active game without an outcome.
    pub fn stop(&mut self) {
        if let Some(game) = self.active.take() {
            info!(kind = game.kind().as_str(), "mini-game stopped");
        }
        self.paused_at = None;
    }

    /// Public state of the active game, for the presentation layer.
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        self.active
            .as_ref()
            .and_then(|game| serde_json::to_value(game).ok())
            .unwrap_or_default()
    }

    fn finish_if_done(&mut self) -> Option<MiniGameOutcome> {
        let game = self.active.as_ref()?;
        let outcome = MiniGameOutcome::from_status(game.kind(), self.round, game.status())?;
        info!(
            kind = outcome.kind.as_str(),
            completed = outcome.completed,
            "mini-game finished"
        );
        self.active = None;
        Some(outcome)
    }
}
