//! Keyboard chaos: letters escape the keyboard and float around.
//!
//! For the first thirty seconds the letters can only be dragged together,
//! which scores nothing. After that every letter has to be tapped away.

use chrono::{DateTime, Duration, Utc};
use hushcalc_core::rng::{DeterministicRng, pick_index};
use serde::Serialize;
use tracing::debug;

use crate::outcome::GameStatus;

/// Letters the tokens are drawn from.
pub const SOURCE_WORD: &str = "KEYBOARDVIRUS";

/// Number of floating tokens.
pub const TOKEN_COUNT: usize = 12;

/// Length of the decorative connect phase.
pub const CONNECT_PHASE_SECS: i64 = 30;

const BOUND: f64 = 1.0;
const MAX_SPEED: f64 = 0.02;

/// The two phases of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaosPhase {
    /// Tokens may be dragged together; nothing counts.
    Connect,
    /// Every token must be tapped.
    Clear,
}

/// A floating letter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// Stable id used by input.
    pub id: usize,
    /// The letter shown.
    pub letter: char,
    /// Position inside the unit cube.
    pub position: [f64; 3],
    velocity: [f64; 3],
    /// Whether the token has been tapped away.
    pub cleared: bool,
}

/// State of one chaos session.
#[derive(Debug, Clone, Serialize)]
pub struct KeyboardChaos {
    tokens: Vec<Token>,
    phase: ChaosPhase,
    connect_until: DateTime<Utc>,
    connections: Vec<(usize, usize)>,
    status: GameStatus,
}

impl KeyboardChaos {
    /// Scatters the tokens at random positions.
    pub fn start(now: DateTime<Utc>, rng: &mut dyn DeterministicRng) -> Self {
        let letters: Vec<char> = SOURCE_WORD.chars().collect();
        let tokens = (0..TOKEN_COUNT)
            .map(|id| Token {
                id,
                letter: letters[pick_index(letters.len(), rng)],
                position: [
                    rng.next_f64().mul_add(2.0, -1.0),
                    rng.next_f64().mul_add(2.0, -1.0),
                    rng.next_f64().mul_add(2.0, -1.0),
                ],
                velocity: [
                    (rng.next_f64() - 0.5) * 2.0 * MAX_SPEED,
                    (rng.next_f64() - 0.5) * 2.0 * MAX_SPEED,
                    (rng.next_f64() - 0.5) * 2.0 * MAX_SPEED,
                ],
                cleared: false,
            })
            .collect();

        Self {
            tokens,
            phase: ChaosPhase::Connect,
            connect_until: now + Duration::seconds(CONNECT_PHASE_SECS),
            connections: Vec::new(),
            status: GameStatus::Running,
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> ChaosPhase {
        self.phase
    }

    /// All tokens, cleared ones included.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Tokens still floating.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.tokens.iter().filter(|t| !t.cleared).count()
    }

    /// Drifts every token and switches phase when the connect time is up.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if self.status != GameStatus::Running {
            return;
        }
        for token in self.tokens.iter_mut().filter(|t| !t.cleared) {
            for axis in 0..3 {
                let next = token.position[axis] + token.velocity[axis];
                if next.abs() > BOUND {
                    token.velocity[axis] = -token.velocity[axis];
                    token.position[axis] = next.clamp(-BOUND, BOUND);
                } else {
                    token.position[axis] = next;
                }
            }
        }
        if self.phase == ChaosPhase::Connect && now >= self.connect_until {
            debug!("chaos switching to clear phase");
            self.phase = ChaosPhase::Clear;
            self.connections.clear();
        }
    }

    /// Drags two tokens together. Only allowed in the connect phase.
    /// Returns whether the connection was drawn.
    pub fn connect(&mut self, from: usize, to: usize) -> bool {
        if self.phase != ChaosPhase::Connect
            || from == to
            || from >= self.tokens.len()
            || to >= self.tokens.len()
        {
            return false;
        }
        self.connections.push((from, to));
        true
    }

    /// Taps a token away. Only counts in the clear phase.
    pub fn tap(&mut self, id: usize) {
        if self.status != GameStatus::Running || self.phase != ChaosPhase::Clear {
            return;
        }
        if let Some(token) = self.tokens.get_mut(id) {
            token.cleared = true;
        }
        if self.remaining() == 0 {
            debug!("chaos cleared");
            self.status = GameStatus::Completed;
        }
    }

    /// Moves the phase deadline by `by`, used after a pause.
    pub fn shift(&mut self, by: Duration) {
        self.connect_until += by;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hushcalc_test_support::{MockRng, test_epoch};

    #[test]
    fn test_start_scatters_twelve_tokens_from_the_source_word() {
        let game = KeyboardChaos::start(test_epoch(), &mut MockRng);

        assert_eq!(game.tokens().len(), TOKEN_COUNT);
        assert!(game.tokens().iter().all(|t| SOURCE_WORD.contains(t.letter)));
        assert_eq!(game.phase(), ChaosPhase::Connect);
    }

    #[test]
    fn test_taps_do_not_count_during_connect_phase() {
        let now = test_epoch();
        let mut game = KeyboardChaos::start(now, &mut MockRng);

        game.tap(0);

        assert_eq!(game.remaining(), TOKEN_COUNT);
        assert!(game.connect(0, 1));
    }

    #[test]
    fn test_phase_switches_after_thirty_seconds() {
        // Arrange
        let now = test_epoch();
        let mut game = KeyboardChaos::start(now, &mut MockRng);

        // Act
        game.tick(now + Duration::seconds(29));
        let before = game.phase();
        game.tick(now + Duration::seconds(30));

        // Assert
        assert_eq!(before, ChaosPhase::Connect);
        assert_eq!(game.phase(), ChaosPhase::Clear);
        assert!(!game.connect(0, 1));
    }

    #[test]
    fn test_clearing_every_token_completes() {
        let now = test_epoch();
        let mut game = KeyboardChaos::start(now, &mut MockRng);
        game.tick(now + Duration::seconds(30));

        for id in 0..TOKEN_COUNT {
            assert_eq!(game.status(), GameStatus::Running);
            game.tap(id);
        }

        assert_eq!(game.status(), GameStatus::Completed);
    }

    #[test]
    fn test_tokens_stay_inside_bounds() {
        let now = test_epoch();
        let mut game = KeyboardChaos::start(now, &mut MockRng);

        for step in 0..500 {
            game.tick(now + Duration::milliseconds(step * 50));
        }

        for token in game.tokens() {
            assert!(token.position.iter().all(|p| p.abs() <= BOUND));
        }
    }
}
