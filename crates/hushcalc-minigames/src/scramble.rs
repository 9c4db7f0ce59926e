//! Scramble: put the shuffled letters of a word back into their slots.

use chrono::{DateTime, Duration, Utc};
use hushcalc_core::rng::{DeterministicRng, shuffle};
use serde::Serialize;
use tracing::debug;

use crate::outcome::GameStatus;

/// The word to rebuild.
pub const TARGET_WORD: &str = "CALCULUS";

/// Time limit.
pub const TIME_LIMIT_SECS: i64 = 90;

/// State of one scramble game.
#[derive(Debug, Clone, Serialize)]
pub struct Scramble {
    target: Vec<char>,
    tiles: Vec<char>,
    slots: Vec<Option<usize>>,
    selected_tile: Option<usize>,
    deadline: DateTime<Utc>,
    status: GameStatus,
}

impl Scramble {
    /// Shuffles the target into tiles with one empty slot per letter.
    pub fn start(now: DateTime<Utc>, rng: &mut dyn DeterministicRng) -> Self {
        let target: Vec<char> = TARGET_WORD.chars().collect();
        let mut tiles = target.clone();
        shuffle(&mut tiles, rng);
        Self {
            slots: vec![None; target.len()],
            target,
            tiles,
            selected_tile: None,
            deadline: now + Duration::seconds(TIME_LIMIT_SECS),
            status: GameStatus::Running,
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Letters of the tiles, by tile index.
    #[must_use]
    pub fn tiles(&self) -> &[char] {
        &self.tiles
    }

    /// Letter placed in `slot`, if any.
    #[must_use]
    pub fn slot_letter(&self, slot: usize) -> Option<char> {
        self.slots
            .get(slot)
            .copied()
            .flatten()
            .map(|tile| self.tiles[tile])
    }

    /// Whether `tile` is still in the pool.
    #[must_use]
    pub fn in_pool(&self, tile: usize) -> bool {
        tile < self.tiles.len() && !self.slots.contains(&Some(tile))
    }

    /// Picks up a tile from the pool.
    pub fn select_tile(&mut self, tile: usize) {
        if self.status == GameStatus::Running && self.in_pool(tile) {
            self.selected_tile = Some(tile);
        }
    }

    /// Taps a slot. An occupied slot gives its tile back to the pool; an
    /// empty slot receives the selected tile.
    pub fn select_slot(&mut self, slot: usize) {
        if self.status != GameStatus::Running || slot >= self.slots.len() {
            return;
        }
        if self.slots[slot].is_some() {
            self.slots[slot] = None;
            return;
        }
        if let Some(tile) = self.selected_tile.take() {
            self.slots[slot] = Some(tile);
            if self.is_solved() {
                debug!("scramble solved");
                self.status = GameStatus::Completed;
            }
        }
    }

    /// Fails the game once the time limit has passed.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if self.status == GameStatus::Running && now >= self.deadline {
            debug!("scramble timed out");
            self.status = GameStatus::Failed;
        }
    }

    /// Moves the deadline by `by`, used after a pause.
    pub fn shift(&mut self, by: Duration) {
        self.deadline += by;
    }

    fn is_solved(&self) -> bool {
        self.slots
            .iter()
            .zip(&self.target)
            .all(|(slot, want)| slot.is_some_and(|tile| self.tiles[tile] == *want))
    }
}
