//! Word game: letters fall into a grid and the player spells words from them.
//!
//! Letters drop one row per tick from a shuffled queue and settle on the
//! floor or on another letter. A chain of neighbouring letters (diagonals
//! included, no cell twice) is submitted to a `WordOracle`. Every accepted
//! word moves a small dialogue tree along its sentiment branch; reaching a
//! closing line wins. A letter that cannot even enter the grid loses.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use hushcalc_core::rng::{DeterministicRng, pick_index, shuffle};
use serde::Serialize;
use tracing::debug;

use crate::oracle::{Sentiment, WordOracle};
use crate::outcome::GameStatus;

/// Grid height.
pub const ROWS: usize = 12;

/// Grid width.
pub const COLS: usize = 8;

/// Interval between falling steps.
pub const TICK_MS: i64 = 700;

/// Shortest word the oracle is asked about.
pub const MIN_WORD_LEN: usize = 2;

/// One line of the calculator's side of the conversation.
#[derive(Debug, Clone, Copy)]
pub struct DialogueNode {
    /// What the calculator says.
    pub line: &'static str,
    /// Next node per sentiment (positive, negative, neutral); `None` closes.
    pub next: Option<[usize; 3]>,
}

/// The sentiment tree: a root, one follow-up per sentiment, one closing line
/// per follow-up.
pub const DIALOGUE: [DialogueNode; 7] = [
    DialogueNode {
        line: "Spell a word that tells me how you feel.",
        next: Some([1, 2, 3]),
    },
    DialogueNode {
        line: "That's lovely. Give me another one.",
        next: Some([4, 4, 6]),
    },
    DialogueNode {
        line: "Oh no. What else?",
        next: Some([4, 5, 5]),
    },
    DialogueNode {
        line: "Hmm. Tell me more.",
        next: Some([4, 5, 6]),
    },
    DialogueNode {
        line: "You make me happy.",
        next: None,
    },
    DialogueNode {
        line: "I'll remember that. Thank you for being honest.",
        next: None,
    },
    DialogueNode {
        line: "Fair enough. Words are hard.",
        next: None,
    },
];

/// A letter on its way down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FallingLetter {
    /// Current row.
    pub row: usize,
    /// Column it falls in.
    pub col: usize,
    /// The letter.
    pub letter: char,
}

/// Result of submitting a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordVerdict {
    /// The word was recognised and removed from the grid.
    Accepted(Sentiment),
    /// The oracle did not recognise the word.
    NotAWord,
    /// Fewer than `MIN_WORD_LEN` letters were selected.
    TooShort,
}

/// State of one word game.
#[derive(Debug, Clone, Serialize)]
pub struct WordGame {
    grid: Vec<Vec<Option<char>>>,
    falling: Option<FallingLetter>,
    #[serde(skip)]
    queue: VecDeque<char>,
    #[serde(skip)]
    vocabulary: Vec<String>,
    selection: Vec<(usize, usize)>,
    next_tick_at: DateTime<Utc>,
    node: usize,
    line: &'static str,
    accepted_words: Vec<String>,
    status: GameStatus,
}

impl WordGame {
    /// Starts with an empty grid. Letters come from `vocabulary`.
    #[must_use]
    pub fn start(vocabulary: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            grid: vec![vec![None; COLS]; ROWS],
            falling: None,
            queue: VecDeque::new(),
            vocabulary,
            selection: Vec::new(),
            next_tick_at: now + Duration::milliseconds(TICK_MS),
            node: 0,
            line: DIALOGUE[0].line,
            accepted_words: Vec::new(),
            status: GameStatus::Running,
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Letter settled at `(row, col)`.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<char> {
        self.grid.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    /// The letter still falling, if any.
    #[must_use]
    pub fn falling(&self) -> Option<FallingLetter> {
        self.falling
    }

    /// The calculator's current dialogue line.
    #[must_use]
    pub fn line(&self) -> &'static str {
        self.line
    }

    /// Advances the fall for every tick that is due.
    pub fn tick(&mut self, now: DateTime<Utc>, rng: &mut dyn DeterministicRng) {
        while self.status == GameStatus::Running && now >= self.next_tick_at {
            self.step(rng);
            self.next_tick_at += Duration::milliseconds(TICK_MS);
        }
    }

    /// Adds a settled cell to the selection. Returns whether it was taken.
    pub fn select(&mut self, row: usize, col: usize) -> bool {
        if self.status != GameStatus::Running
            || self.cell(row, col).is_none()
            || self.selection.contains(&(row, col))
        {
            return false;
        }
        if let Some(&(last_row, last_col)) = self.selection.last() {
            if last_row.abs_diff(row) > 1 || last_col.abs_diff(col) > 1 {
                return false;
            }
        }
        self.selection.push((row, col));
        true
    }

    /// Drops the current selection.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// The word spelled by the current selection.
    #[must_use]
    pub fn selected_word(&self) -> String {
        self.selection
            .iter()
            .filter_map(|&(row, col)| self.cell(row, col))
            .collect()
    }

    /// Submits the selection to `oracle`. The selection is always cleared.
    pub fn submit(&mut self, oracle: &dyn WordOracle) -> WordVerdict {
        let word = self.selected_word();
        if word.chars().count() < MIN_WORD_LEN {
            self.selection.clear();
            return WordVerdict::TooShort;
        }
        let Some(sentiment) = oracle.classify(&word) else {
            debug!(%word, "word rejected");
            self.selection.clear();
            return WordVerdict::NotAWord;
        };

        for (row, col) in self.selection.drain(..) {
            self.grid[row][col] = None;
        }
        self.collapse();
        self.accepted_words.push(word);
        self.advance_dialogue(sentiment);
        WordVerdict::Accepted(sentiment)
    }

    /// Moves the tick deadline by `by`, used after a pause.
    pub fn shift(&mut self, by: Duration) {
        self.next_tick_at += by;
    }

    fn step(&mut self, rng: &mut dyn DeterministicRng) {
        match self.falling {
            None => self.spawn(rng),
            Some(mut letter) => {
                if letter.row + 1 < ROWS && self.grid[letter.row + 1][letter.col].is_none() {
                    letter.row += 1;
                    self.falling = Some(letter);
                } else {
                    self.grid[letter.row][letter.col] = Some(letter.letter);
                    self.falling = None;
                }
            }
        }
    }

    fn spawn(&mut self, rng: &mut dyn DeterministicRng) {
        if self.queue.is_empty() {
            let mut words = self.vocabulary.clone();
            shuffle(&mut words, rng);
            self.queue = words.iter().flat_map(|w| w.chars()).collect();
        }
        let Some(letter) = self.queue.pop_front() else {
            return;
        };
        let col = pick_index(COLS, rng);
        if self.grid[0][col].is_some() {
            debug!(col, "word grid overflowed");
            self.status = GameStatus::Failed;
            return;
        }
        self.falling = Some(FallingLetter { row: 0, col, letter });
    }

    fn collapse(&mut self) {
        for col in 0..COLS {
            let letters: Vec<char> = (0..ROWS).filter_map(|row| self.grid[row][col]).collect();
            let empty = ROWS - letters.len();
            for row in 0..ROWS {
                self.grid[row][col] = if row < empty {
                    None
                } else {
                    Some(letters[row - empty])
                };
            }
        }
    }

    fn advance_dialogue(&mut self, sentiment: Sentiment) {
        let branch = match sentiment {
            Sentiment::Positive => 0,
            Sentiment::Negative => 1,
            Sentiment::Neutral => 2,
        };
        if let Some(next) = DIALOGUE[self.node].next {
            self.node = next[branch];
            self.line = DIALOGUE[self.node].line;
        }
        if DIALOGUE[self.node].next.is_none() {
            debug!(node = self.node, "word game dialogue closed");
            self.status = GameStatus::Completed;
        }
    }
}
