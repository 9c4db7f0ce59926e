//! Step configuration data model.

use std::collections::BTreeMap;

use hushcalc_core::ports::PermissionKind;
use serde::{Deserialize, Serialize};

/// Numeric identifier of a step.
pub type StepId = u32;

/// Value of a next-step field that ends the conversation instead of moving.
pub const TERMINAL: StepId = 0;

/// The four nested games a step can hand the input to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiniGameKind {
    /// Flashing target buttons, two rounds.
    WhackAMole,
    /// Floating letter tokens over a 3D scene.
    Chaos,
    /// Falling-letter grid with a word oracle.
    WordGame,
    /// Eight-letter tile scramble.
    Scramble,
}

impl MiniGameKind {
    /// Stable lowercase name, used in logs and payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WhackAMole => "whack_a_mole",
            Self::Chaos => "chaos",
            Self::WordGame => "word_game",
            Self::Scramble => "scramble",
        }
    }
}

/// How a step hands over to a mini-game and where each outcome leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniGameSpec {
    /// The game to start.
    pub kind: MiniGameKind,
    /// Round number, for games with rounds.
    #[serde(default = "default_round")]
    pub round: u8,
    /// Step entered when the game is won.
    pub on_success: StepId,
    /// Step entered when the game is lost. `None` for games that cannot fail.
    #[serde(default)]
    pub on_failure: Option<StepId>,
    /// Base lockout after a failure, multiplied by the failure count.
    #[serde(default)]
    pub punishment_minutes: u32,
}

fn default_round() -> u8 {
    1
}

/// One inclusive age range of an age-branching step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBracket {
    /// Lowest age in the bracket.
    pub min: u32,
    /// Highest age in the bracket, `None` for open-ended.
    #[serde(default)]
    pub max: Option<u32>,
    /// Fixed response shown for this bracket.
    pub response: String,
    /// Step that follows, `None` to end the conversation.
    #[serde(default)]
    pub next_step: Option<StepId>,
}

impl AgeBracket {
    /// Whether `age` falls into this bracket.
    #[must_use]
    pub fn contains(&self, age: u32) -> bool {
        age >= self.min && self.max.is_none_or(|max| age <= max)
    }
}

/// A side effect attached to entering a step or taking one of its paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    /// Switch the inverted colour scheme on or off.
    InvertColors {
        /// Whether the colours are inverted afterwards.
        enabled: bool,
    },
    /// Darken the listed button labels.
    DarkenButtons {
        /// Labels such as `"7"`.
        buttons: Vec<String>,
    },
    /// Light every button again.
    RestoreButtons,
    /// Crack the minus button (visual only).
    DamageMinus,
    /// Break the minus button; minus presses are swallowed.
    BreakMinus,
    /// Repair the minus button.
    RepairMinus,
    /// Require an app restart before the story continues.
    NeedsRestart,
    /// Record that the terms were accepted.
    AcceptTerms,
    /// Open a link in the browser.
    OpenLink {
        /// Target URL.
        url: String,
    },
    /// Write the disclosure letter to storage.
    WriteDisclosureFile,
    /// Schedule an OS notification.
    ScheduleNotification {
        /// Delay before the notification fires.
        minutes: u32,
    },
    /// Vibrate.
    Haptic {
        /// Pulse length.
        duration_ms: u32,
        /// Pulse strength, 1-255.
        amplitude: u8,
    },
}

/// The special behavior a step dispatches to, derived from its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialBehavior {
    /// Ordinary conversation or trivia step.
    Plain,
    /// Numeric answer bucketed into age brackets.
    AgeBranching,
    /// Numeric answer routed through a per-choice destination table.
    ChoiceRouting,
    /// Step that hands input to a mini-game.
    MiniGame,
    /// Agreeing asks the OS for a permission first.
    PermissionGate,
}

/// Immutable configuration of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    /// Text shown when the step is presented.
    pub prompt_message: String,
    /// Text shown when the user agrees or answers correctly.
    pub success_message: String,
    /// Text shown when the user declines.
    pub decline_message: String,
    /// Step that follows success, or `TERMINAL`.
    pub next_step_on_success: StepId,
    /// Step that follows a decline, or `TERMINAL` to stay.
    pub next_step_on_decline: StepId,
    /// Whether a decline keeps the conversation going.
    pub continue_conversation: bool,
    /// The step waits for a numeric answer.
    pub awaiting_number: bool,
    /// Exact answer for trivia steps.
    pub expected_number: String,
    /// The step waits for a numbered choice.
    pub awaiting_choice: bool,
    /// Accepted choices.
    pub valid_choices: Vec<u32>,
    /// Destination for each valid choice.
    pub choice_routes: BTreeMap<u32, StepId>,
    /// Shown for a choice outside `valid_choices`; the prompt is used if empty.
    pub invalid_choice_message: String,
    /// Prefixed to the prompt after a wrong number.
    pub wrong_number_prefix: String,
    /// Shown when agreeing is not what this step wants.
    pub wrong_plus_message: String,
    /// Shown when declining is not what this step wants.
    pub wrong_minus_message: String,
    /// Lockout applied after a wrong answer or decline. Zero for none.
    pub timeout_minutes: u32,
    /// Non-empty for age-branching steps.
    pub age_brackets: Vec<AgeBracket>,
    /// Permission requested when the user agrees.
    pub request_permission: Option<PermissionKind>,
    /// Delay before a monologue step moves on by itself. Zero for none.
    pub auto_progress_delay_ms: u64,
    /// Mini-game handed the input while this step is active.
    pub mini_game: Option<MiniGameSpec>,
    /// Countdown that takes the decline path when it runs out. Zero for none.
    pub countdown_seconds: u32,
    /// Actions applied when the step is entered.
    pub on_enter: Vec<StepAction>,
    /// Actions applied on the success path.
    pub on_success: Vec<StepAction>,
    /// Actions applied on the decline path.
    pub on_decline: Vec<StepAction>,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            prompt_message: String::new(),
            success_message: String::new(),
            decline_message: String::new(),
            next_step_on_success: TERMINAL,
            next_step_on_decline: TERMINAL,
            continue_conversation: true,
            awaiting_number: false,
            expected_number: String::new(),
            awaiting_choice: false,
            valid_choices: Vec::new(),
            choice_routes: BTreeMap::new(),
            invalid_choice_message: String::new(),
            wrong_number_prefix: String::new(),
            wrong_plus_message: String::new(),
            wrong_minus_message: String::new(),
            timeout_minutes: 0,
            age_brackets: Vec::new(),
            request_permission: None,
            auto_progress_delay_ms: 0,
            mini_game: None,
            countdown_seconds: 0,
            on_enter: Vec::new(),
            on_success: Vec::new(),
            on_decline: Vec::new(),
        }
    }
}

impl StepConfig {
    /// The safe configuration returned for ids that are not in the graph.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            continue_conversation: false,
            ..Self::default()
        }
    }

    /// Message shown after a wrong numeric answer.
    #[must_use]
    pub fn wrong_number_message(&self) -> String {
        if self.wrong_number_prefix.is_empty() {
            self.prompt_message.clone()
        } else {
            format!("{}{}", self.wrong_number_prefix, self.prompt_message)
        }
    }

    /// Whether numeric answers are bucketed by age.
    #[must_use]
    pub fn is_age_branching(&self) -> bool {
        !self.age_brackets.is_empty()
    }

    /// The bracket `age` falls into.
    #[must_use]
    pub fn age_bracket(&self, age: u32) -> Option<&AgeBracket> {
        self.age_brackets.iter().find(|b| b.contains(age))
    }

    /// Whether this step moves on by itself after its prompt.
    #[must_use]
    pub fn is_monologue(&self) -> bool {
        self.auto_progress_delay_ms > 0
    }

    /// Capability flag used to dispatch special steps.
    #[must_use]
    pub fn special(&self) -> SpecialBehavior {
        if self.is_age_branching() {
            SpecialBehavior::AgeBranching
        } else if self.awaiting_choice {
            SpecialBehavior::ChoiceRouting
        } else if self.mini_game.is_some() {
            SpecialBehavior::MiniGame
        } else if self.request_permission.is_some() {
            SpecialBehavior::PermissionGate
        } else {
            SpecialBehavior::Plain
        }
    }

    /// Every step id this configuration can lead to.
    #[must_use]
    pub fn referenced_steps(&self) -> Vec<StepId> {
        let mut refs = vec![self.next_step_on_success, self.next_step_on_decline];
        refs.extend(self.choice_routes.values().copied());
        refs.extend(self.age_brackets.iter().filter_map(|b| b.next_step));
        if let Some(game) = &self.mini_game {
            refs.push(game.on_success);
            refs.extend(game.on_failure);
        }
        refs
    }
}
