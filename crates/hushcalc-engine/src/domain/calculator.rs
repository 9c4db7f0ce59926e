//! The calculator the story hides behind.
//!
//! Plain four-function arithmetic over decimal strings, evaluated
//! independently of the narrative. The only link to the story is that a
//! completed `=` counts towards awakening and that the number being typed is
//! the answer carried by an agree or decline gesture.

use hushcalc_core::error::DomainError;
use serde::Serialize;

/// Token shown instead of a result that cannot be computed.
pub const ERROR_TOKEN: &str = "Error";

const MAX_FRACTION_DIGITS: usize = 10;
const MAX_ENTRY_LEN: usize = 16;

/// The four operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `×`
    Multiply,
    /// `÷`
    Divide,
}

/// A calculator button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// `0`-`9`.
    Digit(char),
    /// `.`
    Point,
    /// An operator.
    Operator(Operator),
    /// `=`
    Equals,
    /// `C`
    Clear,
    /// `⌫`
    Backspace,
}

impl Key {
    /// Parses a button label.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownButton` for labels the calculator does
    /// not have.
    pub fn parse(label: &str) -> Result<Self, DomainError> {
        let key = match label {
            "." | "," => Self::Point,
            "+" => Self::Operator(Operator::Add),
            "-" | "−" => Self::Operator(Operator::Subtract),
            "*" | "×" | "x" => Self::Operator(Operator::Multiply),
            "/" | "÷" => Self::Operator(Operator::Divide),
            "=" => Self::Equals,
            "C" | "c" | "AC" => Self::Clear,
            "⌫" | "DEL" | "<" => Self::Backspace,
            _ => {
                let mut chars = label.chars();
                match (chars.next(), chars.next()) {
                    (Some(d), None) if d.is_ascii_digit() => Self::Digit(d),
                    _ => return Err(DomainError::UnknownButton(label.to_owned())),
                }
            }
        };
        Ok(key)
    }
}

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CalcResult {
    /// A formatted number.
    Value(String),
    /// Division by zero or an unparsable operand.
    Error,
}

impl CalcResult {
    /// The text shown on the display.
    #[must_use]
    pub fn display(&self) -> &str {
        match self {
            Self::Value(v) => v,
            Self::Error => ERROR_TOKEN,
        }
    }
}

/// Evaluates `lhs op rhs`.
#[must_use]
pub fn evaluate(lhs: &str, op: Operator, rhs: &str) -> CalcResult {
    let (Ok(a), Ok(b)) = (lhs.parse::<f64>(), rhs.parse::<f64>()) else {
        return CalcResult::Error;
    };
    let value = match op {
        Operator::Add => a + b,
        Operator::Subtract => a - b,
        Operator::Multiply => a * b,
        Operator::Divide => {
            if b == 0.0 {
                return CalcResult::Error;
            }
            a / b
        }
    };
    if value.is_finite() {
        CalcResult::Value(format_number(value))
    } else {
        CalcResult::Error
    }
}

/// Formats without trailing zeros, at most ten fractional digits.
#[must_use]
pub fn format_number(value: f64) -> String {
    let text = format!("{value:.precision$}", precision = MAX_FRACTION_DIGITS);
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" || trimmed.is_empty() {
        "0".to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// What a key press did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalcEvent {
    /// The display changed.
    Updated,
    /// `=` completed a calculation.
    Evaluated(CalcResult),
    /// The key had no effect.
    Ignored,
}

/// Entry buffer of the calculator.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Calculator {
    lhs: Option<String>,
    op: Option<Operator>,
    entry: String,
    display: String,
    just_evaluated: bool,
}

impl Calculator {
    /// Text on the display.
    #[must_use]
    pub fn display(&self) -> &str {
        if self.display.is_empty() {
            "0"
        } else {
            &self.display
        }
    }

    /// The number being typed, or the left operand while an operator is
    /// pending.
    #[must_use]
    pub fn pending_input(&self) -> String {
        if !self.entry.is_empty() {
            return self.entry.clone();
        }
        match (&self.lhs, self.op) {
            (Some(lhs), Some(_)) => lhs.clone(),
            _ => String::new(),
        }
    }

    /// Clears everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Handles one key.
    pub fn press(&mut self, key: Key) -> CalcEvent {
        match key {
            Key::Digit(d) => self.push_digit(d),
            Key::Point => self.push_point(),
            Key::Operator(op) => self.push_operator(op),
            Key::Equals => self.equals(),
            Key::Clear => {
                self.clear();
                CalcEvent::Updated
            }
            Key::Backspace => {
                if self.entry.pop().is_some() {
                    self.display.clone_from(&self.entry);
                    CalcEvent::Updated
                } else {
                    CalcEvent::Ignored
                }
            }
        }
    }

    fn push_digit(&mut self, digit: char) -> CalcEvent {
        if self.just_evaluated {
            self.clear();
        }
        if self.entry.len() >= MAX_ENTRY_LEN {
            return CalcEvent::Ignored;
        }
        if self.entry == "0" {
            self.entry.clear();
        }
        self.entry.push(digit);
        self.display.clone_from(&self.entry);
        CalcEvent::Updated
    }

    fn push_point(&mut self) -> CalcEvent {
        if self.just_evaluated {
            self.clear();
        }
        if self.entry.contains('.') {
            return CalcEvent::Ignored;
        }
        if self.entry.is_empty() {
            self.entry.push('0');
        }
        self.entry.push('.');
        self.display.clone_from(&self.entry);
        CalcEvent::Updated
    }

    fn push_operator(&mut self, op: Operator) -> CalcEvent {
        if self.entry.is_empty() {
            if self.lhs.is_some() {
                self.op = Some(op);
                return CalcEvent::Updated;
            }
            if self.just_evaluated && self.display != ERROR_TOKEN {
                self.lhs = Some(self.display.clone());
                self.op = Some(op);
                self.just_evaluated = false;
                return CalcEvent::Updated;
            }
            return CalcEvent::Ignored;
        }

        let left = match (self.lhs.take(), self.op) {
            (Some(lhs), Some(pending)) => match evaluate(&lhs, pending, &self.entry) {
                CalcResult::Value(v) => v,
                CalcResult::Error => {
                    self.clear();
                    self.display = ERROR_TOKEN.to_owned();
                    return CalcEvent::Updated;
                }
            },
            _ => std::mem::take(&mut self.entry),
        };
        self.entry.clear();
        self.display.clone_from(&left);
        self.lhs = Some(left);
        self.op = Some(op);
        self.just_evaluated = false;
        CalcEvent::Updated
    }

    fn equals(&mut self) -> CalcEvent {
        let (Some(lhs), Some(op)) = (self.lhs.clone(), self.op) else {
            return CalcEvent::Ignored;
        };
        if self.entry.is_empty() {
            return CalcEvent::Ignored;
        }
        let result = evaluate(&lhs, op, &self.entry);
        self.lhs = None;
        self.op = None;
        self.entry.clear();
        self.display = result.display().to_owned();
        self.just_evaluated = true;
        CalcEvent::Evaluated(result)
    }
}
