//! End-to-end scenarios through `Session`, with a manual clock.

use std::sync::Arc;

use chrono::Duration;
use hushcalc_core::repository::{KeySpace, StoredValue};
use hushcalc_engine::application::session::{Session, SessionPorts};
use hushcalc_story::StepGraph;
use hushcalc_story::step::StepId;
use hushcalc_test_support::{
    InMemoryKeyValueStore, ManualClock, MockRng, RecordedCapability, RecordingCapabilities,
    RecordingPresenter, test_epoch,
};

struct Harness {
    session: Session,
    clock: Arc<ManualClock>,
    presenter: Arc<RecordingPresenter>,
    capabilities: Arc<RecordingCapabilities>,
    store: Arc<InMemoryKeyValueStore>,
}

impl Harness {
    async fn with_entries(entries: KeySpace) -> Self {
        let clock = Arc::new(ManualClock::new(test_epoch()));
        let presenter = Arc::new(RecordingPresenter::default());
        let capabilities = Arc::new(RecordingCapabilities::new(false));
        let store = Arc::new(InMemoryKeyValueStore::with_entries(entries));
        let ports = SessionPorts {
            presenter: presenter.clone(),
            capabilities: capabilities.clone(),
            clock: clock.clone(),
            store: store.clone(),
        };
        let graph = Arc::new(StepGraph::embedded().clone());
        let mut session = Session::new(graph, ports, Box::new(MockRng));
        session.start().await;
        Self {
            session,
            clock,
            presenter,
            capabilities,
            store,
        }
    }

    async fn fresh() -> Self {
        Self::with_entries(KeySpace::new()).await
    }

    async fn at_step(step: StepId) -> Self {
        let mut entries = KeySpace::new();
        entries.insert("conversationStep".to_owned(), StoredValue::Int(i64::from(step)));
        entries.insert("inConversation".to_owned(), StoredValue::Bool(true));
        Self::with_entries(entries).await
    }

    async fn press_all(&mut self, labels: &[&str]) {
        for label in labels {
            self.session.press(label).await.unwrap();
        }
    }

    async fn wait(&mut self, seconds: i64) {
        self.clock.advance(Duration::seconds(seconds));
        self.session.tick().await;
    }
}

fn prompt(step: StepId) -> String {
    StepGraph::embedded().get(step).prompt_message.clone()
}

#[tokio::test]
async fn test_thirteen_calculations_wake_the_calculator() {
    // Arrange
    let mut h = Harness::fresh().await;

    // Act
    for _ in 0..13 {
        h.press_all(&["1", "+", "1", "="]).await;
        h.clock.advance(Duration::seconds(1));
    }

    // Assert
    let state = h.session.state();
    assert!(state.in_conversation);
    assert_eq!(state.current_step, 0);
    assert_eq!(state.last_message, prompt(0));
    assert_eq!(state.total_calculations, 13);
    assert_eq!(h.session.view().display, "2");
    assert_eq!(
        h.presenter.last_message(),
        Some((String::new(), true))
    );

    h.wait(10).await;
    assert_eq!(h.presenter.last_message(), Some((prompt(0), false)));
}

#[tokio::test]
async fn test_correct_answer_advances_once_typing_finishes() {
    // Arrange
    let mut h = Harness::at_step(3).await;

    // Act
    h.press_all(&["1", "6", "2", "3", "+", "+"]).await;

    // Assert
    let success = StepGraph::embedded().get(3).success_message.clone();
    assert_eq!(h.session.state().last_message, success);
    assert_eq!(h.session.state().current_step, 3);
    assert_eq!(h.presenter.last_message(), Some((String::new(), true)));
    assert_eq!(h.session.view().display, "0");

    h.wait(10).await;
    assert_eq!(h.session.state().current_step, 4);
    assert_eq!(h.session.state().last_message, prompt(4));
}

#[tokio::test]
async fn test_wrong_answer_repeats_the_question() {
    let mut h = Harness::at_step(4).await;

    h.press_all(&["1", "6", "2", "4", "+", "+"]).await;
    h.wait(10).await;

    assert_eq!(h.session.state().current_step, 4);
    assert_eq!(
        h.session.state().last_message,
        "Not quite. Try the internet - heard it's amazing. When did he start ruling Vietnam?"
    );
}

#[tokio::test]
async fn test_slow_presses_are_arithmetic_not_gestures() {
    let mut h = Harness::at_step(3).await;

    h.press_all(&["1", "6", "2", "3", "+"]).await;
    h.clock.advance(Duration::milliseconds(600));
    h.press_all(&["+"]).await;

    assert_eq!(h.session.state().current_step, 3);
    assert_eq!(h.session.state().last_message, prompt(3));
    assert!(h.session.state().awaiting_number);
}

#[tokio::test]
async fn test_whack_a_mole_failure_routes_to_retry_step() {
    // Arrange
    let mut h = Harness::at_step(30).await;
    h.press_all(&["+", "+"]).await;
    h.wait(5).await;
    assert_eq!(h.session.state().current_step, 31);
    assert!(!h.session.view().mini_game.is_null());

    // Act
    h.press_all(&["9", "9", "9"]).await;

    // Assert
    assert_eq!(h.session.state().current_step, 33);
    assert!(h.session.state().active_mini_game.is_none());
    assert!(h.session.view().mini_game.is_null());
    assert_eq!(
        h.presenter.mini_game_payloads().last(),
        Some(&serde_json::Value::Null)
    );
}

#[tokio::test]
async fn test_mute_halts_typing_and_unmute_retypes_the_prompt() {
    // Arrange
    let mut h = Harness::at_step(3).await;
    h.clock.advance_millis(200);
    h.session.tick().await;
    assert_eq!(h.presenter.last_message().map(|m| m.1), Some(true));

    // Act
    h.session.set_muted(true).await;
    let frames_when_muted = h.presenter.messages().len();
    h.wait(5).await;
    let frames_while_muted = h.presenter.messages().len();
    let view = h.session.set_muted(false).await;

    // Assert
    assert_eq!(
        h.presenter.messages()[frames_when_muted - 1],
        (String::new(), false)
    );
    assert_eq!(frames_while_muted, frames_when_muted);
    assert_eq!(view.step, 3);
    assert!(!view.muted);
    assert_eq!(h.presenter.last_message(), Some((String::new(), true)));

    h.wait(10).await;
    assert_eq!(h.presenter.last_message(), Some((prompt(3), false)));
}

#[tokio::test]
async fn test_pending_transition_survives_mute_and_fires_after_unmute() {
    // Arrange
    let mut h = Harness::at_step(3).await;
    h.press_all(&["1", "6", "2", "3", "+", "+"]).await;
    let success = StepGraph::embedded().get(3).success_message.clone();

    // Act
    h.session.set_muted(true).await;
    h.wait(10).await;
    let step_while_muted = h.session.state().current_step;
    h.session.set_muted(false).await;

    // Assert
    assert_eq!(step_while_muted, 3);
    assert_eq!(h.session.state().last_message, success);
    assert_eq!(h.presenter.last_message(), Some((String::new(), true)));

    h.wait(10).await;
    assert_eq!(h.session.state().current_step, 4);
    assert_eq!(h.session.state().last_message, prompt(4));
}

#[tokio::test]
async fn test_light_show_leaves_the_three_to_type() {
    // Arrange
    let mut h = Harness::at_step(90).await;
    h.press_all(&["+", "+"]).await;
    for _ in 0..3 {
        h.wait(10).await;
    }
    assert_eq!(h.session.state().current_step, 92);
    assert!(h.session.state().dark_buttons.contains("1"));
    assert!(!h.session.state().dark_buttons.contains("3"));

    // Act
    h.press_all(&["3"]).await;
    let display = h.session.view().display;
    h.press_all(&["+", "+"]).await;

    // Assert
    assert_eq!(display, "3");
    assert_eq!(
        h.session.state().last_message,
        StepGraph::embedded().get(92).success_message
    );
    h.wait(10).await;
    assert_eq!(h.session.state().current_step, 93);
    assert!(h.session.state().dark_buttons.is_empty());
}

#[tokio::test]
async fn test_muted_calculator_still_calculates() {
    let mut h = Harness::at_step(3).await;
    h.session.set_muted(true).await;

    h.press_all(&["6", "×", "7", "="]).await;

    assert_eq!(h.session.view().display, "42");
    assert_eq!(h.session.state().total_calculations, 1);
}

#[tokio::test]
async fn test_restart_resumes_at_a_safe_step() {
    // Arrange
    let mut entries = KeySpace::new();
    entries.insert("conversationStep".to_owned(), StoredValue::Int(97));
    entries.insert("inConversation".to_owned(), StoredValue::Bool(true));
    entries.insert("invertedColors".to_owned(), StoredValue::Bool(true));

    // Act
    let h = Harness::with_entries(entries).await;

    // Assert
    assert_eq!(h.session.state().current_step, 96);
    assert_eq!(h.session.state().last_message, prompt(96));
    assert!(h.session.view().visual.inverted_colors);
}

#[tokio::test]
async fn test_progress_is_saved_after_each_accepted_step() {
    let mut h = Harness::at_step(3).await;

    h.press_all(&["1", "6", "2", "3", "+", "+"]).await;
    h.wait(10).await;

    let saved = h.store.snapshot();
    assert_eq!(saved.get("conversationStep"), Some(&StoredValue::Int(4)));
    assert_eq!(saved.get("inConversation"), Some(&StoredValue::Bool(true)));
}

#[tokio::test]
async fn test_broken_minus_swallows_presses_with_a_pulse() {
    let mut entries = KeySpace::new();
    entries.insert("conversationStep".to_owned(), StoredValue::Int(39));
    entries.insert("inConversation".to_owned(), StoredValue::Bool(true));
    entries.insert("minusBroken".to_owned(), StoredValue::Bool(true));
    let mut h = Harness::with_entries(entries).await;

    h.press_all(&["-", "-"]).await;

    assert_eq!(h.session.state().current_step, 39);
    assert_eq!(h.session.state().last_message, prompt(39));
    let pulses = h
        .capabilities
        .calls()
        .into_iter()
        .filter(|c| matches!(c, RecordedCapability::Haptic(..)))
        .count();
    assert_eq!(pulses, 2);
}

#[tokio::test]
async fn test_dark_buttons_do_nothing() {
    let mut entries = KeySpace::new();
    entries.insert("darkButtons".to_owned(), StoredValue::Text("7,8,9".to_owned()));
    let mut h = Harness::with_entries(entries).await;

    h.press_all(&["7", "1"]).await;

    assert_eq!(h.session.view().display, "1");
}

#[tokio::test]
async fn test_denied_permission_takes_the_decline_path() {
    // Arrange
    let mut h = Harness::at_step(14).await;

    // Act
    h.press_all(&["+", "+"]).await;

    // Assert
    assert_eq!(
        h.capabilities.calls(),
        vec![RecordedCapability::Permission(
            hushcalc_core::ports::PermissionKind::Notifications,
            false
        )]
    );
    assert_eq!(
        h.session.state().last_message,
        StepGraph::embedded().get(14).decline_message
    );
    h.wait(10).await;
    assert_eq!(h.session.state().current_step, 15);
}

#[tokio::test]
async fn test_countdown_runs_out_into_the_decline_path() {
    // Arrange
    let mut h = Harness::at_step(65).await;
    h.press_all(&["+", "+"]).await;
    for _ in 0..3 {
        h.wait(10).await;
    }
    assert_eq!(h.session.state().current_step, 67);
    assert_eq!(h.session.view().countdown, Some(10));

    // Act
    for _ in 0..10 {
        h.wait(1).await;
    }

    // Assert
    assert_eq!(
        h.session.state().last_message,
        StepGraph::embedded().get(67).decline_message
    );
    h.wait(10).await;
    assert_eq!(h.session.state().current_step, 69);
}

#[tokio::test]
async fn test_reset_forgets_everything() {
    let mut h = Harness::at_step(40).await;

    let view = h.session.reset().await.unwrap();

    assert!(!view.in_conversation);
    assert_eq!(view.step, 0);
    assert!(h.store.snapshot().is_empty());
}
