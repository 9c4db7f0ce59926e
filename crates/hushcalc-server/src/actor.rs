//! The session actor.
//!
//! A `Session` is not shared: one task owns it, applies commands in arrival
//! order and ticks it on a fixed interval. Handlers hold a cloneable
//! `SessionHandle` and wait for the reply.

use std::time::Duration;

use hushcalc_core::error::DomainError;
use hushcalc_engine::application::session::{Session, SessionView};
use hushcalc_minigames::MiniGameInput;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug)]
enum Command {
    View(Reply<SessionView>),
    Press(String, Reply<Result<SessionView, DomainError>>),
    SetMuted(bool, Reply<SessionView>),
    MiniGame(MiniGameInput, Reply<Result<SessionView, DomainError>>),
    Reset(Reply<Result<SessionView, DomainError>>),
    Restart(Reply<Result<SessionView, DomainError>>),
}

/// Cloneable access to the running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Spawns the actor task. The session is started inside the task before
    /// the first command is served.
    #[must_use]
    pub fn spawn(session: Session, tick: Duration) -> Self {
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(run(session, receiver, tick));
        Self { commands }
    }

    /// Current view.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the actor has stopped.
    pub async fn view(&self) -> Result<SessionView, DomainError> {
        self.request(Command::View).await
    }

    /// Presses a calculator button.
    ///
    /// # Errors
    ///
    /// Returns the session's error, or `DomainError::Infrastructure` if the
    /// actor has stopped.
    pub async fn press(&self, label: String) -> Result<SessionView, DomainError> {
        self.request(|reply| Command::Press(label, reply)).await?
    }

    /// Mutes or unmutes the calculator.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the actor has stopped.
    pub async fn set_muted(&self, muted: bool) -> Result<SessionView, DomainError> {
        self.request(|reply| Command::SetMuted(muted, reply)).await
    }

    /// Sends input to the active mini-game.
    ///
    /// # Errors
    ///
    /// Returns the session's error, or `DomainError::Infrastructure` if the
    /// actor has stopped.
    pub async fn mini_game_input(&self, input: MiniGameInput) -> Result<SessionView, DomainError> {
        self.request(|reply| Command::MiniGame(input, reply)).await?
    }

    /// Forgets all progress.
    ///
    /// # Errors
    ///
    /// Returns the session's error, or `DomainError::Infrastructure` if the
    /// actor has stopped.
    pub async fn reset(&self) -> Result<SessionView, DomainError> {
        self.request(Command::Reset).await?
    }

    /// Saves and reloads the session.
    ///
    /// # Errors
    ///
    /// Returns the session's error, or `DomainError::Infrastructure` if the
    /// actor has stopped.
    pub async fn restart(&self) -> Result<SessionView, DomainError> {
        self.request(Command::Restart).await?
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, DomainError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| stopped())?;
        response.await.map_err(|_| stopped())
    }
}

fn stopped() -> DomainError {
    DomainError::Infrastructure("session actor has stopped".into())
}

async fn run(mut session: Session, mut commands: mpsc::Receiver<Command>, tick: Duration) {
    session.start().await;
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => apply(&mut session, command).await,
                None => break,
            },
            _ = ticker.tick() => session.tick().await,
        }
    }
    info!("all session handles dropped, actor stopped");
}

// A dropped receiver means the caller gave up; the command has still been
// applied, so the reply is discarded.
async fn apply(session: &mut Session, command: Command) {
    debug!(?command, "session command");
    match command {
        Command::View(reply) => {
            let _ = reply.send(session.view());
        }
        Command::Press(label, reply) => {
            let _ = reply.send(session.press(&label).await);
        }
        Command::SetMuted(muted, reply) => {
            let _ = reply.send(session.set_muted(muted).await);
        }
        Command::MiniGame(input, reply) => {
            let _ = reply.send(session.mini_game_input(input).await);
        }
        Command::Reset(reply) => {
            let _ = reply.send(session.reset().await);
        }
        Command::Restart(reply) => {
            let _ = reply.send(session.restart().await);
        }
    }
}
