//! Paced replay of translated input onto a session.
//!
//! [`KeyReplayer`] turns high-level requests (type this text, click that
//! button, scroll three notches) into primitive calls on an [`InputSink`],
//! sleeping between primitives so the remote side sees distinct events.

use std::sync::Arc;
use std::time::Duration;

use deskbridge_core::{ChordTranslator, KeyAction, KeyPhase, Keysym, MouseButton, ScrollDirection};
use tracing::debug;

use crate::domain::SessionError;

/// Primitive input operations of a session.
///
/// Calls are fire-and-forget: when the session is not ready they are dropped
/// without error.
#[cfg_attr(test, mockall::automock)]
pub trait InputSink: Send + Sync {
    fn is_ready(&self) -> bool;
    fn key_down(&self, symbol: Keysym);
    fn key_up(&self, symbol: Keysym);
    fn mouse_move(&self, x: u16, y: u16);
    fn mouse_down(&self, button: MouseButton);
    fn mouse_up(&self, button: MouseButton);
    fn mouse_scroll(&self, direction: ScrollDirection);
}

pub struct KeyReplayer<S: ?Sized> {
    sink: Arc<S>,
    type_delay: Duration,
    click_delay: Duration,
}

impl<S: InputSink + ?Sized> KeyReplayer<S> {
    pub fn new(sink: Arc<S>, type_delay: Duration, click_delay: Duration) -> Self {
        Self {
            sink,
            type_delay,
            click_delay,
        }
    }

    /// Replays `actions` in order, pausing `type_delay` between consecutive
    /// actions.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotRunning`] if the session is not ready when replay
    /// starts.  If the connection drops midway the remaining actions are
    /// dropped by the sink.
    pub async fn play(&self, actions: &[KeyAction]) -> Result<(), SessionError> {
        self.ensure_ready()?;
        for (i, action) in actions.iter().enumerate() {
            if i > 0 {
                pause(self.type_delay).await;
            }
            match action.phase {
                KeyPhase::Down => self.sink.key_down(action.symbol),
                KeyPhase::Up => self.sink.key_up(action.symbol),
            }
        }
        Ok(())
    }

    /// Translates `text` and replays the result.  Returns the number of
    /// primitive actions sent.
    pub async fn type_text(
        &self,
        translator: &ChordTranslator,
        text: &str,
        key_down: bool,
        key_up: bool,
    ) -> Result<usize, SessionError> {
        let actions = translator.translate(text, key_down, key_up);
        debug!("replaying {} key actions", actions.len());
        self.play(&actions).await?;
        Ok(actions.len())
    }

    /// Presses and releases `button`.
    pub async fn mouse_click(&self, button: MouseButton) -> Result<(), SessionError> {
        self.ensure_ready()?;
        self.sink.mouse_down(button);
        pause(self.click_delay).await;
        self.sink.mouse_up(button);
        Ok(())
    }

    /// Moves the pointer to (`x`, `y`), then clicks `button`.
    pub async fn mouse_click_at(&self, x: u16, y: u16, button: MouseButton) -> Result<(), SessionError> {
        self.ensure_ready()?;
        self.sink.mouse_move(x, y);
        self.mouse_click(button).await
    }

    /// Scrolls `amount` notches in `direction`.  An amount of zero still
    /// scrolls once.
    pub async fn mouse_scroll_by(&self, direction: ScrollDirection, amount: u32) -> Result<(), SessionError> {
        self.ensure_ready()?;
        for i in 0..amount.max(1) {
            if i > 0 {
                pause(self.click_delay).await;
            }
            self.sink.mouse_scroll(direction);
        }
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), SessionError> {
        if self.sink.is_ready() {
            Ok(())
        } else {
            Err(SessionError::NotRunning)
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
