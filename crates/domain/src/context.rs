//! Flagged context — the per-session state that rules read and write.
//!
//! A [`Context`] wraps the domain state `S` together with:
//! - named boolean **flags** with an optional time-to-live counted in ticks,
//! - the two **delay timers** the engine arms when a rule becomes current.
//!
//! All countdowns advance in [`Context::tick`], exactly once per time step,
//! never from the wall clock.

use std::collections::HashMap;

use crate::id::SessionId;

/// Shared mutable state for one automation session.
#[derive(Debug)]
pub struct Context<S> {
    session: SessionId,
    state: S,
    /// `None` never expires, `Some(n)` is removed after `n` more ticks.
    flags: HashMap<String, Option<u32>>,
    delay_timer: u32,
    min_delay_timer: u32,
}

impl<S> Context<S> {
    /// Create a context for a fresh session around the given domain state.
    pub fn new(state: S) -> Self {
        Self {
            session: SessionId::new(),
            state,
            flags: HashMap::new(),
            delay_timer: 0,
            min_delay_timer: 0,
        }
    }

    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Read-only access to the domain state.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Mutable access to the domain state.
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Advance one time step: expire flags and count down both delay timers.
    pub fn tick(&mut self) {
        self.flags.retain(|_, remaining| match remaining {
            None => true,
            Some(ticks) => {
                *ticks = ticks.saturating_sub(1);
                *ticks > 0
            }
        });
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.min_delay_timer = self.min_delay_timer.saturating_sub(1);
    }

    /// Whether `name` is currently set.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    /// Set or clear a flag.
    ///
    /// Setting `false` removes the flag. `ttl_ticks == 0` keeps it set until
    /// it is explicitly cleared; otherwise it reads `true` until the
    /// `ttl_ticks`-th following [`tick`](Self::tick).
    pub fn set_flag(&mut self, name: impl Into<String>, value: bool, ttl_ticks: u32) {
        let name = name.into();
        if value {
            let remaining = (ttl_ticks > 0).then_some(ttl_ticks);
            self.flags.insert(name, remaining);
        } else {
            self.flags.remove(&name);
        }
    }

    /// Remove a flag regardless of its remaining lifetime.
    pub fn clear(&mut self, name: &str) {
        self.flags.remove(name);
    }

    /// Remaining ticks for a flag, `Some(0)` meaning it never expires.
    #[must_use]
    pub fn flag_ttl(&self, name: &str) -> Option<u32> {
        self.flags.get(name).map(|remaining| remaining.unwrap_or(0))
    }

    #[must_use]
    pub fn delay_timer(&self) -> u32 {
        self.delay_timer
    }

    #[must_use]
    pub fn min_delay_timer(&self) -> u32 {
        self.min_delay_timer
    }

    pub fn set_delay_timer(&mut self, ticks: u32) {
        self.delay_timer = ticks;
    }

    pub fn set_min_delay_timer(&mut self, ticks: u32) {
        self.min_delay_timer = ticks;
    }
}

impl<S: Default> Default for Context<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}
