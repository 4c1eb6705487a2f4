//! Fallback timer for environments without proximity observation.
//!
//! Trades the performance benefit for visibility: after a fixed delay
//! every candidate still holding a recorded source is activated, in
//! candidate-set order, regardless of where it sits on the page.

use crate::element::{CandidateSet, ImageElement};
use crate::error::LazyError;
use crate::placeholder::activate;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info};

/// One-shot deferred task scheduling.
pub trait Scheduler {
    /// Run `task` once after `delay`. Must return without blocking.
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Result<(), LazyError>;
}

/// Timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Not scheduled yet
    Idle,
    /// Scheduled, waiting for the delay to elapse
    Armed,
    /// Fired; holds the number of elements it activated
    Fired { activated: usize },
}

/// Activates the whole candidate set once, after a delay.
#[derive(Clone)]
pub struct FallbackTimer<E> {
    candidates: CandidateSet<E>,
    delay: Duration,
    state: Rc<Cell<TimerState>>,
}

impl<E: ImageElement + 'static> FallbackTimer<E> {
    pub fn new(candidates: CandidateSet<E>, delay: Duration) -> Self {
        Self {
            candidates,
            delay,
            state: Rc::new(Cell::new(TimerState::Idle)),
        }
    }

    /// Schedule the single deferred activation.
    ///
    /// Arming an already armed or fired timer does nothing.
    pub fn arm<S: Scheduler + ?Sized>(&self, scheduler: &S) -> Result<(), LazyError> {
        if self.state.get() != TimerState::Idle {
            return Ok(());
        }

        let timer = self.clone();
        scheduler.schedule(self.delay, Box::new(move || {
            timer.fire();
        }))?;

        // A scheduler may run zero-delay tasks inline.
        if self.state.get() == TimerState::Idle {
            self.state.set(TimerState::Armed);
        }
        debug!("Fallback timer armed for {:?}", self.delay);
        Ok(())
    }

    /// Activate every candidate that still holds a recorded source.
    ///
    /// Returns the number activated. Only the first call has an effect.
    pub fn fire(&self) -> usize {
        if let TimerState::Fired { .. } = self.state.get() {
            return 0;
        }

        let activated = self.candidates.iter().filter(|e| activate(*e)).count();
        self.state.set(TimerState::Fired { activated });
        info!(
            "Fallback timer activated {} of {} image(s)",
            activated,
            self.candidates.len()
        );
        activated
    }

    pub fn state(&self) -> TimerState {
        self.state.get()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn candidates(&self) -> &CandidateSet<E> {
        &self.candidates
    }
}
