//! `setTimeout` scheduling.

use crate::dom::describe;
use lazyload_core::{LazyError, Scheduler};
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Window;

/// Schedules one-shot tasks on the window's timer queue.
pub struct WindowScheduler {
    window: Window,
}

impl WindowScheduler {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl Scheduler for WindowScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Result<(), LazyError> {
        let millis = timeout_millis(delay)?;
        let callback = Closure::once_into_js(move || task());
        self.window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), millis)
            .map_err(|e| LazyError::Scheduler(describe(&e)))?;
        Ok(())
    }
}

/// Browsers take a signed 32-bit millisecond delay.
fn timeout_millis(delay: Duration) -> Result<i32, LazyError> {
    i32::try_from(delay.as_millis())
        .map_err(|_| LazyError::Scheduler(format!("delay of {:?} is out of timer range", delay)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_range() {
        assert_eq!(timeout_millis(Duration::from_millis(1000)).unwrap(), 1000);
        assert_eq!(timeout_millis(Duration::ZERO).unwrap(), 0);
        assert!(timeout_millis(Duration::from_millis(i32::MAX as u64 + 1)).is_err());
    }
}
