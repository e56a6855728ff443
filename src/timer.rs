use crate::error::ShellError;
use crate::host::{Clock, Host};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimerState {
    pub start_time: Option<f64>,
    pub elapsed_secs: f64,
    pub running: bool,
}

impl TimerState {
    /// Recompute elapsed time from the start instant while running.
    pub fn poll(&mut self, now_ms: f64) {
        if !self.running {
            return;
        }
        if let Some(start) = self.start_time {
            self.elapsed_secs = ((now_ms - start) / 1000.0).max(0.0);
        }
    }
}

/// Stopwatch behind the `timer` command group.
///
/// While running, a host interval polls the clock and refreshes the shared
/// state; `show` only ever reads what the last poll stored.
pub struct Timer {
    state: Rc<RefCell<TimerState>>,
    interval: Option<i32>,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Timer {
            state: Rc::new(RefCell::new(TimerState::default())),
            interval: None,
        }
    }

    pub fn state(&self) -> TimerState {
        *self.state.borrow()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.state.borrow().elapsed_secs
    }

    pub fn start<H: Host>(
        &mut self,
        host: &mut H,
        clock: &Rc<dyn Clock>,
        period_ms: u32,
    ) -> Result<(), ShellError> {
        self.cancel(host);
        {
            let mut state = self.state.borrow_mut();
            state.start_time = Some(clock.now_ms());
            state.running = true;
        }
        let state = Rc::clone(&self.state);
        let clock = Rc::clone(clock);
        let tick = Box::new(move || state.borrow_mut().poll(clock.now_ms()));
        match host.set_interval(period_ms, tick) {
            Ok(handle) => {
                self.interval = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.state.borrow_mut().running = false;
                Err(err)
            }
        }
    }

    pub fn stop<H: Host>(&mut self, host: &mut H, now_ms: f64) {
        self.cancel(host);
        let mut state = self.state.borrow_mut();
        state.poll(now_ms);
        state.running = false;
    }

    pub fn reset(&mut self, now_ms: f64) {
        let mut state = self.state.borrow_mut();
        state.start_time = Some(now_ms);
        state.elapsed_secs = 0.0;
    }

    fn cancel<H: Host>(&mut self, host: &mut H) {
        if let Some(handle) = self.interval.take() {
            host.clear_interval(handle);
        }
    }
}
