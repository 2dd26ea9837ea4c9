//! Connection status indicator
//!
//! Toggles a binary output slowly while connected and quickly otherwise.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, trace};

use crate::protocol::{BLINK_PERIOD_CONNECTED, BLINK_PERIOD_IDLE};
use crate::state::SessionState;

/// Toggle period for the given connection state
pub fn blink_period(connected: bool) -> Duration {
    if connected {
        BLINK_PERIOD_CONNECTED
    } else {
        BLINK_PERIOD_IDLE
    }
}

/// A binary visual output
pub trait StatusLed: Send {
    fn set(&mut self, on: bool);
}

/// LED stand-in that emits each level change as a trace event
#[derive(Debug, Default)]
pub struct TracingLed {
    on: bool,
}

impl TracingLed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl StatusLed for TracingLed {
    fn set(&mut self, on: bool) {
        self.on = on;
        trace!("LED {}", if on { "on" } else { "off" });
    }
}

/// When the indicator loop stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorMode {
    /// Stop once `alive` latches false (central)
    UntilSessionEnds,
    /// Never stop; the peripheral's session has no fatal end
    Forever,
}

pub struct StatusIndicator<L> {
    led: L,
    state: Arc<SessionState>,
    mode: IndicatorMode,
    level: bool,
}

impl<L: StatusLed> StatusIndicator<L> {
    pub fn new(led: L, state: Arc<SessionState>, mode: IndicatorMode) -> Self {
        Self {
            led,
            state,
            mode,
            level: false,
        }
    }

    pub fn mode(&self) -> IndicatorMode {
        self.mode
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    pub async fn run(&mut self) {
        loop {
            if self.mode == IndicatorMode::UntilSessionEnds && !self.state.is_alive() {
                break;
            }
            self.level = !self.level;
            self.led.set(self.level);
            sleep(blink_period(self.state.is_connected())).await;
        }
        self.level = false;
        self.led.set(false);
        debug!("Status indicator stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Clone, Default)]
    struct SharedLed(Arc<Mutex<Vec<(Instant, bool)>>>);

    impl StatusLed for SharedLed {
        fn set(&mut self, on: bool) {
            self.0.lock().unwrap().push((Instant::now(), on));
        }
    }

    impl SharedLed {
        fn gaps(&self) -> Vec<Duration> {
            let events = self.0.lock().unwrap();
            events.windows(2).map(|w| w[1].0 - w[0].0).collect()
        }
    }

    #[test]
    fn test_blink_period() {
        assert_eq!(blink_period(true), Duration::from_millis(1000));
        assert_eq!(blink_period(false), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blinks_fast_while_disconnected() {
        let state = SessionState::shared();
        let led = SharedLed::default();
        let mut indicator =
            StatusIndicator::new(led.clone(), state.clone(), IndicatorMode::Forever);

        let _ = tokio::time::timeout(Duration::from_millis(1100), indicator.run()).await;

        let gaps = led.gaps();
        assert_eq!(gaps.len(), 4);
        assert!(gaps.iter().all(|gap| *gap == Duration::from_millis(250)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blinks_slow_while_connected() {
        let state = SessionState::shared();
        state.set_connected(true);
        let led = SharedLed::default();
        let mut indicator =
            StatusIndicator::new(led.clone(), state.clone(), IndicatorMode::Forever);

        let _ = tokio::time::timeout(Duration::from_millis(3500), indicator.run()).await;

        let gaps = led.gaps();
        assert_eq!(gaps.len(), 3);
        assert!(gaps.iter().all(|gap| *gap == Duration::from_millis(1000)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_and_turns_off_when_session_ends() {
        let state = SessionState::shared();
        let led = SharedLed::default();
        let mut indicator = StatusIndicator::new(
            led.clone(),
            state.clone(),
            IndicatorMode::UntilSessionEnds,
        );

        let terminator = {
            let state = state.clone();
            async move {
                sleep(Duration::from_millis(600)).await;
                state.terminate();
            }
        };
        tokio::join!(indicator.run(), terminator);

        let events = led.0.lock().unwrap();
        let (_, last) = events.last().copied().unwrap();
        assert!(!last);
        assert_eq!(events.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forever_mode_ignores_session_end() {
        let state = SessionState::shared();
        state.terminate();
        let led = SharedLed::default();
        let mut indicator =
            StatusIndicator::new(led.clone(), state.clone(), IndicatorMode::Forever);

        let result = tokio::time::timeout(Duration::from_millis(600), indicator.run()).await;

        assert!(result.is_err());
        assert_eq!(led.0.lock().unwrap().len(), 3);
    }
}
