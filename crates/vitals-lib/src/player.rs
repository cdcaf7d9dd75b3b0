use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Idle,
    Playing,
    Finished,
}

/// Cooperative autoplay stepper for the playhead.
///
/// The event loop calls `tick()` once per timer interval; each tick yields
/// the next percent to scrub to. Exactly one driver writes the playhead at a
/// time: direct user input must call `cancel()` before applying its own
/// position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Autoplay {
    state: PlaybackState,
    percent: f64,
    step_percent: f64,
}

impl Default for Autoplay {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl Autoplay {
    pub fn new(step_percent: f64) -> Self {
        Self {
            state: PlaybackState::Idle,
            percent: 0.0,
            step_percent: step_percent.max(f64::MIN_POSITIVE),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Start (or restart) playback from the given position.
    pub fn start(&mut self, from_percent: f64) {
        self.percent = from_percent.clamp(0.0, 100.0);
        self.state = if self.percent >= 100.0 {
            PlaybackState::Finished
        } else {
            PlaybackState::Playing
        };
    }

    /// Stop playback deterministically; the next tick yields nothing.
    pub fn cancel(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Idle;
        }
    }

    /// Advance one step. Returns the percent to scrub to, or `None` once
    /// playback is idle or has run off the end.
    pub fn tick(&mut self) -> Option<f64> {
        if self.state != PlaybackState::Playing {
            return None;
        }
        self.percent = (self.percent + self.step_percent).min(100.0);
        if self.percent >= 100.0 {
            self.state = PlaybackState::Finished;
        }
        Some(self.percent)
    }
}
