use crate::player::{MediaElement, MediaEvent, PlayOutcome};
use std::time::Duration;

/// Media time between two consecutive time-update events
const TIME_UPDATE_INTERVAL: f64 = 0.25;

/// Clock-driven stand-in for an audio element. Tracks position only; no audio is produced.
///
/// Playback is refused until a user gesture has been registered, the same
/// way browsers gate autoplay.
#[derive(Debug, Clone)]
pub struct SimulatedTrack {
    pub title: String,
    duration: Option<f64>,
    current_time: f64,
    paused: bool,
    ended: bool,
    muted: bool,
    volume: f32,
    user_activated: bool,
    autoplay_allowed: bool,
    since_time_update: f64,
    events: Vec<MediaEvent>,
}

impl SimulatedTrack {
    pub fn new(title: impl Into<String>, duration: Option<f64>, autoplay_allowed: bool) -> Self {
        Self {
            title: title.into(),
            duration: duration.filter(|d| d.is_finite() && *d > 0.0),
            current_time: 0.0,
            paused: true,
            ended: false,
            muted: false,
            volume: 1.0,
            user_activated: false,
            autoplay_allowed,
            since_time_update: 0.0,
            events: Vec::new(),
        }
    }

    /// Register a user gesture; later play requests are allowed
    pub fn grant_user_activation(&mut self) {
        self.user_activated = true;
    }

    /// Advance the playback clock by wall time `dt`
    pub fn advance(&mut self, dt: Duration) {
        if self.paused {
            return;
        }
        let step = dt.as_secs_f64();
        self.current_time += step;
        self.since_time_update += step;

        if let Some(duration) = self.duration {
            if self.current_time >= duration {
                self.current_time = duration;
                self.paused = true;
                self.ended = true;
                self.since_time_update = 0.0;
                self.events.push(MediaEvent::TimeUpdate);
                self.events.push(MediaEvent::Pause);
                self.events.push(MediaEvent::Ended);
                return;
            }
        }

        if self.since_time_update >= TIME_UPDATE_INTERVAL {
            self.since_time_update = 0.0;
            self.events.push(MediaEvent::TimeUpdate);
        }
    }
}

impl MediaElement for SimulatedTrack {
    fn paused(&self) -> bool {
        self.paused
    }

    fn ended(&self) -> bool {
        self.ended
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        if volume.is_finite() {
            self.volume = volume.clamp(0.0, 1.0);
        }
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        let upper = self.duration.unwrap_or(f64::INFINITY);
        self.current_time = seconds.clamp(0.0, upper);
        if self.current_time < upper {
            self.ended = false;
        }
        self.since_time_update = 0.0;
        self.events.push(MediaEvent::TimeUpdate);
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn play(&mut self) -> PlayOutcome {
        if !(self.user_activated || self.autoplay_allowed) {
            return PlayOutcome { started: false };
        }
        if self.ended {
            self.ended = false;
            self.current_time = 0.0;
            self.events.push(MediaEvent::TimeUpdate);
        }
        if self.paused {
            self.paused = false;
            self.events.push(MediaEvent::Play);
        }
        PlayOutcome { started: true }
    }

    fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.events.push(MediaEvent::Pause);
        }
    }

    fn take_events(&mut self) -> Vec<MediaEvent> {
        std::mem::take(&mut self.events)
    }
}
