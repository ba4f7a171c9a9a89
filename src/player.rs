use crate::prefs::{KeyValueStore, Preferences};
use tracing::{debug, info};

pub const PLAY_GLYPH: &str = "▶";
pub const PAUSE_GLYPH: &str = "⏸";
pub const MUTED_GLYPH: &str = "🔇";
pub const UNMUTED_GLYPH: &str = "🔊";
pub const MUTED_LABEL: &str = "Unmute background music";
pub const UNMUTED_LABEL: &str = "Mute background music";

/// Result of a play request. Rejection (e.g. autoplay policy) is `started: false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayOutcome {
    pub started: bool,
}

/// Lifecycle notifications emitted by a media element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    Play,
    Pause,
    Ended,
    TimeUpdate,
}

/// Audio-capable element that owns the authoritative playback state
pub trait MediaElement {
    fn paused(&self) -> bool;
    fn ended(&self) -> bool;
    fn muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    /// `None` while the duration is unknown
    fn duration(&self) -> Option<f64>;
    fn play(&mut self) -> PlayOutcome;
    fn pause(&mut self);
    /// Drain events queued since the last call
    fn take_events(&mut self) -> Vec<MediaEvent>;
}

/// Command the interaction layer uses to start music on a user gesture
pub trait BackgroundMusic {
    fn try_start_background_music(&mut self) -> PlayOutcome;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayButton {
    pub glyph: &'static str,
}

impl Default for PlayButton {
    fn default() -> Self {
        Self { glyph: PLAY_GLYPH }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MuteButton {
    pub glyph: &'static str,
    pub aria_label: &'static str,
}

impl Default for MuteButton {
    fn default() -> Self {
        Self {
            glyph: UNMUTED_GLYPH,
            aria_label: UNMUTED_LABEL,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeSlider {
    pub value: f32,
}

/// Fill element whose width is a percentage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressFill {
    pub width_pct: f64,
}

/// Persistent player shown on every page
#[derive(Debug, Clone, Default)]
pub struct GlobalWidgets {
    pub play: Option<PlayButton>,
    pub mute: Option<MuteButton>,
    pub volume: Option<VolumeSlider>,
    pub progress: Option<ProgressFill>,
}

impl GlobalWidgets {
    pub fn full() -> Self {
        Self {
            play: Some(PlayButton::default()),
            mute: Some(MuteButton::default()),
            volume: Some(VolumeSlider::default()),
            progress: Some(ProgressFill::default()),
        }
    }
}

/// Player embedded in the greeting page
#[derive(Debug, Clone, Default)]
pub struct PageWidgets {
    pub play: Option<PlayButton>,
    pub progress: Option<ProgressFill>,
    pub has_prev: bool,
    pub has_next: bool,
}

impl PageWidgets {
    pub fn full() -> Self {
        Self {
            play: Some(PlayButton::default()),
            progress: Some(ProgressFill::default()),
            has_prev: true,
            has_next: true,
        }
    }
}

/// Keeps both widget sets and the stored intent in line with the single media element.
///
/// Widgets are projections only: every refresh recomputes them from the
/// element, nothing here caches playback state.
pub struct PlaybackSync<M: MediaElement, S: KeyValueStore> {
    media: Option<M>,
    prefs: Preferences<S>,
    pub global: GlobalWidgets,
    pub page: PageWidgets,
}

impl<M: MediaElement, S: KeyValueStore> PlaybackSync<M, S> {
    /// Wire up the widgets and apply the stored volume
    pub fn new(media: Option<M>, prefs: Preferences<S>, global: GlobalWidgets, page: PageWidgets) -> Self {
        let mut sync = Self {
            media,
            prefs,
            global,
            page,
        };
        sync.init_volume();
        sync
    }

    fn init_volume(&mut self) {
        let start = self.prefs.volume();
        if let Some(media) = self.media.as_mut() {
            media.set_volume(start);
        }
        if let Some(slider) = self.global.volume.as_mut() {
            slider.value = start;
        }
    }

    pub fn media(&self) -> Option<&M> {
        self.media.as_ref()
    }

    pub fn media_mut(&mut self) -> Option<&mut M> {
        self.media.as_mut()
    }

    pub fn prefs(&self) -> &Preferences<S> {
        &self.prefs
    }

    pub fn is_playing(&self) -> bool {
        self.media.as_ref().is_some_and(|m| !m.paused() && !m.ended())
    }

    pub fn is_muted(&self) -> bool {
        self.media.as_ref().is_some_and(|m| m.muted())
    }

    /// `current_time / duration`, or `None` while the duration is unknown or zero
    pub fn progress_fraction(&self) -> Option<f64> {
        let media = self.media.as_ref()?;
        let duration = media.duration().filter(|d| d.is_finite() && *d > 0.0)?;
        Some((media.current_time() / duration).clamp(0.0, 1.0))
    }

    pub fn toggle_play(&mut self) {
        let Some(media) = self.media.as_mut() else {
            return;
        };
        if media.paused() {
            let outcome = media.play();
            if !outcome.started {
                debug!("play request rejected");
            }
            self.prefs.set_playing(true);
        } else {
            media.pause();
            self.prefs.set_playing(false);
        }
        self.update_play_ui();
    }

    pub fn toggle_mute(&mut self) {
        let Some(media) = self.media.as_mut() else {
            return;
        };
        let muted = !media.muted();
        media.set_muted(muted);
        self.prefs.set_muted(muted);
        self.update_mute_ui();
    }

    /// Apply a volume input. Non-numeric input is ignored, the rest is clamped to [0, 1].
    pub fn set_volume(&mut self, value: f32) {
        if !value.is_finite() {
            return;
        }
        let volume = value.clamp(0.0, 1.0);
        if let Some(media) = self.media.as_mut() {
            media.set_volume(volume);
        }
        if let Some(slider) = self.global.volume.as_mut() {
            slider.value = volume;
        }
        self.prefs.set_volume(volume);
    }

    pub fn volume(&self) -> f32 {
        self.media
            .as_ref()
            .map(|m| m.volume())
            .or_else(|| self.global.volume.as_ref().map(|s| s.value))
            .unwrap_or_else(|| self.prefs.volume())
    }

    /// Both skip controls restart the track
    pub fn skip_previous(&mut self) {
        self.restart_track();
    }

    pub fn skip_next(&mut self) {
        self.restart_track();
    }

    fn restart_track(&mut self) {
        if let Some(media) = self.media.as_mut() {
            media.set_current_time(0.0);
        }
    }

    /// Process everything the media element reported since the last call
    pub fn pump_media_events(&mut self) {
        let events = match self.media.as_mut() {
            Some(media) => media.take_events(),
            None => return,
        };
        for event in events {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::TimeUpdate => self.update_progress(),
            MediaEvent::Play => {
                self.update_play_ui();
                self.prefs.set_playing(true);
            }
            MediaEvent::Pause | MediaEvent::Ended => {
                self.update_play_ui();
                self.prefs.set_playing(false);
            }
        }
    }

    /// Reconcile with the stored intent after a (re)load
    pub fn restore_on_load(&mut self) {
        if self.prefs.wants_playing() {
            self.try_start_background_music();
        }
        if self.prefs.wants_muted() {
            if let Some(media) = self.media.as_mut() {
                media.set_muted(true);
            }
        }
        self.update_mute_ui();
        self.update_play_ui();
        self.update_progress();
    }

    fn update_play_ui(&mut self) {
        let glyph = if self.is_playing() {
            PAUSE_GLYPH
        } else {
            PLAY_GLYPH
        };
        if let Some(button) = self.global.play.as_mut() {
            button.glyph = glyph;
        }
        if let Some(button) = self.page.play.as_mut() {
            button.glyph = glyph;
        }
    }

    fn update_mute_ui(&mut self) {
        if self.media.is_none() {
            return;
        }
        let muted = self.is_muted();
        if let Some(button) = self.global.mute.as_mut() {
            if muted {
                button.glyph = MUTED_GLYPH;
                button.aria_label = MUTED_LABEL;
            } else {
                button.glyph = UNMUTED_GLYPH;
                button.aria_label = UNMUTED_LABEL;
            }
        }
    }

    fn update_progress(&mut self) {
        let Some(fraction) = self.progress_fraction() else {
            return;
        };
        let pct = fraction * 100.0;
        if let Some(fill) = self.global.progress.as_mut() {
            fill.width_pct = pct;
        }
        if let Some(fill) = self.page.progress.as_mut() {
            fill.width_pct = pct;
        }
    }
}

impl<M: MediaElement, S: KeyValueStore> BackgroundMusic for PlaybackSync<M, S> {
    /// Always attempts playback, whatever the stored intent says
    fn try_start_background_music(&mut self) -> PlayOutcome {
        let Some(media) = self.media.as_mut() else {
            return PlayOutcome { started: false };
        };
        let outcome = media.play();
        if outcome.started {
            info!("background music started");
        } else {
            debug!("background music blocked until a user gesture");
        }
        self.update_play_ui();
        outcome
    }
}
