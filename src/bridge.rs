use crate::engine::{FrameScheduler, ParticleEngine};
use crate::player::BackgroundMusic;
use crate::surface::{CELL_HEIGHT_PX, CELL_WIDTH_PX};
use crossterm::event::KeyCode;
use rand::Rng;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};

pub const PRIMARY_BURST: usize = 50;
pub const AFFIRMATIVE_BURST: usize = 36;

/// Pulse: scale 1 -> 1.06 -> 1
pub const PULSE_DURATION: Duration = Duration::from_millis(350);
pub const PULSE_PEAK_SCALE: f32 = 1.06;

/// A clickable element on the page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Control {
    /// Hit area in terminal cells
    pub area: Rect,
    /// `aria-pressed` mirror
    pub activated: bool,
}

impl Control {
    pub fn new(area: Rect) -> Self {
        Self {
            area,
            activated: false,
        }
    }

    /// Center in logical pixels
    pub fn center(&self) -> (f32, f32) {
        let x = (self.area.x as f32 + self.area.width as f32 / 2.0) * CELL_WIDTH_PX;
        let y = (self.area.y as f32 + self.area.height as f32 / 2.0) * CELL_HEIGHT_PX;
        (x, y)
    }

    pub fn contains(&self, column: u16, row: u16) -> bool {
        column >= self.area.x
            && column < self.area.x.saturating_add(self.area.width)
            && row >= self.area.y
            && row < self.area.y.saturating_add(self.area.height)
    }
}

/// Cosmetic scale animation on an affirmative control
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    started: Instant,
}

impl Pulse {
    pub fn start(now: Instant) -> Self {
        Self { started: now }
    }

    /// Current scale factor, back to exactly 1.0 once finished
    pub fn scale(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed >= PULSE_DURATION {
            return 1.0;
        }
        let t = ease_out(elapsed.as_secs_f32() / PULSE_DURATION.as_secs_f32());
        // Two linear keyframe segments meeting at the peak
        let toward_peak = if t < 0.5 { t * 2.0 } else { (1.0 - t) * 2.0 };
        1.0 + (PULSE_PEAK_SCALE - 1.0) * toward_peak
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= PULSE_DURATION
    }
}

/// CSS `ease-out`, i.e. cubic-bezier(0, 0, 0.58, 1)
fn ease_out(t: f32) -> f32 {
    const X1: f32 = 0.0;
    const X2: f32 = 0.58;
    let bezier = |p1: f32, p2: f32, s: f32| {
        let inv = 1.0 - s;
        3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
    };

    let t = t.clamp(0.0, 1.0);
    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    for _ in 0..24 {
        let mid = (lo + hi) / 2.0;
        if bezier(X1, X2, mid) < t {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    bezier(0.0, 1.0, (lo + hi) / 2.0)
}

/// Binds the envelope and the "yes" buttons to confetti and music
#[derive(Debug, Default)]
pub struct InteractionBridge {
    pub primary: Option<Control>,
    pub affirmatives: Vec<Control>,
    pulses: Vec<Option<Pulse>>,
    pub primary_burst: usize,
    pub affirmative_burst: usize,
}

impl InteractionBridge {
    pub fn new(primary: Option<Control>, affirmatives: Vec<Control>) -> Self {
        let pulses = vec![None; affirmatives.len()];
        Self {
            primary,
            affirmatives,
            pulses,
            primary_burst: PRIMARY_BURST,
            affirmative_burst: AFFIRMATIVE_BURST,
        }
    }

    /// Move controls after a layout change, keeping their pressed state
    pub fn relayout(&mut self, primary: Option<Rect>, affirmatives: &[Rect]) {
        self.primary = match (self.primary.take(), primary) {
            (Some(mut control), Some(area)) => {
                control.area = area;
                Some(control)
            }
            (None, Some(area)) => Some(Control::new(area)),
            (_, None) => None,
        };
        self.affirmatives.resize_with(affirmatives.len(), Control::default);
        for (control, area) in self.affirmatives.iter_mut().zip(affirmatives) {
            control.area = *area;
        }
        self.pulses.resize(affirmatives.len(), None);
    }

    /// Envelope activation: press, burst from its center, then try to start music
    pub fn activate_primary<R: Rng>(
        &mut self,
        engine: &mut ParticleEngine<R>,
        scheduler: &mut impl FrameScheduler,
        music: &mut impl BackgroundMusic,
    ) {
        let Some(control) = self.primary.as_mut() else {
            return;
        };
        control.activated = true;
        let (x, y) = control.center();
        engine.spawn_burst(x, y, self.primary_burst, scheduler);
        // Runs inside the user gesture so autoplay policies let it through
        music.try_start_background_music();
    }

    /// Keyboard activation of the envelope. Returns true when the key was
    /// consumed and its default action must not run.
    pub fn primary_key<R: Rng>(
        &mut self,
        key: KeyCode,
        engine: &mut ParticleEngine<R>,
        scheduler: &mut impl FrameScheduler,
        music: &mut impl BackgroundMusic,
    ) -> bool {
        match key {
            KeyCode::Enter | KeyCode::Char(' ') if self.primary.is_some() => {
                self.activate_primary(engine, scheduler, music);
                true
            }
            _ => false,
        }
    }

    pub fn activate_affirmative<R: Rng>(
        &mut self,
        index: usize,
        engine: &mut ParticleEngine<R>,
        scheduler: &mut impl FrameScheduler,
        now: Instant,
    ) {
        let Some(control) = self.affirmatives.get(index) else {
            return;
        };
        let (x, y) = control.center();
        engine.spawn_burst(x, y, self.affirmative_burst, scheduler);
        if let Some(slot) = self.pulses.get_mut(index) {
            *slot = Some(Pulse::start(now));
        }
    }

    /// Scale to draw affirmative control `index` with
    pub fn affirmative_scale(&self, index: usize, now: Instant) -> f32 {
        self.pulses
            .get(index)
            .copied()
            .flatten()
            .map_or(1.0, |pulse| pulse.scale(now))
    }

    /// Drop finished pulses
    pub fn prune_pulses(&mut self, now: Instant) {
        for slot in &mut self.pulses {
            if slot.is_some_and(|p| p.is_finished(now)) {
                *slot = None;
            }
        }
    }

    pub fn primary_activated(&self) -> bool {
        self.primary.as_ref().is_some_and(|c| c.activated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayOutcome;
    use crate::surface::Viewport;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Default)]
    struct Frames(usize);

    impl FrameScheduler for Frames {
        fn request_frame(&mut self) {
            self.0 += 1;
        }
    }

    #[derive(Default)]
    struct Music {
        attempts: usize,
    }

    impl BackgroundMusic for Music {
        fn try_start_background_music(&mut self) -> PlayOutcome {
            self.attempts += 1;
            PlayOutcome { started: false }
        }
    }

    fn engine(reduced_motion: bool) -> ParticleEngine<StdRng> {
        ParticleEngine::with_rng(Viewport::from_cells(80, 30), reduced_motion, StdRng::seed_from_u64(3))
    }

    fn bridge() -> InteractionBridge {
        InteractionBridge::new(
            Some(Control::new(Rect::new(10, 2, 20, 5))),
            vec![Control::new(Rect::new(4, 12, 10, 3)), Control::new(Rect::new(20, 12, 10, 3))],
        )
    }

    #[test]
    fn test_control_center_in_logical_pixels() {
        let control = Control::new(Rect::new(10, 2, 20, 5));
        assert_eq!(control.center(), (160.0, 72.0));
        assert!(control.contains(10, 2));
        assert!(control.contains(29, 6));
        assert!(!control.contains(30, 6));
        assert!(!control.contains(10, 7));
    }

    #[test]
    fn test_primary_activation() {
        let mut bridge = bridge();
        let mut engine = engine(false);
        let mut frames = Frames::default();
        let mut music = Music::default();

        bridge.activate_primary(&mut engine, &mut frames, &mut music);
        assert!(bridge.primary_activated());
        assert_eq!(engine.live_count(), PRIMARY_BURST);
        assert_eq!(music.attempts, 1);
        for p in engine.particles() {
            assert!((140.0..=180.0).contains(&p.x));
            assert!((62.0..=82.0).contains(&p.y));
        }
    }

    #[test]
    fn test_enter_and_space_activate_primary() {
        let mut bridge = bridge();
        let mut engine = engine(false);
        let mut frames = Frames::default();
        let mut music = Music::default();

        assert!(bridge.primary_key(KeyCode::Enter, &mut engine, &mut frames, &mut music));
        assert!(bridge.primary_key(KeyCode::Char(' '), &mut engine, &mut frames, &mut music));
        assert!(!bridge.primary_key(KeyCode::Char('x'), &mut engine, &mut frames, &mut music));
        assert_eq!(engine.live_count(), 2 * PRIMARY_BURST);
        assert_eq!(music.attempts, 2);
    }

    #[test]
    fn test_music_still_attempted_with_reduced_motion() {
        let mut bridge = bridge();
        let mut engine = engine(true);
        let mut frames = Frames::default();
        let mut music = Music::default();

        bridge.activate_primary(&mut engine, &mut frames, &mut music);
        assert_eq!(engine.live_count(), 0);
        assert!(engine.surface().is_none());
        assert_eq!(music.attempts, 1);
    }

    #[test]
    fn test_affirmative_bursts_and_pulses() {
        let mut bridge = bridge();
        let mut engine = engine(false);
        let mut frames = Frames::default();
        let now = Instant::now();

        bridge.activate_affirmative(1, &mut engine, &mut frames, now);
        assert_eq!(engine.live_count(), AFFIRMATIVE_BURST);
        assert_eq!(bridge.affirmative_scale(0, now), 1.0);
        let mid = bridge.affirmative_scale(1, now + Duration::from_millis(100));
        assert!(mid > 1.0 && mid <= PULSE_PEAK_SCALE);

        bridge.prune_pulses(now + PULSE_DURATION);
        assert_eq!(bridge.affirmative_scale(1, now + Duration::from_millis(100)), 1.0);
    }

    #[test]
    fn test_missing_controls_are_no_ops() {
        let mut bridge = InteractionBridge::new(None, Vec::new());
        let mut engine = engine(false);
        let mut frames = Frames::default();
        let mut music = Music::default();

        bridge.activate_primary(&mut engine, &mut frames, &mut music);
        bridge.activate_affirmative(3, &mut engine, &mut frames, Instant::now());
        assert!(!bridge.primary_key(KeyCode::Enter, &mut engine, &mut frames, &mut music));
        assert_eq!(engine.live_count(), 0);
        assert_eq!(music.attempts, 0);
        assert_eq!(frames.0, 0);
    }

    #[test]
    fn test_relayout_keeps_pressed_state() {
        let mut bridge = bridge();
        bridge.primary.as_mut().unwrap().activated = true;
        bridge.relayout(Some(Rect::new(0, 0, 4, 4)), &[Rect::new(1, 1, 2, 2)]);
        assert!(bridge.primary_activated());
        assert_eq!(bridge.primary.as_ref().unwrap().area, Rect::new(0, 0, 4, 4));
        assert_eq!(bridge.affirmatives.len(), 1);
    }

    #[test]
    fn test_pulse_shape() {
        let now = Instant::now();
        let pulse = Pulse::start(now);
        assert_eq!(pulse.scale(now), 1.0);
        assert_eq!(pulse.scale(now + PULSE_DURATION), 1.0);
        assert!(pulse.is_finished(now + PULSE_DURATION));

        let samples: Vec<f32> = (1..35)
            .map(|ms| pulse.scale(now + Duration::from_millis(ms * 10)))
            .collect();
        let peak = samples.iter().cloned().fold(1.0, f32::max);
        assert!(peak > 1.05 && peak <= PULSE_PEAK_SCALE + 1e-6);
        assert!(samples.iter().all(|s| (1.0..=PULSE_PEAK_SCALE + 1e-6).contains(s)));
    }

    #[test]
    fn test_ease_out_endpoints() {
        assert!(ease_out(0.0).abs() < 1e-4);
        assert!((ease_out(1.0) - 1.0).abs() < 1e-4);
        // Fast start: ahead of linear at the midpoint
        assert!(ease_out(0.5) > 0.5);
    }
}
