use crate::bridge::{Control, InteractionBridge};
use crate::config::AppConfig;
use crate::countdown::{Countdown, ProceedAction, ProceedGate};
use crate::engine::{FrameScheduler, ParticleEngine};
use crate::media::SimulatedTrack;
use crate::player::{GlobalWidgets, PageWidgets, PlaybackSync};
use crate::prefs::{KeyValueStore, Preferences};
use crate::surface::Viewport;
use crate::ui::{self, PageLayout};
use crossterm::event::KeyCode;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tracing::info;

/// Volume change per key press
pub const VOLUME_STEP: f32 = 0.05;

/// Focusable controls, in Tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Envelope,
    Yes(usize),
    Proceed,
    GlobalPlay,
    GlobalMute,
    Volume,
    Prev,
    PagePlay,
    Next,
}

/// Everything an inline page trigger can ask for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageCommand {
    OpenEnvelope,
    SayYes(usize),
    TogglePlay,
    ToggleMute,
    Previous,
    Next,
    Volume(f32),
    TryProceed,
}

/// Single-slot "before next repaint" queue served by the main loop
#[derive(Debug, Default)]
pub struct FrameRequests {
    pending: bool,
    issued: u64,
}

impl FrameRequests {
    /// Consume the pending request, if any
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }
}

impl FrameScheduler for FrameRequests {
    fn request_frame(&mut self) {
        self.pending = true;
        self.issued += 1;
    }
}

pub type Player = PlaybackSync<SimulatedTrack, Box<dyn KeyValueStore>>;

/// Main application state
pub struct App {
    pub engine: ParticleEngine,
    pub frames: FrameRequests,
    pub bridge: InteractionBridge,
    pub player: Player,
    pub countdown: Countdown<ProceedGate>,
    pub layout: PageLayout,
    pub focus: Focus,
    pub page: u8,
    pub show_help: bool,
    pub help_scroll: u16,
}

impl App {
    /// Build the page for a terminal of `area` and reconcile stored playback intent
    pub fn new(config: &AppConfig, store: Box<dyn KeyValueStore>, area: Rect, now: Instant) -> Self {
        let page = 1;
        let layout = ui::page_layout(area, page);

        let mut bridge = InteractionBridge::new(
            layout.envelope.map(Control::new),
            layout.yes.iter().copied().map(Control::new).collect(),
        );
        bridge.primary_burst = config.primary_burst;
        bridge.affirmative_burst = config.affirmative_burst;

        let track = SimulatedTrack::new(
            config.track_title.clone(),
            config.track_duration(),
            config.allow_autoplay,
        );
        let player = PlaybackSync::new(
            Some(track),
            Preferences::new(store),
            GlobalWidgets::full(),
            PageWidgets::full(),
        );

        let deadline = now
            .checked_add(Duration::from_secs(config.countdown_seconds))
            .unwrap_or(now);
        let countdown = Countdown::with_observer(deadline, Some(ProceedGate::new(false)));

        let mut app = Self {
            engine: ParticleEngine::new(Viewport::from_cells(area.width, area.height), config.reduced_motion),
            frames: FrameRequests::default(),
            bridge,
            player,
            countdown,
            layout,
            focus: Focus::Envelope,
            page,
            show_help: false,
            help_scroll: 0,
        };
        app.countdown.tick(now);
        app.player.restore_on_load();
        app
    }

    /// Advance clocks, drain media events and serve a pending animation frame
    pub fn tick(&mut self, now: Instant, dt: Duration) {
        if let Some(track) = self.player.media_mut() {
            track.advance(dt);
        }
        self.player.pump_media_events();
        self.countdown.tick(now);
        self.bridge.prune_pulses(now);

        if self.frames.take() {
            self.engine.step(&mut self.frames);
        }
    }

    /// A key press or click happened; playback may start from now on
    pub fn register_gesture(&mut self) {
        if let Some(track) = self.player.media_mut() {
            track.grant_user_activation();
        }
    }

    /// Single entry point for page triggers
    pub fn dispatch(&mut self, command: PageCommand, now: Instant) {
        match command {
            PageCommand::OpenEnvelope => {
                self.bridge
                    .activate_primary(&mut self.engine, &mut self.frames, &mut self.player)
            }
            PageCommand::SayYes(index) => {
                self.bridge
                    .activate_affirmative(index, &mut self.engine, &mut self.frames, now)
            }
            PageCommand::TogglePlay => self.player.toggle_play(),
            PageCommand::ToggleMute => self.player.toggle_mute(),
            PageCommand::Previous => self.player.skip_previous(),
            PageCommand::Next => self.player.skip_next(),
            PageCommand::Volume(value) => self.player.set_volume(value),
            PageCommand::TryProceed => {
                let action = match self.countdown.observer_mut() {
                    Some(gate) => gate.try_proceed(now),
                    None => return,
                };
                if let ProceedAction::Navigate(page) = action {
                    self.go_to_page(page);
                }
            }
        }
    }

    /// Enter/Space on the focused control
    pub fn activate_focused(&mut self, key: KeyCode, now: Instant) {
        if self.focus == Focus::Envelope {
            self.bridge
                .primary_key(key, &mut self.engine, &mut self.frames, &mut self.player);
            return;
        }
        if let Some(command) = self.command_for(self.focus) {
            self.dispatch(command, now);
        }
    }

    fn command_for(&self, focus: Focus) -> Option<PageCommand> {
        match focus {
            Focus::Envelope => Some(PageCommand::OpenEnvelope),
            Focus::Yes(index) => Some(PageCommand::SayYes(index)),
            Focus::Proceed => Some(PageCommand::TryProceed),
            Focus::GlobalPlay | Focus::PagePlay => Some(PageCommand::TogglePlay),
            Focus::GlobalMute => Some(PageCommand::ToggleMute),
            Focus::Prev => Some(PageCommand::Previous),
            Focus::Next => Some(PageCommand::Next),
            Focus::Volume => None,
        }
    }

    /// Left click at a terminal cell. The confetti surface never intercepts clicks.
    pub fn click(&mut self, column: u16, row: u16, now: Instant) {
        let Some(focus) = self.hit_test(column, row) else {
            return;
        };
        self.focus = focus;
        if focus == Focus::Volume {
            let area = self.layout.volume;
            let span = area.width.saturating_sub(1).max(1) as f32;
            let value = (column - area.x) as f32 / span;
            self.dispatch(PageCommand::Volume(value), now);
        } else if let Some(command) = self.command_for(focus) {
            self.dispatch(command, now);
        }
    }

    fn hit_test(&self, column: u16, row: u16) -> Option<Focus> {
        self.focus_ring().into_iter().find(|focus| {
            self.area_of(*focus)
                .is_some_and(|area| Control::new(area).contains(column, row))
        })
    }

    fn area_of(&self, focus: Focus) -> Option<Rect> {
        let layout = &self.layout;
        match focus {
            Focus::Envelope => layout.envelope,
            Focus::Yes(index) => layout.yes.get(index).copied(),
            Focus::Proceed => layout.proceed,
            Focus::GlobalPlay => Some(layout.global_play),
            Focus::GlobalMute => Some(layout.global_mute),
            Focus::Volume => Some(layout.volume),
            Focus::Prev => Some(layout.prev),
            Focus::PagePlay => Some(layout.page_play),
            Focus::Next => Some(layout.next),
        }
    }

    /// Controls present on the current page, in Tab order
    pub fn focus_ring(&self) -> Vec<Focus> {
        let mut ring = Vec::new();
        if self.layout.envelope.is_some() {
            ring.push(Focus::Envelope);
        }
        ring.extend((0..self.layout.yes.len()).map(Focus::Yes));
        if self.layout.proceed.is_some() {
            ring.push(Focus::Proceed);
        }
        ring.extend([
            Focus::GlobalPlay,
            Focus::GlobalMute,
            Focus::Volume,
            Focus::Prev,
            Focus::PagePlay,
            Focus::Next,
        ]);
        ring
    }

    /// Tab
    pub fn next_focus(&mut self) {
        let ring = self.focus_ring();
        let index = ring.iter().position(|f| *f == self.focus);
        self.focus = match index {
            Some(i) => ring[(i + 1) % ring.len()],
            None => ring[0],
        };
    }

    /// Shift+Tab
    pub fn prev_focus(&mut self) {
        let ring = self.focus_ring();
        let index = ring.iter().position(|f| *f == self.focus);
        self.focus = match index {
            Some(i) => ring[(i + ring.len() - 1) % ring.len()],
            None => ring[ring.len() - 1],
        };
    }

    pub fn adjust_volume(&mut self, delta: f32, now: Instant) {
        let value = self.player.volume() + delta;
        self.dispatch(PageCommand::Volume(value), now);
    }

    pub fn go_to_page(&mut self, page: u8) {
        info!(page, "navigating");
        self.page = page;
        self.apply_layout(ui::page_layout(self.full_area(), page));
        if !self.focus_ring().contains(&self.focus) {
            self.focus = self.focus_ring()[0];
        }
    }

    /// Terminal resized
    pub fn resize(&mut self, width: u16, height: u16) {
        let area = Rect::new(0, 0, width, height);
        self.apply_layout(ui::page_layout(area, self.page));
        self.engine.resize_viewport(Viewport::from_cells(width, height));
    }

    fn apply_layout(&mut self, layout: PageLayout) {
        self.bridge.relayout(layout.envelope, &layout.yes);
        self.layout = layout;
    }

    fn full_area(&self) -> Rect {
        self.layout.sidebar.union(self.layout.body)
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
        if self.show_help {
            self.help_scroll = 0;
        }
    }

    pub fn scroll_help_up(&mut self) {
        self.help_scroll = self.help_scroll.saturating_sub(1);
    }

    pub fn scroll_help_down(&mut self, max_scroll: u16) {
        self.help_scroll = (self.help_scroll + 1).min(max_scroll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{MediaElement, PAUSE_GLYPH, PLAY_GLYPH};
    use crate::prefs::{MemoryStore, KEY_PLAYING};
    use ratatui::{backend::TestBackend, Terminal};

    const AREA: Rect = Rect {
        x: 0,
        y: 0,
        width: 100,
        height: 30,
    };

    fn app_with(config: AppConfig, store: MemoryStore) -> App {
        App::new(&config, Box::new(store), AREA, Instant::now())
    }

    fn app() -> App {
        app_with(AppConfig::default(), MemoryStore::new())
    }

    fn center(area: Rect) -> (u16, u16) {
        (area.x + area.width / 2, area.y + area.height / 2)
    }

    fn run_frames(app: &mut App, now: Instant, frames: usize) {
        for _ in 0..frames {
            app.tick(now, Duration::from_millis(16));
        }
    }

    #[test]
    fn test_envelope_click_bursts_and_starts_music() {
        let mut app = app();
        let now = Instant::now();
        let (x, y) = center(app.layout.envelope.unwrap());

        app.register_gesture();
        app.click(x, y, now);

        assert!(app.bridge.primary_activated());
        assert_eq!(app.engine.live_count(), 50);
        assert!(app.player.is_playing());
        assert_eq!(app.player.global.play.as_ref().unwrap().glyph, PAUSE_GLYPH);
        assert_eq!(app.player.page.play.as_ref().unwrap().glyph, PAUSE_GLYPH);

        app.tick(now, Duration::from_millis(16));
        assert!(app.player.prefs().wants_playing());
    }

    #[test]
    fn test_stored_intent_blocked_until_gesture() {
        let mut store = MemoryStore::new();
        store.set(KEY_PLAYING, "1").unwrap();
        let app = app_with(AppConfig::default(), store);

        assert!(!app.player.is_playing());
        assert_eq!(app.player.global.play.as_ref().unwrap().glyph, PLAY_GLYPH);
        assert!(app.player.prefs().wants_playing());
    }

    #[test]
    fn test_stored_intent_resumes_when_autoplay_allowed() {
        let mut store = MemoryStore::new();
        store.set(KEY_PLAYING, "1").unwrap();
        let config = AppConfig {
            allow_autoplay: true,
            ..AppConfig::default()
        };
        let app = app_with(config, store);
        assert!(app.player.is_playing());
    }

    #[test]
    fn test_yes_buttons_accumulate() {
        let mut app = app();
        let now = Instant::now();
        app.dispatch(PageCommand::OpenEnvelope, now);
        app.dispatch(PageCommand::SayYes(0), now);
        assert_eq!(app.engine.live_count(), 86);
        assert!(app.bridge.affirmative_scale(0, now + Duration::from_millis(100)) > 1.0);

        // Frames are only served on request and the loop eventually stops
        let mut served = 0;
        while app.engine.is_animating() && served < 1000 {
            run_frames(&mut app, now, 1);
            served += 1;
        }
        assert_eq!(app.engine.live_count(), 0);
        assert!(served <= 101);
        assert!(!app.frames.take());
    }

    #[test]
    fn test_reduced_motion_keeps_music() {
        let config = AppConfig {
            reduced_motion: true,
            ..AppConfig::default()
        };
        let mut app = app_with(config, MemoryStore::new());
        app.register_gesture();
        app.dispatch(PageCommand::OpenEnvelope, Instant::now());

        assert!(app.engine.surface().is_none());
        assert_eq!(app.frames.issued(), 0);
        assert!(app.player.is_playing());
    }

    #[test]
    fn test_keyboard_activation_of_envelope() {
        let mut app = app();
        assert_eq!(app.focus, Focus::Envelope);
        app.activate_focused(KeyCode::Char(' '), Instant::now());
        assert_eq!(app.engine.live_count(), 50);
    }

    #[test]
    fn test_both_play_buttons_drive_one_track() {
        let mut app = app();
        let now = Instant::now();
        app.register_gesture();

        let (x, y) = center(app.layout.page_play);
        app.click(x, y, now);
        assert_eq!(app.focus, Focus::PagePlay);
        assert!(app.player.is_playing());

        let (x, y) = center(app.layout.global_play);
        app.click(x, y, now);
        app.tick(now, Duration::from_millis(16));
        assert!(!app.player.is_playing());
        assert_eq!(app.player.global.play.as_ref().unwrap().glyph, PLAY_GLYPH);
        assert_eq!(app.player.page.play.as_ref().unwrap().glyph, PLAY_GLYPH);
        assert_eq!(app.player.prefs().playing().as_deref(), Some("0"));
    }

    #[test]
    fn test_progress_follows_playback() {
        let config = AppConfig {
            track_seconds: 200.0,
            allow_autoplay: true,
            ..AppConfig::default()
        };
        let mut app = app_with(config, MemoryStore::new());
        let now = Instant::now();
        app.dispatch(PageCommand::TogglePlay, now);
        app.tick(now, Duration::from_secs(50));

        assert_eq!(app.player.global.progress.as_ref().unwrap().width_pct, 25.0);
        assert_eq!(app.player.page.progress.as_ref().unwrap().width_pct, 25.0);

        app.dispatch(PageCommand::Previous, now);
        app.tick(now, Duration::ZERO);
        assert_eq!(app.player.media().unwrap().current_time(), 0.0);
        assert_eq!(app.player.page.progress.as_ref().unwrap().width_pct, 0.0);
    }

    #[test]
    fn test_volume_click_and_keys() {
        let mut app = app();
        let now = Instant::now();
        let area = app.layout.volume;

        app.click(area.x + area.width - 1, area.y, now);
        assert_eq!(app.focus, Focus::Volume);
        assert_eq!(app.player.volume(), 1.0);

        app.adjust_volume(VOLUME_STEP, now);
        assert_eq!(app.player.volume(), 1.0);

        app.click(area.x, area.y, now);
        assert_eq!(app.player.volume(), 0.0);
        app.adjust_volume(-VOLUME_STEP, now);
        assert_eq!(app.player.volume(), 0.0);
    }

    #[test]
    fn test_proceed_navigates_to_second_page() {
        let mut app = app();
        let now = Instant::now();
        app.focus = Focus::Proceed;
        app.activate_focused(KeyCode::Enter, now);

        assert_eq!(app.page, 2);
        assert!(app.bridge.primary.is_none());
        assert_eq!(app.bridge.affirmatives.len(), 1);
        assert_eq!(app.focus, Focus::Yes(0));

        // Envelope is gone; the command degrades to a no-op
        app.dispatch(PageCommand::OpenEnvelope, now);
        assert_eq!(app.engine.live_count(), 0);
        app.dispatch(PageCommand::SayYes(0), now);
        assert_eq!(app.engine.live_count(), 36);
    }

    #[test]
    fn test_locked_proceed_shakes() {
        let mut app = app();
        let now = Instant::now();
        app.countdown.observer_mut().unwrap().set_locked(true);
        app.dispatch(PageCommand::TryProceed, now);
        assert_eq!(app.page, 1);
        assert!(app.countdown.observer().unwrap().is_shaking(now));

        // The next countdown tick unlocks it again
        app.tick(now, Duration::ZERO);
        assert!(!app.countdown.observer().unwrap().is_locked());
    }

    #[test]
    fn test_focus_ring_wraps() {
        let mut app = app();
        let ring = app.focus_ring();
        assert_eq!(ring.len(), 10);
        for _ in 0..ring.len() {
            app.next_focus();
        }
        assert_eq!(app.focus, Focus::Envelope);
        app.prev_focus();
        assert_eq!(app.focus, Focus::Next);
    }

    #[test]
    fn test_resize_moves_controls_and_surface() {
        let mut app = app();
        app.dispatch(PageCommand::OpenEnvelope, Instant::now());
        app.resize(140, 40);

        assert_eq!(app.bridge.primary.as_ref().unwrap().area, app.layout.envelope.unwrap());
        assert!(app.bridge.primary_activated());
        assert_eq!(app.engine.surface().unwrap().buffer_width, 280);
        assert_eq!(app.engine.surface().unwrap().buffer_height, 160);
    }

    #[test]
    fn test_render_smoke() {
        let mut app = app();
        let now = Instant::now();
        app.dispatch(PageCommand::OpenEnvelope, now);
        run_frames(&mut app, now, 3);

        let mut terminal = Terminal::new(TestBackend::new(AREA.width, AREA.height)).unwrap();
        terminal.draw(|frame| ui::render(frame, &app, now)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Now Playing"));
        assert!(text.contains("For You"));
        // Confetti shows up as Braille dots
        assert!(text.chars().any(|c| ('\u{2801}'..='\u{28FF}').contains(&c)));
    }

    #[test]
    fn test_render_short_and_tiny_terminals() {
        for (width, height) in [(100, 5), (3, 3), (1, 1), (30, 2)] {
            let area = Rect::new(0, 0, width, height);
            let store = Box::new(MemoryStore::new());
            let mut app = App::new(&AppConfig::default(), store, area, Instant::now());
            let now = Instant::now();
            app.dispatch(PageCommand::OpenEnvelope, now);
            app.dispatch(PageCommand::SayYes(0), now);
            run_frames(&mut app, now, 1);

            let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
            terminal.draw(|frame| ui::render(frame, &app, now)).unwrap();

            app.show_help = true;
            terminal.draw(|frame| ui::render(frame, &app, now)).unwrap();
        }
    }

    #[test]
    fn test_render_after_shrinking_resize() {
        let mut app = app();
        let now = Instant::now();
        app.dispatch(PageCommand::OpenEnvelope, now);
        app.resize(100, 5);
        run_frames(&mut app, now, 2);

        let mut terminal = Terminal::new(TestBackend::new(100, 5)).unwrap();
        terminal.draw(|frame| ui::render(frame, &app, now)).unwrap();
        assert!(app.layout.global_time.is_empty());
    }

    #[test]
    fn test_huge_countdown_does_not_overflow() {
        let config = AppConfig {
            countdown_seconds: u64::MAX,
            ..AppConfig::default()
        };
        let app = app_with(config, MemoryStore::new());
        assert!(!app.countdown.text().is_empty());
    }
}
