mod app;
mod braille;
mod bridge;
mod config;
mod countdown;
mod engine;
mod media;
mod player;
mod prefs;
mod surface;
mod ui;

use app::{App, Focus, PageCommand, VOLUME_STEP};
use clap::Parser;
use config::AppConfig;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use prefs::{FileStore, KeyValueStore, MemoryStore};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "celebration")]
#[command(about = "Confetti and a little background music in the terminal")]
struct Args {
    /// Load settings from a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective config to a JSON file and exit
    #[arg(long = "export-config")]
    export_config: Option<PathBuf>,

    /// Preferences file (defaults to the user config directory)
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Turn off all confetti
    #[arg(long = "reduced-motion")]
    reduced_motion: bool,

    /// Let the music start without a key press first
    #[arg(long = "allow-autoplay")]
    allow_autoplay: bool,

    /// Track title shown in the player
    #[arg(long)]
    title: Option<String>,

    /// Track length in seconds (0 = unknown)
    #[arg(long)]
    duration: Option<f64>,

    /// Countdown length in seconds
    #[arg(long)]
    countdown: Option<u64>,

    /// Confetti pieces when the envelope opens (1-500)
    #[arg(long = "primary-burst")]
    primary_burst: Option<usize>,

    /// Confetti pieces per "yes" (1-500)
    #[arg(long = "affirmative-burst")]
    affirmative_burst: Option<usize>,

    /// Write logs to this file
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Config file (or defaults) with command-line overrides applied
    fn resolve_config(&self) -> Result<AppConfig, String> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load_from_file(path)?,
            None => AppConfig::default(),
        };
        config.reduced_motion |= self.reduced_motion;
        config.allow_autoplay |= self.allow_autoplay;
        if let Some(title) = &self.title {
            config.track_title = title.clone();
        }
        if let Some(seconds) = self.duration {
            config.track_seconds = seconds;
        }
        if let Some(seconds) = self.countdown {
            config.countdown_seconds = seconds;
        }
        if let Some(count) = self.primary_burst {
            config.primary_burst = count;
        }
        if let Some(count) = self.affirmative_burst {
            config.affirmative_burst = count;
        }
        Ok(config.sanitized())
    }

    fn open_store(&self) -> Box<dyn KeyValueStore> {
        match self.prefs.clone().or_else(FileStore::default_path) {
            Some(path) => Box::new(FileStore::open(path)),
            None => {
                warn!("no config directory, preferences will not persist");
                Box::new(MemoryStore::new())
            }
        }
    }
}

fn init_logging(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    // The terminal belongs to the UI, so logs only go to a file
    let Some(path) = &args.log_file else {
        return Ok(());
    };
    let file = File::create(path)?;
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| format!("Failed to start logging: {}", e))?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = args.resolve_config()?;
    if let Some(path) = &args.export_config {
        config.save_to_file(path)?;
        println!("Config written to {}", path.display());
        return Ok(());
    }
    info!(?config, "starting");
    let store = args.open_store();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let size = terminal.size()?;
    let area = Rect::new(0, 0, size.width, size.height);
    let mut app = App::new(&config, store, area, Instant::now());

    // Run the app
    let res = run_app(&mut terminal, &mut app);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    // Target ~60fps for smooth animation
    const FRAME_DURATION: Duration = Duration::from_millis(16);

    let mut last_tick = Instant::now();

    loop {
        let now = Instant::now();
        terminal.draw(|frame| ui::render(frame, app, now))?;

        // Poll for events with timeout
        if event::poll(FRAME_DURATION)? {
            let now = Instant::now();
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if handle_key(app, key, now) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => {
                    if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
                        app.register_gesture();
                        app.click(mouse.column, mouse.row, now);
                    }
                }
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        let now = Instant::now();
        app.tick(now, now.duration_since(last_tick));
        last_tick = now;
    }
}

/// Apply one key press. Returns true when the app should quit.
fn handle_key(app: &mut App, key: KeyEvent, now: Instant) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    app.register_gesture();

    if app.show_help {
        match key.code {
            KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Esc => app.toggle_help(),
            KeyCode::Char('j') | KeyCode::Char('J') | KeyCode::Down => {
                app.scroll_help_down(ui::HELP_CONTENT_LINES)
            }
            KeyCode::Char('k') | KeyCode::Char('K') | KeyCode::Up => app.scroll_help_up(),
            KeyCode::Char('q') | KeyCode::Char('Q') => return true,
            _ => {}
        }
        return false;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => return true,
        KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => app.toggle_help(),
        KeyCode::Char('p') | KeyCode::Char('P') => app.dispatch(PageCommand::TogglePlay, now),
        KeyCode::Char('m') | KeyCode::Char('M') => app.dispatch(PageCommand::ToggleMute, now),
        KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_volume(VOLUME_STEP, now),
        KeyCode::Char('-') | KeyCode::Char('_') => app.adjust_volume(-VOLUME_STEP, now),

        // Navigation
        KeyCode::Tab => app.next_focus(),
        KeyCode::BackTab => app.prev_focus(),
        KeyCode::Enter | KeyCode::Char(' ') => app.activate_focused(key.code, now),
        KeyCode::Left if app.focus == Focus::Volume => app.adjust_volume(-VOLUME_STEP, now),
        KeyCode::Right if app.focus == Focus::Volume => app.adjust_volume(VOLUME_STEP, now),
        _ => {}
    }
    false
}
