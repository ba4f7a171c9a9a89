use crate::app::{App, Focus};
use crate::braille;
use crate::player::MediaElement;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};
use std::time::Instant;

const SIDEBAR_WIDTH: u16 = 26;
const PLAYER_BOX_HEIGHT: u16 = 7;
const BODY_COLUMN_WIDTH: u16 = 40;

/// Max scroll for help content
pub const HELP_CONTENT_LINES: u16 = 30;

// UI color scheme
const BORDER_COLOR: Color = Color::Rgb(0xff, 0x7a, 0xb6);
const HIGHLIGHT_COLOR: Color = Color::Yellow;
const TEXT_COLOR: Color = Color::White;
const DIM_TEXT_COLOR: Color = Color::Gray;
const FILL_COLOR: Color = Color::Rgb(0xdc, 0x26, 0x26);

/// Where every control sits, shared by rendering and hit-testing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub sidebar: Rect,
    pub body: Rect,
    // Global player
    pub track_title: Rect,
    pub global_play: Rect,
    pub global_mute: Rect,
    pub volume: Rect,
    pub global_progress: Rect,
    pub global_time: Rect,
    // Greeting page
    pub envelope: Option<Rect>,
    pub countdown: Option<Rect>,
    pub message: Option<Rect>,
    pub yes: Vec<Rect>,
    pub proceed: Option<Rect>,
    // Page player
    pub prev: Rect,
    pub page_play: Rect,
    pub next: Rect,
    pub page_progress: Rect,
}

/// Compute the layout for terminal area `area` showing page `page`
pub fn page_layout(area: Rect, page: u8) -> PageLayout {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(area);
    let (sidebar, body) = (columns[0], columns[1]);

    // Global player rows inside its bordered box
    let player = inner(Rect { height: PLAYER_BOX_HEIGHT.min(sidebar.height), ..sidebar });
    // Rows that do not fit a short terminal collapse to empty rects
    let row = |n: u16, dx: u16, width: u16| {
        let (x, y) = (player.x.saturating_add(dx), player.y.saturating_add(n));
        Rect::new(x, y, width, 1).intersection(player)
    };
    let mut layout = PageLayout {
        sidebar,
        body,
        track_title: row(0, 0, player.width),
        global_play: row(1, 0, 3),
        global_mute: row(1, 4, 4),
        volume: row(2, 4, player.width.saturating_sub(9)),
        global_progress: row(3, 0, player.width),
        global_time: row(4, 0, player.width),
        ..PageLayout::default()
    };

    let content = inner(body);
    let width = BODY_COLUMN_WIDTH.min(content.width);
    let left = content.x + (content.width - width) / 2;
    let mid = left + width / 2;
    let top = content.y;
    let at = |x: u16, y: u16, w: u16, h: u16| Rect::new(x, y, w, h).intersection(content);

    if page <= 1 {
        layout.envelope = Some(at(mid.saturating_sub(10), top + 1, 20, 5));
        layout.countdown = Some(at(left, top + 7, width, 1));
        layout.yes = vec![
            at(mid.saturating_sub(11), top + 9, 10, 3),
            at(mid + 1, top + 9, 10, 3),
        ];
        layout.proceed = Some(at(mid.saturating_sub(8), top + 13, 16, 3));
    } else {
        layout.message = Some(at(left, top + 1, width, 4));
        layout.yes = vec![at(mid.saturating_sub(5), top + 9, 10, 3)];
    }

    layout.prev = at(mid.saturating_sub(6), top + 17, 3, 1);
    layout.page_play = at(mid.saturating_sub(1), top + 17, 3, 1);
    layout.next = at(mid + 4, top + 17, 3, 1);
    layout.page_progress = at(left, top + 18, width, 1);
    layout
}

fn inner(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(area)
}

/// Creates a standard styled block with rounded borders
fn styled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
        .title(title)
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(HIGHLIGHT_COLOR).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(TEXT_COLOR)
    }
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App, now: Instant) {
    let area = frame.area();

    render_sidebar(frame, app);
    render_body(frame, app, now);

    // Confetti goes over everything except the help dialog
    render_particles(frame, area, app);

    if app.show_help {
        render_help_overlay(frame, area, app);
    }
}

/// Render unless the layout collapsed `area` to nothing
fn render_in<W: Widget>(frame: &mut Frame, widget: W, area: Rect) {
    if !area.is_empty() {
        frame.render_widget(widget, area);
    }
}

fn render_sidebar(frame: &mut Frame, app: &App) {
    let layout = &app.layout;
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(PLAYER_BOX_HEIGHT), Constraint::Min(0)])
        .split(layout.sidebar);

    render_in(frame, styled_block(" Now Playing "), sections[0]);

    let global = &app.player.global;
    let title = app.player.media().map_or("(no track)", |t| t.title.as_str());
    render_in(
        frame,
        Paragraph::new(Span::styled(title, Style::default().fg(TEXT_COLOR))),
        layout.track_title,
    );

    if let Some(play) = &global.play {
        let text = format!("[{}]", play.glyph);
        render_in(
            frame,
            Paragraph::new(Span::styled(text, focus_style(app.focus == Focus::GlobalPlay))),
            layout.global_play,
        );
    }
    if let Some(mute) = &global.mute {
        let text = format!("[{}]", mute.glyph);
        render_in(
            frame,
            Paragraph::new(Span::styled(text, focus_style(app.focus == Focus::GlobalMute))),
            layout.global_mute,
        );
    }
    if let Some(slider) = &global.volume {
        let row = Rect {
            x: layout.sidebar.x + 1,
            width: layout.sidebar.width.saturating_sub(2),
            ..layout.volume
        }
        .intersection(layout.sidebar);
        let line = Line::from(vec![
            Span::styled("Vol ", Style::default().fg(DIM_TEXT_COLOR)),
            bar_span(slider.value as f64, layout.volume.width, Color::Green),
            Span::styled(
                format!(" {:>3}%", (slider.value * 100.0).round() as u32),
                focus_style(app.focus == Focus::Volume),
            ),
        ]);
        render_in(frame, Paragraph::new(line), row);
    }
    if let Some(progress) = &global.progress {
        render_in(
            frame,
            Paragraph::new(progress_line(progress.width_pct, layout.global_progress.width)),
            layout.global_progress,
        );
    }
    if let Some(track) = app.player.media() {
        let time = match track.duration() {
            Some(total) => format!("{} / {}", clock(track.current_time()), clock(total)),
            None => clock(track.current_time()),
        };
        render_in(
            frame,
            Paragraph::new(Span::styled(time, Style::default().fg(DIM_TEXT_COLOR))),
            layout.global_time,
        );
    }

    render_controls_box(frame, sections[1], app);
}

fn render_controls_box(frame: &mut Frame, area: Rect, app: &App) {
    let key_style = Style::default().fg(HIGHLIGHT_COLOR);
    let desc_style = Style::default().fg(DIM_TEXT_COLOR);

    let make_control = |key: &str, desc: &str| -> Line<'static> {
        Line::from(vec![
            Span::styled(format!("{:>7}", key), key_style),
            Span::styled(format!(" {}", desc), desc_style),
        ])
    };

    let mut content = vec![
        make_control("Tab", "next control"),
        make_control("Enter", "activate"),
        make_control("P", "play/pause"),
        make_control("M", "mute"),
        make_control("+/-", "volume"),
        make_control("H", "help"),
        make_control("Q", "quit"),
    ];
    if app.engine.reduced_motion() {
        content.push(Line::from(Span::styled("  reduced motion", desc_style)));
    }

    let paragraph = Paragraph::new(content).block(styled_block(" Controls "));
    render_in(frame, paragraph, area);
}

fn render_body(frame: &mut Frame, app: &App, now: Instant) {
    let layout = &app.layout;
    render_in(frame, styled_block(" For You "), layout.body);

    if let Some(area) = layout.envelope {
        let opened = app.bridge.primary_activated();
        let text = if opened { "💌  opened!" } else { "✉  open me" };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(if opened { BorderType::Double } else { BorderType::Rounded })
            .border_style(focus_style(app.focus == Focus::Envelope));
        render_in(
            frame,
            Paragraph::new(Line::from(text).centered()).block(block),
            area,
        );
    }

    if let Some(area) = layout.countdown {
        let line = Line::from(vec![
            Span::styled("Time remaining: ", Style::default().fg(DIM_TEXT_COLOR)),
            Span::styled(app.countdown.text().to_string(), Style::default().fg(TEXT_COLOR)),
        ]);
        render_in(frame, Paragraph::new(line.centered()), area);
    }

    if let Some(area) = layout.message {
        let content = vec![
            Line::from(Span::styled("You said yes!", Style::default().fg(BORDER_COLOR))).centered(),
            Line::from(""),
            Line::from("Press the button as often as you like.").centered(),
        ];
        render_in(frame, Paragraph::new(content).wrap(Wrap { trim: true }), area);
    }

    for (i, area) in layout.yes.iter().enumerate() {
        let focused = app.focus == Focus::Yes(i);
        let scale = app.bridge.affirmative_scale(i, now);
        // Grow by one cell on each side near the peak of the pulse
        let area = if scale >= 1.03 {
            Rect {
                x: area.x.saturating_sub(1),
                width: area.width + 2,
                ..*area
            }
            .intersection(layout.body)
        } else {
            *area
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(focus_style(focused));
        render_in(
            frame,
            Paragraph::new(Line::from("Yes!").centered()).block(block),
            area,
        );
    }

    if let (Some(area), Some(gate)) = (layout.proceed, app.countdown.observer()) {
        let shaking = gate.is_shaking(now);
        let label = if shaking { "🔒 not yet" } else { "Continue →" };
        let area = if shaking {
            Rect { x: area.x + 1, ..area }.intersection(layout.body)
        } else {
            area
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(focus_style(app.focus == Focus::Proceed));
        render_in(
            frame,
            Paragraph::new(Line::from(label).centered()).block(block),
            area,
        );
    }

    let page = &app.player.page;
    if page.has_prev {
        render_in(
            frame,
            Paragraph::new(Span::styled("[⏮]", focus_style(app.focus == Focus::Prev))),
            layout.prev,
        );
    }
    if let Some(play) = &page.play {
        render_in(
            frame,
            Paragraph::new(Span::styled(
                format!("[{}]", play.glyph),
                focus_style(app.focus == Focus::PagePlay),
            )),
            layout.page_play,
        );
    }
    if page.has_next {
        render_in(
            frame,
            Paragraph::new(Span::styled("[⏭]", focus_style(app.focus == Focus::Next))),
            layout.next,
        );
    }
    if let Some(progress) = &page.progress {
        render_in(
            frame,
            Paragraph::new(progress_line(progress.width_pct, layout.page_progress.width)),
            layout.page_progress,
        );
    }
}

fn render_particles(frame: &mut Frame, area: Rect, app: &App) {
    let Some(surface) = app.engine.surface() else {
        return;
    };
    let cells = braille::render_surface(surface, area.width, area.height);
    let buffer = frame.buffer_mut();
    for cell in cells {
        let x = area.x + cell.x;
        let y = area.y + cell.y;
        if x < area.x + area.width && y < area.y + area.height {
            buffer[(x, y)].set_char(cell.char).set_fg(cell.color);
        }
    }
}

fn bar_span(fraction: f64, width: u16, color: Color) -> Span<'static> {
    let width = width as usize;
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    Span::styled(
        format!("{}{}", "█".repeat(filled), "░".repeat(width - filled)),
        Style::default().fg(color),
    )
}

fn progress_line(width_pct: f64, width: u16) -> Line<'static> {
    Line::from(bar_span(width_pct / 100.0, width, FILL_COLOR))
}

fn clock(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn render_help_overlay(frame: &mut Frame, area: Rect, app: &App) {
    let help_width = 56.min(area.width.saturating_sub(4));
    let help_height = area.height.saturating_sub(4).min(24);
    let help_area = Rect {
        x: area.x + (area.width.saturating_sub(help_width)) / 2,
        y: area.y + (area.height.saturating_sub(help_height)) / 2,
        width: help_width,
        height: help_height,
    };

    frame.render_widget(Clear, help_area);

    let content = vec![
        Line::from(""),
        Line::from(Span::styled("A LITTLE CELEBRATION", Style::default().fg(BORDER_COLOR))),
        Line::from(""),
        Line::from("Open the envelope or say yes to throw confetti. Opening the envelope also starts the music."),
        Line::from(""),
        Line::from(Span::styled("MUSIC:", Style::default().fg(HIGHLIGHT_COLOR))),
        Line::from("P=Play/Pause, M=Mute, +/-=Volume, the skip buttons restart the song. Both players always show the same state, and your choices are remembered."),
        Line::from(""),
        Line::from(Span::styled("NAVIGATION:", Style::default().fg(HIGHLIGHT_COLOR))),
        Line::from("Tab/Shift+Tab=Move focus, Enter/Space=Activate, Left/Right=Volume when focused, mouse clicks work too."),
        Line::from(""),
        Line::from("Start with --reduced-motion to turn the confetti off."),
        Line::from(""),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(HIGHLIGHT_COLOR))
        .title(" Help (J/K scroll, H to close) ");

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.help_scroll, 0));

    frame.render_widget(paragraph, help_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_first_page() {
        let layout = page_layout(Rect::new(0, 0, 100, 30), 1);
        assert_eq!(layout.sidebar.width, SIDEBAR_WIDTH);
        assert_eq!(layout.global_play, Rect::new(1, 2, 3, 1));
        assert_eq!(layout.global_mute, Rect::new(5, 2, 4, 1));
        assert!(layout.envelope.is_some());
        assert_eq!(layout.yes.len(), 2);
        assert!(layout.message.is_none());

        let body = layout.body;
        for rect in layout.yes.iter().chain(layout.envelope.iter()).chain(layout.proceed.iter()) {
            assert_eq!(rect.intersection(body), *rect);
        }
        assert!(!layout.yes[0].intersects(layout.yes[1]));
    }

    #[test]
    fn test_layout_second_page_drops_envelope() {
        let layout = page_layout(Rect::new(0, 0, 100, 30), 2);
        assert!(layout.envelope.is_none());
        assert!(layout.proceed.is_none());
        assert!(layout.message.is_some());
        assert_eq!(layout.yes.len(), 1);
    }

    #[test]
    fn test_tiny_terminal_does_not_panic() {
        let layout = page_layout(Rect::new(0, 0, 10, 4), 1);
        assert!(layout.yes.iter().all(|r| r.area() == 0 || r.intersection(layout.body) == *r));
    }

    #[test]
    fn test_bar_span_fill() {
        assert_eq!(bar_span(0.5, 4, Color::Red).content, "██░░");
        assert_eq!(bar_span(2.0, 3, Color::Red).content, "███");
        assert_eq!(bar_span(-1.0, 2, Color::Red).content, "░░");
    }

    #[test]
    fn test_clock() {
        assert_eq!(clock(0.0), "0:00");
        assert_eq!(clock(214.9), "3:34");
    }
}
