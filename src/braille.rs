use crate::surface::Surface;
use ratatui::style::Color;

/// Braille character rendering for high-resolution terminal graphics.
/// Each Braille character represents a 2x4 grid of dots (8 dots total).
///
/// Dot positions and their bit values:
/// ```text
/// (0,0)=0x01  (1,0)=0x08
/// (0,1)=0x02  (1,1)=0x10
/// (0,2)=0x04  (1,2)=0x20
/// (0,3)=0x40  (1,3)=0x80
/// ```
///
/// Unicode Braille patterns: U+2800 to U+28FF (256 patterns)
const BRAILLE_BASE: u32 = 0x2800;

/// Dot position to bit mapping for Braille characters
const BRAILLE_DOTS: [[u8; 4]; 2] = [
    [0x01, 0x02, 0x04, 0x40], // Left column (x=0): rows 0,1,2,3
    [0x08, 0x10, 0x20, 0x80], // Right column (x=1): rows 0,1,2,3
];

/// A single rendered Braille cell with position and color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrailleCell {
    pub x: u16,
    pub y: u16,
    pub char: char,
    pub color: Color,
}

/// Project the surface's dot buffer onto a `canvas_width` x `canvas_height` cell grid.
/// Only cells with at least one lit dot are emitted; the rest stay transparent.
pub fn render_surface(surface: &Surface, canvas_width: u16, canvas_height: u16) -> Vec<BrailleCell> {
    let braille_width = canvas_width as usize * 2;
    let braille_height = canvas_height as usize * 4;
    if braille_width == 0 || braille_height == 0 {
        return Vec::new();
    }

    // 1.0 when the buffer was sized for this terminal, which is the usual case
    let scale_x = surface.buffer_width as f32 / braille_width as f32;
    let scale_y = surface.buffer_height as f32 / braille_height as f32;

    let mut cells = Vec::new();

    for cy in 0..canvas_height {
        for cx in 0..canvas_width {
            let mut pattern: u8 = 0;
            // Last lit dot wins the cell color
            let mut color = None;

            let base_bx = cx as usize * 2;
            let base_by = cy as usize * 4;

            for dx in 0..2 {
                for dy in 0..4 {
                    let px = ((base_bx + dx) as f32 * scale_x) as usize;
                    let py = ((base_by + dy) as f32 * scale_y) as usize;

                    if let Some(dot) = surface.pixel(px, py) {
                        pattern |= BRAILLE_DOTS[dx][dy];
                        color = Some(dot);
                    }
                }
            }

            if let Some(color) = color {
                let braille_char = char::from_u32(BRAILLE_BASE + pattern as u32).unwrap_or(' ');
                cells.push(BrailleCell {
                    x: cx,
                    y: cy,
                    char: braille_char,
                    color,
                });
            }
        }
    }

    cells
}
