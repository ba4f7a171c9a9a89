use ratatui::style::Color;

/// Logical pixels per terminal cell (horizontal)
pub const CELL_WIDTH_PX: f32 = 8.0;
/// Logical pixels per terminal cell (vertical)
pub const CELL_HEIGHT_PX: f32 = 16.0;
/// Braille gives 2x4 dots per 8x16 px cell, so one dot covers 4x4 logical px
pub const BRAILLE_PIXEL_RATIO: f32 = 0.25;

/// Visible area in logical (CSS) pixels plus the backing pixel ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub pixel_ratio: f32,
}

impl Viewport {
    /// Viewport covering a terminal of `cols` x `rows` cells
    pub fn from_cells(cols: u16, rows: u16) -> Self {
        Self {
            width: cols as f32 * CELL_WIDTH_PX,
            height: rows as f32 * CELL_HEIGHT_PX,
            pixel_ratio: BRAILLE_PIXEL_RATIO,
        }
    }
}

/// Full-viewport drawing target shared by all particle output.
///
/// The surface sits above everything else and never takes part in
/// hit-testing. All drawing coordinates are logical pixels; `scale` maps
/// them onto the backing buffer.
#[derive(Debug, Clone)]
pub struct Surface {
    pub buffer_width: usize,
    pub buffer_height: usize,
    /// Visible size, always 100% of the viewport
    pub css_width: f32,
    pub css_height: f32,
    pub scale: f32,
    pixels: Vec<Option<Color>>,
    clears: u64,
}

impl Surface {
    fn new(viewport: Viewport) -> Self {
        let mut surface = Self {
            buffer_width: 0,
            buffer_height: 0,
            css_width: 0.0,
            css_height: 0.0,
            scale: 1.0,
            pixels: Vec::new(),
            clears: 0,
        };
        surface.resize(viewport);
        surface
    }

    /// Recompute backing size and transform. Reallocating discards the pixel contents.
    pub fn resize(&mut self, viewport: Viewport) {
        let ratio = if viewport.pixel_ratio > 0.0 {
            viewport.pixel_ratio
        } else {
            1.0
        };
        self.buffer_width = (viewport.width * ratio).max(0.0) as usize;
        self.buffer_height = (viewport.height * ratio).max(0.0) as usize;
        self.css_width = viewport.width;
        self.css_height = viewport.height;
        self.scale = ratio;
        self.pixels = vec![None; self.buffer_width * self.buffer_height];
    }

    pub fn clear(&mut self) {
        self.pixels.fill(None);
        self.clears += 1;
    }

    /// Number of clears performed so far
    pub fn clear_count(&self) -> u64 {
        self.clears
    }

    /// Fill a rectangle given in logical pixels, clipped to the buffer
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let x0 = (x * self.scale).floor().max(0.0);
        let y0 = (y * self.scale).floor().max(0.0);
        let x1 = ((x + w) * self.scale).ceil().min(self.buffer_width as f32);
        let y1 = ((y + h) * self.scale).ceil().min(self.buffer_height as f32);
        if x1 <= x0 || y1 <= y0 {
            return;
        }

        for py in y0 as usize..y1 as usize {
            let row = py * self.buffer_width;
            for px in x0 as usize..x1 as usize {
                self.pixels[row + px] = Some(color);
            }
        }
    }

    /// Pixel at backing-buffer coordinates
    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x < self.buffer_width && y < self.buffer_height {
            self.pixels[y * self.buffer_width + x]
        } else {
            None
        }
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(Option::is_none)
    }
}

/// Owns the lazily created singleton surface
#[derive(Debug)]
pub struct SurfaceManager {
    viewport: Viewport,
    surface: Option<Surface>,
}

impl SurfaceManager {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            surface: None,
        }
    }

    /// Create the surface on first use, otherwise return the existing one
    pub fn ensure_surface(&mut self) -> &mut Surface {
        let viewport = self.viewport;
        self.surface.get_or_insert_with(|| Surface::new(viewport))
    }

    /// Viewport-resize notification
    pub fn on_viewport_resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(viewport);
        }
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut Surface> {
        self.surface.as_mut()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
}
