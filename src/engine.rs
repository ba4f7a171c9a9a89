use crate::surface::{Surface, SurfaceManager, Viewport};
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::Rng;
use ratatui::style::Color;
use tracing::debug;

/// Downward acceleration in px/frame²
pub const GRAVITY: f32 = 0.25;
/// Particles falling this far below the surface are culled
pub const CULL_MARGIN: f32 = 50.0;

const JITTER_X: f32 = 20.0;
const JITTER_Y: f32 = 10.0;
const MAX_VX: f32 = 3.0;
const MIN_VY: f32 = -8.0;
const MAX_VY: f32 = -2.0;
const MIN_LIFE: i32 = 60;
const MAX_LIFE: i32 = 100;
const MIN_SIZE: f32 = 6.0;
const MAX_SIZE: f32 = 14.0;

/// Confetti palette
pub const PALETTE: [Color; 6] = [
    Color::Rgb(0xff, 0x6b, 0x6b),
    Color::Rgb(0xff, 0xb4, 0xb4),
    Color::Rgb(0xff, 0xd6, 0xa5),
    Color::Rgb(0xff, 0xd1, 0xdc),
    Color::Rgb(0xff, 0x7a, 0xb6),
    Color::Rgb(0xdc, 0x26, 0x26),
];

/// "Invoke once before the next repaint"
pub trait FrameScheduler {
    fn request_frame(&mut self);
}

/// Single confetti square
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Remaining lifetime in frames
    pub life: i32,
    pub color: Color,
    pub size: f32,
}

impl Particle {
    /// Advance one frame: gravity, integration, aging
    fn advance(&mut self) {
        self.vy += GRAVITY;
        self.x += self.vx;
        self.y += self.vy;
        self.life -= 1;
    }

    fn is_expired(&self, surface_height: f32) -> bool {
        self.life <= 0 || self.y > surface_height + CULL_MARGIN
    }
}

/// Confetti engine: one shared particle set, one surface, one self-terminating frame loop
pub struct ParticleEngine<R: Rng = ThreadRng> {
    particles: Vec<Particle>,
    surfaces: SurfaceManager,
    reduced_motion: bool,
    /// True while a frame request is outstanding or being served
    animating: bool,
    rng: R,
}

impl ParticleEngine<ThreadRng> {
    pub fn new(viewport: Viewport, reduced_motion: bool) -> Self {
        Self::with_rng(viewport, reduced_motion, rand::thread_rng())
    }
}

impl<R: Rng> ParticleEngine<R> {
    pub fn with_rng(viewport: Viewport, reduced_motion: bool, rng: R) -> Self {
        Self {
            particles: Vec::new(),
            surfaces: SurfaceManager::new(viewport),
            reduced_motion,
            animating: false,
            rng,
        }
    }

    /// Spawn `count` particles around an origin given in logical pixels.
    /// Bursts accumulate into the active set; a running loop keeps going.
    pub fn spawn_burst(
        &mut self,
        origin_x: f32,
        origin_y: f32,
        count: usize,
        scheduler: &mut impl FrameScheduler,
    ) {
        if self.reduced_motion {
            return;
        }
        self.surfaces.ensure_surface();

        self.particles.reserve(count);
        for _ in 0..count {
            let particle = Particle {
                x: origin_x + self.rng.gen_range(-JITTER_X..=JITTER_X),
                y: origin_y + self.rng.gen_range(-JITTER_Y..=JITTER_Y),
                vx: self.rng.gen_range(-MAX_VX..=MAX_VX),
                vy: self.rng.gen_range(MIN_VY..=MAX_VY),
                life: self.rng.gen_range(MIN_LIFE..=MAX_LIFE),
                color: *PALETTE.choose(&mut self.rng).unwrap_or(&PALETTE[0]),
                size: self.rng.gen_range(MIN_SIZE..=MAX_SIZE),
            };
            self.particles.push(particle);
        }
        debug!(origin_x, origin_y, count, live = self.particles.len(), "burst spawned");

        if !self.animating {
            self.animating = true;
            scheduler.request_frame();
        }
    }

    /// Frame callback. Steps physics, culls, redraws, and re-requests a frame
    /// while anything is alive. The clear in the step that empties the set is
    /// the final one.
    pub fn step(&mut self, scheduler: &mut impl FrameScheduler) {
        if !self.animating {
            return;
        }
        let Some(surface) = self.surfaces.surface_mut() else {
            self.animating = false;
            return;
        };

        let height = surface.css_height;
        self.particles.retain_mut(|p| {
            p.advance();
            !p.is_expired(height)
        });

        draw(surface, &self.particles);

        if self.particles.is_empty() {
            self.animating = false;
            debug!("confetti loop idle");
        } else {
            scheduler.request_frame();
        }
    }

    pub fn resize_viewport(&mut self, viewport: Viewport) {
        self.surfaces.on_viewport_resize(viewport);
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn live_count(&self) -> usize {
        self.particles.len()
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surfaces.surface()
    }

    #[cfg(test)]
    fn particles_mut(&mut self) -> &mut Vec<Particle> {
        &mut self.particles
    }
}

fn draw(surface: &mut Surface, particles: &[Particle]) {
    surface.clear();
    for p in particles {
        surface.fill_rect(p.x, p.y, p.size, p.size, p.color);
    }
}
