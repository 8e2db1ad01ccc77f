//! Back-to-front frame composition.
//!
//! [`plan_frame`] turns a time value into a flat list of [`DrawOp`]s (everything above the
//! backdrop); the CPU backend executes the plan over the cached backdrop. Every quantity is a
//! closed-form function of `t`, so frames can be rendered in any order or in parallel.

use kurbo::{Affine, BezPath};
use rayon::prelude::*;

use crate::foundation::core::{Canvas, Rgba8};
use crate::foundation::error::{SaxcatError, SaxcatResult};
use crate::foundation::math::wrap01;
use crate::render::cpu::{self, BackdropCache};
use crate::render::figure;
use crate::render::frame::FrameRGBA;
use crate::render::glyph::NoteGlyph;

/// Number of floating music-note particles.
pub const PARTICLE_COUNT: usize = 24;
const NOTE_SIZE_PX: f64 = 18.0;
const NOTE_BLUE: Rgba8 = Rgba8::hex(0x60a5fa);
const NOTE_AMBER: Rgba8 = Rgba8::hex(0xf59e0b);

/// One vector draw above the backdrop.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum DrawOp {
    Fill {
        path: BezPath,
        transform: Affine,
        color: Rgba8,
    },
    Stroke {
        path: BezPath,
        transform: Affine,
        color: Rgba8,
        width: f64,
    },
}

/// Draw list for one frame.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FramePlan {
    pub(crate) canvas: Canvas,
    pub(crate) ops: Vec<DrawOp>,
}

pub(crate) fn plan_frame(t: f64, canvas: Canvas) -> SaxcatResult<FramePlan> {
    if !t.is_finite() || t < 0.0 {
        return Err(SaxcatError::validation(format!(
            "frame time must be finite and >= 0, got {t}"
        )));
    }
    canvas.to_u16()?;

    let mut ops = Vec::with_capacity(PARTICLE_COUNT + 48);
    push_particles(&mut ops, t, canvas);

    let fig = figure::figure_transform(t, canvas);
    figure::push_cat(&mut ops, t, fig);
    figure::push_saxophone(&mut ops, t, fig);
    figure::push_limbs(&mut ops, t, fig);
    figure::push_glint(&mut ops, t, fig);

    Ok(FramePlan { canvas, ops })
}

fn push_particles(ops: &mut Vec<DrawOp>, t: f64, canvas: Canvas) {
    let (w, h) = (canvas.w(), canvas.h());
    for i in 0..PARTICLE_COUNT {
        let fi = i as f64;
        let p = wrap01(t * 0.25 + fi * 0.12);
        let x = w * (0.2 + ((i * 53) % 60) as f64 / 100.0);
        let y = h * (0.72 - p * 0.55) + (t * 4.0 + fi).sin() * 6.0;
        let color = if i % 2 == 1 { NOTE_BLUE } else { NOTE_AMBER };
        ops.push(DrawOp::Fill {
            path: NoteGlyph::for_particle(i).outline(NOTE_SIZE_PX),
            transform: Affine::translate((x, y)) * Affine::rotate((t * 3.0 + fi).sin() * 0.2),
            color: color.with_opacity(1.0 - p),
        });
    }
}

/// Renders frames of the clip; holds only output-neutral caches.
#[derive(Clone, Debug, Default)]
pub struct FrameRenderer {
    backdrops: BackdropCache,
}

impl FrameRenderer {
    /// Create a renderer with empty caches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the frame at session time `t` (seconds).
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn render(&mut self, t: f64, canvas: Canvas) -> SaxcatResult<FrameRGBA> {
        let plan = plan_frame(t, canvas)?;
        let backdrop = self.backdrops.get_or_bake(canvas)?;
        cpu::execute_plan(&plan, backdrop)
    }

    /// Render many time values in parallel; output order follows `times`.
    ///
    /// `threads` overrides the worker count (`None` uses rayon defaults).
    pub fn render_range(
        &mut self,
        times: &[f64],
        canvas: Canvas,
        threads: Option<usize>,
    ) -> SaxcatResult<Vec<FrameRGBA>> {
        // Bake once so workers start from a warm cache.
        self.backdrops.get_or_bake(canvas)?;
        let seed = self.clone();
        let pool = build_thread_pool(threads)?;

        let rendered = pool.install(|| {
            times
                .par_iter()
                .map_init(|| seed.clone(), |worker, &t| worker.render(t, canvas))
                .collect::<Vec<_>>()
        });

        let mut out = Vec::with_capacity(rendered.len());
        for frame in rendered {
            out.push(frame?);
        }
        Ok(out)
    }
}

/// Render a single frame with a throwaway renderer.
pub fn render_frame(t: f64, canvas: Canvas) -> SaxcatResult<FrameRGBA> {
    FrameRenderer::new().render(t, canvas)
}

fn build_thread_pool(threads: Option<usize>) -> SaxcatResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(SaxcatError::validation(
            "render threads must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| SaxcatError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/scene.rs"]
mod tests;
