use std::collections::HashMap;
use std::sync::Arc;

use crate::foundation::core::{Affine, BezPath, Canvas, Rgba8};
use crate::foundation::error::{SaxcatError, SaxcatResult};
use crate::foundation::math::lerp;
use crate::render::frame::FrameRGBA;
use crate::render::scene::{DrawOp, FramePlan};

const SKY_TOP: Rgba8 = Rgba8::hex(0x0b1222);
const SKY_BOTTOM: Rgba8 = Rgba8::hex(0x0a0f1a);
const FLOOR: Rgba8 = Rgba8::hex(0x0f172a);
const SPOT_RGB: [f64; 3] = [255.0, 240.0, 200.0];
const SPOT_PEAK_ALPHA: f64 = 0.35;
const SPOT_INNER_RADIUS: f64 = 10.0;
const FLOOR_FRACTION: f64 = 0.75;

/// Time-independent stage backdrop (gradient sky, additive spotlight, floor) keyed by canvas.
///
/// Baking is a pure function of the canvas, so the cache never changes frame output.
#[derive(Clone, Default)]
pub(crate) struct BackdropCache {
    images: HashMap<Canvas, vello_cpu::Image>,
}

impl std::fmt::Debug for BackdropCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackdropCache")
            .field("entries", &self.images.len())
            .finish()
    }
}

impl BackdropCache {
    pub(crate) fn get_or_bake(&mut self, canvas: Canvas) -> SaxcatResult<&vello_cpu::Image> {
        if !self.images.contains_key(&canvas) {
            let bytes = bake_backdrop(canvas);
            let image = rgba_premul_to_image(&bytes, canvas)?;
            tracing::debug!(
                width = canvas.width,
                height = canvas.height,
                "baked stage backdrop"
            );
            self.images.insert(canvas, image);
        }
        self.images
            .get(&canvas)
            .ok_or_else(|| SaxcatError::validation("backdrop cache miss after insert"))
    }
}

/// Opaque premultiplied RGBA8 backdrop.
pub(crate) fn bake_backdrop(canvas: Canvas) -> Vec<u8> {
    let (w, h) = (canvas.w(), canvas.h());
    let spot_x = w * 0.55;
    let spot_y = h * -0.05;
    let spot_r = w.max(h) * 0.9;
    let floor_y = h * FLOOR_FRACTION;

    let mut out = vec![0u8; canvas.rgba_len()];
    for (row, line) in out.chunks_exact_mut(canvas.width as usize * 4).enumerate() {
        let py = row as f64 + 0.5;
        let sky = {
            let k = py / h;
            [
                lerp(f64::from(SKY_TOP.r), f64::from(SKY_BOTTOM.r), k),
                lerp(f64::from(SKY_TOP.g), f64::from(SKY_BOTTOM.g), k),
                lerp(f64::from(SKY_TOP.b), f64::from(SKY_BOTTOM.b), k),
            ]
        };
        let on_floor = py >= floor_y;

        for (col, px) in line.chunks_exact_mut(4).enumerate() {
            let px_x = col as f64 + 0.5;
            let rgb = if on_floor {
                [f64::from(FLOOR.r), f64::from(FLOOR.g), f64::from(FLOOR.b)]
            } else {
                let d = ((px_x - spot_x).powi(2) + (py - spot_y).powi(2)).sqrt();
                let a = spotlight_alpha(d, spot_r);
                [
                    sky[0] + SPOT_RGB[0] * a,
                    sky[1] + SPOT_RGB[1] * a,
                    sky[2] + SPOT_RGB[2] * a,
                ]
            };
            px[0] = rgb[0].round().clamp(0.0, 255.0) as u8;
            px[1] = rgb[1].round().clamp(0.0, 255.0) as u8;
            px[2] = rgb[2].round().clamp(0.0, 255.0) as u8;
            px[3] = 255;
        }
    }
    out
}

/// Radial falloff between the inner and outer radius, zero outside the disc.
fn spotlight_alpha(d: f64, outer: f64) -> f64 {
    if d >= outer {
        return 0.0;
    }
    let k = ((d - SPOT_INNER_RADIUS) / (outer - SPOT_INNER_RADIUS)).clamp(0.0, 1.0);
    SPOT_PEAK_ALPHA * (1.0 - k)
}

/// Rasterize `plan` over `backdrop` and read the frame back.
pub(crate) fn execute_plan(
    plan: &FramePlan,
    backdrop: &vello_cpu::Image,
) -> SaxcatResult<FrameRGBA> {
    let (w, h) = plan.canvas.to_u16()?;
    let mut ctx = vello_cpu::RenderContext::new(w, h);

    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(backdrop.clone());
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(w),
        f64::from(h),
    ));

    for op in &plan.ops {
        match op {
            DrawOp::Fill {
                path,
                transform,
                color,
            } => {
                if color.a == 0 {
                    continue;
                }
                ctx.set_transform(affine_to_cpu(*transform));
                ctx.set_paint(color_to_cpu(*color));
                ctx.fill_path(&bezpath_to_cpu(path));
            }
            DrawOp::Stroke {
                path,
                transform,
                color,
                width,
            } => {
                if color.a == 0 || *width <= 0.0 {
                    continue;
                }
                ctx.set_transform(affine_to_cpu(*transform));
                ctx.set_paint(color_to_cpu(*color));
                ctx.set_stroke(vello_cpu::kurbo::Stroke::new(*width));
                ctx.stroke_path(&bezpath_to_cpu(path));
            }
        }
    }

    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);

    Ok(FrameRGBA {
        width: plan.canvas.width,
        height: plan.canvas.height,
        data: pixmap.data_as_u8_slice().to_vec(),
        premultiplied: true,
    })
}

fn color_to_cpu(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;
    let pt = |p: kurbo::Point| vello_cpu::kurbo::Point::new(p.x, p.y);

    let mut out = vello_cpu::kurbo::BezPath::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn rgba_premul_to_image(bytes_premul: &[u8], canvas: Canvas) -> SaxcatResult<vello_cpu::Image> {
    let (w, h) = canvas.to_u16()?;
    if bytes_premul.len() != canvas.rgba_len() {
        return Err(SaxcatError::validation("backdrop byte len mismatch"));
    }
    let pixels = bytes_premul
        .chunks_exact(4)
        .map(|px| {
            vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]])
        })
        .collect::<Vec<_>>();
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, false);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
