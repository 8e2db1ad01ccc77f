use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{SaxcatError, SaxcatResult};
use crate::render::frame::FrameRGBA;

/// The live preview surface: the most recently presented frame.
///
/// Presenting replaces the previous frame; nothing is accumulated.
#[derive(Debug, Default)]
pub struct PreviewSurface {
    latest: Option<PresentedFrame>,
    presented: u64,
}

/// A frame shown on the surface together with its timeline position.
#[derive(Clone, Debug)]
pub struct PresentedFrame {
    /// Frame index within the session.
    pub index: FrameIndex,
    /// Session time the frame was rendered for.
    pub time_secs: f64,
    /// Pixels.
    pub frame: FrameRGBA,
}

impl PreviewSurface {
    /// Empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `frame` as the current image.
    pub fn present(&mut self, index: FrameIndex, time_secs: f64, frame: &FrameRGBA) {
        match self.latest.as_mut() {
            Some(slot) if slot.frame.data.len() == frame.data.len() => {
                slot.index = index;
                slot.time_secs = time_secs;
                slot.frame.width = frame.width;
                slot.frame.height = frame.height;
                slot.frame.data.copy_from_slice(&frame.data);
            }
            _ => {
                self.latest = Some(PresentedFrame {
                    index,
                    time_secs,
                    frame: frame.clone(),
                });
            }
        }
        self.presented += 1;
    }

    /// The current image, if anything was presented.
    pub fn latest(&self) -> Option<&PresentedFrame> {
        self.latest.as_ref()
    }

    /// Total frames presented since creation.
    pub fn frames_presented(&self) -> u64 {
        self.presented
    }

    /// Write the current image as a PNG.
    pub fn save_png(&self, path: &Path) -> SaxcatResult<()> {
        let latest = self
            .latest
            .as_ref()
            .ok_or_else(|| SaxcatError::validation("preview surface has no frame yet"))?;
        write_png(&latest.frame, path)
    }
}

/// Write a frame as an RGBA PNG, creating parent directories.
pub fn write_png(frame: &FrameRGBA, path: &Path) -> SaxcatResult<()> {
    crate::encode::ffmpeg::ensure_parent_dir(path)?;
    let rgba = if frame.premultiplied {
        unpremultiply(&frame.data)
    } else {
        frame.data.clone()
    };
    image::save_buffer_with_format(
        path,
        &rgba,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

fn unpremultiply(premul: &[u8]) -> Vec<u8> {
    let mut out = premul.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
