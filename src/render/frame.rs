use crate::foundation::math::digest_bytes;

/// A rendered frame as RGBA8 pixels.
///
/// Frames are **premultiplied alpha**. The studio backdrop is opaque, so in practice every
/// pixel has `a == 255`; the flag still makes the convention explicit at API boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// xxh3 digest of the pixel bytes.
    pub fn digest(&self) -> u64 {
        digest_bytes(&self.data)
    }

    /// Premultiplied RGBA of pixel `(x, y)`, if inside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}
