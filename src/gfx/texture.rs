use crate::foundation::core::Canvas;
use crate::foundation::error::{GrisailleError, GrisailleResult};
use crate::gfx::FrameRGBA;

/// One reusable 2D texture slot holding RGBA8 texels.
///
/// The pipeline uploads into the same slot every iteration; the previous
/// contents stay presented until the next successful upload.
#[derive(Clone, Debug, Default)]
pub struct Texture2D {
    width: u32,
    height: u32,
    texels: Vec<u8>,
}

impl Texture2D {
    /// Create an empty slot. Sampling an empty slot yields opaque black, the
    /// same as an incomplete texture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` until the first upload.
    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    /// Dimensions of the uploaded texels, `None` while empty.
    pub fn canvas(&self) -> Option<Canvas> {
        if self.is_empty() {
            None
        } else {
            Some(Canvas {
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Replace the slot contents, reusing the allocation when possible.
    pub fn upload(&mut self, frame: &FrameRGBA) -> GrisailleResult<()> {
        if frame.width == 0 || frame.height == 0 {
            return Err(GrisailleError::validation(
                "texture upload dimensions must be non-zero",
            ));
        }
        if frame.data.len() != frame.canvas().rgba8_len() {
            return Err(GrisailleError::validation(format!(
                "texture upload size mismatch: got {} bytes, expected {}",
                frame.data.len(),
                frame.canvas().rgba8_len()
            )));
        }
        self.width = frame.width;
        self.height = frame.height;
        self.texels.clear();
        self.texels.extend_from_slice(&frame.data);
        Ok(())
    }

    /// Sample at normalized coordinates with clamp-to-edge addressing and
    /// bilinear filtering. Channels are returned in `[0, 1]`.
    pub fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        if self.is_empty() {
            return [0.0, 0.0, 0.0, 1.0];
        }

        let x = u * self.width as f32 - 0.5;
        let y = v * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;

        let max_x = (self.width - 1) as i64;
        let max_y = (self.height - 1) as i64;
        let cx0 = (x0 as i64).clamp(0, max_x);
        let cx1 = (x0 as i64 + 1).clamp(0, max_x);
        let cy0 = (y0 as i64).clamp(0, max_y);
        let cy1 = (y0 as i64 + 1).clamp(0, max_y);

        let t00 = self.texel(cx0 as u32, cy0 as u32);
        let t10 = self.texel(cx1 as u32, cy0 as u32);
        let t01 = self.texel(cx0 as u32, cy1 as u32);
        let t11 = self.texel(cx1 as u32, cy1 as u32);

        let mut out = [0.0f32; 4];
        for c in 0..4 {
            let top = t00[c] + (t10[c] - t00[c]) * fx;
            let bottom = t01[c] + (t11[c] - t01[c]) * fx;
            out[c] = top + (bottom - top) * fy;
        }
        out
    }

    fn texel(&self, x: u32, y: u32) -> [f32; 4] {
        let off = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.texels[off..off + 4];
        [
            f32::from(px[0]) / 255.0,
            f32::from(px[1]) / 255.0,
            f32::from(px[2]) / 255.0,
            f32::from(px[3]) / 255.0,
        ]
    }
}
