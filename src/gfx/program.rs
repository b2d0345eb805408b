use crate::foundation::error::{GrisailleError, GrisailleResult};
use crate::gfx::target::RenderTarget;
use crate::gfx::texture::Texture2D;

/// Output of the vertex stage: a clip-space position and the texture
/// coordinate interpolated across the primitive.
#[derive(Clone, Copy, Debug)]
pub struct VertexOut {
    /// Clip-space xy in `[-1, 1]`, y up.
    pub clip_pos: [f32; 2],
    /// Normalized texture coordinate, v down.
    pub uv: [f32; 2],
}

/// A two-stage (vertex + fragment) color-transform program.
///
/// The vertex stage emits triangles covering the target; the fragment stage
/// shades one covered pixel from the interpolated texture coordinate against
/// the bound texture.
pub trait ColorProgram {
    /// Number of vertices the vertex stage emits. Must be a multiple of 3.
    fn vertex_count(&self) -> usize;

    /// Vertex stage: produce vertex `index`.
    fn vertex(&self, index: usize) -> VertexOut;

    /// Fragment stage: shade one pixel. Channels are normalized `[0, 1]`.
    fn fragment(&self, uv: [f32; 2], texture: &Texture2D) -> [f32; 4];
}

/// Full-screen quad as two triangles, with the texture's first row mapped to
/// the top of the target.
const QUAD_POS: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [-1.0, 1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [1.0, 1.0],
];
const QUAD_UV: [[f32; 2]; 6] = [
    [0.0, 1.0],
    [1.0, 1.0],
    [0.0, 0.0],
    [0.0, 0.0],
    [1.0, 1.0],
    [1.0, 0.0],
];

/// Weighted-average grayscale conversion (BT.601 luma), alpha passed through.
///
/// Output channels are already equal, so reapplying the program is a no-op.
#[derive(Clone, Copy, Debug, Default)]
pub struct GrayscaleProgram;

impl ColorProgram for GrayscaleProgram {
    fn vertex_count(&self) -> usize {
        QUAD_POS.len()
    }

    fn vertex(&self, index: usize) -> VertexOut {
        VertexOut {
            clip_pos: QUAD_POS[index],
            uv: QUAD_UV[index],
        }
    }

    fn fragment(&self, uv: [f32; 2], texture: &Texture2D) -> [f32; 4] {
        let color = texture.sample(uv[0], uv[1]);
        let gray = color[0] * 0.299 + color[1] * 0.587 + color[2] * 0.114;
        [gray, gray, gray, color[3]]
    }
}

/// Execute one draw pass of `program` into `target`, sampling `texture`.
///
/// Rasterizes the emitted triangles with pixel-center coverage and
/// barycentric uv interpolation. Pixels on a shared edge may be shaded twice
/// with identical inputs.
pub fn draw(
    target: &mut RenderTarget,
    texture: &Texture2D,
    program: &dyn ColorProgram,
) -> GrisailleResult<()> {
    let count = program.vertex_count();
    if count == 0 || count % 3 != 0 {
        return Err(GrisailleError::validation(
            "color program vertex count must be a non-zero multiple of 3",
        ));
    }

    let canvas = target.canvas();
    let (w, h) = (canvas.width as f32, canvas.height as f32);

    for tri in 0..count / 3 {
        let verts = [
            program.vertex(tri * 3),
            program.vertex(tri * 3 + 1),
            program.vertex(tri * 3 + 2),
        ];

        // Clip space to pixel space, y flipped so +1 is the top row.
        let p: Vec<[f32; 2]> = verts
            .iter()
            .map(|v| {
                [
                    (v.clip_pos[0] + 1.0) * 0.5 * w,
                    (1.0 - v.clip_pos[1]) * 0.5 * h,
                ]
            })
            .collect();

        let area = edge(p[0], p[1], p[2]);
        if area == 0.0 {
            continue;
        }

        let min_x = p.iter().map(|v| v[0]).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
        let max_x = (p.iter().map(|v| v[0]).fold(f32::NEG_INFINITY, f32::max).ceil() as u32)
            .min(canvas.width);
        let min_y = p.iter().map(|v| v[1]).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
        let max_y = (p.iter().map(|v| v[1]).fold(f32::NEG_INFINITY, f32::max).ceil() as u32)
            .min(canvas.height);

        for y in min_y..max_y {
            for x in min_x..max_x {
                let c = [x as f32 + 0.5, y as f32 + 0.5];
                let w0 = edge(p[1], p[2], c) / area;
                let w1 = edge(p[2], p[0], c) / area;
                let w2 = edge(p[0], p[1], c) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let uv = [
                    verts[0].uv[0] * w0 + verts[1].uv[0] * w1 + verts[2].uv[0] * w2,
                    verts[0].uv[1] * w0 + verts[1].uv[1] * w1 + verts[2].uv[1] * w2,
                ];
                let color = program.fragment(uv, texture);
                target.put(x, y, to_rgba8(color));
            }
        }
    }

    Ok(())
}

fn edge(a: [f32; 2], b: [f32; 2], c: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

fn to_rgba8(color: [f32; 4]) -> [u8; 4] {
    let mut out = [0u8; 4];
    for (dst, src) in out.iter_mut().zip(color) {
        *dst = (src.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Canvas;

    fn filled_texture(canvas: Canvas, rgba: [u8; 4]) -> Texture2D {
        let mut tex = Texture2D::new();
        let mut texels = Vec::with_capacity(canvas.rgba8_len());
        for _ in 0..(canvas.width * canvas.height) {
            texels.extend_from_slice(&rgba);
        }
        tex.upload(&crate::gfx::FrameRGBA {
            width: canvas.width,
            height: canvas.height,
            data: texels,
        })
        .unwrap();
        tex
    }

    fn run_pass(canvas: Canvas, tex: &Texture2D) -> RenderTarget {
        let mut target = RenderTarget::new(canvas);
        target.clear([0, 0, 0, 255]);
        draw(&mut target, tex, &GrayscaleProgram).unwrap();
        target
    }

    #[test]
    fn quad_covers_every_pixel() {
        let canvas = Canvas {
            width: 7,
            height: 5,
        };
        let tex = filled_texture(canvas, [255, 255, 255, 255]);
        let target = run_pass(canvas, &tex);
        assert!(
            target
                .pixels()
                .chunks_exact(4)
                .all(|px| px == [255, 255, 255, 255])
        );
    }

    #[test]
    fn luma_weights_match_known_colors() {
        let canvas = Canvas {
            width: 4,
            height: 4,
        };
        // round(0.299*200 + 0.587*60 + 0.114*20) == 97
        let tex = filled_texture(canvas, [200, 60, 20, 255]);
        let target = run_pass(canvas, &tex);
        assert!(
            target
                .pixels()
                .chunks_exact(4)
                .all(|px| px == [97, 97, 97, 255])
        );
    }

    #[test]
    fn pure_channels_use_bt601_weights() {
        let canvas = Canvas {
            width: 2,
            height: 2,
        };
        for (rgba, expected) in [
            ([255u8, 0, 0, 255], 76u8),  // round(0.299 * 255)
            ([0, 255, 0, 255], 150),     // round(0.587 * 255)
            ([0, 0, 255, 255], 29),      // round(0.114 * 255)
        ] {
            let tex = filled_texture(canvas, rgba);
            let target = run_pass(canvas, &tex);
            assert!(
                target
                    .pixels()
                    .chunks_exact(4)
                    .all(|px| px == [expected, expected, expected, 255])
            );
        }
    }

    #[test]
    fn grayscale_is_idempotent() {
        let canvas = Canvas {
            width: 8,
            height: 6,
        };
        // Non-uniform input so the second pass sees real structure.
        let mut texels = Vec::with_capacity(canvas.rgba8_len());
        for i in 0..(canvas.width * canvas.height) {
            texels.extend_from_slice(&[
                (i * 7 % 256) as u8,
                (i * 13 % 256) as u8,
                (i * 29 % 256) as u8,
                255,
            ]);
        }
        let mut tex = Texture2D::new();
        tex.upload(&crate::gfx::FrameRGBA {
            width: canvas.width,
            height: canvas.height,
            data: texels,
        })
        .unwrap();

        let once = run_pass(canvas, &tex);

        let mut tex2 = Texture2D::new();
        tex2.upload(&once.to_frame()).unwrap();
        let twice = run_pass(canvas, &tex2);

        assert_eq!(once.pixels(), twice.pixels());
    }

    #[test]
    fn alpha_passes_through() {
        let canvas = Canvas {
            width: 2,
            height: 1,
        };
        let tex = filled_texture(canvas, [100, 100, 100, 77]);
        let mut target = RenderTarget::new(canvas);
        target.clear([0, 0, 0, 255]);
        draw(&mut target, &tex, &GrayscaleProgram).unwrap();
        assert!(target.pixels().chunks_exact(4).all(|px| px[3] == 77));
    }

    #[test]
    fn empty_texture_shades_black() {
        let canvas = Canvas {
            width: 3,
            height: 3,
        };
        let target = run_pass(canvas, &Texture2D::new());
        assert!(
            target
                .pixels()
                .chunks_exact(4)
                .all(|px| px == [0, 0, 0, 255])
        );
    }
}
