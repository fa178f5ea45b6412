//! CPU backend: rasterises egui meshes into RGBA8 buffers.
//!
//! Triangles are filled with edge functions at pixel centres, colours and
//! UVs interpolated barycentrically, textures sampled nearest-texel and
//! blended premultiplied-over. Enough fidelity for compositors that accept
//! raw pixels, and for checking what a frame contains.

use super::{GraphicsBackend, OverlayTexture, RenderTargetId, TextureContent, UiFrame};
use crate::{
    error::{BackendError, OverlayError},
    runtime::VrRuntime,
    surface::{OverlayHandle, SurfaceKind},
};
use egui::{epaint::Primitive, Color32, ImageData, Mesh, Rect, TextureId};
use std::collections::HashMap;
use tracing::trace;

/// Largest render target edge, matching common GPU limits.
pub const MAX_DIMENSION: u32 = 8192;

/// Premultiplied RGBA8 buffer, rows top to bottom.
#[derive(Debug, Clone)]
pub struct PixelTarget {
    pub width: u32,
    pub height: u32,
    pixels: Vec<[u8; 4]>,
}

impl PixelTarget {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0; 4]; width as usize * height as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    fn fill(&mut self, rgba: [u8; 4]) {
        self.pixels.fill(rgba);
    }
}

#[derive(Debug, Clone)]
struct PixelTexture {
    width: usize,
    height: usize,
    pixels: Vec<Color32>,
}

impl PixelTexture {
    fn sample(&self, u: f32, v: f32) -> Color32 {
        if self.width == 0 || self.height == 0 {
            return Color32::WHITE;
        }
        let x = ((u * self.width as f32) as isize).clamp(0, self.width as isize - 1) as usize;
        let y = ((v * self.height as f32) as isize).clamp(0, self.height as isize - 1) as usize;
        self.pixels[y * self.width + x]
    }
}

#[derive(Debug, Default)]
pub struct SoftwareBackend {
    targets: HashMap<RenderTargetId, PixelTarget>,
    textures: HashMap<(SurfaceKind, TextureId), PixelTexture>,
    bound: Option<RenderTargetId>,
    next_id: u64,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    pub fn target(&self, id: RenderTargetId) -> Option<&PixelTarget> {
        self.targets.get(&id)
    }

    fn apply_texture_delta(&mut self, surface: SurfaceKind, id: TextureId, delta: &egui::epaint::ImageDelta) {
        let (width, height, pixels): (usize, usize, Vec<Color32>) = match &delta.image {
            ImageData::Color(image) => (image.width(), image.height(), image.pixels.clone()),
            ImageData::Font(font) => (font.width(), font.height(), font.srgba_pixels(None).collect()),
        };
        match delta.pos {
            None => {
                self.textures
                    .insert((surface, id), PixelTexture { width, height, pixels });
            }
            Some([x0, y0]) => {
                let Some(texture) = self.textures.get_mut(&(surface, id)) else {
                    return;
                };
                for row in 0..height {
                    let y = y0 + row;
                    if y >= texture.height {
                        break;
                    }
                    for col in 0..width {
                        let x = x0 + col;
                        if x >= texture.width {
                            break;
                        }
                        texture.pixels[y * texture.width + x] = pixels[row * width + col];
                    }
                }
            }
        }
    }
}

fn to_u8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[inline]
fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

fn rasterize_mesh(target: &mut PixelTarget, texture: Option<&PixelTexture>, clip: Rect, mesh: &Mesh, ppp: f32) {
    let clip_x0 = (clip.min.x * ppp).floor().max(0.0) as i64;
    let clip_y0 = (clip.min.y * ppp).floor().max(0.0) as i64;
    let clip_x1 = ((clip.max.x * ppp).ceil() as i64).min(target.width as i64);
    let clip_y1 = ((clip.max.y * ppp).ceil() as i64).min(target.height as i64);
    if clip_x0 >= clip_x1 || clip_y0 >= clip_y1 {
        return;
    }

    for tri in mesh.indices.chunks_exact(3) {
        let (Some(a), Some(b), Some(c)) = (
            mesh.vertices.get(tri[0] as usize),
            mesh.vertices.get(tri[1] as usize),
            mesh.vertices.get(tri[2] as usize),
        ) else {
            continue;
        };
        let verts = [a, b, c];
        let p = verts.map(|v| [v.pos.x * ppp, v.pos.y * ppp]);
        let area = edge(p[0], p[1], p[2]);
        if area.abs() < f32::EPSILON {
            continue;
        }

        let min_x = (p[0][0].min(p[1][0]).min(p[2][0]).floor() as i64).max(clip_x0);
        let min_y = (p[0][1].min(p[1][1]).min(p[2][1]).floor() as i64).max(clip_y0);
        let max_x = (p[0][0].max(p[1][0]).max(p[2][0]).ceil() as i64).min(clip_x1);
        let max_y = (p[0][1].max(p[1][1]).max(p[2][1]).ceil() as i64).min(clip_y1);

        let colors = verts.map(|v| v.color.to_array().map(|c| c as f32));

        for y in min_y..max_y {
            for x in min_x..max_x {
                let pt = [x as f32 + 0.5, y as f32 + 0.5];
                // Dividing by the signed area makes the test winding-agnostic.
                let w0 = edge(p[1], p[2], pt) / area;
                let w1 = edge(p[2], p[0], pt) / area;
                let w2 = edge(p[0], p[1], pt) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let mut src = [0.0f32; 4];
                for (i, s) in src.iter_mut().enumerate() {
                    *s = colors[0][i] * w0 + colors[1][i] * w1 + colors[2][i] * w2;
                }
                if let Some(texture) = texture {
                    let u = a.uv.x * w0 + b.uv.x * w1 + c.uv.x * w2;
                    let v = a.uv.y * w0 + b.uv.y * w1 + c.uv.y * w2;
                    let texel = texture.sample(u, v).to_array();
                    for (s, t) in src.iter_mut().zip(texel) {
                        *s = *s * t as f32 / 255.0;
                    }
                }

                let idx = (y as usize) * target.width as usize + x as usize;
                let dst = &mut target.pixels[idx];
                let inv_a = 1.0 - src[3] / 255.0;
                for i in 0..4 {
                    let out = src[i] + dst[i] as f32 * inv_a;
                    dst[i] = out.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }
}

impl GraphicsBackend for SoftwareBackend {
    fn name(&self) -> &'static str {
        "software"
    }

    fn allocate_render_target(&mut self, width: u32, height: u32, label: &str) -> Result<RenderTargetId, BackendError> {
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(BackendError::Allocation {
                width,
                height,
                reason: format!("dimensions must be within 1..={MAX_DIMENSION}"),
            });
        }
        let id = RenderTargetId(self.next_id);
        self.next_id += 1;
        self.targets.insert(id, PixelTarget::new(width, height));
        trace!(id = id.0, width, height, label, "Pixel target allocated");
        Ok(id)
    }

    fn release_render_target(&mut self, target: RenderTargetId) {
        self.targets.remove(&target);
        if self.bound == Some(target) {
            self.bound = None;
        }
    }

    fn bind_render_target(&mut self, target: RenderTargetId) -> Result<(), BackendError> {
        if !self.targets.contains_key(&target) {
            return Err(BackendError::UnknownTarget(target.0));
        }
        self.bound = Some(target);
        Ok(())
    }

    fn clear(&mut self, color: [f32; 4]) -> Result<(), BackendError> {
        let id = self.bound.ok_or(BackendError::NothingBound)?;
        let target = self.targets.get_mut(&id).ok_or(BackendError::UnknownTarget(id.0))?;
        let a = color[3].clamp(0.0, 1.0);
        target.fill([to_u8(color[0] * a), to_u8(color[1] * a), to_u8(color[2] * a), to_u8(a)]);
        Ok(())
    }

    fn paint(&mut self, frame: &UiFrame<'_>) -> Result<(), BackendError> {
        for (id, delta) in &frame.textures_delta.set {
            self.apply_texture_delta(frame.surface, *id, delta);
        }

        let id = self.bound.ok_or(BackendError::NothingBound)?;
        let target = self.targets.get_mut(&id).ok_or(BackendError::UnknownTarget(id.0))?;
        for clipped in frame.primitives {
            match &clipped.primitive {
                Primitive::Mesh(mesh) => {
                    let texture = self.textures.get(&(frame.surface, mesh.texture_id));
                    rasterize_mesh(target, texture, clipped.clip_rect, mesh, frame.pixels_per_point);
                }
                Primitive::Callback(_) => trace!("Paint callbacks are not supported by the software backend"),
            }
        }

        for id in &frame.textures_delta.free {
            self.textures.remove(&(frame.surface, *id));
        }
        Ok(())
    }

    fn present_to_overlay(
        &mut self,
        target: RenderTargetId,
        handle: OverlayHandle,
        runtime: &mut dyn VrRuntime,
    ) -> Result<(), OverlayError> {
        let t = self
            .targets
            .get(&target)
            .ok_or(BackendError::UnknownTarget(target.0))?;
        runtime.set_overlay_texture(
            handle,
            &OverlayTexture {
                target,
                width: t.width,
                height: t.height,
                content: TextureContent::Pixels(t.as_bytes()),
            },
        )?;
        Ok(())
    }

    fn read_pixel(&self, target: RenderTargetId, x: u32, y: u32) -> Option<[u8; 4]> {
        self.targets.get(&target)?.pixel(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{epaint::Vertex, pos2, ClippedPrimitive};

    fn quad(min: egui::Pos2, max: egui::Pos2, color: Color32) -> Mesh {
        let mut mesh = Mesh::default();
        mesh.add_colored_rect(Rect::from_min_max(min, max), color);
        mesh
    }

    fn paint(backend: &mut SoftwareBackend, mesh: Mesh) {
        let primitives = vec![ClippedPrimitive {
            clip_rect: Rect::EVERYTHING,
            primitive: Primitive::Mesh(mesh),
        }];
        let delta = egui::TexturesDelta::default();
        backend
            .paint(&UiFrame {
                surface: SurfaceKind::Hud,
                primitives: &primitives,
                textures_delta: &delta,
                pixels_per_point: 1.0,
                size_px: [16, 16],
            })
            .unwrap();
    }

    #[test]
    fn clear_then_opaque_quad() {
        let mut backend = SoftwareBackend::new();
        let id = backend.allocate_render_target(16, 16, "t").unwrap();
        backend.bind_render_target(id).unwrap();
        backend.clear([0.0, 0.0, 1.0, 1.0]).unwrap();
        paint(&mut backend, quad(pos2(4.0, 4.0), pos2(8.0, 8.0), Color32::RED));

        assert_eq!(backend.read_pixel(id, 5, 5), Some([255, 0, 0, 255]));
        assert_eq!(backend.read_pixel(id, 0, 0), Some([0, 0, 255, 255]));
        assert_eq!(backend.read_pixel(id, 8, 8), Some([0, 0, 255, 255]));
        assert_eq!(backend.read_pixel(id, 16, 0), None);
    }

    #[test]
    fn translucent_quad_blends_premultiplied() {
        let mut backend = SoftwareBackend::new();
        let id = backend.allocate_render_target(4, 4, "t").unwrap();
        backend.bind_render_target(id).unwrap();
        backend.clear([1.0, 1.0, 1.0, 1.0]).unwrap();
        let half_black = Color32::from_rgba_premultiplied(0, 0, 0, 128);
        paint(&mut backend, quad(pos2(0.0, 0.0), pos2(4.0, 4.0), half_black));
        let [r, _, _, a] = backend.read_pixel(id, 1, 1).unwrap();
        assert_eq!(a, 255);
        assert!((126..=128).contains(&r), "got {r}");
    }

    #[test]
    fn degenerate_and_out_of_range_indices_are_skipped() {
        let mut backend = SoftwareBackend::new();
        let id = backend.allocate_render_target(4, 4, "t").unwrap();
        backend.bind_render_target(id).unwrap();
        backend.clear([0.0, 0.0, 0.0, 0.0]).unwrap();
        let mut mesh = Mesh::default();
        mesh.vertices.push(Vertex {
            pos: pos2(0.0, 0.0),
            uv: egui::epaint::WHITE_UV,
            color: Color32::WHITE,
        });
        mesh.indices.extend([0, 0, 0, 0, 1, 2]);
        paint(&mut backend, mesh);
        assert_eq!(backend.read_pixel(id, 0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn rejects_impossible_targets_and_unbound_draws() {
        let mut backend = SoftwareBackend::new();
        assert!(backend.allocate_render_target(0, 10, "t").is_err());
        assert!(backend.allocate_render_target(MAX_DIMENSION + 1, 10, "t").is_err());
        assert_eq!(backend.clear([0.0; 4]), Err(BackendError::NothingBound));
        let id = backend.allocate_render_target(2, 2, "t").unwrap();
        backend.release_render_target(id);
        assert_eq!(backend.bind_render_target(id), Err(BackendError::UnknownTarget(id.0)));
    }
}
