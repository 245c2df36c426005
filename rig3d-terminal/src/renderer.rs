//! ASCII rasterizer for terminal rendering
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Matrix4, Point3, Vector3, Vector4};
use rig3d_core::projection::clip_to_screen;
use rig3d_core::{Camera, Content, Drawable, Material, Scene, Triangle};
use std::io::Write;

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

const LINE_CHAR: char = '.';

/// Smallest clip-space `w` left after near-plane clipping
const MIN_W: f32 = 1e-6;

/// Directional lights, given as positions the light shines from
const LIGHTS: [[f32; 3]; 2] = [[200.0, 400.0, 500.0], [-500.0, 250.0, -200.0]];

/// Ambient term, matching a 0x222222 ambient light
const AMBIENT: f32 = 0x22 as f32 / 255.0;

/// ASCII renderer that converts 3D meshes to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    color_buffer: Vec<Option<Color>>,
    light_dirs: [Vector3<f32>; 2],
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![None; size],
            light_dirs: LIGHTS.map(|[x, y, z]| Vector3::new(x, y, z).normalize()),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Width over height of the viewport in world terms; terminal cells are
    /// about twice as tall as they are wide.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / (self.height.max(1) as f32 * 2.0)
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
        self.color_buffer.fill(None);
    }

    pub fn char_at(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.char_buffer[y * self.width + x])
    }

    pub fn color_at(&self, x: usize, y: usize) -> Option<Color> {
        if x < self.width && y < self.height {
            self.color_buffer[y * self.width + x]
        } else {
            None
        }
    }

    /// Number of cells something was drawn into
    pub fn coverage(&self) -> usize {
        self.depth_buffer.iter().filter(|d| d.is_finite()).count()
    }

    pub fn render_scene(&mut self, scene: &Scene, camera: &Camera) {
        let view_projection = camera.view_projection();
        for drawable in scene.drawables() {
            self.render_drawable(&drawable, &view_projection);
        }
    }

    pub fn render_drawable(&mut self, drawable: &Drawable<'_>, view_projection: &Matrix4<f32>) {
        let mvp = view_projection * drawable.world;
        match drawable.content {
            Content::Mesh { mesh, material } => {
                for triangle in &mesh.triangles {
                    self.render_triangle(triangle, &drawable.world, &mvp, material);
                }
            }
            Content::Lines { segments, material } => {
                for (a, b) in segments {
                    self.render_line(a, b, &mvp, material);
                }
            }
        }
    }

    fn render_triangle(
        &mut self,
        triangle: &Triangle,
        world: &Matrix4<f32>,
        mvp: &Matrix4<f32>,
        material: &Material,
    ) {
        // Only the near plane is clipped here; the rasterizer clamps to the
        // screen and drops fragments past the far plane.
        let polygon = clip_near(&triangle.vertices.map(|v| mvp * v.position.to_homogeneous()));
        if polygon.len() < 3 || polygon.iter().any(|p| p.w < MIN_W) {
            return;
        }
        let (width, height) = (self.width as u32, self.height as u32);
        let screen: Vec<_> = polygon.iter().map(|p| clip_to_screen(p, width, height)).collect();

        // Face normal in world space for shading
        let [a, b, c] = triangle
            .vertices
            .map(|v| world.transform_point(&v.position));
        let Some(normal) = (b - a).cross(&(c - a)).try_normalize(f32::EPSILON) else {
            return;
        };

        let diffuse: f32 = self
            .light_dirs
            .iter()
            .map(|light| normal.dot(light).max(0.0))
            .sum();
        let brightness = (AMBIENT + diffuse).min(1.0);

        // Map brightness to character, never fully blank
        let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
        let char_index = char_index.clamp(1, LUMINOSITY_RAMP.len() - 1);
        let character = LUMINOSITY_RAMP[char_index];

        let color = shade(material, brightness);
        for pair in screen[1..].windows(2) {
            self.rasterize_triangle(&[screen[0], pair[0], pair[1]], character, color);
        }
    }

    fn render_line(&mut self, a: &Point3<f32>, b: &Point3<f32>, mvp: &Matrix4<f32>, material: &Material) {
        let mut start = mvp * a.to_homogeneous();
        let mut end = mvp * b.to_homogeneous();
        let (ds, de) = (near_distance(&start), near_distance(&end));
        if ds < 0.0 && de < 0.0 {
            return;
        }
        if ds < 0.0 {
            start = start.lerp(&end, ds / (ds - de));
        } else if de < 0.0 {
            end = end.lerp(&start, de / (de - ds));
        }
        if start.w < MIN_W || end.w < MIN_W {
            return;
        }

        let (width, height) = (self.width as u32, self.height as u32);
        let Some((start, end)) = clip_to_viewport(
            clip_to_screen(&start, width, height),
            clip_to_screen(&end, width, height),
            self.width as f32,
            self.height as f32,
        ) else {
            return;
        };

        let steps = (end.0 - start.0).abs().max((end.1 - start.1).abs()).ceil().max(1.0) as usize;
        let (r, g, b) = material.color.rgb();
        let color = Color::Rgb { r, g, b };

        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            let x = start.0 + (end.0 - start.0) * t;
            let y = start.1 + (end.1 - start.1) * t;
            let depth = start.2 + (end.2 - start.2) * t;
            self.plot(x as i32, y as i32, depth, LINE_CHAR, color);
        }
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], character: char, color: Color) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        // Scanline rasterization
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                // Barycentric coordinates
                if let Some((w0, w1, w2)) = barycentric(
                    (v0.0, v0.1),
                    (v1.0, v1.1),
                    (v2.0, v2.1),
                    (px, py),
                ) {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        // Interpolate depth
                        let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                        self.plot(x, y, depth, character, color);
                    }
                }
            }
        }
    }

    fn plot(&mut self, x: i32, y: i32, depth: f32, character: char, color: Color) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height || depth > 1.0 {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        if depth < self.depth_buffer[idx] {
            self.depth_buffer[idx] = depth;
            self.char_buffer[idx] = character;
            self.color_buffer[idx] = Some(color);
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut current: Option<Color> = None;
        for y in 0..self.height {
            writer.queue(cursor::MoveTo(0, y as u16))?;
            for x in 0..self.width {
                let idx = y * self.width + x;
                let color = self.color_buffer[idx].unwrap_or(Color::DarkGrey);

                if current != Some(color) {
                    writer.queue(SetForegroundColor(color))?;
                    current = Some(color);
                }
                writer.queue(Print(self.char_buffer[idx]))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Material color scaled by brightness
fn shade(material: &Material, brightness: f32) -> Color {
    let (r, g, b) = material.color.rgb();
    let scale = |c: u8| (c as f32 * brightness).round().clamp(0.0, 255.0) as u8;
    Color::Rgb {
        r: scale(r),
        g: scale(g),
        b: scale(b),
    }
}

/// Signed distance to the near plane in clip space, `z >= -w` is in front
fn near_distance(p: &Vector4<f32>) -> f32 {
    p.z + p.w
}

/// Sutherland-Hodgman against the near plane alone
fn clip_near(polygon: &[Vector4<f32>]) -> Vec<Vector4<f32>> {
    let mut clipped = Vec::with_capacity(polygon.len() + 1);
    for (i, current) in polygon.iter().enumerate() {
        let next = &polygon[(i + 1) % polygon.len()];
        let (dc, dn) = (near_distance(current), near_distance(next));
        if dc >= 0.0 {
            clipped.push(*current);
        }
        if (dc >= 0.0) != (dn >= 0.0) {
            clipped.push(current.lerp(next, dc / (dc - dn)));
        }
    }
    clipped
}

/// Liang-Barsky clip of a screen-space segment to `[0, width] x [0, height]`
fn clip_to_viewport(
    a: (f32, f32, f32),
    b: (f32, f32, f32),
    width: f32,
    height: f32,
) -> Option<((f32, f32, f32), (f32, f32, f32))> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let (mut t0, mut t1) = (0.0f32, 1.0f32);

    for (p, q) in [(-dx, a.0), (dx, width - a.0), (-dy, a.1), (dy, height - a.1)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }

    let at = |t: f32| (a.0 + dx * t, a.1 + dy * t, a.2 + (b.2 - a.2) * t);
    Some((at(t0), at(t1)))
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
