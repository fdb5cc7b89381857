// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Drawing into the bound framebuffer.

A [`Renderer`] borrows the [`Context`] for the duration of one draw sequence.  It draws
into whatever framebuffer, viewport, scissor box and program are bound when it is
created; [`ProgramCommand`](super::ProgramCommand) binds these for the selection being
modified before handing a renderer to the command.

Fragments are shaded into a scratch list first and written afterwards, so a program may
sample the texture it is drawing into and always sees the pixels from before the draw.
*/

use crate::images::bounds::AcceleratedImageLocation;
use crate::pixel_formats::Color;
use crate::raster::arena::{ProgramId, TextureId, VertexArrayId};
use crate::raster::context::{BoundTexture, Context, TargetRect};
use crate::raster::program::{Fragment, LinkedProgram, UniformValue};
use crate::raster::texture::TextureSelection;
use logwise::privacy::LogIt;

/// Draws with the current program into the bound framebuffer.
#[derive(Debug)]
pub struct Renderer<'a> {
    context: &'a mut Context,
    program: ProgramId,
    target: TextureId,
}

impl<'a> Renderer<'a> {
    /// # Panics
    /// If no framebuffer is bound or no program is in use.
    pub fn new(context: &'a mut Context) -> Self {
        let Some(target) = context.bound_framebuffer() else {
            panic!("renderer created with no framebuffer bound");
        };
        let Some(program) = context.current_program() else {
            panic!("renderer created with no program in use");
        };
        Renderer {
            context,
            program,
            target,
        }
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn target(&self) -> TextureId {
        self.target
    }

    pub fn viewport(&self) -> TargetRect {
        self.context.viewport()
    }

    /// Binds `input` to texture `unit` and points the sampler uniform `name` at it.
    ///
    /// The program sees only the selected rectangle through [`ShaderInputs::sample`] and
    /// [`ShaderInputs::texel`].
    ///
    /// # Panics
    /// If `name` is not an active sampler uniform, `unit` is out of range, or the texture
    /// belongs to another context or was deleted.
    pub fn bind_texture(&mut self, unit: u32, name: &str, input: &TextureSelection) {
        self.context.bind_texture_unit(
            unit,
            BoundTexture {
                texture: input.texture(),
                location: input.location(),
            },
        );
        self.set_uniform(name, UniformValue::Sampler(unit));
    }

    /// # Panics
    /// If `name` is not an active uniform of the kind of `value`.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) {
        let program = self.program;
        self.context.program_mut(program).set_value(name, value.into());
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.set_uniform(name, value);
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.set_uniform(name, value);
    }

    pub fn set_vec2(&mut self, name: &str, value: [f32; 2]) {
        self.set_uniform(name, value);
    }

    pub fn set_vec4(&mut self, name: &str, value: [f32; 4]) {
        self.set_uniform(name, value);
    }

    /// Column-major, like the rest of the matrix uniforms.
    pub fn set_mat3(&mut self, name: &str, value: [[f32; 3]; 3]) {
        self.set_uniform(name, value);
    }

    pub fn set_mat4(&mut self, name: &str, value: [[f32; 4]; 4]) {
        self.set_uniform(name, value);
    }

    fn full_target(&self) -> TargetRect {
        let bounds = self.context.texture_bounds(self.target);
        TargetRect {
            x: 0,
            y: 0,
            width: bounds.width(),
            height: bounds.height(),
        }
    }

    /// Pixels a draw may touch: viewport, scissor box and target intersected.
    fn draw_region(&self) -> TargetRect {
        let mut region = self.context.viewport().intersect(&self.full_target());
        if let Some(scissor) = self.context.scissor() {
            region = region.intersect(&scissor);
        }
        region
    }

    /// Fills the scissor box (or the whole target with the scissor test off) with `color`.
    pub fn clear(&mut self, color: Color) {
        let mut region = self.full_target();
        if let Some(scissor) = self.context.scissor() {
            region = region.intersect(&scissor);
        }
        let target = self.target;
        let texture = self.context.texture_mut(target);
        let width = texture.bounds.width() as usize;
        let height = texture.bounds.height();
        for gl_y in region.y..region.y + region.height {
            let row = (height - 1 - gl_y) as usize;
            let start = row * width + region.x as usize;
            texture.pixels[start..start + region.width as usize].fill(color);
        }
    }

    /// Shades every pixel of the viewport, subject to the scissor test.
    pub fn draw_quad(&mut self) {
        let region = self.draw_region();
        logwise::trace_sync!(
            "draw_quad {region}",
            region = LogIt(&region)
        );
        if region.is_empty() {
            return;
        }
        let viewport = self.context.viewport();
        let height = self.full_target().height;
        let program = self.context.program(self.program);
        let inputs = ShaderInputs {
            context: &*self.context,
            program,
        };
        let fragment_fn = program.fragment();
        let mut outputs = Vec::with_capacity(region.width as usize * region.height as usize);
        for gl_y in region.y..region.y + region.height {
            for x in region.x..region.x + region.width {
                let (u, v) = viewport_uv(&viewport, x, gl_y);
                let fragment = Fragment {
                    x,
                    y: height - 1 - gl_y,
                    u,
                    v,
                    varyings: &[],
                };
                outputs.push((x, fragment.y, fragment_fn(&fragment, &inputs)));
            }
        }
        self.write(outputs);
    }

    /// Draws `count` vertices starting at `first` as a triangle list.
    ///
    /// Attribute 0 is the clip-space position; the other attributes are interpolated
    /// across each triangle and handed to the program as [`Fragment::varyings`].  A
    /// trailing partial triangle is ignored.
    ///
    /// # Panics
    /// If the vertex array binds fewer attributes than the program declares, or a vertex
    /// reads past the end of its buffer.
    pub fn draw_triangles(&mut self, vertex_array: VertexArrayId, first: usize, count: usize) {
        let region = self.draw_region();
        logwise::trace_sync!(
            "draw_triangles {count} vertices in {region}",
            count = LogIt(&count),
            region = LogIt(&region)
        );
        let program = self.context.program(self.program);
        let vertices = self.fetch_vertices(program, vertex_array, first, count);
        if region.is_empty() {
            return;
        }
        let viewport = self.context.viewport();
        let height = self.full_target().height;
        let inputs = ShaderInputs {
            context: &*self.context,
            program,
        };
        let fragment_fn = program.fragment();
        let mut varyings = vec![0.0; program.varying_len()];
        let mut outputs = Vec::new();
        for triangle in vertices.chunks_exact(3) {
            let window: Vec<(f32, f32)> = triangle
                .iter()
                .map(|v| to_window(&viewport, v.position))
                .collect();
            let (a, mut b, mut c) = (0, 1, 2);
            let mut area = edge(window[a], window[b], window[c]);
            if area == 0.0 {
                continue;
            }
            if area < 0.0 {
                std::mem::swap(&mut b, &mut c);
                area = -area;
            }
            let (pa, pb, pc) = (window[a], window[b], window[c]);
            let min_x = pa.0.min(pb.0).min(pc.0).floor().max(region.x as f32) as u32;
            let min_y = pa.1.min(pb.1).min(pc.1).floor().max(region.y as f32) as u32;
            let max_x = (pa.0.max(pb.0).max(pc.0).ceil() as i64)
                .clamp(0, (region.x + region.width) as i64) as u32;
            let max_y = (pa.1.max(pb.1).max(pc.1).ceil() as i64)
                .clamp(0, (region.y + region.height) as i64) as u32;
            for gl_y in min_y..max_y {
                for x in min_x..max_x {
                    let p = (x as f32 + 0.5, gl_y as f32 + 0.5);
                    let wa = edge(pb, pc, p);
                    let wb = edge(pc, pa, p);
                    let wc = edge(pa, pb, p);
                    if !covers(wa, pb, pc) || !covers(wb, pc, pa) || !covers(wc, pa, pb) {
                        continue;
                    }
                    let (la, lb, lc) = (wa / area, wb / area, wc / area);
                    for (k, out) in varyings.iter_mut().enumerate() {
                        *out = la * triangle[a].varyings[k]
                            + lb * triangle[b].varyings[k]
                            + lc * triangle[c].varyings[k];
                    }
                    let (u, v) = viewport_uv(&viewport, x, gl_y);
                    let fragment = Fragment {
                        x,
                        y: height - 1 - gl_y,
                        u,
                        v,
                        varyings: &varyings,
                    };
                    outputs.push((x, fragment.y, fragment_fn(&fragment, &inputs)));
                }
            }
        }
        self.write(outputs);
    }

    fn fetch_vertices(
        &self,
        program: &LinkedProgram,
        vertex_array: VertexArrayId,
        first: usize,
        count: usize,
    ) -> Vec<Vertex> {
        let bindings = self.context.vertex_array(vertex_array);
        let declared = program.attributes();
        assert!(
            bindings.len() >= declared.len(),
            "vertex array binds {} attributes, program {} declares {}",
            bindings.len(),
            program.label(),
            declared.len()
        );
        let mut vertices = Vec::with_capacity(count);
        for vertex in first..first + count {
            let mut position = [0.0, 0.0];
            let mut varyings = Vec::with_capacity(program.varying_len());
            for (location, attribute) in declared.iter().enumerate() {
                let binding = &bindings[location];
                let data = self.context.buffer_data(binding.buffer);
                let base = binding.offset + vertex * binding.stride;
                let end = base + binding.components as usize;
                assert!(
                    end <= data.len(),
                    "vertex {vertex} reads {base}..{end} past the end of a buffer of {} floats",
                    data.len()
                );
                let mut value = [0.0, 0.0, 0.0, 1.0];
                value[..binding.components as usize].copy_from_slice(&data[base..end]);
                let value = &value[..attribute.components as usize];
                if location == 0 {
                    position.copy_from_slice(value);
                } else {
                    varyings.extend_from_slice(value);
                }
            }
            vertices.push(Vertex { position, varyings });
        }
        vertices
    }

    fn write(&mut self, outputs: Vec<(u32, u32, Color)>) {
        let target = self.target;
        let texture = self.context.texture_mut(target);
        let width = texture.bounds.width() as usize;
        for (x, y, color) in outputs {
            texture.pixels[y as usize * width + x as usize] = color;
        }
    }
}

struct Vertex {
    position: [f32; 2],
    varyings: Vec<f32>,
}

fn to_window(viewport: &TargetRect, clip: [f32; 2]) -> (f32, f32) {
    (
        viewport.x as f32 + (clip[0] + 1.0) * 0.5 * viewport.width as f32,
        viewport.y as f32 + (clip[1] + 1.0) * 0.5 * viewport.height as f32,
    )
}

/// Position of the pixel center within the viewport, v measured from the top.
fn viewport_uv(viewport: &TargetRect, x: u32, gl_y: u32) -> (f32, f32) {
    let u = (x as f32 + 0.5 - viewport.x as f32) / viewport.width as f32;
    let v = ((viewport.y + viewport.height) as f32 - (gl_y as f32 + 0.5)) / viewport.height as f32;
    (u, v)
}

fn edge(from: (f32, f32), to: (f32, f32), p: (f32, f32)) -> f32 {
    (to.0 - from.0) * (p.1 - from.1) - (to.1 - from.1) * (p.0 - from.0)
}

/// Top-left fill rule for a counter-clockwise triangle, so shared edges are drawn once.
fn covers(weight: f32, from: (f32, f32), to: (f32, f32)) -> bool {
    if weight != 0.0 {
        return weight > 0.0;
    }
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    dy < 0.0 || (dy == 0.0 && dx < 0.0)
}

/// What a fragment function can read: uniforms of the current program and bound textures.
pub struct ShaderInputs<'a> {
    context: &'a Context,
    program: &'a LinkedProgram,
}

impl ShaderInputs<'_> {
    /// # Panics
    /// If the program has no active uniform `name`.
    pub fn uniform(&self, name: &str) -> UniformValue {
        let (location, _) = self.program.expect_uniform(name);
        self.program.value(location)
    }

    pub fn float(&self, name: &str) -> f32 {
        match self.uniform(name) {
            UniformValue::Float(v) => v,
            other => wrong_kind(name, other),
        }
    }

    pub fn int(&self, name: &str) -> i32 {
        match self.uniform(name) {
            UniformValue::Int(v) => v,
            other => wrong_kind(name, other),
        }
    }

    pub fn vec2(&self, name: &str) -> [f32; 2] {
        match self.uniform(name) {
            UniformValue::Vec2(v) => v,
            other => wrong_kind(name, other),
        }
    }

    pub fn vec4(&self, name: &str) -> [f32; 4] {
        match self.uniform(name) {
            UniformValue::Vec4(v) => v,
            other => wrong_kind(name, other),
        }
    }

    pub fn mat3(&self, name: &str) -> [[f32; 3]; 3] {
        match self.uniform(name) {
            UniformValue::Mat3(v) => v,
            other => wrong_kind(name, other),
        }
    }

    pub fn mat4(&self, name: &str) -> [[f32; 4]; 4] {
        match self.uniform(name) {
            UniformValue::Mat4(v) => v,
            other => wrong_kind(name, other),
        }
    }

    fn bound(&self, name: &str) -> BoundTexture {
        let unit = match self.uniform(name) {
            UniformValue::Sampler(unit) => unit,
            other => wrong_kind(name, other),
        };
        match self.context.texture_unit(unit) {
            Some(binding) => binding,
            None => panic!("sampler {name:?} reads texture unit {unit} with nothing bound"),
        }
    }

    /// Size of the selection bound to sampler `name`.
    pub fn texture_size(&self, name: &str) -> (u32, u32) {
        let location = self.bound(name).location;
        (location.width(), location.height())
    }

    /// Nearest-neighbor sample of the selection bound to `name`, with `(0, 0)` its top-left
    /// corner and `(1, 1)` its bottom-right.  Coordinates outside clamp to the edge.
    pub fn sample(&self, name: &str, u: f32, v: f32) -> Color {
        let binding = self.bound(name);
        let location = binding.location;
        if location.is_empty() {
            return Color::TRANSPARENT;
        }
        let x = ((u * location.width() as f32).floor() as i64).clamp(0, location.width() as i64 - 1);
        let y =
            ((v * location.height() as f32).floor() as i64).clamp(0, location.height() as i64 - 1);
        self.read(binding.texture, location, x as u32, y as u32)
    }

    /// Pixel `(x, y)` of the selection bound to `name`, transparent outside it.
    pub fn texel(&self, name: &str, x: i32, y: i32) -> Color {
        let binding = self.bound(name);
        let location = binding.location;
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return Color::TRANSPARENT;
        };
        if x >= location.width() || y >= location.height() {
            return Color::TRANSPARENT;
        }
        self.read(binding.texture, location, x, y)
    }

    fn read(&self, texture: TextureId, location: AcceleratedImageLocation, x: u32, y: u32) -> Color {
        let storage = self.context.texture(texture);
        let index = (location.y() + y) as usize * storage.bounds.width() as usize
            + (location.x() + x) as usize;
        storage.pixels[index]
    }
}

fn wrong_kind(name: &str, value: UniformValue) -> ! {
    panic!("uniform {name:?} is declared as {:?}", value.kind())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::bounds::Bounds;
    use crate::raster::context::VertexAttribute;
    use crate::raster::device::DeviceConfig;
    use crate::raster::program::{ProgramSource, UniformKind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context() -> Context {
        Context::new(&DeviceConfig::default())
    }

    fn bind_whole(context: &mut Context, target: TextureId) {
        let location = context.texture_bounds(target).whole();
        context.bind_target(target, location);
    }

    #[test]
    fn clear_respects_scissor() {
        let mut context = context();
        let target = context.create_texture(2, 2).unwrap();
        let program = context
            .link_program(ProgramSource::new("unused").fragment(|_, _| Color::WHITE))
            .unwrap();
        context.use_program(program);
        //top-left pixel only
        let location = context.texture_bounds(target).clamp(0, 0, 1, 1);
        context.bind_target(target, location);
        Renderer::new(&mut context).clear(Color::BLACK);
        let pixels = context.download_texture(target);
        assert_eq!(
            pixels,
            vec![Color::BLACK, Color::TRANSPARENT, Color::TRANSPARENT, Color::TRANSPARENT]
        );
    }

    #[test]
    fn quad_uv_runs_from_top_left() {
        let mut context = context();
        let target = context.create_texture(2, 2).unwrap();
        let program = context
            .link_program(ProgramSource::new("uv").fragment(|f, _| {
                Color::rgba((f.u * 100.0) as u8, (f.v * 100.0) as u8, f.x as u8, f.y as u8)
            }))
            .unwrap();
        context.use_program(program);
        bind_whole(&mut context, target);
        Renderer::new(&mut context).draw_quad();
        let pixels = context.download_texture(target);
        assert_eq!(pixels[0], Color::rgba(25, 25, 0, 0));
        assert_eq!(pixels[1], Color::rgba(75, 25, 1, 0));
        assert_eq!(pixels[2], Color::rgba(25, 75, 0, 1));
    }

    #[test]
    fn triangles_cover_shared_edges_once() {
        let mut context = context();
        let target = context.create_texture(4, 4).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let move_hits = hits.clone();
        let program = context
            .link_program(
                ProgramSource::new("count")
                    .attribute("position", 2)
                    .attribute("shade", 1)
                    .fragment(move |f, _| {
                        move_hits.fetch_add(1, Ordering::Relaxed);
                        Color::gray((f.varyings[0] * 255.0) as u8)
                    }),
            )
            .unwrap();
        #[rustfmt::skip]
        let data = [
            -1.0, -1.0, 1.0,   1.0, -1.0, 1.0,   1.0, 1.0, 1.0,
            -1.0, -1.0, 1.0,   1.0, 1.0, 1.0,   -1.0, 1.0, 1.0,
        ];
        let buffer = context.create_buffer(&data).unwrap();
        let vao = context
            .create_vertex_array(vec![
                VertexAttribute { buffer, components: 2, stride: 3, offset: 0 },
                VertexAttribute { buffer, components: 1, stride: 3, offset: 2 },
            ])
            .unwrap();
        context.use_program(program);
        bind_whole(&mut context, target);
        Renderer::new(&mut context).draw_triangles(vao, 0, 6);
        assert_eq!(hits.load(Ordering::Relaxed), 16);
        assert!(context.download_texture(target).iter().all(|c| *c == Color::WHITE));
    }

    #[test]
    fn sample_reads_within_the_bound_selection() {
        let mut context = context();
        let source = context.create_texture(2, 1).unwrap();
        context.upload_texture(source, &[Color::BLACK, Color::WHITE]);
        let target = context.create_texture(1, 1).unwrap();
        let program = context
            .link_program(
                ProgramSource::new("copy")
                    .uniform("source", UniformKind::Sampler)
                    .fragment(|f, inputs| {
                        assert_eq!(inputs.texel("source", 1, 0), Color::TRANSPARENT);
                        inputs.sample("source", f.u, f.v)
                    }),
            )
            .unwrap();
        context.use_program(program);
        bind_whole(&mut context, target);
        let selection = TextureSelection::new(source, context.texture_bounds(source).clamp(1, 0, 1, 1));
        let mut renderer = Renderer::new(&mut context);
        renderer.bind_texture(0, "source", &selection);
        renderer.draw_quad();
        assert_eq!(context.download_texture(target), vec![Color::WHITE]);
    }

    #[test]
    fn bound_selection_is_clamped_to_its_texture() {
        let mut context = context();
        let source = context.create_texture(2, 1).unwrap();
        context.upload_texture(source, &[Color::BLACK, Color::WHITE]);
        let target = context.create_texture(1, 4).unwrap();
        let program = context
            .link_program(
                ProgramSource::new("copy")
                    .uniform("source", UniformKind::Sampler)
                    .fragment(|f, inputs| {
                        assert_eq!(inputs.texture_size("source"), (2, 1));
                        assert_eq!(inputs.texel("source", 0, 3), Color::TRANSPARENT);
                        inputs.sample("source", f.u, f.v)
                    }),
            )
            .unwrap();
        context.use_program(program);
        bind_whole(&mut context, target);
        //a location clamped against taller bounds than the texture has
        let oversized = TextureSelection::new(source, Bounds::new(2, 5).clamp(0, 0, 2, 5));
        let mut renderer = Renderer::new(&mut context);
        renderer.bind_texture(0, "source", &oversized);
        renderer.draw_quad();
        assert_eq!(context.download_texture(target), vec![Color::WHITE; 4]);
    }

    #[test]
    #[should_panic(expected = "no active uniform")]
    fn unknown_uniform_panics() {
        let mut context = context();
        let target = context.create_texture(1, 1).unwrap();
        let program = context
            .link_program(ProgramSource::new("plain").fragment(|_, _| Color::WHITE))
            .unwrap();
        context.use_program(program);
        bind_whole(&mut context, target);
        Renderer::new(&mut context).set_float("missing", 1.0);
    }
}
