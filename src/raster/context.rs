// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The driver context: every resource and every piece of bound state.

A [`Context`] lives inside a [`ConfinedCell`](super::cell::ConfinedCell) on the loop
thread and is reached through [`Device::execute`](super::Device::execute).  Bound state
(framebuffer, viewport, scissor box, program, texture units) is only meaningful for the
duration of one job: other jobs run in between, so each operation binds what it needs
right before using it.

Rectangles in bound state use the driver's convention, with row 0 at the *bottom*; see
[`TargetRect`].
*/

use crate::images::bounds::{AcceleratedImageLocation, Bounds};
use crate::pixel_formats::Color;
use crate::raster::arena::{
    Arena, BufferId, ContextId, ProgramId, RawHandle, TextureId, VertexArrayId,
};
use crate::raster::device::DeviceConfig;
use crate::raster::error::DriverError;
use crate::raster::program::{LinkedProgram, ProgramSource};
use logwise::privacy::LogIt;
use std::fmt::{Debug, Formatter};

const BYTES_PER_TEXEL: usize = 4;
const BYTES_PER_FLOAT: usize = 4;

/// A rectangle of a render target with row 0 at the bottom.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TargetRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TargetRect {
    /// Converts an image-space location (row 0 at the top) of a target `target_height` rows tall.
    pub fn flipped(location: AcceleratedImageLocation, target_height: u32) -> Self {
        TargetRect {
            x: location.x(),
            y: target_height - location.height() - location.y(),
            width: location.width(),
            height: location.height(),
        }
    }

    pub fn intersect(&self, other: &TargetRect) -> TargetRect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.width).min(other.x + other.width);
        let y1 = (self.y + self.height).min(other.y + other.height);
        TargetRect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A float-buffer binding for one vertex attribute.  Strides and offsets count floats.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub buffer: BufferId,
    pub components: u8,
    pub stride: usize,
    pub offset: usize,
}

#[derive(Debug)]
pub(crate) struct TextureStorage {
    pub(crate) bounds: Bounds,
    pub(crate) pixels: Vec<Color>,
}

/// A texture unit binding: which texture, and which part of it a shader sees.
#[derive(Copy, Clone, Debug)]
pub(crate) struct BoundTexture {
    pub(crate) texture: TextureId,
    pub(crate) location: AcceleratedImageLocation,
}

pub struct Context {
    id: ContextId,
    label: String,
    max_texture_dimension: u32,
    memory_budget: Option<usize>,
    allocated: usize,
    lost: bool,

    textures: Arena<TextureStorage>,
    buffers: Arena<Vec<f32>>,
    vertex_arrays: Arena<Vec<VertexAttribute>>,
    programs: Arena<LinkedProgram>,

    bound_framebuffer: Option<TextureId>,
    viewport: TargetRect,
    scissor: Option<TargetRect>,
    current_program: Option<ProgramId>,
    texture_units: Vec<Option<BoundTexture>>,
}

impl Context {
    pub(crate) fn new(config: &DeviceConfig) -> Self {
        let id = ContextId::next();
        logwise::info_sync!(
            "creating context {label} {id}",
            label = LogIt(&config.label),
            id = LogIt(&id)
        );
        Context {
            id,
            label: config.label.clone(),
            max_texture_dimension: config.max_texture_dimension,
            memory_budget: config.memory_budget,
            allocated: 0,
            lost: false,
            textures: Arena::new(),
            buffers: Arena::new(),
            vertex_arrays: Arena::new(),
            programs: Arena::new(),
            bound_framebuffer: None,
            viewport: TargetRect::default(),
            scissor: None,
            current_program: None,
            texture_units: vec![None; config.texture_units as usize],
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// True after an out-of-memory error; the context has to be recreated.
    pub fn is_lost(&self) -> bool {
        self.lost
    }

    pub fn allocated_bytes(&self) -> usize {
        self.allocated
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    fn handle(&self, handle: RawHandle, kind: &str) -> (u32, u32) {
        assert_eq!(
            handle.context, self.id,
            "{kind} of context {:?} used with context {:?} ({})",
            handle.context, self.id, self.label
        );
        (handle.index, handle.generation)
    }

    fn allocate(&mut self, bytes: usize) -> Result<(), DriverError> {
        if self.lost {
            return Err(DriverError::ContextLost);
        }
        if let Some(budget) = self.memory_budget {
            let available = budget.saturating_sub(self.allocated);
            if bytes > available {
                self.lost = true;
                logwise::error_sync!(
                    "context {label} out of memory: requested {requested}, available {available}",
                    label = LogIt(&self.label),
                    requested = LogIt(&bytes),
                    available = LogIt(&available)
                );
                return Err(DriverError::OutOfMemory {
                    requested: bytes,
                    available,
                });
            }
        }
        self.allocated += bytes;
        Ok(())
    }

    fn release(&mut self, bytes: usize) {
        self.allocated = self.allocated.saturating_sub(bytes);
    }

    // textures

    /// Creates a transparent texture.
    pub fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureId, DriverError> {
        if width > self.max_texture_dimension || height > self.max_texture_dimension {
            return Err(DriverError::InvalidDimensions {
                width,
                height,
                max: self.max_texture_dimension,
            });
        }
        let bounds = Bounds::new(width, height);
        self.allocate(bounds.len() * BYTES_PER_TEXEL)?;
        let (index, generation) = self.textures.insert(TextureStorage {
            bounds,
            pixels: vec![Color::TRANSPARENT; bounds.len()],
        });
        let id = TextureId(RawHandle {
            context: self.id,
            index,
            generation,
        });
        logwise::trace_sync!(
            "created texture {id} {width}x{height}",
            id = LogIt(&id),
            width = LogIt(&width),
            height = LogIt(&height)
        );
        Ok(id)
    }

    pub(crate) fn texture(&self, id: TextureId) -> &TextureStorage {
        let (index, generation) = self.handle(id.0, "texture");
        match self.textures.get(index, generation) {
            Some(t) => t,
            None => panic!("use of deleted texture {id:?}"),
        }
    }

    pub(crate) fn texture_mut(&mut self, id: TextureId) -> &mut TextureStorage {
        let (index, generation) = self.handle(id.0, "texture");
        match self.textures.get_mut(index, generation) {
            Some(t) => t,
            None => panic!("use of deleted texture {id:?}"),
        }
    }

    pub fn texture_bounds(&self, id: TextureId) -> Bounds {
        self.texture(id).bounds
    }

    /// Replaces the texture's pixels, row-major from the top-left.
    pub fn upload_texture(&mut self, id: TextureId, pixels: &[Color]) {
        let texture = self.texture_mut(id);
        assert_eq!(
            pixels.len(),
            texture.pixels.len(),
            "upload of {} pixels into texture {id:?} of {} pixels",
            pixels.len(),
            texture.pixels.len()
        );
        texture.pixels.copy_from_slice(pixels);
    }

    /// The texture's pixels, row-major from the top-left.
    pub fn download_texture(&self, id: TextureId) -> Vec<Color> {
        self.texture(id).pixels.clone()
    }

    /// # Panics
    /// If the texture was already deleted or belongs to another context.
    pub fn delete_texture(&mut self, id: TextureId) {
        let (index, generation) = self.handle(id.0, "texture");
        let Some(storage) = self.textures.remove(index, generation) else {
            panic!("use of deleted texture {id:?}");
        };
        self.release(storage.pixels.len() * BYTES_PER_TEXEL);
        if self.bound_framebuffer == Some(id) {
            self.bound_framebuffer = None;
        }
        for unit in &mut self.texture_units {
            if unit.is_some_and(|b| b.texture == id) {
                *unit = None;
            }
        }
        logwise::trace_sync!("deleted texture {id}", id = LogIt(&id));
    }

    /// Deletes the texture if it still exists.  Used when an owner goes away.
    pub(crate) fn release_texture(&mut self, id: TextureId) {
        if id.0.context == self.id && self.textures.get(id.0.index, id.0.generation).is_some() {
            self.delete_texture(id);
        }
    }

    // buffers

    pub fn create_buffer(&mut self, data: &[f32]) -> Result<BufferId, DriverError> {
        self.allocate(data.len() * BYTES_PER_FLOAT)?;
        let (index, generation) = self.buffers.insert(data.to_vec());
        Ok(BufferId(RawHandle {
            context: self.id,
            index,
            generation,
        }))
    }

    pub fn buffer_data(&self, id: BufferId) -> &[f32] {
        let (index, generation) = self.handle(id.0, "buffer");
        match self.buffers.get(index, generation) {
            Some(b) => b,
            None => panic!("use of deleted buffer {id:?}"),
        }
    }

    /// Overwrites part of a buffer.
    ///
    /// # Panics
    /// If the write extends past the end of the buffer.
    pub fn update_buffer(&mut self, id: BufferId, offset: usize, data: &[f32]) {
        let (index, generation) = self.handle(id.0, "buffer");
        let Some(buffer) = self.buffers.get_mut(index, generation) else {
            panic!("use of deleted buffer {id:?}");
        };
        let end = offset + data.len();
        assert!(
            end <= buffer.len(),
            "write of {offset}..{end} runs past the end of buffer {id:?} ({} floats)",
            buffer.len()
        );
        buffer[offset..end].copy_from_slice(data);
    }

    pub fn delete_buffer(&mut self, id: BufferId) {
        let (index, generation) = self.handle(id.0, "buffer");
        let Some(buffer) = self.buffers.remove(index, generation) else {
            panic!("use of deleted buffer {id:?}");
        };
        self.release(buffer.len() * BYTES_PER_FLOAT);
    }

    // vertex arrays

    pub fn create_vertex_array(
        &mut self,
        attributes: Vec<VertexAttribute>,
    ) -> Result<VertexArrayId, DriverError> {
        if self.lost {
            return Err(DriverError::ContextLost);
        }
        for attribute in &attributes {
            self.buffer_data(attribute.buffer);
            assert!(
                (1..=4).contains(&attribute.components),
                "vertex attribute with {} components",
                attribute.components
            );
            assert!(
                attribute.stride >= attribute.components as usize,
                "vertex attribute stride {} is shorter than its {} components",
                attribute.stride,
                attribute.components
            );
        }
        let (index, generation) = self.vertex_arrays.insert(attributes);
        Ok(VertexArrayId(RawHandle {
            context: self.id,
            index,
            generation,
        }))
    }

    pub(crate) fn vertex_array(&self, id: VertexArrayId) -> &[VertexAttribute] {
        let (index, generation) = self.handle(id.0, "vertex array");
        match self.vertex_arrays.get(index, generation) {
            Some(v) => v,
            None => panic!("use of deleted vertex array {id:?}"),
        }
    }

    pub fn delete_vertex_array(&mut self, id: VertexArrayId) {
        let (index, generation) = self.handle(id.0, "vertex array");
        if self.vertex_arrays.remove(index, generation).is_none() {
            panic!("use of deleted vertex array {id:?}");
        }
    }

    // programs

    /// Compiles and links `source`.
    pub fn link_program(&mut self, source: ProgramSource) -> Result<ProgramId, DriverError> {
        if self.lost {
            return Err(DriverError::ContextLost);
        }
        let linked = source.compile().and_then(|c| c.link()).inspect_err(|e| {
            logwise::warn_sync!("program failed: {error}", error = LogIt(e));
        })?;
        let (index, generation) = self.programs.insert(linked);
        Ok(ProgramId(RawHandle {
            context: self.id,
            index,
            generation,
        }))
    }

    pub fn program(&self, id: ProgramId) -> &LinkedProgram {
        let (index, generation) = self.handle(id.0, "program");
        match self.programs.get(index, generation) {
            Some(p) => p,
            None => panic!("use of deleted program {id:?}"),
        }
    }

    pub(crate) fn program_mut(&mut self, id: ProgramId) -> &mut LinkedProgram {
        let (index, generation) = self.handle(id.0, "program");
        match self.programs.get_mut(index, generation) {
            Some(p) => p,
            None => panic!("use of deleted program {id:?}"),
        }
    }

    pub fn delete_program(&mut self, id: ProgramId) {
        let (index, generation) = self.handle(id.0, "program");
        if self.programs.remove(index, generation).is_none() {
            panic!("use of deleted program {id:?}");
        }
        if self.current_program == Some(id) {
            self.current_program = None;
        }
    }

    pub(crate) fn release_program(&mut self, id: ProgramId) {
        if id.0.context == self.id && self.programs.get(id.0.index, id.0.generation).is_some() {
            self.delete_program(id);
        }
    }

    // bound state

    pub fn bind_framebuffer(&mut self, target: TextureId) {
        self.texture(target);
        self.bound_framebuffer = Some(target);
    }

    pub fn bound_framebuffer(&self) -> Option<TextureId> {
        self.bound_framebuffer
    }

    pub fn set_viewport(&mut self, viewport: TargetRect) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> TargetRect {
        self.viewport
    }

    /// `None` disables the scissor test.
    pub fn set_scissor(&mut self, scissor: Option<TargetRect>) {
        self.scissor = scissor;
    }

    pub fn scissor(&self) -> Option<TargetRect> {
        self.scissor
    }

    pub fn use_program(&mut self, program: ProgramId) {
        self.program(program);
        self.current_program = Some(program);
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    /// Binds `target` and scopes viewport and scissor box to `location`, flipped.
    pub(crate) fn bind_target(&mut self, target: TextureId, location: AcceleratedImageLocation) {
        self.bind_framebuffer(target);
        let rect = TargetRect::flipped(location, self.texture_bounds(target).height());
        self.set_viewport(rect);
        self.set_scissor(Some(rect));
    }

    pub fn texture_units(&self) -> usize {
        self.texture_units.len()
    }

    /// Binds `binding`, clamping its location against the texture it names.
    pub(crate) fn bind_texture_unit(&mut self, unit: u32, mut binding: BoundTexture) {
        binding.location = self
            .texture(binding.texture)
            .bounds
            .clamp_location(binding.location);
        let units = self.texture_units.len();
        match self.texture_units.get_mut(unit as usize) {
            Some(slot) => *slot = Some(binding),
            None => panic!("texture unit {unit} out of range, context has {units} units"),
        }
    }

    pub(crate) fn texture_unit(&self, unit: u32) -> Option<BoundTexture> {
        self.texture_units.get(unit as usize).copied().flatten()
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("allocated", &self.allocated)
            .field("lost", &self.lost)
            .field("textures", &self.textures.len())
            .field("programs", &self.programs.len())
            .field("bound_framebuffer", &self.bound_framebuffer)
            .field("viewport", &self.viewport)
            .field("scissor", &self.scissor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(budget: Option<usize>) -> Context {
        Context::new(&DeviceConfig::default().memory_budget(budget))
    }

    #[test]
    fn flip_puts_top_row_at_the_top() {
        let bounds = Bounds::new(4, 10);
        let rect = TargetRect::flipped(bounds.clamp(1, 0, 2, 3), 10);
        assert_eq!(rect, TargetRect { x: 1, y: 7, width: 2, height: 3 });
        let rect = TargetRect::flipped(bounds.clamp(0, 7, 4, 3), 10);
        assert_eq!(rect.y, 0);
    }

    #[test]
    fn out_of_memory_loses_the_context() {
        let mut context = context(Some(64));
        let id = context.create_texture(2, 2).unwrap();
        assert_eq!(context.allocated_bytes(), 16);
        let err = context.create_texture(4, 4).unwrap_err();
        assert_eq!(err, DriverError::OutOfMemory { requested: 64, available: 48 });
        assert!(err.is_context_lost());
        assert!(context.is_lost());
        assert_eq!(context.create_texture(1, 1), Err(DriverError::ContextLost));
        assert_eq!(context.create_buffer(&[1.0]), Err(DriverError::ContextLost));
        //existing resources stay readable
        assert_eq!(context.download_texture(id).len(), 4);
    }

    #[test]
    fn delete_releases_memory_and_bindings() {
        let mut context = context(None);
        let id = context.create_texture(3, 3).unwrap();
        context.bind_framebuffer(id);
        context.delete_texture(id);
        assert_eq!(context.allocated_bytes(), 0);
        assert_eq!(context.bound_framebuffer(), None);
        context.release_texture(id);
    }

    #[test]
    #[should_panic(expected = "use of deleted texture")]
    fn deleted_texture_cannot_be_used() {
        let mut context = context(None);
        let id = context.create_texture(1, 1).unwrap();
        context.delete_texture(id);
        context.download_texture(id);
    }

    #[test]
    #[should_panic(expected = "used with context")]
    fn foreign_texture_cannot_be_used() {
        let mut a = context(None);
        let b = context(None);
        let id = a.create_texture(1, 1).unwrap();
        b.download_texture(id);
    }

    #[test]
    fn oversized_texture_is_rejected() {
        let mut context = Context::new(&DeviceConfig::default().max_texture_dimension(8));
        assert!(matches!(
            context.create_texture(9, 1),
            Err(DriverError::InvalidDimensions { .. })
        ));
        assert!(!context.is_lost());
    }

    #[test]
    #[should_panic(expected = "past the end")]
    fn buffer_writes_are_bounded() {
        let mut context = context(None);
        let id = context.create_buffer(&[0.0; 4]).unwrap();
        context.update_buffer(id, 3, &[1.0, 2.0]);
    }
}
