// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A handle to one driver context running on a [`MainThreadLoop`].

[`Device`] is cheap to clone and can be used from any thread except the loop thread
itself.  Every call is a job on the loop: resource creation and reads wait for the
result, uploads and releases are queued.  Since the loop has a single queue, a queued
upload is always visible to a later download.
*/

use crate::images::Image;
use crate::main_thread_loop::{LoopError, MainThreadLoop};
use crate::raster::arena::{BufferId, ContextId, ProgramId, VertexArrayId};
use crate::raster::cell::ConfinedCell;
use crate::raster::command::{Command, ProgramCommand};
use crate::raster::context::{Context, VertexAttribute};
use crate::raster::error::DriverError;
use crate::raster::program::ProgramSource;
use crate::raster::texture::AcceleratedTexture;
use logwise::privacy::LogIt;
use std::sync::Arc;

/// Limits and identity of a [`Device`].
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub(crate) label: String,
    pub(crate) memory_budget: Option<usize>,
    pub(crate) texture_units: u32,
    pub(crate) max_texture_dimension: u32,
}

impl DeviceConfig {
    pub fn new() -> Self {
        DeviceConfig {
            label: "device".to_string(),
            memory_budget: None,
            texture_units: 16,
            max_texture_dimension: 16384,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Bytes the context may allocate before it runs out of memory.  `None` is unlimited.
    pub fn memory_budget(mut self, budget: Option<usize>) -> Self {
        self.memory_budget = budget;
        self
    }

    pub fn texture_units(mut self, units: u32) -> Self {
        self.texture_units = units;
        self
    }

    pub fn max_texture_dimension(mut self, dimension: u32) -> Self {
        self.max_texture_dimension = dimension;
        self
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct Shared {
    main_loop: Arc<MainThreadLoop>,
    context: Arc<ConfinedCell<Context>>,
    id: ContextId,
    label: String,
}

#[derive(Debug, Clone)]
pub struct Device {
    shared: Arc<Shared>,
}

impl Device {
    /// Creates a context on the loop thread.
    pub fn new(main_loop: Arc<MainThreadLoop>, config: DeviceConfig) -> Result<Self, LoopError> {
        let label = config.label.clone();
        let (context, id) = main_loop.try_execute(move || {
            let context = Context::new(&config);
            let id = context.id();
            (Arc::new(ConfinedCell::new(context)), id)
        })?;
        logwise::info_sync!(
            "device {label} ready",
            label = LogIt(&label)
        );
        Ok(Device {
            shared: Arc::new(Shared {
                main_loop,
                context,
                id,
                label,
            }),
        })
    }

    pub fn context_id(&self) -> ContextId {
        self.shared.id
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    pub fn main_loop(&self) -> &Arc<MainThreadLoop> {
        &self.shared.main_loop
    }

    /**
    Runs `job` against the context on the loop thread and waits for its result.

    # Panics
    * If the loop was stopped.
    * If called from the loop thread.
    * If `job` panics.
    */
    pub fn execute<F, R>(&self, job: F) -> R
    where
        F: FnOnce(&mut Context) -> R + Send + 'static,
        R: Send + 'static,
    {
        let context = self.shared.context.clone();
        self.shared.main_loop.execute(move || context.assume(job))
    }

    pub fn try_execute<F, R>(&self, job: F) -> Result<R, LoopError>
    where
        F: FnOnce(&mut Context) -> R + Send + 'static,
        R: Send + 'static,
    {
        let context = self.shared.context.clone();
        self.shared.main_loop.try_execute(move || context.assume(job))
    }

    /// Queues `job` against the context.  A panic in `job` aborts the process.
    pub fn execute_async<F>(&self, job: F)
    where
        F: FnOnce(&mut Context) + Send + 'static,
    {
        let context = self.shared.context.clone();
        self.shared.main_loop.execute_async(move || context.assume(job))
    }

    pub fn try_execute_async<F>(&self, job: F) -> Result<(), LoopError>
    where
        F: FnOnce(&mut Context) + Send + 'static,
    {
        let context = self.shared.context.clone();
        self.shared
            .main_loop
            .try_execute_async(move || context.assume(job))
    }

    pub fn is_lost(&self) -> bool {
        self.execute(|context| context.is_lost())
    }

    /// A transparent texture.
    pub fn new_texture(&self, width: u32, height: u32) -> Result<AcceleratedTexture, DriverError> {
        let id = self.execute(move |context| context.create_texture(width, height))?;
        Ok(AcceleratedTexture::new(self.clone(), id, width, height))
    }

    /// An [`Image`] backed by a new texture.  Both start transparent.
    pub fn new_image(&self, width: u32, height: u32) -> Result<Image, DriverError> {
        Ok(Image::new(self.new_texture(width, height)?))
    }

    pub fn link_program(&self, source: ProgramSource) -> Result<Program, DriverError> {
        let label = source.label().to_string();
        let id = self.execute(move |context| context.link_program(source))?;
        logwise::trace_sync!("linked program {label}", label = LogIt(&label));
        Ok(Program {
            device: self.clone(),
            id,
        })
    }

    pub fn new_buffer(&self, data: Vec<f32>) -> Result<BufferId, DriverError> {
        self.execute(move |context| context.create_buffer(&data))
    }

    pub fn update_buffer(&self, buffer: BufferId, offset: usize, data: Vec<f32>) {
        self.execute(move |context| context.update_buffer(buffer, offset, &data))
    }

    pub fn delete_buffer(&self, buffer: BufferId) {
        self.execute(move |context| context.delete_buffer(buffer))
    }

    pub fn new_vertex_array(
        &self,
        attributes: Vec<VertexAttribute>,
    ) -> Result<VertexArrayId, DriverError> {
        self.execute(move |context| context.create_vertex_array(attributes))
    }

    pub fn delete_vertex_array(&self, vertex_array: VertexArrayId) {
        self.execute(move |context| context.delete_vertex_array(vertex_array))
    }
}

/// A linked program on a [`Device`].
///
/// Programs are deleted explicitly; a [`ProgramCommand`] using a deleted program panics
/// when it runs.
#[derive(Debug, Clone)]
pub struct Program {
    device: Device,
    id: ProgramId,
}

impl Program {
    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Wraps `command` so it can modify images backed by this program's device.
    pub fn accelerated_command<C: Command + 'static>(&self, command: C) -> ProgramCommand {
        ProgramCommand::new(self.clone(), command)
    }

    /// Deletes the program.
    ///
    /// # Panics
    /// If the program was already deleted through a clone.
    pub fn delete(self) {
        let id = self.id;
        self.device.execute(move |context| context.delete_program(id))
    }
}
