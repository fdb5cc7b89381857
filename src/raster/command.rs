// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0

use crate::images::{AcceleratedCommand, AcceleratedImage, AcceleratedImageSelection};
use crate::raster::device::Program;
use crate::raster::renderer::Renderer;
use crate::raster::texture::{AcceleratedTexture, TextureSelection};
use logwise::privacy::LogIt;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Draw calls for one modification, run on the loop thread.
///
/// The renderer arrives with the output selection bound as framebuffer, viewport and
/// scissor box, and the command's program in use.
pub trait Command: Send + Sync {
    fn run(&self, renderer: &mut Renderer<'_>, inputs: &[TextureSelection]);
}

impl<F> Command for F
where
    F: Fn(&mut Renderer<'_>, &[TextureSelection]) + Send + Sync,
{
    fn run(&self, renderer: &mut Renderer<'_>, inputs: &[TextureSelection]) {
        self(renderer, inputs)
    }
}

/**
Adapts a [`Command`] and its [`Program`] to [`AcceleratedCommand`].

Running it clamps the output selection again and skips empty ones.  Otherwise it binds
the output on the loop thread, with viewport and scissor box flipped to the driver's
bottom-left origin, and waits for the command to finish.

# Panics
When the output or an input is not an [`AcceleratedTexture`], or belongs to another device.
*/
#[derive(Clone)]
pub struct ProgramCommand {
    program: Program,
    command: Arc<dyn Command>,
}

impl ProgramCommand {
    pub fn new<C: Command + 'static>(program: Program, command: C) -> Self {
        ProgramCommand {
            program,
            command: Arc::new(command),
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    fn texture<'a>(&self, selection: &AcceleratedImageSelection<'a>) -> &'a AcceleratedTexture {
        let Some(texture) = selection.image_as::<AcceleratedTexture>() else {
            panic!(
                "ProgramCommand can only run on AcceleratedTexture, got {:?}",
                selection.image
            );
        };
        assert_eq!(
            texture.device().context_id(),
            self.program.device().context_id(),
            "texture and program belong to different devices"
        );
        texture
    }
}

impl AcceleratedCommand for ProgramCommand {
    fn run(
        &self,
        output: AcceleratedImageSelection<'_>,
        inputs: &[AcceleratedImageSelection<'_>],
    ) {
        let target = self.texture(&output);
        let inputs: Vec<TextureSelection> = inputs
            .iter()
            .map(|input| self.texture(input).selection(input.location))
            .collect();
        let location = output.image.bounds().clamp_location(output.location);
        if location.is_empty() {
            logwise::trace_sync!(
                "skipping command on empty selection {location}",
                location = LogIt(&location)
            );
            return;
        }
        let texture = target.id();
        let program = self.program.id();
        let command = self.command.clone();
        self.program.device().execute(move |context| {
            context.bind_target(texture, location);
            context.use_program(program);
            let mut renderer = Renderer::new(context);
            command.run(&mut renderer, &inputs);
        });
    }
}

impl Debug for ProgramCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramCommand")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}
