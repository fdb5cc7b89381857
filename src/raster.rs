// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A software driver with a GL-shaped API, and the accelerated-image backend built on it.

The driver itself is a [`Context`]: textures, float buffers, vertex arrays, programs
and the usual bound state.  It is confined to the thread of a
[`MainThreadLoop`](crate::main_thread_loop::MainThreadLoop) and reached through a
[`Device`].

Textures store rows top to bottom, like [`Image`](crate::images::Image).  Viewport and
scissor rectangles follow the driver convention with row 0 at the bottom, so the
selection-to-driver conversion flips `y` exactly once, in
[`TargetRect::flipped`].

# Examples

```
use accelerated_pixels::images::Image;
use accelerated_pixels::main_thread_loop::{LoopConfig, MainThreadLoop};
use accelerated_pixels::pixel_formats::Color;
use accelerated_pixels::raster::{Device, DeviceConfig, ProgramSource, Renderer, TextureSelection, UniformKind};

let main_loop = MainThreadLoop::spawn(LoopConfig::default()).unwrap();
let device = Device::new(main_loop.clone(), DeviceConfig::default()).unwrap();
let program = device
    .link_program(
        ProgramSource::new("fill")
            .uniform("color", UniformKind::Vec4)
            .fragment(|_, inputs| inputs.vec4("color").into()),
    )
    .unwrap();
let fill = program.accelerated_command(|renderer: &mut Renderer<'_>, _: &[TextureSelection]| {
    renderer.set_vec4("color", [1.0, 0.0, 0.0, 1.0]);
    renderer.draw_quad();
});

let mut image: Image = device.new_image(2, 2).unwrap();
image.selection_mut(0, 0).with_size(1, 1).modify(&fill, &[]);
image.download();
assert_eq!(image.pixels()[0], Color::rgb(255, 0, 0));
assert_eq!(image.pixels()[3], Color::TRANSPARENT);

drop(image);
main_loop.stop();
main_loop.join();
```
*/

mod arena;
mod cell;
mod command;
mod context;
mod device;
mod error;
mod program;
mod renderer;
mod texture;

pub use arena::{BufferId, ContextId, ProgramId, TextureId, VertexArrayId};
pub use cell::{ConfinedCell, ConfinedGuard};
pub use command::{Command, ProgramCommand};
pub use context::{Context, TargetRect, VertexAttribute};
pub use device::{Device, DeviceConfig, Program};
pub use error::DriverError;
pub use program::{
    AttributeInfo, CompiledProgram, Fragment, FragmentFn, LinkedProgram, ProgramSource,
    UniformInfo, UniformKind, UniformValue,
};
pub use renderer::{Renderer, ShaderInputs};
pub use texture::{AcceleratedTexture, TextureSelection};
