// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! accelerated_pixels addresses and mutates pixels of images that live both in a CPU
buffer and on an accelerator, and runs draw procedures against sub-rectangles of them
while the driver tolerates calls from only one thread.

There are two halves.

# Addressing

An [`Image`](images::Image) owns its CPU pixels and one
[`AcceleratedImage`](images::AcceleratedImage) of the same size.  You reach pixels through
[`Selection`](images::Selection)s, which may start anywhere, including at negative
coordinates or past the edge.  Every operation clamps the selection against the image with
one primitive, [`Bounds::clamp`](images::Bounds::clamp), so

* CPU reads outside the image return [`Color::TRANSPARENT`](pixel_formats::Color::TRANSPARENT),
* CPU writes outside the image are dropped,
* accelerated commands only ever see rectangles inside the image, and a selection with
  nothing inside it does nothing at all.

| Selection on a 2×2 image | Clamped location        |
|--------------------------|-------------------------|
| `(0, 0)` 2×2             | `(0, 0)` 2×2            |
| `(-1, 0)` 2×1            | `(0, 0)` 1×1            |
| `(1, 1)` 5×5             | `(1, 1)` 1×1            |
| `(2, 0)` 1×1             | `(2, 0)` 0×1, a no-op   |

# Dispatch

Driver state lives on one thread, owned by a [`MainThreadLoop`].  Other threads submit
jobs to it over a single FIFO queue.  The bundled [`raster`] backend is a software driver
with a GL-shaped API: programs, textures, a viewport and scissor box with row 0 at the
bottom.  A [`raster::ProgramCommand`] turns a clamped selection into those bindings and
hands a [`raster::Renderer`] to your [`raster::Command`].

# Logging

The crate logs through [logwise](https://sealedabstract.com/code/logwise): loop lifecycle
at info, resource traffic at trace, out-of-memory and aborted jobs at error.
*/

pub mod images;
pub mod main_thread_loop;
pub mod pixel_formats;
pub mod raster;

pub use main_thread_loop::MainThreadLoop;
