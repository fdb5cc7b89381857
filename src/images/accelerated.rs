// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The boundary between the CPU pixel buffer and its accelerated mirror.

use crate::images::bounds::{AcceleratedImageLocation, Bounds};
use crate::pixel_formats::Color;
use std::any::Any;
use std::fmt::Debug;

/**
An image resident on an accelerator (GPU or otherwise) that mirrors a CPU pixel buffer.

Pixel data crossing this boundary is always a flat, row-major sequence of [`Color`]
starting at `(0,0)`, left-to-right then top-to-bottom.  `upload` and `download` must
preserve that ordering exactly.

Implementations are shared across threads; any thread-affinity the backend has is the
implementation's concern.
*/
pub trait AcceleratedImage: Any + Debug + Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Replaces the whole accelerated image.
    ///
    /// # Panics
    /// If `pixels.len() != width * height`.
    fn upload(&self, pixels: &[Color]);

    /// Copies the whole accelerated image into `output`.
    ///
    /// # Panics
    /// If `output.len() != width * height`.
    fn download(&self, output: &mut [Color]);

    /// Runs `command` with this image as output, restricted to `location`.
    fn modify(
        &self,
        location: AcceleratedImageLocation,
        command: &dyn AcceleratedCommand,
        inputs: &[AcceleratedImageSelection<'_>],
    );

    /// Used by backends to recover their concrete type from an input selection.
    fn as_any(&self) -> &dyn Any;

    fn bounds(&self) -> Bounds {
        Bounds::new(self.width(), self.height())
    }
}

impl dyn AcceleratedImage {
    /// Convenience wrapper around [`AcceleratedImage::download`].
    pub fn download_vec(&self) -> Vec<Color> {
        let mut output = vec![Color::TRANSPARENT; self.bounds().len()];
        self.download(&mut output);
        output
    }
}

/// A clamped rectangle of an accelerated image, as handed to commands.
#[derive(Copy, Clone, Debug)]
pub struct AcceleratedImageSelection<'a> {
    pub location: AcceleratedImageLocation,
    pub image: &'a dyn AcceleratedImage,
}

impl<'a> AcceleratedImageSelection<'a> {
    /// Builds a selection, clamping `location` against `image`.
    pub fn new(image: &'a dyn AcceleratedImage, location: AcceleratedImageLocation) -> Self {
        AcceleratedImageSelection {
            location: image.bounds().clamp_location(location),
            image,
        }
    }

    /// Downcasts the image to a concrete backend type.
    pub fn image_as<T: AcceleratedImage>(&self) -> Option<&'a T> {
        self.image.as_any().downcast_ref::<T>()
    }
}

/// An operation that renders into one accelerated image selection, reading any number of others.
pub trait AcceleratedCommand: Send + Sync {
    fn run(
        &self,
        output: AcceleratedImageSelection<'_>,
        inputs: &[AcceleratedImageSelection<'_>],
    );
}

impl<F> AcceleratedCommand for F
where
    F: Fn(AcceleratedImageSelection<'_>, &[AcceleratedImageSelection<'_>]) + Send + Sync,
{
    fn run(
        &self,
        output: AcceleratedImageSelection<'_>,
        inputs: &[AcceleratedImageSelection<'_>],
    ) {
        self(output, inputs)
    }
}
