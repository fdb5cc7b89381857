// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use crate::images::accelerated::AcceleratedImage;
use crate::images::bounds::Bounds;
use crate::images::selection::{Selection, SelectionMut};
use crate::pixel_formats::Color;

/**
An image with a CPU pixel buffer and an accelerated mirror of the same size.

The two copies are synchronized explicitly: [`Image::upload`] pushes the CPU buffer to
the accelerated image, [`Image::download`] pulls it back.  Pixels are addressed through
[`Selection`]s.

Images are expensive to create; create them once and keep them around.

```
use accelerated_pixels::images::{Image, fake::FakeAcceleratedImage};
use accelerated_pixels::pixel_formats::Color;

let c = [Color::rgb(1, 0, 0), Color::rgb(2, 0, 0), Color::rgb(3, 0, 0), Color::rgb(4, 0, 0)];
let accelerated = FakeAcceleratedImage::new(2, 2);
accelerated.pixels().copy_from_slice(&c);
let mut image = Image::new(accelerated);
image.download();
let whole = image.whole_selection();
assert_eq!(whole.color(1, 0), c[1]);
assert_eq!(whole.color(0, 1), c[2]);
```
*/
#[derive(Debug)]
pub struct Image {
    bounds: Bounds,
    pixels: Vec<Color>,
    accelerated: Box<dyn AcceleratedImage>,
}

impl Image {
    /// Creates an image with a transparent CPU buffer sized after `accelerated`.
    ///
    /// The accelerated image is owned by the image from here on.
    pub fn new<A: AcceleratedImage>(accelerated: A) -> Self {
        Self::from_boxed(Box::new(accelerated))
    }

    pub fn from_boxed(accelerated: Box<dyn AcceleratedImage>) -> Self {
        let bounds = accelerated.bounds();
        Image {
            bounds,
            pixels: vec![Color::TRANSPARENT; bounds.len()],
            accelerated,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.bounds.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.bounds.height()
    }

    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Row-major CPU pixels.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn accelerated(&self) -> &dyn AcceleratedImage {
        self.accelerated.as_ref()
    }

    /// A zero-sized selection starting at `(x, y)`; size it with [`Selection::with_size`].
    pub fn selection(&self, x: i32, y: i32) -> Selection<'_> {
        Selection::new(self, x, y)
    }

    pub fn selection_mut(&mut self, x: i32, y: i32) -> SelectionMut<'_> {
        SelectionMut::new(self, x, y)
    }

    /// A selection covering the whole image.
    pub fn whole_selection(&self) -> Selection<'_> {
        let (w, h) = (self.width(), self.height());
        self.selection(0, 0).with_size(w, h)
    }

    pub fn whole_selection_mut(&mut self) -> SelectionMut<'_> {
        let (w, h) = (self.width(), self.height());
        self.selection_mut(0, 0).with_size(w, h)
    }

    /// Pushes the CPU buffer to the accelerated image.
    pub fn upload(&self) {
        self.accelerated.upload(&self.pixels);
    }

    /// Replaces the CPU buffer with the accelerated image's contents.
    pub fn download(&mut self) {
        self.accelerated.download(&mut self.pixels);
    }

    pub(crate) fn pixel(&self, x: i32, y: i32) -> Color {
        if !self.bounds.contains(x, y) {
            return Color::TRANSPARENT;
        }
        self.pixels[self.bounds.offset(x as u32, y as u32)]
    }

    pub(crate) fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if !self.bounds.contains(x, y) {
            return;
        }
        let offset = self.bounds.offset(x as u32, y as u32);
        self.pixels[offset] = color;
    }
}
