// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A CPU-only [`AcceleratedImage`].

Useful for testing code written against [`Image`](crate::images::Image) without
standing up a [`MainThreadLoop`](crate::MainThreadLoop).

```
use accelerated_pixels::images::{Image, fake::FakeAcceleratedImage};
use accelerated_pixels::pixel_formats::Color;

let mut image = Image::new(FakeAcceleratedImage::new(2, 1));
image.whole_selection_mut().set_color(1, 0, Color::WHITE);
image.upload();
assert_eq!(image.accelerated().download_vec()[1], Color::WHITE);
```
*/

use crate::images::accelerated::{AcceleratedCommand, AcceleratedImage, AcceleratedImageSelection};
use crate::images::bounds::AcceleratedImageLocation;
use crate::pixel_formats::Color;
use std::any::Any;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
pub struct FakeAcceleratedImage {
    width: u32,
    height: u32,
    pixels: Mutex<Vec<Color>>,
}

impl FakeAcceleratedImage {
    /// A transparent fake image.
    pub fn new(width: u32, height: u32) -> Self {
        FakeAcceleratedImage {
            width,
            height,
            pixels: Mutex::new(vec![Color::TRANSPARENT; width as usize * height as usize]),
        }
    }

    /// Direct access to the stored pixels, for commands written against the fake.
    pub fn pixels(&self) -> MutexGuard<'_, Vec<Color>> {
        self.pixels.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl AcceleratedImage for FakeAcceleratedImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn upload(&self, pixels: &[Color]) {
        assert_eq!(
            pixels.len(),
            self.expected_len(),
            "upload of {} pixels into a {}x{} image",
            pixels.len(),
            self.width,
            self.height
        );
        self.pixels().copy_from_slice(pixels);
    }

    fn download(&self, output: &mut [Color]) {
        assert_eq!(
            output.len(),
            self.expected_len(),
            "download of a {}x{} image into {} pixels",
            self.width,
            self.height,
            output.len()
        );
        output.copy_from_slice(&self.pixels());
    }

    fn modify(
        &self,
        location: AcceleratedImageLocation,
        command: &dyn AcceleratedCommand,
        inputs: &[AcceleratedImageSelection<'_>],
    ) {
        command.run(AcceleratedImageSelection::new(self, location), inputs);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
