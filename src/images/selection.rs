// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Views over an image's coordinate space.

A selection starts at `(x, y)` in image space.  The start may be negative or past the
image's edge: it says *where* the selection is, not where it is valid.  Reads and writes
take local coordinates relative to the start and silently ignore pixels that don't exist.
*/

use crate::images::accelerated::{AcceleratedCommand, AcceleratedImageSelection};
use crate::images::bounds::AcceleratedImageLocation;
use crate::images::image::Image;
use crate::pixel_formats::Color;
use logwise::privacy::LogIt;

/// A read-only selection.  Cheap; create one per call.
#[derive(Copy, Clone, Debug)]
pub struct Selection<'a> {
    image: &'a Image,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

impl<'a> Selection<'a> {
    pub(crate) fn new(image: &'a Image, x: i32, y: i32) -> Self {
        Selection {
            image,
            x,
            y,
            width: 0,
            height: 0,
        }
    }

    pub fn with_size(self, width: u32, height: u32) -> Self {
        Selection {
            width,
            height,
            ..self
        }
    }

    pub fn image(&self) -> &'a Image {
        self.image
    }
    pub fn x(&self) -> i32 {
        self.x
    }
    pub fn y(&self) -> i32 {
        self.y
    }
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }

    /// A zero-sized selection starting at local `(x, y)` of this one.
    pub fn selection(&self, local_x: i32, local_y: i32) -> Selection<'a> {
        Selection::new(
            self.image,
            self.x.saturating_add(local_x),
            self.y.saturating_add(local_y),
        )
    }

    /// Color at local `(x, y)`, or [`Color::TRANSPARENT`] when outside the image.
    pub fn color(&self, local_x: i32, local_y: i32) -> Color {
        self.image
            .pixel(self.x.saturating_add(local_x), self.y.saturating_add(local_y))
    }

    /// The part of this selection inside the image.
    pub fn location(&self) -> AcceleratedImageLocation {
        self.image
            .bounds()
            .clamp(self.x, self.y, self.width, self.height)
    }

    /// The clamped selection on the accelerated image.
    pub fn accelerated_selection(&self) -> AcceleratedImageSelection<'a> {
        AcceleratedImageSelection {
            location: self.location(),
            image: self.image.accelerated(),
        }
    }

    /**
    Runs `command` on the accelerated image, writing to this selection and reading `inputs`.

    Only the accelerated image changes; call [`Image::download`] to see the result on
    the CPU.  When nothing of the selection is inside the image, the backend is not
    called and `command` never runs.
    */
    pub fn modify(&self, command: &dyn AcceleratedCommand, inputs: &[Selection<'_>]) {
        let location = self.location();
        logwise::trace_sync!(
            "Selection::modify {location} with {inputs} inputs",
            location = LogIt(&location),
            inputs = LogIt(&inputs.len())
        );
        if location.is_empty() {
            return;
        }
        let inputs: Vec<AcceleratedImageSelection<'_>> =
            inputs.iter().map(|s| s.accelerated_selection()).collect();
        self.image.accelerated().modify(location, command, &inputs);
    }
}

/// A selection that can write to the CPU buffer.
#[derive(Debug)]
pub struct SelectionMut<'a> {
    image: &'a mut Image,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

impl<'a> SelectionMut<'a> {
    pub(crate) fn new(image: &'a mut Image, x: i32, y: i32) -> Self {
        SelectionMut {
            image,
            x,
            y,
            width: 0,
            height: 0,
        }
    }

    pub fn with_size(self, width: u32, height: u32) -> Self {
        SelectionMut {
            width,
            height,
            ..self
        }
    }

    /// Reborrows as a read-only selection with the same geometry.
    pub fn as_selection(&self) -> Selection<'_> {
        Selection {
            image: &*self.image,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    pub fn x(&self) -> i32 {
        self.x
    }
    pub fn y(&self) -> i32 {
        self.y
    }
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color(&self, local_x: i32, local_y: i32) -> Color {
        self.as_selection().color(local_x, local_y)
    }

    /// Sets the color at local `(x, y)`.  Writes outside the image are dropped.
    pub fn set_color(&mut self, local_x: i32, local_y: i32, color: Color) {
        self.image.set_pixel(
            self.x.saturating_add(local_x),
            self.y.saturating_add(local_y),
            color,
        );
    }

    pub fn location(&self) -> AcceleratedImageLocation {
        self.as_selection().location()
    }

    /// Writes `color` to every pixel of the clamped selection.
    pub fn fill(&mut self, color: Color) {
        let location = self.location();
        for y in location.y()..location.y() + location.height() {
            for x in location.x()..location.x() + location.width() {
                self.image.set_pixel(x as i32, y as i32, color);
            }
        }
    }

    /// See [`Selection::modify`].
    pub fn modify(&self, command: &dyn AcceleratedCommand, inputs: &[Selection<'_>]) {
        self.as_selection().modify(command, inputs)
    }
}
