// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0

use crate::images::{
    AcceleratedCommand, AcceleratedImage, AcceleratedImageLocation, AcceleratedImageSelection,
    Bounds,
};
use crate::pixel_formats::Color;
use crate::raster::arena::TextureId;
use crate::raster::device::Device;
use logwise::privacy::LogIt;
use std::any::Any;

/**
A texture on a [`Device`], usable as the accelerated half of an [`Image`](crate::images::Image).

The texture is released when this value is dropped.  If the loop has already stopped,
the release is skipped; the context goes away with the loop.
*/
#[derive(Debug)]
pub struct AcceleratedTexture {
    device: Device,
    id: TextureId,
    bounds: Bounds,
}

impl AcceleratedTexture {
    pub(crate) fn new(device: Device, id: TextureId, width: u32, height: u32) -> Self {
        AcceleratedTexture {
            device,
            id,
            bounds: Bounds::new(width, height),
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// `location` of this texture, clamped.
    pub fn selection(&self, location: AcceleratedImageLocation) -> TextureSelection {
        TextureSelection::new(self.id, self.bounds.clamp_location(location))
    }
}

impl AcceleratedImage for AcceleratedTexture {
    fn width(&self) -> u32 {
        self.bounds.width()
    }

    fn height(&self) -> u32 {
        self.bounds.height()
    }

    fn upload(&self, pixels: &[Color]) {
        assert_eq!(
            pixels.len(),
            self.bounds.len(),
            "upload of {} pixels into a {}x{} texture",
            pixels.len(),
            self.bounds.width(),
            self.bounds.height()
        );
        let id = self.id;
        let pixels = pixels.to_vec();
        self.device
            .execute_async(move |context| context.upload_texture(id, &pixels));
    }

    fn download(&self, output: &mut [Color]) {
        assert_eq!(
            output.len(),
            self.bounds.len(),
            "download of a {}x{} texture into {} pixels",
            self.bounds.width(),
            self.bounds.height(),
            output.len()
        );
        let id = self.id;
        let pixels = self.device.execute(move |context| context.download_texture(id));
        output.copy_from_slice(&pixels);
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

impl Drop for AcceleratedTexture {
    fn drop(&mut self) {
        let id = self.id;
        if self
            .device
            .try_execute_async(move |context| context.release_texture(id))
            .is_err()
        {
            logwise::trace_sync!(
                "loop stopped before texture {id} was released",
                id = LogIt(&id)
            );
        }
    }
}

/// A texture and the rectangle of it a command reads.  Already clamped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TextureSelection {
    texture: TextureId,
    location: AcceleratedImageLocation,
}

impl TextureSelection {
    pub fn new(texture: TextureId, location: AcceleratedImageLocation) -> Self {
        TextureSelection { texture, location }
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    pub fn location(&self) -> AcceleratedImageLocation {
        self.location
    }
}
