// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! CPU tools built on selections.
//!
//! The tools only decide *which* pixels meet; how two colors combine is up to a [`Mixer`].

use crate::images::selection::{Selection, SelectionMut};
use crate::pixel_formats::{Color, Float4};
use std::ops::Range;

/// Combines a source color with the color already in the target.
pub trait Mixer {
    fn mix(&self, source: Color, target: Color) -> Color;
}

/// Takes the source color as is.
#[derive(Copy, Clone, Debug, Default)]
pub struct Replace;

impl Mixer for Replace {
    fn mix(&self, source: Color, _target: Color) -> Color {
        source
    }
}

/// Porter-Duff "source over" on straight (non-premultiplied) alpha.
#[derive(Copy, Clone, Debug, Default)]
pub struct SourceOver;

impl Mixer for SourceOver {
    fn mix(&self, source: Color, target: Color) -> Color {
        let s = Float4::from(source);
        let t = Float4::from(target);
        let a = s.a + t.a * (1.0 - s.a);
        if a == 0.0 {
            return Color::TRANSPARENT;
        }
        let channel = |sc: f32, tc: f32| (sc * s.a + tc * t.a * (1.0 - s.a)) / a;
        Color::from_floats(Float4::new(
            channel(s.r, t.r),
            channel(s.g, t.g),
            channel(s.b, t.b),
            a,
        ))
    }
}

/**
Blends a source selection onto a target selection of another image.

Only local `(x, y)` that exist in both images are visited: the source's clamped location,
intersected with the target image at the same local offset.  Pixels are read with
[`Selection::color`] and written with [`SelectionMut::set_color`].  The work is bounded by
the pixels that exist, not by the declared selection size.

```
use accelerated_pixels::images::{Image, fake::FakeAcceleratedImage};
use accelerated_pixels::images::tools::{Blender, Replace};
use accelerated_pixels::pixel_formats::Color;

let mut source = Image::new(FakeAcceleratedImage::new(2, 2));
source.whole_selection_mut().fill(Color::WHITE);
let mut target = Image::new(FakeAcceleratedImage::new(3, 3));

Blender::new(Replace).blend(&source.whole_selection(), &mut target.selection_mut(2, 2));
assert_eq!(target.whole_selection().color(2, 2), Color::WHITE);
assert_eq!(target.whole_selection().color(1, 1), Color::TRANSPARENT);
```
*/
#[derive(Debug, Default)]
pub struct Blender<M> {
    mixer: M,
}

impl<M: Mixer> Blender<M> {
    pub fn new(mixer: M) -> Self {
        Blender { mixer }
    }

    pub fn blend(&self, source: &Selection<'_>, target: &mut SelectionMut<'_>) {
        let visible = source.location();
        let target_bounds = target.as_selection().image().bounds();
        let xs = local_range(
            source.x(),
            visible.x(),
            visible.width(),
            target.x(),
            target_bounds.width(),
        );
        let ys = local_range(
            source.y(),
            visible.y(),
            visible.height(),
            target.y(),
            target_bounds.height(),
        );
        for y in ys {
            for x in xs.clone() {
                let mixed = self.mixer.mix(source.color(x, y), target.color(x, y));
                target.set_color(x, y, mixed);
            }
        }
    }
}

/// Local coordinates along one axis that exist in both the source and the target image.
///
/// `visible_start..visible_start + visible_len` is the source's clamped extent in image
/// space; the target image spans `0..target_len` from `target_origin`.
fn local_range(
    source_origin: i32,
    visible_start: u32,
    visible_len: u32,
    target_origin: i32,
    target_len: u32,
) -> Range<i32> {
    let source_origin = source_origin as i64;
    let target_origin = target_origin as i64;
    let start = (visible_start as i64 - source_origin).max(-target_origin);
    let end = (visible_start as i64 + visible_len as i64 - source_origin)
        .min(target_len as i64 - target_origin)
        .min(i32::MAX as i64);
    let start = start.clamp(0, i32::MAX as i64) as i32;
    let end = end.max(start as i64) as i32;
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::Image;
    use crate::images::fake::FakeAcceleratedImage;

    #[test]
    fn source_over_opaque_source_wins() {
        let out = SourceOver.mix(Color::rgb(10, 20, 30), Color::rgb(200, 200, 200));
        assert_eq!(out, Color::rgb(10, 20, 30));
    }

    #[test]
    fn source_over_transparent_source_keeps_target() {
        let target = Color::rgba(1, 2, 3, 255);
        assert_eq!(SourceOver.mix(Color::TRANSPARENT, target), target);
    }

    #[test]
    fn blend_work_is_bounded_by_existing_pixels() {
        let mut source = Image::new(FakeAcceleratedImage::new(1, 1));
        source.whole_selection_mut().fill(Color::WHITE);
        let mut target = Image::new(FakeAcceleratedImage::new(1, 1));
        let huge = source.selection(0, 0).with_size(u32::MAX, u32::MAX);
        Blender::new(Replace).blend(&huge, &mut target.selection_mut(0, 0));
        assert_eq!(target.pixels(), &[Color::WHITE]);
    }

    #[test]
    fn blend_skips_source_pixels_outside_the_source_image() {
        let mut source = Image::new(FakeAcceleratedImage::new(2, 1));
        source.whole_selection_mut().fill(Color::WHITE);
        let mut target = Image::new(FakeAcceleratedImage::new(3, 1));
        target.whole_selection_mut().fill(Color::BLACK);
        //local 0 is left of the source image, locals 1 and 2 exist
        let shifted = source.selection(-1, 0).with_size(3, 1);
        Blender::new(Replace).blend(&shifted, &mut target.whole_selection_mut());
        assert_eq!(target.pixels(), &[Color::BLACK, Color::WHITE, Color::WHITE]);
    }

    #[test]
    fn local_range_intersects_both_images() {
        //source starts at -2, visible 0..3; target starts at 1 with 3 pixels
        assert_eq!(local_range(-2, 0, 3, 1, 3), 2..2);
        assert_eq!(local_range(-2, 0, 3, -3, 10), 3..5);
        assert_eq!(local_range(0, 0, 1, 5, 3), 0..0);
        assert!(local_range(i32::MIN, 0, 4, 0, 4).is_empty());
    }

    #[test]
    fn source_over_both_transparent() {
        assert_eq!(
            SourceOver.mix(Color::TRANSPARENT, Color::TRANSPARENT),
            Color::TRANSPARENT
        );
    }
}
