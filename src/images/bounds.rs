// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The clamp primitive shared by every pixel operation.

Both the CPU single-pixel path ([`Bounds::contains`]) and the accelerated rectangle path
([`Bounds::clamp`]) go through the same per-axis clamp, so the two cannot disagree
about which pixels of an image exist.

```text
           x
      0 ────────▶
      │ ┌───────┐
    y │ │       │
      │ │       │
      │ │       │
      ▼ └───────┘
```

Row 0 is the top of the image.
*/

/// A rectangle that lies entirely inside an image.
///
/// Always satisfies `x + width <= image.width` and `y + height <= image.height`.
/// Values are only produced by [`Bounds::clamp`] and [`Bounds::clamp_location`], so
/// code receiving one may index pixels without further checks.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AcceleratedImageLocation {
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

/// The location of the fragments a command renders to.
pub type FragmentLocation = AcceleratedImageLocation;

impl AcceleratedImageLocation {
    #[inline]
    pub const fn x(&self) -> u32 {
        self.x
    }
    #[inline]
    pub const fn y(&self) -> u32 {
        self.y
    }
    #[inline]
    pub const fn width(&self) -> u32 {
        self.width
    }
    #[inline]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// True when the rectangle covers no pixel.  Operations on an empty location are no-ops.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered.
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Width and height of an image, the only source of truth for what is addressable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Bounds {
    width: u32,
    height: u32,
}

impl Bounds {
    pub const fn new(width: u32, height: u32) -> Self {
        Bounds { width, height }
    }
    #[inline]
    pub const fn width(&self) -> u32 {
        self.width
    }
    #[inline]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Clamps an arbitrary rectangle to the part of it that lies inside these bounds.
    ///
    /// The rectangle is truncated, never shifted.  A rectangle that misses the bounds
    /// entirely yields a zero-area location.  When it starts at or beyond the right or
    /// bottom edge, the location sits on that edge.
    ///
    /// ```
    /// use accelerated_pixels::images::Bounds;
    ///
    /// let bounds = Bounds::new(1, 1);
    /// let location = bounds.clamp(-1, 0, 2, 1);
    /// assert_eq!((location.x(), location.width()), (0, 1));
    ///
    /// let outside = Bounds::new(2, 2).clamp(2, 0, 1, 1);
    /// assert!(outside.is_empty());
    /// assert_eq!(outside.x(), 2);
    /// ```
    pub fn clamp(&self, x: i32, y: i32, width: u32, height: u32) -> AcceleratedImageLocation {
        let (x, width) = clamp_axis(x, width, self.width);
        let (y, height) = clamp_axis(y, height, self.height);
        AcceleratedImageLocation {
            x,
            y,
            width,
            height,
        }
    }

    /// Re-clamps a location, possibly produced against other bounds.
    ///
    /// For a location produced by these bounds this is the identity.
    pub fn clamp_location(&self, location: AcceleratedImageLocation) -> AcceleratedImageLocation {
        self.clamp(
            saturating_i32(location.x),
            saturating_i32(location.y),
            location.width,
            location.height,
        )
    }

    /// The whole image.
    pub const fn whole(&self) -> AcceleratedImageLocation {
        AcceleratedImageLocation {
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        }
    }

    /// Whether the pixel at `(x, y)` exists, i.e. the 1×1 rectangle there survives clamping.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        !self.clamp(x, y, 1, 1).is_empty()
    }

    /// Row-major offset of a pixel that [`Bounds::contains`].
    #[inline]
    pub(crate) fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub(crate) const fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

fn clamp_axis(start: i32, len: u32, limit: u32) -> (u32, u32) {
    let limit = i64::from(limit);
    let start = i64::from(start);
    let end = start + i64::from(len);
    let lo = start.clamp(0, limit);
    let hi = end.clamp(lo, limit);
    (lo as u32, (hi - lo) as u32)
}

fn saturating_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contained(location: AcceleratedImageLocation, bounds: Bounds) -> bool {
        location.x as u64 + location.width as u64 <= bounds.width as u64
            && location.y as u64 + location.height as u64 <= bounds.height as u64
    }

    #[test]
    fn clamp_is_contained_and_idempotent() {
        let bounds = Bounds::new(7, 5);
        let coords = [i32::MIN, -20, -8, -7, -1, 0, 1, 3, 4, 5, 6, 7, 8, 40, i32::MAX];
        let sizes = [0u32, 1, 2, 5, 7, 13, u32::MAX];
        for &x in &coords {
            for &y in &coords {
                for &w in &sizes {
                    for &h in &sizes {
                        let location = bounds.clamp(x, y, w, h);
                        assert!(contained(location, bounds), "{x},{y},{w},{h} -> {location:?}");
                        assert_eq!(bounds.clamp_location(location), location);
                    }
                }
            }
        }
    }

    #[test]
    fn partial_overlap_is_truncated_not_shifted() {
        let bounds = Bounds::new(10, 10);
        let location = bounds.clamp(-3, 8, 5, 5);
        assert_eq!(location.x(), 0);
        assert_eq!(location.width(), 2);
        assert_eq!(location.y(), 8);
        assert_eq!(location.height(), 2);
    }

    #[test]
    fn fully_left_of_image_is_empty() {
        let bounds = Bounds::new(4, 4);
        assert_eq!(bounds.clamp(-2, 0, 2, 2).width(), 0);
        assert_eq!(bounds.clamp(-5, 0, 2, 2).width(), 0);
        assert_eq!(bounds.clamp(0, -2, 2, 2).height(), 0);
    }

    #[test]
    fn start_beyond_edge_stays_on_edge() {
        let bounds = Bounds::new(2, 3);
        let location = bounds.clamp(2, 3, 1, 1);
        assert_eq!(location, AcceleratedImageLocation { x: 2, y: 3, width: 0, height: 0 });
        let far = bounds.clamp(100, 1, 4, 1);
        assert_eq!((far.x(), far.width(), far.y(), far.height()), (2, 0, 1, 1));
        assert!(far.is_empty());
    }

    #[test]
    fn contains_agrees_with_clamp() {
        let bounds = Bounds::new(3, 2);
        for x in -2..5 {
            for y in -2..4 {
                let inside = (0..3).contains(&x) && (0..2).contains(&y);
                assert_eq!(bounds.contains(x, y), inside, "({x},{y})");
            }
        }
    }

    #[test]
    fn zero_sized_bounds_contain_nothing() {
        let bounds = Bounds::new(0, 0);
        assert!(!bounds.contains(0, 0));
        assert!(bounds.clamp(0, 0, 10, 10).is_empty());
        assert!(bounds.whole().is_empty());
    }
}
