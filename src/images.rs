/*! Pixel addressing: images, selections and the accelerated-image boundary. */

pub mod accelerated;
pub mod bounds;
pub mod fake;
mod image;
mod selection;
pub mod tools;

pub use accelerated::{AcceleratedCommand, AcceleratedImage, AcceleratedImageSelection};
pub use bounds::{AcceleratedImageLocation, Bounds, FragmentLocation};
pub use image::Image;
pub use selection::{Selection, SelectionMut};
