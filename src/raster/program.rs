// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Programs for the raster driver.

A program goes through `source → compiled → linked → usable`:

* [`ProgramSource`] is the declaration: vertex attributes, uniforms and a fragment function.
* [`ProgramSource::compile`] checks every declaration on its own, giving a [`CompiledProgram`].
* [`CompiledProgram::link`] checks the declarations against each other and fixes the
  location table, giving a [`LinkedProgram`].  The table never changes afterwards.
* [`Context::link_program`](super::Context::link_program) stores a linked program and
  hands out a [`ProgramId`](super::ProgramId), which makes it usable by renderers.

The fragment function is plain Rust; it is called once per covered pixel.

```
use accelerated_pixels::raster::{ProgramSource, UniformKind};
use accelerated_pixels::pixel_formats::Color;

let linked = ProgramSource::new("tint")
    .uniform("tint", UniformKind::Vec4)
    .fragment(|_fragment, inputs| inputs.vec4("tint").into())
    .compile()
    .and_then(|compiled| compiled.link())
    .expect("valid program");
assert!(linked.uniform_location("tint").is_some());
assert!(linked.uniform_location("missing").is_none());
```
*/

use crate::pixel_formats::Color;
use crate::raster::error::DriverError;
use crate::raster::renderer::ShaderInputs;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A pixel being shaded.
#[derive(Debug, Clone, Copy)]
pub struct Fragment<'a> {
    /// Image-space column of the pixel.
    pub x: u32,
    /// Image-space row of the pixel, 0 at the top.
    pub y: u32,
    /// Horizontal position of the pixel center within the destination rectangle, 0.0-1.0.
    pub u: f32,
    /// Vertical position of the pixel center within the destination rectangle, 0.0 at the top.
    pub v: f32,
    /// Interpolated vertex attributes after the position, flattened in declaration order.
    /// Empty for [`Renderer::draw_quad`](super::Renderer::draw_quad).
    pub varyings: &'a [f32],
}

pub type FragmentFn = Arc<dyn Fn(&Fragment<'_>, &ShaderInputs<'_>) -> Color + Send + Sync>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Int,
    Vec2,
    Vec4,
    Mat3,
    Mat4,
    /// Holds a texture unit, set through [`Renderer::bind_texture`](super::Renderer::bind_texture).
    Sampler,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
    Mat3([[f32; 3]; 3]),
    Mat4([[f32; 4]; 4]),
    Sampler(u32),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat3(_) => UniformKind::Mat3,
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Sampler(_) => UniformKind::Sampler,
        }
    }

    /// The value of a uniform that was never set.
    pub(crate) fn zero(kind: UniformKind) -> Self {
        match kind {
            UniformKind::Float => UniformValue::Float(0.0),
            UniformKind::Int => UniformValue::Int(0),
            UniformKind::Vec2 => UniformValue::Vec2([0.0; 2]),
            UniformKind::Vec4 => UniformValue::Vec4([0.0; 4]),
            UniformKind::Mat3 => UniformValue::Mat3([[0.0; 3]; 3]),
            UniformKind::Mat4 => UniformValue::Mat4([[0.0; 4]; 4]),
            UniformKind::Sampler => UniformValue::Sampler(0),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}
impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}
impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        UniformValue::Vec2(v)
    }
}
impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        UniformValue::Vec4(v)
    }
}
impl From<[[f32; 3]; 3]> for UniformValue {
    fn from(v: [[f32; 3]; 3]) -> Self {
        UniformValue::Mat3(v)
    }
}
impl From<[[f32; 4]; 4]> for UniformValue {
    fn from(v: [[f32; 4]; 4]) -> Self {
        UniformValue::Mat4(v)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name: String,
    pub components: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformInfo {
    pub name: String,
    pub kind: UniformKind,
}

/// An unchecked program declaration.
#[derive(Clone)]
pub struct ProgramSource {
    label: String,
    attributes: Vec<AttributeInfo>,
    uniforms: Vec<UniformInfo>,
    fragment: Option<FragmentFn>,
}

impl ProgramSource {
    pub fn new(label: impl Into<String>) -> Self {
        ProgramSource {
            label: label.into(),
            attributes: Vec::new(),
            uniforms: Vec::new(),
            fragment: None,
        }
    }

    /// Declares a vertex attribute.  The first one is the clip-space position and has 2 components.
    pub fn attribute(mut self, name: impl Into<String>, components: u8) -> Self {
        self.attributes.push(AttributeInfo {
            name: name.into(),
            components,
        });
        self
    }

    pub fn uniform(mut self, name: impl Into<String>, kind: UniformKind) -> Self {
        self.uniforms.push(UniformInfo {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn fragment<F>(mut self, f: F) -> Self
    where
        F: Fn(&Fragment<'_>, &ShaderInputs<'_>) -> Color + Send + Sync + 'static,
    {
        self.fragment = Some(Arc::new(f));
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Checks each declaration on its own.
    pub fn compile(self) -> Result<CompiledProgram, DriverError> {
        let error = |message: String| DriverError::Compile {
            label: self.label.clone(),
            message,
        };
        for attribute in &self.attributes {
            if !is_identifier(&attribute.name) {
                return Err(error(format!(
                    "attribute name {:?} is not an identifier",
                    attribute.name
                )));
            }
            if !(1..=4).contains(&attribute.components) {
                return Err(error(format!(
                    "attribute {} has {} components, expected 1 to 4",
                    attribute.name, attribute.components
                )));
            }
        }
        for uniform in &self.uniforms {
            if !is_identifier(&uniform.name) {
                return Err(error(format!(
                    "uniform name {:?} is not an identifier",
                    uniform.name
                )));
            }
        }
        Ok(CompiledProgram { source: self })
    }
}

impl Debug for ProgramSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramSource")
            .field("label", &self.label)
            .field("attributes", &self.attributes)
            .field("uniforms", &self.uniforms)
            .field("fragment", &self.fragment.is_some())
            .finish()
    }
}

/// A program whose declarations are individually valid.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    source: ProgramSource,
}

impl CompiledProgram {
    /// Checks the declarations against each other and builds the location table.
    pub fn link(self) -> Result<LinkedProgram, DriverError> {
        let ProgramSource {
            label,
            attributes,
            uniforms,
            fragment,
        } = self.source;
        let error = |message: String| DriverError::Link {
            label: label.clone(),
            message,
        };
        let Some(fragment) = fragment else {
            return Err(error("no fragment function".to_string()));
        };
        if let Some(position) = attributes.first()
            && position.components != 2
        {
            return Err(error(format!(
                "position attribute {} has {} components, expected 2",
                position.name, position.components
            )));
        }
        let mut attribute_locations = HashMap::new();
        for (location, attribute) in attributes.iter().enumerate() {
            if attribute_locations
                .insert(attribute.name.clone(), location)
                .is_some()
            {
                return Err(error(format!("attribute {} declared twice", attribute.name)));
            }
        }
        let mut uniform_locations = HashMap::new();
        for (location, uniform) in uniforms.iter().enumerate() {
            if attribute_locations.contains_key(&uniform.name) {
                return Err(error(format!(
                    "{} is declared as both attribute and uniform",
                    uniform.name
                )));
            }
            if uniform_locations
                .insert(uniform.name.clone(), location)
                .is_some()
            {
                return Err(error(format!("uniform {} declared twice", uniform.name)));
            }
        }
        let values = uniforms.iter().map(|u| UniformValue::zero(u.kind)).collect();
        let varying_len = attributes
            .iter()
            .skip(1)
            .map(|a| a.components as usize)
            .sum();
        Ok(LinkedProgram {
            label,
            attributes,
            uniforms,
            attribute_locations,
            uniform_locations,
            values,
            fragment,
            varying_len,
        })
    }
}

/// A program with a fixed location table.
#[derive(Clone)]
pub struct LinkedProgram {
    label: String,
    attributes: Vec<AttributeInfo>,
    uniforms: Vec<UniformInfo>,
    attribute_locations: HashMap<String, usize>,
    uniform_locations: HashMap<String, usize>,
    //current uniform values, by location
    values: Vec<UniformValue>,
    fragment: FragmentFn,
    varying_len: usize,
}

impl LinkedProgram {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn uniform_location(&self, name: &str) -> Option<usize> {
        self.uniform_locations.get(name).copied()
    }

    pub fn attribute_location(&self, name: &str) -> Option<usize> {
        self.attribute_locations.get(name).copied()
    }

    /// Names of the active uniforms, in location order.
    pub fn active_uniforms(&self) -> impl Iterator<Item = &str> {
        self.uniforms.iter().map(|u| u.name.as_str())
    }

    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    /// Floats per vertex handed to the fragment function.
    pub fn varying_len(&self) -> usize {
        self.varying_len
    }

    pub(crate) fn fragment(&self) -> &FragmentFn {
        &self.fragment
    }

    /// Location and kind of `name`.
    ///
    /// # Panics
    /// If the program has no active uniform `name`.
    pub(crate) fn expect_uniform(&self, name: &str) -> (usize, UniformKind) {
        match self.uniform_location(name) {
            Some(location) => (location, self.uniforms[location].kind),
            None => panic!(
                "program {} has no active uniform {name:?}; active uniforms are {:?}",
                self.label,
                self.active_uniforms().collect::<Vec<_>>()
            ),
        }
    }

    pub(crate) fn value(&self, location: usize) -> UniformValue {
        self.values[location]
    }

    /// # Panics
    /// If `name` is unknown or declared with a different kind.
    pub(crate) fn set_value(&mut self, name: &str, value: UniformValue) {
        let (location, kind) = self.expect_uniform(name);
        assert_eq!(
            kind,
            value.kind(),
            "uniform {name:?} of program {} is declared as {kind:?}",
            self.label
        );
        self.values[location] = value;
    }
}

impl Debug for LinkedProgram {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkedProgram")
            .field("label", &self.label)
            .field("attributes", &self.attributes)
            .field("uniforms", &self.uniforms)
            .finish_non_exhaustive()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
