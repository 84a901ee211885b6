//! Render state consumed by the shader binder.

use bitflags::bitflags;
use glam::{DMat4, Vec4};
use std::collections::HashMap;

use crate::backend::texture::ImageAccess;
use crate::shader::Shader;
use crate::texture::{SamplerState, Texture};

bitflags! {
  /// Parts of the render state a parameter depends on; also what changed since the last issue.
  #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
  pub struct StateDeps: u32 {
    /// Model transform.
    const TRANSFORM = 1 << 0;
    /// Camera transform.
    const VIEW = 1 << 1;
    const PROJECTION = 1 << 2;
    const SHADER_INPUTS = 1 << 3;
    const TEXTURE = 1 << 4;
    const MATERIAL = 1 << 5;
    const COLOR_SCALE = 1 << 6;
    /// Anything that may change every frame (node transforms…).
    const FRAME = 1 << 7;
  }
}

/// Array data supplied to a pointer parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum PtrData {
  Float(Vec<f32>),
  Double(Vec<f64>),
  Int(Vec<i32>),
  UInt(Vec<u32>),
}

impl PtrData {
  /// Number of scalars.
  pub fn len(&self) -> usize {
    match self {
      PtrData::Float(v) => v.len(),
      PtrData::Double(v) => v.len(),
      PtrData::Int(v) => v.len(),
      PtrData::UInt(v) => v.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn type_name(&self) -> &'static str {
    match self {
      PtrData::Float(_) => "float",
      PtrData::Double(_) => "double",
      PtrData::Int(_) => "int",
      PtrData::UInt(_) => "uint",
    }
  }
}

/// A named shader input.
#[derive(Clone, Debug)]
pub enum ShaderInput {
  /// Arbitrary numeric data.
  Ptr(PtrData),
  /// A texture for a sampler, with optional sampling override.
  Texture(Texture, Option<SamplerState>),
  /// A texture level bound to an image unit.
  Image {
    texture: Texture,
    access: ImageAccess,
    level: u32,
  },
  /// A single matrix.
  Matrix(DMat4),
}

impl From<PtrData> for ShaderInput {
  fn from(data: PtrData) -> Self {
    ShaderInput::Ptr(data)
  }
}

impl From<Vec<f32>> for ShaderInput {
  fn from(data: Vec<f32>) -> Self {
    ShaderInput::Ptr(PtrData::Float(data))
  }
}

impl From<Texture> for ShaderInput {
  fn from(texture: Texture) -> Self {
    ShaderInput::Texture(texture, None)
  }
}

/// Named shader inputs.
#[derive(Clone, Debug, Default)]
pub struct ShaderInputs {
  inputs: HashMap<String, ShaderInput>,
}

impl ShaderInputs {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&mut self, name: impl Into<String>, input: impl Into<ShaderInput>) {
    self.inputs.insert(name.into(), input.into());
  }

  pub fn with(mut self, name: impl Into<String>, input: impl Into<ShaderInput>) -> Self {
    self.set(name, input);
    self
  }

  pub fn remove(&mut self, name: &str) -> Option<ShaderInput> {
    self.inputs.remove(name)
  }

  pub fn get(&self, name: &str) -> Option<&ShaderInput> {
    self.inputs.get(name)
  }
}

/// A texture stage.
#[derive(Clone, Debug)]
pub struct TextureStage {
  pub name: String,
  pub texture: Texture,
  pub sampler: Option<SamplerState>,
}

/// Ordered list of enabled texture stages.
#[derive(Clone, Debug, Default)]
pub struct TextureAttrib {
  on_stages: Vec<TextureStage>,
}

impl TextureAttrib {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_stage(mut self, name: impl Into<String>, texture: Texture) -> Self {
    self.on_stages.push(TextureStage {
      name: name.into(),
      texture,
      sampler: None,
    });
    self
  }

  pub fn num_on_stages(&self) -> usize {
    self.on_stages.len()
  }

  pub fn on_stage(&self, index: usize) -> Option<&TextureStage> {
    self.on_stages.get(index)
  }

  pub fn on_stages(&self) -> &[TextureStage] {
    &self.on_stages
  }
}

/// Surface material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
  pub ambient: Vec4,
  pub diffuse: Vec4,
  pub emission: Vec4,
  pub specular: Vec4,
  pub shininess: f32,
}

impl Default for Material {
  fn default() -> Self {
    Material {
      ambient: Vec4::ONE,
      diffuse: Vec4::ONE,
      emission: Vec4::ZERO,
      specular: Vec4::ZERO,
      shininess: 0.,
    }
  }
}

/// Render state of the geometry about to be drawn.
#[derive(Clone, Debug, Default)]
pub struct RenderState {
  pub shader: Option<Shader>,
  pub textures: TextureAttrib,
  pub inputs: ShaderInputs,
  pub material: Option<Material>,
  pub color_scale: Option<Vec4>,
}

impl RenderState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_shader(mut self, shader: Shader) -> Self {
    self.shader = Some(shader);
    self
  }

  pub fn with_textures(mut self, textures: TextureAttrib) -> Self {
    self.textures = textures;
    self
  }

  pub fn with_inputs(mut self, inputs: ShaderInputs) -> Self {
    self.inputs = inputs;
    self
  }

  pub fn with_material(mut self, material: Material) -> Self {
    self.material = Some(material);
    self
  }

  pub fn with_color_scale(mut self, color_scale: Vec4) -> Self {
    self.color_scale = Some(color_scale);
    self
  }
}
