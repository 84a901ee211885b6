//! Shader program backend interface.

use std::error;
use std::fmt;

use crate::texture::TextureType;

/// A shader stage type.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StageType {
  VertexShader,
  TessellationControlShader,
  TessellationEvaluationShader,
  GeometryShader,
  FragmentShader,
  ComputeShader,
}

impl fmt::Display for StageType {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      StageType::VertexShader => f.write_str("vertex shader"),
      StageType::TessellationControlShader => f.write_str("tessellation control shader"),
      StageType::TessellationEvaluationShader => f.write_str("tessellation evaluation shader"),
      StageType::GeometryShader => f.write_str("geometry shader"),
      StageType::FragmentShader => f.write_str("fragment shader"),
      StageType::ComputeShader => f.write_str("compute shader"),
    }
  }
}

/// Source code of one stage.
#[derive(Clone, Copy, Debug)]
pub struct StageSource<'a> {
  pub ty: StageType,
  pub source: &'a str,
}

/// Errors that shader stages can emit.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StageError {
  /// Occurs when a shader fails to compile.
  CompilationFailed(StageType, String),
  /// Occurs when you try to create a shader which type is not supported on the current hardware.
  UnsupportedType(StageType),
}

impl fmt::Display for StageError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      StageError::CompilationFailed(ref ty, ref r) => write!(f, "{} compilation error: {}", ty, r),

      StageError::UnsupportedType(ty) => write!(f, "unsupported {}", ty),
    }
  }
}

impl error::Error for StageError {}

/// Errors that a program can generate.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProgramError {
  /// A shader stage failed to compile or validate its state.
  StageError(StageError),
  /// Program link failed. You can inspect the reason by looking at the contained `String`.
  LinkFailed(String),
  /// The shading language is not supported by this backend.
  UnsupportedLanguage(String),
}

impl ProgramError {
  pub fn link_failed(reason: impl Into<String>) -> Self {
    ProgramError::LinkFailed(reason.into())
  }
}

impl fmt::Display for ProgramError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      ProgramError::StageError(ref e) => write!(f, "shader program has stage error: {}", e),

      ProgramError::LinkFailed(ref s) => write!(f, "shader program failed to link: {}", s),

      ProgramError::UnsupportedLanguage(ref l) => write!(f, "unsupported shading language: {}", l),
    }
  }
}

impl error::Error for ProgramError {
  fn source(&self) -> Option<&(dyn error::Error + 'static)> {
    match self {
      ProgramError::StageError(e) => Some(e),
      _ => None,
    }
  }
}

impl From<StageError> for ProgramError {
  fn from(e: StageError) -> Self {
    ProgramError::StageError(e)
  }
}

/// Scalar type of a shader parameter.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ScalarType {
  Float,
  Double,
  Int,
  UInt,
  Bool,
}

/// Sampled component kind of a sampler or image.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SamplerKind {
  Float,
  Int,
  UInt,
  Shadow,
}

/// Reflected type of a shader parameter.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ParamType {
  /// Scalar or vector with 1 to 4 components.
  Vector(ScalarType, u8),
  /// Square matrix of the given dimension.
  Matrix(ScalarType, u8),
  Sampler(SamplerKind, TextureType),
  Image(SamplerKind, TextureType),
  /// Anything the backend reflects but cannot describe.
  Unknown(u32),
}

impl ParamType {
  /// Number of scalars in one element, if this is a vector or matrix.
  pub fn components(&self) -> Option<usize> {
    match *self {
      ParamType::Vector(_, n) => Some(n as usize),
      ParamType::Matrix(_, n) => Some(n as usize * n as usize),
      _ => None,
    }
  }

  pub fn scalar_type(&self) -> Option<ScalarType> {
    match *self {
      ParamType::Vector(t, _) | ParamType::Matrix(t, _) => Some(t),
      _ => None,
    }
  }

  pub fn is_double(&self) -> bool {
    self.scalar_type() == Some(ScalarType::Double)
  }
}

/// An active uniform or vertex attribute of a linked program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActiveParameter {
  pub name: String,
  pub location: i32,
  /// Array size; `1` for non-arrays.
  pub size: usize,
  pub ty: ParamType,
}

/// Data pushed to a uniform location.
///
/// Vector data carries its component count; the number of elements is the slice length divided
/// by it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformData<'a> {
  Float(u8, &'a [f32]),
  Double(u8, &'a [f64]),
  Int(u8, &'a [i32]),
  UInt(u8, &'a [u32]),
  /// Column-major square matrices of the given dimension.
  FloatMatrix(u8, &'a [f32]),
  DoubleMatrix(u8, &'a [f64]),
  /// A bindless texture handle.
  TextureHandle(u64),
}

pub unsafe trait ShaderBackend {
  /// Compile every stage and link them into a program.
  unsafe fn compile_program(&mut self, stages: &[StageSource]) -> Result<u32, ProgramError>;

  unsafe fn delete_program(&mut self, program: u32);

  /// Make `program` current. `0` disables programmable shading.
  unsafe fn use_program(&mut self, program: u32);

  unsafe fn active_uniforms(&mut self, program: u32) -> Vec<ActiveParameter>;

  unsafe fn active_attributes(&mut self, program: u32) -> Vec<ActiveParameter>;

  /// Push data to a uniform of the current program.
  unsafe fn set_uniform(&mut self, location: i32, data: UniformData);
}
