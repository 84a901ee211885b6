//! Shaders and their parameter binding.
//!
//! A [`Shader`] is the CPU-side description of a program: its language and per-stage sources.
//! It is compiled lazily, once per guardian, into a [`ShaderContext`], which reflects the linked
//! program's uniforms and attributes into binding specs (see [`spec`]) and pushes scene-derived
//! values to them every time the render state changes.
//!
//! Compilation failure is sticky: the shader's error flag is set and the guardian refuses to use
//! it until a new shader (new sources) replaces it.

pub mod context;
pub mod parse;
pub mod spec;

pub use self::context::ShaderContext;

use std::cell::Cell;
use std::error;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::shader::{ProgramError, StageSource, StageType};

static NEXT_SHADER_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of a shader.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ShaderId(u64);

/// Shading language of a shader's sources.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ShaderLanguage {
  Glsl,
  Cg,
}

impl fmt::Display for ShaderLanguage {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      ShaderLanguage::Glsl => f.write_str("GLSL"),
      ShaderLanguage::Cg => f.write_str("Cg"),
    }
  }
}

/// Shader errors.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ShaderError {
  /// The backend cannot compile this language.
  UnsupportedLanguage(ShaderLanguage),
  /// A stage this device has no support for.
  UnsupportedStage(StageType),
  /// No stage at all.
  NoStages,
  /// Compilation or link failure.
  Program(ProgramError),
}

impl fmt::Display for ShaderError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      ShaderError::UnsupportedLanguage(lang) => write!(f, "unsupported shading language: {}", lang),
      ShaderError::UnsupportedStage(ty) => write!(f, "unsupported {}", ty),
      ShaderError::NoStages => f.write_str("shader has no stage"),
      ShaderError::Program(ref e) => write!(f, "{}", e),
    }
  }
}

impl error::Error for ShaderError {
  fn source(&self) -> Option<&(dyn error::Error + 'static)> {
    match self {
      ShaderError::Program(e) => Some(e),
      _ => None,
    }
  }
}

impl From<ProgramError> for ShaderError {
  fn from(e: ProgramError) -> Self {
    ShaderError::Program(e)
  }
}

#[derive(Debug)]
struct ShaderData {
  id: ShaderId,
  name: String,
  language: ShaderLanguage,
  stages: Vec<(StageType, String)>,
  error_flag: Cell<bool>,
}

/// A shared CPU-side shader.
#[derive(Clone, Debug)]
pub struct Shader(Rc<ShaderData>);

impl Shader {
  pub fn new(
    name: impl Into<String>,
    language: ShaderLanguage,
    stages: impl IntoIterator<Item = (StageType, String)>,
  ) -> Self {
    Shader(Rc::new(ShaderData {
      id: ShaderId(NEXT_SHADER_ID.fetch_add(1, Ordering::Relaxed)),
      name: name.into(),
      language,
      stages: stages.into_iter().collect(),
      error_flag: Cell::new(false),
    }))
  }

  /// GLSL vertex + fragment shader.
  pub fn glsl(
    name: impl Into<String>,
    vertex: impl Into<String>,
    fragment: impl Into<String>,
  ) -> Self {
    Shader::new(
      name,
      ShaderLanguage::Glsl,
      vec![
        (StageType::VertexShader, vertex.into()),
        (StageType::FragmentShader, fragment.into()),
      ],
    )
  }

  pub fn id(&self) -> ShaderId {
    self.0.id
  }

  pub fn name(&self) -> &str {
    &self.0.name
  }

  pub fn language(&self) -> ShaderLanguage {
    self.0.language
  }

  pub fn stages(&self) -> impl Iterator<Item = StageSource> + '_ {
    self
      .0
      .stages
      .iter()
      .map(|(ty, source)| StageSource { ty: *ty, source })
  }

  /// Whether compiling this shader failed on some guardian.
  pub fn error_flag(&self) -> bool {
    self.0.error_flag.get()
  }

  pub(crate) fn set_error_flag(&self) {
    self.0.error_flag.set(true);
  }
}

impl PartialEq for Shader {
  fn eq(&self, rhs: &Self) -> bool {
    Rc::ptr_eq(&self.0, &rhs.0)
  }
}

impl Eq for Shader {}
