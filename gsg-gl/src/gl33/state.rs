//! Graphics state.
//!
//! What is bound on the context is tracked by the core; this state only keeps what the backend
//! needs on its own: the context's version and extensions, and a few cached selectors the core
//! never sees.

use gl::types::*;
use std::cell::RefCell;
use std::collections::HashSet;
use std::error;
use std::ffi::CStr;
use std::fmt;
use std::marker::PhantomData;

use crate::gl33::ext::BindlessFns;

// at most one backend per thread
thread_local!(static TLS_ACQUIRE_GFX_STATE: RefCell<Option<()>> = RefCell::new(Some(())));

/// Cached value.
///
/// Skips a GL call when the value it would set is already set.
#[derive(Debug)]
pub(crate) struct Cached<T>(Option<T>)
where
  T: PartialEq;

impl<T> Cached<T>
where
  T: PartialEq,
{
  fn new(initial: T) -> Self {
    Cached(Some(initial))
  }

  fn invalidate(&mut self) {
    self.0 = None;
  }

  fn set(&mut self, value: T) {
    self.0 = Some(value);
  }

  fn is_invalid(&self, new_val: &T) -> bool {
    match &self.0 {
      Some(ref t) => t != new_val,
      _ => true,
    }
  }
}

/// The graphics state.
#[derive(Debug)]
pub struct GLState {
  _a: PhantomData<*const ()>, // !Send and !Sync

  version: (u32, u32),
  extensions: HashSet<String>,

  // texture unit selected with glActiveTexture
  current_texture_unit: Cached<GLenum>,

  // renderbuffer bound to GL_RENDERBUFFER
  bound_renderbuffer: Cached<GLuint>,

  // unit used for uploads and copies; never given to shaders
  pub(crate) scratch_unit: u32,

  pub(crate) bindless: Option<BindlessFns>,
}

impl GLState {
  /// Query the current context. Fails if this thread already owns a state.
  pub(crate) fn new() -> Result<Self, StateQueryError> {
    TLS_ACQUIRE_GFX_STATE.with(|rc| {
      let mut inner = rc.borrow_mut();

      match *inner {
        Some(_) => {
          inner.take();
          Self::get_from_context()
        }

        None => Err(StateQueryError::UnavailableGLState),
      }
    })
  }

  fn get_from_context() -> Result<Self, StateQueryError> {
    unsafe {
      let version = get_ctx_version()?;

      if version < (3, 3) {
        return Err(StateQueryError::UnsupportedVersion(version.0, version.1));
      }

      let extensions = get_ctx_extensions();
      let current_texture_unit = Cached::new(get_ctx_current_texture_unit());
      let max_units = get_integer(gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS).max(1) as u32;

      Ok(GLState {
        _a: PhantomData,
        version,
        extensions,
        current_texture_unit,
        bound_renderbuffer: Cached::new(0),
        scratch_unit: max_units - 1,
        bindless: None,
      })
    }
  }

  /// Version of the context, `(major, minor)`.
  pub fn version(&self) -> (u32, u32) {
    self.version
  }

  pub fn version_at_least(&self, major: u32, minor: u32) -> bool {
    self.version >= (major, minor)
  }

  pub fn has_extension(&self, name: &str) -> bool {
    self.extensions.contains(name)
  }

  /// Forget every cached selector; someone else may have used the context.
  pub fn invalidate(&mut self) {
    self.current_texture_unit.invalidate();
    self.bound_renderbuffer.invalidate();
  }

  pub(crate) unsafe fn set_texture_unit(&mut self, unit: u32) {
    let unit = gl::TEXTURE0 + unit as GLenum;

    if self.current_texture_unit.is_invalid(&unit) {
      gl::ActiveTexture(unit);
      self.current_texture_unit.set(unit);
    }
  }

  /// Bind a texture on the scratch unit, for uploads and copies.
  pub(crate) unsafe fn bind_scratch_texture(&mut self, target: GLenum, handle: GLuint) {
    self.set_texture_unit(self.scratch_unit);
    gl::BindTexture(target, handle);
  }

  pub(crate) unsafe fn bind_renderbuffer(&mut self, handle: GLuint) {
    if self.bound_renderbuffer.is_invalid(&handle) {
      gl::BindRenderbuffer(gl::RENDERBUFFER, handle);
      self.bound_renderbuffer.set(handle);
    }
  }

  pub(crate) fn forget_renderbuffer(&mut self, handle: GLuint) {
    if !self.bound_renderbuffer.is_invalid(&handle) {
      self.bound_renderbuffer.set(0);
    }
  }

  pub(crate) fn get_vendor_name(&self) -> String {
    unsafe { get_string(gl::VENDOR) }
  }

  pub(crate) fn get_renderer_name(&self) -> String {
    unsafe { get_string(gl::RENDERER) }
  }

  pub(crate) fn get_gl_version(&self) -> String {
    unsafe { get_string(gl::VERSION) }
  }

  pub(crate) fn get_glsl_version(&self) -> String {
    unsafe { get_string(gl::SHADING_LANGUAGE_VERSION) }
  }
}

/// Failure to set up a backend on the current context.
#[non_exhaustive]
#[derive(Debug)]
pub enum StateQueryError {
  /// A backend already exists on this thread.
  UnavailableGLState,
  /// The context is older than OpenGL 3.3.
  UnsupportedVersion(u32, u32),
}

impl fmt::Display for StateQueryError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      StateQueryError::UnavailableGLState => {
        f.write_str("a GL backend already exists on this thread")
      }
      StateQueryError::UnsupportedVersion(major, minor) => {
        write!(f, "unsupported OpenGL version: {}.{}", major, minor)
      }
    }
  }
}

impl error::Error for StateQueryError {}

pub(crate) unsafe fn get_integer(pname: GLenum) -> GLint {
  let mut value = 0;
  gl::GetIntegerv(pname, &mut value);
  value
}

unsafe fn get_string(name: GLenum) -> String {
  let ptr = gl::GetString(name);

  if ptr.is_null() {
    return String::new();
  }

  CStr::from_ptr(ptr as *const _).to_string_lossy().into_owned()
}

unsafe fn get_ctx_version() -> Result<(u32, u32), StateQueryError> {
  let major = get_integer(gl::MAJOR_VERSION);
  let minor = get_integer(gl::MINOR_VERSION);

  // pre-3.0 contexts do not know these queries
  if major <= 0 {
    return Err(StateQueryError::UnsupportedVersion(0, 0));
  }

  Ok((major as u32, minor.max(0) as u32))
}

unsafe fn get_ctx_extensions() -> HashSet<String> {
  let count = get_integer(gl::NUM_EXTENSIONS).max(0) as GLuint;

  (0..count)
    .filter_map(|i| {
      let ptr = gl::GetStringi(gl::EXTENSIONS, i);

      if ptr.is_null() {
        None
      } else {
        Some(CStr::from_ptr(ptr as *const _).to_string_lossy().into_owned())
      }
    })
    .collect()
}

unsafe fn get_ctx_current_texture_unit() -> GLenum {
  get_integer(gl::ACTIVE_TEXTURE) as GLenum
}
