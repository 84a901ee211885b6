//! OpenGL 3.3 backend.
//!
//! This module implements an OpenGL 3.3+ core profile backend for gsg. The backend type is
//! [`GL33`]. Features of later versions (image units, compute shaders…) are detected at
//! creation and advertised through the capabilities; bindless textures need their entry points
//! loaded with [`GL33::load_extensions`].

mod buffer;
mod ext;
mod framebuffer;
mod query;
mod shader;
mod state;
mod texture;

pub use self::state::GLState;
pub use self::state::StateQueryError;

use std::os::raw::c_void;

use self::ext::BindlessFns;

/// An OpenGL 3.3 backend.
///
/// This type is to be used as a gsg backend type. It implements every backend trait.
#[derive(Debug)]
pub struct GL33 {
  pub(crate) state: GLState,
}

impl GL33 {
  /// Create a new OpenGL 3.3 backend from the current context.
  pub fn new() -> Result<Self, StateQueryError> {
    GLState::new().map(|state| GL33 { state })
  }

  /// Load the entry points of extensions the `gl` crate does not expose.
  ///
  /// `loader` is the same function given to [`gl::load_with`].
  pub fn load_extensions<F>(&mut self, mut loader: F)
  where
    F: FnMut(&str) -> *const c_void,
  {
    if self.state.has_extension("GL_ARB_bindless_texture") {
      self.state.bindless = unsafe { BindlessFns::load(&mut loader) };

      if self.state.bindless.is_none() {
        log::warn!("GL_ARB_bindless_texture advertised but its entry points are missing");
      }
    }
  }

  /// Internal access to the backend state.
  ///
  /// # Unsafety
  ///
  /// This method is **highly unsafe** as it exposes the internals of the backend. Playing with it
  /// should be done with extreme caution.
  pub unsafe fn state(&mut self) -> &mut GLState {
    &mut self.state
  }
}
