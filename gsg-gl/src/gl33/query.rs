use gl::types::*;
use gsg::backend::query::{DriverError, QueryBackend};
use gsg::capabilities::{Capabilities, DriverInfo, Limits};

use crate::gl33::state::get_integer;
use crate::gl33::GL33;

unsafe impl QueryBackend for GL33 {
  unsafe fn make_current(&mut self) -> bool {
    // the windowing layer owns the context; whoever calls this already made it current
    self.state.invalidate();
    true
  }

  unsafe fn capabilities(&mut self) -> (Capabilities, Limits) {
    let state = &self.state;
    let mut caps = Capabilities::FRAMEBUFFER_OBJECT
      | Capabilities::FRAMEBUFFER_MULTISAMPLE
      | Capabilities::FRAMEBUFFER_BLIT
      | Capabilities::DEPTH_STENCIL
      | Capabilities::GENERATE_MIPMAP
      | Capabilities::VERTEX_ARRAY_OBJECT
      | Capabilities::SRGB_FRAMEBUFFER
      | Capabilities::CLEAR_BUFFER
      | Capabilities::SAMPLER_OBJECTS;

    if state.version_at_least(3, 2) {
      caps |= Capabilities::GEOMETRY_SHADERS;
    }

    if state.version_at_least(4, 0) {
      caps |= Capabilities::TESSELLATION_SHADERS | Capabilities::DOUBLE_UNIFORMS;
    }

    if state.version_at_least(4, 2) || state.has_extension("GL_ARB_shader_image_load_store") {
      caps |= Capabilities::IMAGE_LOAD_STORE;
    }

    if state.version_at_least(4, 3) {
      caps |= Capabilities::COMPUTE_SHADERS | Capabilities::EMPTY_FRAMEBUFFER;
    } else {
      if state.has_extension("GL_ARB_compute_shader") {
        caps |= Capabilities::COMPUTE_SHADERS;
      }

      if state.has_extension("GL_ARB_framebuffer_no_attachments") {
        caps |= Capabilities::EMPTY_FRAMEBUFFER;
      }
    }

    if state.bindless.is_some() {
      caps |= Capabilities::BINDLESS_TEXTURE;
    }

    let image_units = if caps.contains(Capabilities::IMAGE_LOAD_STORE) {
      get_integer(gl::MAX_IMAGE_UNITS).max(0) as u32
    } else {
      0
    };

    let limits = Limits {
      max_texture_units: get_integer(gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS).max(1) as u32,
      max_image_units: image_units,
      max_fb_samples: get_integer(gl::MAX_SAMPLES).max(0) as u32,
      max_color_targets: get_integer(gl::MAX_DRAW_BUFFERS)
        .min(get_integer(gl::MAX_COLOR_ATTACHMENTS))
        .max(1) as u32,
      max_texture_size: get_integer(gl::MAX_TEXTURE_SIZE).max(1) as u32,
      max_vertex_attribs: get_integer(gl::MAX_VERTEX_ATTRIBS).max(1) as u32,
    };

    (caps, limits)
  }

  unsafe fn driver_info(&mut self) -> DriverInfo {
    DriverInfo {
      vendor: self.state.get_vendor_name(),
      renderer: self.state.get_renderer_name(),
      version: self.state.get_gl_version(),
      shading_language_version: self.state.get_glsl_version(),
    }
  }

  unsafe fn has_extension(&mut self, name: &str) -> bool {
    self.state.has_extension(name)
  }

  unsafe fn get_error(&mut self) -> Option<DriverError> {
    match gl::GetError() {
      gl::NO_ERROR => None,
      e => Some(driver_error(e)),
    }
  }
}

fn driver_error(code: GLenum) -> DriverError {
  match code {
    gl::INVALID_ENUM => DriverError::InvalidEnum,
    gl::INVALID_VALUE => DriverError::InvalidValue,
    gl::INVALID_OPERATION => DriverError::InvalidOperation,
    gl::INVALID_FRAMEBUFFER_OPERATION => DriverError::InvalidFramebufferOperation,
    gl::OUT_OF_MEMORY => DriverError::OutOfMemory,
    gl::STACK_OVERFLOW => DriverError::StackOverflow,
    gl::STACK_UNDERFLOW => DriverError::StackUnderflow,
    _ => DriverError::Other(code),
  }
}
